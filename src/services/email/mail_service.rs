use anyhow::Result;
use async_trait::async_trait;

use crate::core::models::{Header, MailboxInfo, MailboxStatus, Message};
use crate::services::email::search::SearchCriterion;

/// Raw mail client operations consumed by the session.
///
/// Implementations own the wire protocol; policy (state machine,
/// serialization, error wrapping) lives in `MailSession`.
#[async_trait]
pub trait MailService: Send {
    async fn connect(&mut self) -> Result<()>;
    async fn login(&mut self, username: &str, password: &str) -> Result<()>;
    async fn disconnect(&mut self) -> Result<()>;
    async fn list_mailboxes(&mut self) -> Result<Vec<MailboxInfo>>;
    async fn list_special_use_mailboxes(&mut self) -> Result<Vec<MailboxInfo>>;
    async fn select_mailbox(&mut self, name: &str) -> Result<MailboxStatus>;
    async fn search(&mut self, criteria: &[SearchCriterion]) -> Result<Vec<u32>>;
    async fn fetch_messages(&mut self, ids: &[u32]) -> Result<Vec<Message>>;
    async fn fetch_headers(&mut self, ids: &[u32]) -> Result<Vec<Header>>;
}
