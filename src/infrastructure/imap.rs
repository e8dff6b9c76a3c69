use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use tokio::net::TcpStream;
use tokio_native_tls::TlsConnector;
use tracing::{info, warn};

use crate::core::models::{Header, MailboxInfo, MailboxStatus, Message, SpecialUse};
use crate::services::email::mail_service::MailService;
use crate::services::email::parser::EmailParser;
use crate::services::email::search::{self, SearchCriterion};

pub type ImapSession = async_imap::Session<tokio_native_tls::TlsStream<TcpStream>>;
type ImapHandshake = async_imap::Client<tokio_native_tls::TlsStream<TcpStream>>;

pub struct ImapClient {
    host: String,
    port: u16,
    client: Option<ImapHandshake>,
    session: Option<ImapSession>,
}

impl ImapClient {
    pub fn new(host: String, port: u16) -> Self {
        Self {
            host,
            port,
            client: None,
            session: None,
        }
    }

    fn session_mut(&mut self) -> Result<&mut ImapSession> {
        self.session.as_mut().context("IMAP session not connected")
    }

    /// Map LIST attributes to a special-use role.
    ///
    /// Attributes are matched on their rendered form rather than enum
    /// variants, since servers deliver RFC 6154 roles as extension
    /// attributes.
    fn special_use_for(name: &str, attributes: &[String]) -> Option<SpecialUse> {
        // INBOX is its own role even without a SPECIAL-USE attribute
        if name.eq_ignore_ascii_case("INBOX") {
            return Some(SpecialUse::Inbox);
        }

        for attr in attributes {
            let lower = attr.to_lowercase();
            if lower.contains("sent") {
                return Some(SpecialUse::Sent);
            }
            if lower.contains("draft") {
                return Some(SpecialUse::Drafts);
            }
            if lower.contains("trash") || lower.contains("deleted") {
                return Some(SpecialUse::Trash);
            }
            if lower.contains("junk") || lower.contains("spam") {
                return Some(SpecialUse::Junk);
            }
            if lower.contains("archive") {
                return Some(SpecialUse::Archive);
            }
        }

        None
    }
}

#[async_trait]
impl MailService for ImapClient {
    async fn connect(&mut self) -> Result<()> {
        if self.session.is_some() || self.client.is_some() {
            return Ok(());
        }

        info!("Connecting to IMAP server...");
        let tcp_stream = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .context("Failed to connect to IMAP server (TCP)")?;

        let native_tls = native_tls::TlsConnector::builder()
            .build()
            .context("Failed to create TLS connector")?;
        let connector = TlsConnector::from(native_tls);

        let tls_stream = connector
            .connect(&self.host, tcp_stream)
            .await
            .context("Failed to establish TLS connection")?;

        self.client = Some(async_imap::Client::new(tls_stream));
        Ok(())
    }

    async fn login(&mut self, username: &str, password: &str) -> Result<()> {
        if self.session.is_some() {
            return Ok(());
        }

        let client = self
            .client
            .take()
            .context("IMAP connection not established")?;

        let session = client
            .login(username, password)
            .await
            .map_err(|e| e.0)
            .context("IMAP authentication failed")?;

        info!("Successfully logged in to IMAP server");
        self.session = Some(session);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.client.take();
        if let Some(mut session) = self.session.take() {
            session.logout().await.context("Failed to logout")?;
        }
        Ok(())
    }

    async fn list_mailboxes(&mut self) -> Result<Vec<MailboxInfo>> {
        let session = self.session_mut()?;

        let mut stream = session
            .list(Some(""), Some("*"))
            .await
            .context("Failed to list mailboxes")?;

        let mut mailboxes = Vec::new();
        while let Some(name) = stream.next().await {
            let name = name.context("Failed to read mailbox listing")?;
            let attrs: Vec<String> = name
                .attributes()
                .iter()
                .map(|a| format!("{:?}", a))
                .collect();
            mailboxes.push(MailboxInfo {
                name: name.name().to_string(),
                special_use: Self::special_use_for(name.name(), &attrs),
            });
        }

        Ok(mailboxes)
    }

    async fn list_special_use_mailboxes(&mut self) -> Result<Vec<MailboxInfo>> {
        let mailboxes = self.list_mailboxes().await?;
        Ok(mailboxes
            .into_iter()
            .filter(|m| m.special_use.is_some())
            .collect())
    }

    async fn select_mailbox(&mut self, name: &str) -> Result<MailboxStatus> {
        let session = self.session_mut()?;
        let mailbox = session
            .select(name)
            .await
            .context("Failed to select mailbox")?;

        Ok(MailboxStatus {
            name: name.to_string(),
            exists: mailbox.exists,
        })
    }

    async fn search(&mut self, criteria: &[SearchCriterion]) -> Result<Vec<u32>> {
        let session = self.session_mut()?;
        let result = session
            .search(search::to_query(criteria))
            .await
            .context("Failed to search mailbox")?;

        // newest first, matching the ordering MailboxStatus::latest uses
        let mut ids: Vec<u32> = result.into_iter().collect();
        ids.sort_unstable_by(|a, b| b.cmp(a));
        Ok(ids)
    }

    async fn fetch_messages(&mut self, ids: &[u32]) -> Result<Vec<Message>> {
        let mut messages = Vec::new();

        for id in ids {
            let session = self.session_mut()?;
            let mut fetch_stream = session
                .fetch(id.to_string(), "RFC822")
                .await
                .context("Failed to fetch message")?;

            let Some(msg) = fetch_stream.next().await else {
                warn!("No fetch result for message {}", id);
                continue;
            };
            let msg = msg.context("Failed to read fetch result")?;

            match msg.body() {
                Some(raw) => messages.push(EmailParser::parse_message(raw)?),
                None => warn!("Fetch result for message {} carried no body", id),
            }
        }

        Ok(messages)
    }

    async fn fetch_headers(&mut self, ids: &[u32]) -> Result<Vec<Header>> {
        let mut headers = Vec::new();

        for id in ids {
            let session = self.session_mut()?;
            let mut fetch_stream = session
                .fetch(id.to_string(), "RFC822.HEADER")
                .await
                .context("Failed to fetch header")?;

            let Some(msg) = fetch_stream.next().await else {
                warn!("No fetch result for header {}", id);
                continue;
            };
            let msg = msg.context("Failed to read fetch result")?;

            match msg.header() {
                Some(raw) => headers.push(EmailParser::parse_header(raw)?),
                None => warn!("Fetch result for header {} carried no data", id),
            }
        }

        Ok(headers)
    }
}
