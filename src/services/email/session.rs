use anyhow::Context;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::core::error::{AppError, AppResult};
use crate::core::models::{MailboxInfo, Message};
use crate::services::email::config::MailConfig;
use crate::services::email::filter;
use crate::services::email::mail_service::MailService;
use crate::services::email::resolver::{self, MailboxRole};
use crate::services::email::search::SearchCriterion;

/// 会话状态机
///
/// `Disconnected → Connected → LoggedIn`, with the transient connecting
/// phase living inside `connect()`. Mailbox operations are only legal in
/// `LoggedIn`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connected,
    LoggedIn,
}

struct Inner<M> {
    service: M,
    state: SessionState,
}

/// 邮件会话 - 独占持有底层客户端
///
/// The mail protocol is stateful (select scopes later search/fetch), so
/// every stateful sequence runs under one mutex guard. Two callers can
/// never interleave a select against each other's fetch.
pub struct MailSession<M> {
    config: MailConfig,
    inner: Mutex<Inner<M>>,
}

impl<M: MailService> MailSession<M> {
    pub fn new(service: M, config: MailConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                service,
                state: SessionState::Disconnected,
            }),
        }
    }

    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }

    /// connect + login 复合操作，已登录时为幂等
    pub async fn setup(&self) -> AppResult<()> {
        let mut inner = self.inner.lock().await;
        Self::connect_locked(&mut inner).await?;
        Self::login_locked(&mut inner, &self.config).await
    }

    pub async fn connect(&self) -> AppResult<()> {
        let mut inner = self.inner.lock().await;
        Self::connect_locked(&mut inner).await
    }

    pub async fn login(&self) -> AppResult<()> {
        let mut inner = self.inner.lock().await;
        Self::login_locked(&mut inner, &self.config).await
    }

    /// 断开连接，可重复调用
    pub async fn disconnect(&self) -> AppResult<()> {
        let mut inner = self.inner.lock().await;
        if inner.state == SessionState::Disconnected {
            debug!("Session already disconnected, nothing to do");
            return Ok(());
        }

        let result = inner.service.disconnect().await;
        // The socket is gone whether or not the logout round-trip succeeded
        inner.state = SessionState::Disconnected;
        result
            .context("Failed to disconnect from mail server")
            .map_err(AppError::Other)
    }

    /// 按角色解析邮箱
    pub async fn resolve_mailbox(&self, role: &MailboxRole) -> AppResult<Option<MailboxInfo>> {
        let mut inner = self.inner.lock().await;
        Self::require_login(&inner)?;

        let listing = match role {
            MailboxRole::SpecialUse(_) => inner
                .service
                .list_special_use_mailboxes()
                .await
                .map_err(|e| AppError::Fetch(e.to_string()))?,
            MailboxRole::Named(_) => inner
                .service
                .list_mailboxes()
                .await
                .map_err(|e| AppError::Fetch(e.to_string()))?,
        };

        Ok(resolver::resolve(role, &listing).cloned())
    }

    /// 获取最新一封邮件的主题
    pub async fn latest_subject(&self, mailbox: &MailboxInfo) -> AppResult<String> {
        let mut inner = self.inner.lock().await;
        Self::require_login(&inner)?;

        let status = inner
            .service
            .select_mailbox(&mailbox.name)
            .await
            .map_err(|e| AppError::Select(e.to_string()))?;

        let ids = status
            .latest(1)
            .ok_or_else(|| AppError::Fetch(format!("No messages in {}", mailbox.name)))?;

        let headers = inner
            .service
            .fetch_headers(&ids)
            .await
            .map_err(|e| AppError::Fetch(e.to_string()))?;

        headers
            .into_iter()
            .next()
            .map(|h| h.subject)
            .ok_or_else(|| AppError::Fetch(format!("No headers returned for {}", mailbox.name)))
    }

    /// 拉取最近 count 封邮件并保留带附件的
    pub async fn fetch_latest_with_attachments(
        &self,
        mailbox: &MailboxInfo,
        count: u32,
    ) -> AppResult<Vec<Message>> {
        let mut inner = self.inner.lock().await;
        Self::require_login(&inner)?;

        let status = inner
            .service
            .select_mailbox(&mailbox.name)
            .await
            .map_err(|e| AppError::Select(e.to_string()))?;

        let Some(ids) = status.latest(count) else {
            return Ok(Vec::new());
        };

        let messages = inner
            .service
            .fetch_messages(&ids)
            .await
            .map_err(|e| AppError::Fetch(e.to_string()))?;

        Ok(filter::retain_with_attachments(messages))
    }

    /// 按条件搜索邮箱并拉取命中的邮件
    pub async fn search_messages(
        &self,
        mailbox: &MailboxInfo,
        criteria: &[SearchCriterion],
    ) -> AppResult<Vec<Message>> {
        let mut inner = self.inner.lock().await;
        Self::require_login(&inner)?;

        inner
            .service
            .select_mailbox(&mailbox.name)
            .await
            .map_err(|e| AppError::Select(e.to_string()))?;

        let ids = inner
            .service
            .search(criteria)
            .await
            .map_err(|e| AppError::Fetch(e.to_string()))?;

        if ids.is_empty() {
            return Ok(Vec::new());
        }

        inner
            .service
            .fetch_messages(&ids)
            .await
            .map_err(|e| AppError::Fetch(e.to_string()))
    }

    async fn connect_locked(inner: &mut Inner<M>) -> AppResult<()> {
        if inner.state != SessionState::Disconnected {
            return Ok(());
        }

        match inner.service.connect().await {
            Ok(()) => {
                info!("Connected to mail server");
                inner.state = SessionState::Connected;
                Ok(())
            }
            // connecting is transient, a failure lands back in Disconnected
            Err(e) => Err(AppError::Connect(e.to_string())),
        }
    }

    async fn login_locked(inner: &mut Inner<M>, config: &MailConfig) -> AppResult<()> {
        match inner.state {
            SessionState::Disconnected => Err(AppError::NotConnected),
            // re-running login when already logged in is not an error
            SessionState::LoggedIn => Ok(()),
            SessionState::Connected => {
                match inner
                    .service
                    .login(&config.username, &config.password)
                    .await
                {
                    Ok(()) => {
                        info!("Logged in as {}", config.username);
                        inner.state = SessionState::LoggedIn;
                        Ok(())
                    }
                    // stay Connected so the caller may retry login or tear
                    // down explicitly
                    Err(e) => Err(AppError::Login(e.to_string())),
                }
            }
        }
    }

    fn require_login(inner: &Inner<M>) -> AppResult<()> {
        if inner.state != SessionState::LoggedIn {
            return Err(AppError::NotConnected);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{Header, MailboxStatus, MessagePart, SpecialUse};
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex as StdMutex};

    #[derive(Clone, Default)]
    struct RecordingMailService {
        ops: Arc<StdMutex<Vec<String>>>,
        fail_connect: bool,
        fail_login: bool,
        exists: u32,
    }

    impl RecordingMailService {
        fn record(&self, op: &str) {
            self.ops.lock().unwrap().push(op.to_string());
        }

        fn recorded(&self) -> Vec<String> {
            self.ops.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MailService for RecordingMailService {
        async fn connect(&mut self) -> Result<()> {
            self.record("connect");
            if self.fail_connect {
                return Err(anyhow!("connection refused"));
            }
            Ok(())
        }

        async fn login(&mut self, _username: &str, _password: &str) -> Result<()> {
            self.record("login");
            if self.fail_login {
                return Err(anyhow!("bad credentials"));
            }
            Ok(())
        }

        async fn disconnect(&mut self) -> Result<()> {
            self.record("disconnect");
            Ok(())
        }

        async fn list_mailboxes(&mut self) -> Result<Vec<MailboxInfo>> {
            self.record("list");
            Ok(vec![MailboxInfo {
                name: "Receipts".to_string(),
                special_use: None,
            }])
        }

        async fn list_special_use_mailboxes(&mut self) -> Result<Vec<MailboxInfo>> {
            self.record("list_special_use");
            Ok(vec![MailboxInfo {
                name: "INBOX".to_string(),
                special_use: Some(SpecialUse::Inbox),
            }])
        }

        async fn select_mailbox(&mut self, name: &str) -> Result<MailboxStatus> {
            self.record(&format!("select:{}", name));
            // give a racing caller a chance to sneak in between select and fetch
            tokio::task::yield_now().await;
            Ok(MailboxStatus {
                name: name.to_string(),
                exists: self.exists,
            })
        }

        async fn search(&mut self, _criteria: &[SearchCriterion]) -> Result<Vec<u32>> {
            self.record("search");
            Ok(vec![1])
        }

        async fn fetch_messages(&mut self, ids: &[u32]) -> Result<Vec<Message>> {
            self.record(&format!("fetch:{}", ids.len()));
            tokio::task::yield_now().await;
            Ok(ids
                .iter()
                .map(|_| Message {
                    subject: "receipt".to_string(),
                    text_body: None,
                    html_body: None,
                    attachments: vec![MessagePart {
                        content_type: "application".to_string(),
                        content_subtype: "pdf".to_string(),
                        filename: None,
                        data: Vec::new(),
                    }],
                })
                .collect())
        }

        async fn fetch_headers(&mut self, ids: &[u32]) -> Result<Vec<Header>> {
            self.record(&format!("headers:{}", ids.len()));
            Ok(ids
                .iter()
                .map(|_| Header {
                    subject: "latest subject".to_string(),
                })
                .collect())
        }
    }

    fn config() -> MailConfig {
        MailConfig {
            host: "imap.example.com".to_string(),
            port: 993,
            username: "test@example.com".to_string(),
            password: "password123".to_string(),
        }
    }

    fn session(service: RecordingMailService) -> MailSession<RecordingMailService> {
        MailSession::new(service, config())
    }

    #[tokio::test]
    async fn test_mailbox_ops_require_login() {
        let s = session(RecordingMailService::default());
        let err = s
            .resolve_mailbox(&MailboxRole::Named("receipts".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotConnected));
    }

    #[tokio::test]
    async fn test_connect_failure_returns_to_disconnected() {
        let s = session(RecordingMailService {
            fail_connect: true,
            ..Default::default()
        });

        let err = s.setup().await.unwrap_err();
        assert!(matches!(err, AppError::Connect(_)));
        assert_eq!(s.state().await, SessionState::Disconnected);
    }

    #[tokio::test]
    async fn test_login_failure_leaves_session_connected() {
        let s = session(RecordingMailService {
            fail_login: true,
            ..Default::default()
        });

        let err = s.setup().await.unwrap_err();
        assert!(matches!(err, AppError::Login(_)));
        // connected but not logged in, the caller decides what to do next
        assert_eq!(s.state().await, SessionState::Connected);
    }

    #[tokio::test]
    async fn test_setup_is_idempotent_when_logged_in() {
        let service = RecordingMailService {
            exists: 1,
            ..Default::default()
        };
        let ops = service.ops.clone();
        let s = session(service);

        s.setup().await.unwrap();
        s.setup().await.unwrap();

        assert_eq!(s.state().await, SessionState::LoggedIn);
        // one connect, one login, nothing more
        assert_eq!(*ops.lock().unwrap(), vec!["connect", "login"]);
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let service = RecordingMailService::default();
        let ops = service.ops.clone();
        let s = session(service);

        s.setup().await.unwrap();
        s.disconnect().await.unwrap();
        s.disconnect().await.unwrap();

        assert_eq!(s.state().await, SessionState::Disconnected);
        let recorded = ops.lock().unwrap().clone();
        assert_eq!(
            recorded.iter().filter(|op| *op == "disconnect").count(),
            1,
            "second disconnect must be a no-op"
        );
    }

    #[tokio::test]
    async fn test_latest_subject() {
        let s = session(RecordingMailService {
            exists: 3,
            ..Default::default()
        });
        s.setup().await.unwrap();

        let inbox = s
            .resolve_mailbox(&MailboxRole::SpecialUse(SpecialUse::Inbox))
            .await
            .unwrap()
            .unwrap();
        let subject = s.latest_subject(&inbox).await.unwrap();
        assert_eq!(subject, "latest subject");
    }

    #[tokio::test]
    async fn test_empty_mailbox_yields_no_messages() {
        let s = session(RecordingMailService {
            exists: 0,
            ..Default::default()
        });
        s.setup().await.unwrap();

        let mailbox = s
            .resolve_mailbox(&MailboxRole::Named("receipts".to_string()))
            .await
            .unwrap()
            .unwrap();
        let messages = s.fetch_latest_with_attachments(&mailbox, 10).await.unwrap();
        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn test_stateful_sequences_never_interleave() {
        let service = RecordingMailService {
            exists: 5,
            ..Default::default()
        };
        let ops = service.ops.clone();
        let s = Arc::new(session(service));
        s.setup().await.unwrap();

        let mailbox = MailboxInfo {
            name: "Receipts".to_string(),
            special_use: None,
        };

        let mut handles = Vec::new();
        for _ in 0..4 {
            let s = s.clone();
            let mailbox = mailbox.clone();
            handles.push(tokio::spawn(async move {
                s.fetch_latest_with_attachments(&mailbox, 5).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // every select must be immediately followed by its own fetch
        let recorded = ops.lock().unwrap().clone();
        let sequence: Vec<_> = recorded
            .iter()
            .filter(|op| op.starts_with("select") || op.starts_with("fetch"))
            .collect();
        for pair in sequence.chunks(2) {
            assert!(pair[0].starts_with("select:"), "got {:?}", sequence);
            assert!(pair[1].starts_with("fetch:"), "got {:?}", sequence);
        }
    }
}
