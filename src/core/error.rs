use thiserror::Error;

use crate::services::email::decoder::DecodeError;

/// 应用错误类型
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to connect to mail server: {0}")]
    Connect(String),

    #[error("Login failed: {0}")]
    Login(String),

    #[error("Mail session is not connected")]
    NotConnected,

    #[error("Mailbox not found: {0}")]
    MailboxNotFound(String),

    #[error("Failed to select mailbox: {0}")]
    Select(String),

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("OCR service error: {0}")]
    Ocr(String),

    #[error("No receipt email found")]
    NoReceiptFound,

    #[error("Receipt email has no PDF attachment")]
    NoAttachment,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// 区分"无事可做"与基础设施故障
    pub fn is_empty_result(&self) -> bool {
        matches!(self, AppError::NoReceiptFound | AppError::NoAttachment)
    }
}

/// 应用级别通用 Result 类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_result_kinds() {
        assert!(AppError::NoReceiptFound.is_empty_result());
        assert!(AppError::NoAttachment.is_empty_result());
        assert!(!AppError::NotConnected.is_empty_result());
        assert!(!AppError::MailboxNotFound("receipts".to_string()).is_empty_result());
    }
}
