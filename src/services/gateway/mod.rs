use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::core::error::{AppError, AppResult};
use crate::core::models::{Message, SpecialUse};
use crate::core::time::TimeProvider;
use crate::services::email::resolver::MailboxRole;
use crate::services::email::search::{self, SearchSpec};
use crate::services::email::{decoder, filter, MailService, MailSession};
use crate::services::ocr::{OcrPage, OcrService, OcrSource, UploadFile};

/// Search window applied when the caller does not give one.
pub const DEFAULT_SEARCH_WINDOW_DAYS: u64 = 7;

/// How many of the newest messages are considered receipt candidates.
const LATEST_RECEIPT_CANDIDATES: u32 = 10;

const RESULT_FILE_NAME: &str = "results.md";
const FALLBACK_ATTACHMENT_NAME: &str = "attachment.pdf";

/// 对外暴露的邮件消息
#[derive(Debug, Clone, Serialize)]
pub struct EmailMessage {
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<AttachmentPayload>,
}

/// 对外暴露的附件数据
#[derive(Debug, Clone, Serialize)]
pub struct AttachmentPayload {
    pub filename: String,
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(serialize_with = "as_base64")]
    pub data: Vec<u8>,
}

fn as_base64<S: serde::Serializer>(data: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&BASE64_STANDARD.encode(data))
}

impl EmailMessage {
    pub fn from_message(message: &Message) -> Self {
        let attachment = filter::select_receipt_attachment(message).map(|part| AttachmentPayload {
            filename: part
                .filename
                .clone()
                .unwrap_or_else(|| FALLBACK_ATTACHMENT_NAME.to_string()),
            content_type: mime::APPLICATION_PDF.to_string(),
            data: part.data.clone(),
        });

        Self {
            subject: message.subject.clone(),
            raw_text: message.text_body.clone(),
            html_text: message.html_body.clone(),
            attachment,
        }
    }
}

/// The decoded PDF of a receipt run. Owned by the call, never cached.
#[derive(Debug, Clone)]
pub struct ReceiptAttachment {
    pub filename: String,
    pub data: Vec<u8>,
}

/// 回执网关 - 工具入口与收据流水线
///
/// Owns the mail session and the OCR client; every tool operation runs
/// its steps strictly in sequence and aborts on the first failure.
pub struct Gateway<M> {
    session: MailSession<M>,
    ocr: Option<Arc<dyn OcrService>>,
    clock: Arc<dyn TimeProvider>,
    output_dir: PathBuf,
}

impl<M: MailService> Gateway<M> {
    pub fn new(
        session: MailSession<M>,
        ocr: Option<Arc<dyn OcrService>>,
        clock: Arc<dyn TimeProvider>,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            session,
            ocr,
            clock,
            output_dir,
        }
    }

    pub fn session(&self) -> &MailSession<M> {
        &self.session
    }

    /// 连通性探针
    pub fn ping(&self) -> &'static str {
        "pong"
    }

    /// 获取收件箱最新一封邮件的主题
    pub async fn fetch_last_email(&self) -> AppResult<String> {
        self.session.setup().await?;

        let inbox = self
            .session
            .resolve_mailbox(&MailboxRole::SpecialUse(SpecialUse::Inbox))
            .await?
            .ok_or_else(|| AppError::MailboxNotFound("inbox".to_string()))?;

        self.session.latest_subject(&inbox).await
    }

    /// 搜索收件箱中某发件人最近的未读邮件
    pub async fn search(
        &self,
        sender: &str,
        since_days: Option<u64>,
    ) -> AppResult<Vec<EmailMessage>> {
        self.session.setup().await?;

        let inbox = self
            .session
            .resolve_mailbox(&MailboxRole::SpecialUse(SpecialUse::Inbox))
            .await?
            .ok_or_else(|| AppError::MailboxNotFound("inbox".to_string()))?;

        let spec = SearchSpec {
            only_unseen: true,
            from: Some(sender.to_string()),
            since_days_ago: Some(since_days.unwrap_or(DEFAULT_SEARCH_WINDOW_DAYS)),
        };
        let criteria = search::build(&spec, self.clock.today());

        let messages = self.session.search_messages(&inbox, &criteria).await?;
        Ok(messages.iter().map(EmailMessage::from_message).collect())
    }

    /// 拉取 receipts 邮箱中最近的带附件邮件
    pub async fn fetch_receipt_emails(&self) -> AppResult<Vec<EmailMessage>> {
        let messages = self.latest_receipts().await?;
        Ok(messages.iter().map(EmailMessage::from_message).collect())
    }

    /// 保存最新回执的 PDF 附件到输出目录
    pub async fn save_receipt_attachment(&self) -> AppResult<PathBuf> {
        let attachment = self.latest_receipt_attachment().await?;

        fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(&attachment.filename);
        fs::write(&path, &attachment.data)?;

        info!("Saved receipt attachment to {:?}", path);
        Ok(path)
    }

    /// 收据流水线：取件 → 解码 → OCR → 汇总 markdown
    pub async fn run_magic(&self) -> AppResult<String> {
        let attachment = self.latest_receipt_attachment().await?;
        let ocr = self.require_ocr()?;

        let upload = UploadFile {
            name: attachment.filename.clone(),
            content_type: mime::APPLICATION_PDF.to_string(),
            data: attachment.data,
        };
        let file_ref = ocr
            .upload(&upload)
            .await
            .map_err(|e| AppError::Ocr(e.to_string()))?;
        info!("Uploaded receipt, file id: {}", file_ref.id);

        let url = ocr
            .signed_url(&file_ref.id)
            .await
            .map_err(|e| AppError::Ocr(e.to_string()))?;

        let response = ocr
            .ocr(&OcrSource::Document { url })
            .await
            .map_err(|e| AppError::Ocr(e.to_string()))?;

        let document = assemble_document(response.pages);

        fs::create_dir_all(&self.output_dir)?;
        let result_path = self.output_dir.join(RESULT_FILE_NAME);
        fs::write(&result_path, &document)?;
        info!("Wrote OCR result to {:?}", result_path);

        Ok(document)
    }

    /// 断开会话，失败只记录，不覆盖原始结果
    pub async fn shutdown(&self) {
        if let Err(e) = self.session.disconnect().await {
            tracing::warn!("Failed to disconnect mail session: {}", e);
        }
    }

    async fn latest_receipts(&self) -> AppResult<Vec<Message>> {
        self.session.setup().await?;

        let mailbox = self
            .session
            .resolve_mailbox(&MailboxRole::Named("receipts".to_string()))
            .await?
            .ok_or_else(|| AppError::MailboxNotFound("receipts".to_string()))?;

        self.session
            .fetch_latest_with_attachments(&mailbox, LATEST_RECEIPT_CANDIDATES)
            .await
    }

    async fn latest_receipt_attachment(&self) -> AppResult<ReceiptAttachment> {
        let messages = self.latest_receipts().await?;
        let latest = messages.first().ok_or(AppError::NoReceiptFound)?;

        let part = filter::select_receipt_attachment(latest).ok_or(AppError::NoAttachment)?;
        let data = decoder::decode(part)?;

        Ok(ReceiptAttachment {
            filename: part
                .filename
                .clone()
                .unwrap_or_else(|| FALLBACK_ATTACHMENT_NAME.to_string()),
            data,
        })
    }

    fn require_ocr(&self) -> AppResult<&Arc<dyn OcrService>> {
        self.ocr
            .as_ref()
            .ok_or_else(|| AppError::Config("OCR service is not configured".to_string()))
    }
}

/// Fold OCR pages into one document, ordered by page index.
fn assemble_document(mut pages: Vec<OcrPage>) -> String {
    pages.sort_by_key(|p| p.index);

    pages
        .iter()
        .map(|page| format!("PAGE: {}\n{}", page.index, page.markdown))
        .collect::<Vec<_>>()
        .join("\n\n")
}
