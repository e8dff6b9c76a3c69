use crate::core::models::{Message, MessagePart};

/// 判断邮件是否带有 PDF 回执附件
pub fn has_receipt_attachment(message: &Message) -> bool {
    message.attachments.iter().any(is_pdf_part)
}

/// 选取第一个 PDF 附件（按附件顺序，先到先得）
pub fn select_receipt_attachment(message: &Message) -> Option<&MessagePart> {
    message.attachments.iter().find(|p| is_pdf_part(p))
}

/// Coarse pre-filter: keep messages that carry any attachment at all.
///
/// Cheaper than content-type inspection, applied to the latest fetch batch
/// before `select_receipt_attachment` looks inside.
pub fn retain_with_attachments(messages: Vec<Message>) -> Vec<Message> {
    messages
        .into_iter()
        .filter(|m| !m.attachments.is_empty())
        .collect()
}

fn is_pdf_part(part: &MessagePart) -> bool {
    part.content_type == "application" && part.content_subtype == "pdf"
}
