use anyhow::{Context, Result};
use mail_parser::{MessageParser, MimeHeaders};

use crate::core::models::{Header, Message, MessagePart};

/// 邮件解析器 - 将原始 RFC822 数据解析为领域模型
pub struct EmailParser;

impl EmailParser {
    /// 解析完整邮件
    pub fn parse_message(raw: &[u8]) -> Result<Message> {
        let parsed = MessageParser::default()
            .parse(raw)
            .context("Failed to parse email")?;

        let mut attachments = Vec::new();
        for part in &parsed.parts {
            if part.is_text() && part.attachment_name().is_none() {
                continue;
            }

            let (content_type, content_subtype) = part
                .content_type()
                .map(|ct| {
                    (
                        ct.c_type.to_string(),
                        ct.subtype().unwrap_or("octet-stream").to_string(),
                    )
                })
                .unwrap_or_else(|| ("application".to_string(), "octet-stream".to_string()));

            // multipart containers are structure, not attachments
            if content_type == "multipart" {
                continue;
            }

            attachments.push(MessagePart {
                content_type,
                content_subtype,
                filename: part.attachment_name().map(|n| n.to_string()),
                data: part.contents().to_vec(),
            });
        }

        Ok(Message {
            subject: parsed.subject().unwrap_or("").to_string(),
            text_body: parsed.body_text(0).map(|t| t.to_string()),
            html_body: parsed.body_html(0).map(|t| t.to_string()),
            attachments,
        })
    }

    /// 仅解析邮件头
    pub fn parse_header(raw: &[u8]) -> Result<Header> {
        let parsed = MessageParser::default()
            .parse(raw)
            .context("Failed to parse email header")?;

        Ok(Header {
            subject: parsed.subject().unwrap_or("").to_string(),
        })
    }
}
