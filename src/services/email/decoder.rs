use base64::alphabet;
use base64::engine::{DecodePaddingMode, Engine, GeneralPurpose, GeneralPurposeConfig};
use thiserror::Error;

use crate::core::models::MessagePart;

/// Standard-alphabet engine with optional padding. Encoded mail bodies come
/// through wrapped and sometimes unpadded, so strict padding would reject
/// otherwise valid payloads.
const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Failed to read attachment data as UTF-8 text")]
    InputEncoding,
    #[error("Failed to decode attachment data as Base64")]
    Base64,
}

/// 按邮件服务商对 PDF 附件的编码方式解码附件数据
///
/// The provider stores the binary as transport-safe Base64 text (`-`/`_`
/// in place of `+`/`/`), wrapped to mail line lengths. Translate back to
/// the standard alphabet, skip anything outside it, then decode.
pub fn decode(part: &MessagePart) -> Result<Vec<u8>, DecodeError> {
    let text = std::str::from_utf8(&part.data).map_err(|_| DecodeError::InputEncoding)?;

    let normalized: String = text
        .chars()
        .filter_map(|c| match c {
            '-' => Some('+'),
            '_' => Some('/'),
            'A'..='Z' | 'a'..='z' | '0'..='9' | '+' | '/' | '=' => Some(c),
            _ => None,
        })
        .collect();

    LENIENT_STANDARD
        .decode(normalized)
        .map_err(|_| DecodeError::Base64)
}
