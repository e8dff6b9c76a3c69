pub mod config;

pub use config::OcrConfig;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

/// A file handed to the OCR provider for processing.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Reference to an uploaded file.
#[derive(Debug, Clone, Deserialize)]
pub struct FileRef {
    pub id: String,
}

/// What the OCR run should read from.
#[derive(Debug, Clone)]
pub enum OcrSource {
    Document { url: String },
    Image { url: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrPage {
    pub index: u32,
    pub markdown: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrResponse {
    pub pages: Vec<OcrPage>,
}

/// Remote OCR/upload operations consumed by the gateway.
///
/// The three-step upload → signed URL → OCR sequence mirrors the provider
/// API; retry and backoff are left to the caller or the provider client.
#[async_trait]
pub trait OcrService: Send + Sync {
    async fn upload(&self, file: &UploadFile) -> Result<FileRef>;
    async fn signed_url(&self, file_id: &str) -> Result<String>;
    async fn ocr(&self, source: &OcrSource) -> Result<OcrResponse>;
}
