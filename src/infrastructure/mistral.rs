use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

use crate::services::ocr::{FileRef, OcrConfig, OcrResponse, OcrService, OcrSource, UploadFile};

#[derive(Debug, Deserialize)]
struct SignedUrlResponse {
    url: String,
}

/// Mistral files + OCR API client.
pub struct MistralClient {
    config: OcrConfig,
    client: Client,
}

impl MistralClient {
    pub fn new(config: OcrConfig) -> Self {
        Self {
            config,
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .expect("Failed to create reqwest client"),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl OcrService for MistralClient {
    async fn upload(&self, file: &UploadFile) -> Result<FileRef> {
        info!("Uploading {} ({} bytes) for OCR", file.name, file.data.len());

        let part = multipart::Part::bytes(file.data.clone())
            .file_name(file.name.clone())
            .mime_str(&file.content_type)
            .context("Invalid upload content type")?;
        let form = multipart::Form::new()
            .text("purpose", "ocr")
            .part("file", part);

        let response = self
            .client
            .post(self.endpoint("/v1/files"))
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await
            .context("Failed to send file upload request")?
            .error_for_status()
            .context("File upload rejected")?;

        let file_ref: FileRef = response
            .json()
            .await
            .context("Failed to parse upload response")?;
        debug!("Uploaded file id: {}", file_ref.id);
        Ok(file_ref)
    }

    async fn signed_url(&self, file_id: &str) -> Result<String> {
        let response = self
            .client
            .get(self.endpoint(&format!("/v1/files/{}/url", file_id)))
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .context("Failed to request signed URL")?
            .error_for_status()
            .context("Signed URL request rejected")?;

        let signed: SignedUrlResponse = response
            .json()
            .await
            .context("Failed to parse signed URL response")?;
        Ok(signed.url)
    }

    async fn ocr(&self, source: &OcrSource) -> Result<OcrResponse> {
        let document = match source {
            OcrSource::Document { url } => json!({
                "type": "document_url",
                "document_url": url,
            }),
            OcrSource::Image { url } => json!({
                "type": "image_url",
                "image_url": url,
            }),
        };

        let body = json!({
            "model": self.config.model,
            "document": document,
        });

        let response = self
            .client
            .post(self.endpoint("/v1/ocr"))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .context("Failed to send OCR request")?
            .error_for_status()
            .context("OCR request rejected")?;

        response.json().await.context("Failed to parse OCR response")
    }
}
