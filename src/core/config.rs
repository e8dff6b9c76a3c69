use crate::core::error::AppResult;
use crate::services::email::MailConfig;
use crate::services::ocr::OcrConfig;
use std::env;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub mail: MailConfig,
    pub ocr: Option<OcrConfig>,
    pub output_dir: PathBuf,
}

impl AppConfig {
    /// Pure constructor for testing
    pub fn new(mail: MailConfig, ocr: Option<OcrConfig>, output_dir: PathBuf) -> Self {
        Self {
            mail,
            ocr,
            output_dir,
        }
    }

    /// Load from environment variables
    pub fn from_env() -> AppResult<Self> {
        dotenv::dotenv().ok();

        // Mail credentials are required before the pipeline ever starts
        let mail = MailConfig::from_env()?;

        // OCR credentials are only needed by the OCR-backed commands
        let ocr = match OcrConfig::from_env() {
            Ok(c) => Some(c),
            Err(e) => {
                tracing::warn!("OCR configuration unavailable: {}, OCR tools disabled", e);
                None
            }
        };

        let output_dir = env::var("OUTPUT_DIR").unwrap_or_else(|_| "output".to_string());

        Ok(Self {
            mail,
            ocr,
            output_dir: output_dir.into(),
        })
    }
}
