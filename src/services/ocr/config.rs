use crate::core::error::{AppError, AppResult};

/// OCR 服务配置
#[derive(Clone, Debug)]
pub struct OcrConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

impl OcrConfig {
    /// 从.env文件创建配置
    pub fn from_env() -> AppResult<Self> {
        dotenv::dotenv().ok();

        let config = Self {
            api_key: Self::env_required("MISTRAL_API_KEY")?,
            base_url: Self::env_or("MISTRAL_BASE_URL", "https://api.mistral.ai"),
            model: Self::env_or("MISTRAL_OCR_MODEL", "mistral-ocr-latest"),
        };

        config.validate()?;
        Ok(config)
    }

    /// 验证配置有效性
    fn validate(&self) -> AppResult<()> {
        if self.api_key.is_empty() {
            return Err(AppError::Config("OCR API key cannot be empty".to_string()));
        }
        if self.base_url.is_empty() {
            return Err(AppError::Config("OCR base URL cannot be empty".to_string()));
        }

        Ok(())
    }

    /// 读取环境变量或使用默认值
    fn env_or(key: &str, default: &str) -> String {
        std::env::var(key).unwrap_or_else(|_| default.to_string())
    }

    /// 读取必需的环境变量
    fn env_required(key: &str) -> AppResult<String> {
        std::env::var(key).map_err(|_| AppError::Config(format!("{} not set in .env file", key)))
    }
}
