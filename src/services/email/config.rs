use crate::core::error::{AppError, AppResult};

/// 邮件服务配置
#[derive(Clone, Debug)]
pub struct MailConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl MailConfig {
    /// 从.env文件创建配置
    pub fn from_env() -> AppResult<Self> {
        dotenv::dotenv().ok();

        let config = Self {
            host: Self::env_required("IMAP_HOST")?,
            port: Self::env_parse("IMAP_PORT", 993)?,
            username: Self::env_required("IMAP_USERNAME")?,
            password: Self::env_required("IMAP_PASSWORD")?,
        };

        config.validate()?;
        Ok(config)
    }

    /// 验证配置有效性
    fn validate(&self) -> AppResult<()> {
        if self.port == 0 {
            return Err(AppError::Config(format!("Invalid IMAP port: {}", self.port)));
        }
        if self.host.is_empty() {
            return Err(AppError::Config("IMAP host cannot be empty".to_string()));
        }
        if self.username.is_empty() {
            return Err(AppError::Config("IMAP username cannot be empty".to_string()));
        }

        Ok(())
    }

    /// 读取并解析环境变量，失败时使用默认值
    fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> AppResult<T>
    where
        T::Err: std::fmt::Display,
    {
        match std::env::var(key) {
            Ok(val) => val
                .parse()
                .map_err(|e| AppError::Config(format!("Invalid {}: {}", key, e))),
            Err(_) => Ok(default),
        }
    }

    /// 读取必需的环境变量
    fn env_required(key: &str) -> AppResult<String> {
        std::env::var(key).map_err(|_| AppError::Config(format!("{} not set in .env file", key)))
    }
}
