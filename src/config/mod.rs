use serde::Deserialize;
use std::env;

use crate::error::AppError;

#[derive(Debug, Clone, Deserialize)]
pub struct IamConfig {
    pub port: u16,
    pub mongodb: MongoConfig,
    pub smtp: SmtpConfig,
    pub keys: KeyConfig,
    pub rate_limit: RateLimitConfig,
    /// Configurable role names, in bit order (bit 0 first). At most 63.
    pub role_names: Vec<String>,
    /// Max-age of the flow session cookie, in seconds.
    pub session_max_age: u64,
    /// Max-age of the registration session cookie, in seconds.
    pub registration_max_age: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub sender: String,
    pub enabled: bool,
}

/// HMAC keys, hex-encoded in the environment.
#[derive(Debug, Clone, Deserialize)]
pub struct KeyConfig {
    pub session_key: Vec<u8>,
    pub code_key: Vec<u8>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub per_second: u32,
    pub burst: u32,
}

// Dev-only fallback keys so the service boots without a .env; production
// refuses to start without real ones.
const DEV_KEY_HEX: &str = "6465762d6f6e6c792d6b65792d6465762d6f6e6c792d6b6579";

impl IamConfig {
    pub fn load() -> Result<Self, AppError> {
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        Ok(IamConfig {
            port: get_env("PORT", Some("8080"), is_prod)?.parse().unwrap_or(8080),
            mongodb: MongoConfig {
                uri: get_env("MONGODB_URI", Some("mongodb://localhost:27017"), is_prod)?,
                database: get_env("MONGODB_DATABASE", Some("iam_db"), is_prod)?,
            },
            smtp: SmtpConfig {
                host: get_env("SMTP_HOST", Some("smtp.gmail.com"), is_prod)?,
                port: get_env("SMTP_PORT", Some("587"), is_prod)?
                    .parse()
                    .unwrap_or(587),
                username: get_env("SMTP_USERNAME", Some(""), is_prod)?,
                password: get_env("SMTP_PASSWORD", Some(""), is_prod)?,
                sender: get_env("SMTP_SENDER", Some("noreply@example.com"), is_prod)?,
                enabled: env::var("SMTP_ENABLED")
                    .unwrap_or_else(|_| "false".to_string())
                    .parse()
                    .unwrap_or(false),
            },
            keys: KeyConfig {
                session_key: hex_key("SESSION_HMAC_KEY", is_prod)?,
                code_key: hex_key("CODE_HMAC_KEY", is_prod)?,
            },
            rate_limit: RateLimitConfig {
                per_second: get_env("RATE_LIMIT_PER_SECOND", Some("5"), is_prod)?
                    .parse()
                    .unwrap_or(5),
                burst: get_env("RATE_LIMIT_BURST", Some("10"), is_prod)?
                    .parse()
                    .unwrap_or(10),
            },
            role_names: get_env("ROLE_NAMES", Some("admin,clinician,patient"), is_prod)?
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            session_max_age: 1800,
            registration_max_age: 600,
        })
    }
}

fn hex_key(key: &str, is_prod: bool) -> Result<Vec<u8>, AppError> {
    let raw = get_env(key, Some(DEV_KEY_HEX), is_prod)?;
    let bytes = hex::decode(&raw)
        .map_err(|_| AppError::ConfigError(anyhow::anyhow!("{} is not valid hex", key)))?;
    if bytes.is_empty() {
        return Err(AppError::ConfigError(anyhow::anyhow!("{} must not be empty", key)));
    }
    Ok(bytes)
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}
