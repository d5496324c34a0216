use serde::Deserialize;
use service_core::config::{self as core_config, get_env};
use service_core::error::AppError;
use std::env;

/// Upload size limit used when `MAX_UPLOAD_BYTES` is not set.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub environment: Environment,
    pub model: ModelConfig,
    pub cors: CorsConfig,
    pub upload: UploadConfig,
    pub rate_limit: RateLimitConfig,
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Test,
    Prod,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub model_path: String,
    pub labels_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    pub frontend_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub max_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Requests per minute per client IP on `/api`; 0 disables limiting.
    pub per_minute: u32,
}

impl ClassifierConfig {
    pub fn load() -> Result<Self, AppError> {
        // Load common config (handles .env and APP__ prefix)
        let common_config = core_config::Config::load()?;

        let environment: Environment = env::var("ENVIRONMENT")
            .unwrap_or_else(|_| "dev".to_string())
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;
        let is_prod = environment == Environment::Prod;

        let config = ClassifierConfig {
            common: common_config,
            environment,
            model: ModelConfig {
                model_path: get_env("MODEL_PATH", Some("model.onnx"), is_prod)?,
                labels_path: get_env("LABELS_PATH", Some("labels.txt"), is_prod)?,
            },
            cors: CorsConfig {
                frontend_url: get_env("FRONTEND_URL", Some("http://localhost:5173"), is_prod)?,
            },
            upload: UploadConfig {
                max_bytes: parse_number(
                    "MAX_UPLOAD_BYTES",
                    &get_env(
                        "MAX_UPLOAD_BYTES",
                        Some(&DEFAULT_MAX_UPLOAD_BYTES.to_string()),
                        false,
                    )?,
                )?,
            },
            rate_limit: RateLimitConfig {
                per_minute: parse_number(
                    "RATE_LIMIT_PER_MINUTE",
                    &get_env("RATE_LIMIT_PER_MINUTE", Some("0"), false)?,
                )?,
            },
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.upload.max_bytes == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "MAX_UPLOAD_BYTES must be positive"
            )));
        }

        if self.environment == Environment::Prod && self.cors.frontend_url == "*" {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "Wildcard CORS origin not allowed in production"
            )));
        }

        Ok(())
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Dev),
            "test" => Ok(Environment::Test),
            "prod" | "production" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, AppError> {
    value.trim().parse().map_err(|_| {
        AppError::ConfigError(anyhow::anyhow!("{} must be a number, got '{}'", key, value))
    })
}
