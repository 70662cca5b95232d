use anyhow::{bail, Context, Result};

const DEFAULT_LLM_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub openai_api_key: String,
    pub llm_api_url: String,
    pub llm_timeout_secs: u64,
    pub generation: GenerationConfig,
    /// Present only when PDF compilation is enabled.
    pub storage: Option<StorageConfig>,
    pub port: u16,
    pub rust_log: String,
}

/// Sampling parameters for resume generation.
/// Passed explicitly into the pipeline; nothing reads these from the environment later.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            max_tokens: 800,
            temperature: 0.7,
        }
    }
}

impl GenerationConfig {
    pub fn new(model: String, max_tokens: u32, temperature: f32) -> Result<Self> {
        if !(0.0..=2.0).contains(&temperature) {
            bail!("TEMPERATURE must be between 0 and 2, got {temperature}");
        }
        if max_tokens == 0 {
            bail!("MAX_TOKENS must be greater than 0");
        }
        Ok(Self {
            model,
            max_tokens,
            temperature,
        })
    }
}

/// S3 / MinIO settings for compiled PDF artifacts.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = GenerationConfig::default();
        let generation = GenerationConfig::new(
            std::env::var("LLM_MODEL").unwrap_or(defaults.model),
            parse_env("MAX_TOKENS", defaults.max_tokens)?,
            parse_env("TEMPERATURE", defaults.temperature)?,
        )?;

        let storage = if parse_flag("ENABLE_PDF_COMPILATION") {
            Some(StorageConfig {
                s3_bucket: require_env("S3_BUCKET")?,
                s3_endpoint: require_env("S3_ENDPOINT")?,
                aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
                aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            })
        } else {
            None
        };

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            openai_api_key: require_env("OPENAI_API_KEY")?,
            llm_api_url: std::env::var("LLM_API_URL")
                .unwrap_or_else(|_| DEFAULT_LLM_API_URL.to_string()),
            llm_timeout_secs: parse_env("LLM_TIMEOUT_SECS", 60)?,
            generation,
            storage,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value: '{raw}'")),
        Err(_) => Ok(default),
    }
}

fn parse_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}
