use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};

/// Runtime configuration loaded from environment variables.
/// Every value has a default; only malformed values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub ollama_url: String,
    pub model: String,
    /// Per-call deadline for model requests. `None` waits indefinitely.
    pub llm_timeout_secs: Option<u64>,
    /// Template JSON file. `None` selects the template bundled with the binary.
    pub template_path: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub section_concurrency: usize,
    pub document_concurrency: usize,
    pub max_prompt_chars: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let config = Config {
            ollama_url: env_or("OLLAMA_URL", "http://localhost:11434"),
            model: env_or("LLM_MODEL", "llama3.2:1b"),
            llm_timeout_secs: optional_env("LLM_TIMEOUT_SECS")?,
            template_path: std::env::var("TEMPLATE_PATH").ok().map(PathBuf::from),
            output_dir: PathBuf::from(env_or("OUTPUT_DIR", "json_outputs")),
            section_concurrency: parse_env("SECTION_CONCURRENCY", 8)?,
            document_concurrency: parse_env("DOCUMENT_CONCURRENCY", 4)?,
            max_prompt_chars: parse_env("MAX_PROMPT_CHARS", 7000)?,
            port: parse_env("PORT", 8080)?,
            rust_log: env_or("RUST_LOG", "info"),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.section_concurrency == 0 {
            bail!("SECTION_CONCURRENCY must be at least 1");
        }
        if self.document_concurrency == 0 {
            bail!("DOCUMENT_CONCURRENCY must be at least 1");
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ollama_url: "http://localhost:11434".to_string(),
            model: "llama3.2:1b".to_string(),
            llm_timeout_secs: None,
            template_path: None,
            output_dir: PathBuf::from("json_outputs"),
            section_concurrency: 8,
            document_concurrency: 4,
            max_prompt_chars: 7000,
            port: 8080,
            rust_log: "info".to_string(),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}

fn optional_env<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        _ => Ok(None),
    }
}
