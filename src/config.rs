use log::info;
use std::env;

use crate::error::{Error, Result};

pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Vector size of `text-embedding-3-small`. Other models need a different value:
/// `text-embedding-3-large` is 3072, `text-embedding-ada-002` is 1536.
pub const DEFAULT_EMBEDDING_DIMENSION: u64 = 1536;

/// Connection settings shared by every subcommand.
///
/// Values come from the process environment, after `.env` has been loaded.
#[derive(Debug, Clone)]
pub struct Settings {
    pub qdrant_url: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub embedding_model: String,
    pub embedding_dimension: u64,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup, so callers other than
    /// the process environment can supply values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let embedding_dimension = match non_empty("EMBEDDING_DIMENSION") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(Error::Config(format!(
                        "EMBEDDING_DIMENSION must be a positive integer, got `{}`",
                        raw
                    )))
                }
            },
            None => DEFAULT_EMBEDDING_DIMENSION,
        };

        let settings = Self {
            qdrant_url: non_empty("QDRANT_URL").unwrap_or_else(|| DEFAULT_QDRANT_URL.to_string()),
            openai_api_key: non_empty("OPENAI_API_KEY"),
            openai_base_url: non_empty("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            embedding_model: non_empty("EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            embedding_dimension,
        };

        info!(
            "Using Qdrant at {} with model {} ({} dims)",
            settings.qdrant_url, settings.embedding_model, settings.embedding_dimension
        );

        Ok(settings)
    }

    /// The API key, required by every subcommand that embeds text.
    pub fn api_key(&self) -> Result<&str> {
        self.openai_api_key
            .as_deref()
            .ok_or_else(|| Error::config("OPENAI_API_KEY must be set"))
    }
}
