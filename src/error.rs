use qdrant_client::QdrantError;
use thiserror::Error;
use validator::ValidationErrors;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error types for the store, the embedding provider and the edit plans
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Embedding provider rejected the API key")]
    Unauthorized,

    #[error("Embedding provider error: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    Store(String),

    #[error("Payload error: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Failed to read plan: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn config(msg: &str) -> Self {
        Error::Config(msg.to_string())
    }

    pub fn not_found(msg: &str) -> Self {
        Error::NotFound(msg.to_string())
    }

    pub fn invalid_input(msg: &str) -> Self {
        Error::InvalidInput(msg.to_string())
    }

    pub fn store(msg: &str) -> Self {
        Error::Store(msg.to_string())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

impl From<QdrantError> for Error {
    fn from(error: QdrantError) -> Self {
        Error::Store(error.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        Error::Embedding(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_keep_message() {
        assert_eq!(
            Error::not_found("hr_glossary/42").to_string(),
            "Record not found: hr_glossary/42"
        );
        assert_eq!(
            Error::config("OPENAI_API_KEY must be set").to_string(),
            "Configuration error: OPENAI_API_KEY must be set"
        );
        assert!(Error::not_found("x").is_not_found());
        assert!(!Error::store("x").is_not_found());
    }

    #[test]
    fn test_json_errors_convert_to_payload_errors() {
        let err = serde_json::from_str::<Vec<String>>("{").unwrap_err();
        let err: Error = err.into();
        assert!(matches!(err, Error::Payload(_)));
    }
}
