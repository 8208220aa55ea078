use tagger_sdk::{HostError, LanguageModelError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AutotaggerError {
    /// A required setting is missing or invalid. Raised before any network
    /// call is made.
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Invalid settings file: {0}")]
    Settings(#[from] toml::de::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Photo host error: {0}")]
    Host(#[from] HostError),
    #[error("Authorization failed after {attempts} attempts: {message}")]
    AuthorizationExhausted { attempts: usize, message: String },
    #[error("Could not obtain a verification code: {0}")]
    Verifier(#[source] BoxedError),
}

/// Why a single photo could not be analyzed. Always recoverable: the photo is
/// skipped and the run continues.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Photo has no downloadable image URL")]
    MissingImage,
    #[error("Model rejected the request {attempts} times: {source}")]
    RetriesExhausted {
        attempts: usize,
        source: LanguageModelError,
    },
    #[error("Language model error: {0}")]
    Model(#[from] LanguageModelError),
    #[error("Cannot serialize the photo context: {0}")]
    Context(#[from] serde_json::Error),
}

pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;
