use thiserror::Error;

#[derive(Error, Debug)]
pub enum LanguageModelError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// The request to the provider failed or the parsing of the response
    /// failed.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The provider rejected this particular payload (HTTP 400), e.g. an image
    /// it cannot download or decode. Retrying the same request may succeed.
    #[error("Bad request: {0}")]
    BadRequest(String),
    /// The request returns a non-OK status code
    #[error("Status error: {1} (Status {0})")]
    StatusCode(reqwest::StatusCode, String),
    /// The response from the provider was unexpected. (e.g. no choices returned
    /// in an `OpenAI` completion)
    #[error("Invariant from {0}: {1}")]
    Invariant(&'static str, String),
    /// The model refused to process the input. (e.g. `OpenAI` refusal)
    #[error("Refusal: {0}")]
    Refusal(String),
}

impl LanguageModelError {
    #[must_use]
    pub fn is_bad_request(&self) -> bool {
        matches!(self, Self::BadRequest(_))
    }
}

pub type LanguageModelResult<T> = Result<T, LanguageModelError>;

#[derive(Error, Debug)]
pub enum HostError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The service rejected the credential or the request signature. The
    /// caller may recover by authorizing again.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    /// The service answered with `stat: fail`.
    #[error("API error {code}: {message}")]
    Api { code: i64, message: String },
    #[error("Status error: {1} (Status {0})")]
    StatusCode(reqwest::StatusCode, String),
    #[error("Invariant from {0}: {1}")]
    Invariant(&'static str, String),
}

impl HostError {
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}

pub type HostResult<T> = Result<T, HostError>;
