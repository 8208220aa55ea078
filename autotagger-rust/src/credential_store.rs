use crate::{errors::BoxedError, AutotaggerError};
use std::{io::Write as _, path::PathBuf};
use tagger_sdk::{Credential, OAuthProvider, Permission};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

/// Environment variable holding a serialized credential.
pub const CREDENTIAL_ENV: &str = "FLICKR_OAUTH_TOKEN";

/// Persists the OAuth access credential between runs.
///
/// A credential is read from the local file first, then from the serialized
/// value supplied through the environment. Writes always go to the file.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
    serialized: Option<String>,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>, serialized: Option<String>) -> Self {
        Self {
            path: path.into(),
            serialized,
        }
    }

    /// Load the stored credential. Unreadable or malformed sources are logged
    /// and treated as absent so that the caller falls back to authorizing.
    #[must_use]
    pub fn load(&self) -> Option<Credential> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(credential) => {
                    debug!(path = %self.path.display(), "loaded credential from file");
                    return Some(credential);
                }
                Err(error) => {
                    warn!(path = %self.path.display(), %error, "ignoring malformed credential file");
                }
            },
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
            Err(error) => {
                warn!(path = %self.path.display(), %error, "cannot read credential file");
            }
        }

        let serialized = self.serialized.as_deref()?;
        match serde_json::from_str(serialized) {
            Ok(credential) => {
                debug!("loaded credential from {CREDENTIAL_ENV}");
                Some(credential)
            }
            Err(error) => {
                warn!(%error, "ignoring malformed {CREDENTIAL_ENV}");
                None
            }
        }
    }

    /// Write the credential to the file. On unix the file is readable by
    /// its owner only.
    pub fn save(&self, credential: &Credential) -> Result<(), AutotaggerError> {
        let content = serde_json::to_string_pretty(credential)?;

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        std::os::unix::fs::OpenOptionsExt::mode(&mut options, 0o600);
        let mut file = options.open(&self.path)?;
        // The creation mode does not apply to a file that already exists.
        #[cfg(unix)]
        file.set_permissions(std::os::unix::fs::PermissionsExt::from_mode(0o600))?;
        file.write_all(content.as_bytes())?;

        info!(path = %self.path.display(), "saved credential");
        Ok(())
    }
}

/// Obtains the verification code a human receives after approving access at
/// the authorization URL.
#[async_trait::async_trait]
pub trait VerifierProvider: Send + Sync {
    async fn verifier(&self, authorize_url: &str) -> Result<String, BoxedError>;
}

/// Prints the authorization URL and reads the code from standard input.
#[derive(Debug, Default)]
pub struct ConsoleVerifier;

#[async_trait::async_trait]
impl VerifierProvider for ConsoleVerifier {
    async fn verifier(&self, authorize_url: &str) -> Result<String, BoxedError> {
        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(
                format!(
                    "Open this URL in your browser to authorize the application:\n{authorize_url}\n\
                     Enter the verification code: "
                )
                .as_bytes(),
            )
            .await?;
        stdout.flush().await?;

        let mut line = String::new();
        let read = BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await?;
        if read == 0 {
            return Err("standard input closed before a code was entered".into());
        }
        Ok(line.trim().to_string())
    }
}

/// Returns a code supplied ahead of time.
#[derive(Debug, Clone)]
pub struct StaticVerifier {
    code: String,
}

impl StaticVerifier {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}

#[async_trait::async_trait]
impl VerifierProvider for StaticVerifier {
    async fn verifier(&self, authorize_url: &str) -> Result<String, BoxedError> {
        debug!(authorize_url, "using pre-supplied verification code");
        Ok(self.code.clone())
    }
}

/// Return a credential the service accepts with write access.
///
/// A stored credential is validated first. When it is missing, rejected or
/// read-only, the interactive flow runs; an unauthorized answer during the flow
/// restarts it, at most `max_attempts` times. Other errors propagate as is.
pub async fn authorize(
    provider: &dyn OAuthProvider,
    store: &CredentialStore,
    verifier: &dyn VerifierProvider,
    max_attempts: usize,
) -> Result<Credential, AutotaggerError> {
    if let Some(stored) = store.load() {
        match provider.check_token(&stored).await {
            Ok(checked) if checked.access_level == Permission::Read => {
                warn!("stored credential is read-only, authorizing again");
            }
            Ok(checked) => {
                info!(username = %checked.username, "stored credential is valid");
                return Ok(checked);
            }
            Err(error) if error.is_unauthorized() => {
                warn!(%error, "stored credential was rejected, authorizing again");
            }
            Err(error) => return Err(error.into()),
        }
    }

    let mut last_error = String::new();
    for attempt in 1..=max_attempts {
        match authorization_flow(provider, verifier).await {
            Ok(credential) => {
                store.save(&credential)?;
                info!(username = %credential.username, attempt, "authorization complete");
                return Ok(credential);
            }
            Err(AutotaggerError::Host(error)) if error.is_unauthorized() => {
                warn!(%error, attempt, max_attempts, "authorization was rejected");
                last_error = error.to_string();
            }
            Err(error) => return Err(error),
        }
    }

    Err(AutotaggerError::AuthorizationExhausted {
        attempts: max_attempts,
        message: last_error,
    })
}

async fn authorization_flow(
    provider: &dyn OAuthProvider,
    verifier: &dyn VerifierProvider,
) -> Result<Credential, AutotaggerError> {
    let request_token = provider.request_token().await?;
    let url = provider.authorize_url(&request_token, Permission::Write);
    let code = verifier
        .verifier(&url)
        .await
        .map_err(AutotaggerError::Verifier)?;
    Ok(provider.access_token(&request_token, &code).await?)
}
