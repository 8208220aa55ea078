//! Scriptable stand-ins for the external services, for use in tests.

mod model;
mod photo_host;

pub use model::{MockGenerateResult, MockLanguageModel};
pub use photo_host::{HostCall, MockOAuthProvider, MockPhotoHost, WriteKind};
