mod client_utils;
mod errors;
pub mod flickr;
mod language_model;
pub mod openai;
mod photo_host;
pub mod tagger_sdk_test;
mod types;
mod types_ext;
mod usage_ext;

pub use errors::*;
pub use language_model::LanguageModel;
pub use photo_host::{OAuthProvider, PhotoHost};
pub use types::*;
