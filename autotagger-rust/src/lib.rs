pub mod albums;
pub mod analysis;
pub mod config;
pub mod credential_store;
mod errors;
pub mod photo_filter;
pub mod pipeline;
pub mod writer;

pub use errors::*;
