mod api;
mod client;
mod oauth;

pub use client::{FlickrClient, FlickrClientOptions};
