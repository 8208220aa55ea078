//! OAuth 1.0a request signing (HMAC-SHA1), as required by the Flickr API.

use crate::{HostError, HostResult};
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use hmac::{Hmac, Mac};
use rand::{distributions::Alphanumeric, Rng};
use sha1::Sha1;
use std::{
    collections::HashMap,
    time::{SystemTime, UNIX_EPOCH},
};

type HmacSha1 = Hmac<Sha1>;

const PROVIDER: &str = "flickr";

/// RFC 3986 percent encoding; only unreserved characters pass through.
pub(crate) fn percent_encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// The signature base string: `METHOD&url&normalized-params`.
pub(crate) fn signature_base_string(
    http_method: &str,
    url: &str,
    params: &[(String, String)],
) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(key, value)| (percent_encode(key), percent_encode(value)))
        .collect();
    encoded.sort();

    let normalized = encoded
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        http_method.to_ascii_uppercase(),
        percent_encode(url),
        percent_encode(&normalized)
    )
}

pub(crate) fn sign(
    http_method: &str,
    url: &str,
    params: &[(String, String)],
    consumer_secret: &str,
    token_secret: Option<&str>,
) -> HostResult<String> {
    let key = format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret.unwrap_or_default())
    );
    let base = signature_base_string(http_method, url, params);

    let mut mac = HmacSha1::new_from_slice(key.as_bytes())
        .map_err(|error| HostError::InvalidInput(format!("Invalid signing key: {error}")))?;
    mac.update(base.as_bytes());

    Ok(BASE64_STANDARD.encode(mac.finalize().into_bytes()))
}

pub(crate) fn nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

pub(crate) fn timestamp() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or_default()
        .to_string()
}

/// Decode an `application/x-www-form-urlencoded` body such as the token
/// endpoints return.
pub(crate) fn parse_form(body: &str) -> HostResult<HashMap<String, String>> {
    body.trim()
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            Ok((decode_component(key)?, decode_component(value)?))
        })
        .collect()
}

fn decode_component(value: &str) -> HostResult<String> {
    let value = value.replace('+', " ");
    urlencoding::decode(&value)
        .map(std::borrow::Cow::into_owned)
        .map_err(|error| {
            HostError::Invariant(PROVIDER, format!("Invalid form encoded response: {error}"))
        })
}
