use crate::LanguageModelError;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Serialize};

/// Create a JSON request, parse the response.
/// Throws error on non OK status code. A 400 is reported as
/// `LanguageModelError::BadRequest` so callers can retry that payload.
pub async fn send_json<T: Serialize, R: DeserializeOwned>(
    client: &Client,
    url: &str,
    data: &T,
    headers: reqwest::header::HeaderMap,
) -> Result<R, LanguageModelError> {
    let response = client.post(url).headers(headers).json(data).send().await?;
    let status = response.status();
    if status == StatusCode::BAD_REQUEST {
        Err(LanguageModelError::BadRequest(
            response.text().await.unwrap_or_default(),
        ))
    } else if !status.is_success() {
        Err(LanguageModelError::StatusCode(
            status,
            response.text().await.unwrap_or_default(),
        ))
    } else {
        Ok(response.json::<R>().await?)
    }
}
