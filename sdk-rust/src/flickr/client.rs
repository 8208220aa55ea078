use super::{
    api::{
        CheckTokenResponse, FailResponse, PhotoEntry, PhotosetsGetInfoResponse,
        PhotosetsGetListResponse, PhotosetsGetPhotosResponse,
    },
    oauth,
};
use crate::{
    Album, AlbumPage, Credential, HostError, HostResult, Location, OAuthProvider, Permission,
    Photo, PhotoHost, PrivacyFilter, RequestToken,
};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use tracing::Instrument;

const PROVIDER: &str = "flickr";
const PHOTOS_PER_PAGE: usize = 500;
const PHOTO_EXTRAS: &str = "url_m,description,geo";

/// Flickr error codes that mean the credential or signature was rejected.
const UNAUTHORIZED_CODES: [i64; 4] = [96, 97, 98, 99];

pub struct FlickrClient {
    api_key: String,
    api_secret: String,
    rest_url: String,
    oauth_url: String,
    client: Client,
    credential: Option<Credential>,
}

#[derive(Clone, Default)]
pub struct FlickrClientOptions {
    pub api_key: String,
    pub api_secret: String,
    /// Defaults to `https://api.flickr.com/services/rest`.
    pub rest_url: Option<String>,
    /// Defaults to `https://www.flickr.com/services/oauth`.
    pub oauth_url: Option<String>,
    pub client: Option<Client>,
}

impl FlickrClient {
    #[must_use]
    pub fn new(options: FlickrClientOptions) -> Self {
        let FlickrClientOptions {
            api_key,
            api_secret,
            rest_url,
            oauth_url,
            client,
        } = options;

        let rest_url = rest_url
            .unwrap_or_else(|| "https://api.flickr.com/services/rest".to_string())
            .trim_end_matches('/')
            .to_string();
        let oauth_url = oauth_url
            .unwrap_or_else(|| "https://www.flickr.com/services/oauth".to_string())
            .trim_end_matches('/')
            .to_string();

        Self {
            api_key,
            api_secret,
            rest_url,
            oauth_url,
            client: client.unwrap_or_else(Client::new),
            credential: None,
        }
    }

    /// Sign subsequent API calls with `credential`.
    #[must_use]
    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    fn signed_params(
        &self,
        http_method: &Method,
        url: &str,
        mut params: Vec<(String, String)>,
        token: Option<(&str, &str)>,
    ) -> HostResult<Vec<(String, String)>> {
        params.extend([
            ("oauth_consumer_key".to_string(), self.api_key.clone()),
            ("oauth_nonce".to_string(), oauth::nonce()),
            ("oauth_signature_method".to_string(), "HMAC-SHA1".to_string()),
            ("oauth_timestamp".to_string(), oauth::timestamp()),
            ("oauth_version".to_string(), "1.0".to_string()),
        ]);
        if let Some((token, _)) = token {
            params.push(("oauth_token".to_string(), token.to_string()));
        }

        let signature = oauth::sign(
            http_method.as_str(),
            url,
            &params,
            &self.api_secret,
            token.map(|(_, secret)| secret),
        )?;
        params.push(("oauth_signature".to_string(), signature));

        Ok(params)
    }

    async fn send(
        &self,
        http_method: Method,
        url: &str,
        params: Vec<(String, String)>,
        token: Option<(&str, &str)>,
    ) -> HostResult<String> {
        let params = self.signed_params(&http_method, url, params, token)?;

        let request = if http_method == Method::POST {
            self.client.post(url).form(&params)
        } else {
            self.client.get(url).query(&params)
        };

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::UNAUTHORIZED {
            return Err(HostError::Unauthorized(body));
        }
        if !status.is_success() {
            return Err(HostError::StatusCode(status, body));
        }

        Ok(body)
    }

    /// Call a REST method signed with `credential`, decoding the JSON payload.
    async fn call_as<R: DeserializeOwned>(
        &self,
        credential: &Credential,
        http_method: Method,
        api_method: &str,
        params: Vec<(&str, String)>,
    ) -> HostResult<R> {
        let span = tracing::debug_span!("flickr.call", method = api_method);

        async move {
            let mut request_params: Vec<(String, String)> = vec![
                ("method".to_string(), api_method.to_string()),
                ("format".to_string(), "json".to_string()),
                ("nojsoncallback".to_string(), "1".to_string()),
            ];
            request_params.extend(
                params
                    .into_iter()
                    .map(|(key, value)| (key.to_string(), value)),
            );

            let body = self
                .send(
                    http_method,
                    &self.rest_url,
                    request_params,
                    Some((credential.token.as_str(), credential.token_secret.as_str())),
                )
                .await?;

            decode_rest_response(&body)
        }
        .instrument(span)
        .await
    }

    async fn call<R: DeserializeOwned>(
        &self,
        http_method: Method,
        api_method: &str,
        params: Vec<(&str, String)>,
    ) -> HostResult<R> {
        let credential = self.credential.as_ref().ok_or_else(|| {
            HostError::Unauthorized("No OAuth credential configured for Flickr".to_string())
        })?;
        self.call_as(credential, http_method, api_method, params)
            .await
    }

    async fn oauth_call(
        &self,
        endpoint: &str,
        params: Vec<(String, String)>,
        token: Option<(&str, &str)>,
    ) -> HostResult<HashMap<String, String>> {
        let url = format!("{}/{endpoint}", self.oauth_url);
        let body = self.send(Method::GET, &url, params, token).await?;
        let form = oauth::parse_form(&body)?;

        if let Some(problem) = form.get("oauth_problem") {
            return Err(HostError::Unauthorized(problem.clone()));
        }

        Ok(form)
    }
}

fn decode_rest_response<R: DeserializeOwned>(body: &str) -> HostResult<R> {
    let value: Value = serde_json::from_str(body).map_err(|error| {
        HostError::Invariant(PROVIDER, format!("Response is not JSON: {error}"))
    })?;

    if value.get("stat").and_then(Value::as_str) == Some("fail") {
        let FailResponse { code, message } = serde_json::from_value(value).map_err(|error| {
            HostError::Invariant(PROVIDER, format!("Invalid failure response: {error}"))
        })?;
        if UNAUTHORIZED_CODES.contains(&code) {
            return Err(HostError::Unauthorized(message));
        }
        return Err(HostError::Api { code, message });
    }

    serde_json::from_value(value).map_err(|error| {
        HostError::Invariant(PROVIDER, format!("Unexpected response shape: {error}"))
    })
}

fn required(form: &HashMap<String, String>, key: &str) -> HostResult<String> {
    form.get(key).cloned().ok_or_else(|| {
        HostError::Invariant(PROVIDER, format!("Token response is missing {key}"))
    })
}

fn map_photo(entry: PhotoEntry) -> Photo {
    let location = match (entry.latitude, entry.longitude) {
        // Flickr reports 0,0 for photos without a location.
        (Some(latitude), Some(longitude)) if latitude != 0.0 || longitude != 0.0 => {
            Some(Location {
                latitude,
                longitude,
            })
        }
        _ => None,
    };

    Photo {
        id: entry.id,
        title: entry.title,
        image_url: entry.url_m.filter(|url| !url.is_empty()),
        description: entry.description.content,
        location,
    }
}

#[async_trait::async_trait]
impl PhotoHost for FlickrClient {
    async fn list_albums(&self, page: usize, per_page: usize) -> HostResult<AlbumPage> {
        let response: PhotosetsGetListResponse = self
            .call(
                Method::GET,
                "flickr.photosets.getList",
                vec![("page", page.to_string()), ("per_page", per_page.to_string())],
            )
            .await?;

        let list = response.photosets;
        Ok(AlbumPage {
            albums: list
                .photoset
                .into_iter()
                .map(|photoset| Album {
                    id: photoset.id,
                    title: photoset.title.content,
                    description: photoset.description.content,
                })
                .collect(),
            total: list.total,
            pages: list.pages,
        })
    }

    async fn get_album(&self, album_id: &str) -> HostResult<Album> {
        let response: PhotosetsGetInfoResponse = self
            .call(
                Method::GET,
                "flickr.photosets.getInfo",
                vec![("photoset_id", album_id.to_string())],
            )
            .await?;

        Ok(Album {
            id: response.photoset.id,
            title: response.photoset.title.content,
            description: response.photoset.description.content,
        })
    }

    async fn list_photos(
        &self,
        album_id: &str,
        privacy_filter: PrivacyFilter,
    ) -> HostResult<Vec<Photo>> {
        let mut photos = Vec::new();
        let mut page = 1;

        loop {
            let response: PhotosetsGetPhotosResponse = self
                .call(
                    Method::GET,
                    "flickr.photosets.getPhotos",
                    vec![
                        ("photoset_id", album_id.to_string()),
                        ("extras", PHOTO_EXTRAS.to_string()),
                        ("media", "photos".to_string()),
                        (
                            "privacy_filter",
                            privacy_filter.as_flickr_value().to_string(),
                        ),
                        ("page", page.to_string()),
                        ("per_page", PHOTOS_PER_PAGE.to_string()),
                    ],
                )
                .await?;

            let listing = response.photoset;
            let fetched = listing.photo.len();
            photos.extend(listing.photo.into_iter().map(map_photo));

            if fetched == 0 || page >= listing.pages {
                break;
            }
            page += 1;
        }

        Ok(photos)
    }

    async fn set_tags(&self, photo_id: &str, tags: &str) -> HostResult<()> {
        self.call::<Value>(
            Method::POST,
            "flickr.photos.setTags",
            vec![("photo_id", photo_id.to_string()), ("tags", tags.to_string())],
        )
        .await
        .map(|_| ())
    }

    async fn set_meta(&self, photo_id: &str, title: &str, description: &str) -> HostResult<()> {
        self.call::<Value>(
            Method::POST,
            "flickr.photos.setMeta",
            vec![
                ("photo_id", photo_id.to_string()),
                ("title", title.to_string()),
                ("description", description.to_string()),
            ],
        )
        .await
        .map(|_| ())
    }

    async fn set_location(
        &self,
        photo_id: &str,
        latitude: f64,
        longitude: f64,
    ) -> HostResult<()> {
        self.call::<Value>(
            Method::POST,
            "flickr.photos.geo.setLocation",
            vec![
                ("photo_id", photo_id.to_string()),
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
            ],
        )
        .await
        .map(|_| ())
    }
}

#[async_trait::async_trait]
impl OAuthProvider for FlickrClient {
    async fn request_token(&self) -> HostResult<RequestToken> {
        let form = self
            .oauth_call(
                "request_token",
                vec![("oauth_callback".to_string(), "oob".to_string())],
                None,
            )
            .await?;

        Ok(RequestToken {
            token: required(&form, "oauth_token")?,
            token_secret: required(&form, "oauth_token_secret")?,
        })
    }

    fn authorize_url(&self, request_token: &RequestToken, permission: Permission) -> String {
        format!(
            "{}/authorize?oauth_token={}&perms={}",
            self.oauth_url,
            oauth::percent_encode(&request_token.token),
            permission.as_str()
        )
    }

    async fn access_token(
        &self,
        request_token: &RequestToken,
        verifier: &str,
    ) -> HostResult<Credential> {
        let form = self
            .oauth_call(
                "access_token",
                vec![("oauth_verifier".to_string(), verifier.trim().to_string())],
                Some((
                    request_token.token.as_str(),
                    request_token.token_secret.as_str(),
                )),
            )
            .await?;

        Ok(Credential {
            token: required(&form, "oauth_token")?,
            token_secret: required(&form, "oauth_token_secret")?,
            access_level: Permission::Write,
            fullname: form.get("fullname").cloned().unwrap_or_default(),
            username: form.get("username").cloned().unwrap_or_default(),
            user_nsid: form.get("user_nsid").cloned().unwrap_or_default(),
        })
    }

    async fn check_token(&self, credential: &Credential) -> HostResult<Credential> {
        let response: CheckTokenResponse = self
            .call_as(
                credential,
                Method::GET,
                "flickr.auth.oauth.checkToken",
                vec![],
            )
            .await?;

        let access_level = match response.oauth.perms.content.as_str() {
            "read" => Permission::Read,
            "write" => Permission::Write,
            "delete" => Permission::Delete,
            other => {
                return Err(HostError::Unauthorized(format!(
                    "Token grants no usable permission: {other}"
                )))
            }
        };

        Ok(Credential {
            token: credential.token.clone(),
            token_secret: credential.token_secret.clone(),
            access_level,
            fullname: response.oauth.user.fullname,
            username: response.oauth.user.username,
            user_nsid: response.oauth.user.nsid,
        })
    }
}
