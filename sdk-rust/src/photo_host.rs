use crate::{
    Album, AlbumPage, Credential, HostResult, Permission, Photo, PrivacyFilter, RequestToken,
};

/// Read and write access to a photo hosting account.
#[async_trait::async_trait]
pub trait PhotoHost: Send + Sync {
    /// Fetch one page of the account's albums. Pages are 1-based.
    async fn list_albums(&self, page: usize, per_page: usize) -> HostResult<AlbumPage>;
    async fn get_album(&self, album_id: &str) -> HostResult<Album>;
    /// All photos of an album visible under `privacy_filter`.
    async fn list_photos(
        &self,
        album_id: &str,
        privacy_filter: PrivacyFilter,
    ) -> HostResult<Vec<Photo>>;
    /// Replace the photo's tags. `tags` is a comma separated list.
    async fn set_tags(&self, photo_id: &str, tags: &str) -> HostResult<()>;
    async fn set_meta(&self, photo_id: &str, title: &str, description: &str) -> HostResult<()>;
    async fn set_location(&self, photo_id: &str, latitude: f64, longitude: f64)
        -> HostResult<()>;
}

/// Three-legged OAuth authorization against the hosting service.
#[async_trait::async_trait]
pub trait OAuthProvider: Send + Sync {
    async fn request_token(&self) -> HostResult<RequestToken>;
    /// URL a human opens to grant `permission` to the request token.
    fn authorize_url(&self, request_token: &RequestToken, permission: Permission) -> String;
    async fn access_token(
        &self,
        request_token: &RequestToken,
        verifier: &str,
    ) -> HostResult<Credential>;
    /// Validate a stored credential. Fails with `HostError::Unauthorized` when
    /// the service no longer accepts it.
    async fn check_token(&self, credential: &Credential) -> HostResult<Credential>;
}
