use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::Mutex,
};

use crate::{
    Album, AlbumPage, Credential, HostError, HostResult, OAuthProvider, Permission, Photo,
    PhotoHost, PrivacyFilter, RequestToken,
};

/// A call received by [`MockPhotoHost`].
#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    ListAlbums {
        page: usize,
        per_page: usize,
    },
    GetAlbum(String),
    ListPhotos {
        album_id: String,
        privacy_filter: PrivacyFilter,
    },
    SetTags {
        photo_id: String,
        tags: String,
    },
    SetMeta {
        photo_id: String,
        title: String,
        description: String,
    },
    SetLocation {
        photo_id: String,
        latitude: f64,
        longitude: f64,
    },
}

impl HostCall {
    /// Whether the call modifies the remote account.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Self::SetTags { .. } | Self::SetMeta { .. } | Self::SetLocation { .. }
        )
    }
}

/// Kind of write call, used to make the mock fail selected writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteKind {
    Tags,
    Meta,
    Location,
}

#[derive(Default)]
struct MockPhotoHostState {
    albums: Vec<Album>,
    photos: HashMap<String, Vec<Photo>>,
    failing_album_pages: HashSet<usize>,
    failing_photo_listings: HashSet<String>,
    failing_writes: HashSet<WriteKind>,
    calls: Vec<HostCall>,
}

/// An in-memory photo host that records every call.
#[derive(Default)]
pub struct MockPhotoHost {
    state: Mutex<MockPhotoHostState>,
}

fn mocked_failure(what: &str) -> HostError {
    HostError::Api {
        code: 0,
        message: format!("mocked failure: {what}"),
    }
}

impl MockPhotoHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an album with its photos. Albums are listed in insertion order.
    pub fn add_album(&self, album: Album, photos: Vec<Photo>) -> &Self {
        let mut state = self.state.lock().expect("mock state poisoned");
        state.photos.insert(album.id.clone(), photos);
        state.albums.push(album);
        drop(state);
        self
    }

    /// Make `list_albums` fail for the given 1-based page.
    pub fn fail_album_page(&self, page: usize) -> &Self {
        let mut state = self.state.lock().expect("mock state poisoned");
        state.failing_album_pages.insert(page);
        drop(state);
        self
    }

    /// Make `list_photos` fail for the given album.
    pub fn fail_photo_listing(&self, album_id: &str) -> &Self {
        let mut state = self.state.lock().expect("mock state poisoned");
        state.failing_photo_listings.insert(album_id.to_string());
        drop(state);
        self
    }

    /// Make every write of the given kind fail.
    pub fn fail_writes(&self, kind: WriteKind) -> &Self {
        let mut state = self.state.lock().expect("mock state poisoned");
        state.failing_writes.insert(kind);
        drop(state);
        self
    }

    /// All calls received so far, in order.
    pub fn calls(&self) -> Vec<HostCall> {
        let state = self.state.lock().expect("mock state poisoned");
        state.calls.clone()
    }

    /// Write calls received so far, in order.
    pub fn write_calls(&self) -> Vec<HostCall> {
        self.calls().into_iter().filter(HostCall::is_write).collect()
    }

    fn record_write(&self, kind: WriteKind, call: HostCall) -> HostResult<()> {
        let mut state = self.state.lock().expect("mock state poisoned");
        state.calls.push(call);
        if state.failing_writes.contains(&kind) {
            return Err(mocked_failure("write"));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl PhotoHost for MockPhotoHost {
    async fn list_albums(&self, page: usize, per_page: usize) -> HostResult<AlbumPage> {
        let mut state = self.state.lock().expect("mock state poisoned");
        state.calls.push(HostCall::ListAlbums { page, per_page });

        if state.failing_album_pages.contains(&page) {
            return Err(mocked_failure("album page"));
        }

        let total = state.albums.len();
        let per_page = per_page.max(1);
        let albums = state
            .albums
            .iter()
            .skip((page.max(1) - 1) * per_page)
            .take(per_page)
            .cloned()
            .collect();

        Ok(AlbumPage {
            albums,
            total,
            pages: total.div_ceil(per_page),
        })
    }

    async fn get_album(&self, album_id: &str) -> HostResult<Album> {
        let mut state = self.state.lock().expect("mock state poisoned");
        state.calls.push(HostCall::GetAlbum(album_id.to_string()));

        state
            .albums
            .iter()
            .find(|album| album.id == album_id)
            .cloned()
            .ok_or_else(|| HostError::Api {
                code: 1,
                message: "Photoset not found".to_string(),
            })
    }

    async fn list_photos(
        &self,
        album_id: &str,
        privacy_filter: PrivacyFilter,
    ) -> HostResult<Vec<Photo>> {
        let mut state = self.state.lock().expect("mock state poisoned");
        state.calls.push(HostCall::ListPhotos {
            album_id: album_id.to_string(),
            privacy_filter,
        });

        if state.failing_photo_listings.contains(album_id) {
            return Err(mocked_failure("photo listing"));
        }

        Ok(state.photos.get(album_id).cloned().unwrap_or_default())
    }

    async fn set_tags(&self, photo_id: &str, tags: &str) -> HostResult<()> {
        self.record_write(
            WriteKind::Tags,
            HostCall::SetTags {
                photo_id: photo_id.to_string(),
                tags: tags.to_string(),
            },
        )
    }

    async fn set_meta(&self, photo_id: &str, title: &str, description: &str) -> HostResult<()> {
        self.record_write(
            WriteKind::Meta,
            HostCall::SetMeta {
                photo_id: photo_id.to_string(),
                title: title.to_string(),
                description: description.to_string(),
            },
        )
    }

    async fn set_location(
        &self,
        photo_id: &str,
        latitude: f64,
        longitude: f64,
    ) -> HostResult<()> {
        self.record_write(
            WriteKind::Location,
            HostCall::SetLocation {
                photo_id: photo_id.to_string(),
                latitude,
                longitude,
            },
        )
    }
}

#[derive(Default)]
struct MockOAuthProviderState {
    check_token_results: VecDeque<HostResult<Credential>>,
    request_token_results: VecDeque<HostResult<RequestToken>>,
    access_token_results: VecDeque<HostResult<Credential>>,
    verifiers: Vec<String>,
    check_token_calls: usize,
    request_token_calls: usize,
}

/// A scripted OAuth provider. Unscripted calls fail with
/// `HostError::Invariant`.
#[derive(Default)]
pub struct MockOAuthProvider {
    state: Mutex<MockOAuthProviderState>,
}

impl MockOAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue_check_token(&self, result: HostResult<Credential>) -> &Self {
        let mut state = self.state.lock().expect("mock state poisoned");
        state.check_token_results.push_back(result);
        drop(state);
        self
    }

    pub fn enqueue_request_token(&self, result: HostResult<RequestToken>) -> &Self {
        let mut state = self.state.lock().expect("mock state poisoned");
        state.request_token_results.push_back(result);
        drop(state);
        self
    }

    pub fn enqueue_access_token(&self, result: HostResult<Credential>) -> &Self {
        let mut state = self.state.lock().expect("mock state poisoned");
        state.access_token_results.push_back(result);
        drop(state);
        self
    }

    pub fn check_token_calls(&self) -> usize {
        self.state.lock().expect("mock state poisoned").check_token_calls
    }

    pub fn request_token_calls(&self) -> usize {
        self.state.lock().expect("mock state poisoned").request_token_calls
    }

    /// Verifiers passed to `access_token`, in order.
    pub fn verifiers(&self) -> Vec<String> {
        self.state.lock().expect("mock state poisoned").verifiers.clone()
    }
}

fn unscripted(call: &str) -> HostError {
    HostError::Invariant("mock", format!("no mocked {call} results available"))
}

#[async_trait::async_trait]
impl OAuthProvider for MockOAuthProvider {
    async fn request_token(&self) -> HostResult<RequestToken> {
        let mut state = self.state.lock().expect("mock state poisoned");
        state.request_token_calls += 1;
        state
            .request_token_results
            .pop_front()
            .unwrap_or_else(|| Err(unscripted("request_token")))
    }

    fn authorize_url(&self, request_token: &RequestToken, permission: Permission) -> String {
        format!(
            "https://mock.invalid/authorize?oauth_token={}&perms={}",
            request_token.token,
            permission.as_str()
        )
    }

    async fn access_token(
        &self,
        _request_token: &RequestToken,
        verifier: &str,
    ) -> HostResult<Credential> {
        let mut state = self.state.lock().expect("mock state poisoned");
        state.verifiers.push(verifier.to_string());
        state
            .access_token_results
            .pop_front()
            .unwrap_or_else(|| Err(unscripted("access_token")))
    }

    async fn check_token(&self, _credential: &Credential) -> HostResult<Credential> {
        let mut state = self.state.lock().expect("mock state poisoned");
        state.check_token_calls += 1;
        state
            .check_token_results
            .pop_front()
            .unwrap_or_else(|| Err(unscripted("check_token")))
    }
}
