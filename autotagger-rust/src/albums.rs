use crate::AutotaggerError;
use tagger_sdk::{Album, PhotoHost};
use tracing::{debug, warn};

/// Lists the albums of the authenticated account.
pub struct AlbumEnumerator<'a> {
    host: &'a dyn PhotoHost,
    page_size: usize,
}

impl<'a> AlbumEnumerator<'a> {
    pub fn new(host: &'a dyn PhotoHost, page_size: usize) -> Self {
        Self {
            host,
            page_size: page_size.max(1),
        }
    }

    /// Every album of the account, in the order the service lists them.
    ///
    /// Pagination stops once the reported total is reached, the reported page
    /// count is exhausted, or a page comes back empty. A failure on the first
    /// page is returned to the caller; later failing pages are skipped.
    pub async fn list_all(&self) -> Result<Vec<Album>, AutotaggerError> {
        let first = self.host.list_albums(1, self.page_size).await?;
        let total = first.total;
        let last_page = first.pages.max(total.div_ceil(self.page_size));
        debug!(total, pages = last_page, "listing albums");

        let mut fetched = first.albums.len();
        let mut albums = first.albums;
        let mut page = 1;

        while fetched < total && page < last_page {
            page += 1;
            match self.host.list_albums(page, self.page_size).await {
                Ok(next) if next.albums.is_empty() => break,
                Ok(next) => {
                    fetched += next.albums.len();
                    albums.extend(next.albums);
                }
                Err(error) => {
                    warn!(page, %error, "skipping album page");
                    fetched += self.page_size;
                }
            }
        }

        Ok(albums)
    }

    pub async fn get_one(&self, album_id: &str) -> Result<Album, AutotaggerError> {
        Ok(self.host.get_album(album_id).await?)
    }
}

/// Whether an album title starts with one of `prefixes`. Case sensitive.
#[must_use]
pub fn is_skipped(title: &str, prefixes: &[String]) -> bool {
    prefixes
        .iter()
        .any(|prefix| !prefix.is_empty() && title.starts_with(prefix.as_str()))
}
