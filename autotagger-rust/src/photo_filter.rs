use tagger_sdk::Photo;

/// Decides whether a photo still needs a generated caption.
///
/// Cameras often write a fixed string such as `OLYMPUS DIGITAL CAMERA` into
/// the description; those count as empty.
#[derive(Debug, Clone, Default)]
pub struct PhotoFilter {
    placeholders: Vec<String>,
}

impl PhotoFilter {
    pub fn new(placeholders: Vec<String>) -> Self {
        Self { placeholders }
    }

    /// `false` when the photo already has a real description.
    #[must_use]
    pub fn should_analyze(&self, photo: &Photo) -> bool {
        let description = photo.description.trim();
        description.is_empty()
            || self
                .placeholders
                .iter()
                .any(|marker| !marker.is_empty() && description.starts_with(marker.as_str()))
    }
}
