use crate::{ImageDetail, ImageUrlPart, Message, ModelResponse, Part, TextPart, UserMessage};

impl Part {
    /// Create a text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(TextPart { text: text.into() })
    }

    /// Create an image part pointing at a hosted image.
    pub fn image_url(url: impl Into<String>, detail: Option<ImageDetail>) -> Self {
        Self::ImageUrl(ImageUrlPart {
            url: url.into(),
            detail,
        })
    }
}

impl From<&str> for Part {
    fn from(value: &str) -> Self {
        Self::text(value)
    }
}

impl From<String> for Part {
    fn from(value: String) -> Self {
        Self::text(value)
    }
}

impl Message {
    pub fn user(content: impl IntoIterator<Item = impl Into<Part>>) -> Self {
        Self::User(UserMessage {
            content: content.into_iter().map(Into::into).collect(),
        })
    }
}

impl ModelResponse {
    /// Concatenated text of every text part in the response.
    #[must_use]
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|part| match part {
                Part::Text(text_part) => Some(text_part.text.as_str()),
                Part::ImageUrl(_) => None,
            })
            .collect()
    }
}
