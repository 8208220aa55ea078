use serde::{Deserialize, Serialize};
use std::fmt;

/// A part of the message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Part {
    Text(TextPart),
    ImageUrl(ImageUrlPart),
}

/// A message in an LLM conversation history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    User(UserMessage),
}

/// A part of the message that contains text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextPart {
    pub text: String,
}

/// A part of the message that references a remotely hosted image. The
/// provider downloads the image itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageUrlPart {
    pub url: String,
    /// Resolution the model analyzes the image at. Higher detail costs more
    /// input tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<ImageDetail>,
}

/// Image analysis resolution.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImageDetail {
    Low,
    #[default]
    High,
    Auto,
}

impl fmt::Display for ImageDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Self::Low => "low",
            Self::High => "high",
            Self::Auto => "auto",
        };
        f.write_str(value)
    }
}

impl std::str::FromStr for ImageDetail {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "high" => Ok(Self::High),
            "auto" => Ok(Self::Auto),
            other => Err(format!("unknown image detail level: {other}")),
        }
    }
}

/// Represents a message sent by the user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserMessage {
    pub content: Vec<Part>,
}

/// Represents the token usage of the model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ModelUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Represents the response generated by the model.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ModelResponse {
    pub content: Vec<Part>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<ModelUsage>,
}

/// Defines the input parameters for the language model completion.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct LanguageModelInput {
    /// A system prompt is a way of providing context and instructions to the
    /// model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// A list of messages comprising the conversation so far.
    pub messages: Vec<Message>,
    /// The maximum number of tokens that can be generated in the chat
    /// completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// Pricing of a vision model, expressed per thousand tokens plus a flat
/// amount per image sent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct LanguageModelPricing {
    /// The cost in USD per 1000 prompt tokens.
    pub input_cost_per_1k_tokens: f64,
    /// The cost in USD per 1000 completion tokens.
    pub output_cost_per_1k_tokens: f64,
    /// Flat cost in USD charged per image in the request.
    pub cost_per_image: f64,
}

/// Photo album on the hosting service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Album {
    pub id: String,
    pub title: String,
    pub description: String,
}

/// A single page of an album listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlbumPage {
    pub albums: Vec<Album>,
    /// Total number of albums the service reports across all pages.
    pub total: usize,
    /// Number of pages the service reports for the requested page size.
    pub pages: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Photo {
    pub id: String,
    pub title: String,
    /// Direct URL of a medium sized rendition. Absent when the owner disabled
    /// downloads or the service did not return the size.
    pub image_url: Option<String>,
    pub description: String,
    pub location: Option<Location>,
}

/// Which visibility tier of photos a listing includes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PrivacyFilter {
    #[default]
    Public,
    Friends,
    Family,
    FriendsAndFamily,
    Private,
}

impl PrivacyFilter {
    /// Numeric value used on the wire.
    #[must_use]
    pub fn as_flickr_value(self) -> u8 {
        match self {
            Self::Public => 1,
            Self::Friends => 2,
            Self::Family => 3,
            Self::FriendsAndFamily => 4,
            Self::Private => 5,
        }
    }
}

impl TryFrom<u8> for PrivacyFilter {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Public),
            2 => Ok(Self::Friends),
            3 => Ok(Self::Family),
            4 => Ok(Self::FriendsAndFamily),
            5 => Ok(Self::Private),
            other => Err(format!("privacy filter must be between 1 and 5, got {other}")),
        }
    }
}

/// Access level granted to an OAuth credential.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Read,
    #[default]
    Write,
    Delete,
}

impl Permission {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Delete => "delete",
        }
    }
}

/// Long-lived OAuth access credential. A refresh produces a new value rather
/// than mutating an existing one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub token_secret: String,
    pub access_level: Permission,
    #[serde(default)]
    pub fullname: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub user_nsid: String,
}

/// Temporary token issued at the start of the authorization flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestToken {
    pub token: String,
    pub token_secret: String,
}
