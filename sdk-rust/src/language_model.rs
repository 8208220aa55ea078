use crate::{LanguageModelInput, LanguageModelResult, ModelResponse};

/// A multimodal model that answers a prompt made of text and images.
#[async_trait::async_trait]
pub trait LanguageModel: Send + Sync {
    /// Short provider name, used in logs and error messages.
    fn provider(&self) -> &'static str;
    fn model_id(&self) -> String;
    /// Generate a single reply. A rejected payload is reported as
    /// `LanguageModelError::BadRequest`.
    async fn generate(&self, input: LanguageModelInput) -> LanguageModelResult<ModelResponse>;
}
