use std::{collections::VecDeque, sync::Mutex};

use crate::{
    LanguageModel, LanguageModelError, LanguageModelInput, LanguageModelResult, ModelResponse,
    ModelUsage, Part,
};

/// Scripted outcome of one `generate` call.
pub enum MockGenerateResult {
    Response(ModelResponse),
    Error(LanguageModelError),
}

impl MockGenerateResult {
    /// A reply made of a single text part.
    pub fn text(text: impl Into<String>, usage: Option<ModelUsage>) -> Self {
        Self::Response(ModelResponse {
            content: vec![Part::text(text)],
            usage,
        })
    }

    pub fn error(error: LanguageModelError) -> Self {
        Self::Error(error)
    }

    fn into_result(self) -> LanguageModelResult<ModelResponse> {
        match self {
            Self::Response(response) => Ok(response),
            Self::Error(error) => Err(error),
        }
    }
}

impl From<ModelResponse> for MockGenerateResult {
    fn from(response: ModelResponse) -> Self {
        Self::Response(response)
    }
}

impl From<LanguageModelError> for MockGenerateResult {
    fn from(error: LanguageModelError) -> Self {
        Self::Error(error)
    }
}

#[derive(Default)]
struct MockLanguageModelState {
    scripted: VecDeque<MockGenerateResult>,
    inputs: Vec<LanguageModelInput>,
}

/// A language model that replays scripted results in order and records every
/// input it receives. A call with nothing left to replay fails with
/// `LanguageModelError::Invariant`.
pub struct MockLanguageModel {
    model_id: String,
    state: Mutex<MockLanguageModelState>,
}

impl Default for MockLanguageModel {
    fn default() -> Self {
        Self {
            model_id: "mock-vision".to_string(),
            state: Mutex::default(),
        }
    }
}

impl MockLanguageModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the next result.
    pub fn enqueue_generate(&self, result: impl Into<MockGenerateResult>) -> &Self {
        self.enqueue_generate_results([result.into()])
    }

    /// Script several results, replayed in iteration order.
    pub fn enqueue_generate_results(
        &self,
        results: impl IntoIterator<Item = MockGenerateResult>,
    ) -> &Self {
        let mut state = self.state.lock().expect("mock state poisoned");
        state.scripted.extend(results);
        drop(state);
        self
    }

    /// Inputs received so far, in call order.
    pub fn tracked_generate_inputs(&self) -> Vec<LanguageModelInput> {
        self.state.lock().expect("mock state poisoned").inputs.clone()
    }

    pub fn generate_calls(&self) -> usize {
        self.state.lock().expect("mock state poisoned").inputs.len()
    }
}

#[async_trait::async_trait]
impl LanguageModel for MockLanguageModel {
    fn provider(&self) -> &'static str {
        "mock"
    }

    fn model_id(&self) -> String {
        self.model_id.clone()
    }

    async fn generate(&self, input: LanguageModelInput) -> LanguageModelResult<ModelResponse> {
        let mut state = self.state.lock().expect("mock state poisoned");
        state.inputs.push(input);
        state.scripted.pop_front().map_or_else(
            || {
                Err(LanguageModelError::Invariant(
                    "mock",
                    "no scripted generate result left".to_string(),
                ))
            },
            MockGenerateResult::into_result,
        )
    }
}
