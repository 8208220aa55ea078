use super::chat_api::{
    ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImage, ChatCompletionRequestMessageContentPartText,
    ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContentPart, CompletionUsage, CreateChatCompletionRequest,
    CreateChatCompletionResponse, ImageUrl,
};
use crate::{
    client_utils, LanguageModel, LanguageModelError, LanguageModelInput, LanguageModelResult,
    Message, ModelResponse, ModelUsage, Part,
};
use reqwest::{
    header::{self, HeaderMap, HeaderName, HeaderValue},
    Client,
};
use std::collections::HashMap;
use tracing::Instrument;

const PROVIDER: &str = "openai";

pub struct OpenAIChatModel {
    model_id: String,
    api_key: String,
    base_url: String,
    client: Client,
    headers: HashMap<String, String>,
}

#[derive(Clone, Default)]
pub struct OpenAIChatModelOptions {
    pub base_url: Option<String>,
    pub api_key: String,
    pub headers: Option<HashMap<String, String>>,
    pub client: Option<Client>,
}

impl OpenAIChatModel {
    #[must_use]
    pub fn new(model_id: impl Into<String>, options: OpenAIChatModelOptions) -> Self {
        let OpenAIChatModelOptions {
            base_url,
            api_key,
            headers,
            client,
        } = options;

        let base_url = base_url
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string())
            .trim_end_matches('/')
            .to_string();
        let client = client.unwrap_or_else(Client::new);
        let headers = headers.unwrap_or_default();

        Self {
            model_id: model_id.into(),
            api_key,
            base_url,
            client,
            headers,
        }
    }

    fn request_headers(&self) -> LanguageModelResult<HeaderMap> {
        let mut headers = HeaderMap::new();

        let auth_header =
            HeaderValue::from_str(&format!("Bearer {}", self.api_key)).map_err(|error| {
                LanguageModelError::InvalidInput(format!(
                    "Invalid OpenAI API key header value: {error}"
                ))
            })?;
        headers.insert(header::AUTHORIZATION, auth_header);

        for (key, value) in &self.headers {
            let header_name = HeaderName::from_bytes(key.as_bytes()).map_err(|error| {
                LanguageModelError::InvalidInput(format!(
                    "Invalid OpenAI header name '{key}': {error}"
                ))
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|error| {
                LanguageModelError::InvalidInput(format!(
                    "Invalid OpenAI header value for '{key}': {error}"
                ))
            })?;
            headers.insert(header_name, header_value);
        }

        Ok(headers)
    }
}

#[async_trait::async_trait]
impl LanguageModel for OpenAIChatModel {
    fn provider(&self) -> &'static str {
        PROVIDER
    }

    fn model_id(&self) -> String {
        self.model_id.clone()
    }

    async fn generate(&self, input: LanguageModelInput) -> LanguageModelResult<ModelResponse> {
        let span = tracing::info_span!(
            "gen_ai.generate",
            gen_ai.system = PROVIDER,
            gen_ai.request.model = %self.model_id,
        );

        async move {
            let request = convert_to_openai_create_params(input, &self.model_id);
            let headers = self.request_headers()?;

            let response: CreateChatCompletionResponse = client_utils::send_json(
                &self.client,
                &format!("{}/chat/completions", self.base_url),
                &request,
                headers,
            )
            .await?;

            let choice = response.choices.into_iter().next().ok_or_else(|| {
                LanguageModelError::Invariant(PROVIDER, "No choices in response".to_string())
            })?;

            let message = choice.message;

            if let Some(refusal) = &message.refusal {
                if !refusal.is_empty() {
                    return Err(LanguageModelError::Refusal(refusal.clone()));
                }
            }

            let content = message
                .content
                .filter(|text| !text.is_empty())
                .map(|text| vec![Part::text(text)])
                .unwrap_or_default();

            let usage = response.usage.map(map_openai_usage).transpose()?;

            if let Some(usage) = &usage {
                tracing::debug!(
                    gen_ai.usage.input_tokens = usage.input_tokens,
                    gen_ai.usage.output_tokens = usage.output_tokens,
                    "completion finished"
                );
            }

            Ok(ModelResponse { content, usage })
        }
        .instrument(span)
        .await
    }
}

fn convert_to_openai_create_params(
    input: LanguageModelInput,
    model_id: &str,
) -> CreateChatCompletionRequest {
    CreateChatCompletionRequest {
        model: model_id.to_string(),
        messages: convert_to_openai_messages(input.messages, input.system_prompt),
        max_tokens: input.max_tokens,
    }
}

fn convert_to_openai_messages(
    messages: Vec<Message>,
    system_prompt: Option<String>,
) -> Vec<ChatCompletionRequestMessage> {
    let mut openai_messages = Vec::new();

    if let Some(prompt) = system_prompt {
        openai_messages.push(ChatCompletionRequestMessage::System(
            ChatCompletionRequestSystemMessage { content: prompt },
        ));
    }

    for message in messages {
        match message {
            Message::User(user_message) => {
                let content = user_message
                    .content
                    .into_iter()
                    .map(convert_to_openai_user_part)
                    .collect();
                openai_messages.push(ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessage { content },
                ));
            }
        }
    }

    openai_messages
}

fn convert_to_openai_user_part(part: Part) -> ChatCompletionRequestUserMessageContentPart {
    match part {
        Part::Text(text_part) => ChatCompletionRequestUserMessageContentPart::Text(
            ChatCompletionRequestMessageContentPartText {
                text: text_part.text,
            },
        ),
        Part::ImageUrl(image_part) => ChatCompletionRequestUserMessageContentPart::Image(
            ChatCompletionRequestMessageContentPartImage {
                image_url: ImageUrl {
                    url: image_part.url,
                    detail: image_part.detail.map(|detail| detail.to_string()),
                },
            },
        ),
    }
}

fn map_openai_usage(usage: CompletionUsage) -> LanguageModelResult<ModelUsage> {
    let input_tokens = u32::try_from(usage.prompt_tokens).map_err(|_| {
        LanguageModelError::Invariant(
            PROVIDER,
            format!("Invalid prompt token count: {}", usage.prompt_tokens),
        )
    })?;
    let output_tokens = u32::try_from(usage.completion_tokens).map_err(|_| {
        LanguageModelError::Invariant(
            PROVIDER,
            format!("Invalid completion token count: {}", usage.completion_tokens),
        )
    })?;

    Ok(ModelUsage {
        input_tokens,
        output_tokens,
    })
}
