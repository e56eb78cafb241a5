//! OpenRouter free models over the OpenAI-compatible chat completions API.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::errors::{mentions_usage_limit, ApiErrorInfo};
use crate::api::{ChatCompletion, ChatRequest, ChatStreamChunk};
use crate::core::builtin_providers::ProviderId;
use crate::core::chat_stream::{DeltaStream, Frame, FrameDecoder, Framing};
use crate::core::error::ChatError;
use crate::utils::url::construct_api_url;

use super::prompt::{self, ComposedMessage};
use super::{send_with_cancel, ChatTurn, Provider, ProviderReply, RequestOptions};

const NAME: &str = "openrouter";
const APP_TITLE: &str = "AlgoCroc AI";

const MISSING_KEY: &str =
    "OpenRouter API key not configured. Set OPENROUTER_API_KEY or run 'algocroc auth openrouter'.";

pub fn classify(info: ApiErrorInfo) -> ChatError {
    match info.status {
        Some(401) => ChatError::auth(NAME, info.message),
        Some(402) | Some(429) => ChatError::usage_limit(NAME, info.message),
        Some(403) if mentions_usage_limit(&info.message) => {
            ChatError::usage_limit(NAME, info.message)
        }
        Some(403) => ChatError::auth(NAME, info.message),
        _ if info.code_is(&["401"]) => ChatError::auth(NAME, info.message),
        _ if info.code_is(&["402", "429"]) => ChatError::usage_limit(NAME, info.message),
        status => ChatError::transport(NAME, status, info.message),
    }
}

struct OpenAiStreamDecoder;

impl FrameDecoder for OpenAiStreamDecoder {
    fn decode(&self, payload: &str) -> Frame {
        if payload == "[DONE]" {
            return Frame::Done;
        }
        let value: serde_json::Value = match serde_json::from_str(payload) {
            Ok(value) => value,
            Err(err) => {
                debug!("Skipping malformed OpenRouter frame: {err}");
                return Frame::Skip;
            }
        };
        if let Some(info) = ApiErrorInfo::from_value(None, &value) {
            return Frame::Failed(classify(info));
        }
        let chunk: ChatStreamChunk = match serde_json::from_value(value) {
            Ok(chunk) => chunk,
            Err(_) => return Frame::Skip,
        };
        let text: String = chunk
            .choices
            .into_iter()
            .filter_map(|choice| choice.delta.content)
            .collect();
        if text.is_empty() {
            Frame::Skip
        } else {
            Frame::Delta(text)
        }
    }
}

pub struct OpenRouterProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    options: RequestOptions,
}

impl OpenRouterProvider {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
        options: RequestOptions,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key,
            options,
        }
    }
}

#[async_trait]
impl Provider for OpenRouterProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenRouter
    }

    async fn send_message(
        &self,
        turn: &ChatTurn,
        cancel: CancellationToken,
    ) -> Result<ProviderReply, ChatError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ChatError::auth(NAME, MISSING_KEY))?;
        let model = self.model_config(&turn.model);
        let content = match prompt::compose_user_message(self, turn, &model, &cancel).await {
            ComposedMessage::Analyzed(analysis) => return Ok(ProviderReply::Complete(analysis)),
            ComposedMessage::Text(text) => text,
        };

        let body = ChatRequest {
            model: model.id.clone(),
            messages: prompt::build_messages(&self.options.system_prompt, &turn.history, &content),
            stream: model.supports_streaming,
            temperature: self.options.temperature,
            max_tokens: self.options.max_tokens,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
        };

        let request = self
            .client
            .post(construct_api_url(&self.base_url, "chat/completions"))
            .bearer_auth(api_key)
            .header("X-Title", APP_TITLE)
            .json(&body);
        let response = send_with_cancel(NAME, request, &cancel).await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify(ApiErrorInfo::from_body(Some(status.as_u16()), &text)));
        }

        if body.stream {
            return Ok(ProviderReply::Stream(DeltaStream::from_response(
                NAME,
                response,
                Framing::ServerSentEvents,
                OpenAiStreamDecoder,
                cancel,
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|err| ChatError::from_reqwest(NAME, err))?;
        decode_completion(&text).map(ProviderReply::Complete)
    }
}

pub fn decode_completion(body: &str) -> Result<String, ChatError> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|err| ChatError::decode("OpenRouter response", err.to_string()))?;
    if let Some(info) = ApiErrorInfo::from_value(None, &value) {
        return Err(classify(info));
    }
    let completion: ChatCompletion = serde_json::from_value(value)
        .map_err(|err| ChatError::decode("OpenRouter response", err.to_string()))?;
    completion
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| ChatError::decode("OpenRouter response", "no choices returned"))
}
