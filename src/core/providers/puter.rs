//! Puter driver API: premium models, streaming, vision and image generation.

use async_trait::async_trait;
use base64::Engine;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::errors::{mentions_usage_limit, ApiErrorInfo};
use crate::api::{
    ChatMessage, ContentPart, DriverCall, DriverChatArgs, DriverImageArgs, DriverResponse,
    DriverStreamEvent, ImageUrl, MessageContent,
};
use crate::core::attachment::{guess_mime_type, BinaryHandle, FileSource};
use crate::core::auth::Authenticator;
use crate::core::builtin_providers::{ModelDescriptor, ProviderId};
use crate::core::chat_stream::{DeltaStream, Frame, FrameDecoder, Framing};
use crate::core::error::ChatError;
use crate::utils::url::construct_api_url;

use super::prompt::{self, ComposedMessage};
use super::{send_with_cancel, ChatTurn, ImageReference, Provider, ProviderReply, RequestOptions};

const NAME: &str = "puter";
const CHAT_INTERFACE: &str = "puter-chat-completion";
const IMAGE_INTERFACE: &str = "puter-image-generation";

const AUTH_CODES: &[&str] = &["token_auth_failed", "unauthorized", "forbidden", "401"];
const USAGE_CODES: &[&str] = &[
    "error_400_from_delegate",
    "insufficient_funds",
    "rate_limit_exceeded",
    "usage_limit",
    "429",
];

pub fn enhance_image_prompt(prompt: &str) -> String {
    format!(
        "High-quality, photorealistic, detailed: {prompt}. Professional photography, sharp \
         focus, excellent lighting, 4K resolution."
    )
}

/// Map a failed driver call onto the error taxonomy.
pub fn classify(info: ApiErrorInfo) -> ChatError {
    if info.code_is(AUTH_CODES) || matches!(info.status, Some(401)) {
        return ChatError::auth(NAME, info.message);
    }
    if info.code_is(USAGE_CODES)
        || matches!(info.status, Some(402) | Some(429))
        || mentions_usage_limit(&info.message)
    {
        return ChatError::usage_limit(NAME, info.message);
    }
    if matches!(info.status, Some(403)) {
        return ChatError::auth(NAME, info.message);
    }
    ChatError::transport(NAME, info.status, info.message)
}

/// Driver names Puter expects for each model vendor.
fn driver_for(model: &ModelDescriptor) -> Option<String> {
    let driver = match model.provider_name.as_str() {
        "OpenAI" => "openai-completion",
        "Anthropic" => "claude",
        "DeepSeek" => "deepseek",
        _ => return None,
    };
    Some(driver.to_string())
}

struct PuterStreamDecoder;

impl FrameDecoder for PuterStreamDecoder {
    fn decode(&self, payload: &str) -> Frame {
        let value: serde_json::Value = match serde_json::from_str(payload) {
            Ok(value) => value,
            Err(err) => {
                debug!("Skipping malformed Puter frame: {err}");
                return Frame::Skip;
            }
        };
        if let Some(info) = ApiErrorInfo::from_value(None, &value) {
            return Frame::Failed(classify(info));
        }
        let event: DriverStreamEvent = match serde_json::from_value(value) {
            Ok(event) => event,
            Err(_) => return Frame::Skip,
        };
        if event.success == Some(false) {
            return Frame::Failed(classify(ApiErrorInfo {
                status: None,
                code: None,
                message: "stream reported failure".to_string(),
            }));
        }
        match (event.kind.as_deref(), event.text) {
            (Some("text") | None, Some(text)) if !text.is_empty() => Frame::Delta(text),
            (Some("done"), _) => Frame::Done,
            _ => Frame::Skip,
        }
    }
}

pub struct PuterProvider {
    client: reqwest::Client,
    base_url: String,
    auth: Arc<dyn Authenticator>,
    files: Arc<dyn FileSource>,
    options: RequestOptions,
}

impl PuterProvider {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        auth: Arc<dyn Authenticator>,
        files: Arc<dyn FileSource>,
        options: RequestOptions,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            auth,
            files,
            options,
        }
    }

    async fn token(&self, cancel: &CancellationToken) -> Result<String, ChatError> {
        if let Some(identity) = self.auth.current_user() {
            return Ok(identity.token);
        }
        debug!("No Puter session; asking the authenticator to sign in");
        tokio::select! {
            _ = cancel.cancelled() => Err(ChatError::transport(NAME, None, "sign-in cancelled")),
            identity = self.auth.sign_in() => Ok(identity?.token),
        }
    }

    fn driver_request<A: Serialize>(&self, token: &str, call: &DriverCall<A>) -> reqwest::RequestBuilder {
        self.client
            .post(construct_api_url(&self.base_url, "drivers/call"))
            .bearer_auth(token)
            .json(call)
    }

    async fn call_chat(
        &self,
        token: &str,
        model: &ModelDescriptor,
        messages: Vec<ChatMessage>,
        stream: bool,
        cancel: &CancellationToken,
    ) -> Result<ProviderReply, ChatError> {
        let call = DriverCall {
            interface: CHAT_INTERFACE,
            driver: driver_for(model),
            method: "complete",
            args: DriverChatArgs {
                messages,
                model: model.id.clone(),
                stream,
            },
        };
        let response = send_with_cancel(NAME, self.driver_request(token, &call), cancel).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify(ApiErrorInfo::from_body(Some(status.as_u16()), &body)));
        }

        if stream {
            return Ok(ProviderReply::Stream(DeltaStream::from_response(
                NAME,
                response,
                Framing::JsonLines,
                PuterStreamDecoder,
                cancel.clone(),
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|err| ChatError::from_reqwest(NAME, err))?;
        decode_completion(&body).map(ProviderReply::Complete)
    }
}

/// Decode a non-streaming driver response into its text.
pub fn decode_completion(body: &str) -> Result<String, ChatError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|err| ChatError::decode("Puter response", err.to_string()))?;
    if let Some(info) = ApiErrorInfo::from_value(None, &value) {
        return Err(classify(info));
    }
    let response: DriverResponse = serde_json::from_value(value)
        .map_err(|err| ChatError::decode("Puter response", err.to_string()))?;
    if !response.success {
        return Err(classify(ApiErrorInfo {
            status: None,
            code: None,
            message: "driver call was not successful".to_string(),
        }));
    }
    response
        .result
        .map(|result| result.message.content.into_text())
        .ok_or_else(|| ChatError::decode("Puter response", "missing result message"))
}

#[async_trait]
impl Provider for PuterProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Puter
    }

    async fn send_message(
        &self,
        turn: &ChatTurn,
        cancel: CancellationToken,
    ) -> Result<ProviderReply, ChatError> {
        let token = self.token(&cancel).await?;
        let model = self.model_config(&turn.model);

        let content = match prompt::compose_user_message(self, turn, &model, &cancel).await {
            ComposedMessage::Analyzed(analysis) => return Ok(ProviderReply::Complete(analysis)),
            ComposedMessage::Text(text) => text,
        };
        let mut messages = Vec::with_capacity(2);
        if !self.options.system_prompt.trim().is_empty() {
            messages.push(ChatMessage::text("system", self.options.system_prompt.as_str()));
        }
        messages.push(ChatMessage::text(
            "user",
            prompt::build_context_message(&content, &turn.history),
        ));

        if !model.supports_streaming {
            return self.call_chat(&token, &model, messages, false, &cancel).await;
        }
        match self
            .call_chat(&token, &model, messages.clone(), true, &cancel)
            .await
        {
            Err(ChatError::Transport { message, .. }) if !cancel.is_cancelled() => {
                warn!("Puter streaming failed ({message}); retrying without streaming");
                self.call_chat(&token, &model, messages, false, &cancel).await
            }
            other => other,
        }
    }

    fn supports_vision(&self) -> bool {
        true
    }

    async fn generate_image(&self, prompt: &str) -> Result<ImageReference, ChatError> {
        let token = self.token(&CancellationToken::new()).await?;
        let call = DriverCall {
            interface: IMAGE_INTERFACE,
            driver: None,
            method: "generate",
            args: DriverImageArgs {
                prompt: enhance_image_prompt(prompt),
            },
        };
        let response = self
            .driver_request(&token, &call)
            .send()
            .await
            .map_err(|err| ChatError::from_reqwest(NAME, err))?;
        let status = response.status();
        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();

        if !status.is_success() || mime_type.starts_with("application/json") {
            let body = response.text().await.unwrap_or_default();
            return Err(classify(ApiErrorInfo::from_body(Some(status.as_u16()), &body)));
        }
        if !mime_type.starts_with("image/") {
            return Err(ChatError::decode(
                "generated image",
                format!("unexpected content type {mime_type}"),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|err| ChatError::from_reqwest(NAME, err))?;
        Ok(ImageReference::Inline {
            mime_type,
            data: base64::engine::general_purpose::STANDARD.encode(&bytes),
        })
    }

    async fn analyze_image(
        &self,
        model_id: &str,
        image: &BinaryHandle,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String, ChatError> {
        let token = self.token(cancel).await?;
        let model = self.model_config(model_id);
        if !model.multimodal {
            return Err(ChatError::unsupported(
                NAME,
                format!("Image analysis with {}", model.display_name),
            ));
        }

        let bytes = self.files.read_bytes(image).await?;
        let mime_type = guess_mime_type(&image.path().to_string_lossy());
        let data = base64::engine::general_purpose::STANDARD.encode(bytes);
        let prompt = if prompt.trim().is_empty() {
            prompt::DEFAULT_IMAGE_PROMPT
        } else {
            prompt
        };
        let message = ChatMessage {
            role: "user".to_string(),
            content: MessageContent::Parts(vec![
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: format!("data:{mime_type};base64,{data}"),
                    },
                },
                ContentPart::Text {
                    text: prompt.to_string(),
                },
            ]),
        };

        match self
            .call_chat(&token, &model, vec![message], false, cancel)
            .await?
        {
            ProviderReply::Complete(text) => Ok(text),
            ProviderReply::Stream(_) => Err(ChatError::decode(
                "Puter vision response",
                "unexpected streaming reply",
            )),
        }
    }
}
