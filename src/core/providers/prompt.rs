//! Prompt assembly shared by the adapters: system preamble, recent history
//! and attachment context.

use crate::api::ChatMessage;
use crate::core::attachment::UploadedAttachment;
use crate::core::builtin_providers::ModelDescriptor;
use crate::core::message::Message;
use tokio_util::sync::CancellationToken;

use super::{ChatTurn, Provider};

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant. Provide clear, accurate, \
and helpful responses. When showing code, ALWAYS format it in markdown code blocks with the \
language name, for example ```python for Python code. Be concise but thorough.";

/// Number of earlier conversation entries sent with each turn.
pub const HISTORY_WINDOW: usize = 10;

const CONTEXT_ASSISTANT_LIMIT: usize = 200;

pub const DEFAULT_IMAGE_PROMPT: &str = "Analyze this image and tell me what you see";

/// Result of preparing the user message for a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposedMessage {
    /// An attached image was analysed; the analysis is the whole reply.
    Analyzed(String),
    /// Text to send to the model.
    Text(String),
}

/// The last [`HISTORY_WINDOW`] user/assistant entries of `history`.
pub fn recent_history(history: &[Message]) -> Vec<&Message> {
    let conversational: Vec<&Message> = history.iter().filter(|m| m.is_conversational()).collect();
    let skip = conversational.len().saturating_sub(HISTORY_WINDOW);
    conversational.into_iter().skip(skip).collect()
}

/// System preamble, recent history and the current user message.
pub fn build_messages(system_prompt: &str, history: &[Message], user_content: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(HISTORY_WINDOW + 2);
    if !system_prompt.trim().is_empty() {
        messages.push(ChatMessage::text("system", system_prompt));
    }
    for entry in recent_history(history) {
        if let Some(role) = entry.role.to_api_role() {
            messages.push(ChatMessage::text(role, entry.content.as_str()));
        }
    }
    messages.push(ChatMessage::text("user", user_content));
    messages
}

/// Fold recent history into a single message for backends that take one
/// prompt string. Assistant replies are shortened to keep the prompt small.
pub fn build_context_message(user_content: &str, history: &[Message]) -> String {
    let recent = recent_history(history);
    if recent.is_empty() {
        return user_content.to_string();
    }

    let mut context = String::from("Previous conversation context:\n\n");
    for entry in recent {
        if entry.is_user() {
            context.push_str(&format!("User: {}\n\n", entry.content));
        } else {
            context.push_str(&format!(
                "Assistant: {}\n\n",
                truncate_chars(&entry.content, CONTEXT_ASSISTANT_LIMIT)
            ));
        }
    }
    context.push_str("\nCurrent message:\n");
    context.push_str(user_content);
    context
}

fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(limit).collect();
    cut.push_str("...");
    cut
}

/// Append an `Attached files:` section describing each attachment. Images get
/// a note unless the adapter can look at them.
pub fn attachment_context(attachments: &[UploadedAttachment], vision: bool) -> String {
    if attachments.is_empty() {
        return String::new();
    }

    let mut context = String::from("\n\nAttached files:\n");
    for attachment in attachments {
        if let Some(text) = &attachment.text_content {
            context.push_str(&format!("\n--- {} ---\n{}\n", attachment.name, text));
        } else if attachment.is_image() {
            context.push_str(&format!(
                "\n- Image: {} ({})",
                attachment.name, attachment.mime_type
            ));
            if !vision {
                context.push_str(" - Note: Image analysis not available with this model");
            }
            context.push('\n');
        } else {
            context.push_str(&format!(
                "\n- File: {} ({}, {} bytes)\n",
                attachment.name, attachment.mime_type, attachment.size
            ));
        }
    }
    context
}

/// Prepare the user message for `turn`.
///
/// When the adapter supports vision, the model is multimodal and an image is
/// attached, the provider is asked to analyse the first image; a successful
/// analysis short-circuits the turn. Failures are noted inline and the turn
/// continues as text.
pub async fn compose_user_message(
    provider: &dyn Provider,
    turn: &ChatTurn,
    model: &ModelDescriptor,
    cancel: &CancellationToken,
) -> ComposedMessage {
    let mut content = turn.message.clone();
    let vision = provider.supports_vision() && model.multimodal;

    if vision {
        let image = turn
            .attachments
            .iter()
            .find(|a| a.is_image() && a.binary_handle.is_some());
        if let Some((attachment, handle)) =
            image.and_then(|a| a.binary_handle.as_ref().map(|h| (a, h)))
        {
            let prompt = if turn.message.trim().is_empty() {
                DEFAULT_IMAGE_PROMPT
            } else {
                turn.message.as_str()
            };
            match provider.analyze_image(&model.id, handle, prompt, cancel).await {
                Ok(analysis) => return ComposedMessage::Analyzed(analysis),
                Err(err) => {
                    tracing::debug!("Image analysis of {} failed: {err}", attachment.name);
                    content.push_str(&format!("\n\n[Note: Image analysis unavailable - {err}]"));
                }
            }
        }
    }

    content.push_str(&attachment_context(&turn.attachments, vision));
    ComposedMessage::Text(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MessageContent;
    use crate::core::attachment::BinaryHandle;
    use crate::core::builtin_providers::{builtin_provider, ProviderId};
    use crate::core::error::ChatError;
    use crate::utils::test_utils::ScriptedProvider;

    fn text_file(name: &str, body: &str) -> UploadedAttachment {
        UploadedAttachment {
            name: name.into(),
            size: body.len() as u64,
            mime_type: "text/plain".into(),
            text_content: Some(body.into()),
            binary_handle: None,
        }
    }

    fn image(name: &str) -> UploadedAttachment {
        UploadedAttachment {
            name: name.into(),
            size: 2048,
            mime_type: "image/png".into(),
            text_content: None,
            binary_handle: Some(BinaryHandle::new(format!("/tmp/{name}"))),
        }
    }

    fn history(count: usize) -> Vec<Message> {
        (0..count)
            .flat_map(|i| {
                [
                    Message::user(format!("q{i}")),
                    Message::system("switched model"),
                    Message::assistant(format!("a{i}")),
                ]
            })
            .collect()
    }

    #[test]
    fn only_the_last_ten_conversational_entries_are_sent() {
        let messages = build_messages("sys", &history(8), "now");
        assert_eq!(messages.len(), 12);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].text_content(), Some("q3"));
        assert_eq!(messages[10].text_content(), Some("a7"));
        assert_eq!(messages[11].content, MessageContent::Text("now".into()));
        assert!(messages.iter().all(|m| m.role != "error"));
    }

    #[test]
    fn empty_system_prompt_is_omitted() {
        let messages = build_messages("  ", &[], "hi");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, "user");
    }

    #[test]
    fn context_message_truncates_assistant_turns() {
        let long_reply = "x".repeat(250);
        let history = vec![Message::user("hello"), Message::assistant(long_reply)];
        let folded = build_context_message("next", &history);

        assert!(folded.starts_with("Previous conversation context:\n\nUser: hello\n\n"));
        assert!(folded.contains(&format!("Assistant: {}...", "x".repeat(200))));
        assert!(folded.ends_with("\nCurrent message:\nnext"));
        assert_eq!(build_context_message("solo", &[]), "solo");
    }

    #[test]
    fn attachments_are_inlined_or_summarized() {
        let attachments = vec![
            text_file("notes.md", "# Notes"),
            image("cat.png"),
            UploadedAttachment {
                name: "data.bin".into(),
                size: 1536,
                mime_type: "application/octet-stream".into(),
                text_content: None,
                binary_handle: Some(BinaryHandle::new("/tmp/data.bin")),
            },
        ];

        let context = attachment_context(&attachments, false);
        assert!(context.starts_with("\n\nAttached files:\n"));
        assert!(context.contains("--- notes.md ---\n# Notes"));
        assert!(context.contains(
            "- Image: cat.png (image/png) - Note: Image analysis not available with this model"
        ));
        assert!(context.contains("\n- File: data.bin (application/octet-stream, 1536 bytes)\n"));
        assert_eq!(attachment_context(&[], false), "");

        let seen = attachment_context(&attachments, true);
        assert!(seen.contains("- Image: cat.png (image/png)\n"));
        assert!(!seen.contains("Note: Image analysis"));
    }

    fn turn_with_image(message: &str) -> ChatTurn {
        ChatTurn {
            attachments: vec![image("cat.png")],
            ..ChatTurn::new("openai", message)
        }
    }

    #[tokio::test]
    async fn multimodal_models_without_vision_only_summarize_images() {
        let provider = ScriptedProvider::new(ProviderId::Pollinations);
        let model = builtin_provider(ProviderId::Pollinations).model_or_default("openai");
        assert!(model.multimodal);

        let composed = compose_user_message(
            &provider,
            &turn_with_image("what is this"),
            model,
            &CancellationToken::new(),
        )
        .await;

        let ComposedMessage::Text(text) = composed else {
            panic!("expected a text message");
        };
        assert!(text.starts_with("what is this\n\nAttached files:\n"));
        assert!(text.contains(
            "- Image: cat.png (image/png) - Note: Image analysis not available with this model"
        ));
        assert!(!text.contains("[Note: Image analysis unavailable"));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn vision_providers_answer_with_the_analysis() {
        let provider = ScriptedProvider::new(ProviderId::Pollinations);
        provider.set_analysis(Ok("a sleepy cat".into()));
        let model = builtin_provider(ProviderId::Pollinations).model_or_default("openai");

        let composed =
            compose_user_message(&provider, &turn_with_image(""), model, &CancellationToken::new())
                .await;
        assert_eq!(composed, ComposedMessage::Analyzed("a sleepy cat".into()));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn failed_analysis_is_noted_and_the_turn_continues() {
        let provider = ScriptedProvider::new(ProviderId::Pollinations);
        provider.set_analysis(Err(ChatError::transport("pollinations", Some(502), "bad gateway")));
        let model = builtin_provider(ProviderId::Pollinations).model_or_default("openai");

        let composed =
            compose_user_message(&provider, &turn_with_image("hi"), model, &CancellationToken::new())
                .await;
        let ComposedMessage::Text(text) = composed else {
            panic!("expected a text message");
        };
        assert!(text.starts_with("hi\n\n[Note: Image analysis unavailable - "));
        assert!(text.contains("- Image: cat.png (image/png)\n"));
    }
}
