//! Response synthesis: turn transcript plus optional search context into a reply.

use std::sync::Arc;

use async_trait::async_trait;
use pilot_ai::providers::LlmProvider;
use pilot_ai::{CompletionOptions, Context, Message, Model, Role};

use crate::search::{Augmentation, strip_marker};
use crate::transcript::Transcript;

/// Phrase the model is told to use when context is insufficient
pub const FALLBACK_PHRASE: &str = "I am not sure.";

/// Output budget for one reply
pub const MAX_REPLY_TOKENS: u32 = 2048;

const INSTRUCTION: &str = "You are a precise AI assistant. Answer using the conversation and \
any verified search info provided. Do NOT hallucinate or invent facts. If the provided \
context is insufficient to answer, respond exactly: 'I am not sure.'";

const SEARCH_INFO_HEADER: &str = "Here is verified search info:\n";

/// Produces the assistant's reply for a turn
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(
        &self,
        transcript: &Transcript,
        augmentation: Option<&Augmentation>,
    ) -> pilot_ai::Result<String>;
}

/// Build the prompt for one synthesis request.
///
/// Stored system messages are dropped unless they carry search results
/// from older transcripts.
pub fn build_context(transcript: &Transcript, augmentation: Option<&Augmentation>) -> Context {
    let mut context = Context::with_system(INSTRUCTION);

    for message in transcript.messages() {
        match message.role {
            Role::User | Role::Assistant => context.push(message.clone()),
            Role::System => {
                if let Some(body) = strip_marker(&message.content) {
                    context.push(search_info(body));
                }
            }
        }
    }

    if let Some(aug) = augmentation {
        context.push(search_info(aug.body()));
    }

    context
}

fn search_info(body: &str) -> Message {
    Message::system(format!("{}{}", SEARCH_INFO_HEADER, body))
}

/// Synthesizer backed by a chat completion model
pub struct LlmSynthesizer {
    provider: Arc<dyn LlmProvider>,
    model: Model,
    options: CompletionOptions,
}

impl LlmSynthesizer {
    pub fn new(provider: Arc<dyn LlmProvider>, model: Model) -> Self {
        Self {
            provider,
            model,
            options: CompletionOptions {
                max_tokens: Some(MAX_REPLY_TOKENS),
                temperature: Some(0.0),
            },
        }
    }
}

#[async_trait]
impl Synthesizer for LlmSynthesizer {
    async fn synthesize(
        &self,
        transcript: &Transcript,
        augmentation: Option<&Augmentation>,
    ) -> pilot_ai::Result<String> {
        let context = build_context(transcript, augmentation);
        let completion = self
            .provider
            .complete(&self.model, &context, &self.options)
            .await?;
        tracing::debug!(
            input_tokens = completion.usage.input,
            output_tokens = completion.usage.output,
            stop_reason = ?completion.stop_reason,
            "synthesis completed"
        );
        Ok(completion.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_without_augmentation() {
        let transcript = Transcript::from_messages(vec![
            Message::user("What is 2+2?"),
            Message::assistant("4."),
            Message::user("And doubled?"),
        ]);
        let context = build_context(&transcript, None);
        assert!(context.system_prompt.as_deref().unwrap().contains(FALLBACK_PHRASE));
        assert_eq!(context.messages, transcript.messages());
    }

    #[test]
    fn test_augmentation_appended_last() {
        let transcript = Transcript::from_messages(vec![Message::user("Who won?")]);
        let aug = Augmentation::from_snippets(["Team A won 3-1"]).unwrap();
        let context = build_context(&transcript, Some(&aug));

        assert_eq!(context.messages.len(), 2);
        let last = context.messages.last().unwrap();
        assert_eq!(last.role, Role::System);
        assert_eq!(last.content, "Here is verified search info:\nTeam A won 3-1");
    }

    #[test]
    fn test_stored_system_messages() {
        let transcript = Transcript::from_messages(vec![
            Message::user("Weather in Cairo?"),
            Message::system("SEARCH_REQUIRED"),
            Message::system("SEARCH_RESULT: 31C and sunny"),
            Message::assistant("31C and sunny."),
        ]);
        let context = build_context(&transcript, None);
        let contents: Vec<&str> = context.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(
            contents,
            vec![
                "Weather in Cairo?",
                "Here is verified search info:\n31C and sunny",
                "31C and sunny."
            ]
        );
    }
}
