//! OpenAI-compatible Chat Completions provider (Mistral, OpenAI, Groq, ...)

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{LlmProvider, map_send_error, retry_after};
use crate::{
    error::{Error, Result},
    types::{Completion, CompletionOptions, Context, Message, Model, StopReason, Usage},
};

/// Chat completions API client
pub struct CompletionsProvider {
    client: reqwest::Client,
    api_key: String,
}

impl CompletionsProvider {
    /// Create a new provider with an API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
        }
    }

    /// Bound every request made by this provider
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    fn build_request(&self, model: &Model, context: &Context, options: &CompletionOptions) -> CompletionRequest {
        let mut messages = Vec::with_capacity(context.messages.len() + 1);

        // Add system prompt as first message
        if let Some(ref system_prompt) = context.system_prompt {
            messages.push(WireMessage {
                role: "system",
                content: system_prompt.clone(),
            });
        }

        messages.extend(context.messages.iter().map(convert_message));

        CompletionRequest {
            model: model.id.clone(),
            messages,
            stream: false,
            max_tokens: options.max_tokens.map(|t| t.min(model.max_tokens)),
            temperature: options.temperature,
        }
    }
}

#[async_trait]
impl LlmProvider for CompletionsProvider {
    async fn complete(
        &self,
        model: &Model,
        context: &Context,
        options: &CompletionOptions,
    ) -> Result<Completion> {
        if model.base_url.is_empty() {
            return Err(Error::InvalidConfig(format!(
                "model {} has no base URL",
                model.id
            )));
        }

        let request = self.build_request(model, context, options);
        let url = format!("{}/chat/completions", model.base_url);

        let mut builder = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request);

        // Add model-specific headers
        for (key, value) in &model.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }

        tracing::debug!(model = %model.id, messages = request.messages.len(), "chat completion request");

        let response = builder.send().await.map_err(map_send_error)?;
        let status = response.status();
        if !status.is_success() {
            let retry = retry_after(response.headers());
            let text = response.text().await.unwrap_or_default();
            return Err(Error::from_status(status, retry, text));
        }

        let body: CompletionResponse = response.json().await.map_err(map_send_error)?;
        parse_completion(body)
    }
}

fn convert_message(msg: &Message) -> WireMessage {
    WireMessage {
        role: msg.role.as_str(),
        content: msg.content.clone(),
    }
}

fn parse_completion(body: CompletionResponse) -> Result<Completion> {
    let choice = body
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| Error::UnexpectedResponse("response contained no choices".into()))?;

    let stop_reason = choice.finish_reason.as_deref().map(|r| match r {
        "stop" => StopReason::Stop,
        "length" | "model_length" => StopReason::Length,
        _ => StopReason::Other,
    });

    let usage = body
        .usage
        .map(|u| Usage {
            input: u.prompt_tokens,
            output: u.completion_tokens,
        })
        .unwrap_or_default();

    Ok(Completion {
        text: choice.message.content.unwrap_or_default(),
        usage,
        stop_reason,
    })
}

// Request/Response types

#[derive(Debug, Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
    #[serde(default)]
    usage: Option<CompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::resolve_model;
    use crate::test_server::CannedResponse;
    use crate::types::Provider;

    fn test_model() -> Model {
        resolve_model(Provider::Mistral, "mistral-large-2512", None)
    }

    #[test]
    fn test_request_puts_system_prompt_first() {
        let provider = CompletionsProvider::new("key");
        let mut context = Context::with_system("be precise");
        context.push(Message::user("hello"));
        context.push(Message::system("Here is verified search info:\nfact"));

        let options = CompletionOptions {
            max_tokens: Some(2048),
            temperature: Some(0.0),
        };
        let request = provider.build_request(&test_model(), &context, &options);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "mistral-large-2512");
        assert_eq!(json["stream"], false);
        assert_eq!(json["max_tokens"], 2048);
        assert_eq!(json["temperature"], 0.0);
        let roles: Vec<&str> = json["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["role"].as_str().unwrap())
            .collect();
        assert_eq!(roles, vec!["system", "user", "system"]);
    }

    #[test]
    fn test_request_omits_unset_options() {
        let provider = CompletionsProvider::new("key");
        let request = provider.build_request(&test_model(), &Context::default(), &CompletionOptions::default());
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("max_tokens").is_none());
        assert!(json.get("temperature").is_none());
    }

    #[test]
    fn test_max_tokens_clamped_to_model() {
        let provider = CompletionsProvider::new("key");
        let options = CompletionOptions {
            max_tokens: Some(1_000_000),
            temperature: None,
        };
        let request = provider.build_request(&test_model(), &Context::default(), &options);
        assert_eq!(request.max_tokens, Some(8192));
    }

    #[test]
    fn test_parse_completion() {
        let body: CompletionResponse = serde_json::from_str(
            r#"{
                "id": "cmpl-1",
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "4."}, "finish_reason": "stop"}],
                "usage": {"prompt_tokens": 12, "completion_tokens": 2, "total_tokens": 14}
            }"#,
        )
        .unwrap();
        let completion = parse_completion(body).unwrap();
        assert_eq!(completion.text, "4.");
        assert_eq!(completion.stop_reason, Some(StopReason::Stop));
        assert_eq!(completion.usage, Usage { input: 12, output: 2 });
    }

    #[test]
    fn test_parse_completion_without_choices() {
        let body: CompletionResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(matches!(
            parse_completion(body),
            Err(Error::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn test_parse_completion_null_content() {
        let body: CompletionResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"content": null}, "finish_reason": "length"}]}"#,
        )
        .unwrap();
        let completion = parse_completion(body).unwrap();
        assert_eq!(completion.text, "");
        assert_eq!(completion.stop_reason, Some(StopReason::Length));
    }

    fn local_model(base_url: &str) -> Model {
        resolve_model(Provider::Custom, "local-model", Some(base_url))
    }

    #[tokio::test]
    async fn test_complete_against_local_server() {
        let (base_url, server) = CannedResponse::json(
            200,
            r#"{"choices": [{"message": {"content": "Paris."}, "finish_reason": "stop"}],
                "usage": {"prompt_tokens": 9, "completion_tokens": 1}}"#,
        )
        .serve()
        .await;

        let provider = CompletionsProvider::new("sk-local");
        let mut context = Context::with_system("answer briefly");
        context.push(Message::user("Capital of France?"));
        let completion = provider
            .complete(&local_model(&base_url), &context, &CompletionOptions::default())
            .await
            .unwrap();

        assert_eq!(completion.text, "Paris.");
        assert_eq!(completion.usage, Usage { input: 9, output: 1 });

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /chat/completions "));
        assert!(request.to_lowercase().contains("authorization: bearer sk-local"));
        assert!(request.contains("Capital of France?"));
    }

    #[tokio::test]
    async fn test_complete_rate_limited() {
        let (base_url, _server) = CannedResponse::json(429, r#"{"message": "slow down"}"#)
            .header("retry-after", "7")
            .serve()
            .await;

        let provider = CompletionsProvider::new("sk-local");
        let err = provider
            .complete(&local_model(&base_url), &Context::default(), &CompletionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RateLimited { retry_after: Some(7) }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_complete_server_error_is_retryable() {
        let (base_url, _server) = CannedResponse::json(503, "upstream down").serve().await;

        let provider = CompletionsProvider::new("sk-local");
        let err = provider
            .complete(&local_model(&base_url), &Context::default(), &CompletionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Api { .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_complete_without_base_url() {
        let model = resolve_model(Provider::Custom, "local-model", None);
        let err = CompletionsProvider::new("sk-local")
            .complete(&model, &Context::default(), &CompletionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }
}
