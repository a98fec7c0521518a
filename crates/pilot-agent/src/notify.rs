//! Notification sink: best-effort email delivery.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use pilot_ai::mail::{Email, SendGridClient};
use pilot_ai::providers::LlmProvider;
use pilot_ai::{CompletionOptions, Context, Message, Model};
use regex::Regex;
use serde::Deserialize;

use crate::error::{Error, Result};

const DEFAULT_SUBJECT: &str = "No Subject";

const EXTRACT_PROMPT: &str = r#"You extract email fields from the user's request STRICTLY as valid JSON.
Respond ONLY with JSON, no explanations, no backticks.
Format:
{
  "to": "recipient@example.com",
  "subject": "Subject here",
  "content": "Body content here"
}
Use double quotes and escape any quotes inside content."#;

static JSON_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("valid regex"));

/// One message for the sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

impl Notification {
    pub fn new(
        recipient: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            recipient: recipient.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Summary of a finished turn
    pub fn for_turn(recipient: impl Into<String>, question: &str, answer: &str) -> Self {
        let subject = format!("Assistant reply: {}", first_line(question, 60));
        let body = format!(
            "<p><strong>You asked:</strong></p><p>{}</p><p><strong>Answer:</strong></p><p>{}</p>",
            escape_html(question),
            escape_html(answer)
        );
        Self::new(recipient, subject, body)
    }
}

/// Delivers notifications to the outside world
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, recipient: &str, subject: &str, body: &str) -> pilot_ai::Result<()>;
}

/// [`Notifier`] backed by SendGrid
pub struct SendGridNotifier {
    client: SendGridClient,
}

impl SendGridNotifier {
    pub fn new(client: SendGridClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Notifier for SendGridNotifier {
    async fn notify(&self, recipient: &str, subject: &str, body: &str) -> pilot_ai::Result<()> {
        let email = Email {
            to: recipient.to_string(),
            subject: subject.to_string(),
            html: body.to_string(),
        };
        self.client.send(&email).await.map(|_| ())
    }
}

/// Ask the model to turn a free-form instruction into an email
pub async fn compose_email(
    provider: &Arc<dyn LlmProvider>,
    model: &Model,
    instruction: &str,
) -> Result<Notification> {
    let mut context = Context::with_system(EXTRACT_PROMPT);
    context.push(Message::user(instruction));
    let options = CompletionOptions {
        max_tokens: Some(1024),
        temperature: Some(0.0),
    };

    let completion = provider
        .complete(model, &context, &options)
        .await
        .map_err(|e| Error::EmailRequest(e.to_string()))?;
    parse_email_request(&completion.text)
}

#[derive(Debug, Deserialize)]
struct EmailFields {
    #[serde(default)]
    to: Option<String>,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

/// Parse the first JSON object found in model output into an email
pub fn parse_email_request(raw: &str) -> Result<Notification> {
    let json = JSON_OBJECT
        .find(raw)
        .ok_or_else(|| Error::EmailRequest("could not find JSON in model output".into()))?;

    let fields: EmailFields = serde_json::from_str(json.as_str())
        .map_err(|e| Error::EmailRequest(format!("JSON parse error: {}", e)))?;

    let to = fields
        .to
        .map(|t| t.trim().to_string())
        .filter(|t| t.contains('@'))
        .ok_or_else(|| Error::EmailRequest("missing or invalid 'to' address".into()))?;

    let subject = fields
        .subject
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SUBJECT.to_string());

    Ok(Notification::new(to, subject, fields.content.unwrap_or_default()))
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\n', "<br/>")
}

fn first_line(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or("").trim();
    let mut chars = line.chars();
    let head: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
