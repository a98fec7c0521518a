//! SendGrid mail client

use std::time::Duration;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::providers::{map_send_error, retry_after};

const BASE_URL: &str = "https://api.sendgrid.com/v3";

/// Environment variable holding the SendGrid key
pub const SENDGRID_API_KEY_VAR: &str = "SENDGRID_API_KEY";
/// Environment variable holding the sender address
pub const FROM_EMAIL_VAR: &str = "FROM_EMAIL";

/// An outgoing email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    /// HTML body
    pub html: String,
}

/// SendGrid v3 API client
#[derive(Clone)]
pub struct SendGridClient {
    client: reqwest::Client,
    api_key: String,
    from: String,
    base_url: String,
}

impl SendGridClient {
    /// Create a new client sending from `from`
    pub fn new(api_key: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            from: from.into(),
            base_url: BASE_URL.to_string(),
        }
    }

    /// Bound every request made by this client
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    /// Override the API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Send an email. Returns the HTTP status code on success.
    pub async fn send(&self, email: &Email) -> Result<u16> {
        let request = MailRequest::new(&self.from, email);
        let url = format!("{}/mail/send", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let retry = retry_after(response.headers());
            let text = response.text().await.unwrap_or_default();
            return Err(Error::from_status(status, retry, text));
        }

        tracing::debug!(to = %email.to, status = status.as_u16(), "email accepted");
        Ok(status.as_u16())
    }
}

#[derive(Debug, Serialize)]
struct MailRequest<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: Address<'a>,
    subject: &'a str,
    content: Vec<MailContent<'a>>,
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: Vec<Address<'a>>,
}

#[derive(Debug, Serialize)]
struct Address<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct MailContent<'a> {
    #[serde(rename = "type")]
    content_type: &'static str,
    value: &'a str,
}

impl<'a> MailRequest<'a> {
    fn new(from: &'a str, email: &'a Email) -> Self {
        Self {
            personalizations: vec![Personalization {
                to: vec![Address { email: &email.to }],
            }],
            from: Address { email: from },
            subject: &email.subject,
            content: vec![MailContent {
                content_type: "text/html",
                value: &email.html,
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server::CannedResponse;

    #[test]
    fn test_mail_request_shape() {
        let email = Email {
            to: "ada@example.com".into(),
            subject: "Notes".into(),
            html: "<p>hi</p>".into(),
        };
        let json = serde_json::to_value(MailRequest::new("bot@example.com", &email)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "personalizations": [{"to": [{"email": "ada@example.com"}]}],
                "from": {"email": "bot@example.com"},
                "subject": "Notes",
                "content": [{"type": "text/html", "value": "<p>hi</p>"}]
            })
        );
    }

    #[tokio::test]
    async fn test_send_against_local_server() {
        let (base_url, server) = CannedResponse::json(202, "").serve().await;
        let client = SendGridClient::new("SG.key", "bot@example.com").with_base_url(base_url);
        let email = Email {
            to: "ada@example.com".into(),
            subject: "Notes".into(),
            html: "<p>hi</p>".into(),
        };

        assert_eq!(client.send(&email).await.unwrap(), 202);
        let request = server.await.unwrap();
        assert!(request.starts_with("POST /mail/send "));
        assert!(request.contains("ada@example.com"));
    }

    #[tokio::test]
    async fn test_send_rejected() {
        let (base_url, _server) =
            CannedResponse::json(400, r#"{"errors": [{"message": "bad from"}]}"#).serve().await;
        let client = SendGridClient::new("SG.key", "nobody").with_base_url(base_url);
        let email = Email {
            to: "ada@example.com".into(),
            subject: "s".into(),
            html: String::new(),
        };
        let err = client.send(&email).await.unwrap_err();
        assert!(err.to_string().contains("bad from"));
        assert!(!err.is_retryable());
    }
}
