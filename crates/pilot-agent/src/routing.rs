//! Routing decision: does a query need a web search?

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use pilot_ai::providers::LlmProvider;
use pilot_ai::{CompletionOptions, Context, Message, Model};
use serde::{Deserialize, Serialize};

/// Label the classifier emits when a search is needed
pub const SEARCH_REQUIRED: &str = "SEARCH_REQUIRED";
/// Label the classifier emits when no search is needed
pub const NO_SEARCH: &str = "NO_SEARCH";

const CLASSIFIER_PROMPT: &str = "Classify whether answering the user's message requires \
fresh information from a web search (current events, prices, schedules, recent releases, \
facts that change over time). Respond ONLY with one of:\n\
- SEARCH_REQUIRED\n\
- NO_SEARCH";

/// Outcome of routing one user message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    SearchRequired,
    NoSearch,
}

impl Route {
    /// Map raw classifier output to a route.
    ///
    /// Anything other than the two known labels is `NoSearch`.
    pub fn from_label(raw: &str) -> Self {
        let label = raw
            .trim()
            .trim_matches(|c: char| c == '`' || c == '"' || c == '\'' || c == '.')
            .trim()
            .to_uppercase();
        match label.as_str() {
            SEARCH_REQUIRED => Route::SearchRequired,
            NO_SEARCH => Route::NoSearch,
            _ => {
                tracing::debug!(raw, "unrecognized routing label, defaulting to no search");
                Route::NoSearch
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Route::SearchRequired => SEARCH_REQUIRED,
            Route::NoSearch => NO_SEARCH,
        }
    }

    pub fn needs_search(&self) -> bool {
        matches!(self, Route::SearchRequired)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Produces a raw routing label for a user message
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify `message`, returning the model's raw label
    async fn classify(&self, message: &str) -> pilot_ai::Result<String>;
}

/// Classifier backed by a chat completion model
pub struct LlmClassifier {
    provider: Arc<dyn LlmProvider>,
    model: Model,
}

impl LlmClassifier {
    pub fn new(provider: Arc<dyn LlmProvider>, model: Model) -> Self {
        Self { provider, model }
    }

    fn context(message: &str) -> Context {
        let mut context = Context::with_system(CLASSIFIER_PROMPT);
        context.push(Message::user(message));
        context
    }
}

#[async_trait]
impl Classifier for LlmClassifier {
    async fn classify(&self, message: &str) -> pilot_ai::Result<String> {
        let options = CompletionOptions {
            max_tokens: Some(8),
            temperature: Some(0.0),
        };
        let completion = self
            .provider
            .complete(&self.model, &Self::context(message), &options)
            .await?;
        Ok(completion.text)
    }
}
