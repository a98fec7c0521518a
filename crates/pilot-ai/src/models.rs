//! Model registry with public lookup API.

use crate::{Error, Model, Provider, Result};

/// Default model used when nothing else is configured.
pub const DEFAULT_MODEL: &str = "mistral-large-2512";

struct ModelEntry {
    id: &'static str,
    provider: Provider,
    max_tokens: u32,
}

const MODEL_ENTRIES: &[ModelEntry] = &[
    ModelEntry {
        id: "mistral-large-2512",
        provider: Provider::Mistral,
        max_tokens: 8192,
    },
    ModelEntry {
        id: "mistral-medium-latest",
        provider: Provider::Mistral,
        max_tokens: 8192,
    },
    ModelEntry {
        id: "mistral-small-latest",
        provider: Provider::Mistral,
        max_tokens: 8192,
    },
    ModelEntry {
        id: "gpt-4o",
        provider: Provider::OpenAI,
        max_tokens: 16384,
    },
    ModelEntry {
        id: "gpt-4o-mini",
        provider: Provider::OpenAI,
        max_tokens: 16384,
    },
    ModelEntry {
        id: "llama-3.3-70b-versatile",
        provider: Provider::Groq,
        max_tokens: 32768,
    },
];

impl ModelEntry {
    fn to_model(&self) -> Model {
        Model {
            id: self.id.to_string(),
            provider: self.provider,
            base_url: self.provider.default_base_url().to_string(),
            max_tokens: self.max_tokens,
            headers: Default::default(),
        }
    }
}

/// Look up a model by ID only (first match across all providers).
pub fn get_model_by_id(id: &str) -> Option<Model> {
    MODEL_ENTRIES
        .iter()
        .find(|e| e.id == id)
        .map(|e| e.to_model())
}

/// First registered model for `provider`, if any.
pub fn default_model_for(provider: Provider) -> Option<&'static str> {
    MODEL_ENTRIES
        .iter()
        .find(|e| e.provider == provider)
        .map(|e| e.id)
}

/// Resolve a model: registry first, otherwise build one for the given provider.
///
/// Under [`Provider::Custom`] a registered id is served by the custom
/// endpoint, so only `base_url` decides where requests go.
pub fn resolve_model(provider: Provider, id: &str, base_url: Option<&str>) -> Model {
    let mut model = get_model_by_id(id).unwrap_or_else(|| Model {
        id: id.to_string(),
        provider,
        base_url: provider.default_base_url().to_string(),
        max_tokens: 8192,
        headers: Default::default(),
    });
    if provider == Provider::Custom {
        model.provider = Provider::Custom;
        model.base_url = String::new();
    }
    if let Some(url) = base_url {
        model.base_url = url.trim_end_matches('/').to_string();
    }
    model
}

/// Check that `model` is served by `provider` and has somewhere to send requests.
pub fn validate_model(provider: Provider, model: &Model) -> Result<()> {
    if model.provider != provider {
        return Err(Error::InvalidConfig(format!(
            "model {} belongs to {}, not {}",
            model.id,
            model.provider.name(),
            provider.name()
        )));
    }
    if model.base_url.is_empty() {
        return Err(Error::InvalidConfig(format!(
            "{} provider needs a base_url for model {}",
            provider.name(),
            model.id
        )));
    }
    Ok(())
}
