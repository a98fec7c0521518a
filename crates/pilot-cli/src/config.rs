//! Configuration file support

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for pilot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default model to use
    pub model: Option<String>,
    /// Default provider
    pub provider: Option<String>,
    /// Override the provider's API base URL
    pub base_url: Option<String>,
    /// Override the Tavily API base URL
    pub search_base_url: Option<String>,
    /// Override the SendGrid API base URL
    pub mail_base_url: Option<String>,
    /// Identifier chats are grouped under
    pub user_id: Option<String>,
    /// Where transcripts and chat indexes live
    pub data_dir: Option<String>,
    /// Deadline for each remote call, in seconds
    pub timeout_secs: Option<u64>,
    /// Email every reply to this address
    pub notify_to: Option<String>,
    /// Sender address for outgoing email
    pub from_email: Option<String>,
    /// API keys (alternative to environment variables)
    #[serde(default)]
    pub api_keys: ApiKeys,
}

/// API key configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiKeys {
    pub mistral: Option<String>,
    pub openai: Option<String>,
    pub groq: Option<String>,
    pub tavily: Option<String>,
    pub sendgrid: Option<String>,
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pilot")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("PILOT_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from the default location
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load config from `path`, falling back to defaults on any problem
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: Failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Warning: Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    /// Save config to `path`
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Create a default config file if it doesn't exist
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }

        let default_config = Config {
            model: Some(pilot_ai::models::DEFAULT_MODEL.to_string()),
            provider: Some("mistral".to_string()),
            timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
            ..Default::default()
        };

        default_config.save_to(&path)?;
        Ok(path)
    }

    /// Get API key for a service, checking config then env
    pub fn get_api_key(&self, service: &str) -> Option<String> {
        let from_config = match service {
            "mistral" => self.api_keys.mistral.clone(),
            "openai" => self.api_keys.openai.clone(),
            "groq" => self.api_keys.groq.clone(),
            "tavily" => self.api_keys.tavily.clone(),
            "sendgrid" => self.api_keys.sendgrid.clone(),
            _ => None,
        };

        if let Some(key) = from_config.filter(|k| !k.is_empty()) {
            return Some(key);
        }

        let env_var = match service {
            "mistral" => "MISTRAL_API_KEY",
            "openai" => "OPENAI_API_KEY",
            "groq" => "GROQ_API_KEY",
            "tavily" => pilot_ai::search::TAVILY_API_KEY_VAR,
            "sendgrid" => pilot_ai::mail::SENDGRID_API_KEY_VAR,
            _ => return None,
        };

        std::env::var(env_var).ok().filter(|k| !k.is_empty())
    }

    /// Sender address from config, then `FROM_EMAIL`
    pub fn from_email(&self) -> Option<String> {
        self.from_email
            .clone()
            .or_else(|| std::env::var(pilot_ai::mail::FROM_EMAIL_VAR).ok())
            .filter(|s| !s.is_empty())
    }

    /// Directory holding transcripts and chat indexes
    pub fn data_dir(&self) -> PathBuf {
        match self.data_dir {
            Some(ref dir) => PathBuf::from(dir),
            None => dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("pilot")
                .join("chats"),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS).max(1))
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# pilot configuration file
# Place at ~/.config/pilot/config.toml (Linux) or set PILOT_CONFIG_PATH

# Default model to use
model = "mistral-large-2512"

# Default provider (mistral, openai, groq, custom)
provider = "mistral"

# Base URL override, required for the custom provider
# base_url = "http://localhost:11434/v1"

# Search and mail endpoint overrides, e.g. for a proxy
# search_base_url = "https://api.tavily.com"
# mail_base_url = "https://api.sendgrid.com/v3"

# Chats are grouped under this id
# user_id = "me"

# Where transcripts are stored (default: ~/.local/share/pilot/chats)
# data_dir = "/path/to/chats"

# Deadline for each remote call, in seconds
timeout_secs = 30

# Email every reply to this address (needs a SendGrid key and from_email)
# notify_to = "me@example.com"
# from_email = "pilot@example.com"

# API keys (optional - can also use environment variables)
# MISTRAL_API_KEY, TAVILY_API_KEY, SENDGRID_API_KEY, FROM_EMAIL
[api_keys]
# mistral = "..."
# tavily = "tvly-..."
# sendgrid = "SG...."
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_example_config_parses() {
        let config: Config = toml::from_str(example_config()).unwrap();
        assert_eq!(config.model.as_deref(), Some("mistral-large-2512"));
        assert_eq!(config.provider.as_deref(), Some("mistral"));
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(config.notify_to.is_none());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("nope.toml"));
        assert!(config.model.is_none());
        assert_eq!(config.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config {
            user_id: Some("boudy".to_string()),
            timeout_secs: Some(5),
            api_keys: ApiKeys {
                tavily: Some("tvly-test".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path);
        assert_eq!(loaded.user_id.as_deref(), Some("boudy"));
        assert_eq!(loaded.timeout(), Duration::from_secs(5));
        assert_eq!(loaded.get_api_key("tavily").as_deref(), Some("tvly-test"));
    }

    #[test]
    fn test_invalid_toml_falls_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "model = [unclosed").unwrap();
        assert!(Config::load_from(&path).model.is_none());
    }

    #[test]
    fn test_explicit_data_dir() {
        let config = Config {
            data_dir: Some("/tmp/pilot-chats".to_string()),
            ..Default::default()
        };
        assert_eq!(config.data_dir(), PathBuf::from("/tmp/pilot-chats"));
        assert!(Config::default().data_dir().ends_with("pilot/chats"));
    }

    #[test]
    fn test_endpoint_overrides_parse() {
        let config: Config = toml::from_str(
            r#"
            provider = "custom"
            base_url = "http://localhost:11434/v1"
            search_base_url = "http://localhost:9001"
            mail_base_url = "http://localhost:9002/v3"
            "#,
        )
        .unwrap();
        assert_eq!(config.search_base_url.as_deref(), Some("http://localhost:9001"));
        assert_eq!(config.mail_base_url.as_deref(), Some("http://localhost:9002/v3"));
    }

    #[test]
    fn test_unknown_service_has_no_key() {
        assert!(Config::default().get_api_key("anthropic").is_none());
    }

    #[test]
    fn test_zero_timeout_clamped() {
        let config = Config {
            timeout_secs: Some(0),
            ..Default::default()
        };
        assert_eq!(config.timeout(), Duration::from_secs(1));
    }
}
