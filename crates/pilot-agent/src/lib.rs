//! pilot-agent: the conversation pipeline
//!
//! Each turn loads the session transcript, decides whether the question
//! needs fresh web results, synthesizes a reply with the model, persists
//! the transcript and optionally emails a summary in the background.

pub mod assistant;
pub mod chats;
pub mod error;
pub mod events;
pub mod notify;
pub mod retry;
pub mod routing;
pub mod search;
pub mod session;
pub mod store;
pub mod synthesis;
pub mod transcript;

pub use assistant::{Assistant, AssistantConfig};
pub use chats::{ChatEntry, ChatIndex};
pub use error::{Error, Result};
pub use events::TurnEvent;
pub use notify::{Notification, Notifier, SendGridNotifier};
pub use retry::RetryConfig;
pub use routing::{Classifier, LlmClassifier, Route};
pub use search::{Augmentation, Searcher, TavilySearcher};
pub use session::SessionId;
pub use store::{FileTranscriptStore, MemoryTranscriptStore, TranscriptStore};
pub use synthesis::{LlmSynthesizer, Synthesizer};
pub use transcript::Transcript;
