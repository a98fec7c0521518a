//! Error types for pilot-agent

use thiserror::Error;

/// Result type alias using pilot-agent Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running a turn
#[derive(Error, Debug)]
pub enum Error {
    /// Persisted transcript data could not be read or parsed
    #[error("Transcript for {identifier} is corrupt: {reason}")]
    StorageCorruption { identifier: String, reason: String },

    /// Writing persisted data failed
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// The routing classifier could not be reached
    #[error("Routing unavailable: {0}")]
    RoutingUnavailable(String),

    /// The search provider failed or timed out
    #[error("Search unavailable: {0}")]
    SearchUnavailable(String),

    /// The synthesis model failed, timed out, or produced nothing
    #[error("Synthesis unavailable: {0}")]
    SynthesisUnavailable(String),

    /// Delivering a notification failed
    #[error("Notification failed: {0}")]
    NotificationFailure(String),

    /// Identifier is not usable as a storage key
    #[error("Invalid session id: {0:?}")]
    InvalidSessionId(String),

    /// User input was empty
    #[error("Message cannot be empty")]
    EmptyMessage,

    /// An email could not be composed from the user's instruction
    #[error("Could not compose email: {0}")]
    EmailRequest(String),
}

impl Error {
    pub(crate) fn corrupt(identifier: impl Into<String>, reason: impl ToString) -> Self {
        Self::StorageCorruption {
            identifier: identifier.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error aborts a turn visibly
    pub fn is_turn_fatal(&self) -> bool {
        matches!(
            self,
            Error::StorageCorruption { .. }
                | Error::Storage(_)
                | Error::SynthesisUnavailable(_)
                | Error::InvalidSessionId(_)
                | Error::EmptyMessage
        )
    }

    /// Text shown to the user in place of an answer
    pub fn user_message(&self) -> String {
        match self {
            Error::StorageCorruption { .. } | Error::Storage(_) => {
                "Sorry, this conversation's history could not be read or saved. Please start a new chat."
                    .to_string()
            }
            Error::SynthesisUnavailable(_) => {
                "The assistant is currently unavailable. Please try again in a moment.".to_string()
            }
            Error::EmptyMessage => "Please type a message.".to_string(),
            other => format!("Sorry, something went wrong: {}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(Error::corrupt("u1", "expected value").is_turn_fatal());
        assert!(Error::SynthesisUnavailable("503".into()).is_turn_fatal());
        assert!(!Error::RoutingUnavailable("timeout".into()).is_turn_fatal());
        assert!(!Error::SearchUnavailable("timeout".into()).is_turn_fatal());
        assert!(!Error::NotificationFailure("bounced".into()).is_turn_fatal());
    }

    #[test]
    fn test_user_messages() {
        assert!(Error::corrupt("u1", "eof").user_message().starts_with("Sorry"));
        assert!(
            Error::SynthesisUnavailable("x".into())
                .user_message()
                .contains("currently unavailable")
        );
    }

    #[test]
    fn test_display() {
        let err = Error::corrupt("u1", "trailing characters at line 3");
        assert_eq!(
            err.to_string(),
            "Transcript for u1 is corrupt: trailing characters at line 3"
        );
        let err = Error::InvalidSessionId("a/b".into());
        assert_eq!(err.to_string(), "Invalid session id: \"a/b\"");
    }
}
