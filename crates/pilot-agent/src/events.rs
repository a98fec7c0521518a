//! Turn event types

use serde::{Deserialize, Serialize};

use crate::routing::Route;

/// Events emitted while a turn runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    /// A turn started for a session
    TurnStart { session_id: String },

    /// The routing decision for this turn
    RouteDecided {
        route: Route,
        /// Whether the classifier was unreachable and the default was used
        fallback: bool,
    },

    /// Search augmentation finished
    SearchCompleted { snippets: usize },

    /// The assistant's reply is ready
    ReplyReady { chars: usize },

    /// The transcript was written back
    TranscriptSaved { messages: usize },

    /// A notification was handed to the background sink
    NotificationQueued { recipient: String },

    /// A notification was delivered
    NotificationSent { recipient: String },

    /// A notification failed; the turn is unaffected
    NotificationFailed { recipient: String, error: String },

    /// The turn aborted
    TurnFailed { message: String },
}
