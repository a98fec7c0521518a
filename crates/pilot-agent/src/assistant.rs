//! The turn pipeline: load, route, augment, synthesize, save, notify.

use std::sync::Arc;
use std::time::Duration;

use pilot_ai::Message;
use tokio::sync::broadcast;
use tokio_util::task::TaskTracker;

use crate::error::{Error, Result};
use crate::events::TurnEvent;
use crate::notify::{Notification, Notifier};
use crate::retry::{RetryConfig, bounded, with_retry};
use crate::routing::{Classifier, Route};
use crate::search::{Augmentation, MAX_SEARCH_RESULTS, Searcher};
use crate::session::SessionId;
use crate::store::TranscriptStore;
use crate::synthesis::Synthesizer;
use crate::transcript::Transcript;

/// Configuration for the assistant
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// Deadline for each external call
    pub call_timeout: Duration,
    /// Retry policy for routing and search
    pub retry: RetryConfig,
    /// Email every finished turn to this address
    pub notify_to: Option<String>,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
            notify_to: None,
        }
    }
}

/// Conversational assistant with injected collaborators
pub struct Assistant {
    config: AssistantConfig,
    store: Arc<dyn TranscriptStore>,
    classifier: Arc<dyn Classifier>,
    searcher: Arc<dyn Searcher>,
    synthesizer: Arc<dyn Synthesizer>,
    notifier: Option<Arc<dyn Notifier>>,
    notifications: TaskTracker,
    event_tx: broadcast::Sender<TurnEvent>,
}

impl Assistant {
    /// Create a new assistant
    pub fn new(
        config: AssistantConfig,
        store: Arc<dyn TranscriptStore>,
        classifier: Arc<dyn Classifier>,
        searcher: Arc<dyn Searcher>,
        synthesizer: Arc<dyn Synthesizer>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(64);
        Self {
            config,
            store,
            classifier,
            searcher,
            synthesizer,
            notifier: None,
            notifications: TaskTracker::new(),
            event_tx,
        }
    }

    /// Attach a notification sink
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Subscribe to turn events
    pub fn subscribe(&self) -> broadcast::Receiver<TurnEvent> {
        self.event_tx.subscribe()
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn TranscriptStore> {
        &self.store
    }

    pub fn has_notifier(&self) -> bool {
        self.notifier.is_some()
    }

    fn emit(&self, event: TurnEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }

    /// Run one full turn and return the reply text.
    ///
    /// Only storage failures and synthesis failures abort the turn; routing,
    /// search and notification problems degrade to safe defaults.
    pub async fn handle_turn(&self, id: &SessionId, user_text: &str) -> Result<String> {
        if user_text.trim().is_empty() {
            return Err(Error::EmptyMessage);
        }

        self.emit(TurnEvent::TurnStart {
            session_id: id.to_string(),
        });

        match self.run_turn(id, user_text).await {
            Ok(reply) => Ok(reply),
            Err(e) => {
                tracing::error!(%id, error = %e, "turn failed");
                self.emit(TurnEvent::TurnFailed {
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn run_turn(&self, id: &SessionId, user_text: &str) -> Result<String> {
        let mut transcript = self.store.load(id).await?;
        transcript.push(Message::user(user_text));

        let route = self.decide(user_text).await;
        let augmentation = if route.needs_search() {
            self.augment(user_text).await
        } else {
            None
        };

        let reply = self.synthesize(&transcript, augmentation.as_ref()).await?;

        transcript.push(Message::assistant(reply.clone()));
        self.store.save(id, &transcript).await?;
        self.emit(TurnEvent::TranscriptSaved {
            messages: transcript.len(),
        });
        tracing::info!(%id, ?route, messages = transcript.len(), "turn completed");

        if let Some(recipient) = self.config.notify_to.clone() {
            self.notify(Notification::for_turn(recipient, user_text, &reply));
        }

        Ok(reply)
    }

    /// Ask the classifier for a route, with retries and the call deadline.
    pub async fn classify(&self, latest_user_message: &str) -> Result<Route> {
        let classifier = &self.classifier;
        let timeout = self.config.call_timeout;
        let raw = with_retry(&self.config.retry, "routing", move || {
            bounded(timeout, classifier.classify(latest_user_message))
        })
        .await
        .map_err(|e| Error::RoutingUnavailable(e.to_string()))?;
        Ok(Route::from_label(&raw))
    }

    /// Route the latest user message. Never fails: an unreachable
    /// classifier means no search.
    pub async fn decide(&self, latest_user_message: &str) -> Route {
        let (route, fallback) = match self.classify(latest_user_message).await {
            Ok(route) => (route, false),
            Err(e) => {
                tracing::warn!(error = %e, "using fail-safe route");
                (Route::NoSearch, true)
            }
        };

        tracing::debug!(%route, fallback, "routing decided");
        self.emit(TurnEvent::RouteDecided { route, fallback });
        route
    }

    /// Run the web search for `query`, with retries and the call deadline.
    pub async fn search(&self, query: &str) -> Result<Vec<String>> {
        let searcher = &self.searcher;
        let timeout = self.config.call_timeout;
        with_retry(&self.config.retry, "search", move || {
            bounded(timeout, searcher.search(query, MAX_SEARCH_RESULTS))
        })
        .await
        .map_err(|e| Error::SearchUnavailable(e.to_string()))
    }

    /// Fetch search context for `query`. Failures and empty results yield `None`.
    pub async fn augment(&self, query: &str) -> Option<Augmentation> {
        let augmentation = match self.search(query).await {
            Ok(snippets) => Augmentation::from_snippets(snippets),
            Err(e) => {
                tracing::warn!(error = %e, "continuing without search results");
                None
            }
        };

        self.emit(TurnEvent::SearchCompleted {
            snippets: augmentation.as_ref().map_or(0, |a| a.snippet_count()),
        });
        augmentation
    }

    /// Produce the assistant reply. Empty output counts as unavailable.
    pub async fn synthesize(
        &self,
        transcript: &Transcript,
        augmentation: Option<&Augmentation>,
    ) -> Result<String> {
        let reply = bounded(
            self.config.call_timeout,
            self.synthesizer.synthesize(transcript, augmentation),
        )
        .await
        .map_err(|e| Error::SynthesisUnavailable(e.to_string()))?;

        if reply.trim().is_empty() {
            return Err(Error::SynthesisUnavailable("model returned an empty reply".into()));
        }

        self.emit(TurnEvent::ReplyReady {
            chars: reply.chars().count(),
        });
        Ok(reply)
    }

    /// Hand a notification to the background sink.
    ///
    /// Returns `false` when no sink is configured. Delivery failures are
    /// logged and reported as events only.
    pub fn notify(&self, notification: Notification) -> bool {
        let Some(notifier) = self.notifier.clone() else {
            tracing::debug!("no notifier configured, dropping notification");
            return false;
        };

        let timeout = self.config.call_timeout;
        let event_tx = self.event_tx.clone();
        let recipient = notification.recipient.clone();

        self.emit(TurnEvent::NotificationQueued {
            recipient: recipient.clone(),
        });

        self.notifications.spawn(async move {
            let result = bounded(
                timeout,
                notifier.notify(
                    &notification.recipient,
                    &notification.subject,
                    &notification.body,
                ),
            )
            .await;

            let event = match result {
                Ok(()) => {
                    tracing::info!(%recipient, "notification sent");
                    TurnEvent::NotificationSent { recipient }
                }
                Err(e) => {
                    let err = Error::NotificationFailure(e.to_string());
                    tracing::warn!(%recipient, error = %err, "notification dropped");
                    TurnEvent::NotificationFailed {
                        recipient,
                        error: err.to_string(),
                    }
                }
            };
            let _ = event_tx.send(event);
        });
        true
    }

    /// Wait until every queued notification has finished
    pub async fn wait_for_notifications(&self) {
        self.notifications.close();
        self.notifications.wait().await;
        self.notifications.reopen();
    }
}
