//! Per-user chat index: which chats a user has and what they are called.
//!
//! The index lives at `<dir>/<user>.chats.json`. Each chat is a
//! [`SessionId`] whose transcript is kept by a [`TranscriptStore`].

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use pilot_ai::Message;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::session::SessionId;
use crate::store::TranscriptStore;
use crate::transcript::Transcript;

/// One chat in a user's index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub id: SessionId,
    pub title: String,
    /// Creation time, milliseconds since the epoch
    pub created_at: i64,
}

impl ChatEntry {
    fn new(id: SessionId, title: Option<&str>) -> Self {
        let title = match title.map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => default_title(&id),
        };
        Self {
            id,
            title,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Title given to chats that were never named
pub fn default_title(id: &SessionId) -> String {
    let head: String = id.as_str().chars().take(6).collect();
    format!("Chat {}", head)
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct IndexFile {
    #[serde(default)]
    chats: Vec<ChatEntry>,
}

/// The chats belonging to one user, oldest first
#[derive(Debug, Clone)]
pub struct ChatIndex {
    path: PathBuf,
    user: SessionId,
    chats: Vec<ChatEntry>,
}

impl ChatIndex {
    /// Path of the index file for `user` under `dir`
    pub fn path_for(dir: &Path, user: &SessionId) -> PathBuf {
        dir.join(format!("{}.chats.json", user))
    }

    /// Load the index for `user`. A missing file is an empty index.
    pub async fn load(dir: impl AsRef<Path>, user: &SessionId) -> Result<Self> {
        let path = Self::path_for(dir.as_ref(), user);
        let label = format!("{}.chats", user);

        let chats = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let file: IndexFile =
                    serde_json::from_slice(&bytes).map_err(|e| Error::corrupt(&label, e))?;
                file.chats
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(Error::corrupt(&label, e)),
        };

        tracing::debug!(%user, chats = chats.len(), "loaded chat index");
        Ok(Self {
            path,
            user: user.clone(),
            chats,
        })
    }

    pub async fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = IndexFile {
            chats: self.chats.clone(),
        };
        let json = serde_json::to_vec_pretty(&file).map_err(std::io::Error::other)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }

    pub fn user(&self) -> &SessionId {
        &self.user
    }

    pub fn list(&self) -> &[ChatEntry] {
        &self.chats
    }

    pub fn is_empty(&self) -> bool {
        self.chats.is_empty()
    }

    pub fn get(&self, id: &SessionId) -> Option<&ChatEntry> {
        self.chats.iter().find(|c| &c.id == id)
    }

    /// Most recently created chat
    pub fn latest(&self) -> Option<&ChatEntry> {
        self.chats.iter().max_by_key(|c| c.created_at)
    }

    /// Start a new chat and return its entry
    pub fn create(&mut self, title: Option<&str>) -> &ChatEntry {
        self.chats.push(ChatEntry::new(SessionId::new(), title));
        &self.chats[self.chats.len() - 1]
    }

    /// Make sure `id` is listed, adding it with a default title if not
    pub fn ensure(&mut self, id: &SessionId) -> &ChatEntry {
        let pos = match self.chats.iter().position(|c| &c.id == id) {
            Some(pos) => pos,
            None => {
                self.chats.push(ChatEntry::new(id.clone(), None));
                self.chats.len() - 1
            }
        };
        &self.chats[pos]
    }

    /// Rename a chat. Blank titles fall back to the default.
    pub fn rename(&mut self, id: &SessionId, title: &str) -> bool {
        match self.chats.iter_mut().find(|c| &c.id == id) {
            Some(entry) => {
                entry.title = match title.trim() {
                    "" => default_title(id),
                    t => t.to_string(),
                };
                true
            }
            None => false,
        }
    }

    /// Drop a chat from the index. The transcript is left to the caller.
    pub fn remove(&mut self, id: &SessionId) -> Option<ChatEntry> {
        let pos = self.chats.iter().position(|c| &c.id == id)?;
        Some(self.chats.remove(pos))
    }

    /// Find a chat by 1-based position, full id, or unique id prefix
    pub fn resolve(&self, key: &str) -> Option<&ChatEntry> {
        let key = key.trim();
        if key.is_empty() {
            return None;
        }

        if let Ok(n) = key.parse::<usize>() {
            if n >= 1 && n <= self.chats.len() {
                return Some(&self.chats[n - 1]);
            }
        }

        if let Some(entry) = self.chats.iter().find(|c| c.id.as_str() == key) {
            return Some(entry);
        }

        let mut matches = self.chats.iter().filter(|c| c.id.as_str().starts_with(key));
        match (matches.next(), matches.next()) {
            (Some(entry), None) => Some(entry),
            _ => None,
        }
    }
}

/// Write a transcript to `path` as pretty-printed JSON
pub async fn export_transcript(transcript: &Transcript, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_vec_pretty(transcript).map_err(std::io::Error::other)?;
    tokio::fs::write(path, json).await?;
    tracing::info!(path = %path.display(), messages = transcript.len(), "exported transcript");
    Ok(())
}

/// Chats in the single-file history format, keyed by chat id
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LegacyChat {
    Full {
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        messages: Vec<LegacyMessage>,
    },
    Bare(Vec<LegacyMessage>),
}

/// A history record. Unrecognised kinds are kept as system messages.
#[derive(Debug, Deserialize)]
struct LegacyMessage {
    #[serde(rename = "type", alias = "role")]
    kind: String,
    #[serde(default)]
    content: String,
}

impl From<LegacyMessage> for Message {
    fn from(m: LegacyMessage) -> Self {
        match m.kind.to_ascii_lowercase().as_str() {
            "human" | "user" => Message::user(m.content),
            "ai" | "assistant" => Message::assistant(m.content),
            _ => Message::system(m.content),
        }
    }
}

/// Name of the single-file history kept for `user` by older versions
pub fn legacy_history_path(dir: &Path, user: &SessionId) -> PathBuf {
    dir.join(format!("multi_chat_history_{}.json", user))
}

/// Import chats from an older single-file history into `index` and `store`.
///
/// Chats already present in the index are skipped, as are chats that
/// cannot be read. Returns the number of chats imported; a missing history
/// file imports nothing.
pub async fn import_legacy(
    dir: impl AsRef<Path>,
    index: &mut ChatIndex,
    store: &dyn TranscriptStore,
) -> Result<usize> {
    let path = legacy_history_path(dir.as_ref(), index.user());
    let label = format!("multi_chat_history_{}", index.user());

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(Error::corrupt(&label, e)),
    };
    let chats: BTreeMap<String, serde_json::Value> =
        serde_json::from_slice(&bytes).map_err(|e| Error::corrupt(&label, e))?;

    let mut imported = 0;
    for (raw_id, raw) in chats {
        let id = match SessionId::parse(&raw_id) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(chat = %raw_id, error = %e, "skipping legacy chat");
                continue;
            }
        };
        if index.get(&id).is_some() {
            continue;
        }
        let chat: LegacyChat = match serde_json::from_value(raw) {
            Ok(chat) => chat,
            Err(e) => {
                tracing::warn!(chat = %raw_id, error = %e, "skipping unreadable legacy chat");
                continue;
            }
        };

        let (title, messages) = match chat {
            LegacyChat::Full { title, messages } => (title, messages),
            LegacyChat::Bare(messages) => (None, messages),
        };
        let messages = messages.into_iter().map(Message::from).collect();
        store.save(&id, &Transcript::from_messages(messages)).await?;
        index.ensure(&id);
        if let Some(title) = title {
            index.rename(&id, &title);
        }
        imported += 1;
    }

    if imported > 0 {
        index.save().await?;
        tracing::info!(user = %index.user(), imported, "imported legacy chats");
    }
    Ok(imported)
}
