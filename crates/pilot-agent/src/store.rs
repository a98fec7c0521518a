//! Transcript persistence: one JSON file per session id.
//!
//! Every turn reads the whole transcript and writes the whole transcript
//! back. There is no locking; two writers under the same id are
//! last-writer-wins.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::session::SessionId;
use crate::transcript::Transcript;

/// Storage backend for transcripts
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Load the transcript for `id`. Unknown ids yield an empty transcript.
    async fn load(&self, id: &SessionId) -> Result<Transcript>;

    /// Overwrite the transcript for `id` in full.
    async fn save(&self, id: &SessionId, transcript: &Transcript) -> Result<()>;

    /// Delete the transcript for `id`, if any.
    async fn remove(&self, id: &SessionId) -> Result<()>;
}

/// Stores transcripts as `<dir>/<id>.json`
#[derive(Debug, Clone)]
pub struct FileTranscriptStore {
    dir: PathBuf,
}

impl FileTranscriptStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the file backing `id`
    pub fn path_for(&self, id: &SessionId) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }
}

#[async_trait]
impl TranscriptStore for FileTranscriptStore {
    async fn load(&self, id: &SessionId) -> Result<Transcript> {
        let path = self.path_for(id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(%id, "no transcript on disk, starting empty");
                return Ok(Transcript::new());
            }
            Err(e) => return Err(Error::corrupt(id.as_str(), e)),
        };

        let transcript: Transcript =
            serde_json::from_slice(&bytes).map_err(|e| Error::corrupt(id.as_str(), e))?;
        tracing::debug!(%id, messages = transcript.len(), "loaded transcript");
        Ok(transcript)
    }

    async fn save(&self, id: &SessionId, transcript: &Transcript) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_vec_pretty(transcript).map_err(std::io::Error::other)?;
        tokio::fs::write(self.path_for(id), json).await?;
        tracing::debug!(%id, messages = transcript.len(), "saved transcript");
        Ok(())
    }

    async fn remove(&self, id: &SessionId) -> Result<()> {
        match tokio::fs::remove_file(self.path_for(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process store, for tests and throwaway sessions
#[derive(Debug, Default)]
pub struct MemoryTranscriptStore {
    transcripts: Mutex<HashMap<SessionId, Transcript>>,
}

impl MemoryTranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TranscriptStore for MemoryTranscriptStore {
    async fn load(&self, id: &SessionId) -> Result<Transcript> {
        Ok(self.transcripts.lock().get(id).cloned().unwrap_or_default())
    }

    async fn save(&self, id: &SessionId, transcript: &Transcript) -> Result<()> {
        self.transcripts.lock().insert(id.clone(), transcript.clone());
        Ok(())
    }

    async fn remove(&self, id: &SessionId) -> Result<()> {
        self.transcripts.lock().remove(id);
        Ok(())
    }
}
