//! Chat session transcripts persisted as JSON files

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::errors::HistoryError;
use crate::types::Message;

/// On-disk transcript body: `{"Data": [{role, content}, ...]}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionFile {
    #[serde(rename = "Data", default)]
    pub data: Vec<Message>,
}

/// Directory of saved chat sessions, one file per session name
#[derive(Debug, Clone)]
pub struct HistoryStore {
    dir: PathBuf,
}

impl HistoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `session`
    pub fn session_path(&self, session: &str) -> Result<PathBuf, HistoryError> {
        validate_session_name(session)?;
        Ok(self.dir.join(format!("{}.json", session)))
    }

    /// Write the full transcript, replacing any previous one
    pub async fn save(&self, session: &str, messages: &[Message]) -> Result<(), HistoryError> {
        let path = self.session_path(session)?;
        fs::create_dir_all(&self.dir).await?;

        let body = serde_json::to_string_pretty(&SessionFile {
            data: messages.to_vec(),
        })?;
        fs::write(&path, body).await?;

        info!("Saved {} messages to session {}", messages.len(), session);
        Ok(())
    }

    /// Load a transcript; a session that was never saved is empty
    pub async fn load(&self, session: &str) -> Result<Vec<Message>, HistoryError> {
        let path = self.session_path(session)?;
        if !fs::try_exists(&path).await? {
            debug!("No saved history for session {}", session);
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path).await?;
        let file: SessionFile = serde_json::from_str(&content)?;
        Ok(file.data)
    }

    /// Names of all saved sessions, sorted
    pub async fn list(&self) -> Result<Vec<String>, HistoryError> {
        if !fs::try_exists(&self.dir).await? {
            return Ok(Vec::new());
        }

        let mut sessions = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                sessions.push(stem.to_string());
            }
        }

        sessions.sort();
        Ok(sessions)
    }

    /// Remove a session; returns whether a file existed
    pub async fn delete(&self, session: &str) -> Result<bool, HistoryError> {
        let path = self.session_path(session)?;
        if !fs::try_exists(&path).await? {
            return Ok(false);
        }

        fs::remove_file(&path).await?;
        info!("Deleted session {}", session);
        Ok(true)
    }
}

fn validate_session_name(session: &str) -> Result<(), HistoryError> {
    let invalid = session.trim().is_empty()
        || session.contains(['/', '\\'])
        || session == "."
        || session == "..";

    if invalid {
        return Err(HistoryError::InvalidSession(session.to_string()));
    }
    Ok(())
}
