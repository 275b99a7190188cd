//! Durable per-session delivery state for deferred tool results.

use crate::error::StateError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;

/// Delivery state for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessedState {
    /// History positions whose tool results were already delivered.
    pub processed_positions: BTreeSet<usize>,
    /// History length observed at the last trigger; a shrink signals a
    /// session reset.
    pub last_history_length: usize,
}

/// On-disk shape: sets become sorted lists at the persistence boundary.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StateFile {
    #[serde(default)]
    processed_positions: BTreeMap<String, Vec<usize>>,
    #[serde(default)]
    last_history_length: BTreeMap<String, usize>,
}

/// Load-once, write-through store of [`ProcessedState`] keyed by session.
///
/// Every mutation rewrites the whole state file so delivery survives
/// process restarts. A missing or corrupt file starts the store empty
/// with a warning; it is never fatal.
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    sessions: HashMap<String, ProcessedState>,
}

impl StateStore {
    /// Load the store from `path`.
    pub async fn load(path: PathBuf) -> Self {
        let sessions = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => match serde_json::from_str::<StateFile>(&raw) {
                Ok(file) => from_file(file),
                Err(error) => {
                    tracing::warn!(%error, path = %path.display(), "corrupt processed-state file; starting empty");
                    HashMap::new()
                }
            },
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "no processed-state file; starting empty");
                HashMap::new()
            }
            Err(error) => {
                tracing::warn!(%error, path = %path.display(), "unreadable processed-state file; starting empty");
                HashMap::new()
            }
        };

        Self { path, sessions }
    }

    /// Current state for a session (empty default when unseen).
    pub fn get(&self, session: &str) -> ProcessedState {
        self.sessions.get(session).cloned().unwrap_or_default()
    }

    /// Clear a session's processed positions (reset detected) and persist.
    pub async fn reset_positions(&mut self, session: &str) -> Result<(), StateError> {
        self.sessions
            .entry(session.to_string())
            .or_default()
            .processed_positions
            .clear();
        self.persist().await
    }

    /// Record the latest observed history length and persist.
    pub async fn set_history_length(
        &mut self,
        session: &str,
        length: usize,
    ) -> Result<(), StateError> {
        self.sessions
            .entry(session.to_string())
            .or_default()
            .last_history_length = length;
        self.persist().await
    }

    /// Mark a history position as delivered and persist.
    pub async fn mark_processed(
        &mut self,
        session: &str,
        position: usize,
    ) -> Result<(), StateError> {
        self.sessions
            .entry(session.to_string())
            .or_default()
            .processed_positions
            .insert(position);
        self.persist().await
    }

    async fn persist(&self) -> Result<(), StateError> {
        let file = to_file(&self.sessions);
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| StateError::Other(anyhow::anyhow!(e)))?;

        tokio::fs::write(&self.path, json)
            .await
            .map_err(|source| StateError::Persist {
                path: self.path.display().to_string(),
                source,
            })
    }
}

fn from_file(file: StateFile) -> HashMap<String, ProcessedState> {
    let mut sessions: HashMap<String, ProcessedState> = HashMap::new();

    for (session, positions) in file.processed_positions {
        sessions.entry(session).or_default().processed_positions = positions.into_iter().collect();
    }
    for (session, length) in file.last_history_length {
        sessions.entry(session).or_default().last_history_length = length;
    }

    // Enforce the invariant on load: a position at or past the recorded
    // length can only come from a hand-edited or damaged file.
    for (session, state) in sessions.iter_mut() {
        let before = state.processed_positions.len();
        state
            .processed_positions
            .retain(|&p| p < state.last_history_length);
        if state.processed_positions.len() != before {
            tracing::warn!(session = %session, "dropped out-of-range processed positions on load");
        }
    }

    sessions
}

fn to_file(sessions: &HashMap<String, ProcessedState>) -> StateFile {
    let mut file = StateFile::default();
    for (session, state) in sessions {
        file.processed_positions
            .insert(session.clone(), state.processed_positions.iter().copied().collect());
        file.last_history_length
            .insert(session.clone(), state.last_history_length);
    }
    file
}
