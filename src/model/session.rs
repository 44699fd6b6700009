use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;

use crate::model::turn::{Role, Turn};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("turn text is empty")]
    EmptyText,
}

/// Append-only story log, mirrored to a JSON file after every change.
///
/// - loading never fails: a missing or malformed file starts an empty story
/// - the only way to remove turns is `clear`, which also deletes the file
#[derive(Debug)]
pub struct SessionHistory {
    turns: Vec<Turn>,
    path: Option<PathBuf>,
}

impl SessionHistory {
    /// History that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            turns: Vec::new(),
            path: None,
        }
    }

    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let turns = read_turns(&path);
        log::info!("loaded {} turns from {}", turns.len(), path.display());

        Self {
            turns,
            path: Some(path),
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// The last `n` turns in display order (all of them if there are fewer).
    pub fn recent(&self, n: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }

    pub fn append(
        &mut self,
        role: Role,
        text: &str,
        choices: Vec<String>,
    ) -> Result<&Turn, SessionError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::EmptyText);
        }

        // Timestamps never go backwards, even if the wall clock does.
        let now = Utc::now().timestamp_millis();
        let timestamp = self
            .turns
            .last()
            .map_or(now, |last| now.max(last.timestamp()));

        self.turns
            .push(Turn::new(role, text.to_string(), choices, timestamp));
        self.persist();

        let index = self.turns.len() - 1;
        Ok(&self.turns[index])
    }

    pub fn clear(&mut self) {
        self.turns.clear();

        if let Some(path) = &self.path {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => log::warn!("could not delete {}: {e}", path.display()),
            }
        }
    }

    fn persist(&self) {
        let Some(path) = &self.path else {
            return;
        };

        if let Err(e) = write_turns(path, &self.turns) {
            log::warn!("could not save story to {}: {e:#}", path.display());
        }
    }
}

fn read_turns(path: &Path) -> Vec<Turn> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(_) => return Vec::new(),
    };

    match serde_json::from_str::<Vec<Turn>>(&raw) {
        Ok(turns) => turns
            .into_iter()
            .filter(|t| !t.text().trim().is_empty())
            .collect(),
        Err(e) => {
            log::warn!("ignoring malformed story file {}: {e}", path.display());
            Vec::new()
        }
    }
}

fn write_turns(path: &Path, turns: &[Turn]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string(turns)?;
    fs::write(path, json)?;
    Ok(())
}
