use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sylvia_types::{InvalidSnapshotKey, ProgressPct, Session, SessionId, SnapshotKey};
use sylvia_utils::{Visibility, atomic_create, atomic_replace, ensure_secure_dir};
use thiserror::Error;
use tracing::{debug, info, warn};

const SNAPSHOT_EXTENSION: &str = "json";

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("session data is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no saved session with key {0}")]
    NotFound(SnapshotKey),
    #[error(transparent)]
    InvalidKey(#[from] InvalidSnapshotKey),
}

impl PersistenceError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// One line of the archive listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub key: SnapshotKey,
    pub session_id: SessionId,
    pub created_at: DateTime<Utc>,
    pub saved_at: DateTime<Utc>,
    pub message_count: usize,
    pub focus_blocks: usize,
    pub progress: ProgressPct,
}

/// On-disk envelope. `seq` orders saves that share a timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArchivedSession {
    key: SnapshotKey,
    saved_at: DateTime<Utc>,
    seq: u64,
    session: Session,
}

impl ArchivedSession {
    fn summary(&self) -> SessionSummary {
        SessionSummary {
            key: self.key.clone(),
            session_id: self.session.id().clone(),
            created_at: self.session.created_at(),
            saved_at: self.saved_at,
            message_count: self.session.messages().len(),
            focus_blocks: self.session.focus_log().len(),
            progress: self.session.progress_pct(),
        }
    }
}

/// Append-only collection of session snapshots.
///
/// Snapshots are never rewritten: every save produces a new key, and only
/// [`clear`](Self::clear) removes anything.
#[derive(Debug, Default)]
pub struct SessionStore {
    snapshots: BTreeMap<SnapshotKey, ArchivedSession>,
    next_seq: u64,
    dir: Option<PathBuf>,
}

impl SessionStore {
    /// Store that lives only as long as the process.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open (creating if needed) a directory-backed store and load every
    /// readable snapshot in it. Unreadable files, and files not named after
    /// the key they contain, are skipped.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let dir = dir.into();
        ensure_secure_dir(&dir).map_err(|e| PersistenceError::io(&dir, e))?;

        let mut snapshots = BTreeMap::new();
        let entries = fs::read_dir(&dir).map_err(|e| PersistenceError::io(&dir, e))?;
        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    warn!(dir = %dir.display(), "Skipping unreadable archive entry: {e}");
                    continue;
                }
            };
            if path.extension().and_then(|ext| ext.to_str()) != Some(SNAPSHOT_EXTENSION) {
                continue;
            }
            match read_snapshot(&path) {
                Ok(archived) if path.file_stem() == Some(OsStr::new(archived.key.as_str())) => {
                    snapshots.insert(archived.key.clone(), archived);
                }
                Ok(archived) => warn!(
                    path = %path.display(),
                    key = %archived.key,
                    "Skipping snapshot whose file name does not match its key"
                ),
                Err(e) => warn!(path = %path.display(), "Skipping unreadable snapshot: {e}"),
            }
        }

        let next_seq = snapshots
            .values()
            .map(|archived| archived.seq + 1)
            .max()
            .unwrap_or(0);
        debug!(dir = %dir.display(), count = snapshots.len(), "Opened session archive");
        Ok(Self {
            snapshots,
            next_seq,
            dir: Some(dir),
        })
    }

    #[must_use]
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    #[must_use]
    pub fn contains(&self, key: &SnapshotKey) -> bool {
        self.snapshots.contains_key(key)
    }

    /// Archive a copy of `session` under a key derived from `saved_at`.
    ///
    /// A key already taken gets `-1`, `-2`, ... appended.
    pub fn save(
        &mut self,
        session: &Session,
        saved_at: DateTime<Utc>,
    ) -> Result<SnapshotKey, PersistenceError> {
        let base = SnapshotKey::from_timestamp(saved_at);
        let mut counter = 0u64;

        loop {
            let key = if counter == 0 {
                base.clone()
            } else {
                base.with_suffix(counter)
            };
            counter += 1;
            if self.snapshots.contains_key(&key) {
                continue;
            }

            let archived = ArchivedSession {
                key: key.clone(),
                saved_at,
                seq: self.next_seq,
                session: session.clone(),
            };

            if let Some(dir) = &self.dir {
                let path = snapshot_path(dir, &key);
                let bytes = serde_json::to_vec_pretty(&archived)?;
                match atomic_create(&path, &bytes, Visibility::Private) {
                    Ok(()) => {}
                    // Written by another process since we opened the directory.
                    Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                    Err(e) => return Err(PersistenceError::io(&path, e)),
                }
            }

            self.next_seq += 1;
            self.snapshots.insert(key.clone(), archived);
            info!(key = %key, session = %session.id(), "Session saved");
            return Ok(key);
        }
    }

    /// Most recent first.
    #[must_use]
    pub fn list(&self) -> Vec<SessionSummary> {
        let mut archived: Vec<&ArchivedSession> = self.snapshots.values().collect();
        archived.sort_by(|a, b| b.saved_at.cmp(&a.saved_at).then(b.seq.cmp(&a.seq)));
        archived.into_iter().map(ArchivedSession::summary).collect()
    }

    /// The archived session exactly as saved.
    pub fn load(&self, key: &SnapshotKey) -> Result<Session, PersistenceError> {
        self.get(key).map(|archived| archived.session.clone())
    }

    /// Pretty-printed JSON of the archived session.
    pub fn export(&self, key: &SnapshotKey) -> Result<Vec<u8>, PersistenceError> {
        let archived = self.get(key)?;
        Ok(serde_json::to_vec_pretty(&archived.session)?)
    }

    /// [`export`](Self::export) straight to a file, replacing any existing one.
    pub fn export_to(&self, key: &SnapshotKey, path: &Path) -> Result<(), PersistenceError> {
        let bytes = self.export(key)?;
        atomic_replace(path, &bytes, Visibility::Inherit).map_err(|e| PersistenceError::io(path, e))
    }

    /// Parse exported JSON back into a session.
    pub fn import(bytes: &[u8]) -> Result<Session, PersistenceError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Destroy every snapshot. Returns how many were removed.
    ///
    /// On a filesystem error the snapshots not yet removed stay in the store.
    pub fn clear(&mut self) -> Result<usize, PersistenceError> {
        let mut removed = 0;
        if let Some(dir) = self.dir.clone() {
            let keys: Vec<SnapshotKey> = self.snapshots.keys().cloned().collect();
            for key in keys {
                let path = snapshot_path(&dir, &key);
                match fs::remove_file(&path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(PersistenceError::io(&path, e)),
                }
                self.snapshots.remove(&key);
                removed += 1;
            }
        } else {
            removed = self.snapshots.len();
            self.snapshots.clear();
        }
        info!(removed, "Session archive cleared");
        Ok(removed)
    }

    fn get(&self, key: &SnapshotKey) -> Result<&ArchivedSession, PersistenceError> {
        self.snapshots
            .get(key)
            .ok_or_else(|| PersistenceError::NotFound(key.clone()))
    }
}

fn snapshot_path(dir: &Path, key: &SnapshotKey) -> PathBuf {
    dir.join(format!("{key}.{SNAPSHOT_EXTENSION}"))
}

fn read_snapshot(path: &Path) -> Result<ArchivedSession, PersistenceError> {
    let bytes = fs::read(path).map_err(|e| PersistenceError::io(path, e))?;
    Ok(serde_json::from_slice(&bytes)?)
}
