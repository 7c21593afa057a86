//! Persistence for permission decisions and change markers
//!
//! Two stores back the change logger: the decision store keeps a history of
//! when the user last decided on each (package, group), and the marker store
//! remembers which packages the user has ever adjusted, so the platform can
//! exempt them from auto-revocation.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use thiserror::Error;

/// Error type for store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to read store: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse store: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// One recorded user decision on a permission group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub package: String,
    pub group: String,
    pub user: u32,
    /// Grant state of the group after the decision.
    pub is_granted: bool,
    /// When the decision was made (Unix seconds).
    pub decided_at: i64,
}

impl DecisionRecord {
    pub fn new(
        package: impl Into<String>,
        group: impl Into<String>,
        user: u32,
        is_granted: bool,
    ) -> Self {
        Self {
            package: package.into(),
            group: group.into(),
            user,
            is_granted,
            decided_at: Utc::now().timestamp(),
        }
    }
}

/// Trait for the per-group decision history.
///
/// A fresh decision for the same (package, group, user) replaces the older
/// one; the history answers "when did the user last touch this group".
pub trait DecisionStore: Send + Sync {
    /// Record a decision, replacing any earlier one for the same group.
    fn record(&self, record: DecisionRecord) -> Result<(), StoreError>;

    /// All recorded decisions.
    fn list(&self) -> Result<Vec<DecisionRecord>, StoreError>;

    /// Latest decision for one (package, group, user).
    fn get(&self, package: &str, group: &str, user: u32) -> Result<Option<DecisionRecord>, StoreError> {
        Ok(self
            .list()?
            .into_iter()
            .find(|r| r.package == package && r.group == group && r.user == user))
    }
}

/// Trait for the user-changed marker.
///
/// The marker is monotonic per (package, user): once set it stays set for
/// the install lifetime of the package.
pub trait ChangeMarkerStore: Send + Sync {
    /// Mark the package as adjusted by the user.
    fn mark(&self, package: &str, user: u32) -> Result<(), StoreError>;

    /// Whether the package has ever been adjusted.
    fn is_marked(&self, package: &str, user: u32) -> Result<bool, StoreError>;
}

// ============================================================================
// In-Memory Stores
// ============================================================================

/// In-memory decision store for testing or ephemeral sessions
#[derive(Default)]
pub struct MemoryDecisionStore {
    decisions: RwLock<HashMap<(String, String, u32), DecisionRecord>>,
}

impl MemoryDecisionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.decisions.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.read().unwrap().is_empty()
    }
}

impl DecisionStore for MemoryDecisionStore {
    fn record(&self, record: DecisionRecord) -> Result<(), StoreError> {
        let mut decisions = self.decisions.write().unwrap();
        decisions.insert(
            (record.package.clone(), record.group.clone(), record.user),
            record,
        );
        Ok(())
    }

    fn list(&self) -> Result<Vec<DecisionRecord>, StoreError> {
        Ok(self.decisions.read().unwrap().values().cloned().collect())
    }
}

impl std::fmt::Debug for MemoryDecisionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDecisionStore")
            .field("count", &self.len())
            .finish()
    }
}

/// In-memory change marker store
#[derive(Default)]
pub struct MemoryChangeMarkerStore {
    marked: RwLock<HashSet<(String, u32)>>,
}

impl MemoryChangeMarkerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChangeMarkerStore for MemoryChangeMarkerStore {
    fn mark(&self, package: &str, user: u32) -> Result<(), StoreError> {
        let mut marked = self.marked.write().unwrap();
        marked.insert((package.to_string(), user));
        Ok(())
    }

    fn is_marked(&self, package: &str, user: u32) -> Result<bool, StoreError> {
        let marked = self.marked.read().unwrap();
        Ok(marked.contains(&(package.to_string(), user)))
    }
}

impl std::fmt::Debug for MemoryChangeMarkerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryChangeMarkerStore")
            .field("count", &self.marked.read().unwrap().len())
            .finish()
    }
}

// ============================================================================
// File-based Stores
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct DecisionFileData {
    version: u32,
    decisions: Vec<DecisionRecord>,
}

impl DecisionFileData {
    fn new() -> Self {
        Self {
            version: 1,
            decisions: Vec::new(),
        }
    }
}

/// File-based decision store (versioned JSON)
///
/// Default location: `~/.config/<app>/decisions.json`
pub struct FileDecisionStore {
    path: PathBuf,
    data: RwLock<DecisionFileData>,
}

impl FileDecisionStore {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let data = if path.exists() {
            let file = File::open(&path)?;
            let reader = BufReader::new(file);
            serde_json::from_reader(reader)?
        } else {
            DecisionFileData::new()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// Create a store in the default location for an application
    pub fn default_for_app(app_name: &str) -> Result<Self, StoreError> {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from(".config"));
        let path = config_dir.join(app_name).join("decisions.json");
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let data = self.data.read().unwrap();
        let file = File::create(&self.path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, &*data)?;
        Ok(())
    }
}

impl DecisionStore for FileDecisionStore {
    fn record(&self, record: DecisionRecord) -> Result<(), StoreError> {
        {
            let mut data = self.data.write().unwrap();
            data.decisions.retain(|r| {
                !(r.package == record.package && r.group == record.group && r.user == record.user)
            });
            data.decisions.push(record);
        }
        self.save()
    }

    fn list(&self) -> Result<Vec<DecisionRecord>, StoreError> {
        Ok(self.data.read().unwrap().decisions.clone())
    }
}

impl std::fmt::Debug for FileDecisionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileDecisionStore")
            .field("path", &self.path)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct MarkerFileData {
    version: u32,
    marked: Vec<(String, u32)>,
}

impl MarkerFileData {
    fn new() -> Self {
        Self {
            version: 1,
            marked: Vec::new(),
        }
    }
}

/// File-based change marker store (versioned JSON)
pub struct FileChangeMarkerStore {
    path: PathBuf,
    data: RwLock<MarkerFileData>,
}

impl FileChangeMarkerStore {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let data = if path.exists() {
            let file = File::open(&path)?;
            let reader = BufReader::new(file);
            serde_json::from_reader(reader)?
        } else {
            MarkerFileData::new()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn default_for_app(app_name: &str) -> Result<Self, StoreError> {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from(".config"));
        let path = config_dir.join(app_name).join("change_markers.json");
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let data = self.data.read().unwrap();
        let file = File::create(&self.path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, &*data)?;
        Ok(())
    }
}

impl ChangeMarkerStore for FileChangeMarkerStore {
    fn mark(&self, package: &str, user: u32) -> Result<(), StoreError> {
        {
            let mut data = self.data.write().unwrap();
            let entry = (package.to_string(), user);
            if data.marked.contains(&entry) {
                return Ok(());
            }
            data.marked.push(entry);
        }
        self.save()
    }

    fn is_marked(&self, package: &str, user: u32) -> Result<bool, StoreError> {
        let data = self.data.read().unwrap();
        Ok(data
            .marked
            .iter()
            .any(|(p, u)| p == package && *u == user))
    }
}

impl std::fmt::Debug for FileChangeMarkerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileChangeMarkerStore")
            .field("path", &self.path)
            .finish()
    }
}
