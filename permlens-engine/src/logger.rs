//! Change logger: structured records for every real permission change.
//!
//! Diffs a before/after snapshot pair and emits one record per permission
//! whose grant state or flags changed. Permissions that disappeared from
//! the new snapshot are skipped, not treated as revoked.

use permlens_model::{Control, GroupSnapshot};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

// Fresh and unique within the process.
static NEXT_CHANGE_ID: AtomicU64 = AtomicU64::new(1);

fn next_change_id() -> u64 {
    NEXT_CHANGE_ID.fetch_add(1, Ordering::Relaxed)
}

/// One logged permission change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeRecord {
    pub session_id: i64,
    pub change_id: u64,
    pub uid: u32,
    pub package: String,
    pub permission: String,
    /// Grant state after the change.
    pub is_granted: bool,
    /// Flag bits after the change.
    pub flags: u32,
    /// The control whose selection caused the change.
    pub control: Control,
}

/// Diff two snapshots of the same group into change records.
pub fn log_changes(
    old: &GroupSnapshot,
    new: &GroupSnapshot,
    control: Control,
    session_id: i64,
) -> Vec<ChangeRecord> {
    let mut records = Vec::new();

    for (name, old_state) in &old.permissions {
        let Some(new_state) = new.permission(name) else {
            continue;
        };
        if old_state.is_granted == new_state.is_granted && old_state.flags == new_state.flags {
            continue;
        }

        let record = ChangeRecord {
            session_id,
            change_id: next_change_id(),
            uid: new.uid,
            package: new.package.clone(),
            permission: name.clone(),
            is_granted: new_state.is_granted,
            flags: new_state.flags,
            control,
        };
        tracing::debug!(
            permission = %record.permission,
            granted = record.is_granted,
            flags = record.flags,
            "permission change logged"
        );
        records.push(record);
    }

    records
}
