//! Collaborator seams for the platform services the engine depends on.
//!
//! The engine never talks to the OS directly. Every external dependency is
//! a trait here, so applications wire in the real platform services and
//! tests wire in the in-memory doubles below.

use async_trait::async_trait;
use permlens_model::{perms, snapshot::flags, FullStorageState, GroupSnapshot, PermissionGroup};
use std::collections::HashMap;
use std::sync::RwLock;

use permlens_model::AdminRef;

/// App-op modes for the all-files access toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppOpMode {
    Allowed,
    Denied,
}

/// The app-op controlling all-files storage access.
pub const OP_MANAGE_ALL_FILES: &str = "manage_all_files";

/// Grant/revoke primitives of the platform permission subsystem.
///
/// Every call returns a fresh snapshot reflecting the mutation; the input
/// snapshot is never modified. `filter` restricts the affected permissions
/// to the named subset; `None` means the whole group.
pub trait PermissionMutator: Send + Sync {
    fn grant_foreground(
        &self,
        snapshot: &GroupSnapshot,
        filter: Option<&[String]>,
        one_time: bool,
    ) -> GroupSnapshot;

    fn revoke_foreground(
        &self,
        snapshot: &GroupSnapshot,
        filter: Option<&[String]>,
        one_time: bool,
        user_fixed: bool,
        force_compat_clear: bool,
    ) -> GroupSnapshot;

    fn grant_background(&self, snapshot: &GroupSnapshot) -> GroupSnapshot;

    fn revoke_background(
        &self,
        snapshot: &GroupSnapshot,
        one_time: bool,
        user_fixed: bool,
    ) -> GroupSnapshot;

    /// Record the chosen location accuracy on the group's location
    /// permissions without touching the grant axis.
    fn set_selected_accuracy(&self, snapshot: &GroupSnapshot, fine: bool) -> GroupSnapshot;
}

/// Read access to current group snapshots, used to refresh supergroup
/// siblings after a mutation.
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    async fn snapshot(
        &self,
        package: &str,
        group: &PermissionGroup,
        user: u32,
    ) -> Option<GroupSnapshot>;
}

/// Current legacy full-storage state for a package, if resolved.
pub trait FullStorageSource: Send + Sync {
    fn full_storage_state(&self, package: &str, user: u32) -> Option<FullStorageState>;
}

/// Lookup of the device admin enforcing a policy fix, if any.
pub trait AdminSource: Send + Sync {
    fn enforcing_admin(&self, user: u32) -> Option<AdminRef>;
}

/// Safety-label lookup for the location data-sharing footer.
pub trait SafetyLabelSource: Send + Sync {
    /// Whether the app's safety label declares a location-sharing purpose.
    fn has_location_sharing_purpose(&self, package: &str, user: u32) -> bool;
}

/// Role holdership queries, used to narrow the device-profile warning.
pub trait RoleSource: Send + Sync {
    /// Whether the package holds any role under the device-profile
    /// namespace for this user.
    fn holds_device_profile_role(&self, package: &str, user: u32) -> bool;
}

/// The platform app-ops mode store.
pub trait AppOpsStore: Send + Sync {
    fn set_uid_mode(&self, op: &str, uid: u32, mode: AppOpMode);
}

// ============================================================================
// In-memory implementations
// ============================================================================

type WorldKey = (String, String, u32);

fn world_key(snapshot: &GroupSnapshot) -> WorldKey {
    (
        snapshot.package.clone(),
        snapshot.group.name().to_string(),
        snapshot.user,
    )
}

/// In-memory permission subsystem double.
///
/// Implements the mutator's flag algebra over stored snapshots so session
/// and planner flows can run end to end without a platform.
#[derive(Default)]
pub struct MemoryPermissionWorld {
    snapshots: RwLock<HashMap<WorldKey, GroupSnapshot>>,
    full_storage: RwLock<HashMap<(String, u32), FullStorageState>>,
}

impl MemoryPermissionWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or replace a stored snapshot.
    pub fn insert_snapshot(&self, snapshot: GroupSnapshot) {
        let mut snapshots = self.snapshots.write().unwrap();
        snapshots.insert(world_key(&snapshot), snapshot);
    }

    pub fn set_full_storage(&self, package: &str, user: u32, state: FullStorageState) {
        let mut storage = self.full_storage.write().unwrap();
        storage.insert((package.to_string(), user), state);
    }

    fn store(&self, snapshot: GroupSnapshot) -> GroupSnapshot {
        let mut snapshots = self.snapshots.write().unwrap();
        snapshots.insert(world_key(&snapshot), snapshot.clone());
        snapshot
    }

    fn affects(filter: Option<&[String]>, name: &str) -> bool {
        match filter {
            Some(names) => names.iter().any(|n| n == name),
            None => true,
        }
    }
}

impl PermissionMutator for MemoryPermissionWorld {
    fn grant_foreground(
        &self,
        snapshot: &GroupSnapshot,
        filter: Option<&[String]>,
        one_time: bool,
    ) -> GroupSnapshot {
        let mut snap = snapshot.clone();
        for (name, perm) in snap.permissions.iter_mut() {
            if !Self::affects(filter, name) {
                continue;
            }
            perm.is_granted = true;
            perm.is_compat_revoked = false;
            perm.flags |= flags::USER_SET;
            perm.flags &= !flags::USER_FIXED;
            if one_time {
                perm.flags |= flags::ONE_TIME;
            } else {
                perm.flags &= !flags::ONE_TIME;
            }
        }
        snap.foreground.is_granted = true;
        snap.foreground.is_one_time = one_time;
        snap.foreground.is_user_fixed = false;
        self.store(snap)
    }

    fn revoke_foreground(
        &self,
        snapshot: &GroupSnapshot,
        filter: Option<&[String]>,
        one_time: bool,
        user_fixed: bool,
        force_compat_clear: bool,
    ) -> GroupSnapshot {
        let mut snap = snapshot.clone();
        for (name, perm) in snap.permissions.iter_mut() {
            if !Self::affects(filter, name) {
                continue;
            }
            perm.is_granted = false;
            if force_compat_clear {
                perm.is_compat_revoked = false;
            }
            if one_time {
                perm.flags |= flags::ONE_TIME;
            } else {
                perm.flags &= !flags::ONE_TIME;
            }
            if user_fixed {
                perm.flags |= flags::USER_FIXED;
            }
        }
        snap.foreground.is_granted = snap.permissions.values().any(|p| p.is_granted);
        snap.foreground.is_one_time = one_time;
        snap.foreground.is_user_fixed = user_fixed;
        self.store(snap)
    }

    fn grant_background(&self, snapshot: &GroupSnapshot) -> GroupSnapshot {
        let mut snap = snapshot.clone();
        if let Some(bg) = snap.background.as_mut() {
            bg.is_granted = true;
            bg.is_user_fixed = false;
        }
        self.store(snap)
    }

    fn revoke_background(
        &self,
        snapshot: &GroupSnapshot,
        one_time: bool,
        user_fixed: bool,
    ) -> GroupSnapshot {
        let mut snap = snapshot.clone();
        if let Some(bg) = snap.background.as_mut() {
            bg.is_granted = false;
            bg.is_one_time = one_time;
            bg.is_user_fixed = user_fixed;
        }
        self.store(snap)
    }

    fn set_selected_accuracy(&self, snapshot: &GroupSnapshot, fine: bool) -> GroupSnapshot {
        let mut snap = snapshot.clone();
        let (selected, cleared) = if fine {
            (perms::ACCESS_FINE_LOCATION, perms::ACCESS_COARSE_LOCATION)
        } else {
            (perms::ACCESS_COARSE_LOCATION, perms::ACCESS_FINE_LOCATION)
        };
        if let Some(perm) = snap.permissions.get_mut(selected) {
            perm.flags |= flags::SELECTED_LOCATION_ACCURACY;
        }
        if let Some(perm) = snap.permissions.get_mut(cleared) {
            perm.flags &= !flags::SELECTED_LOCATION_ACCURACY;
        }
        snap.foreground.is_selected_location_accuracy = true;
        self.store(snap)
    }
}

#[async_trait]
impl SnapshotProvider for MemoryPermissionWorld {
    async fn snapshot(
        &self,
        package: &str,
        group: &PermissionGroup,
        user: u32,
    ) -> Option<GroupSnapshot> {
        let snapshots = self.snapshots.read().unwrap();
        snapshots
            .get(&(package.to_string(), group.name().to_string(), user))
            .cloned()
    }
}

impl FullStorageSource for MemoryPermissionWorld {
    fn full_storage_state(&self, package: &str, user: u32) -> Option<FullStorageState> {
        let storage = self.full_storage.read().unwrap();
        storage.get(&(package.to_string(), user)).copied()
    }
}

/// Admin source with a fixed answer.
#[derive(Debug, Default)]
pub struct MemoryAdminSource {
    admin: Option<AdminRef>,
}

impl MemoryAdminSource {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_admin(admin: AdminRef) -> Self {
        Self { admin: Some(admin) }
    }
}

impl AdminSource for MemoryAdminSource {
    fn enforcing_admin(&self, _user: u32) -> Option<AdminRef> {
        self.admin.clone()
    }
}

/// Safety-label source with a fixed answer.
#[derive(Debug, Default)]
pub struct MemorySafetyLabelSource {
    shares_location: bool,
}

impl MemorySafetyLabelSource {
    pub fn new(shares_location: bool) -> Self {
        Self { shares_location }
    }
}

impl SafetyLabelSource for MemorySafetyLabelSource {
    fn has_location_sharing_purpose(&self, _package: &str, _user: u32) -> bool {
        self.shares_location
    }
}

/// Role source backed by an explicit holder list.
#[derive(Debug, Default)]
pub struct MemoryRoleSource {
    holders: Vec<String>,
}

impl MemoryRoleSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_holder(mut self, package: impl Into<String>) -> Self {
        self.holders.push(package.into());
        self
    }
}

impl RoleSource for MemoryRoleSource {
    fn holds_device_profile_role(&self, package: &str, _user: u32) -> bool {
        self.holders.iter().any(|p| p == package)
    }
}

/// In-memory app-ops store recording the last mode per (op, uid).
#[derive(Debug, Default)]
pub struct MemoryAppOps {
    modes: RwLock<HashMap<(String, u32), AppOpMode>>,
}

impl MemoryAppOps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self, op: &str, uid: u32) -> Option<AppOpMode> {
        let modes = self.modes.read().unwrap();
        modes.get(&(op.to_string(), uid)).copied()
    }
}

impl AppOpsStore for MemoryAppOps {
    fn set_uid_mode(&self, op: &str, uid: u32, mode: AppOpMode) {
        let mut modes = self.modes.write().unwrap();
        modes.insert((op.to_string(), uid), mode);
    }
}
