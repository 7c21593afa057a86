//! Immutable permission group snapshots.
//!
//! A [`GroupSnapshot`] captures one permission group for one app and user at
//! one instant. The permission subsystem produces a fresh snapshot on every
//! relevant state change; the engine only ever reads them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::group::PermissionGroup;

/// Flag bits carried on individual permissions, mirrored from the platform.
pub mod flags {
    pub const USER_SET: u32 = 1 << 0;
    pub const USER_FIXED: u32 = 1 << 1;
    pub const POLICY_FIXED: u32 = 1 << 2;
    pub const SYSTEM_FIXED: u32 = 1 << 3;
    pub const GRANTED_BY_DEFAULT: u32 = 1 << 5;
    pub const ONE_TIME: u32 = 1 << 16;
    pub const SELECTED_LOCATION_ACCURACY: u32 = 1 << 19;
}

/// Grant state of one half (foreground or background) of a group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantState {
    pub is_granted: bool,
    pub is_one_time: bool,
    pub is_user_fixed: bool,
    pub is_system_fixed: bool,
    pub is_policy_fixed: bool,
    pub is_granted_by_default: bool,
    pub is_granted_by_role: bool,
    pub is_selected_location_accuracy: bool,
}

impl GrantState {
    pub fn granted() -> Self {
        Self {
            is_granted: true,
            ..Self::default()
        }
    }

    pub fn denied() -> Self {
        Self::default()
    }

    /// Fixed by the OS or by device policy; user toggling is locked out.
    pub fn is_fixed(&self) -> bool {
        self.is_system_fixed || self.is_policy_fixed
    }

    pub fn with_one_time(mut self, one_time: bool) -> Self {
        self.is_one_time = one_time;
        self
    }

    pub fn with_system_fixed(mut self, fixed: bool) -> Self {
        self.is_system_fixed = fixed;
        self
    }

    pub fn with_policy_fixed(mut self, fixed: bool) -> Self {
        self.is_policy_fixed = fixed;
        self
    }

    pub fn with_user_fixed(mut self, fixed: bool) -> Self {
        self.is_user_fixed = fixed;
        self
    }

    pub fn with_granted_by_default(mut self, value: bool) -> Self {
        self.is_granted_by_default = value;
        self
    }

    pub fn with_granted_by_role(mut self, value: bool) -> Self {
        self.is_granted_by_role = value;
        self
    }
}

/// State of one individual permission inside a group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionState {
    pub is_granted: bool,
    /// Raw platform flag bits; see [`flags`].
    pub flags: u32,
    /// Granted implicitly to satisfy an older permission model.
    pub is_implicit: bool,
    /// Revoked for compatibility rather than by user choice.
    pub is_compat_revoked: bool,
}

impl PermissionState {
    pub fn granted() -> Self {
        Self {
            is_granted: true,
            ..Self::default()
        }
    }

    pub fn denied() -> Self {
        Self::default()
    }

    pub fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    /// Whether this permission carries the explicit selected-accuracy flag.
    pub fn is_selected_location_accuracy(&self) -> bool {
        self.flags & flags::SELECTED_LOCATION_ACCURACY != 0
    }
}

/// Legacy full-storage grant state pushed by the storage source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullStorageState {
    /// App still runs under the pre-split storage model.
    pub is_legacy: bool,
    /// App currently holds all-files access.
    pub is_granted: bool,
}

/// Immutable view of one permission group for one (package, user) at one
/// instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSnapshot {
    pub package: String,
    pub group: PermissionGroup,
    pub user: u32,
    pub uid: u32,
    pub target_sdk: u32,
    pub foreground: GrantState,
    /// `None` when the group has no background component.
    pub background: Option<GrantState>,
    /// Per-permission state, ordered for deterministic diffing.
    pub permissions: BTreeMap<String, PermissionState>,
    /// At least one permission in the group has a background mode.
    pub has_perm_with_background_mode: bool,
    pub is_policy_fully_fixed: bool,
    pub supports_runtime_perms: bool,
    /// Group was promoted from an install-time to a runtime permission.
    pub has_install_to_runtime_split: bool,
}

impl GroupSnapshot {
    /// Create a minimal snapshot; callers layer state on with `with_*`.
    pub fn new(package: impl Into<String>, group: PermissionGroup, user: u32, uid: u32) -> Self {
        Self {
            package: package.into(),
            group,
            user,
            uid,
            target_sdk: crate::sdk::T,
            foreground: GrantState::default(),
            background: None,
            permissions: BTreeMap::new(),
            has_perm_with_background_mode: false,
            is_policy_fully_fixed: false,
            supports_runtime_perms: true,
            has_install_to_runtime_split: false,
        }
    }

    pub fn with_target_sdk(mut self, target_sdk: u32) -> Self {
        self.target_sdk = target_sdk;
        self
    }

    pub fn with_foreground(mut self, state: GrantState) -> Self {
        self.foreground = state;
        self
    }

    pub fn with_background(mut self, state: GrantState) -> Self {
        self.background = Some(state);
        self.has_perm_with_background_mode = true;
        self
    }

    pub fn with_permission(mut self, name: impl Into<String>, state: PermissionState) -> Self {
        self.permissions.insert(name.into(), state);
        self
    }

    pub fn with_supports_runtime_perms(mut self, value: bool) -> Self {
        self.supports_runtime_perms = value;
        self
    }

    pub fn with_install_to_runtime_split(mut self, value: bool) -> Self {
        self.has_install_to_runtime_split = value;
        self
    }

    pub fn with_policy_fully_fixed(mut self, value: bool) -> Self {
        self.is_policy_fully_fixed = value;
        self
    }

    /// Whether the group has a distinct background grant.
    pub fn has_background_group(&self) -> bool {
        self.background.is_some()
    }

    /// Background state, defaulting to denied when the group has none.
    pub fn background_or_default(&self) -> GrantState {
        self.background.unwrap_or_default()
    }

    /// Whether any permission in the group is currently granted.
    pub fn is_any_permission_granted(&self) -> bool {
        self.permissions.values().any(|p| p.is_granted)
    }

    /// Whether every permission in the group is granted.
    pub fn is_fully_granted(&self) -> bool {
        !self.permissions.is_empty() && self.permissions.values().all(|p| p.is_granted)
    }

    pub fn permission(&self, name: &str) -> Option<&PermissionState> {
        self.permissions.get(name)
    }

    /// Whether the group requests the given permission at all.
    pub fn requests_permission(&self, name: &str) -> bool {
        self.permissions.contains_key(name)
    }

    /// Stable content hash over everything that affects projection.
    ///
    /// Two snapshots with equal hashes project identically; snapshot
    /// producers can compare hashes to skip pushing unchanged state.
    pub fn compute_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.package.as_bytes());
        hasher.update(self.group.name().as_bytes());
        hasher.update(&self.user.to_le_bytes());
        hasher.update(&self.uid.to_le_bytes());
        hasher.update(&self.target_sdk.to_le_bytes());
        hash_grant_state(&mut hasher, &self.foreground);
        match &self.background {
            Some(bg) => {
                hasher.update(&[1]);
                hash_grant_state(&mut hasher, bg);
            }
            None => {
                hasher.update(&[0]);
            }
        }
        for (name, perm) in &self.permissions {
            hasher.update(name.as_bytes());
            hasher.update(&[
                perm.is_granted as u8,
                perm.is_implicit as u8,
                perm.is_compat_revoked as u8,
            ]);
            hasher.update(&perm.flags.to_le_bytes());
        }
        hasher.update(&[
            self.has_perm_with_background_mode as u8,
            self.is_policy_fully_fixed as u8,
            self.supports_runtime_perms as u8,
            self.has_install_to_runtime_split as u8,
        ]);
        hasher.finalize().to_hex().to_string()
    }
}

fn hash_grant_state(hasher: &mut blake3::Hasher, state: &GrantState) {
    hasher.update(&[
        state.is_granted as u8,
        state.is_one_time as u8,
        state.is_user_fixed as u8,
        state.is_system_fixed as u8,
        state.is_policy_fixed as u8,
        state.is_granted_by_default as u8,
        state.is_granted_by_role as u8,
        state.is_selected_location_accuracy as u8,
    ]);
}
