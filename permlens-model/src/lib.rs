//! permlens-model: Shared types for the permlens permission screen engine
//!
//! This crate defines the value types exchanged between the policy engine
//! and its collaborators: immutable permission group snapshots, change
//! requests, and the per-control UI state the engine projects.
//!
//! Nothing here performs I/O. Snapshots are plain values produced by the
//! platform's permission subsystem; the engine never mutates one in place,
//! every transition yields a new snapshot.

pub mod controls;
pub mod group;
pub mod request;
pub mod sdk;
pub mod snapshot;

pub use controls::{
    AdminRef, Control, ControlMap, ControlState, DetailReason, FixScope, FixSource, Projection,
};
pub use group::{PermissionGroup, SUPERGROUP_GROUPS};
pub use request::{ChangeRequest, Intents};
pub use sdk::SdkBracket;
pub use snapshot::{FullStorageState, GrantState, GroupSnapshot, PermissionState};

/// Well-known permission names the engine special-cases.
pub mod perms {
    /// Precise location permission; drives the location accuracy toggle.
    pub const ACCESS_FINE_LOCATION: &str = "location.fine";
    /// Approximate location permission.
    pub const ACCESS_COARSE_LOCATION: &str = "location.coarse";
    /// Marker permission for a user-selected photo subset.
    pub const READ_MEDIA_VISUAL_USER_SELECTED: &str = "media.visual.user_selected";
}
