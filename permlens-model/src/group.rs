//! Permission group identities and their special-case classifications.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A named bundle of permissions toggled together in the UI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionGroup {
    Location,
    Storage,
    Camera,
    Microphone,
    /// Photos and video after the media split.
    VisualMedia,
    /// Audio files after the media split.
    AuralMedia,
    /// Any group the engine has no special handling for.
    Custom(String),
}

/// Groups toggled together for apps predating the media split.
pub const SUPERGROUP_GROUPS: &[PermissionGroup] =
    &[PermissionGroup::VisualMedia, PermissionGroup::AuralMedia];

impl PermissionGroup {
    /// Whether this group belongs to the storage supergroup.
    pub fn is_supergroup_member(&self) -> bool {
        SUPERGROUP_GROUPS.contains(self)
    }

    /// Groups whose plain Allow is displayed as "Allow only while using".
    pub fn is_foreground_only_display(&self) -> bool {
        matches!(self, Self::Camera | Self::Microphone)
    }

    /// Whether the group can offer the photo picker partial grant on the
    /// given target SDK.
    pub fn is_photo_picker_eligible(&self, target_sdk: u32) -> bool {
        matches!(self, Self::VisualMedia) && target_sdk >= crate::sdk::T
    }

    /// Stable name used in telemetry and persistence keys.
    pub fn name(&self) -> &str {
        match self {
            Self::Location => "location",
            Self::Storage => "storage",
            Self::Camera => "camera",
            Self::Microphone => "microphone",
            Self::VisualMedia => "visual_media",
            Self::AuralMedia => "aural_media",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for PermissionGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
