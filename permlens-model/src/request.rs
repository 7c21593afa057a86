//! Change requests and their decomposition into primitive intents.
//!
//! The platform source expressed these as a composite bitmask; here each
//! composite is a named variant and [`ChangeRequest::intents`] is the single
//! place that spells out which primitive directions a variant implies.

use serde::{Deserialize, Serialize};

/// A user-requested change to a permission group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeRequest {
    GrantForeground,
    RevokeForeground,
    GrantBackground,
    RevokeBackground,
    /// Grant foreground and background together.
    GrantBoth,
    /// Revoke foreground and background together.
    RevokeBoth,
    /// Grant foreground while revoking background.
    GrantForegroundOnly,
    /// Toggle the all-files app-op instead of runtime permissions.
    GrantAllFileAccess,
    /// Switch the location accuracy selection to precise.
    GrantFineLocation,
    /// Switch the location accuracy selection to approximate.
    RevokeFineLocation,
    /// Grant routed through the storage supergroup, pending confirmation.
    GrantStorageSupergroup,
    /// Revoke routed through the storage supergroup, pending confirmation.
    RevokeStorageSupergroup,
    /// Supergroup grant replayed after the user confirmed.
    GrantStorageSupergroupConfirmed,
    /// Supergroup revoke replayed after the user confirmed.
    RevokeStorageSupergroupConfirmed,
    /// Restrict the grant to the user-selected photo subset.
    PhotosSelected,
}

/// The four primitive directions a composite request decomposes into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Intents {
    pub grant_foreground: bool,
    pub revoke_foreground: bool,
    pub grant_background: bool,
    pub revoke_background: bool,
}

impl ChangeRequest {
    /// Decompose into primitive grant/revoke intents.
    ///
    /// The special-purpose requests (`GrantAllFileAccess`, fine-location
    /// toggles, `PhotosSelected`) carry no generic intents; the planner
    /// short-circuits them before decomposition matters.
    pub fn intents(&self) -> Intents {
        match self {
            Self::GrantForeground => Intents {
                grant_foreground: true,
                ..Default::default()
            },
            Self::RevokeForeground => Intents {
                revoke_foreground: true,
                ..Default::default()
            },
            Self::GrantBackground => Intents {
                grant_background: true,
                ..Default::default()
            },
            Self::RevokeBackground => Intents {
                revoke_background: true,
                ..Default::default()
            },
            Self::GrantBoth
            | Self::GrantStorageSupergroup
            | Self::GrantStorageSupergroupConfirmed => Intents {
                grant_foreground: true,
                grant_background: true,
                ..Default::default()
            },
            Self::RevokeBoth
            | Self::RevokeStorageSupergroup
            | Self::RevokeStorageSupergroupConfirmed => Intents {
                revoke_foreground: true,
                revoke_background: true,
                ..Default::default()
            },
            Self::GrantForegroundOnly => Intents {
                grant_foreground: true,
                revoke_background: true,
                ..Default::default()
            },
            Self::GrantAllFileAccess
            | Self::GrantFineLocation
            | Self::RevokeFineLocation
            | Self::PhotosSelected => Intents::default(),
        }
    }

    /// Whether this request routes through the storage supergroup.
    pub fn is_storage_supergroup(&self) -> bool {
        matches!(
            self,
            Self::GrantStorageSupergroup
                | Self::RevokeStorageSupergroup
                | Self::GrantStorageSupergroupConfirmed
                | Self::RevokeStorageSupergroupConfirmed
        )
    }

    /// Whether the user already confirmed this request in a dialog.
    pub fn is_confirmed(&self) -> bool {
        matches!(
            self,
            Self::GrantStorageSupergroupConfirmed | Self::RevokeStorageSupergroupConfirmed
        )
    }

    /// The confirmed composite to replay after the user accepts the
    /// supergroup dialog.
    pub fn confirmed_variant(&self) -> Option<Self> {
        match self {
            Self::GrantStorageSupergroup => Some(Self::GrantStorageSupergroupConfirmed),
            Self::RevokeStorageSupergroup => Some(Self::RevokeStorageSupergroupConfirmed),
            _ => None,
        }
    }

    /// Whether any grant direction is present.
    pub fn grants(&self) -> bool {
        let intents = self.intents();
        intents.grant_foreground || intents.grant_background
    }

    /// Whether any revoke direction is present.
    pub fn revokes(&self) -> bool {
        let intents = self.intents();
        intents.revoke_foreground || intents.revoke_background
    }
}

impl Intents {
    /// Strip grant directions, keeping only revokes (deny-anyway replay).
    pub fn revoke_only(self) -> Self {
        Self {
            grant_foreground: false,
            grant_background: false,
            ..self
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
