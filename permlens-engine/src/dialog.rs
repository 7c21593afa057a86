//! Confirmation dialog types and the presenter seam
//!
//! The planner never shows UI itself. When a change needs user confirmation
//! it returns one of the payloads here; the embedder renders it through a
//! [`DialogPresenter`] and replays the confirmed request on acceptance.

use permlens_model::{ChangeRequest, Control};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// Which warning the simple confirmation dialog shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmMessage {
    /// Revoking a permission the system granted by default.
    GrantedByDefaultWarning,
    /// Revoking from an app built before runtime permissions; it may
    /// misbehave once access disappears.
    LegacySdkWarning,
    /// Revoking from an app holding a device-profile role.
    DeviceProfileWarning,
}

/// A simple yes/no confirmation gate in front of a change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationRequest {
    /// The request to replay if the user confirms.
    pub request: ChangeRequest,
    pub message: ConfirmMessage,
    pub one_time: bool,
    /// The control whose selection raised the dialog.
    pub source: Control,
}

/// Resource keys and replay payload for the storage supergroup dialog.
///
/// All text fields are string resource keys; the embedder resolves them
/// against its own localization table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdvancedDialogArgs {
    pub icon: &'static str,
    pub title: &'static str,
    pub message: &'static str,
    pub negative_button: &'static str,
    pub positive_button: &'static str,
    /// Confirmed request replayed when the user accepts.
    pub request: ChangeRequest,
    pub one_time: bool,
    /// The control whose selection raised the dialog.
    pub source: Control,
}

/// Trait for presenting confirmation dialogs
///
/// Embedders implement this to surface the dialogs in their UI toolkit.
/// Presentation is fire-and-forget; the answer comes back through the
/// session's confirm/deny entry points.
pub trait DialogPresenter: Send + Sync {
    fn present_confirmation(&self, request: ConfirmationRequest);

    fn present_advanced(&self, args: AdvancedDialogArgs);
}

// ============================================================================
// Default Implementations
// ============================================================================

/// Presenter that drops every dialog (headless embedders)
#[derive(Debug, Default)]
pub struct NullDialogPresenter;

impl NullDialogPresenter {
    pub fn new() -> Self {
        Self
    }
}

impl DialogPresenter for NullDialogPresenter {
    fn present_confirmation(&self, _request: ConfirmationRequest) {}

    fn present_advanced(&self, _args: AdvancedDialogArgs) {}
}

/// Presenter that records every dialog for test assertions
#[derive(Debug, Default)]
pub struct RecordingDialogPresenter {
    confirmations: RwLock<Vec<ConfirmationRequest>>,
    advanced: RwLock<Vec<AdvancedDialogArgs>>,
}

impl RecordingDialogPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn confirmations(&self) -> Vec<ConfirmationRequest> {
        self.confirmations.read().unwrap().clone()
    }

    pub fn advanced(&self) -> Vec<AdvancedDialogArgs> {
        self.advanced.read().unwrap().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.confirmations.read().unwrap().is_empty() && self.advanced.read().unwrap().is_empty()
    }
}

impl DialogPresenter for RecordingDialogPresenter {
    fn present_confirmation(&self, request: ConfirmationRequest) {
        self.confirmations.write().unwrap().push(request);
    }

    fn present_advanced(&self, args: AdvancedDialogArgs) {
        self.advanced.write().unwrap().push(args);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_presenter() {
        let presenter = RecordingDialogPresenter::new();
        assert!(presenter.is_empty());

        presenter.present_confirmation(ConfirmationRequest {
            request: ChangeRequest::RevokeBoth,
            message: ConfirmMessage::GrantedByDefaultWarning,
            one_time: false,
            source: Control::Deny,
        });

        let recorded = presenter.confirmations();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].message, ConfirmMessage::GrantedByDefaultWarning);
        assert!(presenter.advanced().is_empty());
    }

    #[test]
    fn test_confirmation_serialization() {
        let request = ConfirmationRequest {
            request: ChangeRequest::RevokeForeground,
            message: ConfirmMessage::LegacySdkWarning,
            one_time: false,
            source: Control::Deny,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("legacy_sdk_warning"));
        assert!(json.contains("revoke_foreground"));
    }
}
