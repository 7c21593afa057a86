//! State projector: snapshot plus auxiliary signals in, control map out
//!
//! Projection is a pure function decomposed into ordered sub-steps, each
//! threading the working control map:
//!
//! ```text
//! GroupSnapshot + AuxSignals
//!        │
//!        ▼
//! ┌──────────────┐   ┌──────────────┐   ┌─────────────────────────────┐
//! │ select_shape │ → │ apply_fixes  │ → │ overlays                    │
//! │              │   │              │   │  - pre-runtime SDK fold     │
//! │ - background │   │ - system     │   │  - legacy full storage      │
//! │ - photo pick │   │ - policy     │   │  - location accuracy        │
//! │ - plain      │   │  + detail    │   │                             │
//! └──────────────┘   └──────────────┘   └─────────────────────────────┘
//!        │
//!        ▼
//!    Projection { controls, detail, admin, show_rationale }
//! ```
//!
//! Equal inputs always produce identical projections; the session layer
//! relies on this to publish only real changes.

mod fixes;
mod overlays;
mod shape;

pub use fixes::apply_fixes;
pub use overlays::{apply_full_storage, apply_location_accuracy, apply_pre_runtime_sdk};
pub use shape::select_shape;

use permlens_model::{AdminRef, Control, ControlMap, FixSource, FullStorageState, GroupSnapshot,
    PermissionGroup, Projection};

/// Auxiliary signals resolved outside the snapshot itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuxSignals {
    /// Legacy full-storage state; `None` while unresolved.
    pub full_storage: Option<FullStorageState>,
    /// Session-cached location accuracy eligibility.
    pub show_location_accuracy: bool,
    /// The app's safety label declares a location-sharing purpose.
    pub safety_label_rationale: bool,
    /// Enforcing admin, when device policy fixes apply.
    pub admin: Option<AdminRef>,
}

/// Project a snapshot into the per-control UI state.
pub fn project(snapshot: &GroupSnapshot, aux: &AuxSignals) -> Projection {
    let mut controls = shape::select_shape(snapshot);
    let detail = fixes::apply_fixes(snapshot, aux.admin.as_ref(), &mut controls);
    overlays::apply_pre_runtime_sdk(snapshot, &mut controls);
    overlays::apply_full_storage(snapshot, aux.full_storage, &mut controls);
    overlays::apply_location_accuracy(snapshot, aux, &mut controls);

    // The admin reference is surfaced only when an admin policy supplied
    // the detail line.
    let admin = match detail {
        Some(reason) if reason.source == FixSource::AdminPolicy => aux.admin.clone(),
        _ => None,
    };

    Projection {
        controls,
        detail,
        admin,
        show_rationale: aux.safety_label_rationale && snapshot.group == PermissionGroup::Location,
    }
}

/// The deny control active for this shape.
pub(crate) fn active_deny(controls: &ControlMap) -> Control {
    if controls.get(Control::DenyForeground).is_shown {
        Control::DenyForeground
    } else {
        Control::Deny
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use permlens_model::{GrantState, PermissionState};

    fn camera_snapshot() -> GroupSnapshot {
        GroupSnapshot::new("com.example.cam", PermissionGroup::Camera, 0, 10050)
            .with_foreground(GrantState::granted())
            .with_permission("camera.capture", PermissionState::granted())
    }

    #[test]
    fn test_projection_is_deterministic() {
        let snap = camera_snapshot();
        let aux = AuxSignals::default();

        let a = project(&snap, &aux);
        let b = project(&snap, &aux);
        assert_eq!(a, b);
    }

    #[test]
    fn test_rationale_only_for_location() {
        let aux = AuxSignals {
            safety_label_rationale: true,
            ..AuxSignals::default()
        };

        let projection = project(&camera_snapshot(), &aux);
        assert!(!projection.show_rationale);

        let location =
            GroupSnapshot::new("com.example.maps", PermissionGroup::Location, 0, 10042)
                .with_permission(
                    permlens_model::perms::ACCESS_FINE_LOCATION,
                    PermissionState::denied(),
                );
        let projection = project(&location, &aux);
        assert!(projection.show_rationale);
    }

    #[test]
    fn test_admin_surfaced_only_with_admin_policy_detail() {
        let admin = AdminRef {
            component: "com.example.mdm/.Receiver".to_string(),
            user: 0,
        };
        let aux = AuxSignals {
            admin: Some(admin),
            ..AuxSignals::default()
        };

        // No fix at all, no admin reference.
        let projection = project(&camera_snapshot(), &aux);
        assert!(projection.admin.is_none());
        assert!(projection.detail.is_none());

        // Policy-fixed with a resolvable admin names the admin.
        let snap = camera_snapshot()
            .with_foreground(GrantState::granted().with_policy_fixed(true));
        let projection = project(&snap, &aux);
        assert!(projection.admin.is_some());
        assert_eq!(
            projection.detail.map(|d| d.source),
            Some(FixSource::AdminPolicy)
        );
    }
}
