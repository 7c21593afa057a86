//! Overlays applied after shape selection and fix propagation: the
//! pre-runtime-SDK ask fold, the legacy full-storage tri-state, and the
//! location accuracy switch.

use permlens_model::{
    perms, sdk, ChangeRequest, Control, ControlMap, FullStorageState, GroupSnapshot,
    PermissionGroup,
};

use super::{active_deny, AuxSignals};

/// Apps built before runtime permissions cannot be asked; fold the ask
/// state into deny.
pub fn apply_pre_runtime_sdk(snapshot: &GroupSnapshot, controls: &mut ControlMap) {
    if snapshot.target_sdk >= sdk::M {
        return;
    }

    let was_checked = controls.get(Control::Ask).is_checked;
    {
        let ask = controls.get_mut(Control::Ask);
        ask.is_shown = false;
        ask.is_checked = false;
    }
    if was_checked {
        let deny = active_deny(controls);
        controls.get_mut(deny).is_checked = true;
    }
}

/// Legacy full-storage tri-state for the storage group on targets below
/// the scoped-storage split.
///
/// While the full-storage state is unresolved the always control stays
/// hidden and disabled; once resolved, always and foreground are repurposed
/// as "all files" and "media only" and the plain allow disappears.
pub fn apply_full_storage(
    snapshot: &GroupSnapshot,
    full_storage: Option<FullStorageState>,
    controls: &mut ControlMap,
) {
    if snapshot.group != PermissionGroup::Storage || snapshot.target_sdk >= sdk::R {
        return;
    }

    match full_storage {
        None => {
            let always = controls.get_mut(Control::AllowAlways);
            always.is_shown = false;
            always.is_enabled = false;
        }
        Some(state) => {
            let fg_granted = snapshot.foreground.is_granted;

            controls.get_mut(Control::Allow).is_shown = false;

            let always = controls.get_mut(Control::AllowAlways);
            always.is_shown = true;
            always.is_checked = state.is_granted;
            always.custom_request = Some(ChangeRequest::GrantAllFileAccess);

            let foreground = controls.get_mut(Control::AllowForeground);
            foreground.is_shown = true;
            foreground.is_checked = !state.is_granted && fg_granted;
            foreground.custom_request = Some(ChangeRequest::GrantForegroundOnly);

            let deny = controls.get_mut(Control::Deny);
            deny.is_shown = true;
            deny.is_checked = !fg_granted && !state.is_granted;
        }
    }
}

/// Location accuracy switch; eligibility is session-cached and passed in.
pub fn apply_location_accuracy(
    snapshot: &GroupSnapshot,
    aux: &AuxSignals,
    controls: &mut ControlMap,
) {
    if !aux.show_location_accuracy {
        return;
    }

    let fine = snapshot.permission(perms::ACCESS_FINE_LOCATION);
    let coarse = snapshot.permission(perms::ACCESS_COARSE_LOCATION);

    let fine_granted = fine.map(|p| p.is_granted).unwrap_or(false);
    let coarse_granted = coarse.map(|p| p.is_granted).unwrap_or(false);
    let fine_selected = fine
        .map(|p| p.is_selected_location_accuracy())
        .unwrap_or(false);
    let coarse_selected = coarse
        .map(|p| p.is_selected_location_accuracy())
        .unwrap_or(false);

    // Grant state wins over the remembered selection; absent both, the
    // switch defaults to precise.
    let checked = if fine_granted || coarse_granted {
        fine_granted
    } else if fine_selected || coarse_selected {
        fine_selected
    } else {
        true
    };

    let deny = active_deny(controls);
    let deny_checked = controls.get(deny).is_checked;
    let fg = snapshot.foreground;

    let accuracy = controls.get_mut(Control::LocationAccuracy);
    accuracy.is_shown = !deny_checked;
    accuracy.is_checked = checked;
    accuracy.is_enabled = !fg.is_system_fixed && !fg.is_policy_fixed;
    accuracy.custom_request = Some(if checked {
        ChangeRequest::RevokeFineLocation
    } else {
        ChangeRequest::GrantFineLocation
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projector::select_shape;
    use permlens_model::{GrantState, PermissionState};

    fn legacy_app(group: PermissionGroup, target_sdk: u32) -> GroupSnapshot {
        GroupSnapshot::new("com.example.app", group, 0, 10001)
            .with_target_sdk(target_sdk)
            .with_supports_runtime_perms(target_sdk >= sdk::M)
            .with_permission("perm.a", PermissionState::denied())
    }

    #[test]
    fn test_pre_runtime_sdk_folds_ask_into_deny() {
        let snap = legacy_app(PermissionGroup::Custom("contacts".into()), sdk::M - 1)
            .with_foreground(GrantState::denied().with_one_time(true))
            .with_supports_runtime_perms(true);

        let mut controls = select_shape(&snap);
        assert!(controls.get(Control::Ask).is_checked);

        apply_pre_runtime_sdk(&snap, &mut controls);
        assert!(!controls.get(Control::Ask).is_shown);
        assert!(!controls.get(Control::Ask).is_checked);
        assert!(controls.get(Control::Deny).is_checked);
    }

    #[test]
    fn test_unresolved_full_storage_hides_always() {
        let snap = legacy_app(PermissionGroup::Storage, sdk::Q);
        let mut controls = select_shape(&snap);

        apply_full_storage(&snap, None, &mut controls);
        let always = controls.get(Control::AllowAlways);
        assert!(!always.is_shown);
        assert!(!always.is_enabled);
    }

    #[test]
    fn test_resolved_full_storage_surfaces_tristate() {
        let snap = legacy_app(PermissionGroup::Storage, sdk::Q)
            .with_foreground(GrantState::granted());
        let mut controls = select_shape(&snap);

        apply_full_storage(
            &snap,
            Some(FullStorageState {
                is_legacy: true,
                is_granted: true,
            }),
            &mut controls,
        );

        assert!(!controls.get(Control::Allow).is_shown);
        let always = controls.get(Control::AllowAlways);
        assert!(always.is_shown);
        assert!(always.is_checked);
        assert_eq!(
            always.custom_request,
            Some(ChangeRequest::GrantAllFileAccess)
        );
        let foreground = controls.get(Control::AllowForeground);
        assert!(foreground.is_shown);
        assert!(!foreground.is_checked);
        assert_eq!(
            foreground.custom_request,
            Some(ChangeRequest::GrantForegroundOnly)
        );
    }

    #[test]
    fn test_full_storage_ignored_on_new_targets() {
        let snap = legacy_app(PermissionGroup::Storage, sdk::R);
        let mut controls = select_shape(&snap);
        let before = controls.clone();

        apply_full_storage(
            &snap,
            Some(FullStorageState {
                is_legacy: false,
                is_granted: false,
            }),
            &mut controls,
        );
        assert_eq!(controls, before);
    }

    fn location_with(fine: PermissionState, coarse: PermissionState) -> GroupSnapshot {
        GroupSnapshot::new("com.example.maps", PermissionGroup::Location, 0, 10042)
            .with_target_sdk(sdk::S)
            .with_foreground(GrantState::granted())
            .with_permission(perms::ACCESS_FINE_LOCATION, fine)
            .with_permission(perms::ACCESS_COARSE_LOCATION, coarse)
    }

    fn aux_with_accuracy() -> AuxSignals {
        AuxSignals {
            show_location_accuracy: true,
            ..AuxSignals::default()
        }
    }

    #[test]
    fn test_accuracy_checked_follows_grant_state() {
        let snap = location_with(PermissionState::denied(), PermissionState::granted());
        let mut controls = select_shape(&snap);
        apply_location_accuracy(&snap, &aux_with_accuracy(), &mut controls);

        let accuracy = controls.get(Control::LocationAccuracy);
        assert!(accuracy.is_shown);
        assert!(!accuracy.is_checked);
        assert_eq!(
            accuracy.custom_request,
            Some(ChangeRequest::GrantFineLocation)
        );
    }

    #[test]
    fn test_accuracy_falls_back_to_selected_flag() {
        use permlens_model::snapshot::flags;
        let snap = location_with(
            PermissionState::denied().with_flags(flags::SELECTED_LOCATION_ACCURACY),
            PermissionState::denied(),
        );
        let mut controls = select_shape(&snap);
        apply_location_accuracy(&snap, &aux_with_accuracy(), &mut controls);
        assert!(controls.get(Control::LocationAccuracy).is_checked);
    }

    #[test]
    fn test_accuracy_defaults_to_fine() {
        let snap = location_with(PermissionState::denied(), PermissionState::denied());
        let mut controls = select_shape(&snap);
        apply_location_accuracy(&snap, &aux_with_accuracy(), &mut controls);

        let accuracy = controls.get(Control::LocationAccuracy);
        assert!(accuracy.is_checked);
        assert_eq!(
            accuracy.custom_request,
            Some(ChangeRequest::RevokeFineLocation)
        );
    }

    #[test]
    fn test_accuracy_hidden_when_denied() {
        let snap = location_with(PermissionState::denied(), PermissionState::denied())
            .with_foreground(GrantState::denied());
        let mut controls = select_shape(&snap);
        apply_location_accuracy(&snap, &aux_with_accuracy(), &mut controls);
        assert!(!controls.get(Control::LocationAccuracy).is_shown);
    }
}
