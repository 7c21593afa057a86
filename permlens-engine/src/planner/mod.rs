//! Change planner: one user action in, confirmation or mutation plan out.
//!
//! ```text
//! PlanInput ──► short-circuits (accuracy / photos / all-files)
//!     │
//!     ├─► supergroup routing ──► RequireAdvancedConfirmation
//!     │
//!     ├─► revoke guards ──► RequireConfirmation
//!     │
//!     └─► op derivation per affected group ──► Apply(Vec<GroupPlan>)
//! ```
//!
//! The planner is pure: it never mutates permissions itself, it only
//! decides what the session must execute or present.

mod supergroup;

pub use supergroup::{advanced_dialog_args, needs_advanced_confirmation, routes_through_supergroup};

use permlens_model::{
    perms, sdk, ChangeRequest, Control, GroupSnapshot, PermissionGroup,
};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::dialog::{AdvancedDialogArgs, ConfirmMessage, ConfirmationRequest};

/// Everything the planner needs for one decision.
#[derive(Debug)]
pub struct PlanInput<'a> {
    pub snapshot: &'a GroupSnapshot,
    pub request: ChangeRequest,
    /// The control whose selection produced this request.
    pub source: Control,
    pub one_time: bool,
    /// The session already confirmed a revoke this lifetime.
    pub confirmed_already: bool,
    /// Cached sibling snapshots, keyed by group.
    pub supergroup: &'a BTreeMap<PermissionGroup, GroupSnapshot>,
    pub holds_device_profile_role: bool,
    /// Location accuracy switch is live for this session.
    pub location_accuracy_active: bool,
}

/// One primitive mutation against the permission subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOp {
    RevokeBackground {
        one_time: bool,
        user_fixed: bool,
    },
    RevokeForeground {
        filter: Option<Vec<String>>,
        one_time: bool,
        user_fixed: bool,
        force_compat_clear: bool,
    },
    GrantForeground {
        filter: Option<Vec<String>>,
        one_time: bool,
    },
    GrantBackground,
    SelectAccuracy {
        fine: bool,
    },
    SetAllFilesAccess {
        enabled: bool,
    },
}

impl MutationOp {
    /// Whether executing this op against the snapshot flips real granted
    /// state, as opposed to ask/deny bookkeeping. Only real flips emit
    /// toggle telemetry.
    pub fn changes_granted_state(&self, snapshot: &GroupSnapshot) -> bool {
        match self {
            Self::RevokeBackground { .. } => snapshot.background_or_default().is_granted,
            Self::RevokeForeground { .. } => snapshot.is_any_permission_granted(),
            Self::GrantForeground { .. } => !snapshot.is_fully_granted(),
            Self::GrantBackground => !snapshot.background_or_default().is_granted,
            Self::SelectAccuracy { .. } => false,
            Self::SetAllFilesAccess { .. } => true,
        }
    }
}

/// The ordered mutations for one affected group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupPlan {
    pub group: PermissionGroup,
    pub ops: Vec<MutationOp>,
}

impl GroupPlan {
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Result of planning one change.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Execute directly.
    Apply(Vec<GroupPlan>),
    /// Interpose a simple confirmation dialog.
    RequireConfirmation(ConfirmationRequest),
    /// Interpose the storage supergroup dialog.
    RequireAdvancedConfirmation(AdvancedDialogArgs),
}

#[derive(Debug, Error)]
pub enum PlanError {
    /// The advanced dialog table has no entry for this combination.
    #[error("unsupported confirmation combination: {0}")]
    UnsupportedCombination(String),

    /// A supergroup sibling snapshot has not been resolved yet.
    #[error("missing supergroup sibling snapshot: {0}")]
    MissingSibling(String),
}

/// Plan one requested change.
pub fn plan(input: &PlanInput<'_>) -> Result<Outcome, PlanError> {
    // Single-purpose requests never touch the generic path.
    match input.request {
        ChangeRequest::GrantFineLocation => {
            return Ok(Outcome::Apply(vec![accuracy_plan(input.snapshot, true)]))
        }
        ChangeRequest::RevokeFineLocation => {
            return Ok(Outcome::Apply(vec![accuracy_plan(input.snapshot, false)]))
        }
        ChangeRequest::PhotosSelected => {
            return Ok(Outcome::Apply(vec![photos_selected_plan(input.snapshot)]))
        }
        ChangeRequest::GrantAllFileAccess => {
            return Ok(Outcome::Apply(vec![GroupPlan {
                group: input.snapshot.group.clone(),
                ops: vec![
                    MutationOp::GrantForeground {
                        filter: None,
                        one_time: false,
                    },
                    MutationOp::SetAllFilesAccess { enabled: true },
                ],
            }]))
        }
        _ => {}
    }

    // Supergroup members on old targets move as one.
    let request = normalize_supergroup(input.snapshot, input.request);

    if needs_advanced_confirmation(input.snapshot, request) {
        let args =
            advanced_dialog_args(input.snapshot, request, input.one_time, input.source)?;
        return Ok(Outcome::RequireAdvancedConfirmation(args));
    }

    if let Some(message) = revoke_guard(input, request) {
        return Ok(Outcome::RequireConfirmation(ConfirmationRequest {
            request,
            message,
            one_time: input.one_time,
            source: input.source,
        }));
    }

    let plans = derive_group_plans(input, request)?;
    Ok(Outcome::Apply(plans))
}

/// Deny-anyway path: after the user insists on revoking, re-apply the
/// revoke directions only. Returns the plans and whether the session must
/// latch its confirmed-revoke flag.
pub fn confirm_revoke(input: &PlanInput<'_>) -> Result<(Vec<GroupPlan>, bool), PlanError> {
    let request = normalize_supergroup(input.snapshot, input.request);
    let plans = derive_plans_with(input, request, true)?;

    let fg = input.snapshot.foreground;
    let latch = fg.is_granted_by_default || !input.snapshot.supports_runtime_perms;
    Ok((plans, latch))
}

/// Rewrite plain grant/revoke requests into supergroup composites when the
/// group must move with its siblings.
fn normalize_supergroup(snapshot: &GroupSnapshot, request: ChangeRequest) -> ChangeRequest {
    if request.is_storage_supergroup() || !routes_through_supergroup(snapshot) {
        return request;
    }
    if request.grants() {
        ChangeRequest::GrantStorageSupergroup
    } else if request.revokes() {
        ChangeRequest::RevokeStorageSupergroup
    } else {
        request
    }
}

/// Revoke guards: which confirmation, if any, must interpose.
fn revoke_guard(input: &PlanInput<'_>, request: ChangeRequest) -> Option<ConfirmMessage> {
    if input.confirmed_already || request.is_confirmed() {
        return None;
    }
    let intents = request.intents();
    let fg = input.snapshot.foreground;
    if !intents.revoke_foreground || !fg.is_granted {
        return None;
    }

    if fg.is_granted_by_default {
        return Some(ConfirmMessage::GrantedByDefaultWarning);
    }
    if !input.snapshot.supports_runtime_perms || input.snapshot.has_install_to_runtime_split {
        return Some(ConfirmMessage::LegacySdkWarning);
    }
    if fg.is_granted_by_role && input.holds_device_profile_role {
        return Some(ConfirmMessage::DeviceProfileWarning);
    }
    None
}

fn derive_group_plans(
    input: &PlanInput<'_>,
    request: ChangeRequest,
) -> Result<Vec<GroupPlan>, PlanError> {
    derive_plans_with(input, request, false)
}

fn derive_plans_with(
    input: &PlanInput<'_>,
    request: ChangeRequest,
    revoke_only: bool,
) -> Result<Vec<GroupPlan>, PlanError> {
    let mut intents = request.intents();
    if revoke_only {
        intents = intents.revoke_only();
    }

    let mut plans = Vec::new();
    if request.is_storage_supergroup() && routes_through_supergroup(input.snapshot) {
        for group in permlens_model::SUPERGROUP_GROUPS {
            let snapshot = if *group == input.snapshot.group {
                input.snapshot
            } else {
                input
                    .supergroup
                    .get(group)
                    .ok_or_else(|| PlanError::MissingSibling(group.name().to_string()))?
            };
            plans.push(derive_ops(snapshot, intents, input, request));
        }
    } else {
        plans.push(derive_ops(input.snapshot, intents, input, request));
    }
    Ok(plans)
}

/// Derive the ordered primitive mutations for one group.
fn derive_ops(
    snapshot: &GroupSnapshot,
    intents: permlens_model::Intents,
    input: &PlanInput<'_>,
    request: ChangeRequest,
) -> GroupPlan {
    let mut ops = Vec::new();
    let fg = snapshot.foreground;
    let bg = snapshot.background_or_default();
    let one_time = input.one_time;

    if intents.revoke_background
        && snapshot.has_background_group()
        && (bg.is_granted || bg.is_user_fixed || bg.is_one_time != one_time)
    {
        ops.push(MutationOp::RevokeBackground {
            one_time,
            user_fixed: !one_time,
        });
    }

    if intents.revoke_foreground && (fg.is_granted || fg.is_one_time != one_time) {
        ops.push(MutationOp::RevokeForeground {
            filter: None,
            one_time,
            user_fixed: !one_time,
            force_compat_clear: snapshot.permissions.values().any(|p| p.is_compat_revoked),
        });
    }

    if intents.grant_foreground {
        ops.push(MutationOp::GrantForeground {
            filter: coarse_only_filter(snapshot, input),
            one_time,
        });
    }

    if intents.grant_background && snapshot.has_background_group() {
        ops.push(MutationOp::GrantBackground);
    }

    // Media-only on a legacy storage target also clears the all-files op.
    if request == ChangeRequest::GrantForegroundOnly
        && snapshot.group == PermissionGroup::Storage
        && snapshot.target_sdk < sdk::R
    {
        ops.push(MutationOp::SetAllFilesAccess { enabled: false });
    }

    GroupPlan {
        group: snapshot.group.clone(),
        ops,
    }
}

/// When the accuracy switch is live and approximate is the chosen accuracy,
/// a foreground grant must request coarse location only.
fn coarse_only_filter(snapshot: &GroupSnapshot, input: &PlanInput<'_>) -> Option<Vec<String>> {
    if !input.location_accuracy_active || snapshot.group != PermissionGroup::Location {
        return None;
    }
    if fine_is_chosen(snapshot) {
        return None;
    }
    Some(vec![perms::ACCESS_COARSE_LOCATION.to_string()])
}

/// The accuracy currently chosen, granted state first, remembered
/// selection second, fine by default.
fn fine_is_chosen(snapshot: &GroupSnapshot) -> bool {
    let fine = snapshot.permission(perms::ACCESS_FINE_LOCATION);
    let coarse = snapshot.permission(perms::ACCESS_COARSE_LOCATION);

    let fine_granted = fine.map(|p| p.is_granted).unwrap_or(false);
    let coarse_granted = coarse.map(|p| p.is_granted).unwrap_or(false);
    if fine_granted || coarse_granted {
        return fine_granted;
    }

    let fine_selected = fine
        .map(|p| p.is_selected_location_accuracy())
        .unwrap_or(false);
    let coarse_selected = coarse
        .map(|p| p.is_selected_location_accuracy())
        .unwrap_or(false);
    if fine_selected || coarse_selected {
        return fine_selected;
    }
    true
}

/// Accuracy toggle: move the selection, and when the group is granted,
/// move the live grant with it without touching the ask/deny axis.
fn accuracy_plan(snapshot: &GroupSnapshot, fine: bool) -> GroupPlan {
    let mut ops = vec![MutationOp::SelectAccuracy { fine }];

    if snapshot.foreground.is_granted {
        let (chosen, other) = if fine {
            (perms::ACCESS_FINE_LOCATION, perms::ACCESS_COARSE_LOCATION)
        } else {
            (perms::ACCESS_COARSE_LOCATION, perms::ACCESS_FINE_LOCATION)
        };
        let one_time = snapshot.foreground.is_one_time;
        ops.push(MutationOp::RevokeForeground {
            filter: Some(vec![other.to_string()]),
            one_time,
            user_fixed: false,
            force_compat_clear: false,
        });
        ops.push(MutationOp::GrantForeground {
            filter: Some(vec![chosen.to_string()]),
            one_time,
        });
    }

    GroupPlan {
        group: snapshot.group.clone(),
        ops,
    }
}

/// Partial photo grant: revoke everything outside the user-selected
/// subset, then grant the subset.
fn photos_selected_plan(snapshot: &GroupSnapshot) -> GroupPlan {
    let outside: Vec<String> = snapshot
        .permissions
        .keys()
        .filter(|name| name.as_str() != perms::READ_MEDIA_VISUAL_USER_SELECTED)
        .cloned()
        .collect();

    let mut ops = Vec::new();
    if !outside.is_empty() {
        ops.push(MutationOp::RevokeForeground {
            filter: Some(outside),
            one_time: false,
            user_fixed: false,
            force_compat_clear: false,
        });
    }
    ops.push(MutationOp::GrantForeground {
        filter: Some(vec![perms::READ_MEDIA_VISUAL_USER_SELECTED.to_string()]),
        one_time: false,
    });

    GroupPlan {
        group: snapshot.group.clone(),
        ops,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use permlens_model::{GrantState, PermissionState};

    fn empty_siblings() -> BTreeMap<PermissionGroup, GroupSnapshot> {
        BTreeMap::new()
    }

    fn input<'a>(
        snapshot: &'a GroupSnapshot,
        request: ChangeRequest,
        supergroup: &'a BTreeMap<PermissionGroup, GroupSnapshot>,
    ) -> PlanInput<'a> {
        PlanInput {
            snapshot,
            request,
            source: Control::Allow,
            one_time: false,
            confirmed_already: false,
            supergroup,
            holds_device_profile_role: false,
            location_accuracy_active: false,
        }
    }

    #[test]
    fn test_plain_grant_applies_directly() {
        let snap = GroupSnapshot::new("com.example.cam", PermissionGroup::Camera, 0, 10001)
            .with_permission("camera.capture", PermissionState::denied());
        let siblings = empty_siblings();

        let outcome = plan(&input(&snap, ChangeRequest::GrantForeground, &siblings)).unwrap();
        match outcome {
            Outcome::Apply(plans) => {
                assert_eq!(plans.len(), 1);
                assert_eq!(
                    plans[0].ops,
                    vec![MutationOp::GrantForeground {
                        filter: None,
                        one_time: false,
                    }]
                );
            }
            other => panic!("expected Apply, got {:?}", other),
        }
    }

    #[test]
    fn test_revoke_of_default_grant_requires_confirmation() {
        let snap = GroupSnapshot::new("com.example.dialer", PermissionGroup::Microphone, 0, 10001)
            .with_foreground(GrantState::granted().with_granted_by_default(true))
            .with_permission("mic.record", PermissionState::granted());
        let siblings = empty_siblings();

        let outcome = plan(&input(&snap, ChangeRequest::RevokeForeground, &siblings)).unwrap();
        match outcome {
            Outcome::RequireConfirmation(request) => {
                assert_eq!(request.message, ConfirmMessage::GrantedByDefaultWarning);
            }
            other => panic!("expected confirmation, got {:?}", other),
        }
    }

    #[test]
    fn test_confirmed_session_skips_revoke_guard() {
        let snap = GroupSnapshot::new("com.example.dialer", PermissionGroup::Microphone, 0, 10001)
            .with_foreground(GrantState::granted().with_granted_by_default(true))
            .with_permission("mic.record", PermissionState::granted());
        let siblings = empty_siblings();

        let mut plan_input = input(&snap, ChangeRequest::RevokeForeground, &siblings);
        plan_input.confirmed_already = true;

        let outcome = plan(&plan_input).unwrap();
        assert!(matches!(outcome, Outcome::Apply(_)));
    }

    #[test]
    fn test_legacy_app_revoke_warns() {
        let snap = GroupSnapshot::new("com.example.old", PermissionGroup::Camera, 0, 10001)
            .with_supports_runtime_perms(false)
            .with_foreground(GrantState::granted())
            .with_permission("camera.capture", PermissionState::granted());
        let siblings = empty_siblings();

        let outcome = plan(&input(&snap, ChangeRequest::RevokeForeground, &siblings)).unwrap();
        match outcome {
            Outcome::RequireConfirmation(request) => {
                assert_eq!(request.message, ConfirmMessage::LegacySdkWarning);
            }
            other => panic!("expected confirmation, got {:?}", other),
        }
    }

    #[test]
    fn test_device_profile_guard_requires_role_holder() {
        let snap = GroupSnapshot::new("com.example.watch", PermissionGroup::Location, 0, 10001)
            .with_foreground(GrantState::granted().with_granted_by_role(true))
            .with_permission(perms::ACCESS_FINE_LOCATION, PermissionState::granted());
        let siblings = empty_siblings();

        // Role-granted but the app holds no device-profile role.
        let outcome = plan(&input(&snap, ChangeRequest::RevokeForeground, &siblings)).unwrap();
        assert!(matches!(outcome, Outcome::Apply(_)));

        let mut plan_input = input(&snap, ChangeRequest::RevokeForeground, &siblings);
        plan_input.holds_device_profile_role = true;
        let outcome = plan(&plan_input).unwrap();
        match outcome {
            Outcome::RequireConfirmation(request) => {
                assert_eq!(request.message, ConfirmMessage::DeviceProfileWarning);
            }
            other => panic!("expected confirmation, got {:?}", other),
        }
    }

    #[test]
    fn test_supergroup_grant_interposes_advanced_dialog() {
        let snap =
            GroupSnapshot::new("com.example.player", PermissionGroup::AuralMedia, 0, 10007)
                .with_target_sdk(sdk::S_V2)
                .with_permission("media.aural.audio", PermissionState::denied());
        let siblings = empty_siblings();

        let outcome = plan(&input(&snap, ChangeRequest::GrantForeground, &siblings)).unwrap();
        match outcome {
            Outcome::RequireAdvancedConfirmation(args) => {
                assert_eq!(args.request, ChangeRequest::GrantStorageSupergroupConfirmed);
            }
            other => panic!("expected advanced confirmation, got {:?}", other),
        }
    }

    #[test]
    fn test_confirmed_supergroup_grant_covers_all_siblings() {
        let snap =
            GroupSnapshot::new("com.example.player", PermissionGroup::AuralMedia, 0, 10007)
                .with_target_sdk(sdk::S_V2)
                .with_permission("media.aural.audio", PermissionState::denied());
        let sibling =
            GroupSnapshot::new("com.example.player", PermissionGroup::VisualMedia, 0, 10007)
                .with_target_sdk(sdk::S_V2)
                .with_permission("media.visual.images", PermissionState::denied());
        let mut siblings = BTreeMap::new();
        siblings.insert(PermissionGroup::VisualMedia, sibling);

        let outcome = plan(&input(
            &snap,
            ChangeRequest::GrantStorageSupergroupConfirmed,
            &siblings,
        ))
        .unwrap();
        match outcome {
            Outcome::Apply(plans) => {
                assert_eq!(plans.len(), permlens_model::SUPERGROUP_GROUPS.len());
                for group_plan in &plans {
                    assert!(group_plan.ops.iter().any(|op| matches!(
                        op,
                        MutationOp::GrantForeground { .. }
                    )));
                }
            }
            other => panic!("expected Apply, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_sibling_is_an_error() {
        let snap =
            GroupSnapshot::new("com.example.player", PermissionGroup::AuralMedia, 0, 10007)
                .with_target_sdk(sdk::S_V2)
                .with_permission("media.aural.audio", PermissionState::denied());
        let siblings = empty_siblings();

        let result = plan(&input(
            &snap,
            ChangeRequest::GrantStorageSupergroupConfirmed,
            &siblings,
        ));
        assert!(matches!(result, Err(PlanError::MissingSibling(_))));
    }

    #[test]
    fn test_accuracy_toggle_short_circuits() {
        let snap = GroupSnapshot::new("com.example.maps", PermissionGroup::Location, 0, 10042)
            .with_foreground(GrantState::granted())
            .with_permission(perms::ACCESS_FINE_LOCATION, PermissionState::denied())
            .with_permission(perms::ACCESS_COARSE_LOCATION, PermissionState::granted());
        let siblings = empty_siblings();

        let outcome = plan(&input(&snap, ChangeRequest::GrantFineLocation, &siblings)).unwrap();
        match outcome {
            Outcome::Apply(plans) => {
                assert_eq!(plans.len(), 1);
                assert_eq!(plans[0].ops[0], MutationOp::SelectAccuracy { fine: true });
                // The live grant follows the new accuracy.
                assert!(plans[0].ops.iter().any(|op| matches!(
                    op,
                    MutationOp::GrantForeground { filter: Some(f), .. }
                        if f == &vec![perms::ACCESS_FINE_LOCATION.to_string()]
                )));
            }
            other => panic!("expected Apply, got {:?}", other),
        }
    }

    #[test]
    fn test_coarse_filter_when_approximate_chosen() {
        let snap = GroupSnapshot::new("com.example.maps", PermissionGroup::Location, 0, 10042)
            .with_permission(perms::ACCESS_FINE_LOCATION, PermissionState::denied())
            .with_permission(
                perms::ACCESS_COARSE_LOCATION,
                PermissionState::denied()
                    .with_flags(permlens_model::snapshot::flags::SELECTED_LOCATION_ACCURACY),
            );
        let siblings = empty_siblings();

        let mut plan_input = input(&snap, ChangeRequest::GrantForeground, &siblings);
        plan_input.location_accuracy_active = true;

        let outcome = plan(&plan_input).unwrap();
        match outcome {
            Outcome::Apply(plans) => {
                assert_eq!(
                    plans[0].ops,
                    vec![MutationOp::GrantForeground {
                        filter: Some(vec![perms::ACCESS_COARSE_LOCATION.to_string()]),
                        one_time: false,
                    }]
                );
            }
            other => panic!("expected Apply, got {:?}", other),
        }
    }

    #[test]
    fn test_photos_selected_partitions_the_group() {
        let snap =
            GroupSnapshot::new("com.example.gallery", PermissionGroup::VisualMedia, 0, 10009)
                .with_target_sdk(sdk::T)
                .with_foreground(GrantState::granted())
                .with_permission("media.visual.images", PermissionState::granted())
                .with_permission(
                    perms::READ_MEDIA_VISUAL_USER_SELECTED,
                    PermissionState::denied(),
                );
        let siblings = empty_siblings();

        let outcome = plan(&input(&snap, ChangeRequest::PhotosSelected, &siblings)).unwrap();
        match outcome {
            Outcome::Apply(plans) => {
                assert_eq!(plans.len(), 1);
                assert_eq!(plans[0].ops.len(), 2);
                assert!(matches!(
                    &plans[0].ops[0],
                    MutationOp::RevokeForeground { filter: Some(f), .. }
                        if f.contains(&"media.visual.images".to_string())
                ));
                assert!(matches!(
                    &plans[0].ops[1],
                    MutationOp::GrantForeground { filter: Some(f), .. }
                        if f == &vec![perms::READ_MEDIA_VISUAL_USER_SELECTED.to_string()]
                ));
            }
            other => panic!("expected Apply, got {:?}", other),
        }
    }

    #[test]
    fn test_noop_revoke_produces_empty_ops() {
        let snap = GroupSnapshot::new("com.example.cam", PermissionGroup::Camera, 0, 10001)
            .with_permission("camera.capture", PermissionState::denied());
        let siblings = empty_siblings();

        let outcome = plan(&input(&snap, ChangeRequest::RevokeForeground, &siblings)).unwrap();
        match outcome {
            Outcome::Apply(plans) => assert!(plans[0].is_empty()),
            other => panic!("expected Apply, got {:?}", other),
        }
    }

    #[test]
    fn test_confirm_revoke_latches_for_default_grants() {
        let snap = GroupSnapshot::new("com.example.dialer", PermissionGroup::Microphone, 0, 10001)
            .with_foreground(GrantState::granted().with_granted_by_default(true))
            .with_permission("mic.record", PermissionState::granted());
        let siblings = empty_siblings();

        let (plans, latch) =
            confirm_revoke(&input(&snap, ChangeRequest::RevokeForeground, &siblings)).unwrap();
        assert!(latch);
        assert!(plans[0].ops.iter().any(|op| matches!(
            op,
            MutationOp::RevokeForeground { .. }
        )));

        // An ordinary user grant does not latch.
        let snap = GroupSnapshot::new("com.example.cam", PermissionGroup::Camera, 0, 10001)
            .with_foreground(GrantState::granted())
            .with_permission("camera.capture", PermissionState::granted());
        let (_, latch) =
            confirm_revoke(&input(&snap, ChangeRequest::RevokeForeground, &siblings)).unwrap();
        assert!(!latch);
    }

    #[test]
    fn test_grant_foreground_only_clears_all_files_on_legacy_storage() {
        let snap = GroupSnapshot::new("com.example.files", PermissionGroup::Storage, 0, 10020)
            .with_target_sdk(sdk::Q)
            .with_permission("storage.read", PermissionState::denied());
        let siblings = empty_siblings();

        let outcome =
            plan(&input(&snap, ChangeRequest::GrantForegroundOnly, &siblings)).unwrap();
        match outcome {
            Outcome::Apply(plans) => {
                assert!(plans[0]
                    .ops
                    .contains(&MutationOp::SetAllFilesAccess { enabled: false }));
            }
            other => panic!("expected Apply, got {:?}", other),
        }
    }
}
