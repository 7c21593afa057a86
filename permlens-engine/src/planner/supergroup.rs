//! Storage supergroup routing and the advanced confirmation table.
//!
//! On targets predating the media split the aural/visual media groups must
//! move together. A first-time grant or a full revoke interposes an
//! advanced dialog whose resources come from a fixed lookup keyed by
//! {SDK bracket, media kind, direction}; any other key is a hard error.

use permlens_model::{sdk, ChangeRequest, Control, GroupSnapshot, PermissionGroup, SdkBracket};

use super::PlanError;
use crate::dialog::AdvancedDialogArgs;

/// Whether the group participates in supergroup routing at all.
pub fn routes_through_supergroup(snapshot: &GroupSnapshot) -> bool {
    snapshot.group.is_supergroup_member() && snapshot.target_sdk <= sdk::S_V2
}

/// Whether this request must stop at the advanced dialog first.
///
/// Confirmed composites never re-confirm. A grant confirms only when the
/// group is not yet granted at all; a revoke confirms only when it would
/// take away a live grant.
pub fn needs_advanced_confirmation(snapshot: &GroupSnapshot, request: ChangeRequest) -> bool {
    if request.is_confirmed() || !routes_through_supergroup(snapshot) {
        return false;
    }
    if request.grants() {
        return !snapshot.is_any_permission_granted();
    }
    request.revokes() && snapshot.is_any_permission_granted()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MediaKind {
    Aural,
    Visual,
}

/// Build the dialog payload for a supergroup interposition.
pub fn advanced_dialog_args(
    snapshot: &GroupSnapshot,
    request: ChangeRequest,
    one_time: bool,
    source: Control,
) -> Result<AdvancedDialogArgs, PlanError> {
    let bracket = SdkBracket::for_target_sdk(snapshot.target_sdk).ok_or_else(|| {
        PlanError::UnsupportedCombination(format!(
            "target sdk {} is past the media split",
            snapshot.target_sdk
        ))
    })?;
    let kind = match snapshot.group {
        PermissionGroup::AuralMedia => MediaKind::Aural,
        PermissionGroup::VisualMedia => MediaKind::Visual,
        ref group => {
            return Err(PlanError::UnsupportedCombination(format!(
                "group {} is not a supergroup member",
                group
            )))
        }
    };
    let allow = request.grants();

    let (icon, title, message) = lookup(bracket, kind, allow);
    let confirmed = if allow {
        ChangeRequest::GrantStorageSupergroupConfirmed
    } else {
        ChangeRequest::RevokeStorageSupergroupConfirmed
    };

    Ok(AdvancedDialogArgs {
        icon,
        title,
        message,
        negative_button: "supergroup_dialog_cancel",
        positive_button: if allow {
            "supergroup_dialog_allow_all"
        } else {
            "supergroup_dialog_deny_all"
        },
        request: confirmed,
        one_time,
        source,
    })
}

/// The fixed 2x2x2 resource table.
fn lookup(
    bracket: SdkBracket,
    kind: MediaKind,
    allow: bool,
) -> (&'static str, &'static str, &'static str) {
    match (bracket, kind, allow) {
        (SdkBracket::PreQ, MediaKind::Aural, true) => (
            "ic_media_aural",
            "supergroup_title_aural_allow",
            "supergroup_message_pre_q_aural_allow",
        ),
        (SdkBracket::PreQ, MediaKind::Aural, false) => (
            "ic_media_aural",
            "supergroup_title_aural_deny",
            "supergroup_message_pre_q_aural_deny",
        ),
        (SdkBracket::PreQ, MediaKind::Visual, true) => (
            "ic_media_visual",
            "supergroup_title_visual_allow",
            "supergroup_message_pre_q_visual_allow",
        ),
        (SdkBracket::PreQ, MediaKind::Visual, false) => (
            "ic_media_visual",
            "supergroup_title_visual_deny",
            "supergroup_message_pre_q_visual_deny",
        ),
        (SdkBracket::QToS, MediaKind::Aural, true) => (
            "ic_media_aural",
            "supergroup_title_aural_allow",
            "supergroup_message_q_to_s_aural_allow",
        ),
        (SdkBracket::QToS, MediaKind::Aural, false) => (
            "ic_media_aural",
            "supergroup_title_aural_deny",
            "supergroup_message_q_to_s_aural_deny",
        ),
        (SdkBracket::QToS, MediaKind::Visual, true) => (
            "ic_media_visual",
            "supergroup_title_visual_allow",
            "supergroup_message_q_to_s_visual_allow",
        ),
        (SdkBracket::QToS, MediaKind::Visual, false) => (
            "ic_media_visual",
            "supergroup_title_visual_deny",
            "supergroup_message_q_to_s_visual_deny",
        ),
    }
}
