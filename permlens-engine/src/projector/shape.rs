//! Shape selection: which control triple a group projects into.
//!
//! Exactly one branch fires per evaluation: background-capable groups get
//! the always/foreground/deny triple, photo-picker-eligible visual media
//! gets allow/select-photos/deny, everything else gets plain allow/deny
//! with camera and microphone rendered as foreground-only.

use permlens_model::{perms, ChangeRequest, Control, ControlMap, ControlState, GroupSnapshot};

/// Build the initial control map for the snapshot's shape.
pub fn select_shape(snapshot: &GroupSnapshot) -> ControlMap {
    let mut controls = ControlMap::new();

    if snapshot.has_perm_with_background_mode {
        background_shape(snapshot, &mut controls);
    } else if snapshot.group.is_photo_picker_eligible(snapshot.target_sdk) {
        photo_picker_shape(snapshot, &mut controls);
    } else {
        plain_shape(snapshot, &mut controls);
    }

    controls
}

fn background_shape(snapshot: &GroupSnapshot, controls: &mut ControlMap) {
    let fg = snapshot.foreground;
    let bg = snapshot.background_or_default();

    controls.set(
        Control::AllowAlways,
        ControlState::shown().checked(fg.is_granted && bg.is_granted && !fg.is_one_time),
    );
    controls.set(
        Control::AllowForeground,
        ControlState::shown().checked(fg.is_granted && !bg.is_granted && !fg.is_one_time),
    );
    apply_ask_states(snapshot, controls);
    controls.set(
        Control::Deny,
        ControlState::shown().checked(!fg.is_granted && !fg.is_one_time),
    );
}

fn photo_picker_shape(snapshot: &GroupSnapshot, controls: &mut ControlMap) {
    let fg = snapshot.foreground;
    let selected_only = selected_photos_only(snapshot);

    controls.set(
        Control::Allow,
        ControlState::shown().checked(fg.is_granted && !selected_only && !fg.is_one_time),
    );
    let mut select = ControlState::shown().checked(selected_only);
    select.custom_request = Some(ChangeRequest::PhotosSelected);
    controls.set(Control::SelectPhotos, select);
    apply_ask_states(snapshot, controls);
    controls.set(
        Control::Deny,
        ControlState::shown().checked(!fg.is_granted && !fg.is_one_time),
    );
}

fn plain_shape(snapshot: &GroupSnapshot, controls: &mut ControlMap) {
    let fg = snapshot.foreground;
    let foreground_only = snapshot.group.is_foreground_only_display();

    let allow = if foreground_only {
        Control::AllowForeground
    } else {
        Control::Allow
    };
    let deny = if foreground_only {
        Control::DenyForeground
    } else {
        Control::Deny
    };

    controls.set(
        allow,
        ControlState::shown().checked(fg.is_granted && !fg.is_one_time),
    );
    apply_ask_states(snapshot, controls);
    controls.set(
        deny,
        ControlState::shown().checked(!fg.is_granted && !fg.is_one_time),
    );
}

/// One-time states shared by all shapes: a live one-time grant shows the
/// checked ask-once control, otherwise the plain ask control is offered
/// wherever one-time grants are supported.
fn apply_ask_states(snapshot: &GroupSnapshot, controls: &mut ControlMap) {
    let fg = snapshot.foreground;
    let ask_once_active = fg.is_granted && fg.is_one_time;

    if ask_once_active {
        controls.set(Control::AskOnce, ControlState::shown().checked(true));
    } else if snapshot.supports_runtime_perms {
        controls.set(
            Control::Ask,
            ControlState::shown().checked(!fg.is_granted && fg.is_one_time),
        );
    }
}

/// Whether the grant is limited to the user-selected photo subset.
fn selected_photos_only(snapshot: &GroupSnapshot) -> bool {
    let selected_granted = snapshot
        .permission(perms::READ_MEDIA_VISUAL_USER_SELECTED)
        .map(|p| p.is_granted)
        .unwrap_or(false);
    selected_granted && !snapshot.is_fully_granted()
}
