//! Fix propagation: system and policy locks over the shaped control map.
//!
//! Two independent passes, system first, then policy. The first pass that
//! fires supplies the detail reason, so system locks always outrank policy
//! locks in the detail line.

use permlens_model::{
    AdminRef, Control, ControlMap, DetailReason, FixScope, FixSource, GroupSnapshot,
};

use super::active_deny;

/// Apply both fix passes; returns the detail reason of the first lock hit.
pub fn apply_fixes(
    snapshot: &GroupSnapshot,
    admin: Option<&AdminRef>,
    controls: &mut ControlMap,
) -> Option<DetailReason> {
    let mut detail: Option<DetailReason> = None;

    let fg = snapshot.foreground;
    let bg = snapshot.background_or_default();

    let passes = [
        (FixSource::System, fg.is_system_fixed, bg.is_system_fixed),
        (
            if admin.is_some() {
                FixSource::AdminPolicy
            } else {
                FixSource::Policy
            },
            fg.is_policy_fixed || snapshot.is_policy_fully_fixed,
            bg.is_policy_fixed || snapshot.is_policy_fully_fixed,
        ),
    ];

    for (source, fg_fixed, bg_fixed) in passes {
        if let Some(scope) = apply_pass(snapshot, fg_fixed, bg_fixed, controls) {
            if detail.is_none() {
                detail = Some(DetailReason { source, scope });
            }
        }
    }

    detail
}

/// One pass; returns the scope of the lock applied, if any.
fn apply_pass(
    snapshot: &GroupSnapshot,
    fg_fixed: bool,
    bg_fixed: bool,
    controls: &mut ControlMap,
) -> Option<FixScope> {
    let fg = snapshot.foreground;
    let bg = snapshot.background_or_default();
    let has_bg = snapshot.has_background_group();

    if fg_fixed && (!has_bg || bg_fixed) {
        controls.disable_all();
        coerce_ask_to_deny(controls);
        return Some(if has_bg {
            FixScope::Both
        } else {
            FixScope::Foreground
        });
    }

    if bg_fixed && has_bg {
        if bg.is_granted {
            // Foreground toggling stays open but background follows it.
            controls.get_mut(Control::AllowForeground).is_enabled = false;
        } else {
            controls.get_mut(Control::AllowAlways).is_enabled = false;
        }
        return Some(FixScope::Background);
    }

    if fg_fixed {
        if fg.is_granted {
            // Only foreground/background switching remains.
            for control in [
                Control::Deny,
                Control::DenyForeground,
                Control::Ask,
                Control::AskOnce,
            ] {
                controls.get_mut(control).is_enabled = false;
            }
        } else {
            controls.disable_all();
            coerce_ask_to_deny(controls);
        }
        return Some(FixScope::Foreground);
    }

    None
}

/// A fixed-denied group cannot stay in the ask state.
fn coerce_ask_to_deny(controls: &mut ControlMap) {
    if controls.get(Control::Ask).is_checked {
        controls.get_mut(Control::Ask).is_checked = false;
        let deny = active_deny(controls);
        controls.get_mut(deny).is_checked = true;
    }
}
