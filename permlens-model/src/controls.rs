//! Per-control UI state projected for the permission screen.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::request::ChangeRequest;

/// The candidate controls of the permission screen.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Control {
    Allow,
    AllowAlways,
    AllowForeground,
    AskOnce,
    Ask,
    Deny,
    DenyForeground,
    LocationAccuracy,
    SelectPhotos,
}

impl Control {
    /// All nine controls, in display order.
    pub const ALL: [Control; 9] = [
        Control::Allow,
        Control::AllowAlways,
        Control::AllowForeground,
        Control::AskOnce,
        Control::Ask,
        Control::Deny,
        Control::DenyForeground,
        Control::LocationAccuracy,
        Control::SelectPhotos,
    ];
}

/// Visual state of one control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlState {
    pub is_checked: bool,
    pub is_enabled: bool,
    pub is_shown: bool,
    /// Request this control fires instead of its default action.
    pub custom_request: Option<ChangeRequest>,
}

impl Default for ControlState {
    fn default() -> Self {
        Self {
            is_checked: false,
            is_enabled: true,
            is_shown: false,
            custom_request: None,
        }
    }
}

impl ControlState {
    pub fn shown() -> Self {
        Self {
            is_shown: true,
            ..Self::default()
        }
    }

    pub fn checked(mut self, checked: bool) -> Self {
        self.is_checked = checked;
        self
    }
}

/// State of every candidate control; all nine keys are always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlMap {
    controls: BTreeMap<Control, ControlState>,
}

impl ControlMap {
    /// Create a map with every control in its default (hidden) state.
    pub fn new() -> Self {
        let controls = Control::ALL
            .iter()
            .map(|&control| (control, ControlState::default()))
            .collect();
        Self { controls }
    }

    pub fn get(&self, control: Control) -> &ControlState {
        // Every key is inserted at construction.
        &self.controls[&control]
    }

    pub fn get_mut(&mut self, control: Control) -> &mut ControlState {
        self.controls.entry(control).or_default()
    }

    pub fn set(&mut self, control: Control, state: ControlState) {
        self.controls.insert(control, state);
    }

    pub fn iter(&self) -> impl Iterator<Item = (Control, &ControlState)> {
        self.controls.iter().map(|(&control, state)| (control, state))
    }

    /// Disable every control.
    pub fn disable_all(&mut self) {
        for state in self.controls.values_mut() {
            state.is_enabled = false;
        }
    }
}

impl Default for ControlMap {
    fn default() -> Self {
        Self::new()
    }
}

/// What locked a control out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixSource {
    /// Locked by the OS itself.
    System,
    /// Locked by a device policy with a named enforcing admin.
    AdminPolicy,
    /// Locked by policy without a resolvable admin.
    Policy,
}

/// Which half of the group the fix covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixScope {
    Foreground,
    Background,
    Both,
}

/// Why a disabled control is disabled; surfaced as the detail line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailReason {
    pub source: FixSource,
    pub scope: FixScope,
}

/// Reference to the device admin enforcing a policy fix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminRef {
    /// Component name of the admin receiver.
    pub component: String,
    pub user: u32,
}

/// Complete output of one projection pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub controls: ControlMap,
    pub detail: Option<DetailReason>,
    pub admin: Option<AdminRef>,
    /// Show the data-sharing rationale footer (location only).
    pub show_rationale: bool,
}
