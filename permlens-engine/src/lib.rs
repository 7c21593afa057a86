//! permlens-engine: Policy engine for a mobile permission screen
//!
//! This crate computes the visible control state for one (app, permission
//! group, user) tuple, plans user-requested grant/revoke transitions, and
//! logs the resulting permission changes. The platform services it depends
//! on are trait seams in [`sources`], [`store`], [`telemetry`] and
//! [`dialog`], each shipping in-memory defaults so the whole engine runs
//! without a platform.

pub mod dialog;
pub mod logger;
pub mod planner;
pub mod projector;
pub mod session;
pub mod sources;
pub mod store;
pub mod telemetry;

pub use dialog::{AdvancedDialogArgs, ConfirmMessage, ConfirmationRequest, DialogPresenter};
pub use logger::{log_changes, ChangeRecord};
pub use planner::{plan, GroupPlan, MutationOp, Outcome, PlanError, PlanInput};
pub use projector::{project, AuxSignals};
pub use session::{AuxInput, ChangeResolution, Collaborators, ScreenSession, SessionError};
pub use permlens_model::{
    ChangeRequest, Control, ControlMap, ControlState, GroupSnapshot, PermissionGroup, Projection,
};
