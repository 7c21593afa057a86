//! Screen session: single logical owner of one permission screen.
//!
//! All projection and planning runs through this one object. External
//! sources push state in (`push_snapshot`, `push_sibling`,
//! `push_full_storage`, `resolve_safety_label`); every push re-runs the
//! full projection from the current cached values, level-triggered. The
//! projection is withheld while any required input is still missing or
//! flagged stale, and published to subscribers through a watch channel
//! once complete.

use permlens_model::{
    perms, sdk, ChangeRequest, Control, FullStorageState, GroupSnapshot, PermissionGroup,
    Projection,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{watch, RwLock};

use crate::dialog::{DialogPresenter, NullDialogPresenter, RecordingDialogPresenter};
use crate::logger::log_changes;
use crate::planner::{
    self, GroupPlan, MutationOp, Outcome, PlanError, PlanInput,
};
use crate::projector::{project, AuxSignals};
use crate::sources::{
    AdminSource, AppOpMode, AppOpsStore, FullStorageSource, MemoryAdminSource, MemoryAppOps,
    MemoryPermissionWorld, MemoryRoleSource, MemorySafetyLabelSource, PermissionMutator,
    RoleSource, SafetyLabelSource, SnapshotProvider, OP_MANAGE_ALL_FILES,
};
use crate::store::{
    ChangeMarkerStore, DecisionRecord, DecisionStore, MemoryChangeMarkerStore,
    MemoryDecisionStore, StoreError,
};
use crate::telemetry::{EventDetails, NullTelemetrySink, ScreenEvent, TelemetrySink};

static NEXT_SESSION_ID: AtomicI64 = AtomicI64::new(1);

/// Error type for session operations
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("change planning failed: {0}")]
    Plan(#[from] PlanError),

    #[error("persistence failed: {0}")]
    Store(#[from] StoreError),

    #[error("no snapshot available for group: {0}")]
    NoSnapshot(String),

    #[error("no confirmation is pending")]
    NoPendingConfirmation,
}

/// How a change request resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeResolution {
    /// The change was executed and the projection refreshed.
    Applied,
    /// A simple confirmation dialog was presented.
    AwaitingConfirmation,
    /// The storage supergroup dialog was presented.
    AwaitingAdvancedConfirmation,
}

/// The external services a session talks to.
pub struct Collaborators {
    pub mutator: Arc<dyn PermissionMutator>,
    pub snapshots: Arc<dyn SnapshotProvider>,
    pub full_storage: Arc<dyn FullStorageSource>,
    pub safety_labels: Arc<dyn SafetyLabelSource>,
    pub admins: Arc<dyn AdminSource>,
    pub roles: Arc<dyn RoleSource>,
    pub app_ops: Arc<dyn AppOpsStore>,
    pub telemetry: Arc<dyn TelemetrySink>,
    pub decisions: Arc<dyn DecisionStore>,
    pub markers: Arc<dyn ChangeMarkerStore>,
    pub dialogs: Arc<dyn DialogPresenter>,
}

impl Collaborators {
    pub fn builder() -> CollaboratorsBuilder {
        CollaboratorsBuilder::default()
    }
}

/// Builder with in-memory defaults for every collaborator.
pub struct CollaboratorsBuilder {
    mutator: Option<Arc<dyn PermissionMutator>>,
    snapshots: Option<Arc<dyn SnapshotProvider>>,
    full_storage: Option<Arc<dyn FullStorageSource>>,
    safety_labels: Option<Arc<dyn SafetyLabelSource>>,
    admins: Option<Arc<dyn AdminSource>>,
    roles: Option<Arc<dyn RoleSource>>,
    app_ops: Option<Arc<dyn AppOpsStore>>,
    telemetry: Option<Arc<dyn TelemetrySink>>,
    decisions: Option<Arc<dyn DecisionStore>>,
    markers: Option<Arc<dyn ChangeMarkerStore>>,
    dialogs: Option<Arc<dyn DialogPresenter>>,
}

impl Default for CollaboratorsBuilder {
    fn default() -> Self {
        Self {
            mutator: None,
            snapshots: None,
            full_storage: None,
            safety_labels: None,
            admins: None,
            roles: None,
            app_ops: None,
            telemetry: None,
            decisions: None,
            markers: None,
            dialogs: None,
        }
    }
}

impl CollaboratorsBuilder {
    /// Use one world double as mutator, snapshot provider and storage
    /// source at once.
    pub fn world(mut self, world: Arc<MemoryPermissionWorld>) -> Self {
        self.mutator = Some(world.clone());
        self.snapshots = Some(world.clone());
        self.full_storage = Some(world);
        self
    }

    pub fn mutator(mut self, mutator: Arc<dyn PermissionMutator>) -> Self {
        self.mutator = Some(mutator);
        self
    }

    pub fn snapshots(mut self, snapshots: Arc<dyn SnapshotProvider>) -> Self {
        self.snapshots = Some(snapshots);
        self
    }

    pub fn full_storage(mut self, source: Arc<dyn FullStorageSource>) -> Self {
        self.full_storage = Some(source);
        self
    }

    pub fn safety_labels(mut self, source: Arc<dyn SafetyLabelSource>) -> Self {
        self.safety_labels = Some(source);
        self
    }

    pub fn admins(mut self, source: Arc<dyn AdminSource>) -> Self {
        self.admins = Some(source);
        self
    }

    pub fn roles(mut self, source: Arc<dyn RoleSource>) -> Self {
        self.roles = Some(source);
        self
    }

    pub fn app_ops(mut self, store: Arc<dyn AppOpsStore>) -> Self {
        self.app_ops = Some(store);
        self
    }

    pub fn telemetry(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = Some(sink);
        self
    }

    pub fn decisions(mut self, store: Arc<dyn DecisionStore>) -> Self {
        self.decisions = Some(store);
        self
    }

    pub fn markers(mut self, store: Arc<dyn ChangeMarkerStore>) -> Self {
        self.markers = Some(store);
        self
    }

    pub fn dialogs(mut self, presenter: Arc<dyn DialogPresenter>) -> Self {
        self.dialogs = Some(presenter);
        self
    }

    /// Convenience for tests: record dialogs instead of dropping them.
    pub fn recording_dialogs(self) -> (Self, Arc<RecordingDialogPresenter>) {
        let presenter = Arc::new(RecordingDialogPresenter::new());
        (self.dialogs(presenter.clone()), presenter)
    }

    pub fn build(self) -> Collaborators {
        let default_world = Arc::new(MemoryPermissionWorld::new());
        Collaborators {
            mutator: self.mutator.unwrap_or_else(|| default_world.clone()),
            snapshots: self.snapshots.unwrap_or_else(|| default_world.clone()),
            full_storage: self.full_storage.unwrap_or_else(|| default_world.clone()),
            safety_labels: self
                .safety_labels
                .unwrap_or_else(|| Arc::new(MemorySafetyLabelSource::new(false))),
            admins: self
                .admins
                .unwrap_or_else(|| Arc::new(MemoryAdminSource::none())),
            roles: self
                .roles
                .unwrap_or_else(|| Arc::new(MemoryRoleSource::new())),
            app_ops: self
                .app_ops
                .unwrap_or_else(|| Arc::new(MemoryAppOps::new())),
            telemetry: self
                .telemetry
                .unwrap_or_else(|| Arc::new(NullTelemetrySink::new())),
            decisions: self
                .decisions
                .unwrap_or_else(|| Arc::new(MemoryDecisionStore::new())),
            markers: self
                .markers
                .unwrap_or_else(|| Arc::new(MemoryChangeMarkerStore::new())),
            dialogs: self
                .dialogs
                .unwrap_or_else(|| Arc::new(NullDialogPresenter::new())),
        }
    }
}

#[derive(Debug, Clone)]
struct PendingConfirmation {
    request: ChangeRequest,
    source: Control,
    one_time: bool,
}

/// Auxiliary inputs whose cached value can be flagged stale between pushes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuxInput {
    FullStorage,
    SafetyLabel,
}

/// Session-scoped mutable state, owned by the session alone.
struct Inner {
    snapshot: Option<GroupSnapshot>,
    snapshot_pushed: bool,
    siblings: BTreeMap<PermissionGroup, GroupSnapshot>,
    full_storage: Option<FullStorageState>,
    full_storage_stale: bool,
    safety_label: Option<bool>,
    safety_label_stale: bool,
    has_confirmed_revoke: bool,
    /// Cached accuracy eligibility, computed on the first snapshot.
    show_location_accuracy: Option<bool>,
    viewed_emitted: bool,
    pending: Option<PendingConfirmation>,
}

/// Owner of one permission screen for one (package, group, user).
pub struct ScreenSession {
    session_id: i64,
    package: String,
    group: PermissionGroup,
    user: u32,
    collab: Arc<Collaborators>,
    inner: RwLock<Inner>,
    projection_tx: watch::Sender<Option<Projection>>,
}

impl ScreenSession {
    pub fn new(
        package: impl Into<String>,
        group: PermissionGroup,
        user: u32,
        collab: Arc<Collaborators>,
    ) -> Self {
        let (projection_tx, _) = watch::channel(None);
        Self {
            session_id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            package: package.into(),
            group,
            user,
            collab,
            inner: RwLock::new(Inner {
                snapshot: None,
                snapshot_pushed: false,
                siblings: BTreeMap::new(),
                full_storage: None,
                full_storage_stale: false,
                safety_label: None,
                safety_label_stale: false,
                has_confirmed_revoke: false,
                show_location_accuracy: None,
                viewed_emitted: false,
                pending: None,
            }),
            projection_tx,
        }
    }

    pub fn session_id(&self) -> i64 {
        self.session_id
    }

    /// Subscribe to projection updates. `None` means no state yet, or the
    /// group no longer exists.
    pub fn subscribe(&self) -> watch::Receiver<Option<Projection>> {
        self.projection_tx.subscribe()
    }

    /// Latest published projection.
    pub fn current_projection(&self) -> Option<Projection> {
        self.projection_tx.borrow().clone()
    }

    /// Push a fresh primary snapshot; `None` means the group was removed.
    pub async fn push_snapshot(&self, snapshot: Option<GroupSnapshot>) {
        let mut inner = self.inner.write().await;
        if inner.show_location_accuracy.is_none() {
            if let Some(snap) = &snapshot {
                inner.show_location_accuracy = Some(accuracy_eligible(snap));
            }
        }
        inner.snapshot = snapshot;
        inner.snapshot_pushed = true;
        self.reproject(&mut inner);
    }

    /// Push a supergroup sibling snapshot.
    pub async fn push_sibling(&self, snapshot: GroupSnapshot) {
        let mut inner = self.inner.write().await;
        inner.siblings.insert(snapshot.group.clone(), snapshot);
        self.reproject(&mut inner);
    }

    /// Push the resolved legacy full-storage state.
    pub async fn push_full_storage(&self, state: FullStorageState) {
        let mut inner = self.inner.write().await;
        inner.full_storage = Some(state);
        inner.full_storage_stale = false;
        self.reproject(&mut inner);
    }

    /// Resolve the safety label through the label source.
    pub async fn resolve_safety_label(&self) {
        let rationale = self
            .collab
            .safety_labels
            .has_location_sharing_purpose(&self.package, self.user);
        let mut inner = self.inner.write().await;
        inner.safety_label = Some(rationale);
        inner.safety_label_stale = false;
        self.reproject(&mut inner);
    }

    /// Flag a cached auxiliary input as stale. The cached value is kept,
    /// but projection holds at the last published state until the source
    /// pushes a fresh value.
    pub async fn mark_stale(&self, input: AuxInput) {
        let mut inner = self.inner.write().await;
        match input {
            AuxInput::FullStorage => inner.full_storage_stale = true,
            AuxInput::SafetyLabel => inner.safety_label_stale = true,
        }
    }

    /// Request a change from a control selection.
    pub async fn request_change(
        &self,
        request: ChangeRequest,
        one_time: bool,
        source: Control,
    ) -> Result<ChangeResolution, SessionError> {
        let mut inner = self.inner.write().await;
        let snapshot = inner
            .snapshot
            .clone()
            .ok_or_else(|| SessionError::NoSnapshot(self.group.name().to_string()))?;

        let holds_role = self
            .collab
            .roles
            .holds_device_profile_role(&self.package, self.user);
        let outcome = planner::plan(&PlanInput {
            snapshot: &snapshot,
            request,
            source,
            one_time,
            confirmed_already: inner.has_confirmed_revoke,
            supergroup: &inner.siblings,
            holds_device_profile_role: holds_role,
            location_accuracy_active: inner.show_location_accuracy.unwrap_or(false),
        })?;

        match outcome {
            Outcome::Apply(plans) => {
                self.record_event(EventDetails::ControlSelected { control: source, request });
                self.execute_plans(&mut inner, plans, source).await?;
                Ok(ChangeResolution::Applied)
            }
            Outcome::RequireConfirmation(confirmation) => {
                inner.pending = Some(PendingConfirmation {
                    request: confirmation.request,
                    source,
                    one_time,
                });
                self.record_event(EventDetails::ConfirmationShown {
                    request: confirmation.request,
                });
                self.collab.dialogs.present_confirmation(confirmation);
                Ok(ChangeResolution::AwaitingConfirmation)
            }
            Outcome::RequireAdvancedConfirmation(args) => {
                inner.pending = Some(PendingConfirmation {
                    request: args.request,
                    source,
                    one_time,
                });
                self.record_event(EventDetails::ConfirmationShown { request: args.request });
                self.collab.dialogs.present_advanced(args);
                Ok(ChangeResolution::AwaitingAdvancedConfirmation)
            }
        }
    }

    /// The user accepted the advanced dialog; replay the confirmed request.
    pub async fn confirm_allow(&self) -> Result<ChangeResolution, SessionError> {
        let pending = {
            let mut inner = self.inner.write().await;
            inner.pending.take().ok_or(SessionError::NoPendingConfirmation)?
        };
        self.request_change(pending.request, pending.one_time, pending.source)
            .await
    }

    /// The user insisted on revoking through the warning dialog.
    pub async fn deny_anyway(&self) -> Result<(), SessionError> {
        let mut inner = self.inner.write().await;
        let pending = inner.pending.take().ok_or(SessionError::NoPendingConfirmation)?;
        let snapshot = inner
            .snapshot
            .clone()
            .ok_or_else(|| SessionError::NoSnapshot(self.group.name().to_string()))?;

        let holds_role = self
            .collab
            .roles
            .holds_device_profile_role(&self.package, self.user);
        let (plans, latch) = planner::confirm_revoke(&PlanInput {
            snapshot: &snapshot,
            request: pending.request,
            source: pending.source,
            one_time: pending.one_time,
            confirmed_already: true,
            supergroup: &inner.siblings,
            holds_device_profile_role: holds_role,
            location_accuracy_active: inner.show_location_accuracy.unwrap_or(false),
        })?;

        if latch {
            inner.has_confirmed_revoke = true;
        }
        self.execute_plans(&mut inner, plans, pending.source).await?;
        Ok(())
    }

    /// The user dismissed the pending dialog.
    pub async fn cancel_confirmation(&self) {
        let mut inner = self.inner.write().await;
        inner.pending = None;
    }

    // ========================================================================
    // Internals
    // ========================================================================

    async fn execute_plans(
        &self,
        inner: &mut Inner,
        plans: Vec<GroupPlan>,
        source: Control,
    ) -> Result<(), SessionError> {
        for plan in plans {
            if plan.is_empty() {
                continue;
            }
            let old = if plan.group == self.group {
                inner.snapshot.clone()
            } else {
                inner.siblings.get(&plan.group).cloned()
            };
            let Some(old) = old else {
                return Err(SessionError::NoSnapshot(plan.group.name().to_string()));
            };

            let mut current = old.clone();
            for op in &plan.ops {
                current = self.apply_op(&current, op);
            }

            let records = log_changes(&old, &current, source, self.session_id);
            if !records.is_empty() {
                self.collab.decisions.record(DecisionRecord::new(
                    &self.package,
                    plan.group.name(),
                    self.user,
                    current.is_any_permission_granted(),
                ))?;
                self.collab.markers.mark(&self.package, self.user)?;
                for record in records {
                    self.record_event(EventDetails::ChangeLogged { record });
                }
            }

            if plan.group == self.group {
                inner.snapshot = Some(current);
            } else {
                inner.siblings.insert(plan.group.clone(), current);
            }
        }

        // Siblings may have shifted under the platform's own bookkeeping.
        self.refresh_siblings(inner).await;

        if inner.full_storage.is_some() {
            if let Some(state) = self
                .collab
                .full_storage
                .full_storage_state(&self.package, self.user)
            {
                inner.full_storage = Some(state);
            }
        }

        self.reproject(inner);
        Ok(())
    }

    fn apply_op(&self, snapshot: &GroupSnapshot, op: &MutationOp) -> GroupSnapshot {
        if op.changes_granted_state(snapshot) {
            tracing::info!(
                group = %snapshot.group,
                package = %snapshot.package,
                op = ?op,
                "permission grant state changing"
            );
        }
        match op {
            MutationOp::RevokeBackground { one_time, user_fixed } => self
                .collab
                .mutator
                .revoke_background(snapshot, *one_time, *user_fixed),
            MutationOp::RevokeForeground {
                filter,
                one_time,
                user_fixed,
                force_compat_clear,
            } => self.collab.mutator.revoke_foreground(
                snapshot,
                filter.as_deref(),
                *one_time,
                *user_fixed,
                *force_compat_clear,
            ),
            MutationOp::GrantForeground { filter, one_time } => self
                .collab
                .mutator
                .grant_foreground(snapshot, filter.as_deref(), *one_time),
            MutationOp::GrantBackground => self.collab.mutator.grant_background(snapshot),
            MutationOp::SelectAccuracy { fine } => {
                self.collab.mutator.set_selected_accuracy(snapshot, *fine)
            }
            MutationOp::SetAllFilesAccess { enabled } => {
                let mode = if *enabled {
                    AppOpMode::Allowed
                } else {
                    AppOpMode::Denied
                };
                self.collab
                    .app_ops
                    .set_uid_mode(OP_MANAGE_ALL_FILES, snapshot.uid, mode);
                snapshot.clone()
            }
        }
    }

    async fn refresh_siblings(&self, inner: &mut Inner) {
        let groups: Vec<PermissionGroup> = inner.siblings.keys().cloned().collect();
        for group in groups {
            if let Some(snapshot) = self
                .collab
                .snapshots
                .snapshot(&self.package, &group, self.user)
                .await
            {
                inner.siblings.insert(group, snapshot);
            }
        }
    }

    /// Re-run the projection from current cached values; withheld while a
    /// required input is missing.
    fn reproject(&self, inner: &mut Inner) {
        if !inner.snapshot_pushed {
            tracing::debug!(group = %self.group, "projection withheld: no snapshot yet");
            return;
        }
        let Some(snapshot) = &inner.snapshot else {
            // Group removed; clear whatever was published.
            self.projection_tx.send_if_modified(|current| {
                if current.is_some() {
                    *current = None;
                    true
                } else {
                    false
                }
            });
            return;
        };

        if let Some(missing) = self.missing_input(inner, snapshot) {
            tracing::debug!(group = %self.group, missing, "projection withheld");
            return;
        }

        let aux = AuxSignals {
            full_storage: inner.full_storage,
            show_location_accuracy: inner.show_location_accuracy.unwrap_or(false),
            safety_label_rationale: inner.safety_label.unwrap_or(false),
            admin: self.collab.admins.enforcing_admin(self.user),
        };
        let projection = project(snapshot, &aux);

        let changed = self.projection_tx.send_if_modified(|current| {
            if current.as_ref() == Some(&projection) {
                false
            } else {
                *current = Some(projection.clone());
                true
            }
        });

        if changed && !inner.viewed_emitted {
            inner.viewed_emitted = true;
            self.record_event(EventDetails::Viewed { uid: snapshot.uid });
        }
    }

    /// Name the first unresolved required input, if any.
    fn missing_input(&self, inner: &Inner, snapshot: &GroupSnapshot) -> Option<&'static str> {
        if planner::routes_through_supergroup(snapshot) {
            for group in permlens_model::SUPERGROUP_GROUPS {
                if *group != self.group && !inner.siblings.contains_key(group) {
                    return Some("supergroup sibling");
                }
            }
        }
        if snapshot.group == PermissionGroup::Storage
            && snapshot.target_sdk < sdk::R
            && (inner.full_storage.is_none() || inner.full_storage_stale)
        {
            return Some("full storage state");
        }
        if snapshot.group == PermissionGroup::Location
            && (inner.safety_label.is_none() || inner.safety_label_stale)
        {
            return Some("safety label");
        }
        None
    }

    fn record_event(&self, details: EventDetails) {
        let event = ScreenEvent::new(
            self.session_id,
            self.package.clone(),
            self.group.name(),
            details,
        );
        if let Err(error) = self.collab.telemetry.record(event) {
            tracing::warn!(%error, "telemetry sink rejected event");
        }
    }
}

/// Accuracy switch eligibility, fixed for the session on first snapshot.
fn accuracy_eligible(snapshot: &GroupSnapshot) -> bool {
    snapshot.group == PermissionGroup::Location
        && snapshot.target_sdk >= sdk::S
        && snapshot.requests_permission(perms::ACCESS_FINE_LOCATION)
}
