//! Integration tests for change logging and the session's persistence and
//! confirmation flows.

use std::sync::Arc;

use permlens_engine::logger::log_changes;
use permlens_engine::session::{ChangeResolution, Collaborators, ScreenSession};
use permlens_engine::sources::{MemoryPermissionWorld, MemoryRoleSource, SnapshotProvider};
use permlens_engine::store::{
    ChangeMarkerStore, DecisionStore, MemoryChangeMarkerStore, MemoryDecisionStore,
};
use permlens_engine::telemetry::{EventDetails, MemoryTelemetrySink};
use permlens_model::{
    sdk, snapshot::flags, ChangeRequest, Control, GrantState, GroupSnapshot, PermissionGroup,
    PermissionState,
};

#[test]
fn grant_flip_logs_one_record_with_new_state() {
    let old = GroupSnapshot::new("com.example.cam", PermissionGroup::Camera, 0, 10001)
        .with_permission("camera.capture", PermissionState::denied());
    let new = GroupSnapshot::new("com.example.cam", PermissionGroup::Camera, 0, 10001)
        .with_permission(
            "camera.capture",
            PermissionState::granted().with_flags(flags::USER_SET),
        );

    let records = log_changes(&old, &new, Control::Allow, 5);
    assert_eq!(records.len(), 1);
    assert!(records[0].is_granted);
    assert_eq!(records[0].flags, flags::USER_SET);

    // Identical snapshots log nothing.
    assert!(log_changes(&old, &old, Control::Allow, 5).is_empty());
}

fn camera_snapshot(granted: bool) -> GroupSnapshot {
    let (fg, perm) = if granted {
        (GrantState::granted(), PermissionState::granted())
    } else {
        (GrantState::denied(), PermissionState::denied())
    };
    GroupSnapshot::new("com.example.cam", PermissionGroup::Camera, 0, 10001)
        .with_foreground(fg)
        .with_permission("camera.capture", perm)
}

#[tokio::test]
async fn applied_change_reaches_both_persistence_stores_once() {
    let world = Arc::new(MemoryPermissionWorld::new());
    let decisions = Arc::new(MemoryDecisionStore::new());
    let markers = Arc::new(MemoryChangeMarkerStore::new());
    let sink = Arc::new(MemoryTelemetrySink::new());
    let collab = Arc::new(
        Collaborators::builder()
            .world(world.clone())
            .decisions(decisions.clone())
            .markers(markers.clone())
            .telemetry(sink.clone())
            .build(),
    );
    let session = ScreenSession::new("com.example.cam", PermissionGroup::Camera, 0, collab);

    world.insert_snapshot(camera_snapshot(false));
    session.push_snapshot(Some(camera_snapshot(false))).await;

    session
        .request_change(ChangeRequest::GrantForeground, false, Control::AllowForeground)
        .await
        .unwrap();

    assert_eq!(decisions.len(), 1);
    let decision = decisions
        .get("com.example.cam", "camera", 0)
        .unwrap()
        .unwrap();
    assert_eq!(decision.user, 0);
    assert!(decision.is_granted);
    assert!(markers.is_marked("com.example.cam", 0).unwrap());
    assert_eq!(
        sink.count_matching(|d| matches!(d, EventDetails::ChangeLogged { .. })),
        1
    );
}

#[tokio::test]
async fn decision_history_tracks_the_grant_direction() {
    let world = Arc::new(MemoryPermissionWorld::new());
    let decisions = Arc::new(MemoryDecisionStore::new());
    let collab = Arc::new(
        Collaborators::builder()
            .world(world.clone())
            .decisions(decisions.clone())
            .build(),
    );
    let session = ScreenSession::new("com.example.cam", PermissionGroup::Camera, 0, collab);

    world.insert_snapshot(camera_snapshot(false));
    session.push_snapshot(Some(camera_snapshot(false))).await;

    session
        .request_change(ChangeRequest::GrantForeground, false, Control::AllowForeground)
        .await
        .unwrap();
    let decision = decisions
        .get("com.example.cam", "camera", 0)
        .unwrap()
        .unwrap();
    assert!(decision.is_granted);

    // A revoke must be distinguishable from the grant in the history.
    session
        .request_change(ChangeRequest::RevokeForeground, false, Control::DenyForeground)
        .await
        .unwrap();
    let decision = decisions
        .get("com.example.cam", "camera", 0)
        .unwrap()
        .unwrap();
    assert!(!decision.is_granted);
}

#[tokio::test]
async fn noop_change_logs_and_persists_nothing() {
    let world = Arc::new(MemoryPermissionWorld::new());
    let decisions = Arc::new(MemoryDecisionStore::new());
    let markers = Arc::new(MemoryChangeMarkerStore::new());
    let collab = Arc::new(
        Collaborators::builder()
            .world(world.clone())
            .decisions(decisions.clone())
            .markers(markers.clone())
            .build(),
    );
    let session = ScreenSession::new("com.example.cam", PermissionGroup::Camera, 0, collab);

    world.insert_snapshot(camera_snapshot(false));
    session.push_snapshot(Some(camera_snapshot(false))).await;

    // Revoking an already-denied group plans no ops.
    session
        .request_change(ChangeRequest::RevokeForeground, false, Control::DenyForeground)
        .await
        .unwrap();

    assert!(decisions.is_empty());
    assert!(!markers.is_marked("com.example.cam", 0).unwrap());
}

fn media_snapshot(group: PermissionGroup, permission: &str) -> GroupSnapshot {
    GroupSnapshot::new("com.example.player", group, 0, 10007)
        .with_target_sdk(sdk::S_V2)
        .with_permission(permission, PermissionState::denied())
}

#[tokio::test]
async fn supergroup_confirm_flow_grants_every_sibling() {
    let world = Arc::new(MemoryPermissionWorld::new());
    let (builder, dialogs) = Collaborators::builder().world(world.clone()).recording_dialogs();
    let collab = Arc::new(builder.build());
    let session = ScreenSession::new(
        "com.example.player",
        PermissionGroup::AuralMedia,
        0,
        collab,
    );

    let aural = media_snapshot(PermissionGroup::AuralMedia, "media.aural.audio");
    let visual = media_snapshot(PermissionGroup::VisualMedia, "media.visual.images");
    world.insert_snapshot(aural.clone());
    world.insert_snapshot(visual.clone());
    session.push_snapshot(Some(aural)).await;
    session.push_sibling(visual).await;

    let resolution = session
        .request_change(ChangeRequest::GrantForeground, false, Control::Allow)
        .await
        .unwrap();
    assert_eq!(resolution, ChangeResolution::AwaitingAdvancedConfirmation);
    assert_eq!(dialogs.advanced().len(), 1);

    let resolution = session.confirm_allow().await.unwrap();
    assert_eq!(resolution, ChangeResolution::Applied);

    // Both underlying groups flipped, not just the originating one.
    for (group, perm) in [
        (PermissionGroup::AuralMedia, "media.aural.audio"),
        (PermissionGroup::VisualMedia, "media.visual.images"),
    ] {
        let snap = world
            .snapshot("com.example.player", &group, 0)
            .await
            .unwrap();
        assert!(
            snap.permission(perm).unwrap().is_granted,
            "group {} not granted",
            group
        );
    }
}

#[tokio::test]
async fn deny_anyway_latches_and_suppresses_later_confirmations() {
    let world = Arc::new(MemoryPermissionWorld::new());
    let (builder, dialogs) = Collaborators::builder().world(world.clone()).recording_dialogs();
    let collab = Arc::new(builder.build());
    let session =
        ScreenSession::new("com.example.dialer", PermissionGroup::Microphone, 0, collab);

    let snap = GroupSnapshot::new("com.example.dialer", PermissionGroup::Microphone, 0, 10003)
        .with_foreground(GrantState::granted().with_granted_by_default(true))
        .with_permission("mic.record", PermissionState::granted());
    world.insert_snapshot(snap.clone());
    session.push_snapshot(Some(snap)).await;

    let resolution = session
        .request_change(ChangeRequest::RevokeForeground, false, Control::DenyForeground)
        .await
        .unwrap();
    assert_eq!(resolution, ChangeResolution::AwaitingConfirmation);
    assert_eq!(dialogs.confirmations().len(), 1);

    session.deny_anyway().await.unwrap();
    let snap = world
        .snapshot("com.example.dialer", &PermissionGroup::Microphone, 0)
        .await
        .unwrap();
    assert!(!snap.permission("mic.record").unwrap().is_granted);

    // Re-grant, then revoke again: the session stays confirmed and no
    // second dialog appears.
    session
        .request_change(ChangeRequest::GrantForeground, false, Control::AllowForeground)
        .await
        .unwrap();
    let resolution = session
        .request_change(ChangeRequest::RevokeForeground, false, Control::DenyForeground)
        .await
        .unwrap();
    assert_eq!(resolution, ChangeResolution::Applied);
    assert_eq!(dialogs.confirmations().len(), 1);
}

#[tokio::test]
async fn role_holder_revoke_warns_with_device_profile_message() {
    let world = Arc::new(MemoryPermissionWorld::new());
    let roles = Arc::new(MemoryRoleSource::new().with_holder("com.example.watch"));
    let (builder, dialogs) = Collaborators::builder()
        .world(world.clone())
        .recording_dialogs();
    let collab = Arc::new(builder.roles(roles).build());
    let session =
        ScreenSession::new("com.example.watch", PermissionGroup::Location, 0, collab);

    let snap = GroupSnapshot::new("com.example.watch", PermissionGroup::Location, 0, 10004)
        .with_foreground(GrantState::granted().with_granted_by_role(true))
        .with_permission("location.fine", PermissionState::granted());
    world.insert_snapshot(snap.clone());
    session.push_snapshot(Some(snap)).await;
    session.resolve_safety_label().await;

    let resolution = session
        .request_change(ChangeRequest::RevokeForeground, false, Control::Deny)
        .await
        .unwrap();
    assert_eq!(resolution, ChangeResolution::AwaitingConfirmation);
    assert_eq!(
        dialogs.confirmations()[0].message,
        permlens_engine::dialog::ConfirmMessage::DeviceProfileWarning
    );
}
