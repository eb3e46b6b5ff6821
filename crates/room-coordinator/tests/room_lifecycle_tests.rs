//! Room lifecycle integration tests: creation on first join, removal on
//! last leave, idempotent leaves, and concurrent joins.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod support;

use parley_test_utils::StoreRecord;
use room_coordinator::errors::CoordinatorError;
use std::collections::HashSet;
use std::time::Duration;
use support::TestHarness;

#[tokio::test]
async fn first_join_creates_the_room() {
    let harness = TestHarness::spawn();
    let client = harness.connect();

    let (result, room) = harness
        .join(client.connection_id, "standup", "alice", "Alice")
        .await
        .unwrap();

    assert!(result.is_new_room);
    assert!(result.members.is_empty());
    assert_eq!(room.members().await.len(), 1);

    let status = harness.coordinator.status().await.unwrap();
    assert_eq!(status.room_count, 1);
}

#[tokio::test]
async fn duplicate_join_by_same_handle_is_rejected() {
    let harness = TestHarness::spawn();
    let client = harness.connect();

    harness
        .join(client.connection_id, "standup", "alice", "Alice")
        .await
        .unwrap();
    let second = harness
        .join(client.connection_id, "standup", "alice", "Alice")
        .await;

    assert!(matches!(second, Err(CoordinatorError::AlreadyMember(_))));
}

#[tokio::test]
async fn join_while_in_another_room_is_rejected() {
    let harness = TestHarness::spawn();
    let client = harness.connect();

    harness
        .join(client.connection_id, "standup", "alice", "Alice")
        .await
        .unwrap();
    let elsewhere = harness
        .join(client.connection_id, "retro", "alice", "Alice")
        .await;

    assert!(matches!(elsewhere, Err(CoordinatorError::AlreadyMember(_))));
    // The rejected join must not have created the other room.
    assert!(harness
        .coordinator
        .room(common::types::RoomId::from("retro"))
        .await
        .is_none());
}

#[tokio::test]
async fn double_leave_is_idempotent() {
    let harness = TestHarness::spawn();
    let alice = harness.connect();
    let bob = harness.connect();

    let (_r, room) = harness
        .join(alice.connection_id, "standup", "alice", "Alice")
        .await
        .unwrap();
    harness
        .join(bob.connection_id, "standup", "bob", "Bob")
        .await
        .unwrap();

    assert_eq!(harness.leave(bob.connection_id, &room).await, 1);
    // Second leave: room take already spent, observable state unchanged.
    assert_eq!(harness.leave(bob.connection_id, &room).await, 1);
    assert_eq!(room.members().await.len(), 1);
}

#[tokio::test]
async fn last_leave_removes_room_and_recreation_is_fresh() {
    let harness = TestHarness::spawn();
    let alice = harness.connect();

    let (_r, room) = harness
        .join(alice.connection_id, "standup", "alice", "Alice")
        .await
        .unwrap();
    room.chat(alice.connection_id, "lost to history".to_string())
        .await;

    assert_eq!(harness.leave(alice.connection_id, &room).await, 0);
    harness.wait_room_gone("standup").await;

    // A reachable room always has >= 1 member; the recreated room has no
    // memory of prior history.
    let bob = harness.connect();
    let (result, room) = harness
        .join(bob.connection_id, "standup", "bob", "Bob")
        .await
        .unwrap();
    assert!(result.is_new_room);
    assert_eq!(result.replayed, 0);
    assert_eq!(room.members().await.len(), 1);
}

#[tokio::test]
async fn concurrent_joins_yield_distinct_members_in_arrival_order() {
    const N: usize = 16;
    let harness = TestHarness::spawn();

    let mut clients = Vec::new();
    for _ in 0..N {
        clients.push(harness.connect());
    }

    let mut tasks = Vec::new();
    for (i, client) in clients.iter().enumerate() {
        let harness = harness.clone();
        let connection_id = client.connection_id;
        tasks.push(tokio::spawn(async move {
            harness
                .join(
                    connection_id,
                    "busy-room",
                    &format!("user-{i}"),
                    &format!("User {i}"),
                )
                .await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let (_r, room) = {
        let late = harness.connect();
        harness
            .join(late.connection_id, "busy-room", "late", "Late")
            .await
            .unwrap()
    };

    let members = room.members().await;
    assert_eq!(members.len(), N + 1);

    let distinct: HashSet<_> = members.iter().map(|m| m.connection_id).collect();
    assert_eq!(distinct.len(), N + 1, "every member handle is distinct");

    // Arrival order: the late joiner is last.
    assert_eq!(
        members.last().map(|m| m.participant_id.as_str()),
        Some("late")
    );
}

#[tokio::test]
async fn participation_records_bracket_the_session() {
    let harness = TestHarness::spawn();
    let alice = harness.connect();

    let (_r, room) = harness
        .join(alice.connection_id, "standup", "alice", "Alice")
        .await
        .unwrap();
    harness.leave(alice.connection_id, &room).await;

    // join record + leave record + room-closed record
    assert!(
        harness
            .store
            .wait_for_attempts(3, Duration::from_secs(1))
            .await
    );

    let records = harness.store.records();
    let joins = records
        .iter()
        .filter(|r| matches!(r, StoreRecord::Participation { left_at: None, .. }))
        .count();
    let leaves = records
        .iter()
        .filter(|r| matches!(r, StoreRecord::Participation { left_at: Some(_), .. }))
        .count();
    let closures = records
        .iter()
        .filter(|r| matches!(r, StoreRecord::RoomClosed { .. }))
        .count();
    assert_eq!((joins, leaves, closures), (1, 1, 1));
}

#[tokio::test]
async fn draining_coordinator_rejects_new_rooms() {
    let harness = TestHarness::spawn();
    harness.coordinator.shutdown().await.unwrap();

    let client = harness.connect();
    let result = harness
        .join(client.connection_id, "too-late", "alice", "Alice")
        .await;

    assert!(matches!(
        result,
        Err(CoordinatorError::Draining) | Err(CoordinatorError::Internal(_))
    ));
}
