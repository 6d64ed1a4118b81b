//! Contract Test: Reconciliation Decisions
//!
//! Verifies the four-way decision of the reconciler and the shape of the
//! update payload.
//!
//! Constraints verified:
//! - present + missing -> exactly one create, changed
//! - present + matching -> no mutation, unchanged
//! - present + differing -> one update carrying exactly the differing fields
//! - absent + missing -> no mutation, unchanged
//! - absent + existing -> exactly one delete, changed, no resource body
//! - immutable changes and ambiguous lookups fail before any mutation

mod common;

use common::*;
use osmod_core::ResourceKind;
use serde_json::json;

#[tokio::test]
async fn present_and_missing_creates() {
    let cloud = recording_cloud(0);
    let engine = engine(&cloud);

    let result = engine
        .run("widget", &json!({"name": "foo", "description": "first"}))
        .await;

    assert!(result.changed, "unexpected result: {:?}", result);
    assert!(!result.failed);
    assert_eq!(result.get("widget").unwrap()["description"], json!("first"));

    let mutations = cloud.mutations();
    assert_eq!(mutations.len(), 1);
    match &mutations[0] {
        Call::Create { kind, body } => {
            assert_eq!(*kind, ResourceKind::SecurityGroup);
            // Defaults apply on creation
            assert_eq!(body["tier"], json!("gold"));
        }
        other => panic!("expected a create, got {:?}", other),
    }
}

#[tokio::test]
async fn present_and_matching_is_noop() {
    let cloud = recording_cloud(0);
    cloud
        .memory()
        .seed(
            ResourceKind::SecurityGroup,
            json!({"name": "foo", "description": "same", "tier": "silver"}),
        )
        .await;
    let engine = engine(&cloud);

    // `tier` is not supplied, so its default does not count as a difference
    let result = engine
        .run("widget", &json!({"name": "foo", "description": "same"}))
        .await;

    assert!(!result.changed);
    assert!(!result.failed);
    assert_eq!(result.get("widget").unwrap()["tier"], json!("silver"));
    assert_eq!(cloud.mutation_count(), 0);
}

#[tokio::test]
async fn differing_field_updates_with_minimal_payload() {
    let cloud = recording_cloud(0);
    let id = cloud
        .memory()
        .seed(
            ResourceKind::SecurityGroup,
            json!({"name": "foo", "description": "old", "tier": "gold"}),
        )
        .await;
    let engine = engine(&cloud);

    let result = engine
        .run(
            "widget",
            &json!({"name": "foo", "description": "updated", "tier": "gold"}),
        )
        .await;

    assert!(result.changed);
    assert_eq!(result.get("widget").unwrap()["description"], json!("updated"));
    assert_eq!(
        cloud.mutations(),
        vec![Call::Update {
            kind: ResourceKind::SecurityGroup,
            id,
            patch: json!({"description": "updated"}).as_object().cloned().unwrap(),
        }]
    );
}

#[tokio::test]
async fn absent_and_missing_is_noop() {
    let cloud = recording_cloud(0);
    let engine = engine(&cloud);

    let result = engine
        .run("widget", &json!({"name": "foo", "state": "absent"}))
        .await;

    assert!(!result.changed);
    assert!(!result.failed);
    assert_eq!(cloud.mutation_count(), 0);
}

#[tokio::test]
async fn absent_and_existing_deletes_once() {
    let cloud = recording_cloud(0);
    let id = cloud
        .memory()
        .seed(ResourceKind::SecurityGroup, json!({"name": "foo"}))
        .await;
    let engine = engine(&cloud);

    let result = engine
        .run("widget", &json!({"name": "foo", "state": "absent"}))
        .await;

    assert!(result.changed);
    assert!(result.get("widget").is_none(), "delete returns no resource body");
    assert_eq!(
        cloud.mutations(),
        vec![Call::Delete {
            kind: ResourceKind::SecurityGroup,
            id
        }]
    );
}

#[tokio::test]
async fn immutable_change_fails_without_mutation() {
    let cloud = recording_cloud(0);
    cloud
        .memory()
        .seed(
            ResourceKind::SecurityGroup,
            json!({"name": "foo", "description": "old", "tier": "gold"}),
        )
        .await;
    let engine = engine(&cloud);

    let result = engine
        .run(
            "widget",
            &json!({"name": "foo", "description": "new", "tier": "silver"}),
        )
        .await;

    assert!(result.failed);
    assert_eq!(
        result.msg.as_deref(),
        Some("cannot update immutable security_group attributes: tier")
    );
    assert_eq!(cloud.mutation_count(), 0, "nothing may be applied partially");
}

#[tokio::test]
async fn ambiguous_lookup_fails_without_mutation() {
    let cloud = recording_cloud(0);
    for _ in 0..2 {
        cloud
            .memory()
            .seed(ResourceKind::SecurityGroup, json!({"name": "foo"}))
            .await;
    }
    let engine = engine(&cloud);

    let result = engine
        .run("widget", &json!({"name": "foo", "state": "absent"}))
        .await;

    assert!(result.failed);
    assert!(result.msg.unwrap().contains("2 found"));
    assert_eq!(cloud.mutation_count(), 0);
}

#[tokio::test]
async fn lookup_by_id_is_accepted() {
    let cloud = recording_cloud(0);
    let id = cloud
        .memory()
        .seed(
            ResourceKind::SecurityGroup,
            json!({"name": "foo", "description": "x"}),
        )
        .await;
    let engine = engine(&cloud);

    let result = engine
        .run("widget", &json!({"name": id, "description": "x"}))
        .await;

    assert!(!result.changed);
    assert_eq!(result.get("widget").unwrap()["name"], json!("foo"));
}
