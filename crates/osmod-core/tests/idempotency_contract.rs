//! Contract Test: Idempotency
//!
//! Applying the same request twice, the second run observing the first
//! run's result, reports a change once and then nothing.
//!
//! If this test fails, modules are not safe to re-run.

mod common;

use common::*;
use osmod_core::ResourceKind;
use serde_json::json;

#[tokio::test]
async fn present_twice_changes_once() {
    let cloud = recording_cloud(0);
    let engine = engine(&cloud);
    let args = json!({"name": "foo", "description": "desc", "tier": "silver"});

    let first = engine.run("widget", &args).await;
    let second = engine.run("widget", &args).await;

    assert!(first.changed);
    assert!(!second.changed, "second run changed: {:?}", second);
    assert_eq!(cloud.mutation_count(), 1);
    assert_eq!(first.get("widget").unwrap()["id"], second.get("widget").unwrap()["id"]);
}

#[tokio::test]
async fn waited_present_twice_changes_once() {
    let cloud = recording_cloud(2);
    let engine = engine(&cloud);
    let args = json!({"name": "lb", "description": "desc"});

    assert!(engine.run("waited_widget", &args).await.changed);
    assert!(!engine.run("waited_widget", &args).await.changed);
    assert_eq!(cloud.mutation_count(), 1);
}

#[tokio::test]
async fn absent_twice_changes_once() {
    let cloud = recording_cloud(0);
    cloud
        .memory()
        .seed(ResourceKind::SecurityGroup, json!({"name": "foo"}))
        .await;
    let engine = engine(&cloud);
    let args = json!({"name": "foo", "state": "absent"});

    assert!(engine.run("widget", &args).await.changed);
    assert!(!engine.run("widget", &args).await.changed);
    assert_eq!(cloud.mutation_count(), 1);
}

#[tokio::test]
async fn update_then_rerun_is_stable() {
    let cloud = recording_cloud(0);
    cloud
        .memory()
        .seed(
            ResourceKind::SecurityGroup,
            json!({"name": "foo", "description": "old"}),
        )
        .await;
    let engine = engine(&cloud);
    let args = json!({"name": "foo", "description": "new"});

    assert!(engine.run("widget", &args).await.changed);
    assert!(!engine.run("widget", &args).await.changed);
    assert_eq!(cloud.mutation_count(), 1);
}
