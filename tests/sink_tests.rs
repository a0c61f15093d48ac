// Copyright (c) 2025 - Cowboy AI, Inc.
//! Plan hand-off tests
//!
//! The file sink is exercised end to end. NATS delivery needs a running
//! server and is covered by the ignored test at the bottom.
//!
//! Run the NATS test with: NATS_URL=localhost:4222 cargo test --test sink_tests -- --ignored

mod fixtures;

use fixtures::*;
use pretty_assertions::assert_eq;
use std::path::PathBuf;

use cim_network_topology::{generate_update, FileSink, NatsConfig, NatsPlanSink, PlanSink, TopologyConfig};

fn scratch_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("topology-sink-{}-{}", std::process::id(), name))
}

#[test]
fn test_file_sink_writes_canonical_json() {
    let plan = plan_for(base_config());
    let path = scratch_path("plan.json");
    let sink = FileSink::new(&path);

    tokio_test::block_on(sink.publish(&plan, None)).unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    assert_eq!(written, format!("{}\n", plan.to_canonical_json().unwrap()));

    let value: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(value["plan_id"], plan.plan_id.to_string());
    assert_eq!(value["project"], "shop");

    std::fs::remove_file(&path).ok();
}

#[test]
fn test_file_sink_is_byte_stable() {
    let first_path = scratch_path("first.json");
    let second_path = scratch_path("second.json");

    tokio_test::block_on(async {
        FileSink::new(&first_path).publish(&plan_for(base_config()), None).await.unwrap();
        FileSink::new(&second_path).publish(&plan_for(base_config()), None).await.unwrap();
    });

    assert_eq!(
        std::fs::read(&first_path).unwrap(),
        std::fs::read(&second_path).unwrap()
    );

    std::fs::remove_file(&first_path).ok();
    std::fs::remove_file(&second_path).ok();
}

#[test]
fn test_file_sink_writes_destructive_warnings() {
    let previous = validated(base_config());
    let next = validated(TopologyConfig {
        zone_count: 3,
        ..base_config()
    });
    let update = generate_update(&previous, &next, true).unwrap();

    let path = scratch_path("update.json");
    tokio_test::block_on(FileSink::new(&path).publish(&update.plan, Some(&update.assessment))).unwrap();

    let warnings_path = path.with_extension("warnings.json");
    let warnings: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&warnings_path).unwrap()).unwrap();
    assert_eq!(warnings[0]["parameter"], "zone_count");
    assert_eq!(warnings[0]["replaced"].as_array().map(Vec::len), Some(3));

    std::fs::remove_file(&path).ok();
    std::fs::remove_file(&warnings_path).ok();
}

#[tokio::test]
#[ignore] // Requires NATS server
async fn test_nats_sink_publishes_envelope() {
    use futures::StreamExt;

    let url = std::env::var("NATS_URL").unwrap_or_else(|_| "localhost:4222".to_string());
    let client = async_nats::connect(&url).await.expect("Failed to connect to NATS");
    let mut subscriber = client
        .subscribe(cim_network_topology::subjects::subjects::plan_generated())
        .await
        .unwrap();

    let plan = plan_for(base_config());
    let sink = NatsPlanSink::connect(NatsConfig::with_url(url)).await.unwrap();
    sink.publish(&plan, None).await.unwrap();

    let message = tokio::time::timeout(std::time::Duration::from_secs(5), subscriber.next())
        .await
        .expect("timed out waiting for plan")
        .expect("subscription closed");
    let envelope: serde_json::Value = serde_json::from_slice(&message.payload).unwrap();
    assert_eq!(envelope["plan_id"], plan.plan_id.to_string());
    assert_eq!(envelope["environment"], "dev");

    let headers = message.headers.expect("plan message carries headers");
    assert_eq!(
        headers.get("Plan-Id").map(|v| v.as_str().to_string()),
        Some(plan.plan_id.to_string())
    );
}
