//! End-to-end fetch cycles over the file-backed collaborators and a mocked
//! pricing host

use optimize_lib::pricing::{HttpPricingProvider, PricingProviderConfig};
use optimize_lib::sources::{
    ConfigStore, FileTelemetrySource, JsonCollectionStore, ACCOUNTS_FILE, SAMPLES_DIR,
    SNAPSHOT_COLLECTION,
};
use optimize_lib::{
    Classification, Collaborators, Config, ConfigUpdate, CycleOutcome, GroupBy,
    OptimizationController, Trigger,
};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const PRICING_PATH: &str = "/pricing/1.0/ec2/region/us-east-1/ondemand/linux/index.json";

fn pricing_body() -> String {
    let item = |instance_type: &str, price: &str, vcpu: &str, memory: &str| {
        json!({
            "price": {"USD": price},
            "attributes": {
                "aws:ec2:instanceType": instance_type,
                "aws:ec2:vcpu": vcpu,
                "aws:ec2:memory": memory,
                "aws:region": "us-east-1"
            }
        })
    };

    json!({
        "prices": [
            item("m5.large", "0.096", "2", "8 GiB"),
            item("m5.xlarge", "0.192", "4", "16 GiB"),
            item("m5.2xlarge", "0.384", "8", "32 GiB"),
        ]
    })
    .to_string()
}

fn write_json(path: &Path, value: serde_json::Value) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, serde_json::to_vec_pretty(&value).unwrap()).unwrap();
}

fn seed_telemetry(root: &Path) {
    write_json(
        &root.join(ACCOUNTS_FILE),
        json!([
            {"id": 1, "name": "production"},
            {"id": 2, "name": "staging"}
        ]),
    );

    write_json(
        &root.join(SAMPLES_DIR).join("1.json"),
        json!({
            "system_samples": [
                {"instance_id": "i-busy", "instance_type": "m5.2xlarge", "region": "us-east-1",
                 "cpu_percent": 85.0, "memory_percent": 70.0},
                {"instance_id": "i-oversized", "instance_type": "m5.2xlarge", "region": "us-east-1",
                 "cpu_percent": 20.0, "memory_percent": 30.0}
            ],
            "network_samples": [
                {"instance_id": "i-oversized", "receive_bytes_per_second": 5000.0,
                 "transmit_bytes_per_second": 2000.0}
            ]
        }),
    );

    write_json(
        &root.join(SAMPLES_DIR).join("2.json"),
        json!({
            "system_samples": [
                {"instance_id": "i-idle", "instance_type": "m5.xlarge", "region": "us-east-1",
                 "cpu_percent": 1.0, "memory_percent": 2.0}
            ]
        }),
    );
}

async fn controller(
    data_dir: &TempDir,
    pricing_url: &str,
) -> (Arc<OptimizationController>, Arc<JsonCollectionStore>) {
    let store = Arc::new(JsonCollectionStore::new(data_dir.path().join("store")));
    let telemetry = Arc::new(FileTelemetrySource::new(data_dir.path().join("telemetry")));
    let pricing = Arc::new(
        HttpPricingProvider::new(PricingProviderConfig {
            base_url: pricing_url.to_string(),
            relay_url: None,
            timeout: Duration::from_secs(5),
        })
        .unwrap(),
    );

    let controller = OptimizationController::new(Collaborators {
        config_store: store.clone(),
        accounts: telemetry.clone(),
        telemetry,
        pricing,
        snapshots: store.clone(),
    });
    controller.init_config().await;

    (Arc::new(controller), store)
}

#[tokio::test]
async fn test_cycle_over_files_and_http_pricing() {
    let data_dir = TempDir::new().unwrap();
    seed_telemetry(&data_dir.path().join("telemetry"));

    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", PRICING_PATH)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(pricing_body())
        .create_async()
        .await;

    let (controller, store) = controller(&data_dir, &server.url()).await;
    assert_eq!(store.load_config().await.unwrap(), Some(Config::default()));

    let outcome = controller.run_cycle().await;
    mock.assert_async().await;
    assert_eq!(
        outcome,
        CycleOutcome::Completed {
            accounts: 2,
            instances: 3
        }
    );

    let view = controller.view();
    assert_eq!(view.totals.instance_count, 3);
    assert_eq!(view.totals.optimized_count, 1);
    assert_eq!(view.totals.stale_count, 1);
    assert!(view.totals.saving > 0.0);

    // production carries the larger non-optimized cost and sorts first
    let keys: Vec<&str> = view.sorted_groups.iter().map(|g| g.key.as_str()).collect();
    assert_eq!(keys, vec!["production", "staging"]);

    let oversized = view.sorted_groups[0]
        .instances
        .iter()
        .find(|r| r.instance_id == "i-oversized")
        .unwrap();
    assert_eq!(oversized.classification, Classification::Optimized);
    assert_eq!(
        oversized.recommendation.as_ref().unwrap().instance_type,
        "m5.xlarge"
    );

    let idle = &view.sorted_groups[1].instances[0];
    assert_eq!(idle.classification, Classification::Stale);
}

#[tokio::test]
async fn test_config_update_persists_to_store() {
    let data_dir = TempDir::new().unwrap();
    seed_telemetry(&data_dir.path().join("telemetry"));

    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", PRICING_PATH)
        .with_status(200)
        .with_body(pricing_body())
        .create_async()
        .await;

    let (controller, store) = controller(&data_dir, &server.url()).await;
    controller.run_cycle().await;

    let update = ConfigUpdate {
        group_by: Some(GroupBy::InstanceType),
        ..Default::default()
    };
    controller.update_config(update, Trigger::GroupAndSort).await;

    let stored = store.load_config().await.unwrap().unwrap();
    assert_eq!(stored.group_by, GroupBy::InstanceType);
    assert_eq!(controller.view().sorted_groups.len(), 2);
}

#[tokio::test]
async fn test_pricing_outage_leaves_empty_view() {
    let data_dir = TempDir::new().unwrap();
    seed_telemetry(&data_dir.path().join("telemetry"));

    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", PRICING_PATH)
        .with_status(503)
        .create_async()
        .await;

    let (controller, _store) = controller(&data_dir, &server.url()).await;

    assert_eq!(controller.run_cycle().await, CycleOutcome::PricingFailed);
    assert_eq!(controller.view().instance_count, 0);
    assert!(!controller.health().readiness().await.ready);
}

#[tokio::test]
async fn test_snapshots_listed_newest_first() {
    let data_dir = TempDir::new().unwrap();
    let store_root = data_dir.path().join("store");
    write_json(
        &store_root.join(SNAPSHOT_COLLECTION).join("2024-03-01.json"),
        json!({"saving": 10.0}),
    );
    write_json(
        &store_root.join(SNAPSHOT_COLLECTION).join("2024-04-01.json"),
        json!({"saving": 12.5}),
    );

    let (controller, _store) = controller(&data_dir, "http://127.0.0.1:9").await;

    let snapshots = controller.list_snapshots().await;
    assert_eq!(snapshots.len(), 2);
    assert_eq!(snapshots[0].id, "2024-04-01");
    assert_eq!(snapshots[0].document["saving"], 12.5);
}
