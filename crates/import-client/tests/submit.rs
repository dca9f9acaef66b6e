//! ImportClient against a local HTTP stub.

mod support;

use std::sync::Arc;
use std::time::Duration;

use chain_sealer::HashChainSealer;
use evidence_core::{EventType, EvidencePipeline, ImportBundle, NormalizedEvent, PipelineConfig};
use import_client::{ImportClient, ImportClientConfig};
use support::{serve_once, serve_once_after};

async fn sealed_bundle() -> ImportBundle {
    let event = NormalizedEvent::new("gitlab", EventType::MergeRequest, "grp/proj", "alice")
        .with_pr_number(5);
    EvidencePipeline::new(PipelineConfig::default())
        .with_sealing_authority(Arc::new(HashChainSealer::new()))
        .process(&event)
        .await
        .unwrap()
        .import
}

#[tokio::test]
async fn accepted_bundle_returns_data() {
    let (base, server) = serve_once(201, r#"{"bundle_id":"b-1","stored":true}"#).await;
    let client = ImportClient::new(ImportClientConfig::new(base).with_token("tkn")).unwrap();
    let bundle = sealed_bundle().await;
    let response = client.submit(&bundle).await;

    assert!(response.ok);
    assert_eq!(response.status, 201);
    assert_eq!(response.data.unwrap()["stored"], serde_json::json!(true));

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /api/v1/bundles/import "));
    assert!(request.to_ascii_lowercase().contains("authorization: bearer tkn"));
    assert!(request.contains(&bundle.bundle_id));
    assert!(request.contains(r#""immutability_proof""#));
}

#[tokio::test]
async fn rejection_is_data_not_error() {
    let (base, _server) = serve_once(422, r#"{"error":"root hash mismatch"}"#).await;
    let client = ImportClient::new(ImportClientConfig::new(base)).unwrap();
    let response = client.submit(&sealed_bundle().await).await;

    assert!(!response.ok);
    assert_eq!(response.status, 422);
    assert_eq!(response.error.as_deref(), Some("root hash mismatch"));
}

#[tokio::test]
async fn timeout_reports_status_zero() {
    let (base, _server) = serve_once_after(200, "{}", Duration::from_secs(2)).await;
    let client = ImportClient::new(ImportClientConfig::new(base).with_timeout_ms(100)).unwrap();
    let response = client.submit(&sealed_bundle().await).await;

    assert!(!response.ok);
    assert_eq!(response.status, 0);
    assert!(response.error.unwrap().contains("timed out"));
}

#[tokio::test]
async fn unreachable_endpoint_reports_failure() {
    let client =
        ImportClient::new(ImportClientConfig::new("http://127.0.0.1:9").with_timeout_ms(1_000))
            .unwrap();
    let response = client.submit(&sealed_bundle().await).await;
    assert!(!response.ok);
    assert_eq!(response.status, 0);
    assert!(response.error.is_some());
}
