// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tempfile::tempdir;
use tokio::sync::RwLock;
use tower::ServiceExt; // for oneshot

use wipecert_kernel::types::id::Principal;
use wipecert_node::api::{CertificateListResponse, IssuerChangeResponse, ProofResponse, SnapshotSaveResponse};
use wipecert_node::config::NodeConfig;
use wipecert_node::engine::Engine;
use wipecert_node::server::{build_router, SharedEngine};

fn shared_engine(cfg: &NodeConfig) -> SharedEngine {
    Arc::new(RwLock::new(Engine::new(cfg).unwrap()))
}

fn owner_config() -> NodeConfig {
    let mut cfg = NodeConfig::default();
    cfg.owner = Some(Principal::from("O"));
    cfg
}

fn post(uri: &str, principal: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(p) = principal {
        builder = builder.header("x-principal", p);
    }
    builder.body(Body::from(serde_json::to_vec(&body).unwrap())).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1 << 20).await.unwrap();
    (status, bytes.to_vec())
}

async fn send_json(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes) = send(app, req).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn issue_body(id: &str) -> Value {
    json!({
        "certificate_id": id,
        "device_serial": "SN-001",
        "wipe_method": "NIST-Purge",
        "content_reference": "bafy123"
    })
}

#[tokio::test]
async fn test_issue_verify_and_revoke() {
    let app = build_router(shared_engine(&owner_config()), None);

    let (status, cert) = send_json(&app, post("/v1/certificates", Some("O"), issue_body("C1"))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(cert["issuer"], "O");
    assert_eq!(cert["is_valid"], true);

    let (status, v) = send_json(&app, get("/v1/certificates/C1/verify")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["exists"], true);
    assert_eq!(v["device_serial"], "SN-001");
    assert_eq!(v["content_reference"], "bafy123");

    let (status, _) = send_json(&app, post("/v1/certificates/C1/revoke", Some("O"), json!({}))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, err) = send_json(&app, post("/v1/certificates/C1/revoke", Some("O"), json!({}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["error"], "AlreadyRevoked");

    let (_, v) = send_json(&app, get("/v1/certificates/C1/verify")).await;
    assert_eq!(v["is_valid"], false);

    let (_, history) = send_json(&app, get("/v1/certificates/C1/events")).await;
    let events = history["events"].as_array().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["type"], "certificate_issued");
    assert_eq!(events[1]["type"], "certificate_revoked");
}

#[tokio::test]
async fn test_error_status_codes() {
    let app = build_router(shared_engine(&owner_config()), None);
    send_json(&app, post("/v1/certificates", Some("O"), issue_body("C1"))).await;

    let cases = [
        (post("/v1/certificates", Some("O"), issue_body("C1")), StatusCode::CONFLICT, "AlreadyExists"),
        (post("/v1/certificates", Some("O"), issue_body("")), StatusCode::BAD_REQUEST, "InvalidArgument"),
        (post("/v1/certificates", Some("X"), issue_body("C9")), StatusCode::FORBIDDEN, "Unauthorized"),
        (post("/v1/certificates", None, issue_body("C9")), StatusCode::UNAUTHORIZED, "MissingCaller"),
        (post("/v1/certificates/C9/revoke", Some("O"), json!({})), StatusCode::NOT_FOUND, "NotFound"),
        (
            post("/v1/issuers/deauthorize", Some("O"), json!({ "principal": "O" })),
            StatusCode::FORBIDDEN,
            "ProtectedPrincipal",
        ),
        (
            post("/v1/issuers/authorize", Some("X"), json!({ "principal": "P" })),
            StatusCode::FORBIDDEN,
            "Unauthorized",
        ),
    ];

    for (req, status, kind) in cases {
        let (got, body) = send_json(&app, req).await;
        assert_eq!(got, status, "{}", kind);
        assert_eq!(body["error"], kind);
    }

    let (status, _) = send_json(&app, get("/v1/certificates/C9")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, v) = send_json(&app, get("/v1/certificates/C9/verify")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["exists"], false);
}

#[tokio::test]
async fn test_issuer_management_and_listing() {
    let app = build_router(shared_engine(&owner_config()), None);
    send_json(&app, post("/v1/certificates", Some("O"), issue_body("C1"))).await;

    let (status, body) = send_json(&app, post("/v1/issuers/authorize", Some("O"), json!({ "principal": "P" }))).await;
    assert_eq!(status, StatusCode::OK);
    let changed: IssuerChangeResponse = serde_json::from_value(body).unwrap();
    assert!(changed.changed);

    let (_, body) = send_json(&app, post("/v1/issuers/authorize", Some("O"), json!({ "principal": "P" }))).await;
    assert_eq!(body["changed"], false);

    send_json(&app, post("/v1/certificates", Some("P"), issue_body("C2"))).await;

    let (_, body) = send_json(&app, get("/v1/issuers/P/certificates")).await;
    let by_p: CertificateListResponse = serde_json::from_value(body).unwrap();
    assert_eq!(by_p.certificate_ids.len(), 1);
    assert_eq!(by_p.certificate_ids[0].as_str(), "C2");

    let (_, issuers) = send_json(&app, get("/v1/issuers")).await;
    assert_eq!(issuers["owner"], "O");
    assert_eq!(issuers["authorized"], json!(["O", "P"]));

    send_json(&app, post("/v1/issuers/deauthorize", Some("O"), json!({ "principal": "P" }))).await;
    let (status, _) = send_json(&app, post("/v1/certificates", Some("P"), issue_body("C3"))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = send_json(&app, get("/v1/certificates")).await;
    let all: CertificateListResponse = serde_json::from_value(body).unwrap();
    assert_eq!(all.total, 2);

    let (_, stats) = send_json(&app, get("/v1/registry/stats")).await;
    assert_eq!(stats["total_certificates"], 2);
    assert_eq!(stats["authorized_issuers"], 1);
}

#[tokio::test]
async fn test_bearer_token_required() {
    let app = build_router(shared_engine(&owner_config()), Some("secret".to_string()));

    let (status, _) = send(&app, get("/v1/certificates")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = Request::builder()
        .uri("/v1/certificates")
        .header("authorization", "Bearer wrong")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = Request::builder()
        .uri("/v1/certificates")
        .header("authorization", "Bearer secret")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_snapshot_proof_and_log_download() {
    let dir = tempdir().unwrap();
    let mut cfg = owner_config();
    cfg.data_dir = Some(dir.path().to_path_buf());
    let app = build_router(shared_engine(&cfg), None);

    send_json(&app, post("/v1/certificates", Some("O"), issue_body("C1"))).await;

    let (status, body) = send_json(&app, post("/v1/snapshot/save", None, json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    let saved: SnapshotSaveResponse = serde_json::from_value(body).unwrap();
    assert_eq!(saved.event_height, 2);

    let (status, body) = send_json(&app, get("/v1/proof/state")).await;
    assert_eq!(status, StatusCode::OK);
    let proof: ProofResponse = serde_json::from_value(body).unwrap();
    assert_eq!(proof.event_count, 2);
    assert_eq!(proof.snapshot_hash, Some(saved.snapshot_hash));

    let (status, log) = send(&app, get("/v1/proof/event-log")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&log[..4], b"WCEL");
    assert_eq!(log, std::fs::read(dir.path().join("events.log")).unwrap());
}

#[tokio::test]
async fn test_event_stream_replays_history() {
    let state = shared_engine(&owner_config());
    let app = build_router(state.clone(), None);
    send_json(&app, post("/v1/certificates", Some("O"), issue_body("C1"))).await;

    let response = app.clone().oneshot(get("/v1/events/stream?from=0")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "application/x-ndjson");

    // Commit one more event, then drop the engine's sender so the stream ends.
    {
        let mut engine = state.write().await;
        engine.revoke(Principal::from("O"), "C1".into()).unwrap();
    }
    drop(app);
    drop(state);

    let bytes = axum::body::to_bytes(response.into_body(), 1 << 20).await.unwrap();
    let lines: Vec<Value> = bytes
        .split(|b| *b == b'\n')
        .filter(|line| !line.is_empty())
        .map(|line| serde_json::from_slice(line).unwrap())
        .collect();

    let types: Vec<&str> = lines.iter().map(|l| l["type"].as_str().unwrap()).collect();
    assert_eq!(types, vec!["registry_initialized", "certificate_issued", "certificate_revoked"]);
    assert_eq!(lines[2]["sequence"], 2);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = build_router(shared_engine(&owner_config()), None);
    let (status, _) = send(&app, get("/metrics")).await;
    assert_eq!(status, StatusCode::OK);
}
