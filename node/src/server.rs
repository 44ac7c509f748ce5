// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::sync::Arc;

use axum::{
    async_trait,
    body::{Body, Bytes},
    extract::{FromRequestParts, Path, Query, Request, State},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        request::Parts,
        StatusCode,
    },
    middleware::{from_fn_with_state, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::StreamExt;
use tokio::sync::RwLock;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tokio_util::io::ReaderStream;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use wipecert_kernel::types::certificate::{Certificate, Verification};
use wipecert_kernel::types::id::{CertificateId, Principal};

use crate::api::*;
use crate::engine::{Engine, RegistryStats};
use crate::errors::EngineError;

pub type SharedEngine = Arc<RwLock<Engine>>;

/// Header carrying the caller identity established by the identity collaborator.
pub const PRINCIPAL_HEADER: &str = "x-principal";

/// Acting principal of a mutation, taken from the `x-principal` header.
pub struct Caller(pub Principal);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = EngineError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(PRINCIPAL_HEADER)
            .and_then(|val| val.to_str().ok())
            .map(str::trim)
            .filter(|val| !val.is_empty())
            .map(|val| Caller(Principal::new(val)))
            .ok_or(EngineError::MissingCaller)
    }
}

async fn auth_guard(
    State(token): State<Arc<String>>,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let provided = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|val| val.to_str().ok())
        .and_then(|val| val.strip_prefix("Bearer "));

    match provided {
        Some(provided) if provided == token.as_str() => Ok(next.run(req).await),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

pub fn build_router(state: SharedEngine, auth_token: Option<String>) -> Router {
    let mut app = Router::new()
        // Certificates
        .route("/v1/certificates", post(issue_certificate).get(list_certificates))
        .route("/v1/certificates/:id", get(get_certificate))
        .route("/v1/certificates/:id/verify", get(verify_certificate))
        .route("/v1/certificates/:id/revoke", post(revoke_certificate))
        .route("/v1/certificates/:id/events", get(certificate_events))
        // Issuers
        .route("/v1/issuers", get(list_issuers))
        .route("/v1/issuers/authorize", post(authorize_issuer))
        .route("/v1/issuers/deauthorize", post(deauthorize_issuer))
        .route("/v1/issuers/:principal/certificates", get(certificates_by_issuer))
        .route("/v1/issuers/:principal/events", get(principal_events))
        // Registry
        .route("/v1/registry/stats", get(registry_stats))
        .route("/v1/events/stream", get(stream_events))
        // Admin V1
        .route("/v1/snapshot/save", post(snapshot_save))
        // Proofs v1
        .route("/v1/proof/state", get(get_proof))
        .route("/v1/proof/event-log", get(download_event_log))
        // Observability
        .route("/metrics", get(metrics_handler))
        .with_state(state);

    if let Some(token) = auth_token {
        tracing::info!("Auth Enabled: Bearer token required");
        app = app.layer(from_fn_with_state(Arc::new(token), auth_guard));
    } else {
        tracing::warn!("Auth Disabled: No token configured");
    }

    app.layer(CorsLayer::permissive()).layer(TraceLayer::new_for_http())
}

async fn issue_certificate(
    State(state): State<SharedEngine>,
    Caller(caller): Caller,
    Json(payload): Json<IssueCertificateRequest>,
) -> Result<(StatusCode, Json<Certificate>), EngineError> {
    let mut engine = state.write().await;
    let certificate = engine.issue(caller, payload.into())?;
    Ok((StatusCode::CREATED, Json(certificate)))
}

async fn list_certificates(State(state): State<SharedEngine>) -> Json<CertificateListResponse> {
    let engine = state.read().await;
    Json(CertificateListResponse {
        certificate_ids: engine.list_all(),
        total: engine.total_certificates(),
    })
}

async fn get_certificate(
    State(state): State<SharedEngine>,
    Path(id): Path<String>,
) -> Result<Json<Certificate>, EngineError> {
    let engine = state.read().await;
    Ok(Json(engine.get_details(&CertificateId::new(id))?))
}

async fn verify_certificate(
    State(state): State<SharedEngine>,
    Path(id): Path<String>,
) -> Json<Verification> {
    let engine = state.read().await;
    Json(engine.verify(&CertificateId::new(id)))
}

async fn revoke_certificate(
    State(state): State<SharedEngine>,
    Caller(caller): Caller,
    Path(id): Path<String>,
) -> Result<Json<RevokeResponse>, EngineError> {
    let certificate_id = CertificateId::new(id);
    let mut engine = state.write().await;
    engine.revoke(caller, certificate_id.clone())?;
    Ok(Json(RevokeResponse {
        certificate_id,
        revoked: true,
    }))
}

async fn certificate_events(
    State(state): State<SharedEngine>,
    Path(id): Path<String>,
) -> Json<AuditHistoryResponse> {
    let engine = state.read().await;
    Json(AuditHistoryResponse {
        events: engine.certificate_history(&CertificateId::new(id)),
    })
}

async fn list_issuers(State(state): State<SharedEngine>) -> Json<IssuersResponse> {
    let engine = state.read().await;
    Json(IssuersResponse {
        owner: engine.owner(),
        authorized: engine.authorized_issuers(),
    })
}

async fn authorize_issuer(
    State(state): State<SharedEngine>,
    Caller(caller): Caller,
    Json(payload): Json<IssuerChangeRequest>,
) -> Result<Json<IssuerChangeResponse>, EngineError> {
    let principal = Principal::new(payload.principal);
    let mut engine = state.write().await;
    let changed = engine.authorize_issuer(caller, principal.clone())?;
    Ok(Json(IssuerChangeResponse { principal, changed }))
}

async fn deauthorize_issuer(
    State(state): State<SharedEngine>,
    Caller(caller): Caller,
    Json(payload): Json<IssuerChangeRequest>,
) -> Result<Json<IssuerChangeResponse>, EngineError> {
    let principal = Principal::new(payload.principal);
    let mut engine = state.write().await;
    let changed = engine.deauthorize_issuer(caller, principal.clone())?;
    Ok(Json(IssuerChangeResponse { principal, changed }))
}

async fn certificates_by_issuer(
    State(state): State<SharedEngine>,
    Path(principal): Path<String>,
) -> Json<CertificateListResponse> {
    let engine = state.read().await;
    let certificate_ids = engine.list_by_issuer(&Principal::new(principal));
    Json(CertificateListResponse {
        total: certificate_ids.len() as u64,
        certificate_ids,
    })
}

async fn principal_events(
    State(state): State<SharedEngine>,
    Path(principal): Path<String>,
) -> Json<AuditHistoryResponse> {
    let engine = state.read().await;
    Json(AuditHistoryResponse {
        events: engine.principal_history(&Principal::new(principal)),
    })
}

async fn registry_stats(State(state): State<SharedEngine>) -> Json<RegistryStats> {
    let engine = state.read().await;
    Json(engine.stats())
}

/// NDJSON audit stream: optional history from `?from=`, then live events.
async fn stream_events(
    State(state): State<SharedEngine>,
    Query(params): Query<StreamParams>,
) -> Response {
    let (history, rx) = {
        let engine = state.read().await;
        engine.subscribe_from(params.from)
    };

    let live = BroadcastStream::new(rx).filter_map(|item| async move {
        match item {
            Ok(event) => Some(event),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!("Audit stream subscriber lagged, {} events skipped", skipped);
                None
            }
        }
    });

    let body_stream = futures::stream::iter(history).chain(live).map(|event| {
        serde_json::to_vec(&event).map(|mut line| {
            line.push(b'\n');
            Bytes::from(line)
        })
    });

    ([(CONTENT_TYPE, "application/x-ndjson")], Body::from_stream(body_stream)).into_response()
}

async fn snapshot_save(State(state): State<SharedEngine>) -> Result<Json<SnapshotSaveResponse>, EngineError> {
    let mut engine = state.write().await;
    let saved = engine.save_snapshot()?;
    Ok(Json(saved.into()))
}

async fn get_proof(State(state): State<SharedEngine>) -> Result<Json<ProofResponse>, EngineError> {
    let inputs = state.read().await.proof_inputs();
    let proof = tokio::task::spawn_blocking(move || inputs.generate())
        .await
        .map_err(|e| {
            tracing::error!("Proof task failed: {}", e);
            EngineError::Internal
        })??;
    Ok(Json(proof.into()))
}

async fn download_event_log(State(state): State<SharedEngine>) -> Result<Response, EngineError> {
    let path = {
        let engine = state.read().await;
        engine.event_log_path().map(|p| p.to_path_buf())
    }
    .ok_or_else(|| EngineError::InvalidInput("Event log is not persisted on this node".into()))?;

    let file = tokio::fs::File::open(&path).await?;
    let stream = ReaderStream::new(file);

    Ok(([(CONTENT_TYPE, "application/octet-stream")], Body::from_stream(stream)).into_response())
}

async fn metrics_handler() -> String {
    crate::telemetry::get_metrics()
}
