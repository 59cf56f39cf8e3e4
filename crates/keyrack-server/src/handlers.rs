use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::{
    store::{EntryFields, EntryRecord},
    validate::{validate_entry, EntryInput, FieldError},
    AppState,
};

// ── Health ────────────────────────────────────────────────────────────────────

pub async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

// ── List ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub q: Option<String>,
}

/// Listing shape — never includes the secret, encrypted or otherwise.
#[derive(Debug, Serialize)]
pub struct EntryMeta {
    pub id: u64,
    pub name: String,
    pub url: String,
    pub login: String,
}

impl From<&EntryRecord> for EntryMeta {
    fn from(record: &EntryRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            url: record.url.clone(),
            login: record.login.clone(),
        }
    }
}

pub async fn list_entries(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Response {
    match state.store.list(query.q.as_deref()) {
        Ok(records) => {
            info!(count = records.len(), "audit: entry.list");
            let entries: Vec<EntryMeta> = records.iter().map(EntryMeta::from).collect();
            Json(json!({ "entries": entries })).into_response()
        }
        Err(e) => internal_error(e),
    }
}

// ── Create ────────────────────────────────────────────────────────────────────

pub async fn create_entry(
    State(state): State<AppState>,
    Json(body): Json<EntryInput>,
) -> Response {
    if let Err(errors) = validate_entry(&body) {
        return validation_error(errors);
    }

    let fields = EntryFields {
        name: body.name,
        url: body.url,
        login: body.login,
        secret: state.cipher.encrypt(&body.password),
    };

    match state.store.insert(fields) {
        Ok(record) => {
            info!(id = record.id, "audit: entry.create");
            (StatusCode::CREATED, Json(EntryMeta::from(&record))).into_response()
        }
        Err(e) => internal_error(e),
    }
}

// ── Detail ────────────────────────────────────────────────────────────────────

pub async fn get_entry(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    match state.store.get(id) {
        Ok(Some(record)) => {
            info!(id, "audit: entry.read");
            detail_response(&state, &record)
        }
        Ok(None) => not_found(),
        Err(e) => internal_error(e),
    }
}

// ── Update ────────────────────────────────────────────────────────────────────

pub async fn update_entry(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(body): Json<EntryInput>,
) -> Response {
    if let Err(errors) = validate_entry(&body) {
        return validation_error(errors);
    }

    let fields = EntryFields {
        name: body.name,
        url: body.url,
        login: body.login,
        secret: state.cipher.encrypt(&body.password),
    };

    match state.store.update(id, fields) {
        Ok(Some(record)) => {
            info!(id, "audit: entry.update");
            Json(EntryMeta::from(&record)).into_response()
        }
        Ok(None) => not_found(),
        Err(e) => internal_error(e),
    }
}

// ── Delete ────────────────────────────────────────────────────────────────────

pub async fn delete_entry(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    match state.store.delete(id) {
        Ok(true) => {
            info!(id, "audit: entry.delete");
            Json(json!({"deleted": true})).into_response()
        }
        Ok(false) => not_found(),
        Err(e) => internal_error(e),
    }
}

// ── Share: issue ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ShareRequest {
    pub ttl_seconds: Option<u64>,
}

pub async fn share_entry(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    body: Option<Json<ShareRequest>>,
) -> Response {
    // Only existing records are worth a link.
    match state.store.get(id) {
        Ok(Some(_)) => {}
        Ok(None) => return not_found(),
        Err(e) => return internal_error(e),
    }

    let ttl = body
        .and_then(|Json(b)| b.ttl_seconds)
        .unwrap_or(state.share_ttl);
    let grant = state.shares.issue(id, now(), ttl);

    info!(id, expires_at = grant.expires_at, "audit: entry.share");
    (
        StatusCode::CREATED,
        Json(json!({
            "url": grant.path(),
            "expires_at": grant.expires_at,
        })),
    )
        .into_response()
}

// ── Share: view ───────────────────────────────────────────────────────────────

/// Unauthenticated share-link view. Every way a link can be bad — wrong
/// digest, expired, malformed numbers, unknown record — collapses into the
/// same not-found response, so callers can't probe which check failed.
pub async fn view_shared_entry(
    State(state): State<AppState>,
    Path((digest, expires_at, id)): Path<(String, String, String)>,
) -> Response {
    let Ok(expires_at) = expires_at.parse::<i64>() else {
        return not_found();
    };
    let Ok(id) = id.parse::<u64>() else {
        return not_found();
    };

    if !state.shares.verify(&digest, expires_at, id, now()) {
        return not_found();
    }

    match state.store.get(id) {
        Ok(Some(record)) => {
            info!(id, "audit: entry.share.view");
            detail_response(&state, &record)
        }
        Ok(None) => not_found(),
        Err(e) => internal_error(e),
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Detail shape: the one place the password appears in plaintext. A secret
/// that fails to decrypt nulls out that field instead of failing the whole
/// request.
fn detail_response(state: &AppState, record: &EntryRecord) -> Response {
    let password = match state.cipher.decrypt(&record.secret) {
        Ok(plain) => Some(plain),
        Err(e) => {
            warn!(id = record.id, error = %e, "stored secret failed to decrypt");
            None
        }
    };

    Json(json!({
        "id": record.id,
        "name": record.name,
        "url": record.url,
        "login": record.login,
        "password": password,
    }))
    .into_response()
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"error": "not found"}))).into_response()
}

fn validation_error(errors: Vec<FieldError>) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({"errors": errors}))).into_response()
}

fn internal_error(e: anyhow::Error) -> Response {
    tracing::error!(error = %e, "internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": "internal server error"})),
    )
        .into_response()
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
