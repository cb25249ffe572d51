//! HTTP layer exposing the team drive operations.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use firedrive_core::drive::entry::{
    CleanupCandidate, ConnectionReport, FolderDeletion, Listing, QuickStats, StorageEntry,
    StorageExists, StorageStats, TeamProvisioning,
};
use firedrive_core::drive::TeamDrive;
use firedrive_core::error::DriveError;
use firedrive_core::search;

#[derive(Clone)]
pub struct AppState {
    pub drive: Arc<TeamDrive>,
}

pub fn router(drive: Arc<TeamDrive>) -> Router {
    let state = AppState { drive };
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/teams/{team_id}/list", get(list_all))
        .route("/teams/{team_id}/folders", get(list_folders).post(create_folder).delete(delete_folder))
        .route("/teams/{team_id}/files", get(list_files).post(upload_file).delete(delete_file))
        .route("/teams/{team_id}/files/url", get(file_url))
        .route("/teams/{team_id}/rename", put(rename))
        .route("/teams/{team_id}/structure", post(create_structure))
        .route("/teams/{team_id}/ping", get(ping))
        .route("/teams/{team_id}/exists", get(exists))
        .route("/teams/{team_id}/stats", get(stats))
        .route("/teams/{team_id}/stats/quick", get(quick_stats))
        .route("/teams/{team_id}/cleanup", get(cleanup))
        .route("/teams/{team_id}/search/client", post(client_search))
        .route("/teams/{team_id}/log", get(diagnostics))
        .with_state(state)
}

/// Domain error mapped onto an HTTP response with a human-readable body.
pub struct ApiError(DriveError);

impl From<DriveError> for ApiError {
    fn from(err: DriveError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            DriveError::MissingTenant => StatusCode::BAD_REQUEST,
            DriveError::InvalidName(_) => StatusCode::BAD_REQUEST,
            DriveError::TenantUnavailable { .. } => StatusCode::FORBIDDEN,
            DriveError::NotFound(_) => StatusCode::NOT_FOUND,
            DriveError::Unsupported(_) => StatusCode::NOT_IMPLEMENTED,
            DriveError::PartialFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            DriveError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            DriveError::Backend(_) => StatusCode::BAD_GATEWAY,
        };
        let mut body = json!({ "error": self.0.to_string() });
        if let DriveError::PartialFailure {
            deleted,
            failed,
            total,
        } = &self.0
        {
            body["deleted"] = json!(deleted);
            body["failed"] = json!(failed);
            body["total"] = json!(total);
        }
        (status, Json(body)).into_response()
    }
}

#[derive(Deserialize)]
struct PathQuery {
    #[serde(default)]
    path: String,
}

#[derive(Deserialize)]
struct FilesQuery {
    #[serde(default)]
    path: String,
    #[serde(default)]
    urls: bool,
}

#[derive(Deserialize)]
struct UploadQuery {
    #[serde(default)]
    path: String,
    name: String,
}

#[derive(Deserialize)]
struct StatsQuery {
    #[serde(default)]
    force: bool,
}

#[derive(Deserialize)]
struct RenameRequest {
    from: String,
    to: String,
    #[serde(default)]
    is_folder: bool,
}

#[derive(Deserialize)]
struct StructureRequest {
    team_name: String,
}

#[derive(serde::Serialize)]
struct ClientSearchResponse {
    terms: Vec<String>,
    matches: Vec<search::ScoredFolder>,
}

async fn list_all(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
    Query(q): Query<PathQuery>,
) -> Result<Json<Listing>, ApiError> {
    Ok(Json(state.drive.list_children(&team_id, &q.path).await?))
}

async fn list_folders(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
    Query(q): Query<PathQuery>,
) -> Result<Json<Vec<StorageEntry>>, ApiError> {
    Ok(Json(state.drive.list_folders_only(&team_id, &q.path).await?))
}

async fn list_files(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
    Query(q): Query<FilesQuery>,
) -> Result<Json<Vec<StorageEntry>>, ApiError> {
    let files = if q.urls {
        state.drive.list_children(&team_id, &q.path).await?.files
    } else {
        state.drive.list_files_basic(&team_id, &q.path).await?
    };
    Ok(Json(files))
}

async fn upload_file(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
    Query(q): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<StorageEntry>, ApiError> {
    let content_type = headers
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream");
    let entry = state
        .drive
        .upload(&team_id, &q.path, &q.name, body, content_type)
        .await?;
    Ok(Json(entry))
}

async fn delete_file(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
    Query(q): Query<PathQuery>,
) -> Result<Json<Value>, ApiError> {
    let deleted = state.drive.delete_file(&team_id, &q.path).await?;
    Ok(Json(json!({ "deleted": deleted })))
}

async fn file_url(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
    Query(q): Query<PathQuery>,
) -> Result<Json<Value>, ApiError> {
    let url = state.drive.download_url(&team_id, &q.path).await?;
    Ok(Json(json!({ "url": url })))
}

async fn create_folder(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
    Query(q): Query<PathQuery>,
) -> Result<Json<StorageEntry>, ApiError> {
    Ok(Json(state.drive.create_folder(&team_id, &q.path).await?))
}

async fn delete_folder(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
    Query(q): Query<PathQuery>,
) -> Result<Json<FolderDeletion>, ApiError> {
    let out = state.drive.delete_folder(&team_id, &q.path).await?;
    if out.failed > 0 {
        return Err(DriveError::PartialFailure {
            deleted: out.deleted,
            failed: out.failed,
            total: out.total,
        }
        .into());
    }
    Ok(Json(out))
}

async fn rename(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
    Json(req): Json<RenameRequest>,
) -> Result<Json<Value>, ApiError> {
    state
        .drive
        .rename(&team_id, &req.from, &req.to, req.is_folder)?;
    // rename() always fails; this is unreachable but keeps the types honest.
    Ok(Json(json!({ "renamed": req.to })))
}

async fn create_structure(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
    Json(req): Json<StructureRequest>,
) -> Result<Json<TeamProvisioning>, ApiError> {
    Ok(Json(
        state
            .drive
            .create_team_structure(&team_id, &req.team_name)
            .await?,
    ))
}

async fn ping(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
) -> Result<Json<ConnectionReport>, ApiError> {
    Ok(Json(state.drive.test_connection(&team_id).await?))
}

async fn exists(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
) -> Result<Json<StorageExists>, ApiError> {
    Ok(Json(state.drive.storage_exists(&team_id).await?))
}

async fn stats(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
    Query(q): Query<StatsQuery>,
) -> Result<Json<StorageStats>, ApiError> {
    Ok(Json(state.drive.stats(&team_id, q.force).await?))
}

async fn quick_stats(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
) -> Result<Json<QuickStats>, ApiError> {
    Ok(Json(state.drive.quick_stats(&team_id).await?))
}

async fn cleanup(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
) -> Result<Json<Vec<CleanupCandidate>>, ApiError> {
    Ok(Json(state.drive.cleanup_candidates(&team_id).await?))
}

async fn client_search(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
    Json(record): Json<Map<String, Value>>,
) -> Result<Json<ClientSearchResponse>, ApiError> {
    let terms = search::client_search_terms(&record);
    let folders = state.drive.list_folders_only(&team_id, "").await?;
    let names: Vec<String> = folders.into_iter().map(|f| f.name).collect();
    let matches = search::score_folders(&names, &terms);
    Ok(Json(ClientSearchResponse { terms, matches }))
}

async fn diagnostics(
    State(state): State<AppState>,
    Path(_team_id): Path<String>,
) -> Json<Vec<String>> {
    Json(state.drive.diagnostics())
}
