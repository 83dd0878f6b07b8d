#![forbid(unsafe_code)]

use std::{
    env, fs,
    net::SocketAddr,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;

use gateclear_adapter::{
    AdapterRuntime, AdminApplicationDto, AdminListResponseDto, ApiError, BoxedUploader,
    CreateDraftDto, CreateDraftResponseDto, DraftViewDto, PatchStepResponseDto,
    StaticSessionTable, StatusChangeResponseDto, StatusUpdateDto, SubmitDto, SubmitResponseDto,
};
use gateclear_os::pdf::builtin_template;
use gateclear_os::submit::SubmitConfig;
use gateclear_os::uploader::{HttpBlobUploader, LocalDirUploader, UploadPolicy};

type SharedRuntime = Arc<Mutex<AdapterRuntime>>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let bind = env::var("GATECLEAR_HTTP_BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    let addr: SocketAddr = bind.parse()?;

    let sessions = match env::var("GATECLEAR_SESSION_TOKENS") {
        Ok(spec) => StaticSessionTable::from_spec(&spec)?,
        Err(_) => StaticSessionTable::default(),
    };
    let admin_token = env::var("GATECLEAR_ADMIN_TOKEN").ok();

    let template_bytes = match env::var("GATECLEAR_TEMPLATE_PATH") {
        Ok(path) => fs::read(&path)?,
        Err(_) => builtin_template()?,
    };

    let policy = UploadPolicy::v1(
        parse_upload_timeout_ms_from_env(),
        parse_upload_retry_from_env(),
    )
    .map_err(|v| format!("invalid upload policy: {v:?}"))?;
    let uploader: BoxedUploader = match env::var("GATECLEAR_UPLOAD_URL") {
        Ok(url) => Box::new(HttpBlobUploader::new(&url, policy)?),
        Err(_) => {
            let dir = env::var("GATECLEAR_UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("gateclear_uploads"));
            Box::new(LocalDirUploader::new(dir))
        }
    };

    let submit_config = SubmitConfig::v1(parse_grace_days_from_env())
        .map_err(|v| format!("invalid submit config: {v:?}"))?;
    let runtime = Arc::new(Mutex::new(AdapterRuntime::new(
        sessions,
        admin_token.as_deref(),
        uploader,
        template_bytes,
        submit_config,
    )));

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/applications", post(create_draft))
        .route("/v1/applications/:id", get(get_draft))
        .route("/v1/applications/:id/steps/:step", patch(patch_step))
        .route("/v1/applications/:id/submit", post(submit))
        .route("/v1/admin/applications", get(admin_list))
        .route("/v1/admin/applications/:id", get(admin_get))
        .route("/v1/admin/applications/:id/status", post(admin_update_status))
        .with_state(runtime);

    println!("gateclear_http listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn parse_upload_timeout_ms_from_env() -> u32 {
    env::var("GATECLEAR_UPLOAD_TIMEOUT_MS")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .filter(|v| (100..=120_000).contains(v))
        .unwrap_or(10_000)
}

fn parse_upload_retry_from_env() -> bool {
    match env::var("GATECLEAR_UPLOAD_RETRY") {
        Ok(v) => !matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "0" | "false" | "off" | "no"
        ),
        Err(_) => true,
    }
}

fn parse_grace_days_from_env() -> u16 {
    env::var("GATECLEAR_EXPIRATION_GRACE_DAYS")
        .ok()
        .and_then(|v| v.parse::<u16>().ok())
        .filter(|v| *v <= 3650)
        .unwrap_or(0)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
}

fn lock(runtime: &SharedRuntime) -> Result<std::sync::MutexGuard<'_, AdapterRuntime>, ApiError> {
    runtime
        .lock()
        .map_err(|_| ApiError::internal("adapter runtime lock poisoned"))
}

async fn healthz() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "ok" })),
    )
}

async fn create_draft(
    State(runtime): State<SharedRuntime>,
    headers: HeaderMap,
    Json(body): Json<CreateDraftDto>,
) -> Result<(StatusCode, Json<CreateDraftResponseDto>), ApiError> {
    let mut runtime = lock(&runtime)?;
    let owner = runtime.resolve_owner(bearer_token(&headers))?;
    let response = runtime.create_draft(owner, &body)?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn get_draft(
    State(runtime): State<SharedRuntime>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<DraftViewDto>, ApiError> {
    let runtime = lock(&runtime)?;
    let owner = runtime.resolve_owner(bearer_token(&headers))?;
    Ok(Json(runtime.get_draft(owner, &id)?))
}

async fn patch_step(
    State(runtime): State<SharedRuntime>,
    headers: HeaderMap,
    Path((id, step)): Path<(String, String)>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<PatchStepResponseDto>, ApiError> {
    let mut runtime = lock(&runtime)?;
    let owner = runtime.resolve_owner(bearer_token(&headers))?;
    Ok(Json(runtime.patch_step(owner, &id, &step, body)?))
}

async fn submit(
    State(runtime): State<SharedRuntime>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<SubmitDto>,
) -> Result<Json<SubmitResponseDto>, ApiError> {
    let mut runtime = lock(&runtime)?;
    let owner = runtime.resolve_owner(bearer_token(&headers))?;
    Ok(Json(runtime.submit(owner, &id, &body)?))
}

#[derive(Debug, Deserialize)]
struct AdminListQuery {
    status: Option<String>,
    offset: Option<usize>,
    limit: Option<usize>,
}

async fn admin_list(
    State(runtime): State<SharedRuntime>,
    headers: HeaderMap,
    Query(query): Query<AdminListQuery>,
) -> Result<Json<AdminListResponseDto>, ApiError> {
    let runtime = lock(&runtime)?;
    runtime.check_admin(bearer_token(&headers))?;
    Ok(Json(runtime.admin_list(
        query.status.as_deref(),
        query.offset.unwrap_or(0),
        query.limit.unwrap_or(50),
    )?))
}

async fn admin_get(
    State(runtime): State<SharedRuntime>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<AdminApplicationDto>, ApiError> {
    let runtime = lock(&runtime)?;
    runtime.check_admin(bearer_token(&headers))?;
    Ok(Json(runtime.admin_get(&id)?))
}

async fn admin_update_status(
    State(runtime): State<SharedRuntime>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<StatusUpdateDto>,
) -> Result<Json<StatusChangeResponseDto>, ApiError> {
    let mut runtime = lock(&runtime)?;
    runtime.check_admin(bearer_token(&headers))?;
    Ok(Json(runtime.admin_update_status(&id, &body, "admin")?))
}
