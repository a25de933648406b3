//! Axum REST API handlers.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::config::Config;
use crate::errors::LaunchpadError;
use crate::launchpad::Launchpad;
use crate::rpc::RpcSigner;
use crate::types::{
    is_evm_address, ContributeRequest, ContributionSummary, NewProject, Project, ProjectAudit,
    ProjectStatus,
};

pub struct ApiState {
    pub launchpad: Arc<Launchpad>,
    pub client: Client,
    pub config: Config,
}

impl ApiState {
    /// Signer for a node-managed account.
    fn signer_for(&self, from: &str) -> Result<Arc<RpcSigner>, ApiError> {
        if !is_evm_address(from) {
            return Err(LaunchpadError::validation("invalid from address").into());
        }
        Ok(Arc::new(RpcSigner::new(
            self.client.clone(),
            &self.config.rpc_url,
            from,
            self.config.confirmation_timeout(),
            self.config.receipt_poll_interval(),
        )))
    }
}

// ─────────────────────────────────────────────────────────
// Request / response shapes
// ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ContributeBody {
    #[serde(flatten)]
    pub request: ContributeRequest,
    /// Node-managed account that signs the shield transfer.
    pub from: String,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

#[derive(Deserialize)]
pub struct DistributeBody {
    pub project_id: String,
    /// Node-managed admin account that signs the distribution.
    pub from: String,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

#[derive(Deserialize)]
pub struct StatusUpdateBody {
    pub status: ProjectStatus,
}

#[derive(Deserialize)]
pub struct StatusQuery {
    pub project_id: String,
    pub user_address: String,
}

#[derive(Serialize)]
pub struct ProjectsResponse {
    pub count: usize,
    pub projects: Vec<Project>,
}

#[derive(Serialize)]
pub struct ProjectResponse {
    pub project: Project,
}

#[derive(Serialize)]
pub struct ContributeReply {
    pub success: bool,
    pub shield_tx_hash: String,
    pub contribution_id: String,
}

#[derive(Serialize)]
pub struct DistributeReply {
    pub success: bool,
    pub distribution_tx_hash: String,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub status: ContributionSummary,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ─────────────────────────────────────────────────────────
// Error mapping
// ─────────────────────────────────────────────────────────

pub struct ApiError(LaunchpadError);

impl From<LaunchpadError> for ApiError {
    fn from(e: LaunchpadError) -> Self {
        Self(e)
    }
}

pub fn status_for(e: &LaunchpadError) -> StatusCode {
    match e {
        LaunchpadError::Validation(_) => StatusCode::BAD_REQUEST,
        LaunchpadError::NotFound(_) => StatusCode::NOT_FOUND,
        LaunchpadError::Conflict(_) => StatusCode::CONFLICT,
        LaunchpadError::Transaction(_) => StatusCode::BAD_GATEWAY,
        LaunchpadError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {}", self.0);
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /projects`
///
/// Returns every project, most recent start first.
pub async fn list_projects(State(state): State<Arc<ApiState>>) -> ApiResult<Json<ProjectsResponse>> {
    let projects = state.launchpad.list_projects().await?;
    Ok(Json(ProjectsResponse {
        count: projects.len(),
        projects,
    }))
}

/// `POST /projects`
pub async fn create_project(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<NewProject>,
) -> ApiResult<(StatusCode, Json<ProjectResponse>)> {
    let project = state.launchpad.create_project(&body).await?;
    Ok((StatusCode::CREATED, Json(ProjectResponse { project })))
}

/// `GET /projects/:id`
pub async fn get_project(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ProjectResponse>> {
    let project = state.launchpad.get_project(&id).await?;
    Ok(Json(ProjectResponse { project }))
}

/// `GET /projects/:id/audit`
///
/// Recomputes the project's totals from its contribution records.
pub async fn audit_project(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ProjectAudit>> {
    Ok(Json(state.launchpad.audit_project(&id).await?))
}

/// `POST /projects/:id/status`
pub async fn update_project_status(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
    Json(body): Json<StatusUpdateBody>,
) -> ApiResult<Json<ProjectResponse>> {
    let project = state
        .launchpad
        .update_project_status(&id, body.status)
        .await?;
    Ok(Json(ProjectResponse { project }))
}

/// `POST /contribute`
pub async fn contribute(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<ContributeBody>,
) -> ApiResult<Json<ContributeReply>> {
    let signer = state.signer_for(&body.from)?;
    let result = state
        .launchpad
        .contribute(
            &body.request,
            signer,
            body.timeout_ms.map(Duration::from_millis),
        )
        .await?;
    Ok(Json(ContributeReply {
        success: true,
        shield_tx_hash: result.shield_tx_hash,
        contribution_id: result.contribution_id,
    }))
}

/// `POST /distribute`
pub async fn distribute(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<DistributeBody>,
) -> ApiResult<Json<DistributeReply>> {
    let signer = state.signer_for(&body.from)?;
    let result = state
        .launchpad
        .distribute(
            &body.project_id,
            signer,
            body.timeout_ms.map(Duration::from_millis),
        )
        .await?;
    Ok(Json(DistributeReply {
        success: true,
        distribution_tx_hash: result.distribution_tx_hash,
    }))
}

/// `GET /status?project_id=…&user_address=…`
pub async fn contribution_status(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<StatusQuery>,
) -> ApiResult<Json<StatusResponse>> {
    if !is_evm_address(&query.user_address) {
        return Err(LaunchpadError::validation("invalid user address").into());
    }
    let status = state
        .launchpad
        .contribution_status(&query.project_id, &query.user_address)
        .await?;
    Ok(Json(StatusResponse { status }))
}
