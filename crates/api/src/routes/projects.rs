//! Project registration, query, and join endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{FreelancerId, ProjectId};
use domain::{JoinProject, Project, RegisterProject};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct RegisterProjectRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub required_hours: u32,
}

#[derive(Deserialize)]
pub struct JoinProjectRequest {
    pub freelancer_id: String,
    pub hours: u32,
}

// -- Response types --

#[derive(Serialize)]
pub struct ProjectResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub required_hours: u32,
    pub committed_hours: u32,
    pub fully_staffed: bool,
    pub commitments: Vec<CommitmentResponse>,
}

#[derive(Serialize)]
pub struct CommitmentResponse {
    pub freelancer_id: String,
    pub allocated_hours: u32,
}

#[derive(Serialize)]
pub struct JoinAcceptedResponse {
    pub project_id: String,
    pub freelancer_id: String,
    pub allocated_hours: u32,
}

fn project_response(project: &Project) -> ProjectResponse {
    let mut commitments: Vec<CommitmentResponse> = project
        .commitments()
        .map(|(freelancer_id, allocated_hours)| CommitmentResponse {
            freelancer_id: freelancer_id.to_string(),
            allocated_hours,
        })
        .collect();
    commitments.sort_by(|a, b| a.freelancer_id.cmp(&b.freelancer_id));

    ProjectResponse {
        id: project.id().to_string(),
        name: project.name().to_string(),
        description: project.description().to_string(),
        required_hours: project.required_hours(),
        committed_hours: project.committed_hours(),
        fully_staffed: project.is_fully_staffed(),
        commitments,
    }
}

// -- Handlers --

/// POST /projects — register a new project.
#[tracing::instrument(skip(state, req))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterProjectRequest>,
) -> Result<(StatusCode, Json<ProjectResponse>), ApiError> {
    let cmd = RegisterProject::new(req.name, req.description, req.required_hours);
    let project = state.project_service.register(cmd).await?;

    Ok((StatusCode::CREATED, Json(project_response(&project))))
}

/// GET /projects/:id — load a project with its commitments.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ProjectResponse>, ApiError> {
    let project_id = parse_project_id(&id)?;
    let project = state
        .project_service
        .get(project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Project {id} not found")))?;

    Ok(Json(project_response(&project)))
}

/// POST /projects/:id/join — commit a freelancer to a project.
///
/// Returns 202: the commitment is recorded immediately, but capacity is
/// reconciled asynchronously. A later shortfall removes the freelancer from
/// the committed list instead of failing this request.
#[tracing::instrument(skip(state, req))]
pub async fn join(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<JoinProjectRequest>,
) -> Result<(StatusCode, Json<JoinAcceptedResponse>), ApiError> {
    let project_id = parse_project_id(&id)?;
    let freelancer_uuid = uuid::Uuid::parse_str(&req.freelancer_id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid freelancer id: {e}")))?;
    let freelancer_id = FreelancerId::from_uuid(freelancer_uuid);

    state
        .project_service
        .join(JoinProject::new(project_id, freelancer_id, req.hours))
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(JoinAcceptedResponse {
            project_id: project_id.to_string(),
            freelancer_id: freelancer_id.to_string(),
            allocated_hours: req.hours,
        }),
    ))
}

fn parse_project_id(id: &str) -> Result<ProjectId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid project id: {e}")))?;
    Ok(ProjectId::from_uuid(uuid))
}
