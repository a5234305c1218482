//! Freelancer registration and query endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::FreelancerId;
use domain::RegisterFreelancer;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct RegisterFreelancerRequest {
    pub name: String,
    pub weekly_availability: u32,
    /// Optional client-supplied ID; generated when absent.
    pub freelancer_id: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct FreelancerResponse {
    pub id: String,
    pub name: String,
    pub weekly_availability: u32,
    pub version: i64,
}

// -- Handlers --

/// POST /freelancers — register a new freelancer.
#[tracing::instrument(skip(state, req))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterFreelancerRequest>,
) -> Result<(StatusCode, Json<FreelancerResponse>), ApiError> {
    let cmd = match req.freelancer_id {
        Some(ref id_str) => {
            let id = parse_freelancer_id(id_str)?;
            RegisterFreelancer::with_id(id, req.name, req.weekly_availability)
        }
        None => RegisterFreelancer::new(req.name, req.weekly_availability),
    };

    let freelancer = state.freelancer_service.register(cmd).await?;

    Ok((
        StatusCode::CREATED,
        Json(FreelancerResponse {
            id: freelancer.id().to_string(),
            name: freelancer.name().to_string(),
            weekly_availability: freelancer.weekly_availability(),
            version: freelancer.version().as_i64(),
        }),
    ))
}

/// GET /freelancers/:id — load a freelancer by ID.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<FreelancerResponse>, ApiError> {
    let freelancer_id = parse_freelancer_id(&id)?;
    let freelancer = state
        .freelancer_service
        .get(freelancer_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Freelancer {id} not found")))?;

    Ok(Json(FreelancerResponse {
        id: freelancer.id().to_string(),
        name: freelancer.name().to_string(),
        weekly_availability: freelancer.weekly_availability(),
        version: freelancer.version().as_i64(),
    }))
}

fn parse_freelancer_id(id: &str) -> Result<FreelancerId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid freelancer id: {e}")))?;
    Ok(FreelancerId::from_uuid(uuid))
}
