//! Operator endpoints for inspecting the publication ledger.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use chrono::{DateTime, Utc};
use ledger::{DispatchState, EventLedger, EventLedgerExt, LedgerEntry};
use serde::Serialize;

use crate::AppState;
use crate::error::ApiError;

#[derive(Serialize)]
pub struct LedgerEntryResponse {
    pub event_id: String,
    pub event_type: String,
    pub owner_id: String,
    pub produced_at: DateTime<Utc>,
    pub state: String,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub next_attempt_at: Option<DateTime<Utc>>,
}

fn entry_response(entry: &LedgerEntry) -> LedgerEntryResponse {
    LedgerEntryResponse {
        event_id: entry.event_id.to_string(),
        event_type: entry.event_type.clone(),
        owner_id: entry.owner_id.to_string(),
        produced_at: entry.produced_at,
        state: entry.state.to_string(),
        attempts: entry.attempts,
        last_error: entry.last_error.clone(),
        next_attempt_at: entry.next_attempt_at,
    }
}

/// GET /ledger/pending — entries awaiting their first delivery.
#[tracing::instrument(skip(state))]
pub async fn pending(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<LedgerEntryResponse>>, ApiError> {
    let entries = state.ledger.entries_in_state(DispatchState::Pending).await?;
    Ok(Json(entries.iter().map(entry_response).collect()))
}

/// GET /ledger/failed — dead-lettered entries awaiting operator action.
#[tracing::instrument(skip(state))]
pub async fn failed(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<LedgerEntryResponse>>, ApiError> {
    let entries = state.ledger.dead_letters().await?;
    Ok(Json(entries.iter().map(entry_response).collect()))
}
