use crate::analytics::LeadAnalytics;
use crate::bulk::{self, Confirmed};
use crate::errors::AppError;
use crate::leads::LeadService;
use crate::models::{BulkActionRequest, BulkActionResult, CreateLeadRequest, Lead, LeadUpdate};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::{Stream, StreamExt};
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Lead Record API operations (store + scoring provider).
    pub leads: LeadService,
}

/// Parses a path id; anything that is not a UUID cannot name a lead.
fn parse_lead_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(format!("Lead {} not found", raw)))
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "lead-scoring-api",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// GET /leads
///
/// All leads ordered by creation time, newest first.
pub async fn list_leads(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Lead>>, AppError> {
    tracing::info!("GET /leads");
    let leads = state.leads.list().await?;
    Ok(Json(leads))
}

/// POST /leads
///
/// Scores and stores a new lead. Returns 201 with the created record,
/// 400 when a required field is missing.
pub async fn create_lead(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateLeadRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Lead>), AppError> {
    let Json(request) = payload?;
    tracing::info!(
        "POST /leads - company: {:?}, industry: {:?}",
        request.company_name,
        request.industry
    );

    let lead = state.leads.create(request).await?;

    tracing::info!(
        "Created lead {} (score: {:?}, priority: {:?})",
        lead.id,
        lead.ai_score,
        lead.ai_priority
    );
    Ok((StatusCode::CREATED, Json(lead)))
}

/// GET /leads/:id
pub async fn get_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Lead>, AppError> {
    tracing::info!("GET /leads/{}", id);
    let id = parse_lead_id(&id)?;
    Ok(Json(state.leads.get(id).await?))
}

/// PUT /leads/:id
///
/// Merges the partial body into the stored lead. Scoring fields are ignored.
pub async fn update_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<LeadUpdate>, JsonRejection>,
) -> Result<Json<Lead>, AppError> {
    tracing::info!("PUT /leads/{}", id);
    let id = parse_lead_id(&id)?;
    let Json(update) = payload?;
    Ok(Json(state.leads.update(id, update).await?))
}

/// DELETE /leads/:id
///
/// Always 204 unless the store fails, including for ids that do not exist.
pub async fn delete_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    tracing::info!("DELETE /leads/{}", id);
    if let Ok(id) = Uuid::parse_str(&id) {
        state.leads.delete(id).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

/// GET /analytics
///
/// Dashboard aggregates computed over a full scan of the table.
pub async fn get_analytics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<LeadAnalytics>, AppError> {
    let leads = state.leads.list().await?;
    Ok(Json(LeadAnalytics::from_leads(&leads)))
}

/// GET /events/leads
///
/// Server-Sent Events stream with one `leads-changed` event per table change.
pub async fn lead_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::info!("New lead change subscriber");
    let stream = BroadcastStream::new(state.leads.store().subscribe()).filter_map(
        |change| async move {
            match change {
                Ok(change) => Event::default()
                    .event("leads-changed")
                    .json_data(change)
                    .ok()
                    .map(Ok::<Event, Infallible>),
                Err(e) => {
                    // Lagged subscribers still need to refetch.
                    tracing::warn!("Lead change subscriber lagged: {}", e);
                    Some(Ok::<Event, Infallible>(
                        Event::default().event("leads-changed").data("{}"),
                    ))
                }
            }
        },
    );

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn confirmation(
    payload: Result<Json<BulkActionRequest>, JsonRejection>,
) -> Result<Confirmed, AppError> {
    let confirmed = payload.map(|Json(body)| body.confirm).unwrap_or(false);
    Confirmed::from_answer(confirmed)
}

/// POST /admin/leads/clear
///
/// Requires `{"confirm": true}`.
pub async fn clear_leads(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BulkActionRequest>, JsonRejection>,
) -> Result<Json<BulkActionResult>, AppError> {
    tracing::warn!("POST /admin/leads/clear");
    let confirmed = confirmation(payload)?;
    let result = bulk::clear_all(state.leads.store().as_ref(), confirmed).await?;
    Ok(Json(result))
}

/// POST /admin/leads/reset
///
/// Requires `{"confirm": true}`.
pub async fn reset_leads(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BulkActionRequest>, JsonRejection>,
) -> Result<Json<BulkActionResult>, AppError> {
    tracing::warn!("POST /admin/leads/reset");
    let confirmed = confirmation(payload)?;
    let result = bulk::reset_to_demo_data(state.leads.store().as_ref(), confirmed).await?;
    Ok(Json(result))
}
