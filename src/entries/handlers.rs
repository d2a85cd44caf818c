use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use tracing::info;

use crate::auth::handlers::authenticated_user;
use crate::entries::{history_series, EntryRequest, DEFAULT_HISTORY_SAMPLES};
use crate::error::AppError;
use crate::AppState;

/// `POST /entry`
///
/// The body is parsed only after the caller is authenticated.
pub async fn create_entry(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let authed = authenticated_user(&req, &state).await?;
    let request: EntryRequest = serde_json::from_slice(&body)
        .map_err(|e| AppError::ValidationError(format!("invalid entry body: {}", e)))?;
    let new_entry = request.into_new_entry(authed.user_id, &state.config.training)?;

    let entry = state.entries.create_entry(&new_entry).await?;
    info!(
        "User {} recorded {} points on {}",
        authed.user_id, entry.points, entry.date
    );
    Ok(HttpResponse::Created().json(entry))
}

fn default_samples() -> NonZeroUsize {
    NonZeroUsize::new(DEFAULT_HISTORY_SAMPLES).unwrap_or(NonZeroUsize::MIN)
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_samples")]
    pub samples: NonZeroUsize,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub entries: usize,
    pub points: Vec<f64>,
}

/// `GET /entries/history?samples=N`
pub async fn history(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let authed = authenticated_user(&req, &state).await?;
    let query = web::Query::<HistoryQuery>::from_query(req.query_string())
        .map_err(|e| AppError::ValidationError(e.to_string()))?;
    let entries = state.entries.list_entries(authed.user_id).await?;
    let points = history_series(&entries, query.samples)?;

    Ok(HttpResponse::Ok().json(HistoryResponse {
        entries: entries.len(),
        points,
    }))
}
