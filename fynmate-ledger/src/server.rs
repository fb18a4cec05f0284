//! HTTP query API over the SQLite store, plus a message endpoint that runs
//! the extraction pipeline for chat adapters.
//!
//! GET  /transactions[?uid=]        all records, newest first
//! GET  /transactions/today[?uid=]  records for the current local day
//! POST /transactions               insert a record, echo it back
//! POST /messages                   extract, persist, and return the reply text

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use fynmate_core::{TransactionRecord, UserContext, reply};
use fynmate_extract::{Outcome, Pipeline, Source};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

use crate::error::LedgerError;
use crate::store::{RecordSink, SqliteStore, StoredTransaction};

pub struct AppState {
    pub store: SqliteStore,
    pub pipeline: Arc<Pipeline>,
}

#[derive(Debug)]
pub enum ApiError {
    Ledger(LedgerError),
    Invalid(String),
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        ApiError::Ledger(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Ledger(e) => {
                error!(error = %e, "persistence failure");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            ApiError::Invalid(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
        };
        (status, Json(json!({ "status": "error", "message": message }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct UidQuery {
    pub uid: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub status: &'static str,
    pub data: Vec<StoredTransaction>,
    pub total_expense: u64,
    pub count: usize,
}

impl ListResponse {
    fn success(data: Vec<StoredTransaction>) -> Self {
        let total_expense = data.iter().map(|t| t.record.amount).fold(0u64, u64::saturating_add);
        Self {
            status: "success",
            count: data.len(),
            total_expense,
            data,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InsertResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub data: TransactionRecord,
}

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub user_id: i64,
    #[serde(default)]
    pub username: Option<String>,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// "success" or "rejected"
    pub status: &'static str,
    pub reply: String,
    pub data: Option<TransactionRecord>,
    pub source: Option<Source>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/transactions", get(list_transactions).post(add_transaction))
        .route("/transactions/", get(list_transactions).post(add_transaction))
        .route("/transactions/today", get(list_today))
        .route("/messages", post(handle_message))
        .with_state(state)
}

pub async fn serve(bind: SocketAddr, state: Arc<AppState>) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(%bind, "query API listening");
    axum::serve(listener, router(state)).await
}

/// GET /transactions
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Query(q): Query<UidQuery>,
) -> Result<Json<ListResponse>, ApiError> {
    let rows = state.store.list(q.uid).await?;
    Ok(Json(ListResponse::success(rows)))
}

/// GET /transactions/today
pub async fn list_today(
    State(state): State<Arc<AppState>>,
    Query(q): Query<UidQuery>,
) -> Result<Json<ListResponse>, ApiError> {
    let today = state.pipeline.policy().today();
    let rows = state.store.list_on_day(today, q.uid).await?;
    Ok(Json(ListResponse::success(rows)))
}

/// POST /transactions
pub async fn add_transaction(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TransactionRecord>, JsonRejection>,
) -> Result<Json<InsertResponse>, ApiError> {
    let Json(record) = payload.map_err(|e| ApiError::Invalid(e.body_text()))?;
    state.store.insert(&record).await?;
    Ok(Json(InsertResponse {
        status: "success",
        message: "Transaction added successfully",
        data: record,
    }))
}

/// POST /messages
pub async fn handle_message(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MessageRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::Invalid(e.body_text()))?;
    let user = UserContext::new(req.user_id, req.username);

    let outcome = state.pipeline.process(&req.text, &user).await;
    match &outcome {
        Outcome::Accepted {
            candidate,
            source,
            fallback_reason,
            ..
        } => {
            if let Some(reason) = fallback_reason {
                info!(user_id = user.user_id, %reason, "used fallback parser");
            }
            let record = TransactionRecord::from_candidate(candidate, &user);
            state.store.insert(&record).await?;
            Ok(Json(MessageResponse {
                status: "success",
                reply: reply::confirmation(candidate),
                data: Some(record),
                source: Some(*source),
            }))
        }
        Outcome::Rejected { reason, .. } => {
            info!(user_id = user.user_id, %reason, "message rejected");
            Ok(Json(MessageResponse {
                status: "rejected",
                reply: reply::REJECTION.to_string(),
                data: None,
                source: None,
            }))
        }
    }
}
