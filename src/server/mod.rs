//! The HTTP interface, served by `pillar serve`.
//!
//! Handlers are thin: they decode the request, call the matching command and encode its
//! structured output as JSON. Errors are rendered as `{"error": ..., "error_code": ...}` with a
//! status code derived from the `ErrorType`.

use crate::commands::{self, Out, Suggestions};
use crate::error::{Error, ErrorType};
use crate::model::{EntryChanges, EntryFilter, LedgerEntry, NewEntry};
use crate::report::{self, Digest, Summary};
use crate::settlement::{Deletion, SettleRequest, Settlement};
use crate::{Config, Result};
use anyhow::Context;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

#[derive(Debug, Clone)]
struct AppState {
    config: Arc<Config>,
}

/// The body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: ErrorType,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match self.kind() {
            ErrorType::NotFound => StatusCode::NOT_FOUND,
            ErrorType::Validation => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("Request failed: {self}");
        } else {
            debug!("Request rejected: {self}");
        }
        let body = ErrorResponse {
            error: self.to_string(),
            error_code: self.kind(),
        };
        (status, Json(body)).into_response()
    }
}

/// Builds the application router.
pub fn router(config: Config) -> Router {
    let state = AppState {
        config: Arc::new(config),
    };
    Router::new()
        .route("/health", get(health))
        .nest(
            "/api",
            Router::new()
                .route("/entries", get(list_entries).post(create_entry))
                .route("/entries/:id", patch(edit_entry).delete(delete_entry))
                .route("/entries/:id/settle", post(settle_entry))
                .route("/entries/:id/reverse", post(reverse_entry))
                .route("/summary", get(summary))
                .route("/digest", get(digest))
                .route("/report.csv", get(report_csv))
                .route("/suggestions", get(suggestions)),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves the API on `bind_address` until the process receives Ctrl-C.
pub async fn run(config: Config, bind_address: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_address)
        .await
        .with_context(|| format!("Unable to listen on {bind_address}"))?;
    info!("Listening on http://{bind_address}");
    axum::serve(listener, router(config))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("The HTTP server failed")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Unable to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

/// Unwraps the structured output of a command.
fn structure<T>(out: Out<T>) -> Result<T>
where
    T: Serialize + Clone + Debug,
{
    debug!("{}", out.message());
    out.into_structure().ok_or_else(|| {
        Error::new(
            ErrorType::Internal,
            anyhow::anyhow!("The command produced no data"),
        )
    })
}

fn json_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| Error::validation(e.body_text()))
}

fn query<T>(params: std::result::Result<Query<T>, QueryRejection>) -> Result<T> {
    params
        .map(|Query(q)| q)
        .map_err(|e| Error::validation(e.body_text()))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn list_entries(
    State(state): State<AppState>,
    filter: std::result::Result<Query<EntryFilter>, QueryRejection>,
) -> Result<Json<Vec<LedgerEntry>>> {
    let out = commands::list(&state.config, query(filter)?).await?;
    Ok(Json(structure(out)?))
}

async fn create_entry(
    State(state): State<AppState>,
    payload: std::result::Result<Json<NewEntry>, JsonRejection>,
) -> Result<(StatusCode, Json<LedgerEntry>)> {
    let out = commands::create(&state.config, json_body(payload)?).await?;
    Ok((StatusCode::CREATED, Json(structure(out)?)))
}

async fn edit_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<EntryChanges>, JsonRejection>,
) -> Result<Json<LedgerEntry>> {
    let out = commands::edit(&state.config, &id, json_body(payload)?).await?;
    Ok(Json(structure(out)?))
}

async fn delete_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Deletion>> {
    let out = commands::delete(&state.config, &id).await?;
    Ok(Json(structure(out)?))
}

async fn settle_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<SettleRequest>, JsonRejection>,
) -> Result<Json<Settlement>> {
    let out = commands::settle(&state.config, &id, json_body(payload)?).await?;
    Ok(Json(structure(out)?))
}

async fn reverse_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<LedgerEntry>> {
    let out = commands::reverse(&state.config, &id).await?;
    Ok(Json(structure(out)?))
}

async fn summary(
    State(state): State<AppState>,
    filter: std::result::Result<Query<EntryFilter>, QueryRejection>,
) -> Result<Json<Summary>> {
    let out = commands::summary(&state.config, query(filter)?).await?;
    Ok(Json(structure(out)?))
}

async fn suggestions(State(state): State<AppState>) -> Result<Json<Suggestions>> {
    let out = commands::suggestions(&state.config).await?;
    Ok(Json(structure(out)?))
}

#[derive(Debug, Default, Deserialize)]
struct DigestQuery {
    #[serde(default)]
    as_of: Option<NaiveDate>,
}

async fn digest(
    State(state): State<AppState>,
    params: std::result::Result<Query<DigestQuery>, QueryRejection>,
) -> Result<Json<Digest>> {
    let as_of = query(params)?
        .as_of
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    let out = commands::digest(&state.config, as_of).await?;
    Ok(Json(structure(out)?))
}

async fn report_csv(
    State(state): State<AppState>,
    filter: std::result::Result<Query<EntryFilter>, QueryRejection>,
) -> Result<impl IntoResponse> {
    let (csv, totals) = report::render_csv(state.config.db(), &query(filter)?).await?;
    debug!("Rendered {} report row(s)", totals.rows);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"report.csv\"",
            ),
        ],
        csv,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::LedgerStore;
    use crate::test::TestEnv;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn send(
        app: Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Vec<u8>) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(v) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(v.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    async fn send_json(
        app: Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let (status, bytes) = send(app, method, uri, body).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn due() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let env = TestEnv::new().await;
        let (status, body) = send_json(router(env.config()), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_suggestions() {
        let env = TestEnv::new().await;
        let (status, body) =
            send_json(router(env.config()), "GET", "/api/suggestions", None).await;
        assert_eq!(status, StatusCode::OK);
        let categories = body["categories"].as_array().unwrap();
        assert!(categories.iter().any(|c| c == "COMBUSTIVEL"));
        assert!(body["payment_methods"].as_array().unwrap().len() > 1);
        assert_eq!(body["default_bank"], Value::Null);
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let env = TestEnv::new().await;
        let app = router(env.config());
        let (status, created) = send_json(
            app.clone(),
            "POST",
            "/api/entries",
            Some(json!({
                "description": "Frete",
                "amount": "1.500,00",
                "flow": "SAIDA",
                "category": "SERVICOS",
                "due_date": "2026-02-10"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["status"], "PENDING");
        assert_eq!(created["amount"], "1500.00");
        assert_eq!(created["bank"], "AWAITING");

        let (status, list) =
            send_json(app, "GET", "/api/entries?search=frete&flow=OUTFLOW", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn test_create_missing_fields_is_bad_request() {
        let env = TestEnv::new().await;
        let (status, body) = send_json(
            router(env.config()),
            "POST",
            "/api/entries",
            Some(json!({ "description": "Frete" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_code"], "validation");
    }

    #[tokio::test]
    async fn test_settle_split_over_http() {
        let env = TestEnv::new().await;
        env.insert_pending("truck", "Truck", "1200.00", due()).await;
        let app = router(env.config());

        let (status, body) = send_json(
            app.clone(),
            "POST",
            "/api/entries/truck/settle",
            Some(json!({
                "payment_date": "2026-01-31",
                "installments": "3",
                "bank": "ITAU",
                "payment_method": "BOLETO"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "split");
        assert_eq!(body["count"], 3);
        assert_eq!(body["entries"][1]["due_date"], "2026-03-03");
        assert_eq!(body["entries"][2]["due_date"], "2026-03-31");

        let (status, _) = send_json(app, "POST", "/api/entries/truck/settle", Some(json!({
            "payment_date": "2026-01-31",
            "bank": "ITAU",
            "payment_method": "PIX"
        })))
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_settle_in_full_then_reverse() {
        let env = TestEnv::new().await;
        env.insert_pending("e1", "Diesel", "300", due()).await;
        let app = router(env.config());

        let (status, body) = send_json(
            app.clone(),
            "POST",
            "/api/entries/e1/settle",
            Some(json!({
                "payment_date": "2026-01-05",
                "installments": 1,
                "bank": "CAIXA",
                "payment_method": "PIX"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "paid");
        assert_eq!(body["entry"]["id"], "e1");
        assert_eq!(body["entry"]["status"], "PAID");

        let (status, body) = send_json(app.clone(), "POST", "/api/entries/e1/reverse", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "PENDING");
        assert_eq!(body["payment_method"], "TBD");

        let (status, _) = send_json(app, "POST", "/api/entries/nope/reverse", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_settle_bad_json_is_bad_request() {
        let env = TestEnv::new().await;
        env.insert_pending("e1", "Diesel", "300", due()).await;
        let (status, body) = send_json(
            router(env.config()),
            "POST",
            "/api/entries/e1/settle",
            Some(json!({ "payment_date": "not a date", "bank": "ITAU" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_code"], "validation");
    }

    #[tokio::test]
    async fn test_edit_and_delete() {
        let env = TestEnv::new().await;
        env.insert_pending("e1", "Diesel", "300", due()).await;
        let config = env.config();
        let app = router(config.clone());

        let (status, body) = send_json(
            app.clone(),
            "PATCH",
            "/api/entries/e1",
            Some(json!({ "category": "COMBUSTIVEL" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["category"], "COMBUSTIVEL");

        let (status, _) = send_json(app.clone(), "PATCH", "/api/entries/e1", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send_json(app.clone(), "DELETE", "/api/entries/e1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["removed"], 1);

        let (status, body) = send_json(app, "DELETE", "/api/entries/e1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["removed"], 0);
        assert!(config.db().find("e1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_summary_digest_and_report() {
        let env = TestEnv::new().await;
        env.insert_pending("e1", "Diesel", "300", due()).await;
        env.insert_pending("e2", "Pneus", "700", due() + chrono::Days::new(60))
            .await;
        let app = router(env.config());

        let (status, body) = send_json(app.clone(), "GET", "/api/summary", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pending_total"], "1000");
        assert_eq!(body["count"], 2);

        let (status, body) =
            send_json(app.clone(), "GET", "/api/digest?as_of=2026-01-15", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["due"].as_array().map(Vec::len), Some(1));
        assert_eq!(body["due"][0]["id"], "e1");

        let (status, bytes) = send(app, "GET", "/api/report.csv?category=OUTROS", None).await;
        assert_eq!(status, StatusCode::OK);
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("Date,Description,Category,Flow,Status,Amount"));
        assert_eq!(text.lines().count(), 3);
    }
}
