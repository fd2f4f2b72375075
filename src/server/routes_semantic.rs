use crate::server::AppContext;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use scenegen_common::{ApiReply, ConversionParams, StatusReport};

/// Routes under `/api/semantic`.
pub fn semantic_routes() -> Router<AppContext> {
    Router::new()
        .route("/startexe", post(start_exe))
        .route("/generate", get(generate))
        .route("/getgenprogressval", get(get_progress))
        .route("/stopgenprogressval", get(stop_progress))
}

/// Callback route used by the converter's supervisor, mounted at `/semantic`.
pub fn callback_routes() -> Router<AppContext> {
    Router::new().route("/statu", post(report_status))
}

fn rejected(message: String) -> (StatusCode, Json<ApiReply>) {
    (StatusCode::BAD_REQUEST, Json(ApiReply::new(-1, message)))
}

async fn start_exe(State(ctx): State<AppContext>, body: Bytes) -> (StatusCode, Json<ApiReply>) {
    let params = match ConversionParams::from_slice(&body) {
        Ok(params) => params,
        Err(e) => {
            tracing::warn!("Rejected semantic start request: {}", e);
            return rejected(e.to_string());
        }
    };

    (StatusCode::OK, Json(ctx.semantic.start(&params).await))
}

async fn generate(State(ctx): State<AppContext>) -> Json<ApiReply> {
    Json(ctx.semantic.generate())
}

async fn report_status(
    State(ctx): State<AppContext>,
    body: Bytes,
) -> (StatusCode, Json<ApiReply>) {
    let report: StatusReport = match serde_json::from_slice(&body) {
        Ok(report) => report,
        Err(e) => {
            tracing::warn!("Rejected malformed converter report: {}", e);
            return rejected(format!("Invalid status report: {}", e));
        }
    };

    (StatusCode::OK, Json(ctx.semantic.report(&report)))
}

async fn get_progress(State(ctx): State<AppContext>) -> Json<ApiReply> {
    Json(ctx.semantic.progress())
}

async fn stop_progress(State(ctx): State<AppContext>) -> Json<ApiReply> {
    Json(ctx.semantic.stop())
}
