use crate::controller::RunController;
use crate::errors::RunError;
use ntex::web::types::{Json, State};
use ntex::web::HttpResponse;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct StartRequest {
    /// Highest block to process, the latest block when absent
    pub start: Option<i64>,
    pub count: i64,
}

fn error_response(e: RunError) -> HttpResponse {
    let body = json!({ "error": e.to_string() });

    match e {
        RunError::InvalidRunRequest { .. } => HttpResponse::BadRequest().json(&body),
        RunError::ResetWhileRunning => HttpResponse::Conflict().json(&body),
        RunError::LatestBlock(_) => HttpResponse::BadGateway().json(&body),
    }
}

pub async fn state(controller: State<Arc<RunController>>) -> HttpResponse {
    HttpResponse::Ok().json(&controller.get_state().await)
}

pub async fn start(
    controller: State<Arc<RunController>>,
    request: Json<StartRequest>,
) -> HttpResponse {
    let result = match request.start {
        Some(start) => controller.start(start, request.count).await,
        None => controller.start_from_latest(request.count).await,
    };

    match result {
        Ok(outcome) => HttpResponse::Ok().json(&json!({ "outcome": outcome })),
        Err(e) => error_response(e),
    }
}

pub async fn stop(controller: State<Arc<RunController>>) -> HttpResponse {
    let stopping = controller.stop().await;
    HttpResponse::Ok().json(&json!({ "stopping": stopping }))
}

pub async fn reset(controller: State<Arc<RunController>>) -> HttpResponse {
    match controller.reset().await {
        Ok(()) => HttpResponse::Ok().json(&json!({ "reset": true })),
        Err(e) => error_response(e),
    }
}

pub async fn blocks(controller: State<Arc<RunController>>) -> HttpResponse {
    HttpResponse::Ok().json(&controller.snapshot().await)
}
