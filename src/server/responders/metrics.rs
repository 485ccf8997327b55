use crate::metrics::get_metrics;
use ntex::web::HttpResponse;
use tracing::error;

pub async fn metrics() -> HttpResponse {
    let Some(metrics) = get_metrics() else {
        return HttpResponse::ServiceUnavailable().body("metrics not initialized");
    };

    match metrics.encode() {
        Ok(text) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(text),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            HttpResponse::InternalServerError().body(e.to_string())
        }
    }
}
