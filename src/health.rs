use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::json;
use std::path::Path;

pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let metrics = state.get_metrics_snapshot();
    let config = &state.config;

    let recordings_ok = state.recordings.dir().is_dir();
    let alerts_ok = state.alerts.dir().is_dir();
    let status = if recordings_ok && alerts_ok { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(json!({
        "status": status,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": state.get_uptime_seconds(),
        "service": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "host": config.server.host,
            "port": config.server.port
        },
        "storage": {
            "recordings": directory_status(state.recordings.dir()),
            "alerts": directory_status(state.alerts.dir()),
            "public": directory_status(&state.paths.public)
        },
        "metrics": {
            "total_requests": metrics.request_count,
            "total_errors": metrics.error_count,
            "error_rate": metrics.error_rate()
        }
    }))
}

pub async fn detailed_metrics(state: web::Data<AppState>) -> HttpResponse {
    let metrics = state.get_metrics_snapshot();
    let uptime_seconds = state.get_uptime_seconds();

    let mut endpoint_stats = Vec::new();
    for (endpoint, metric) in metrics.endpoint_metrics.iter() {
        endpoint_stats.push(json!({
            "endpoint": endpoint,
            "request_count": metric.request_count,
            "error_count": metric.error_count,
            "error_rate": metric.error_rate(),
            "average_duration_ms": metric.average_duration_ms(),
            "total_duration_ms": metric.total_duration_ms
        }));
    }

    HttpResponse::Ok().json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_seconds,
        "overall": {
            "total_requests": metrics.request_count,
            "total_errors": metrics.error_count,
            "error_rate": metrics.error_rate(),
            "requests_per_second": if uptime_seconds > 0 {
                metrics.request_count as f64 / uptime_seconds as f64
            } else {
                0.0
            }
        },
        "storage": {
            "recordings_stored": metrics.recordings_stored,
            "recording_bytes": metrics.recording_bytes,
            "upload_failures": metrics.upload_failures,
            "alerts_stored": metrics.alerts_stored,
            "alert_failures": metrics.alert_failures
        },
        "endpoints": endpoint_stats
    }))
}

fn directory_status(dir: &Path) -> serde_json::Value {
    json!({
        "path": dir.display().to_string(),
        "available": dir.is_dir()
    })
}
