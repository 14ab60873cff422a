//! # Quick Shield Alert Handler
//!
//! ## Endpoint: `POST /quick-shield`
//!
//! ## Request:
//! ```json
//! { "userId": "alice" }
//! ```
//! `userId` is optional. An empty body counts as `{}`.
//!
//! ## Response:
//! ```json
//! {
//!   "success": true,
//!   "message": "Quick Shield alert received",
//!   "alert": {
//!     "userId": "alice",
//!     "timestamp": "2025-01-01T12:00:00.000Z",
//!     "status": "Quick Shield Activated"
//!   }
//! }
//! ```
//! If the alert cannot be written the response is a 500 with
//! `{"success": false, "error": "Could not save alert"}`.

use crate::error::{AppError, AppResult};
use crate::records::{AlertRecord, QuickShieldRequest};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

pub const ALERT_RECEIVED: &str = "Quick Shield alert received";

const SAVE_FAILED: &str = "Could not save alert";

#[derive(Debug, Serialize, Deserialize)]
pub struct AlertResponse {
    pub success: bool,
    pub message: String,
    pub alert: AlertRecord,
}

/// The body is taken as raw bytes so that a request without a JSON
/// content type, or with no body at all, still raises an alert.
pub async fn quick_shield(state: web::Data<AppState>, body: web::Bytes) -> AppResult<HttpResponse> {
    let request = parse_request(&body)?;
    let alert = AlertRecord::from_request(request, Utc::now());

    let stored = match state.alerts.save(&alert).await {
        Ok(stored) => stored,
        Err(e) => {
            state.record_alert_failure();
            error!(error = %e, user_id = %alert.user_id, "Error saving quick-shield alert");
            return Err(AppError::storage(SAVE_FAILED, e));
        }
    };

    state.record_alert_stored();
    info!(
        user_id = %alert.user_id,
        timestamp = %alert.timestamp,
        status = %alert.status,
        file = %stored.path.display(),
        "Quick Shield Activated"
    );

    Ok(HttpResponse::Ok().json(AlertResponse {
        success: true,
        message: ALERT_RECEIVED.to_string(),
        alert,
    }))
}

fn parse_request(body: &[u8]) -> AppResult<QuickShieldRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(QuickShieldRequest::default());
    }
    Ok(serde_json::from_slice(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{GUEST_USER_ID, QUICK_SHIELD_STATUS};
    use crate::test_support::{init_app, temp_state};
    use actix_web::{http::StatusCode, test};
    use chrono::DateTime;

    fn alert_files(state: &AppState) -> Vec<std::path::PathBuf> {
        std::fs::read_dir(&state.paths.alerts)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect()
    }

    #[actix_web::test]
    async fn alert_for_named_user_is_persisted_and_echoed() {
        let (_root, state) = temp_state();
        let app = init_app!(state);
        let before = Utc::now();

        let req = test::TestRequest::post()
            .uri("/quick-shield")
            .set_json(serde_json::json!({ "userId": "alice" }))
            .to_request();
        let resp: AlertResponse = test::call_and_read_body_json(&app, req).await;

        assert!(resp.success);
        assert_eq!(resp.message, ALERT_RECEIVED);
        assert_eq!(resp.alert.user_id, "alice");
        assert_eq!(resp.alert.status, QUICK_SHIELD_STATUS);

        let stamped = DateTime::parse_from_rfc3339(&resp.alert.timestamp)
            .unwrap()
            .with_timezone(&Utc);
        assert!(stamped >= before - chrono::Duration::milliseconds(1));
        assert!(resp.alert.timestamp.ends_with('Z'));

        let files = alert_files(&state);
        assert_eq!(files.len(), 1);
        let name = files[0].file_name().unwrap().to_string_lossy().into_owned();
        let digits = name
            .strip_prefix("alert-")
            .and_then(|rest| rest.strip_suffix(".json"))
            .unwrap();
        assert!(digits.chars().all(|c| c.is_ascii_digit()));

        let on_disk: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&files[0]).unwrap()).unwrap();
        assert_eq!(on_disk, serde_json::to_value(&resp.alert).unwrap());
    }

    #[actix_web::test]
    async fn empty_object_defaults_to_guest() {
        let (_root, state) = temp_state();
        let app = init_app!(state);

        let req = test::TestRequest::post()
            .uri("/quick-shield")
            .set_json(serde_json::json!({}))
            .to_request();
        let resp: AlertResponse = test::call_and_read_body_json(&app, req).await;

        assert_eq!(resp.alert.user_id, GUEST_USER_ID);
    }

    #[actix_web::test]
    async fn bodyless_request_defaults_to_guest() {
        let (_root, state) = temp_state();
        let app = init_app!(state);

        let req = test::TestRequest::post().uri("/quick-shield").to_request();
        let resp: AlertResponse = test::call_and_read_body_json(&app, req).await;

        assert_eq!(resp.alert.user_id, GUEST_USER_ID);
        assert_eq!(alert_files(&state).len(), 1);
    }

    #[actix_web::test]
    async fn client_cannot_set_status() {
        let (_root, state) = temp_state();
        let app = init_app!(state);

        let req = test::TestRequest::post()
            .uri("/quick-shield")
            .set_json(serde_json::json!({ "userId": "mallory", "status": "Cancelled" }))
            .to_request();
        let resp: AlertResponse = test::call_and_read_body_json(&app, req).await;

        assert_eq!(resp.alert.status, QUICK_SHIELD_STATUS);
    }

    #[actix_web::test]
    async fn malformed_json_is_rejected() {
        let (_root, state) = temp_state();
        let app = init_app!(state);

        let req = test::TestRequest::post()
            .uri("/quick-shield")
            .insert_header(("content-type", "application/json"))
            .set_payload("{\"userId\": ")
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(alert_files(&state).is_empty());
    }

    #[actix_web::test]
    async fn failed_write_returns_fixed_500_and_leaves_no_file() {
        let (_root, state) = temp_state();
        std::fs::remove_dir_all(&state.paths.alerts).unwrap();
        let app = init_app!(state);

        let req = test::TestRequest::post()
            .uri("/quick-shield")
            .set_json(serde_json::json!({ "userId": "alice" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body, serde_json::json!({ "success": false, "error": "Could not save alert" }));
        assert!(!state.paths.alerts.exists());
        assert_eq!(state.get_metrics_snapshot().alert_failures, 1);

        // The server keeps answering once storage is back.
        std::fs::create_dir_all(&state.paths.alerts).unwrap();
        let req = test::TestRequest::post().uri("/quick-shield").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
