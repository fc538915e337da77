//! Request handlers for `/health` and `/workflow`.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info, warn};

use hot_topic_core::events::DEVELOPER_HOT_TOPIC_WORKFLOW;
use hot_topic_core::types::TopicQuery;
use hot_topic_workflow::LookupError;

use crate::relay::stream_run;
use crate::state::GatewayState;

/// Body accepted by `POST /workflow`.
#[derive(Debug, Default, Deserialize)]
pub struct WorkflowRequest {
    #[serde(default)]
    pub target_date: Option<String>,
}

fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn json_response(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

pub async fn health_get() -> Response {
    json_response(
        StatusCode::OK,
        json!({
            "status": "ok",
            "timestamp": timestamp(),
            "message": "Health check API is working",
        }),
    )
}

/// Echo the posted JSON along with the deployment flags.
pub async fn health_post(State(state): State<Arc<GatewayState>>, body: Bytes) -> Response {
    match serde_json::from_slice::<Value>(&body) {
        Ok(received) => json_response(
            StatusCode::OK,
            json!({
                "status": "ok",
                "timestamp": timestamp(),
                "message": "POST method is working",
                "receivedData": received,
                "environment": state.env,
            }),
        ),
        Err(e) => json_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "status": "error", "message": e.to_string() }),
        ),
    }
}

/// Validate the request, resolve the workflow and stream the run.
pub async fn run_workflow(State(state): State<Arc<GatewayState>>, body: Bytes) -> Response {
    let env = &state.env;
    if env.is_hosted() {
        info!(
            app_env = ?env.app_env,
            platform = ?env.platform,
            platform_env = ?env.platform_env,
            "Workflow request received"
        );
    } else {
        info!("Workflow request received");
    }

    let request = match serde_json::from_slice::<WorkflowRequest>(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "Malformed workflow request");
            return json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": e.to_string() }),
            );
        }
    };

    if state.config.debug_skip_pipeline() {
        warn!("Debug mode: skipping pipeline");
        return json_response(
            StatusCode::OK,
            json!({
                "message": "Debug mode: pipeline skipped",
                "target_date": request.target_date,
                "timestamp": timestamp(),
            }),
        );
    }

    let query = match TopicQuery::from_optional_str(request.target_date.as_deref()) {
        Ok(query) => query,
        Err(e) => {
            warn!(error = %e, "Invalid target date");
            return json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": e.to_string() }),
            );
        }
    };

    let runner = match state.workflows.get(DEVELOPER_HOT_TOPIC_WORKFLOW) {
        Ok(runner) => runner,
        Err(LookupError::NotFound(id)) => {
            warn!(workflow = %id, "Workflow not registered");
            return json_response(
                StatusCode::NOT_FOUND,
                json!({ "error": "Workflow not found" }),
            );
        }
        Err(LookupError::Init(e)) => {
            error!(error = %e, "Workflow initialization failed");
            return json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "error": "Failed to initialize workflow",
                    "details": e.to_string(),
                }),
            );
        }
    };

    info!(workflow = runner.id(), target_date = ?query.target_date, "Starting workflow stream");
    stream_run(runner, query)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_date_is_optional() {
        let request: WorkflowRequest = serde_json::from_str("{}").unwrap();
        assert!(request.target_date.is_none());

        let request: WorkflowRequest =
            serde_json::from_str(r#"{"target_date":"2024-10-03"}"#).unwrap();
        assert_eq!(request.target_date.as_deref(), Some("2024-10-03"));
    }

    #[test]
    fn test_non_string_date_is_rejected() {
        assert!(serde_json::from_str::<WorkflowRequest>(r#"{"target_date":20241003}"#).is_err());
    }
}
