use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use scalpdesk_core::advisor::AdvisorError;
use scalpdesk_core::domain::request::ValidationError;
use scalpdesk_core::ledger::LedgerError;
use serde_json::json;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn unavailable(what: &str) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: format!("{what} is not configured"),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(e) = err.downcast_ref::<ValidationError>() {
            return Self {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                message: e.to_string(),
            };
        }
        if let Some(e) = err.downcast_ref::<LedgerError>() {
            let status = match e {
                LedgerError::NotFound { .. } => StatusCode::NOT_FOUND,
                LedgerError::InvalidTransition { .. } => StatusCode::CONFLICT,
            };
            return Self {
                status,
                message: e.to_string(),
            };
        }
        if let Some(e) = err.downcast_ref::<AdvisorError>() {
            tracing::warn!(flow = e.flow(), error = %e, "AI flow failed");
            return Self {
                status: StatusCode::BAD_GATEWAY,
                message: e.to_string(),
            };
        }

        sentry_anyhow::capture_anyhow(&err);
        tracing::error!(error = %format!("{err:#}"), "request failed");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "internal server error".to_string(),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        anyhow::Error::new(err).into()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ValidationError::new("request body", rejection.body_text()).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scalpdesk_core::domain::trade::TradeStatus;

    #[test]
    fn maps_domain_errors_to_statuses() {
        let cases: Vec<(anyhow::Error, StatusCode)> = vec![
            (
                ValidationError::new("closing order", "tradeId must be non-empty").into(),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                LedgerError::NotFound {
                    trade_id: "t-9".to_string(),
                }
                .into(),
                StatusCode::NOT_FOUND,
            ),
            (
                LedgerError::InvalidTransition {
                    trade_id: "t-1".to_string(),
                    from: TradeStatus::Closed,
                    to: TradeStatus::Closed,
                }
                .into(),
                StatusCode::CONFLICT,
            ),
            (
                AdvisorError::Upstream {
                    flow: "emit_report_summary",
                    message: "Failed to summarize backtesting report due to an internal server error.",
                }
                .into(),
                StatusCode::BAD_GATEWAY,
            ),
            (anyhow::anyhow!("pool timed out"), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn not_found_message_names_the_trade() {
        let err: anyhow::Error = LedgerError::NotFound {
            trade_id: "t-9".to_string(),
        }
        .into();
        assert_eq!(ApiError::from(err).message, "Trade with ID t-9 not found.");
    }

    async fn reject(content_type: Option<&str>, body: &'static str) -> ApiError {
        use axum::extract::FromRequest;

        let mut req = axum::http::Request::builder().method("POST").uri("/trades");
        if let Some(ct) = content_type {
            req = req.header(axum::http::header::CONTENT_TYPE, ct);
        }
        let req = req.body(axum::body::Body::from(body)).unwrap();
        let rejection = Json::<serde_json::Value>::from_request(req, &())
            .await
            .unwrap_err();
        ApiError::from(rejection)
    }

    #[tokio::test]
    async fn malformed_bodies_are_validation_errors() {
        let err = reject(Some("application/json"), "{\"suggestion\": ").await;
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(err.message.starts_with("invalid input for request body: "), "{}", err.message);

        let err = reject(None, "{}").await;
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn error_body_is_json() {
        let response = reject(Some("text/plain"), "tradeId=t-1").await.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["error"].as_str().unwrap().contains("Content-Type"), "{body}");
    }

    #[test]
    fn internal_errors_do_not_leak_details() {
        let err = ApiError::from(anyhow::anyhow!("password authentication failed for user"));
        assert_eq!(err.message, "internal server error");
    }
}
