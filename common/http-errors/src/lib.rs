use async_trait::async_trait;
use axum::{
    extract::{FromRequest, Request},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Serialize};

/// Failure body shared by every endpoint:
/// `{ "success": false, "error": "...", "type": "..." }` plus optional
/// structured details (e.g. per-product shortfalls).
#[derive(Serialize, Debug)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug)]
pub enum ApiError {
    Validation { message: String },
    Unauthorized { message: String },
    Forbidden { message: String },
    NotFound { what: &'static str },
    InsufficientStock { message: String, details: serde_json::Value },
    ConsumptionFailed { message: String },
    Internal { message: Option<String> },
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }

    pub fn internal<E: std::fmt::Display>(e: E) -> Self {
        Self::Internal { message: Some(e.to_string()) }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "VALIDATION",
            ApiError::Unauthorized { .. } | ApiError::Forbidden { .. } => "UNAUTHORIZED",
            ApiError::NotFound { .. } => "NOT_FOUND",
            ApiError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            ApiError::ConsumptionFailed { .. } => "CONSUMPTION_FAILED",
            ApiError::Internal { .. } => "INTERNAL",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::InsufficientStock { .. } => StatusCode::CONFLICT,
            ApiError::ConsumptionFailed { .. } | ApiError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();
        let (message, details) = match self {
            ApiError::Validation { message }
            | ApiError::Unauthorized { message }
            | ApiError::Forbidden { message }
            | ApiError::ConsumptionFailed { message } => (message, None),
            ApiError::NotFound { what } => (format!("{what} not found"), None),
            ApiError::InsufficientStock { message, details } => (message, Some(details)),
            ApiError::Internal { message } => {
                (message.unwrap_or_else(|| "internal error".into()), None)
            }
        };
        let body = ErrorBody { success: false, error: message, kind, details };
        let mut resp = (status, Json(body)).into_response();
        if let Ok(val) = HeaderValue::from_str(kind) {
            resp.headers_mut().insert("X-Error-Code", val);
        }
        resp
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// `axum::Json` with its rejection folded into [`ApiError`]: a missing or
/// malformed body comes back as the same `{ "success": false, ... }` shape
/// (and `X-Error-Code` header) as every other validation failure, instead
/// of axum's plain-text 422.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(ApiError::Validation { message: rejection.body_text() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn insufficient_stock_body_shape() {
        let err = ApiError::InsufficientStock {
            message: "2 products short".into(),
            details: serde_json::json!([{"productId": "p1"}]),
        };
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        assert_eq!(
            resp.headers().get("X-Error-Code").and_then(|v| v.to_str().ok()),
            Some("INSUFFICIENT_STOCK")
        );
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["success"], serde_json::json!(false));
        assert_eq!(value["type"], serde_json::json!("INSUFFICIENT_STOCK"));
        assert!(value["details"].is_array());
    }

    #[tokio::test]
    async fn json_rejection_becomes_validation_error() {
        #[derive(serde::Deserialize)]
        struct Payload {
            #[allow(dead_code)]
            amount: f64,
        }

        let req = axum::http::Request::builder()
            .header("content-type", "application/json")
            .body(axum::body::Body::from("{}"))
            .unwrap();
        let err = ApiJson::<Payload>::from_request(req, &())
            .await
            .map(|_| ())
            .expect_err("missing field must be rejected");
        assert_eq!(err.kind(), "VALIDATION");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn internal_error_hides_details_field() {
        let resp = ApiError::internal("boom").into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["type"], serde_json::json!("INTERNAL"));
        assert!(value.get("details").is_none());
    }
}
