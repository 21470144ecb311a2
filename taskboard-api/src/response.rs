/// Success envelope
///
/// Every successful response has the same shape:
///
/// ```json
/// {
///   "statusCode": 200,
///   "data": { ... },
///   "message": "Task fetched successfully",
///   "success": true
/// }
/// ```
///
/// `success` is derived from the status code, so a 2xx envelope always reads
/// `true`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Success envelope
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub status_code: u16,
    pub data: T,
    pub message: String,
    pub success: bool,

    #[serde(skip)]
    status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(status: StatusCode, data: T, message: impl Into<String>) -> Self {
        Self {
            status_code: status.as_u16(),
            data,
            message: message.into(),
            success: status.as_u16() < 400,
            status,
        }
    }

    /// 200 OK
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, data, message)
    }

    /// 201 Created
    pub fn created(data: T, message: impl Into<String>) -> Self {
        Self::new(StatusCode::CREATED, data, message)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_success_envelope_shape() {
        let response = ApiResponse::created(json!({"id": 1}), "Task created successfully")
            .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(
            json,
            json!({
                "statusCode": 201,
                "data": {"id": 1},
                "message": "Task created successfully",
                "success": true
            })
        );
    }

    #[test]
    fn test_empty_data_serializes_as_object() {
        let response = ApiResponse::ok(json!({}), "Logged out");
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["data"], json!({}));
        assert_eq!(json["statusCode"], 200);
    }
}
