use axum::{http::StatusCode, Json};
use serde::Serialize;

/// Success envelope: `{ "success": true, "data": ..., "message"?: ... }`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub type JsonResponse<T> = Json<ApiResponse<T>>;

pub fn ok<T: Serialize>(data: T) -> JsonResponse<T> {
    Json(ApiResponse {
        success: true,
        data,
        message: None,
    })
}

pub fn ok_with_message<T: Serialize>(data: T, message: &str) -> JsonResponse<T> {
    Json(ApiResponse {
        success: true,
        data,
        message: Some(message.to_string()),
    })
}

pub fn created<T: Serialize>(data: T) -> (StatusCode, JsonResponse<T>) {
    (StatusCode::CREATED, ok(data))
}
