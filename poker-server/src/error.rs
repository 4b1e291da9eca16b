//! Maps admission/lookup failures to HTTP status codes (SPEC_FULL §7).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use poker_core::query::AdmissionError;
use serde_json::json;

pub enum ApiError {
    BadRoomId,
    RoomNotFound,
    NameTooLong,
    NameInUse,
}

impl From<AdmissionError> for ApiError {
    fn from(err: AdmissionError) -> Self {
        match err {
            AdmissionError::NameTooLong => ApiError::NameTooLong,
            AdmissionError::RoomNotFound => ApiError::RoomNotFound,
            AdmissionError::NameInUse => ApiError::NameInUse,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRoomId => (StatusCode::BAD_REQUEST, "room id must be a UUID"),
            ApiError::RoomNotFound => (StatusCode::NOT_FOUND, "room not found"),
            ApiError::NameTooLong => (StatusCode::BAD_REQUEST, "name exceeds 15 characters"),
            ApiError::NameInUse => (StatusCode::CONFLICT, "name already in use"),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
