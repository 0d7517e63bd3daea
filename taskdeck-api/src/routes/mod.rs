/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Authentication endpoints (register, login, refresh, me)
/// - `tasks`: Task CRUD and statistics
/// - `users`: User administration and self-service profile updates
/// - `live`: WebSocket live channel

pub mod auth;
pub mod health;
pub mod live;
pub mod tasks;
pub mod users;

use axum::{extract::FromRequest, extract::FromRequestParts, Json};
use serde::Serialize;

use crate::error::ApiError;

/// JSON body extractor whose rejections use the API error format
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Path extractor whose rejections use the API error format
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// Query-string extractor whose rejections use the API error format
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// Success envelope: `{ "success": true, "count"?: n, "data": ... }`
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,

    pub data: T,
}

/// Wraps a single item
pub fn data<T: Serialize>(data: T) -> Json<DataResponse<T>> {
    Json(DataResponse {
        success: true,
        count: None,
        data,
    })
}

/// Wraps a collection, reporting its length
pub fn list<T: Serialize>(items: Vec<T>) -> Json<DataResponse<Vec<T>>> {
    Json(DataResponse {
        success: true,
        count: Some(items.len()),
        data: items,
    })
}

/// Body for operations that return no resource
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

pub fn message(message: impl Into<String>) -> Json<MessageResponse> {
    Json(MessageResponse {
        success: true,
        message: message.into(),
    })
}
