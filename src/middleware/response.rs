use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::filter::{FilterPage, Pagination};

/// Wrapper for API responses that automatically adds success envelope
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub status_code: Option<StatusCode>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a successful API response with default 200 status
    pub fn success(data: T) -> Self {
        Self {
            data,
            status_code: None, // Default to 200 OK
        }
    }

    /// Create an API response with custom status code
    pub fn with_status(data: T, status_code: StatusCode) -> Self {
        Self {
            data,
            status_code: Some(status_code),
        }
    }

    /// Create a 201 Created response
    pub fn created(data: T) -> Self {
        Self::with_status(data, StatusCode::CREATED)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status_code.unwrap_or(StatusCode::OK);

        // Convert data to JSON Value for consistent envelope format
        let data_value = match serde_json::to_value(&self.data) {
            Ok(value) => value,
            Err(e) => return serialization_failure(e),
        };

        // Wrap in success envelope
        let envelope = json!({
            "success": true,
            "data": data_value
        });

        (status, Json(envelope)).into_response()
    }
}

/// One page of a listing: `{ success, count, total, pagination, data }`.
#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub success: bool,
    pub count: usize,
    pub total: u64,
    pub pagination: Pagination,
    pub data: Vec<Value>,
}

impl From<FilterPage> for ListResponse {
    fn from(page: FilterPage) -> Self {
        Self {
            success: true,
            count: page.records.len(),
            total: page.total,
            pagination: page.pagination(),
            data: page.records,
        }
    }
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

fn serialization_failure(e: serde_json::Error) -> Response {
    tracing::error!("Failed to serialize response data: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "success": false,
            "error": "Failed to serialize response data",
            "code": "INTERNAL_SERVER_ERROR"
        })),
    )
        .into_response()
}

// Convenience type alias
pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::PageSpec;

    #[test]
    fn list_response_shape() {
        let page = FilterPage {
            records: vec![json!({ "id": "a" }), json!({ "id": "b" })],
            total: 7,
            page: PageSpec { page: 1, limit: 2 },
        };
        let body = serde_json::to_value(ListResponse::from(page)).unwrap();
        assert_eq!(
            body,
            json!({
                "success": true,
                "count": 2,
                "total": 7,
                "pagination": { "next": { "page": 2, "limit": 2 } },
                "data": [{ "id": "a" }, { "id": "b" }]
            })
        );
    }
}
