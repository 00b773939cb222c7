use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;

// ==========================================
// 错误映射: ApiError → HTTP 状态码 + JSON
// ==========================================

/// 错误响应（返回给前端）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// 错误代码
    pub code: String,

    /// 错误消息
    pub message: String,

    /// 详细信息（可选）
    pub details: Option<serde_json::Value>,
}

#[derive(Debug)]
pub struct HttpError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

fn error_code(err: &ApiError) -> &'static str {
    match err {
        ApiError::AreaMismatch { .. } => "AREA_MISMATCH",
        ApiError::DuplicateFlyer { .. } => "DUPLICATE_FLYER",
        ApiError::SlotOccupied { .. } => "SLOT_OCCUPIED",
        ApiError::InvalidInput(_) => "INVALID_INPUT",
        ApiError::NotFound(_) => "NOT_FOUND",
        ApiError::BusinessRuleViolation(_) => "BUSINESS_RULE_VIOLATION",
        ApiError::ValidationError(_) => "VALIDATION_ERROR",
        ApiError::DatabaseError(_) => "DATABASE_ERROR",
        ApiError::DatabaseConnectionError(_) => "DATABASE_CONNECTION_ERROR",
        ApiError::DatabaseTransactionError(_) => "DATABASE_TRANSACTION_ERROR",
        ApiError::InternalError(_) => "INTERNAL_ERROR",
        ApiError::Other(_) => "OTHER_ERROR",
    }
}

fn status_of(err: &ApiError) -> StatusCode {
    match err {
        ApiError::AreaMismatch { .. }
        | ApiError::DuplicateFlyer { .. }
        | ApiError::SlotOccupied { .. }
        | ApiError::BusinessRuleViolation(_) => StatusCode::CONFLICT,
        ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        ApiError::InvalidInput(_) | ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<ApiError> for HttpError {
    fn from(err: ApiError) -> Self {
        let details = match &err {
            ApiError::AreaMismatch {
                candidate_area_id,
                schedule_area_id,
            } => Some(serde_json::json!({
                "candidate_area_id": candidate_area_id,
                "schedule_area_id": schedule_area_id,
            })),
            ApiError::DuplicateFlyer {
                flyer_id,
                existing_item_id,
                matched_code,
            } => Some(serde_json::json!({
                "flyer_id": flyer_id,
                "existing_item_id": existing_item_id,
                "matched_code": matched_code,
            })),
            ApiError::SlotOccupied {
                slot_index,
                existing_item_id,
            } => Some(serde_json::json!({
                "slot_index": slot_index,
                "existing_item_id": existing_item_id,
            })),
            _ => None,
        };

        let status = status_of(&err);
        if status.is_server_error() {
            tracing::error!(error = %err, "请求处理失败");
        }

        Self {
            status,
            body: ErrorResponse {
                code: error_code(&err).to_string(),
                message: err.to_string(),
                details,
            },
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
