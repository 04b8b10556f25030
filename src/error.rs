use crate::models::CapacityViolation;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// 服务错误
#[derive(Debug, Error)]
pub enum AppError {
    #[error("missing or invalid fields: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("{}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    CapacityExceeded(Vec<CapacityViolation>),

    #[error("{0}")]
    BadRequest(String),

    #[error("unauthenticated: {0}")]
    Unauthorized(String),

    #[error("access to '{resource}' denied")]
    Forbidden { resource: &'static str },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("export failed: {0}")]
    Export(#[from] csv::Error),

    #[error("{0}")]
    Internal(String),
}

/// 错误响应体
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::CapacityExceeded(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(sqlx::Error::Database(db)) if db.is_unique_violation() || db.is_foreign_key_violation() => {
                StatusCode::CONFLICT
            }
            AppError::Database(_) | AppError::Export(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::Validation(errors) => serde_json::to_value(errors).ok(),
            AppError::CapacityExceeded(violations) => serde_json::to_value(violations).ok(),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        } else {
            tracing::debug!("request rejected ({}): {}", status, self);
        }

        let response = ErrorResponse {
            success: false,
            message: self.to_string(),
            details: self.details(),
        };
        (status, Json(response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;

    #[test]
    fn capacity_message_names_article_and_quantities() {
        let err = AppError::CapacityExceeded(vec![CapacityViolation {
            nom: "Widget".to_string(),
            reference: "W1".to_string(),
            ordered: BigDecimal::from(10),
            already_delivered: BigDecimal::from(6),
            incoming: BigDecimal::from(5),
        }]);
        let message = err.to_string();
        assert!(message.contains("\"Widget\" (W1)"));
        assert!(message.contains("ordered quantity 10"));
        assert!(message.contains("already delivered 6, incoming 5"));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let details = err.details().unwrap();
        assert_eq!(details[0]["alreadyDelivered"], serde_json::json!(6));
        assert_eq!(details[0]["incoming"], serde_json::json!(5));
    }

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(AppError::Validation(vec![]).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Unauthorized("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden { resource: "stock" }.status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Database(sqlx::Error::RowNotFound).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
