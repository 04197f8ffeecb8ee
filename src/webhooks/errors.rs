use axum::http::StatusCode;

use crate::app::models::api_error::ApiError;

#[derive(Debug)]
pub enum WebhooksApiError {
    InvalidSignature,
}

impl WebhooksApiError {
    pub fn value(&self) -> ApiError {
        match *self {
            Self::InvalidSignature => ApiError {
                code: StatusCode::UNAUTHORIZED,
                message: "Invalid signature.".to_string(),
            },
        }
    }
}
