use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use validator::Validate;

use crate::{
    app::models::api_error::ApiError, transactions::models::transaction::Transaction, AppState,
};

use super::{dtos::receive_webhook_dto::ReceiveWebhookDto, errors::WebhooksApiError};

pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

/// Synchronous registration path. The raw body is authenticated before any
/// deserialization; re-encoding would invalidate byte-exact signatures.
pub async fn receive_transaction(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Transaction>), ApiError> {
    let Some(signature) = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok())
    else {
        return Err(WebhooksApiError::InvalidSignature.value());
    };

    if !state.signature_verifier.verify(signature, &body) {
        return Err(WebhooksApiError::InvalidSignature.value());
    }

    let Ok(dto) = serde_json::from_slice::<ReceiveWebhookDto>(&body)
    else {
        return Err(ApiError {
            code: StatusCode::BAD_REQUEST,
            message: "Invalid request payload.".to_string(),
        });
    };

    if let Err(e) = dto.validate() {
        return Err(ApiError {
            code: StatusCode::BAD_REQUEST,
            message: e.to_string(),
        });
    }

    match state.transaction_service.create_transaction(&dto.data).await {
        Ok(transaction) => Ok((StatusCode::CREATED, Json(transaction))),
        Err(e) => {
            tracing::error!(%e, transaction_id = %dto.data.transaction_id, "webhook transaction failed");
            Err(e.value())
        }
    }
}
