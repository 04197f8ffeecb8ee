use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use validator::Validate;

use crate::{
    app::{
        errors::DefaultApiError, models::api_error::ApiError,
        structs::json_from_request::JsonFromRequest, util::time,
    },
    broker::errors::BrokerError,
    AppState,
};

use super::{
    dtos::{
        get_transactions_filter_dto::GetTransactionsFilterDto,
        transaction_request_dto::TransactionRequestDto,
    },
    models::transaction::Transaction,
};

pub async fn create_transaction(
    State(state): State<Arc<AppState>>,
    JsonFromRequest(dto): JsonFromRequest<TransactionRequestDto>,
) -> Result<(StatusCode, Json<Transaction>), ApiError> {
    if let Err(e) = dto.validate() {
        return Err(ApiError {
            code: StatusCode::BAD_REQUEST,
            message: e.to_string(),
        });
    }

    match state.transaction_service.create_transaction(&dto).await {
        Ok(transaction) => Ok((StatusCode::CREATED, Json(transaction))),
        Err(e) => Err(e.value()),
    }
}

pub async fn get_transactions(
    State(state): State<Arc<AppState>>,
    Query(dto): Query<GetTransactionsFilterDto>,
) -> Result<Json<Vec<Transaction>>, ApiError> {
    let limit = dto.limit.unwrap_or(0);
    let offset = dto.offset.unwrap_or(0);

    match state
        .transaction_service
        .list_transactions(limit, offset)
        .await
    {
        Ok(transactions) => Ok(Json(transactions)),
        Err(e) => Err(e.value()),
    }
}

pub async fn get_transaction_by_id(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<Transaction>, ApiError> {
    match state.transaction_service.get_transaction(id).await {
        Ok(transaction) => Ok(Json(transaction)),
        Err(e) => Err(e.value()),
    }
}

pub async fn get_transaction_by_transaction_id(
    State(state): State<Arc<AppState>>,
    Path(transaction_id): Path<String>,
) -> Result<Json<Transaction>, ApiError> {
    match state
        .transaction_service
        .get_transaction_by_transaction_id(&transaction_id)
        .await
    {
        Ok(transaction) => Ok(Json(transaction)),
        Err(e) => Err(e.value()),
    }
}

pub async fn get_transactions_by_company(
    State(state): State<Arc<AppState>>,
    Path(external_company_id): Path<String>,
) -> Result<Json<Vec<Transaction>>, ApiError> {
    match state
        .transaction_service
        .get_transactions_by_company(&external_company_id)
        .await
    {
        Ok(transactions) => Ok(Json(transactions)),
        Err(e) => Err(e.value()),
    }
}

pub async fn edit_transaction_by_id(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    JsonFromRequest(dto): JsonFromRequest<TransactionRequestDto>,
) -> Result<Json<Transaction>, ApiError> {
    if let Err(e) = dto.validate() {
        return Err(ApiError {
            code: StatusCode::BAD_REQUEST,
            message: e.to_string(),
        });
    }

    match state
        .transaction_service
        .update_transaction(id, &dto)
        .await
    {
        Ok(transaction) => Ok(Json(transaction)),
        Err(e) => Err(e.value()),
    }
}

pub async fn delete_transaction_by_id(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    match state.transaction_service.delete_transaction(id).await {
        Ok(_) => Ok(StatusCode::NO_CONTENT),
        Err(e) => Err(e.value()),
    }
}

/// Accepts a transaction request and places it on the durable queue. A 202
/// means the broker accepted the message, not that the transaction has been
/// persisted.
pub async fn publish_transaction(
    State(state): State<Arc<AppState>>,
    JsonFromRequest(dto): JsonFromRequest<TransactionRequestDto>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    state.publisher_metrics.record_request();

    if let Err(e) = dto.validate() {
        state.publisher_metrics.record_error();
        return Err(ApiError {
            code: StatusCode::BAD_REQUEST,
            message: e.to_string(),
        });
    }

    if let Err(e) = state.publisher.publish_json(&dto).await {
        state.publisher_metrics.record_error();

        return match e {
            BrokerError::Unavailable(_) => Err(DefaultApiError::ServiceUnavailable.value()),
            _ => {
                tracing::error!(%e, transaction_id = %dto.transaction_id, "failed to publish transaction");
                Err(ApiError {
                    code: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "Failed to publish transaction.".to_string(),
                })
            }
        };
    }

    state.publisher_metrics.record_success();

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "transaction_id": dto.transaction_id,
            "status": "queued",
            "timestamp": time::current_time_in_secs(),
        })),
    ))
}
