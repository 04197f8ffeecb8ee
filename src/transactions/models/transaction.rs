use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{
    app::util::time, money::Money,
    transactions::dtos::transaction_request_dto::TransactionRequestDto,
};

pub const TRANSACTION_TYPE_IN: &str = "in";
pub const TRANSACTION_TYPE_OUT: &str = "out";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: i32,
    pub transaction_id: String,
    pub value: Money,
    #[sqlx(rename = "type")]
    pub r#type: String,
    pub external_company_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Transaction {
    /// Builds a new entity from a request. The id is store-assigned and
    /// back-filled on insert.
    pub fn new(dto: &TransactionRequestDto) -> Self {
        let current_time = time::current_time_in_secs() as i64;

        return Self {
            id: 0,
            transaction_id: dto.transaction_id.to_string(),
            value: dto.value,
            r#type: dto.r#type.to_string(),
            external_company_id: dto.external_company_id.to_string(),
            description: dto.description.to_owned(),
            created_at: current_time,
            updated_at: current_time,
        };
    }
}
