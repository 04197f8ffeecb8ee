use serde::Deserialize;
use validator::Validate;

use crate::transactions::dtos::transaction_request_dto::TransactionRequestDto;

#[derive(Debug, Deserialize, Validate)]
pub struct ReceiveWebhookDto {
    #[validate]
    pub data: TransactionRequestDto,
}
