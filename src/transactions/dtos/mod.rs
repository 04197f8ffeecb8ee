pub mod get_transactions_filter_dto;
pub mod transaction_request_dto;
