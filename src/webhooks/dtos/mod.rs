pub mod receive_webhook_dto;
