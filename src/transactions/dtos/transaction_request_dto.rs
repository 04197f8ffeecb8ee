use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::money::Money;
use crate::transactions::models::transaction::{TRANSACTION_TYPE_IN, TRANSACTION_TYPE_OUT};

/// Request shape shared by the publish endpoint, the queue message and the
/// webhook payload.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TransactionRequestDto {
    #[validate(length(min = 1, message = "transaction_id is required."))]
    pub transaction_id: String,
    #[validate(custom(function = "crate::money::validate_positive"))]
    pub value: Money,
    #[validate(custom(function = "validate_transaction_type"))]
    pub r#type: String,
    #[validate(length(min = 1, message = "external_company_id is required."))]
    pub external_company_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn validate_transaction_type(value: &str) -> Result<(), ValidationError> {
    if value != TRANSACTION_TYPE_IN && value != TRANSACTION_TYPE_OUT {
        return Err(ValidationError::new("validate_transaction_type"));
    }

    return Ok(());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dto(transaction_id: &str, value: Money, r#type: &str) -> TransactionRequestDto {
        TransactionRequestDto {
            transaction_id: transaction_id.to_string(),
            value,
            r#type: r#type.to_string(),
            external_company_id: "C1".to_string(),
            description: None,
        }
    }

    #[test]
    fn accepts_a_well_formed_request() {
        assert!(dto("T1", Money::new(10.00), "in").validate().is_ok());
        assert!(dto("T2", Money::new(0.01), "out").validate().is_ok());
    }

    #[test]
    fn rejects_an_empty_transaction_id() {
        assert!(dto("", Money::new(10.00), "in").validate().is_err());
    }

    #[test]
    fn rejects_a_non_positive_value() {
        assert!(dto("T1", Money::new(0.0), "in").validate().is_err());
        assert!(dto("T1", Money::new(-1.0), "in").validate().is_err());
    }

    #[test]
    fn rejects_an_unknown_type() {
        assert!(dto("T1", Money::new(10.00), "sideways").validate().is_err());
        assert!(dto("T1", Money::new(10.00), "").validate().is_err());
    }

    #[test]
    fn deserializes_the_publish_payload_shape() {
        let dto: TransactionRequestDto = serde_json::from_str(
            r#"{
                "transaction_id": "T1",
                "value": "10.00",
                "type": "in",
                "external_company_id": "C1"
            }"#,
        )
        .unwrap();

        assert_eq!(dto.transaction_id, "T1");
        assert_eq!(dto.value.cents(), 1000);
        assert_eq!(dto.r#type, "in");
        assert_eq!(dto.description, None);
        assert!(dto.validate().is_ok());
    }
}
