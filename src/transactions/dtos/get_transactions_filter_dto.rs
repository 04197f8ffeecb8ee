use serde::Deserialize;

/// Pagination input. Out-of-range values are clamped by the service rather
/// than rejected.
#[derive(Debug, Deserialize)]
pub struct GetTransactionsFilterDto {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
