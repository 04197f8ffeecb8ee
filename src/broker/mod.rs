//! Durable-queue plumbing: connection bootstrap, publish gateway, the
//! consumer loop and its metrics.

pub mod client;
pub mod consumer;
pub mod errors;
pub mod metrics;
pub mod publisher;

pub const TRANSACTIONS_STREAM: &str = "TRANSACTIONS";
pub const TRANSACTIONS_SUBJECT: &str = "transactions.register";
pub const CONSUMER_DURABLE_NAME: &str = "register-payment-consumer";
