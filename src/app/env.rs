use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Envy {
    pub app_env: String,
    pub port: Option<u16>,

    pub database_url: String,

    pub nats_url: String,

    pub webhook_current_signing_key: String,
    pub webhook_next_signing_key: Option<String>,
}
