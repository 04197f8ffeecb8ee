use std::sync::Arc;

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::{app::util::time, broker::metrics::MetricsSink, AppState};

pub async fn get_root() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "register-payment",
        "timestamp": time::current_time_in_secs(),
    }))
}

pub async fn get_health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let healthy = state.consumer_metrics.is_healthy();
    let broker_available = state.broker.is_available().await;

    Json(json!({
        "status": if healthy { "ok" } else { "degraded" },
        "service": "register-payment",
        "broker": if broker_available { "connected" } else { "unavailable" },
        "uptime_secs": state.consumer_metrics.uptime_secs(),
        "timestamp": time::current_time_in_secs(),
    }))
}

pub async fn get_metrics(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "consumer": state.consumer_metrics.snapshot(),
        "publisher": state.publisher_metrics.snapshot(),
        "timestamp": time::current_time_in_secs(),
    }))
}
