use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use serde::Serialize;

use crate::app::util::time;

pub const RECENT_ERRORS_CAPACITY: usize = 10;

const HEALTHY_WINDOW_SECS: i64 = 5 * 60;

#[derive(Debug, Clone, Serialize)]
pub struct ProcessingError {
    pub timestamp: i64,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_data: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsumerMetricsSnapshot {
    pub total_processed: i64,
    pub success_count: i64,
    pub error_count: i64,
    pub last_processed_time: i64,
    pub recent_errors: Vec<ProcessingError>,
}

/// Counter sink for the consumer loop. Injected so the loop does not depend
/// on any concrete metrics representation.
pub trait MetricsSink: Send + Sync {
    fn record_attempt(&self);
    fn record_success(&self);
    fn record_error(&self, error: String, message_data: Option<String>);
    fn snapshot(&self) -> ConsumerMetricsSnapshot;
}

pub struct InMemoryMetrics {
    started_at: i64,
    total_processed: AtomicI64,
    success_count: AtomicI64,
    error_count: AtomicI64,
    last_processed_time: AtomicI64,
    recent_errors: Mutex<VecDeque<ProcessingError>>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self {
            started_at: time::current_time_in_secs() as i64,
            total_processed: AtomicI64::new(0),
            success_count: AtomicI64::new(0),
            error_count: AtomicI64::new(0),
            last_processed_time: AtomicI64::new(0),
            recent_errors: Mutex::new(VecDeque::with_capacity(RECENT_ERRORS_CAPACITY)),
        }
    }

    pub fn uptime_secs(&self) -> i64 {
        time::current_time_in_secs() as i64 - self.started_at
    }

    /// Healthy while nothing has ever been processed and the process is
    /// young, or while the most recent attempt is fresh.
    pub fn is_healthy(&self) -> bool {
        let last = self.last_processed_time.load(Ordering::Relaxed);
        if last == 0 {
            return self.uptime_secs() < HEALTHY_WINDOW_SECS;
        }

        time::current_time_in_secs() as i64 - last < HEALTHY_WINDOW_SECS
    }
}

impl MetricsSink for InMemoryMetrics {
    fn record_attempt(&self) {
        self.total_processed.fetch_add(1, Ordering::Relaxed);
        self.last_processed_time
            .store(time::current_time_in_secs() as i64, Ordering::Relaxed);
    }

    fn record_success(&self) {
        self.success_count.fetch_add(1, Ordering::Relaxed);
    }

    fn record_error(&self, error: String, message_data: Option<String>) {
        self.error_count.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut recent_errors) = self.recent_errors.lock() {
            if recent_errors.len() >= RECENT_ERRORS_CAPACITY {
                recent_errors.pop_front();
            }

            recent_errors.push_back(ProcessingError {
                timestamp: time::current_time_in_secs() as i64,
                error,
                message_data,
            });
        }
    }

    fn snapshot(&self) -> ConsumerMetricsSnapshot {
        let recent_errors = match self.recent_errors.lock() {
            Ok(recent_errors) => recent_errors.iter().cloned().collect(),
            Err(_) => Vec::new(),
        };

        ConsumerMetricsSnapshot {
            total_processed: self.total_processed.load(Ordering::Relaxed),
            success_count: self.success_count.load(Ordering::Relaxed),
            error_count: self.error_count.load(Ordering::Relaxed),
            last_processed_time: self.last_processed_time.load(Ordering::Relaxed),
            recent_errors,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PublisherMetricsSnapshot {
    pub total_requests: i64,
    pub success_count: i64,
    pub error_count: i64,
    pub last_request_time: i64,
}

pub struct PublisherMetrics {
    total_requests: AtomicI64,
    success_count: AtomicI64,
    error_count: AtomicI64,
    last_request_time: AtomicI64,
}

impl PublisherMetrics {
    pub fn new() -> Self {
        Self {
            total_requests: AtomicI64::new(0),
            success_count: AtomicI64::new(0),
            error_count: AtomicI64::new(0),
            last_request_time: AtomicI64::new(0),
        }
    }

    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.last_request_time
            .store(time::current_time_in_secs() as i64, Ordering::Relaxed);
    }

    pub fn record_success(&self) {
        self.success_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.error_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PublisherMetricsSnapshot {
        PublisherMetricsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            success_count: self.success_count.load(Ordering::Relaxed),
            error_count: self.error_count.load(Ordering::Relaxed),
            last_request_time: self.last_request_time.load(Ordering::Relaxed),
        }
    }
}
