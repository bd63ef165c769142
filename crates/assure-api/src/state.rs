//! Application state management

use assure_core::config::AppConfig;
use assure_rag::AnalysisPipeline;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers.
///
/// Queries carry no mutable state of their own; everything here is either
/// read-only after startup or an atomic counter.
pub struct AppState {
    /// Application configuration, constructed once at startup
    pub config: AppConfig,
    /// The analysis pipeline
    pub pipeline: Arc<AnalysisPipeline>,
    /// Server start time
    pub start_time: Instant,
    /// Request counter
    pub request_count: AtomicU64,
}

impl AppState {
    pub fn new(config: AppConfig, pipeline: Arc<AnalysisPipeline>) -> Self {
        Self {
            config,
            pipeline,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
        }
    }

    /// Increment request counter
    pub fn increment_requests(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::SeqCst)
    }

    /// Get total request count
    pub fn get_request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Whether a vector index is configured for this deployment
    pub fn retrieval_enabled(&self) -> bool {
        self.pipeline.retrieval_enabled()
    }
}
