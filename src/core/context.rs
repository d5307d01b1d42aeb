//! Call context: the diagnostics/clock/configuration bundle every backend
//! and manager operation takes.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::Span;

use super::cancellation::Cancellation;
use super::clock::{Clock, SystemClock};

/// Configuration key for the task staleness threshold, in milliseconds.
pub const TASK_TIMEOUT_MILLIS_CONFIG: &str = "TASK_TIMEOUT_MILLIS_CONFIG";

/// Default value of [`TASK_TIMEOUT_MILLIS_CONFIG`] when unset: one hour.
pub const TASK_TIMEOUT_MILLIS: i64 = 3_600_000;

#[derive(Clone)]
pub struct CallContext {
    pub realm_id: String,
    clock: Arc<dyn Clock>,
    config: Arc<HashMap<String, String>>,
    pub cancellation: Cancellation,
    /// Tracing span entered for the duration of a public operation;
    /// expected predicate failures are never logged through it, only the
    /// handful of warn-level events for irregular-but-not-fatal conditions.
    pub span: Span,
}

impl CallContext {
    pub fn new(realm_id: impl Into<String>) -> Self {
        Self::with_clock(realm_id, Arc::new(SystemClock))
    }

    pub fn with_clock(realm_id: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            realm_id: realm_id.into(),
            clock,
            config: Arc::new(HashMap::new()),
            cancellation: Cancellation::new(),
            span: tracing::info_span!("metastore_call"),
        }
    }

    pub fn with_config(mut self, config: HashMap<String, String>) -> Self {
        self.config = Arc::new(config);
        self
    }

    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).map(|s| s.as_str())
    }

    pub fn config_i64(&self, key: &str, default: i64) -> i64 {
        self.config
            .get(key)
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(default)
    }

    pub fn task_timeout_millis(&self) -> i64 {
        self.config_i64(TASK_TIMEOUT_MILLIS_CONFIG, TASK_TIMEOUT_MILLIS)
    }
}
