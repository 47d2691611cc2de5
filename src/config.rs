use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{PoolError, Result};

/// Workers added or removed per resize when not configured.
const DEFAULT_STEP_SIZE: usize = 2;
/// Default pending-task capacity of the queue.
const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Sizing and resize policy of an [`ElasticPool`](crate::ElasticPool).
///
/// Missing fields in a JSON document are taken from [`PoolConfig::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Upper bound on live workers.
    pub max_workers: usize,
    /// Workers spawned by one expansion, or stopped by one reduction.
    pub step_size: usize,
    /// Occupancy above which the pool expands.
    pub expand_threshold: f64,
    /// Occupancy below which the pool reduces.
    pub reduce_threshold: f64,
    /// Fixed capacity of the task queue.
    pub queue_capacity: usize,
}

impl PoolConfig {
    /// Creates a config from its five parameters. Call [`validate`](Self::validate)
    /// or hand it to [`ElasticPool::new`](crate::ElasticPool::new) to check it.
    pub fn new(
        max_workers: usize,
        step_size: usize,
        expand_threshold: f64,
        reduce_threshold: f64,
        queue_capacity: usize,
    ) -> Self {
        PoolConfig {
            max_workers,
            step_size,
            expand_threshold,
            reduce_threshold,
            queue_capacity,
        }
    }

    /// Reads a JSON config file and validates it.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let config = PoolConfig::read_json_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON config file without validating it, for callers that
    /// adjust fields before calling [`validate`](Self::validate).
    pub fn read_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Checks the sizing and threshold invariants.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidConfig`] naming the first violated bound.
    pub fn validate(&self) -> Result<()> {
        if self.step_size == 0 {
            return Err(invalid("step_size must be greater than 0"));
        }
        if self.step_size > self.max_workers {
            return Err(invalid(format!(
                "step_size ({}) must not exceed max_workers ({})",
                self.step_size, self.max_workers
            )));
        }
        if self.queue_capacity == 0 {
            return Err(invalid("queue_capacity must be greater than 0"));
        }
        if !self.reduce_threshold.is_finite() || !self.expand_threshold.is_finite() {
            return Err(invalid("thresholds must be finite numbers"));
        }
        if self.reduce_threshold < 0.0 || self.expand_threshold > 1.0 {
            return Err(invalid(format!(
                "thresholds must lie within [0, 1], got reduce={} expand={}",
                self.reduce_threshold, self.expand_threshold
            )));
        }
        if self.reduce_threshold >= self.expand_threshold {
            return Err(invalid(format!(
                "reduce_threshold ({}) must be lower than expand_threshold ({})",
                self.reduce_threshold, self.expand_threshold
            )));
        }
        Ok(())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            max_workers: (num_cpus::get() * 4).max(DEFAULT_STEP_SIZE),
            step_size: DEFAULT_STEP_SIZE,
            expand_threshold: 0.75,
            reduce_threshold: 0.25,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

fn invalid(msg: impl Into<String>) -> PoolError {
    PoolError::InvalidConfig(msg.into())
}
