#![deny(missing_docs)]

//! A self-sizing worker pool.
//!
//! Workers consume tasks from a bounded shared queue. On every submission
//! the pool measures queue occupancy and spawns or stops a step of workers,
//! so bursts are absorbed without keeping idle threads once they pass.

mod config;
mod error;
/// The elastic pool, its workers and the resize policy.
pub mod thread_pool;

pub use config::PoolConfig;
pub use error::{PoolError, Result};
pub use thread_pool::{ElasticPool, Job, PoolStats, Resize, Shutdown};
