/// A unit of work submitted to the pool.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

mod elastic;
mod policy;
mod worker;

pub use self::elastic::{ElasticPool, PoolStats, Shutdown};
pub use self::policy::{decide, occupancy, Resize};
