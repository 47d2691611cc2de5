use crate::PoolConfig;

/// Outcome of one resize decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resize {
    /// Spawn `step_size` more workers.
    Expand,
    /// Stop the `step_size` most recently spawned workers.
    Reduce,
    /// Leave the live set alone.
    Hold,
}

/// Queue occupancy once the task being submitted is enqueued.
pub fn occupancy(queued: usize, capacity: usize) -> f64 {
    (queued + 1) as f64 / capacity as f64
}

/// Decides how the live set should change for a submission arriving while
/// `queued` tasks wait and `live` workers run.
///
/// Expansion wins over reduction; at most one of them is chosen. The cap is
/// checked against the live worker count, so an expansion that would push
/// `live` past `max_workers` is skipped entirely.
pub fn decide(config: &PoolConfig, queued: usize, live: usize) -> Resize {
    let occupancy = occupancy(queued, config.queue_capacity);

    if occupancy > config.expand_threshold && live + config.step_size <= config.max_workers {
        Resize::Expand
    } else if occupancy < config.reduce_threshold && live > config.step_size {
        Resize::Reduce
    } else {
        Resize::Hold
    }
}
