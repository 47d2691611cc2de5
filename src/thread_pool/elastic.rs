use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use crossbeam::channel::{self, Receiver, Sender};
use crossbeam::sync::WaitGroup;
use log::{debug, error, info};
use serde::Serialize;

use super::policy::{self, Resize};
use super::worker::{spawn_worker, WorkerCounters, WorkerHandle};
use super::Job;
use crate::{PoolConfig, PoolError, Result};

/// How [`ElasticPool::close`] treats tasks still in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    /// Run every queued task before the workers exit.
    Drain,
    /// Stop the workers after their current task and drop the rest.
    Discard,
}

/// A snapshot of pool activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Workers currently in the live set.
    pub live_workers: usize,
    /// Tasks waiting in the queue.
    pub pending_tasks: usize,
    /// Workers spawned since construction.
    pub workers_spawned: usize,
    /// Workers stopped by reductions or shutdown.
    pub workers_retired: usize,
    /// Number of expansions, including the initial one.
    pub expansions: usize,
    /// Number of reductions.
    pub reductions: usize,
    /// Tasks that ran to completion.
    pub completed_tasks: u64,
    /// Tasks that panicked.
    pub panicked_tasks: u64,
}

/// A worker pool that resizes itself from queue occupancy.
///
/// Every [`submit`](ElasticPool::submit) takes the state lock, decides
/// whether to expand or reduce the live worker set, releases the lock and
/// only then pushes the task. A submitter blocked on a full queue therefore
/// never holds the lock, and another submitter may resize meanwhile.
pub struct ElasticPool {
    config: PoolConfig,
    tasks: Receiver<Job>,
    counters: Arc<WorkerCounters>,
    state: Mutex<PoolState>,
}

/// Controller state guarded by the pool mutex.
struct PoolState {
    /// `None` once the pool is closed.
    sender: Option<Sender<Job>>,
    /// Live workers in spawn order.
    workers: Vec<WorkerHandle>,
    next_index: usize,
    /// Held by every worker thread; taken by `close` to join them.
    tracker: Option<WaitGroup>,
    expansions: usize,
    reductions: usize,
    retired: usize,
}

impl ElasticPool {
    /// Validates `config` and starts the pool with `step_size` workers.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidConfig`] for an out-of-range config, or
    /// [`PoolError::Io`] if a worker thread cannot be spawned.
    pub fn new(config: PoolConfig) -> Result<Self> {
        config.validate()?;

        let (tx, rx) = channel::bounded::<Job>(config.queue_capacity);
        let pool = ElasticPool {
            config,
            tasks: rx,
            counters: Arc::new(WorkerCounters::default()),
            state: Mutex::new(PoolState {
                sender: Some(tx),
                workers: Vec::new(),
                next_index: 0,
                tracker: Some(WaitGroup::new()),
                expansions: 0,
                reductions: 0,
                retired: 0,
            }),
        };

        {
            let mut state = pool.state.lock().unwrap();
            pool.expand(&mut state)?;
        }
        Ok(pool)
    }

    /// Submits a task, resizing the pool first if occupancy calls for it.
    ///
    /// Blocks while the queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Closed`] after [`close`](ElasticPool::close).
    /// A call already blocked on a full queue when the pool is closed with
    /// [`Shutdown::Discard`] may still return `Ok(())` once space frees up,
    /// even though its task never runs.
    pub fn submit<F>(&self, task: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = {
            let mut state = self.state.lock().unwrap();
            let sender = state.sender.clone().ok_or(PoolError::Closed)?;

            let queued = self.tasks.len();
            debug!(
                "Submitting task, occupancy: {:.2}",
                policy::occupancy(queued, self.config.queue_capacity)
            );

            match policy::decide(&self.config, queued, state.workers.len()) {
                Resize::Expand => {
                    if let Err(e) = self.expand(&mut state) {
                        error!("Failed to expand pool: {}", e);
                    }
                }
                Resize::Reduce => self.reduce(&mut state),
                Resize::Hold => {}
            }
            sender
        };

        sender
            .send(Box::new(task))
            .map_err(|_| PoolError::Closed)
    }

    /// Number of tasks waiting in the queue.
    pub fn pending_count(&self) -> usize {
        self.tasks.len()
    }

    /// Number of workers in the live set.
    pub fn worker_count(&self) -> usize {
        self.state.lock().unwrap().workers.len()
    }

    /// The configuration this pool was built with.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Returns a snapshot of the pool's counters.
    pub fn stats(&self) -> PoolStats {
        let state = self.state.lock().unwrap();
        PoolStats {
            live_workers: state.workers.len(),
            pending_tasks: self.tasks.len(),
            workers_spawned: state.next_index,
            workers_retired: state.retired,
            expansions: state.expansions,
            reductions: state.reductions,
            completed_tasks: self.counters.completed.load(Ordering::Relaxed),
            panicked_tasks: self.counters.panicked.load(Ordering::Relaxed),
        }
    }

    /// Closes the pool and waits for every worker thread to exit, including
    /// workers retired earlier by reductions that were still finishing a task.
    ///
    /// Returns the number of queued tasks dropped without running, which is
    /// always 0 for [`Shutdown::Drain`]. Closing an already closed pool does
    /// nothing and returns 0.
    ///
    /// With [`Shutdown::Discard`], a submitter that was blocked on a full
    /// queue across the close can push its task after the queue is emptied.
    /// That task never runs and is not part of the returned count.
    ///
    /// Must not be called from a task running on this pool: the calling
    /// worker would wait for itself.
    pub fn close(&self, mode: Shutdown) -> usize {
        let (workers, tracker) = {
            let mut state = self.state.lock().unwrap();
            if state.sender.take().is_none() {
                return 0;
            }
            let workers = std::mem::take(&mut state.workers);
            state.retired += workers.len();
            (workers, state.tracker.take())
        };
        info!("Closing pool ({:?}), stopping {} workers", mode, workers.len());

        if mode == Shutdown::Discard {
            for worker in &workers {
                worker.stop();
            }
        }

        // Senders cloned by in-flight submitters keep the queue connected
        // until their push completes, so draining workers still see them.
        if let Some(tracker) = tracker {
            tracker.wait();
        }
        drop(workers);

        let discarded = self.tasks.try_iter().count();
        if discarded > 0 {
            info!("Discarded {} queued tasks", discarded);
        }
        discarded
    }

    /// Spawns `step_size` workers and appends them to the live set.
    fn expand(&self, state: &mut PoolState) -> Result<()> {
        debug!("Expanding pool by {}", self.config.step_size);
        let tracker = match &state.tracker {
            Some(tracker) => tracker,
            None => return Err(PoolError::Closed),
        };

        let mut spawned = Vec::new();
        let mut failure = None;
        for _ in 0..self.config.step_size {
            let index = state.next_index;
            match spawn_worker(
                index,
                self.tasks.clone(),
                Arc::clone(&self.counters),
                tracker.clone(),
            ) {
                Ok(handle) => {
                    spawned.push(handle);
                    state.next_index += 1;
                }
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        if !spawned.is_empty() {
            state.workers.append(&mut spawned);
            state.expansions += 1;
            info!("Expand done, worker count: {}", state.workers.len());
        }

        match failure {
            Some(e) => Err(PoolError::Io(e)),
            None => Ok(()),
        }
    }

    /// Stops the `step_size` most recently spawned workers without waiting.
    fn reduce(&self, state: &mut PoolState) {
        debug!("Reducing pool by {}", self.config.step_size);
        let keep = state.workers.len().saturating_sub(self.config.step_size);
        for worker in state.workers.drain(keep..).rev() {
            if worker.stop() {
                debug!("Stop signal sent to worker {}", worker.index());
            }
            state.retired += 1;
        }
        state.reductions += 1;
        info!("Reduce done, worker count: {}", state.workers.len());
    }
}

impl Drop for ElasticPool {
    fn drop(&mut self) {
        // An abandoned pool stops its workers but does not wait for them.
        let state = match self.state.get_mut() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        if state.sender.take().is_some() {
            for worker in &state.workers {
                worker.stop();
            }
        }
    }
}
