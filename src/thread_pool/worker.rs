use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam::atomic::AtomicCell;
use crossbeam::channel::{self, select, Receiver, Sender};
use crossbeam::sync::WaitGroup;
use log::{debug, error};

use super::Job;

/// Counters updated by workers, read by [`ElasticPool::stats`](crate::ElasticPool::stats).
#[derive(Debug, Default)]
pub(crate) struct WorkerCounters {
    pub completed: AtomicU64,
    pub panicked: AtomicU64,
}

/// One-shot stop notification for a single worker.
///
/// Nothing is ever sent on the channel; firing drops the sender, which
/// disconnects the worker's receiver and wakes its `select!`.
pub(crate) struct StopSignal {
    tx: AtomicCell<Option<Sender<()>>>,
}

impl StopSignal {
    fn new() -> (StopSignal, Receiver<()>) {
        let (tx, rx) = channel::bounded(0);
        let signal = StopSignal {
            tx: AtomicCell::new(Some(tx)),
        };
        (signal, rx)
    }

    /// Fires the signal. Returns `true` only for the call that fired it.
    pub fn fire(&self) -> bool {
        self.tx.take().is_some()
    }
}

/// The controller's handle on a live worker.
pub(crate) struct WorkerHandle {
    index: usize,
    stop: StopSignal,
}

impl WorkerHandle {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn stop(&self) -> bool {
        self.stop.fire()
    }
}

/// Spawns worker `index` pulling from `tasks`.
///
/// The worker holds `tracker` until its thread exits, so waiting on the
/// pool's `WaitGroup` joins every worker ever spawned.
pub(crate) fn spawn_worker(
    index: usize,
    tasks: Receiver<Job>,
    counters: Arc<WorkerCounters>,
    tracker: WaitGroup,
) -> io::Result<WorkerHandle> {
    let (stop, stop_rx) = StopSignal::new();

    thread::Builder::new()
        .name(format!("elastic-worker-{index}"))
        .spawn(move || {
            let _tracker = tracker;
            run(index, &tasks, &stop_rx, &counters);
        })?;

    Ok(WorkerHandle { index, stop })
}

fn run(index: usize, tasks: &Receiver<Job>, stop: &Receiver<()>, counters: &WorkerCounters) {
    debug!("Worker {index} started");
    loop {
        select! {
            recv(stop) -> _ => {
                debug!("Worker {index} received stop signal");
                break;
            }
            recv(tasks) -> job => match job {
                Ok(job) => execute(index, job, counters),
                Err(_) => {
                    debug!("Worker {index}: queue closed and drained");
                    break;
                }
            },
        }
    }
    debug!("Worker {index} has stopped");
}

fn execute(index: usize, job: Job, counters: &WorkerCounters) {
    match panic::catch_unwind(AssertUnwindSafe(job)) {
        Ok(()) => {
            counters.completed.fetch_add(1, Ordering::Relaxed);
        }
        Err(payload) => {
            counters.panicked.fetch_add(1, Ordering::Relaxed);
            error!(
                "Worker {index} task panicked, continuing: {}",
                panic_message(&*payload)
            );
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "<non-string panic payload>"
    }
}
