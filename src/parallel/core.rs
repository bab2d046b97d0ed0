use anyhow::{Context, Result};
use crossbeam::channel::{Receiver, Sender, bounded};
use std::panic::{self, AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Once};
use std::thread;

/// Name prefix of pool threads; their panics are reported through `tracing`
const WORKER_THREAD_PREFIX: &str = "sweep-worker-";

static WORKER_PANIC_HOOK: Once = Once::new();

/// What came back for one work item
#[derive(Debug)]
pub enum WorkOutcome<T, R> {
    /// The processor returned normally
    Done(R),
    /// The processor panicked; the item is handed back with the panic message
    Panicked { item: T, message: String },
}

impl<T, R> WorkOutcome<T, R> {
    pub fn done(self) -> Option<R> {
        match self {
            WorkOutcome::Done(result) => Some(result),
            WorkOutcome::Panicked { .. } => None,
        }
    }
}

/// Bounded pool of OS threads fed through a crossbeam channel
pub struct WorkerPool {
    workers: usize,
    buffer_size: usize,
    cancel: Arc<AtomicBool>,
}

/// Context for worker threads to avoid too many function parameters
struct WorkerContext<T, R, F> {
    worker_id: usize,
    work_rx: Receiver<T>,
    result_tx: Sender<WorkOutcome<T, R>>,
    processor: Arc<F>,
    cancel: Arc<AtomicBool>,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            workers,
            buffer_size: workers * 2,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share a cancellation flag. Once it is set, items that have not
    /// started are dropped; items already running finish normally.
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Run every item through `processor` and wait for all of them.
    ///
    /// Results arrive in completion order. A panicking item is caught and
    /// reported as [`WorkOutcome::Panicked`]; its siblings keep running.
    /// After cancellation only the items that had started are returned.
    pub fn execute<T, R, F>(&self, work_items: Vec<T>, processor: F) -> Result<Vec<WorkOutcome<T, R>>>
    where
        T: Send,
        R: Send,
        F: Fn(&T, usize) -> R + Send + Sync, // (item, worker_id)
    {
        if work_items.is_empty() {
            return Ok(Vec::new());
        }

        let total_items = work_items.len();
        let actual_workers = std::cmp::min(self.workers, total_items);
        let (work_tx, work_rx): (Sender<T>, Receiver<T>) = bounded(self.buffer_size);
        let (result_tx, result_rx): (Sender<WorkOutcome<T, R>>, Receiver<WorkOutcome<T, R>>) =
            bounded(self.buffer_size);

        let processor = Arc::new(processor);
        route_worker_panics();

        crossbeam::thread::scope(|s| -> Result<Vec<WorkOutcome<T, R>>> {
            // Spawn worker threads
            for worker_id in 0..actual_workers {
                let ctx = WorkerContext {
                    worker_id,
                    work_rx: work_rx.clone(),
                    result_tx: result_tx.clone(),
                    processor: processor.clone(),
                    cancel: self.cancel.clone(),
                };

                s.builder()
                    .name(format!("{WORKER_THREAD_PREFIX}{worker_id}"))
                    .spawn(move |_| Self::worker_thread(ctx))
                    .context("Failed to spawn worker thread")?;
            }

            // Producer thread: send work to workers until cancelled
            let cancel = self.cancel.clone();
            s.spawn(move |_| {
                for work_item in work_items {
                    if cancel.load(Ordering::SeqCst) || work_tx.send(work_item).is_err() {
                        break;
                    }
                }
            });

            // Workers hold their own clones
            drop(work_rx);
            drop(result_tx);

            Ok(Self::collect_results(result_rx, total_items))
        })
        .map_err(|_| anyhow::anyhow!("Thread panic occurred during parallel execution"))?
    }

    fn worker_thread<T, R, F>(ctx: WorkerContext<T, R, F>)
    where
        F: Fn(&T, usize) -> R,
    {
        while let Ok(work_item) = ctx.work_rx.recv() {
            // Drain without processing once cancelled
            if ctx.cancel.load(Ordering::SeqCst) {
                continue;
            }

            let outcome = match catch_unwind(AssertUnwindSafe(|| (ctx.processor)(&work_item, ctx.worker_id))) {
                Ok(result) => WorkOutcome::Done(result),
                Err(payload) => WorkOutcome::Panicked {
                    item: work_item,
                    message: panic_message(payload.as_ref()),
                },
            };

            if ctx.result_tx.send(outcome).is_err() {
                break; // Receiver dropped
            }
        }
    }

    fn collect_results<T, R>(result_rx: Receiver<WorkOutcome<T, R>>, total_items: usize) -> Vec<WorkOutcome<T, R>> {
        let mut results = Vec::with_capacity(total_items);

        while let Ok(result) = result_rx.recv() {
            results.push(result);

            if results.len() >= total_items {
                break;
            }
        }

        results
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Report panics on pool threads through `tracing` (and so through the
/// console sink) instead of the default hook's raw stderr write. Panics on
/// other threads keep the previous hook.
fn route_worker_panics() {
    WORKER_PANIC_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let current = thread::current();
            match current.name().filter(|name| is_worker_thread(name)) {
                Some(name) => {
                    let location = info
                        .location()
                        .map(|location| format!(" at {}:{}", location.file(), location.line()))
                        .unwrap_or_default();
                    tracing::error!("{} panicked{}: {}", name, location, panic_message(info.payload()));
                }
                None => previous(info),
            }
        }));
    });
}

fn is_worker_thread(name: &str) -> bool {
    name.starts_with(WORKER_THREAD_PREFIX)
}

/// Resolve the pool size from configuration.
///
/// A fixed `workers` value wins; 0 falls back to a percentage of CPU cores.
/// The result is never 0.
pub fn calculate_workers(workers_config: usize, thread_percentage: u8) -> usize {
    if workers_config > 0 {
        return workers_config;
    }

    let available_cores = num_cpus::get();
    std::cmp::max(1, (available_cores * thread_percentage as usize) / 100)
}
