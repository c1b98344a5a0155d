use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::WorkerError;
use crate::pipeline::JobProcessor;
use crate::store::JobStore;

use super::{Worker, WorkerStats};

#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    pub concurrency: usize,
    pub poll_interval: Duration,
    /// When set, `in_progress` jobs claimed longer ago than this are
    /// returned to `todo` at startup and once per period afterwards.
    pub lease_timeout: Option<Duration>,
}

/// A set of worker loops sharing one store, plus the optional lease reaper.
///
/// Any loop that stops on a storage error signals shutdown to the others,
/// so the process can exit and be restarted by its supervisor.
pub struct WorkerPool {
    workers: Vec<JoinHandle<Result<WorkerStats, WorkerError>>>,
    reaper: Option<JoinHandle<Result<(), WorkerError>>>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl WorkerPool {
    /// Spawns the loops on the current tokio runtime.
    ///
    /// # Panics
    /// Panics if `config.concurrency` is 0.
    pub fn start(
        config: WorkerPoolConfig,
        store: Arc<dyn JobStore>,
        processor: Arc<JobProcessor>,
    ) -> Self {
        assert!(config.concurrency > 0, "concurrency must be > 0");
        let (tx, _) = watch::channel(false);
        let shutdown = Arc::new(tx);

        let reaper = config.lease_timeout.map(|timeout| {
            let store = Arc::clone(&store);
            let shutdown = Arc::clone(&shutdown);
            tokio::spawn(async move {
                let result = run_reaper(store, timeout, shutdown.subscribe()).await;
                if let Err(ref e) = result {
                    error!("Lease reaper stopped: {}", e);
                    shutdown.send_replace(true);
                }
                result
            })
        });

        let workers = (0..config.concurrency)
            .map(|worker_id| {
                let worker = Worker::new(
                    worker_id,
                    Arc::clone(&store),
                    Arc::clone(&processor),
                    config.poll_interval,
                );
                let shutdown = Arc::clone(&shutdown);
                tokio::spawn(async move {
                    let result = worker.run(shutdown.subscribe()).await;
                    if let Err(ref e) = result {
                        error!("Worker {} stopped: {}", worker_id, e);
                        shutdown.send_replace(true);
                    }
                    result
                })
            })
            .collect();

        info!("Started {} workers", config.concurrency);

        Self {
            workers,
            reaper,
            shutdown,
        }
    }

    /// Receiver that turns true once shutdown has been requested, by
    /// [`WorkerPool::shutdown`] or by a failing loop.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    pub fn shutdown(&self) {
        info!("Shutting down worker pool...");
        self.shutdown.send_replace(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Waits for every loop to finish. Returns the summed stats, or the
    /// first error any loop stopped with.
    pub async fn wait(self) -> Result<WorkerStats, WorkerError> {
        let mut total = WorkerStats::default();
        let mut first_error = None;

        for (i, handle) in self.workers.into_iter().enumerate() {
            match handle.await {
                Ok(Ok(stats)) => {
                    debug!("Worker {} finished", i);
                    total.merge(stats);
                }
                Ok(Err(e)) => {
                    first_error.get_or_insert(e);
                }
                Err(e) => {
                    error!("Worker {} panicked: {}", i, e);
                    first_error.get_or_insert(WorkerError::Panicked(e.to_string()));
                }
            }
        }

        if let Some(reaper) = self.reaper {
            match reaper.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    first_error.get_or_insert(e);
                }
                Err(e) => {
                    first_error.get_or_insert(WorkerError::Panicked(e.to_string()));
                }
            }
        }

        info!("All workers have stopped");
        match first_error {
            Some(e) => Err(e),
            None => Ok(total),
        }
    }
}

/// Releases stale leases now, then once per `timeout` until shutdown.
async fn run_reaper(
    store: Arc<dyn JobStore>,
    timeout: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), WorkerError> {
    let released = store.reclaim_stale(timeout).await?;
    if released > 0 {
        warn!("Released {} abandoned job(s) at startup", released);
    }

    let mut interval = tokio::time::interval(timeout.max(Duration::from_secs(1)));
    interval.tick().await; // skip immediate first tick

    loop {
        tokio::select! {
            _ = interval.tick() => {
                store.reclaim_stale(timeout).await?;
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    debug!("Lease reaper stopped");
    Ok(())
}
