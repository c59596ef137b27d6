use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::error;

use crate::error::CacheError;
use crate::error::Result;
use crate::types::DEFAULT_REBUILD_WORKERS;

pub type RebuildTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

type TaskQueue = Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<RebuildTask>>>;

struct Pool {
    sender:  mpsc::UnboundedSender<RebuildTask>,
    workers: Vec<JoinHandle<()>>,
}

#[derive(Default)]
struct Progress {
    pending: AtomicUsize,
    idle:    Notify,
}

impl Progress {
    fn task_done(&self) {
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }
}

/// Fixed-size pool of background workers for cache rebuilds.
///
/// Submitting never blocks: when all workers are busy, tasks wait in the queue. Workers are spawned on the first
/// submission, so a scheduler can be created outside of a runtime and shared by any number of cache clients.
pub struct RebuildScheduler {
    size:     usize,
    pool:     Mutex<Option<Pool>>,
    closed:   AtomicBool,
    progress: Arc<Progress>,
}

impl RebuildScheduler {
    pub fn new(size: usize) -> Self {
        Self {
            size:     size.max(1),
            pool:     Mutex::new(None),
            closed:   AtomicBool::new(false),
            progress: Arc::new(Progress::default()),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of tasks queued or running.
    pub fn pending(&self) -> usize {
        self.progress.pending.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn submit<F>(&self, task: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.is_closed() {
            return Err(CacheError::SchedulerClosed);
        }

        let mut pool = self.pool.lock();
        // `close` may have taken the pool between the check above and the lock.
        if self.is_closed() {
            return Err(CacheError::SchedulerClosed);
        }
        let pool = pool.get_or_insert_with(|| self.spawn_pool());

        self.progress.pending.fetch_add(1, Ordering::AcqRel);
        if pool.sender.send(Box::pin(task)).is_err() {
            self.progress.task_done();
            return Err(CacheError::SchedulerClosed);
        }
        Ok(())
    }

    fn spawn_pool(&self) -> Pool {
        debug!(workers = self.size, "starting rebuild workers");
        let (sender, receiver) = mpsc::unbounded_channel();
        let queue: TaskQueue = Arc::new(tokio::sync::Mutex::new(receiver));
        let workers = (0..self.size)
            .map(|id| tokio::spawn(Self::worker(id, Arc::clone(&queue), Arc::clone(&self.progress))))
            .collect();
        Pool { sender, workers }
    }

    async fn worker(id: usize, queue: TaskQueue, progress: Arc<Progress>) {
        loop {
            let task = queue.lock().await.recv().await;
            let Some(task) = task
            else {
                break;
            };

            // A separate task so that a panicking rebuild takes down only itself.
            if let Err(err) = tokio::spawn(task).await {
                error!(worker = id, error = %err, "rebuild task panicked");
            }
            progress.task_done();
        }
        debug!(worker = id, "rebuild worker stopped");
    }

    /// Wait until every submitted task has finished.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.progress.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Stop accepting tasks, let the queued ones run to completion, and stop the workers.
    pub async fn close(&self) {
        self.closed.store(true, Ordering::Release);
        let Some(pool) = self.pool.lock().take()
        else {
            return;
        };

        let Pool { sender, workers } = pool;
        drop(sender);
        for worker in workers {
            if let Err(err) = worker.await {
                error!(error = %err, "rebuild worker failed");
            }
        }
    }
}

impl Default for RebuildScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_REBUILD_WORKERS)
    }
}

impl std::fmt::Debug for RebuildScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RebuildScheduler")
            .field("size", &self.size)
            .field("pending", &self.pending())
            .field("closed", &self.is_closed())
            .finish()
    }
}
