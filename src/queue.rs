//! Background submission of snaps.
//!
//! Recording must never add latency to the monitored call, so producing a
//! snap is handed to a bounded queue drained by a small worker pool. When the
//! queue is full the snap is dropped; nothing is ever reported back to the
//! caller.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex, Notify};

pub const DEFAULT_WORKERS: usize = 2;
pub const DEFAULT_CAPACITY: usize = 256;

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Jobs submitted but not yet finished.
#[derive(Debug, Default)]
struct Pending {
    count: AtomicUsize,
    idle: Notify,
}

impl Pending {
    fn add(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    fn done(&self) {
        if self.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }

    async fn wait(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.count.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Bounded fire-and-forget job queue.
pub struct ProduceQueue {
    sender: mpsc::Sender<Job>,
    pending: Arc<Pending>,
    capacity: usize,
}

impl ProduceQueue {
    /// Spawn workers on the current Tokio runtime, or on a dedicated thread
    /// when there is none.
    pub fn new(workers: usize, capacity: usize) -> Self {
        match Handle::try_current() {
            Ok(handle) => Self::start(workers, capacity, |worker| {
                handle.spawn(worker);
            }),
            Err(_) => Self::detached(workers, capacity),
        }
    }

    /// Run the workers on a dedicated thread with its own runtime.
    ///
    /// Outlives whatever runtime the caller happens to be on, which is what
    /// the process-wide harness needs.
    pub fn detached(workers: usize, capacity: usize) -> Self {
        let mut spawned = Vec::new();
        let queue = Self::start(workers, capacity, |worker| spawned.push(worker));

        let result = std::thread::Builder::new()
            .name("varsnap-produce".into())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(err) => {
                        tracing::error!(error = %err, "failed to start produce runtime");
                        return;
                    }
                };
                runtime.block_on(futures::future::join_all(spawned));
            });
        if let Err(err) = result {
            tracing::error!(error = %err, "failed to spawn produce thread");
        }
        queue
    }

    fn start<F>(workers: usize, capacity: usize, mut spawn: F) -> Self
    where
        F: FnMut(Pin<Box<dyn Future<Output = ()> + Send + 'static>>),
    {
        let capacity = capacity.max(1);
        let (sender, receiver) = mpsc::channel::<Job>(capacity);
        let receiver = Arc::new(Mutex::new(receiver));
        let pending = Arc::new(Pending::default());

        for id in 0..workers.max(1) {
            spawn(Box::pin(work(id, receiver.clone(), pending.clone())));
        }

        Self {
            sender,
            pending,
            capacity,
        }
    }

    /// Enqueue a job without waiting. Drops it when the queue is full.
    pub fn submit<F>(&self, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.pending.add();
        if let Err(err) = self.sender.try_send(Box::pin(job)) {
            self.pending.done();
            match err {
                TrySendError::Full(_) => {
                    tracing::warn!(capacity = self.capacity, "produce queue full, dropping snap");
                }
                TrySendError::Closed(_) => {
                    tracing::warn!("produce queue closed, dropping snap");
                }
            }
        }
    }

    /// Jobs accepted and not yet completed.
    pub fn pending(&self) -> usize {
        self.pending.count.load(Ordering::SeqCst)
    }

    /// Wait until every accepted job has completed.
    pub async fn flush(&self) {
        self.pending.wait().await;
    }
}

impl Default for ProduceQueue {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS, DEFAULT_CAPACITY)
    }
}

impl std::fmt::Debug for ProduceQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProduceQueue")
            .field("capacity", &self.capacity)
            .field("pending", &self.pending())
            .finish()
    }
}

async fn work(id: usize, receiver: Arc<Mutex<mpsc::Receiver<Job>>>, pending: Arc<Pending>) {
    loop {
        let job = receiver.lock().await.recv().await;
        let Some(job) = job else {
            tracing::debug!(worker = id, "produce queue closed");
            break;
        };
        if AssertUnwindSafe(job).catch_unwind().await.is_err() {
            tracing::warn!(worker = id, "produce job panicked");
        }
        pending.done();
    }
}
