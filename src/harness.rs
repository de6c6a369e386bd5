//! The process-wide set of monitored functions.

use std::fmt::Display;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use parking_lot::RwLock;

use crate::config::{Environment, ProcessEnv, Settings};
use crate::consumer::{Consumer, WATCH_INTERVAL};
use crate::dispatch::{Target, Varsnap};
use crate::globals::Context;
use crate::producer::Producer;
use crate::queue::{ProduceQueue, DEFAULT_CAPACITY, DEFAULT_WORKERS};
use crate::store::{HttpSnapStore, SnapStore};
use crate::value::{Capture, Restore};

static GLOBAL: OnceLock<Harness> = OnceLock::new();

/// Owns the environment, the store, the produce queue, and every producer
/// and consumer created through it, in registration order.
pub struct Harness {
    env: Arc<dyn Environment>,
    store: Arc<dyn SnapStore>,
    queue: Arc<ProduceQueue>,
    producers: RwLock<Vec<Arc<Producer>>>,
    consumers: RwLock<Vec<Arc<Consumer>>>,
    watch_interval: Duration,
}

impl Harness {
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder::default()
    }

    /// Process environment and the HTTP store. Workers run on their own thread.
    pub fn from_env() -> Self {
        let env: Arc<dyn Environment> = Arc::new(ProcessEnv);
        let settings = Settings::load(env.as_ref());
        let store = Arc::new(HttpSnapStore::new(&settings));
        Self::assemble(
            env,
            store,
            ProduceQueue::detached(DEFAULT_WORKERS, DEFAULT_CAPACITY),
            WATCH_INTERVAL,
        )
    }

    /// The shared instance, created on first use.
    pub fn global() -> &'static Harness {
        GLOBAL.get_or_init(Harness::from_env)
    }

    fn assemble(
        env: Arc<dyn Environment>,
        store: Arc<dyn SnapStore>,
        queue: ProduceQueue,
        watch_interval: Duration,
    ) -> Self {
        Self {
            env,
            store,
            queue: Arc::new(queue),
            producers: RwLock::new(Vec::new()),
            consumers: RwLock::new(Vec::new()),
            watch_interval,
        }
    }

    /// Monitor a function that takes a context.
    ///
    /// Creates and registers one producer and one consumer for `name`.
    pub fn varsnap_with_context<A, O, E, C, F>(
        &self,
        name: impl Into<String>,
        func: F,
    ) -> Varsnap<A, O, E, C>
    where
        A: Capture + Restore + 'static,
        O: Capture + 'static,
        E: Capture + Display + 'static,
        C: Context + 'static,
        F: Fn(&C, A) -> Result<O, E> + Send + Sync + 'static,
    {
        let target = Arc::new(Target::new(name, func));
        let producer = Arc::new(Producer::new(
            target.name(),
            self.env.clone(),
            self.store.clone(),
        ));
        let consumer = Arc::new(
            Consumer::new(target.clone(), self.env.clone(), self.store.clone())
                .with_interval(self.watch_interval),
        );

        self.producers.write().push(producer.clone());
        self.register_consumer(consumer.clone());
        tracing::debug!(signature = %producer.signature(), "varsnap loaded");

        Varsnap::new(target, producer, consumer, self.queue.clone())
    }

    /// Monitor a function without a context.
    pub fn varsnap<A, O, E, F>(&self, name: impl Into<String>, func: F) -> Varsnap<A, O, E>
    where
        A: Capture + Restore + 'static,
        O: Capture + 'static,
        E: Capture + Display + 'static,
        F: Fn(A) -> Result<O, E> + Send + Sync + 'static,
    {
        self.varsnap_with_context(name, move |_: &(), args: A| func(args))
    }

    /// Register a consumer built outside [`Harness::varsnap`].
    pub fn register_consumer(&self, consumer: Arc<Consumer>) {
        self.consumers.write().push(consumer);
    }

    pub fn producers(&self) -> Vec<Arc<Producer>> {
        self.producers.read().clone()
    }

    pub fn consumers(&self) -> Vec<Arc<Consumer>> {
        self.consumers.read().clone()
    }

    /// Forget every registered producer and consumer.
    pub fn reset(&self) {
        self.producers.write().clear();
        self.consumers.write().clear();
    }

    pub fn queue(&self) -> &Arc<ProduceQueue> {
        &self.queue
    }

    pub fn env(&self) -> &Arc<dyn Environment> {
        &self.env
    }

    pub fn store(&self) -> &Arc<dyn SnapStore> {
        &self.store
    }

    pub fn settings(&self) -> Settings {
        Settings::load(self.env.as_ref())
    }

    /// Wait for queued snap submissions to finish.
    pub async fn flush(&self) {
        self.queue.flush().await;
    }

    /// Run the watch loop of every registered consumer until they all return.
    pub async fn watch(&self) {
        let consumers = self.consumers();
        futures::future::join_all(consumers.iter().map(|consumer| consumer.consume_watch())).await;
    }
}

impl std::fmt::Debug for Harness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Harness")
            .field("producers", &self.producers.read().len())
            .field("consumers", &self.consumers.read().len())
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}

/// Builder for a [`Harness`] with injected collaborators.
pub struct HarnessBuilder {
    env: Option<Arc<dyn Environment>>,
    store: Option<Arc<dyn SnapStore>>,
    workers: usize,
    capacity: usize,
    watch_interval: Duration,
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        Self {
            env: None,
            store: None,
            workers: DEFAULT_WORKERS,
            capacity: DEFAULT_CAPACITY,
            watch_interval: WATCH_INTERVAL,
        }
    }
}

impl HarnessBuilder {
    pub fn env(mut self, env: Arc<dyn Environment>) -> Self {
        self.env = Some(env);
        self
    }

    pub fn store(mut self, store: Arc<dyn SnapStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn watch_interval(mut self, interval: Duration) -> Self {
        self.watch_interval = interval;
        self
    }

    /// Missing pieces default to the process environment and the HTTP store.
    /// The queue's workers run on the current Tokio runtime when there is one.
    pub fn build(self) -> Harness {
        let env = self.env.unwrap_or_else(|| Arc::new(ProcessEnv));
        let store: Arc<dyn SnapStore> = match self.store {
            Some(store) => store,
            None => Arc::new(HttpSnapStore::new(&Settings::load(env.as_ref()))),
        };
        Harness::assemble(
            env,
            store,
            ProduceQueue::new(self.workers, self.capacity),
            self.watch_interval,
        )
    }
}

/// Monitor a function through the shared harness.
pub fn varsnap<A, O, E, F>(name: impl Into<String>, func: F) -> Varsnap<A, O, E>
where
    A: Capture + Restore + 'static,
    O: Capture + 'static,
    E: Capture + Display + 'static,
    F: Fn(A) -> Result<O, E> + Send + Sync + 'static,
{
    Harness::global().varsnap(name, func)
}
