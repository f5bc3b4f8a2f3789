// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The hook: intake, dispatch and the one-time shutdown sequence.
//!
//! # Shutdown
//!
//! [`Hook::close`] runs its body once no matter how many callers race on it, and
//! every caller returns only after all workers have stopped:
//!
//! 1. stop intake, so `fire` drops anything new
//! 2. close the buffer
//! 3. wait until the dispatcher has handed every queued entry to a worker
//! 4. raise the shutdown signal and wait for the workers to finish
//!
//! Raising the signal only after the buffer is drained means an entry accepted
//! before `close` began can never be left without a worker to run it.

use std::env;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::available_parallelism;

use tokio::runtime::Handle;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, warn};

use crate::buffer::{Buffer, ChannelBuffer};
use crate::client::RemoteClient;
use crate::constants::{BUFFER_SLOTS_PER_WORKER, LEVELS_ENV, WORKERS_ENV, WORKERS_PER_CPU};
use crate::entry::{Entry, Level, DEFAULT_TRIGGER_LEVELS};
use crate::errors::Creation;
use crate::http_client::HttpClient;
use crate::panic::PanicReporter;
use crate::worker::{Job, WorkerPool};

/// Tuning for a [`Hook`]. Unset fields fall back to defaults at construction.
#[derive(Clone, Default)]
pub struct HookConfig {
    /// Queue between `fire` and the dispatcher. Defaults to a bounded
    /// [`ChannelBuffer`] with two slots per worker.
    pub buffer: Option<Arc<dyn Buffer>>,
    /// Number of workers. Zero means default.
    pub workers: Option<usize>,
    /// Levels that trigger a report. Empty means default.
    pub levels: Option<Vec<Level>>,
}

impl HookConfig {
    /// Reads `ROLLBAR_WORKERS` and `ROLLBAR_LEVELS` (comma separated).
    pub fn from_env() -> Self {
        let workers = env::var(WORKERS_ENV)
            .ok()
            .and_then(|val| val.trim().parse::<usize>().ok());
        let levels = env::var(LEVELS_ENV).ok().map(|val| parse_levels(&val));
        Self {
            buffer: None,
            workers,
            levels,
        }
    }
}

impl fmt::Debug for HookConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookConfig")
            .field("buffer", &self.buffer.as_ref().map(|_| "custom"))
            .field("workers", &self.workers)
            .field("levels", &self.levels)
            .finish()
    }
}

fn parse_levels(value: &str) -> Vec<Level> {
    value
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .filter_map(|name| match name.parse::<Level>() {
            Ok(level) => Some(level),
            Err(e) => {
                warn!("Ignoring {LEVELS_ENV} entry: {e}");
                None
            }
        })
        .collect()
}

/// Workers started when none are configured: a fixed multiple of the visible CPUs.
pub fn default_workers() -> usize {
    WORKERS_PER_CPU * available_parallelism().map_or(1, NonZeroUsize::get)
}

/// Cheaply cloneable handle to a running hook.
#[derive(Clone)]
pub struct Hook {
    inner: Arc<Inner>,
}

struct Inner {
    client: Arc<dyn RemoteClient>,
    levels: Vec<Level>,
    buffer: Arc<dyn Buffer>,
    worker_count: usize,
    accepting: AtomicBool,
    rejected: AtomicU64,
    // Cancelled by the dispatcher once the closed buffer is exhausted.
    drained: CancellationToken,
    shutdown: CancellationToken,
    workers: TaskTracker,
    closed: OnceCell<()>,
}

impl Hook {
    /// Starts the workers and the dispatcher on the current tokio runtime.
    pub fn new(client: Arc<dyn RemoteClient>, config: HookConfig) -> Result<Self, Creation> {
        let runtime = Handle::try_current().map_err(|_| Creation::NoRuntime)?;

        let mut levels = Vec::new();
        for level in config.levels.unwrap_or_default() {
            if !levels.contains(&level) {
                levels.push(level);
            }
        }
        if levels.is_empty() {
            levels = DEFAULT_TRIGGER_LEVELS.to_vec();
        }

        let worker_count = match config.workers {
            Some(n) if n > 0 => n,
            _ => default_workers(),
        };
        let buffer = config.buffer.unwrap_or_else(|| {
            Arc::new(ChannelBuffer::new(worker_count * BUFFER_SLOTS_PER_WORKER))
        });

        let drained = CancellationToken::new();
        let shutdown = CancellationToken::new();
        let workers = TaskTracker::new();
        let pool = WorkerPool::start(worker_count, &shutdown, &workers, &runtime);
        workers.close();

        runtime.spawn(dispatch(
            Arc::clone(&buffer),
            pool,
            Arc::clone(&client),
            drained.clone(),
        ));

        Ok(Self {
            inner: Arc::new(Inner {
                client,
                levels,
                buffer,
                worker_count,
                accepting: AtomicBool::new(true),
                rejected: AtomicU64::new(0),
                drained,
                shutdown,
                workers,
                closed: OnceCell::new(),
            }),
        })
    }

    /// Builds a hook reporting to Rollbar with `token` under `environment`.
    pub fn with_token(token: &str, environment: &str, config: HookConfig) -> Result<Self, Creation> {
        let client = HttpClient::new(token, environment)?;
        Self::new(Arc::new(client), config)
    }

    /// Queues an entry for reporting. Never blocks on delivery and never fails;
    /// after `close` has begun the entry is dropped.
    pub fn fire(&self, entry: Entry) {
        if !self.inner.accepting.load(Ordering::Acquire) {
            self.inner.rejected.fetch_add(1, Ordering::Relaxed);
            return;
        }
        self.inner.buffer.push(entry);
    }

    pub fn levels(&self) -> &[Level] {
        &self.inner.levels
    }

    pub fn is_triggered(&self, level: Level) -> bool {
        self.inner.levels.contains(&level)
    }

    pub fn worker_count(&self) -> usize {
        self.inner.worker_count
    }

    /// The client reports are sent through. Usable directly for ad hoc reports.
    pub fn client(&self) -> &Arc<dyn RemoteClient> {
        &self.inner.client
    }

    /// Entries that were fired but never queued.
    pub fn dropped(&self) -> u64 {
        self.inner.rejected.load(Ordering::Relaxed) + self.inner.buffer.dropped()
    }

    /// Drains queued entries and stops every worker. Safe to call repeatedly and
    /// concurrently; every call returns once all workers have terminated.
    pub async fn close(&self) {
        self.inner.closed.get_or_init(|| self.shutdown()).await;
        self.inner.workers.wait().await;
    }

    async fn shutdown(&self) {
        debug!("Closing hook");
        self.inner.accepting.store(false, Ordering::Release);
        self.inner.buffer.close();
        self.inner.drained.cancelled().await;
        self.inner.shutdown.cancel();
        self.inner.workers.wait().await;

        let dropped = self.dropped();
        if dropped > 0 {
            warn!("Dropped {dropped} entries that could not be queued");
        }
        debug!("Hook closed");
    }

    /// Runs `f`, reporting any panic it raises before letting it continue.
    /// See [`PanicReporter::catch`].
    pub fn report_panic<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R + std::panic::UnwindSafe,
    {
        PanicReporter::new(Arc::clone(&self.inner.client)).catch(f)
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook")
            .field("levels", &self.inner.levels)
            .field("worker_count", &self.inner.worker_count)
            .field("closed", &self.inner.closed.initialized())
            .finish()
    }
}

async fn dispatch(
    buffer: Arc<dyn Buffer>,
    mut pool: WorkerPool,
    client: Arc<dyn RemoteClient>,
    drained: CancellationToken,
) {
    let _drained = drained.drop_guard();
    debug!("Dispatcher started with {} workers", pool.size());

    while let Some(entry) = buffer.next().await {
        let Some(inbox) = pool.acquire().await else {
            error!("No workers left, dropping entry {:?}", entry.message);
            continue;
        };
        if inbox
            .send(Job::new(Arc::clone(&client), entry))
            .await
            .is_err()
        {
            error!("Worker stopped before taking its job");
        }
    }

    debug!("Dispatcher stopped");
}
