// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Fixed-size pool of report workers.
//!
//! Every idle worker publishes its inbox into a shared availability channel. The
//! dispatcher takes one inbox per entry, which removes that worker from the idle set
//! until it finishes the job and publishes its inbox again.
//!
//! ```text
//!                 ┌───────────────┐  inbox   ┌──────────┐
//!   dispatcher ◄──┤  available    ├◄─────────┤ worker 0 │
//!       │         │ (mpsc, cap N) ├◄─────────┤ worker 1 │
//!       │         └───────────────┘          │   ...    │
//!       └──── Job ──────────────────────────►└──────────┘
//! ```
//!
//! Shutdown is cooperative: workers only look at the signal while idle, so a job in
//! progress always runs to completion.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error};

use crate::client::{RemoteClient, Severity};
use crate::entry::Entry;
use crate::field_codec::convert_fields;

/// One entry to report, paired with the client that reports it.
pub(crate) struct Job {
    client: Arc<dyn RemoteClient>,
    entry: Entry,
}

impl Job {
    pub(crate) fn new(client: Arc<dyn RemoteClient>, entry: Entry) -> Self {
        Self { client, entry }
    }

    async fn run(self, worker_id: usize) {
        let fields = convert_fields(&self.entry.fields);
        let severity = Severity::from(self.entry.level);
        match self
            .client
            .report(severity, &self.entry.message, &fields)
            .await
        {
            Ok(id) => debug!(worker = worker_id, "Reported entry as {id}"),
            Err(e) => error!(
                worker = worker_id,
                "Failed to report entry {:?}: {e}", self.entry.message
            ),
        }
    }
}

pub(crate) type Inbox = mpsc::Sender<Job>;

pub(crate) struct WorkerPool {
    available: mpsc::Receiver<Inbox>,
    size: usize,
}

impl WorkerPool {
    /// Spawns `size` workers on `runtime`, each tracked by `tracker`.
    pub(crate) fn start(
        size: usize,
        shutdown: &CancellationToken,
        tracker: &TaskTracker,
        runtime: &Handle,
    ) -> Self {
        // Each worker holds at most one slot at a time, so publishing never waits.
        let (available_tx, available) = mpsc::channel(size);
        for id in 0..size {
            let worker = Worker {
                id,
                available: available_tx.clone(),
                shutdown: shutdown.clone(),
            };
            tracker.spawn_on(worker.run(), runtime);
        }
        Self { available, size }
    }

    /// Waits for an idle worker. `None` once every worker has stopped.
    pub(crate) async fn acquire(&mut self) -> Option<Inbox> {
        self.available.recv().await
    }

    pub(crate) fn size(&self) -> usize {
        self.size
    }
}

struct Worker {
    id: usize,
    available: mpsc::Sender<Inbox>,
    shutdown: CancellationToken,
}

impl Worker {
    async fn run(self) {
        let (inbox, mut jobs) = mpsc::channel::<Job>(1);
        loop {
            if self.available.send(inbox.clone()).await.is_err() {
                break;
            }
            tokio::select! {
                // A job handed over before the signal was raised still runs.
                biased;
                job = jobs.recv() => match job {
                    Some(job) => job.run(self.id).await,
                    None => break,
                },
                () = self.shutdown.cancelled() => break,
            }
        }
        debug!(worker = self.id, "Worker stopped");
    }
}
