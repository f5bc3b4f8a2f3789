// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Synchronous reporting of panics.
//!
//! This path bypasses the buffer and the worker pool entirely so a panic can be
//! reported even when the pool is saturated or was never started. The report is
//! made before the panic continues unwinding; a failed report is written to stderr
//! and never replaces the original panic.

use std::any::Any;
use std::io::{self, Write};
use std::panic::{catch_unwind, resume_unwind, UnwindSafe};
use std::sync::Arc;
use std::thread;

use tracing::error;

use crate::client::RemoteClient;
use crate::errors::ReportError;
use crate::http_client::HttpClient;

pub struct PanicReporter {
    client: Arc<dyn RemoteClient>,
}

impl PanicReporter {
    pub fn new(client: Arc<dyn RemoteClient>) -> Self {
        Self { client }
    }

    /// Runs `f`. If it panics, the panic is reported at critical severity and then
    /// resumed with its original payload.
    pub fn catch<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R + UnwindSafe,
    {
        match catch_unwind(f) {
            Ok(value) => value,
            Err(payload) => {
                self.report(payload.as_ref(), &mut io::stderr());
                resume_unwind(payload)
            }
        }
    }

    /// Reports a recovered panic payload, writing any failure to `errors`.
    pub(crate) fn report(&self, payload: &(dyn Any + Send), errors: &mut dyn Write) -> Option<String> {
        let message = format!("panic: {:?}", payload_message(payload));
        match report_blocking(Arc::clone(&self.client), message) {
            Ok(id) => Some(id),
            Err(e) => {
                let _ = writeln!(errors, "reporting_panic=false err={:?}", e.to_string());
                error!("Failed to report panic: {e}");
                None
            }
        }
    }
}

/// Runs `f`, reporting a panic to Rollbar under `token` and `environment` before it
/// continues. With an empty token no client is created and `f` simply runs.
pub fn report_panic<F, R>(token: &str, environment: &str, f: F) -> R
where
    F: FnOnce() -> R + UnwindSafe,
{
    if token.is_empty() {
        return f();
    }
    match HttpClient::new(token, environment) {
        Ok(client) => PanicReporter::new(Arc::new(client)).catch(f),
        Err(e) => {
            let _ = writeln!(io::stderr(), "reporting_panic=false err={:?}", e.to_string());
            f()
        }
    }
}

fn payload_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "Box<dyn Any>"
    }
}

// The caller may be on a runtime worker (where blocking on a future is not allowed)
// or on a plain thread with no runtime at all, so the report gets a thread and a
// runtime of its own.
fn report_blocking(client: Arc<dyn RemoteClient>, message: String) -> Result<String, ReportError> {
    let reporter = thread::Builder::new()
        .name("panic-reporter".to_string())
        .spawn(move || -> Result<String, ReportError> {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            runtime.block_on(client.critical(&message))
        })?;
    reporter
        .join()
        .unwrap_or_else(|_| Err(ReportError::Other("panic reporter thread panicked".to_string())))
}
