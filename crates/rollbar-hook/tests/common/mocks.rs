// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Mock remote clients

use rollbar_hook::client::{RemoteClient, Severity};
use rollbar_hook::errors::ReportError;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub severity: Severity,
    pub message: String,
    pub fields: BTreeMap<String, String>,
}

/// Mock client that records every report
#[derive(Default)]
pub struct MockClient {
    reports: Mutex<Vec<Report>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay: Option<Duration>,
    fail: bool,
}

#[allow(dead_code)]
impl MockClient {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn reports(&self) -> Vec<Report> {
        self.reports.lock().unwrap().clone()
    }

    /// Highest number of report calls observed running at the same time
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl RemoteClient for MockClient {
    async fn report(
        &self,
        severity: Severity,
        message: &str,
        fields: &BTreeMap<String, String>,
    ) -> Result<String, ReportError> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.reports.lock().unwrap().push(Report {
            severity,
            message: message.to_string(),
            fields: fields.clone(),
        });
        if self.fail {
            return Err(ReportError::Other("intake unavailable".to_string()));
        }
        Ok(format!("item-{message}"))
    }
}
