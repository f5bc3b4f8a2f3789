// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Remote clients for unit tests.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::client::{RemoteClient, Severity};
use crate::errors::ReportError;

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub severity: Severity,
    pub message: String,
    pub fields: BTreeMap<String, String>,
}

/// Records every report call; optionally fails them or delays them.
#[derive(Default)]
pub struct RecordingClient {
    reports: Mutex<Vec<Report>>,
    fail: bool,
    delay: Option<Duration>,
}

impl RecordingClient {
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
}

#[async_trait]
impl RemoteClient for RecordingClient {
    async fn report(
        &self,
        severity: Severity,
        message: &str,
        fields: &BTreeMap<String, String>,
    ) -> Result<String, ReportError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let id = {
            let mut reports = self.reports.lock().unwrap();
            reports.push(Report {
                severity,
                message: message.to_string(),
                fields: fields.clone(),
            });
            reports.len()
        };
        if self.fail {
            return Err(ReportError::Other("intake unavailable".to_string()));
        }
        Ok(format!("item-{id}"))
    }
}
