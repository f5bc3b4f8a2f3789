// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;

use crate::entry::Level;
use crate::errors::ReportError;

/// Severity vocabulary of the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Error,
    Warning,
    Info,
    Debug,
}

impl From<Level> for Severity {
    fn from(level: Level) -> Self {
        match level {
            Level::Panic | Level::Fatal => Severity::Critical,
            Level::Error => Severity::Error,
            Level::Warn => Severity::Warning,
            Level::Info => Severity::Info,
            Level::Debug | Level::Trace => Severity::Debug,
        }
    }
}

/// Connection to the error-aggregation service.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Sends one report and returns the identifier the service assigned to it.
    async fn report(
        &self,
        severity: Severity,
        message: &str,
        fields: &BTreeMap<String, String>,
    ) -> Result<String, ReportError>;

    /// Reports at the highest severity with no fields. Used for panics.
    async fn critical(&self, message: &str) -> Result<String, ReportError> {
        self.report(Severity::Critical, message, &BTreeMap::new())
            .await
    }
}
