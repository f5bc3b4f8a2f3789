// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Error types for reporting and hook construction.

/// Failure of a single report call against the remote service.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response: {0}")]
    Response(String),

    #[error("failed to start panic reporter: {0}")]
    Runtime(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Errors raised while constructing a hook.
#[derive(Debug, thiserror::Error)]
pub enum Creation {
    #[error("no tokio runtime available to run the dispatcher and workers")]
    NoRuntime,

    #[error(transparent)]
    Client(#[from] ReportError),
}

/// Errors raised while installing the global logging setup.
#[derive(Debug, thiserror::Error)]
pub enum Setup {
    #[error(transparent)]
    Creation(#[from] Creation),

    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    #[error("failed to install subscriber: {0}")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown log level: {0}")]
pub struct ParseLevelError(pub String);
