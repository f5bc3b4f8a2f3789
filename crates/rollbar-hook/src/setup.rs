// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! One-call logging bootstrap for applications.

use std::env;

use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use crate::errors::Setup;
use crate::hook::{Hook, HookConfig};

const DEFAULT_DIRECTIVES: &str = "info";

/// Keeps the installed hook reachable so it can be closed before exit.
#[derive(Debug)]
pub struct LoggingGuard {
    hook: Option<Hook>,
}

impl LoggingGuard {
    pub fn hook(&self) -> Option<&Hook> {
        self.hook.as_ref()
    }

    /// Closes the hook if one was installed.
    pub async fn close(&self) {
        if let Some(hook) = &self.hook {
            hook.close().await;
        }
    }
}

/// Installs the global subscriber: plain-text output without timestamps, filtered by
/// `RUST_LOG` (default `info`), plus a Rollbar hook when `token` is non-empty.
///
/// Must be called from within a tokio runtime when a token is given.
pub fn setup_logging(token: &str, environment: &str, config: HookConfig) -> Result<LoggingGuard, Setup> {
    let filter = build_filter(env::var(EnvFilter::DEFAULT_ENV).ok())?;
    let output = tracing_subscriber::fmt::layer()
        .with_target(true)
        .without_time()
        .with_filter(filter);

    let hook = if token.is_empty() {
        None
    } else {
        Some(Hook::with_token(token, environment, config)?)
    };
    let reporting = hook.clone().map(|hook| {
        let level = hook.level_filter();
        hook.with_filter(level)
    });

    tracing_subscriber::registry()
        .with(output)
        .with(reporting)
        .try_init()?;

    Ok(LoggingGuard { hook })
}

fn build_filter(directives: Option<String>) -> Result<EnvFilter, Setup> {
    let directives = directives
        .filter(|val| !val.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DIRECTIVES.to_string());
    Ok(EnvFilter::try_new(directives)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_defaults_to_info() {
        let filter = build_filter(None).unwrap();
        assert_eq!(filter.to_string(), "info");

        let filter = build_filter(Some("  ".to_string())).unwrap();
        assert_eq!(filter.to_string(), "info");
    }

    #[test]
    fn test_build_filter_uses_directives() {
        let filter = build_filter(Some("warn,billing=debug".to_string())).unwrap();
        let rendered = filter.to_string();
        assert!(rendered.contains("billing=debug"));
        assert!(rendered.contains("warn"));
    }

    #[test]
    fn test_build_filter_rejects_garbage() {
        assert!(matches!(
            build_filter(Some("billing=notalevel".to_string())),
            Err(Setup::Filter(_))
        ));
    }

    #[tokio::test]
    async fn test_guard_without_hook_closes_immediately() {
        let guard = LoggingGuard { hook: None };
        assert!(guard.hook().is_none());
        guard.close().await;
    }
}
