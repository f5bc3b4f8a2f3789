// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

/// Workers started per available CPU when no worker count is configured.
pub const WORKERS_PER_CPU: usize = 8;

/// Bounded buffer slots per worker when no buffer is configured.
pub const BUFFER_SLOTS_PER_WORKER: usize = 2;

/// Item endpoint of the Rollbar API.
pub const DEFAULT_ENDPOINT: &str = "https://api.rollbar.com/api/1/item/";

/// Timeout applied to each report request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Overrides the worker count.
pub const WORKERS_ENV: &str = "ROLLBAR_WORKERS";

/// Comma-separated trigger levels, e.g. `error,panic`.
pub const LEVELS_ENV: &str = "ROLLBAR_LEVELS";
