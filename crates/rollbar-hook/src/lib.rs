// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Ships error-level tracing events to Rollbar without blocking the caller.
//!
//! The pipeline looks like this:
//!
//! ```text
//!   tracing event ──> Hook::fire ──> Buffer ──> dispatcher ──> Worker ──> RemoteClient
//!                     (never blocks)            (one task)     (N tasks)
//! ```
//!
//! Events whose level is in the trigger set are captured into an [`entry::Entry`] and
//! pushed into a [`buffer::Buffer`]. A single dispatcher task drains the buffer in FIFO
//! order and hands each entry to the next idle worker, which converts the fields with
//! [`field_codec::convert_fields`] and performs the report call. Delivery is best
//! effort: failures are logged and dropped.
//!
//! Panics take a separate synchronous path, see [`panic::PanicReporter`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use rollbar_hook::{hook::{Hook, HookConfig}, layer};
//! use tracing_subscriber::layer::SubscriberExt;
//!
//! let hook = Hook::with_token("token", "production", HookConfig::default())?;
//! let subscriber = tracing_subscriber::registry().with(hook.clone());
//! tracing::subscriber::set_global_default(subscriber)?;
//!
//! tracing::error!(user = "alice", "payment failed");
//!
//! hook.close().await;
//! ```

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod buffer;
pub mod client;
pub mod constants;
pub mod entry;
pub mod errors;
pub mod field_codec;
pub mod hook;
pub mod http_client;
pub mod layer;
pub mod panic;
pub mod setup;
mod worker;

#[cfg(test)]
mod test_support;

pub use crate::buffer::{Buffer, ChannelBuffer, UnboundedBuffer};
pub use crate::client::{RemoteClient, Severity};
pub use crate::entry::{Entry, FieldValue, Level};
pub use crate::hook::{Hook, HookConfig};
pub use crate::panic::{report_panic, PanicReporter};
pub use crate::setup::{setup_logging, LoggingGuard};
