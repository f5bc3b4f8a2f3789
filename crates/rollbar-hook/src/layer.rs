// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Hooks [`Hook`] into `tracing` as a subscriber layer.
//!
//! Triggered events are captured into an [`Entry`] on the emitting thread and
//! handed to [`Hook::fire`]; nothing here waits on delivery.

use std::fmt;

use chrono::Utc;
use tracing_core::field::{Field, Visit};
use tracing_core::{Event, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

use crate::entry::{Entry, FieldValue, Fields, Level};
use crate::field_codec::classify_debug;
use crate::hook::Hook;

// Our own diagnostics (e.g. failed reports) must not be reported back through the hook.
const INTERNAL_TARGET: &str = env!("CARGO_CRATE_NAME");

impl<S: Subscriber> Layer<S> for Hook {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if is_internal(metadata.target()) {
            return;
        }
        let level = Level::from(*metadata.level());
        if !self.is_triggered(level) {
            return;
        }

        let mut visitor = EntryVisitor::default();
        event.record(&mut visitor);
        self.fire(visitor.into_entry(level, metadata.target()));
    }
}

impl Hook {
    /// Most verbose tracing level any trigger needs, for per-layer filtering.
    pub fn level_filter(&self) -> LevelFilter {
        self.levels()
            .iter()
            .max()
            .map_or(LevelFilter::OFF, |level| {
                LevelFilter::from_level(level.as_tracing())
            })
    }
}

fn is_internal(target: &str) -> bool {
    target
        .strip_prefix(INTERNAL_TARGET)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

#[derive(Default)]
struct EntryVisitor {
    message: Option<String>,
    fields: Fields,
}

impl EntryVisitor {
    fn into_entry(self, level: Level, target: &str) -> Entry {
        Entry {
            level,
            message: self.message.unwrap_or_default(),
            target: target.to_string(),
            fields: self.fields,
            timestamp: Utc::now(),
        }
    }

    fn insert(&mut self, field: &Field, value: FieldValue) {
        self.fields.insert(field.name().to_string(), value);
    }
}

impl Visit for EntryVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.insert(field, FieldValue::Str(value.to_string()));
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, FieldValue::Bool(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, FieldValue::I64(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, FieldValue::U64(value));
    }

    fn record_i128(&mut self, field: &Field, value: i128) {
        self.insert(field, FieldValue::I128(value));
    }

    fn record_u128(&mut self, field: &Field, value: u128) {
        self.insert(field, FieldValue::U128(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, FieldValue::F64(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.insert(field, FieldValue::Error(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let rendered = format!("{value:?}");
        if field.name() == "message" {
            self.message = Some(rendered);
        } else {
            self.insert(field, classify_debug(rendered));
        }
    }
}
