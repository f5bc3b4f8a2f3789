// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Converts structured entry fields into the string-only map the remote service accepts.
//!
//! Rules, first match wins:
//!
//! 1. timestamps are rendered as RFC 3339 with second precision, keeping their offset
//! 2. values with a textual form (strings, numbers, booleans, error text) use it as is
//! 3. anything else keeps its captured `Debug` rendering, which spells out fields
//!
//! The conversion is pure: the same input always yields the same output.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, SecondsFormat};

use crate::entry::{FieldValue, Fields};

pub fn convert_fields(fields: &Fields) -> BTreeMap<String, String> {
    fields
        .iter()
        .map(|(key, value)| (key.clone(), convert_value(value)))
        .collect()
}

pub fn convert_value(value: &FieldValue) -> String {
    match value {
        FieldValue::Timestamp(at) => format_timestamp(at),
        FieldValue::Str(s) => s.clone(),
        FieldValue::Bool(b) => b.to_string(),
        FieldValue::I64(n) => n.to_string(),
        FieldValue::U64(n) => n.to_string(),
        FieldValue::I128(n) => n.to_string(),
        FieldValue::U128(n) => n.to_string(),
        FieldValue::F64(n) => n.to_string(),
        FieldValue::Error(message) => message.clone(),
        // An empty rendering would read as a missing value on the remote side.
        FieldValue::Debug(rendered) if rendered.is_empty() => format!("{rendered:?}"),
        FieldValue::Debug(rendered) => rendered.clone(),
    }
}

pub fn format_timestamp(at: &DateTime<FixedOffset>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Classifies a value that is only available through its `Debug` rendering.
///
/// chrono's date-times render as RFC 3339 under `Debug`, so a rendering that parses
/// as one is treated as a timestamp. The rendering is only re-tagged when
/// [`format_timestamp`] reproduces it exactly; anything else is kept verbatim.
pub fn classify_debug(rendered: String) -> FieldValue {
    match DateTime::parse_from_rfc3339(&rendered) {
        Ok(at) if format_timestamp(&at) == rendered => FieldValue::Timestamp(at),
        _ => FieldValue::Debug(rendered),
    }
}
