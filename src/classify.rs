/*
 * SPDX-FileCopyrightText: 2022 perillamint
 *
 * SPDX-License-Identifier: MPL-2.0
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Response classification.
//!
//! The firmware answers in one of three shapes:
//!
//! ```text
//! {"networks":[...]}                                  direct
//! {"results":["{\"result\":\"<json-or-object>\"}"]}   wrapped, string encoded
//! {"error":"<message>"}                                error
//! ```
//!
//! Anything else on the console is log noise as far as a command is concerned.

use crate::consts::{MAX_UNWRAP_DEPTH, SCAN_NETWORKS_COMMAND};
use serde_json::Value;

/// Top-level shape of a decoded value.
#[derive(Debug, PartialEq)]
pub enum Shape<'a> {
    Networks(&'a [Value]),
    Wrapped(&'a [Value]),
    Error(&'a Value),
    Unclassified,
}

/// What a decoded value means for the command in flight.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifiedOutcome {
    /// Scan result. May be empty.
    Networks(Vec<Value>),
    /// Unwrapped payload of any other command.
    Payload(Value),
    /// The device reported an error, message kept verbatim.
    DeviceError(String),
}

/// Shape of `value`, checking `networks`, then `error`, then `results`.
///
/// `{"error": null}` carries no error and does not count as one.
pub fn detect_shape(value: &Value) -> Shape<'_> {
    let Some(obj) = value.as_object() else {
        return Shape::Unclassified;
    };

    if let Some(Value::Array(networks)) = obj.get("networks") {
        return Shape::Networks(networks);
    }
    match obj.get("error") {
        Some(Value::Null) | None => {}
        Some(error) => return Shape::Error(error),
    }
    if let Some(Value::Array(results)) = obj.get("results") {
        return Shape::Wrapped(results);
    }

    Shape::Unclassified
}

/// Classify `value` against the command named `command`.
/// Returns `None` when the value is unrelated to it.
pub fn classify(command: &str, value: &Value) -> Option<ClassifiedOutcome> {
    if command == SCAN_NETWORKS_COMMAND {
        return find_networks(value, 0).map(ClassifiedOutcome::Networks);
    }

    // A stray `networks` field does not hide an answer to another command.
    let obj = value.as_object()?;
    match obj.get("error") {
        Some(Value::Null) | None => {}
        Some(error) => return Some(ClassifiedOutcome::DeviceError(error_message(error))),
    }
    match obj.get("results") {
        Some(Value::Array(results)) => Some(ClassifiedOutcome::Payload(unwrap_results(results))),
        _ => None,
    }
}

/// Payload carried by a `results` array: the first entry, its `result`
/// field when present, each decoded from embedded JSON text if possible.
pub fn unwrap_results(results: &[Value]) -> Value {
    let Some(first) = results.first() else {
        return Value::Null;
    };

    let inner = decode_embedded(first);
    match inner {
        Value::Object(mut obj) => match obj.remove("result") {
            Some(result) => decode_embedded(&result),
            None => Value::Object(obj),
        },
        other => other,
    }
}

fn find_networks(value: &Value, depth: usize) -> Option<Vec<Value>> {
    if depth > MAX_UNWRAP_DEPTH {
        return None;
    }
    if let Shape::Networks(networks) = detect_shape(value) {
        return Some(networks.to_vec());
    }

    let obj = value.as_object()?;
    if let Some(result) = obj.get("result") {
        if let Some(networks) = find_networks(&decode_embedded(result), depth + 1) {
            return Some(networks);
        }
    }
    if let Some(Value::Array(results)) = obj.get("results") {
        return results
            .iter()
            .find_map(|entry| find_networks(&decode_embedded(entry), depth + 1));
    }

    None
}

/// Strings holding JSON text are parsed, everything else is kept as is.
fn decode_embedded(value: &Value) -> Value {
    match value {
        Value::String(text) => serde_json::from_str(text).unwrap_or_else(|_| value.clone()),
        other => other.clone(),
    }
}

fn error_message(error: &Value) -> String {
    match error {
        Value::String(message) => message.clone(),
        other => other.to_string(),
    }
}
