/*
 * SPDX-FileCopyrightText: 2022 perillamint
 *
 * SPDX-License-Identifier: MPL-2.0
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! One request/response exchange with the device.

use crate::classify::{classify, ClassifiedOutcome};
use crate::clock::{Clock, TokioClock};
use crate::codec::FrameDecoder;
use crate::config::SessionConfig;
use crate::consts::{DEFAULT_COMMAND_TIMEOUT, SCAN_NETWORKS_COMMAND, TIMEOUT_MESSAGE};
use crate::error::BridgeError;
use crate::scan::{ScanDecision, ScanPolicy};
use crate::transport::DeviceTransport;
use log::{debug, trace};
use pretty_hex::*;
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;

/// A command addressed to the device.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    name: String,
    parameters: Option<Value>,
    timeout: Duration,
}

#[derive(Serialize)]
struct Envelope<'a> {
    commands: [Descriptor<'a>; 1],
}

#[derive(Serialize)]
struct Descriptor<'a> {
    command: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a Value>,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: None,
            timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    /// Attach parameters, sent as the `data` field.
    pub fn with_parameters<P: Serialize>(mut self, parameters: P) -> Result<Self, BridgeError> {
        let value =
            serde_json::to_value(parameters).map_err(|e| BridgeError::Encode(e.to_string()))?;
        self.parameters = Some(value);
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> Option<&Value> {
        self.parameters.as_ref()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_scan(&self) -> bool {
        self.name == SCAN_NETWORKS_COMMAND
    }

    /// Request line as written to the device, newline terminated.
    pub fn to_wire(&self) -> Result<Vec<u8>, BridgeError> {
        let envelope = Envelope {
            commands: [Descriptor {
                command: &self.name,
                data: self.parameters.as_ref(),
            }],
        };
        let mut line =
            serde_json::to_vec(&envelope).map_err(|e| BridgeError::Encode(e.to_string()))?;
        line.push(b'\n');
        Ok(line)
    }
}

/// Terminal result of a command session.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// The command's payload. Scans yield the networks array.
    Success(Value),
    /// The device answered with an `error` field.
    DeviceError(String),
    /// Nothing qualifying arrived in time, or the stream closed first.
    Timeout,
}

impl Response {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Response::Timeout)
    }

    pub fn payload(&self) -> Option<&Value> {
        match self {
            Response::Success(payload) => Some(payload),
            _ => None,
        }
    }

    /// Render the way the firmware would: payload as is, errors and the
    /// timeout sentinel as `{"error": ...}`.
    pub fn to_json(&self) -> Value {
        match self {
            Response::Success(payload) => payload.clone(),
            Response::DeviceError(message) => json!({ "error": message }),
            Response::Timeout => json!({ "error": TIMEOUT_MESSAGE }),
        }
    }
}

impl From<ClassifiedOutcome> for Response {
    fn from(outcome: ClassifiedOutcome) -> Self {
        match outcome {
            ClassifiedOutcome::Networks(networks) => Response::Success(Value::Array(networks)),
            ClassifiedOutcome::Payload(payload) => Response::Success(payload),
            ClassifiedOutcome::DeviceError(message) => Response::DeviceError(message),
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Success(payload) => write!(f, "{}", payload),
            Response::DeviceError(message) => write!(f, "device error: {}", message),
            Response::Timeout => f.write_str(TIMEOUT_MESSAGE),
        }
    }
}

/// Drives one exchange over a borrowed transport. Only one session may be
/// active on a transport at a time, which the `&mut` borrow enforces.
pub struct CommandSession<'a, T: DeviceTransport + ?Sized, C: Clock = TokioClock> {
    transport: &'a mut T,
    config: SessionConfig,
    clock: C,
}

impl<'a, T: DeviceTransport + ?Sized> CommandSession<'a, T> {
    pub fn new(transport: &'a mut T) -> Self {
        Self {
            transport,
            config: SessionConfig::default(),
            clock: TokioClock,
        }
    }
}

impl<'a, T: DeviceTransport + ?Sized, C: Clock> CommandSession<'a, T, C> {
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_clock<C2: Clock>(self, clock: C2) -> CommandSession<'a, T, C2> {
        CommandSession {
            transport: self.transport,
            config: self.config,
            clock,
        }
    }

    /// Send `command` and wait for its outcome.
    ///
    /// Only transport failures are returned as errors. Device errors and
    /// timeouts are ordinary [`Response`]s.
    pub async fn run(self, command: &Command) -> Result<Response, BridgeError> {
        let wire = command.to_wire()?;
        debug!("Sending: {}", String::from_utf8_lossy(&wire).trim_end());
        self.transport.write(&wire).await?;

        let mut decoder = FrameDecoder::with_limit(self.config.max_buffer_len);
        let mut scan = command
            .is_scan()
            .then(|| ScanPolicy::new(self.config.scan_grace(command.timeout)));
        let start = self.clock.now();

        loop {
            let now = self.clock.now();
            if now.saturating_duration_since(start) >= command.timeout {
                debug!("{} timed out after {}ms", command.name, command.timeout.as_millis());
                break;
            }
            if let Some(policy) = scan.as_mut() {
                if let ScanDecision::Complete(networks) = policy.poll(now) {
                    debug!("Scan grace window elapsed, returning empty result");
                    return Ok(Response::Success(Value::Array(networks)));
                }
            }

            let chunk = match self.transport.read_next().await? {
                Some(chunk) => chunk,
                None => {
                    debug!("Stream closed while waiting for {}", command.name);
                    break;
                }
            };
            if chunk.is_empty() {
                tokio::time::sleep(self.config.idle_delay).await;
                continue;
            }
            trace!("RX: {:?}", chunk.hex_dump());

            let now = self.clock.now();
            for value in decoder.feed(&chunk) {
                let Some(outcome) = classify(&command.name, &value) else {
                    trace!("Ignoring unrelated JSON: {}", value);
                    continue;
                };
                debug!("Received: {}", value);

                match (scan.as_mut(), outcome) {
                    (Some(policy), ClassifiedOutcome::Networks(networks)) => {
                        if let ScanDecision::Complete(networks) = policy.observe(networks, now) {
                            return Ok(Response::Success(Value::Array(networks)));
                        }
                    }
                    // Scans only ever classify as networks.
                    (Some(_), _) => {}
                    (None, outcome) => return Ok(outcome.into()),
                }
            }
        }

        Ok(match scan.and_then(ScanPolicy::finish) {
            Some(networks) => Response::Success(Value::Array(networks)),
            None => Response::Timeout,
        })
    }
}

/// Send a command by name with optional parameters and a timeout.
pub async fn send_command<T: DeviceTransport + ?Sized>(
    transport: &mut T,
    name: &str,
    parameters: Option<Value>,
    timeout: Duration,
) -> Result<Response, BridgeError> {
    let mut command = Command::new(name).with_timeout(timeout);
    command.parameters = parameters;
    CommandSession::new(transport).run(&command).await
}
