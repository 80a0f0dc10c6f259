/*
 * SPDX-FileCopyrightText: 2022 perillamint
 *
 * SPDX-License-Identifier: MPL-2.0
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Typed access to the firmware's JSON commands.

use crate::config::{ScanRetry, SessionConfig};
use crate::consts::{DEFAULT_COMMAND_TIMEOUT, SCAN_NETWORKS_COMMAND};
use crate::error::BridgeError;
use crate::session::{Command, CommandSession, Response};
use crate::transport::DeviceTransport;
use log::{debug, info, trace, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiNetwork {
    pub ssid: String,
    #[serde(default)]
    pub rssi: i32,
    #[serde(default)]
    pub channel: u8,
    #[serde(default)]
    pub auth_mode: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WifiStatus {
    Connected { ip_address: String },
    Connecting,
    Disconnected,
    Error { message: String },
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceMode {
    Wifi,
    Uvc,
    Auto,
    Unknown,
}

impl FromStr for DeviceMode {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wifi" => Ok(DeviceMode::Wifi),
            "uvc" => Ok(DeviceMode::Uvc),
            "auto" => Ok(DeviceMode::Auto),
            other => Err(BridgeError::InvalidParameters(format!(
                "unknown device mode: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for DeviceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeviceMode::Wifi => "wifi",
            DeviceMode::Uvc => "uvc",
            DeviceMode::Auto => "auto",
            DeviceMode::Unknown => "unknown",
        })
    }
}

/// Networks of a scan payload. Entries that do not look like networks are skipped.
pub fn parse_networks(payload: &Value) -> Vec<WifiNetwork> {
    let entries: &[Value] = match payload {
        Value::Array(entries) => entries.as_slice(),
        Value::Object(obj) => match obj.get("networks") {
            Some(Value::Array(entries)) => entries.as_slice(),
            _ => &[],
        },
        _ => &[],
    };

    entries
        .iter()
        .filter_map(|entry| match serde_json::from_value(entry.clone()) {
            Ok(network) => Some(network),
            Err(e) => {
                trace!("Skipping scan entry {}: {}", entry, e);
                None
            }
        })
        .collect()
}

pub fn parse_wifi_status(payload: &Value) -> WifiStatus {
    let status = payload.get("status").and_then(Value::as_str);
    let ip = payload
        .get("ip_address")
        .and_then(Value::as_str)
        .filter(|ip| !ip.is_empty() && *ip != "0.0.0.0");

    match (status, ip) {
        (Some("error"), _) => WifiStatus::Error {
            message: payload
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("error")
                .to_string(),
        },
        (_, Some(ip)) => WifiStatus::Connected {
            ip_address: ip.to_string(),
        },
        (Some("connecting"), None) => WifiStatus::Connecting,
        (Some("disconnected"), None) => WifiStatus::Disconnected,
        _ => WifiStatus::Unknown,
    }
}

pub fn parse_device_mode(payload: &Value) -> DeviceMode {
    payload
        .get("mode")
        .and_then(Value::as_str)
        .and_then(|mode| mode.parse().ok())
        .unwrap_or(DeviceMode::Unknown)
}

pub fn parse_mdns_name(payload: &Value) -> Option<String> {
    payload
        .get("hostname")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// High level client owning a transport.
pub struct DeviceClient<T> {
    transport: T,
    config: SessionConfig,
    retry: ScanRetry,
}

impl<T: DeviceTransport> DeviceClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            config: SessionConfig::default(),
            retry: ScanRetry::default(),
        }
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_scan_retry(mut self, retry: ScanRetry) -> Self {
        self.retry = retry;
        self
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    pub async fn send(&mut self, command: &Command) -> Result<Response, BridgeError> {
        CommandSession::new(&mut self.transport)
            .with_config(self.config.clone())
            .run(command)
            .await
    }

    async fn query(&mut self, name: &str) -> Result<Option<Value>, BridgeError> {
        let command = Command::new(name).with_timeout(DEFAULT_COMMAND_TIMEOUT);
        match self.send(&command).await? {
            Response::Success(payload) => Ok(Some(payload)),
            other => {
                warn!("{} failed: {}", name, other);
                Ok(None)
            }
        }
    }

    async fn set<P: Serialize>(&mut self, name: &str, parameters: P) -> Result<bool, BridgeError> {
        let command = Command::new(name)
            .with_parameters(parameters)?
            .with_timeout(DEFAULT_COMMAND_TIMEOUT);
        let resp = self.send(&command).await?;
        if !matches!(resp, Response::Success(_)) {
            warn!("{} failed: {}", name, resp);
        }
        Ok(matches!(resp, Response::Success(_)))
    }

    /// Scan for WiFi networks, retrying while the device reports none.
    pub async fn scan_networks(&mut self) -> Result<Vec<WifiNetwork>, BridgeError> {
        let attempts = self.retry.attempts.max(1);
        for attempt in 1..=attempts {
            let command = Command::new(SCAN_NETWORKS_COMMAND).with_timeout(self.retry.timeout);
            let networks = match self.send(&command).await? {
                Response::Success(payload) => parse_networks(&payload),
                _ => vec![],
            };
            debug!(
                "scan_networks attempt {}/{}: {} networks",
                attempt,
                attempts,
                networks.len()
            );
            if !networks.is_empty() {
                return Ok(networks);
            }
            if attempt < attempts {
                tokio::time::sleep(self.retry.delay).await;
            }
        }
        Ok(vec![])
    }

    pub async fn wifi_status(&mut self) -> Result<WifiStatus, BridgeError> {
        Ok(self
            .query("get_wifi_status")
            .await?
            .map(|payload| parse_wifi_status(&payload))
            .unwrap_or(WifiStatus::Unknown))
    }

    pub async fn device_mode(&mut self) -> Result<DeviceMode, BridgeError> {
        Ok(self
            .query("get_device_mode")
            .await?
            .map(|payload| parse_device_mode(&payload))
            .unwrap_or(DeviceMode::Unknown))
    }

    pub async fn mdns_name(&mut self) -> Result<Option<String>, BridgeError> {
        Ok(self
            .query("get_mdns_name")
            .await?
            .and_then(|payload| parse_mdns_name(&payload)))
    }

    pub async fn set_mdns(&mut self, hostname: &str) -> Result<bool, BridgeError> {
        self.set("set_mdns", json!({ "hostname": hostname })).await
    }

    pub async fn switch_mode(&mut self, mode: DeviceMode) -> Result<bool, BridgeError> {
        if mode == DeviceMode::Unknown {
            return Err(BridgeError::InvalidParameters(
                "cannot switch to unknown mode".to_string(),
            ));
        }
        self.set("switch_mode", json!({ "mode": mode.to_string() }))
            .await
    }

    /// Pause or resume the device's streaming. Its acknowledgement is often
    /// buried under boot logs, so a timeout is passed through for the caller
    /// to treat as "probably done".
    pub async fn pause(&mut self, pause: bool, timeout: Duration) -> Result<Response, BridgeError> {
        let command = Command::new("pause")
            .with_parameters(json!({ "pause": pause }))?
            .with_timeout(timeout);
        let resp = self.send(&command).await?;
        if resp.is_timeout() {
            info!("Pause command sent (startup logs may have obscured response)");
        }
        Ok(resp)
    }
}
