/*
 * SPDX-FileCopyrightText: 2022 perillamint
 *
 * SPDX-License-Identifier: MPL-2.0
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use thiserror::Error;

/// Failures that escape a command session.
///
/// Protocol level anomalies (noise, malformed JSON, missing answers) never
/// show up here. They end in a [`Response`](crate::session::Response) instead.
#[derive(Error, Debug, PartialEq)]
pub enum BridgeError {
    #[error("Failed to do I/O: {0}")]
    IOFailure(String),
    #[error("Device disconnected.")]
    Disconnected,
    #[error("Failed to encode command: {0}")]
    Encode(String),
    #[error("Invalid command parameters: {0}")]
    InvalidParameters(String),
}

impl From<std::io::Error> for BridgeError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::NotConnected => BridgeError::Disconnected,
            _ => BridgeError::IOFailure(e.to_string()),
        }
    }
}
