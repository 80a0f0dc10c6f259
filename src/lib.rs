/*
 * SPDX-FileCopyrightText: 2022 perillamint
 *
 * SPDX-License-Identifier: MPL-2.0
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Host side of the OpenIris JSON command channel.
//!
//! Commands go out as a single JSON line; replies come back interleaved with
//! the firmware's console output. A [`session::CommandSession`] writes one
//! command and reads until the reply, a device error, or a timeout.

pub mod classify;
pub mod client;
pub mod clock;
pub mod codec;
pub mod config;
pub mod consts;
pub mod error;
pub mod scan;
pub mod session;
pub mod transport;

pub use client::{DeviceClient, DeviceMode, WifiNetwork, WifiStatus};
pub use config::{ScanRetry, SessionConfig};
pub use error::BridgeError;
pub use session::{send_command, Command, CommandSession, Response};
pub use transport::DeviceTransport;
