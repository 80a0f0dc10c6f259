/*
 * SPDX-FileCopyrightText: 2022 perillamint
 *
 * SPDX-License-Identifier: MPL-2.0
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use super::error::BridgeError;
use async_trait::async_trait;
use bytes::Bytes;

pub mod io;
#[cfg(feature = "serial")]
pub mod serial;
pub mod shared;

#[cfg(test)]
pub(crate) mod mock;

/// Byte-stream link to the device.
#[async_trait]
pub trait DeviceTransport: Send {
    /// Write the whole buffer to the device.
    async fn write(&mut self, data: &[u8]) -> Result<(), BridgeError>;
    /// Read whatever arrived next. `Ok(None)` means the stream is closed.
    /// An empty chunk means nothing arrived yet and is not an error.
    async fn read_next(&mut self) -> Result<Option<Bytes>, BridgeError>;
}
