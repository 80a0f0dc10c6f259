/*
 * SPDX-FileCopyrightText: 2022 perillamint
 *
 * SPDX-License-Identifier: MPL-2.0
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use super::io::IoTransport;
use super::DeviceTransport;
use crate::error::BridgeError;
use async_trait::async_trait;
use bytes::Bytes;
use log::debug;
use tokio_serial::{self, SerialPortBuilderExt, SerialStream};

/// Open `tty` as a raw async serial stream.
pub fn open_stream(tty: &str, baud: u32) -> Result<SerialStream, BridgeError> {
    let port = tokio_serial::new(tty, baud)
        .open_native_async()
        .map_err(|e| BridgeError::IOFailure(format!("{}: {}", tty, e)))?;
    debug!("Opened {} at {} baud", tty, baud);
    Ok(port)
}

/// USB CDC / UART link to the device.
pub struct SerialTransport {
    inner: IoTransport<SerialStream>,
}

impl SerialTransport {
    pub fn open(tty: &str, baud: u32) -> Result<Self, BridgeError> {
        Ok(Self {
            inner: IoTransport::new(open_stream(tty, baud)?),
        })
    }
}

#[async_trait]
impl DeviceTransport for SerialTransport {
    async fn write(&mut self, data: &[u8]) -> Result<(), BridgeError> {
        self.inner.write(data).await
    }

    async fn read_next(&mut self) -> Result<Option<Bytes>, BridgeError> {
        self.inner.read_next().await
    }
}
