/*
 * SPDX-FileCopyrightText: 2022 perillamint
 *
 * SPDX-License-Identifier: MPL-2.0
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use super::DeviceTransport;
use crate::consts::{READ_CHUNK_SIZE, READ_POLL_INTERVAL};
use crate::error::BridgeError;
use async_trait::async_trait;
use bytes::Bytes;
use log::trace;
use pretty_hex::*;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// [`DeviceTransport`] over any tokio byte stream (serial port, pipe, socket).
///
/// A read that sees no data within the poll interval reports an empty chunk,
/// the way a serial port with a read timeout does. A zero-length read is
/// end of stream.
pub struct IoTransport<T> {
    io: T,
    buf: Vec<u8>,
    poll_interval: Duration,
}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> IoTransport<T> {
    pub fn new(io: T) -> Self {
        Self {
            io,
            buf: vec![0u8; READ_CHUNK_SIZE],
            poll_interval: READ_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn get_ref(&self) -> &T {
        &self.io
    }

    pub fn into_inner(self) -> T {
        self.io
    }
}

#[async_trait]
impl<T: AsyncRead + AsyncWrite + Unpin + Send> DeviceTransport for IoTransport<T> {
    async fn write(&mut self, data: &[u8]) -> Result<(), BridgeError> {
        trace!("Write - {}", data.hex_dump());
        self.io.write_all(data).await?;
        self.io.flush().await?;
        Ok(())
    }

    async fn read_next(&mut self) -> Result<Option<Bytes>, BridgeError> {
        match tokio::time::timeout(self.poll_interval, self.io.read(&mut self.buf)).await {
            Err(_) => Ok(Some(Bytes::new())),
            Ok(Ok(0)) => Ok(None),
            Ok(Ok(n)) => {
                trace!("Read - {}", self.buf[..n].hex_dump());
                Ok(Some(Bytes::copy_from_slice(&self.buf[..n])))
            }
            Ok(Err(e)) => Err(e.into()),
        }
    }
}
