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
use crate::error::BridgeError;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::VecDeque;
use std::time::Duration;

enum Step {
    Chunk(Duration, Vec<u8>),
    Close(Duration),
    Fail(BridgeError),
}

/// Transport replaying a fixed script of chunks. Once the script runs out it
/// behaves like an idle serial port and keeps returning empty chunks.
pub(crate) struct ScriptedTransport {
    steps: VecDeque<Step>,
    pub written: Vec<Vec<u8>>,
    pub reads: usize,
    write_error: Option<BridgeError>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            steps: VecDeque::new(),
            written: vec![],
            reads: 0,
            write_error: None,
        }
    }

    pub fn chunk(mut self, after_ms: u64, data: &[u8]) -> Self {
        self.steps
            .push_back(Step::Chunk(Duration::from_millis(after_ms), data.to_vec()));
        self
    }

    pub fn close(mut self, after_ms: u64) -> Self {
        self.steps
            .push_back(Step::Close(Duration::from_millis(after_ms)));
        self
    }

    pub fn fail_read(mut self, e: BridgeError) -> Self {
        self.steps.push_back(Step::Fail(e));
        self
    }

    pub fn fail_write(mut self, e: BridgeError) -> Self {
        self.write_error = Some(e);
        self
    }

    pub fn written_text(&self) -> Vec<String> {
        self.written
            .iter()
            .map(|w| String::from_utf8_lossy(w).into_owned())
            .collect()
    }
}

#[async_trait]
impl DeviceTransport for ScriptedTransport {
    async fn write(&mut self, data: &[u8]) -> Result<(), BridgeError> {
        if let Some(e) = self.write_error.take() {
            return Err(e);
        }
        self.written.push(data.to_vec());
        Ok(())
    }

    async fn read_next(&mut self) -> Result<Option<Bytes>, BridgeError> {
        self.reads += 1;
        match self.steps.pop_front() {
            Some(Step::Chunk(delay, data)) => {
                tokio::time::sleep(delay).await;
                Ok(Some(Bytes::from(data)))
            }
            Some(Step::Close(delay)) => {
                tokio::time::sleep(delay).await;
                Ok(None)
            }
            Some(Step::Fail(e)) => Err(e),
            None => {
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok(Some(Bytes::new()))
            }
        }
    }
}
