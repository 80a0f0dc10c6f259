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
use crate::config::SessionConfig;
use crate::error::BridgeError;
use crate::session::{Command, CommandSession, Response};
use async_lock::Mutex;
use std::sync::Arc;

/// Cloneable handle letting several tasks issue commands on one transport.
/// Sessions run one after another; the lock is held for a whole exchange.
pub struct SharedTransport<T> {
    inner: Arc<Mutex<T>>,
    config: SessionConfig,
}

impl<T> Clone for SharedTransport<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            config: self.config.clone(),
        }
    }
}

impl<T: DeviceTransport> SharedTransport<T> {
    pub fn new(transport: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(transport)),
            config: SessionConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub async fn send(&self, command: &Command) -> Result<Response, BridgeError> {
        let mut transport = self.inner.lock().await;
        CommandSession::new(&mut *transport)
            .with_config(self.config.clone())
            .run(command)
            .await
    }
}
