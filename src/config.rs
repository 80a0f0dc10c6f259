/*
 * SPDX-FileCopyrightText: 2022 perillamint
 *
 * SPDX-License-Identifier: MPL-2.0
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::consts::{
    DEFAULT_SCAN_TIMEOUT, IDLE_DELAY, MAX_BUFFER_LENGTH, SCAN_ATTEMPTS, SCAN_GRACE_DIVISOR,
    SCAN_GRACE_MAX, SCAN_GRACE_MIN, SCAN_RETRY_DELAY,
};
use crate::scan::grace_window;
use std::time::Duration;

/// Tunables of a command session. Per-command timeouts live on the
/// [`Command`](crate::session::Command) itself.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Sleep after an empty chunk.
    pub idle_delay: Duration,
    /// Ceiling of the decode buffer.
    pub max_buffer_len: usize,
    pub scan_grace_min: Duration,
    pub scan_grace_max: Duration,
    pub scan_grace_divisor: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_delay: IDLE_DELAY,
            max_buffer_len: MAX_BUFFER_LENGTH,
            scan_grace_min: SCAN_GRACE_MIN,
            scan_grace_max: SCAN_GRACE_MAX,
            scan_grace_divisor: SCAN_GRACE_DIVISOR,
        }
    }
}

impl SessionConfig {
    /// Grace window applied to an empty scan result under `timeout`.
    pub fn scan_grace(&self, timeout: Duration) -> Duration {
        grace_window(
            timeout,
            self.scan_grace_divisor,
            self.scan_grace_min,
            self.scan_grace_max,
        )
    }
}

/// Client side retry of scans that keep coming back empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanRetry {
    pub attempts: usize,
    pub delay: Duration,
    pub timeout: Duration,
}

impl Default for ScanRetry {
    fn default() -> Self {
        Self {
            attempts: SCAN_ATTEMPTS,
            delay: SCAN_RETRY_DELAY,
            timeout: DEFAULT_SCAN_TIMEOUT,
        }
    }
}
