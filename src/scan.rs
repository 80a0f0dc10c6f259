/*
 * SPDX-FileCopyrightText: 2022 perillamint
 *
 * SPDX-License-Identifier: MPL-2.0
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Completion policy of `scan_networks`.
//!
//! The first answer to a scan is often an empty list while the radio is still
//! sweeping. An empty list is held for a grace window so a populated one can
//! replace it; a populated list ends the scan at once.

use log::debug;
use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;

/// Grace window for a scan with the given overall timeout:
/// `timeout / divisor`, clamped to `[min, max]`.
pub fn grace_window(timeout: Duration, divisor: u32, min: Duration, max: Duration) -> Duration {
    min.max((timeout / divisor.max(1)).min(max))
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScanState {
    Seeking,
    GracePeriod { since: Instant, held: Vec<Value> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScanDecision {
    Complete(Vec<Value>),
    Pending,
}

#[derive(Debug)]
pub struct ScanPolicy {
    state: ScanState,
    grace: Duration,
}

impl ScanPolicy {
    pub fn new(grace: Duration) -> Self {
        Self {
            state: ScanState::Seeking,
            grace,
        }
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }

    /// Feed a networks list observed at `now`.
    pub fn observe(&mut self, networks: Vec<Value>, now: Instant) -> ScanDecision {
        if !networks.is_empty() {
            return ScanDecision::Complete(networks);
        }

        if self.state == ScanState::Seeking {
            debug!(
                "Scan empty result observed; waiting up to {}ms for populated list",
                self.grace.as_millis()
            );
            self.state = ScanState::GracePeriod {
                since: now,
                held: networks,
            };
        }
        ScanDecision::Pending
    }

    /// Check whether the grace window has run out at `now`.
    pub fn poll(&mut self, now: Instant) -> ScanDecision {
        match &mut self.state {
            ScanState::GracePeriod { since, held }
                if now.saturating_duration_since(*since) >= self.grace =>
            {
                ScanDecision::Complete(std::mem::take(held))
            }
            _ => ScanDecision::Pending,
        }
    }

    /// Result to report when the exchange ends without a populated list
    /// (overall timeout or stream end). `None` if nothing was ever seen.
    pub fn finish(self) -> Option<Vec<Value>> {
        match self.state {
            ScanState::Seeking => None,
            ScanState::GracePeriod { held, .. } => Some(held),
        }
    }
}
