/*
 * SPDX-FileCopyrightText: 2022 perillamint
 *
 * SPDX-License-Identifier: MPL-2.0
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::time::Duration;

/// Command name of the WiFi scan. The only command with a completion policy
/// other than "first answer wins".
pub const SCAN_NETWORKS_COMMAND: &str = "scan_networks";

/// Literal carried by the timeout sentinel when rendered as device JSON.
pub const TIMEOUT_MESSAGE: &str = "Command timeout";

/// Default overall timeout of a single command.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_millis(15000);
/// Default overall timeout used by the client for scans. Scans on the
/// device take several seconds.
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_millis(30000);

/// Lower bound of the empty-scan grace window.
pub const SCAN_GRACE_MIN: Duration = Duration::from_millis(1500);
/// Upper bound of the empty-scan grace window.
pub const SCAN_GRACE_MAX: Duration = Duration::from_millis(5000);
/// The grace window is the overall timeout divided by this, then clamped.
pub const SCAN_GRACE_DIVISOR: u32 = 8;

/// Sleep after an empty chunk so an idle transport does not spin.
pub const IDLE_DELAY: Duration = Duration::from_millis(30);

/// Ceiling of the decode buffer. Past this, unframed device output is dropped.
pub const MAX_BUFFER_LENGTH: usize = 64 * 1024;

/// How deep the classifier follows `result`/`results` wrappers looking
/// for a `networks` array.
pub const MAX_UNWRAP_DEPTH: usize = 4;

/// OpenIris firmware console speed.
pub const DEFAULT_BAUD: u32 = 115200;
/// Read size of a single transport read.
pub const READ_CHUNK_SIZE: usize = 1024;
/// How long an [`IoTransport`](crate::transport::io::IoTransport) waits for
/// data before reporting an empty chunk.
pub const READ_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Client side scan retries when the device keeps answering with an empty list.
pub const SCAN_ATTEMPTS: usize = 3;
pub const SCAN_RETRY_DELAY: Duration = Duration::from_millis(400);
