/*
 * SPDX-FileCopyrightText: 2022 perillamint
 *
 * SPDX-License-Identifier: MPL-2.0
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use openiris_bridge::codec::JsonFrameCodec;
use openiris_bridge::consts::DEFAULT_BAUD;
use openiris_bridge::transport::serial::{open_stream, SerialTransport};
use openiris_bridge::{BridgeError, Command, DeviceClient, ScanRetry};

use clap::Parser;
use futures::StreamExt;
use log::error;
use std::time::Duration;
use tokio_util::codec::FramedRead;

#[macro_use]
extern crate lazy_static;

#[derive(clap::Parser)]
#[clap(about, version, author)]
struct Args {
    #[clap(long, short = 'p', value_name = "TTY", default_value = "/dev/ttyACM0")]
    port: String,
    #[clap(long, short = 'b', default_value_t = DEFAULT_BAUD)]
    baud: u32,
    #[clap(subcommand)]
    action: Action,
}

#[derive(clap::Subcommand)]
enum Action {
    /// Send one command and print the device's answer as JSON
    Send {
        command: String,
        /// Parameters as a JSON document
        #[clap(long, short = 'd')]
        data: Option<String>,
        #[clap(long, short = 't', default_value_t = 15000)]
        timeout_ms: u64,
    },
    /// Scan for WiFi networks
    Scan {
        #[clap(long, short = 't', default_value_t = 30000)]
        timeout_ms: u64,
    },
    /// Print every JSON object the device emits
    Monitor,
}

lazy_static! {
    static ref ARGS: Args = Args::parse();
}

#[tokio::main]
async fn main() {
    env_logger::init();
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), BridgeError> {
    match &ARGS.action {
        Action::Send {
            command,
            data,
            timeout_ms,
        } => {
            let mut cmd =
                Command::new(command.as_str()).with_timeout(Duration::from_millis(*timeout_ms));
            if let Some(data) = data {
                let params: serde_json::Value = serde_json::from_str(data)
                    .map_err(|e| BridgeError::InvalidParameters(e.to_string()))?;
                cmd = cmd.with_parameters(params)?;
            }

            let mut client = DeviceClient::new(SerialTransport::open(&ARGS.port, ARGS.baud)?);
            let resp = client.send(&cmd).await?;
            println!("{}", resp.to_json());
        }
        Action::Scan { timeout_ms } => {
            let retry = ScanRetry {
                timeout: Duration::from_millis(*timeout_ms),
                ..ScanRetry::default()
            };
            let mut client = DeviceClient::new(SerialTransport::open(&ARGS.port, ARGS.baud)?)
                .with_scan_retry(retry);
            for network in client.scan_networks().await? {
                println!(
                    "{:>4} dBm  ch{:<3} {}",
                    network.rssi, network.channel, network.ssid
                );
            }
        }
        Action::Monitor => {
            let port = open_stream(&ARGS.port, ARGS.baud)?;
            let mut frames = FramedRead::new(port, JsonFrameCodec::default());
            while let Some(frame) = frames.next().await {
                println!("{}", frame?);
            }
        }
    }
    Ok(())
}
