use futures::StreamExt;
use openiris_bridge::codec::JsonFrameCodec;
use openiris_bridge::consts::SCAN_NETWORKS_COMMAND;
use openiris_bridge::transport::io::IoTransport;
use openiris_bridge::{send_command, Command, CommandSession, Response};
use serde_json::json;
use std::time::Duration;
use tokio_test::io::Builder;
use tokio_util::codec::FramedRead;

const BOOT_LOG: &[u8] = b"\x1b[0;32mI (245) cpu_start: Starting scheduler.\x1b[0m\r\n";
const EMPTY_SCAN: &[u8] = b"{\"networks\":[]}\r\n";
const HOME_SCAN: &[u8] = b"{\"networks\":[{\"ssid\":\"Home\",\"rssi\":-40}]}\r\n";

fn request(name: &str) -> Vec<u8> {
    format!("{{\"commands\":[{{\"command\":\"{}\"}}]}}\n", name).into_bytes()
}

#[tokio::test(start_paused = true)]
async fn mdns_name_through_boot_noise() {
    let mock = Builder::new()
        .write(&request("get_mdns_name"))
        .read(BOOT_LOG)
        .read(b"{\"results\":[\"{\\\"result\\\":\\\"{\\\\\\\"hostname\\\\\\\":")
        .read(b"\\\\\\\"tracker1\\\\\\\"}\\\"}\"]}\r\n")
        .build();
    let mut transport = IoTransport::new(mock);

    let resp = send_command(&mut transport, "get_mdns_name", None, Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(resp, Response::Success(json!({"hostname": "tracker1"})));
}

#[tokio::test(start_paused = true)]
async fn empty_scan_superseded() {
    let mock = Builder::new()
        .write(&request(SCAN_NETWORKS_COMMAND))
        .read(EMPTY_SCAN)
        .wait(Duration::from_millis(900))
        .read(HOME_SCAN)
        .build();
    let mut transport = IoTransport::new(mock);

    let resp = send_command(
        &mut transport,
        SCAN_NETWORKS_COMMAND,
        None,
        Duration::from_secs(12),
    )
    .await
    .unwrap();
    assert_eq!(resp, Response::Success(json!([{"ssid": "Home", "rssi": -40}])));
}

#[tokio::test(start_paused = true)]
async fn empty_scan_after_grace() {
    let mock = Builder::new()
        .write(&request(SCAN_NETWORKS_COMMAND))
        .read(EMPTY_SCAN)
        .wait(Duration::from_secs(30))
        .build();
    let mut transport = IoTransport::new(mock);

    let start = tokio::time::Instant::now();
    let resp = send_command(
        &mut transport,
        SCAN_NETWORKS_COMMAND,
        None,
        Duration::from_secs(12),
    )
    .await
    .unwrap();
    assert_eq!(resp, Response::Success(json!([])));
    assert!(start.elapsed() < Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn switch_mode_device_error() {
    let mock = Builder::new()
        .write(b"{\"commands\":[{\"command\":\"switch_mode\",\"data\":{\"mode\":\"bogus\"}}]}\n")
        .read(BOOT_LOG)
        .read(b"{\"error\":\"invalid mode\"}\r\n")
        .build();
    let mut transport = IoTransport::new(mock);

    let cmd = Command::new("switch_mode")
        .with_parameters(json!({"mode": "bogus"}))
        .unwrap()
        .with_timeout(Duration::from_secs(5));
    let resp = CommandSession::new(&mut transport).run(&cmd).await.unwrap();
    assert_eq!(resp, Response::DeviceError("invalid mode".to_string()));
}

#[tokio::test(start_paused = true)]
async fn silent_device_times_out() {
    let mock = Builder::new()
        .write(&request("get_wifi_status"))
        .wait(Duration::from_secs(60))
        .build();
    let mut transport = IoTransport::new(mock);

    let resp = send_command(&mut transport, "get_wifi_status", None, Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(resp, Response::Timeout);
    assert_eq!(resp.to_json(), json!({"error": "Command timeout"}));
}

#[tokio::test(start_paused = true)]
async fn last_brace_in_its_own_read() {
    let mock = Builder::new()
        .write(&request("get_device_mode"))
        .read(b"{\"results\":[{\"result\":\"{\\\"mode\\\":\\\"auto\\\"}\"}]")
        .read(b"}")
        .build();
    let mut transport = IoTransport::new(mock);

    let resp = send_command(&mut transport, "get_device_mode", None, Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(resp, Response::Success(json!({"mode": "auto"})));
}

#[tokio::test(start_paused = true)]
async fn closed_port_is_inconclusive() {
    let mock = Builder::new()
        .write(&request("get_device_mode"))
        .read(BOOT_LOG)
        .build();
    let mut transport = IoTransport::new(mock);

    let resp = send_command(&mut transport, "get_device_mode", None, Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(resp, Response::Timeout);
}

#[tokio::test]
async fn monitor_stream_of_values() {
    let mock = Builder::new()
        .read(BOOT_LOG)
        .read(b"{\"heartbeat\":")
        .read(b"1}\r\nI (300) wifi: sta start\r\n{\"networks\":[]}")
        .build();
    let frames: Vec<_> = FramedRead::new(mock, JsonFrameCodec::default())
        .map(|frame| frame.unwrap())
        .collect()
        .await;
    assert_eq!(frames, vec![json!({"heartbeat": 1}), json!({"networks": []})]);
}
