//! Integration tests for the layered transport stack.
//!
//! Mock → MonitorTransport → LineChannel, the same stacking the CLI uses
//! when `--monitor` is set. Real ports are only touched by the ignored test.

use std::time::Duration;

use openfire_transport::{
    Command, FieldMode, LineChannel, MockTransport, MonitorConfig, MonitorTransport,
    SerialDiscovery, TrafficFilter, TransportError,
};

const T: Duration = Duration::from_millis(100);

fn monitored(mock: MockTransport) -> LineChannel {
    let config = MonitorConfig::default()
        .with_hex(true)
        .with_filter(TrafficFilter::All);
    LineChannel::new(MonitorTransport::wrap(Box::new(mock), config))
}

// ── monitor middleware ──

#[test]
fn monitor_is_transparent() {
    let mock = MockTransport::new();
    let handle = mock.handle();
    handle.expect("XP", "OpenFIRE,5.2,Dawn,rpipico,0\r\n");
    let mut channel = monitored(mock);

    let fields = channel
        .query_record(&Command::Probe, 5, T)
        .unwrap()
        .unwrap();

    assert_eq!(fields, vec!["OpenFIRE", "5.2", "Dawn", "rpipico", "0"]);
    assert_eq!(handle.sent(), vec!["XP"]);
    assert_eq!(channel.device_info().port, "mock");
}

#[test]
fn monitor_forwards_send_errors() {
    let mock = MockTransport::new();
    let handle = mock.handle();
    let mut channel = monitored(mock);

    handle.fail_sends(true);
    let err = channel.send(&Command::Heartbeat).unwrap_err();
    assert!(err.is_disconnect());
}

// ── framing ──

#[test]
fn record_split_across_chunks() {
    let mock = MockTransport::new();
    let handle = mock.handle();
    handle.push_rx("1,FIRE");
    handle.push_rx_delayed(Duration::from_millis(20), "Con P1\r\n");
    let mut channel = LineChannel::new(Box::new(mock));

    let fields = channel.read_record(2, T).unwrap().unwrap();
    assert_eq!(fields, vec!["1", "FIRECon P1"]);
}

#[test]
fn per_line_record_stops_at_expected() {
    let mock = MockTransport::new();
    let handle = mock.handle();
    handle.push_rx("0\r\n1\r\n0\r\nPressed:02\r\n");
    let mut channel = LineChannel::new(Box::new(mock));
    channel.set_field_mode(FieldMode::PerLine);

    let fields = channel.read_record(3, T).unwrap().unwrap();
    assert_eq!(fields, vec!["0", "1", "0"]);
    assert_eq!(channel.poll_line().unwrap().as_deref(), Some("Pressed:02"));
}

// ── serial ──

#[test]
fn opening_missing_port_fails() {
    let err = SerialDiscovery::new()
        .open("/dev/openfire-does-not-exist")
        .err()
        .unwrap();
    assert!(matches!(
        err,
        TransportError::Open { .. } | TransportError::DeviceNotFound(_)
    ));
}

#[test]
#[ignore] // requires hardware
fn probe_real_board() {
    let mut channel = LineChannel::new(SerialDiscovery::new().open_any().unwrap());
    let line = channel.query(&Command::Probe, T * 20).unwrap().unwrap();
    assert!(line.starts_with("OpenFIRE"));
    channel.send(&Command::Undock).unwrap();
}
