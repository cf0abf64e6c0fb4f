//! Integration tests for the tool layer: config file handling and rendering
//! of a session loaded from a scripted board.

use openfire_device::{DeviceSession, Setting};
use openfire_tool::{format, AppConfig, FieldModeSetting};
use openfire_transport::{FieldMode, MockHandle, MockTransport};

fn script_board(handle: &MockHandle) {
    handle.expect("XP", "OpenFIRE,5.2,Dawn,rpipico,2\r\n");
    handle.expect("Xli", "4,FIRECon P4\r\n");
    handle.expect("Xlb", "0,1,1,0,0,0,0,0,0\r\n");
    handle.expect("Xls", "255,150,45,30,500,1,3,2500,0,16711680,65280,255\r\n");
    for slot in 0..4 {
        handle.expect(
            &format!("XlP{slot}"),
            &format!("10,20,30,40,1.5,2.5,1,2,1,255,Screen {slot}\r\n"),
        );
    }
}

fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir()
        .join(format!("openfire-tool-test-{}", std::process::id()))
        .join(name)
}

// ── config file ──

#[test]
fn config_save_and_load() {
    let path = temp_path("config.toml");
    let config = AppConfig {
        port: Some("/dev/ttyACM3".to_string()),
        field_mode: FieldModeSetting::Comma,
        heartbeat_interval_ms: 1000,
        ..Default::default()
    };

    config.save(&path).unwrap();
    let loaded = AppConfig::load(&path).unwrap();
    assert_eq!(loaded, config);

    std::fs::remove_file(&path).ok();
}

#[test]
fn broken_config_reports_path() {
    let path = temp_path("broken.toml");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "baud_rate = \"fast\"\n").unwrap();

    let err = AppConfig::load(&path).unwrap_err();
    assert!(err.to_string().contains("broken.toml"));

    std::fs::remove_file(&path).ok();
}

#[test]
fn forced_field_mode_reaches_session() {
    let config = AppConfig {
        field_mode: FieldModeSetting::PerLine,
        ..Default::default()
    };
    let mock = MockTransport::new();
    let handle = mock.handle();
    // legacy board: every field on its own line
    handle.expect("XP", "OpenFIRE\r\n4.1\r\nNovember\r\nrpipico\r\n0\r\n");
    handle.expect("Xli", "1\r\nFIRECon P1\r\n");
    handle.expect("Xlb", &"0\r\n".repeat(9));
    handle.expect("Xls", &"1\r\n".repeat(12));
    for slot in 0..4 {
        let fields = ["0", "0", "0", "0", "0", "0", "0", "0", "0", "0"];
        let mut record: String = fields.iter().map(|f| format!("{f}\r\n")).collect();
        record.push_str(&format!("P{slot}\r\n"));
        handle.expect(&format!("XlP{slot}"), &record);
    }

    let session = DeviceSession::open(Box::new(mock), config.session_config()).unwrap();
    assert_eq!(session.field_mode(), Some(FieldMode::PerLine));
    assert_eq!(session.model().current.profiles[2].name, "P2");
}

// ── rendering ──

#[test]
fn dump_renders_loaded_board() {
    let mock = MockTransport::new();
    let handle = mock.handle();
    script_board(&handle);
    let session = DeviceSession::open(Box::new(mock), AppConfig::default().session_config()).unwrap();

    let text = format::model(session.model());
    assert!(text.contains("Board:    Raspberry Pi Pico (rpipico)"));
    assert!(text.contains("USB:      FIRECon P4 (id 4, 0x04)"));
    assert!(text.contains("  rumble           on"));
    assert!(text.contains("Pins (fixed):"));
    assert!(text.contains("* 2 \"Screen 2\""));
    assert!(text.contains("ir=higher mode=2-frame average layout=diamond color=#0000FF"));
    assert_eq!(
        format::setting_value(Setting::CustomLedColor2, 65280),
        "#00FF00"
    );
}

#[test]
fn json_dump_includes_model() {
    let mock = MockTransport::new();
    let handle = mock.handle();
    script_board(&handle);
    let session = DeviceSession::open(Box::new(mock), AppConfig::default().session_config()).unwrap();

    let json = serde_json::to_value(session.model()).unwrap();
    assert_eq!(json["identity"]["codename"], "Dawn");
    assert_eq!(json["current"]["usb"]["product_name"], "FIRECon P4");
    assert_eq!(json["current"]["profiles"][0]["name"], "Screen 0");
}

#[test]
fn edit_preview_lists_writes() {
    let mock = MockTransport::new();
    let handle = mock.handle();
    script_board(&handle);
    let mut session =
        DeviceSession::open(Box::new(mock), AppConfig::default().session_config()).unwrap();

    session
        .edit(|m| m.set_setting(Setting::RumbleStrength, 128))
        .unwrap();

    let diff = format::diff(&session.diff());
    assert!(diff.contains("setting rumble-strength: 255 -> 128"));
    let writes = format::writes(&session.pending_writes());
    assert!(writes.contains("  > Xm.2.0.128"));
    assert!(writes.ends_with("  > XS\n"));
}
