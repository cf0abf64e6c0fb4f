//! Text rendering of board state for the CLI

use std::fmt::Write;

use openfire_device::{
    CalibrationProfile, FieldChange, IrSensitivity, LayoutType, PinSlot, RunMode, SessionEvent,
    Setting, SettingsModel, PIN_COUNT,
};
use openfire_transport::{Command, TelemetryFrame};

pub fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

pub fn color(rgb: u32) -> String {
    format!("#{:06X}", rgb & 0xFF_FFFF)
}

fn ir_label(ir: IrSensitivity) -> &'static str {
    match ir {
        IrSensitivity::Default => "default",
        IrSensitivity::Higher => "higher",
        IrSensitivity::Highest => "highest",
    }
}

fn run_mode_label(mode: RunMode) -> &'static str {
    match mode {
        RunMode::Normal => "normal",
        RunMode::OneFrameAverage => "1-frame average",
        RunMode::TwoFrameAverage => "2-frame average",
    }
}

fn layout_label(layout: LayoutType) -> &'static str {
    match layout {
        LayoutType::Square => "square",
        LayoutType::Diamond => "diamond",
    }
}

/// Board, firmware and USB identity
pub fn identity(model: &SettingsModel) -> String {
    let id = &model.identity;
    let usb = &model.current.usb;
    let mut out = String::new();
    let _ = writeln!(out, "Board:    {} ({})", id.board, id.board.token());
    let _ = writeln!(out, "Firmware: v{:.1} \"{}\"", id.version, id.codename);
    let name = if usb.product_name.is_empty() {
        "(unset)"
    } else {
        &usb.product_name
    };
    match usb.product_id_hex() {
        Some(hex) => {
            let _ = writeln!(out, "USB:      {} (id {}, 0x{})", name, usb.product_id, hex);
        }
        None => {
            let _ = writeln!(out, "USB:      {} (default id)", name);
        }
    }
    let _ = writeln!(out, "Profile:  {}", id.selected_profile);
    out
}

pub fn profile(slot: usize, p: &CalibrationProfile, selected: bool) -> String {
    let marker = if selected { '*' } else { ' ' };
    let o = &p.offsets;
    format!(
        "{} {} {:<16} ir={} mode={} layout={} color={}\n      offsets top={} bottom={} left={} right={} tl_led={:.1} tr_led={:.1}\n",
        marker,
        slot,
        format!("\"{}\"", p.name),
        ir_label(p.ir_sensitivity),
        run_mode_label(p.run_mode),
        layout_label(p.layout),
        color(p.color),
        o.top,
        o.bottom,
        o.left,
        o.right,
        o.tl_led,
        o.tr_led,
    )
}

/// The whole current configuration
pub fn model(model: &SettingsModel) -> String {
    let cfg = &model.current;
    let mut out = identity(model);

    out.push_str("\nToggles:\n");
    for (flag, value) in cfg.bools.iter() {
        let _ = writeln!(out, "  {:<16} {}", flag.key(), on_off(value));
    }

    let mode = if cfg.bools.custom_pins() {
        "custom"
    } else {
        "fixed"
    };
    let _ = writeln!(out, "\nPins ({mode}):");
    let layout = model.board().layout();
    for pin in 0..PIN_COUNT as u8 {
        let label = match (cfg.pins.function_at(pin), layout[pin as usize]) {
            (Some(f), _) => f.name().to_string(),
            (None, PinSlot::Reserved) => "(reserved)".to_string(),
            (None, PinSlot::Analog) => "- (analog)".to_string(),
            (None, _) => "-".to_string(),
        };
        let _ = writeln!(out, "  GP{:<3} {}", pin, label);
    }

    out.push_str("\nSettings:\n");
    for (setting, value) in cfg.settings.iter() {
        let _ = writeln!(out, "  {:<26} {}", setting.key(), setting_value(setting, value));
    }

    out.push_str("\nProfiles:\n");
    for (slot, p) in cfg.profiles.iter().enumerate() {
        let selected = slot == model.identity.selected_profile as usize;
        out.push_str(&profile(slot, p, selected));
    }
    out
}

/// Pending edits, one per line
pub fn diff(changes: &[FieldChange]) -> String {
    if changes.is_empty() {
        return "No pending changes\n".to_string();
    }
    let mut out = format!("{} pending change(s):\n", changes.len());
    for change in changes {
        let _ = writeln!(out, "  {change}");
    }
    out
}

/// Commands a commit would send
pub fn writes(commands: &[Command]) -> String {
    let mut out = String::new();
    for command in commands {
        let _ = writeln!(out, "  > {command}");
    }
    out
}

pub fn telemetry(frame: &TelemetryFrame) -> String {
    let p = |pt: openfire_transport::Point| format!("({:>4},{:>4})", pt.x, pt.y);
    format!(
        "aim {}  median {}  TL {} TR {} BL {} BR {}",
        p(frame.aim),
        p(frame.median),
        p(frame.top_left),
        p(frame.top_right),
        p(frame.bottom_left),
        p(frame.bottom_right),
    )
}

pub fn event(event: &SessionEvent) -> String {
    match event {
        SessionEvent::ButtonPressed(f) => format!("pressed   {f}"),
        SessionEvent::ButtonReleased(f) => format!("released  {f}"),
        SessionEvent::ProfileChanged(slot) => format!("profile   {slot} selected"),
        SessionEvent::ProfileUpdated { slot, offsets } => format!(
            "profile   {} calibrated: top={} bottom={} left={} right={} tl_led={:.1} tr_led={:.1}",
            slot,
            offsets.top,
            offsets.bottom,
            offsets.left,
            offsets.right,
            offsets.tl_led,
            offsets.tr_led
        ),
        SessionEvent::Temperature { celsius, level } => {
            format!("temp      {celsius}°C ({level:?})")
        }
        SessionEvent::Analog(direction) => format!("analog    {}", direction.arrow()),
        SessionEvent::Telemetry(frame) => telemetry(frame),
    }
}

/// `value` parsed as decimal, `0x` hex or `#RRGGBB`
pub fn parse_number(value: &str) -> Result<u32, String> {
    let v = value.trim();
    let parsed = if let Some(hex) = v.strip_prefix('#') {
        u32::from_str_radix(hex, 16)
    } else if let Some(hex) = v.strip_prefix("0x").or_else(|| v.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16)
    } else {
        v.parse()
    };
    parsed.map_err(|_| format!("Invalid number: {value}"))
}

/// Accepts on/off, true/false, yes/no and 1/0
pub fn parse_switch(value: &str) -> Result<bool, String> {
    match value.to_lowercase().as_str() {
        "on" | "true" | "yes" | "1" | "enable" => Ok(true),
        "off" | "false" | "no" | "0" | "disable" => Ok(false),
        _ => Err(format!("Expected on or off, got {value}")),
    }
}

/// Setting value in the unit shown by `dump`
pub fn setting_value(setting: Setting, value: u32) -> String {
    if setting.is_color() {
        color(value)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openfire_device::pins::PinMap;
    use openfire_device::{
        BoardIdentity, BoardType, BoolSetting, DeviceConfig, PinFunction, UsbIdentity,
    };
    use openfire_transport::TemperatureLevel;

    fn pico() -> SettingsModel {
        SettingsModel::loaded(
            BoardIdentity {
                board: BoardType::RpiPico,
                version: 5.2,
                codename: "Sunrise".to_string(),
                ..Default::default()
            },
            DeviceConfig {
                pins: PinMap::from_layout(BoardType::RpiPico.layout()),
                usb: UsbIdentity::player_preset(2).unwrap(),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_identity_block() {
        let text = identity(&pico());
        assert!(text.contains("Raspberry Pi Pico (rpipico)"));
        assert!(text.contains("v5.2 \"Sunrise\""));
        assert!(text.contains("FIRECon P2 (id 2, 0x02)"));
    }

    #[test]
    fn test_model_dump_lists_pins_and_settings() {
        let mut m = pico();
        m.current.settings.set(Setting::CustomLedColor1, 0xFF8000);
        let text = model(&m);
        assert!(text.contains("Pins (fixed):"));
        assert!(text.contains("GP15  Trigger"));
        assert!(text.contains("led-color-1                #FF8000"));
        assert!(text.contains("* 0"));
    }

    #[test]
    fn test_diff_rendering() {
        let mut m = pico();
        assert_eq!(diff(&m.diff()), "No pending changes\n");

        m.set_bool(BoolSetting::Rumble, true);
        let text = diff(&m.diff());
        assert!(text.starts_with("1 pending change(s):"));
        assert!(text.contains("toggle rumble: false -> true"));
    }

    #[test]
    fn test_event_rendering() {
        assert_eq!(
            event(&SessionEvent::ButtonPressed(PinFunction::Trigger)),
            "pressed   Trigger"
        );
        assert_eq!(
            event(&SessionEvent::Temperature {
                celsius: 65,
                level: TemperatureLevel::Warm
            }),
            "temp      65°C (Warm)"
        );
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_number("#FF0000"), Ok(0xFF0000));
        assert_eq!(parse_number("0x10"), Ok(16));
        assert_eq!(parse_number("250"), Ok(250));
        assert!(parse_number("12ms").is_err());

        assert_eq!(parse_switch("ON"), Ok(true));
        assert_eq!(parse_switch("0"), Ok(false));
        assert!(parse_switch("maybe").is_err());
    }
}
