//! Parsing of lines the board sends without being asked
//!
//! While the host is idle the board reports button presses, profile switches,
//! recalibrated offsets and sensor readings as tagged text lines. In test mode
//! it streams camera tracking geometry instead.

use serde::Serialize;
use tracing::warn;

use crate::protocol::fields;

/// Tag prefixes of unsolicited lines, in classification order
pub mod notif {
    pub const PRESSED: &str = "Pressed:";
    pub const RELEASED: &str = "Released:";
    pub const TEMPERATURE: &str = "Temperature:";
    pub const ANALOG: &str = "Analog:";
    pub const PROFILE: &str = "Profile: ";
    /// Followed by `fields::UPDATED_PROFILE` value lines
    pub const UPDATED_PROFILE: &str = "UpdatedProf: ";
}

/// Temperature thresholds (°C)
pub mod temperature {
    pub const WARM_ABOVE: i32 = 60;
    pub const HOT_ABOVE: i32 = 70;
}

/// Eight-way analog stick direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AnalogDirection {
    Center,
    Up,
    UpLeft,
    Left,
    DownLeft,
    Down,
    DownRight,
    Right,
    UpRight,
}

impl AnalogDirection {
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => Self::Center,
            1 => Self::Up,
            2 => Self::UpLeft,
            3 => Self::Left,
            4 => Self::DownLeft,
            5 => Self::Down,
            6 => Self::DownRight,
            7 => Self::Right,
            8 => Self::UpRight,
            _ => return None,
        })
    }

    pub fn arrow(self) -> &'static str {
        match self {
            Self::Center => "·",
            Self::Up => "↑",
            Self::UpLeft => "↖",
            Self::Left => "←",
            Self::DownLeft => "↙",
            Self::Down => "↓",
            Self::DownRight => "↘",
            Self::Right => "→",
            Self::UpRight => "↗",
        }
    }
}

/// Temperature band of a sensor reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TemperatureLevel {
    Normal,
    Warm,
    Hot,
}

impl TemperatureLevel {
    pub fn classify(celsius: i32) -> Self {
        if celsius > temperature::HOT_ABOVE {
            Self::Hot
        } else if celsius > temperature::WARM_ABOVE {
            Self::Warm
        } else {
            Self::Normal
        }
    }
}

/// An unsolicited idle-state line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    /// Input function id (1-based) went down
    ButtonPressed(u8),
    /// Input function id (1-based) went up
    ButtonReleased(u8),
    Temperature(i32),
    Analog(AnalogDirection),
    /// Active profile switched on the device (0-based)
    ProfileChanged(u8),
    /// Profile (0-based) was recalibrated; offset lines follow
    ProfileUpdated(u8),
}

fn value_after<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    line.strip_prefix(prefix).map(str::trim)
}

/// Classify one idle-state line; `None` for anything unrecognized
pub fn parse_notification(line: &str) -> Option<Notification> {
    let line = line.trim();

    if let Some(v) = value_after(line, notif::PRESSED) {
        return parse_function_id(v).map(Notification::ButtonPressed);
    }
    if let Some(v) = value_after(line, notif::RELEASED) {
        return parse_function_id(v).map(Notification::ButtonReleased);
    }
    if let Some(v) = value_after(line, notif::TEMPERATURE) {
        return v.parse().ok().map(Notification::Temperature);
    }
    if let Some(v) = value_after(line, notif::ANALOG) {
        return v
            .parse()
            .ok()
            .and_then(AnalogDirection::from_code)
            .map(Notification::Analog);
    }
    if let Some(v) = value_after(line, notif::PROFILE) {
        return parse_profile_slot(v).map(Notification::ProfileChanged);
    }
    if let Some(v) = value_after(line, notif::UPDATED_PROFILE) {
        return parse_profile_slot(v).map(Notification::ProfileUpdated);
    }
    None
}

fn parse_function_id(v: &str) -> Option<u8> {
    match v.parse::<u8>() {
        Ok(id) if (1..=fields::PINS as u8).contains(&id) => Some(id),
        _ => {
            warn!("Ignoring button event for unknown input {:?}", v);
            None
        }
    }
}

fn parse_profile_slot(v: &str) -> Option<u8> {
    match v.parse::<u8>() {
        Ok(slot) if slot < 4 => Some(slot),
        _ => {
            warn!("Ignoring profile event for slot {:?}", v);
            None
        }
    }
}

/// A 2-D camera-space point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// One test-mode telemetry record: the four IR emitters as seen by the
/// camera, their median, and the computed aim point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TelemetryFrame {
    pub top_left: Point,
    pub top_right: Point,
    pub bottom_left: Point,
    pub bottom_right: Point,
    pub median: Point,
    pub aim: Point,
}

impl TelemetryFrame {
    /// Emitter quadrilateral in drawing order, closed
    pub fn outline(&self) -> [Point; 5] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
            self.top_left,
        ]
    }
}

/// Parse a test-mode line; malformed records yield `None`
pub fn parse_telemetry(line: &str) -> Option<TelemetryFrame> {
    if !line.contains(',') {
        return None;
    }
    let values: Vec<i32> = line
        .trim()
        .split(',')
        .filter(|f| !f.trim().is_empty())
        .map(|f| f.trim().parse())
        .collect::<Result<_, _>>()
        .ok()?;
    if values.len() != fields::TELEMETRY {
        return None;
    }
    let p = |i: usize| Point {
        x: values[i],
        y: values[i + 1],
    };
    Some(TelemetryFrame {
        top_left: p(0),
        top_right: p(2),
        bottom_left: p(4),
        bottom_right: p(6),
        median: p(8),
        aim: p(10),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_button_events() {
        assert_eq!(
            parse_notification("Pressed:03"),
            Some(Notification::ButtonPressed(3))
        );
        assert_eq!(
            parse_notification("Released:31\r"),
            Some(Notification::ButtonReleased(31))
        );
        assert_eq!(parse_notification("Pressed:00"), None);
        assert_eq!(parse_notification("Pressed:32"), None);
    }

    #[test]
    fn test_parse_profile_events() {
        assert_eq!(
            parse_notification("Profile: 2"),
            Some(Notification::ProfileChanged(2))
        );
        assert_eq!(
            parse_notification("UpdatedProf: 1"),
            Some(Notification::ProfileUpdated(1))
        );
        assert_eq!(parse_notification("Profile: 7"), None);
    }

    #[test]
    fn test_parse_sensor_events() {
        assert_eq!(
            parse_notification("Temperature:65"),
            Some(Notification::Temperature(65))
        );
        assert_eq!(
            parse_notification("Analog:7"),
            Some(Notification::Analog(AnalogDirection::Right))
        );
        assert_eq!(parse_notification("Analog:9"), None);
        assert_eq!(TemperatureLevel::classify(60), TemperatureLevel::Normal);
        assert_eq!(TemperatureLevel::classify(61), TemperatureLevel::Warm);
        assert_eq!(TemperatureLevel::classify(71), TemperatureLevel::Hot);
    }

    #[test]
    fn test_unrecognized_lines() {
        assert_eq!(parse_notification("OK:"), None);
        assert_eq!(parse_notification(""), None);
        assert_eq!(parse_notification("pressed:03"), None);
    }

    #[test]
    fn test_parse_telemetry() {
        let frame = parse_telemetry("100,200,900,210,110,700,890,690,500,450,512,384\r\n").unwrap();
        assert_eq!(frame.top_left, Point { x: 100, y: 200 });
        assert_eq!(frame.bottom_right, Point { x: 890, y: 690 });
        assert_eq!(frame.aim, Point { x: 512, y: 384 });
        assert_eq!(frame.outline()[2], frame.bottom_right);
    }

    #[test]
    fn test_malformed_telemetry_is_discarded() {
        assert!(parse_telemetry("100 200 900").is_none());
        assert!(parse_telemetry("1,2,3").is_none());
        assert!(parse_telemetry("1,2,3,4,5,6,7,8,9,10,11,x").is_none());
        // trailing separator is tolerated
        assert!(parse_telemetry("1,2,3,4,5,6,7,8,9,10,11,12,").is_some());
    }
}
