//! Protocol constants and command rendering for the OpenFIRE serial protocol
//!
//! Every exchange is a short ASCII command from the host followed by zero or
//! more reply lines from the board. Commands carry no terminator; replies are
//! newline-terminated.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// USB vendor id used by OpenFIRE firmware
pub const VENDOR_ID: u16 = 0xF143;

/// Default serial baud rate (the board ignores it for USB CDC, but the host
/// side still has to pick one)
pub const BAUD_RATE: u32 = 9600;

/// Raw command strings
pub mod cmd {
    // Queries
    pub const PROBE: &str = "XP";
    pub const READ_IDENTITY: &str = "Xli";
    pub const READ_BOOLS: &str = "Xlb";
    pub const READ_PINS: &str = "Xlp";
    pub const READ_SETTINGS: &str = "Xls";
    /// Followed by the 0-based profile slot
    pub const READ_PROFILE: &str = "XlP";

    // Writes
    /// Pause outputs; also the prefix of every field write
    pub const PAUSE: &str = "Xm";
    pub const SAVE: &str = "XS";

    // Actions
    /// Followed by the 1-based profile number (and `C` to calibrate)
    pub const SELECT_PROFILE: &str = "XC";
    pub const TEST_MODE: &str = "XT";
    pub const CLEAR_STORAGE: &str = "Xc";
    pub const UNDOCK: &str = "XE";
    pub const BOOTLOADER: &str = "Xxx";
    pub const TEST_RUMBLE: &str = "Xtr";
    pub const TEST_SOLENOID: &str = "Xts";
    pub const TEST_LED_RED: &str = "XtR";
    pub const TEST_LED_GREEN: &str = "XtG";
    pub const TEST_LED_BLUE: &str = "XtB";
    pub const HEARTBEAT: &str = ".";

    /// Get human-readable name for a raw command string
    pub fn name(cmd: &str) -> &'static str {
        match cmd {
            PROBE => "PROBE",
            READ_IDENTITY => "READ_IDENTITY",
            READ_BOOLS => "READ_BOOLS",
            READ_PINS => "READ_PINS",
            READ_SETTINGS => "READ_SETTINGS",
            PAUSE => "PAUSE",
            SAVE => "SAVE",
            TEST_MODE => "TEST_MODE",
            CLEAR_STORAGE => "CLEAR_STORAGE",
            UNDOCK => "UNDOCK",
            BOOTLOADER => "BOOTLOADER",
            TEST_RUMBLE => "TEST_RUMBLE",
            TEST_SOLENOID => "TEST_SOLENOID",
            TEST_LED_RED => "TEST_LED_RED",
            TEST_LED_GREEN => "TEST_LED_GREEN",
            TEST_LED_BLUE => "TEST_LED_BLUE",
            HEARTBEAT => "HEARTBEAT",
            c if c.starts_with(READ_PROFILE) => "READ_PROFILE",
            c if c.starts_with("Xm.") => "WRITE",
            c if c.starts_with(SELECT_PROFILE) && c.ends_with('C') => "CALIBRATE",
            c if c.starts_with(SELECT_PROFILE) => "SELECT_PROFILE",
            _ => "UNKNOWN",
        }
    }
}

/// Fixed reply strings sent by the board
pub mod reply {
    /// Identity token that leads every probe reply
    pub const PROBE_TOKEN: &str = "OpenFIRE";
    /// Write accepted
    pub const OK: &str = "OK:";
    /// Write addressed a field the firmware doesn't have (still an ack)
    pub const NOENT: &str = "NOENT:";
    pub const SAVING: &str = "Saving preferences...";
    pub const SAVED: &str = "Settings saved to";
    pub const TEST_MODE_ENTERED: &str = "Entering Test Mode...";
    pub const CLEARED: &str = "Cleared! Please reset the board.";
    /// Placeholder product name the board reports when its name slot is empty
    pub const NAME_UNSET: &str = "SERIALREADERR01";

    /// Whether a line acknowledges a field write
    pub fn is_ack(line: &str) -> bool {
        line.starts_with(OK) || line.starts_with(NOENT)
    }
}

/// Number of fields in each record the board sends
pub mod fields {
    pub const PROBE: usize = 5;
    pub const IDENTITY: usize = 2;
    pub const BOOLS: usize = 9;
    pub const PINS: usize = 31;
    pub const SETTINGS: usize = 12;
    pub const PROFILE: usize = 11;
    /// Lines following an `UpdatedProf:` notification
    pub const UPDATED_PROFILE: usize = 6;
    /// Integers in one test-mode telemetry record (six x/y points)
    pub const TELEMETRY: usize = 12;
}

/// Timing constants (milliseconds unless noted)
pub mod timing {
    pub const PROBE_TIMEOUT_MS: u64 = 2000;
    pub const READ_TIMEOUT_MS: u64 = 2000;
    pub const IDENTITY_TIMEOUT_MS: u64 = 1000;
    pub const TEST_MODE_TIMEOUT_MS: u64 = 1000;
    pub const CLEAR_TIMEOUT_MS: u64 = 5000;
    pub const UNDOCK_DRAIN_MS: u64 = 2000;
    /// Bound on "wait for bytes written"
    pub const WRITE_TIMEOUT_MS: u64 = 1000;
    pub const HEARTBEAT_INTERVAL_MS: u64 = 5000;
    /// Extra reads allowed for the "settings saved" line after a save
    pub const SAVE_CONFIRM_ATTEMPTS: usize = 3;
}

/// Field group addressed by an `Xm.<category>.<index>.<value>` write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WriteCategory {
    Bool,
    Pin,
    Setting,
    Identity,
}

impl WriteCategory {
    pub fn code(self) -> u8 {
        match self {
            Self::Bool => 0,
            Self::Pin => 1,
            Self::Setting => 2,
            Self::Identity => 3,
        }
    }
}

/// Per-profile field addressed by an `Xm.P.<field>.<slot>.<value>` write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProfileField {
    IrSensitivity,
    RunMode,
    Layout,
    Color,
    Name,
}

impl ProfileField {
    pub fn code(self) -> char {
        match self {
            Self::IrSensitivity => 'i',
            Self::RunMode => 'r',
            Self::Layout => 'l',
            Self::Color => 'c',
            Self::Name => 'n',
        }
    }
}

/// One-shot hardware test pulses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FeatureTest {
    Rumble,
    Solenoid,
    LedRed,
    LedGreen,
    LedBlue,
}

impl FeatureTest {
    pub fn command(self) -> &'static str {
        match self {
            Self::Rumble => cmd::TEST_RUMBLE,
            Self::Solenoid => cmd::TEST_SOLENOID,
            Self::LedRed => cmd::TEST_LED_RED,
            Self::LedGreen => cmd::TEST_LED_GREEN,
            Self::LedBlue => cmd::TEST_LED_BLUE,
        }
    }
}

impl FromStr for FeatureTest {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rumble" => Ok(Self::Rumble),
            "solenoid" => Ok(Self::Solenoid),
            "red" | "led-red" => Ok(Self::LedRed),
            "green" | "led-green" => Ok(Self::LedGreen),
            "blue" | "led-blue" => Ok(Self::LedBlue),
            _ => Err(format!("Unknown test: {s} (rumble, solenoid, red, green, blue)")),
        }
    }
}

/// A host→board command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Probe,
    ReadIdentity,
    ReadBools,
    ReadPins,
    ReadSettings,
    ReadProfile(u8),
    PauseOutputs,
    Write {
        category: WriteCategory,
        index: u8,
        value: String,
    },
    WriteProfile {
        field: ProfileField,
        slot: u8,
        value: String,
    },
    Save,
    /// 0-based slot; rendered 1-based
    SelectProfile(u8),
    /// 0-based slot; rendered 1-based
    Calibrate(u8),
    ToggleTestMode,
    ClearStorage,
    Undock,
    Bootloader,
    Test(FeatureTest),
    Heartbeat,
}

impl Command {
    /// Build a field write from anything displayable
    pub fn write(category: WriteCategory, index: u8, value: impl fmt::Display) -> Self {
        Self::Write {
            category,
            index,
            value: value.to_string(),
        }
    }

    /// Build a profile field write from anything displayable
    pub fn write_profile(field: ProfileField, slot: u8, value: impl fmt::Display) -> Self {
        Self::WriteProfile {
            field,
            slot,
            value: value.to_string(),
        }
    }

    /// Render the exact ASCII sent on the wire
    pub fn to_wire(&self) -> String {
        match self {
            Self::Probe => cmd::PROBE.to_string(),
            Self::ReadIdentity => cmd::READ_IDENTITY.to_string(),
            Self::ReadBools => cmd::READ_BOOLS.to_string(),
            Self::ReadPins => cmd::READ_PINS.to_string(),
            Self::ReadSettings => cmd::READ_SETTINGS.to_string(),
            Self::ReadProfile(slot) => format!("{}{}", cmd::READ_PROFILE, slot),
            Self::PauseOutputs => cmd::PAUSE.to_string(),
            Self::Write {
                category,
                index,
                value,
            } => format!("{}.{}.{}.{}", cmd::PAUSE, category.code(), index, value),
            Self::WriteProfile { field, slot, value } => {
                format!("{}.P.{}.{}.{}", cmd::PAUSE, field.code(), slot, value)
            }
            Self::Save => cmd::SAVE.to_string(),
            Self::SelectProfile(slot) => format!("{}{}", cmd::SELECT_PROFILE, slot + 1),
            Self::Calibrate(slot) => format!("{}{}C", cmd::SELECT_PROFILE, slot + 1),
            Self::ToggleTestMode => cmd::TEST_MODE.to_string(),
            Self::ClearStorage => cmd::CLEAR_STORAGE.to_string(),
            Self::Undock => cmd::UNDOCK.to_string(),
            Self::Bootloader => cmd::BOOTLOADER.to_string(),
            Self::Test(test) => test.command().to_string(),
            Self::Heartbeat => cmd::HEARTBEAT.to_string(),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}
