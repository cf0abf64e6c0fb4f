// CLI definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use openfire_device::{BoolSetting, IrSensitivity, LayoutType, PinFunction, RunMode, Setting};
use openfire_transport::FeatureTest;
use openfire_tool::config::FieldModeSetting;
use openfire_tool::format::{parse_number, parse_switch};

#[derive(Parser)]
#[command(name = "openfire")]
#[command(author, version, about = "OpenFIRE light gun configuration tool")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Serial port of the board (default: config file, then first OpenFIRE port)
    #[arg(short, long, global = true)]
    pub port: Option<String>,

    /// Log all serial traffic (shown at info level under the `wire` target)
    #[arg(long, global = true)]
    pub monitor: bool,

    /// Show raw hex alongside monitored traffic
    #[arg(long, global = true)]
    pub hex: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Record framing: negotiate from the probe, or force one
    #[arg(long, global = true, value_enum)]
    pub field_mode: Option<FieldModeSetting>,

    /// Config file path (default: ~/.config/openfire/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    // === Discovery & Inspection ===
    /// List serial ports that look like OpenFIRE boards
    #[command(visible_alias = "ls")]
    List {
        /// Include every serial port
        #[arg(short, long)]
        all: bool,
    },

    /// Show board type, firmware and USB identity
    #[command(visible_aliases = ["version", "ver"])]
    Info,

    /// Print the whole configuration
    Dump {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show unsaved changes and the writes a commit would send
    Diff,

    // === Edits ===
    /// Turn a feature flag on or off
    Toggle {
        /// Flag name (custom-pins, rumble, solenoid, autofire, simple-pause,
        /// hold-to-pause, common-anode, low-buttons, rumble-ff)
        flag: BoolSetting,
        /// on or off
        #[arg(value_parser = parse_switch, action = clap::ArgAction::Set)]
        value: bool,
        #[command(flatten)]
        commit: CommitArgs,
    },

    /// Set a tunable value
    Set {
        /// Setting name (rumble-strength, led-color-1, ...)
        setting: Setting,
        /// Value; colors accept #RRGGBB
        #[arg(value_parser = parse_number)]
        value: u32,
        #[command(flatten)]
        commit: CommitArgs,
    },

    /// Assign an input function to a pin (requires custom pins)
    Pin {
        /// GPIO number (0-29)
        pin: u8,
        /// Function name or id, or "unmapped" to clear the pin
        function: PinTarget,
        #[command(flatten)]
        commit: CommitArgs,
    },

    /// Switch between the board's fixed layout and a custom pin map
    CustomPins {
        /// on or off
        #[arg(value_parser = parse_switch, action = clap::ArgAction::Set)]
        value: bool,
        #[command(flatten)]
        commit: CommitArgs,
    },

    /// Apply a stock pin preset, or list them
    Preset {
        /// Preset index; omit to list the board's presets
        index: Option<usize>,
        #[command(flatten)]
        commit: CommitArgs,
    },

    /// Show or edit a calibration profile
    #[command(visible_alias = "prof")]
    Profile {
        /// Profile slot (0-3)
        #[arg(value_parser = clap::value_parser!(u8).range(0..4))]
        slot: u8,
        /// IR camera sensitivity (default, higher, highest)
        #[arg(long)]
        ir: Option<IrSensitivity>,
        /// Run mode (normal, average, average2)
        #[arg(long)]
        mode: Option<RunMode>,
        /// Emitter layout (square, diamond)
        #[arg(long)]
        layout: Option<LayoutType>,
        /// Profile color as #RRGGBB
        #[arg(long, value_parser = parse_number)]
        color: Option<u32>,
        /// Profile name (up to 15 characters)
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        commit: CommitArgs,
    },

    /// Show or edit the USB identity
    Usb {
        /// USB product id
        #[arg(long, conflicts_with = "preset")]
        id: Option<String>,
        /// USB product name
        #[arg(long, conflicts_with = "preset")]
        name: Option<String>,
        /// Stock player identity (1-4)
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..5))]
        preset: Option<u8>,
        #[command(flatten)]
        commit: CommitArgs,
    },

    // === Device Actions ===
    /// Make a profile active
    Select {
        /// Profile slot (0-3)
        #[arg(value_parser = clap::value_parser!(u8).range(0..4))]
        slot: u8,
    },

    /// Start calibrating a profile and wait for the new offsets
    #[command(visible_alias = "cal")]
    Calibrate {
        /// Profile slot (0-3)
        #[arg(value_parser = clap::value_parser!(u8).range(0..4))]
        slot: u8,
    },

    /// Print button, temperature and profile events until Ctrl-C
    #[command(visible_alias = "watch")]
    Monitor,

    /// Stream IR camera telemetry until Ctrl-C
    TestMode,

    /// Pulse a force-feedback device or the RGB LED
    Test {
        /// rumble, solenoid, red, green or blue
        feature: FeatureTest,
    },

    /// Erase the board's saved configuration
    Clear {
        /// Required; the board must be reset afterwards
        #[arg(long)]
        yes: bool,
    },

    /// Reboot into the UF2 bootloader for firmware updates
    Bootloader,

    // === Configuration ===
    /// Show the effective tool configuration
    Config {
        /// Write a default config file if none exists
        #[arg(long)]
        init: bool,
    },
}

/// Shared flags for commands that edit the board
#[derive(clap::Args, Clone, Copy, Default)]
pub struct CommitArgs {
    /// Show the changes and writes without saving them
    #[arg(long)]
    pub dry_run: bool,
}

/// Target of `pin`: a function, or nothing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PinTarget(pub Option<PinFunction>);

impl std::str::FromStr for PinTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unmapped" | "none" | "-" | "-1" => Ok(Self(None)),
            _ => s.parse().map(|f| Self(Some(f))),
        }
    }
}
