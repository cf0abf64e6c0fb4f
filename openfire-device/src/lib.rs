//! Configuration engine for OpenFIRE light guns
//!
//! This crate sits on top of `openfire-transport` and holds everything that
//! knows what the bytes mean:
//!
//! - `board`: built-in pin layouts and presets per board model
//! - `settings`: the current/shadow settings model
//! - `pins`: the injective pin map and its assignment rules
//! - `diff`: change detection and the commit write plan
//! - `session`: the protocol state machine driving one connected board

pub mod board;
pub mod diff;
pub mod error;
pub mod pins;
pub mod session;
pub mod settings;

pub use board::{BoardType, PinFunction, PinSlot, Preset, FUNCTION_COUNT, PIN_COUNT};
pub use diff::{FieldChange, FieldKey};
pub use error::DeviceError;
pub use pins::PinMap;
pub use session::{DeviceSession, ProtocolState, SessionConfig, SessionEvent};
pub use settings::{
    BoardIdentity, BoolSetting, BoolSettings, CalibrationProfile, DeviceConfig, IrSensitivity,
    LayoutType, ProfileOffsets, RunMode, Setting, SettingsModel, SettingsTable, UsbIdentity,
    PROFILE_COUNT,
};

// Re-exported so front ends only need one dependency
pub use openfire_transport::{
    AnalogDirection, FeatureTest, FieldMode, TelemetryFrame, TemperatureLevel, Transport,
};
