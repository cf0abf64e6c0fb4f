//! Settings model types
//!
//! A `SettingsModel` holds two full copies of the board configuration:
//! `current` (what the operator is editing) and `shadow` (what the board last
//! reported or accepted). Edits only ever touch `current`; the shadow moves
//! only on a successful load or commit.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::board::{BoardType, PinFunction};
use crate::error::DeviceError;
use crate::pins::{self, PinMap};

/// Number of calibration profiles on the board
pub const PROFILE_COUNT: usize = 4;

/// Longest profile name the firmware stores
pub const PROFILE_NAME_MAX: usize = 15;

/// Largest packed 0xRRGGBB value
pub const COLOR_MAX: u32 = 0xFF_FFFF;

// ============================================================================
// Feature toggles
// ============================================================================

/// Boolean feature flags, in wire order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BoolSetting {
    CustomPins,
    Rumble,
    Solenoid,
    Autofire,
    SimplePause,
    HoldToPause,
    CommonAnode,
    LowButtonsMode,
    RumbleFF,
}

impl BoolSetting {
    pub const ALL: [BoolSetting; 9] = [
        Self::CustomPins,
        Self::Rumble,
        Self::Solenoid,
        Self::Autofire,
        Self::SimplePause,
        Self::HoldToPause,
        Self::CommonAnode,
        Self::LowButtonsMode,
        Self::RumbleFF,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::CustomPins => "custom-pins",
            Self::Rumble => "rumble",
            Self::Solenoid => "solenoid",
            Self::Autofire => "autofire",
            Self::SimplePause => "simple-pause",
            Self::HoldToPause => "hold-to-pause",
            Self::CommonAnode => "common-anode",
            Self::LowButtonsMode => "low-buttons",
            Self::RumbleFF => "rumble-ff",
        }
    }
}

impl FromStr for BoolSetting {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|b| b.key() == s)
            .ok_or_else(|| format!("Unknown toggle: {s}"))
    }
}

/// The fixed-size array of feature flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BoolSettings([bool; BoolSetting::ALL.len()]);

impl BoolSettings {
    pub fn get(&self, setting: BoolSetting) -> bool {
        self.0[setting.index()]
    }

    pub fn set(&mut self, setting: BoolSetting, value: bool) {
        self.0[setting.index()] = value;
    }

    pub fn custom_pins(&self) -> bool {
        self.get(BoolSetting::CustomPins)
    }

    pub fn iter(&self) -> impl Iterator<Item = (BoolSetting, bool)> + '_ {
        BoolSetting::ALL.into_iter().map(|b| (b, self.get(b)))
    }

    /// Parse the `Xlb` record (`0`/`1` per flag)
    pub fn from_fields(fields: &[String]) -> Result<Self, String> {
        let mut out = Self::default();
        for (slot, field) in out.0.iter_mut().zip(fields) {
            *slot = match field.as_str() {
                "0" => false,
                "1" => true,
                other => return Err(format!("not a flag: {other:?}")),
            };
        }
        Ok(out)
    }
}

// ============================================================================
// Numeric tunables
// ============================================================================

/// Numeric tunables, in wire order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Setting {
    RumbleStrength,
    RumbleInterval,
    SolenoidNormalInterval,
    SolenoidFastInterval,
    SolenoidHoldLength,
    CustomLedCount,
    AutofireWaitFactor,
    HoldToPauseLength,
    CustomLedStatic,
    CustomLedColor1,
    CustomLedColor2,
    CustomLedColor3,
}

impl Setting {
    pub const ALL: [Setting; 12] = [
        Self::RumbleStrength,
        Self::RumbleInterval,
        Self::SolenoidNormalInterval,
        Self::SolenoidFastInterval,
        Self::SolenoidHoldLength,
        Self::CustomLedCount,
        Self::AutofireWaitFactor,
        Self::HoldToPauseLength,
        Self::CustomLedStatic,
        Self::CustomLedColor1,
        Self::CustomLedColor2,
        Self::CustomLedColor3,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::RumbleStrength => "rumble-strength",
            Self::RumbleInterval => "rumble-interval",
            Self::SolenoidNormalInterval => "solenoid-normal-interval",
            Self::SolenoidFastInterval => "solenoid-fast-interval",
            Self::SolenoidHoldLength => "solenoid-hold-length",
            Self::CustomLedCount => "led-count",
            Self::AutofireWaitFactor => "autofire-wait-factor",
            Self::HoldToPauseLength => "hold-to-pause-length",
            Self::CustomLedStatic => "led-static",
            Self::CustomLedColor1 => "led-color-1",
            Self::CustomLedColor2 => "led-color-2",
            Self::CustomLedColor3 => "led-color-3",
        }
    }

    pub fn is_color(self) -> bool {
        matches!(
            self,
            Self::CustomLedColor1 | Self::CustomLedColor2 | Self::CustomLedColor3
        )
    }

    /// Largest value the firmware accepts
    pub fn max(self) -> u32 {
        match self {
            Self::RumbleStrength => 255,
            Self::CustomLedStatic => 3,
            s if s.is_color() => COLOR_MAX,
            _ => u16::MAX as u32,
        }
    }
}

impl FromStr for Setting {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|v| v.key() == s)
            .ok_or_else(|| format!("Unknown setting: {s}"))
    }
}

/// The fixed-size array of tunables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SettingsTable([u32; Setting::ALL.len()]);

impl SettingsTable {
    pub fn get(&self, setting: Setting) -> u32 {
        self.0[setting.index()]
    }

    pub fn set(&mut self, setting: Setting, value: u32) {
        self.0[setting.index()] = value;
    }

    pub fn iter(&self) -> impl Iterator<Item = (Setting, u32)> + '_ {
        Setting::ALL.into_iter().map(|s| (s, self.get(s)))
    }

    /// Parse the `Xls` record
    pub fn from_fields(fields: &[String]) -> Result<Self, String> {
        let mut out = Self::default();
        for (slot, field) in out.0.iter_mut().zip(fields) {
            *slot = field
                .parse()
                .map_err(|_| format!("not an unsigned value: {field:?}"))?;
        }
        Ok(out)
    }
}

// ============================================================================
// Calibration profiles
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum IrSensitivity {
    #[default]
    Default,
    Higher,
    Highest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum RunMode {
    #[default]
    Normal,
    OneFrameAverage,
    TwoFrameAverage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum LayoutType {
    #[default]
    Square,
    Diamond,
}

macro_rules! wire_enum {
    ($ty:ident { $($variant:ident = $code:literal, $key:literal;)+ }) => {
        impl $ty {
            pub fn code(self) -> u8 {
                match self { $(Self::$variant => $code,)+ }
            }

            pub fn from_code(code: u8) -> Option<Self> {
                match code { $($code => Some(Self::$variant),)+ _ => None }
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($key => Ok(Self::$variant),)+
                    other => other
                        .parse::<u8>()
                        .ok()
                        .and_then(Self::from_code)
                        .ok_or_else(|| format!("Invalid {}: {}", stringify!($ty), s)),
                }
            }
        }
    };
}

wire_enum!(IrSensitivity {
    Default = 0, "default";
    Higher = 1, "higher";
    Highest = 2, "highest";
});

wire_enum!(RunMode {
    Normal = 0, "normal";
    OneFrameAverage = 1, "average";
    TwoFrameAverage = 2, "average2";
});

wire_enum!(LayoutType {
    Square = 0, "square";
    Diamond = 1, "diamond";
});

/// Device-derived calibration geometry
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ProfileOffsets {
    pub top: i32,
    pub bottom: i32,
    pub left: i32,
    pub right: i32,
    pub tl_led: f32,
    pub tr_led: f32,
}

impl ProfileOffsets {
    /// Parse top, bottom, left, right, TL LED, TR LED
    pub fn from_fields(fields: &[String]) -> Result<Self, String> {
        let int = |i: usize| -> Result<i32, String> {
            fields[i]
                .parse()
                .map_err(|_| format!("not an offset: {:?}", fields[i]))
        };
        let float = |i: usize| -> Result<f32, String> {
            fields[i]
                .parse()
                .map_err(|_| format!("not an LED position: {:?}", fields[i]))
        };
        if fields.len() < 6 {
            return Err(format!("expected 6 offset fields, got {}", fields.len()));
        }
        Ok(Self {
            top: int(0)?,
            bottom: int(1)?,
            left: int(2)?,
            right: int(3)?,
            tl_led: float(4)?,
            tr_led: float(5)?,
        })
    }
}

/// One of the board's calibration profiles
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CalibrationProfile {
    pub offsets: ProfileOffsets,
    pub ir_sensitivity: IrSensitivity,
    pub run_mode: RunMode,
    pub layout: LayoutType,
    /// Packed 0xRRGGBB
    pub color: u32,
    pub name: String,
}

impl CalibrationProfile {
    /// Parse the 11-field `XlP<n>` record
    pub fn from_fields(fields: &[String]) -> Result<Self, String> {
        if fields.len() < 11 {
            return Err(format!("expected 11 profile fields, got {}", fields.len()));
        }
        let code = |i: usize| -> Result<u8, String> {
            fields[i]
                .parse()
                .map_err(|_| format!("not a mode: {:?}", fields[i]))
        };
        let ir = code(6)?;
        let mode = code(7)?;
        let layout = code(8)?;
        Ok(Self {
            offsets: ProfileOffsets::from_fields(&fields[..6])?,
            ir_sensitivity: IrSensitivity::from_code(ir)
                .ok_or_else(|| format!("IR sensitivity {ir} out of range"))?,
            run_mode: RunMode::from_code(mode)
                .ok_or_else(|| format!("run mode {mode} out of range"))?,
            layout: LayoutType::from_code(layout)
                .ok_or_else(|| format!("layout {layout} out of range"))?,
            color: fields[9]
                .parse::<u32>()
                .map(|c| c & COLOR_MAX)
                .map_err(|_| format!("not a color: {:?}", fields[9]))?,
            name: truncate_name(&fields[10]),
        })
    }

    /// Color as (r, g, b)
    pub fn rgb(&self) -> (u8, u8, u8) {
        (
            (self.color >> 16) as u8,
            (self.color >> 8) as u8,
            self.color as u8,
        )
    }
}

fn truncate_name(name: &str) -> String {
    name.chars().take(PROFILE_NAME_MAX).collect()
}

fn check_text(what: &str, text: &str) -> Result<(), DeviceError> {
    if !text.is_ascii() || text.contains([',', '\r', '\n']) {
        return Err(DeviceError::InvalidParameter(format!(
            "{what} must be plain ASCII without commas: {text:?}"
        )));
    }
    Ok(())
}

// ============================================================================
// USB identity
// ============================================================================

/// USB product id and name the board enumerates with
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct UsbIdentity {
    pub product_id: String,
    pub product_name: String,
}

impl UsbIdentity {
    /// One of the four stock player identities (1-based)
    pub fn player_preset(player: u8) -> Option<Self> {
        (1..=4).contains(&player).then(|| Self {
            product_id: player.to_string(),
            product_name: format!("FIRECon P{player}"),
        })
    }

    /// Product id rendered as it appears in USB descriptors
    pub fn product_id_hex(&self) -> Option<String> {
        let id: i32 = self.product_id.parse().ok()?;
        Some(if (i8::MIN as i32..=i8::MAX as i32).contains(&id) {
            format!("{:02x}", id & 0xFF)
        } else if (i16::MIN as i32..=i16::MAX as i32).contains(&id) {
            format!("{:04x}", id & 0xFFFF)
        } else {
            format!("{:08x}", id)
        })
    }
}

// ============================================================================
// Board identity
// ============================================================================

/// What the probe reported
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BoardIdentity {
    pub board: BoardType,
    pub version: f32,
    pub codename: String,
    /// Active profile as currently selected
    pub selected_profile: u8,
    /// Active profile as last saved on the board
    pub previous_profile: u8,
}

impl BoardIdentity {
    /// `"<name> | <board>"` as shown in port pickers
    pub fn pretty_name(&self, usb: &UsbIdentity) -> String {
        let name = if usb.product_name.is_empty() {
            "Unnamed Device"
        } else {
            &usb.product_name
        };
        format!("{} | {}", name, self.board)
    }
}

// ============================================================================
// Model
// ============================================================================

/// One full copy of the editable configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DeviceConfig {
    pub bools: BoolSettings,
    pub pins: PinMap,
    pub settings: SettingsTable,
    pub profiles: [CalibrationProfile; PROFILE_COUNT],
    pub usb: UsbIdentity,
}

/// Current/shadow settings model
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SettingsModel {
    pub identity: BoardIdentity,
    pub current: DeviceConfig,
    pub shadow: DeviceConfig,
}

fn check_slot(slot: u8) -> Result<usize, DeviceError> {
    if (slot as usize) < PROFILE_COUNT {
        Ok(slot as usize)
    } else {
        Err(DeviceError::InvalidParameter(format!(
            "profile slot {slot} (expected 0-{})",
            PROFILE_COUNT - 1
        )))
    }
}

impl SettingsModel {
    /// A model freshly loaded from the board: current and shadow identical
    pub fn loaded(identity: BoardIdentity, config: DeviceConfig) -> Self {
        Self {
            identity,
            current: config.clone(),
            shadow: config,
        }
    }

    pub fn board(&self) -> BoardType {
        self.identity.board
    }

    /// Promote current to shadow after the board accepted everything
    pub fn sync(&mut self) {
        self.shadow = self.current.clone();
        self.identity.previous_profile = self.identity.selected_profile;
    }

    /// Throw away unsaved edits
    pub fn revert(&mut self) {
        self.current = self.shadow.clone();
        self.identity.selected_profile = self.identity.previous_profile;
    }

    // === Toggles and tunables ===

    /// Set a feature flag; the custom-pins flag also rebuilds the pin map
    pub fn set_bool(&mut self, setting: BoolSetting, value: bool) {
        if setting == BoolSetting::CustomPins {
            self.switch_layout_mode(value);
        } else {
            self.current.bools.set(setting, value);
        }
    }

    pub fn set_setting(&mut self, setting: Setting, value: u32) -> Result<(), DeviceError> {
        if value > setting.max() {
            return Err(DeviceError::InvalidParameter(format!(
                "{} = {} (max {})",
                setting.key(),
                value,
                setting.max()
            )));
        }
        self.current.settings.set(setting, value);
        Ok(())
    }

    // === Pins ===

    /// Put `function` on `pin` (or clear the pin), evicting whatever was
    /// there and wherever `function` was before
    pub fn assign_pin(
        &mut self,
        pin: u8,
        function: Option<PinFunction>,
    ) -> Result<(), DeviceError> {
        if !self.current.bools.custom_pins() {
            return Err(DeviceError::InvalidState {
                operation: "assign pins",
                state: "custom pins are disabled",
            });
        }
        pins::check_assignment(self.board(), pin, function)?;
        self.current.pins.assign(pin, function);
        Ok(())
    }

    /// Replace the pin map with one of the board's presets, enabling custom
    /// pins if needed
    pub fn apply_preset(&mut self, index: usize) -> Result<&'static str, DeviceError> {
        let preset = pins::preset(self.board(), index)?;
        if !self.current.bools.custom_pins() {
            self.switch_layout_mode(true);
        }
        self.current.pins = pins::preset_map(preset);
        Ok(preset.name)
    }

    /// Enter or leave custom pins mode
    ///
    /// Leaving rebuilds the map from the board's fixed layout. Entering keeps
    /// the board's saved custom map if it has one, otherwise copies the fixed
    /// layout forward as the starting point.
    pub fn switch_layout_mode(&mut self, custom: bool) {
        let was_custom = self.current.bools.custom_pins();
        self.current.bools.set(BoolSetting::CustomPins, custom);
        if custom == was_custom {
            return;
        }
        if !custom {
            self.current.pins = PinMap::from_layout(self.board().layout());
        } else if self.shadow.bools.custom_pins() {
            self.current.pins = self.shadow.pins.clone();
        }
        // entering from fixed: current.pins already holds the fixed layout
    }

    // === Profiles ===

    pub fn set_profile_name(&mut self, slot: u8, name: &str) -> Result<(), DeviceError> {
        let i = check_slot(slot)?;
        check_text("profile name", name)?;
        self.current.profiles[i].name = truncate_name(name);
        Ok(())
    }

    pub fn set_ir_sensitivity(&mut self, slot: u8, ir: IrSensitivity) -> Result<(), DeviceError> {
        self.current.profiles[check_slot(slot)?].ir_sensitivity = ir;
        Ok(())
    }

    pub fn set_run_mode(&mut self, slot: u8, mode: RunMode) -> Result<(), DeviceError> {
        self.current.profiles[check_slot(slot)?].run_mode = mode;
        Ok(())
    }

    pub fn set_layout(&mut self, slot: u8, layout: LayoutType) -> Result<(), DeviceError> {
        self.current.profiles[check_slot(slot)?].layout = layout;
        Ok(())
    }

    pub fn set_color(&mut self, slot: u8, color: u32) -> Result<(), DeviceError> {
        let i = check_slot(slot)?;
        if color > COLOR_MAX {
            return Err(DeviceError::InvalidParameter(format!(
                "color 0x{color:X} is wider than 24 bits"
            )));
        }
        self.current.profiles[i].color = color;
        Ok(())
    }

    /// Offsets reported by the board after calibration; they are already
    /// saved on the device, so both copies move
    pub fn update_offsets(&mut self, slot: u8, offsets: ProfileOffsets) -> Result<(), DeviceError> {
        let i = check_slot(slot)?;
        self.current.profiles[i].offsets = offsets;
        self.shadow.profiles[i].offsets = offsets;
        Ok(())
    }

    pub fn select_profile(&mut self, slot: u8) -> Result<(), DeviceError> {
        check_slot(slot)?;
        self.identity.selected_profile = slot;
        Ok(())
    }

    // === USB identity ===

    pub fn set_usb_identity(
        &mut self,
        product_id: Option<&str>,
        product_name: Option<&str>,
    ) -> Result<(), DeviceError> {
        if let Some(id) = product_id {
            check_text("product id", id)?;
            self.current.usb.product_id = id.to_string();
        }
        if let Some(name) = product_name {
            check_text("product name", name)?;
            self.current.usb.product_name = name.to_string();
        }
        Ok(())
    }

    pub fn apply_usb_preset(&mut self, player: u8) -> Result<(), DeviceError> {
        self.current.usb = UsbIdentity::player_preset(player).ok_or_else(|| {
            DeviceError::InvalidParameter(format!("USB preset P{player} (expected 1-4)"))
        })?;
        Ok(())
    }
}

impl fmt::Display for BoolSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(s: &str) -> Vec<String> {
        s.split(',').map(str::to_string).collect()
    }

    fn pico_model() -> SettingsModel {
        let identity = BoardIdentity {
            board: BoardType::RpiPico,
            ..Default::default()
        };
        let config = DeviceConfig {
            pins: PinMap::from_layout(BoardType::RpiPico.layout()),
            ..Default::default()
        };
        SettingsModel::loaded(identity, config)
    }

    #[test]
    fn test_parse_bools() {
        let bools = BoolSettings::from_fields(&strings("0,1,0,0,0,0,0,0,1")).unwrap();
        assert!(bools.get(BoolSetting::Rumble));
        assert!(bools.get(BoolSetting::RumbleFF));
        assert!(!bools.custom_pins());
        assert!(BoolSettings::from_fields(&strings("0,2,0")).is_err());
    }

    #[test]
    fn test_parse_profile() {
        let p = CalibrationProfile::from_fields(&strings(
            "10,-20,30,40,1.5,2.25,2,1,1,16711935,Living Room TV Long",
        ))
        .unwrap();
        assert_eq!(p.offsets.bottom, -20);
        assert_eq!(p.offsets.tr_led, 2.25);
        assert_eq!(p.ir_sensitivity, IrSensitivity::Highest);
        assert_eq!(p.run_mode, RunMode::OneFrameAverage);
        assert_eq!(p.layout, LayoutType::Diamond);
        assert_eq!(p.rgb(), (0xFF, 0x00, 0xFF));
        assert_eq!(p.name, "Living Room TV ");
        assert!(CalibrationProfile::from_fields(&strings("1,2,3,4,0,0,3,0,0,0,x")).is_err());
    }

    #[test]
    fn test_setting_limits() {
        let mut model = pico_model();
        assert!(model.set_setting(Setting::RumbleStrength, 255).is_ok());
        assert!(model.set_setting(Setting::RumbleStrength, 256).is_err());
        assert!(model.set_setting(Setting::CustomLedColor2, COLOR_MAX).is_ok());
        assert_eq!(model.current.settings.get(Setting::CustomLedColor2), COLOR_MAX);
        assert_eq!("led-color-2".parse::<Setting>(), Ok(Setting::CustomLedColor2));
    }

    #[test]
    fn test_usb_presets_and_hex() {
        let p3 = UsbIdentity::player_preset(3).unwrap();
        assert_eq!(p3.product_id, "3");
        assert_eq!(p3.product_name, "FIRECon P3");
        assert!(UsbIdentity::player_preset(5).is_none());

        let id = |s: &str| UsbIdentity {
            product_id: s.to_string(),
            product_name: String::new(),
        };
        assert_eq!(id("3").product_id_hex().as_deref(), Some("03"));
        assert_eq!(id("4660").product_id_hex().as_deref(), Some("1234"));
        assert_eq!(id("abc").product_id_hex(), None);
    }

    #[test]
    fn test_pretty_name() {
        let identity = BoardIdentity {
            board: BoardType::AdafruitKb2040,
            ..Default::default()
        };
        assert_eq!(
            identity.pretty_name(&UsbIdentity::default()),
            "Unnamed Device | Adafruit KB2040"
        );
    }

    #[test]
    fn test_text_validation() {
        let mut model = pico_model();
        assert!(model.set_profile_name(0, "a,b").is_err());
        assert!(model.set_usb_identity(None, Some("Gün")).is_err());
        assert!(model.set_profile_name(4, "x").is_err());
        model.set_profile_name(1, "Sixteen chars!!!").unwrap();
        assert_eq!(model.current.profiles[1].name.len(), PROFILE_NAME_MAX);
    }

    #[test]
    fn test_switch_layout_forward_copies_fixed_map() {
        let mut model = pico_model();
        model.set_bool(BoolSetting::CustomPins, true);
        assert_eq!(model.current.pins.pin_of(PinFunction::Trigger), Some(15));

        model.assign_pin(15, None).unwrap();
        model.set_bool(BoolSetting::CustomPins, false);
        assert_eq!(model.current.pins.pin_of(PinFunction::Trigger), Some(15));
    }

    #[test]
    fn test_switch_layout_restores_saved_custom_map() {
        let mut model = pico_model();
        model.switch_layout_mode(true);
        model.assign_pin(2, Some(PinFunction::Trigger)).unwrap();
        model.sync();

        model.switch_layout_mode(false);
        model.switch_layout_mode(true);
        assert_eq!(model.current.pins.pin_of(PinFunction::Trigger), Some(2));
    }

    #[test]
    fn test_assign_requires_custom_mode() {
        let mut model = pico_model();
        let err = model.assign_pin(18, Some(PinFunction::Pump)).unwrap_err();
        assert!(matches!(err, DeviceError::InvalidState { .. }));
    }

    #[test]
    fn test_update_offsets_moves_both_copies() {
        let mut model = pico_model();
        let offsets = ProfileOffsets {
            top: 5,
            ..Default::default()
        };
        model.update_offsets(2, offsets).unwrap();
        assert_eq!(model.current.profiles[2].offsets.top, 5);
        assert_eq!(model.shadow.profiles[2].offsets.top, 5);
    }
}
