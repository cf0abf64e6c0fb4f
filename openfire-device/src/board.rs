// Builtin board data
// Fixed pin layouts and pin presets for every supported RP2040 board

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Physical GPIO slots on an RP2040
pub const PIN_COUNT: usize = 30;

/// Number of assignable input functions
pub const FUNCTION_COUNT: usize = 31;

/// First GPIO wired to the ADC
pub const FIRST_ADC_PIN: u8 = 26;

/// A logical input or output the firmware can attach to a pin
///
/// Discriminants are the protocol's 1-based function ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[repr(u8)]
pub enum PinFunction {
    Trigger = 1,
    ButtonA,
    ButtonB,
    ButtonC,
    Start,
    Select,
    DpadUp,
    DpadDown,
    DpadLeft,
    DpadRight,
    Pedal,
    AltPedal,
    Home,
    Pump,
    RumbleSignal,
    SolenoidSignal,
    RumbleSwitch,
    SolenoidSwitch,
    AutofireSwitch,
    NeoPixel,
    LedRed,
    LedGreen,
    LedBlue,
    CamSda,
    CamScl,
    PeriphSda,
    PeriphScl,
    BatterySensor,
    AnalogX,
    AnalogY,
    TempSensor,
}

impl PinFunction {
    pub const ALL: [PinFunction; FUNCTION_COUNT] = [
        Self::Trigger,
        Self::ButtonA,
        Self::ButtonB,
        Self::ButtonC,
        Self::Start,
        Self::Select,
        Self::DpadUp,
        Self::DpadDown,
        Self::DpadLeft,
        Self::DpadRight,
        Self::Pedal,
        Self::AltPedal,
        Self::Home,
        Self::Pump,
        Self::RumbleSignal,
        Self::SolenoidSignal,
        Self::RumbleSwitch,
        Self::SolenoidSwitch,
        Self::AutofireSwitch,
        Self::NeoPixel,
        Self::LedRed,
        Self::LedGreen,
        Self::LedBlue,
        Self::CamSda,
        Self::CamScl,
        Self::PeriphSda,
        Self::PeriphScl,
        Self::BatterySensor,
        Self::AnalogX,
        Self::AnalogY,
        Self::TempSensor,
    ];

    /// 1-based protocol id
    pub fn id(self) -> u8 {
        self as u8
    }

    /// 0-based position in the pins record
    pub fn index(self) -> usize {
        self as usize - 1
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.get((id as usize).checked_sub(1)?).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Trigger => "Trigger",
            Self::ButtonA => "Button A",
            Self::ButtonB => "Button B",
            Self::ButtonC => "Button C",
            Self::Start => "Start",
            Self::Select => "Select",
            Self::DpadUp => "D-Pad Up",
            Self::DpadDown => "D-Pad Down",
            Self::DpadLeft => "D-Pad Left",
            Self::DpadRight => "D-Pad Right",
            Self::Pedal => "Pedal",
            Self::AltPedal => "Alt Pedal",
            Self::Home => "Home Button",
            Self::Pump => "Pump Action",
            Self::RumbleSignal => "Rumble Signal",
            Self::SolenoidSignal => "Solenoid Signal",
            Self::RumbleSwitch => "Rumble Switch",
            Self::SolenoidSwitch => "Solenoid Switch",
            Self::AutofireSwitch => "Autofire Switch",
            Self::NeoPixel => "External NeoPixel",
            Self::LedRed => "RGB LED Red",
            Self::LedGreen => "RGB LED Green",
            Self::LedBlue => "RGB LED Blue",
            Self::CamSda => "Camera SDA",
            Self::CamScl => "Camera SCL",
            Self::PeriphSda => "Peripherals SDA",
            Self::PeriphScl => "Peripherals SCL",
            Self::BatterySensor => "Battery Sensor",
            Self::AnalogX => "Analog Pin X",
            Self::AnalogY => "Analog Pin Y",
            Self::TempSensor => "Temp Sensor",
        }
    }

    /// Short command-line key
    pub fn key(self) -> &'static str {
        match self {
            Self::Trigger => "trigger",
            Self::ButtonA => "button-a",
            Self::ButtonB => "button-b",
            Self::ButtonC => "button-c",
            Self::Start => "start",
            Self::Select => "select",
            Self::DpadUp => "dpad-up",
            Self::DpadDown => "dpad-down",
            Self::DpadLeft => "dpad-left",
            Self::DpadRight => "dpad-right",
            Self::Pedal => "pedal",
            Self::AltPedal => "alt-pedal",
            Self::Home => "home",
            Self::Pump => "pump",
            Self::RumbleSignal => "rumble",
            Self::SolenoidSignal => "solenoid",
            Self::RumbleSwitch => "rumble-switch",
            Self::SolenoidSwitch => "solenoid-switch",
            Self::AutofireSwitch => "autofire-switch",
            Self::NeoPixel => "neopixel",
            Self::LedRed => "led-red",
            Self::LedGreen => "led-green",
            Self::LedBlue => "led-blue",
            Self::CamSda => "cam-sda",
            Self::CamScl => "cam-scl",
            Self::PeriphSda => "periph-sda",
            Self::PeriphScl => "periph-scl",
            Self::BatterySensor => "battery",
            Self::AnalogX => "analog-x",
            Self::AnalogY => "analog-y",
            Self::TempSensor => "temp",
        }
    }

    /// Needs an ADC-capable pin
    pub fn is_analog(self) -> bool {
        matches!(self, Self::AnalogX | Self::AnalogY | Self::TempSensor)
    }

    /// Whether this function may sit on `pin` (I2C data lines are fixed to
    /// even GPIOs, clock lines to odd ones)
    pub fn allowed_on(self, pin: u8) -> bool {
        if self.is_analog() && pin < FIRST_ADC_PIN {
            return false;
        }
        match self {
            Self::CamSda | Self::PeriphSda => pin % 2 == 0,
            Self::CamScl | Self::PeriphScl => pin % 2 == 1,
            _ => true,
        }
    }
}

impl fmt::Display for PinFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PinFunction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(id) = s.parse::<u8>() {
            return Self::from_id(id).ok_or_else(|| format!("No input function with id {id}"));
        }
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.key() == wanted || f.name().to_lowercase() == wanted)
            .ok_or_else(|| format!("Unknown input function: {s}"))
    }
}

/// What a board's fixed layout puts on one pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinSlot {
    /// Hard-wired function
    Fixed(PinFunction),
    /// Free digital GPIO
    Digital,
    /// Free ADC-capable GPIO
    Analog,
    /// Not broken out on this board
    Reserved,
}

impl PinSlot {
    pub fn function(self) -> Option<PinFunction> {
        match self {
            Self::Fixed(f) => Some(f),
            _ => None,
        }
    }

    pub fn is_reserved(self) -> bool {
        self == Self::Reserved
    }
}

/// A named custom-pins shortcut
#[derive(Debug, Clone, Copy)]
pub struct Preset {
    pub name: &'static str,
    pub assignments: &'static [(PinFunction, u8)],
}

/// Everything the engine needs to know about one board model
#[derive(Debug)]
pub struct BoardInfo {
    pub display_name: &'static str,
    pub layout: &'static [PinSlot; PIN_COUNT],
    pub presets: &'static [Preset],
}

/// Board models reported by the probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum BoardType {
    /// Nothing probed yet
    #[default]
    None,
    RpiPico,
    RpiPicoW,
    AdafruitItsyRp2040,
    AdafruitKb2040,
    ArduinoNanoRp2040,
    WaveshareZero,
    VccgndYd,
    Generic,
}

impl BoardType {
    /// Map the probe's board token; anything unknown is a generic RP2040
    pub fn from_token(token: &str) -> Self {
        match token.trim() {
            "rpipico" => Self::RpiPico,
            "rpipicow" => Self::RpiPicoW,
            "adafruitItsyRP2040" => Self::AdafruitItsyRp2040,
            "adafruitKB2040" => Self::AdafruitKb2040,
            "arduinoNanoRP2040" => Self::ArduinoNanoRp2040,
            "waveshareZero" => Self::WaveshareZero,
            "vccgndYD" => Self::VccgndYd,
            _ => Self::Generic,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::RpiPico => "rpipico",
            Self::RpiPicoW => "rpipicow",
            Self::AdafruitItsyRp2040 => "adafruitItsyRP2040",
            Self::AdafruitKb2040 => "adafruitKB2040",
            Self::ArduinoNanoRp2040 => "arduinoNanoRP2040",
            Self::WaveshareZero => "waveshareZero",
            Self::VccgndYd => "vccgndYD",
            Self::Generic => "generic",
        }
    }

    pub fn info(self) -> &'static BoardInfo {
        match self {
            Self::RpiPico => &RPIPICO,
            Self::RpiPicoW => &RPIPICOW,
            Self::VccgndYd => &VCCGNDYD,
            Self::AdafruitItsyRp2040 => &ITSYBITSY_RP2040,
            Self::AdafruitKb2040 => &KB2040,
            Self::ArduinoNanoRp2040 => &NANO_RP2040,
            Self::WaveshareZero => &WAVESHARE_ZERO,
            Self::Generic | Self::None => &GENERIC,
        }
    }

    pub fn display_name(self) -> &'static str {
        self.info().display_name
    }

    pub fn layout(self) -> &'static [PinSlot; PIN_COUNT] {
        self.info().layout
    }

    pub fn presets(self) -> &'static [Preset] {
        self.info().presets
    }
}

impl fmt::Display for BoardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// ============================================================================
// Layout tables (index = GPIO number)
// ============================================================================

use PinFunction as F;

const fn fx(f: PinFunction) -> PinSlot {
    PinSlot::Fixed(f)
}
const D: PinSlot = PinSlot::Digital;
const A: PinSlot = PinSlot::Analog;
const R: PinSlot = PinSlot::Reserved;

#[rustfmt::skip]
const RPIPICO_LAYOUT: [PinSlot; PIN_COUNT] = [
    fx(F::ButtonA), fx(F::ButtonB), fx(F::ButtonC), fx(F::Start),      // 0-3
    fx(F::Select), fx(F::Home), fx(F::DpadUp), fx(F::DpadDown),        // 4-7
    fx(F::DpadLeft), fx(F::DpadRight), fx(F::LedRed), fx(F::LedGreen), // 8-11
    fx(F::LedBlue), fx(F::Pump), fx(F::Pedal), fx(F::Trigger),         // 12-15
    fx(F::SolenoidSignal), fx(F::RumbleSignal), D, D,                  // 16-19
    fx(F::CamSda), fx(F::CamScl), D, R,                                // 20-23
    R, R, A, A,                                                        // 24-27 (23-25 unexposed)
    A, R,                                                              // 28-29 (29 is VSYS sense)
];

#[rustfmt::skip]
const ITSYBITSY_RP2040_LAYOUT: [PinSlot; PIN_COUNT] = [
    fx(F::DpadUp), fx(F::DpadDown), fx(F::CamSda), fx(F::CamScl),      // 0-3
    fx(F::DpadLeft), fx(F::DpadRight), fx(F::Trigger), fx(F::ButtonA), // 4-7
    fx(F::ButtonB), fx(F::ButtonC), fx(F::Start), fx(F::Select),       // 8-11
    fx(F::Pedal), R, R, R,                                             // 12-15
    R, R, D, D,                                                        // 16-19
    D, R, R, R,                                                        // 20-23
    fx(F::RumbleSignal), fx(F::SolenoidSignal), A, A,                  // 24-27
    A, A,                                                              // 28-29
];

#[rustfmt::skip]
const KB2040_LAYOUT: [PinSlot; PIN_COUNT] = [
    D, D, fx(F::CamSda), fx(F::CamScl),                                // 0-3
    fx(F::ButtonB), fx(F::RumbleSignal), fx(F::ButtonC), fx(F::SolenoidSignal), // 4-7
    fx(F::Select), fx(F::Start), fx(F::DpadRight), R,                  // 8-11
    R, R, R, R,                                                        // 12-15
    R, R, fx(F::DpadUp), fx(F::DpadLeft),                              // 16-19
    fx(F::DpadDown), R, R, R,                                          // 20-23
    R, R, fx(F::TempSensor), fx(F::Home),                              // 24-27
    fx(F::Trigger), fx(F::ButtonA),                                    // 28-29
];

#[rustfmt::skip]
const NANO_RP2040_LAYOUT: [PinSlot; PIN_COUNT] = [
    fx(F::Trigger), fx(F::Pedal), R, R,                                // 0-3
    fx(F::ButtonA), fx(F::ButtonC), D, fx(F::ButtonB),                 // 4-7
    R, R, R, R,                                                        // 8-11 (wifi module)
    fx(F::CamSda), fx(F::CamScl), R, D,                                // 12-15
    D, D, D, D,                                                        // 16-19
    D, D, R, R,                                                        // 20-23
    R, D, A, A,                                                        // 24-27
    A, A,                                                              // 28-29
];

#[rustfmt::skip]
const WAVESHARE_ZERO_LAYOUT: [PinSlot; PIN_COUNT] = [
    fx(F::Trigger), fx(F::ButtonA), fx(F::ButtonB), fx(F::ButtonC),    // 0-3
    fx(F::Start), fx(F::Select), D, D,                                 // 4-7
    D, D, D, D,                                                        // 8-11
    D, D, fx(F::CamSda), fx(F::CamScl),                                // 12-15
    fx(F::SolenoidSignal), fx(F::RumbleSignal), D, D,                  // 16-19
    D, D, R, R,                                                        // 20-23
    R, D, A, A,                                                        // 24-27
    A, fx(F::TempSensor),                                              // 28-29
];

#[rustfmt::skip]
const GENERIC_LAYOUT: [PinSlot; PIN_COUNT] = [
    D, D, D, D, D, D, D, D, D, D,                                      // 0-9
    D, D, D, D, D, D, D, D, D, D,                                      // 10-19
    D, D, D, R, R, R, A, A, A, A,                                      // 20-29 (23-25 usually unexposed)
];

// ============================================================================
// Presets
// ============================================================================

const RPIPICO_PRESETS: &[Preset] = &[
    Preset {
        name: "Default",
        assignments: &[
            (F::ButtonA, 0),
            (F::ButtonB, 1),
            (F::ButtonC, 2),
            (F::Start, 3),
            (F::Select, 4),
            (F::Home, 5),
            (F::DpadUp, 6),
            (F::DpadDown, 7),
            (F::DpadLeft, 8),
            (F::DpadRight, 9),
            (F::LedRed, 10),
            (F::LedGreen, 11),
            (F::LedBlue, 12),
            (F::Pump, 13),
            (F::Pedal, 14),
            (F::Trigger, 15),
            (F::SolenoidSignal, 16),
            (F::RumbleSignal, 17),
            (F::CamSda, 20),
            (F::CamScl, 21),
        ],
    },
    Preset {
        name: "Minimal",
        assignments: &[
            (F::ButtonA, 0),
            (F::ButtonB, 1),
            (F::Start, 3),
            (F::Select, 4),
            (F::Trigger, 15),
            (F::SolenoidSignal, 16),
            (F::RumbleSignal, 17),
            (F::CamSda, 20),
            (F::CamScl, 21),
        ],
    },
    Preset {
        name: "Cabinet",
        assignments: &[
            (F::ButtonA, 0),
            (F::ButtonB, 1),
            (F::ButtonC, 2),
            (F::Start, 3),
            (F::Select, 4),
            (F::Home, 5),
            (F::AltPedal, 12),
            (F::Pump, 13),
            (F::Pedal, 14),
            (F::Trigger, 15),
            (F::SolenoidSignal, 16),
            (F::RumbleSignal, 17),
            (F::RumbleSwitch, 18),
            (F::SolenoidSwitch, 19),
            (F::CamSda, 20),
            (F::CamScl, 21),
            (F::NeoPixel, 22),
            (F::TempSensor, 26),
        ],
    },
];

const ITSYBITSY_RP2040_PRESETS: &[Preset] = &[
    Preset {
        name: "Default",
        assignments: &[
            (F::DpadUp, 0),
            (F::DpadDown, 1),
            (F::CamSda, 2),
            (F::CamScl, 3),
            (F::DpadLeft, 4),
            (F::DpadRight, 5),
            (F::Trigger, 6),
            (F::ButtonA, 7),
            (F::ButtonB, 8),
            (F::ButtonC, 9),
            (F::Start, 10),
            (F::Select, 11),
            (F::Pedal, 12),
            (F::RumbleSignal, 24),
            (F::SolenoidSignal, 25),
        ],
    },
    Preset {
        name: "Switches",
        assignments: &[
            (F::DpadUp, 0),
            (F::DpadDown, 1),
            (F::CamSda, 2),
            (F::CamScl, 3),
            (F::DpadLeft, 4),
            (F::DpadRight, 5),
            (F::Trigger, 6),
            (F::ButtonA, 7),
            (F::ButtonB, 8),
            (F::ButtonC, 9),
            (F::Start, 10),
            (F::Select, 11),
            (F::Pedal, 12),
            (F::RumbleSwitch, 18),
            (F::SolenoidSwitch, 19),
            (F::AutofireSwitch, 20),
            (F::RumbleSignal, 24),
            (F::SolenoidSignal, 25),
            (F::TempSensor, 26),
        ],
    },
];

// ============================================================================
// Board table
// ============================================================================

static RPIPICO: BoardInfo = BoardInfo {
    display_name: "Raspberry Pi Pico",
    layout: &RPIPICO_LAYOUT,
    presets: RPIPICO_PRESETS,
};

static RPIPICOW: BoardInfo = BoardInfo {
    display_name: "Raspberry Pi Pico W",
    layout: &RPIPICO_LAYOUT,
    presets: RPIPICO_PRESETS,
};

static VCCGNDYD: BoardInfo = BoardInfo {
    display_name: "VCC-GND YD-RP2040",
    layout: &RPIPICO_LAYOUT,
    presets: RPIPICO_PRESETS,
};

static ITSYBITSY_RP2040: BoardInfo = BoardInfo {
    display_name: "Adafruit ItsyBitsy RP2040",
    layout: &ITSYBITSY_RP2040_LAYOUT,
    presets: ITSYBITSY_RP2040_PRESETS,
};

static KB2040: BoardInfo = BoardInfo {
    display_name: "Adafruit KB2040",
    layout: &KB2040_LAYOUT,
    presets: &[],
};

static NANO_RP2040: BoardInfo = BoardInfo {
    display_name: "Arduino Nano RP2040 Connect",
    layout: &NANO_RP2040_LAYOUT,
    presets: &[],
};

static WAVESHARE_ZERO: BoardInfo = BoardInfo {
    display_name: "Waveshare RP2040 Zero",
    layout: &WAVESHARE_ZERO_LAYOUT,
    presets: &[],
};

static GENERIC: BoardInfo = BoardInfo {
    display_name: "Generic RP2040 Board",
    layout: &GENERIC_LAYOUT,
    presets: &[],
};

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_BOARDS: [BoardType; 8] = [
        BoardType::RpiPico,
        BoardType::RpiPicoW,
        BoardType::AdafruitItsyRp2040,
        BoardType::AdafruitKb2040,
        BoardType::ArduinoNanoRp2040,
        BoardType::WaveshareZero,
        BoardType::VccgndYd,
        BoardType::Generic,
    ];

    #[test]
    fn test_function_ids_round_trip() {
        for (i, f) in PinFunction::ALL.iter().enumerate() {
            assert_eq!(f.index(), i);
            assert_eq!(PinFunction::from_id(f.id()), Some(*f));
        }
        assert_eq!(PinFunction::from_id(0), None);
        assert_eq!(PinFunction::from_id(32), None);
        assert_eq!(PinFunction::TempSensor.id(), 31);
    }

    #[test]
    fn test_function_from_str() {
        assert_eq!("trigger".parse::<PinFunction>(), Ok(PinFunction::Trigger));
        assert_eq!("D-Pad Up".parse::<PinFunction>(), Ok(PinFunction::DpadUp));
        assert_eq!("3".parse::<PinFunction>(), Ok(PinFunction::ButtonB));
        assert!("laser".parse::<PinFunction>().is_err());
    }

    #[test]
    fn test_board_tokens() {
        for board in ALL_BOARDS {
            assert_eq!(BoardType::from_token(board.token()), board);
        }
        assert_eq!(BoardType::from_token("someClone"), BoardType::Generic);
        assert_eq!(BoardType::None.display_name(), "Generic RP2040 Board");
    }

    #[test]
    fn test_layouts_are_injective_and_capable() {
        for board in ALL_BOARDS {
            let mut seen = std::collections::HashSet::new();
            for (pin, slot) in board.layout().iter().enumerate() {
                if let Some(f) = slot.function() {
                    assert!(seen.insert(f), "{board:?} maps {f:?} twice");
                    assert!(f.allowed_on(pin as u8), "{board:?} puts {f:?} on {pin}");
                }
            }
        }
    }

    #[test]
    fn test_presets_fit_their_boards() {
        for board in ALL_BOARDS {
            for preset in board.presets() {
                let mut pins = std::collections::HashSet::new();
                let mut funcs = std::collections::HashSet::new();
                for &(f, pin) in preset.assignments {
                    assert!(pins.insert(pin), "{} reuses pin {pin}", preset.name);
                    assert!(funcs.insert(f), "{} reuses {f:?}", preset.name);
                    assert!(!board.layout()[pin as usize].is_reserved());
                    assert!(f.allowed_on(pin));
                }
            }
        }
        assert_eq!(BoardType::RpiPicoW.presets().len(), 3);
        assert!(BoardType::AdafruitKb2040.presets().is_empty());
    }

    #[test]
    fn test_pin_capabilities() {
        assert!(!PinFunction::AnalogX.allowed_on(25));
        assert!(PinFunction::AnalogX.allowed_on(26));
        assert!(PinFunction::CamSda.allowed_on(4));
        assert!(!PinFunction::CamSda.allowed_on(5));
        assert!(PinFunction::PeriphScl.allowed_on(5));
        assert!(!PinFunction::PeriphScl.allowed_on(6));
        assert!(PinFunction::BatterySensor.allowed_on(3));
    }
}
