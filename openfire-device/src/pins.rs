//! Pin assignment engine
//!
//! `PinMap` is a partial injection between input functions and GPIO pins,
//! stored in both directions. Every mutation goes through `assign`, which
//! evicts conflicting entries before linking, so the two directions can never
//! disagree and no pin or function is ever used twice.

use serde::Serialize;

use crate::board::{BoardType, PinFunction, PinSlot, Preset, FUNCTION_COUNT, PIN_COUNT};
use crate::error::DeviceError;

/// Wire value for "no pin"
pub const UNMAPPED: i32 = -1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PinMap {
    by_function: [Option<u8>; FUNCTION_COUNT],
    by_pin: [Option<PinFunction>; PIN_COUNT],
}

impl Default for PinMap {
    fn default() -> Self {
        Self::new()
    }
}

impl PinMap {
    /// Map with every pin unmapped
    pub fn new() -> Self {
        Self {
            by_function: [None; FUNCTION_COUNT],
            by_pin: [None; PIN_COUNT],
        }
    }

    /// The map a board's fixed layout implies
    pub fn from_layout(layout: &[PinSlot; PIN_COUNT]) -> Self {
        let mut map = Self::new();
        for (pin, slot) in layout.iter().enumerate() {
            if let Some(function) = slot.function() {
                map.assign(pin as u8, Some(function));
            }
        }
        map
    }

    /// Build from the pins record: one signed pin per function, `-1` unmapped
    ///
    /// Unlike `assign`, a duplicate here is rejected rather than resolved:
    /// a board reporting one pin for two functions is a bad reply.
    pub fn from_wire(values: &[i32]) -> Result<Self, String> {
        if values.len() != FUNCTION_COUNT {
            return Err(format!(
                "expected {} pins, got {}",
                FUNCTION_COUNT,
                values.len()
            ));
        }
        let mut map = Self::new();
        for (function, &value) in PinFunction::ALL.iter().zip(values) {
            if value == UNMAPPED {
                continue;
            }
            let pin = u8::try_from(value)
                .ok()
                .filter(|&p| (p as usize) < PIN_COUNT)
                .ok_or_else(|| format!("{} on pin {} out of range", function, value))?;
            if let Some(other) = map.function_at(pin) {
                return Err(format!("pin {pin} reported for both {other} and {function}"));
            }
            map.assign(pin, Some(*function));
        }
        Ok(map)
    }

    /// Render as the pins record, in function order
    pub fn to_wire(&self) -> [i32; FUNCTION_COUNT] {
        self.by_function
            .map(|pin| pin.map_or(UNMAPPED, i32::from))
    }

    pub fn pin_of(&self, function: PinFunction) -> Option<u8> {
        self.by_function[function.index()]
    }

    pub fn function_at(&self, pin: u8) -> Option<PinFunction> {
        self.by_pin.get(pin as usize).copied().flatten()
    }

    /// Put `function` on `pin`, or clear `pin` when `function` is `None`
    ///
    /// Whatever was on `pin` is unmapped, and `function` leaves its previous
    /// pin. Out-of-range pins are ignored; callers validate first.
    pub fn assign(&mut self, pin: u8, function: Option<PinFunction>) {
        let Some(slot) = self.by_pin.get_mut(pin as usize) else {
            return;
        };
        if let Some(evicted) = slot.take() {
            self.by_function[evicted.index()] = None;
        }
        let Some(function) = function else {
            return;
        };
        if let Some(old_pin) = self.by_function[function.index()].take() {
            self.by_pin[old_pin as usize] = None;
        }
        self.by_pin[pin as usize] = Some(function);
        self.by_function[function.index()] = Some(pin);
    }

    /// Assigned (function, pin) pairs in function order
    pub fn assigned(&self) -> impl Iterator<Item = (PinFunction, u8)> + '_ {
        PinFunction::ALL
            .iter()
            .filter_map(|&f| self.pin_of(f).map(|pin| (f, pin)))
    }

    pub fn len(&self) -> usize {
        self.by_function.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Functions whose pin differs between the two maps
    pub fn differing_functions<'a>(
        &'a self,
        other: &'a PinMap,
    ) -> impl Iterator<Item = PinFunction> + 'a {
        PinFunction::ALL
            .iter()
            .copied()
            .filter(|&f| self.pin_of(f) != other.pin_of(f))
    }

    /// Both directions agree on every entry
    pub fn is_consistent(&self) -> bool {
        let forward = PinFunction::ALL.iter().all(|&f| match self.pin_of(f) {
            Some(pin) => self.function_at(pin) == Some(f),
            None => true,
        });
        let backward = (0..PIN_COUNT as u8).all(|pin| match self.function_at(pin) {
            Some(f) => self.pin_of(f) == Some(pin),
            None => true,
        });
        forward && backward
    }
}

/// Reject assignments the board cannot physically carry
pub fn check_assignment(
    board: BoardType,
    pin: u8,
    function: Option<PinFunction>,
) -> Result<(), DeviceError> {
    let Some(slot) = board.layout().get(pin as usize) else {
        return Err(DeviceError::InvalidParameter(format!(
            "pin {pin} (expected 0-{})",
            PIN_COUNT - 1
        )));
    };
    if slot.is_reserved() {
        return Err(DeviceError::InvalidParameter(format!(
            "pin {pin} is not available on {board}"
        )));
    }
    if let Some(f) = function {
        if !f.allowed_on(pin) {
            return Err(DeviceError::InvalidParameter(format!(
                "{f} cannot be placed on pin {pin}"
            )));
        }
    }
    Ok(())
}

/// Look up a preset by index
pub fn preset(board: BoardType, index: usize) -> Result<&'static Preset, DeviceError> {
    let presets = board.presets();
    if presets.is_empty() {
        return Err(DeviceError::NotSupported(format!(
            "{board} has no pin presets"
        )));
    }
    presets.get(index).ok_or_else(|| {
        DeviceError::InvalidParameter(format!(
            "preset {index} (expected 0-{})",
            presets.len() - 1
        ))
    })
}

/// A fresh map holding exactly the preset's assignments
pub fn preset_map(preset: &Preset) -> PinMap {
    let mut map = PinMap::new();
    for &(function, pin) in preset.assignments {
        map.assign(pin, Some(function));
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_function_between_pins() {
        let mut map = PinMap::new();
        map.assign(5, Some(PinFunction::Trigger));
        map.assign(9, Some(PinFunction::Trigger));

        assert_eq!(map.function_at(5), None);
        assert_eq!(map.function_at(9), Some(PinFunction::Trigger));
        assert_eq!(map.pin_of(PinFunction::Trigger), Some(9));
        assert!(map.is_consistent());
    }

    #[test]
    fn test_assign_evicts_occupant() {
        let mut map = PinMap::new();
        map.assign(4, Some(PinFunction::Start));
        map.assign(4, Some(PinFunction::Select));

        assert_eq!(map.pin_of(PinFunction::Start), None);
        assert_eq!(map.pin_of(PinFunction::Select), Some(4));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_assign_none_clears_pin() {
        let mut map = PinMap::from_layout(BoardType::RpiPico.layout());
        map.assign(15, None);
        assert_eq!(map.pin_of(PinFunction::Trigger), None);
        assert_eq!(map.function_at(15), None);
        // same function on same pin is a no-op
        map.assign(14, Some(PinFunction::Pedal));
        assert_eq!(map.pin_of(PinFunction::Pedal), Some(14));
    }

    #[test]
    fn test_wire_round_trip() {
        let map = PinMap::from_layout(BoardType::AdafruitItsyRp2040.layout());
        let wire = map.to_wire();
        assert_eq!(wire[PinFunction::Trigger.index()], 6);
        assert_eq!(wire[PinFunction::TempSensor.index()], UNMAPPED);
        assert_eq!(PinMap::from_wire(&wire).unwrap(), map);
    }

    #[test]
    fn test_from_wire_rejects_bad_records() {
        let mut wire = [UNMAPPED; FUNCTION_COUNT];
        assert!(PinMap::from_wire(&wire[..30]).is_err());

        wire[0] = 30;
        assert!(PinMap::from_wire(&wire).is_err());

        wire[0] = 3;
        wire[1] = 3;
        assert!(PinMap::from_wire(&wire).is_err());

        wire[1] = -2;
        assert!(PinMap::from_wire(&wire).is_err());
    }

    #[test]
    fn test_check_assignment() {
        let pico = BoardType::RpiPico;
        assert!(check_assignment(pico, 23, Some(PinFunction::Start)).is_err());
        assert!(check_assignment(pico, 23, None).is_err());
        assert!(check_assignment(pico, 30, None).is_err());
        assert!(check_assignment(pico, 19, Some(PinFunction::AnalogX)).is_err());
        assert!(check_assignment(pico, 27, Some(PinFunction::AnalogX)).is_ok());
        assert!(check_assignment(pico, 18, Some(PinFunction::PeriphSda)).is_ok());
        assert!(check_assignment(pico, 18, Some(PinFunction::PeriphScl)).is_err());
    }

    #[test]
    fn test_preset_lookup() {
        assert_eq!(preset(BoardType::RpiPico, 1).unwrap().name, "Minimal");
        assert!(matches!(
            preset(BoardType::RpiPico, 3),
            Err(DeviceError::InvalidParameter(_))
        ));
        assert!(matches!(
            preset(BoardType::WaveshareZero, 0),
            Err(DeviceError::NotSupported(_))
        ));
    }

    #[test]
    fn test_preset_map_leaves_rest_unmapped() {
        let map = preset_map(preset(BoardType::RpiPico, 1).unwrap());
        assert_eq!(map.len(), 9);
        assert_eq!(map.pin_of(PinFunction::DpadUp), None);
        assert_eq!(map.pin_of(PinFunction::CamScl), Some(21));
    }

    #[test]
    fn test_differing_functions() {
        let a = PinMap::from_layout(BoardType::RpiPico.layout());
        let mut b = a.clone();
        b.assign(19, Some(PinFunction::Trigger));
        let diff: Vec<_> = a.differing_functions(&b).collect();
        assert_eq!(diff, vec![PinFunction::Trigger]);
    }
}
