//! Diff and commit planning
//!
//! The diff compares `current` against `shadow` field by field. The commit
//! plan is not driven by the diff: whole groups are rewritten every time, so
//! a commit also repairs fields that drifted on the device.

use std::fmt;

use openfire_transport::{Command, ProfileField, WriteCategory};
use serde::Serialize;

use crate::board::PinFunction;
use crate::pins::PinMap;
use crate::settings::{BoolSetting, CalibrationProfile, Setting, SettingsModel, PROFILE_COUNT};

/// Which field of the model a change refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FieldKey {
    Bool(BoolSetting),
    /// The pin map as a whole
    Pins,
    Setting(Setting),
    UsbId,
    UsbName,
    SelectedProfile,
    Profile { slot: u8, field: ProfileField },
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "toggle {}", b),
            Self::Pins => f.write_str("pins"),
            Self::Setting(s) => write!(f, "setting {}", s),
            Self::UsbId => f.write_str("usb id"),
            Self::UsbName => f.write_str("usb name"),
            Self::SelectedProfile => f.write_str("selected profile"),
            Self::Profile { slot, field } => {
                let name = match field {
                    ProfileField::IrSensitivity => "ir",
                    ProfileField::RunMode => "mode",
                    ProfileField::Layout => "layout",
                    ProfileField::Color => "color",
                    ProfileField::Name => "name",
                };
                write!(f, "profile {} {}", slot, name)
            }
        }
    }
}

/// One field whose current value differs from the device's
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldChange {
    pub field: FieldKey,
    pub shadow: String,
    pub current: String,
}

impl fmt::Display for FieldChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} -> {}", self.field, self.shadow, self.current)
    }
}

fn push<T: PartialEq + fmt::Display>(out: &mut Vec<FieldChange>, field: FieldKey, shadow: T, current: T) {
    if shadow != current {
        out.push(FieldChange {
            field,
            shadow: shadow.to_string(),
            current: current.to_string(),
        });
    }
}

fn pin_label(pin: Option<u8>) -> String {
    pin.map_or_else(|| "unmapped".to_string(), |p| format!("GP{p}"))
}

/// `function=pin` for each moved function, e.g. `trigger=GP15`
fn pin_list(pins: &PinMap, moved: &[PinFunction]) -> String {
    moved
        .iter()
        .map(|&f| format!("{}={}", f.key(), pin_label(pins.pin_of(f))))
        .collect::<Vec<_>>()
        .join(" ")
}

fn profile_fields(p: &CalibrationProfile) -> [(ProfileField, String); 5] {
    [
        (ProfileField::IrSensitivity, p.ir_sensitivity.code().to_string()),
        (ProfileField::RunMode, p.run_mode.code().to_string()),
        (ProfileField::Layout, p.layout.code().to_string()),
        (ProfileField::Color, p.color.to_string()),
        (ProfileField::Name, p.name.clone()),
    ]
}

impl SettingsModel {
    /// Every field where current and shadow disagree
    ///
    /// Pins only count while custom pins are enabled, and the whole map is
    /// one field: an assignment that evicts another function is still one
    /// change. Profile offsets never count since they come from the device.
    pub fn diff(&self) -> Vec<FieldChange> {
        let (cur, old) = (&self.current, &self.shadow);
        let mut out = Vec::new();

        for b in BoolSetting::ALL {
            push(&mut out, FieldKey::Bool(b), old.bools.get(b), cur.bools.get(b));
        }

        if cur.bools.custom_pins() {
            let moved: Vec<PinFunction> = cur.pins.differing_functions(&old.pins).collect();
            if !moved.is_empty() {
                out.push(FieldChange {
                    field: FieldKey::Pins,
                    shadow: pin_list(&old.pins, &moved),
                    current: pin_list(&cur.pins, &moved),
                });
            }
        }

        for s in Setting::ALL {
            push(&mut out, FieldKey::Setting(s), old.settings.get(s), cur.settings.get(s));
        }

        push(&mut out, FieldKey::UsbId, &old.usb.product_id, &cur.usb.product_id);
        push(&mut out, FieldKey::UsbName, &old.usb.product_name, &cur.usb.product_name);

        push(
            &mut out,
            FieldKey::SelectedProfile,
            self.identity.previous_profile,
            self.identity.selected_profile,
        );

        for slot in 0..PROFILE_COUNT as u8 {
            let before = profile_fields(&old.profiles[slot as usize]);
            let after = profile_fields(&cur.profiles[slot as usize]);
            for ((field, shadow), (_, current)) in before.into_iter().zip(after) {
                push(&mut out, FieldKey::Profile { slot, field }, shadow, current);
            }
        }

        out
    }

    /// Number of differing fields; zero means there is nothing to commit
    pub fn diff_count(&self) -> usize {
        self.diff().len()
    }

    pub fn is_dirty(&self) -> bool {
        self.diff_count() > 0
    }

    /// The writes a commit sends, in order, ending with the save
    ///
    /// Bools, settings and profile scalars are always rewritten. Pins go out
    /// only in custom mode; USB id and name only when set.
    pub fn commit_plan(&self) -> Vec<Command> {
        let cur = &self.current;
        let mut plan = Vec::new();

        for (b, value) in cur.bools.iter() {
            plan.push(Command::write(WriteCategory::Bool, b.index() as u8, value as u8));
        }

        if cur.bools.custom_pins() {
            for (f, pin) in PinFunction::ALL.iter().zip(cur.pins.to_wire()) {
                plan.push(Command::write(WriteCategory::Pin, f.index() as u8, pin));
            }
        }

        for (s, value) in cur.settings.iter() {
            plan.push(Command::write(WriteCategory::Setting, s.index() as u8, value));
        }

        if !cur.usb.product_id.is_empty() {
            plan.push(Command::write(WriteCategory::Identity, 0, &cur.usb.product_id));
        }
        if !cur.usb.product_name.is_empty() {
            plan.push(Command::write(WriteCategory::Identity, 1, &cur.usb.product_name));
        }

        for slot in 0..PROFILE_COUNT as u8 {
            for (field, value) in profile_fields(&cur.profiles[slot as usize]) {
                plan.push(Command::write_profile(field, slot, value));
            }
        }

        plan.push(Command::Save);
        plan
    }
}
