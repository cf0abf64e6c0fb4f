//! Edit command handlers: each one connects, applies a single edit, shows
//! the diff and commits it unless `--dry-run` is given.

use openfire_device::{
    BoolSetting, IrSensitivity, LayoutType, PinFunction, RunMode, Setting,
};
use openfire_tool::format;

use super::{edit_and_commit, with_session, CommandResult, SessionOptions};
use crate::cli::CommitArgs;

pub fn toggle(opts: &SessionOptions, args: CommitArgs, flag: BoolSetting, value: bool) -> CommandResult {
    edit_and_commit(opts, args, |m| {
        m.set_bool(flag, value);
        Ok(())
    })
}

pub fn set(opts: &SessionOptions, args: CommitArgs, setting: Setting, value: u32) -> CommandResult {
    edit_and_commit(opts, args, |m| m.set_setting(setting, value))
}

/// Put a function on a pin; whatever held either of them is unmapped
pub fn pin(
    opts: &SessionOptions,
    args: CommitArgs,
    pin: u8,
    function: Option<PinFunction>,
) -> CommandResult {
    edit_and_commit(opts, args, |m| m.assign_pin(pin, function))
}

pub fn custom_pins(opts: &SessionOptions, args: CommitArgs, value: bool) -> CommandResult {
    edit_and_commit(opts, args, |m| {
        m.switch_layout_mode(value);
        Ok(())
    })
}

/// Apply a preset by index, or list the board's presets
pub fn preset(opts: &SessionOptions, args: CommitArgs, index: Option<usize>) -> CommandResult {
    let Some(index) = index else {
        return with_session(opts, |session| {
            let board = session.board();
            let presets = board.presets();
            if presets.is_empty() {
                println!("{board} has no pin presets");
            }
            for (i, preset) in presets.iter().enumerate() {
                println!("{i}: {}", preset.name);
                for (function, pin) in preset.assignments {
                    println!("     GP{:<3} {}", pin, function);
                }
            }
            Ok(())
        });
    };

    edit_and_commit(opts, args, |m| {
        let name = m.apply_preset(index)?;
        println!("Applied preset \"{name}\"");
        Ok(())
    })
}

/// Requested changes to one calibration profile
#[derive(Debug, Default)]
pub struct ProfileEdit {
    pub ir: Option<IrSensitivity>,
    pub mode: Option<RunMode>,
    pub layout: Option<LayoutType>,
    pub color: Option<u32>,
    pub name: Option<String>,
}

impl ProfileEdit {
    fn is_empty(&self) -> bool {
        self.ir.is_none()
            && self.mode.is_none()
            && self.layout.is_none()
            && self.color.is_none()
            && self.name.is_none()
    }
}

/// Show a profile, or edit its user-settable fields
pub fn profile(opts: &SessionOptions, args: CommitArgs, slot: u8, edit: ProfileEdit) -> CommandResult {
    if edit.is_empty() {
        return with_session(opts, |session| {
            let model = session.model();
            let selected = model.identity.selected_profile == slot;
            let p = &model.current.profiles[slot as usize];
            print!("{}", format::profile(slot as usize, p, selected));
            Ok(())
        });
    }

    edit_and_commit(opts, args, |m| {
        if let Some(ir) = edit.ir {
            m.set_ir_sensitivity(slot, ir)?;
        }
        if let Some(mode) = edit.mode {
            m.set_run_mode(slot, mode)?;
        }
        if let Some(layout) = edit.layout {
            m.set_layout(slot, layout)?;
        }
        if let Some(color) = edit.color {
            m.set_color(slot, color)?;
        }
        if let Some(name) = &edit.name {
            m.set_profile_name(slot, name)?;
        }
        Ok(())
    })
}

/// Show the USB identity, or set it directly or from a player preset
pub fn usb(
    opts: &SessionOptions,
    args: CommitArgs,
    id: Option<String>,
    name: Option<String>,
    preset: Option<u8>,
) -> CommandResult {
    if id.is_none() && name.is_none() && preset.is_none() {
        return with_session(opts, |session| {
            let usb = &session.model().current.usb;
            println!(
                "Name: {}",
                if usb.product_name.is_empty() {
                    "(unset)"
                } else {
                    &usb.product_name
                }
            );
            match usb.product_id_hex() {
                Some(hex) => println!("ID:   {} (0x{})", usb.product_id, hex),
                None => println!("ID:   (default)"),
            }
            Ok(())
        });
    }

    edit_and_commit(opts, args, |m| match preset {
        Some(player) => m.apply_usb_preset(player),
        None => m.set_usb_identity(id.as_deref(), name.as_deref()),
    })
}
