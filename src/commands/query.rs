//! Query (read-only) command handlers.

use std::path::Path;

use openfire_device::{BoardIdentity, DeviceConfig};
use openfire_transport::{FieldMode, TransportDeviceInfo};
use openfire_tool::{format, AppConfig};
use serde::Serialize;

use super::{with_session, CommandResult, SessionOptions};

/// List serial ports, OpenFIRE boards first
pub fn list(opts: &SessionOptions, all: bool) -> CommandResult {
    let discovery = opts.discovery();
    let mut ports = if all {
        discovery.list_ports()?
    } else {
        discovery.list_boards()?
    };
    ports.sort_by_key(|p| !p.is_openfire);

    if ports.is_empty() {
        println!("No OpenFIRE boards found (vendor id {:04X})", opts.vendor_id);
        return Ok(());
    }

    for port in &ports {
        let info = &port.info;
        let ids = match (info.vid, info.pid) {
            (Some(vid), Some(pid)) => format!("{vid:04X}:{pid:04X}"),
            _ => "----:----".to_string(),
        };
        println!(
            "{:<20} {}  {}{}",
            info.port,
            ids,
            info.product_name.as_deref().unwrap_or("-"),
            if port.is_openfire { "  [OpenFIRE]" } else { "" }
        );
    }
    Ok(())
}

/// Show board type, firmware and USB identity
pub fn info(opts: &SessionOptions) -> CommandResult {
    with_session(opts, |session| {
        print!("{}", format::identity(session.model()));
        if let Some(info) = session.device_info() {
            println!("Port:     {}", info.port);
        }
        if let Some(mode) = session.field_mode() {
            println!("Framing:  {:?}", mode);
        }
        Ok(())
    })
}

#[derive(Serialize)]
struct Dump<'a> {
    port: Option<&'a TransportDeviceInfo>,
    field_mode: Option<FieldMode>,
    identity: &'a BoardIdentity,
    config: &'a DeviceConfig,
}

/// Print the whole configuration as text or JSON
pub fn dump(opts: &SessionOptions, json: bool) -> CommandResult {
    with_session(opts, |session| {
        if json {
            let model = session.model();
            let dump = Dump {
                port: session.device_info(),
                field_mode: session.field_mode(),
                identity: &model.identity,
                config: &model.current,
            };
            println!("{}", serde_json::to_string_pretty(&dump)?);
        } else {
            print!("{}", format::model(session.model()));
        }
        Ok(())
    })
}

/// Show what a commit would change and send
///
/// A fresh session has no edits, so this mostly shows the full rewrite a
/// commit performs.
pub fn diff(opts: &SessionOptions) -> CommandResult {
    with_session(opts, |session| {
        print!("{}", format::diff(&session.diff()));
        println!("A commit would send:");
        print!("{}", format::writes(&session.pending_writes()));
        Ok(())
    })
}

/// Show the effective tool configuration, optionally writing defaults
pub fn config(config: &AppConfig, path: &Path, init: bool) -> CommandResult {
    if init {
        if path.exists() {
            println!("Config already exists: {}", path.display());
        } else {
            AppConfig::default().save(path)?;
            println!("Wrote default config to {}", path.display());
        }
    }

    println!("# {}", path.display());
    print!("{}", config.to_toml()?);
    Ok(())
}
