//! Command handlers for the CLI application.
//!
//! This module organizes command handlers by category:
//! - `query`: Read-only commands (list, info, dump, diff, config)
//! - `edit`: Commands that change the configuration and commit it
//!   (toggle, set, pin, custom-pins, preset, profile, usb)
//! - `action`: One-shot board actions and live views (select, calibrate,
//!   monitor, test-mode, test, clear, bootloader)

pub mod action;
pub mod edit;
pub mod query;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use openfire_device::{DeviceError, DeviceSession, SessionConfig, SettingsModel};
use openfire_transport::{MonitorConfig, SerialDiscovery};
use openfire_tool::{format, AppConfig};
use tracing::info;

use crate::cli::CommitArgs;

/// Result type for command handlers
pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Everything needed to reach a board, resolved from config and flags
pub struct SessionOptions {
    pub port: Option<String>,
    pub baud_rate: u32,
    pub vendor_id: u16,
    pub monitor: Option<MonitorConfig>,
    pub session: SessionConfig,
}

impl SessionOptions {
    pub fn new(config: &AppConfig, monitor: bool, hex: bool) -> Self {
        Self {
            port: config.port.clone(),
            baud_rate: config.baud_rate,
            vendor_id: config.vendor_id,
            monitor: monitor.then(|| MonitorConfig::default().with_hex(hex)),
            session: config.session_config(),
        }
    }

    /// Discovery with vendor id, baud rate and monitoring applied
    pub fn discovery(&self) -> SerialDiscovery {
        let discovery = SerialDiscovery::new()
            .with_vendor_id(self.vendor_id)
            .with_baud_rate(self.baud_rate);
        match &self.monitor {
            Some(config) => discovery.with_monitor(config.clone()),
            None => discovery,
        }
    }
}

/// Open the configured port (or the first OpenFIRE board) and load it
pub fn open_session(opts: &SessionOptions) -> anyhow::Result<DeviceSession> {
    let discovery = opts.discovery();
    let transport = match opts.port.as_deref() {
        Some(port) => discovery
            .open(port)
            .with_context(|| format!("Cannot open {port}"))?,
        None => discovery.open_any().context("No OpenFIRE board found")?,
    };
    let port = transport.device_info().port.clone();
    let session = DeviceSession::open(transport, opts.session.clone())
        .with_context(|| format!("Cannot load configuration from {port}"))?;
    info!(
        "Connected to {} on {}",
        session.identity().pretty_name(&session.model().current.usb),
        port
    );
    Ok(session)
}

/// Open a session, run a closure with it, then undock
pub fn with_session<F>(opts: &SessionOptions, f: F) -> CommandResult
where
    F: FnOnce(&mut DeviceSession) -> CommandResult,
{
    let mut session = open_session(opts)?;
    let result = f(&mut session);
    if session.is_connected() {
        session.undock().context("Undock failed")?;
    }
    result
}

/// Connect, apply one edit, show the diff, and commit unless `--dry-run`
pub fn edit_and_commit<F>(opts: &SessionOptions, args: CommitArgs, f: F) -> CommandResult
where
    F: FnOnce(&mut SettingsModel) -> Result<(), DeviceError>,
{
    with_session(opts, |session| {
        session.edit(f)?;

        let changes = session.diff();
        print!("{}", format::diff(&changes));
        if changes.is_empty() {
            return Ok(());
        }

        if args.dry_run {
            println!("Dry run, a commit would send:");
            print!("{}", format::writes(&session.pending_writes()));
            return Ok(());
        }

        session.commit().context("Commit failed")?;
        println!("Saved {} change(s)", changes.len());
        Ok(())
    })
}

/// Set up a Ctrl-C handler that sets the given flag to false when triggered.
/// Returns the Arc<AtomicBool> for use in the main loop.
pub fn setup_interrupt_handler() -> Arc<AtomicBool> {
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);

    if let Err(e) = ctrlc::set_handler(move || {
        running_clone.store(false, Ordering::SeqCst);
    }) {
        eprintln!("Warning: Could not set Ctrl+C handler: {e}");
    }

    running
}
