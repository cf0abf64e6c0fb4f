//! OpenFIRE light gun configuration CLI
//!
//! Reads a board's configuration over USB serial, edits it and saves it back.

use clap::Parser;
use tracing::debug;

// CLI definitions
mod cli;
use cli::{Cli, Commands};

// Command handlers
mod commands;
use commands::SessionOptions;

use openfire_tool::AppConfig;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(AppConfig::default_path);
    let mut config = AppConfig::load(&config_path)?;
    if let Some(mode) = cli.field_mode {
        config.field_mode = mode;
    }
    if let Some(ref port) = cli.port {
        config.port = Some(port.clone());
    }

    // RUST_LOG wins, then --log-level, then the config file
    let level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(monitor_filter(level, cli.monitor)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
    debug!("Using config {:?}", config_path);

    let opts = SessionOptions::new(&config, cli.monitor, cli.hex);

    match cli.command {
        // Default: show board identity
        None | Some(Commands::Info) => commands::query::info(&opts)?,

        // === Discovery & Inspection ===
        Some(Commands::List { all }) => commands::query::list(&opts, all)?,
        Some(Commands::Dump { json }) => commands::query::dump(&opts, json)?,
        Some(Commands::Diff) => commands::query::diff(&opts)?,

        // === Edits ===
        Some(Commands::Toggle {
            flag,
            value,
            commit,
        }) => commands::edit::toggle(&opts, commit, flag, value)?,
        Some(Commands::Set {
            setting,
            value,
            commit,
        }) => commands::edit::set(&opts, commit, setting, value)?,
        Some(Commands::Pin {
            pin,
            function,
            commit,
        }) => commands::edit::pin(&opts, commit, pin, function.0)?,
        Some(Commands::CustomPins { value, commit }) => {
            commands::edit::custom_pins(&opts, commit, value)?
        }
        Some(Commands::Preset { index, commit }) => commands::edit::preset(&opts, commit, index)?,
        Some(Commands::Profile {
            slot,
            ir,
            mode,
            layout,
            color,
            name,
            commit,
        }) => {
            let edit = commands::edit::ProfileEdit {
                ir,
                mode,
                layout,
                color,
                name,
            };
            commands::edit::profile(&opts, commit, slot, edit)?
        }
        Some(Commands::Usb {
            id,
            name,
            preset,
            commit,
        }) => commands::edit::usb(&opts, commit, id, name, preset)?,

        // === Device Actions ===
        Some(Commands::Select { slot }) => commands::action::select(&opts, slot)?,
        Some(Commands::Calibrate { slot }) => commands::action::calibrate(&opts, slot)?,
        Some(Commands::Monitor) => commands::action::monitor(&opts)?,
        Some(Commands::TestMode) => commands::action::test_mode(&opts)?,
        Some(Commands::Test { feature }) => commands::action::test(&opts, feature)?,
        Some(Commands::Clear { yes }) => commands::action::clear(&opts, yes)?,
        Some(Commands::Bootloader) => commands::action::bootloader(&opts)?,

        // === Configuration ===
        Some(Commands::Config { init }) => commands::query::config(&config, &config_path, init)?,
    }

    Ok(())
}

/// `--monitor` needs the `wire` target at info even when the rest is quieter
fn monitor_filter(level: &str, monitor: bool) -> String {
    if monitor {
        format!("{level},wire=info")
    } else {
        level.to_string()
    }
}
