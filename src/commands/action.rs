//! Device action handlers: profile switching, calibration, live event views
//! and maintenance commands.

use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use openfire_device::{DeviceSession, SessionEvent};
use openfire_transport::FeatureTest;
use openfire_tool::format;

use super::{setup_interrupt_handler, with_session, CommandResult, SessionOptions};

/// How long one poll waits before the loop checks for Ctrl-C again
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Make a profile active on the board
pub fn select(opts: &SessionOptions, slot: u8) -> CommandResult {
    with_session(opts, |session| {
        session.select_profile(slot)?;
        let name = &session.model().current.profiles[slot as usize].name;
        println!("Profile {slot} \"{name}\" is active");
        Ok(())
    })
}

/// Start calibration and wait for the board to report the new offsets
pub fn calibrate(opts: &SessionOptions, slot: u8) -> CommandResult {
    with_session(opts, |session| {
        let running = setup_interrupt_handler();
        session.calibrate(slot)?;
        println!("Calibrating profile {slot}: follow the prompts on the gun");
        println!("  Ctrl+C = stop waiting");

        while running.load(Ordering::SeqCst) {
            for event in next_events(session)? {
                println!("{}", format::event(&event));
                if matches!(event, SessionEvent::ProfileUpdated { slot: s, .. } if s == slot) {
                    println!("Calibration of profile {slot} finished");
                    return Ok(());
                }
            }
        }
        println!("Stopped waiting; the board keeps calibrating on its own");
        Ok(())
    })
}

/// Print idle notifications until Ctrl-C
pub fn monitor(opts: &SessionOptions) -> CommandResult {
    with_session(opts, |session| {
        let running = setup_interrupt_handler();
        println!(
            "Watching {} (Ctrl+C to stop)",
            session.identity().pretty_name(&session.model().current.usb)
        );
        while running.load(Ordering::SeqCst) {
            for event in next_events(session)? {
                println!("{}", format::event(&event));
            }
        }
        Ok(())
    })
}

/// Stream test-mode telemetry until Ctrl-C
pub fn test_mode(opts: &SessionOptions) -> CommandResult {
    with_session(opts, |session| {
        let running = setup_interrupt_handler();
        session.set_test_mode(true)?;
        println!("Test mode (Ctrl+C to stop)");

        let result = (|| -> CommandResult {
            while running.load(Ordering::SeqCst) {
                for event in session.poll(POLL_INTERVAL)? {
                    if let SessionEvent::Telemetry(frame) = event {
                        println!("{}", format::telemetry(&frame));
                    }
                }
            }
            Ok(())
        })();

        if session.is_connected() {
            session.set_test_mode(false)?;
        }
        result
    })
}

/// Pulse a feedback device or the RGB LED
pub fn test(opts: &SessionOptions, feature: FeatureTest) -> CommandResult {
    with_session(opts, |session| {
        session.test_feature(feature)?;
        println!("Sent {:?} test", feature);
        Ok(())
    })
}

/// Erase saved configuration (requires `--yes`)
pub fn clear(opts: &SessionOptions, yes: bool) -> CommandResult {
    if !yes {
        eprintln!("This erases every saved setting on the board. Re-run with --yes to confirm.");
        return Ok(());
    }
    with_session(opts, |session| {
        session.clear_storage()?;
        println!("Storage cleared. Reset the board to load factory defaults.");
        Ok(())
    })
}

/// Reboot into the UF2 bootloader
pub fn bootloader(opts: &SessionOptions) -> CommandResult {
    with_session(opts, |session| {
        session.reboot_to_bootloader()?;
        println!("Board is rebooting into its bootloader");
        Ok(())
    })
}

/// Keep the heartbeat going and collect whatever arrived
fn next_events(session: &mut DeviceSession) -> Result<Vec<SessionEvent>, Box<dyn std::error::Error>> {
    session.tick(Instant::now())?;
    Ok(session.poll(POLL_INTERVAL)?)
}
