mod companion;
mod config;
// Mock display for development on non-Pi machines
#[cfg_attr(not(target_arch = "arm"), path = "mock_display.rs")]
mod display;
mod icon;
mod layout;
mod message;
mod render;
mod state;
mod sync;
mod theme;
mod util;

use crate::{
    companion::Companion,
    config::Config,
    display::Display,
    message::{InboundMessage, Outbox},
    render::Face,
    state::{FileStore, SettingsStore},
    sync::{BatteryState, Event, SyncController},
    util::MockOutbox,
};
use anyhow::Context;
use chrono::{Local, Timelike};
use log::{error, info, warn, LevelFilter};
use serde::Deserialize;
use std::{
    env, fs, io,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{self, RecvTimeoutError, Sender},
        Arc,
    },
    thread,
    time::Duration,
};

/// How often the event loop checks for shutdown while idle
const SHUTDOWN_POLL: Duration = Duration::from_millis(500);

fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .filter_module("happymac", LevelFilter::Info)
        .parse_default_env()
        .init();

    let config_path = env::args().nth(1);
    let config = Config::load(config_path.as_deref())?;
    let mut display = Display::new(&config)?;
    let store = SettingsStore::new(
        FileStore::open(&config.settings_path),
        config.default_theme,
    );

    let (sender, receiver) = mpsc::channel();
    let (mut outbox, connected): (Box<dyn Outbox>, bool) =
        match &config.companion {
            Some(companion) => (
                Box::new(Companion::new(companion.clone(), sender.clone())),
                true,
            ),
            None => {
                info!("No companion configured, starting disconnected");
                (Box::new(MockOutbox::default()), false)
            }
        };
    let mut controller =
        SyncController::new(store, display.info(), Local::now());

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("Error setting Ctrl-C handler")?;

    // Load has to be the first event processed
    sender.send(Event::Load { connected })?;
    spawn_ticker(sender.clone(), config.battery_path.clone());
    spawn_console(sender);

    while running.load(Ordering::SeqCst) {
        let event = match receiver.recv_timeout(SHUTDOWN_POLL) {
            Ok(event) => event,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };
        let dirty = controller.handle(event, Local::now(), outbox.as_mut());
        if dirty.any() {
            let face = Face {
                derived: controller.derived(),
                clock: controller.clock(),
                battery: controller.battery(),
            };
            if let Err(err) = display.draw(&face, dirty) {
                error!("Error drawing face: {err:?}");
            }
        }
    }

    info!("Exiting with settings {:?}", controller.settings());
    Ok(())
}

/// Post a tick at the top of every minute, plus battery changes
fn spawn_ticker(events: Sender<Event>, battery_path: Option<PathBuf>) {
    thread::spawn(move || {
        let mut battery = None;
        loop {
            let state = match &battery_path {
                Some(path) => match read_battery(path) {
                    Ok(state) => Some(state),
                    Err(err) => {
                        warn!("Error reading battery: {err:?}");
                        None
                    }
                },
                // Nothing to read, so assume we're plugged in
                None => Some(BatteryState {
                    charge_percent: 100,
                    charging: true,
                }),
            };
            if let Some(state) = state.filter(|state| Some(*state) != battery)
            {
                battery = Some(state);
                if events.send(Event::Battery(state)).is_err() {
                    break;
                }
            }

            let now = Local::now();
            let into_minute = Duration::new(
                now.second().into(),
                now.nanosecond().min(999_999_999),
            );
            thread::sleep(Duration::from_secs(60).saturating_sub(into_minute));
            if events.send(Event::Tick).is_err() {
                break;
            }
        }
    });
}

/// Read charge from a sysfs `capacity` file. Charging status comes from the
/// `status` file next to it, if there is one.
fn read_battery(path: &Path) -> anyhow::Result<BatteryState> {
    let capacity = fs::read_to_string(path)
        .with_context(|| format!("Error reading {}", path.display()))?;
    let charge_percent = capacity
        .trim()
        .parse::<u8>()
        .with_context(|| format!("Invalid battery capacity {capacity:?}"))?;
    let charging = fs::read_to_string(path.with_file_name("status"))
        .map(|status| status.trim() == "Charging")
        .unwrap_or_default();
    Ok(BatteryState {
        charge_percent: charge_percent.min(100),
        charging,
    })
}

/// One line of console input. Stands in for the phone's config page. A line
/// can flip connectivity, carry message fields, or both.
#[derive(Debug, Deserialize)]
struct ConsoleCommand {
    connected: Option<bool>,
    #[serde(flatten)]
    message: InboundMessage,
}

impl ConsoleCommand {
    /// Connectivity goes first, so a reconnect sees the new settings
    /// afterward rather than racing them
    fn into_events(self) -> Vec<Event> {
        let mut events = Vec::new();
        if let Some(connected) = self.connected {
            events.push(Event::Connection(connected));
        }
        if self.message != InboundMessage::default() {
            events.push(Event::Inbound(self.message));
        }
        events
    }
}

/// Read newline-delimited JSON commands from stdin
fn spawn_console(events: Sender<Event>) {
    thread::spawn(move || {
        for line in io::stdin().lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    error!("Error reading stdin: {err}");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            let command = match serde_json::from_str::<ConsoleCommand>(&line)
            {
                Ok(command) => command,
                Err(err) => {
                    warn!("Invalid command {line:?}: {err}");
                    continue;
                }
            };
            let events_for_line = command.into_events();
            if events_for_line.is_empty() {
                warn!("Command {line:?} has no known fields");
            }
            if events_for_line
                .into_iter()
                .any(|event| events.send(event).is_err())
            {
                break;
            }
        }
    });
}
