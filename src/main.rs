mod actions;
mod config;
mod dial;
mod gpio;
mod line;
mod report;
mod ring;
mod sensor;
mod sound;
#[cfg(test)]
mod testutil;

use std::io::{self, BufRead};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use log::{info, warn, LevelFilter};
use simplelog::{ColorChoice, TermLogger, TerminalMode};

use crate::actions::{DialActionTable, HubClient, LogHub};
use crate::config::LineConfig;
use crate::gpio::GpioPort;
use crate::line::{LineStateMachine, LineTimeouts, TICK_INTERVAL};
use crate::report::{LogReporter, SensorReporter, SensorStateCache};
use crate::ring::{RingCadence, RingScheduler};
use crate::sensor::LineSensor;
use crate::sound::{SoundBank, SoundPlayer};

const CONFIG_PATH: &str = "./res/pulse_line.toml";

/// Bell strike announcing that the controller is up.
const STARTUP_CHIME: Duration = Duration::from_millis(300);

fn init_logging(config: &LineConfig) {
    let level = match config.log_level.as_deref() {
        Some("off") => LevelFilter::Off,
        Some("error") => LevelFilter::Error,
        Some("warn") => LevelFilter::Warn,
        Some("debug") => LevelFilter::Debug,
        Some("trace") => LevelFilter::Trace,
        _ => LevelFilter::Info
    };
    TermLogger::init(level, simplelog::Config::default(), TerminalMode::Mixed, ColorChoice::Auto)
        .expect("Unable to initialize logger");
}

#[cfg(feature = "rpi")]
fn create_port(config: &LineConfig) -> Arc<dyn GpioPort> {
    let port = gpio::RpiPort::new(&config.gpio).expect("Unable to initialize GPIO interface");
    Arc::new(port)
}

#[cfg(not(feature = "rpi"))]
fn create_port(config: &LineConfig) -> Arc<dyn GpioPort> {
    use crate::gpio::{Level, MemoryPort};
    warn!("GPIO hardware support is not compiled in; using in-memory pins");
    let port = MemoryPort::new();
    // Start with the handset in its cradle.
    port.set(config.gpio.inputs.hook.pin, Level::from(&config.gpio.inputs.on_hook_level));
    Arc::new(port)
}

/// Reads ring commands from stdin, standing in for the hub's inbound
/// "incoming call" requests. `ring` starts a cadence sequence, `stop` ends it.
fn run_control_loop(ringer: Arc<RingScheduler>, max_rings: u32, stop: Arc<AtomicBool>) {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        if stop.load(Ordering::SeqCst) {
            break
        }
        let line = match line {
            Ok(line) => line,
            Err(_) => break
        };
        match line.trim() {
            "" => {},
            "ring" => {
                let ringer = Arc::clone(&ringer);
                thread::spawn(move || ringer.start(max_rings));
            },
            "stop" => ringer.stop(),
            other => warn!("Unknown command: {}", other)
        }
    }
}

fn main() {
    let config = config::load_config(CONFIG_PATH);
    init_logging(&config);
    info!("Starting phone line: {}", config.phone_name);

    let port = create_port(&config);
    let sound = Arc::new(SoundBank::spawn(config.sounds_path.clone()));
    let reporter = Arc::new(LogReporter);
    let cache = Arc::new(SensorStateCache::new());
    let hub: Option<Arc<dyn HubClient>> = if config.enable_hub {
        Some(Arc::new(LogHub))
    } else {
        None
    };
    let dispatcher = Arc::new(DialActionTable::new(
        config.dial_actions.clone(),
        hub,
        sound.clone() as Arc<dyn SoundPlayer>
    ));

    let stop = Arc::new(AtomicBool::new(false));
    let ringer = Arc::new(RingScheduler::new(
        Arc::clone(&port),
        reporter.clone() as Arc<dyn SensorReporter>,
        Arc::clone(&cache),
        config.gpio.outputs.pin_ringer,
        config.gpio.inputs.hook.pin,
        gpio::Level::from(&config.gpio.inputs.on_hook_level),
        RingCadence::default()
    ));

    {
        let stop = Arc::clone(&stop);
        let ringer = Arc::clone(&ringer);
        let sound = Arc::clone(&sound);
        ctrlc::set_handler(move || {
            info!("Shutdown signal received.");
            ringer.stop();
            sound.stop_all();
            stop.store(true, Ordering::SeqCst);
        }).expect("Unable to set termination handler");
    }

    let sensor = LineSensor::new(Arc::clone(&port), &config.gpio.inputs, TICK_INTERVAL);
    let machine = LineStateMachine::new(
        sensor,
        sound.clone() as Arc<dyn SoundPlayer>,
        reporter.clone() as Arc<dyn SensorReporter>,
        Arc::clone(&cache),
        dispatcher,
        LineTimeouts::from_config(&config),
        TICK_INTERVAL,
        Arc::clone(&stop)
    );
    let handles = machine.start();

    {
        let ringer = Arc::clone(&ringer);
        let stop = Arc::clone(&stop);
        let max_rings = config.max_rings;
        thread::spawn(move || run_control_loop(ringer, max_rings, stop));
    }

    ringer.ring_bell(STARTUP_CHIME);

    for handle in handles {
        handle.join().expect("Line thread panicked");
    }
    info!("Shut down cleanly.");
}
