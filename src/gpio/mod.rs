#![allow(dead_code)]

mod pull;
#[cfg(feature = "rpi")]
mod rpi;

pub use pull::*;
#[cfg(feature = "rpi")]
pub use rpi::*;

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Logic level of a GPIO line.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Level {
    High,
    Low
}

impl Level {
    pub fn from_bool(high: bool) -> Level {
        if high { Level::High } else { Level::Low }
    }
}

impl From<&Option<String>> for Level {
    fn from(name: &Option<String>) -> Self {
        if let Some(name) = name {
            return str_to_level(name.to_ascii_lowercase().as_str())
        }
        Level::High
    }
}

#[inline(always)]
fn str_to_level(name: &str) -> Level {
    match name {
        "low" => Level::Low,
        "high" | _ => Level::High
    }
}

/// Provides a general-purpose interface for accessing GPIO pins.
pub trait GpioPort: Send + Sync {
    fn read(&self, pin: u8) -> Level;
    fn write(&self, pin: u8, level: Level);
}

struct PinScript {
    current: Level,
    queued: VecDeque<Level>
}

/// In-memory pin store used on platforms without GPIO hardware and in tests.
///
/// Reads return the held level of a pin; a pin may also be scripted with a
/// queue of levels that are consumed one per read. Unknown pins read high,
/// matching the idle level of every input this crate samples.
pub struct MemoryPort {
    pins: Mutex<HashMap<u8, PinScript>>,
    writes: Mutex<Vec<(u8, Level)>>
}

impl MemoryPort {
    pub fn new() -> Self {
        Self {
            pins: Mutex::new(HashMap::new()),
            writes: Mutex::new(Vec::new())
        }
    }

    /// Holds `pin` at `level`, replacing any scripted queue.
    pub fn set(&self, pin: u8, level: Level) {
        let mut pins = self.pins.lock().unwrap();
        pins.insert(pin, PinScript { current: level, queued: VecDeque::new() });
    }

    /// Appends levels that subsequent reads of `pin` will consume in order.
    /// Once the queue runs dry, reads keep returning the last level.
    pub fn script(&self, pin: u8, levels: &[Level]) {
        let mut pins = self.pins.lock().unwrap();
        let script = pins.entry(pin).or_insert(PinScript {
            current: Level::High,
            queued: VecDeque::new()
        });
        script.queued.extend(levels.iter().copied());
    }

    /// Every write performed on the port, in order.
    pub fn writes(&self) -> Vec<(u8, Level)> {
        self.writes.lock().unwrap().clone()
    }

    /// The most recent level written to `pin`, if any.
    pub fn last_write(&self, pin: u8) -> Option<Level> {
        self.writes.lock().unwrap().iter().rev()
            .find(|(p, _)| *p == pin)
            .map(|(_, level)| *level)
    }
}

impl GpioPort for MemoryPort {
    fn read(&self, pin: u8) -> Level {
        let mut pins = self.pins.lock().unwrap();
        let script = pins.entry(pin).or_insert(PinScript {
            current: Level::High,
            queued: VecDeque::new()
        });
        if let Some(next) = script.queued.pop_front() {
            script.current = next;
        }
        script.current
    }

    fn write(&self, pin: u8, level: Level) {
        self.writes.lock().unwrap().push((pin, level));
        let mut pins = self.pins.lock().unwrap();
        pins.insert(pin, PinScript { current: level, queued: VecDeque::new() });
    }
}
