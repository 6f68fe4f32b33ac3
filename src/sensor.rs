use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use log::trace;

use crate::config::GpioInputsConfig;
use crate::gpio::{GpioPort, Level};

/// Position of the handset hook switch.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HookState {
    /// Handset resting in its cradle.
    OnHook,
    /// Handset lifted.
    OffHook
}

/// Converts raw pin levels into hook-state events and dialed digits.
pub struct LineSensor {
    port: Arc<dyn GpioPort>,
    hook_pin: u8,
    dial_rest_pin: u8,
    dial_pulse_pin: u8,
    on_hook_level: Level,
    last_hook_level: Level,
    tick: Duration
}

impl LineSensor {
    pub fn new(port: Arc<dyn GpioPort>, inputs: &GpioInputsConfig, tick: Duration) -> Self {
        let on_hook_level = Level::from(&inputs.on_hook_level);
        let last_hook_level = port.read(inputs.hook.pin);
        Self {
            hook_pin: inputs.hook.pin,
            dial_rest_pin: inputs.dial_rest.pin,
            dial_pulse_pin: inputs.dial_pulse.pin,
            on_hook_level,
            last_hook_level,
            port,
            tick
        }
    }

    fn hook_state_of(&self, level: Level) -> HookState {
        if level == self.on_hook_level { HookState::OnHook } else { HookState::OffHook }
    }

    /// Hook state as of the last `poll_hook` sample. Does not read the pin.
    pub fn hook_state(&self) -> HookState {
        self.hook_state_of(self.last_hook_level)
    }

    /// Reads the hook pin directly.
    pub fn is_off_hook(&self) -> bool {
        self.port.read(self.hook_pin) != self.on_hook_level
    }

    /// Samples the hook pin once, emitting an event only when the level
    /// differs from the previously observed one.
    pub fn poll_hook(&mut self) -> Option<HookState> {
        let level = self.port.read(self.hook_pin);
        if level == self.last_hook_level {
            return None
        }
        self.last_hook_level = level;
        Some(self.hook_state_of(level))
    }

    /// True while the rotary dial is rotated away from its resting position.
    pub fn dial_in_progress(&self) -> bool {
        self.port.read(self.dial_rest_pin) == Level::Low
    }

    /// Decodes one digit from the dial's pulse train.
    ///
    /// Waits for the pulse line to go low while the dial is away from rest,
    /// settles for one tick, then tallies one count per polling tick while
    /// the line stays low; the tally at burst end, modulo 10, is the digit
    /// (a burst of 10 reads as "0"). Returns `None` without committing
    /// anything when the hook goes on-hook, `cancel` is raised, or the dial
    /// returns to rest before a burst starts.
    pub fn count_pulses(&self, cancel: &AtomicBool) -> Option<u8> {
        loop {
            if cancel.load(Ordering::SeqCst) || !self.is_off_hook() {
                return None
            }
            if self.port.read(self.dial_pulse_pin) == Level::Low {
                break
            }
            if !self.dial_in_progress() {
                trace!("Dial returned to rest without pulsing");
                return None
            }
            spin_sleep::sleep(self.tick);
        }

        // Settle for one tick before counting.
        spin_sleep::sleep(self.tick);
        let mut tally: u32 = 0;
        loop {
            if cancel.load(Ordering::SeqCst) || !self.is_off_hook() {
                // Hung up mid-count; the partial digit is discarded.
                return None
            }
            if self.port.read(self.dial_pulse_pin) != Level::Low {
                break
            }
            tally += 1;
            spin_sleep::sleep(self.tick);
        }
        Some((tally % 10) as u8)
    }
}
