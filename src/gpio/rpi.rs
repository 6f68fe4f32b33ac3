#![cfg(feature = "rpi")]

use std::collections::HashMap;
use std::sync::Mutex;
use log::warn;
use rppal::gpio::{Gpio, InputPin, OutputPin, Pin};

use super::{GpioPort, Level, Pull};
use crate::config::GpioConfig;

pub fn make_input_pin(pin: Pin, pull: Pull) -> InputPin {
    match pull {
        Pull::Up => pin.into_input_pullup(),
        Pull::Down => pin.into_input_pulldown(),
        Pull::None => {
            warn!("Pin {} is floating. Consider using internal pull resistor instead.", pin.pin());
            pin.into_input()
        }
    }
}

/// GPIO port backed by the Raspberry Pi pin controller.
///
/// All pins the line uses are registered up front from the configuration;
/// reading or writing a pin that was never registered is a wiring bug and
/// aborts the process, since there is no degraded mode for a phone whose
/// pins cannot be reached.
pub struct RpiPort {
    inputs: HashMap<u8, InputPin>,
    outputs: Mutex<HashMap<u8, OutputPin>>
}

impl RpiPort {
    pub fn new(config: &GpioConfig) -> Result<Self, rppal::gpio::Error> {
        let gpio = Gpio::new()?;
        let mut inputs = HashMap::new();
        for input in [&config.inputs.hook, &config.inputs.dial_rest, &config.inputs.dial_pulse] {
            let pin = gpio.get(input.pin)?;
            inputs.insert(input.pin, make_input_pin(pin, Pull::from(&input.pull)));
        }

        let mut outputs = HashMap::new();
        outputs.insert(config.outputs.pin_ringer, gpio.get(config.outputs.pin_ringer)?.into_output());

        Ok(Self {
            inputs,
            outputs: Mutex::new(outputs)
        })
    }
}

impl GpioPort for RpiPort {
    fn read(&self, pin: u8) -> Level {
        let input = self.inputs.get(&pin).expect("Read from unregistered GPIO pin");
        Level::from_bool(input.is_high())
    }

    fn write(&self, pin: u8, level: Level) {
        let mut outputs = self.outputs.lock().unwrap();
        let output = outputs.get_mut(&pin).expect("Write to unregistered GPIO pin");
        match level {
            Level::High => output.set_high(),
            Level::Low => output.set_low()
        }
    }
}
