use std::collections::HashMap;
use std::fs;
use serde::Deserialize;
use toml;

use crate::actions::DialAction;

#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "kebab-case")]
pub struct LineConfig {
    /// Display name of the phone, used in log output.
    pub phone_name: String,

    /// Log level filter. Defaults to `"info"`.
    pub log_level: Option<String>,

    /// Directory from which named sounds (`*.wav`, `*.ogg`) are loaded.
    /// The sound key is the file path relative to this directory, without
    /// its extension (e.g. `dial_tone`, `busy_signal`, `ringback`).
    pub sounds_path: String,

    /// Forward mapped hub-service dial actions to the automation hub.
    /// When disabled, such actions only log that they were triggered.
    pub enable_hub: bool,

    /// Maximum number of ring cycles per ring request.
    pub max_rings: u32,

    /// Seconds of dial tone to transmit before the line gives up and
    /// switches to the busy signal.
    pub dial_tone_timeout: u64,

    /// Minutes of busy signal to transmit before the line goes silent.
    pub busy_signal_timeout: u64,

    /// Seconds of inter-digit silence that complete a dialed number.
    pub dial_timeout: u64,

    /// GPIO configuration.
    pub gpio: GpioConfig,

    /// Actions to run when their exact digit string is dialed.
    /// Numbers without a mapping fall back to the busy signal.
    #[serde(default)]
    pub dial_actions: HashMap<String, DialAction>,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "kebab-case")]
pub struct GpioConfig {
    /// Input configuration.
    pub inputs: GpioInputsConfig,
    /// Output configuration.
    pub outputs: GpioOutputsConfig,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "kebab-case")]
pub struct GpioInputsConfig {
    /// Input configuration for the switchhook.
    pub hook: InputPinConfig,

    /// Hook pin level that means "handset resting in its cradle".
    /// Defaults to `"high"`.
    pub on_hook_level: Option<String>,

    /// Input configuration for the dial rest switch.
    /// Reads low while the dial is rotated away from its resting position.
    pub dial_rest: InputPinConfig,

    /// Input configuration for the dial pulse switch.
    /// Idle high; each make/break pulse pulls it low.
    pub dial_pulse: InputPinConfig,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "kebab-case")]
pub struct InputPinConfig {
    /// BCM pin number of the input.
    pub pin: u8,
    /// Name of the pull resistor type to use. Defaults to "none".
    pub pull: Option<String>,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "kebab-case")]
pub struct GpioOutputsConfig {
    /// BCM pin number of the ringer control output.
    pub pin_ringer: u8,
}

pub fn load_config(path: &str) -> LineConfig {
    let config_str = fs::read_to_string(path).expect("Unable to read config file");
    let config: LineConfig = toml::from_str(&config_str).expect("Unable to parse config file");
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        phone-name = "Test Phone"
        sounds-path = "res/sounds"
        enable-hub = true
        max-rings = 10
        dial-tone-timeout = 30
        busy-signal-timeout = 2
        dial-timeout = 3

        [gpio.inputs]
        on-hook-level = "high"
        hook = { pin = 17, pull = "up" }
        dial-rest = { pin = 27, pull = "down" }
        dial-pulse = { pin = 22, pull = "down" }

        [gpio.outputs]
        pin-ringer = 23

        [dial-actions]
        "11" = { type = "hub-service", service = "trigger_wyoming_button" }
        "15" = { type = "sound", name = "ringback" }
    "#;

    #[test]
    fn parses_sample_config() {
        let config: LineConfig = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.phone_name, "Test Phone");
        assert_eq!(config.max_rings, 10);
        assert_eq!(config.busy_signal_timeout, 2);
        assert_eq!(config.gpio.inputs.hook.pin, 17);
        assert_eq!(config.gpio.inputs.hook.pull.as_deref(), Some("up"));
        assert_eq!(config.gpio.outputs.pin_ringer, 23);
        assert!(matches!(
            config.dial_actions.get("11"),
            Some(DialAction::HubService { service }) if service == "trigger_wyoming_button"
        ));
        assert!(matches!(
            config.dial_actions.get("15"),
            Some(DialAction::Sound { name }) if name == "ringback"
        ));
    }

    #[test]
    fn dial_actions_default_to_empty() {
        let stripped = SAMPLE.split("[dial-actions]").next().unwrap();
        let config: LineConfig = toml::from_str(stripped).unwrap();
        assert!(config.dial_actions.is_empty());
    }
}
