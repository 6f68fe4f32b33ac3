use std::collections::HashMap;
use std::sync::Arc;
use log::{debug, info};
use serde::Deserialize;

use crate::sound::SoundPlayer;

/// Invokes services on the external automation hub.
pub trait HubClient: Send + Sync {
    fn call_service(&self, service: &str);
}

/// Hub stand-in that only logs requested service calls.
pub struct LogHub;

impl HubClient for LogHub {
    fn call_service(&self, service: &str) {
        info!("Hub service call requested: {}", service);
    }
}

/// An action bound to a dialed number.
#[derive(Deserialize, Clone, Debug)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DialAction {
    /// Invoke a named service on the automation hub.
    HubService { service: String },
    /// Play a named sound once.
    Sound { name: String }
}

/// Resolves completed numbers to their configured actions.
pub trait ActionDispatcher: Send + Sync {
    /// Runs the action mapped to `number`, at most once per completed
    /// dialing session. Returns false when no mapping exists; the line then
    /// falls back to the busy signal.
    fn dispatch(&self, number: &str) -> bool;
}

/// Config-driven digit-string → action lookup table.
pub struct DialActionTable {
    actions: HashMap<String, DialAction>,
    /// `None` while hub forwarding is disabled; hub-service actions are then
    /// acknowledged in the log but not sent anywhere.
    hub: Option<Arc<dyn HubClient>>,
    sound: Arc<dyn SoundPlayer>
}

impl DialActionTable {
    pub fn new(
        actions: HashMap<String, DialAction>,
        hub: Option<Arc<dyn HubClient>>,
        sound: Arc<dyn SoundPlayer>
    ) -> Self {
        Self { actions, hub, sound }
    }
}

impl ActionDispatcher for DialActionTable {
    fn dispatch(&self, number: &str) -> bool {
        match self.actions.get(number) {
            Some(DialAction::HubService { service }) => {
                match &self.hub {
                    Some(hub) => hub.call_service(service),
                    None => debug!("Dial action {} triggered", number)
                }
                true
            },
            Some(DialAction::Sound { name }) => {
                self.sound.play(name, false);
                true
            },
            None => false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{RecordingHub, RecordingSound, SoundEvent};

    fn table(hub: Option<Arc<dyn HubClient>>, sound: Arc<RecordingSound>) -> DialActionTable {
        let mut actions = HashMap::new();
        actions.insert(String::from("11"), DialAction::HubService {
            service: String::from("trigger_wyoming_button")
        });
        actions.insert(String::from("15"), DialAction::Sound {
            name: String::from("ringback")
        });
        DialActionTable::new(actions, hub, sound)
    }

    #[test]
    fn mapped_number_calls_hub_service_once() {
        let hub = Arc::new(RecordingHub::default());
        let sound = Arc::new(RecordingSound::default());
        let table = table(Some(Arc::clone(&hub) as Arc<dyn HubClient>), Arc::clone(&sound));

        assert!(table.dispatch("11"));
        assert_eq!(hub.calls(), vec![String::from("trigger_wyoming_button")]);
        assert!(sound.events().is_empty());
    }

    #[test]
    fn mapped_sound_plays_once_not_looped() {
        let sound = Arc::new(RecordingSound::default());
        let table = table(None, Arc::clone(&sound));

        assert!(table.dispatch("15"));
        assert_eq!(sound.events(), vec![SoundEvent::Play {
            name: String::from("ringback"),
            looping: false
        }]);
    }

    #[test]
    fn unmapped_number_reaches_no_boundary() {
        let hub = Arc::new(RecordingHub::default());
        let sound = Arc::new(RecordingSound::default());
        let table = table(Some(Arc::clone(&hub) as Arc<dyn HubClient>), Arc::clone(&sound));

        assert!(!table.dispatch("99"));
        assert!(hub.calls().is_empty());
        assert!(sound.events().is_empty());
    }

    #[test]
    fn hub_service_is_still_handled_with_hub_disabled() {
        let sound = Arc::new(RecordingSound::default());
        let table = table(None, Arc::clone(&sound));

        assert!(table.dispatch("11"));
        assert!(sound.events().is_empty());
    }
}
