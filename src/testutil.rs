//! Recording doubles for the line's collaborator boundaries.

use std::sync::Mutex;

use crate::actions::HubClient;
use crate::report::SensorReporter;
use crate::sound::SoundPlayer;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SoundEvent {
    Play { name: String, looping: bool },
    StopAll
}

#[derive(Default)]
pub struct RecordingSound {
    events: Mutex<Vec<SoundEvent>>
}

impl RecordingSound {
    pub fn events(&self) -> Vec<SoundEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl SoundPlayer for RecordingSound {
    fn play(&self, name: &str, looping: bool) {
        self.events.lock().unwrap().push(SoundEvent::Play {
            name: name.to_owned(),
            looping
        });
    }

    fn stop_all(&self) {
        self.events.lock().unwrap().push(SoundEvent::StopAll);
    }
}

#[derive(Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<(String, bool)>>
}

impl RecordingReporter {
    pub fn reports(&self) -> Vec<(String, bool)> {
        self.reports.lock().unwrap().clone()
    }
}

impl SensorReporter for RecordingReporter {
    fn report(&self, sensor_id: &str, on: bool) {
        self.reports.lock().unwrap().push((sensor_id.to_owned(), on));
    }
}

#[derive(Default)]
pub struct RecordingHub {
    calls: Mutex<Vec<String>>
}

impl RecordingHub {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl HubClient for RecordingHub {
    fn call_service(&self, service: &str) {
        self.calls.lock().unwrap().push(service.to_owned());
    }
}
