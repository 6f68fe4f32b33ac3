use std::collections::HashMap;
use std::sync::Mutex;
use log::{debug, info};

/// Receives binary sensor updates for external publication.
/// Callers are responsible for deduplication via [`SensorStateCache`].
pub trait SensorReporter: Send + Sync {
    fn report(&self, sensor_id: &str, on: bool);
}

/// Reporter used when no automation hub is attached; updates only reach the log.
pub struct LogReporter;

impl SensorReporter for LogReporter {
    fn report(&self, sensor_id: &str, on: bool) {
        info!("Sensor '{}' is now {}", sensor_id, if on { "on" } else { "off" });
    }
}

/// Last-reported value per named sensor.
/// A report is forwarded only when the new value differs from the cached one.
pub struct SensorStateCache {
    states: Mutex<HashMap<String, bool>>
}

impl SensorStateCache {
    pub fn new() -> Self {
        Self {
            states: Mutex::new(HashMap::new())
        }
    }

    pub fn update(&self, reporter: &dyn SensorReporter, sensor_id: &str, on: bool) {
        let mut states = self.states.lock().unwrap();
        if states.get(sensor_id) == Some(&on) {
            return
        }
        debug!("Updating binary sensor {} to {}", sensor_id, if on { "on" } else { "off" });
        states.insert(sensor_id.to_owned(), on);
        reporter.report(sensor_id, on);
    }
}
