use std::time::{Duration, Instant};

/// Digits accumulated for one dialing attempt.
///
/// The number completes once the line stays silent for longer than the
/// configured inter-digit timeout. A reset (hang-up) discards any partial
/// number without dispatching it.
#[derive(Debug)]
pub struct DialSession {
    digits: String,
    last_pulse: Option<Instant>
}

impl DialSession {
    pub fn new() -> Self {
        Self {
            digits: String::new(),
            last_pulse: None
        }
    }

    /// Appends a decoded digit and restarts the inter-digit silence window.
    pub fn on_digit(&mut self, digit: u8) {
        self.digits.push((b'0' + digit % 10) as char);
        self.last_pulse = Some(Instant::now());
    }

    /// True once at least one digit was dialed and the line has been silent
    /// for longer than `dial_timeout`.
    pub fn is_complete(&self, now: Instant, dial_timeout: Duration) -> bool {
        match self.last_pulse {
            Some(last) if !self.digits.is_empty() => {
                now.saturating_duration_since(last) > dial_timeout
            },
            _ => false
        }
    }

    /// Returns and clears the accumulated number.
    pub fn take(&mut self) -> String {
        self.last_pulse = None;
        std::mem::take(&mut self.digits)
    }

    /// Discards the session without dispatching anything.
    pub fn reset(&mut self) {
        self.digits.clear();
        self.last_pulse = None;
    }
}
