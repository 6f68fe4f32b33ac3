use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use log::{debug, info, warn};

use crate::gpio::{GpioPort, Level};
use crate::line::TICK_INTERVAL;
use crate::report::{SensorReporter, SensorStateCache};

/// Sensor ID under which ringer activity is reported.
const SENSOR_RINGER_OUTPUT: &str = "ringer_output";

/// Timing of one ring cycle. Both phases are polled at `tick` so that a
/// stop request or pickup interrupts the cycle without waiting it out.
#[derive(Copy, Clone, Debug)]
pub struct RingCadence {
    pub on_time: Duration,
    pub off_time: Duration,
    pub tick: Duration
}

impl Default for RingCadence {
    fn default() -> Self {
        Self {
            on_time: Duration::from_secs(2),
            off_time: Duration::from_secs(4),
            tick: TICK_INTERVAL
        }
    }
}

/// Drives the bell output pin through the ring cadence.
///
/// `start` runs the cadence on the calling thread; `stop` may be called
/// from any other thread. Whatever ends a sequence, the control pin is
/// always left low.
pub struct RingScheduler {
    port: Arc<dyn GpioPort>,
    reporter: Arc<dyn SensorReporter>,
    cache: Arc<SensorStateCache>,
    ringer_pin: u8,
    hook_pin: u8,
    on_hook_level: Level,
    cadence: RingCadence,
    stop_flag: AtomicBool,
    ringing: AtomicBool
}

impl RingScheduler {
    pub fn new(
        port: Arc<dyn GpioPort>,
        reporter: Arc<dyn SensorReporter>,
        cache: Arc<SensorStateCache>,
        ringer_pin: u8,
        hook_pin: u8,
        on_hook_level: Level,
        cadence: RingCadence
    ) -> Self {
        Self {
            port,
            reporter,
            cache,
            ringer_pin,
            hook_pin,
            on_hook_level,
            cadence,
            stop_flag: AtomicBool::new(false),
            ringing: AtomicBool::new(false)
        }
    }

    /// Rings up to `max_rings` cycles, stopping early on pickup or `stop`.
    /// At most one sequence runs at a time; overlapping starts are ignored.
    pub fn start(&self, max_rings: u32) {
        if self.ringing.swap(true, Ordering::SeqCst) {
            warn!("Ringer already active; ignoring start request");
            return
        }
        self.stop_flag.store(false, Ordering::SeqCst);
        info!("Starting ringer ({} rings max)", max_rings);

        let completed = self.ring_cycles(max_rings);
        self.silence();
        self.ringing.store(false, Ordering::SeqCst);

        if completed {
            info!("Ringer finished after {} rings", max_rings);
        } else {
            info!("Ringer stopped early");
        }
    }

    fn ring_cycles(&self, max_rings: u32) -> bool {
        for _ in 0..max_rings {
            self.port.write(self.ringer_pin, Level::High);
            self.cache.update(&*self.reporter, SENSOR_RINGER_OUTPUT, true);
            debug!("Ring");
            if !self.hold(self.cadence.on_time) {
                return false
            }

            self.port.write(self.ringer_pin, Level::Low);
            self.cache.update(&*self.reporter, SENSOR_RINGER_OUTPUT, false);
            debug!("Ring paused");
            if !self.hold(self.cadence.off_time) {
                return false
            }
        }
        true
    }

    /// Waits out one cadence phase. Returns false when the sequence should
    /// end because of a stop request or the handset being picked up.
    fn hold(&self, phase: Duration) -> bool {
        let deadline = Instant::now() + phase;
        while Instant::now() < deadline {
            if self.stop_flag.load(Ordering::SeqCst) || self.picked_up() {
                return false
            }
            spin_sleep::sleep(self.cadence.tick);
        }
        true
    }

    fn picked_up(&self) -> bool {
        self.port.read(self.hook_pin) != self.on_hook_level
    }

    fn silence(&self) {
        self.port.write(self.ringer_pin, Level::Low);
        self.cache.update(&*self.reporter, SENSOR_RINGER_OUTPUT, false);
    }

    /// Ends any running sequence and forces the bell off.
    /// Safe to call repeatedly and from any thread.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        self.silence();
        info!("Ringer control pin set to LOW");
    }

    /// Single short bell strike, used as the startup chime.
    /// Skipped while a ring sequence is running.
    pub fn ring_bell(&self, duration: Duration) {
        if self.ringing.load(Ordering::SeqCst) {
            return
        }
        self.port.write(self.ringer_pin, Level::High);
        spin_sleep::sleep(duration);
        self.port.write(self.ringer_pin, Level::Low);
        info!("Rang bell for {}ms", duration.as_millis());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use crate::gpio::MemoryPort;
    use crate::testutil::RecordingReporter;

    const RINGER: u8 = 23;
    const HOOK: u8 = 1;

    struct Fixture {
        port: Arc<MemoryPort>,
        reporter: Arc<RecordingReporter>,
        ringer: RingScheduler
    }

    fn fixture() -> Fixture {
        let port = Arc::new(MemoryPort::new());
        // On-hook by default; the cadence must run to completion.
        port.set(HOOK, Level::High);
        let reporter = Arc::new(RecordingReporter::default());
        let cadence = RingCadence {
            on_time: Duration::from_millis(10),
            off_time: Duration::from_millis(10),
            tick: Duration::from_millis(1)
        };
        let ringer = RingScheduler::new(
            Arc::clone(&port) as Arc<dyn GpioPort>,
            Arc::clone(&reporter) as Arc<dyn SensorReporter>,
            Arc::new(SensorStateCache::new()),
            RINGER,
            HOOK,
            Level::High,
            cadence
        );
        Fixture { port, reporter, ringer }
    }

    fn high_writes(port: &MemoryPort) -> usize {
        port.writes().iter()
            .filter(|(pin, level)| *pin == RINGER && *level == Level::High)
            .count()
    }

    #[test]
    fn full_sequence_rings_max_rings_times_and_ends_low() {
        let f = fixture();
        f.ringer.start(3);

        assert_eq!(high_writes(&f.port), 3);
        assert_eq!(f.port.last_write(RINGER), Some(Level::Low));
        let ons = f.reporter.reports().iter()
            .filter(|(id, on)| id == "ringer_output" && *on)
            .count();
        assert_eq!(ons, 3);
    }

    #[test]
    fn pickup_aborts_the_sequence() {
        let f = fixture();
        f.port.set(HOOK, Level::Low);
        f.ringer.start(5);

        // First cycle starts, then the pickup check ends the hold early.
        assert_eq!(high_writes(&f.port), 1);
        assert_eq!(f.port.last_write(RINGER), Some(Level::Low));
        assert_eq!(f.reporter.reports(), vec![
            (String::from("ringer_output"), true),
            (String::from("ringer_output"), false),
        ]);
    }

    #[test]
    fn stop_before_start_prevents_further_cycles() {
        let f = fixture();
        f.ringer.stop();
        f.ringer.stop();
        assert_eq!(f.port.last_write(RINGER), Some(Level::Low));
        assert_eq!(high_writes(&f.port), 0);
    }

    #[test]
    fn overlapping_start_is_rejected() {
        let f = fixture();
        assert!(!f.ringer.ringing.swap(true, Ordering::SeqCst));
        // A second starter must bail out without touching the pin.
        f.ringer.start(5);
        assert!(f.port.writes().is_empty());
        f.ringer.ringing.store(false, Ordering::SeqCst);
    }

    #[test]
    fn stop_from_another_thread_ends_a_long_sequence() {
        let f = fixture();
        let ringer = Arc::new(f.ringer);
        let running = Arc::clone(&ringer);
        let handle = thread::spawn(move || running.start(1000));
        thread::sleep(Duration::from_millis(5));
        ringer.stop();
        handle.join().unwrap();

        assert!(high_writes(&f.port) < 1000);
        assert_eq!(f.port.last_write(RINGER), Some(Level::Low));
    }

    #[test]
    fn ring_bell_strikes_once() {
        let f = fixture();
        f.ringer.ring_bell(Duration::from_millis(2));
        assert_eq!(f.port.writes(), vec![
            (RINGER, Level::High),
            (RINGER, Level::Low),
        ]);
    }
}
