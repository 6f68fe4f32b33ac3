use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use log::{debug, info};

use crate::actions::ActionDispatcher;
use crate::config::LineConfig;
use crate::dial::DialSession;
use crate::report::{SensorReporter, SensorStateCache};
use crate::sensor::{HookState, LineSensor};
use crate::sound::SoundPlayer;

/// Fixed polling interval of the line loops.
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Sensor ID under which hook transitions are reported.
const SENSOR_HOOK_SWITCH: &str = "hook_switch";

const SOUND_DIAL_TONE: &str = "dial_tone";
const SOUND_BUSY_SIGNAL: &str = "busy_signal";

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum LineState {
    /// The handset is resting in its cradle and the line is idle.
    OnHook,
    /// The handset is lifted and the line is transmitting a dial tone.
    OffHookDialTone,
    /// The dial has been used and the line is collecting digits.
    OffHookDialing,
    /// The line gave up on the dialing attempt and is transmitting a busy signal.
    OffHookBusy,
    /// The handset is still lifted but the line has gone silent.
    OffHookIdleSilent
}

/// Timeouts governing line-state transitions, converted to durations from
/// the whole-second/whole-minute configuration surface.
#[derive(Copy, Clone, Debug)]
pub struct LineTimeouts {
    /// Dial-tone duration before the line gives up and turns busy.
    pub dial_tone: Duration,
    /// Busy-signal duration before the line goes silent.
    pub busy_signal: Duration,
    /// Inter-digit silence that completes a dialed number.
    pub dial: Duration
}

impl LineTimeouts {
    pub fn from_config(config: &LineConfig) -> Self {
        Self {
            dial_tone: Duration::from_secs(config.dial_tone_timeout),
            busy_signal: Duration::from_secs(config.busy_signal_timeout * 60),
            dial: Duration::from_secs(config.dial_timeout)
        }
    }
}

/// Line state shared between the polling loop and the completion watcher.
///
/// This is the single mutual-exclusion boundary of the line; both loops
/// mutate it only while holding the lock, and only through [`transition`].
pub struct LineShared {
    state: LineState,
    session: DialSession,
    dial_tone_start: Instant,
    busy_start: Instant
}

impl LineShared {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            state: LineState::OnHook,
            session: DialSession::new(),
            dial_tone_start: now,
            busy_start: now
        }
    }

    pub fn state(&self) -> LineState {
        self.state
    }

    pub fn on_hook(&self) -> bool {
        self.state == LineState::OnHook
    }

    /// True only while the dialing attempt has timed out into the busy
    /// signal or gone silent afterwards. Any hang-up or re-pickup
    /// transition clears it, since those leave both states.
    pub fn dial_timeout_occurred(&self) -> bool {
        matches!(self.state, LineState::OffHookBusy | LineState::OffHookIdleSilent)
    }
}

/// Applies a state change and its side effects. Same-state calls are no-ops.
fn transition(shared: &mut LineShared, state: LineState, sound: &dyn SoundPlayer) {
    use LineState::*;
    if shared.state == state {
        return
    }
    let prev = shared.state;
    shared.state = state;

    match (prev, state) {
        (_, OnHook) => {
            sound.stop_all();
            shared.session.reset();
        },
        (_, OffHookDialTone) => {
            sound.stop_all();
            sound.play(SOUND_DIAL_TONE, true);
            shared.dial_tone_start = Instant::now();
            shared.session.reset();
        },
        (_, OffHookDialing) => {
            // The dial tone stops as soon as a digit-capture window opens.
            sound.stop_all();
        },
        (_, OffHookBusy) => {
            sound.stop_all();
            sound.play(SOUND_BUSY_SIGNAL, true);
            shared.busy_start = Instant::now();
        },
        (OffHookBusy, OffHookIdleSilent) => {
            sound.stop_all();
        },
        // A completed dial action may still be sounding; leave it alone.
        (_, OffHookIdleSilent) => {}
    }

    info!("Line state: {:?} --> {:?}", prev, state);
}

/// One completion-watcher step: hands a finished number to the dispatcher
/// and applies the follow-up state. Unmapped numbers get the default
/// action, the busy signal.
fn poll_completion(
    shared: &Mutex<LineShared>,
    dispatcher: &dyn ActionDispatcher,
    sound: &dyn SoundPlayer,
    dial_timeout: Duration,
    now: Instant
) {
    let number = {
        let mut shared = shared.lock().unwrap();
        if shared.on_hook() || !shared.session.is_complete(now, dial_timeout) {
            return
        }
        shared.session.take()
    };

    info!("Complete dialed number: {}", number);
    let handled = dispatcher.dispatch(&number);

    let mut shared = shared.lock().unwrap();
    if shared.on_hook() {
        // Hung up while dispatching; the line was already reset.
        return
    }
    if handled {
        transition(&mut shared, LineState::OffHookIdleSilent, sound);
    } else {
        transition(&mut shared, LineState::OffHookBusy, sound);
    }
}

/// Central state machine driving sound feedback, reporting, and dispatch.
///
/// `start` spawns two execution contexts: the line-polling loop (hook
/// tracking, timeouts, digit capture) and the dial-completion watcher.
/// Ring sequencing is separate; see [`crate::ring::RingScheduler`].
pub struct LineStateMachine {
    sensor: LineSensor,
    shared: Arc<Mutex<LineShared>>,
    sound: Arc<dyn SoundPlayer>,
    reporter: Arc<dyn SensorReporter>,
    cache: Arc<SensorStateCache>,
    dispatcher: Arc<dyn ActionDispatcher>,
    timeouts: LineTimeouts,
    tick: Duration,
    stop: Arc<AtomicBool>
}

impl LineStateMachine {
    pub fn new(
        sensor: LineSensor,
        sound: Arc<dyn SoundPlayer>,
        reporter: Arc<dyn SensorReporter>,
        cache: Arc<SensorStateCache>,
        dispatcher: Arc<dyn ActionDispatcher>,
        timeouts: LineTimeouts,
        tick: Duration,
        stop: Arc<AtomicBool>
    ) -> Self {
        Self {
            sensor,
            shared: Arc::new(Mutex::new(LineShared::new())),
            sound,
            reporter,
            cache,
            dispatcher,
            timeouts,
            tick,
            stop
        }
    }

    /// Spawns the line-polling loop and the dial-completion watcher.
    /// Both terminate at their next check point once the stop flag is raised.
    pub fn start(self) -> Vec<JoinHandle<()>> {
        let shared = Arc::clone(&self.shared);
        let sound = Arc::clone(&self.sound);
        let dispatcher = Arc::clone(&self.dispatcher);
        let stop = Arc::clone(&self.stop);
        let dial_timeout = self.timeouts.dial;
        let tick = self.tick;

        let watcher = thread::spawn(move || {
            while !stop.load(Ordering::SeqCst) {
                poll_completion(&shared, &*dispatcher, &*sound, dial_timeout, Instant::now());
                spin_sleep::sleep(tick);
            }
        });
        let line = thread::spawn(move || self.run());

        vec![line, watcher]
    }

    fn run(mut self) {
        while !self.stop.load(Ordering::SeqCst) {
            self.tick_once();
            spin_sleep::sleep(self.tick);
        }
        // Leave the line silent on the way out.
        self.sound.stop_all();
    }

    fn tick_once(&mut self) {
        if let Some(hook) = self.sensor.poll_hook() {
            let off_hook = hook == HookState::OffHook;
            info!("Hook switch is {}", if off_hook { "off-hook" } else { "on-hook" });
            self.cache.update(&*self.reporter, SENSOR_HOOK_SWITCH, off_hook);
        }

        if self.sensor.hook_state() == HookState::OnHook {
            let mut shared = self.shared.lock().unwrap();
            transition(&mut shared, LineState::OnHook, &*self.sound);
            return
        }

        {
            let mut shared = self.shared.lock().unwrap();
            let now = Instant::now();
            match shared.state() {
                LineState::OnHook => {
                    transition(&mut shared, LineState::OffHookDialTone, &*self.sound);
                },
                LineState::OffHookDialTone
                    if now.saturating_duration_since(shared.dial_tone_start) > self.timeouts.dial_tone =>
                {
                    transition(&mut shared, LineState::OffHookBusy, &*self.sound);
                },
                LineState::OffHookBusy
                    if now.saturating_duration_since(shared.busy_start) > self.timeouts.busy_signal =>
                {
                    transition(&mut shared, LineState::OffHookIdleSilent, &*self.sound);
                },
                _ => {}
            }

            if shared.dial_timeout_occurred() {
                return
            }
        }

        // Digit-capture window: the dial has left its resting position.
        if self.sensor.dial_in_progress() {
            {
                let mut shared = self.shared.lock().unwrap();
                transition(&mut shared, LineState::OffHookDialing, &*self.sound);
            }
            if let Some(digit) = self.sensor.count_pulses(&self.stop) {
                debug!("Dialed digit: {}", digit);
                let mut shared = self.shared.lock().unwrap();
                shared.session.on_digit(digit);
            }
            // Let the dial settle before the next window.
            spin_sleep::sleep(self.tick * 2);
        }
    }
}
