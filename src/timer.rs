//! # timer
//!
//! The delay and sound timers count down at 60Hz regardless of how fast the
//! interpreter runs, so each gets its own clock thread. Each counter has its
//! own lock, shared between its clock and the interpreter; the two are never
//! held together.
use crate::sound::Sound;
use log::{debug, warn};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// 1000/60 ms
pub const TIMER_TICK: Duration = Duration::from_nanos(1_000_000_000 / 60);

/// an 8-bit counter that only ever counts down to zero
#[derive(Debug, Default)]
pub struct CountdownTimer {
    value: Mutex<u8>,
}

impl CountdownTimer {
    pub fn new() -> Self {
        CountdownTimer {
            value: Mutex::new(0),
        }
    }

    pub fn get(&self) -> u8 {
        *self.lock()
    }

    pub fn set(&self, value: u8) {
        *self.lock() = value;
    }

    /// count down once if still running; true if it was running
    pub fn tick(&self) -> bool {
        let mut value = self.lock();
        if *value > 0 {
            *value -= 1;
            true
        } else {
            false
        }
    }

    // a u8 can't be left half-written, so a poisoned lock is still good
    fn lock(&self) -> MutexGuard<'_, u8> {
        self.value.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// the pair of timers the interpreter exposes through FX07/FX15/FX18
#[derive(Debug, Clone, Default)]
pub struct Timers {
    pub delay: Arc<CountdownTimer>,
    pub sound: Arc<CountdownTimer>,
}

impl Timers {
    pub fn new() -> Self {
        Timers {
            delay: Arc::new(CountdownTimer::new()),
            sound: Arc::new(CountdownTimer::new()),
        }
    }
}

/// run `on_tick` every TIMER_TICK, forever, on a named thread
fn spawn_clock<F>(name: &str, mut on_tick: F) -> io::Result<JoinHandle<()>>
where
    F: FnMut() + Send + 'static,
{
    debug!("starting {} clock", name);
    thread::Builder::new().name(name.to_string()).spawn(move || {
        // sleep to deadlines rather than for fixed spans so ticks don't drift
        let mut next = Instant::now();
        loop {
            next += TIMER_TICK;
            spin_sleep::sleep(next.saturating_duration_since(Instant::now()));
            on_tick();
        }
    })
}

/// counts the delay timer down to zero
pub fn spawn_delay_clock(timer: Arc<CountdownTimer>) -> io::Result<JoinHandle<()>> {
    spawn_clock("delay-timer", move || {
        timer.tick();
    })
}

/// counts the sound timer down to zero, holding the tone on while it runs
pub fn spawn_sound_clock(
    timer: Arc<CountdownTimer>,
    mut sound: Box<dyn Sound + Send>,
) -> io::Result<JoinHandle<()>> {
    let mut reported = false;
    spawn_clock("sound-timer", move || {
        let result = if timer.tick() {
            sound.play()
        } else {
            sound.stop()
        };
        match result {
            Ok(()) => reported = false,
            Err(e) if !reported => {
                warn!("audio device failed: {}", e);
                reported = true;
            }
            Err(_) => (),
        }
    })
}
