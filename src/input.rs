use crate::error::{Chip8Error, Result};
use crossterm::event::{poll, read, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal;
use log::debug;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// map of keys on the left-hand side of a qwerty keyboard to the COSMAC hex
/// keypad, laid out the same way:
///
/// ```text
///  1 2 3 4      1 2 3 C
///  q w e r  =>  4 5 6 D
///  a s d f      7 8 9 E
///  z x c v      A 0 B F
/// ```
const CHIP8_CONVENTIONAL_KEYMAP: [(char, u8); 16] = [
    ('x', 0x00), // x
    ('1', 0x01), // 1
    ('2', 0x02), // 2
    ('3', 0x03), // 3
    ('q', 0x04), // q
    ('w', 0x05), // w
    ('e', 0x06), // e
    ('a', 0x07), // a
    ('s', 0x08), // s
    ('d', 0x09), // d
    ('z', 0x0a), // z
    ('c', 0x0b), // c
    ('4', 0x0c), // 4
    ('r', 0x0d), // r
    ('f', 0x0e), // f
    ('v', 0x0f), // v
];

/// terminals report presses and auto-repeats but never releases, so a key
/// counts as held for this long after its latest event. Long enough to
/// bridge the usual gap before a held key starts repeating.
pub const KEY_HOLD_DURATION: Duration = Duration::from_millis(600);

/// presses remembered for key waits
const RECENT_PRESSES: usize = 16;

/// reads the hex keypad
pub trait Input {
    /// is key `key & 0xf` held right now
    fn is_key_held(&self, key: u8) -> bool;

    /// block until the next key press and return its code
    fn wait_for_key(&mut self) -> Result<u8>;
}

struct KeyState {
    pressed_at: [Option<Instant>; 16],
    presses: u64,
    /// (press count, key) of the latest presses, oldest first
    recent: VecDeque<(u64, u8)>,
    cancelled: bool,
}

impl KeyState {
    /// the first key pressed after the `seen`th press
    fn first_since(&self, seen: u64) -> Option<u8> {
        self.recent
            .iter()
            .find(|(count, _)| *count > seen)
            .map(|(_, key)| *key)
    }
}

/// Keypad state shared between whatever feeds key events in and the
/// interpreter. Clones share the same state.
#[derive(Clone)]
pub struct Keypad {
    shared: Arc<(Mutex<KeyState>, Condvar)>,
    hold: Duration,
}

impl Keypad {
    pub fn new() -> Self {
        Self::with_hold(KEY_HOLD_DURATION)
    }

    pub fn with_hold(hold: Duration) -> Self {
        let state = KeyState {
            pressed_at: [None; 16],
            presses: 0,
            recent: VecDeque::with_capacity(RECENT_PRESSES),
            cancelled: false,
        };
        Keypad {
            shared: Arc::new((Mutex::new(state), Condvar::new())),
            hold,
        }
    }

    /// record a press (or auto-repeat) of `key & 0xf`
    pub fn press(&self, key: u8) {
        let key = key & 0x0f;
        let mut state = self.lock();
        state.pressed_at[key as usize] = Some(Instant::now());
        state.presses += 1;
        let count = state.presses;
        if state.recent.len() == RECENT_PRESSES {
            state.recent.pop_front();
        }
        state.recent.push_back((count, key));
        self.shared.1.notify_all();
    }

    /// give up on any current and future key waits
    pub fn cancel(&self) {
        self.lock().cancelled = true;
        self.shared.1.notify_all();
    }

    fn lock(&self) -> MutexGuard<'_, KeyState> {
        self.shared.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Keypad {
    fn default() -> Self {
        Self::new()
    }
}

impl Input for Keypad {
    fn is_key_held(&self, key: u8) -> bool {
        self.lock().pressed_at[(key & 0x0f) as usize]
            .map_or(false, |at| at.elapsed() < self.hold)
    }

    fn wait_for_key(&mut self) -> Result<u8> {
        let mut state = self.lock();
        let seen = state.presses;
        debug!("waiting for a key press");
        loop {
            if state.cancelled {
                return Err(Chip8Error::Interrupted);
            }
            if let Some(key) = state.first_since(seen) {
                return Ok(key);
            }
            state = self
                .shared
                .1
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// feeds a Keypad from terminal key events, using crossterm. The terminal
/// is in raw mode for as long as this exists.
pub struct TerminalKeyboard {
    keypad: Keypad,
    keymap: HashMap<char, u8>,
}

impl TerminalKeyboard {
    pub fn new(keypad: Keypad) -> Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(TerminalKeyboard {
            keypad,
            keymap: HashMap::from(CHIP8_CONVENTIONAL_KEYMAP),
        })
    }

    /// drain pending terminal events into the keypad without blocking;
    /// returns true once the user has asked to quit
    pub fn read_events(&mut self) -> io::Result<bool> {
        while poll(Duration::from_millis(0))? {
            if let Event::Key(evt) = read()? {
                if self.handle_key(evt) {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn handle_key(&self, evt: KeyEvent) -> bool {
        match evt.code {
            KeyCode::Esc => true,
            KeyCode::Char('c') if evt.modifiers.contains(KeyModifiers::CONTROL) => true,
            KeyCode::Char(key) => {
                match self.keymap.get(&key.to_ascii_lowercase()) {
                    Some(mapped_key) => self.keypad.press(*mapped_key),
                    None => debug!("can't map {:?} to a COSMAC key", key),
                }
                false
            }
            _ => false,
        }
    }
}

impl Drop for TerminalKeyboard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_press_is_held() {
        let keypad = Keypad::new();
        keypad.press(0xa);
        assert!(keypad.is_key_held(0xa));
        assert!(!keypad.is_key_held(0xb));
        // only the low nibble selects the key
        assert!(keypad.is_key_held(0x1a));
    }

    #[test]
    fn test_default_hold_bridges_repeat_delay() {
        let keypad = Keypad::new();
        keypad.press(3);
        // a typical delay before a held key starts auto-repeating
        thread::sleep(Duration::from_millis(400));
        assert!(keypad.is_key_held(3));
    }

    #[test]
    fn test_first_press_after_wait_wins() {
        let keypad = Keypad::new();
        keypad.press(1);
        let seen = keypad.lock().presses;
        // two presses land before a waiter gets to look
        keypad.press(3);
        keypad.press(5);
        assert_eq!(keypad.lock().first_since(seen), Some(3));
        assert_eq!(keypad.lock().first_since(seen + 2), None);
    }

    #[test]
    fn test_recent_presses_are_bounded() {
        let keypad = Keypad::new();
        for key in 0..40u8 {
            keypad.press(key);
        }
        let state = keypad.lock();
        assert_eq!(state.recent.len(), RECENT_PRESSES);
        assert_eq!(state.first_since(0), Some((40 - RECENT_PRESSES as u8) & 0x0f));
    }

    #[test]
    fn test_hold_expires() {
        let keypad = Keypad::with_hold(Duration::from_millis(10));
        keypad.press(3);
        thread::sleep(Duration::from_millis(50));
        assert!(!keypad.is_key_held(3));
    }

    #[test]
    fn test_wait_for_next_press() -> Result<()> {
        let mut keypad = Keypad::new();
        // a key pressed before the wait doesn't count
        keypad.press(1);
        let feeder = keypad.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            feeder.press(0xe);
        });
        assert_eq!(keypad.wait_for_key()?, 0xe);
        handle.join().unwrap();
        Ok(())
    }

    #[test]
    fn test_cancel_wakes_waiter() {
        let mut keypad = Keypad::new();
        let canceller = keypad.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            canceller.cancel();
        });
        assert!(matches!(keypad.wait_for_key(), Err(Chip8Error::Interrupted)));
        handle.join().unwrap();
    }

    #[test]
    fn test_keymap_covers_keypad() {
        let keymap: HashMap<char, u8> = HashMap::from(CHIP8_CONVENTIONAL_KEYMAP);
        let mut codes: Vec<u8> = keymap.values().copied().collect();
        codes.sort_unstable();
        assert_eq!(codes, (0..16).collect::<Vec<u8>>());
    }
}
