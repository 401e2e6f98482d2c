use beep::beep;
use std::error::Error;

/// Continuous tone output driven by the sound timer. Both calls are
/// idempotent: the clock calls them on every tick.
pub trait Sound {
    fn play(&mut self) -> Result<(), Box<dyn Error>>;
    fn stop(&mut self) -> Result<(), Box<dyn Error>>;
}

const SIMPLEBEEP_PITCH: u16 = 2093; // C

/// PC speaker tone through the beep crate
pub struct SimpleBeep {
    is_beeping: bool,
}

impl SimpleBeep {
    pub fn new() -> Self {
        SimpleBeep { is_beeping: false }
    }
}

impl Default for SimpleBeep {
    fn default() -> Self {
        Self::new()
    }
}

impl Sound for SimpleBeep {
    fn play(&mut self) -> Result<(), Box<dyn Error>> {
        if !self.is_beeping {
            beep(SIMPLEBEEP_PITCH)?;
            self.is_beeping = true;
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Box<dyn Error>> {
        if self.is_beeping {
            beep(0)?;
            self.is_beeping = false;
        }
        Ok(())
    }
}

/// no audio at all
pub struct Mute;

impl Mute {
    pub fn new() -> Self {
        Mute
    }
}

impl Default for Mute {
    fn default() -> Self {
        Self::new()
    }
}

impl Sound for Mute {
    fn play(&mut self) -> Result<(), Box<dyn Error>> {
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Box<dyn Error>> {
        Ok(())
    }
}
