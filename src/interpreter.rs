//! # interpreter
//!
//! The CHIP-8 machine as programs see it:
//!  - 4k of byte-addressable memory; font at 0x050, program at 0x200
//!  - sixteen 8-bit registers V0..VF; VF doubles as the carry/borrow/collision
//!    flag and is always written last by the instructions that set it
//!  - a 12-bit index register I
//!  - a program counter, advanced past each instruction as it is fetched
//!  - a 16-level call stack of return addresses
//!  - delay and sound timers, counted down by their own clock threads
//!
//! The interpreter is the only thing that touches registers, memory, I, the
//! PC and the stack, so none of those need locking. Display and input are
//! borrowed from the host; the sound device is handed over to the sound
//! timer's clock once the main loop starts.
use crate::config::Config;
use crate::display::{Display, SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::error::{Chip8Error, Result};
use crate::input::Input;
use crate::instruction::{Fields, Opcode};
use crate::memory::{
    font_sprite_addr, Chip8Memory, MemoryMap, CHIP8_ADDR_MASK, CHIP8_PROGRAM_ADDR,
};
use crate::sound::Sound;
use crate::timer::{spawn_delay_clock, spawn_sound_clock, Timers};
use log::{info, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use spin_sleep::LoopHelper;
use std::io;

/// deepest subroutine nesting allowed
pub const STACK_DEPTH: usize = 16;

const VF: usize = 0xf;

pub struct Chip8Interpreter<'a> {
    memory: Chip8Memory,
    display: &'a mut dyn Display,
    input: &'a mut dyn Input,
    sound: Option<Box<dyn Sound + Send>>,
    timers: Timers,
    v: [u8; 16],
    i: u16,
    program_counter: u16,
    stack: [u16; STACK_DEPTH],
    stack_pointer: usize,
    rng: StdRng,
    config: Config,
}

impl<'a> Chip8Interpreter<'a> {
    pub fn new(
        display: &'a mut dyn Display,
        input: &'a mut dyn Input,
        sound: Box<dyn Sound + Send>,
        config: Config,
    ) -> Chip8Interpreter<'a> {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Chip8Interpreter {
            memory: Chip8Memory::new(),
            display,
            input,
            sound: Some(sound),
            timers: Timers::new(),
            v: [0; 16],
            i: 0,
            program_counter: CHIP8_PROGRAM_ADDR,
            stack: [0; STACK_DEPTH],
            stack_pointer: 0,
            rng,
            config,
        }
    }

    /// load a chip8 program; returns its length
    pub fn load_program(&mut self, reader: &mut impl io::Read) -> Result<usize> {
        let len = self.memory.load_program(reader)?;
        info!("loaded {} byte program", len);
        Ok(len)
    }

    /// the delay and sound timers, shared with their clocks
    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    /// Start the timer clocks, then fetch/decode/execute at the configured
    /// rate until something fatal happens. Never returns otherwise.
    pub fn main_loop(&mut self) -> Result<()> {
        self.config.validate()?;
        self.start_clocks()?;
        info!(
            "running at {} instructions per second",
            self.config.instructions_per_second
        );
        let mut loop_helper =
            LoopHelper::builder().build_with_target_rate(self.config.instructions_per_second);
        loop {
            loop_helper.loop_start();
            self.cycle()?;
            loop_helper.loop_sleep();
        }
    }

    /// spawn the delay and sound clocks; only the first call does anything
    fn start_clocks(&mut self) -> Result<()> {
        if let Some(sound) = self.sound.take() {
            spawn_delay_clock(self.timers.delay.clone())?;
            spawn_sound_clock(self.timers.sound.clone(), sound)?;
        }
        Ok(())
    }

    /// one fetch/decode/execute cycle
    pub fn cycle(&mut self) -> Result<()> {
        let pc = self.program_counter;
        let fields = Fields::from_word(self.memory.get_word(pc));
        self.program_counter = pc.wrapping_add(2) & CHIP8_ADDR_MASK;

        let op = Opcode::decode(fields, pc)?;
        trace!("{:03x}: {:04x} {:?}", pc, fields.word(), op);
        self.execute(op, pc)
    }

    fn execute(&mut self, op: Opcode, pc: u16) -> Result<()> {
        match op {
            Opcode::ClearScreen => self.display.clear(),
            Opcode::Return => {
                if self.stack_pointer == 0 {
                    return Err(Chip8Error::StackUnderflow { pc });
                }
                self.stack_pointer -= 1;
                self.program_counter = self.stack[self.stack_pointer];
            }
            Opcode::Jump(nnn) => self.program_counter = nnn,
            Opcode::Call(nnn) => {
                if self.stack_pointer == STACK_DEPTH {
                    return Err(Chip8Error::StackOverflow { pc });
                }
                self.stack[self.stack_pointer] = self.program_counter;
                self.stack_pointer += 1;
                self.program_counter = nnn;
            }
            Opcode::SkipIfEqual { x, nn } => self.skip_if(self.vx(x) == nn),
            Opcode::SkipIfNotEqual { x, nn } => self.skip_if(self.vx(x) != nn),
            Opcode::SkipIfRegistersEqual { x, y } => self.skip_if(self.vx(x) == self.vx(y)),
            Opcode::SkipIfRegistersNotEqual { x, y } => self.skip_if(self.vx(x) != self.vx(y)),
            Opcode::Load { x, nn } => self.v[x as usize] = nn,
            Opcode::Add { x, nn } => self.v[x as usize] = self.vx(x).wrapping_add(nn),
            Opcode::Copy { x, y } => self.v[x as usize] = self.vx(y),
            Opcode::Or { x, y } => self.v[x as usize] |= self.vx(y),
            Opcode::And { x, y } => self.v[x as usize] &= self.vx(y),
            Opcode::Xor { x, y } => self.v[x as usize] ^= self.vx(y),
            Opcode::AddWithCarry { x, y } => {
                let (sum, carry) = self.vx(x).overflowing_add(self.vx(y));
                self.set_with_flag(x, sum, carry);
            }
            Opcode::Subtract { x, y } => {
                let (vx, vy) = (self.vx(x), self.vx(y));
                self.set_with_flag(x, vx.wrapping_sub(vy), vx > vy);
            }
            Opcode::SubtractReversed { x, y } => {
                let (vx, vy) = (self.vx(x), self.vx(y));
                self.set_with_flag(x, vy.wrapping_sub(vx), vy > vx);
            }
            // shifts take their operand from VY
            Opcode::ShiftRight { x, y } => {
                let vy = self.vx(y);
                self.set_with_flag(x, vy >> 1, vy & 0x01 != 0);
            }
            Opcode::ShiftLeft { x, y } => {
                let vy = self.vx(y);
                self.set_with_flag(x, vy << 1, vy & 0x80 != 0);
            }
            Opcode::LoadIndex(nnn) => self.i = nnn,
            Opcode::JumpWithOffset(nnn) => {
                self.program_counter = nnn.wrapping_add(self.v[0] as u16) & CHIP8_ADDR_MASK;
            }
            Opcode::Random { x, nn } => self.v[x as usize] = self.rng.gen::<u8>() & nn,
            Opcode::Draw { x, y, n } => self.draw_sprite(x, y, n),
            Opcode::SkipIfKeyHeld { x } => self.skip_if(self.input.is_key_held(self.vx(x) & 0x0f)),
            Opcode::SkipIfKeyNotHeld { x } => {
                self.skip_if(!self.input.is_key_held(self.vx(x) & 0x0f))
            }
            Opcode::ReadDelayTimer { x } => self.v[x as usize] = self.timers.delay.get(),
            Opcode::WaitForKey { x } => self.v[x as usize] = self.input.wait_for_key()? & 0x0f,
            Opcode::SetDelayTimer { x } => self.timers.delay.set(self.vx(x)),
            Opcode::SetSoundTimer { x } => self.timers.sound.set(self.vx(x)),
            Opcode::AddToIndex { x } => {
                let sum = self.i + self.vx(x) as u16;
                self.i = sum & CHIP8_ADDR_MASK;
                self.v[VF] = (sum > CHIP8_ADDR_MASK) as u8;
            }
            Opcode::FontCharacter { x } => self.i = font_sprite_addr(self.vx(x)),
            Opcode::BinaryCodedDecimal { x } => {
                let vx = self.vx(x);
                self.memory.write(&[vx / 100, vx / 10 % 10, vx % 10], self.i);
            }
            Opcode::StoreRegisters { x } => {
                for r in 0..=x {
                    self.memory
                        .set_byte(self.i.wrapping_add(r as u16), self.v[r as usize]);
                }
            }
            Opcode::LoadRegisters { x } => {
                for r in 0..=x {
                    self.v[r as usize] = self.memory.get_byte(self.i.wrapping_add(r as u16));
                }
            }
        }
        Ok(())
    }

    fn vx(&self, x: u8) -> u8 {
        self.v[x as usize]
    }

    fn skip_if(&mut self, condition: bool) {
        if condition {
            self.program_counter = self.program_counter.wrapping_add(2) & CHIP8_ADDR_MASK;
        }
    }

    /// write the result first and the flag last, so the flag wins when x is F
    fn set_with_flag(&mut self, x: u8, value: u8, flag: bool) {
        self.v[x as usize] = value;
        self.v[VF] = flag as u8;
    }

    /// XOR an n-row sprite from memory[I] onto the display. The origin wraps,
    /// the sprite itself is clipped at the edges. VF is 1 if any lit pixel
    /// was turned off.
    fn draw_sprite(&mut self, x: u8, y: u8, n: u8) {
        let origin_col = self.vx(x) as usize % SCREEN_WIDTH;
        let origin_row = self.vx(y) as usize % SCREEN_HEIGHT;
        self.v[VF] = 0;
        for line in 0..n {
            let row = origin_row + line as usize;
            if row >= SCREEN_HEIGHT {
                break;
            }
            let sprite = self.memory.get_byte(self.i.wrapping_add(line as u16));
            for bit in 0..8 {
                let col = origin_col + bit;
                if col >= SCREEN_WIDTH {
                    break;
                }
                if sprite & (0x80 >> bit) == 0 {
                    continue;
                }
                if self.display.is_pixel_set(col, row) {
                    self.display.set_pixel(col, row, false);
                    self.v[VF] = 1;
                } else {
                    self.display.set_pixel(col, row, true);
                }
            }
        }
    }
}
