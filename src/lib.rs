//! A CHIP-8 virtual machine.
//!
//! ## Design
//!
//! * the interpreter owns all machine state and is its only writer
//! * instructions are decoded into an `Opcode` before they run; anything
//!   undecodable stops the machine with an error naming the word and address
//! * fatal conditions come back as `Chip8Error`s, the host decides what to do
//! * delay and sound timers tick at 60Hz on their own threads, each behind its
//!   own lock, so they keep time however fast instructions run
//! * display, input and audio are traits, so a variety of screens, keyboards
//!   and speakers can be plugged in; the binary uses a TUI canvas, crossterm
//!   key events and the beep crate
//!
//! Model
//!
//! host
//!  |-- framebuffer, keypad, sound device, config
//!  |-- interpreter(framebuffer, keypad, sound, config)   -- own thread
//!  |    |-- memory (font, program)
//!  |    |-- delay clock                                  -- own thread
//!  |    `-- sound clock(sound)                           -- own thread
//!  `-- render loop at 60Hz
//!       |-- keyboard events -> keypad
//!       `-- framebuffer snapshot -> terminal
pub mod config;
pub mod display;
pub mod error;
pub mod input;
pub mod instruction;
pub mod interpreter;
pub mod memory;
pub mod sound;
pub mod timer;

pub use config::Config;
pub use error::{Chip8Error, Result};
pub use interpreter::Chip8Interpreter;
