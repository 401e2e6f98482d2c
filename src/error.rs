use std::io;
use thiserror::Error;

/// Everything that can stop the interpreter. None of these are recoverable
/// from inside the engine; the host decides what to do with them.
#[derive(Debug, Error)]
pub enum Chip8Error {
    #[error("unknown instruction {opcode:#06x} at {pc:#05x}")]
    UnknownOpcode { opcode: u16, pc: u16 },

    #[error("stack overflow: call at {pc:#05x} exceeds 16 levels")]
    StackOverflow { pc: u16 },

    #[error("stack underflow: return at {pc:#05x} with an empty call stack")]
    StackUnderflow { pc: u16 },

    #[error("program is too large ({size} bytes), at most {max} bytes fit")]
    ProgramTooLarge { size: usize, max: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("interrupted while waiting for a key")]
    Interrupted,

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Chip8Error>;
