//! # instruction
//!
//! CHIP-8 instructions are two big-endian bytes. The leading nibble picks the
//! group; the other nibbles carry operands, and for the 0, 8, E and F groups
//! also pick the operation within the group:
//!
//! ```text
//!  [i x y n]   i: instruction group   x, y: register selectors
//!  [_ _ n n]   nn: immediate byte
//!  [_ n n n]   nnn: 12-bit address
//! ```
use crate::error::{Chip8Error, Result};

/// the raw operand fields of one instruction word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fields {
    pub instr: u8,
    pub x: u8,
    pub y: u8,
    pub n: u8,
    pub nn: u8,
    pub nnn: u16,
}

impl Fields {
    pub fn from_bytes(b0: u8, b1: u8) -> Self {
        let x = b0 & 0x0f;
        Fields {
            instr: b0 >> 4,
            x,
            y: b1 >> 4,
            n: b1 & 0x0f,
            nn: b1,
            nnn: (x as u16) << 8 | b1 as u16,
        }
    }

    pub fn from_word(word: u16) -> Self {
        Self::from_bytes((word >> 8) as u8, word as u8)
    }

    pub fn word(&self) -> u16 {
        (self.instr as u16) << 12 | self.nnn
    }
}

/// Every instruction the interpreter understands. Register operands are the
/// 4-bit selectors, so they always index V0..VF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// 00E0
    ClearScreen,
    /// 00EE
    Return,
    /// 1NNN
    Jump(u16),
    /// 2NNN
    Call(u16),
    /// 3XNN
    SkipIfEqual { x: u8, nn: u8 },
    /// 4XNN
    SkipIfNotEqual { x: u8, nn: u8 },
    /// 5XY0
    SkipIfRegistersEqual { x: u8, y: u8 },
    /// 6XNN
    Load { x: u8, nn: u8 },
    /// 7XNN
    Add { x: u8, nn: u8 },
    /// 8XY0
    Copy { x: u8, y: u8 },
    /// 8XY1
    Or { x: u8, y: u8 },
    /// 8XY2
    And { x: u8, y: u8 },
    /// 8XY3
    Xor { x: u8, y: u8 },
    /// 8XY4
    AddWithCarry { x: u8, y: u8 },
    /// 8XY5
    Subtract { x: u8, y: u8 },
    /// 8XY6
    ShiftRight { x: u8, y: u8 },
    /// 8XY7
    SubtractReversed { x: u8, y: u8 },
    /// 8XYE
    ShiftLeft { x: u8, y: u8 },
    /// 9XY0
    SkipIfRegistersNotEqual { x: u8, y: u8 },
    /// ANNN
    LoadIndex(u16),
    /// BNNN
    JumpWithOffset(u16),
    /// CXNN
    Random { x: u8, nn: u8 },
    /// DXYN
    Draw { x: u8, y: u8, n: u8 },
    /// EX9E
    SkipIfKeyHeld { x: u8 },
    /// EXA1
    SkipIfKeyNotHeld { x: u8 },
    /// FX07
    ReadDelayTimer { x: u8 },
    /// FX0A
    WaitForKey { x: u8 },
    /// FX15
    SetDelayTimer { x: u8 },
    /// FX18
    SetSoundTimer { x: u8 },
    /// FX1E
    AddToIndex { x: u8 },
    /// FX29
    FontCharacter { x: u8 },
    /// FX33
    BinaryCodedDecimal { x: u8 },
    /// FX55
    StoreRegisters { x: u8 },
    /// FX65
    LoadRegisters { x: u8 },
}

impl Opcode {
    /// decode one instruction; `pc` is only used to report failures
    pub fn decode(f: Fields, pc: u16) -> Result<Opcode> {
        let (x, y, n, nn, nnn) = (f.x, f.y, f.n, f.nn, f.nnn);
        let op = match (f.instr, x, y, n) {
            (0x0, 0x0, 0xe, 0x0) => Opcode::ClearScreen,
            (0x0, 0x0, 0xe, 0xe) => Opcode::Return,
            (0x1, ..) => Opcode::Jump(nnn),
            (0x2, ..) => Opcode::Call(nnn),
            (0x3, ..) => Opcode::SkipIfEqual { x, nn },
            (0x4, ..) => Opcode::SkipIfNotEqual { x, nn },
            (0x5, .., 0x0) => Opcode::SkipIfRegistersEqual { x, y },
            (0x6, ..) => Opcode::Load { x, nn },
            (0x7, ..) => Opcode::Add { x, nn },
            (0x8, .., 0x0) => Opcode::Copy { x, y },
            (0x8, .., 0x1) => Opcode::Or { x, y },
            (0x8, .., 0x2) => Opcode::And { x, y },
            (0x8, .., 0x3) => Opcode::Xor { x, y },
            (0x8, .., 0x4) => Opcode::AddWithCarry { x, y },
            (0x8, .., 0x5) => Opcode::Subtract { x, y },
            (0x8, .., 0x6) => Opcode::ShiftRight { x, y },
            (0x8, .., 0x7) => Opcode::SubtractReversed { x, y },
            (0x8, .., 0xe) => Opcode::ShiftLeft { x, y },
            (0x9, .., 0x0) => Opcode::SkipIfRegistersNotEqual { x, y },
            (0xa, ..) => Opcode::LoadIndex(nnn),
            (0xb, ..) => Opcode::JumpWithOffset(nnn),
            (0xc, ..) => Opcode::Random { x, nn },
            (0xd, ..) => Opcode::Draw { x, y, n },
            (0xe, _, 0x9, 0xe) => Opcode::SkipIfKeyHeld { x },
            (0xe, _, 0xa, 0x1) => Opcode::SkipIfKeyNotHeld { x },
            (0xf, _, 0x0, 0x7) => Opcode::ReadDelayTimer { x },
            (0xf, _, 0x0, 0xa) => Opcode::WaitForKey { x },
            (0xf, _, 0x1, 0x5) => Opcode::SetDelayTimer { x },
            (0xf, _, 0x1, 0x8) => Opcode::SetSoundTimer { x },
            (0xf, _, 0x1, 0xe) => Opcode::AddToIndex { x },
            (0xf, _, 0x2, 0x9) => Opcode::FontCharacter { x },
            (0xf, _, 0x3, 0x3) => Opcode::BinaryCodedDecimal { x },
            (0xf, _, 0x5, 0x5) => Opcode::StoreRegisters { x },
            (0xf, _, 0x6, 0x5) => Opcode::LoadRegisters { x },
            _ => {
                return Err(Chip8Error::UnknownOpcode {
                    opcode: f.word(),
                    pc,
                })
            }
        };
        Ok(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(word: u16) -> Result<Opcode> {
        Opcode::decode(Fields::from_word(word), 0x200)
    }

    #[test]
    fn test_fields() {
        let f = Fields::from_bytes(0xab, 0xcd);
        assert_eq!(f.instr, 0xa);
        assert_eq!(f.x, 0xb);
        assert_eq!(f.y, 0xc);
        assert_eq!(f.n, 0xd);
        assert_eq!(f.nn, 0xcd);
        assert_eq!(f.nnn, 0xbcd);
        assert_eq!(f.word(), 0xabcd);
    }

    #[test]
    fn test_nnn_is_x_and_nn() {
        for word in [0x0000u16, 0x1234, 0x2fff, 0x8ab4, 0xd01f, 0xf165] {
            let f = Fields::from_word(word);
            assert_eq!(f.nnn, (f.x as u16) << 8 | f.nn as u16);
            assert_eq!(f.instr, (word >> 12) as u8);
        }
    }

    #[test]
    fn test_decode_fixed() -> Result<()> {
        assert_eq!(decode(0x00e0)?, Opcode::ClearScreen);
        assert_eq!(decode(0x00ee)?, Opcode::Return);
        Ok(())
    }

    #[test]
    fn test_decode_addresses() -> Result<()> {
        assert_eq!(decode(0x1abc)?, Opcode::Jump(0xabc));
        assert_eq!(decode(0x2abc)?, Opcode::Call(0xabc));
        assert_eq!(decode(0xa123)?, Opcode::LoadIndex(0x123));
        assert_eq!(decode(0xb300)?, Opcode::JumpWithOffset(0x300));
        Ok(())
    }

    #[test]
    fn test_decode_alu_group() -> Result<()> {
        assert_eq!(decode(0x8120)?, Opcode::Copy { x: 1, y: 2 });
        assert_eq!(decode(0x8124)?, Opcode::AddWithCarry { x: 1, y: 2 });
        assert_eq!(decode(0x8126)?, Opcode::ShiftRight { x: 1, y: 2 });
        assert_eq!(decode(0x812e)?, Opcode::ShiftLeft { x: 1, y: 2 });
        Ok(())
    }

    #[test]
    fn test_decode_f_group() -> Result<()> {
        assert_eq!(decode(0xf30a)?, Opcode::WaitForKey { x: 3 });
        assert_eq!(decode(0xf333)?, Opcode::BinaryCodedDecimal { x: 3 });
        assert_eq!(decode(0xfe65)?, Opcode::LoadRegisters { x: 0xe });
        Ok(())
    }

    #[test]
    fn test_decode_draw() -> Result<()> {
        assert_eq!(decode(0xd01f)?, Opcode::Draw { x: 0, y: 1, n: 0xf });
        Ok(())
    }

    #[test]
    fn test_decode_unknown() {
        // machine code routines, bad ALU ops and bad sub-codes are all rejected
        for word in [0x0123u16, 0x00e1, 0x5121, 0x8128, 0x9121, 0xe19f, 0xf100] {
            match decode(word) {
                Err(Chip8Error::UnknownOpcode { opcode, pc }) => {
                    assert_eq!(opcode, word);
                    assert_eq!(pc, 0x200);
                }
                other => panic!("{:04x} decoded as {:?}", word, other),
            }
        }
    }
}
