use crate::error::{Chip8Error, Result};
use log::debug;
use std::io;

// NB. addresses are u16 as per the chip-8; lengths are usize to stop endless casting

/// how much RAM we have
pub const CHIP8_RAM_SIZE_BYTES: usize = 4096;

/// every address is masked into the 12 bits the machine can see
pub const CHIP8_ADDR_MASK: u16 = 0x0fff;

/// where the program is loaded
pub const CHIP8_PROGRAM_ADDR: u16 = 0x0200;

/// largest program image that fits above the interpreter area
pub const CHIP8_MAX_PROGRAM_BYTES: usize = CHIP8_RAM_SIZE_BYTES - CHIP8_PROGRAM_ADDR as usize;

/// where the hex digit sprites live
pub const CHIP8_FONT_ADDR: u16 = 0x050;

/// bytes per hex digit sprite
pub const CHIP8_FONT_SPRITE_BYTES: u16 = 5;

/// Byte-addressable memory. Addresses beyond 0xfff wrap back to 0x000, so
/// nothing a program does can reach outside the 4k.
pub trait MemoryMap {
    /// read one byte
    fn get_byte(&self, addr: u16) -> u8;

    /// write one byte
    fn set_byte(&mut self, addr: u16, value: u8);

    /// get a big-endian two-byte word (instructions)
    fn get_word(&self, addr: u16) -> u16 {
        ((self.get_byte(addr) as u16) << 8) | (self.get_byte(addr.wrapping_add(1)) as u16)
    }

    /// write a chunk of bytes starting at addr
    fn write(&mut self, data: &[u8], addr: u16) {
        for (offset, byte) in data.iter().enumerate() {
            self.set_byte(addr.wrapping_add(offset as u16), *byte);
        }
    }

    /// read len bytes starting at addr
    fn read(&self, addr: u16, len: usize) -> Vec<u8> {
        (0..len)
            .map(|offset| self.get_byte(addr.wrapping_add(offset as u16)))
            .collect()
    }
}

/// Defines the CHIP-8 memory map used here:
///   0x0000-0x004f  unused
///   0x0050-0x009f  hex digit font
///   0x00a0-0x01ff  unused
///   0x0200-0x0fff  program
///
/// the stack and the display live outside of addressable memory
pub struct Chip8Memory {
    bytes: Box<[u8; CHIP8_RAM_SIZE_BYTES]>,
}

impl MemoryMap for Chip8Memory {
    fn get_byte(&self, addr: u16) -> u8 {
        self.bytes[(addr & CHIP8_ADDR_MASK) as usize]
    }

    fn set_byte(&mut self, addr: u16, value: u8) {
        self.bytes[(addr & CHIP8_ADDR_MASK) as usize] = value;
    }
}

impl Chip8Memory {
    /// zeroed memory with the font baked in
    pub fn new() -> Self {
        let mut mm = Chip8Memory {
            bytes: Box::new([0u8; CHIP8_RAM_SIZE_BYTES]),
        };
        mm.write(&CHIP8_FONT, CHIP8_FONT_ADDR);
        mm
    }

    /// load a CHIP-8 program at 0x200; images that don't fit are rejected
    /// before anything is written
    pub fn load_program(&mut self, reader: &mut impl io::Read) -> Result<usize> {
        let mut buf = Vec::new();
        let len = reader.read_to_end(&mut buf)?;
        if len > CHIP8_MAX_PROGRAM_BYTES {
            return Err(Chip8Error::ProgramTooLarge {
                size: len,
                max: CHIP8_MAX_PROGRAM_BYTES,
            });
        }
        self.write(&buf, CHIP8_PROGRAM_ADDR);
        debug!("loaded {} program bytes at {:#05x}", len, CHIP8_PROGRAM_ADDR);
        Ok(len)
    }
}

impl Default for Chip8Memory {
    fn default() -> Self {
        Self::new()
    }
}

/// address of the sprite for hex digit `digit` (low nibble only)
pub fn font_sprite_addr(digit: u8) -> u16 {
    CHIP8_FONT_ADDR + CHIP8_FONT_SPRITE_BYTES * (digit & 0x0f) as u16
}

const CHIP8_FONT: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_zeroed() {
        let m = Chip8Memory::new();
        // NB. memory is zeroed from 0x200 because before that we bake in the font
        assert_eq!(m.bytes[0x200..], [0; 0xe00]);
        assert_eq!(m.bytes[..0x50], [0; 0x50]);
    }

    #[test]
    fn test_font_layout() {
        let m = Chip8Memory::new();
        assert_eq!(m.read(CHIP8_FONT_ADDR, 80), CHIP8_FONT.to_vec());
        assert_eq!(m.get_byte(0xa0), 0);
        assert_eq!(font_sprite_addr(0x0), 0x050);
        assert_eq!(font_sprite_addr(0xf), 0x09b);
        // only the low nibble picks the digit
        assert_eq!(font_sprite_addr(0x1a), font_sprite_addr(0xa));
    }

    #[test]
    fn test_write_slice_ok() {
        let mut dst = Chip8Memory::new();
        let src: &[u8] = &[0, 1, 2, 3, 4, 5, 6, 7];
        dst.write(src, 8);
        assert_eq!(
            dst.bytes[..16],
            [0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 2, 3, 4, 5, 6, 7]
        );
    }

    #[test]
    fn test_read_word() {
        let mut m = Chip8Memory::new();
        m.write(&[0, 1, 2, 3, 4, 5, 6, 7], 0x300);
        assert_eq!(m.get_word(0x304), 0x0405);
    }

    #[test]
    fn test_addresses_wrap() {
        let mut m = Chip8Memory::new();
        m.write(&[0xaa, 0xbb], 0x0fff);
        assert_eq!(m.get_byte(0x0fff), 0xaa);
        assert_eq!(m.get_byte(0x0000), 0xbb);
        assert_eq!(m.get_word(0x0fff), 0xaabb);
        assert_eq!(m.get_byte(0x1fff), 0xaa);
    }

    #[test]
    fn test_program_load_ok() -> Result<()> {
        let mut dst = Chip8Memory::new();
        let mut prog: &[u8] = &[0x00, 0xe0]; // clear screen
        assert_eq!(dst.load_program(&mut prog)?, 2);
        assert_eq!(dst.read(0x200, 2), vec![0x00, 0xe0]);
        Ok(())
    }

    #[test]
    fn test_program_load_fills_memory() -> Result<()> {
        let mut dst = Chip8Memory::new();
        let prog = vec![0x12; CHIP8_MAX_PROGRAM_BYTES];
        dst.load_program(&mut prog.as_slice())?;
        assert_eq!(dst.get_byte(0x0fff), 0x12);
        // didn't wrap into the font
        assert_eq!(dst.get_byte(CHIP8_FONT_ADDR), 0xf0);
        Ok(())
    }

    #[test]
    fn test_program_too_large() {
        let mut dst = Chip8Memory::new();
        let prog = vec![0x12; CHIP8_MAX_PROGRAM_BYTES + 1];
        match dst.load_program(&mut prog.as_slice()) {
            Err(Chip8Error::ProgramTooLarge { size, max }) => {
                assert_eq!(size, 0xe01);
                assert_eq!(max, 0xe00);
            }
            other => panic!("expected ProgramTooLarge, got {:?}", other),
        }
        // nothing was written
        assert_eq!(dst.get_byte(0x200), 0);
    }
}
