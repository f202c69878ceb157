//! Instruction decoding.
//!
//! Each instruction is two bytes, big endian, with the opcode identity in the
//! first 4-bit nibble. Operands are positioned by nibble:
//!
//! ```text
//! 0xF000 opcode
//! 0x0F00 X   register
//! 0x00F0 Y   register
//! 0x000F N   4-bit constant
//! 0x00FF NN  8-bit constant
//! 0x0FFF NNN 12-bit address
//! ```
use std::fmt::{self, Formatter};

use crate::constants::Address;

/// A recognised instruction with its operands extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum Instr {
    /// 00E0 (CLS)
    ///
    /// Clear the screen.
    ClearScreen,
    /// 00EE (RET)
    ///
    /// Return from the sub-routine.
    Return,
    /// 1nnn (JP addr)
    ///
    /// Jump to the address in `nnn`.
    JumpAddress { address: Address },
    /// 2nnn (CALL addr)
    ///
    /// Call the sub-routine at address `nnn`.
    Call { address: Address },
    /// 3xnn (SE Vx, byte)
    ///
    /// Skip the next instruction if register `Vx` equals value `nn`
    Skip_Eq_Byte { vx: u8, nn: u8 },
    /// 4xnn (SNE Vx, byte)
    ///
    /// Skip the next instruction if register `Vx` does not equal value `nn`.
    Skip_NotEq_Byte { vx: u8, nn: u8 },
    /// 5xyn (SE Vx, Vy)
    ///
    /// Skip the next instruction if register `Vx` equals register `Vy`.
    /// The low nibble is ignored.
    Skip_Eq { vx: u8, vy: u8 },
    /// 6xnn (LD Vx, byte)
    Load_Byte { vx: u8, nn: u8 },
    /// 7xnn (ADD Vx, byte)
    ///
    /// Add byte to the value in register `Vx`, store the result in `Vx`.
    /// Carry flag is not set.
    Add_Byte { vx: u8, nn: u8 },

    // ------------------------------------------------------------------------
    // Math
    /// 8xy0 (LD Vx, Vy)
    Load_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy1 (OR Vx, Vy)
    Or_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy2 (AND Vx, Vy)
    And_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy3 (XOR Vx, Vy)
    Xor_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy4 (ADD Vx, Vy)
    ///
    /// Overflow is wrapped. If overflowed, set VF to 1, else 0.
    Add_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy5 (SUB Vx, Vy)
    ///
    /// VF is set to 1 when `Vx > Vy`, otherwise 0.
    Sub_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy6 (SHR Vx)
    ///
    /// VF receives the bit shifted out. VY is unused.
    ShiftRight { vx: u8 },
    /// 8xy7 (SUBN Vx, Vy)
    ///
    /// Subtracts VX from VY, and stores the result in VX.
    /// VF is set to 1 when `Vy > Vx`, otherwise 0.
    SubReverse_Vx_Vy { vx: u8, vy: u8 },
    /// 8xyE (SHL Vx)
    ///
    /// VF receives the bit shifted out. VY is unused.
    ShiftLeft { vx: u8 },
    /// 9xy0 (SNE Vx, Vy)
    Skip_NotEq { vx: u8, vy: u8 },

    /// Annn (LD I, addr)
    ///
    /// Load address into register `I`.
    Load_Address { address: Address },
    /// Cxnn (RND Vx, byte)
    ///
    /// Generate random number, masked by `nn`.
    Random { vx: u8, nn: u8 },
    /// Dxyn (DRW Vx, Vy, nibble)
    ///
    /// Draw sprite to the display buffer.
    Draw { vx: u8, vy: u8, n: u8 },

    // ------------------------------------------------------------------------
    // Keyboard
    /// Ex9E (SKP Vx)
    Skip_Key_Pressed { vx: u8 },
    /// ExA1 (SKNP Vx)
    Skip_Key_NotPressed { vx: u8 },

    // ------------------------------------------------------------------------
    // Misc
    /// Fx07 (LD Vx, DT)
    Load_Vx_Delay { vx: u8 },
    /// Fx0A (LD Vx, K)
    ///
    /// Pause until a key is pressed, then store its value in `Vx`.
    Wait_Key { vx: u8 },
    /// Fx15 (LD DT, Vx)
    Load_Delay_Vx { vx: u8 },
    /// Fx18 (LD ST, Vx)
    Load_Sound_Vx { vx: u8 },
    /// Fx1E (ADD I, Vx)
    Add_Address_Vx { vx: u8 },
    /// Fx29 (LD F, Vx)
    ///
    /// Point `I` at the font glyph for the digit in `Vx`.
    Load_Font { vx: u8 },
    /// Fx33 (LD B, Vx)
    Store_Bcd { vx: u8 },
    /// Fx55 (LD [I], Vx)
    Store_Registers { vx: u8 },
    /// Fx65 (LD Vx, [I])
    Load_Registers { vx: u8 },
}

impl Instr {
    /// Decode a single instruction word.
    ///
    /// Returns `None` for encodings outside the supported instruction set,
    /// including `0nnn` machine routines and `Bnnn`.
    pub fn decode(word: u16) -> Option<Self> {
        let op = (word >> 12) as u8; // 0xF000
        let vx = ((word >> 8) & 0xF) as u8; // 0x0F00
        let vy = ((word >> 4) & 0xF) as u8; // 0x00F0
        let n = (word & 0xF) as u8; // 0x000F
        let nn = (word & 0xFF) as u8; // 0x00FF
        let address = word & 0xFFF; // 0x0FFF

        let instr = match op {
            0x0 => match word {
                0x00E0 => Self::ClearScreen,
                0x00EE => Self::Return,
                _ => return None,
            },
            0x1 => Self::JumpAddress { address },
            0x2 => Self::Call { address },
            0x3 => Self::Skip_Eq_Byte { vx, nn },
            0x4 => Self::Skip_NotEq_Byte { vx, nn },
            0x5 => Self::Skip_Eq { vx, vy },
            0x6 => Self::Load_Byte { vx, nn },
            0x7 => Self::Add_Byte { vx, nn },
            0x8 => match n {
                0x0 => Self::Load_Vx_Vy { vx, vy },
                0x1 => Self::Or_Vx_Vy { vx, vy },
                0x2 => Self::And_Vx_Vy { vx, vy },
                0x3 => Self::Xor_Vx_Vy { vx, vy },
                0x4 => Self::Add_Vx_Vy { vx, vy },
                0x5 => Self::Sub_Vx_Vy { vx, vy },
                0x6 => Self::ShiftRight { vx },
                0x7 => Self::SubReverse_Vx_Vy { vx, vy },
                0xE => Self::ShiftLeft { vx },
                _ => return None,
            },
            0x9 if n == 0 => Self::Skip_NotEq { vx, vy },
            0xA => Self::Load_Address { address },
            0xC => Self::Random { vx, nn },
            0xD => Self::Draw { vx, vy, n },
            0xE => match nn {
                0x9E => Self::Skip_Key_Pressed { vx },
                0xA1 => Self::Skip_Key_NotPressed { vx },
                _ => return None,
            },
            0xF => match nn {
                0x07 => Self::Load_Vx_Delay { vx },
                0x0A => Self::Wait_Key { vx },
                0x15 => Self::Load_Delay_Vx { vx },
                0x18 => Self::Load_Sound_Vx { vx },
                0x1E => Self::Add_Address_Vx { vx },
                0x29 => Self::Load_Font { vx },
                0x33 => Self::Store_Bcd { vx },
                0x55 => Self::Store_Registers { vx },
                0x65 => Self::Load_Registers { vx },
                _ => return None,
            },
            _ => return None,
        };

        Some(instr)
    }

    /// Decode two bytes read from memory.
    #[inline(always)]
    pub fn decode_bytes([a, b]: [u8; 2]) -> Option<Self> {
        Self::decode(u16::from_be_bytes([a, b]))
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::ClearScreen => write!(f, "CLS"),
            Self::Return => write!(f, "RET"),
            Self::JumpAddress { address } => write!(f, "JP 0x{address:03X}"),
            Self::Call { address } => write!(f, "CALL 0x{address:03X}"),
            Self::Skip_Eq_Byte { vx, nn } => write!(f, "SE v{vx:X}, {nn}"),
            Self::Skip_NotEq_Byte { vx, nn } => write!(f, "SNE v{vx:X}, {nn}"),
            Self::Skip_Eq { vx, vy } => write!(f, "SE v{vx:X}, v{vy:X}"),
            Self::Load_Byte { vx, nn } => write!(f, "LD v{vx:X}, {nn}"),
            Self::Add_Byte { vx, nn } => write!(f, "ADD v{vx:X}, {nn}"),
            // ------
            Self::Load_Vx_Vy { vx, vy } => write!(f, "LD v{vx:X}, v{vy:X}"),
            Self::Or_Vx_Vy { vx, vy } => write!(f, "OR v{vx:X}, v{vy:X}"),
            Self::And_Vx_Vy { vx, vy } => write!(f, "AND v{vx:X}, v{vy:X}"),
            Self::Xor_Vx_Vy { vx, vy } => write!(f, "XOR v{vx:X}, v{vy:X}"),
            Self::Add_Vx_Vy { vx, vy } => write!(f, "ADD v{vx:X}, v{vy:X}"),
            Self::Sub_Vx_Vy { vx, vy } => write!(f, "SUB v{vx:X}, v{vy:X}"),
            Self::ShiftRight { vx } => write!(f, "SHR v{vx:X}"),
            Self::SubReverse_Vx_Vy { vx, vy } => write!(f, "SUBN v{vx:X}, v{vy:X}"),
            Self::ShiftLeft { vx } => write!(f, "SHL v{vx:X}"),
            Self::Skip_NotEq { vx, vy } => write!(f, "SNE v{vx:X}, v{vy:X}"),
            // ------
            Self::Load_Address { address } => write!(f, "LD I, 0x{address:03X}"),
            Self::Random { vx, nn } => write!(f, "RND v{vx:X}, {nn}"),
            Self::Draw { vx, vy, n } => write!(f, "DRW v{vx:X}, v{vy:X}, {n}"),
            // ------
            Self::Skip_Key_Pressed { vx } => write!(f, "SKP v{vx:X}"),
            Self::Skip_Key_NotPressed { vx } => write!(f, "SKNP v{vx:X}"),
            // ------
            Self::Load_Vx_Delay { vx } => write!(f, "LD v{vx:X}, DT"),
            Self::Wait_Key { vx } => write!(f, "LD v{vx:X}, K"),
            Self::Load_Delay_Vx { vx } => write!(f, "LD DT, v{vx:X}"),
            Self::Load_Sound_Vx { vx } => write!(f, "LD ST, v{vx:X}"),
            Self::Add_Address_Vx { vx } => write!(f, "ADD I, v{vx:X}"),
            Self::Load_Font { vx } => write!(f, "LD F, v{vx:X}"),
            Self::Store_Bcd { vx } => write!(f, "LD B, v{vx:X}"),
            Self::Store_Registers { vx } => write!(f, "LD [I], v{vx:X}"),
            Self::Load_Registers { vx } => write!(f, "LD v{vx:X}, [I]"),
        }
    }
}
