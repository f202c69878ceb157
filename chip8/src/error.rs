//! Result and errors.
use std::fmt::{self, Display, Formatter};

use crate::constants::{Address, MAX_DISPLAY_PIXELS, MAX_PROGRAM_SIZE};

pub type Chip8Result<T> = std::result::Result<T, Chip8Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chip8Error {
    /// Fetched a word that does not encode any supported instruction.
    UnknownInstruction(u16),
    /// Subroutine call nested deeper than the call stack allows.
    StackOverflow { pc: Address },
    /// Return executed without a matching subroutine call.
    StackUnderflow { pc: Address },
    /// Attempt to load a bytecode program that can't fit in memory.
    LargeProgram { size: usize },
    /// Font data has the wrong shape.
    Font(String),
    /// Configured display is empty, or larger than the machine supports.
    DisplaySize { width: usize, height: usize },
}

impl Chip8Error {
    /// Whether the error is a fault raised by the running program,
    /// which halts the machine.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::UnknownInstruction(_) | Self::StackOverflow { .. } | Self::StackUnderflow { .. }
        )
    }
}

impl Display for Chip8Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownInstruction(word) => write!(f, "unknown instruction: 0x{word:04X}"),
            Self::StackOverflow { pc } => write!(f, "call stack overflow at 0x{pc:03X}"),
            Self::StackUnderflow { pc } => write!(f, "call stack underflow at 0x{pc:03X}"),
            Self::LargeProgram { size } => write!(
                f,
                "program too large for VM memory: {size} bytes, at most {MAX_PROGRAM_SIZE} allowed"
            ),
            Self::Font(msg) => write!(f, "font error: {msg}"),
            Self::DisplaySize { width, height } => write!(
                f,
                "invalid display size {width}x{height}, must be non-empty with at most {MAX_DISPLAY_PIXELS} pixels"
            ),
        }
    }
}

impl std::error::Error for Chip8Error {}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            Chip8Error::UnknownInstruction(0xB123).to_string(),
            "unknown instruction: 0xB123"
        );
        assert_eq!(
            Chip8Error::StackUnderflow { pc: 0x202 }.to_string(),
            "call stack underflow at 0x202"
        );
        assert!(Chip8Error::StackOverflow { pc: 0x200 }.is_fatal());
        assert!(!Chip8Error::LargeProgram { size: 4000 }.is_fatal());
    }
}
