//! Chip-8 virtual machine core.
//!
//! The machine is driven from the outside: a driver calls [`Chip8Vm::step`]
//! at the instruction rate of its choosing, and [`Chip8Vm::tick_timers`] at a
//! fixed 60Hz. Drawing, input and scheduling are left to the driver.
mod clock;
pub mod constants;
mod cpu;
mod devices;
mod display;
mod error;
mod instruction;
mod vm;

pub use self::{
    clock::{Clock, Hz},
    devices::{FrameSink, InvalidKeyCode, KeyCode},
    display::{DisplayBuffer, DrawMode},
    error::{Chip8Error, Chip8Result},
    instruction::Instr,
};

pub const IMPL_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod prelude {
    pub use super::{
        error::{Chip8Error, Chip8Result},
        vm::{Chip8Conf, Chip8Vm, Flow, RunState},
        Clock, DisplayBuffer, DrawMode, FrameSink, Hz, Instr, KeyCode,
    };
}
