//! CPU and memory state.
use crate::{constants::*, display::DisplayBuffer};

/// Core state for a chip8 interpreter.
pub struct Chip8Cpu {
    // ------------------------------------------------------------------------
    // Registers
    /// Program counter pointing to the current position in the bytecode.
    pub(crate) pc: usize,
    /// General purpose registers for temporary values.
    ///
    /// Register 16 (VF) is used for either the carry flag or borrow switch depending on opcode.
    pub(crate) registers: [u8; REGISTER_COUNT],
    /// Pointer register used for temporarily storing an address.
    ///
    /// The register is 16 bits wide, but memory is only addressed through its lowest 12 bits.
    pub(crate) address: u16,
    /// (DT) Delay timer that counts down to 0.
    pub(crate) delay_timer: u8,
    /// (ST) Sound timer that counts down to 0. When it has a non-zero value, the buzzer is on.
    pub(crate) sound_timer: u8,
    /// Keyboard input state. Pressed is a 1 bit, released is a 0 bit.
    pub(crate) key_state: u16,

    // ------------------------------------------------------------------------
    // Memory
    /// Main memory storage space.
    pub(crate) ram: Box<[u8; MEM_SIZE]>,
    /// Stack of return pointers used for jumping when a routine call finishes.
    pub(crate) stack: CallStack,
    /// Screen buffer that is drawn too.
    pub(crate) display: DisplayBuffer,
}

impl Default for Chip8Cpu {
    fn default() -> Self {
        Self::new(DISPLAY_WIDTH, DISPLAY_HEIGHT)
    }
}

impl Chip8Cpu {
    pub fn new(display_width: usize, display_height: usize) -> Self {
        Self {
            pc: MEM_START,
            registers: [0; REGISTER_COUNT],
            address: 0,
            delay_timer: 0,
            sound_timer: 0,
            key_state: 0,

            ram: Box::new([0; MEM_SIZE]),
            stack: CallStack::default(),
            display: DisplayBuffer::new(display_width, display_height),
        }
    }

    /// Erase memory, registers, timers, keys and the display.
    pub(crate) fn clear(&mut self) {
        self.pc = MEM_START;
        self.registers.fill(0);
        self.address = 0;
        self.delay_timer = 0;
        self.sound_timer = 0;
        self.key_state = 0;

        self.ram.fill(0);
        self.stack.clear();
        self.display.clear();
    }

    pub fn clear_display(&mut self) {
        self.display.clear();
    }

    // ------------------------------------------------------------------------
    // Memory

    /// Read a byte, wrapping the address around the 12-bit address space.
    #[inline(always)]
    pub fn read(&self, addr: usize) -> u8 {
        self.ram[addr & MEM_MASK]
    }

    /// Write a byte, wrapping the address around the 12-bit address space.
    #[inline(always)]
    pub fn write(&mut self, addr: usize, value: u8) {
        self.ram[addr & MEM_MASK] = value;
    }

    /// Extract the instruction at the current program counter.
    #[inline(always)]
    pub fn instr(&self) -> [u8; 2] {
        [self.read(self.pc), self.read(self.pc + 1)]
    }

    // ------------------------------------------------------------------------
    // Keyboard

    pub fn set_key_state(&mut self, key_id: u8, state: bool) {
        if key_id < KEY_COUNT {
            if state {
                self.key_state |= 1 << key_id;
            } else {
                self.key_state &= !(1 << key_id);
            }
        }
    }

    pub fn key_state(&self, key_id: u8) -> bool {
        if key_id < KEY_COUNT {
            self.key_state & (1 << key_id) > 0
        } else {
            false
        }
    }

    /// Clear the keyboard input state, setting all keys to up.
    #[inline(always)]
    pub fn clear_keys(&mut self) {
        self.key_state = 0;
    }

    // ------------------------------------------------------------------------
    // Timers

    /// Count down the delay timer.
    #[inline]
    pub fn tick_delay(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
    }

    #[inline]
    pub fn tick_sound(&mut self) {
        self.sound_timer = self.sound_timer.saturating_sub(1);
    }
}

/// Fixed capacity stack of return addresses.
#[derive(Debug, Default)]
pub struct CallStack {
    frames: [Address; STACK_SIZE],
    /// Number of occupied frames. The top of the stack is at `len - 1`.
    len: usize,
}

impl CallStack {
    /// Push a return address, or hand it back if the stack is full.
    #[inline]
    pub fn push(&mut self, addr: Address) -> Result<(), Address> {
        if self.len >= STACK_SIZE {
            return Err(addr);
        }
        self.frames[self.len] = addr;
        self.len += 1;
        Ok(())
    }

    #[inline]
    pub fn pop(&mut self) -> Option<Address> {
        self.len = self.len.checked_sub(1)?;
        Some(self.frames[self.len])
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.frames.fill(0);
        self.len = 0;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_key_state() {
        let mut cpu = Chip8Cpu::default();

        cpu.set_key_state(0, true);
        assert_eq!(cpu.key_state, 0b00000000_00000001);
        assert!(cpu.key_state(0));
        assert!(!cpu.key_state(1));
        assert!(!cpu.key_state(7));

        cpu.set_key_state(7, true);
        assert_eq!(cpu.key_state, 0b00000000_10000001);
        assert!(cpu.key_state(0));
        assert!(!cpu.key_state(1));
        assert!(cpu.key_state(7));

        cpu.set_key_state(0, false);
        assert_eq!(cpu.key_state, 0b00000000_10000000);
        assert!(!cpu.key_state(0));
        assert!(!cpu.key_state(1));
        assert!(cpu.key_state(7));

        cpu.set_key_state(15, true);
        assert_eq!(cpu.key_state, 0b10000000_10000000);
        assert!(cpu.key_state(15));

        // Out of range keys are ignored.
        cpu.set_key_state(16, true);
        assert_eq!(cpu.key_state, 0b10000000_10000000);
        assert!(!cpu.key_state(16));
    }

    #[test]
    fn test_call_stack() {
        let mut stack = CallStack::default();
        assert_eq!(stack.pop(), None);

        for i in 0..STACK_SIZE {
            stack.push(0x200 + i as Address * 2).unwrap();
        }
        assert_eq!(stack.len(), STACK_SIZE);
        assert_eq!(stack.push(0x300), Err(0x300));

        for i in (0..STACK_SIZE).rev() {
            assert_eq!(stack.pop(), Some(0x200 + i as Address * 2));
        }
        assert!(stack.is_empty());
        assert_eq!(stack.pop(), None);
    }

    #[test]
    fn test_timers_floor_at_zero() {
        let mut cpu = Chip8Cpu::default();
        cpu.delay_timer = 2;
        cpu.sound_timer = 1;

        for _ in 0..3 {
            cpu.tick_delay();
            cpu.tick_sound();
        }

        assert_eq!(cpu.delay_timer, 0);
        assert_eq!(cpu.sound_timer, 0);
    }

    #[test]
    fn test_memory_wraps() {
        let mut cpu = Chip8Cpu::default();
        cpu.write(MEM_SIZE + 3, 0xAB);
        assert_eq!(cpu.read(3), 0xAB);
        assert_eq!(cpu.read((0xFFFF & !MEM_MASK) | 3), 0xAB);
    }
}
