//! Virtual machine.
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    clock::Hz,
    constants::*,
    cpu::Chip8Cpu,
    devices::KeyCode,
    display::{DisplayBuffer, DrawMode},
    error::{Chip8Error, Chip8Result},
    instruction::Instr,
};

pub struct Chip8Vm {
    cpu: Chip8Cpu,
    state: RunState,
    /// The fault that halted the machine, if any.
    fault: Option<Chip8Error>,
    rng: StdRng,
    conf: Chip8Conf,
}

impl Chip8Vm {
    /// Create a machine with the builtin font loaded.
    ///
    /// Fails when the configured display size is empty or too large.
    pub fn new(conf: Chip8Conf) -> Chip8Result<Self> {
        let [width, height] = conf.display_size;
        if !check_display_size(width, height) {
            return Err(Chip8Error::DisplaySize { width, height });
        }

        let rng = match conf.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut vm = Chip8Vm {
            cpu: Chip8Cpu::new(width, height),
            state: RunState::Running,
            fault: None,
            rng,
            conf,
        };
        vm.load_builtin_font();
        Ok(vm)
    }

    /// Configuration that was used to instantiate the VM.
    pub fn config(&self) -> &Chip8Conf {
        &self.conf
    }

    pub fn load_builtin_font(&mut self) {
        let start = FONTSET_START as usize;
        self.cpu.ram[start..start + FONTSET_DATA_LENGTH].copy_from_slice(&FONTSET);
    }

    /// Replace the hexadecimal digit glyphs used by `Fx29` (`LD F, Vx`).
    pub fn load_font(&mut self, fontset: &[u8]) -> Chip8Result<()> {
        if fontset.len() != FONTSET_DATA_LENGTH {
            return Err(Chip8Error::Font(format!(
                "fontset data must be {FONTSET_DATA_LENGTH} bytes, got {}",
                fontset.len()
            )));
        }

        let start = FONTSET_START as usize;
        self.cpu.ram[start..start + FONTSET_DATA_LENGTH].copy_from_slice(fontset);

        Ok(())
    }

    /// Load a program image into memory at [`MEM_START`], and prepare the machine to run it.
    ///
    /// All machine state from a previous program is discarded, including a halted state.
    pub fn load_bytecode(&mut self, bytecode: &[u8]) -> Chip8Result<()> {
        if !check_program_size(bytecode) {
            return Err(Chip8Error::LargeProgram {
                size: bytecode.len(),
            });
        }

        // Start with clean memory to avoid leaking previous program.
        self.cpu.clear();

        // Reset fonts
        self.load_builtin_font();

        // Load program into virtual RAM
        self.cpu.ram[MEM_START..MEM_START + bytecode.len()].copy_from_slice(bytecode);

        // Reset the program counter to prepare for execution.
        self.cpu.pc = MEM_START;

        self.state = RunState::Running;
        self.fault = None;

        log::debug!("loaded program of {} bytes", bytecode.len());

        Ok(())
    }
}

/// Inspection of machine state.
impl Chip8Vm {
    pub fn display_buffer(&self) -> &DisplayBuffer {
        &self.cpu.display
    }

    #[inline]
    pub fn run_state(&self) -> RunState {
        self.state
    }

    #[inline]
    pub fn is_halted(&self) -> bool {
        self.state == RunState::Halted
    }

    /// The fault that halted the machine.
    pub fn error(&self) -> Option<&Chip8Error> {
        self.fault.as_ref()
    }

    #[inline]
    pub fn pc(&self) -> usize {
        self.cpu.pc
    }

    #[inline]
    pub fn registers(&self) -> &[u8; REGISTER_COUNT] {
        &self.cpu.registers
    }

    /// Address register `I`.
    #[inline]
    pub fn address(&self) -> u16 {
        self.cpu.address
    }

    #[inline]
    pub fn delay_timer(&self) -> u8 {
        self.cpu.delay_timer
    }

    #[inline]
    pub fn sound_timer(&self) -> u8 {
        self.cpu.sound_timer
    }

    /// The buzzer sounds while the sound timer counts down.
    #[inline]
    pub fn buzzer(&self) -> bool {
        self.cpu.sound_timer > 0
    }

    /// Number of subroutine calls that have not yet returned.
    #[inline]
    pub fn stack_depth(&self) -> usize {
        self.cpu.stack.len()
    }

    pub fn memory(&self) -> &[u8] {
        &self.cpu.ram[..]
    }

    pub fn key_state(&self, key: KeyCode) -> bool {
        self.cpu.key_state(key.as_u8())
    }
}

/// Report from a single step to the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Flow {
    Ok,
    /// Program counter has jumped to a new address.
    ///
    /// This is useful for the caller to avoid being
    /// blocked on infinite or long running loops.
    ///
    /// This is returned when the interpreter encounters:
    ///
    /// - 1nnn (`JP addr`)
    /// - 2nnn (`CALL addr`)
    /// - 00EE (`RET`)
    Jump,
    /// Display buffer changed and should be presented.
    Draw,
    /// Sound timer was set.
    Sound,
    /// Wait for a keypress.
    ///
    /// This is triggered by the opcode `Fx0A` (`LD Vx, K`), which stops
    /// execution until a key is pressed, and loads the key value into `Vx`.
    /// Steps taken while waiting do nothing and report this again.
    KeyWait,
    /// Machine is halted. The step did nothing.
    Halted,
}

/// Top level execution status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    /// Paused until a key is pressed. The key value will be stored in the register.
    WaitingForKey(u8),
    /// Stopped by a program fault. Only loading a program leaves this state.
    Halted,
}

/// VM Configuration Parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Chip8Conf {
    /// Instructions executed per second by the driver.
    pub clock_frequency: Option<Hz>,
    /// Display width and height in pixels.
    pub display_size: [usize; 2],
    pub draw_mode: DrawMode,
    /// Seed for `Cxnn` (`RND Vx, byte`). Seeded from entropy when absent.
    pub rng_seed: Option<u64>,
}

impl Default for Chip8Conf {
    fn default() -> Self {
        Self {
            clock_frequency: None,
            display_size: DISPLAY_SIZE,
            draw_mode: DrawMode::default(),
            rng_seed: None,
        }
    }
}

impl Chip8Conf {
    /// Instructions per second, falling back to the default rate.
    pub fn clock_frequency(&self) -> Hz {
        self.clock_frequency.unwrap_or(Hz(DEFAULT_CLOCK_FREQUENCY))
    }
}

#[inline]
fn check_program_size(bytecode: &[u8]) -> bool {
    bytecode.len() <= MAX_PROGRAM_SIZE
}

#[inline]
fn check_display_size(width: usize, height: usize) -> bool {
    match width.checked_mul(height) {
        Some(pixels) => pixels > 0 && pixels <= MAX_DISPLAY_PIXELS,
        None => false,
    }
}

/// Interpreter
impl Chip8Vm {
    /// Sets the keyboard key input state.
    ///
    /// If the VM is waiting for keyboard input, a key press resolves the wait:
    /// the key value is stored in the waiting register and execution resumes.
    pub fn set_key(&mut self, key: KeyCode, pressed: bool) {
        let key_id = key.as_u8();
        self.cpu.set_key_state(key_id, pressed);

        if pressed {
            if let RunState::WaitingForKey(vx) = self.state {
                self.cpu.registers[vx as usize] = key_id;
                self.state = RunState::Running;
            }
        }
    }

    /// Sets the keyboard key input state by raw key index.
    ///
    /// Indices outside of `0x0..=0xF` are ignored.
    pub fn set_key_id(&mut self, key_id: u8, pressed: bool) {
        if let Ok(key) = KeyCode::try_from(key_id) {
            self.set_key(key, pressed);
        }
    }

    /// Clear the keyboard input state, setting all keys to up.
    pub fn clear_keys(&mut self) {
        self.cpu.clear_keys()
    }

    /// Count down the delay and sound timers by one.
    ///
    /// Drivers call this at a fixed 60Hz, independent of the instruction rate.
    /// Timers keep counting down even when the machine is halted.
    pub fn tick_timers(&mut self) {
        self.cpu.tick_delay();
        self.cpu.tick_sound();
    }

    /// Execute up to `step_count` instructions.
    ///
    /// Stops early when the machine starts waiting for a key, or halts.
    pub fn run_steps(&mut self, step_count: usize) -> Chip8Result<Flow> {
        let mut flow = Flow::Ok;

        for _ in 0..step_count {
            flow = self.step()?;
            if matches!(flow, Flow::KeyWait | Flow::Halted) {
                break;
            }
        }

        Ok(flow)
    }

    /// Fetch, decode and execute a single instruction.
    ///
    /// Does nothing while waiting for a key, or when halted.
    /// A program fault halts the machine and is returned as an error.
    pub fn step(&mut self) -> Chip8Result<Flow> {
        match self.state {
            RunState::Running => {}
            RunState::WaitingForKey(_) => return Ok(Flow::KeyWait),
            RunState::Halted => return Ok(Flow::Halted),
        }

        let at = self.cpu.pc;
        let word = u16::from_be_bytes(self.cpu.instr());

        self.cpu.pc = (at + 2) & MEM_MASK;

        match Instr::decode(word) {
            Some(instr) => {
                op_trace(at, word, &instr);
                self.exec(instr, at)
            }
            None => Err(self.halt(Chip8Error::UnknownInstruction(word), at)),
        }
    }

    /// Move to the terminal state, keeping the fault for inspection.
    fn halt(&mut self, err: Chip8Error, at: usize) -> Chip8Error {
        log::warn!("halted at 0x{at:03X}: {err}");
        self.state = RunState::Halted;
        self.fault = Some(err.clone());
        err
    }

    /// Execute a decoded instruction located at address `at`.
    ///
    /// The program counter has already moved past the instruction.
    fn exec(&mut self, instr: Instr, at: usize) -> Chip8Result<Flow> {
        use Instr::*;

        let mut control_flow = Flow::Ok;

        match instr {
            // 00E0 (CLS)
            ClearScreen => {
                self.cpu.clear_display();
                control_flow = Flow::Draw;
            }
            // 00EE (RET)
            //
            // Set the program counter to the value at the top of the stack.
            Return => match self.cpu.stack.pop() {
                Some(addr) => {
                    self.cpu.pc = addr as usize;
                    control_flow = Flow::Jump;
                }
                None => {
                    let pc = at as Address;
                    return Err(self.halt(Chip8Error::StackUnderflow { pc }, at));
                }
            },
            // 1NNN (JP addr)
            JumpAddress { address } => {
                self.cpu.pc = address as usize;
                control_flow = Flow::Jump;
            }
            // 2NNN (CALL addr)
            //
            // Push the return address, then jump to NNN.
            Call { address } => {
                if self.cpu.stack.push(self.cpu.pc as Address).is_err() {
                    let pc = at as Address;
                    return Err(self.halt(Chip8Error::StackOverflow { pc }, at));
                }
                self.cpu.pc = address as usize;
                control_flow = Flow::Jump;
            }
            // 3XNN (SE Vx, byte)
            Skip_Eq_Byte { vx, nn } => {
                if self.cpu.registers[vx as usize] == nn {
                    self.skip();
                }
            }
            // 4XNN (SNE Vx, byte)
            Skip_NotEq_Byte { vx, nn } => {
                if self.cpu.registers[vx as usize] != nn {
                    self.skip();
                }
            }
            // 5XYN (SE Vx, Vy)
            Skip_Eq { vx, vy } => {
                let x = self.cpu.registers[vx as usize];
                let y = self.cpu.registers[vy as usize];
                if x == y {
                    self.skip();
                }
            }
            // 6XNN (LD Vx, byte)
            Load_Byte { vx, nn } => {
                self.cpu.registers[vx as usize] = nn;
            }
            // 7XNN (ADD Vx, byte)
            //
            // Carry flag is not set.
            Add_Byte { vx, nn } => {
                let x = self.cpu.registers[vx as usize];
                self.cpu.registers[vx as usize] = x.wrapping_add(nn);
            }
            // 9XY0 (SNE Vx, Vy)
            Skip_NotEq { vx, vy } => {
                let x = self.cpu.registers[vx as usize];
                let y = self.cpu.registers[vy as usize];
                if x != y {
                    self.skip();
                }
            }
            // ANNN (LD I, addr)
            Load_Address { address } => {
                self.cpu.address = address;
            }
            // CXNN (RND Vx, byte)
            Random { vx, nn } => {
                self.cpu.registers[vx as usize] = nn & self.rng.gen::<u8>();
            }
            // DXYN (DRW Vx, Vy, nibble)
            //
            // Sprite rows are read from memory at I. If the drawing operation erases
            // existing pixels, VF is set to 1, otherwise 0.
            Draw { vx, vy, n } => {
                let x = self.cpu.registers[vx as usize] as usize;
                let y = self.cpu.registers[vy as usize] as usize;
                let addr = self.cpu.address as usize;

                let mut sprite = [0u8; 0xF];
                let rows = &mut sprite[..n as usize];
                for (r, row) in rows.iter_mut().enumerate() {
                    *row = self.cpu.read(addr + r);
                }

                let is_erased = self.cpu.display.blit(x, y, rows, self.conf.draw_mode);

                self.cpu.registers[FLAG_REGISTER] = is_erased as u8;
                control_flow = Flow::Draw;
            }
            // ----------------------------------------------------------------
            // Arithmetic
            //
            // The flag register is written after the result, so when
            // the target register is VF it holds the flag.
            //
            // 8XY0 (LD Vx, Vy)
            Load_Vx_Vy { vx, vy } => {
                self.cpu.registers[vx as usize] = self.cpu.registers[vy as usize];
            }
            // 8XY1 (OR Vx, Vy)
            Or_Vx_Vy { vx, vy } => {
                self.cpu.registers[vx as usize] |= self.cpu.registers[vy as usize];
            }
            // 8XY2 (AND Vx, Vy)
            And_Vx_Vy { vx, vy } => {
                self.cpu.registers[vx as usize] &= self.cpu.registers[vy as usize];
            }
            // 8XY3 (XOR Vx, Vy)
            Xor_Vx_Vy { vx, vy } => {
                self.cpu.registers[vx as usize] ^= self.cpu.registers[vy as usize];
            }
            // 8XY4 (ADD Vx, Vy)
            //
            // If overflow, set VF to 1, else 0.
            Add_Vx_Vy { vx, vy } => {
                let (x, y) = (
                    self.cpu.registers[vx as usize],
                    self.cpu.registers[vy as usize],
                );
                let (result, carry) = x.overflowing_add(y);
                self.cpu.registers[vx as usize] = result;
                self.cpu.registers[FLAG_REGISTER] = carry as u8;
            }
            // 8XY5 (SUB Vx, Vy)
            //
            // VF is 1 when VX is strictly greater than VY before the subtraction.
            Sub_Vx_Vy { vx, vy } => {
                let (x, y) = (
                    self.cpu.registers[vx as usize],
                    self.cpu.registers[vy as usize],
                );
                self.cpu.registers[vx as usize] = x.wrapping_sub(y);
                self.cpu.registers[FLAG_REGISTER] = (x > y) as u8;
            }
            // 8XY6 (SHR Vx)
            ShiftRight { vx } => {
                let x = self.cpu.registers[vx as usize];
                self.cpu.registers[vx as usize] = x >> 1;
                self.cpu.registers[FLAG_REGISTER] = x & 1;
            }
            // 8XY7 (SUBN Vx, Vy)
            //
            // VF is 1 when VY is strictly greater than VX before the subtraction.
            SubReverse_Vx_Vy { vx, vy } => {
                let (x, y) = (
                    self.cpu.registers[vx as usize],
                    self.cpu.registers[vy as usize],
                );
                self.cpu.registers[vx as usize] = y.wrapping_sub(x);
                self.cpu.registers[FLAG_REGISTER] = (y > x) as u8;
            }
            // 8XYE (SHL Vx)
            ShiftLeft { vx } => {
                let x = self.cpu.registers[vx as usize];
                self.cpu.registers[vx as usize] = x << 1;
                self.cpu.registers[FLAG_REGISTER] = x >> 7;
            }
            // ----------------------------------------------------------------
            // Keyboard
            //
            // Register values above 0xF name no key, and read as released.
            //
            // EX9E (SKP Vx)
            Skip_Key_Pressed { vx } => {
                if self.cpu.key_state(self.cpu.registers[vx as usize]) {
                    self.skip();
                }
            }
            // EXA1 (SKNP Vx)
            Skip_Key_NotPressed { vx } => {
                if !self.cpu.key_state(self.cpu.registers[vx as usize]) {
                    self.skip();
                }
            }
            // FX0A (LD Vx, K)
            //
            // All execution stops until a key is pressed, see `set_key`.
            Wait_Key { vx } => {
                self.state = RunState::WaitingForKey(vx);
                control_flow = Flow::KeyWait;
            }
            // ----------------------------------------------------------------
            // Timers
            //
            // FX07 (LD Vx, DT)
            Load_Vx_Delay { vx } => {
                self.cpu.registers[vx as usize] = self.cpu.delay_timer;
            }
            // FX15 (LD DT, Vx)
            Load_Delay_Vx { vx } => {
                self.cpu.delay_timer = self.cpu.registers[vx as usize];
            }
            // FX18 (LD ST, Vx)
            Load_Sound_Vx { vx } => {
                self.cpu.sound_timer = self.cpu.registers[vx as usize];
                control_flow = Flow::Sound;
            }
            // ----------------------------------------------------------------
            // Memory
            //
            // FX1E (ADD I, Vx)
            //
            // I is a full 16-bit register here, and wraps at 0xFFFF rather than 0xFFF.
            Add_Address_Vx { vx } => {
                let x = self.cpu.registers[vx as usize] as u16;
                self.cpu.address = self.cpu.address.wrapping_add(x);
            }
            // FX29 (LD F, Vx)
            //
            // Set I = location of sprite for digit Vx.
            Load_Font { vx } => {
                let x = self.cpu.registers[vx as usize] as u16;
                self.cpu.address = FONTSET_START + x * FONTSET_HEIGHT as u16;
            }
            // FX33 (LD B, Vx)
            //
            // Store the binary-coded decimal representation of Vx
            // in the memory locations I, I+1, and I+2.
            #[rustfmt::skip]
            Store_Bcd { vx } => {
                let addr = self.cpu.address as usize;
                let x = self.cpu.registers[vx as usize];
                self.cpu.write(addr,     x / 100 % 10);
                self.cpu.write(addr + 1, x / 10  % 10);
                self.cpu.write(addr + 2, x       % 10);
            }
            // FX55 (LD [I], Vx)
            //
            // Store registers V0 through Vx in memory starting at location I.
            Store_Registers { vx } => {
                let addr = self.cpu.address as usize;
                for v in 0..=vx as usize {
                    let x = self.cpu.registers[v];
                    self.cpu.write(addr + v, x);
                }
            }
            // FX65 (LD Vx, [I])
            //
            // Read registers V0 through Vx from memory starting at location I.
            Load_Registers { vx } => {
                let addr = self.cpu.address as usize;
                for v in 0..=vx as usize {
                    self.cpu.registers[v] = self.cpu.read(addr + v);
                }
            }
        }

        Ok(control_flow)
    }

    /// Skip over the next instruction.
    #[inline(always)]
    fn skip(&mut self) {
        self.cpu.pc = (self.cpu.pc + 2) & MEM_MASK;
    }
}

#[cfg(feature = "op_trace")]
#[inline]
fn op_trace(at: usize, word: u16, instr: &Instr) {
    log::trace!("{at:04X}: {word:04X} {instr}");
}

#[cfg(not(feature = "op_trace"))]
#[inline]
fn op_trace(_: usize, _: u16, _: &Instr) {}
