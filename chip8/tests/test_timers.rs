use std::{
    sync::{Arc, Mutex},
    thread,
};

use chip8::prelude::*;

#[test]
#[rustfmt::skip]
fn test_timers_tick_while_halted() {
    let mut vm = Chip8Vm::new(Chip8Conf::default()).unwrap();
    vm.load_bytecode(&[
        0x60, 0x0A, // LD v0, 10
        0xF0, 0x15, // LD DT, v0
        0xF0, 0x18, // LD ST, v0
        0xFF, 0xFF, // unsupported
    ]).unwrap();

    assert!(vm.run_steps(4).is_err());
    assert!(vm.is_halted());

    for _ in 0..4 {
        vm.tick_timers();
    }
    assert_eq!(vm.delay_timer(), 6);
    assert_eq!(vm.sound_timer(), 6);
    assert!(vm.buzzer());

    for _ in 0..20 {
        vm.tick_timers();
    }
    assert_eq!(vm.delay_timer(), 0);
    assert_eq!(vm.sound_timer(), 0);
    assert!(!vm.buzzer());
}

#[test]
#[rustfmt::skip]
fn test_timers_tick_while_waiting_for_key() {
    let mut vm = Chip8Vm::new(Chip8Conf::default()).unwrap();
    vm.load_bytecode(&[
        0x60, 0x02, // LD v0, 2
        0xF0, 0x15, // LD DT, v0
        0xF1, 0x0A, // LD v1, K
        0xF2, 0x07, // LD v2, DT
    ]).unwrap();

    assert_eq!(vm.run_steps(10).unwrap(), Flow::KeyWait);

    vm.tick_timers();
    vm.set_key(KeyCode::Key0, true);
    vm.step().unwrap();

    assert_eq!(vm.registers()[2], 1);
}

/// A scheduler on another thread shares the machine through a mutex.
#[test]
#[rustfmt::skip]
fn test_timer_thread() {
    let vm = Arc::new(Mutex::new(Chip8Vm::new(Chip8Conf::default()).unwrap()));
    {
        let mut vm = vm.lock().unwrap();
        vm.load_bytecode(&[
            0x60, 0x3C, // LD v0, 60
            0xF0, 0x15, // LD DT, v0
            0xF1, 0x07, // LD v1, DT
        ]).unwrap();
        vm.run_steps(2).unwrap();
    }

    let timer = {
        let vm = Arc::clone(&vm);
        thread::spawn(move || {
            for _ in 0..25 {
                vm.lock().unwrap().tick_timers();
            }
        })
    };
    timer.join().unwrap();

    let mut vm = vm.lock().unwrap();
    vm.step().unwrap();
    assert_eq!(vm.registers()[1], 35);
}
