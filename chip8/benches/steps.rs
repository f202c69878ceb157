use criterion::{black_box, criterion_group, criterion_main, Criterion};

use chip8::prelude::*;

/// Fills the screen with random diagonal lines, forever.
#[rustfmt::skip]
const MAZE: &[u8] = &[
    0xA2, 0x1E, // 200 LD I, .left
    0xC2, 0x01, // 202 RND v2, 1
    0x32, 0x01, // 204 SE v2, 1
    0xA2, 0x1A, // 206 LD I, .right
    0xD0, 0x14, // 208 DRW v0, v1, 4
    0x70, 0x04, // 20A ADD v0, 4
    0x30, 0x40, // 20C SE v0, 64
    0x12, 0x00, // 20E JP 0x200
    0x60, 0x00, // 210 LD v0, 0
    0x71, 0x04, // 212 ADD v1, 4
    0x31, 0x20, // 214 SE v1, 32
    0x12, 0x00, // 216 JP 0x200
    0x12, 0x18, // 218 JP 0x218
    0x80, 0x40, 0x20, 0x10, // 21A .right
    0x20, 0x40, 0x80, 0x10, // 21E .left
];

fn criterion_benchmark(c: &mut Criterion) {
    let mut vm = Chip8Vm::new(Chip8Conf {
        rng_seed: Some(1),
        ..Chip8Conf::default()
    })
    .unwrap();

    c.bench_function("maze steps", |b| {
        b.iter(|| {
            vm.load_bytecode(MAZE).unwrap();
            let step_count = black_box(1000_usize);
            black_box(vm.run_steps(step_count))
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
