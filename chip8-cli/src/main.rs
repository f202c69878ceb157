//! Entrypoint for CLI
mod error;
mod sink;

use std::{env, fs, time::Instant};

use chip8::{constants::*, prelude::*, IMPL_VERSION};
use log::{debug, error, info};

use crate::{error::CliResult, sink::TextSink};

static USAGE: &str = r#"
usage: chip8 CMD FILE [OPTIONS]

commands:
    run     Run the target ROM file
    dump    Print the instructions of the target ROM file

options (run):
    --config FILE   Load machine settings from a YAML file
    --hz N          Instructions per second, 0 runs unthrottled
    --steps N       Stop after N instructions
    --seed N        Seed for the random number generator
    --wrap          Wrap sprites around the screen edges

examples:
    chip8 run maze.rom --hz 500
    chip8 run breakout.rom --config chip8.yaml
    chip8 dump breakout.rom

Set RUST_LOG=debug for more output.
"#;

fn run_bytecode(opts: RunOpts) -> CliResult<()> {
    let conf = load_conf(&opts)?;
    let bytecode = fs::read(&opts.filepath)?;

    let mut vm = Chip8Vm::new(conf)?;
    vm.load_bytecode(bytecode.as_slice())?;

    let mut sink = TextSink::new(std::io::stdout());
    let mut cpu_clock = Clock::from_hz(vm.config().clock_frequency());
    let mut timer_clock = Clock::timers();
    let mut step_count: usize = 0;

    info!(
        "running {} at {}Hz",
        opts.filepath,
        vm.config().clock_frequency().0
    );
    let start = Instant::now();

    'run: loop {
        // Timers keep their 60Hz rate independent of the instruction clock.
        for _ in 0..timer_clock.ticks() {
            vm.tick_timers();
        }

        for _ in 0..cpu_clock.ticks() {
            if opts.steps.map(|limit| step_count >= limit).unwrap_or(false) {
                info!("step limit of {step_count} reached");
                break 'run;
            }
            step_count += 1;

            match vm.step() {
                Ok(Flow::Draw) => sink.draw(vm.display_buffer()),
                Ok(Flow::Sound) => debug!("buzzer on for {} ticks", vm.sound_timer()),
                Ok(Flow::KeyWait) => {
                    // A terminal run has no keypad to resume the machine.
                    info!("program is waiting for a key press, stopping");
                    break 'run;
                }
                Ok(_) => {}
                Err(err) => {
                    error!("machine halted at 0x{:04X}: {err}", vm.pc());
                    return Err(err.into());
                }
            }
        }

        cpu_clock.wait();
    }

    info!(
        "{step_count} steps, {} frames, {}ms",
        sink.frames(),
        start.elapsed().as_nanos() as f64 / 1000000.0
    );
    print!("{}", vm.display_buffer().dump()?);

    Ok(())
}

/// Machine settings from the optional config file, with command line overrides applied on top.
fn load_conf(opts: &RunOpts) -> CliResult<Chip8Conf> {
    let mut conf = match &opts.config {
        Some(path) => {
            let file = fs::File::open(path)?;
            serde_yaml::from_reader::<_, Chip8Conf>(file)?
        }
        None => Chip8Conf::default(),
    };

    if let Some(hz) = opts.hz {
        conf.clock_frequency = Some(Hz(hz));
    }
    if let Some(seed) = opts.seed {
        conf.rng_seed = Some(seed);
    }
    if opts.wrap {
        conf.draw_mode = DrawMode::Wrap;
    }

    debug!("{conf:?}");

    Ok(conf)
}

fn dump_bytecode(filepath: impl AsRef<str>) -> CliResult<()> {
    let bytecode = fs::read(filepath.as_ref())?;

    for (i, chunk) in bytecode.chunks(2).enumerate() {
        let offset = MEM_START + i * 2;
        match *chunk {
            [a, b] => match Instr::decode_bytes([a, b]) {
                Some(instr) => println!("0x{offset:04X} {a:02X}{b:02X} {instr}"),
                None => println!("0x{offset:04X} {a:02X}{b:02X} ???"),
            },
            // Trailing odd byte.
            [a] => println!("0x{offset:04X} {a:02X}"),
            _ => {}
        }
    }

    Ok(())
}

fn main() {
    if let Err(err) = simple_logger::SimpleLogger::new().env().init() {
        eprintln!("failed to initialise logger: {err}");
    }

    let result = match parse_args() {
        Some(Cmd::Run(opts)) => run_bytecode(opts),
        Some(Cmd::Dump { filepath }) => dump_bytecode(filepath),
        None => {
            print_usage();
            // FreeBSD EX_USAGE (64)
            std::process::exit(64)
        }
    };

    if let Err(err) = result {
        eprintln!("{err}");
        std::process::exit(1)
    }
}

fn parse_args() -> Option<Cmd> {
    let mut args = env::args().skip(1);
    match args.next()?.as_str() {
        "run" => {
            let mut opts = RunOpts {
                filepath: args.next()?,
                ..RunOpts::default()
            };
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--config" => opts.config = Some(args.next()?),
                    "--hz" => opts.hz = Some(args.next()?.parse().ok()?),
                    "--steps" => opts.steps = Some(args.next()?.parse().ok()?),
                    "--seed" => opts.seed = Some(args.next()?.parse().ok()?),
                    "--wrap" => opts.wrap = true,
                    _ => {
                        error!("unknown option: {arg}");
                        return None;
                    }
                }
            }
            Some(Cmd::Run(opts))
        }
        "dump" => Some(Cmd::Dump {
            filepath: args.next()?,
        }),
        _ => None,
    }
}

fn print_usage() {
    println!("Chip8 v{IMPL_VERSION}");
    println!("{USAGE}");
}

enum Cmd {
    /// Run file
    Run(RunOpts),
    /// Print instruction listing
    Dump { filepath: String },
}

#[derive(Default)]
struct RunOpts {
    filepath: String,
    config: Option<String>,
    hz: Option<u64>,
    steps: Option<usize>,
    seed: Option<u64>,
    wrap: bool,
}
