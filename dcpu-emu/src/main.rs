use std::{
    borrow::Cow,
    env::Args,
    fmt,
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
    str::FromStr,
    thread,
    time::{Duration, Instant},
};

use dcpu_emu_cpu::cpu::Cpu;
use dcpu_emu_regs::Regs;

use emu_state_builder::EmuStateBuilder;
use tracing_subscriber::EnvFilter;

mod display;
mod emu_state_builder;
mod loader;

const SCREEN_REFRESH: Duration = Duration::from_millis(100);

pub struct DumpRegState<'a>(&'a Regs);

impl fmt::Display for DumpRegState<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.dump_state(f)
    }
}

fn init_logging(filter: Option<&str>) -> io::Result<()> {
    let filter = match filter {
        Some(filter) => EnvFilter::try_new(filter)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dcpu_emu=info")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
    Ok(())
}

/// Runs `steps` ticks on the current thread
fn run_steps(cpu: &mut Cpu, steps: u64, halt_on_unimplemented: bool) {
    for _ in 0..steps {
        if let Err(e) = cpu.tick() {
            tracing::warn!(%e, "cpu exception");
            if halt_on_unimplemented {
                break;
            }
        }
    }
}

fn real_main(mut args: Args) -> io::Result<()> {
    let mut state = EmuStateBuilder::default();

    while let Some(arg) = args.next() {
        let (arg, explicit) = arg
            .split_once("=")
            .map(|(a, b)| (a, Some(b)))
            .unwrap_or((&arg, None));

        match arg {
            "--image" => state.image(PathBuf::from(
                require_arg(Some("--image"), &mut args, explicit)?.into_owned(),
            )),
            "--tick-rate" => state.tick_rate(parse_arg(
                "--tick-rate",
                &require_arg(Some("--tick-rate"), &mut args, explicit)?,
            )?)?,
            "--steps" => state.steps(parse_arg(
                "--steps",
                &require_arg(Some("--steps"), &mut args, explicit)?,
            )?),
            "--duration" => state.duration(Duration::from_millis(parse_arg(
                "--duration",
                &require_arg(Some("--duration"), &mut args, explicit)?,
            )?)),
            "--log-level" => state.log_filter(
                require_arg(Some("--log-level"), &mut args, explicit)?.into_owned(),
            ),
            "--screen" => {
                no_arg("--screen", explicit)?;
                state.attach_screen();
            }
            "--halt-on-unimplemented" => {
                no_arg("--halt-on-unimplemented", explicit)?;
                state.halt_on_unimplemented();
            }
            x => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("Unrecognized argument {x}"),
                ))
            }
        }
    }

    init_logging(state.get_log_filter())?;

    let mut stdout = io::stdout().lock();

    if let Some(steps) = state.get_steps() {
        let mut cpu = state.create_cpu()?;
        run_steps(&mut cpu, steps, state.executor_config().halt_on_unimplemented);

        writeln!(stdout, "{}", DumpRegState(cpu.regs()))?;
        write!(stdout, "{}", display::render(&cpu.memory().read_screen()))?;
        return Ok(());
    }

    let exec = state.create_executor()?;
    exec.start();

    let started = Instant::now();
    while state.get_duration().map_or(true, |d| started.elapsed() < d) {
        if state.screen_attached() {
            // Home the cursor and redraw in place
            write!(
                stdout,
                "\x1b[H{}",
                display::render(&exec.memory().read_screen())
            )?;
            stdout.flush()?;
        }
        thread::sleep(SCREEN_REFRESH);
    }

    exec.stop();
    tracing::info!(ticks = exec.ticks(), "finished");
    writeln!(stdout, "{}", DumpRegState(&exec.registers()))?;

    Ok(())
}

fn no_arg(flag: &str, explicit: Option<&str>) -> io::Result<()> {
    if explicit.is_some() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{flag} does not take an argument"),
        ));
    }
    Ok(())
}

fn parse_arg<T: FromStr>(flag: &str, val: &str) -> io::Result<T>
where
    T::Err: fmt::Display,
{
    val.parse().map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Invalid value {val} for {flag}: {e}"),
        )
    })
}

fn require_arg<'a, I: Iterator<Item = String>>(
    flag: Option<&str>,
    args: &mut I,
    explicit: Option<&'a str>,
) -> io::Result<Cow<'a, str>> {
    explicit
        .map(Cow::Borrowed)
        .or_else(|| args.next().map(Cow::Owned))
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                if let Some(flag) = flag {
                    format!("{} requires an argument", flag)
                } else {
                    format!("Expected an argument")
                },
            )
        })
}

fn main() -> ExitCode {
    let mut args = std::env::args();

    let prg_name = args.next().unwrap_or_else(|| "dcpu-emu".to_string());

    match real_main(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{prg_name}: {e}");
            ExitCode::FAILURE
        }
    }
}
