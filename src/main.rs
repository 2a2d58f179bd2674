use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::filter::EnvFilter;

use intcode::{disassemble, parse_program, Console, Machine, MachineConfig, RunState, Word};

#[derive(Parser)]
#[command(name = "intcode", version, about = "Run a program on the integer machine")]
struct Cli {
  /// File holding the comma separated program.
  program: PathBuf,

  /// Values fed before the program starts, comma separated.
  #[arg(long)]
  input: Option<String>,

  /// Patch memory before running, as `address=value`. May be repeated.
  #[arg(long, value_name = "ADDRESS=VALUE")]
  poke: Vec<String>,

  /// Exchange text instead of numbers on the console.
  #[arg(long)]
  ascii: bool,

  /// Log every executed instruction.
  #[arg(long)]
  trace: bool,

  /// Print the disassembled program and exit.
  #[arg(long)]
  disassemble: bool,

  /// Print the memory following the halt instruction once the program ends.
  #[arg(long)]
  dump: bool,

  /// Bound for blocking I/O waits, in milliseconds.
  #[arg(long, default_value_t = 1000)]
  io_timeout_ms: u64,
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_level = if cli.trace { "trace" } else { "warn" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env().add_directive(default_level.parse()?))
    .with_writer(io::stderr)
    .init();

  let text = std::fs::read_to_string(&cli.program)
    .with_context(|| format!("reading {}", cli.program.display()))?;
  let words = parse_program(&text)?;

  if cli.disassemble {
    print!("{}", disassemble(&words));
    return Ok(());
  }

  let name   = cli.program.file_stem().and_then(|s| s.to_str()).unwrap_or("program");
  let config = MachineConfig::named(name)
    .with_trace(cli.trace)
    .with_io_timeout(Duration::from_millis(cli.io_timeout_ms));
  let mut machine = Machine::new(words, config);

  for patch in &cli.poke {
    let (address, value) = parse_poke(patch)?;
    machine.poke(address, value)?;
  }
  if let Some(input) = &cli.input {
    machine.io().feed_all(parse_program(input)?)?;
  }

  let stdin   = io::stdin();
  let mut console = Console::new(stdin.lock(), io::stdout()).with_ascii(cli.ascii);
  let state = console.run(&mut machine)?;

  if cli.dump && state == RunState::Ended {
    eprintln!("{}", machine.dump_after_halt()?);
  }
  Ok(())
}

fn parse_poke(patch: &str) -> Result<(usize, Word)> {
  let mut parts = patch.splitn(2, '=');
  match (parts.next(), parts.next()) {
    (Some(address), Some(value)) => {
      let address = address.trim().parse().with_context(|| format!("bad address in `{}`", patch))?;
      let value   = value.trim().parse().with_context(|| format!("bad value in `{}`", patch))?;
      Ok((address, value))
    }
    _ => bail!("expected ADDRESS=VALUE, got `{}`", patch)
  }
}
