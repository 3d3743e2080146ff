use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use chronospatial::vm::{self, Limits};
use chronospatial::{disasm, solver, Debugger};

/// Run, invert, or list programs for the 3-bit chronospatial computer.
#[derive(Parser)]
#[command(name = "chronospatial", version, about)]
struct Args {
  /// Abort a forward run after this many instructions (0 = unlimited).
  #[arg(long, global = true, default_value_t = 10_000_000)]
  max_steps: u64,

  /// Log more (-v debug, -vv trace). `RUST_LOG` takes precedence.
  #[arg(short, long, global = true, action = clap::ArgAction::Count)]
  verbose: u8,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Run the program and print its output.
  Run {
    /// Debugger dump to read, `-` for stdin.
    input: PathBuf,
  },
  /// Print the smallest value of A that makes the program output itself.
  Solve {
    /// Debugger dump to read, `-` for stdin.
    input: PathBuf,
  },
  /// Print one instruction per line.
  Disasm {
    /// Debugger dump to read, `-` for stdin.
    input: PathBuf,
  },
}

fn main() -> Result<ExitCode> {
  let args = Args::parse();
  init_tracing(args.verbose);

  match args.command {
    Command::Run { input } => {
      let debugger = load(&input)?;
      let limits = Limits {
        max_steps: (args.max_steps > 0).then_some(args.max_steps),
        max_output: None,
      };
      let done = vm::execute_with_limits(debugger.registers, &debugger.program, limits)
        .with_context(|| format!("failed to run program from {}", input.display()))?;
      info!(registers = ?done.registers, "halted");
      println!("{done}");
    }
    Command::Solve { input } => {
      let debugger = load(&input)?;
      match solver::solve_minimal_self_reproducing_seed(&debugger.program)
        .with_context(|| format!("failed to search program from {}", input.display()))?
      {
        Some(seed) => println!("{seed}"),
        None => {
          println!("no solution");
          return Ok(ExitCode::FAILURE);
        }
      }
    }
    Command::Disasm { input } => {
      let debugger = load(&input)?;
      print!("{}", disasm::listing(&debugger.program));
    }
  }
  Ok(ExitCode::SUCCESS)
}

fn init_tracing(verbose: u8) {
  let directive = log_directive(verbose, std::env::var(EnvFilter::DEFAULT_ENV).ok());
  let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("warn"));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(io::stderr)
    .init();
}

// a non-empty `RUST_LOG` wins over `-v`
fn log_directive(verbose: u8, env: Option<String>) -> String {
  if let Some(directive) = env.filter(|d| !d.trim().is_empty()) {
    return directive;
  }
  let level = match verbose {
    0 => "warn",
    1 => "debug",
    _ => "trace",
  };
  level.to_owned()
}

fn load(path: &Path) -> Result<Debugger> {
  let text = if path == Path::new("-") {
    let mut text = String::new();
    io::stdin()
      .read_to_string(&mut text)
      .context("failed to read stdin")?;
    text
  } else {
    fs::read_to_string(path).with_context(|| format!("failed to open {}", path.display()))?
  };
  text
    .parse()
    .with_context(|| format!("failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn verbosity_picks_level() {
    assert_eq!(log_directive(0, None), "warn");
    assert_eq!(log_directive(1, None), "debug");
    assert_eq!(log_directive(3, None), "trace");
  }

  #[test]
  fn rust_log_takes_precedence() {
    let env = Some("chronospatial=info".to_owned());
    assert_eq!(log_directive(2, env), "chronospatial=info");
    assert_eq!(log_directive(1, Some("  ".to_owned())), "debug");
  }

  #[test]
  fn cli_parses() {
    let args = Args::try_parse_from(["chronospatial", "-vv", "solve", "-"]).unwrap();
    assert_eq!(args.verbose, 2);
    assert_eq!(args.max_steps, 10_000_000);
    assert!(matches!(args.command, Command::Solve { input } if input == Path::new("-")));
  }
}
