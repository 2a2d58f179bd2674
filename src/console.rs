//! Pass-through of a cooperative machine's I/O to host streams, for single machine runs driven
//! from a file or the terminal.

use std::io::{BufRead, Write};

use tracing::debug;

use crate::bytecode::{parse_program, Word};
use crate::error::ConsoleError;
use crate::machine::Machine;
use crate::state::RunState;

pub struct Console<R, W> {
  reader : R,
  writer : W,
  /// Treat values as ASCII text rather than numbers.
  ascii  : bool,
}

impl<R, W> Console<R, W>
  where R: BufRead, W: Write
{
  pub fn new(reader: R, writer: W) -> Console<R, W> {
    Console { reader, writer, ascii: false }
  }

  pub fn with_ascii(mut self, ascii: bool) -> Self {
    self.ascii = ascii;
    self
  }

  pub fn into_writer(self) -> W {
    self.writer
  }

  /**
    Runs the machine to completion. Output is written as it is produced, and each time the
    machine awaits input one line is read and fed to it. End of input while the machine is
    waiting halts the machine.
  */
  pub fn run(&mut self, machine: &mut Machine) -> Result<RunState, ConsoleError> {
    loop {
      let state = machine.resume()?;
      self.write_output(machine)?;

      match state {
        RunState::AwaitingInput => {
          if !self.read_input(machine)? {
            debug!(program = %machine.name(), "end of input");
            machine.halt(true);
            return Ok(machine.state());
          }
        }
        state => return Ok(state)
      }
    }
  }

  fn write_output(&mut self, machine: &Machine) -> Result<(), ConsoleError> {
    for value in machine.io().drain() {
      match self.ascii {
        true  => self.write_ascii(value)?,
        false => writeln!(self.writer, "{}", value)?,
      }
    }
    self.writer.flush()?;
    Ok(())
  }

  fn write_ascii(&mut self, value: Word) -> Result<(), ConsoleError> {
    match value {
      0..=127 => write!(self.writer, "{}", value as u8 as char)?,
      // Values outside ASCII are answers, not text.
      _       => writeln!(self.writer, "{}", value)?,
    }
    Ok(())
  }

  /// Reads one line and feeds it. Returns false at end of input.
  fn read_input(&mut self, machine: &Machine) -> Result<bool, ConsoleError> {
    let mut line = String::new();
    if self.reader.read_line(&mut line)? == 0 {
      return Ok(false);
    }

    match self.ascii {
      true  => {
        machine.io().feed_str(line.trim_end_matches(|c: char| c == '\n' || c == '\r'))?;
        machine.io().feed(10)?;
      }
      false => {
        if !line.trim().is_empty() {
          machine.io().feed_all(parse_program(&line)?)?;
        }
      }
    }
    Ok(true)
  }
}
