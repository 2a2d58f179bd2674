//! Error types. `Fault`s are raised without context by the decoder and memory; the machine wraps
//! them in a `MachineError` naming the program and instruction before they leave the crate.

use std::fmt::{Display, Formatter};
use std::time::Duration;

use string_cache::DefaultAtom;
use thiserror::Error;

use crate::bytecode::Word;
use crate::state::RunState;

/// Fatal, non-recoverable conditions of a running program.
#[derive(Error, Debug, Clone, Copy, Eq, PartialEq)]
pub enum Fault {
  #[error("unknown opcode in instruction word {0}")]
  UnknownOpcode(Word),

  #[error("invalid addressing mode digit {digit} in instruction word {word}")]
  InvalidMode { word: Word, digit: Word },

  #[error("negative effective address {0}")]
  NegativeAddress(Word),

  #[error("address {0} is beyond the memory limit")]
  AddressOutOfRange(Word),

  #[error("immediate mode argument used as a store target")]
  ImmediateStore,

  #[error("jump target {0} is outside of memory")]
  JumpOutOfBounds(Word),

  #[error("instruction pointer ran past the end of memory without halting")]
  RanOffEnd,
}

/// Names one of the two queues of an I/O channel.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Queue {
  Input,
  Output
}

impl Display for Queue {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Queue::Input  => write!(f, "input"),
      Queue::Output => write!(f, "output"),
    }
  }
}

#[derive(Error, Debug)]
pub enum MachineError {
  #[error("{program}: fault at ip {ip} executing `{instruction}`: {fault}")]
  Fault {
    program     : DefaultAtom,
    ip          : usize,
    instruction : String,
    #[source]
    fault       : Fault,
  },

  #[error("{program}: cannot {operation} while {state}")]
  InvalidState {
    program   : DefaultAtom,
    operation : &'static str,
    state     : RunState,
  },

  #[error("{program}: nothing arrived on the {queue} queue within {waited:?}")]
  Timeout {
    program : DefaultAtom,
    queue   : Queue,
    waited  : Duration,
  },

  #[error("{program}: {queue} queue is empty and the machine is {state}")]
  Closed {
    program : DefaultAtom,
    queue   : Queue,
    state   : RunState,
  },

  #[error("failed to spawn worker: {0}")]
  Spawn(#[from] std::io::Error),

  #[error("{program}: worker thread panicked")]
  WorkerPanicked { program: DefaultAtom },
}

impl MachineError {
  /**
    True for the caller-recoverable I/O conditions: a wait that timed out, or a wait on a machine
    that has terminated. Orchestrators treat these as "nothing available right now."
  */
  pub fn is_idle(&self) -> bool {
    match self {
      MachineError::Timeout { .. } | MachineError::Closed { .. } => true,
      _ => false
    }
  }

  /// The fault behind this error, if it is one.
  pub fn fault(&self) -> Option<Fault> {
    match self {
      MachineError::Fault { fault, .. } => Some(*fault),
      _ => None
    }
  }
}

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum ProgramError {
  #[error("program text is empty")]
  Empty,

  #[error("malformed program text at offset {offset} near `{near}`")]
  Syntax { offset: usize, near: String },
}

#[derive(Error, Debug)]
pub enum ConsoleError {
  #[error(transparent)]
  Io(#[from] std::io::Error),

  #[error(transparent)]
  Machine(#[from] MachineError),

  #[error("bad input line: {0}")]
  Program(#[from] ProgramError),
}
