//! The run state of a machine. The state is shared between a machine and every handle to its
//! I/O channel, possibly across threads, so it lives in an atomic cell.

use std::convert::TryFrom;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use num_enum::{IntoPrimitive, TryFromPrimitive};

/**
  Lifecycle of a machine:
      ```
      Initialising ──run──> Running ──(no input)──> AwaitingInput ──resume──> Running
                               │
                               ├──(halt instruction)──> Ended
                               └──(forced halt)───────> Halted
      ```
  `Ended` and `Halted` are terminal. A forced halt is legal from any non-terminal state.
*/
#[derive(TryFromPrimitive, IntoPrimitive, Clone, Copy, Eq, PartialEq, Debug, Hash)]
#[repr(u8)]
pub enum RunState {
  Initialising,
  Running,
  AwaitingInput,
  Ended,
  Halted,
}

impl RunState {
  pub fn is_terminal(&self) -> bool {
    match self {
      RunState::Ended | RunState::Halted => true,
      _ => false
    }
  }
}

impl Display for RunState {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      RunState::Initialising  => write!(f, "initialising"),
      RunState::Running       => write!(f, "running"),
      RunState::AwaitingInput => write!(f, "awaiting input"),
      RunState::Ended         => write!(f, "ended"),
      RunState::Halted        => write!(f, "halted"),
    }
  }
}

#[derive(Clone, Debug)]
pub(crate) struct SharedState(Arc<AtomicU8>);

impl SharedState {
  pub fn new() -> SharedState {
    SharedState(Arc::new(AtomicU8::new(RunState::Initialising.into())))
  }

  pub fn get(&self) -> RunState {
    // Only `RunState` discriminants are ever stored.
    RunState::try_from(self.0.load(Ordering::SeqCst)).unwrap_or(RunState::Halted)
  }

  /// Moves from `from` to `to`. Fails, returning the actual state, if the state is not `from`.
  pub fn transition(&self, from: RunState, to: RunState) -> Result<(), RunState> {
    self.0
        .compare_exchange(from.into(), to.into(), Ordering::SeqCst, Ordering::SeqCst)
        .map(|_| ())
        .map_err(|actual| RunState::try_from(actual).unwrap_or(RunState::Halted))
  }

  /// Forces the state to `Halted` unless it is already terminal. Returns whether it changed.
  pub fn halt(&self) -> bool {
    let mut current = self.get();
    while !current.is_terminal() {
      match self.transition(current, RunState::Halted) {
        Ok(())      => return true,
        Err(actual) => current = actual
      }
    }
    false
  }
}
