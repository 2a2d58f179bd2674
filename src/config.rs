//! Per-machine configuration, fixed at construction.

use std::time::Duration;

use string_cache::DefaultAtom;

use crate::bytecode::Word;

/// Bound for every blocking wait on an I/O channel.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(1);
/// Granularity at which blocking waits re-check whether the machine has terminated.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);
/// Number of words memory may grow to, 128 MiB worth.
pub const DEFAULT_MAX_MEMORY: usize = 1 << 24;

/// How a machine reacts to an empty input queue.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ExecutionMode {
  /// Suspend and return `AwaitingInput` to the caller, who feeds input and resumes.
  Cooperative,
  /// Block on the input queue, up to the I/O timeout. For machines on their own thread.
  Worker,
}

#[derive(Clone, Debug)]
pub struct MachineConfig {
  /// Identifies the program in logs and errors.
  pub name          : DefaultAtom,
  pub mode          : ExecutionMode,
  pub io_timeout    : Duration,
  pub poll_interval : Duration,
  /// Memory never grows past this many words. A program that addresses beyond it faults.
  pub max_memory    : usize,
  /// Value an Input instruction receives when the queue is empty, instead of waiting.
  pub default_input : Option<Word>,
  /// Log every executed instruction at `trace` level.
  pub trace         : bool,
}

impl Default for MachineConfig {
  fn default() -> Self {
    MachineConfig {
      name          : DefaultAtom::from("program"),
      mode          : ExecutionMode::Cooperative,
      io_timeout    : DEFAULT_IO_TIMEOUT,
      poll_interval : DEFAULT_POLL_INTERVAL,
      max_memory    : DEFAULT_MAX_MEMORY,
      default_input : None,
      trace         : false,
    }
  }
}

impl MachineConfig {
  pub fn named(name: &str) -> MachineConfig {
    MachineConfig::default().with_name(name)
  }

  pub fn with_name(mut self, name: &str) -> Self {
    self.name = DefaultAtom::from(name);
    self
  }

  pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
    self.mode = mode;
    self
  }

  pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
    self.io_timeout = timeout;
    self
  }

  pub fn with_poll_interval(mut self, interval: Duration) -> Self {
    self.poll_interval = interval;
    self
  }

  pub fn with_max_memory(mut self, words: usize) -> Self {
    self.max_memory = words;
    self
  }

  pub fn with_default_input(mut self, value: Option<Word>) -> Self {
    self.default_input = value;
    self
  }

  pub fn with_trace(mut self, trace: bool) -> Self {
    self.trace = trace;
    self
  }
}
