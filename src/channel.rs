/*!
  The I/O channel of a machine: an input queue the outside world feeds and the program reads,
  and an output queue the program writes and the outside world consumes.

  An `IoChannel` is a cheap handle. Clones share the same queues and the same run state, so an
  orchestrator can keep a handle after the machine itself has moved onto a worker thread. All
  communication with a machine goes through these queues; nothing outside the machine touches
  its memory once it runs.
*/

use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use string_cache::DefaultAtom;

use crate::bytecode::Word;
use crate::config::MachineConfig;
use crate::error::{MachineError, Queue};
use crate::state::{RunState, SharedState};

#[derive(Clone, Debug)]
pub struct IoChannel {
  program       : DefaultAtom,
  state         : SharedState,
  input         : (Sender<Word>, Receiver<Word>),
  output        : (Sender<Word>, Receiver<Word>),
  io_timeout    : Duration,
  poll_interval : Duration,
}

impl IoChannel {

  pub(crate) fn new(config: &MachineConfig) -> IoChannel {
    IoChannel {
      program       : config.name.clone(),
      state         : SharedState::new(),
      input         : unbounded(),
      output        : unbounded(),
      io_timeout    : config.io_timeout,
      poll_interval : config.poll_interval,
    }
  }

  pub fn program(&self) -> &DefaultAtom {
    &self.program
  }

  /// The run state of the owning machine.
  pub fn state(&self) -> RunState {
    self.state.get()
  }

  pub(crate) fn shared_state(&self) -> &SharedState {
    &self.state
  }

  pub fn io_timeout(&self) -> Duration {
    self.io_timeout
  }

  /**
    Forcibly terminates the owning machine. Safe to call from any thread and idempotent. A
    running machine stops before its next instruction, and anyone waiting on either queue sees
    `MachineError::Closed` once the queue is empty. Returns whether this call did the halting.
  */
  pub fn halt(&self) -> bool {
    self.state.halt()
  }

  // region Outside world side

  /// Appends a value to the input queue. Feeding a terminated machine is an error.
  pub fn feed(&self, value: Word) -> Result<(), MachineError> {
    let state = self.state();
    if state.is_terminal() {
      return Err(MachineError::InvalidState { program: self.program.clone(), operation: "feed", state });
    }
    self.input.0.send(value).map_err(|_| self.closed(Queue::Input))
  }

  pub fn feed_all<I>(&self, values: I) -> Result<(), MachineError>
    where I: IntoIterator<Item = Word>
  {
    for value in values {
      self.feed(value)?;
    }
    Ok(())
  }

  /// Feeds the bytes of `text` as individual words, for programs speaking ASCII.
  pub fn feed_str(&self, text: &str) -> Result<(), MachineError> {
    self.feed_all(text.bytes().map(Word::from))
  }

  pub fn has_input(&self) -> bool {
    !self.input.1.is_empty()
  }

  pub fn has_output(&self) -> bool {
    !self.output.1.is_empty()
  }

  pub fn input_len(&self) -> usize {
    self.input.1.len()
  }

  pub fn output_len(&self) -> usize {
    self.output.1.len()
  }

  /// Pops an output value if one is queued, without waiting.
  pub fn try_consume(&self) -> Option<Word> {
    self.output.1.try_recv().ok()
  }

  /// Pops an output value, waiting up to the I/O timeout for one to arrive.
  pub fn consume(&self) -> Result<Word, MachineError> {
    self.wait(&self.output.1, Queue::Output, self.io_timeout)
  }

  /// Pops up to `n` output values that are already queued, without waiting.
  pub fn consume_n(&self, n: usize) -> Vec<Word> {
    self.output.1.try_iter().take(n).collect()
  }

  /**
    Pops exactly `n` output values, waiting for them to arrive. The I/O timeout bounds the whole
    call, not each value.
  */
  pub fn await_output(&self, n: usize) -> Result<Vec<Word>, MachineError> {
    let deadline = Instant::now() + self.io_timeout;
    let mut values = Vec::with_capacity(n);
    while values.len() < n {
      let remaining = deadline.saturating_duration_since(Instant::now());
      values.push(self.wait(&self.output.1, Queue::Output, remaining)?);
    }
    Ok(values)
  }

  /// Pops everything currently in the output queue.
  pub fn drain(&self) -> Vec<Word> {
    self.output.1.try_iter().collect()
  }

  // endregion

  // region Machine side

  pub(crate) fn try_input(&self) -> Option<Word> {
    self.input.1.try_recv().ok()
  }

  pub(crate) fn wait_input(&self) -> Result<Word, MachineError> {
    self.wait(&self.input.1, Queue::Input, self.io_timeout)
  }

  pub(crate) fn emit(&self, value: Word) -> Result<(), MachineError> {
    self.output.0.send(value).map_err(|_| self.closed(Queue::Output))
  }

  // endregion

  fn closed(&self, queue: Queue) -> MachineError {
    MachineError::Closed { program: self.program.clone(), queue, state: self.state() }
  }

  /**
    Waits for a value on `receiver` in slices of the poll interval. Between slices the run state
    is checked: once the machine is terminal and the queue is empty, no value can ever arrive.
  */
  fn wait(&self, receiver: &Receiver<Word>, queue: Queue, timeout: Duration) -> Result<Word, MachineError> {
    let deadline = Instant::now() + timeout;
    loop {
      let remaining = deadline.saturating_duration_since(Instant::now());

      match receiver.recv_timeout(remaining.min(self.poll_interval)) {
        Ok(value) => return Ok(value),
        Err(RecvTimeoutError::Disconnected) => return Err(self.closed(queue)),
        Err(RecvTimeoutError::Timeout) => {}
      }

      if self.state().is_terminal() && receiver.is_empty() {
        return Err(self.closed(queue));
      }
      if Instant::now() >= deadline {
        return Err(MachineError::Timeout { program: self.program.clone(), queue, waited: timeout });
      }
    }
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use std::thread;

  fn channel() -> IoChannel {
    IoChannel::new(
      &MachineConfig::named("test")
        .with_io_timeout(Duration::from_millis(200))
        .with_poll_interval(Duration::from_millis(5))
    )
  }

  #[test]
  fn fed_values_are_read_in_order() {
    let io = channel();
    io.feed_all(vec![1, 2, 3]).unwrap();
    assert!(io.has_input());
    assert_eq!(io.input_len(), 3);
    assert_eq!(io.try_input(), Some(1));
    assert_eq!(io.wait_input().unwrap(), 2);
    assert_eq!(io.try_input(), Some(3));
    assert_eq!(io.try_input(), None);
  }

  #[test]
  fn consume_times_out_when_nothing_arrives() {
    let io = channel();
    let started = Instant::now();
    let error = io.consume().unwrap_err();
    assert!(matches!(error, MachineError::Timeout { queue: Queue::Output, .. }));
    assert!(error.is_idle());
    assert!(started.elapsed() >= Duration::from_millis(200));
  }

  #[test]
  fn halting_releases_waiters() {
    let io = channel();
    let waiter = {
      let io = io.clone();
      thread::spawn(move || io.consume())
    };
    assert!(io.halt());
    let result = waiter.join().unwrap();
    assert!(matches!(result, Err(MachineError::Closed { state: RunState::Halted, .. })));
    assert!(io.feed(1).is_err());
  }

  #[test]
  fn queued_output_survives_termination() {
    let io = channel();
    io.emit(7).unwrap();
    io.emit(8).unwrap();
    io.halt();
    assert_eq!(io.consume().unwrap(), 7);
    assert_eq!(io.consume_n(5), vec![8]);
    assert!(matches!(io.consume(), Err(MachineError::Closed { .. })));
  }

  #[test]
  fn await_output_collects_values_from_another_thread() {
    let io = channel();
    let producer = {
      let io = io.clone();
      thread::spawn(move || {
        for value in 0..3 {
          io.emit(value).unwrap();
        }
      })
    };
    assert_eq!(io.await_output(3).unwrap(), vec![0, 1, 2]);
    producer.join().unwrap();
  }

  #[test]
  fn feed_str_sends_bytes() {
    let io = channel();
    io.feed_str("A\n").unwrap();
    assert_eq!(io.try_input(), Some(65));
    assert_eq!(io.try_input(), Some(10));
  }
}
