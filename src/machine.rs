//! The execution engine: a fetch-decode-execute loop over a self-modifiable memory, with
//! cooperative suspension on input starvation and an optional dedicated worker thread.

use std::fmt::{Display, Formatter};
use std::ops::Range;
use std::thread::{self, JoinHandle};

use prettytable::Table;
use string_cache::DefaultAtom;
use tracing::{debug, error, info, trace};

use crate::address::Argument;
use crate::bytecode::{decode, parse_program, Instruction, Word};
use crate::channel::IoChannel;
use crate::config::{ExecutionMode, MachineConfig};
use crate::error::{Fault, MachineError, ProgramError};
use crate::memory::{Memory, TABLE_DISPLAY_FORMAT};
use crate::state::RunState;

/// The result of executing a single instruction.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Step {
  /// The instruction executed; the machine can keep going.
  Continue,
  /// Input was needed but none was queued. The IP points at the input instruction again and the
  /// machine is `AwaitingInput`.
  Suspended,
  /// The halt instruction executed.
  Ended,
  /// The machine was forcibly halted while the instruction was waiting on input.
  Stopped,
}

/// Why an instruction did not complete.
enum Interrupt {
  Fault(Fault),
  Io(MachineError),
}

impl From<Fault> for Interrupt {
  fn from(fault: Fault) -> Self {
    Interrupt::Fault(fault)
  }
}

#[derive(Debug)]
pub struct Machine {
  config        : MachineConfig,
  memory        : Memory,
  /// Instruction pointer, an index into memory.
  ip            : usize,
  relative_base : Word,
  io            : IoChannel,

  // Statistics
  steps         : u64,
  output_count  : usize,
  last_output   : Option<Word>,
}

impl Machine {

  // region Construction and inspection

  pub fn new(program: Vec<Word>, config: MachineConfig) -> Machine {
    let io     = IoChannel::new(&config);
    let memory = Memory::new(program).with_limit(config.max_memory);
    Machine {
      config,
      memory,
      ip            : 0,
      relative_base : 0,
      io,
      steps         : 0,
      output_count  : 0,
      last_output   : None,
    }
  }

  /// Parses comma separated program text and loads it.
  pub fn from_text(text: &str, config: MachineConfig) -> Result<Machine, ProgramError> {
    Ok(Machine::new(parse_program(text)?, config))
  }

  pub fn name(&self) -> &DefaultAtom {
    &self.config.name
  }

  pub fn config(&self) -> &MachineConfig {
    &self.config
  }

  pub fn state(&self) -> RunState {
    self.io.state()
  }

  pub(crate) fn set_default_input(&mut self, value: Option<Word>) {
    self.config.default_input = value;
  }

  /// The machine's I/O channel. Clone it to keep a handle that outlives a move of the machine.
  pub fn io(&self) -> &IoChannel {
    &self.io
  }

  pub fn memory(&self) -> &Memory {
    &self.memory
  }

  pub fn ip(&self) -> usize {
    self.ip
  }

  pub fn relative_base(&self) -> Word {
    self.relative_base
  }

  /// Number of instructions executed so far. A suspended input does not count.
  pub fn steps(&self) -> u64 {
    self.steps
  }

  /// Number of values the program has output so far, whether or not they were consumed.
  pub fn output_count(&self) -> usize {
    self.output_count
  }

  pub fn last_output(&self) -> Option<Word> {
    self.last_output
  }

  /// Reads a memory cell. Cells beyond the end read as zero.
  pub fn peek(&self, address: usize) -> Word {
    self.memory.peek(address)
  }

  /**
    Patches a memory cell of a loaded program before it first runs, returning the previous
    contents. Once the machine has started, only the program itself may write its memory.
  */
  pub fn poke(&mut self, address: usize, value: Word) -> Result<Word, MachineError> {
    match self.state() {
      RunState::Initialising => {
        self.memory.poke(address, value).map_err(|fault| {
          MachineError::Fault {
            program     : self.config.name.clone(),
            ip          : self.ip,
            instruction : format!("poke M[{}] = {}", address, value),
            fault
          }
        })
      }
      state => Err(self.invalid_state("poke memory", state))
    }
  }

  /// Drains all queued output. Only legal once the program has ended.
  pub fn output(&self) -> Result<Vec<Word>, MachineError> {
    match self.state() {
      RunState::Ended => Ok(self.io.drain()),
      state => Err(self.invalid_state("read output", state))
    }
  }

  // endregion

  // region Lifecycle

  /// Starts execution from the beginning of memory. Only legal while `Initialising`.
  pub fn run(&mut self) -> Result<RunState, MachineError> {
    self.start()?;
    self.execute()
  }

  /**
    Continues execution. From `Initialising` this is `run`. From `AwaitingInput` the suspended
    input instruction is fetched again; if input is still missing the machine suspends again
    immediately. Resuming a terminated machine is an error.
  */
  pub fn resume(&mut self) -> Result<RunState, MachineError> {
    match self.state() {
      RunState::Initialising  => self.run(),
      RunState::Running       => self.execute(),
      RunState::AwaitingInput => {
        self.transition(RunState::AwaitingInput, RunState::Running, "resume")?;
        debug!(program = %self.config.name, ip = self.ip, "resumed");
        self.execute()
      }
      state => Err(self.invalid_state("resume", state))
    }
  }

  /// Feeds `inputs`, resumes, and returns whatever output is queued afterwards.
  pub fn run_with(&mut self, inputs: &[Word]) -> Result<Vec<Word>, MachineError> {
    self.io.feed_all(inputs.iter().copied())?;
    self.resume()?;
    Ok(self.io.drain())
  }

  /**
    Forcibly terminates the machine. Idempotent, and legal from any state; a terminal machine is
    left as it is. Returns whether the machine was halted by this call.
  */
  pub fn halt(&self, silent: bool) -> bool {
    let halted = self.io.halt();
    if halted {
      match silent {
        true  => debug!(program = %self.config.name, ip = self.ip, "halted"),
        false => info!(program = %self.config.name, ip = self.ip, steps = self.steps, "halted"),
      }
    }
    halted
  }

  fn start(&mut self) -> Result<(), MachineError> {
    self.transition(RunState::Initialising, RunState::Running, "run")?;
    self.ip            = 0;
    self.relative_base = 0;
    debug!(program = %self.config.name, words = self.memory.len(), "started");
    Ok(())
  }

  fn transition(&self, from: RunState, to: RunState, operation: &'static str) -> Result<(), MachineError> {
    self.io
        .shared_state()
        .transition(from, to)
        .map_err(|state| self.invalid_state(operation, state))
  }

  fn invalid_state(&self, operation: &'static str, state: RunState) -> MachineError {
    MachineError::InvalidState { program: self.config.name.clone(), operation, state }
  }

  // endregion

  // region Fetch-decode-execute

  fn execute(&mut self) -> Result<RunState, MachineError> {
    while self.state() == RunState::Running {
      self.cycle()?;
    }
    let state = self.state();
    debug!(program = %self.config.name, ip = self.ip, steps = self.steps, %state, "returning control");
    Ok(state)
  }

  /**
    Executes exactly one instruction, starting the machine first if it is `Initialising` and
    resuming it if it is `AwaitingInput`.
  */
  pub fn step(&mut self) -> Result<Step, MachineError> {
    match self.state() {
      RunState::Initialising  => self.start()?,
      RunState::AwaitingInput => self.transition(RunState::AwaitingInput, RunState::Running, "step")?,
      RunState::Running       => {}
      state => return Err(self.invalid_state("step", state))
    }
    self.cycle()
  }

  fn cycle(&mut self) -> Result<Step, MachineError> {
    let start = self.ip;
    if start >= self.memory.len() {
      return Err(self.fail(start, None, Fault::RanOffEnd));
    }

    let instruction = match decode(&self.memory, start) {
      Ok(instruction) => instruction,
      Err(fault)      => return Err(self.fail(start, None, fault))
    };
    // The IP moves past the instruction before it executes, so jumps and self-modification
    // see the machine as the next instruction would.
    self.ip = start + instruction.size();

    if self.config.trace {
      trace!(program = %self.config.name, ip = start, rb = self.relative_base, "{}", instruction);
    }

    let step = match self.execute_instruction(instruction) {
      Ok(step)                       => step,
      Err(Interrupt::Fault(fault))   => return Err(self.fail(start, Some(instruction), fault)),
      Err(Interrupt::Io(io_error))   => {
        // Input timed out. Rewind so the input is replayed when the caller resumes.
        self.ip = start;
        return Err(io_error);
      }
    };

    let step = match step {

      Step::Suspended => {
        self.ip = start;
        match self.io.shared_state().transition(RunState::Running, RunState::AwaitingInput) {
          Ok(())  => {
            debug!(program = %self.config.name, ip = start, "suspended awaiting input");
            Step::Suspended
          }
          Err(_halted) => Step::Stopped
        }
      }

      Step::Ended => {
        self.steps += 1;
        match self.io.shared_state().transition(RunState::Running, RunState::Ended) {
          Ok(())  => {
            debug!(program = %self.config.name, ip = start, steps = self.steps, "ended");
            Step::Ended
          }
          Err(_halted) => Step::Stopped
        }
      }

      Step::Stopped => {
        self.ip = start;
        Step::Stopped
      }

      Step::Continue => {
        self.steps += 1;
        Step::Continue
      }

    };

    #[cfg(feature = "trace_computation")]
    {
      if self.config.trace {
        trace!("\n{}", self);
      }
    }

    Ok(step)
  }

  fn execute_instruction(&mut self, instruction: Instruction) -> Result<Step, Interrupt> {
    let rb = self.relative_base;

    match instruction {

      Instruction::Add { lhs, rhs, dest } => {
        let value = self.memory.load(lhs, rb)?.wrapping_add(self.memory.load(rhs, rb)?);
        self.memory.store(dest, rb, value)?;
      }

      Instruction::Multiply { lhs, rhs, dest } => {
        let value = self.memory.load(lhs, rb)?.wrapping_mul(self.memory.load(rhs, rb)?);
        self.memory.store(dest, rb, value)?;
      }

      Instruction::LessThan { lhs, rhs, dest } => {
        let value = (self.memory.load(lhs, rb)? < self.memory.load(rhs, rb)?) as Word;
        self.memory.store(dest, rb, value)?;
      }

      Instruction::Equals { lhs, rhs, dest } => {
        let value = (self.memory.load(lhs, rb)? == self.memory.load(rhs, rb)?) as Word;
        self.memory.store(dest, rb, value)?;
      }

      Instruction::JumpIfTrue { condition, target } => {
        if self.memory.load(condition, rb)? != 0 {
          self.jump(target)?;
        }
      }

      Instruction::JumpIfFalse { condition, target } => {
        if self.memory.load(condition, rb)? == 0 {
          self.jump(target)?;
        }
      }

      Instruction::Input { dest } => {
        let value = match self.read_input()? {
          Some(value) => value,
          None if self.state() == RunState::Running => return Ok(Step::Suspended),
          None        => return Ok(Step::Stopped)
        };
        self.memory.store(dest, rb, value)?;
      }

      Instruction::Output { source } => {
        let value = self.memory.load(source, rb)?;
        self.io.emit(value).map_err(Interrupt::Io)?;
        self.output_count += 1;
        self.last_output   = Some(value);
      }

      Instruction::AdjustRelativeBase { offset } => {
        self.relative_base = rb.wrapping_add(self.memory.load(offset, rb)?);
      }

      Instruction::Halt => return Ok(Step::Ended),

    }

    Ok(Step::Continue)
  }

  fn jump(&mut self, target: Argument) -> Result<(), Fault> {
    let word = self.memory.load(target, self.relative_base)?;
    match Memory::address(word) {
      Ok(address) if address < self.memory.len() => {
        self.ip = address;
        Ok(())
      }
      _ => Err(Fault::JumpOutOfBounds(word))
    }
  }

  /**
    Takes the next input value. `None` means there is none to be had: the queue is empty in
    cooperative mode, or the machine was halted while a worker waited on the queue.
  */
  fn read_input(&mut self) -> Result<Option<Word>, Interrupt> {
    if let Some(value) = self.io.try_input() {
      return Ok(Some(value));
    }
    if let Some(value) = self.config.default_input {
      return Ok(Some(value));
    }

    match self.config.mode {

      ExecutionMode::Cooperative => Ok(None),

      ExecutionMode::Worker => {
        match self.io.wait_input() {
          Ok(value)                        => Ok(Some(value)),
          Err(MachineError::Closed { .. }) => Ok(None),
          Err(e)                           => Err(Interrupt::Io(e))
        }
      }

    }
  }

  /// Wraps a fault with the program context. A faulted machine is halted.
  fn fail(&self, ip: usize, instruction: Option<Instruction>, fault: Fault) -> MachineError {
    self.io.halt();
    let instruction = match instruction {
      Some(instruction) => instruction.to_string(),
      None              => format!("word {}", self.memory.peek(ip)),
    };
    MachineError::Fault { program: self.config.name.clone(), ip, instruction, fault }
  }

  // endregion

  // region Worker mode

  /**
    Moves the machine onto a dedicated thread in worker mode and starts (or resumes) it there.
    Input becomes a blocking wait on the channel. The returned `Worker` keeps a handle to the
    I/O channel; dropping it halts the machine and joins the thread.
  */
  pub fn spawn(mut self) -> Result<Worker, MachineError> {
    let state = self.state();
    if state.is_terminal() {
      return Err(self.invalid_state("spawn", state));
    }
    self.config.mode = ExecutionMode::Worker;

    let name   = self.config.name.clone();
    let io     = self.io.clone();
    let handle = thread::Builder::new()
      .name(name.to_string())
      .spawn(move || self.work())?;

    Ok(Worker { name, io, handle: Some(handle) })
  }

  fn work(mut self) -> Result<Machine, MachineError> {
    loop {
      match self.resume() {

        Ok(_state) => return Ok(self),

        Err(e) if e.fault().is_some() => {
          error!(program = %self.config.name, error = %e, "worker failed");
          return Err(e);
        }

        // Halted while waiting, or between a wait timing out and the next resume.
        Err(_e) if self.state().is_terminal() => return Ok(self),

        Err(e) if e.is_idle() => {
          trace!(program = %self.config.name, "idle, still waiting for input");
        }

        Err(e) => {
          error!(program = %self.config.name, error = %e, "worker failed");
          return Err(e);
        }

      }
    }
  }

  // endregion

  // region Display methods

  /// The whole of memory as a table, with the IP highlighted.
  pub fn dump(&self) -> String {
    self.dump_range(0..self.memory.len())
  }

  pub fn dump_range(&self, range: Range<usize>) -> String {
    self.memory.table(range, Some(self.ip)).to_string()
  }

  /// The memory following the executed halt instruction, usually the program's data.
  pub fn dump_after_halt(&self) -> Result<String, MachineError> {
    match self.state() {
      RunState::Ended => Ok(self.dump_range(self.ip..self.memory.len())),
      state => Err(self.invalid_state("dump memory after halt", state))
    }
  }

  fn register_table(&self) -> Table {
    let mut table = Table::new();

    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Register", ubl->"Contents"]);
    table.add_row(row![r->"IP =",      self.ip]);
    table.add_row(row![r->"RB =",      self.relative_base]);
    table.add_row(row![r->"Steps =",   self.steps]);
    table.add_row(row![r->"Outputs =", self.output_count]);
    table.add_row(row![r->"Input =",   self.io.input_len()]);

    table
  }

  // endregion
}

impl Display for Machine {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let r_table = self.register_table();
    let m_table = self.memory.table(self.ip.saturating_sub(4)..self.ip + 12, Some(self.ip));

    let mut combined_table = table!([r_table, m_table]);

    combined_table.set_titles(row![ub->"Registers", ub->"Memory"]);
    combined_table.set_format(*TABLE_DISPLAY_FORMAT);

    write!(f, "Program: {}\tState: {}\n{}", self.config.name, self.state(), combined_table)
  }
}

/// A machine running on its own thread.
pub struct Worker {
  name   : DefaultAtom,
  io     : IoChannel,
  handle : Option<JoinHandle<Result<Machine, MachineError>>>,
}

impl Worker {
  pub fn name(&self) -> &DefaultAtom {
    &self.name
  }

  pub fn io(&self) -> &IoChannel {
    &self.io
  }

  pub fn state(&self) -> RunState {
    self.io.state()
  }

  pub fn halt(&self) -> bool {
    self.io.halt()
  }

  /**
    Waits for the machine to end or be halted and hands it back. A worker blocked on input keeps
    waiting until input arrives or it is halted.
  */
  pub fn join(mut self) -> Result<Machine, MachineError> {
    match self.handle.take() {
      Some(handle) => {
        handle
          .join()
          .unwrap_or_else(|_| Err(MachineError::WorkerPanicked { program: self.name.clone() }))
      }
      None => Err(MachineError::WorkerPanicked { program: self.name.clone() })
    }
  }
}

impl Drop for Worker {
  fn drop(&mut self) {
    if let Some(handle) = self.handle.take() {
      self.io.halt();
      let _ = handle.join();
    }
  }
}
