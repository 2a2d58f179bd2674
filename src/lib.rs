/*!
  A small integer machine: programs are lists of signed 64 bit words that live in the same
  memory they may rewrite, and talk to the world only through an input and an output queue.

  A `Machine` runs either cooperatively, suspending and returning to its caller whenever it needs
  input that is not there yet, or on a dedicated worker thread, where input is a blocking wait.
  The `network` module builds multi-machine topologies on top of the I/O channels.

  ```ignore
  use intcode::{Machine, MachineConfig, RunState};

  let mut machine = Machine::from_text("3,9,8,9,10,9,4,9,99,-1,8", MachineConfig::named("cmp"))?;
  assert_eq!(machine.run()?, RunState::AwaitingInput);
  machine.io().feed(8)?;
  assert_eq!(machine.resume()?, RunState::Ended);
  assert_eq!(machine.output()?, vec![1]);
  ```
*/

#[macro_use] extern crate prettytable;
#[macro_use] extern crate lazy_static;

pub mod address;
pub mod bytecode;
pub mod channel;
pub mod config;
pub mod console;
pub mod error;
pub mod machine;
pub mod memory;
pub mod network;
pub mod state;

pub use address::{Argument, Mode};
pub use bytecode::{disassemble, parse_program, Instruction, Opcode, Word};
pub use channel::IoChannel;
pub use config::{ExecutionMode, MachineConfig};
pub use console::Console;
pub use error::{ConsoleError, Fault, MachineError, ProgramError, Queue};
pub use machine::{Machine, Step, Worker};
pub use memory::Memory;
pub use state::RunState;
