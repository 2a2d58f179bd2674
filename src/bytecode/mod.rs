/*!

  The machine has a single word size: a signed 64 bit integer. Code and data share one memory,
  and an instruction is nothing more than a run of consecutive words: the instruction word
  followed by one word per argument. The instruction word packs the opcode into its two lowest
  decimal digits and one addressing mode digit per argument above those:

  ```text
          1002  ->  [mode of arg 2][mode of arg 1][mode of arg 0][opcode:2]
                          0              1              0            02
  ```

  Missing mode digits are `0`, i.e. `Mode::Position`.

  Instructions are never stored in decoded form. Programs may rewrite their own code, so an
  `Instruction` is decoded fresh from memory at every fetch and discarded after it executes.
  Since the instruction set is closed, `Instruction` is an enum with one variant per operation
  carrying that operation's arguments, and execution is an exhaustive `match`.

*/

mod binary;
mod instruction;
mod assembly;

pub use binary::{decode, encode, mode_of};
pub use instruction::{Instruction, Opcode};
pub use assembly::{disassemble, parse_program};

/// The machine word. All memory cells, arguments, and I/O values are words.
pub type Word = i64;
