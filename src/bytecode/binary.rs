/*!
  This module is responsible for the encoding and decoding of instruction words.
*/
use std::convert::TryFrom;

use super::{Instruction, Opcode, Word};
use crate::address::{Argument, Mode};
use crate::error::Fault;
use crate::memory::Memory;

// Powers of ten selecting the mode digit of arguments 0, 1, and 2.
const MODE_PLACES: [Word; 3] = [100, 1_000, 10_000];

/// Extracts the opcode from the two lowest decimal digits of an instruction word.
fn opcode_of(word: Word) -> Result<Opcode, Fault> {
  let code = u8::try_from(word % 100).map_err(|_| Fault::UnknownOpcode(word))?;
  Opcode::try_from(code).map_err(|_| Fault::UnknownOpcode(word))
}

/// The addressing mode of the `n`-th argument of an instruction word.
pub fn mode_of(word: Word, n: usize) -> Result<Mode, Fault> {
  let digit = (word / MODE_PLACES[n]) % 10;
  Mode::from_digit(digit).ok_or(Fault::InvalidMode { word, digit })
}

/**
  Decodes the instruction starting at `ip`. Only the `1 + arity` words of the instruction are
  read. Reading past the end of memory sees zeros but does not grow memory, as the instruction
  has not executed yet.
*/
pub fn decode(memory: &Memory, ip: usize) -> Result<Instruction, Fault> {
  let word   = memory.peek(ip);
  let opcode = opcode_of(word)?;

  let mut args: Vec<Argument> = Vec::with_capacity(opcode.arity());
  for n in 0..opcode.arity() {
    args.push(Argument::new(memory.peek(ip + 1 + n), mode_of(word, n)?));
  }

  Ok(Instruction::new(opcode, &args))
}

/**
  Encodes an opcode and the modes of its arguments into an instruction word. Modes beyond the
  opcode's arity are ignored.
*/
pub fn encode(opcode: Opcode, modes: &[Mode]) -> Word {
  modes.iter()
       .take(opcode.arity())
       .zip(MODE_PLACES.iter())
       .fold(opcode.code() as Word, |word, (mode, place)| word + mode.digit() * place)
}
