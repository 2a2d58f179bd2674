/*!
  Programs are exchanged as text: a comma separated list of signed integers. This module parses
  that text into the words of a program and, going the other way, renders memory as a human
  readable instruction listing.
*/

use nom::{
  character::complete::{
    char as one_char,
    digit1,
    multispace0
  },
  combinator::{all_consuming, map_res, opt, recognize},
  multi::separated_list,
  sequence::{delimited, pair},
  IResult
};

use super::{decode, Word};
use crate::error::ProgramError;
use crate::memory::Memory;

fn word_p(input: &str) -> IResult<&str, Word> {
  map_res(
    recognize(pair(opt(one_char('-')), digit1)),
    |out: &str| out.parse::<Word>()
  )(input)
}

fn program_p(input: &str) -> IResult<&str, Vec<Word>> {
  all_consuming(
    delimited(
      multispace0,
      separated_list(delimited(multispace0, one_char(','), multispace0), word_p),
      multispace0
    )
  )(input)
}

/// Parses comma separated program text into the words of the program.
pub fn parse_program(text: &str) -> Result<Vec<Word>, ProgramError> {
  match program_p(text) {

    Ok((_rest, words)) if words.is_empty() => Err(ProgramError::Empty),

    Ok((_rest, words)) => Ok(words),

    Err(nom::Err::Error((rest, _kind))) | Err(nom::Err::Failure((rest, _kind))) => {
      let offset = text.len() - rest.len();
      let near: String = rest.chars().take(16).collect();
      Err(ProgramError::Syntax { offset, near })
    }

    Err(nom::Err::Incomplete(_)) => Err(ProgramError::Syntax { offset: text.len(), near: String::new() }),

  }
}

/**
  Renders `words` as one line per instruction, prefixed by its address. Words that do not decode
  are rendered as `Data(n)` and skipped one at a time, so data regions following the code read
  naturally.
*/
pub fn disassemble(words: &[Word]) -> String {
  let memory = Memory::new(words.to_vec());
  let mut listing = String::new();
  let mut address = 0;

  while address < words.len() {
    match decode(&memory, address) {

      Ok(instruction) if address + instruction.size() <= words.len() => {
        listing.push_str(format!("{:04}  {}\n", address, instruction).as_str());
        address += instruction.size();
      }

      _ => {
        listing.push_str(format!("{:04}  Data({})\n", address, words[address]).as_str());
        address += 1;
      }

    }
  }

  listing
}
