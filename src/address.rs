//! Addressing modes and the mode-tagged arguments of decoded instructions.

use std::convert::TryFrom;
use std::fmt::{Display, Formatter};

use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum_macros::{Display as StrumDisplay, EnumIter};

use crate::bytecode::Word;

/**
  How an argument is resolved. The discriminants are the decimal digits used in the encoded
  instruction, so the order the variants are listed below is significant.
*/
#[derive(
  StrumDisplay, EnumIter,  TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,      Eq, PartialEq,    Debug,          Hash
)]
#[repr(u8)]
pub enum Mode {
  /// The argument is an absolute address into memory.
  Position  = 0,
  /// The argument is the value itself.
  Immediate = 1,
  /// The argument is an address offset by the relative base.
  Relative  = 2,
}

impl Mode {
  pub fn digit(&self) -> Word {
    Into::<u8>::into(*self) as Word
  }

  /// Converts a single decimal mode digit into a `Mode`.
  pub fn from_digit(digit: Word) -> Option<Mode> {
    match u8::try_from(digit) {
      Ok(byte) => Mode::try_from(byte).ok(),
      Err(_e)  => None
    }
  }
}

impl Default for Mode {
  fn default() -> Self {
    Mode::Position
  }
}

/// A raw argument value as read from memory, together with the mode it is to be resolved in.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Argument {
  pub value : Word,
  pub mode  : Mode
}

impl Argument {
  pub fn new(value: Word, mode: Mode) -> Argument {
    Argument { value, mode }
  }

  pub fn position(value: Word) -> Argument {
    Argument::new(value, Mode::Position)
  }

  pub fn immediate(value: Word) -> Argument {
    Argument::new(value, Mode::Immediate)
  }

  pub fn relative(value: Word) -> Argument {
    Argument::new(value, Mode::Relative)
  }

  /**
    The address this argument refers to once the relative base is applied, or `None` for
    immediate arguments, which refer to no address at all. The result may be negative; the
    caller decides whether that is an error.
  */
  pub fn effective_address(&self, relative_base: Word) -> Option<Word> {
    match self.mode {
      Mode::Position  => Some(self.value),
      Mode::Relative  => Some(self.value.wrapping_add(relative_base)),
      Mode::Immediate => None
    }
  }
}

impl Display for Argument {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self.mode {
      Mode::Position  => write!(f, "M[{}]", self.value),
      Mode::Immediate => write!(f, "{}", self.value),
      Mode::Relative if self.value < 0 => write!(f, "M[rb-{}]", self.value.wrapping_neg()),
      Mode::Relative  => write!(f, "M[rb+{}]", self.value),
    }
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use strum::IntoEnumIterator;

  #[test]
  fn mode_digits_round_trip() {
    for mode in Mode::iter() {
      assert_eq!(Mode::from_digit(mode.digit()), Some(mode));
    }
    assert_eq!(Mode::from_digit(3), None);
    assert_eq!(Mode::from_digit(-1), None);
  }

  #[test]
  fn effective_address_applies_relative_base() {
    assert_eq!(Argument::position(7).effective_address(100), Some(7));
    assert_eq!(Argument::relative(-1).effective_address(100), Some(99));
    assert_eq!(Argument::immediate(7).effective_address(100), None);
  }

  #[test]
  fn arguments_display_their_mode() {
    assert_eq!(Argument::position(4).to_string(), "M[4]");
    assert_eq!(Argument::immediate(-3).to_string(), "-3");
    assert_eq!(Argument::relative(-1).to_string(), "M[rb-1]");
    assert_eq!(Argument::relative(2).to_string(), "M[rb+2]");
  }
}
