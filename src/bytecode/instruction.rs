use std::fmt::{Display, Formatter};

use strum_macros::{Display as StrumDisplay, EnumIter};
use num_enum::{TryFromPrimitive, IntoPrimitive};

use crate::address::Argument;
use crate::bytecode::Word;

/**
  Opcodes of the virtual machine. The discriminants are the numeric opcodes as they appear in
  the two lowest decimal digits of an instruction word.
*/
#[derive(
  StrumDisplay, EnumIter, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,     Eq,               PartialEq,     Debug,    Hash
)]
#[repr(u8)]
pub enum Opcode {
  Add                =  1, // add( lhs, rhs, dest )
  Multiply           =  2, // multiply( lhs, rhs, dest )
  Input              =  3, // input( dest )
  Output             =  4, // output( source )
  JumpIfTrue         =  5, // jump_if_true( condition, target )
  JumpIfFalse        =  6, // jump_if_false( condition, target )
  LessThan           =  7, // less_than( lhs, rhs, dest )
  Equals             =  8, // equals( lhs, rhs, dest )
  AdjustRelativeBase =  9, // adjust_relative_base( offset )
  Halt               = 99, // halt
}

impl Opcode {
  pub fn code(&self) -> u8 {
    Into::<u8>::into(*self)
  }

  /// The number of argument words following the instruction word.
  pub fn arity(&self) -> usize {
    match self {
      | Opcode::Add
      | Opcode::Multiply
      | Opcode::LessThan
      | Opcode::Equals      => 3,

      | Opcode::JumpIfTrue
      | Opcode::JumpIfFalse => 2,

      | Opcode::Input
      | Opcode::Output
      | Opcode::AdjustRelativeBase => 1,

      Opcode::Halt          => 0
    }
  }

  /// Total words occupied by an instruction with this opcode.
  pub fn size(&self) -> usize {
    1 + self.arity()
  }
}

/// A decoded instruction bound to its arguments.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Instruction {
  Add                { lhs: Argument, rhs: Argument, dest: Argument },
  Multiply           { lhs: Argument, rhs: Argument, dest: Argument },
  LessThan           { lhs: Argument, rhs: Argument, dest: Argument },
  Equals             { lhs: Argument, rhs: Argument, dest: Argument },
  JumpIfTrue         { condition: Argument, target: Argument },
  JumpIfFalse        { condition: Argument, target: Argument },
  Input              { dest: Argument },
  Output             { source: Argument },
  AdjustRelativeBase { offset: Argument },
  Halt,
}

impl Instruction {
  /**
    Binds an opcode to its arguments. It is the caller's responsibility to supply at least
    `opcode.arity()` arguments; extra arguments are ignored.
  */
  pub fn new(opcode: Opcode, args: &[Argument]) -> Instruction {
    match opcode {
      Opcode::Add                => Instruction::Add      { lhs: args[0], rhs: args[1], dest: args[2] },
      Opcode::Multiply           => Instruction::Multiply { lhs: args[0], rhs: args[1], dest: args[2] },
      Opcode::LessThan           => Instruction::LessThan { lhs: args[0], rhs: args[1], dest: args[2] },
      Opcode::Equals             => Instruction::Equals   { lhs: args[0], rhs: args[1], dest: args[2] },
      Opcode::JumpIfTrue         => Instruction::JumpIfTrue  { condition: args[0], target: args[1] },
      Opcode::JumpIfFalse        => Instruction::JumpIfFalse { condition: args[0], target: args[1] },
      Opcode::Input              => Instruction::Input { dest: args[0] },
      Opcode::Output             => Instruction::Output { source: args[0] },
      Opcode::AdjustRelativeBase => Instruction::AdjustRelativeBase { offset: args[0] },
      Opcode::Halt               => Instruction::Halt,
    }
  }

  pub fn opcode(&self) -> Opcode {
    match self {
      Instruction::Add { .. }                => Opcode::Add,
      Instruction::Multiply { .. }           => Opcode::Multiply,
      Instruction::LessThan { .. }           => Opcode::LessThan,
      Instruction::Equals { .. }             => Opcode::Equals,
      Instruction::JumpIfTrue { .. }         => Opcode::JumpIfTrue,
      Instruction::JumpIfFalse { .. }        => Opcode::JumpIfFalse,
      Instruction::Input { .. }              => Opcode::Input,
      Instruction::Output { .. }             => Opcode::Output,
      Instruction::AdjustRelativeBase { .. } => Opcode::AdjustRelativeBase,
      Instruction::Halt                      => Opcode::Halt,
    }
  }

  /// The arguments in encoding order.
  pub fn arguments(&self) -> Vec<Argument> {
    match *self {
      | Instruction::Add      { lhs, rhs, dest }
      | Instruction::Multiply { lhs, rhs, dest }
      | Instruction::LessThan { lhs, rhs, dest }
      | Instruction::Equals   { lhs, rhs, dest } => vec![lhs, rhs, dest],

      | Instruction::JumpIfTrue  { condition, target }
      | Instruction::JumpIfFalse { condition, target } => vec![condition, target],

      Instruction::Input { dest }                => vec![dest],
      Instruction::Output { source }             => vec![source],
      Instruction::AdjustRelativeBase { offset } => vec![offset],
      Instruction::Halt                          => vec![],
    }
  }

  pub fn size(&self) -> usize {
    self.opcode().size()
  }

  /// The instruction word this instruction was (or would be) decoded from.
  pub fn instruction_word(&self) -> Word {
    let modes: Vec<_> = self.arguments().iter().map(|a| a.mode).collect();
    super::encode(self.opcode(), &modes)
  }
}

impl Display for Instruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let args = self.arguments();
    match args.is_empty() {

      true  => write!(f, "{}", self.opcode()),

      false => {
        write!(
          f,
          "{}({})",
          self.opcode(),
          args.iter()
              .map(Argument::to_string)
              .collect::<Vec<String>>()
              .join(", ")
        )
      }

    }
  }
}
