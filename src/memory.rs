//! Program memory: a growable, zero-indexed vector of words holding both code and data.

use std::convert::TryFrom;
use std::fmt::Display;
use std::ops::Range;

use prettytable::{format as TableFormat, Table};

use crate::address::{Argument, Mode};
use crate::bytecode::Word;
use crate::config::DEFAULT_MAX_MEMORY;
use crate::error::Fault;

/**
  Memory grows on demand up to a limit. Any load or store beyond the current length first
  zero-extends the backing vector up to and including the target address; an address at or
  past the limit is a fault instead. Memory never shrinks, and the machine that owns it is its
  only reader and writer.
*/
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Memory {
  cells : Vec<Word>,
  limit : usize,
}

impl Memory {

  pub fn new(program: Vec<Word>) -> Memory {
    Memory { cells: program, limit: DEFAULT_MAX_MEMORY }
  }

  /// Caps growth at `limit` words. A program loaded longer than the limit keeps its cells.
  pub fn with_limit(mut self, limit: usize) -> Memory {
    self.limit = limit;
    self
  }

  pub fn limit(&self) -> usize {
    self.limit
  }

  pub fn len(&self) -> usize {
    self.cells.len()
  }

  pub fn is_empty(&self) -> bool {
    self.cells.is_empty()
  }

  pub fn as_slice(&self) -> &[Word] {
    &self.cells
  }

  /// Reads a cell without growing memory. Cells beyond the end read as zero.
  pub fn peek(&self, address: usize) -> Word {
    self.cells.get(address).copied().unwrap_or(0)
  }

  /// Converts a word into an address, rejecting negative values.
  pub fn address(word: Word) -> Result<usize, Fault> {
    usize::try_from(word).map_err(|_| Fault::NegativeAddress(word))
  }

  /// A mutable reference to the cell at `address`, growing memory as needed.
  fn cell_mut(&mut self, address: usize) -> Result<&mut Word, Fault> {
    if address >= self.cells.len() {
      if address >= self.limit {
        return Err(Fault::AddressOutOfRange(Word::try_from(address).unwrap_or(Word::MAX)));
      }
      self.cells.resize(address + 1, 0);
    }
    Ok(&mut self.cells[address])
  }

  /**
    Resolves an argument to its value. Immediate arguments are returned verbatim; position and
    relative arguments are dereferenced, growing memory if the address is past the end.
  */
  pub fn load(&mut self, argument: Argument, relative_base: Word) -> Result<Word, Fault> {
    match argument.effective_address(relative_base) {
      None       => Ok(argument.value),
      Some(word) => {
        let address = Memory::address(word)?;
        Ok(*self.cell_mut(address)?)
      }
    }
  }

  /**
    Writes `value` to the address an argument refers to and returns the previous contents of
    the cell. Immediate arguments refer to no address and cannot be stored to.
  */
  pub fn store(&mut self, argument: Argument, relative_base: Word, value: Word) -> Result<Word, Fault> {
    if argument.mode == Mode::Immediate {
      return Err(Fault::ImmediateStore);
    }
    let word    = argument.effective_address(relative_base).ok_or(Fault::ImmediateStore)?;
    let address = Memory::address(word)?;
    Ok(std::mem::replace(self.cell_mut(address)?, value))
  }

  /// Writes a cell directly by absolute address, growing memory as needed.
  pub fn poke(&mut self, address: usize, value: Word) -> Result<Word, Fault> {
    Ok(std::mem::replace(self.cell_mut(address)?, value))
  }

  // region Display methods

  /// A two column table of the cells in `range`, clamped to the current length.
  pub fn table(&self, range: Range<usize>, highlight: Option<usize>) -> Table {
    let end   = range.end.min(self.cells.len());
    let start = range.start.min(end);
    make_cell_table('M', &self.cells[start..end], highlight.map(|h| h.wrapping_sub(start)), start)
  }

  // endregion
}

pub(crate) fn make_cell_table<T>(name: char, cells: &[T], highlight: Option<usize>, start: usize)
  -> Table
  where T: Display
{
  let mut table = Table::new();

  table.set_format(*TABLE_DISPLAY_FORMAT);
  table.set_titles(row![ubr->"Address", ubl->"Contents"]);

  for (i, cell) in cells.iter().enumerate() {
    match Some(i) == highlight {

      true  => {
        table.add_row(row![r->format!("* --> {}[{}] =", name, i + start), format!("{}", cell)]);
      }

      false => {
        table.add_row(row![r->format!("{}[{}] =", name, i + start), format!("{}", cell)]);
      }

    } // end match on highlight
  } // end for
  table
}

lazy_static! {
  pub(crate) static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .separator(
        TableFormat::LinePosition::Bottom,
        TableFormat::LineSeparator::new('─', '┴', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}
