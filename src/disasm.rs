//! Human-readable listings of a tape, one instruction per line.

use std::fmt::{self, Write};

use crate::opcode::{Opcode, OperandKind};
use crate::operand::Combo;
use crate::tape::Tape;

/// A single decoded opcode/operand pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
  pub opcode: Opcode,
  pub operand: u8,
}

impl fmt::Display for Instruction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.opcode.operand_kind() {
      OperandKind::Ignored => write!(f, "{}", self.opcode),
      OperandKind::Literal => write!(f, "{} {}", self.opcode, self.operand),
      OperandKind::Combo => match Combo::try_from(self.operand) {
        Ok(combo) => write!(f, "{} {combo}", self.opcode),
        Err(_) => write!(f, "{} <invalid>", self.opcode),
      },
    }
  }
}

/// A line of a listing: either an instruction or a value that is not an
/// opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line {
  Instruction(Instruction),
  Unknown { value: u8, operand: u8 },
}

impl fmt::Display for Line {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Instruction(instruction) => fmt::Display::fmt(instruction, f),
      Self::Unknown { value, operand } => write!(f, ".data {value}, {operand}"),
    }
  }
}

/// Decodes every full pair of `tape`, keyed by its instruction pointer. A
/// trailing unpaired value is skipped, the machine halts before it.
pub fn disassemble<T>(tape: &T) -> Vec<(usize, Line)>
where
  T: Tape + ?Sized,
{
  tape
    .values()
    .chunks_exact(2)
    .enumerate()
    .map(|(i, pair)| {
      let (value, operand) = (pair[0], pair[1]);
      let line = match Opcode::try_from(value) {
        Ok(opcode) => Line::Instruction(Instruction { opcode, operand }),
        Err(_) => Line::Unknown { value, operand },
      };
      (i * 2, line)
    })
    .collect()
}

pub fn listing<T>(tape: &T) -> String
where
  T: Tape + ?Sized,
{
  let mut out = String::new();
  for (ip, line) in disassemble(tape) {
    // writing into a String cannot fail
    let _ = writeln!(out, "{ip:>3}: {line}");
  }
  out
}
