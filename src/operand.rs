use std::fmt;

use crate::vm::{Register, Registers};

/// A decoded combo operand: a small literal or a reference to a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combo {
  Literal(u8),
  A,
  B,
  C,
}

/// Value `7` is reserved and never a valid combo operand
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("combo operand `{0}` is reserved")]
pub struct ReservedCombo(pub u8);

impl TryFrom<u8> for Combo {
  type Error = ReservedCombo;

  fn try_from(value: u8) -> Result<Self, Self::Error> {
    match value {
      0..=3 => Ok(Self::Literal(value)),
      4 => Ok(Self::A),
      5 => Ok(Self::B),
      6 => Ok(Self::C),
      other => Err(ReservedCombo(other)),
    }
  }
}

impl Combo {
  pub fn resolve(self, registers: &Registers) -> Register {
    match self {
      Self::Literal(v) => Register::from(v),
      Self::A => registers.a,
      Self::B => registers.b,
      Self::C => registers.c,
    }
  }
}

impl fmt::Display for Combo {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Literal(v) => write!(f, "{v}"),
      Self::A => f.write_str("A"),
      Self::B => f.write_str("B"),
      Self::C => f.write_str("C"),
    }
  }
}
