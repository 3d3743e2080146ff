use std::fmt;

/// A read-only sequence of instruction values
pub trait Tape {
  fn values(&self) -> &[u8];
}

impl Tape for [u8] {
  fn values(&self) -> &[u8] {
    self
  }
}

impl Tape for Vec<u8> {
  fn values(&self) -> &[u8] {
    self
  }
}

/// Reasons a sequence of values is not a well-formed program
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
  #[error("program has odd length {0}, every opcode needs an operand")]
  OddLength(usize),

  #[error("value `{value}` at position {index} does not fit in 3 bits")]
  ValueOutOfRange { index: usize, value: u8 },
}

/// A `Program` is a validated tape: even length, every value in `0..8`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
  values: Vec<u8>,
}

impl Program {
  pub fn new(values: Vec<u8>) -> Result<Self, Error> {
    if let Some((index, &value)) = values.iter().enumerate().find(|(_, v)| **v > 7) {
      return Err(Error::ValueOutOfRange { index, value });
    }
    if values.len() % 2 != 0 {
      return Err(Error::OddLength(values.len()));
    }
    Ok(Self { values })
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }
}

impl TryFrom<Vec<u8>> for Program {
  type Error = Error;

  fn try_from(values: Vec<u8>) -> Result<Self, Self::Error> {
    Self::new(values)
  }
}

impl Tape for Program {
  fn values(&self) -> &[u8] {
    &self.values
  }
}

impl fmt::Display for Program {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write_joined(f, &self.values)
  }
}

/// Writes values separated by commas, the format both programs and outputs
/// use.
pub(crate) fn write_joined(f: &mut fmt::Formatter<'_>, values: &[u8]) -> fmt::Result {
  for (i, v) in values.iter().enumerate() {
    if i > 0 {
      f.write_str(",")?;
    }
    write!(f, "{v}")?;
  }
  Ok(())
}
