use std::fmt;

/// How an instruction interprets the 3-bit value that follows its opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
  /// The operand is the value itself.
  Literal,
  /// The operand is resolved through [`crate::operand::Combo`].
  Combo,
  /// The operand is read but has no effect.
  Ignored,
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
  /// Divides `A` by a power of two, truncating.
  ///
  /// | Operation | Semantics/RTL          | Assembly    |
  /// |-----------|------------------------|-------------|
  /// | Divide A  | `A ← A >> combo`       | `adv combo` |
  Adv = 0x0,

  /// Bitwise XOR of `B` with the literal operand.
  ///
  /// | Operation   | Semantics/RTL     | Assembly  |
  /// |-------------|-------------------|-----------|
  /// | XOR Literal | `B ← B ⊕ literal` | `bxl lit` |
  Bxl = 0x1,

  /// Keeps the lowest three bits of the combo operand.
  ///
  /// | Operation | Semantics/RTL       | Assembly    |
  /// |-----------|---------------------|-------------|
  /// | Set B     | `B ← combo mod 8`   | `bst combo` |
  Bst = 0x2,

  /// Jumps to an absolute position when `A` is non-zero.
  ///
  /// NOTE: the target is the literal itself, not an offset from `ip`.
  ///
  /// | Operation       | Semantics/RTL               | Assembly  |
  /// |-----------------|-----------------------------|-----------|
  /// | Jump If Nonzero | `if A ≠ 0 : ip ← literal`   | `jnz lit` |
  Jnz = 0x3,

  /// Bitwise XOR of `B` and `C`. Reads an operand for legacy reasons and
  /// ignores it.
  ///
  /// | Operation | Semantics/RTL | Assembly |
  /// |-----------|---------------|----------|
  /// | XOR C     | `B ← B ⊕ C`   | `bxc`    |
  Bxc = 0x4,

  /// Appends the lowest three bits of the combo operand to the output.
  ///
  /// | Operation | Semantics/RTL            | Assembly    |
  /// |-----------|--------------------------|-------------|
  /// | Output    | `out ← out ∥ combo mod 8` | `out combo` |
  Out = 0x5,

  /// | Operation | Semantics/RTL    | Assembly    |
  /// |-----------|------------------|-------------|
  /// | Divide B  | `B ← A >> combo` | `bdv combo` |
  Bdv = 0x6,

  /// | Operation | Semantics/RTL    | Assembly    |
  /// |-----------|------------------|-------------|
  /// | Divide C  | `C ← A >> combo` | `cdv combo` |
  Cdv = 0x7,
}

impl Opcode {
  pub fn mnemonic(self) -> &'static str {
    match self {
      Self::Adv => "adv",
      Self::Bxl => "bxl",
      Self::Bst => "bst",
      Self::Jnz => "jnz",
      Self::Bxc => "bxc",
      Self::Out => "out",
      Self::Bdv => "bdv",
      Self::Cdv => "cdv",
    }
  }

  pub fn operand_kind(self) -> OperandKind {
    match self {
      Self::Bxl | Self::Jnz => OperandKind::Literal,
      Self::Bxc => OperandKind::Ignored,
      Self::Adv | Self::Bst | Self::Out | Self::Bdv | Self::Cdv => OperandKind::Combo,
    }
  }
}

impl fmt::Display for Opcode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.mnemonic())
  }
}

/// The value does not name one of the eight opcodes
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("opcode `{0}` does not exist")]
pub struct UnknownOpcode(pub u8);

impl TryFrom<u8> for Opcode {
  type Error = UnknownOpcode;

  fn try_from(value: u8) -> Result<Self, Self::Error> {
    match value {
      0x0 => Ok(Self::Adv),
      0x1 => Ok(Self::Bxl),
      0x2 => Ok(Self::Bst),
      0x3 => Ok(Self::Jnz),
      0x4 => Ok(Self::Bxc),
      0x5 => Ok(Self::Out),
      0x6 => Ok(Self::Bdv),
      0x7 => Ok(Self::Cdv),
      other => Err(UnknownOpcode(other)),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn decodes_every_three_bit_value() {
    for value in 0..8u8 {
      let op = Opcode::try_from(value).unwrap();
      assert_eq!(op as u8, value);
    }
  }

  #[test]
  fn rejects_values_past_seven() {
    assert_eq!(Opcode::try_from(8), Err(UnknownOpcode(8)));
    assert_eq!(Opcode::try_from(0xFF), Err(UnknownOpcode(0xFF)));
  }

  #[test]
  fn operand_kinds() {
    assert_eq!(Opcode::Jnz.operand_kind(), OperandKind::Literal);
    assert_eq!(Opcode::Bxl.operand_kind(), OperandKind::Literal);
    assert_eq!(Opcode::Bxc.operand_kind(), OperandKind::Ignored);
    assert_eq!(Opcode::Out.operand_kind(), OperandKind::Combo);
    assert_eq!(Opcode::Cdv.to_string(), "cdv");
  }
}
