//! Emulator for a tiny 3-bit register machine, plus an inverse search that
//! finds the seed making a program print its own tape.
//!
//! The machine has three unbounded registers (`A`, `B`, `C`), eight opcodes,
//! and a single append-only output. Tapes are lists of values in `0..8`
//! read as opcode/operand pairs.

pub mod disasm;
pub mod opcode;
pub mod operand;
pub mod parse;
pub mod solver;
pub mod tape;
pub mod vm;

pub use parse::Debugger;
pub use solver::solve_minimal_self_reproducing_seed;
pub use tape::{Program, Tape};
pub use vm::{execute, Execution, Registers};
