//! The debugger dump format:
//!
//! ```text
//! Register A: 729
//! Register B: 0
//! Register C: 0
//!
//! Program: 0,1,5,4,3,0
//! ```

use std::str::FromStr;

use nom::{
  bytes::complete::tag,
  character::complete::{digit1, line_ending, multispace0},
  combinator::{all_consuming, map, map_res},
  multi::separated_list1,
  sequence::{delimited, preceded, separated_pair, terminated, tuple},
  Finish, IResult,
};

use crate::tape::{self, Program};
use crate::vm::{Register, Registers};

/// Initial machine state as read from a debugger dump
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Debugger {
  pub registers: Registers,
  pub program: Program,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
  #[error("malformed input on line {line}: {reason}")]
  Malformed { line: usize, reason: String },

  #[error(transparent)]
  Program(#[from] tape::Error),
}

impl FromStr for Debugger {
  type Err = Error;

  fn from_str(input: &str) -> Result<Self, Self::Err> {
    let (_, (registers, values)) = all_consuming(terminated(
      separated_pair(registers, line_ending, program_values),
      multispace0,
    ))(input)
    .finish()
    .map_err(|err: nom::error::Error<&str>| {
      let consumed = &input[..input.len() - err.input.len()];
      let rest: String = err.input.lines().next().unwrap_or("").chars().take(32).collect();
      Error::Malformed {
        line: consumed.matches('\n').count() + 1,
        reason: if rest.is_empty() {
          "unexpected end of input".to_owned()
        } else {
          format!("unexpected `{rest}`")
        },
      }
    })?;
    Ok(Self {
      registers,
      program: Program::new(values)?,
    })
  }
}

fn register<'i>(name: &'static str) -> impl FnMut(&'i str) -> IResult<&'i str, Register> {
  delimited(
    tuple((tag("Register "), tag(name), tag(": "))),
    map_res(digit1, str::parse::<Register>),
    line_ending,
  )
}

fn registers(input: &str) -> IResult<&str, Registers> {
  map(
    tuple((register("A"), register("B"), register("C"))),
    |(a, b, c)| Registers::new(a, b, c),
  )(input)
}

fn program_values(input: &str) -> IResult<&str, Vec<u8>> {
  preceded(
    tag("Program: "),
    separated_list1(tag(","), map_res(digit1, str::parse::<u8>)),
  )(input)
}
