//! Inverse search for a seed that makes a program print itself.
//!
//! Programs of the expected shape consume three bits of `A` per loop and emit
//! one value per loop, so the low digits of the seed only influence the
//! earliest outputs. The search therefore fixes the seed one octal digit at a
//! time, most significant first, matching the tail of the program against the
//! tail of the output.

use rayon::prelude::*;
use tracing::{debug, trace, warn};

use crate::opcode::Opcode;
use crate::tape::{Program, Tape};
use crate::vm::{self, Limits, Register, Registers};

const DIGIT_BITS: u32 = 3;
const DIGITS: Register = 1 << DIGIT_BITS;

/// Ways a program can deviate from the single-loop layout the search assumes
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeWarning {
  #[error("program does not end with `jnz 0`")]
  NoTrailingLoop,

  #[error("program jumps before its final instruction")]
  InnerJump,

  #[error("expected exactly one `adv`, found {0}")]
  Shifts(usize),

  #[error("expected `adv 3`, found `adv {0}`")]
  ShiftWidth(u8),

  #[error("expected exactly one `out`, found {0}")]
  Outputs(usize),
}

/// Checks that `program` is one loop that shifts `A` right by three bits and
/// emits a single value per pass.
pub fn check_shape(program: &Program) -> Result<(), ShapeWarning> {
  let pairs: Vec<(Opcode, u8)> = program
    .values()
    .chunks_exact(2)
    .filter_map(|pair| Some((Opcode::try_from(pair[0]).ok()?, pair[1])))
    .collect();

  let Some((&last, body)) = pairs.split_last() else {
    return Err(ShapeWarning::NoTrailingLoop);
  };
  if last != (Opcode::Jnz, 0) {
    return Err(ShapeWarning::NoTrailingLoop);
  }
  if body.iter().any(|(op, _)| *op == Opcode::Jnz) {
    return Err(ShapeWarning::InnerJump);
  }
  let shifts: Vec<u8> = body
    .iter()
    .filter(|(op, _)| *op == Opcode::Adv)
    .map(|(_, operand)| *operand)
    .collect();
  match shifts[..] {
    [3] => {}
    [width] => return Err(ShapeWarning::ShiftWidth(width)),
    _ => return Err(ShapeWarning::Shifts(shifts.len())),
  }
  let outputs = body.iter().filter(|(op, _)| *op == Opcode::Out).count();
  if outputs != 1 {
    return Err(ShapeWarning::Outputs(outputs));
  }
  Ok(())
}

/// Find the smallest `A` such that running `program` with `A`, `B = 0` and
/// `C = 0` outputs exactly `program`.
///
/// Returns `Ok(None)` when no seed exists. A candidate that runs into an
/// invalid opcode or combo operand is dropped like any other mismatch; the
/// decode error is only returned when a whole level fails to match and at
/// least one of its candidates hit it.
pub fn solve_minimal_self_reproducing_seed(
  program: &Program,
) -> Result<Option<Register>, vm::Error> {
  let target = program.values();
  if target.is_empty() {
    return Ok(Some(0));
  }
  if let Err(warning) = check_shape(program) {
    warn!(%warning, "program shape is not a single shifting loop, search may come up empty");
  }

  let limits = probe_limits(target.len());
  // every entry of the frontier is a seed prefix shifted into place, one
  // level per matched digit
  let mut frontier: Vec<Register> = vec![0];

  for depth in 1..=target.len() {
    let suffix = &target[target.len() - depth..];
    let expansions: Vec<Expansion> = frontier
      .par_iter()
      .map(|&partial| expand(program, partial, suffix, limits))
      .collect();
    let decode_error = expansions.iter().find_map(|e| e.decode_error.clone());
    let matched: Vec<Register> = expansions.into_iter().flat_map(|e| e.matched).collect();
    debug!(
      depth,
      frontier = frontier.len(),
      matched = matched.len(),
      "expanded level"
    );

    if matched.is_empty() {
      if let Some(err) = decode_error {
        return Err(err);
      }
      debug!(depth, "frontier exhausted");
      return Ok(None);
    }
    if depth == target.len() {
      // the output cap equals the program length, so a full-length suffix
      // match is an exact match
      return Ok(matched.into_iter().min());
    }
    let before = matched.len();
    frontier = matched
      .into_iter()
      .filter_map(|candidate| candidate.checked_mul(DIGITS))
      .collect();
    if frontier.len() < before {
      warn!(
        depth,
        dropped = before - frontier.len(),
        "candidates no longer fit in a register"
      );
    }
    if frontier.is_empty() {
      debug!(depth, "frontier exhausted");
      break;
    }
  }
  Ok(None)
}

// a well-shaped program emits once per pass and passes once per digit
fn probe_limits(len: usize) -> Limits {
  let len = len as u64;
  Limits {
    max_steps: Some((len / 2 + 1) * (len + 2)),
    max_output: usize::try_from(len).ok(),
  }
}

struct Expansion {
  matched: Vec<Register>,
  // first decode error among the rejected candidates
  decode_error: Option<vm::Error>,
}

/// Tries every next digit below `partial` and keeps the candidates whose
/// output ends with `suffix`.
fn expand(program: &Program, partial: Register, suffix: &[u8], limits: Limits) -> Expansion {
  let mut expansion = Expansion {
    matched: Vec::new(),
    decode_error: None,
  };
  for digit in 0..DIGITS {
    // partial is a multiple of 8
    let candidate = partial | digit;
    match vm::execute_with_limits(Registers::new(candidate, 0, 0), program, limits) {
      Ok(done) if done.output.ends_with(suffix) => expansion.matched.push(candidate),
      Ok(_) => {}
      Err(err) if err.is_decode() => {
        trace!(candidate, %err, "candidate rejected");
        expansion.decode_error.get_or_insert(err);
      }
      // ran past the caps, A never shrank fast enough
      Err(_) => {}
    }
  }
  expansion
}

#[cfg(test)]
mod tests {
  use super::*;

  use proptest::prelude::*;

  fn program(values: &[u8]) -> Program {
    Program::new(values.to_vec()).unwrap()
  }

  fn reproduces(seed: Register, tape: &Program) -> bool {
    vm::execute(Registers::new(seed, 0, 0), tape)
      .map(|done| done.output == tape.values())
      .unwrap_or(false)
  }

  #[test]
  fn finds_minimal_seed() {
    let tape = program(&[0, 3, 5, 4, 3, 0]);
    let seed = solve_minimal_self_reproducing_seed(&tape).unwrap();
    assert_eq!(seed, Some(117440));
    assert!(reproduces(117440, &tape));
  }

  #[test]
  fn nothing_smaller_reproduces() {
    let tape = program(&[0, 3, 5, 4, 3, 0]);
    assert!((0..117440).all(|a| !reproduces(a, &tape)));
  }

  #[test]
  fn sixteen_value_programs() {
    #[rustfmt::skip]
    let cases: &[(&[u8], Register)] = &[
      (&[2, 4, 1, 1, 7, 5, 1, 5, 4, 0, 0, 3, 5, 5, 3, 0], 164541160582845),
      (&[2, 4, 1, 3, 7, 5, 0, 3, 1, 5, 4, 4, 5, 5, 3, 0], 236539226447469),
      (&[2, 4, 1, 2, 7, 5, 4, 5, 0, 3, 1, 7, 5, 5, 3, 0], 190384615275535),
    ];
    for (values, expected) in cases {
      let tape = program(values);
      assert_eq!(check_shape(&tape), Ok(()));
      let seed = solve_minimal_self_reproducing_seed(&tape).unwrap();
      assert_eq!(seed, Some(*expected));
      assert!(reproduces(*expected, &tape));
    }
  }

  #[test]
  fn empty_program_is_reproduced_by_zero() {
    assert_eq!(solve_minimal_self_reproducing_seed(&program(&[])), Ok(Some(0)));
  }

  #[test]
  fn no_solution() {
    // `out 0; jnz 0` can only ever print zeros
    let tape = program(&[5, 0, 3, 0]);
    assert_eq!(solve_minimal_self_reproducing_seed(&tape), Ok(None));
  }

  #[test]
  fn decode_error_on_every_candidate() {
    let tape = program(&[0, 3, 5, 7, 3, 0]);
    assert_eq!(
      solve_minimal_self_reproducing_seed(&tape),
      Err(vm::Error::InvalidComboOperand { ip: 2, value: 7 })
    );
  }

  #[test]
  fn decode_errors_only_reject_their_candidate() {
    // `jnz 4; out 7; adv 3; out A; jnz 0`: only A = 0 reaches `out 7`
    let tape = program(&[3, 4, 5, 7, 0, 3, 5, 4, 3, 0]);
    assert_eq!(
      vm::execute(Registers::new(0, 0, 0), &tape),
      Err(vm::Error::InvalidComboOperand { ip: 2, value: 7 })
    );
    let seed = solve_minimal_self_reproducing_seed(&tape).unwrap();
    assert_eq!(seed, Some(481065752));
    assert!(reproduces(481065752, &tape));
  }

  #[test]
  fn overflowing_candidates_are_dropped() {
    // 44 values need 132 bits of seed
    let mut values = vec![0; 38];
    values.extend([0, 3, 5, 4, 3, 0]);
    let tape = program(&values);
    assert_eq!(solve_minimal_self_reproducing_seed(&tape), Ok(None));
  }

  #[test]
  fn shape_check() {
    assert_eq!(check_shape(&program(&[0, 3, 5, 4, 3, 0])), Ok(()));
    assert_eq!(check_shape(&program(&[])), Err(ShapeWarning::NoTrailingLoop));
    assert_eq!(
      check_shape(&program(&[0, 3, 5, 4, 3, 2])),
      Err(ShapeWarning::NoTrailingLoop)
    );
    assert_eq!(
      check_shape(&program(&[0, 1, 5, 4, 3, 0])),
      Err(ShapeWarning::ShiftWidth(1))
    );
    assert_eq!(
      check_shape(&program(&[0, 3, 0, 1, 5, 4, 3, 0])),
      Err(ShapeWarning::Shifts(2))
    );
    assert_eq!(
      check_shape(&program(&[5, 4, 3, 0])),
      Err(ShapeWarning::Shifts(0))
    );
    assert_eq!(
      check_shape(&program(&[0, 3, 3, 0, 5, 4, 3, 0])),
      Err(ShapeWarning::InnerJump)
    );
    assert_eq!(
      check_shape(&program(&[0, 3, 5, 4, 5, 4, 3, 0])),
      Err(ShapeWarning::Outputs(2))
    );
  }

  proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn found_seeds_reproduce(x in 0u8..8, y in 0u8..8) {
      let tape = program(&[2, 4, 1, x, 7, 5, 1, y, 4, 0, 0, 3, 5, 5, 3, 0]);
      if let Some(seed) = solve_minimal_self_reproducing_seed(&tape).unwrap() {
        prop_assert!(reproduces(seed, &tape));
        // dropping the top digit loses the first value of the program
        prop_assert!(!reproduces(seed >> DIGIT_BITS, &tape));
      }
    }
  }
}
