use std::fmt;

use tracing::trace;

use crate::opcode::{Opcode, UnknownOpcode};
use crate::operand::{Combo, ReservedCombo};
use crate::tape::{self, Tape};

/// The type of a single register in our virtual machine
pub type Register = u128;

/// The three general purpose registers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Registers {
  pub a: Register,
  pub b: Register,
  pub c: Register,
}

impl Registers {
  pub const fn new(a: Register, b: Register, c: Register) -> Self {
    Self { a, b, c }
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
  Active,
  Halted,
  // an instruction failed, nothing past it may run
  Faulted,
}

/// What the machine did on a single [`Vm::step`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
  /// An instruction was executed
  Continue,
  /// The instruction pointer ran off the tape, nothing was executed
  Halted,
}

/// Upper bounds on a single run. `None` means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Limits {
  pub max_steps: Option<u64>,
  pub max_output: Option<usize>,
}

/// A 3-bit register machine.
///
/// The machine reads its tape two values at a time: an opcode followed by its
/// operand. Registers are not limited to 3 bits. Every instruction except a
/// taken `jnz` moves the instruction pointer forward by two, and the machine
/// halts as soon as either half of the next pair lies past the end of the
/// tape.
#[derive(Debug)]
pub struct Vm {
  // index of the next opcode on the tape
  ip: usize,
  registers: Registers,
  output: Vec<u8>,
  state: State,
  steps: u64,
  limits: Limits,
}

impl Vm {
  /// Create a machine with the given registers, no output, and `ip` at 0
  pub fn new(registers: Registers) -> Self {
    Self {
      ip: 0,
      registers,
      output: Vec::new(),
      state: State::Active,
      steps: 0,
      limits: Limits::default(),
    }
  }

  pub fn with_limits(mut self, limits: Limits) -> Self {
    self.limits = limits;
    self
  }

  pub fn ip(&self) -> usize {
    self.ip
  }

  pub fn registers(&self) -> &Registers {
    &self.registers
  }

  pub fn output(&self) -> &[u8] {
    &self.output
  }

  /// Number of instructions executed so far
  pub fn steps(&self) -> u64 {
    self.steps
  }

  pub fn is_halted(&self) -> bool {
    self.state == State::Halted
  }

  /// Whether a previous step failed. A faulted machine refuses to step and
  /// `ip` stays on the failing instruction.
  pub fn is_faulted(&self) -> bool {
    self.state == State::Faulted
  }

  /// Step through a single opcode/instruction
  pub fn step<T>(&mut self, tape: &T) -> Result<Flow, Error>
  where
    T: Tape + ?Sized,
  {
    match self.state {
      State::Active => {}
      State::Halted => return Err(Error::MachineHalted),
      State::Faulted => return Err(Error::MachineFaulted),
    }
    let mut task = Task::new(self, tape);
    task.run()
  }

  /// Step until the machine halts or fails
  pub fn run<T>(&mut self, tape: &T) -> Result<(), Error>
  where
    T: Tape + ?Sized,
  {
    while self.step(tape)? == Flow::Continue {}
    Ok(())
  }

  pub fn into_execution(self) -> Execution {
    Execution {
      output: self.output,
      registers: self.registers,
    }
  }
}

/// An error that occurred during execution of instructions
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
  #[error("invalid opcode `{value}` at ip {ip}")]
  InvalidOpcode { ip: usize, value: u8 },

  #[error("invalid combo operand `{value}` at ip {ip}")]
  InvalidComboOperand { ip: usize, value: u8 },

  #[error("step limit exceeded after {steps} instructions")]
  StepLimitExceeded { steps: u64 },

  #[error("output limit of {len} values exceeded")]
  OutputLimitExceeded { len: usize },

  #[error("machine is halted")]
  MachineHalted,

  #[error("machine faulted on an earlier instruction")]
  MachineFaulted,
}

impl Error {
  /// Whether the tape itself is malformed, as opposed to the run being cut
  /// short
  pub fn is_decode(&self) -> bool {
    matches!(
      self,
      Self::InvalidOpcode { .. } | Self::InvalidComboOperand { .. }
    )
  }
}

/// The result of running a machine to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
  pub output: Vec<u8>,
  pub registers: Registers,
}

impl fmt::Display for Execution {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    tape::write_joined(f, &self.output)
  }
}

/// Run `tape` to completion starting from `registers`
pub fn execute<T>(registers: Registers, tape: &T) -> Result<Execution, Error>
where
  T: Tape + ?Sized,
{
  execute_with_limits(registers, tape, Limits::default())
}

pub fn execute_with_limits<T>(
  registers: Registers,
  tape: &T,
  limits: Limits,
) -> Result<Execution, Error>
where
  T: Tape + ?Sized,
{
  let mut vm = Vm::new(registers).with_limits(limits);
  vm.run(tape)?;
  Ok(vm.into_execution())
}

struct Task<'vm, 'tape, T: ?Sized> {
  vm: &'vm mut Vm,
  tape: &'tape T,
  // ip of the instruction being executed
  pc: usize,
}

impl<'vm, 'tape, T> Task<'vm, 'tape, T>
where
  T: Tape + ?Sized,
{
  fn new(vm: &'vm mut Vm, tape: &'tape T) -> Self {
    let pc = vm.ip;
    Self { vm, tape, pc }
  }

  #[inline]
  fn eat(&mut self) -> Option<u8> {
    let value = self.tape.values().get(self.vm.ip).copied()?;
    self.vm.ip += 1;
    Some(value)
  }

  fn combo(&self, operand: u8) -> Result<Register, Error> {
    let combo = Combo::try_from(operand).map_err(|ReservedCombo(value)| {
      Error::InvalidComboOperand { ip: self.pc, value }
    })?;
    Ok(combo.resolve(&self.vm.registers))
  }

  fn run(&mut self) -> Result<Flow, Error> {
    let (Some(value), Some(operand)) = (self.eat(), self.eat()) else {
      // a dangling opcode without its operand halts too
      self.vm.ip = self.pc;
      self.vm.state = State::Halted;
      trace!(ip = self.pc, "halt");
      return Ok(Flow::Halted);
    };
    self.execute(value, operand).inspect_err(|err| {
      self.vm.ip = self.pc;
      self.vm.state = State::Faulted;
      trace!(ip = self.pc, %err, "fault");
    })
  }

  fn execute(&mut self, value: u8, operand: u8) -> Result<Flow, Error> {
    if self
      .vm
      .limits
      .max_steps
      .is_some_and(|max| self.vm.steps >= max)
    {
      return Err(Error::StepLimitExceeded {
        steps: self.vm.steps,
      });
    }
    let op = Opcode::try_from(value).map_err(|UnknownOpcode(value)| Error::InvalidOpcode {
      ip: self.pc,
      value,
    })?;
    trace!(ip = self.pc, %op, operand, registers = ?self.vm.registers, "step");
    match op {
      Opcode::Adv => adv(self, operand)?,
      Opcode::Bxl => bxl(self, operand),
      Opcode::Bst => bst(self, operand)?,
      Opcode::Jnz => jnz(self, operand),
      Opcode::Bxc => bxc(self),
      Opcode::Out => out(self, operand)?,
      Opcode::Bdv => bdv(self, operand)?,
      Opcode::Cdv => cdv(self, operand)?,
    }
    self.vm.steps += 1;
    Ok(Flow::Continue)
  }
}

// floor(value / 2^amount); anything shifted by 128 or more is gone
fn shr(value: Register, amount: Register) -> Register {
  u32::try_from(amount)
    .ok()
    .and_then(|amount| value.checked_shr(amount))
    .unwrap_or(0)
}

// A ← A >> combo
fn adv<T>(task: &mut Task<'_, '_, T>, operand: u8) -> Result<(), Error>
where
  T: Tape + ?Sized,
{
  let amount = task.combo(operand)?;
  task.vm.registers.a = shr(task.vm.registers.a, amount);
  Ok(())
}

// B ← B ⊕ literal
fn bxl<T>(task: &mut Task<'_, '_, T>, operand: u8)
where
  T: Tape + ?Sized,
{
  task.vm.registers.b ^= Register::from(operand);
}

// B ← combo mod 8
fn bst<T>(task: &mut Task<'_, '_, T>, operand: u8) -> Result<(), Error>
where
  T: Tape + ?Sized,
{
  task.vm.registers.b = task.combo(operand)? & 0x7;
  Ok(())
}

// if A ≠ 0 : ip ← literal
fn jnz<T>(task: &mut Task<'_, '_, T>, operand: u8)
where
  T: Tape + ?Sized,
{
  if task.vm.registers.a != 0 {
    task.vm.ip = usize::from(operand);
  }
}

// B ← B ⊕ C
fn bxc<T>(task: &mut Task<'_, '_, T>)
where
  T: Tape + ?Sized,
{
  task.vm.registers.b ^= task.vm.registers.c;
}

// out ← out ∥ combo mod 8
fn out<T>(task: &mut Task<'_, '_, T>, operand: u8) -> Result<(), Error>
where
  T: Tape + ?Sized,
{
  let value = (task.combo(operand)? & 0x7) as u8;
  if let Some(len) = task.vm.limits.max_output {
    if task.vm.output.len() >= len {
      return Err(Error::OutputLimitExceeded { len });
    }
  }
  task.vm.output.push(value);
  Ok(())
}

// B ← A >> combo
fn bdv<T>(task: &mut Task<'_, '_, T>, operand: u8) -> Result<(), Error>
where
  T: Tape + ?Sized,
{
  let amount = task.combo(operand)?;
  task.vm.registers.b = shr(task.vm.registers.a, amount);
  Ok(())
}

// C ← A >> combo
fn cdv<T>(task: &mut Task<'_, '_, T>, operand: u8) -> Result<(), Error>
where
  T: Tape + ?Sized,
{
  let amount = task.combo(operand)?;
  task.vm.registers.c = shr(task.vm.registers.a, amount);
  Ok(())
}
