//! The crate-wide error type. Every failure is terminal for the call that raised it.

use thiserror::Error;

use crate::chunk::ConstantTag;
use crate::host::HostProfile;

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum Error {
  /// The buffer does not carry the Lua 5.2 signature or header tail.
  #[error("not a Lua 5.2 chunk: {0}")]
  FormatMismatch(String),

  /// The signature matches, but integers in the chunk cannot be read on this host.
  #[error("chunk was produced by an incompatible host: expected {expected}, found {found}")]
  HostIncompatible {
    expected : HostProfile,
    found    : HostProfile
  },

  /// The buffer ended before a field the editor needs.
  #[error("chunk is truncated: {needed} bytes needed at offset {offset}")]
  Truncated {
    offset : usize,
    needed : usize
  },

  #[error("malformed instruction `{0}`: expected a mnemonic followed by arguments")]
  MalformedInstruction(String),

  #[error("unknown mnemonic `{0}`")]
  UnknownMnemonic(String),

  #[error("unknown opcode {0}")]
  UnknownOpcode(u8),

  #[error("argument `{0}` is not an integer literal")]
  NonNumericArgument(String),

  #[error("{mnemonic} requires {expected} arguments but was given {actual}")]
  ArgumentCount {
    mnemonic : &'static str,
    expected : usize,
    actual   : usize
  },

  #[error("{mnemonic} argument {field} = {value} is outside {min}..={max}")]
  OperandOutOfRange {
    mnemonic : &'static str,
    field    : &'static str,
    value    : i64,
    min      : i64,
    max      : i64
  },

  #[error("instruction index {index} is out of bounds for {len} instructions")]
  IndexOutOfBounds {
    index : usize,
    len   : usize
  },

  /// The array no longer fits the chunk's `int` sized instruction count field.
  #[error("{0} instructions do not fit in the instruction count field")]
  TooManyInstructions(usize),

  #[error("decoding {0} constants is not supported")]
  UnsupportedConstantType(ConstantTag),

  #[error("unknown constant tag {0}")]
  UnknownConstantTag(u8),

  #[error("inconsistent opcode registry: {0}")]
  InconsistentRegistry(String),

  /// Wraps an assembly error with the (1-based) line it occurred on.
  #[error("line {line}: {source}")]
  AtLine {
    line   : usize,
    source : Box<Error>
  },
}

pub type Result<T> = std::result::Result<T, Error>;
