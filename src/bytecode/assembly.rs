/*!
  The human readable textual form of an instruction is called assembly. One instruction is
  written as its mnemonic followed by its operands, separated by whitespace:

    GETTABUP 1 0 -2

  Operands are signed decimal integers in the order of the opcode's layout. The mnemonic is
  matched case-insensitively; disassembly always writes it in uppercase. Disassembling a word
  produces exactly the text that assembles back into it.
*/

use nom::{
  IResult,
  bytes::complete::is_not,
  character::complete::{digit1, multispace0, multispace1, one_of},
  combinator::{all_consuming, opt, recognize, rest},
  sequence::{pair, preceded, separated_pair},
};

use super::{DecodedInstruction, EncodedInstruction, Instruction, Word, REGISTRY};
use crate::error::{Error, Result};
use crate::host::{HostProfile, HOST_PROFILE};

/// Everything after this character on a line of `assemble_program` input is ignored.
const COMMENT: char = ';';

/// Splits a line into its mnemonic and the (non-empty) rest of the line.
fn mnemonic_and_arguments(text: &str) -> IResult<&str, (&str, &str)> {
  preceded(
    multispace0,
    separated_pair(is_not(" \t\r\n"), multispace1, rest)
  )(text)
}

/// An optional sign followed by decimal digits, and nothing else.
fn integer_literal(token: &str) -> IResult<&str, &str> {
  all_consuming(recognize(pair(opt(one_of("+-")), digit1)))(token)
}

/// A literal too large for an `i64` saturates, so that it fails the operand range check.
fn parse_argument(token: &str) -> Result<i64> {
  match integer_literal(token) {
    Ok((_, literal)) => {
      let saturated = match literal.starts_with('-') {
        true  => i64::min_value(),
        false => i64::max_value()
      };
      Ok(literal.parse::<i64>().unwrap_or(saturated))
    }
    Err(_) => Err(Error::NonNumericArgument(token.to_string()))
  }
}

/// Parses one line of assembly into its opcode and operands.
pub fn parse_instruction(text: &str) -> Result<DecodedInstruction> {
  let (mnemonic, arguments) =
    match mnemonic_and_arguments(text) {
      Ok((_, (mnemonic, arguments))) if !arguments.trim().is_empty() => (mnemonic, arguments),
      _ => return Err(Error::MalformedInstruction(text.to_string()))
    };

  let descriptor =
    REGISTRY
      .by_mnemonic(mnemonic)
      .ok_or_else(|| Error::UnknownMnemonic(mnemonic.to_string()))?;

  let operands =
    arguments
      .split_whitespace()
      .map(parse_argument)
      .collect::<Result<Vec<i64>>>()?;

  DecodedInstruction::new(descriptor, operands)
}

/// Assembles one instruction, serialized for the running host.
pub fn assemble(text: &str) -> Result<EncodedInstruction> {
  assemble_for(&HOST_PROFILE, text)
}

/// Assembles one instruction, serialized for `profile`.
pub fn assemble_for(profile: &HostProfile, text: &str) -> Result<EncodedInstruction> {
  let instruction = parse_instruction(text)?.encode();
  Ok(EncodedInstruction {
    word  : instruction.word(),
    bytes : instruction.to_bytes(profile)
  })
}

/**
  Assembles a listing with one instruction per line. Blank lines and everything after a `;`
  are skipped. Errors report the (1-based) line they occurred on.
*/
pub fn assemble_program(text: &str) -> Result<Vec<Instruction>> {
  let mut instructions = Vec::new();

  for (idx, line) in text.lines().enumerate() {
    let code = match line.find(COMMENT) {
      Some(start) => &line[..start],
      None        => line
    };
    if code.trim().is_empty() {
      continue;
    }

    match parse_instruction(code) {
      Ok(decoded) => instructions.push(decoded.encode()),
      Err(e)      => {
        return Err(Error::AtLine {
          line   : idx + 1,
          source : Box::new(e)
        })
      }
    }
  }

  Ok(instructions)
}

pub fn disassemble(word: Word) -> Result<String> {
  Instruction(word).decode().map(|decoded| decoded.to_string())
}

/// Disassembles the four byte encoding of an instruction written by the running host.
pub fn disassemble_bytes(bytes: [u8; 4]) -> Result<String> {
  disassemble_bytes_for(&HOST_PROFILE, bytes)
}

pub fn disassemble_bytes_for(profile: &HostProfile, bytes: [u8; 4]) -> Result<String> {
  disassemble(Instruction::from_bytes(bytes, profile).word())
}
