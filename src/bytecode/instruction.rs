use std::fmt::{Display, Formatter};

use super::{Word, word_to_bytes, word_from_bytes, FieldSpec, OpcodeDescriptor, REGISTRY};
use super::field::{self, OP};
use crate::error::{Error, Result};
use crate::host::HostProfile;

/// A single encoded instruction word.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Default)]
pub struct Instruction(pub Word);

impl Instruction {

  pub fn word(&self) -> Word {
    self.0
  }

  /// The raw value of the OP field, whether or not it names an opcode.
  pub fn opcode_number(&self) -> u8 {
    field::extract(self.0, OP.offset, OP.width) as u8
  }

  pub fn descriptor(&self) -> Result<&'static OpcodeDescriptor> {
    let code = self.opcode_number();
    REGISTRY.by_opcode(code).ok_or(Error::UnknownOpcode(code))
  }

  /// The logical value of `field`, regardless of whether the opcode uses it.
  pub fn field(&self, field: &FieldSpec) -> i64 {
    field.decode(self.0)
  }

  /// Splits the word into its opcode and the operands its layout uses.
  pub fn decode(&self) -> Result<DecodedInstruction> {
    let descriptor = self.descriptor()?;
    let operands =
      descriptor
        .fields()
        .iter()
        .map(|field| field.decode(self.0))
        .collect();

    Ok(DecodedInstruction{ descriptor, operands })
  }

  pub fn to_bytes(&self, profile: &HostProfile) -> [u8; 4] {
    word_to_bytes(self.0, profile)
  }

  pub fn from_bytes(bytes: [u8; 4], profile: &HostProfile) -> Instruction {
    Instruction(word_from_bytes(bytes, profile))
  }

}

impl From<Word> for Instruction {
  fn from(word: Word) -> Instruction {
    Instruction(word)
  }
}

/// Holds the unencoded components of an instruction: its opcode and its operands, in the order
/// of the opcode's layout. Only `new` and `Instruction::decode` construct one, so the operands
/// always match the layout and are in range.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct DecodedInstruction {
  descriptor : &'static OpcodeDescriptor,
  operands   : Vec<i64>,
}

impl DecodedInstruction {

  pub fn descriptor(&self) -> &'static OpcodeDescriptor {
    self.descriptor
  }

  pub fn operands(&self) -> &[i64] {
    &self.operands
  }

  /// Checks the operand count and every operand's range before building the word.
  pub fn new(descriptor: &'static OpcodeDescriptor, operands: Vec<i64>)
    -> Result<DecodedInstruction>
  {
    let fields = descriptor.fields();
    if operands.len() != fields.len() {
      return Err(Error::ArgumentCount {
        mnemonic : descriptor.mnemonic,
        expected : fields.len(),
        actual   : operands.len()
      });
    }
    for (field, value) in fields.iter().zip(operands.iter()) {
      if !field.contains(*value) {
        let (min, max) = field.range();
        return Err(Error::OperandOutOfRange {
          mnemonic : descriptor.mnemonic,
          field    : field.name,
          value    : *value,
          min,
          max
        });
      }
    }
    Ok(DecodedInstruction{ descriptor, operands })
  }

  /// Builds the word. Operands are range checked by `new`, so this can't fail.
  pub fn encode(&self) -> Instruction {
    let opcode = field::pack(self.descriptor.code as Word, OP.offset, OP.width);
    let word =
      self.descriptor
          .fields()
          .iter()
          .zip(self.operands.iter())
          .fold(opcode, |word, (field, value)| {
            word | field.encode(*value).unwrap_or(0)
          });
    Instruction(word)
  }

}

impl Display for DecodedInstruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.descriptor.mnemonic)?;
    for operand in &self.operands {
      write!(f, " {}", operand)?;
    }
    Ok(())
  }
}

/// An assembled instruction together with its serialized bytes.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct EncodedInstruction {
  pub word  : Word,
  pub bytes : [u8; 4],
}

impl EncodedInstruction {
  pub fn instruction(&self) -> Instruction {
    Instruction(self.word)
  }
}
