/*!

  A chunk is the byte buffer `luac` writes: an 18 byte header followed by the top-level function.
  The only parts of the function the editor interprets are the instruction count and the
  instruction array that follows it:

    [header:18][linedefined:int][lastlinedefined:int][numparams:1][is_vararg:1][maxstacksize:1]
    [sizecode:int][code:4*sizecode][everything else...]

  Since the offset of `sizecode` only depends on the width of an `int`, the instruction array is
  found without parsing anything else. When a chunk is opened, the bytes before `sizecode` and the
  bytes after the instruction array are kept as opaque blocks and written back unchanged.

  Editing the instruction array does not update anything that depends on it. Line info, the
  register count in `maxstacksize`, jump offsets and nested functions are the caller's
  responsibility.

*/

mod constants;
mod listing;
pub mod writer;

pub use constants::{Constant, ConstantTag, RawConstant};
pub use writer::{ChunkWriter, FunctionSketch};

use std::convert::TryFrom;

use crate::bytecode::Instruction;
use crate::error::{Error, Result};
use crate::host::{HostProfile, HEADER_SIZE, HOST_PROFILE, INSTRUCTION_WIDTH};

/// Offset of `sizecode` in a chunk written with `profile`.
pub fn count_offset(profile: &HostProfile) -> usize {
  // linedefined, lastlinedefined, numparams, is_vararg, maxstacksize
  HEADER_SIZE + 2 * profile.int_width as usize + 3
}

fn region(bytes: &[u8], offset: usize, needed: usize) -> Result<&[u8]> {
  match offset.checked_add(needed) {
    Some(end) if end <= bytes.len() => Ok(&bytes[offset..end]),
    _ => Err(Error::Truncated{ offset, needed })
  }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Chunk {
  profile        : HostProfile,
  /// Everything before the instruction count.
  head           : Vec<u8>,
  instructions   : Vec<Instruction>,
  /// Everything after the instruction array.
  tail           : Vec<u8>,
  /// The instruction count the chunk was opened with.
  original_count : usize,
}

impl Chunk {

  /// Opens a chunk written by the running host.
  pub fn open(bytes: &[u8]) -> Result<Chunk> {
    Chunk::open_for(&HOST_PROFILE, bytes)
  }

  /// Opens a chunk that must have been written by a host with `profile`.
  pub fn open_for(profile: &HostProfile, bytes: &[u8]) -> Result<Chunk> {
    let found = HostProfile::from_header(bytes)?;
    if found != *profile {
      return Err(Error::HostIncompatible {
        expected : *profile,
        found
      });
    }

    let int_width    = profile.int_width as usize;
    let count_offset = count_offset(profile);
    let count        = profile.read_signed(region(bytes, count_offset, int_width)?);
    let count        = usize::try_from(count).map_err(|_| {
      Error::FormatMismatch(format!("invalid instruction count {}", count))
    })?;

    let code_offset = count_offset + int_width;
    let width       = INSTRUCTION_WIDTH as usize;
    let code_size   = count.checked_mul(width).ok_or(Error::Truncated {
      offset : code_offset,
      needed : usize::max_value()
    })?;
    let code = region(bytes, code_offset, code_size)?;

    let instructions: Vec<Instruction> =
      code
        .chunks_exact(width)
        .map(|word| Instruction::from_bytes([word[0], word[1], word[2], word[3]], profile))
        .collect();

    log::debug!(
      "opened chunk of {} bytes with {} instructions at offset {}",
      bytes.len(), count, code_offset
    );

    Ok(Chunk {
      profile        : *profile,
      head           : bytes[..count_offset].to_vec(),
      instructions,
      tail           : bytes[code_offset + code_size..].to_vec(),
      original_count : count,
    })
  }

  pub fn profile(&self) -> &HostProfile {
    &self.profile
  }

  /// The bytes before the instruction count, which are never modified.
  pub fn head(&self) -> &[u8] {
    &self.head
  }

  /// The bytes after the instruction array, which are never modified.
  pub fn tail(&self) -> &[u8] {
    &self.tail
  }

  pub fn instructions(&self) -> &[Instruction] {
    &self.instructions
  }

  /**
    Direct access to the instruction array. Edits made through this handle are not checked
    against the capacity of the instruction count field until `serialize`.
  */
  pub fn instructions_mut(&mut self) -> &mut Vec<Instruction> {
    &mut self.instructions
  }

  pub fn len(&self) -> usize {
    self.instructions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.instructions.is_empty()
  }

  /// Replaces the instruction at `index`, returning the old one.
  pub fn replace(&mut self, index: usize, instruction: Instruction) -> Result<Instruction> {
    let len = self.instructions.len();
    match self.instructions.get_mut(index) {
      Some(slot) => Ok(std::mem::replace(slot, instruction)),
      None       => Err(Error::IndexOutOfBounds{ index, len })
    }
  }

  /// Inserts an instruction before `index`. `index` may equal the length of the array.
  pub fn insert(&mut self, index: usize, instruction: Instruction) -> Result<()> {
    let len = self.instructions.len();
    if index > len {
      return Err(Error::IndexOutOfBounds{ index, len });
    }
    self.check_capacity(len + 1)?;
    self.instructions.insert(index, instruction);
    Ok(())
  }

  pub fn push(&mut self, instruction: Instruction) -> Result<()> {
    let len = self.instructions.len();
    self.insert(len, instruction)
  }

  /// Removes and returns the instruction at `index`.
  pub fn remove(&mut self, index: usize) -> Result<Instruction> {
    let len = self.instructions.len();
    if index >= len {
      return Err(Error::IndexOutOfBounds{ index, len });
    }
    Ok(self.instructions.remove(index))
  }

  fn check_capacity(&self, count: usize) -> Result<()> {
    match count as u64 > self.profile.max_int() {
      true  => Err(Error::TooManyInstructions(count)),
      false => Ok(())
    }
  }

  /// The constant pool of the top-level function.
  pub fn constants(&self) -> Result<Vec<RawConstant>> {
    let base = self.head.len()
      + self.profile.int_width as usize
      + self.instructions.len() * INSTRUCTION_WIDTH as usize;
    constants::read_constants(&self.profile, &self.tail, base)
  }

  /**
    Writes the chunk back out: the original bytes before the instruction count, the current
    count, the current instructions, and the original bytes after the instruction array.
    Serializing does not consume or change the chunk.
  */
  pub fn serialize(&self) -> Result<Vec<u8>> {
    let count = self.instructions.len();
    self.check_capacity(count)?;

    if count != self.original_count {
      log::warn!(
        "instruction count changed from {} to {}; line info and other dependent metadata are \
         written unchanged",
        self.original_count, count
      );
    }

    let int_width = self.profile.int_width as usize;
    let mut bytes = Vec::with_capacity(
      self.head.len() + int_width + count * INSTRUCTION_WIDTH as usize + self.tail.len()
    );

    bytes.extend_from_slice(&self.head);
    bytes.extend(self.profile.write_unsigned(count as u64, int_width));
    for instruction in &self.instructions {
      bytes.extend_from_slice(&instruction.to_bytes(&self.profile));
    }
    bytes.extend_from_slice(&self.tail);

    log::trace!("serialized chunk of {} bytes with {} instructions", bytes.len(), count);
    Ok(bytes)
  }

}
