/*!
  The host profile is the set of numeric widths and the byte order the local toolchain uses
  when it dumps a chunk. Lua writes integers, sizes and numbers in their native
  representation, so a chunk can only be reinterpreted by a host with the same profile.

  The profile is read from the header of a reference chunk for an empty function. The header
  is 18 bytes long:

    Offset  Size  Contents
    0       4     Signature "\x1bLua"
    4       1     Version (0x52)
    5       1     Format (0 = official)
    6       1     Endianness (1 = little)
    7       1     sizeof(int)
    8       1     sizeof(size_t)
    9       1     sizeof(Instruction)
    10      1     sizeof(lua_Number)
    11      1     Integral flag (0 = floating point numbers)
    12      6     Tail "\x19\x93\r\n\x1a\n"
*/

use std::fmt::{Display, Formatter};
use std::mem::size_of;
use std::os::raw::c_int;

use crate::chunk::Chunk;
use crate::chunk::writer::{reference_chunk, RETURN_NOTHING};
use crate::error::{Error, Result};

pub const SIGNATURE: &[u8; 4] = b"\x1bLua";
pub const VERSION: u8 = 0x52;
pub const FORMAT: u8 = 0;
pub const TAIL: &[u8; 6] = b"\x19\x93\r\n\x1a\n";
pub const HEADER_SIZE: usize = 18;
/// Instructions are always 32 bits in this format.
pub const INSTRUCTION_WIDTH: u8 = 4;

// Header offsets of the profile fields.
const ENDIANNESS_OFFSET: usize = 6;
const INT_WIDTH_OFFSET: usize = 7;
const SIZE_WIDTH_OFFSET: usize = 8;
const INSTRUCTION_WIDTH_OFFSET: usize = 9;
const NUMBER_WIDTH_OFFSET: usize = 10;
const INTEGRAL_OFFSET: usize = 11;
const TAIL_OFFSET: usize = 12;

lazy_static! {
  /// The profile of the running host, derived once from the reference chunk.
  pub static ref HOST_PROFILE: HostProfile = HostProfile::derive();
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Endianness {
  Big,
  Little
}

impl Endianness {
  pub fn native() -> Endianness {
    match cfg!(target_endian = "little") {
      true  => Endianness::Little,
      false => Endianness::Big
    }
  }
}

impl Display for Endianness {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Endianness::Big    => write!(f, "big-endian"),
      Endianness::Little => write!(f, "little-endian")
    }
  }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct HostProfile {
  pub endianness        : Endianness,
  pub int_width         : u8,
  pub size_width        : u8,
  pub instruction_width : u8,
  pub number_width      : u8,
  pub floating_point    : bool,
}

impl HostProfile {

  /// The profile of the toolchain this crate was compiled for, as `luac` would write it. This
  /// is the profile the reference chunk is dumped with.
  pub fn native() -> HostProfile {
    HostProfile {
      endianness        : Endianness::native(),
      int_width         : size_of::<c_int>() as u8,
      size_width        : size_of::<usize>() as u8,
      instruction_width : INSTRUCTION_WIDTH,
      number_width      : size_of::<f64>() as u8,
      floating_point    : true,
    }
  }

  /// Reads the profile back out of the header of the reference chunk. A reference chunk that
  /// can't be read is an initialization fault.
  pub fn derive() -> HostProfile {
    let reference = reference_chunk(&HostProfile::native());
    match HostProfile::from_reference(&reference) {
      Ok(profile) => profile,
      Err(e)      => panic!("the reference chunk is malformed: {}", e)
    }
  }

  /// Checks the signature and tail of a chunk header and reads the profile fields from it.
  pub fn from_header(bytes: &[u8]) -> Result<HostProfile> {
    if bytes.len() < HEADER_SIZE {
      return Err(Error::FormatMismatch(
        format!("header is {} bytes, expected {}", bytes.len(), HEADER_SIZE)
      ));
    }
    if &bytes[0..4] != SIGNATURE {
      return Err(Error::FormatMismatch("bad signature".to_string()));
    }
    if bytes[4] != VERSION || bytes[5] != FORMAT {
      return Err(Error::FormatMismatch(
        format!("version {:#04x} format {}, expected {:#04x} format {}",
                bytes[4], bytes[5], VERSION, FORMAT)
      ));
    }
    if &bytes[TAIL_OFFSET..HEADER_SIZE] != TAIL {
      return Err(Error::FormatMismatch("corrupted header tail".to_string()));
    }

    let endianness = match bytes[ENDIANNESS_OFFSET] {
      0     => Endianness::Big,
      1     => Endianness::Little,
      other => {
        return Err(Error::FormatMismatch(format!("invalid endianness flag {}", other)));
      }
    };
    let floating_point = match bytes[INTEGRAL_OFFSET] {
      0     => true,
      1     => false,
      other => {
        return Err(Error::FormatMismatch(format!("invalid integral flag {}", other)));
      }
    };

    Ok(HostProfile {
      endianness,
      int_width         : bytes[INT_WIDTH_OFFSET],
      size_width        : bytes[SIZE_WIDTH_OFFSET],
      instruction_width : bytes[INSTRUCTION_WIDTH_OFFSET],
      number_width      : bytes[NUMBER_WIDTH_OFFSET],
      floating_point,
    })
  }

  /**
    Reads the profile of the host that dumped `bytes`, which must be the chunk of an empty
    function. Besides the header, the instruction array is located with the widths the header
    claims and must hold exactly `RETURN 0 1`.
  */
  pub fn from_reference(bytes: &[u8]) -> Result<HostProfile> {
    let profile = HostProfile::from_header(bytes)?;
    let chunk   = Chunk::open_for(&profile, bytes)?;
    if chunk.instructions() != &[RETURN_NOTHING][..] {
      return Err(Error::FormatMismatch(
        "reference chunk is not an empty function".to_string()
      ));
    }
    Ok(profile)
  }

  /// The 18 header bytes a chunk dumped with this profile starts with.
  pub fn header(&self) -> Vec<u8> {
    let mut header = Vec::with_capacity(HEADER_SIZE);
    header.extend_from_slice(SIGNATURE);
    header.push(VERSION);
    header.push(FORMAT);
    header.push(match self.endianness {
      Endianness::Big    => 0,
      Endianness::Little => 1
    });
    header.push(self.int_width);
    header.push(self.size_width);
    header.push(self.instruction_width);
    header.push(self.number_width);
    header.push(if self.floating_point { 0 } else { 1 });
    header.extend_from_slice(TAIL);
    header
  }

  /// Reads an unsigned integer stored in `bytes` in this profile's byte order. At most eight
  /// bytes are significant.
  pub fn read_unsigned(&self, bytes: &[u8]) -> u64 {
    let fold = |value: u64, byte: &u8| (value << 8) | (*byte as u64);
    match self.endianness {
      Endianness::Big    => bytes.iter().fold(0, fold),
      Endianness::Little => bytes.iter().rev().fold(0, fold)
    }
  }

  /// Reads a two's complement signed integer `bytes.len()` bytes wide.
  pub fn read_signed(&self, bytes: &[u8]) -> i64 {
    let value = self.read_unsigned(bytes);
    let bits  = (bytes.len() * 8) as u32;
    if bits == 0 || bits >= 64 {
      return value as i64;
    }
    let shift = 64 - bits;
    ((value << shift) as i64) >> shift
  }

  /// Writes the low `width` bytes of `value` in this profile's byte order.
  pub fn write_unsigned(&self, value: u64, width: usize) -> Vec<u8> {
    let mut bytes: Vec<u8> = (0..width)
      .map(|i| if i < 8 { (value >> (8 * i)) as u8 } else { 0 })
      .collect();
    if self.endianness == Endianness::Big {
      bytes.reverse();
    }
    bytes
  }

  /// The largest instruction count the `int` sized count field can hold.
  pub fn max_int(&self) -> u64 {
    match self.int_width {
      0          => 0,
      w if w >= 8 => i64::max_value() as u64,
      w          => (1u64 << (8 * w as u32 - 1)) - 1
    }
  }

}

impl Display for HostProfile {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(
      f,
      "{}, int {}, size_t {}, instruction {}, number {} ({})",
      self.endianness,
      self.int_width,
      self.size_width,
      self.instruction_width,
      self.number_width,
      if self.floating_point { "floating" } else { "integral" }
    )
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn derived_profile_matches_native(){
    assert_eq!(*HOST_PROFILE, HostProfile::native());
    assert_eq!(HOST_PROFILE.instruction_width, 4);
  }

  #[test]
  fn reference_from_another_host(){
    let profile = HostProfile {
      endianness        : Endianness::Big,
      int_width         : 8,
      size_width        : 4,
      instruction_width : 4,
      number_width      : 4,
      floating_point    : false,
    };
    assert_eq!(HostProfile::from_reference(&reference_chunk(&profile)), Ok(profile));
  }

  #[test]
  fn reference_must_be_empty_function(){
    let mut bytes = reference_chunk(&HOST_PROFILE);
    let code_offset = HEADER_SIZE + 3 * HOST_PROFILE.int_width as usize + 3;
    // RETURN 0 1 becomes MOVE 0 1
    let word = HOST_PROFILE.write_unsigned(0x0080_0000, 4);
    bytes[code_offset..code_offset + 4].copy_from_slice(&word);
    match HostProfile::from_reference(&bytes) {
      Err(Error::FormatMismatch(_)) => {},
      other => panic!("expected a format mismatch, got {:?}", other)
    }
  }

  #[test]
  fn flag_bytes_must_be_zero_or_one(){
    for &offset in &[ENDIANNESS_OFFSET, INTEGRAL_OFFSET] {
      let mut header = HOST_PROFILE.header();
      header[offset] = 2;
      match HostProfile::from_header(&header) {
        Err(Error::FormatMismatch(_)) => {},
        other => panic!("expected a format mismatch, got {:?}", other)
      }
    }
  }

  #[test]
  fn header_round_trip(){
    let profile = HostProfile {
      endianness        : Endianness::Big,
      int_width         : 4,
      size_width        : 4,
      instruction_width : 4,
      number_width      : 4,
      floating_point    : false,
    };
    let header = profile.header();
    assert_eq!(header.len(), HEADER_SIZE);
    assert_eq!(HostProfile::from_header(&header), Ok(profile));
  }

  #[test]
  fn bad_signature(){
    let mut header = HOST_PROFILE.header();
    header[1] = b'X';
    match HostProfile::from_header(&header) {
      Err(Error::FormatMismatch(_)) => {},
      other => panic!("expected a format mismatch, got {:?}", other)
    }
  }

  #[test]
  fn bad_tail(){
    let mut header = HOST_PROFILE.header();
    header[HEADER_SIZE - 1] = 0;
    match HostProfile::from_header(&header) {
      Err(Error::FormatMismatch(_)) => {},
      other => panic!("expected a format mismatch, got {:?}", other)
    }
  }

  #[test]
  fn short_header(){
    match HostProfile::from_header(b"\x1bLua") {
      Err(Error::FormatMismatch(_)) => {},
      other => panic!("expected a format mismatch, got {:?}", other)
    }
  }

  #[test]
  fn unsigned_both_orders(){
    let mut profile = HostProfile::native();

    profile.endianness = Endianness::Little;
    assert_eq!(profile.write_unsigned(0x01020304, 4), vec![4, 3, 2, 1]);
    assert_eq!(profile.read_unsigned(&[4, 3, 2, 1]), 0x01020304);

    profile.endianness = Endianness::Big;
    assert_eq!(profile.write_unsigned(0x01020304, 4), vec![1, 2, 3, 4]);
    assert_eq!(profile.read_unsigned(&[1, 2, 3, 4]), 0x01020304);
  }

  #[test]
  fn signed_read(){
    let profile = HostProfile::native();
    let bytes = profile.write_unsigned(-5i64 as u64, 4);
    assert_eq!(profile.read_signed(&bytes), -5);
    assert_eq!(profile.read_signed(&profile.write_unsigned(7, 4)), 7);
  }

  #[test]
  fn max_int(){
    let mut profile = HostProfile::native();
    profile.int_width = 4;
    assert_eq!(profile.max_int(), i32::max_value() as u64);
    profile.int_width = 2;
    assert_eq!(profile.max_int(), 0x7FFF);
  }

}
