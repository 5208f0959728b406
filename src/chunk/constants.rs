/*!
  The constant pool of the top-level function starts right after its instruction array. The
  editor never rewrites it. It is only walked so that listings can show which string a
  constant operand refers to.

  Only string constants are decoded. The other types are recognized so that they can be
  skipped, but asking for their value is an error rather than a guess.
*/

use std::convert::TryFrom;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum_macros::Display as StrumDisplay;

use crate::error::{Error, Result};
use crate::host::HostProfile;

/// The type tag written in front of every constant.
#[derive(StrumDisplay, TryFromPrimitive, IntoPrimitive, Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum ConstantTag {
  Nil     = 0,
  Boolean = 1,
  Number  = 3,
  String  = 4,
}

/// A constant value, as written by `ChunkWriter`.
#[derive(Clone, Debug, PartialEq)]
pub enum Constant {
  Nil,
  Boolean(bool),
  Number(f64),
  String(Vec<u8>),
}

impl Constant {
  pub fn tag(&self) -> ConstantTag {
    match self {
      Constant::Nil        => ConstantTag::Nil,
      Constant::Boolean(_) => ConstantTag::Boolean,
      Constant::Number(_)  => ConstantTag::Number,
      Constant::String(_)  => ConstantTag::String,
    }
  }
}

/// A constant's tag and its undecoded payload. A string's payload excludes the trailing NUL.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct RawConstant {
  pub tag     : ConstantTag,
  pub payload : Vec<u8>,
}

impl RawConstant {
  pub fn decode(&self) -> Result<Constant> {
    match self.tag {
      ConstantTag::String => Ok(Constant::String(self.payload.clone())),
      tag                 => Err(Error::UnsupportedConstantType(tag))
    }
  }
}

/// A read position within a chunk. `base` is the chunk offset of `bytes[0]`, for errors.
struct Cursor<'a> {
  profile  : &'a HostProfile,
  bytes    : &'a [u8],
  base     : usize,
  position : usize,
}

impl<'a> Cursor<'a> {

  fn take(&mut self, needed: usize) -> Result<&'a [u8]> {
    let end = self.position.checked_add(needed).filter(|end| *end <= self.bytes.len());
    match end {
      Some(end) => {
        let taken = &self.bytes[self.position..end];
        self.position = end;
        Ok(taken)
      }
      None => Err(Error::Truncated {
        offset: self.base + self.position,
        needed
      })
    }
  }

  fn int(&mut self) -> Result<i64> {
    let width = self.profile.int_width as usize;
    let bytes = self.take(width)?;
    Ok(self.profile.read_signed(bytes))
  }

  fn size(&mut self) -> Result<u64> {
    let width = self.profile.size_width as usize;
    let bytes = self.take(width)?;
    Ok(self.profile.read_unsigned(bytes))
  }

}

/**
  Walks the constant pool at the start of `bytes`. `base` is the offset of `bytes` within the
  chunk.
*/
pub fn read_constants(profile: &HostProfile, bytes: &[u8], base: usize) -> Result<Vec<RawConstant>> {
  let mut cursor = Cursor{ profile, bytes, base, position: 0 };

  let count = cursor.int()?;
  if count < 0 {
    return Err(Error::FormatMismatch(format!("negative constant count {}", count)));
  }

  let mut constants = vec![];
  for _ in 0..count {
    let tag_byte = cursor.take(1)?[0];
    let tag = ConstantTag::try_from(tag_byte).map_err(|_| Error::UnknownConstantTag(tag_byte))?;

    let payload = match tag {
      ConstantTag::Nil     => vec![],
      ConstantTag::Boolean => cursor.take(1)?.to_vec(),
      ConstantTag::Number  => cursor.take(profile.number_width as usize)?.to_vec(),
      ConstantTag::String  => {
        let size = cursor.size()? as usize;
        match size {
          0    => vec![],
          size => {
            let bytes = cursor.take(size)?;
            bytes[..size - 1].to_vec()
          }
        }
      }
    };

    constants.push(RawConstant{ tag, payload });
  }

  Ok(constants)
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::chunk::writer::ChunkWriter;
  use crate::host::HOST_PROFILE;

  fn pool(constants: &[Constant]) -> Vec<u8> {
    let mut writer = ChunkWriter::new(&HOST_PROFILE);
    writer.int(constants.len() as i64);
    for constant in constants {
      writer.constant(constant);
    }
    writer.int(0); // no nested functions
    writer.finish()
  }

  #[test]
  fn walk_every_type(){
    let bytes = pool(&[
      Constant::String(b"print".to_vec()),
      Constant::Nil,
      Constant::Boolean(true),
      Constant::Number(42.0),
      Constant::String(b"hello".to_vec()),
    ]);
    let constants = read_constants(&HOST_PROFILE, &bytes, 0).unwrap();

    let tags: Vec<ConstantTag> = constants.iter().map(|c| c.tag).collect();
    assert_eq!(
      tags,
      vec![ConstantTag::String, ConstantTag::Nil, ConstantTag::Boolean, ConstantTag::Number, ConstantTag::String]
    );
    assert_eq!(constants[0].decode(), Ok(Constant::String(b"print".to_vec())));
    assert_eq!(constants[4].decode(), Ok(Constant::String(b"hello".to_vec())));
    assert_eq!(constants[2].payload, vec![1]);
    assert_eq!(constants[3].payload.len(), HOST_PROFILE.number_width as usize);
  }

  #[test]
  fn non_strings_are_not_decoded(){
    let bytes = pool(&[Constant::Number(1.5), Constant::Boolean(false), Constant::Nil]);
    let constants = read_constants(&HOST_PROFILE, &bytes, 0).unwrap();
    assert_eq!(constants[0].decode(), Err(Error::UnsupportedConstantType(ConstantTag::Number)));
    assert_eq!(constants[1].decode(), Err(Error::UnsupportedConstantType(ConstantTag::Boolean)));
    assert_eq!(constants[2].decode(), Err(Error::UnsupportedConstantType(ConstantTag::Nil)));
  }

  #[test]
  fn unknown_tag(){
    let mut writer = ChunkWriter::new(&HOST_PROFILE);
    writer.int(1).byte(9);
    let bytes = writer.finish();
    assert_eq!(read_constants(&HOST_PROFILE, &bytes, 0), Err(Error::UnknownConstantTag(9)));
  }

  #[test]
  fn truncated_string(){
    let mut bytes = pool(&[Constant::String(b"print".to_vec())]);
    let int_width = HOST_PROFILE.int_width as usize;
    bytes.truncate(bytes.len() - int_width - 2);
    match read_constants(&HOST_PROFILE, &bytes, 100) {
      Err(Error::Truncated{ offset, needed: 6 }) => assert!(offset >= 100),
      other => panic!("expected truncation, got {:?}", other)
    }
  }

}
