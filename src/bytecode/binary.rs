/*!
  This module is responsible for converting instruction words to and from the four bytes they
  occupy in a chunk. The byte order is the byte order of the host profile.
*/

use crate::host::{Endianness, HostProfile};

// If you change this you must also change `word_to_bytes` and `word_from_bytes`.
pub type Word = u32;

/// Serializes `word` in the profile's byte order.
pub fn word_to_bytes(word: Word, profile: &HostProfile) -> [u8; 4] {
  match profile.endianness {
    Endianness::Little => word.to_le_bytes(),
    Endianness::Big    => word.to_be_bytes()
  }
}

/// Inverse of `word_to_bytes`.
pub fn word_from_bytes(bytes: [u8; 4], profile: &HostProfile) -> Word {
  match profile.endianness {
    Endianness::Little => Word::from_le_bytes(bytes),
    Endianness::Big    => Word::from_be_bytes(bytes)
  }
}
