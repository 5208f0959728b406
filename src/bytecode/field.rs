/*!
  Bit field primitives. Every operand accessor is `extract`/`pack` plus one of the signed
  value transforms below.

  Bias transform (B, C, sBx): a signed value `v` is stored as `K - v` when negative and as `v`
  otherwise, with `K = 2^(width-1) - 1`. Decoding mirrors it around `K`: a stored value greater
  than `K` decodes to `K - stored`.

  Negative-one-based index transform (Bx, Ax): `stored = -1 - index`, also its own inverse.
  A logical operand of `-1` is stored as `0`, `-2` as `1`, and so on, which is how constant and
  prototype references read in disassembly.
*/

use std::fmt::{Display, Formatter};

use super::Word;

/// Right-shifts `word` by `offset` and masks the result to `width` bits.
#[inline]
pub fn extract(word: Word, offset: u32, width: u32) -> Word {
  (word >> offset) & mask(width)
}

/// Masks `value` to `width` bits and left-shifts it by `offset`.
#[inline]
pub fn pack(value: Word, offset: u32, width: u32) -> Word {
  (value & mask(width)) << offset
}

#[inline]
fn mask(width: u32) -> Word {
  match width >= 32 {
    true  => Word::max_value(),
    false => (1 << width) - 1
  }
}

/// `K` for a biased field of the given width.
#[inline]
pub fn bias_of(width: u32) -> i64 {
  (1i64 << (width - 1)) - 1
}

pub fn bias(value: i64, width: u32) -> i64 {
  let k = bias_of(width);
  match value < 0 {
    true  => k - value,
    false => value
  }
}

pub fn unbias(stored: i64, width: u32) -> i64 {
  let k = bias_of(width);
  match stored > k {
    true  => k - stored,
    false => stored
  }
}

#[inline]
pub fn to_index(value: i64) -> i64 {
  -1 - value
}

#[inline]
pub fn from_index(stored: i64) -> i64 {
  -1 - stored
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Encoding {
  Unsigned,
  Biased,
  NegativeIndex
}

/// A named bit range within an instruction word.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct FieldSpec {
  pub name     : &'static str,
  pub offset   : u32,
  pub width    : u32,
  pub encoding : Encoding,
}

// [B:9][C:9][A:8][OP:6]
pub const OP : FieldSpec = FieldSpec{ name: "OP",  offset: 0,  width: 6,  encoding: Encoding::Unsigned };
pub const A  : FieldSpec = FieldSpec{ name: "A",   offset: 6,  width: 8,  encoding: Encoding::Unsigned };
pub const C  : FieldSpec = FieldSpec{ name: "C",   offset: 14, width: 9,  encoding: Encoding::Biased };
pub const B  : FieldSpec = FieldSpec{ name: "B",   offset: 23, width: 9,  encoding: Encoding::Biased };
// [Bx:18][A:8][OP:6]
pub const BX : FieldSpec = FieldSpec{ name: "Bx",  offset: 14, width: 18, encoding: Encoding::NegativeIndex };
pub const SBX: FieldSpec = FieldSpec{ name: "sBx", offset: 14, width: 18, encoding: Encoding::Biased };
// [Ax:26][OP:6]
pub const AX : FieldSpec = FieldSpec{ name: "Ax",  offset: 6,  width: 26, encoding: Encoding::NegativeIndex };

impl FieldSpec {

  /// The smallest and largest logical values the field can carry. Biased fields reach one
  /// below `-K`, so that every stored bit pattern has a logical value.
  pub fn range(&self) -> (i64, i64) {
    let span = 1i64 << self.width;
    match self.encoding {
      Encoding::Unsigned      => (0, span - 1),
      Encoding::Biased        => (-bias_of(self.width) - 1, bias_of(self.width)),
      Encoding::NegativeIndex => (-span, -1)
    }
  }

  pub fn contains(&self, value: i64) -> bool {
    let (min, max) = self.range();
    min <= value && value <= max
  }

  /// The stored (unsigned) form of a logical value. Returns `None` if it is out of range.
  pub fn store(&self, value: i64) -> Option<Word> {
    if !self.contains(value) {
      return None;
    }
    let stored = match self.encoding {
      Encoding::Unsigned      => value,
      Encoding::Biased        => bias(value, self.width),
      Encoding::NegativeIndex => to_index(value)
    };
    Some(stored as Word)
  }

  /// Packs a logical value into its place in a word.
  pub fn encode(&self, value: i64) -> Option<Word> {
    self.store(value).map(|stored| pack(stored, self.offset, self.width))
  }

  /// Extracts the logical value of this field from `word`.
  pub fn decode(&self, word: Word) -> i64 {
    let stored = extract(word, self.offset, self.width) as i64;
    match self.encoding {
      Encoding::Unsigned      => stored,
      Encoding::Biased        => unbias(stored, self.width),
      Encoding::NegativeIndex => from_index(stored)
    }
  }

  /// The bits of a word this field occupies.
  pub fn bits(&self) -> Word {
    pack(Word::max_value(), self.offset, self.width)
  }

}

impl Display for FieldSpec {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.name)
  }
}
