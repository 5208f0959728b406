/*!
  The opcode registry binds numeric opcodes, mnemonics and operand layouts together. It is
  built once, checked for consistency, and never mutated afterwards.
*/

use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use bimap::BiMap;
use strum::IntoEnumIterator;

use super::{FieldSpec, Layout, Opcode, LAYOUTS};
use super::field::OP;
use crate::error::{Error, Result};

lazy_static! {
  /// The Lua 5.2 instruction set.
  pub static ref REGISTRY: OpcodeRegistry = {
    let descriptors: Vec<OpcodeDescriptor> = Opcode::iter().map(OpcodeDescriptor::from).collect();
    match OpcodeRegistry::build(descriptors) {
      Ok(registry) => registry,
      Err(e)       => panic!("{}", e)
    }
  };
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct OpcodeDescriptor {
  pub opcode   : Opcode,
  pub code     : u8,
  pub mnemonic : &'static str,
  pub layout   : Layout,
}

impl From<Opcode> for OpcodeDescriptor {
  fn from(opcode: Opcode) -> OpcodeDescriptor {
    OpcodeDescriptor {
      opcode,
      code     : opcode.code(),
      mnemonic : opcode.mnemonic(),
      layout   : opcode.layout(),
    }
  }
}

impl OpcodeDescriptor {
  pub fn fields(&self) -> &'static [FieldSpec] {
    self.layout.fields()
  }
}

impl Display for OpcodeDescriptor {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}({})", self.mnemonic, self.code)
  }
}

pub struct OpcodeRegistry {
  /// Indexed by numeric opcode.
  descriptors : Vec<Option<OpcodeDescriptor>>,
  mnemonics   : HashMap<String, u8>,
}

impl OpcodeRegistry {

  /**
    Builds a registry from a descriptor table. Fails if two descriptors share an opcode or a
    mnemonic, if a mnemonic is not in canonical (uppercase) form, if an opcode does not fit in
    the OP field, or if any layout's fields overlap.
  */
  pub fn build(table: Vec<OpcodeDescriptor>) -> Result<OpcodeRegistry> {
    check_layouts()?;

    let mut descriptors: Vec<Option<OpcodeDescriptor>> = vec![];
    // Checks the table; lookups go through `mnemonics`.
    let mut bijection: BiMap<u8, &'static str> = BiMap::new();

    for descriptor in table {
      if !OP.contains(descriptor.code as i64) {
        return Err(Error::InconsistentRegistry(
          format!("opcode {} does not fit in the OP field", descriptor)
        ));
      }
      if descriptor.mnemonic.is_empty() || descriptor.mnemonic != descriptor.mnemonic.to_uppercase() {
        return Err(Error::InconsistentRegistry(
          format!("mnemonic `{}` is not in canonical form", descriptor.mnemonic)
        ));
      }
      if let Err((code, mnemonic)) = bijection.insert_no_overwrite(descriptor.code, descriptor.mnemonic) {
        return Err(Error::InconsistentRegistry(
          format!("{}({}) is not a bijection with the rest of the table", mnemonic, code)
        ));
      }

      let idx = descriptor.code as usize;
      if descriptors.len() <= idx {
        descriptors.resize(idx + 1, None);
      }
      descriptors[idx] = Some(descriptor);
    }

    let mnemonics = bijection
      .iter()
      .map(|(code, mnemonic)| (mnemonic.to_string(), *code))
      .collect::<HashMap<String, u8>>();

    log::debug!("opcode registry built with {} opcodes", mnemonics.len());
    Ok(OpcodeRegistry{ descriptors, mnemonics })
  }

  pub fn by_opcode(&self, code: u8) -> Option<&OpcodeDescriptor> {
    self.descriptors.get(code as usize).and_then(Option::as_ref)
  }

  /// Case-insensitive mnemonic lookup.
  pub fn by_mnemonic(&self, name: &str) -> Option<&OpcodeDescriptor> {
    let canonical = name.to_uppercase();
    self.mnemonics
        .get(&canonical)
        .and_then(|code| self.by_opcode(*code))
  }

  pub fn fields_of(&self, layout: Layout) -> &'static [FieldSpec] {
    layout.fields()
  }

  pub fn len(&self) -> usize {
    self.mnemonics.len()
  }

  pub fn is_empty(&self) -> bool {
    self.mnemonics.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &OpcodeDescriptor> {
    self.descriptors.iter().filter_map(Option::as_ref)
  }

}

/// Every layout's fields must be disjoint from each other and from the opcode.
fn check_layouts() -> Result<()> {
  for layout in LAYOUTS.iter() {
    let mut used = OP.bits();
    for field in layout.fields() {
      if field.offset + field.width > 32 {
        return Err(Error::InconsistentRegistry(
          format!("field {} of layout {:?} does not fit in a word", field, layout)
        ));
      }
      if used & field.bits() != 0 {
        return Err(Error::InconsistentRegistry(
          format!("field {} of layout {:?} overlaps another field", field, layout)
        ));
      }
      used |= field.bits();
    }
  }
  Ok(())
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn lookups(){
    assert_eq!(REGISTRY.len(), 40);
    let gettabup = REGISTRY.by_opcode(6).unwrap();
    assert_eq!(gettabup.mnemonic, "GETTABUP");
    assert_eq!(gettabup.layout, Layout::ABC);
    assert_eq!(REGISTRY.by_mnemonic("gettabup"), Some(gettabup));
    assert_eq!(REGISTRY.by_mnemonic("GetTabUp"), Some(gettabup));
    assert_eq!(REGISTRY.fields_of(Layout::AsBx).len(), 2);
  }

  #[test]
  fn misses(){
    assert_eq!(REGISTRY.by_opcode(40), None);
    assert_eq!(REGISTRY.by_opcode(63), None);
    assert_eq!(REGISTRY.by_mnemonic("GETGLOBAL"), None);
    assert_eq!(REGISTRY.by_mnemonic(""), None);
  }

  #[test]
  fn every_opcode_round_trips(){
    for descriptor in REGISTRY.iter() {
      assert_eq!(REGISTRY.by_opcode(descriptor.code), Some(descriptor));
      assert_eq!(REGISTRY.by_mnemonic(descriptor.mnemonic), Some(descriptor));
    }
  }

  #[test]
  fn duplicate_mnemonic_is_rejected(){
    let mut twin = OpcodeDescriptor::from(Opcode::Add);
    twin.code = 50;
    let table = vec![OpcodeDescriptor::from(Opcode::Add), twin];
    match OpcodeRegistry::build(table) {
      Err(Error::InconsistentRegistry(_)) => {},
      other => panic!("expected an inconsistent registry, got {:?}", other.map(|r| r.len()))
    }
  }

  #[test]
  fn duplicate_opcode_is_rejected(){
    let mut twin = OpcodeDescriptor::from(Opcode::Sub);
    twin.code = Opcode::Add.code();
    let table = vec![OpcodeDescriptor::from(Opcode::Add), twin];
    assert!(OpcodeRegistry::build(table).is_err());
  }

  #[test]
  fn opcode_must_fit(){
    let mut wide = OpcodeDescriptor::from(Opcode::Add);
    wide.code = 64;
    assert!(OpcodeRegistry::build(vec![wide]).is_err());
  }

  #[test]
  fn lowercase_mnemonic_is_rejected(){
    let mut lower = OpcodeDescriptor::from(Opcode::Add);
    lower.mnemonic = "add";
    assert!(OpcodeRegistry::build(vec![lower]).is_err());
  }

}
