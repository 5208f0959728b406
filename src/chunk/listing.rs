use std::fmt::{Display, Formatter};

use prettytable::{format as TableFormat, Table};

use super::{Chunk, Constant, RawConstant};
use crate::bytecode::{field, Instruction};

lazy_static! {
  static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .separator(
        TableFormat::LinePosition::Bottom,
        TableFormat::LineSeparator::new('─', '┴', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}

fn instruction_text(instruction: &Instruction) -> String {
  match instruction.decode() {
    Ok(decoded) => decoded.to_string(),
    Err(_)      => format!("<unknown opcode {}>", instruction.opcode_number())
  }
}

/// The string constants an instruction refers to, quoted.
fn constant_note(instruction: &Instruction, constants: &[RawConstant]) -> String {
  let decoded = match instruction.decode() {
    Ok(decoded) => decoded,
    Err(_)      => return String::new()
  };

  let descriptor = decoded.descriptor();
  let constant_operands = descriptor.opcode.constant_operands();

  let references: Vec<i64> =
    descriptor
      .fields()
      .iter()
      .zip(decoded.operands().iter())
      .filter(|(operand_field, value)| {
        constant_operands.contains(&operand_field.name) && **value < 0
      })
      .map(|(_, value)| field::from_index(*value))
      .collect();

  let strings: Vec<String> =
    references
      .iter()
      .filter_map(|index| constants.get(*index as usize))
      .filter_map(|constant| match constant.decode() {
        Ok(Constant::String(bytes)) => Some(format!("\"{}\"", String::from_utf8_lossy(&bytes))),
        _ => None
      })
      .collect();

  strings.join(" ")
}

impl Chunk {

  #[cfg(feature = "trace_listing")]
  pub fn listing(&self) -> Table {
    let constants = self.constants().unwrap_or_default();
    let mut table = Table::new();

    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"pc", ubl->"Word", ubl->"Instruction", ubl->"Constant"]);

    for (pc, instruction) in self.instructions().iter().enumerate() {
      table.add_row(row![
        r->format!("{}", pc + 1),
        format!("{:08X}", instruction.word()),
        instruction_text(instruction),
        constant_note(instruction, &constants)
      ]);
    }
    table
  }

  #[cfg(not(feature = "trace_listing"))]
  pub fn listing(&self) -> Table {
    let constants = self.constants().unwrap_or_default();
    let mut table = Table::new();

    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"pc", ubl->"Instruction", ubl->"Constant"]);

    for (pc, instruction) in self.instructions().iter().enumerate() {
      table.add_row(row![
        r->format!("{}", pc + 1),
        instruction_text(instruction),
        constant_note(instruction, &constants)
      ]);
    }
    table
  }

}

impl Display for Chunk {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(
      f,
      "Chunk: {} instructions ({})\n{}",
      self.len(),
      self.profile(),
      self.listing()
    )
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::bytecode::assemble_program;
  use crate::chunk::writer::{dump, FunctionSketch};
  use crate::host::HOST_PROFILE;

  fn chunk() -> Chunk {
    let main = FunctionSketch {
      code      : assemble_program("
        GETTABUP 0 0 -1
        LOADK 1 -2
        CALL 0 2 1
        LOADK 1 -3
        RETURN 0 1
      ").unwrap(),
      constants : vec![
        Constant::String(b"print".to_vec()),
        Constant::String(b"hello".to_vec()),
        Constant::Number(2.0),
      ],
      ..FunctionSketch::empty()
    };
    Chunk::open(&dump(&HOST_PROFILE, &main)).unwrap()
  }

  #[test]
  fn notes_string_constants(){
    let chunk = chunk();
    let constants = chunk.constants().unwrap();
    let notes: Vec<String> =
      chunk.instructions().iter().map(|i| constant_note(i, &constants)).collect();
    assert_eq!(notes, vec!["\"print\"", "\"hello\"", "", "", ""]);
  }

  #[test]
  fn only_constant_operands_are_noted(){
    let chunk = chunk();
    let constants = chunk.constants().unwrap();
    let notes: Vec<String> =
      assemble_program("
        SETLIST 0 1 -2
        MOVE 0 -1
        JMP 0 -1
        ADD 0 -1 -2
        SETTABUP 0 -2 1
      ")
      .unwrap()
      .iter()
      .map(|i| constant_note(i, &constants))
      .collect();
    assert_eq!(notes, vec!["", "", "", "\"print\" \"hello\"", "\"hello\""]);
  }

  #[test]
  fn listing_rows(){
    let mut chunk = chunk();
    chunk.push(Instruction(0x3F)).unwrap();

    let table = chunk.listing();
    assert_eq!(table.len(), 6);

    let text = chunk.to_string();
    assert!(text.starts_with("Chunk: 6 instructions"));
    assert!(text.contains("GETTABUP 0 0 -1"));
    assert!(text.contains("\"hello\""));
    assert!(text.contains("<unknown opcode 63>"));
  }

  #[cfg(feature = "trace_listing")]
  #[test]
  fn listing_shows_words(){
    let chunk = chunk();
    let word = chunk.instructions()[0].word();
    assert!(chunk.to_string().contains(&format!("{:08X}", word)));
  }

}
