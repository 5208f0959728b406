/*!

  Lua 5.2 instructions are unsigned 32 bit words. The opcode occupies the lowest six bits and
  the remaining 26 bits are split into operand fields in one of three ways:

    iABC:   [B:9][C:9][A:8][OP:6]
    iABx:   [Bx:18][A:8][OP:6]
    iAx:    [Ax:26][OP:6]

  `sBx` is the `Bx` field read as a signed value. The B, C and sBx fields are signed using
  the bias transform in `field`. Bx and Ax use the negative-one-based index transform, so that
  constant and prototype references read as negative numbers.

  Not every opcode uses every field its word format has room for. `MOVE` is an iABC
  instruction, but only A and B mean anything, so it is written `MOVE a b`. The set of fields an
  opcode uses is its `Layout`, and the order of a layout's fields is the order its operands are
  written in assembly.

  The opcode itself is an enum so that it inhabits a single byte and so that the `strum` and
  `num_enum` derives give us the mnemonic and numeric conversions for free. The registry in
  `registry` binds both directions together and checks that they agree.

*/

mod binary;
mod instruction;
mod assembly;
pub mod field;
pub mod registry;

pub use binary::{word_from_bytes, word_to_bytes, Word};
pub use instruction::{DecodedInstruction, EncodedInstruction, Instruction};
pub use assembly::{
  assemble, assemble_for, assemble_program, disassemble, disassemble_bytes,
  disassemble_bytes_for, parse_instruction
};
pub use field::FieldSpec;
pub use registry::{OpcodeDescriptor, OpcodeRegistry, REGISTRY};

use strum_macros::{Display as StrumDisplay, EnumIter, EnumString, IntoStaticStr};
use num_enum::{IntoPrimitive, TryFromPrimitive};

use field::{A, AX, B, BX, C, SBX};

/**
  Opcodes of the Lua 5.2 virtual machine.

  The discriminants are the numeric opcodes, so the order the variants are listed in is
  significant and must match `lopcodes.h`.
*/
#[derive(
StrumDisplay, IntoStaticStr, EnumString, EnumIter, TryFromPrimitive, IntoPrimitive,
Clone,        Copy,          Eq, PartialEq,  Debug, Hash
)]
#[repr(u8)]
pub enum Opcode {
  #[strum(to_string = "MOVE")]     Move,      // R(A) := R(B)
  #[strum(to_string = "LOADK")]    LoadK,     // R(A) := Kst(Bx)
  #[strum(to_string = "LOADKX")]   LoadKx,    // R(A) := Kst(extra arg)
  #[strum(to_string = "LOADBOOL")] LoadBool,  // R(A) := (Bool)B; if (C) pc++
  #[strum(to_string = "LOADNIL")]  LoadNil,   // R(A), R(A+1), ..., R(A+B) := nil
  #[strum(to_string = "GETUPVAL")] GetUpval,  // R(A) := UpValue[B]
  #[strum(to_string = "GETTABUP")] GetTabUp,  // R(A) := UpValue[B][RK(C)]
  #[strum(to_string = "GETTABLE")] GetTable,  // R(A) := R(B)[RK(C)]
  #[strum(to_string = "SETTABUP")] SetTabUp,  // UpValue[A][RK(B)] := RK(C)
  #[strum(to_string = "SETUPVAL")] SetUpval,  // UpValue[B] := R(A)
  #[strum(to_string = "SETTABLE")] SetTable,  // R(A)[RK(B)] := RK(C)
  #[strum(to_string = "NEWTABLE")] NewTable,  // R(A) := {} (size = B,C)
  #[strum(to_string = "SELF")]     SelfOp,    // R(A+1) := R(B); R(A) := R(B)[RK(C)]
  #[strum(to_string = "ADD")]      Add,       // R(A) := RK(B) + RK(C)
  #[strum(to_string = "SUB")]      Sub,       // R(A) := RK(B) - RK(C)
  #[strum(to_string = "MUL")]      Mul,       // R(A) := RK(B) * RK(C)
  #[strum(to_string = "DIV")]      Div,       // R(A) := RK(B) / RK(C)
  #[strum(to_string = "MOD")]      Mod,       // R(A) := RK(B) % RK(C)
  #[strum(to_string = "POW")]      Pow,       // R(A) := RK(B) ^ RK(C)
  #[strum(to_string = "UNM")]      Unm,       // R(A) := -R(B)
  #[strum(to_string = "NOT")]      Not,       // R(A) := not R(B)
  #[strum(to_string = "LEN")]      Len,       // R(A) := length of R(B)
  #[strum(to_string = "CONCAT")]   Concat,    // R(A) := R(B).. ... ..R(C)
  #[strum(to_string = "JMP")]      Jmp,       // pc += sBx; if (A) close all upvalues >= R(A - 1)
  #[strum(to_string = "EQ")]       Eq,        // if ((RK(B) == RK(C)) ~= A) then pc++
  #[strum(to_string = "LT")]       Lt,        // if ((RK(B) <  RK(C)) ~= A) then pc++
  #[strum(to_string = "LE")]       Le,        // if ((RK(B) <= RK(C)) ~= A) then pc++
  #[strum(to_string = "TEST")]     Test,      // if not (R(A) <=> C) then pc++
  #[strum(to_string = "TESTSET")]  TestSet,   // if (R(B) <=> C) then R(A) := R(B) else pc++
  #[strum(to_string = "CALL")]     Call,      // R(A), ... ,R(A+C-2) := R(A)(R(A+1), ... ,R(A+B-1))
  #[strum(to_string = "TAILCALL")] TailCall,  // return R(A)(R(A+1), ... ,R(A+B-1))
  #[strum(to_string = "RETURN")]   Return,    // return R(A), ... ,R(A+B-2)
  #[strum(to_string = "FORLOOP")]  ForLoop,   // R(A)+=R(A+2); if R(A) <?= R(A+1) then { pc+=sBx; R(A+3)=R(A) }
  #[strum(to_string = "FORPREP")]  ForPrep,   // R(A)-=R(A+2); pc+=sBx
  #[strum(to_string = "TFORCALL")] TForCall,  // R(A+3), ... ,R(A+2+C) := R(A)(R(A+1), R(A+2))
  #[strum(to_string = "TFORLOOP")] TForLoop,  // if R(A+1) ~= nil then { R(A)=R(A+1); pc += sBx }
  #[strum(to_string = "SETLIST")]  SetList,   // R(A)[(C-1)*FPF+i] := R(A+i), 1 <= i <= B
  #[strum(to_string = "CLOSURE")]  Closure,   // R(A) := closure(KPROTO[Bx])
  #[strum(to_string = "VARARG")]   VarArg,    // R(A), R(A+1), ..., R(A+B-2) = vararg
  #[strum(to_string = "EXTRAARG")] ExtraArg,  // extra (larger) argument for previous opcode
}

pub const NUM_OPCODES: usize = 40;

/// The operand fields an opcode uses, in the order they are written.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Layout {
  A,
  AB,
  AC,
  ABC,
  Ax,
  ABx,
  AsBx,
}

pub const LAYOUTS: [Layout; 7] = [
  Layout::A, Layout::AB, Layout::AC, Layout::ABC, Layout::Ax, Layout::ABx, Layout::AsBx
];

impl Layout {
  pub fn fields(&self) -> &'static [FieldSpec] {
    match self {
      Layout::A    => &[A],
      Layout::AB   => &[A, B],
      Layout::AC   => &[A, C],
      Layout::ABC  => &[A, B, C],
      Layout::Ax   => &[AX],
      Layout::ABx  => &[A, BX],
      Layout::AsBx => &[A, SBX],
    }
  }
}

impl Opcode {
  pub fn code(&self) -> u8 {
    Into::<u8>::into(*self)
  }

  pub fn mnemonic(&self) -> &'static str {
    (*self).into()
  }

  /// The fields whose argument mode is not `OpArgN` in `luaP_opmodes`.
  pub fn layout(&self) -> Layout {
    use Opcode::*;

    match self {
      LoadKx
        => Layout::A,

      Move | LoadNil | GetUpval | SetUpval | Unm | Not | Len | Return | VarArg
        => Layout::AB,

      Test | TForCall
        => Layout::AC,

      LoadBool | GetTabUp | GetTable | SetTabUp | SetTable | NewTable | SelfOp
      | Add | Sub | Mul | Div | Mod | Pow | Concat | Eq | Lt | Le | TestSet
      | Call | TailCall | SetList
        => Layout::ABC,

      ExtraArg
        => Layout::Ax,

      LoadK | Closure
        => Layout::ABx,

      Jmp | ForLoop | ForPrep | TForLoop
        => Layout::AsBx,
    }
  }

  /**
    The operands that can name a constant: `Kst(Bx)` of `LOADK` and the `RK` operands, which
    refer to a constant when negative. Other operands are registers, upvalues, counts or
    offsets, whatever their sign.
  */
  pub fn constant_operands(&self) -> &'static [&'static str] {
    use Opcode::*;

    match self {
      LoadK
        => &["Bx"],

      GetTabUp | GetTable | SelfOp
        => &["C"],

      SetTabUp | SetTable | Add | Sub | Mul | Div | Mod | Pow | Eq | Lt | Le
        => &["B", "C"],

      _ => &[],
    }
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use std::convert::TryFrom;
  use std::str::FromStr;
  use strum::IntoEnumIterator;

  #[test]
  fn opcode_numbers(){
    assert_eq!(Opcode::Move.code(), 0);
    assert_eq!(Opcode::GetTabUp.code(), 6);
    assert_eq!(Opcode::Add.code(), 13);
    assert_eq!(Opcode::Jmp.code(), 23);
    assert_eq!(Opcode::Return.code(), 31);
    assert_eq!(Opcode::ExtraArg.code(), 39);
    assert_eq!(Opcode::iter().count(), NUM_OPCODES);
  }

  #[test]
  fn mnemonic_conversions(){
    assert_eq!(Opcode::SelfOp.to_string(), "SELF");
    assert_eq!(Opcode::from_str("TFORLOOP").ok(), Some(Opcode::TForLoop));
    assert_eq!(Opcode::try_from(12u8).map(|op| op.mnemonic()).ok(), Some("SELF"));
    assert!(Opcode::try_from(40u8).is_err());
  }

  #[test]
  fn layouts(){
    assert_eq!(Opcode::Move.layout().fields().len(), 2);
    assert_eq!(Opcode::LoadKx.layout(), Layout::A);
    assert_eq!(Opcode::Test.layout(), Layout::AC);
    assert_eq!(Opcode::Jmp.layout().fields()[1].name, "sBx");
    assert_eq!(Opcode::ExtraArg.layout().fields()[0].name, "Ax");
  }

  #[test]
  fn constant_operands_belong_to_the_layout(){
    for opcode in Opcode::iter() {
      let names: Vec<&str> = opcode.layout().fields().iter().map(|f| f.name).collect();
      assert!(opcode.constant_operands().iter().all(|name| names.contains(name)), "{}", opcode);
    }
    assert_eq!(Opcode::SetList.constant_operands(), &[] as &[&str]);
    assert_eq!(Opcode::Le.constant_operands(), &["B", "C"]);
  }

}
