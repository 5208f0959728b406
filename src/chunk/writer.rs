/*!
  A minimal chunk dumper. It writes functions in the Lua 5.2 dump layout for a given host
  profile, which is enough to produce the reference chunk the host profile is derived from and
  realistic chunks to edit.

  A function is dumped as:

    linedefined:int lastlinedefined:int numparams:u8 is_vararg:u8 maxstacksize:u8
    sizecode:int code:Instruction[sizecode]
    sizek:int { tag:u8 value }[sizek]
    sizep:int function[sizep]
    sizeupvalues:int { instack:u8 idx:u8 }[sizeupvalues]
    source:string
    sizelineinfo:int int[sizelineinfo]
    sizelocvars:int { varname:string startpc:int endpc:int }[sizelocvars]
    sizeupvalnames:int string[sizeupvalnames]

  Strings are a `size_t` length that counts a trailing NUL, followed by the bytes and the NUL.
  A length of zero is an absent string.
*/

use super::Constant;
use crate::bytecode::Instruction;
use crate::host::HostProfile;

/// `RETURN 0 1`, the only instruction of an empty function.
pub(crate) const RETURN_NOTHING: Instruction = Instruction(0x0080_001F);

/// The parts of a function prototype the writer knows how to dump.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionSketch {
  pub line_defined      : i64,
  pub last_line_defined : i64,
  pub num_params        : u8,
  pub is_vararg         : u8,
  pub max_stack_size    : u8,
  pub code              : Vec<Instruction>,
  pub constants         : Vec<Constant>,
  pub prototypes        : Vec<FunctionSketch>,
  /// `(instack, idx)` pairs.
  pub upvalues          : Vec<(u8, u8)>,
  pub source            : Option<Vec<u8>>,
  pub line_info         : Vec<i64>,
  /// `(name, startpc, endpc)` triples.
  pub locals            : Vec<(Vec<u8>, i64, i64)>,
  pub upvalue_names     : Vec<Vec<u8>>,
}

impl FunctionSketch {

  /// What `luac` produces for an empty main chunk.
  pub fn empty() -> FunctionSketch {
    FunctionSketch {
      line_defined      : 0,
      last_line_defined : 0,
      num_params        : 0,
      is_vararg         : 1,
      max_stack_size    : 2,
      code              : vec![RETURN_NOTHING],
      constants         : vec![],
      prototypes        : vec![],
      upvalues          : vec![(1, 0)],
      source            : Some(b"=?".to_vec()),
      line_info         : vec![1],
      locals            : vec![],
      upvalue_names     : vec![b"_ENV".to_vec()],
    }
  }

}

pub struct ChunkWriter {
  profile : HostProfile,
  bytes   : Vec<u8>,
}

impl ChunkWriter {

  pub fn new(profile: &HostProfile) -> ChunkWriter {
    ChunkWriter {
      profile : *profile,
      bytes   : vec![]
    }
  }

  pub fn finish(self) -> Vec<u8> {
    self.bytes
  }

  pub fn header(&mut self) -> &mut Self {
    let header = self.profile.header();
    self.bytes.extend_from_slice(&header);
    self
  }

  pub fn byte(&mut self, value: u8) -> &mut Self {
    self.bytes.push(value);
    self
  }

  pub fn int(&mut self, value: i64) -> &mut Self {
    let bytes = self.profile.write_unsigned(value as u64, self.profile.int_width as usize);
    self.bytes.extend(bytes);
    self
  }

  pub fn size(&mut self, value: u64) -> &mut Self {
    let bytes = self.profile.write_unsigned(value, self.profile.size_width as usize);
    self.bytes.extend(bytes);
    self
  }

  pub fn number(&mut self, value: f64) -> &mut Self {
    let width = self.profile.number_width as usize;
    let bits  =
      match (self.profile.floating_point, width) {
        (true, 4)  => (value as f32).to_bits() as u64,
        (true, _)  => value.to_bits(),
        (false, _) => value as i64 as u64
      };
    let bytes = self.profile.write_unsigned(bits, width);
    self.bytes.extend(bytes);
    self
  }

  pub fn string(&mut self, value: Option<&[u8]>) -> &mut Self {
    match value {
      None        => {
        self.size(0);
      }
      Some(bytes) => {
        self.size(bytes.len() as u64 + 1);
        self.bytes.extend_from_slice(bytes);
        self.bytes.push(0);
      }
    }
    self
  }

  pub fn instruction(&mut self, instruction: Instruction) -> &mut Self {
    let bytes = instruction.to_bytes(&self.profile);
    self.bytes.extend_from_slice(&bytes);
    self
  }

  pub fn constant(&mut self, constant: &Constant) -> &mut Self {
    self.byte(constant.tag() as u8);
    match constant {
      Constant::Nil          => {}
      Constant::Boolean(b)   => { self.byte(*b as u8); }
      Constant::Number(n)    => { self.number(*n); }
      Constant::String(s)    => { self.string(Some(s.as_slice())); }
    }
    self
  }

  pub fn function(&mut self, function: &FunctionSketch) -> &mut Self {
    self.int(function.line_defined)
        .int(function.last_line_defined)
        .byte(function.num_params)
        .byte(function.is_vararg)
        .byte(function.max_stack_size);

    self.int(function.code.len() as i64);
    for instruction in &function.code {
      self.instruction(*instruction);
    }

    self.int(function.constants.len() as i64);
    for constant in &function.constants {
      self.constant(constant);
    }
    self.int(function.prototypes.len() as i64);
    for prototype in &function.prototypes {
      self.function(prototype);
    }

    self.int(function.upvalues.len() as i64);
    for (instack, idx) in &function.upvalues {
      self.byte(*instack).byte(*idx);
    }

    // Debug information
    self.string(function.source.as_ref().map(Vec::as_slice));
    self.int(function.line_info.len() as i64);
    for line in &function.line_info {
      self.int(*line);
    }
    self.int(function.locals.len() as i64);
    for (name, start_pc, end_pc) in &function.locals {
      self.string(Some(name.as_slice())).int(*start_pc).int(*end_pc);
    }
    self.int(function.upvalue_names.len() as i64);
    for name in &function.upvalue_names {
      self.string(Some(name.as_slice()));
    }

    self
  }

}

/// Dumps `main` as a complete chunk for `profile`.
pub fn dump(profile: &HostProfile, main: &FunctionSketch) -> Vec<u8> {
  let mut writer = ChunkWriter::new(profile);
  writer.header().function(main);
  writer.finish()
}

/// The chunk for an empty program, as dumped by a host with `profile`.
pub fn reference_chunk(profile: &HostProfile) -> Vec<u8> {
  dump(profile, &FunctionSketch::empty())
}
