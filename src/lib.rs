/*!

  A bit-level codec and editor for Lua 5.2 bytecode.

  Three things can be done with this crate:

    1. Assemble a line of text such as `GETTABUP 1 0 -2` into a 32 bit instruction word.
    2. Disassemble a word (or its four byte encoding) back into that text.
    3. Open a compiled chunk, edit the instruction array of its top-level function, and
       serialize it again. Every byte outside the instruction array is carried through
       as is.

  ```ignore
  use lasm::{assemble, disassemble, Chunk};

  let encoded = assemble("GETTABUP 1 0 -2")?;
  assert_eq!(encoded.word, 0x00404046);
  assert_eq!(disassemble(encoded.word)?, "GETTABUP 1 0 -2");

  let mut chunk = Chunk::open(&bytes)?;
  chunk.replace(0, assemble("MOVE 0 1")?.instruction())?;
  let edited = chunk.serialize()?;
  ```

*/

#[macro_use] extern crate lazy_static;
#[macro_use] extern crate prettytable;

pub mod error;
pub mod host;
pub mod bytecode;
pub mod chunk;

pub use error::{Error, Result};
pub use host::{HostProfile, Endianness, HOST_PROFILE};
pub use bytecode::{
  assemble, assemble_for, assemble_program, disassemble, disassemble_bytes,
  disassemble_bytes_for, EncodedInstruction, Instruction, Opcode, Word, REGISTRY
};
pub use chunk::{Chunk, ChunkWriter, Constant, ConstantTag, FunctionSketch, RawConstant};
