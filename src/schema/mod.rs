//! Typed views over decoded bytecode: opcodes, operands, and the
//! extension table that maps binary-local indices to names.

pub mod extension;
pub mod opcode;
pub mod operand;

pub use extension::ExtensionTable;
pub use opcode::OpCode;
pub use operand::Operand;
