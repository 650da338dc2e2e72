pub mod disasm;
pub mod opcodes;
pub mod script;

pub use disasm::{Instruction, OperandValue, ScriptListing, Statement, disassemble};
pub use opcodes::{ConditionOp, Operand, OperatorOp, UnknownOpcode, fixed_width};
pub use script::{ObjectToken, ScriptFormatError, ScriptReader, ScriptWriter};
