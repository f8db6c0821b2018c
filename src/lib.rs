pub mod parser;
pub mod stack;
pub mod vm;

pub use parser::{Instruction, Op, ParseError, Parser};
pub use stack::Stack;
pub use vm::{Vm, VmConfig, VmError};
