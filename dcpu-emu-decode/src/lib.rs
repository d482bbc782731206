pub mod decode;
pub mod instr;
pub mod op;
