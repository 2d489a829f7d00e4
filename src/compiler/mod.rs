/// LLVM-backed compiler: lowers the AST to IR via Inkwell and runs it.
pub mod compiler;
pub mod codegen;
pub mod jit;

pub use compiler::Compiler;
