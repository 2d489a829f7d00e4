//! Opal: a small class-based language compiled to LLVM IR and run in-process.
//!
//! Pipeline: source → Lexer → Parser → AST → LLVM IR → MCJIT

pub mod ast;
pub mod compiler;
pub mod errors;
pub mod evaluator;
pub mod lexer;
pub mod parser;
pub mod runtime;

pub use errors::{OpalError, Phase, Result};
pub use evaluator::{run, EvalOptions, Evaluation, Evaluator};
