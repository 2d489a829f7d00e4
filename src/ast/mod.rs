//! The Opal abstract syntax tree.
pub mod ast;

pub use ast::{BinOperator, Block, Comparison, Funktion, Klass, Node, Param, Program, Value};
