//! Tokenizer for Opal source text.
pub mod lexer;

pub use lexer::{tokenize, unquote, SpannedToken, Token};
