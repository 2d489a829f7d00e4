//! Opal error reporting: structured errors plus coloured diagnostics.

use std::fmt;

use inkwell::builder::BuilderError;
use thiserror::Error;

/// The phase of compilation where an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Lexer,
    Parser,
    Codegen,
    Jit,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Lexer   => write!(f, "lex"),
            Phase::Parser  => write!(f, "parse"),
            Phase::Codegen => write!(f, "codegen"),
            Phase::Jit     => write!(f, "jit"),
        }
    }
}

/// Every failure the front end, generator or JIT can raise.
///
/// There is no recovery inside the generator: the first error aborts the
/// whole pass and is handed back to the caller unchanged.
#[derive(Debug, Error)]
pub enum OpalError {
    /// Lexer or parser rejected the source.
    #[error("line {line}: {message}")]
    Syntax {
        phase: Phase,
        line: usize,
        message: String,
    },

    /// A class names a parent that was never declared.
    #[error("Parent class {parent} not defined")]
    UndefinedParent { class: String, parent: String },

    /// Duplicate classes or methods, inheritance cycles.
    #[error("{0}")]
    Structural(String),

    /// A call targets a symbol the module never declared.
    #[error("Calling non existing function '{0}'")]
    UndefinedFunction(String),

    #[error("Undefined variable: '{0}'")]
    UndefinedVariable(String),

    #[error("can't print {0}")]
    CannotPrint(String),

    #[error("Unsupported cast from {from} to {to}")]
    UnsupportedCast { from: String, to: String },

    #[error("{0}")]
    Unsupported(String),

    /// Raised by checked AST comparison, never by the generator.
    #[error("{0}")]
    Logic(String),

    #[error("instruction builder failed: {0}")]
    Builder(#[from] BuilderError),

    #[error("module verification failed:\n{0}")]
    Verify(String),

    #[error("{0}")]
    Jit(String),
}

impl OpalError {
    pub fn lexer(line: usize, message: impl Into<String>) -> Self {
        OpalError::Syntax { phase: Phase::Lexer, line, message: message.into() }
    }

    pub fn parser(line: usize, message: impl Into<String>) -> Self {
        OpalError::Syntax { phase: Phase::Parser, line, message: message.into() }
    }

    /// The phase this error belongs to.
    pub fn phase(&self) -> Phase {
        match self {
            OpalError::Syntax { phase, .. } => *phase,
            OpalError::Jit(_) => Phase::Jit,
            _ => Phase::Codegen,
        }
    }

    /// An optional suggestion printed under the error.
    pub fn hint(&self) -> Option<String> {
        match self {
            OpalError::UndefinedParent { parent, .. } if parent == "Object" => Some(
                "Declare the root class first:\n    class Object\n    end".into(),
            ),
            OpalError::UndefinedParent { parent, .. } => {
                Some(format!("Declare 'class {parent}' or fix the name after '<'"))
            }
            OpalError::CannotPrint(_) => {
                Some("print() accepts strings, integers, floats and booleans".into())
            }
            _ => None,
        }
    }
}

pub type Result<T, E = OpalError> = std::result::Result<T, E>;

/// Print an error to stderr with red colouring (ANSI).
pub fn report(err: &OpalError) {
    // Red bold: \x1b[1;31m   Reset: \x1b[0m
    eprintln!(
        "\x1b[1;31merror\x1b[0m\x1b[1m[{}]:\x1b[0m {}",
        err.phase(), err,
    );
    if let Some(hint) = err.hint() {
        eprintln!("  \x1b[1;36mhint:\x1b[0m {hint}");
    }
}

// ═══════════════════════════════════════════════════════════════════
// Warnings (yellow)
// ═══════════════════════════════════════════════════════════════════

/// Print a yellow warning to stderr.
pub fn warn(message: impl fmt::Display) {
    eprintln!("\x1b[1;33mwarning\x1b[0m\x1b[1m:\x1b[0m {message}");
}

// ═══════════════════════════════════════════════════════════════════
// Info messages (cyan [opal] tag)
// ═══════════════════════════════════════════════════════════════════

/// Print a status/info message with a coloured `[opal]` prefix.
pub fn info(message: impl fmt::Display) {
    eprintln!("\x1b[1;34m[opal]\x1b[0m {message}");
}

/// Print a success message in green.
pub fn success(message: impl fmt::Display) {
    eprintln!("\x1b[1;32m[opal]\x1b[0m {message}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_render_short_names() {
        assert_eq!(Phase::Lexer.to_string(), "lex");
        assert_eq!(Phase::Codegen.to_string(), "codegen");
    }

    #[test]
    fn undefined_parent_names_the_parent() {
        let err = OpalError::UndefinedParent { class: "Foo".into(), parent: "Bar".into() };
        assert_eq!(err.to_string(), "Parent class Bar not defined");
        assert_eq!(err.phase(), Phase::Codegen);
        assert!(err.hint().unwrap().contains("class Bar"));
    }

    #[test]
    fn syntax_errors_keep_their_phase() {
        let err = OpalError::parser(3, "expected 'end'");
        assert_eq!(err.phase(), Phase::Parser);
        assert_eq!(err.to_string(), "line 3: expected 'end'");
    }
}
