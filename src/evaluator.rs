//! Source to output: parse, generate, verify and optionally run.

use inkwell::context::Context;
use tracing::debug;

use crate::compiler::{jit, Compiler};
use crate::errors::Result;
use crate::parser;
use crate::runtime;

/// How an evaluation is carried out.
#[derive(Debug, Clone)]
pub struct EvalOptions {
    pub module_name: String,
    /// Dump the IR to stderr once it is generated.
    pub print_ir: bool,
    /// Execute `main` after generation.
    pub run: bool,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            module_name: "opal-lang".to_string(),
            print_ir: false,
            run: true,
        }
    }
}

/// Result of one evaluation.
#[derive(Debug, Clone)]
pub struct Evaluation {
    /// Textual IR of the verified module.
    pub ir: String,
    /// Everything the program printed, when it was run.
    pub output: Option<String>,
}

pub struct Evaluator {
    options: EvalOptions,
}

impl Evaluator {
    pub fn new(options: EvalOptions) -> Self {
        Self { options }
    }

    /// Evaluate `source` in a fresh LLVM context.
    pub fn evaluate(&self, source: &str) -> Result<Evaluation> {
        let program = parser::parse(source)?;

        let context = Context::create();
        let compiler = Compiler::new(&context, &self.options.module_name);
        compiler.compile(&program)?;

        if self.options.print_ir {
            compiler.dump_ir();
        }
        let ir = compiler.ir_string();

        let output = if self.options.run {
            let (result, output) = runtime::capture(|| jit::run(compiler.module()));
            result?;
            debug!(bytes = output.len(), "program finished");
            Some(output)
        } else {
            None
        };

        Ok(Evaluation { ir, output })
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(EvalOptions::default())
    }
}

/// Evaluate with default options and return the program's output.
pub fn run(source: &str) -> Result<String> {
    let evaluation = Evaluator::default().evaluate(source)?;
    Ok(evaluation.output.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_reference_options() {
        let options = EvalOptions::default();
        assert_eq!(options.module_name, "opal-lang");
        assert!(!options.print_ir);
        assert!(options.run);
    }

    #[test]
    fn skipping_the_run_still_produces_ir() {
        let evaluator = Evaluator::new(EvalOptions { run: false, ..EvalOptions::default() });
        let evaluation = evaluator.evaluate("print(1)").unwrap();
        assert!(evaluation.output.is_none());
        assert!(evaluation.ir.contains("; ModuleID = 'opal-lang'"));
    }

    #[test]
    fn parse_errors_stop_before_codegen() {
        let err = Evaluator::default().evaluate("print(").unwrap_err();
        assert_eq!(err.phase(), crate::errors::Phase::Parser);
    }
}
