//! The built-in transform language.
//!
//! Code blocks run against the field context: every field is a variable,
//! and `fields["-f"]` reaches fields whose names are not identifiers.
//!
//! ```text
//! # comments run to the end of the line
//! width = int(width) * 2; label = upper(label)
//! if mode == "fast":
//!     fields["-j"] = 8
//! elif mode in "slow|safe": fields["-j"] = 1
//! else:
//!     pass
//! size = format(bytes / 1024, ".1f") + "K" if bytes > 1024 else str(bytes)
//! ```
//!
//! Supported: assignment and `+= -= *= /= //= %=`, `if`/`elif`/`else`,
//! `pass`, conditional expressions, `and`/`or`/`not`, comparisons
//! including `in`, integer and exact decimal arithmetic, and the builtins
//! `str int dec bool len lower upper strip replace format quote abs round min`.
//! Reading an undefined name is a runtime error.

mod interpreter;
mod lexer;
mod parser;

use tracing::trace;

use crate::transform::Engine;
use crate::value::Context;

/// A compile or runtime failure, located by 1-based line within the block.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct ScriptError {
    pub line: usize,
    pub message: String,
}

impl ScriptError {
    pub(crate) fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// A compiled code block, ready to run any number of times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    statements: Vec<parser::Stmt>,
}

impl Program {
    /// Compile a code block. Common leading indentation is removed first.
    ///
    /// # Errors
    ///
    /// Returns `ScriptError` on lexical or syntax errors.
    pub fn compile(source: &str) -> Result<Self, ScriptError> {
        let tokens = lexer::tokenize(&dedent(source))?;
        let statements = parser::parse(tokens)?;
        trace!(statements = statements.len(), "compiled code block");
        Ok(Self { statements })
    }

    /// Run the program, mutating `context` in place.
    ///
    /// # Errors
    ///
    /// Returns `ScriptError` on the first failing statement; assignments
    /// made before it stay in `context`.
    pub fn run(&self, context: &mut Context) -> Result<(), ScriptError> {
        interpreter::run(&self.statements, context)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// The built-in [`Engine`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Script;

impl Engine for Script {
    type Unit = Program;
    type Error = ScriptError;

    fn compile(&self, source: &str) -> Result<Program, ScriptError> {
        Program::compile(source)
    }

    fn run(&self, unit: &Program, context: &mut Context) -> Result<(), ScriptError> {
        unit.run(context)
    }
}

fn dedent(source: &str) -> String {
    let indent = source
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start_matches([' ', '\t']).len())
        .min()
        .unwrap_or(0);
    if indent == 0 {
        return source.to_string();
    }
    source
        .lines()
        .map(|line| line.get(indent..).unwrap_or_else(|| line.trim_start()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn indented_blocks_are_dedented() {
        let program = Program::compile("    x = 1\n    if x:\n        y = 2\n").expect("compile");
        let mut context = Context::new();
        program.run(&mut context).expect("run");
        assert_eq!(context["y"], Value::Int(2));
    }

    #[test]
    fn empty_block_compiles() {
        assert!(Program::compile("# nothing\n\n").expect("compile").is_empty());
    }

    #[test]
    fn error_display_names_the_line() {
        let err = Program::compile("x = \n").unwrap_err();
        assert!(err.to_string().starts_with("line 1: expected an expression"), "{err}");
    }
}
