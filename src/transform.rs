//! Running a documentation's code blocks over a field context.
//!
//! Code blocks are compiled once per [`Documentation`] and then applied in
//! declaration order to a copy of the caller's context, each block seeing
//! the assignments of the ones before it.

use std::fmt;

use once_cell::sync::OnceCell;
use tracing::debug;

use crate::ast::{CodeBlock, Documentation};
use crate::script::Script;
use crate::value::Context;

/// A scripting backend for code blocks.
pub trait Engine {
    /// Compiled form of one code block.
    type Unit;
    type Error: fmt::Display;

    fn compile(&self, source: &str) -> Result<Self::Unit, Self::Error>;

    fn run(&self, unit: &Self::Unit, context: &mut Context) -> Result<(), Self::Error>;
}

/// Stage at which a code block failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformErrorKind {
    Compile,
    Runtime,
}

impl fmt::Display for TransformErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Compile => "compile",
            Self::Runtime => "run",
        })
    }
}

/// A code block that failed to compile or run. `block` is its 0-based
/// index in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("code block {} failed to {kind}: {message}", .block + 1)]
pub struct TransformError {
    pub block: usize,
    pub kind: TransformErrorKind,
    pub message: String,
}

/// Compile every block, stopping at the first failure.
///
/// # Errors
///
/// Returns a `Compile` error naming the offending block.
pub fn compile_blocks<E: Engine>(
    engine: &E,
    blocks: &[CodeBlock],
) -> Result<Vec<E::Unit>, TransformError> {
    blocks
        .iter()
        .enumerate()
        .map(|(block, code)| {
            engine.compile(&code.source).map_err(|err| TransformError {
                block,
                kind: TransformErrorKind::Compile,
                message: err.to_string(),
            })
        })
        .collect()
}

/// Run compiled units in order over a copy of `context`.
///
/// # Errors
///
/// Returns a `Runtime` error naming the offending block; `context` is
/// never modified.
pub fn apply<E: Engine>(
    engine: &E,
    units: &[E::Unit],
    context: &Context,
) -> Result<Context, TransformError> {
    let mut working = context.clone();
    for (block, unit) in units.iter().enumerate() {
        engine
            .run(unit, &mut working)
            .map_err(|err| TransformError {
                block,
                kind: TransformErrorKind::Runtime,
                message: err.to_string(),
            })?;
    }
    debug!(blocks = units.len(), fields = working.len(), "applied code blocks");
    Ok(working)
}

impl Documentation {
    /// Apply the code blocks with the built-in [`Script`] engine. The
    /// compiled blocks are cached on `self`.
    ///
    /// # Errors
    ///
    /// Returns the first compile or runtime failure.
    pub fn execute(&self, context: &Context) -> Result<Context, TransformError> {
        let units = self
            .compiled
            .get_or_try_init(|| compile_blocks(&Script, &self.code_blocks))?;
        apply(&Script, units, context)
    }
}

/// Applies one documentation's code blocks through a custom [`Engine`],
/// compiling them on first use.
pub struct TransformExecutor<'d, E: Engine> {
    documentation: &'d Documentation,
    engine: E,
    units: OnceCell<Vec<E::Unit>>,
}

impl<'d, E: Engine> TransformExecutor<'d, E> {
    pub const fn new(documentation: &'d Documentation, engine: E) -> Self {
        Self {
            documentation,
            engine,
            units: OnceCell::new(),
        }
    }

    /// # Errors
    ///
    /// Returns the first compile or runtime failure.
    pub fn execute(&self, context: &Context) -> Result<Context, TransformError> {
        let units = self
            .units
            .get_or_try_init(|| compile_blocks(&self.engine, &self.documentation.code_blocks))?;
        apply(&self.engine, units, context)
    }

    pub const fn engine(&self) -> &E {
        &self.engine
    }
}
