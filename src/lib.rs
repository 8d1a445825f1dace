//! Documentation and command templates for parameterized shell snippets.
//!
//! A snippet pairs a command template such as `tar -czf {archive} {src}`
//! with documentation that describes each field: a type hint, a list of
//! choices or a numeric range, and optional code blocks that derive field
//! values before the command is rendered.
//!
//! # Quick start
//!
//! ```
//! use snipdoc::{parse, parse_template, render_str};
//!
//! let source = "Resize an image.\n{width} [100:2000:100=>800] target width\n```\nheight = int(width) * 3 // 4\n```\n";
//! let doc = parse(source).unwrap();
//! let template = parse_template("convert -resize {width}x{height} in.png").unwrap();
//!
//! let context = doc.execute(&doc.default_context()).unwrap();
//! let command = render_str(&template, &context).unwrap();
//! assert_eq!(command, "convert -resize 800x600 in.png");
//! ```
//!
//! ## Live preview
//!
//! [`render_markup`] keeps going when a field fails, so a partially filled
//! form still previews:
//!
//! ```
//! use snipdoc::{Context, SegmentKind, parse_template, render_markup};
//!
//! let template = parse_template("ping -c {count} {host}").unwrap();
//! let mut context = Context::new();
//! context.insert("count".into(), 3.into());
//!
//! let segments = render_markup(&template, &context);
//! assert_eq!(segments[3], (SegmentKind::Error, "<error(host)>".to_string()));
//! ```

// Allow noisy pedantic lints that don't add value for
// a library crate.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod ast;
pub mod builder;
pub mod formatter;
pub mod lexer;
pub mod parser;
pub mod render;
pub mod scanner;
pub mod script;
pub mod template;
pub mod token;
pub mod transform;
pub mod value;

pub use ast::{
    CodeBlock, CommandTemplate, Conversion, Documentation, Field, FieldKind, Node, Parameter,
    Parameters, Scalar, Text, ValueHint, ValueList, ValueRange,
};
pub use builder::InvalidStep;
pub use formatter::{FormatError, format_value};
pub use lexer::{Lexer, tokenize};
pub use parser::{ParseError, ParseErrorKind, parse};
pub use render::{
    InterpolationError, InterpolationErrorGroup, InterpolationErrorKind, Segment, SegmentKind,
    interpolate, render_markup, render_str, try_interpolate,
};
pub use scanner::Scanner;
pub use script::{Program, Script, ScriptError};
pub use template::parse_template;
pub use token::{Span, Token, TokenKind};
pub use transform::{Engine, TransformError, TransformErrorKind, TransformExecutor};
pub use value::{Context, Value};

/// Unified error type covering parsing, transforms and rendering.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A documentation or command template parse error.
    #[error("{0}")]
    Parse(#[from] ParseError),
    /// A code block failed to compile or run.
    #[error("{0}")]
    Transform(#[from] TransformError),
    /// One or more fields failed to render.
    #[error("{0}")]
    Interpolation(#[from] InterpolationErrorGroup),
}

/// Parse both sources, run the code blocks over `context` and render the
/// command in one step.
pub fn render(documentation: &str, command: &str, context: &Context) -> Result<String, Error> {
    let doc = parse(documentation)?;
    let template = parse_template(command)?;
    let context = doc.execute(context)?;
    Ok(render_str(&template, &context)?)
}
