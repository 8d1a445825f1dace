//! Field values and the context they are looked up in.

use std::collections::HashMap;
use std::fmt::{self, Write as _};

use rust_decimal::Decimal;

/// Name → value mapping handed to transforms and the renderer.
pub type Context = HashMap<String, Value>;

/// A field value collected from the user or produced by a transform.
///
/// Numbers are either machine integers or exact decimals; binary floats
/// never appear, so a default such as `0.1` always renders as `0.1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Decimal(Decimal),
    Str(String),
}

impl Value {
    /// Short type name used in error messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Decimal(_) => "decimal",
            Self::Str(_) => "str",
        }
    }

    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Decimal(d) => !d.is_zero(),
            Self::Str(s) => !s.is_empty(),
        }
    }

    /// Debug representation: strings are quoted and escaped.
    #[must_use]
    pub fn repr(&self) -> String {
        match self {
            Self::Str(s) => quote_repr(s, false),
            other => other.to_string(),
        }
    }

    /// Like [`Value::repr`] but with every non-ASCII character escaped.
    #[must_use]
    pub fn ascii(&self) -> String {
        match self {
            Self::Str(s) => quote_repr(s, true),
            other => other.to_string(),
        }
    }

    /// POSIX shell quoting of the plain string form.
    #[must_use]
    pub fn shell_quoted(&self) -> String {
        shell_words::quote(&self.to_string()).into_owned()
    }

    /// Parse user input: integers, exact decimals and `true`/`false` are
    /// recognized, anything else stays a string.
    #[must_use]
    pub fn infer(input: &str) -> Self {
        match input {
            "true" => return Self::Bool(true),
            "false" => return Self::Bool(false),
            _ => {}
        }
        if let Ok(i) = input.parse::<i64>() {
            return Self::Int(i);
        }
        if input.contains('.') {
            if let Ok(d) = input.parse::<Decimal>() {
                return Self::Decimal(d);
            }
        }
        Self::Str(input.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Decimal(d) => write!(f, "{d}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Self::Decimal(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

/// Quote a string the way a debug representation does: single quotes
/// unless the text contains a single quote and no double quote.
fn quote_repr(s: &str, ascii_only: bool) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() || (ascii_only && !c.is_ascii()) => {
                let code = u32::from(c);
                let _ = if code < 0x100 {
                    write!(out, "\\x{code:02x}")
                } else if code < 0x1_0000 {
                    write!(out, "\\u{code:04x}")
                } else {
                    write!(out, "\\U{code:08x}")
                };
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}
