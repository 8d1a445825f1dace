use std::fmt;

use once_cell::sync::OnceCell;
use rust_decimal::Decimal;

use crate::script::Program;
use crate::value::{Context, Value};

/// Parsed documentation of a snippet.
///
/// Immutable once parsed. The compiled form of the code blocks is built on
/// first use and cached here, so repeated renders share one compilation.
#[derive(Debug, Clone, Default)]
pub struct Documentation {
    pub header: String,
    pub parameters: Parameters,
    pub code_blocks: Vec<CodeBlock>,
    pub(crate) compiled: OnceCell<Vec<Program>>,
}

impl PartialEq for Documentation {
    fn eq(&self, other: &Self) -> bool {
        self.header == other.header
            && self.parameters == other.parameters
            && self.code_blocks == other.code_blocks
    }
}

impl Eq for Documentation {}

impl Documentation {
    /// Initial widget values for every parameter that has one.
    #[must_use]
    pub fn default_context(&self) -> Context {
        self.parameters
            .iter()
            .filter_map(|p| p.default_value().map(|v| (p.name.clone(), v)))
            .collect()
    }
}

/// Parameters in declaration order, keyed by name.
///
/// Inserting a name that already exists replaces the earlier declaration
/// in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameters(Vec<Parameter>);

impl Parameters {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.0.iter().find(|p| p.name == name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Parameter> {
        self.0.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|p| p.name.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn last_mut(&mut self) -> Option<&mut Parameter> {
        self.0.last_mut()
    }

    /// Insert or replace, returning the replaced declaration.
    pub fn insert(&mut self, parameter: Parameter) -> Option<Parameter> {
        if let Some(slot) = self.0.iter_mut().find(|p| p.name == parameter.name) {
            Some(std::mem::replace(slot, parameter))
        } else {
            self.0.push(parameter);
            None
        }
    }
}

impl<'a> IntoIterator for &'a Parameters {
    type Item = &'a Parameter;
    type IntoIter = std::slice::Iter<'a, Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A documented snippet input: `{name}(type)[hint] description`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub type_hint: Option<String>,
    pub value_hint: Option<ValueHint>,
    pub text: String,
}

/// Input control a front end should build for a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// On/off toggle for a `-f`/`--flag` parameter.
    Flag,
    /// Bounded numeric input.
    Range,
    /// Pick one of a list of values.
    Choice,
    /// File system path input.
    Path,
    /// Free text.
    Text,
}

const PATH_HINTS: [&str; 4] = ["path", "file", "dir", "directory"];

impl Parameter {
    #[must_use]
    pub fn is_flag(&self) -> bool {
        self.name.starts_with('-')
    }

    #[must_use]
    pub fn kind(&self) -> FieldKind {
        if self.is_flag() {
            return FieldKind::Flag;
        }
        match &self.value_hint {
            Some(ValueHint::Range(_)) => FieldKind::Range,
            Some(ValueHint::List(_)) => FieldKind::Choice,
            None => match self.type_hint.as_deref() {
                Some(hint) if PATH_HINTS.contains(&hint) => FieldKind::Path,
                _ => FieldKind::Text,
            },
        }
    }

    /// What a flag field renders as: its own name when switched on and
    /// nothing when off.
    #[must_use]
    pub fn flag_value(&self, on: bool) -> Value {
        Value::Str(if on { self.name.clone() } else { String::new() })
    }

    /// The value a freshly built input control starts with.
    #[must_use]
    pub fn default_value(&self) -> Option<Value> {
        if self.is_flag() {
            return Some(self.flag_value(false));
        }
        match self.value_hint.as_ref()? {
            ValueHint::Range(range) => Some(Value::Decimal(range.default)),
            ValueHint::List(list) => list.default().map(Scalar::to_value),
        }
    }
}

/// Constraint on the values a parameter accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueHint {
    List(ValueList),
    Range(ValueRange),
}

/// Enumerated choices with the index of the default one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueList {
    pub values: Vec<Scalar>,
    pub default_index: usize,
}

impl ValueList {
    #[must_use]
    pub fn default(&self) -> Option<&Scalar> {
        self.values.get(self.default_index)
    }
}

/// Numeric range; `start <= default <= end` always holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueRange {
    pub start: Decimal,
    pub end: Decimal,
    pub step: Decimal,
    pub default: Decimal,
}

/// A value-list entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scalar {
    Str(String),
    Number(Decimal),
}

impl Scalar {
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Str(s) => Value::Str(s.clone()),
            Self::Number(d) => Value::Decimal(*d),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Number(d) => write!(f, "{d}"),
        }
    }
}

/// Raw source of a fenced code block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    pub source: String,
}

/// Parsed command template.
///
/// The node spans tile `raw` exactly: concatenating the source slice of
/// every node gives back the original string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    pub raw: String,
    pub nodes: Vec<Node>,
}

impl CommandTemplate {
    /// Raw source text a node was parsed from.
    #[must_use]
    pub fn source_of(&self, node: &Node) -> &str {
        let (start, end) = node.span();
        &self.raw[start..end]
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.nodes.iter().filter_map(|node| match node {
            Node::Field(field) => Some(field),
            Node::Text(_) => None,
        })
    }
}

/// A command template node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Text(Text),
    Field(Field),
}

impl Node {
    /// Byte range `(start, end)` in the template source.
    #[must_use]
    pub const fn span(&self) -> (usize, usize) {
        match self {
            Self::Text(t) => (t.start, t.end),
            Self::Field(f) => (f.start, f.end),
        }
    }
}

/// Literal run of a command template, with `{{`/`}}` already unescaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Text {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// A `{name!conv:spec}` replacement site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub start: usize,
    pub end: usize,
    /// Verbatim text after `:`; empty when absent.
    pub format_spec: String,
    pub conversion: Option<Conversion>,
}

/// Conversion applied to a value before its format spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    /// `!r`: debug representation.
    Repr,
    /// `!s`: plain string.
    Str,
    /// `!a`: debug representation with non-ASCII escaped.
    Ascii,
    /// `!q`: shell-quoted string.
    Quote,
}

impl Conversion {
    #[must_use]
    pub const fn from_char(c: char) -> Option<Self> {
        match c {
            'r' => Some(Self::Repr),
            's' => Some(Self::Str),
            'a' => Some(Self::Ascii),
            'q' => Some(Self::Quote),
            _ => None,
        }
    }

    #[must_use]
    pub fn apply(self, value: &Value) -> Value {
        match self {
            Self::Repr => Value::Str(value.repr()),
            Self::Str => Value::Str(value.to_string()),
            Self::Ascii => Value::Str(value.ascii()),
            Self::Quote => Value::Str(value.shell_quoted()),
        }
    }
}
