//! Interpolation of command templates against a field-value context.
//!
//! [`try_interpolate`] never fails as a whole: every field either yields its
//! formatted value or an [`InterpolationError`], so a live preview can keep
//! showing everything that did render. [`interpolate`] and [`render_str`]
//! are the strict counterparts that fail with the collected errors.

use std::fmt;

use rust_decimal::prelude::ToPrimitive;
use tracing::trace;

use crate::ast::{CommandTemplate, Field, Node};
use crate::formatter::format_value;
use crate::value::{Context, Value};

/// Classifies an interpolation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpolationErrorKind {
    /// The context has no usable value for the field.
    InvalidContext,
    /// The value could not be converted or formatted.
    Format,
}

/// A field that could not be rendered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}: {message}", .field.name)]
pub struct InterpolationError {
    pub kind: InterpolationErrorKind,
    pub field: Field,
    pub message: String,
}

/// Every error of a failed interpolation, in template order. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", Summary(.0))]
pub struct InterpolationErrorGroup(pub Vec<InterpolationError>);

struct Summary<'a>(&'a [InterpolationError]);

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} field(s) failed to render", self.0.len())?;
        for error in self.0 {
            write!(f, "; {error}")?;
        }
        Ok(())
    }
}

impl InterpolationErrorGroup {
    #[must_use]
    pub fn errors(&self) -> &[InterpolationError] {
        &self.0
    }
}

/// Kind of a markup segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Text,
    Field,
    Error,
}

/// `(kind, text)` piece of rendered markup.
pub type Segment = (SegmentKind, String);

/// Render each node lazily, yielding either its text or the field's error.
pub fn try_interpolate<'t>(
    template: &'t CommandTemplate,
    context: &'t Context,
) -> impl Iterator<Item = Result<(&'t Node, String), InterpolationError>> + 't {
    template.nodes.iter().map(move |node| match node {
        Node::Text(text) => Ok((node, text.text.clone())),
        Node::Field(field) => resolve(field, context).map(|value| (node, value)),
    })
}

/// Render every node, failing with all field errors if there are any.
///
/// # Errors
///
/// Returns the non-empty group of errors collected across all fields.
pub fn interpolate<'t>(
    template: &'t CommandTemplate,
    context: &'t Context,
) -> Result<Vec<(&'t Node, String)>, InterpolationErrorGroup> {
    let mut rendered = Vec::with_capacity(template.nodes.len());
    let mut errors = Vec::new();
    for item in try_interpolate(template, context) {
        match item {
            Ok(pair) => rendered.push(pair),
            Err(error) => errors.push(error),
        }
    }
    if errors.is_empty() {
        Ok(rendered)
    } else {
        Err(InterpolationErrorGroup(errors))
    }
}

/// Render the template to a plain string.
///
/// # Errors
///
/// Fails like [`interpolate`].
pub fn render_str(
    template: &CommandTemplate,
    context: &Context,
) -> Result<String, InterpolationErrorGroup> {
    Ok(interpolate(template, context)?
        .into_iter()
        .map(|(_, value)| value)
        .collect())
}

/// Render the template to tagged segments. A failing field becomes an
/// `Error` segment reading `<error(name)>` instead of aborting the render.
#[must_use]
pub fn render_markup(template: &CommandTemplate, context: &Context) -> Vec<Segment> {
    try_interpolate(template, context)
        .map(|item| match item {
            Ok((Node::Text(_), text)) => (SegmentKind::Text, text),
            Ok((Node::Field(_), value)) => (SegmentKind::Field, value),
            Err(error) => (SegmentKind::Error, format!("<error({})>", error.field.name)),
        })
        .collect()
}

fn resolve(field: &Field, context: &Context) -> Result<String, InterpolationError> {
    let Some(value) = context.get(&field.name) else {
        return Err(fail(
            field,
            InterpolationErrorKind::InvalidContext,
            format!("no value for field '{}'", field.name),
        ));
    };
    let converted;
    let value = match field.conversion {
        Some(conversion) => {
            converted = conversion.apply(value);
            &converted
        }
        None => value,
    };

    format_value(value, &field.format_spec).or_else(|err| {
        // Whole decimals also accept integer-only specs such as `x` or `b`.
        let as_int = match value {
            Value::Decimal(d) if d.fract().is_zero() => d.to_i64(),
            _ => None,
        };
        as_int
            .and_then(|i| format_value(&Value::Int(i), &field.format_spec).ok())
            .ok_or_else(|| fail(field, InterpolationErrorKind::Format, err.to_string()))
    })
}

fn fail(field: &Field, kind: InterpolationErrorKind, message: String) -> InterpolationError {
    trace!(field = %field.name, %message, "field failed to render");
    InterpolationError {
        kind,
        field: field.clone(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::template::parse_template;

    fn ctx(pairs: &[(&str, Value)]) -> Context {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn repr_conversion() {
        let t = parse_template("foo {bar!r}").expect("parse failed");
        let c = ctx(&[("bar", "baz".into())]);
        assert_eq!(render_str(&t, &c).expect("render"), "foo 'baz'");
        assert_eq!(
            render_markup(&t, &c),
            vec![
                (SegmentKind::Text, "foo ".to_string()),
                (SegmentKind::Field, "'baz'".to_string()),
            ]
        );
    }

    #[test]
    fn hex_of_integer_and_whole_decimal() {
        let t = parse_template("0x{v:X}").expect("parse failed");
        let c = ctx(&[("v", Value::Int(3_735_928_559))]);
        assert_eq!(render_str(&t, &c).expect("render"), "0xDEADBEEF");
        let d = Decimal::from(3_735_928_559_i64);
        let c = ctx(&[("v", Value::Decimal(d))]);
        assert_eq!(render_str(&t, &c).expect("render"), "0xDEADBEEF");
    }

    #[test]
    fn fractional_decimal_does_not_retry() {
        let t = parse_template("{v:x}").expect("parse failed");
        let c = ctx(&[("v", Value::Decimal("1.5".parse().expect("decimal")))]);
        let err = render_str(&t, &c).unwrap_err();
        assert_eq!(err.errors()[0].kind, InterpolationErrorKind::Format);
    }

    #[test]
    fn format_failure_is_collected() {
        let t = parse_template("{v:X}").expect("parse failed");
        let c = ctx(&[("v", "nope".into())]);
        let err = interpolate(&t, &c).unwrap_err();
        assert_eq!(err.errors().len(), 1);
        assert_eq!(err.errors()[0].kind, InterpolationErrorKind::Format);
        assert_eq!(err.errors()[0].field.name, "v");
    }

    #[test]
    fn missing_value_is_invalid_context() {
        let t = parse_template("echo {a} {b}").expect("parse failed");
        let c = ctx(&[("a", "x".into())]);
        let err = interpolate(&t, &c).unwrap_err();
        assert_eq!(err.errors().len(), 1);
        assert_eq!(err.errors()[0].kind, InterpolationErrorKind::InvalidContext);
        assert_eq!(err.to_string(), "1 field(s) failed to render; b: no value for field 'b'");
    }

    #[test]
    fn markup_keeps_going_after_errors() {
        let t = parse_template("{a} and {b:d}").expect("parse failed");
        let c = ctx(&[("b", "x".into())]);
        assert_eq!(
            render_markup(&t, &c),
            vec![
                (SegmentKind::Error, "<error(a)>".to_string()),
                (SegmentKind::Text, " and ".to_string()),
                (SegmentKind::Error, "<error(b)>".to_string()),
            ]
        );
    }

    #[test]
    fn quote_conversion() {
        let t = parse_template("grep {pattern!q} .").expect("parse failed");
        let c = ctx(&[("pattern", "it's here".into())]);
        assert_eq!(render_str(&t, &c).expect("render"), "grep 'it'\\''s here' .");
    }

    #[test]
    fn try_interpolate_pairs_nodes_with_values() {
        let t = parse_template("a{x}b").expect("parse failed");
        let c = ctx(&[("x", Value::Int(1))]);
        let items: Vec<_> = try_interpolate(&t, &c)
            .map(|item| item.expect("ok").1)
            .collect();
        assert_eq!(items, ["a", "1", "b"]);
    }
}
