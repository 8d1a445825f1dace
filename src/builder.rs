use rust_decimal::Decimal;

use crate::ast::{CodeBlock, Documentation, Parameter, Scalar, ValueHint, ValueList, ValueRange};

/// Range whose explicit step is zero or negative.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("range step must be positive, got {0}")]
pub struct InvalidStep(pub Decimal);

impl Documentation {
    /// Create an empty documentation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the header text.
    #[must_use]
    pub fn header(mut self, text: &str) -> Self {
        self.header = text.to_string();
        self
    }

    /// Add a parameter; a repeated name replaces the earlier one in place.
    #[must_use]
    pub fn parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.insert(parameter);
        self
    }

    /// Append a code block.
    #[must_use]
    pub fn code_block(mut self, source: &str) -> Self {
        self.code_blocks.push(CodeBlock {
            source: source.to_string(),
        });
        self
    }
}

impl Parameter {
    /// Create a parameter with no hints and an empty description.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            type_hint: None,
            value_hint: None,
            text: String::new(),
        }
    }

    #[must_use]
    pub fn type_hint(mut self, hint: &str) -> Self {
        self.type_hint = Some(hint.to_string());
        self
    }

    #[must_use]
    pub fn value_hint(mut self, hint: ValueHint) -> Self {
        self.value_hint = Some(hint);
        self
    }

    #[must_use]
    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }
}

impl ValueList {
    /// Create a list; an out-of-range default index is clamped to the last
    /// entry.
    #[must_use]
    pub fn new(values: Vec<Scalar>, default_index: usize) -> Self {
        let default_index = default_index.min(values.len().saturating_sub(1));
        Self {
            values,
            default_index,
        }
    }
}

impl ValueRange {
    /// Create a range.
    ///
    /// `end` below `start` is raised to `start`, and `default` (which falls
    /// back to `start`) is clamped into the bounds. Without an explicit
    /// step, integral bounds step by one and fractional bounds by the
    /// smallest power of ten that covers their decimal places.
    pub fn new(
        start: Decimal,
        end: Decimal,
        step: Option<Decimal>,
        default: Option<Decimal>,
    ) -> Result<Self, InvalidStep> {
        let end = end.max(start);
        let step = match step {
            Some(step) if step <= Decimal::ZERO => return Err(InvalidStep(step)),
            Some(step) => step,
            None => infer_step(start, end),
        };
        let default = default.unwrap_or(start).clamp(start, end);
        Ok(Self {
            start,
            end,
            step,
            default,
        })
    }
}

fn infer_step(start: Decimal, end: Decimal) -> Decimal {
    if start.fract().is_zero() && end.fract().is_zero() {
        return Decimal::ONE;
    }
    // Decimal places as written: `0.50` steps by `0.01`.
    let places = start.scale().max(end.scale());
    Decimal::new(1, places)
}

impl From<ValueList> for ValueHint {
    fn from(list: ValueList) -> Self {
        Self::List(list)
    }
}

impl From<ValueRange> for ValueHint {
    fn from(range: ValueRange) -> Self {
        Self::Range(range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().expect("decimal")
    }

    fn range(start: &str, end: &str) -> ValueRange {
        ValueRange::new(dec(start), dec(end), None, None).expect("range")
    }

    #[test]
    fn integral_bounds_step_by_one() {
        assert_eq!(range("1", "10").step, Decimal::ONE);
        assert_eq!(range("1.0", "3.00").step, Decimal::ONE);
    }

    #[test]
    fn fractional_bounds_step_by_places() {
        assert_eq!(range("0.1", "0.25").step.to_string(), "0.01");
        assert_eq!(range("1", "1.255").step.to_string(), "0.001");
        assert_eq!(range("0.50", "2").step.to_string(), "0.01");
    }

    #[test]
    fn default_is_clamped() {
        let r = ValueRange::new(dec("1"), dec("10"), None, Some(dec("42"))).expect("range");
        assert_eq!(r.default, dec("10"));
        let r = ValueRange::new(dec("1"), dec("10"), None, Some(dec("-3"))).expect("range");
        assert_eq!(r.default, dec("1"));
        let r = ValueRange::new(dec("1"), dec("10"), None, None).expect("range");
        assert_eq!(r.default, dec("1"));
    }

    #[test]
    fn inverted_bounds_collapse() {
        let r = range("5", "2");
        assert_eq!((r.start, r.end), (dec("5"), dec("5")));
    }

    #[test]
    fn non_positive_step_is_rejected() {
        let err = ValueRange::new(dec("1"), dec("2"), Some(Decimal::ZERO), None).unwrap_err();
        assert_eq!(err, InvalidStep(Decimal::ZERO));
    }

    #[test]
    fn list_default_index_is_clamped() {
        let list = ValueList::new(vec![Scalar::Str("a".into())], 3);
        assert_eq!(list.default_index, 0);
    }

    #[test]
    fn builder_last_wins_keeps_position() {
        let doc = Documentation::new()
            .header("demo")
            .parameter(Parameter::new("a").text("first"))
            .parameter(Parameter::new("b"))
            .parameter(Parameter::new("a").text("second"));
        let names: Vec<_> = doc.parameters.names().collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(doc.parameters.get("a").map(|p| p.text.as_str()), Some("second"));
    }
}
