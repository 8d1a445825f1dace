#![allow(dead_code)]

use rust_decimal::Decimal;
use snipdoc::{CommandTemplate, Context, Documentation, Value, parse, parse_template};

pub fn doc(input: &str) -> Documentation {
    parse(input).unwrap_or_else(|e| panic!("parse failed: {e}\n--- input ---\n{input}"))
}

pub fn template(input: &str) -> CommandTemplate {
    parse_template(input).unwrap_or_else(|e| panic!("parse failed: {e}\n--- input ---\n{input}"))
}

pub fn dec(s: &str) -> Decimal {
    s.parse().expect("decimal")
}

pub fn ctx(pairs: &[(&str, Value)]) -> Context {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

/// Assert that the template's node spans reproduce its source exactly.
pub fn assert_lossless(t: &CommandTemplate) {
    let rebuilt: String = t.nodes.iter().map(|n| t.source_of(n)).collect();
    assert_eq!(
        rebuilt, t.raw,
        "span mismatch:\n--- raw ---\n{}\n--- rebuilt ---\n{rebuilt}",
        t.raw
    );
}
