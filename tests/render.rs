mod common;

use common::{ctx, dec, template};
use rust_decimal::Decimal;
use snipdoc::{
    InterpolationErrorKind, Node, SegmentKind, Value, interpolate, render_markup, render_str,
    try_interpolate,
};

#[test]
fn repr_field_text_and_markup() {
    let t = template("foo {bar!r}");
    let c = ctx(&[("bar", "baz".into())]);
    assert_eq!(render_str(&t, &c).expect("render"), "foo 'baz'");
    assert_eq!(
        render_markup(&t, &c),
        [
            (SegmentKind::Text, "foo ".to_string()),
            (SegmentKind::Field, "'baz'".to_string())
        ]
    );
}

#[test]
fn hex_from_integer_or_whole_decimal() {
    let t = template("0x{v:X}");
    for v in [Value::Int(3_735_928_559), Value::Decimal(dec("3735928559"))] {
        assert_eq!(
            render_str(&t, &ctx(&[("v", v)])).expect("render"),
            "0xDEADBEEF"
        );
    }
    assert_eq!(
        render_str(&t, &ctx(&[("v", Value::Decimal(dec("3735928559.000")))])).expect("render"),
        "0xDEADBEEF"
    );
}

#[test]
fn format_failure_is_an_interpolation_error() {
    let t = template("{v:X}");
    let group = interpolate(&t, &ctx(&[("v", "nope".into())])).unwrap_err();
    assert_eq!(group.errors().len(), 1);
    assert_eq!(group.errors()[0].kind, InterpolationErrorKind::Format);
}

#[test]
fn missing_value_is_invalid_context() {
    let t = template("{v:X}");
    let group = interpolate(&t, &ctx(&[("w", Value::Int(1))])).unwrap_err();
    assert_eq!(group.errors().len(), 1);
    assert_eq!(group.errors()[0].kind, InterpolationErrorKind::InvalidContext);
    assert_eq!(group.errors()[0].field.name, "v");
}

#[test]
fn errors_are_collected_in_template_order() {
    let t = template("{a:d} {b} {c:x}");
    let c = ctx(&[("a", "x".into()), ("c", Value::Decimal(dec("0.5")))]);
    let group = render_str(&t, &c).unwrap_err();
    let names: Vec<_> = group.errors().iter().map(|e| e.field.name.as_str()).collect();
    assert_eq!(names, ["a", "b", "c"]);
    let kinds: Vec<_> = group.errors().iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        [
            InterpolationErrorKind::Format,
            InterpolationErrorKind::InvalidContext,
            InterpolationErrorKind::Format
        ]
    );
}

#[test]
fn lazy_interpolation_keeps_going() {
    let t = template("{a} {b}");
    let c = ctx(&[("b", Value::Int(2))]);
    let items: Vec<_> = try_interpolate(&t, &c).collect();
    assert_eq!(items.len(), 3);
    assert!(items[0].is_err());
    let (node, value) = items[2].as_ref().expect("b renders");
    assert!(matches!(node, Node::Field(f) if f.name == "b"));
    assert_eq!(value, "2");
}

#[test]
fn conversions_then_spec() {
    let t = template("[{s!r:>8}] [{s!a}] [{p!q}] [{n!s:>4}]");
    let c = ctx(&[
        ("s", "café".into()),
        ("p", "my file.txt".into()),
        ("n", Value::Int(7)),
    ]);
    assert_eq!(
        render_str(&t, &c).expect("render"),
        "[  'café'] ['caf\\xe9'] ['my file.txt'] [   7]"
    );
}

#[test]
fn numeric_specs() {
    let c = ctx(&[
        ("i", Value::Int(1_234_567)),
        ("d", Value::Decimal(dec("3.14159"))),
        ("r", Value::Decimal(dec("0.125"))),
        ("neg", Value::Int(-42)),
    ]);
    let cases = [
        ("{i:,}", "1,234,567"),
        ("{i:_x}", "12_d687"),
        ("{d:.2f}", "3.14"),
        ("{d:10.3f}", "     3.142"),
        ("{r:.1%}", "12.5%"),
        ("{r:.2f}", "0.12"),
        ("{neg:+05d}", "-0042"),
        ("{i:#b}", "0b100101101011010000111"),
        ("{d:e}", "3.14159e+00"),
        ("{d:.2e}", "3.14e+00"),
        ("{d:<8}|", "3.14159 |"),
    ];
    for (raw, expected) in cases {
        assert_eq!(
            render_str(&template(raw), &c).expect(raw),
            expected,
            "rendering {raw}"
        );
    }
}

#[test]
fn percent_overflow_is_collected_not_fatal() {
    let group = render_str(&template("{v:%}"), &ctx(&[("v", Value::Decimal(Decimal::MAX))]))
        .unwrap_err();
    assert_eq!(group.errors()[0].kind, InterpolationErrorKind::Format);

    let d = common::doc("{v} [1:7922816251426433759354395033.5=>7922816251426433759354395033.5]");
    let segments = render_markup(&template("{v:.1%} ok"), &d.default_context());
    assert_eq!(
        segments,
        [
            (SegmentKind::Error, "<error(v)>".to_string()),
            (SegmentKind::Text, " ok".to_string())
        ]
    );
}

#[test]
fn oversized_width_is_a_format_error() {
    let group = render_str(&template("{x:999999999999}"), &ctx(&[("x", "a".into())])).unwrap_err();
    assert_eq!(group.errors()[0].kind, InterpolationErrorKind::Format);
}

#[test]
fn bools_render_as_words_or_numbers() {
    let c = ctx(&[("f", Value::Bool(true))]);
    assert_eq!(render_str(&template("{f}"), &c).expect("render"), "true");
    assert_eq!(render_str(&template("{f:d}"), &c).expect("render"), "1");
}
