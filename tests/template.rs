mod common;

use common::{assert_lossless, template};
use snipdoc::{Conversion, Node, ParseErrorKind, parse_template};

#[test]
fn literal_round_trip() {
    for raw in [
        "",
        "plain text",
        "i haz {} {} flags",
        "find {path} -name {pattern!q} -mtime {-d:+d}",
        "printf '{{%s}}\\n' {0!r:>12}",
        "héllo {world} ✓",
    ] {
        assert_lossless(&template(raw));
    }
}

#[test]
fn auto_numbering_in_order() {
    let names: Vec<_> = template("i haz {} {} flags")
        .fields()
        .map(|f| f.name.clone())
        .collect();
    assert_eq!(names, ["0", "1"]);
}

#[test]
fn numbering_cannot_mix() {
    assert_eq!(
        parse_template("i haz {1} {} flags").unwrap_err().kind,
        ParseErrorKind::ManualToAuto
    );
    assert_eq!(
        parse_template("{} {1}").unwrap_err().kind,
        ParseErrorKind::AutoToManual
    );
}

#[test]
fn node_offsets_are_bytes() {
    let t = template("→ {x}");
    let Node::Field(field) = &t.nodes[1] else {
        panic!("expected field");
    };
    assert_eq!((field.start, field.end), (4, 7));
    assert_eq!(t.nodes[1].span(), (4, 7));
    assert_eq!(t.source_of(&t.nodes[1]), "{x}");
}

#[test]
fn every_conversion() {
    let t = template("{a!r}{b!s}{c!a}{d!q}");
    let conversions: Vec<_> = t.fields().map(|f| f.conversion).collect();
    assert_eq!(
        conversions,
        [
            Some(Conversion::Repr),
            Some(Conversion::Str),
            Some(Conversion::Ascii),
            Some(Conversion::Quote)
        ]
    );
}

#[test]
fn format_spec_is_verbatim() {
    let t = template("{n:*^+#012,.3f}");
    let field = t.fields().next().expect("field");
    assert_eq!(field.format_spec, "*^+#012,.3f");
    assert_eq!(field.conversion, None);
}

#[test]
fn nested_replacement_in_spec_is_rejected() {
    let err = parse_template("{x:{width}d}").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::NestedFormatSpec);
    assert_eq!(
        err.to_string(),
        "nested replacement fields in format specs are not supported at line 1, column 1"
    );
}

#[test]
fn brace_errors() {
    assert_eq!(
        parse_template("x {").unwrap_err().kind,
        ParseErrorKind::UnmatchedOpenBrace
    );
    assert_eq!(
        parse_template("x } y").unwrap_err().kind,
        ParseErrorKind::UnmatchedCloseBrace
    );
}

#[test]
fn escaped_braces_are_unescaped_in_text() {
    let t = template("awk '{{print $1}}'");
    assert_eq!(t.nodes.len(), 1);
    let Node::Text(text) = &t.nodes[0] else {
        panic!("expected text");
    };
    assert_eq!(text.text, "awk '{print $1}'");
    assert_eq!((text.start, text.end), (0, t.raw.len()));
}
