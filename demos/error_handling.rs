//! Demonstrate the errors raised at each stage of rendering a snippet.

use snipdoc::{Context, Error, Value};

fn report(label: &str, result: Result<String, Error>) {
    println!("{label}:");
    match result {
        Ok(command) => println!("  Rendered: {command}"),
        Err(Error::Parse(e)) => {
            println!("  Parse error: {e}");
            println!("  Kind: {:?}", e.kind);
            let (line, column) = e.span.line_col();
            println!("  Location: line {line}, column {column}");
        }
        Err(Error::Transform(e)) => {
            println!("  Transform error: {e}");
            println!("  Block: {} ({:?})", e.block, e.kind);
        }
        Err(Error::Interpolation(group)) => {
            println!("  {} field(s) failed:", group.errors().len());
            for error in group.errors() {
                println!("    {}: {} ({:?})", error.field.name, error.message, error.kind);
            }
        }
    }
    println!();
}

fn main() {
    let empty = Context::new();

    // Flags are toggles and cannot carry hints
    report(
        "Flag with a type hint",
        snipdoc::render("{-v} (bool) verbose", "ls {-v}", &empty),
    );

    // Positional and named fields cannot be mixed
    report(
        "Mixed numbering",
        snipdoc::render("", "cp {} {dest}", &empty),
    );

    // A failing code block aborts the render
    report(
        "Failing code block",
        snipdoc::render("```\nratio = 1 / count\n```\n", "{ratio}", &{
            let mut c = Context::new();
            c.insert("count".into(), Value::Int(0));
            c
        }),
    );

    // Field errors are collected, not raised one by one
    let mut context = Context::new();
    context.insert("port".into(), "http".into());
    report(
        "Missing and badly formatted fields",
        snipdoc::render("", "nc {host} {port:d}", &context),
    );
}
