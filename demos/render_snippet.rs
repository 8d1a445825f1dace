//! Parse a documented snippet, fill in some fields and render it.

use snipdoc::{FieldKind, SegmentKind, parse, parse_template, render_markup, render_str};

const DOC: &str = "\
Create a compressed archive of a directory.

{dir} (directory) directory to pack
{level} [1:9=>6] compression level
{-v} list files while packing
```
archive = replace(strip(dir), '/', '_') + '.tar.gz'
```
";

const COMMAND: &str = "GZIP=-{level} tar {-v} -czf {archive!q} {dir!q}";

fn main() {
    let doc = parse(DOC).expect("valid documentation");
    let template = parse_template(COMMAND).expect("valid command");

    println!("{}", doc.header);
    for parameter in &doc.parameters {
        let widget = match parameter.kind() {
            FieldKind::Flag => "toggle",
            FieldKind::Range => "slider",
            FieldKind::Choice => "dropdown",
            FieldKind::Path => "file chooser",
            FieldKind::Text => "text entry",
        };
        println!("  {:<8} {widget:<12} {}", parameter.name, parameter.text);
    }
    println!();

    let mut context = doc.default_context();

    // Before the directory is chosen the preview still shows the rest
    for (kind, text) in render_markup(&template, &context) {
        match kind {
            SegmentKind::Text => print!("{text}"),
            SegmentKind::Field => print!("[{text}]"),
            SegmentKind::Error => print!("{text}"),
        }
    }
    println!();

    context.insert("dir".into(), "my photos".into());
    if let Some(verbose) = doc.parameters.get("-v") {
        context.insert("-v".into(), verbose.flag_value(true));
    }
    let context = doc.execute(&context).expect("transforms succeed");
    println!("{}", render_str(&template, &context).expect("all fields set"));
}
