//! Whole-snippet scenarios: documentation, transforms and rendering
//! together, the way an editor drives them while a user fills in fields.

mod common;

use common::{ctx, doc, template};
use snipdoc::{Context, Error, SegmentKind, render, render_markup, render_str};

const FFMPEG_DOC: &str = "\
Cut a clip out of a video without re-encoding.

{input} (file) source video
{start} (str) start timestamp, e.g. 00:01:30
{seconds} [1:600:1=>30] clip length in seconds
{-y} overwrite the output file
{format} [=>'mp4', 'mkv', 'webm'] container
```
# derive the output name from the input
stem = input
if '.' in input:
    stem = replace(input, '.' + format, '')
output = stem + '_clip.' + format
```
";

const FFMPEG_CMD: &str = "ffmpeg {-y} -ss {start} -i {input!q} -t {seconds} -c copy {output!q}";

#[test]
fn clip_snippet_renders_with_defaults_and_overrides() {
    let d = doc(FFMPEG_DOC);
    assert_eq!(d.header, "Cut a clip out of a video without re-encoding.");
    assert_eq!(d.parameters.len(), 5);
    assert_eq!(d.code_blocks.len(), 1);

    let mut context = d.default_context();
    context.insert("input".into(), "my movie.mp4".into());
    context.insert("start".into(), "00:01:30".into());

    let t = template(FFMPEG_CMD);
    let rendered = render_str(&t, &d.execute(&context).expect("execute")).expect("render");
    assert_eq!(
        rendered,
        "ffmpeg  -ss 00:01:30 -i 'my movie.mp4' -t 30 -c copy 'my movie_clip.mp4'"
    );

    let overwrite = d.parameters.get("-y").expect("-y").flag_value(true);
    context.insert("-y".into(), overwrite);
    context.insert("format".into(), "mkv".into());
    context.insert("input".into(), "talk.mkv".into());
    let rendered = render_str(&t, &d.execute(&context).expect("execute")).expect("render");
    assert_eq!(
        rendered,
        "ffmpeg -y -ss 00:01:30 -i talk.mkv -t 30 -c copy talk_clip.mkv"
    );
}

#[test]
fn live_preview_while_typing() {
    let d = doc(FFMPEG_DOC);
    let t = template(FFMPEG_CMD);

    // Nothing typed yet: the code block needs `input`, so transforms fail
    // and the preview falls back to the raw field values.
    let context = d.default_context();
    assert!(d.execute(&context).is_err());

    let segments = render_markup(&t, &context);
    let errors: Vec<_> = segments
        .iter()
        .filter(|(kind, _)| *kind == SegmentKind::Error)
        .map(|(_, text)| text.as_str())
        .collect();
    assert_eq!(
        errors,
        ["<error(start)>", "<error(input)>", "<error(output)>"]
    );
}

#[test]
fn flags_render_from_the_default_context() {
    let d = doc("List files.\n{-l} long listing\n{-a} include dotfiles\n");
    let t = template("ls {-l} {-a} .");
    let mut context = d.default_context();
    let rendered = render_str(&t, &d.execute(&context).expect("execute")).expect("render");
    assert_eq!(rendered, "ls   .");

    let long = d.parameters.get("-l").expect("-l").flag_value(true);
    context.insert("-l".into(), long);
    let rendered = render_str(&t, &d.execute(&context).expect("execute")).expect("render");
    assert_eq!(rendered, "ls -l  .");
}

#[test]
fn one_step_render() {
    let context = ctx(&[("name", "world".into())]);
    let out = render(
        "{name} who to greet\n```\ngreeting = 'hello ' + name\n```\n",
        "echo {greeting!q}",
        &context,
    )
    .expect("render failed");
    assert_eq!(out, "echo 'hello world'");
}

#[test]
fn unified_error_variants() {
    let empty = Context::new();

    let err = render("{-f} (str)", "x", &empty).unwrap_err();
    assert!(matches!(err, Error::Parse(_)));

    let err = render("", "x {", &empty).unwrap_err();
    assert!(matches!(err, Error::Parse(_)));

    let err = render("```\nx = 1 / 0\n```\n", "{x}", &empty).unwrap_err();
    assert!(matches!(err, Error::Transform(_)));

    let err = render("", "{x}", &empty).unwrap_err();
    let Error::Interpolation(group) = &err else {
        panic!("expected interpolation error, got {err:?}");
    };
    assert_eq!(group.errors()[0].field.name, "x");
    assert_eq!(
        err.to_string(),
        "1 field(s) failed to render; x: no value for field 'x'"
    );
}

#[test]
fn positional_snippet() {
    let d = doc("Copy a file.\n{} source\n{} (path) destination\n");
    let names: Vec<_> = d.parameters.names().collect();
    assert_eq!(names, ["0", "1"]);

    let t = template("cp {} {}");
    let context = ctx(&[("0", "a.txt".into()), ("1", "b dir/".into())]);
    assert_eq!(render_str(&t, &context).expect("render"), "cp a.txt b dir/");
}
