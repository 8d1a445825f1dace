//! CLI tool to check snippet documentation and render commands.

use std::fs;
use std::process::ExitCode;

use snipdoc::{Context, Documentation, FieldKind, Parameter, Value, ValueHint};
use tracing::Level;

fn usage() -> ExitCode {
    eprintln!("Usage: snipdoc <command> [args...]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  check <doc-file>...                           Check if documentation file(s) are valid");
    eprintln!("  params <doc-file>                             List documented parameters");
    eprintln!("  render <doc-file> <command-file> [name=value...]  Render a command");
    eprintln!("                                                (a bare -flag switches that flag on)");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  snipdoc check resize.md");
    eprintln!("  snipdoc render resize.md resize.cmd width=640 in=photo.png");
    eprintln!();
    eprintln!("Set SNIPDOC_DEBUG to log parsing and transform details.");
    ExitCode::from(2)
}

fn main() -> ExitCode {
    let level = if std::env::var_os("SNIPDOC_DEBUG").is_some() {
        Level::DEBUG
    } else {
        Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        return usage();
    }

    let command = args[1].as_str();
    let rest = &args[2..];

    match command {
        "check" if !rest.is_empty() => check(rest),
        "params" if rest.len() == 1 => params(&rest[0]),
        "render" if rest.len() >= 2 => render(&rest[0], &rest[1], &rest[2..]),
        "check" | "params" | "render" => {
            eprintln!("Error: wrong number of arguments for {command}");
            ExitCode::from(2)
        }
        _ => {
            eprintln!("Unknown command: {command}");
            ExitCode::from(2)
        }
    }
}

fn read(path: &str) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(c) => Some(c),
        Err(e) => {
            eprintln!("{path}: {e}");
            None
        }
    }
}

fn load(path: &str) -> Option<Documentation> {
    let content = read(path)?;
    match snipdoc::parse(&content) {
        Ok(doc) => Some(doc),
        Err(e) => {
            eprintln!("{path}: {e}");
            None
        }
    }
}

fn check(files: &[String]) -> ExitCode {
    let mut had_error = false;

    for path in files {
        match load(path) {
            Some(doc) => {
                let params = doc.parameters.len();
                let blocks = doc.code_blocks.len();
                eprintln!("{path}: valid ({params} parameter(s), {blocks} code block(s))");
            }
            None => had_error = true,
        }
    }

    if had_error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn params(path: &str) -> ExitCode {
    let Some(doc) = load(path) else {
        return ExitCode::FAILURE;
    };

    for parameter in &doc.parameters {
        println!("{}", describe(parameter));
    }
    ExitCode::SUCCESS
}

fn describe(parameter: &Parameter) -> String {
    let kind = match parameter.kind() {
        FieldKind::Flag => "flag",
        FieldKind::Range => "range",
        FieldKind::Choice => "choice",
        FieldKind::Path => "path",
        FieldKind::Text => "text",
    };
    let mut line = format!("{}\t{kind}", parameter.name);
    if let Some(hint) = &parameter.type_hint {
        line.push_str(&format!(" ({hint})"));
    }
    match &parameter.value_hint {
        Some(ValueHint::Range(r)) => {
            line.push_str(&format!(" [{}:{}:{}]", r.start, r.end, r.step));
        }
        Some(ValueHint::List(list)) => {
            let values: Vec<String> = list.values.iter().map(ToString::to_string).collect();
            line.push_str(&format!(" [{}]", values.join(", ")));
        }
        None => {}
    }
    if let Some(default) = parameter.default_value() {
        line.push_str(&format!(" default={}", default.repr()));
    }
    if !parameter.text.is_empty() {
        line.push_str(&format!("\t{}", parameter.text.replace('\n', " ")));
    }
    line
}

fn render(doc_path: &str, command_path: &str, assignments: &[String]) -> ExitCode {
    let Some(doc) = load(doc_path) else {
        return ExitCode::FAILURE;
    };
    let Some(raw) = read(command_path) else {
        return ExitCode::FAILURE;
    };
    let template = match snipdoc::parse_template(raw.trim_end_matches('\n')) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("{command_path}: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut context: Context = doc.default_context();
    for assignment in assignments {
        let (name, value) = match assignment.split_once('=') {
            Some((name, value)) => (name, Value::infer(value)),
            None if assignment.starts_with('-') => (assignment.as_str(), Value::Bool(true)),
            None => {
                eprintln!("Error: expected name=value, got {assignment}");
                return ExitCode::from(2);
            }
        };
        let value = match (doc.parameters.get(name), value) {
            (Some(parameter), Value::Bool(on)) if parameter.is_flag() => parameter.flag_value(on),
            (_, value) => value,
        };
        context.insert(name.to_string(), value);
    }

    let context = match doc.execute(&context) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{doc_path}: {e}");
            return ExitCode::FAILURE;
        }
    };

    match snipdoc::render_str(&template, &context) {
        Ok(command) => {
            println!("{command}");
            ExitCode::SUCCESS
        }
        Err(group) => {
            for error in group.errors() {
                eprintln!("{error}");
            }
            ExitCode::FAILURE
        }
    }
}
