//! Command template parsing.
//!
//! A command template is literal text interleaved with `{...}` replacement
//! fields, as in a classic format string: `{{` and `}}` are escaped braces,
//! and a field reads `{name!conv:spec}` with both suffixes optional. Field
//! names are stricter than in a general format string: a CLI flag
//! (`-x`, `--long-name`), a bare integer, an identifier, or empty for
//! automatic numbering.

use tracing::debug;

use crate::ast::{CommandTemplate, Conversion, Field, Node, Text};
use crate::lexer::{is_ident_continue, is_ident_start};
use crate::parser::{Numbering, ParseError, ParseErrorKind};
use crate::scanner::Scanner;
use crate::token::Span;

/// Parse a command template.
///
/// # Errors
///
/// Returns `ParseError` on unbalanced braces, invalid field names or
/// conversions, nested format specs, and mixed field numbering.
pub fn parse_template(raw: &str) -> Result<CommandTemplate, ParseError> {
    let nodes = TemplateParser::new(raw).parse()?;
    debug!(
        fields = nodes.iter().filter(|n| matches!(n, Node::Field(_))).count(),
        "parsed command template"
    );
    Ok(CommandTemplate {
        raw: raw.to_string(),
        nodes,
    })
}

#[derive(Debug, Clone, Copy)]
struct Mark {
    pos: usize,
    line: usize,
    col: usize,
}

struct TemplateParser<'a> {
    scanner: Scanner<'a>,
    numbering: Numbering,
}

impl<'a> TemplateParser<'a> {
    fn new(raw: &'a str) -> Self {
        Self {
            scanner: Scanner::new(raw),
            numbering: Numbering::default(),
        }
    }

    fn parse(mut self) -> Result<Vec<Node>, ParseError> {
        let mut nodes = Vec::new();
        while !self.scanner.is_eof() {
            if self.scanner.starts_with("{") && !self.scanner.starts_with("{{") {
                nodes.push(Node::Field(self.parse_field()?));
            } else {
                nodes.push(Node::Text(self.parse_text()?));
            }
        }
        Ok(nodes)
    }

    const fn mark(&self) -> Mark {
        Mark {
            pos: self.scanner.pos(),
            line: self.scanner.line(),
            col: self.scanner.col(),
        }
    }

    const fn span_from(&self, start: Mark) -> Span {
        Span {
            start_line: start.line,
            start_col: start.col,
            end_line: self.scanner.line(),
            end_col: self.scanner.col(),
            start_pos: start.pos,
            end_pos: self.scanner.pos(),
        }
    }

    fn error(&self, kind: ParseErrorKind, start: Mark) -> ParseError {
        ParseError {
            kind,
            span: self.span_from(start),
        }
    }

    fn parse_text(&mut self) -> Result<Text, ParseError> {
        let start = self.mark();
        let mut text = String::new();
        loop {
            if self.scanner.eat("{{") {
                text.push('{');
            } else if self.scanner.eat("}}") {
                text.push('}');
            } else {
                match self.scanner.peek() {
                    None | Some('{') => break,
                    Some('}') => {
                        let at = self.mark();
                        self.scanner.advance(1);
                        return Err(self.error(ParseErrorKind::UnmatchedCloseBrace, at));
                    }
                    Some(_) => {
                        let run = self.scanner.read_until(|c| c == '{' || c == '}', false);
                        text.push_str(run);
                    }
                }
            }
        }
        Ok(Text {
            text,
            start: start.pos,
            end: self.scanner.pos(),
        })
    }

    fn parse_field(&mut self) -> Result<Field, ParseError> {
        let start = self.mark();
        self.scanner.advance(1);
        let content_start = self.scanner.pos();

        let mut depth = 1usize;
        loop {
            match self.scanner.peek() {
                None => return Err(self.error(ParseErrorKind::UnmatchedOpenBrace, start)),
                Some('{') => depth += 1,
                Some('}') => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                Some(_) => {}
            }
            self.scanner.advance(1);
        }
        let content = self.scanner.slice(content_start, self.scanner.pos());
        self.scanner.advance(1);

        let name_end = content.find(['!', ':']).unwrap_or(content.len());
        let (name, mut rest) = content.split_at(name_end);

        let conversion = if let Some(after_bang) = rest.strip_prefix('!') {
            let conv_end = after_bang.find(':').unwrap_or(after_bang.len());
            let (conv, tail) = after_bang.split_at(conv_end);
            rest = tail;
            let mut chars = conv.chars();
            match (chars.next().and_then(Conversion::from_char), chars.next()) {
                (Some(conversion), None) => Some(conversion),
                _ => {
                    return Err(
                        self.error(ParseErrorKind::InvalidConversion(conv.to_string()), start)
                    );
                }
            }
        } else {
            None
        };

        let format_spec = rest.strip_prefix(':').unwrap_or_default();
        if format_spec.contains(['{', '}']) {
            return Err(self.error(ParseErrorKind::NestedFormatSpec, start));
        }

        if !name.is_empty() && !is_valid_field_name(name) {
            return Err(self.error(ParseErrorKind::InvalidFieldName(name.to_string()), start));
        }
        let name = self
            .numbering
            .resolve((!name.is_empty()).then_some(name))
            .map_err(|kind| self.error(kind, start))?;

        Ok(Field {
            name,
            start: start.pos,
            end: self.scanner.pos(),
            format_spec: format_spec.to_string(),
            conversion,
        })
    }
}

/// `-x`, `--long-name`, `42`, or an identifier.
fn is_valid_field_name(name: &str) -> bool {
    if let Some(flag) = name.strip_prefix("--").or_else(|| name.strip_prefix('-')) {
        let mut chars = flag.chars();
        return chars.next().is_some_and(|c| c.is_ascii_alphanumeric())
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    }
    if name.chars().all(|c| c.is_ascii_digit()) {
        return true;
    }
    let mut chars = name.chars();
    chars.next().is_some_and(is_ident_start) && chars.all(is_ident_continue)
}
