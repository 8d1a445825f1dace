use rust_decimal::Decimal;

use super::ScriptError;
use crate::lexer::{is_ident_continue, is_ident_start};
use crate::parser::parse_decimal;
use crate::scanner::Scanner;

/// Operators, longest first so that prefixes never shadow them.
const OPERATORS: [&str; 24] = [
    "//=", "+=", "-=", "*=", "/=", "%=", "==", "!=", "<=", ">=", "//", "+", "-", "*", "/", "%",
    "<", ">", "=", "(", ")", "[", "]", ",",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Tok {
    Ident(String),
    Int(i64),
    Dec(Decimal),
    Str(String),
    Op(&'static str),
    Colon,
    Newline,
    Indent,
    Dedent,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SToken {
    pub tok: Tok,
    /// 1-based source line.
    pub line: usize,
}

pub(crate) fn tokenize(source: &str) -> Result<Vec<SToken>, ScriptError> {
    ScriptLexer {
        scanner: Scanner::new(source),
        tokens: Vec::new(),
        indents: vec![0],
        depth: 0,
    }
    .run()
}

struct ScriptLexer<'a> {
    scanner: Scanner<'a>,
    tokens: Vec<SToken>,
    indents: Vec<usize>,
    /// Bracket nesting; newlines inside brackets are ignored.
    depth: usize,
}

impl ScriptLexer<'_> {
    fn line(&self) -> usize {
        self.scanner.line() + 1
    }

    fn push(&mut self, tok: Tok) {
        let line = self.line();
        self.tokens.push(SToken { tok, line });
    }

    fn error(&self, message: impl Into<String>) -> ScriptError {
        ScriptError::new(self.line(), message)
    }

    fn run(mut self) -> Result<Vec<SToken>, ScriptError> {
        let mut at_line_start = true;
        loop {
            if at_line_start && self.depth == 0 {
                if !self.indentation()? {
                    break;
                }
                at_line_start = false;
            }
            self.scanner.skip_blanks();
            let Some(c) = self.scanner.peek() else {
                break;
            };
            match c {
                '#' => {
                    self.scanner.read_until(|c| c == '\n', false);
                }
                '\r' => {
                    self.scanner.advance(1);
                }
                '\n' => {
                    if self.depth == 0 {
                        self.end_statement();
                        at_line_start = true;
                    }
                    self.scanner.advance(1);
                }
                ';' => {
                    self.scanner.advance(1);
                    self.end_statement();
                }
                ':' => {
                    self.scanner.advance(1);
                    self.push(Tok::Colon);
                }
                '\'' | '"' => {
                    let s = self.string(c)?;
                    self.push(Tok::Str(s));
                }
                c if c.is_ascii_digit() => {
                    let tok = self.number()?;
                    self.push(tok);
                }
                c if is_ident_start(c) => {
                    let ident = self.scanner.read_until(is_ident_continue, true).to_string();
                    self.push(Tok::Ident(ident));
                }
                _ => {
                    let op = *OPERATORS
                        .iter()
                        .find(|op| self.scanner.starts_with(op))
                        .ok_or_else(|| self.error(format!("unexpected character '{c}'")))?;
                    self.scanner.advance(op.len());
                    match op {
                        "(" | "[" => self.depth += 1,
                        ")" | "]" => self.depth = self.depth.saturating_sub(1),
                        _ => {}
                    }
                    self.push(Tok::Op(op));
                }
            }
        }
        self.end_statement();
        while self.indents.len() > 1 {
            self.indents.pop();
            self.push(Tok::Dedent);
        }
        self.push(Tok::Eof);
        Ok(self.tokens)
    }

    fn end_statement(&mut self) {
        if self
            .tokens
            .last()
            .is_some_and(|t| !matches!(t.tok, Tok::Newline | Tok::Indent | Tok::Dedent))
        {
            self.push(Tok::Newline);
        }
    }

    /// Measure the indentation of the next non-blank line and emit
    /// `Indent`/`Dedent` tokens. Returns false at end of input.
    fn indentation(&mut self) -> Result<bool, ScriptError> {
        loop {
            let width = self.scanner.skip_blanks().chars().count();
            match self.scanner.peek() {
                None => return Ok(false),
                Some('\n' | '\r') => {
                    self.scanner.advance(1);
                }
                Some('#') => {
                    self.scanner.read_until(|c| c == '\n', false);
                }
                Some(_) => {
                    let current = self.indents.last().copied().unwrap_or(0);
                    if width > current {
                        self.indents.push(width);
                        self.push(Tok::Indent);
                    } else {
                        while self.indents.last().is_some_and(|&w| w > width) {
                            self.indents.pop();
                            self.push(Tok::Dedent);
                        }
                        if self.indents.last() != Some(&width) {
                            return Err(self.error("unindent does not match any outer level"));
                        }
                    }
                    return Ok(true);
                }
            }
        }
    }

    fn number(&mut self) -> Result<Tok, ScriptError> {
        let start = self.scanner.pos();
        self.scanner.read_until(|c| c.is_ascii_digit(), true);
        let is_decimal = self.scanner.peek() == Some('.')
            && self
                .scanner
                .lookahead(2)
                .chars()
                .nth(1)
                .is_some_and(|c| c.is_ascii_digit());
        if is_decimal {
            self.scanner.advance(1);
            self.scanner.read_until(|c| c.is_ascii_digit(), true);
        }
        let text = self.scanner.slice(start, self.scanner.pos());
        if !is_decimal {
            if let Ok(i) = text.parse::<i64>() {
                return Ok(Tok::Int(i));
            }
        }
        parse_decimal(text)
            .map(Tok::Dec)
            .ok_or_else(|| self.error(format!("number out of range: {text}")))
    }

    fn string(&mut self, quote: char) -> Result<String, ScriptError> {
        let triple: String = std::iter::repeat_n(quote, 3).collect();
        let multiline = self.scanner.eat(&triple);
        if !multiline {
            self.scanner.advance(1);
        }
        let delimiter = if multiline { triple.as_str() } else { &triple[..1] };
        let start_line = self.line();

        let mut value = String::new();
        loop {
            if self.scanner.eat(delimiter) {
                return Ok(value);
            }
            let Some(c) = self.scanner.peek() else {
                break;
            };
            if c == '\n' && !multiline {
                break;
            }
            self.scanner.advance(1);
            if c != '\\' {
                value.push(c);
                continue;
            }
            let Some(escaped) = self.scanner.peek() else {
                break;
            };
            self.scanner.advance(1);
            match escaped {
                'n' => value.push('\n'),
                't' => value.push('\t'),
                'r' => value.push('\r'),
                '0' => value.push('\0'),
                '\\' | '\'' | '"' => value.push(escaped),
                '\n' => {}
                other => {
                    value.push('\\');
                    value.push(other);
                }
            }
        }
        Err(ScriptError::new(start_line, "unterminated string literal"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(source: &str) -> Vec<Tok> {
        tokenize(source)
            .expect("tokenize failed")
            .into_iter()
            .map(|t| t.tok)
            .collect()
    }

    #[test]
    fn assignment_line() {
        assert_eq!(
            toks("x *= 2\n"),
            vec![
                Tok::Ident("x".into()),
                Tok::Op("*="),
                Tok::Int(2),
                Tok::Newline,
                Tok::Eof
            ]
        );
    }

    #[test]
    fn indentation_blocks() {
        let got = toks("if a:\n    b = 1\n\n    # note\nc = 2");
        assert_eq!(
            got,
            vec![
                Tok::Ident("if".into()),
                Tok::Ident("a".into()),
                Tok::Colon,
                Tok::Newline,
                Tok::Indent,
                Tok::Ident("b".into()),
                Tok::Op("="),
                Tok::Int(1),
                Tok::Newline,
                Tok::Dedent,
                Tok::Ident("c".into()),
                Tok::Op("="),
                Tok::Int(2),
                Tok::Newline,
                Tok::Eof
            ]
        );
    }

    #[test]
    fn strings_and_decimals() {
        assert_eq!(
            toks("s = 'a\\'b' + \"\"\"x\ny\"\"\"; d = 0.25"),
            vec![
                Tok::Ident("s".into()),
                Tok::Op("="),
                Tok::Str("a'b".into()),
                Tok::Op("+"),
                Tok::Str("x\ny".into()),
                Tok::Newline,
                Tok::Ident("d".into()),
                Tok::Op("="),
                Tok::Dec("0.25".parse().expect("decimal")),
                Tok::Newline,
                Tok::Eof
            ]
        );
    }

    #[test]
    fn newlines_inside_brackets_are_ignored() {
        let got = toks("x = format(\n  1,\n  'd')\n");
        assert_eq!(got.iter().filter(|t| **t == Tok::Newline).count(), 1);
    }

    #[test]
    fn bad_dedent_is_an_error() {
        let err = tokenize("if a:\n    b = 1\n  c = 2\n").unwrap_err();
        assert_eq!(err.line, 3);
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let err = tokenize("x = 'abc\n").unwrap_err();
        assert!(err.message.contains("unterminated"));
    }
}
