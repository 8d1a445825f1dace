//! Stateful tokenizer for the documentation micro-language.
//!
//! The lexer is a small state machine driven by a [`Scanner`]:
//!
//! ```text
//! FreeText --'{' at line start--> ParamName --'}'--> AfterParam
//! AfterParam --'('--> TypeHint --')'--> AfterParam
//! AfterParam --'['--> ValueHint --']'--> FreeText
//! FreeText --"```" line--> CodeBlock --"```" line--> FreeText
//! ```
//!
//! Lexing never fails. When a structured construct turns out to be
//! malformed the lexer recedes to where the construct began and lexes it
//! again as free text; the parser is left to reject whatever grammar it
//! cannot accept.

use std::collections::VecDeque;

use crate::scanner::Scanner;
use crate::token::{Span, Token, TokenKind};

const FENCE: &str = "```";

/// Tokenize a documentation string. The result always ends with `Eof`.
#[must_use]
pub fn tokenize(input: &str) -> Vec<Token> {
    Lexer::new(input).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    FreeText,
    ParamName,
    AfterParam,
    TypeHint,
    ValueHint,
    CodeBlock,
}

#[derive(Debug, Clone, Copy)]
struct Mark {
    pos: usize,
    line: usize,
    col: usize,
}

/// Lazy token producer over a documentation string.
#[derive(Debug)]
pub struct Lexer<'a> {
    scanner: Scanner<'a>,
    state: State,
    pending: VecDeque<Token>,
    /// Start of the free-text run not yet emitted.
    text_start: Option<Mark>,
    after_type_hint: bool,
    done: bool,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub const fn new(input: &'a str) -> Self {
        Self {
            scanner: Scanner::new(input),
            state: State::FreeText,
            pending: VecDeque::new(),
            text_start: None,
            after_type_hint: false,
            done: false,
        }
    }

    /// Rewind to the beginning of the input.
    pub fn reset(&mut self) {
        self.scanner.reset();
        self.state = State::FreeText;
        self.pending.clear();
        self.text_start = None;
        self.after_type_hint = false;
        self.done = false;
    }

    fn step(&mut self) {
        match self.state {
            State::FreeText => self.lex_free_text(),
            State::ParamName => self.lex_param_name(),
            State::AfterParam => self.lex_after_param(),
            State::TypeHint => self.lex_type_hint(),
            State::ValueHint => self.lex_value_hint(),
            State::CodeBlock => self.lex_code_block(),
        }
    }

    const fn mark(&self) -> Mark {
        Mark {
            pos: self.scanner.pos(),
            line: self.scanner.line(),
            col: self.scanner.col(),
        }
    }

    fn token(&self, kind: TokenKind, value: impl Into<String>, start: Mark) -> Token {
        Token {
            kind,
            value: value.into(),
            span: Span {
                start_line: start.line,
                start_col: start.col,
                end_line: self.scanner.line(),
                end_col: self.scanner.col(),
                start_pos: start.pos,
                end_pos: self.scanner.pos(),
            },
        }
    }

    fn raw_token(&self, kind: TokenKind, start: Mark) -> Token {
        let text = self.scanner.slice(start.pos, self.scanner.pos());
        self.token(kind, text, start)
    }

    fn open_text(&mut self) {
        if self.text_start.is_none() {
            self.text_start = Some(self.mark());
        }
    }

    /// Emit the pending free-text run, if it is non-empty.
    fn flush_text(&mut self) {
        if let Some(start) = self.text_start.take() {
            if self.scanner.pos() > start.pos {
                let token = self.raw_token(TokenKind::Text, start);
                self.pending.push_back(token);
            }
        }
    }

    /// Move back to `start` and carry on lexing in free text.
    fn fall_back(&mut self, start: Mark) {
        self.scanner.seek(start.pos);
        self.state = State::FreeText;
    }

    /// True when the line starting at the cursor holds nothing but a fence.
    fn fence_line_ahead(&self) -> bool {
        let line = self.scanner.rest().split('\n').next().unwrap_or_default();
        line.trim() == FENCE
    }

    fn lex_free_text(&mut self) {
        self.open_text();
        loop {
            if self.scanner.is_eof() {
                self.flush_text();
                let eof = self.token(TokenKind::Eof, "", self.mark());
                self.pending.push_back(eof);
                self.done = true;
                return;
            }
            if self.scanner.col() == 0 && self.fence_line_ahead() {
                self.flush_text();
                self.state = State::CodeBlock;
                return;
            }
            if self.scanner.peek() == Some('{') && self.scanner.at_line_start() {
                self.state = State::ParamName;
                return;
            }
            self.scanner.advance(1);
        }
    }

    fn lex_param_name(&mut self) {
        let start = self.mark();
        if let Some(tokens) = self.scan_param_name() {
            self.flush_text();
            self.pending.extend(tokens);
            self.after_type_hint = false;
            self.state = State::AfterParam;
        } else {
            self.fall_back(start);
            // The brace is ordinary text now.
            self.scanner.advance(1);
        }
    }

    fn scan_param_name(&mut self) -> Option<Vec<Token>> {
        let mut tokens = Vec::with_capacity(3);
        let start = self.mark();
        self.scanner.advance(1);
        tokens.push(self.raw_token(TokenKind::LeftBrace, start));
        self.scanner.skip_blanks();

        let name_start = self.mark();
        match self.scanner.peek()? {
            '}' => {}
            '-' => {
                self.scanner.eat("-");
                self.scanner.eat("-");
                if !self.scanner.peek()?.is_ascii_alphanumeric() {
                    return None;
                }
                self.scanner
                    .read_until(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-', true);
                tokens.push(self.raw_token(TokenKind::Flag, name_start));
            }
            c if c.is_ascii_digit() => {
                self.scanner.read_until(|c| c.is_ascii_digit(), true);
                tokens.push(self.raw_token(TokenKind::Integer, name_start));
            }
            c if is_ident_start(c) => {
                self.scanner.read_until(is_ident_continue, true);
                tokens.push(self.raw_token(TokenKind::Identifier, name_start));
            }
            _ => return None,
        }

        self.scanner.skip_blanks();
        let close = self.mark();
        if !self.scanner.eat("}") {
            return None;
        }
        tokens.push(self.raw_token(TokenKind::RightBrace, close));
        Some(tokens)
    }

    fn lex_after_param(&mut self) {
        // Blanks here are either insignificant or the start of the
        // description, depending on what follows.
        self.open_text();
        self.scanner.skip_blanks();
        self.state = match self.scanner.peek() {
            Some('(') if !self.after_type_hint => State::TypeHint,
            Some('[') => State::ValueHint,
            _ => State::FreeText,
        };
    }

    fn lex_type_hint(&mut self) {
        let start = self.mark();
        if let Some(tokens) = self.scan_type_hint() {
            self.text_start = None;
            self.pending.extend(tokens);
            self.after_type_hint = true;
            self.state = State::AfterParam;
        } else {
            self.fall_back(start);
            self.scanner.advance(1);
        }
    }

    fn scan_type_hint(&mut self) -> Option<Vec<Token>> {
        let mut tokens = Vec::with_capacity(3);
        let start = self.mark();
        self.scanner.advance(1);
        tokens.push(self.raw_token(TokenKind::LeftParen, start));
        self.scanner.skip_whitespace();

        let ident = self.mark();
        if !is_ident_start(self.scanner.peek()?) {
            return None;
        }
        self.scanner.read_until(is_ident_continue, true);
        tokens.push(self.raw_token(TokenKind::Identifier, ident));

        self.scanner.skip_whitespace();
        let close = self.mark();
        if !self.scanner.eat(")") {
            return None;
        }
        tokens.push(self.raw_token(TokenKind::RightParen, close));
        Some(tokens)
    }

    fn lex_value_hint(&mut self) {
        let start = self.mark();
        if let Some(tokens) = self.scan_value_hint() {
            self.text_start = None;
            self.pending.extend(tokens);
            self.state = State::FreeText;
        } else {
            self.fall_back(start);
            self.scanner.advance(1);
        }
    }

    fn scan_value_hint(&mut self) -> Option<Vec<Token>> {
        let mut tokens = Vec::new();
        let start = self.mark();
        self.scanner.advance(1);
        tokens.push(self.raw_token(TokenKind::LeftBracket, start));

        loop {
            self.scanner.skip_whitespace();
            let at = self.mark();
            let c = self.scanner.peek()?;
            let token = match c {
                ']' => {
                    self.scanner.advance(1);
                    tokens.push(self.raw_token(TokenKind::RightBracket, at));
                    return Some(tokens);
                }
                ',' => {
                    self.scanner.advance(1);
                    self.raw_token(TokenKind::Comma, at)
                }
                ':' => {
                    self.scanner.advance(1);
                    self.raw_token(TokenKind::Colon, at)
                }
                '=' if self.scanner.eat("=>") => self.raw_token(TokenKind::DefaultMarker, at),
                '"' | '\'' => self.scan_string(c, at)?,
                _ if self.number_ahead() => self.scan_number(at),
                _ if is_ident_start(c) => {
                    self.scanner.read_until(is_ident_continue, true);
                    self.raw_token(TokenKind::Identifier, at)
                }
                _ => return None,
            };
            tokens.push(token);
        }
    }

    fn number_ahead(&self) -> bool {
        let mut chars = self.scanner.lookahead(3).chars();
        let first = chars.next();
        let first = match first {
            Some('-' | '+') => chars.next(),
            other => other,
        };
        match first {
            Some(c) if c.is_ascii_digit() => true,
            Some('.') => chars.next().is_some_and(|c| c.is_ascii_digit()),
            _ => false,
        }
    }

    fn scan_number(&mut self, start: Mark) -> Token {
        if !self.scanner.eat("-") {
            self.scanner.eat("+");
        }
        self.scanner.read_until(|c| c.is_ascii_digit(), true);
        let mut kind = TokenKind::Integer;
        if self.scanner.peek() == Some('.') {
            let after_dot = self.scanner.lookahead(2).chars().nth(1);
            if after_dot.is_some_and(|c| c.is_ascii_digit()) {
                self.scanner.advance(1);
                self.scanner.read_until(|c| c.is_ascii_digit(), true);
                kind = TokenKind::Float;
            }
        }
        self.raw_token(kind, start)
    }

    fn scan_string(&mut self, quote: char, start: Mark) -> Option<Token> {
        self.scanner.advance(1);
        let mut value = String::new();
        loop {
            let c = self.scanner.peek()?;
            self.scanner.advance(1);
            match c {
                '\\' => {
                    let escaped = self.scanner.peek()?;
                    self.scanner.advance(1);
                    match escaped {
                        'n' => value.push('\n'),
                        't' => value.push('\t'),
                        '\\' | '"' | '\'' => value.push(escaped),
                        other => {
                            value.push('\\');
                            value.push(other);
                        }
                    }
                }
                '\n' => return None,
                c if c == quote => break,
                c => value.push(c),
            }
        }
        Some(self.token(TokenKind::String, value, start))
    }

    fn lex_code_block(&mut self) {
        self.push_fence();
        let code_start = self.mark();
        loop {
            if self.scanner.is_eof() {
                break;
            }
            if self.scanner.col() == 0 && self.fence_line_ahead() {
                let code = self.raw_token(TokenKind::Text, code_start);
                self.pending.push_back(code);
                self.push_fence();
                self.state = State::FreeText;
                return;
            }
            self.skip_code_element();
        }
        // Unterminated: hand the code over and let the parser complain
        // about the missing fence.
        let code = self.raw_token(TokenKind::Text, code_start);
        self.pending.push_back(code);
        self.state = State::FreeText;
    }

    /// Consume a fence line and emit its `CodeFence` token.
    fn push_fence(&mut self) {
        self.scanner.skip_blanks();
        let start = self.mark();
        self.scanner.advance(FENCE.len());
        let fence = self.raw_token(TokenKind::CodeFence, start);
        self.pending.push_back(fence);
        self.scanner.read_until(|c| c == '\n', false);
        self.scanner.eat("\n");
    }

    /// Skip one element of embedded code: a comment, a string literal, or a
    /// single character. Fences inside strings are therefore never seen.
    fn skip_code_element(&mut self) {
        if self.scanner.starts_with("'''") || self.scanner.starts_with("\"\"\"") {
            let delimiter = self.scanner.read(3);
            self.skip_string_body(delimiter, true);
            return;
        }
        match self.scanner.peek() {
            Some('#') => {
                self.scanner.read_until(|c| c == '\n', false);
            }
            Some('\'' | '"') => {
                let delimiter = self.scanner.read(1);
                self.skip_string_body(delimiter, false);
            }
            _ => {
                self.scanner.advance(1);
            }
        }
    }

    fn skip_string_body(&mut self, delimiter: &str, multiline: bool) {
        while !self.scanner.is_eof() {
            if self.scanner.eat(delimiter) {
                return;
            }
            match self.scanner.peek() {
                Some('\\') => {
                    self.scanner.advance(2);
                }
                // Single-line literals end at the newline even if unclosed.
                Some('\n') if !multiline => return,
                _ => {
                    self.scanner.advance(1);
                }
            }
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Some(token);
            }
            if self.done {
                return None;
            }
            self.step();
        }
    }
}

pub(crate) fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

pub(crate) fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
