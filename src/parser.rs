use std::collections::VecDeque;
use std::fmt;

use rust_decimal::Decimal;
use tracing::debug;

use crate::ast::{CodeBlock, Documentation, Parameter, Scalar, ValueHint, ValueList, ValueRange};
use crate::lexer::Lexer;
use crate::token::{Span, Token, TokenKind};

/// Classifies a parse error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A token that the grammar does not allow at this position.
    UnexpectedToken {
        found: TokenKind,
        expected: Vec<TokenKind>,
    },
    /// `{}` after an explicitly named field.
    ManualToAuto,
    /// An explicitly named field after `{}`.
    AutoToManual,
    /// `{-f} (type)`.
    FlagTypeHint,
    /// `{-f} [values]`.
    FlagValueHint,
    /// More than one `=>` in a value list.
    MultipleDefaults,
    /// A numeric literal that does not fit an exact decimal.
    InvalidNumber(String),
    /// Range bounds or step that cannot form a range.
    InvalidRange(String),
    /// `{` in a command template without its closing `}`.
    UnmatchedOpenBrace,
    /// A lone `}` in a command template.
    UnmatchedCloseBrace,
    /// Field name that is neither a flag, an integer, nor an identifier.
    InvalidFieldName(String),
    /// `!x` with an unknown conversion character.
    InvalidConversion(String),
    /// `{name:{other}}` in a command template.
    NestedFormatSpec,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedToken { found, expected } => {
                write!(f, "unexpected token {found}, expected one of: ")?;
                for (i, kind) in expected.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{kind}")?;
                }
                Ok(())
            }
            Self::ManualToAuto => {
                write!(f, "cannot switch from manual to automatic field numbering")
            }
            Self::AutoToManual => {
                write!(f, "cannot switch from automatic to manual field numbering")
            }
            Self::FlagTypeHint => write!(f, "flag cannot have a type hint"),
            Self::FlagValueHint => write!(f, "flag cannot have a value hint"),
            Self::MultipleDefaults => write!(f, "value list has more than one default"),
            Self::InvalidNumber(text) => write!(f, "invalid number: {text}"),
            Self::InvalidRange(reason) => write!(f, "invalid range: {reason}"),
            Self::UnmatchedOpenBrace => write!(f, "expected '}}' before end of string"),
            Self::UnmatchedCloseBrace => write!(f, "single '}}' encountered in format string"),
            Self::InvalidFieldName(name) => write!(f, "invalid field name: '{name}'"),
            Self::InvalidConversion(conv) => {
                write!(f, "invalid conversion '{conv}', expected one of r, s, a, q")
            }
            Self::NestedFormatSpec => {
                write!(f, "nested replacement fields in format specs are not supported")
            }
        }
    }
}

/// Error produced while parsing documentation or a command template.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at line {}, column {}", .span.line_col().0, .span.line_col().1)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
}

/// Parse documentation source into a [`Documentation`].
///
/// # Errors
///
/// Returns `ParseError` on the first grammar violation; no partial result
/// is produced.
pub fn parse(input: &str) -> Result<Documentation, ParseError> {
    Parser::new(Lexer::new(input)).parse()
}

/// Enforces that fields are either all auto-numbered or all named.
#[derive(Debug, Default)]
pub(crate) struct Numbering {
    auto: Option<bool>,
    next_index: usize,
}

impl Numbering {
    /// Resolve a field name; `None` requests the next automatic index.
    pub(crate) fn resolve(&mut self, name: Option<&str>) -> Result<String, ParseErrorKind> {
        match (name, self.auto) {
            (None, Some(false)) => Err(ParseErrorKind::ManualToAuto),
            (Some(_), Some(true)) => Err(ParseErrorKind::AutoToManual),
            (None, _) => {
                self.auto = Some(true);
                let index = self.next_index;
                self.next_index += 1;
                Ok(index.to_string())
            }
            (Some(name), _) => {
                self.auto = Some(false);
                Ok(name.to_string())
            }
        }
    }
}

/// Parse a numeric literal as an exact decimal.
pub(crate) fn parse_decimal(text: &str) -> Option<Decimal> {
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let digits = if digits.starts_with('.') {
        format!("0{digits}")
    } else {
        digits.to_string()
    };
    let value = Decimal::from_str_exact(&digits).ok()?;
    Some(if negative { -value } else { value })
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    buffer: VecDeque<Token>,
    last_span: Span,
    numbering: Numbering,
}

impl<'a> Parser<'a> {
    fn new(lexer: Lexer<'a>) -> Self {
        Self {
            lexer,
            buffer: VecDeque::with_capacity(2),
            last_span: Span::default(),
            numbering: Numbering::default(),
        }
    }

    fn parse(mut self) -> Result<Documentation, ParseError> {
        let mut doc = Documentation::new();

        if self.at(TokenKind::Text) {
            doc.header = self.bump().value.trim().to_string();
        }

        loop {
            match self.peek(0).kind {
                TokenKind::LeftBrace => self.parse_parameter(&mut doc)?,
                TokenKind::CodeFence => {
                    let block = self.parse_code_block()?;
                    doc.code_blocks.push(block);
                    self.parse_trailing_text(&mut doc);
                }
                TokenKind::Eof => break,
                _ => {
                    return Err(self.unexpected(&[
                        TokenKind::LeftBrace,
                        TokenKind::CodeFence,
                        TokenKind::Eof,
                    ]));
                }
            }
        }

        debug!(
            parameters = doc.parameters.len(),
            code_blocks = doc.code_blocks.len(),
            "parsed documentation"
        );
        Ok(doc)
    }

    fn parse_parameter(&mut self, doc: &mut Documentation) -> Result<(), ParseError> {
        let open = self.expect(&[TokenKind::LeftBrace])?;
        let name_token = if self.at(TokenKind::RightBrace) {
            None
        } else {
            Some(self.expect(&[TokenKind::Identifier, TokenKind::Integer, TokenKind::Flag])?)
        };
        self.expect(&[TokenKind::RightBrace])?;

        let name = self
            .numbering
            .resolve(name_token.as_ref().map(|t| t.value.as_str()))
            .map_err(|kind| ParseError {
                kind,
                span: name_token.as_ref().map_or(open.span, |t| t.span),
            })?;
        let is_flag = name_token
            .as_ref()
            .is_some_and(|t| t.kind == TokenKind::Flag);

        let type_hint = if self.at(TokenKind::LeftParen) {
            if is_flag {
                return Err(self.error_here(ParseErrorKind::FlagTypeHint));
            }
            Some(self.parse_type_hint()?)
        } else {
            None
        };

        let value_hint = if self.at(TokenKind::LeftBracket) {
            if is_flag {
                return Err(self.error_here(ParseErrorKind::FlagValueHint));
            }
            Some(self.parse_value_hint()?)
        } else {
            None
        };

        let text = if self.at(TokenKind::Text) {
            self.bump().value.trim().to_string()
        } else {
            String::new()
        };

        if let Some(previous) = doc.parameters.insert(Parameter {
            name,
            type_hint,
            value_hint,
            text,
        }) {
            debug!(name = %previous.name, "parameter redeclared, keeping the last one");
        }
        Ok(())
    }

    fn parse_type_hint(&mut self) -> Result<String, ParseError> {
        self.expect(&[TokenKind::LeftParen])?;
        let ident = self.expect(&[TokenKind::Identifier])?;
        self.expect(&[TokenKind::RightParen])?;
        Ok(ident.value)
    }

    fn parse_value_hint(&mut self) -> Result<ValueHint, ParseError> {
        self.expect(&[TokenKind::LeftBracket])?;
        let is_number = matches!(self.peek(0).kind, TokenKind::Integer | TokenKind::Float);
        let hint = if is_number && self.peek(1).kind == TokenKind::Colon {
            ValueHint::Range(self.parse_range()?)
        } else {
            ValueHint::List(self.parse_list()?)
        };
        self.expect(&[TokenKind::RightBracket])?;
        Ok(hint)
    }

    fn parse_list(&mut self) -> Result<ValueList, ParseError> {
        let mut values = Vec::new();
        let mut default_index = None;
        loop {
            if self.at(TokenKind::DefaultMarker) {
                let marker = self.bump();
                if default_index.is_some() {
                    return Err(ParseError {
                        kind: ParseErrorKind::MultipleDefaults,
                        span: marker.span,
                    });
                }
                default_index = Some(values.len());
            }
            values.push(self.parse_scalar()?);
            if self.at(TokenKind::Comma) {
                self.bump();
            } else {
                break;
            }
        }
        Ok(ValueList::new(values, default_index.unwrap_or(0)))
    }

    fn parse_scalar(&mut self) -> Result<Scalar, ParseError> {
        let token = self.expect(&[
            TokenKind::String,
            TokenKind::Integer,
            TokenKind::Float,
            TokenKind::Identifier,
        ])?;
        match token.kind {
            TokenKind::Integer | TokenKind::Float => Ok(Scalar::Number(Self::decimal(&token)?)),
            _ => Ok(Scalar::Str(token.value)),
        }
    }

    fn parse_range(&mut self) -> Result<ValueRange, ParseError> {
        let start_span = self.peek(0).span;
        let start = self.parse_number()?;
        self.expect(&[TokenKind::Colon])?;
        let end = self.parse_number()?;
        let step = if self.at(TokenKind::Colon) {
            self.bump();
            Some(self.parse_number()?)
        } else {
            None
        };
        let default = if self.at(TokenKind::DefaultMarker) {
            self.bump();
            Some(self.parse_number()?)
        } else {
            None
        };
        ValueRange::new(start, end, step, default).map_err(|e| ParseError {
            kind: ParseErrorKind::InvalidRange(e.to_string()),
            span: start_span,
        })
    }

    fn parse_number(&mut self) -> Result<Decimal, ParseError> {
        let token = self.expect(&[TokenKind::Integer, TokenKind::Float])?;
        Self::decimal(&token)
    }

    fn decimal(token: &Token) -> Result<Decimal, ParseError> {
        parse_decimal(&token.value).ok_or_else(|| ParseError {
            kind: ParseErrorKind::InvalidNumber(token.value.clone()),
            span: token.span,
        })
    }

    fn parse_code_block(&mut self) -> Result<CodeBlock, ParseError> {
        self.expect(&[TokenKind::CodeFence])?;
        let source = if self.at(TokenKind::Text) {
            self.bump().value
        } else {
            String::new()
        };
        self.expect(&[TokenKind::CodeFence])?;
        Ok(CodeBlock { source })
    }

    /// Prose after a code block continues the latest description.
    fn parse_trailing_text(&mut self, doc: &mut Documentation) {
        if !self.at(TokenKind::Text) {
            return;
        }
        let token = self.bump();
        let text = token.value.trim();
        if text.is_empty() {
            return;
        }
        let target = match doc.parameters.last_mut() {
            Some(parameter) => &mut parameter.text,
            None => &mut doc.header,
        };
        if !target.is_empty() {
            target.push('\n');
        }
        target.push_str(text);
    }

    fn peek(&mut self, n: usize) -> &Token {
        while self.buffer.len() <= n {
            let token = self.lexer.next().unwrap_or_else(|| Token {
                kind: TokenKind::Eof,
                value: String::new(),
                span: self.last_span,
            });
            self.last_span = token.span;
            self.buffer.push_back(token);
        }
        &self.buffer[n]
    }

    fn at(&mut self, kind: TokenKind) -> bool {
        self.peek(0).kind == kind
    }

    fn bump(&mut self) -> Token {
        self.peek(0);
        self.buffer
            .pop_front()
            .unwrap_or_else(|| unreachable!("peek fills the buffer"))
    }

    fn expect(&mut self, kinds: &[TokenKind]) -> Result<Token, ParseError> {
        if kinds.contains(&self.peek(0).kind) {
            Ok(self.bump())
        } else {
            Err(self.unexpected(kinds))
        }
    }

    fn unexpected(&mut self, expected: &[TokenKind]) -> ParseError {
        let token = self.peek(0);
        ParseError {
            kind: ParseErrorKind::UnexpectedToken {
                found: token.kind,
                expected: expected.to_vec(),
            },
            span: token.span,
        }
    }

    fn error_here(&mut self, kind: ParseErrorKind) -> ParseError {
        ParseError {
            kind,
            span: self.peek(0).span,
        }
    }
}
