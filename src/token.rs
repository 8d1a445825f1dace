use std::fmt;

/// Source location of a token: 0-based line/column plus byte positions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Span {
    pub start_line: usize,
    pub start_col: usize,
    pub end_line: usize,
    pub end_col: usize,
    pub start_pos: usize,
    pub end_pos: usize,
}

impl Span {
    /// Human-facing `(line, column)`, both 1-based.
    #[must_use]
    pub const fn line_col(&self) -> (usize, usize) {
        (self.start_line + 1, self.start_col + 1)
    }
}

/// Token kinds produced by the documentation lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Free text, or the raw source between two code fences.
    Text,
    /// Parameter name or type hint (`name`, `string`).
    Identifier,
    /// Flag parameter name (`-f`, `--force`).
    Flag,
    /// Integer literal (`42`, `-3`).
    Integer,
    /// Decimal literal (`0.25`).
    Float,
    /// Quoted string inside a value hint.
    String,
    /// A line consisting solely of three backticks.
    CodeFence,
    /// `{`
    LeftBrace,
    /// `}`
    RightBrace,
    /// `[`
    LeftBracket,
    /// `]`
    RightBracket,
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `,`
    Comma,
    /// `:`
    Colon,
    /// `=>`
    DefaultMarker,
    /// End of input; always the last token.
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "TEXT",
            Self::Identifier => "IDENTIFIER",
            Self::Flag => "FLAG",
            Self::Integer => "INTEGER",
            Self::Float => "FLOAT",
            Self::String => "STRING",
            Self::CodeFence => "CODE_FENCE",
            Self::LeftBrace => "LEFT_BRACE",
            Self::RightBrace => "RIGHT_BRACE",
            Self::LeftBracket => "LEFT_BRACKET",
            Self::RightBracket => "RIGHT_BRACKET",
            Self::LeftParen => "LEFT_PAREN",
            Self::RightParen => "RIGHT_PAREN",
            Self::Comma => "COMMA",
            Self::Colon => "COLON",
            Self::DefaultMarker => "DEFAULT_MARKER",
            Self::Eof => "EOF",
        };
        f.write_str(name)
    }
}

/// A single token with its kind, value, and source location.
///
/// `value` holds the decoded content: unescaped text for `String`, the raw
/// digits for numbers, the verbatim source for everything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub span: Span,
}
