//! Low-level cursor over source text shared by both lexers.
//!
//! Positions are byte offsets into the source; `advance`/`recede` move by
//! whole characters. Line and column are 0-based, the column counted in
//! characters. Jumps over several characters recompute line/column by
//! scanning the skipped substring once instead of stepping through it.

/// Cursor over a source string.
#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    source: &'a str,
    pos: usize,
    line: usize,
    col: usize,
}

impl<'a> Scanner<'a> {
    #[must_use]
    pub const fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: 0,
            line: 0,
            col: 0,
        }
    }

    /// Move the cursor back to the start of the source.
    pub const fn reset(&mut self) {
        self.pos = 0;
        self.line = 0;
        self.col = 0;
    }

    #[must_use]
    pub const fn source(&self) -> &'a str {
        self.source
    }

    /// Absolute byte position.
    #[must_use]
    pub const fn pos(&self) -> usize {
        self.pos
    }

    #[must_use]
    pub const fn line(&self) -> usize {
        self.line
    }

    #[must_use]
    pub const fn col(&self) -> usize {
        self.col
    }

    #[must_use]
    pub const fn is_eof(&self) -> bool {
        self.pos >= self.source.len()
    }

    /// Everything from the cursor to the end of the source.
    #[must_use]
    pub fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    /// Source text between two byte positions previously reported by `pos`.
    #[must_use]
    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.source[start..end]
    }

    /// The next character, if any.
    #[must_use]
    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Up to `n` characters after the cursor; shorter (or empty) at the end.
    #[must_use]
    pub fn lookahead(&self, n: usize) -> &'a str {
        let rest = self.rest();
        let end = rest.char_indices().nth(n).map_or(rest.len(), |(i, _)| i);
        &rest[..end]
    }

    /// Up to `n` characters before the cursor; shorter (or empty) at the start.
    #[must_use]
    pub fn lookbehind(&self, n: usize) -> &'a str {
        let before = &self.source[..self.pos];
        if n == 0 {
            return "";
        }
        let start = before
            .char_indices()
            .rev()
            .nth(n - 1)
            .map_or(0, |(i, _)| i);
        &before[start..]
    }

    #[must_use]
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.rest().starts_with(prefix)
    }

    /// True when only spaces or tabs separate the cursor from the start of
    /// its line.
    #[must_use]
    pub fn at_line_start(&self) -> bool {
        let before = &self.source[..self.pos];
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        before[line_start..].chars().all(|c| c == ' ' || c == '\t')
    }

    /// Move forward by up to `n` characters, returning the skipped text.
    pub fn advance(&mut self, n: usize) -> &'a str {
        let chunk = self.lookahead(n);
        let newlines = chunk.matches('\n').count();
        if newlines == 0 {
            self.col += chunk.chars().count();
        } else {
            self.line += newlines;
            let tail = chunk.rfind('\n').map_or(chunk, |i| &chunk[i + 1..]);
            self.col = tail.chars().count();
        }
        self.pos += chunk.len();
        chunk
    }

    /// Move backward by up to `n` characters, returning the text receded over.
    pub fn recede(&mut self, n: usize) -> &'a str {
        let chunk = self.lookbehind(n);
        let newlines = chunk.matches('\n').count();
        self.pos -= chunk.len();
        if newlines == 0 {
            self.col -= chunk.chars().count();
        } else {
            self.line -= newlines;
            let before = &self.source[..self.pos];
            let line_start = before.rfind('\n').map_or(0, |i| i + 1);
            self.col = before[line_start..].chars().count();
        }
        chunk
    }

    /// Jump to an absolute byte position (must be a char boundary).
    pub fn seek(&mut self, pos: usize) {
        if pos >= self.pos {
            let n = self.source[self.pos..pos].chars().count();
            self.advance(n);
        } else {
            let n = self.source[pos..self.pos].chars().count();
            self.recede(n);
        }
    }

    /// Consume and return `n` characters.
    pub fn read(&mut self, n: usize) -> &'a str {
        self.advance(n)
    }

    /// Consume characters up to the first one for which `pattern` holds, or,
    /// with `negate`, up to the first one for which it does not. Stops at
    /// the end of the source.
    pub fn read_until(&mut self, pattern: impl Fn(char) -> bool, negate: bool) -> &'a str {
        let rest = self.rest();
        let count = rest
            .chars()
            .take_while(|&c| pattern(c) == negate)
            .count();
        self.advance(count)
    }

    /// Consume `expected` if the source continues with it.
    pub fn eat(&mut self, expected: &str) -> bool {
        if self.starts_with(expected) {
            self.advance(expected.chars().count());
            true
        } else {
            false
        }
    }

    /// Skip spaces and tabs.
    pub fn skip_blanks(&mut self) -> &'a str {
        self.read_until(|c| c == ' ' || c == '\t', true)
    }

    /// Skip any whitespace, newlines included.
    pub fn skip_whitespace(&mut self) -> &'a str {
        self.read_until(char::is_whitespace, true)
    }
}
