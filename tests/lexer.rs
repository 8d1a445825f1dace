use snipdoc::{Lexer, TokenKind, tokenize};

#[test]
fn tokens_carry_positions() {
    let tokens = tokenize("intro\n{name} (str)");
    let name = &tokens[2];
    assert_eq!(name.kind, TokenKind::Identifier);
    assert_eq!(name.value, "name");
    assert_eq!((name.span.start_line, name.span.start_col), (1, 1));
    assert_eq!((name.span.start_pos, name.span.end_pos), (7, 11));
    assert_eq!(name.span.line_col(), (2, 2));
}

#[test]
fn multibyte_text_uses_byte_positions() {
    let tokens = tokenize("héllo\n{x}");
    assert_eq!(tokens[0].value, "héllo\n");
    assert_eq!(tokens[1].span.start_pos, "héllo\n".len());
    assert_eq!(tokens[1].span.start_col, 0);
}

#[test]
fn lexer_is_lazy_and_restartable() {
    let mut lexer = Lexer::new("{a} one\n{b} two");
    let first: Vec<_> = lexer.by_ref().take(3).map(|t| t.kind).collect();
    assert_eq!(
        first,
        [
            TokenKind::LeftBrace,
            TokenKind::Identifier,
            TokenKind::RightBrace
        ]
    );
    lexer.reset();
    let all: Vec<_> = lexer.collect();
    assert_eq!(all.last().map(|t| t.kind), Some(TokenKind::Eof));
    assert_eq!(all, tokenize("{a} one\n{b} two"));
}

#[test]
fn eof_is_emitted_exactly_once() {
    let kinds: Vec<_> = Lexer::new("").map(|t| t.kind).collect();
    assert_eq!(kinds, [TokenKind::Eof]);
}

#[test]
fn integer_and_flag_names() {
    let tokens = tokenize("{0} first\n{--dry-run} preview");
    let names: Vec<_> = tokens
        .iter()
        .filter(|t| matches!(t.kind, TokenKind::Integer | TokenKind::Flag))
        .map(|t| (t.kind, t.value.as_str()))
        .collect();
    assert_eq!(
        names,
        [(TokenKind::Integer, "0"), (TokenKind::Flag, "--dry-run")]
    );
}

#[test]
fn backticks_inside_code_strings_do_not_close_the_block() {
    let source = "```\nmsg = '''\n```\n'''\nother = \"```\"\n```\ntail";
    let tokens = tokenize(source);
    let fences = tokens
        .iter()
        .filter(|t| t.kind == TokenKind::CodeFence)
        .count();
    assert_eq!(fences, 2);
    assert_eq!(tokens[1].value, "msg = '''\n```\n'''\nother = \"```\"\n");
    assert_eq!(tokens[3].value, "tail");
}

#[test]
fn prose_mentioning_braces_stays_text() {
    let tokens = tokenize("Use it like `echo {x}` or {this.");
    assert_eq!(tokens.len(), 2);
    assert_eq!(tokens[0].kind, TokenKind::Text);
}
