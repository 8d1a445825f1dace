//! Recursive-descent parser for transform scripts.

use super::ScriptError;
use super::lexer::{SToken, Tok};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
}

impl BinaryOp {
    const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::FloorDiv => "//",
            Self::Mod => "%",
        }
    }

    fn from_assign(op: &str) -> Option<Option<Self>> {
        Some(match op {
            "=" => None,
            "+=" => Some(Self::Add),
            "-=" => Some(Self::Sub),
            "*=" => Some(Self::Mul),
            "/=" => Some(Self::Div),
            "//=" => Some(Self::FloorDiv),
            "%=" => Some(Self::Mod),
            _ => return None,
        })
    }
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Expr {
    Literal(Value),
    Name(String),
    /// `fields[key]`
    Field(Box<Expr>),
    Neg(Box<Expr>),
    Pos(Box<Expr>),
    Not(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Compare(CompareOp, Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Conditional {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Call(String, Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Target {
    Name(String),
    Field(Expr),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StmtKind {
    Assign {
        target: Target,
        op: Option<BinaryOp>,
        value: Expr,
    },
    If {
        branches: Vec<(Expr, Vec<Stmt>)>,
        otherwise: Vec<Stmt>,
    },
    Pass,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Stmt {
    pub kind: StmtKind,
    pub line: usize,
}

const KEYWORDS: [&str; 10] = [
    "if", "elif", "else", "and", "or", "not", "in", "pass", "True", "False",
];

pub(crate) fn parse(tokens: Vec<SToken>) -> Result<Vec<Stmt>, ScriptError> {
    let mut parser = Parser { tokens, pos: 0 };
    let mut statements = Vec::new();
    while !parser.at(&Tok::Eof) {
        statements.push(parser.statement()?);
    }
    Ok(statements)
}

struct Parser {
    tokens: Vec<SToken>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Tok {
        self.tokens.get(self.pos).map_or(&Tok::Eof, |t| &t.tok)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(1, |t| t.line)
    }

    fn at(&self, tok: &Tok) -> bool {
        self.peek() == tok
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Tok::Ident(name) if name == keyword)
    }

    fn at_op(&self, op: &str) -> bool {
        matches!(self.peek(), Tok::Op(o) if *o == op)
    }

    fn bump(&mut self) -> Tok {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn error(&self, message: impl Into<String>) -> ScriptError {
        ScriptError::new(self.line(), message)
    }

    fn unexpected(&self, expected: &str) -> ScriptError {
        let found = match self.peek() {
            Tok::Ident(name) => format!("'{name}'"),
            Tok::Int(i) => i.to_string(),
            Tok::Dec(d) => d.to_string(),
            Tok::Str(_) => "string".to_string(),
            Tok::Op(op) => format!("'{op}'"),
            Tok::Colon => "':'".to_string(),
            Tok::Newline => "end of line".to_string(),
            Tok::Indent => "indent".to_string(),
            Tok::Dedent => "dedent".to_string(),
            Tok::Eof => "end of script".to_string(),
        };
        self.error(format!("expected {expected}, found {found}"))
    }

    fn expect(&mut self, tok: &Tok, expected: &str) -> Result<(), ScriptError> {
        if self.at(tok) {
            self.bump();
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn expect_op(&mut self, op: &str) -> Result<(), ScriptError> {
        if self.at_op(op) {
            self.bump();
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{op}'")))
        }
    }

    fn statement(&mut self) -> Result<Stmt, ScriptError> {
        if self.at_keyword("if") {
            return self.if_statement();
        }
        let stmt = self.simple_statement()?;
        self.end_of_line()?;
        Ok(stmt)
    }

    fn end_of_line(&mut self) -> Result<(), ScriptError> {
        match self.peek() {
            Tok::Newline => {
                self.bump();
                Ok(())
            }
            Tok::Eof | Tok::Dedent => Ok(()),
            _ => Err(self.unexpected("end of line")),
        }
    }

    fn if_statement(&mut self) -> Result<Stmt, ScriptError> {
        let line = self.line();
        self.bump();
        let mut branches = vec![self.branch()?];
        let mut otherwise = Vec::new();
        loop {
            if self.at_keyword("elif") {
                self.bump();
                branches.push(self.branch()?);
            } else if self.at_keyword("else") {
                self.bump();
                self.expect(&Tok::Colon, "':'")?;
                otherwise = self.suite()?;
                break;
            } else {
                break;
            }
        }
        Ok(Stmt {
            kind: StmtKind::If {
                branches,
                otherwise,
            },
            line,
        })
    }

    fn branch(&mut self) -> Result<(Expr, Vec<Stmt>), ScriptError> {
        let condition = self.expression()?;
        self.expect(&Tok::Colon, "':'")?;
        Ok((condition, self.suite()?))
    }

    /// Either a single statement on the same line or an indented block.
    fn suite(&mut self) -> Result<Vec<Stmt>, ScriptError> {
        if !self.at(&Tok::Newline) {
            let stmt = self.simple_statement()?;
            self.end_of_line()?;
            return Ok(vec![stmt]);
        }
        self.bump();
        self.expect(&Tok::Indent, "an indented block")?;
        let mut body = Vec::new();
        while !self.at(&Tok::Dedent) && !self.at(&Tok::Eof) {
            body.push(self.statement()?);
        }
        if self.at(&Tok::Dedent) {
            self.bump();
        }
        Ok(body)
    }

    fn simple_statement(&mut self) -> Result<Stmt, ScriptError> {
        let line = self.line();
        if self.at_keyword("pass") {
            self.bump();
            return Ok(Stmt {
                kind: StmtKind::Pass,
                line,
            });
        }

        let target = match self.expression()? {
            Expr::Name(name) => Target::Name(name),
            Expr::Field(key) => Target::Field(*key),
            _ => return Err(ScriptError::new(line, "cannot assign to expression")),
        };
        let op = match self.peek() {
            Tok::Op(op) => BinaryOp::from_assign(op),
            _ => None,
        }
        .ok_or_else(|| self.unexpected("an assignment"))?;
        self.bump();
        let value = self.expression()?;

        Ok(Stmt {
            kind: StmtKind::Assign { target, op, value },
            line,
        })
    }

    fn expression(&mut self) -> Result<Expr, ScriptError> {
        let then = self.or_expr()?;
        if !self.at_keyword("if") {
            return Ok(then);
        }
        self.bump();
        let condition = self.or_expr()?;
        if !self.at_keyword("else") {
            return Err(self.unexpected("'else'"));
        }
        self.bump();
        let otherwise = self.expression()?;
        Ok(Expr::Conditional {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    fn or_expr(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.and_expr()?;
        while self.at_keyword("or") {
            self.bump();
            let right = self.and_expr()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.not_expr()?;
        while self.at_keyword("and") {
            self.bump();
            let right = self.not_expr()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> Result<Expr, ScriptError> {
        if self.at_keyword("not") {
            self.bump();
            return Ok(Expr::Not(Box::new(self.not_expr()?)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, ScriptError> {
        let left = self.sum()?;
        let op = match self.peek() {
            Tok::Op("==") => CompareOp::Eq,
            Tok::Op("!=") => CompareOp::Ne,
            Tok::Op("<") => CompareOp::Lt,
            Tok::Op("<=") => CompareOp::Le,
            Tok::Op(">") => CompareOp::Gt,
            Tok::Op(">=") => CompareOp::Ge,
            Tok::Ident(k) if k == "in" => CompareOp::In,
            Tok::Ident(k) if k == "not" => CompareOp::NotIn,
            _ => return Ok(left),
        };
        self.bump();
        if op == CompareOp::NotIn {
            if !self.at_keyword("in") {
                return Err(self.unexpected("'in'"));
            }
            self.bump();
        }
        let right = self.sum()?;
        Ok(Expr::Compare(op, Box::new(left), Box::new(right)))
    }

    fn sum(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.term()?;
        loop {
            let op = match self.peek() {
                Tok::Op("+") => BinaryOp::Add,
                Tok::Op("-") => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.bump();
            let right = self.term()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn term(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Tok::Op("*") => BinaryOp::Mul,
                Tok::Op("/") => BinaryOp::Div,
                Tok::Op("//") => BinaryOp::FloorDiv,
                Tok::Op("%") => BinaryOp::Mod,
                _ => return Ok(left),
            };
            self.bump();
            let right = self.unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn unary(&mut self) -> Result<Expr, ScriptError> {
        if self.at_op("-") {
            self.bump();
            return Ok(Expr::Neg(Box::new(self.unary()?)));
        }
        if self.at_op("+") {
            self.bump();
            return Ok(Expr::Pos(Box::new(self.unary()?)));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, ScriptError> {
        let expr = self.atom()?;
        if !self.at_op("[") {
            return Ok(expr);
        }
        if expr != Expr::Name("fields".to_string()) {
            return Err(self.error("only 'fields' can be subscripted"));
        }
        self.bump();
        let key = self.expression()?;
        self.expect_op("]")?;
        Ok(Expr::Field(Box::new(key)))
    }

    fn atom(&mut self) -> Result<Expr, ScriptError> {
        match self.peek().clone() {
            Tok::Int(i) => {
                self.bump();
                Ok(Expr::Literal(Value::Int(i)))
            }
            Tok::Dec(d) => {
                self.bump();
                Ok(Expr::Literal(Value::Decimal(d)))
            }
            Tok::Str(s) => {
                self.bump();
                Ok(Expr::Literal(Value::Str(s)))
            }
            Tok::Ident(name) => match name.as_str() {
                "True" | "False" => {
                    self.bump();
                    Ok(Expr::Literal(Value::Bool(name == "True")))
                }
                keyword if KEYWORDS.contains(&keyword) => Err(self.unexpected("an expression")),
                _ => {
                    self.bump();
                    if self.at_op("(") {
                        self.bump();
                        Ok(Expr::Call(name, self.arguments()?))
                    } else {
                        Ok(Expr::Name(name))
                    }
                }
            },
            Tok::Op("(") => {
                self.bump();
                let expr = self.expression()?;
                self.expect_op(")")?;
                Ok(expr)
            }
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn arguments(&mut self) -> Result<Vec<Expr>, ScriptError> {
        let mut args = Vec::new();
        while !self.at_op(")") {
            args.push(self.expression()?);
            if !self.at_op(",") {
                break;
            }
            self.bump();
        }
        self.expect_op(")")?;
        Ok(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::lexer::tokenize;

    fn parse_src(source: &str) -> Vec<Stmt> {
        parse(tokenize(source).expect("tokenize failed")).expect("parse failed")
    }

    fn parse_err(source: &str) -> ScriptError {
        parse(tokenize(source).expect("tokenize failed")).unwrap_err()
    }

    #[test]
    fn augmented_assignment() {
        let stmts = parse_src("x *= 2");
        assert_eq!(
            stmts[0].kind,
            StmtKind::Assign {
                target: Target::Name("x".into()),
                op: Some(BinaryOp::Mul),
                value: Expr::Literal(Value::Int(2)),
            }
        );
    }

    #[test]
    fn field_subscript_target() {
        let stmts = parse_src("fields['-n'] = 3");
        let StmtKind::Assign { target, .. } = &stmts[0].kind else {
            panic!("expected assignment");
        };
        assert_eq!(
            *target,
            Target::Field(Expr::Literal(Value::Str("-n".into())))
        );
    }

    #[test]
    fn precedence() {
        let stmts = parse_src("x = 1 + 2 * 3");
        let StmtKind::Assign { value, .. } = &stmts[0].kind else {
            panic!("expected assignment");
        };
        let Expr::Binary(BinaryOp::Add, _, right) = value else {
            panic!("expected addition at the root: {value:?}");
        };
        assert!(matches!(**right, Expr::Binary(BinaryOp::Mul, _, _)));
    }

    #[test]
    fn if_elif_else_blocks() {
        let stmts = parse_src("if a:\n    x = 1\nelif b: x = 2\nelse:\n    pass\ny = 3\n");
        assert_eq!(stmts.len(), 2);
        let StmtKind::If {
            branches,
            otherwise,
        } = &stmts[0].kind
        else {
            panic!("expected if");
        };
        assert_eq!(branches.len(), 2);
        assert_eq!(otherwise[0].kind, StmtKind::Pass);
        assert_eq!(stmts[1].line, 6);
    }

    #[test]
    fn conditional_expression_and_not_in() {
        let stmts = parse_src("x = 'a' if 'b' not in s else 'c'");
        let StmtKind::Assign { value, .. } = &stmts[0].kind else {
            panic!("expected assignment");
        };
        let Expr::Conditional { condition, .. } = value else {
            panic!("expected conditional");
        };
        assert!(matches!(**condition, Expr::Compare(CompareOp::NotIn, _, _)));
    }

    #[test]
    fn rejects_bad_targets_and_subscripts() {
        assert!(parse_err("1 = x").message.contains("cannot assign"));
        assert!(parse_err("x = y[0]").message.contains("subscripted"));
        assert!(parse_err("x + 1").message.contains("expected an assignment"));
    }

    #[test]
    fn reports_the_failing_line() {
        let err = parse_err("x = 1\ny = (2");
        assert_eq!(err.line, 2);
    }
}
