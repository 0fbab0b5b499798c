//! Recursive-descent parser producing an [`Expr`] tree.
//!
//! Grammar:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := '-' unary | primary
//! primary := NUMBER
//!          | IDENT
//!          | IDENT '(' expr ',' expr ')'     -- only SAFE_DIVIDE
//!          | '(' expr ')'
//! ```
//!
//! `NUMBER` is a decimal literal with an optional exponent: `3`, `.5`,
//! `2.5e-2`.

use std::fmt;

use crate::error::{ExprError, Result};
use crate::lexer::{Spanned, Token, tokenize};

/// Longest accepted expression source, in bytes.
pub const MAX_SOURCE_LEN: usize = 4096;

/// Deepest accepted nesting of parentheses and unary minus.
pub const MAX_DEPTH: usize = 64;

/// Name of the only callable, matched case-insensitively.
pub const SAFE_DIVIDE: &str = "SAFE_DIVIDE";

// ---------------------------------------------------------------------------
// AST
// ---------------------------------------------------------------------------

/// Binary arithmetic operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
}

impl BinOp {
    fn symbol(self) -> char {
        match self {
            BinOp::Add => '+',
            BinOp::Sub => '-',
            BinOp::Mul => '*',
            BinOp::Div => '/',
        }
    }
}

/// Expression tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Numeric literal.
    Number(f64),
    /// Row field reference.
    Field(String),
    /// Unary minus.
    Neg(Box<Expr>),
    /// Binary arithmetic.
    Binary {
        /// Operator
        op: BinOp,
        /// Left operand
        lhs: Box<Expr>,
        /// Right operand
        rhs: Box<Expr>,
    },
    /// `SAFE_DIVIDE(numerator, denominator)`.
    SafeDivide {
        /// Dividend
        numerator: Box<Expr>,
        /// Divisor
        denominator: Box<Expr>,
    },
}

impl Expr {
    /// Push every referenced field name onto `out`.
    pub(crate) fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Number(_) => {}
            Expr::Field(name) => out.push(name),
            Expr::Neg(inner) => inner.collect_fields(out),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.collect_fields(out);
                rhs.collect_fields(out);
            }
            Expr::SafeDivide {
                numerator,
                denominator,
            } => {
                numerator.collect_fields(out);
                denominator.collect_fields(out);
            }
        }
    }
}

/// Canonical, fully parenthesized rendering.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{n}"),
            Expr::Field(name) => f.write_str(name),
            Expr::Neg(inner) => write!(f, "-{inner}"),
            Expr::Binary { op, lhs, rhs } => write!(f, "({lhs} {} {rhs})", op.symbol()),
            Expr::SafeDivide {
                numerator,
                denominator,
            } => write!(f, "{SAFE_DIVIDE}({numerator}, {denominator})"),
        }
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse `source` into an expression tree.
pub fn parse(source: &str) -> Result<Expr> {
    if source.len() > MAX_SOURCE_LEN {
        return Err(ExprError::TooLong {
            max: MAX_SOURCE_LEN,
        });
    }
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err(ExprError::Empty);
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.expr()?;
    match parser.peek() {
        None => Ok(expr),
        Some(extra) => Err(unexpected(extra, "end of expression")),
    }
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self, expected: &'static str) -> Result<Spanned> {
        let spanned = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or(ExprError::UnexpectedEnd { expected })?;
        self.pos += 1;
        Ok(spanned)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek().is_some_and(|s| &s.token == token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token, expected: &'static str) -> Result<()> {
        let spanned = self.next(expected)?;
        if spanned.token == token {
            Ok(())
        } else {
            Err(unexpected(&spanned, expected))
        }
    }

    fn expr(&mut self) -> Result<Expr> {
        let mut lhs = self.term()?;
        loop {
            let op = if self.eat(&Token::Plus) {
                BinOp::Add
            } else if self.eat(&Token::Minus) {
                BinOp::Sub
            } else {
                return Ok(lhs);
            };
            let rhs = self.term()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn term(&mut self) -> Result<Expr> {
        let mut lhs = self.unary()?;
        loop {
            let op = if self.eat(&Token::Star) {
                BinOp::Mul
            } else if self.eat(&Token::Slash) {
                BinOp::Div
            } else {
                return Ok(lhs);
            };
            let rhs = self.unary()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn unary(&mut self) -> Result<Expr> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExprError::TooDeep { max: MAX_DEPTH });
        }
        let result = if self.eat(&Token::Minus) {
            self.unary().map(|inner| Expr::Neg(Box::new(inner)))
        } else {
            self.primary()
        };
        self.depth -= 1;
        result
    }

    fn primary(&mut self) -> Result<Expr> {
        let spanned = self.next("a number, field, or '('")?;
        match spanned.token {
            Token::Number(n) => Ok(Expr::Number(n)),
            Token::LParen => {
                let inner = self.expr()?;
                self.expect(Token::RParen, "')'")?;
                Ok(inner)
            }
            Token::Ident(name) => {
                if !self.eat(&Token::LParen) {
                    return Ok(Expr::Field(name));
                }
                if !name.eq_ignore_ascii_case(SAFE_DIVIDE) {
                    return Err(ExprError::UnknownFunction { name });
                }
                let numerator = self.expr()?;
                self.expect(Token::Comma, "',' between SAFE_DIVIDE arguments")?;
                let denominator = self.expr()?;
                self.expect(Token::RParen, "')' closing SAFE_DIVIDE")?;
                Ok(Expr::SafeDivide {
                    numerator: Box::new(numerator),
                    denominator: Box::new(denominator),
                })
            }
            _ => Err(unexpected(&spanned, "a number, field, or '('")),
        }
    }
}

fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

fn unexpected(spanned: &Spanned, expected: &'static str) -> ExprError {
    ExprError::UnexpectedToken {
        found: spanned.token.to_string(),
        offset: spanned.offset,
        expected,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn render(source: &str) -> String {
        parse(source).unwrap().to_string()
    }

    #[test]
    fn test_precedence() {
        assert_eq!(render("a + b * c"), "(a + (b * c))");
        assert_eq!(render("(a + b) * c"), "((a + b) * c)");
        assert_eq!(render("a - b - c"), "((a - b) - c)");
        assert_eq!(render("a / b * c"), "((a / b) * c)");
    }

    #[test]
    fn test_unary_minus() {
        assert_eq!(render("-a * 2"), "(-a * 2)");
        assert_eq!(render("--3"), "--3");
    }

    #[test]
    fn test_safe_divide_case_and_whitespace() {
        for source in [
            "SAFE_DIVIDE(a, b)",
            "safe_divide(a,b)",
            "Safe_Divide (  a ,  b  )",
        ] {
            assert_eq!(render(source), "SAFE_DIVIDE(a, b)", "{source}");
        }
    }

    #[test]
    fn test_safe_divide_nested_arguments() {
        assert_eq!(
            render("SAFE_DIVIDE(SAFE_DIVIDE(a, b), (c + d))"),
            "SAFE_DIVIDE(SAFE_DIVIDE(a, b), (c + d))"
        );
    }

    #[test]
    fn test_unknown_function() {
        let err = parse("MAX(a, b)").unwrap_err();
        assert_eq!(
            err,
            ExprError::UnknownFunction {
                name: "MAX".into()
            }
        );
    }

    #[test]
    fn test_missing_argument() {
        let err = parse("SAFE_DIVIDE(a)").unwrap_err();
        assert!(matches!(err, ExprError::UnexpectedToken { .. }));
        let err = parse("SAFE_DIVIDE(a,").unwrap_err();
        assert!(matches!(err, ExprError::UnexpectedEnd { .. }));
    }

    #[test]
    fn test_trailing_tokens() {
        let err = parse("a b").unwrap_err();
        assert!(matches!(
            err,
            ExprError::UnexpectedToken { offset: 2, expected: "end of expression", .. }
        ));
    }

    #[test]
    fn test_unbalanced_parens() {
        assert!(matches!(
            parse("(a + b").unwrap_err(),
            ExprError::UnexpectedEnd { .. }
        ));
        assert!(matches!(
            parse("a + b)").unwrap_err(),
            ExprError::UnexpectedToken { .. }
        ));
    }

    #[test]
    fn test_empty() {
        assert_eq!(parse("").unwrap_err(), ExprError::Empty);
        assert_eq!(parse("  \t").unwrap_err(), ExprError::Empty);
    }

    #[test]
    fn test_too_long() {
        let source = "a+".repeat(MAX_SOURCE_LEN);
        assert_eq!(
            parse(&source).unwrap_err(),
            ExprError::TooLong {
                max: MAX_SOURCE_LEN
            }
        );
    }

    #[test]
    fn test_too_deep() {
        let source = format!("{}a{}", "(".repeat(200), ")".repeat(200));
        assert_eq!(
            parse(&source).unwrap_err(),
            ExprError::TooDeep { max: MAX_DEPTH }
        );
        let source = format!("{}a", "-".repeat(200));
        assert_eq!(
            parse(&source).unwrap_err(),
            ExprError::TooDeep { max: MAX_DEPTH }
        );
    }

    #[test]
    fn test_collect_fields() {
        let expr = parse("SAFE_DIVIDE(revenue, spend) - cost + 2").unwrap();
        let mut fields = Vec::new();
        expr.collect_fields(&mut fields);
        assert_eq!(fields, vec!["revenue", "spend", "cost"]);
    }
}
