//! Signal formula language.
//!
//! Formulas are arithmetic over numeric literals and identifiers:
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := factor (('*' | '/') factor)*
//! factor := '-' factor | NUMBER | IDENT | '(' expr ')'
//! ```
//!
//! Identifiers name panel fields, other signals, or facts. Nothing else is
//! accepted, so a formula can never do more than arithmetic. Formulas are
//! capped at [`MAX_TOKENS`] tokens and [`MAX_NESTING`] levels of parentheses
//! or unary minus.

use std::collections::BTreeSet;
use std::fmt;

/// Divisors closer to zero than this are treated as zero.
const DIVISION_EPSILON: f64 = 1e-12;

pub const MAX_TOKENS: usize = 256;
pub const MAX_NESTING: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} at offset {position}")]
pub struct FormulaError {
    pub position: usize,
    pub message: String,
}

impl FormulaError {
    fn new(position: usize, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvalError {
    #[error("reference `{0}` has no value")]
    MissingReference(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("result is not a finite number")]
    NonFinite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    fn symbol(self) -> char {
        match self {
            BinaryOp::Add => '+',
            BinaryOp::Sub => '-',
            BinaryOp::Mul => '*',
            BinaryOp::Div => '/',
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Ref(String),
    Neg(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

impl Expr {
    pub fn parse(source: &str) -> Result<Expr, FormulaError> {
        let tokens = tokenize(source)?;
        if let Some(extra) = tokens.get(MAX_TOKENS) {
            return Err(FormulaError::new(
                extra.offset,
                format!("formula is longer than {MAX_TOKENS} tokens"),
            ));
        }
        let mut parser = Parser {
            tokens: &tokens,
            position: 0,
            end: source.len(),
            depth: 0,
        };
        let expr = parser.expr()?;
        if let Some(token) = parser.peek() {
            return Err(FormulaError::new(token.offset, "unexpected trailing input"));
        }
        Ok(expr)
    }

    /// Every identifier the formula mentions, sorted and deduplicated.
    pub fn references(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.collect_references(&mut names);
        names
    }

    fn collect_references(&self, names: &mut BTreeSet<String>) {
        match self {
            Expr::Number(_) => {}
            Expr::Ref(name) => {
                names.insert(name.clone());
            }
            Expr::Neg(inner) => inner.collect_references(names),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.collect_references(names);
                rhs.collect_references(names);
            }
        }
    }

    /// Evaluates with `resolve` supplying identifier values.
    pub fn evaluate<F>(&self, resolve: &F) -> Result<f64, EvalError>
    where
        F: Fn(&str) -> Option<f64>,
    {
        let value = match self {
            Expr::Number(value) => *value,
            Expr::Ref(name) => resolve(name.as_str())
                .ok_or_else(|| EvalError::MissingReference(name.clone()))?,
            Expr::Neg(inner) => -inner.evaluate(resolve)?,
            Expr::Binary { op, lhs, rhs } => {
                let left = lhs.evaluate(resolve)?;
                let right = rhs.evaluate(resolve)?;
                match op {
                    BinaryOp::Add => left + right,
                    BinaryOp::Sub => left - right,
                    BinaryOp::Mul => left * right,
                    BinaryOp::Div => {
                        if right.abs() < DIVISION_EPSILON {
                            return Err(EvalError::DivisionByZero);
                        }
                        left / right
                    }
                }
            }
        };
        if value.is_finite() {
            Ok(value)
        } else {
            Err(EvalError::NonFinite)
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(value) => write!(f, "{value}"),
            Expr::Ref(name) => f.write_str(name),
            Expr::Neg(inner) => write!(f, "-({inner})"),
            Expr::Binary { op, lhs, rhs } => write!(f, "({lhs} {} {rhs})", op.symbol()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Number(f64),
    Ident(String),
    Op(BinaryOp),
    LParen,
    RParen,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    offset: usize,
}

fn tokenize(source: &str) -> Result<Vec<Token>, FormulaError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();
    while let Some(&(offset, ch)) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }
        let kind = match ch {
            '+' => TokenKind::Op(BinaryOp::Add),
            '-' => TokenKind::Op(BinaryOp::Sub),
            '*' => TokenKind::Op(BinaryOp::Mul),
            '/' => TokenKind::Op(BinaryOp::Div),
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            c if c.is_ascii_digit() || c == '.' => {
                let mut end = offset;
                while let Some(&(index, next)) = chars.peek() {
                    if next.is_ascii_digit() || next == '.' {
                        end = index + next.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let text = &source[offset..end];
                let value = text
                    .parse::<f64>()
                    .map_err(|_| FormulaError::new(offset, format!("invalid number `{text}`")))?;
                tokens.push(Token {
                    kind: TokenKind::Number(value),
                    offset,
                });
                continue;
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut end = offset;
                while let Some(&(index, next)) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' {
                        end = index + next.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token {
                    kind: TokenKind::Ident(source[offset..end].to_string()),
                    offset,
                });
                continue;
            }
            other => {
                return Err(FormulaError::new(
                    offset,
                    format!("unexpected character `{other}`"),
                ));
            }
        };
        chars.next();
        tokens.push(Token { kind, offset });
    }
    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    position: usize,
    end: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.position);
        self.position += 1;
        token
    }

    fn peek_op(&self, accepted: &[BinaryOp]) -> Option<BinaryOp> {
        match self.peek().map(|token| &token.kind) {
            Some(TokenKind::Op(op)) if accepted.contains(op) => Some(*op),
            _ => None,
        }
    }

    /// Runs `parse` one nesting level deeper.
    fn nested(
        &mut self,
        offset: usize,
        parse: impl FnOnce(&mut Self) -> Result<Expr, FormulaError>,
    ) -> Result<Expr, FormulaError> {
        if self.depth >= MAX_NESTING {
            return Err(FormulaError::new(
                offset,
                format!("nested deeper than {MAX_NESTING} levels"),
            ));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn expr(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.term()?;
        while let Some(op) = self.peek_op(&[BinaryOp::Add, BinaryOp::Sub]) {
            self.position += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.factor()?;
        while let Some(op) = self.peek_op(&[BinaryOp::Mul, BinaryOp::Div]) {
            self.position += 1;
            let rhs = self.factor()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn factor(&mut self) -> Result<Expr, FormulaError> {
        let end = self.end;
        let Some(token) = self.advance().cloned() else {
            return Err(FormulaError::new(end, "unexpected end of formula"));
        };
        match token.kind {
            TokenKind::Op(BinaryOp::Sub) => self.nested(token.offset, |parser| {
                Ok(Expr::Neg(Box::new(parser.factor()?)))
            }),
            TokenKind::Number(value) => Ok(Expr::Number(value)),
            TokenKind::Ident(name) => Ok(Expr::Ref(name)),
            TokenKind::LParen => self.nested(token.offset, |parser| {
                let inner = parser.expr()?;
                match parser.advance() {
                    Some(Token {
                        kind: TokenKind::RParen,
                        ..
                    }) => Ok(inner),
                    Some(other) => Err(FormulaError::new(other.offset, "expected `)`")),
                    None => Err(FormulaError::new(end, "missing closing `)`")),
                }
            }),
            TokenKind::Op(_) | TokenKind::RParen => {
                Err(FormulaError::new(token.offset, "expected a value"))
            }
        }
    }
}
