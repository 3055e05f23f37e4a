//! Safe arithmetic expressions for data-driven formulas.
//!
//! Content describes damage and scaling with small formula strings such as
//! `"2 + actor.level * 1~3"`. Strings parse once at load time into an
//! [`Expr`] tree; evaluation walks the tree against an [`EvalContext`] and a
//! caller-supplied random stream. Unknown identifiers read as zero, so a bad
//! formula degrades to a missing effect instead of halting the tick loop.

use rand::Rng;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::warn;

use crate::values::finite_or_zero;

/// Expression parse failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExprError {
    #[error("unexpected character `{0}` at byte {1}")]
    UnexpectedChar(char, usize),
    #[error("unexpected token `{0}`")]
    UnexpectedToken(String),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unknown function `{0}`")]
    UnknownFunction(String),
    #[error("function `{0}` takes {1} argument(s)")]
    BadArity(&'static str, usize),
}

/// Named values visible to a formula, keyed by dotted path
/// (`"actor.level"`, `"target.hp"`, `"mod.flat"`).
#[derive(Debug, Clone, Default)]
pub struct EvalContext {
    vars: BTreeMap<String, f64>,
}

impl EvalContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, path: impl Into<String>, value: f64) {
        self.vars.insert(path.into(), value);
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, path: impl Into<String>, value: f64) -> Self {
        self.set(path, value);
        self
    }

    pub fn get(&self, path: &str) -> Option<f64> {
        self.vars.get(path).copied()
    }
}

/// A parsed formula tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    Var(String),
    Neg(Box<Expr>),
    Bin(BinOp, Box<Expr>, Box<Expr>),
    Call(Func, Vec<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    /// `a ~ b`: uniform roll between the two operands.
    Range,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Func {
    Min,
    Max,
    Floor,
    Ceil,
    Round,
    Abs,
    Rand,
}

impl Func {
    fn resolve(name: &str) -> Option<Func> {
        match name {
            "min" => Some(Func::Min),
            "max" => Some(Func::Max),
            "floor" => Some(Func::Floor),
            "ceil" => Some(Func::Ceil),
            "round" => Some(Func::Round),
            "abs" => Some(Func::Abs),
            "rand" => Some(Func::Rand),
            _ => None,
        }
    }

    /// Argument count check, done at parse time.
    fn arity_ok(self, n: usize) -> bool {
        match self {
            Func::Min | Func::Max => n >= 2,
            Func::Floor | Func::Ceil | Func::Round | Func::Abs => n == 1,
            Func::Rand => n == 0,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Func::Min => "min",
            Func::Max => "max",
            Func::Floor => "floor",
            Func::Ceil => "ceil",
            Func::Round => "round",
            Func::Abs => "abs",
            Func::Rand => "rand",
        }
    }
}

impl Expr {
    /// Evaluate against `ctx`. Non-finite results clamp to zero.
    pub fn eval(&self, ctx: &EvalContext, rng: &mut impl Rng) -> f64 {
        finite_or_zero(self.eval_inner(ctx, rng))
    }

    fn eval_inner(&self, ctx: &EvalContext, rng: &mut impl Rng) -> f64 {
        match self {
            Expr::Num(v) => *v,
            Expr::Var(path) => match ctx.get(path) {
                Some(v) => v,
                None => {
                    warn!("formula references unknown value `{}`", path);
                    0.0
                }
            },
            Expr::Neg(e) => -e.eval_inner(ctx, rng),
            Expr::Bin(op, lhs, rhs) => {
                let a = lhs.eval_inner(ctx, rng);
                let b = rhs.eval_inner(ctx, rng);
                match op {
                    BinOp::Add => a + b,
                    BinOp::Sub => a - b,
                    BinOp::Mul => a * b,
                    BinOp::Div => {
                        if b == 0.0 {
                            0.0
                        } else {
                            a / b
                        }
                    }
                    BinOp::Rem => {
                        if b == 0.0 {
                            0.0
                        } else {
                            a % b
                        }
                    }
                    BinOp::Range => {
                        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
                        if lo == hi {
                            lo
                        } else {
                            rng.gen_range(lo..=hi)
                        }
                    }
                    BinOp::Lt => bool_num(a < b),
                    BinOp::Le => bool_num(a <= b),
                    BinOp::Gt => bool_num(a > b),
                    BinOp::Ge => bool_num(a >= b),
                    BinOp::Eq => bool_num(a == b),
                    BinOp::Ne => bool_num(a != b),
                }
            }
            Expr::Call(func, args) => match func {
                Func::Min => args
                    .iter()
                    .map(|a| a.eval_inner(ctx, rng))
                    .fold(f64::INFINITY, f64::min),
                Func::Max => args
                    .iter()
                    .map(|a| a.eval_inner(ctx, rng))
                    .fold(f64::NEG_INFINITY, f64::max),
                Func::Floor => args[0].eval_inner(ctx, rng).floor(),
                Func::Ceil => args[0].eval_inner(ctx, rng).ceil(),
                Func::Round => args[0].eval_inner(ctx, rng).round(),
                Func::Abs => args[0].eval_inner(ctx, rng).abs(),
                Func::Rand => rng.gen::<f64>(),
            },
        }
    }
}

fn bool_num(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// Parse a formula string into an [`Expr`].
pub fn parse_expr(src: &str) -> Result<Expr, ExprError> {
    let tokens = lex(src)?;
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
    };
    let expr = parser.comparison()?;
    match parser.peek() {
        None => Ok(expr),
        Some(tok) => Err(ExprError::UnexpectedToken(format!("{:?}", tok))),
    }
}

// ── lexer ──

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Tilde,
    LParen,
    RParen,
    Comma,
    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    Ne,
}

fn lex(src: &str) -> Result<Vec<Token>, ExprError> {
    let mut tokens = Vec::new();
    let bytes = src.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '%' => {
                tokens.push(Token::Percent);
                i += 1;
            }
            '~' => {
                tokens.push(Token::Tilde);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '<' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Token::Le);
                    i += 2;
                } else {
                    tokens.push(Token::Lt);
                    i += 1;
                }
            }
            '>' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Token::Ge);
                    i += 2;
                } else {
                    tokens.push(Token::Gt);
                    i += 1;
                }
            }
            '=' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Token::EqEq);
                    i += 2;
                } else {
                    return Err(ExprError::UnexpectedChar('=', i));
                }
            }
            '!' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Token::Ne);
                    i += 2;
                } else {
                    return Err(ExprError::UnexpectedChar('!', i));
                }
            }
            '0'..='9' | '.' => {
                let start = i;
                while i < bytes.len() && matches!(bytes[i] as char, '0'..='9' | '.') {
                    i += 1;
                }
                let text = &src[start..i];
                let v: f64 = text
                    .parse()
                    .map_err(|_| ExprError::UnexpectedChar('.', start))?;
                tokens.push(Token::Num(v));
            }
            'a'..='z' | 'A'..='Z' | '_' => {
                let start = i;
                while i < bytes.len()
                    && matches!(bytes[i] as char, 'a'..='z' | 'A'..='Z' | '0'..='9' | '_' | '.')
                {
                    i += 1;
                }
                tokens.push(Token::Ident(src[start..i].to_string()));
            }
            other => return Err(ExprError::UnexpectedChar(other, i)),
        }
    }
    Ok(tokens)
}

// ── parser ──
//
// Precedence, loosest first: comparison, additive, multiplicative, unary
// minus, `~`. `1~5 + 2` therefore rolls the range first.

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, want: &Token) -> Result<(), ExprError> {
        match self.next() {
            Some(tok) if tok == want => Ok(()),
            Some(tok) => Err(ExprError::UnexpectedToken(format!("{:?}", tok))),
            None => Err(ExprError::UnexpectedEnd),
        }
    }

    fn comparison(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.additive()?;
        while let Some(op) = match self.peek() {
            Some(Token::Lt) => Some(BinOp::Lt),
            Some(Token::Le) => Some(BinOp::Le),
            Some(Token::Gt) => Some(BinOp::Gt),
            Some(Token::Ge) => Some(BinOp::Ge),
            Some(Token::EqEq) => Some(BinOp::Eq),
            Some(Token::Ne) => Some(BinOp::Ne),
            _ => None,
        } {
            self.pos += 1;
            let rhs = self.additive()?;
            lhs = Expr::Bin(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn additive(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.multiplicative()?;
        while let Some(op) = match self.peek() {
            Some(Token::Plus) => Some(BinOp::Add),
            Some(Token::Minus) => Some(BinOp::Sub),
            _ => None,
        } {
            self.pos += 1;
            let rhs = self.multiplicative()?;
            lhs = Expr::Bin(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn multiplicative(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.unary()?;
        while let Some(op) = match self.peek() {
            Some(Token::Star) => Some(BinOp::Mul),
            Some(Token::Slash) => Some(BinOp::Div),
            Some(Token::Percent) => Some(BinOp::Rem),
            _ => None,
        } {
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::Bin(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        if self.peek() == Some(&Token::Minus) {
            self.pos += 1;
            let e = self.unary()?;
            return Ok(Expr::Neg(Box::new(e)));
        }
        self.range()
    }

    fn range(&mut self) -> Result<Expr, ExprError> {
        let lhs = self.primary()?;
        if self.peek() == Some(&Token::Tilde) {
            self.pos += 1;
            let rhs = self.unary()?;
            return Ok(Expr::Bin(BinOp::Range, Box::new(lhs), Box::new(rhs)));
        }
        Ok(lhs)
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        match self.next().cloned() {
            Some(Token::Num(v)) => Ok(Expr::Num(v)),
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    self.pos += 1;
                    let args = self.args()?;
                    let func = Func::resolve(&name)
                        .ok_or_else(|| ExprError::UnknownFunction(name.clone()))?;
                    if !func.arity_ok(args.len()) {
                        return Err(ExprError::BadArity(func.name(), args.len()));
                    }
                    Ok(Expr::Call(func, args))
                } else {
                    Ok(Expr::Var(name))
                }
            }
            Some(Token::LParen) => {
                let e = self.comparison()?;
                self.expect(&Token::RParen)?;
                Ok(e)
            }
            Some(tok) => Err(ExprError::UnexpectedToken(format!("{:?}", tok))),
            None => Err(ExprError::UnexpectedEnd),
        }
    }

    fn args(&mut self) -> Result<Vec<Expr>, ExprError> {
        let mut args = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            self.pos += 1;
            return Ok(args);
        }
        loop {
            args.push(self.comparison()?);
            match self.next() {
                Some(Token::Comma) => continue,
                Some(Token::RParen) => return Ok(args),
                Some(tok) => return Err(ExprError::UnexpectedToken(format!("{:?}", tok))),
                None => return Err(ExprError::UnexpectedEnd),
            }
        }
    }
}
