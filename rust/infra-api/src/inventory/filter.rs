//! Filter-expression language for list queries.
//!
//! ```text
//! expr  := or
//! or    := and ("OR" and)*
//! and   := unary ("AND" unary)*
//! unary := "NOT" unary | "(" expr ")" | "has(" path ")" | path op literal
//! op    := "=" | "!=" | "<" | "<=" | ">" | ">="
//! ```
//!
//! Literals are double-quoted strings (with `\"` and `\\` escapes) or
//! unsigned integers. Paths are dotted field names such as
//! `target_host.resource_id`. Keywords are case-insensitive. An empty
//! expression matches everything.

use std::cmp::Ordering;

use crate::error::{ApiError, ApiResult};

/// A literal or field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Str(String),
    Uint(u64),
}

/// Result of resolving a path against a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// The resource has no such field.
    Unknown,
    /// The field exists but holds nothing (an absent edge).
    Unset,
    Value(Value),
}

/// Something a filter expression can be evaluated against.
pub trait Filterable {
    fn lookup(&self, path: &str) -> Lookup;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    fn holds(self, ord: Ordering) -> bool {
        match self {
            Self::Eq => ord == Ordering::Equal,
            Self::Ne => ord != Ordering::Equal,
            Self::Lt => ord == Ordering::Less,
            Self::Le => ord != Ordering::Greater,
            Self::Gt => ord == Ordering::Greater,
            Self::Ge => ord != Ordering::Less,
        }
    }
}

/// Parsed filter expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    All,
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Has(String),
    Cmp {
        path: String,
        op: CmpOp,
        value: Value,
    },
}

impl Expr {
    pub fn parse(input: &str) -> ApiResult<Self> {
        if input.trim().is_empty() {
            return Ok(Self::All);
        }
        let mut parser = Parser {
            tokens: tokenize(input)?,
            pos: 0,
        };
        let expr = parser.parse_or()?;
        if let Some(token) = parser.peek() {
            return Err(syntax_error(format!("unexpected {token:?} after expression")));
        }
        Ok(expr)
    }

    /// Evaluate against `item`. Unknown paths and type mismatches are
    /// `InvalidArgument`.
    pub fn matches(&self, item: &dyn Filterable) -> ApiResult<bool> {
        match self {
            Self::All => Ok(true),
            Self::Or(lhs, rhs) => Ok(lhs.matches(item)? || rhs.matches(item)?),
            Self::And(lhs, rhs) => Ok(lhs.matches(item)? && rhs.matches(item)?),
            Self::Not(inner) => Ok(!inner.matches(item)?),
            Self::Has(path) => match item.lookup(path) {
                Lookup::Unknown => Err(unknown_field(path)),
                Lookup::Unset => Ok(false),
                Lookup::Value(_) => Ok(true),
            },
            Self::Cmp { path, op, value } => match item.lookup(path) {
                Lookup::Unknown => Err(unknown_field(path)),
                Lookup::Unset => Ok(*op == CmpOp::Ne),
                Lookup::Value(actual) => {
                    let ord = match (&actual, value) {
                        (Value::Str(a), Value::Str(b)) => a.cmp(b),
                        (Value::Uint(a), Value::Uint(b)) => a.cmp(b),
                        _ => {
                            return Err(ApiError::invalid_argument(format!(
                                "filter: type mismatch comparing field {path}"
                            )));
                        }
                    };
                    Ok(op.holds(ord))
                }
            },
        }
    }
}

/// Quote `value` as a string literal.
pub fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn syntax_error(msg: impl std::fmt::Display) -> ApiError {
    ApiError::invalid_argument(format!("filter: {msg}"))
}

fn unknown_field(path: &str) -> ApiError {
    ApiError::invalid_argument(format!("filter: unknown field {path}"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    LParen,
    RParen,
    Ident(String),
    Str(String),
    Uint(u64),
    Op(CmpOp),
}

fn tokenize(input: &str) -> ApiResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '"' => {
                chars.next();
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some((_, '\\')) => match chars.next() {
                            Some((_, escaped)) => s.push(escaped),
                            None => return Err(syntax_error("unterminated string")),
                        },
                        Some((_, '"')) => break,
                        Some((_, ch)) => s.push(ch),
                        None => {
                            return Err(syntax_error(format!(
                                "unterminated string starting at offset {pos}"
                            )));
                        }
                    }
                }
                tokens.push(Token::Str(s));
            }
            '=' => {
                chars.next();
                tokens.push(Token::Op(CmpOp::Eq));
            }
            '!' => {
                chars.next();
                if chars.next_if(|&(_, ch)| ch == '=').is_none() {
                    return Err(syntax_error(format!("expected '=' after '!' at offset {pos}")));
                }
                tokens.push(Token::Op(CmpOp::Ne));
            }
            '<' | '>' => {
                chars.next();
                let or_equal = chars.next_if(|&(_, ch)| ch == '=').is_some();
                tokens.push(Token::Op(match (c, or_equal) {
                    ('<', false) => CmpOp::Lt,
                    ('<', true) => CmpOp::Le,
                    (_, false) => CmpOp::Gt,
                    (_, true) => CmpOp::Ge,
                }));
            }
            c if c.is_ascii_digit() => {
                let mut digits = String::new();
                while let Some((_, d)) = chars.next_if(|&(_, ch)| ch.is_ascii_digit()) {
                    digits.push(d);
                }
                let n = digits
                    .parse::<u64>()
                    .map_err(|e| syntax_error(format!("integer {digits} at offset {pos}: {e}")))?;
                tokens.push(Token::Uint(n));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some((_, ch)) =
                    chars.next_if(|&(_, ch)| ch.is_ascii_alphanumeric() || ch == '_' || ch == '.')
                {
                    ident.push(ch);
                }
                tokens.push(Token::Ident(ident));
            }
            other => {
                return Err(syntax_error(format!(
                    "unexpected character {other:?} at offset {pos}"
                )));
            }
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        let hit = matches!(self.peek(), Some(Token::Ident(s)) if s.eq_ignore_ascii_case(keyword));
        if hit {
            self.pos += 1;
        }
        hit
    }

    fn expect_rparen(&mut self) -> ApiResult<()> {
        match self.next() {
            Some(Token::RParen) => Ok(()),
            other => Err(syntax_error(format!("expected ')', found {other:?}"))),
        }
    }

    fn parse_or(&mut self) -> ApiResult<Expr> {
        let mut lhs = self.parse_and()?;
        while self.eat_keyword("OR") {
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> ApiResult<Expr> {
        let mut lhs = self.parse_unary()?;
        while self.eat_keyword("AND") {
            let rhs = self.parse_unary()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> ApiResult<Expr> {
        if self.eat_keyword("NOT") {
            return Ok(Expr::Not(Box::new(self.parse_unary()?)));
        }
        match self.next() {
            Some(Token::LParen) => {
                let expr = self.parse_or()?;
                self.expect_rparen()?;
                Ok(expr)
            }
            Some(Token::Ident(name))
                if name.eq_ignore_ascii_case("has") && self.peek() == Some(&Token::LParen) =>
            {
                self.pos += 1;
                let path = match self.next() {
                    Some(Token::Ident(path)) => path,
                    other => return Err(syntax_error(format!("expected field in has(), found {other:?}"))),
                };
                self.expect_rparen()?;
                Ok(Expr::Has(path))
            }
            Some(Token::Ident(path)) => {
                let op = match self.next() {
                    Some(Token::Op(op)) => op,
                    other => {
                        return Err(syntax_error(format!(
                            "expected operator after {path}, found {other:?}"
                        )));
                    }
                };
                let value = match self.next() {
                    Some(Token::Str(s)) => Value::Str(s),
                    Some(Token::Uint(n)) => Value::Uint(n),
                    other => {
                        return Err(syntax_error(format!(
                            "expected literal after {path}, found {other:?}"
                        )));
                    }
                };
                Ok(Expr::Cmp { path, op, value })
            }
            other => Err(syntax_error(format!("expected expression, found {other:?}"))),
        }
    }
}
