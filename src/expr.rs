//! Profile activation expressions.
//!
//! Grammar (standard precedence, `!` tightest, `&` before `|`):
//!
//! ```text
//! expr   := or
//! or     := and ( '|' and )*
//! and    := not ( '&' not )*
//! not    := '!' not | atom
//! atom   := IDENT | '(' expr ')'
//! ```
//!
//! `IDENT` is a maximal run of characters that are neither whitespace nor
//! one of the operators. Expressions are compiled once at parse time and
//! evaluated against an active-profile set.

use std::collections::HashSet;
use std::fmt;

/// A compiled profile expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileExpr {
    Profile(String),
    Not(Box<ProfileExpr>),
    And(Box<ProfileExpr>, Box<ProfileExpr>),
    Or(Box<ProfileExpr>, Box<ProfileExpr>),
}

/// A syntax error in a profile expression. The containing document is
/// dropped with a warning; this never aborts the run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprError {
    pub message: String,
    pub position: usize,
}

impl fmt::Display for ExprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at position {})", self.message, self.position)
    }
}

impl std::error::Error for ExprError {}

impl ProfileExpr {
    /// Parse an expression string.
    pub fn parse(input: &str) -> Result<ProfileExpr, ExprError> {
        let tokens = tokenize(input)?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.or_expr()?;
        match parser.peek() {
            Token::Eof => Ok(expr),
            other => Err(parser.unexpected(other)),
        }
    }

    /// Build the OR of several profile names (the legacy comma-list form of
    /// `on-profile`).
    pub fn any_of<I, S>(names: I) -> Option<ProfileExpr>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut result: Option<ProfileExpr> = None;
        for name in names {
            let atom = ProfileExpr::Profile(name.into());
            result = Some(match result {
                None => atom,
                Some(prev) => ProfileExpr::Or(Box::new(prev), Box::new(atom)),
            });
        }
        result
    }

    /// Evaluate against an active-profile set.
    pub fn evaluate(&self, active: &HashSet<String>) -> bool {
        match self {
            ProfileExpr::Profile(name) => active.contains(name),
            ProfileExpr::Not(inner) => !inner.evaluate(active),
            ProfileExpr::And(left, right) => left.evaluate(active) && right.evaluate(active),
            ProfileExpr::Or(left, right) => left.evaluate(active) || right.evaluate(active),
        }
    }

    /// All profile names referenced by this expression.
    pub fn profiles(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_profiles(&mut out);
        out
    }

    fn collect_profiles<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            ProfileExpr::Profile(name) => out.push(name),
            ProfileExpr::Not(inner) => inner.collect_profiles(out),
            ProfileExpr::And(left, right) | ProfileExpr::Or(left, right) => {
                left.collect_profiles(out);
                right.collect_profiles(out);
            }
        }
    }
}

impl fmt::Display for ProfileExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileExpr::Profile(name) => write!(f, "{name}"),
            ProfileExpr::Not(inner) => write!(f, "!{inner}"),
            ProfileExpr::And(left, right) => write!(f, "({left} & {right})"),
            ProfileExpr::Or(left, right) => write!(f, "({left} | {right})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String, usize),
    Not(usize),
    And(usize),
    Or(usize),
    LParen(usize),
    RParen(usize),
    Eof,
}

fn is_operator(c: char) -> bool {
    matches!(c, '!' | '&' | '|' | '(' | ')')
}

fn tokenize(input: &str) -> Result<Vec<Token>, ExprError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        match c {
            '!' => tokens.push(Token::Not(i)),
            '&' => tokens.push(Token::And(i)),
            '|' => tokens.push(Token::Or(i)),
            '(' => tokens.push(Token::LParen(i)),
            ')' => tokens.push(Token::RParen(i)),
            _ => {
                let start = i;
                let mut name = String::new();
                while i < chars.len() && !chars[i].is_whitespace() && !is_operator(chars[i]) {
                    name.push(chars[i]);
                    i += 1;
                }
                tokens.push(Token::Ident(name, start));
                continue;
            }
        }
        i += 1;
    }
    if tokens.is_empty() {
        return Err(ExprError {
            message: "empty profile expression".into(),
            position: 0,
        });
    }
    tokens.push(Token::Eof);
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        self.pos += 1;
        token
    }

    fn unexpected(&self, token: &Token) -> ExprError {
        let (what, position) = match token {
            Token::Ident(name, p) => (format!("'{name}'"), *p),
            Token::Not(p) => ("'!'".into(), *p),
            Token::And(p) => ("'&'".into(), *p),
            Token::Or(p) => ("'|'".into(), *p),
            Token::LParen(p) => ("'('".into(), *p),
            Token::RParen(p) => ("')'".into(), *p),
            Token::Eof => ("end of expression".into(), usize::MAX),
        };
        ExprError {
            message: format!("unexpected {what}"),
            position: if position == usize::MAX { 0 } else { position },
        }
    }

    fn or_expr(&mut self) -> Result<ProfileExpr, ExprError> {
        let mut left = self.and_expr()?;
        while matches!(self.peek(), Token::Or(_)) {
            self.advance();
            let right = self.and_expr()?;
            left = ProfileExpr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<ProfileExpr, ExprError> {
        let mut left = self.not_expr()?;
        while matches!(self.peek(), Token::And(_)) {
            self.advance();
            let right = self.not_expr()?;
            left = ProfileExpr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> Result<ProfileExpr, ExprError> {
        if matches!(self.peek(), Token::Not(_)) {
            self.advance();
            let operand = self.not_expr()?;
            return Ok(ProfileExpr::Not(Box::new(operand)));
        }
        self.atom()
    }

    fn atom(&mut self) -> Result<ProfileExpr, ExprError> {
        match self.advance() {
            Token::Ident(name, _) => Ok(ProfileExpr::Profile(name)),
            Token::LParen(_) => {
                let expr = self.or_expr()?;
                match self.advance() {
                    Token::RParen(_) => Ok(expr),
                    other => Err(self.unexpected(&other)),
                }
            }
            other => Err(self.unexpected(&other)),
        }
    }
}
