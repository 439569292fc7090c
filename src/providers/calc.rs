//! Inline arithmetic.
//!
//! Evaluates `+ - * /` with parentheses and unary minus over a small
//! recursive-descent parser. Malformed input is normal while the user is
//! still typing, so it produces no results rather than an error. Selection
//! of a result is consumed by this provider's hook; the rows carry no
//! spawnable action.

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use super::{Provider, ProviderError};
use crate::hooks::{Hook, HookOutcome};
use crate::item::ResultItem;

pub struct CalcProvider;

#[async_trait]
impl Provider for CalcProvider {
    fn name(&self) -> &'static str {
        "calc"
    }

    fn triggers(&self) -> &[&'static str] {
        &["calc", "="]
    }

    async fn populate(&self, query: &str) -> Result<Vec<ResultItem>, ProviderError> {
        let expr = query.trim();
        if expr.is_empty() {
            return Ok(Vec::new());
        }

        let value = match evaluate(expr) {
            Ok(value) => value,
            Err(_) => return Ok(Vec::new()),
        };

        Ok(vec![ResultItem::new(format_value(value), self.name())
            .with_subtitle(format!("= {expr}"))
            .with_icon("accessories-calculator")
            .with_metadata("expression", expr)])
    }

    fn hooks(&self) -> Vec<Hook> {
        vec![Hook::new("calc-select", 10).on_select(|item| {
            info!("Calculator result selected: {}", item.title);
            HookOutcome::handled()
        })]
    }
}

#[derive(Debug, Error, PartialEq)]
enum EvalError {
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),

    #[error("malformed number '{0}'")]
    BadNumber(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("unbalanced parentheses")]
    UnbalancedParens,

    #[error("incomplete expression")]
    Incomplete,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    Open,
    Close,
}

fn tokenize(input: &str) -> Result<Vec<Token>, EvalError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&ch) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '0'..='9' | '.' => {
                let mut literal = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' {
                        literal.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| EvalError::BadNumber(literal.clone()))?;
                tokens.push(Token::Number(value));
            }
            '+' => {
                tokens.push(Token::Plus);
                chars.next();
            }
            '-' | '−' => {
                tokens.push(Token::Minus);
                chars.next();
            }
            '*' | '×' => {
                tokens.push(Token::Star);
                chars.next();
            }
            '/' | '÷' => {
                tokens.push(Token::Slash);
                chars.next();
            }
            '(' => {
                tokens.push(Token::Open);
                chars.next();
            }
            ')' => {
                tokens.push(Token::Close);
                chars.next();
            }
            other => return Err(EvalError::UnexpectedChar(other)),
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expression(&mut self) -> Result<f64, EvalError> {
        let mut value = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    value += self.term()?;
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    value -= self.term()?;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, EvalError> {
        let mut value = self.factor()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    value *= self.factor()?;
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    let divisor = self.factor()?;
                    if divisor == 0.0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    value /= divisor;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    fn factor(&mut self) -> Result<f64, EvalError> {
        match self.advance() {
            Some(Token::Number(value)) => Ok(value),
            Some(Token::Minus) => Ok(-self.factor()?),
            Some(Token::Plus) => self.factor(),
            Some(Token::Open) => {
                let value = self.expression()?;
                match self.advance() {
                    Some(Token::Close) => Ok(value),
                    _ => Err(EvalError::UnbalancedParens),
                }
            }
            _ => Err(EvalError::Incomplete),
        }
    }
}

fn evaluate(input: &str) -> Result<f64, EvalError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(EvalError::Incomplete);
    }

    let mut parser = Parser { tokens, pos: 0 };
    let value = parser.expression()?;
    if parser.pos != parser.tokens.len() {
        return Err(EvalError::UnbalancedParens);
    }
    Ok(value)
}

/// Round away float noise, then drop the fraction when it is whole.
fn format_value(value: f64) -> String {
    let rounded = (value * 1e10).round() / 1e10;
    if rounded.fract() == 0.0 && rounded.abs() < 1e15 {
        format!("{}", rounded as i64)
    } else {
        format!("{rounded}")
    }
}
