// loyalty-core/src/rules/formula.rs
//
// Arithmetic formula engine for admin-configured reward expressions, e.g.
// "transactionAmount * multiplier" or "0.05 * transactionAmount + value".
// Expressions are evaluated over named f64 variables; comparisons and the
// logical operators yield 1.0 / 0.0 so a formula can gate its own reward
// ("(transactionAmount >= 1000) * transactionAmount * multiplier").

use std::collections::HashMap;
use std::fmt;

use loyalty_common::error::Error;
use thiserror::Error as ThisError;

#[derive(Debug, Clone, PartialEq, ThisError)]
pub enum FormulaError {
    #[error("unexpected character '{0}' at byte {1}")]
    UnexpectedChar(char, usize),

    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),

    #[error("formula ended unexpectedly")]
    UnexpectedEnd,

    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("formula result is not a finite number")]
    NonFinite,
}

impl From<FormulaError> for Error {
    fn from(e: FormulaError) -> Self {
        Error::Formula(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    NotEq,
    AndAnd,
    OrOr,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{n}"),
            Token::Ident(s) => write!(f, "{s}"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Caret => write!(f, "^"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Lt => write!(f, "<"),
            Token::Le => write!(f, "<="),
            Token::Gt => write!(f, ">"),
            Token::Ge => write!(f, ">="),
            Token::EqEq => write!(f, "=="),
            Token::NotEq => write!(f, "!="),
            Token::AndAnd => write!(f, "&&"),
            Token::OrOr => write!(f, "||"),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, FormulaError> {
    let mut tokens = Vec::new();
    let bytes = input.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;
        match c {
            ' ' | '\t' | '\r' | '\n' => i += 1,
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
            '^' => {
                tokens.push(Token::Caret);
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
                    return Err(FormulaError::UnexpectedChar('=', i));
                }
            }
            '!' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Token::NotEq);
                    i += 2;
                } else {
                    return Err(FormulaError::UnexpectedChar('!', i));
                }
            }
            '&' => {
                if bytes.get(i + 1) == Some(&b'&') {
                    tokens.push(Token::AndAnd);
                    i += 2;
                } else {
                    return Err(FormulaError::UnexpectedChar('&', i));
                }
            }
            '|' => {
                if bytes.get(i + 1) == Some(&b'|') {
                    tokens.push(Token::OrOr);
                    i += 2;
                } else {
                    return Err(FormulaError::UnexpectedChar('|', i));
                }
            }
            '0'..='9' | '.' => {
                let start = i;
                let mut seen_dot = false;
                while i < bytes.len() {
                    match bytes[i] as char {
                        '0'..='9' => i += 1,
                        '.' if !seen_dot => {
                            seen_dot = true;
                            i += 1;
                        }
                        _ => break,
                    }
                }
                let text = &input[start..i];
                let n: f64 = text
                    .parse()
                    .map_err(|_| FormulaError::UnexpectedToken(text.to_string()))?;
                tokens.push(Token::Number(n));
            }
            'a'..='z' | 'A'..='Z' | '_' => {
                let start = i;
                while i < bytes.len() {
                    match bytes[i] as char {
                        'a'..='z' | 'A'..='Z' | '0'..='9' | '_' => i += 1,
                        _ => break,
                    }
                }
                tokens.push(Token::Ident(input[start..i].to_string()));
            }
            other => return Err(FormulaError::UnexpectedChar(other, i)),
        }
    }

    Ok(tokens)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Number(f64),
    Var(String),
    Neg(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
}

/// A parsed formula, reusable across evaluations.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    root: Expr,
}

impl Formula {
    pub fn parse(input: &str) -> Result<Self, FormulaError> {
        let tokens = tokenize(input)?;
        let mut parser = Parser { tokens, pos: 0 };
        let root = parser.parse_expr(0)?;
        if parser.pos != parser.tokens.len() {
            return Err(FormulaError::UnexpectedToken(
                parser.tokens[parser.pos].to_string(),
            ));
        }
        Ok(Self { root })
    }

    /// Every variable name the formula references, in first-seen order.
    pub fn variables(&self) -> Vec<&str> {
        let mut out = Vec::new();
        collect_vars(&self.root, &mut out);
        out
    }

    /// Evaluate against a variable binding. Deterministic and side-effect
    /// free; an identifier missing from `scope` is a hard error.
    pub fn eval(&self, scope: &HashMap<String, f64>) -> Result<f64, FormulaError> {
        let result = eval_expr(&self.root, scope)?;
        if !result.is_finite() {
            return Err(FormulaError::NonFinite);
        }
        Ok(result)
    }
}

fn collect_vars<'a>(expr: &'a Expr, out: &mut Vec<&'a str>) {
    match expr {
        Expr::Number(_) => {}
        Expr::Var(name) => {
            if !out.contains(&name.as_str()) {
                out.push(name);
            }
        }
        Expr::Neg(inner) => collect_vars(inner, out),
        Expr::Binary(_, lhs, rhs) => {
            collect_vars(lhs, out);
            collect_vars(rhs, out);
        }
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

/// Binding power of a binary operator, higher binds tighter. `^` is the only
/// right-associative operator.
fn binop_for(token: &Token) -> Option<(BinOp, u8, bool)> {
    let op = match token {
        Token::OrOr => (BinOp::Or, 1, false),
        Token::AndAnd => (BinOp::And, 2, false),
        Token::EqEq => (BinOp::Eq, 3, false),
        Token::NotEq => (BinOp::Ne, 3, false),
        Token::Lt => (BinOp::Lt, 4, false),
        Token::Le => (BinOp::Le, 4, false),
        Token::Gt => (BinOp::Gt, 4, false),
        Token::Ge => (BinOp::Ge, 4, false),
        Token::Plus => (BinOp::Add, 5, false),
        Token::Minus => (BinOp::Sub, 5, false),
        Token::Star => (BinOp::Mul, 6, false),
        Token::Slash => (BinOp::Div, 6, false),
        Token::Caret => (BinOp::Pow, 7, true),
        _ => return None,
    };
    Some(op)
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Result<Token, FormulaError> {
        let t = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or(FormulaError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(t)
    }

    // Precedence climbing.
    fn parse_expr(&mut self, min_bp: u8) -> Result<Expr, FormulaError> {
        let mut lhs = self.parse_unary()?;

        while let Some(token) = self.peek() {
            let Some((op, bp, right_assoc)) = binop_for(token) else {
                break;
            };
            if bp < min_bp {
                break;
            }
            self.pos += 1;
            let next_bp = if right_assoc { bp } else { bp + 1 };
            let rhs = self.parse_expr(next_bp)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }

        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, FormulaError> {
        if self.peek() == Some(&Token::Minus) {
            self.pos += 1;
            let inner = self.parse_unary()?;
            return Ok(Expr::Neg(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, FormulaError> {
        match self.next()? {
            Token::Number(n) => Ok(Expr::Number(n)),
            Token::Ident(name) => Ok(Expr::Var(name)),
            Token::LParen => {
                let inner = self.parse_expr(0)?;
                match self.next()? {
                    Token::RParen => Ok(inner),
                    other => Err(FormulaError::UnexpectedToken(other.to_string())),
                }
            }
            other => Err(FormulaError::UnexpectedToken(other.to_string())),
        }
    }
}

fn truthy(v: f64) -> bool {
    v != 0.0
}

fn bool_to_f64(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

fn eval_expr(expr: &Expr, scope: &HashMap<String, f64>) -> Result<f64, FormulaError> {
    match expr {
        Expr::Number(n) => Ok(*n),
        Expr::Var(name) => scope
            .get(name)
            .copied()
            .ok_or_else(|| FormulaError::UnknownVariable(name.clone())),
        Expr::Neg(inner) => Ok(-eval_expr(inner, scope)?),
        Expr::Binary(op, lhs, rhs) => {
            let l = eval_expr(lhs, scope)?;
            let r = eval_expr(rhs, scope)?;
            let v = match op {
                BinOp::Add => l + r,
                BinOp::Sub => l - r,
                BinOp::Mul => l * r,
                BinOp::Div => {
                    if r == 0.0 {
                        return Err(FormulaError::DivisionByZero);
                    }
                    l / r
                }
                BinOp::Pow => l.powf(r),
                BinOp::Lt => bool_to_f64(l < r),
                BinOp::Le => bool_to_f64(l <= r),
                BinOp::Gt => bool_to_f64(l > r),
                BinOp::Ge => bool_to_f64(l >= r),
                BinOp::Eq => bool_to_f64(l == r),
                BinOp::Ne => bool_to_f64(l != r),
                BinOp::And => bool_to_f64(truthy(l) && truthy(r)),
                BinOp::Or => bool_to_f64(truthy(l) || truthy(r)),
            };
            Ok(v)
        }
    }
}
