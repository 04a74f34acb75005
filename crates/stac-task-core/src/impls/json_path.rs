//! JsonPathMatcher - JSONPath 風の式で item をマッチ
//!
//! Grammar:
//!
//! ```text
//! expr       := or
//! or         := and ('||' and)*
//! and        := unary ('&&' unary)*
//! unary      := '!' unary | '(' expr ')' | comparison
//! comparison := operand (('==' | '!=' | '=~' | '<' | '<=' | '>' | '>=') operand)?
//! operand    := path | 'string' | "string" | number | true | false | null
//! path       := ('$' | '@') ('.' name | '[' 'key' ']' | '[' index ']')*
//! ```
//!
//! A filter wrapper `$[?(...)]` is accepted too. A bare operand matches when
//! it resolves to something other than `null` or `false`. Missing paths
//! resolve to `null`.

use std::cmp::Ordering;

use regex::Regex;
use serde_json::{Map, Value};

use crate::domain::errors::StacTaskError;
use crate::ports::{ItemPredicate, PathMatcher};

static NULL: Value = Value::Null;

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonPathMatcher;

impl JsonPathMatcher {
    pub fn new() -> Self {
        Self
    }
}

impl PathMatcher for JsonPathMatcher {
    fn compile(&self, expression: &str) -> Result<Box<dyn ItemPredicate>, StacTaskError> {
        Ok(Box::new(Filter::parse(expression)?))
    }
}

/// A parsed expression, reusable across items.
#[derive(Debug)]
pub struct Filter {
    expr: Expr,
}

impl Filter {
    pub fn parse(expression: &str) -> Result<Self, StacTaskError> {
        let trimmed = expression.trim();
        let body = trimmed
            .strip_prefix("$[?(")
            .and_then(|rest| rest.strip_suffix(")]"))
            .unwrap_or(trimmed);
        let tokens = tokenize(body).map_err(|message| invalid(expression, message))?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.parse_or().map_err(|message| invalid(expression, message))?;
        if parser.pos != parser.tokens.len() {
            return Err(invalid(expression, "unexpected trailing input".to_string()));
        }
        Ok(Self { expr })
    }

    pub fn matches(&self, item: &Map<String, Value>) -> bool {
        self.expr.eval(item)
    }
}

impl ItemPredicate for Filter {
    fn matches(&self, item: &Map<String, Value>) -> bool {
        Filter::matches(self, item)
    }
}

fn invalid(expression: &str, message: String) -> StacTaskError {
    StacTaskError::Configuration(format!("invalid path expression {expression:?}: {message}"))
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Key(String),
    Index(usize),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Regex,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Path(Vec<Segment>),
    Literal(Value),
    Cmp(CmpOp),
    And,
    Or,
    Not,
    LParen,
    RParen,
}

#[derive(Debug)]
enum Operand {
    Path(Vec<Segment>),
    Literal(Value),
}

#[derive(Debug)]
enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Compare(Operand, CmpOp, Operand),
    Matches(Operand, Regex),
    Truthy(Operand),
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | ':')
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match c {
            c if c.is_whitespace() => i += 1,
            '$' | '@' => {
                let (segments, end) = read_path(&chars, i + 1)?;
                tokens.push(Token::Path(segments));
                i = end;
            }
            '\'' | '"' => {
                let (s, end) = read_quoted(&chars, i)?;
                tokens.push(Token::Literal(Value::String(s)));
                i = end;
            }
            '=' if next == Some('=') => {
                tokens.push(Token::Cmp(CmpOp::Eq));
                i += 2;
            }
            '=' if next == Some('~') => {
                tokens.push(Token::Cmp(CmpOp::Regex));
                i += 2;
            }
            '!' if next == Some('=') => {
                tokens.push(Token::Cmp(CmpOp::Ne));
                i += 2;
            }
            '!' => {
                tokens.push(Token::Not);
                i += 1;
            }
            '<' | '>' => {
                let op = match (c, next == Some('=')) {
                    ('<', true) => CmpOp::Le,
                    ('<', false) => CmpOp::Lt,
                    (_, true) => CmpOp::Ge,
                    (_, false) => CmpOp::Gt,
                };
                tokens.push(Token::Cmp(op));
                i += if next == Some('=') { 2 } else { 1 };
            }
            '&' if next == Some('&') => {
                tokens.push(Token::And);
                i += 2;
            }
            '|' if next == Some('|') => {
                tokens.push(Token::Or);
                i += 2;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            c if c == '-' || c.is_ascii_digit() => {
                let start = i;
                i += 1;
                while i < chars.len() && (chars[i].is_ascii_digit() || matches!(chars[i], '.' | 'e' | 'E' | '+' | '-')) {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let value: Value = serde_json::from_str(&text).map_err(|_| format!("invalid number {text}"))?;
                tokens.push(Token::Literal(value));
            }
            c if c.is_alphabetic() => {
                let start = i;
                while i < chars.len() && chars[i].is_alphanumeric() {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                let value = match word.as_str() {
                    "true" => Value::Bool(true),
                    "false" => Value::Bool(false),
                    "null" => Value::Null,
                    _ => return Err(format!("unknown keyword {word}")),
                };
                tokens.push(Token::Literal(value));
            }
            other => return Err(format!("unexpected character {other:?}")),
        }
    }
    Ok(tokens)
}

fn read_path(chars: &[char], mut i: usize) -> Result<(Vec<Segment>, usize), String> {
    let mut segments = Vec::new();
    loop {
        match chars.get(i) {
            Some('.') => {
                let start = i + 1;
                i = start;
                while i < chars.len() && is_name_char(chars[i]) {
                    i += 1;
                }
                if i == start {
                    return Err("empty path segment".to_string());
                }
                segments.push(Segment::Key(chars[start..i].iter().collect()));
            }
            Some('[') => match chars.get(i + 1) {
                Some('\'') | Some('"') => {
                    let (key, end) = read_quoted(chars, i + 1)?;
                    if chars.get(end) != Some(&']') {
                        return Err("expected ']'".to_string());
                    }
                    segments.push(Segment::Key(key));
                    i = end + 1;
                }
                _ => {
                    let start = i + 1;
                    let mut end = start;
                    while end < chars.len() && chars[end].is_ascii_digit() {
                        end += 1;
                    }
                    if end == start || chars.get(end) != Some(&']') {
                        return Err("expected an index or a quoted key".to_string());
                    }
                    let text: String = chars[start..end].iter().collect();
                    let index = text.parse().map_err(|_| format!("invalid index {text}"))?;
                    segments.push(Segment::Index(index));
                    i = end + 1;
                }
            },
            _ => return Ok((segments, i)),
        }
    }
}

fn read_quoted(chars: &[char], start: usize) -> Result<(String, usize), String> {
    let quote = chars[start];
    let mut out = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' if i + 1 < chars.len() => {
                out.push(chars[i + 1]);
                i += 2;
            }
            c if c == quote => return Ok((out, i + 1)),
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    Err("unterminated string".to_string())
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
        self.pos += 1;
        token
    }

    fn parse_or(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_unary()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let right = self.parse_unary()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, String> {
        match self.peek() {
            Some(Token::Not) => {
                self.pos += 1;
                Ok(Expr::Not(Box::new(self.parse_unary()?)))
            }
            Some(Token::LParen) => {
                self.pos += 1;
                let inner = self.parse_or()?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err("expected ')'".to_string()),
                }
            }
            _ => self.parse_comparison(),
        }
    }

    fn parse_operand(&mut self) -> Result<Operand, String> {
        match self.next() {
            Some(Token::Path(segments)) => Ok(Operand::Path(segments)),
            Some(Token::Literal(value)) => Ok(Operand::Literal(value)),
            Some(other) => Err(format!("expected a path or a literal, found {other:?}")),
            None => Err("unexpected end of expression".to_string()),
        }
    }

    fn parse_comparison(&mut self) -> Result<Expr, String> {
        let left = self.parse_operand()?;
        let op = match self.peek() {
            Some(Token::Cmp(op)) => *op,
            _ => return Ok(Expr::Truthy(left)),
        };
        self.pos += 1;
        let right = self.parse_operand()?;
        if op == CmpOp::Regex {
            let Operand::Literal(Value::String(pattern)) = right else {
                return Err("=~ expects a string pattern".to_string());
            };
            let regex = Regex::new(&pattern).map_err(|e| e.to_string())?;
            return Ok(Expr::Matches(left, regex));
        }
        Ok(Expr::Compare(left, op, right))
    }
}

/// What an operand points at. `$` alone is the item object itself.
enum Resolved<'a> {
    Root,
    Value(&'a Value),
}

impl Operand {
    fn resolve<'a>(&'a self, item: &'a Map<String, Value>) -> Resolved<'a> {
        match self {
            Operand::Literal(value) => Resolved::Value(value),
            Operand::Path(segments) => {
                let Some((first, rest)) = segments.split_first() else {
                    return Resolved::Root;
                };
                let mut current = match first {
                    Segment::Key(key) => item.get(key.as_str()),
                    Segment::Index(_) => None,
                };
                for segment in rest {
                    current = current.and_then(|value| match segment {
                        Segment::Key(key) => value.get(key.as_str()),
                        Segment::Index(index) => value.get(*index),
                    });
                }
                Resolved::Value(current.unwrap_or(&NULL))
            }
        }
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => compare(a, b) == Some(Ordering::Equal),
        _ => a == b,
    }
}

impl CmpOp {
    fn apply(self, a: &Value, b: &Value) -> bool {
        match self {
            CmpOp::Eq => equal(a, b),
            CmpOp::Ne => !equal(a, b),
            CmpOp::Lt => compare(a, b) == Some(Ordering::Less),
            CmpOp::Le => matches!(compare(a, b), Some(Ordering::Less | Ordering::Equal)),
            CmpOp::Gt => compare(a, b) == Some(Ordering::Greater),
            CmpOp::Ge => matches!(compare(a, b), Some(Ordering::Greater | Ordering::Equal)),
            CmpOp::Regex => false,
        }
    }
}

impl Expr {
    fn eval(&self, item: &Map<String, Value>) -> bool {
        match self {
            Expr::Or(a, b) => a.eval(item) || b.eval(item),
            Expr::And(a, b) => a.eval(item) && b.eval(item),
            Expr::Not(inner) => !inner.eval(item),
            Expr::Truthy(operand) => match operand.resolve(item) {
                Resolved::Root => true,
                Resolved::Value(value) => !matches!(value, Value::Null | Value::Bool(false)),
            },
            Expr::Matches(operand, regex) => match operand.resolve(item) {
                Resolved::Value(Value::String(s)) => regex.is_match(s),
                _ => false,
            },
            Expr::Compare(left, op, right) => match (left.resolve(item), right.resolve(item)) {
                (Resolved::Value(a), Resolved::Value(b)) => op.apply(a, b),
                // the item object only equals itself
                (Resolved::Root, Resolved::Root) => matches!(op, CmpOp::Eq | CmpOp::Le | CmpOp::Ge),
                _ => *op == CmpOp::Ne,
            },
        }
    }
}
