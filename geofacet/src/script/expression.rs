//! Built-in `expression` script language.
//!
//! Evaluates arithmetic like `doc.price * factor + 1` or `log(doc.likes + 1)`.
//!
//! Supported tokens:
//! - `doc.NAME`: first value of numeric field `NAME` in the bound segment (0.0 when absent)
//! - other identifiers: request parameters
//! - Numeric literals (integer and float)
//! - Operators: `+`, `-`, `*`, `/` (division by zero yields 0.0)
//! - `log(expr)`, `sqrt(expr)`, `abs(expr)`
//! - Parentheses for grouping

use super::{CompiledScript, ScriptEngine, ScriptParams, SegmentScript};
use crate::error::{Error, Result};
use crate::field::{DocId, NumericFieldData, SegmentContext};
use serde_json::Value;
use std::sync::Arc;

const FIELD_PREFIX: &str = "doc.";

pub struct ExpressionEngine;

impl ScriptEngine for ExpressionEngine {
    fn lang(&self) -> &str {
        super::DEFAULT_LANG
    }

    fn compile(&self, source: &str) -> Result<Arc<dyn CompiledScript>> {
        Ok(Arc::new(Expression::parse(source)?))
    }
}

/// A parsed expression; field references are resolved per segment.
#[derive(Debug)]
pub struct Expression {
    source: String,
    root: Expr,
    fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Number(f64),
    /// Index into the expression's field list
    Field(usize),
    Param(String),
    Neg(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Call(Func, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Func {
    Log,
    Sqrt,
    Abs,
}

impl Func {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "log" => Some(Func::Log),
            "sqrt" => Some(Func::Sqrt),
            "abs" => Some(Func::Abs),
            _ => None,
        }
    }

    fn apply(self, x: f64) -> f64 {
        match self {
            Func::Log => x.ln(),
            Func::Sqrt => x.sqrt(),
            Func::Abs => x.abs(),
        }
    }
}

impl Expression {
    pub fn parse(source: &str) -> Result<Self> {
        let tokens = tokenize(source)?;
        let mut parser = ExprParser {
            tokens: &tokens,
            pos: 0,
            fields: Vec::new(),
        };
        let root = parser.parse_expr()?;
        if let Some(tok) = parser.peek() {
            return Err(Error::Script(format!(
                "unexpected trailing token {:?} in '{}'",
                tok, source
            )));
        }
        Ok(Self {
            source: source.to_string(),
            root,
            fields: parser.fields,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Field names read through `doc.NAME`, in first-use order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }
}

impl CompiledScript for Expression {
    fn bind(&self, segment: &SegmentContext<'_>) -> Result<Box<dyn SegmentScript>> {
        let columns = self
            .fields
            .iter()
            .map(|name| segment.reader.numeric_field(name))
            .collect::<Result<Vec<_>>>()?;
        Ok(Box::new(BoundExpression {
            root: self.root.clone(),
            columns,
        }))
    }
}

struct BoundExpression {
    root: Expr,
    columns: Vec<Option<Box<dyn NumericFieldData>>>,
}

impl SegmentScript for BoundExpression {
    fn execute(&self, doc: DocId, params: &ScriptParams) -> Result<Value> {
        // a bare parameter is returned untouched, whatever its type
        if let Expr::Param(name) = &self.root {
            return params
                .get(name)
                .cloned()
                .ok_or_else(|| Error::Script(format!("unknown param '{}'", name)));
        }
        let value = self.eval(&self.root, doc, params)?;
        Ok(Value::from(value))
    }
}

impl BoundExpression {
    fn eval(&self, expr: &Expr, doc: DocId, params: &ScriptParams) -> Result<f64> {
        match expr {
            Expr::Number(n) => Ok(*n),
            Expr::Field(slot) => Ok(match &self.columns[*slot] {
                Some(column) if column.has_value(doc) => column.value(doc),
                _ => 0.0,
            }),
            Expr::Param(name) => match params.get(name) {
                Some(value) => value.as_f64().ok_or_else(|| {
                    Error::Script(format!("param '{}' is not numeric: {}", name, value))
                }),
                None => Err(Error::Script(format!("unknown param '{}'", name))),
            },
            Expr::Neg(inner) => Ok(-self.eval(inner, doc, params)?),
            Expr::Binary(op, left, right) => {
                let l = self.eval(left, doc, params)?;
                let r = self.eval(right, doc, params)?;
                Ok(match op {
                    BinOp::Add => l + r,
                    BinOp::Sub => l - r,
                    BinOp::Mul => l * r,
                    BinOp::Div => {
                        if r == 0.0 {
                            0.0
                        } else {
                            l / r
                        }
                    }
                })
            }
            Expr::Call(func, arg) => Ok(func.apply(self.eval(arg, doc, params)?)),
        }
    }
}

// ============================================================================
// Tokenizer
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn tokenize(expr: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = expr.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        match ch {
            ' ' | '\t' | '\n' | '\r' => {
                i += 1;
            }
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
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let num_str: String = chars[start..i].iter().collect();
                let num: f64 = num_str
                    .parse()
                    .map_err(|_| Error::Script(format!("invalid number: {}", num_str)))?;
                tokens.push(Token::Number(num));
            }
            'a'..='z' | 'A'..='Z' | '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '.')
                {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            _ => {
                return Err(Error::Script(format!(
                    "unexpected character '{}' in expression",
                    ch
                )));
            }
        }
    }

    Ok(tokens)
}

// ============================================================================
// Recursive descent parser
// ============================================================================

struct ExprParser<'a> {
    tokens: &'a [Token],
    pos: usize,
    fields: Vec<String>,
}

impl<'a> ExprParser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let tok = self.tokens.get(self.pos);
        self.pos += 1;
        tok
    }

    fn field_slot(&mut self, name: &str) -> usize {
        match self.fields.iter().position(|f| f == name) {
            Some(slot) => slot,
            None => {
                self.fields.push(name.to_string());
                self.fields.len() - 1
            }
        }
    }

    // expr = term (('+' | '-') term)*
    fn parse_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    // term = unary (('*' | '/') unary)*
    fn parse_term(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    // unary = '-' unary | factor
    fn parse_unary(&mut self) -> Result<Expr> {
        if let Some(Token::Minus) = self.peek() {
            self.advance();
            return Ok(match self.parse_unary()? {
                Expr::Number(n) => Expr::Number(-n),
                inner => Expr::Neg(Box::new(inner)),
            });
        }
        self.parse_factor()
    }

    // factor = number | ident | func '(' expr ')' | '(' expr ')'
    fn parse_factor(&mut self) -> Result<Expr> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expr::Number(*n)),
            Some(Token::Ident(name)) => {
                if let Some(Token::LParen) = self.peek() {
                    let func = Func::from_name(name)
                        .ok_or_else(|| Error::Script(format!("unknown function: {}", name)))?;
                    self.advance();
                    let arg = self.parse_expr()?;
                    self.expect_rparen()?;
                    return Ok(Expr::Call(func, Box::new(arg)));
                }
                match name.strip_prefix(FIELD_PREFIX) {
                    Some("") => Err(Error::Script("empty field name after 'doc.'".to_string())),
                    Some(field) => Ok(Expr::Field(self.field_slot(field))),
                    None => Ok(Expr::Param(name.clone())),
                }
            }
            Some(Token::LParen) => {
                let inner = self.parse_expr()?;
                self.expect_rparen()?;
                Ok(inner)
            }
            other => Err(Error::Script(format!("unexpected token: {:?}", other))),
        }
    }

    fn expect_rparen(&mut self) -> Result<()> {
        match self.advance() {
            Some(Token::RParen) => Ok(()),
            other => Err(Error::Script(format!("expected ')', found {:?}", other))),
        }
    }
}

impl std::fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Expression({})", self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{MemoryColumn, MemorySegment};
    use serde_json::json;

    fn segment() -> MemorySegment {
        MemorySegment::new(2)
            .with_column("popularity", MemoryColumn::from_values(vec![vec![10.0], vec![]]))
            .with_column("likes", MemoryColumn::from_values(vec![vec![99.0], vec![4.0, 5.0]]))
    }

    fn run(source: &str, doc: DocId, params: ScriptParams) -> Result<Value> {
        let segment = segment();
        let ctx = SegmentContext::new(0, 0, &segment);
        let script = ExpressionEngine.compile(source)?;
        let bound = script.bind(&ctx)?;
        bound.execute(doc, &params)
    }

    fn eval(source: &str, doc: DocId) -> f64 {
        run(source, doc, ScriptParams::new()).unwrap().as_f64().unwrap()
    }

    #[test]
    fn test_literal_arithmetic() {
        assert!((eval("1 + 2 * 3", 0) - 7.0).abs() < 1e-12);
        assert!((eval("(1 + 2) * 3", 0) - 9.0).abs() < 1e-12);
        assert!((eval("6 / 2 - 0.5", 0) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_field_access() {
        assert!((eval("doc.popularity * 0.5", 0) - 5.0).abs() < 1e-12);
        // first value of a multi-valued field
        assert!((eval("doc.likes", 1) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_missing_field_defaults_to_zero() {
        assert!((eval("doc.popularity + 1", 1) - 1.0).abs() < 1e-12);
        assert!((eval("doc.unknown + 2", 0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_functions() {
        assert!((eval("log(doc.likes + 1)", 0) - 100f64.ln()).abs() < 1e-12);
        assert!((eval("sqrt(16)", 0) - 4.0).abs() < 1e-12);
        assert!((eval("abs(-3)", 0) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_negation() {
        assert!((eval("-doc.popularity", 0) + 10.0).abs() < 1e-12);
        assert!((eval("5 + -1", 0) - 4.0).abs() < 1e-12);
        assert!((eval("2 - -2", 0) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(eval("doc.popularity / 0", 0), 0.0);
    }

    #[test]
    fn test_params() {
        let params = ScriptParams::from([("factor".to_string(), json!(3))]);
        let value = run("doc.popularity * factor", 0, params).unwrap();
        assert_eq!(value.as_f64(), Some(30.0));
    }

    #[test]
    fn test_bare_param_returned_as_is() {
        let params = ScriptParams::from([("label".to_string(), json!("far"))]);
        assert_eq!(run("label", 0, params).unwrap(), json!("far"));
    }

    #[test]
    fn test_non_numeric_param_in_arithmetic() {
        let params = ScriptParams::from([("label".to_string(), json!("far"))]);
        assert!(matches!(run("label + 1", 0, params), Err(Error::Script(_))));
    }

    #[test]
    fn test_unknown_param() {
        assert!(matches!(
            run("factor * 2", 0, ScriptParams::new()),
            Err(Error::Script(_))
        ));
    }

    #[test]
    fn test_non_finite_result_is_null() {
        assert_eq!(run("log(0)", 0, ScriptParams::new()).unwrap(), Value::Null);
    }

    #[test]
    fn test_parse_errors() {
        assert!(Expression::parse("1 +").is_err());
        assert!(Expression::parse("(1 + 2").is_err());
        assert!(Expression::parse("1 2").is_err());
        assert!(Expression::parse("pow(2)").is_err());
        assert!(Expression::parse("doc.").is_err());
        assert!(Expression::parse("1 % 2").is_err());
    }

    #[test]
    fn test_fields_collected_once() {
        let expr = Expression::parse("doc.a + doc.b * doc.a").unwrap();
        assert_eq!(expr.fields(), &["a".to_string(), "b".to_string()]);
        assert_eq!(expr.source(), "doc.a + doc.b * doc.a");
    }
}
