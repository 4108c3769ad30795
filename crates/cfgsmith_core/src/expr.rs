//! Embedded expressions in token values.
//!
//! A token value containing `<?= expr ?>` (or the older `<?php expr ?>`
//! spelling) is replaced as a whole by the result of `expr`. The language is
//! closed: literals and operators only, no names, no I/O.
//! Expressions deeper than [`MAX_DEPTH`] or longer than [`MAX_TOKENS`] are
//! rejected.
//!
//! ```text
//! ternary  := or ( "?" ternary ":" ternary )?
//! or       := and ( "||" and )*
//! and      := equality ( "&&" equality )*
//! equality := compare ( ( "==" | "!=" ) compare )*
//! compare  := additive ( ( "<" | "<=" | ">" | ">=" ) additive )*
//! additive := term ( ( "+" | "-" | "." ) term )*
//! term     := unary ( ( "*" | "/" | "%" ) unary )*
//! unary    := ( "-" | "!" ) unary | primary
//! primary  := number | string | "true" | "false" | "(" ternary ")"
//! ```

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::error::{CoreError, CoreResult};

fn delimiter_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)<\?(?:=|php\s)\s*(.*)\?>").expect("expression pattern is valid")
    })
}

/// Evaluate `value` if it embeds an expression, otherwise return it verbatim.
pub fn resolve_value(token: &str, value: &str) -> CoreResult<String> {
    let Some(caps) = delimiter_pattern().captures(value) else {
        return Ok(value.to_string());
    };

    let result = evaluate(&caps[1]).map_err(|message| CoreError::Expression {
        token: token.to_string(),
        message,
    })?;
    debug!("Evaluated expression in {}: {}", token, result);
    Ok(result.to_string())
}

/// Deepest nesting of parentheses, unary operators and ternaries.
pub const MAX_DEPTH: usize = 64;

/// Longest expression accepted, in lexed tokens.
pub const MAX_TOKENS: usize = 1024;

/// Evaluate a bare expression.
pub fn evaluate(source: &str) -> Result<Value, String> {
    let tokens = lex(source)?;
    if tokens.len() > MAX_TOKENS {
        return Err(format!("expression is longer than {} tokens", MAX_TOKENS));
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.ternary()?;
    if let Some(tok) = parser.peek() {
        return Err(format!("unexpected {} after expression", tok));
    }
    expr.eval()
}

/// Result of an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => f.write_str(s),
            Value::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl Value {
    fn truthy(&self) -> bool {
        match self {
            Value::Int(i) => *i != 0,
            Value::Float(x) => *x != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Bool(b) => *b,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::Float(_) => "number",
            Value::Str(_) => "string",
            Value::Bool(_) => "boolean",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    Op(&'static str),
}

impl fmt::Display for Tok {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tok::Int(i) => write!(f, "`{}`", i),
            Tok::Float(x) => write!(f, "`{}`", x),
            Tok::Str(s) => write!(f, "string {:?}", s),
            Tok::Ident(s) => write!(f, "`{}`", s),
            Tok::Op(op) => write!(f, "`{}`", op),
        }
    }
}

// Longest operators first so `<=` wins over `<`.
const OPERATORS: &[&str] = &[
    "==", "!=", "<=", ">=", "&&", "||", "<", ">", "!", "+", "-", "*", "/", "%", ".", "?", ":",
    "(", ")",
];

fn lex(source: &str) -> Result<Vec<Tok>, String> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c.is_ascii_digit() {
            let mut end = start;
            let mut is_float = false;
            while let Some(&(i, d)) = chars.peek() {
                if d.is_ascii_digit() {
                    end = i + 1;
                    chars.next();
                } else if d == '.'
                    && !is_float
                    && source[i + 1..].starts_with(|n: char| n.is_ascii_digit())
                {
                    is_float = true;
                    end = i + 1;
                    chars.next();
                } else {
                    break;
                }
            }
            let text = &source[start..end];
            let tok = if is_float {
                Tok::Float(text.parse().map_err(|_| format!("invalid number `{}`", text))?)
            } else {
                Tok::Int(text.parse().map_err(|_| format!("integer `{}` is too large", text))?)
            };
            tokens.push(tok);
        } else if c == '\'' || c == '"' {
            chars.next();
            let mut s = String::new();
            let mut closed = false;
            while let Some((_, ch)) = chars.next() {
                match ch {
                    '\\' => match chars.next() {
                        Some((_, 'n')) => s.push('\n'),
                        Some((_, 't')) => s.push('\t'),
                        Some((_, other)) => s.push(other),
                        None => break,
                    },
                    _ if ch == c => {
                        closed = true;
                        break;
                    }
                    _ => s.push(ch),
                }
            }
            if !closed {
                return Err("unterminated string literal".to_string());
            }
            tokens.push(Tok::Str(s));
        } else if c.is_alphabetic() || c == '_' {
            let mut ident = String::new();
            while let Some(&(_, ch)) = chars.peek() {
                if ch.is_alphanumeric() || ch == '_' {
                    ident.push(ch);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Tok::Ident(ident));
        } else {
            let op = OPERATORS
                .iter()
                .find(|op| source[start..].starts_with(*op))
                .ok_or_else(|| format!("unexpected character `{}`", c))?;
            for _ in 0..op.len() {
                chars.next();
            }
            tokens.push(Tok::Op(*op));
        }
    }

    Ok(tokens)
}

#[derive(Debug)]
enum Expr {
    Lit(Value),
    Unary(&'static str, Box<Expr>),
    Binary(&'static str, Box<Expr>, Box<Expr>),
    Cond(Box<Expr>, Box<Expr>, Box<Expr>),
}

struct Parser {
    tokens: Vec<Tok>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos)
    }

    fn eat(&mut self, ops: &[&'static str]) -> Option<&'static str> {
        match self.peek() {
            Some(Tok::Op(op)) if ops.contains(op) => {
                let op = *op;
                self.pos += 1;
                Some(op)
            }
            _ => None,
        }
    }

    fn expect(&mut self, op: &'static str) -> Result<(), String> {
        match self.eat(&[op]) {
            Some(_) => Ok(()),
            None => Err(match self.peek() {
                Some(tok) => format!("expected `{}`, found {}", op, tok),
                None => format!("expected `{}` at end of expression", op),
            }),
        }
    }

    // Run `f` one nesting level deeper.
    fn nested(&mut self, f: fn(&mut Self) -> Result<Expr, String>) -> Result<Expr, String> {
        if self.depth >= MAX_DEPTH {
            return Err(format!("expression nested deeper than {} levels", MAX_DEPTH));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn binary_level(
        &mut self,
        ops: &[&'static str],
        next: fn(&mut Self) -> Result<Expr, String>,
    ) -> Result<Expr, String> {
        let mut lhs = next(self)?;
        while let Some(op) = self.eat(ops) {
            let rhs = next(self)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn ternary(&mut self) -> Result<Expr, String> {
        let cond = self.or()?;
        if self.eat(&["?"]).is_none() {
            return Ok(cond);
        }
        let then = self.nested(Self::ternary)?;
        self.expect(":")?;
        let otherwise = self.nested(Self::ternary)?;
        Ok(Expr::Cond(Box::new(cond), Box::new(then), Box::new(otherwise)))
    }

    fn or(&mut self) -> Result<Expr, String> {
        self.binary_level(&["||"], Self::and)
    }

    fn and(&mut self) -> Result<Expr, String> {
        self.binary_level(&["&&"], Self::equality)
    }

    fn equality(&mut self) -> Result<Expr, String> {
        self.binary_level(&["==", "!="], Self::compare)
    }

    fn compare(&mut self) -> Result<Expr, String> {
        self.binary_level(&["<", "<=", ">", ">="], Self::additive)
    }

    fn additive(&mut self) -> Result<Expr, String> {
        self.binary_level(&["+", "-", "."], Self::term)
    }

    fn term(&mut self) -> Result<Expr, String> {
        self.binary_level(&["*", "/", "%"], Self::unary)
    }

    fn unary(&mut self) -> Result<Expr, String> {
        match self.eat(&["-", "!"]) {
            Some(op) => Ok(Expr::Unary(op, Box::new(self.nested(Self::unary)?))),
            None => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr, String> {
        let tok = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| "unexpected end of expression".to_string())?;
        self.pos += 1;

        match tok {
            Tok::Int(i) => Ok(Expr::Lit(Value::Int(i))),
            Tok::Float(x) => Ok(Expr::Lit(Value::Float(x))),
            Tok::Str(s) => Ok(Expr::Lit(Value::Str(s))),
            Tok::Ident(id) if id == "true" => Ok(Expr::Lit(Value::Bool(true))),
            Tok::Ident(id) if id == "false" => Ok(Expr::Lit(Value::Bool(false))),
            Tok::Ident(id) => Err(format!(
                "unknown name `{}` (quote string values, e.g. '{}')",
                id, id
            )),
            Tok::Op("(") => {
                let inner = self.nested(Self::ternary)?;
                self.expect(")")?;
                Ok(inner)
            }
            other => Err(format!("unexpected {}", other)),
        }
    }
}

impl Expr {
    fn eval(&self) -> Result<Value, String> {
        match self {
            Expr::Lit(v) => Ok(v.clone()),
            Expr::Unary(op, inner) => {
                let v = inner.eval()?;
                match (*op, v) {
                    ("!", v) => Ok(Value::Bool(!v.truthy())),
                    ("-", Value::Int(i)) => i
                        .checked_neg()
                        .map(Value::Int)
                        .ok_or_else(|| "integer overflow".to_string()),
                    ("-", Value::Float(x)) => Ok(Value::Float(-x)),
                    (_, v) => Err(format!("cannot negate a {}", v.kind())),
                }
            }
            Expr::Cond(cond, then, otherwise) => {
                if cond.eval()?.truthy() {
                    then.eval()
                } else {
                    otherwise.eval()
                }
            }
            Expr::Binary("&&", lhs, rhs) => {
                Ok(Value::Bool(lhs.eval()?.truthy() && rhs.eval()?.truthy()))
            }
            Expr::Binary("||", lhs, rhs) => {
                Ok(Value::Bool(lhs.eval()?.truthy() || rhs.eval()?.truthy()))
            }
            Expr::Binary(op, lhs, rhs) => binary(op, lhs.eval()?, rhs.eval()?),
        }
    }
}

fn binary(op: &str, lhs: Value, rhs: Value) -> Result<Value, String> {
    use Value::*;

    let overflow = || "integer overflow".to_string();

    match (op, &lhs, &rhs) {
        (".", _, _) | ("+", Str(_), _) | ("+", _, Str(_)) => {
            Ok(Str(format!("{}{}", lhs, rhs)))
        }
        ("==", _, _) => Ok(Bool(equals(&lhs, &rhs))),
        ("!=", _, _) => Ok(Bool(!equals(&lhs, &rhs))),
        ("<" | "<=" | ">" | ">=", _, _) => {
            let ordering = match (&lhs, &rhs) {
                (Str(a), Str(b)) => a.partial_cmp(b),
                _ => match (lhs.as_f64(), rhs.as_f64()) {
                    (Some(a), Some(b)) => a.partial_cmp(&b),
                    _ => None,
                },
            }
            .ok_or_else(|| format!("cannot compare {} with {}", lhs.kind(), rhs.kind()))?;
            Ok(Bool(match op {
                "<" => ordering.is_lt(),
                "<=" => ordering.is_le(),
                ">" => ordering.is_gt(),
                _ => ordering.is_ge(),
            }))
        }
        ("+", Int(a), Int(b)) => a.checked_add(*b).map(Int).ok_or_else(overflow),
        ("-", Int(a), Int(b)) => a.checked_sub(*b).map(Int).ok_or_else(overflow),
        ("*", Int(a), Int(b)) => a.checked_mul(*b).map(Int).ok_or_else(overflow),
        ("/" | "%", _, Int(0)) => Err("division by zero".to_string()),
        ("/", Int(a), Int(b)) => {
            if a.checked_rem(*b) == Some(0) {
                a.checked_div(*b).map(Int).ok_or_else(overflow)
            } else {
                Ok(Float(*a as f64 / *b as f64))
            }
        }
        ("%", Int(a), Int(b)) => a.checked_rem(*b).map(Int).ok_or_else(overflow),
        ("%", _, _) => Err("`%` needs integer operands".to_string()),
        _ => {
            let (Some(a), Some(b)) = (lhs.as_f64(), rhs.as_f64()) else {
                return Err(format!(
                    "cannot apply `{}` to {} and {}",
                    op,
                    lhs.kind(),
                    rhs.kind()
                ));
            };
            match op {
                "+" => Ok(Float(a + b)),
                "-" => Ok(Float(a - b)),
                "*" => Ok(Float(a * b)),
                "/" if b == 0.0 => Err("division by zero".to_string()),
                "/" => Ok(Float(a / b)),
                _ => Err(format!("unknown operator `{}`", op)),
            }
        }
    }
}

fn equals(lhs: &Value, rhs: &Value) -> bool {
    match (lhs.as_f64(), rhs.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => lhs == rhs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(src: &str) -> String {
        evaluate(src).unwrap().to_string()
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("60 * 60 * 24"), "86400");
        assert_eq!(eval("1 + 2 * 3"), "7");
        assert_eq!(eval("(1 + 2) * 3"), "9");
        assert_eq!(eval("10 / 4"), "2.5");
        assert_eq!(eval("10 / 5"), "2");
        assert_eq!(eval("10 % 4"), "2");
        assert_eq!(eval("-3 + 1.5"), "-1.5");
    }

    #[test]
    fn test_strings() {
        assert_eq!(eval("'example' . '.com'"), "example.com");
        assert_eq!(eval("\"port-\" + 8080"), "port-8080");
        assert_eq!(eval("'it\\'s'"), "it's");
        assert_eq!(eval("1 . 2"), "12");
    }

    #[test]
    fn test_conditionals() {
        assert_eq!(eval("8080 > 1024 ? 'unprivileged' : 'privileged'"), "unprivileged");
        assert_eq!(eval("'prod' == 'dev' ? 1 : 2"), "2");
        assert_eq!(eval("true && !false"), "true");
        assert_eq!(eval("1 == 1.0"), "true");
        assert_eq!(eval("'' || 0"), "false");
        assert_eq!(eval("1 ? 2 ? 'a' : 'b' : 'c'"), "a");
    }

    #[test]
    fn test_untaken_branch_is_not_evaluated() {
        assert_eq!(eval("true ? 1 : 1 / 0"), "1");
        assert_eq!(eval("false && 1 / 0"), "false");
    }

    #[test]
    fn test_errors() {
        assert!(evaluate("1 / 0").unwrap_err().contains("division by zero"));
        assert!(evaluate("9223372036854775807 + 1").unwrap_err().contains("overflow"));
        assert!(evaluate("system('ls')").unwrap_err().contains("unknown name"));
        assert!(evaluate("'open").unwrap_err().contains("unterminated"));
        assert!(evaluate("1 +").is_err());
        assert!(evaluate("(1").is_err());
        assert!(evaluate("1 2").is_err());
        assert!(evaluate("$x").is_err());
        assert!(evaluate("'a' < 1").is_err());
    }

    #[test]
    fn test_resolve_value() {
        assert_eq!(resolve_value("T", "<?= 60 * 60 ?>").unwrap(), "3600");
        assert_eq!(resolve_value("T", "<?php 2 + 2 ?>").unwrap(), "4");
        assert_eq!(resolve_value("T", "plain ?> text").unwrap(), "plain ?> text");
        // the expression replaces the whole value
        assert_eq!(resolve_value("T", "timeout=<?= 5 * 2 ?>s").unwrap(), "10");
    }

    #[test]
    fn test_delimiter_inside_string_literal() {
        assert_eq!(resolve_value("T", "<?= 'a?>b' . 'c' ?>").unwrap(), "a?>bc");
    }

    #[test]
    fn test_nesting_within_limit() {
        let src = format!("{}1{}", "(".repeat(MAX_DEPTH - 1), ")".repeat(MAX_DEPTH - 1));
        assert_eq!(eval(&src), "1");
    }

    #[test]
    fn test_deep_nesting_is_an_error() {
        let value = format!("<?= {}1{} ?>", "(".repeat(1000), ")".repeat(1000));
        match resolve_value("DEEP", &value) {
            Err(CoreError::Expression { token, .. }) => assert_eq!(token, "DEEP"),
            other => panic!("expected expression error, got {:?}", other),
        }

        let parens = format!("{}1{}", "(".repeat(300), ")".repeat(300));
        assert!(evaluate(&parens).unwrap_err().contains("nested deeper"));

        let unary = format!("{}1", "-".repeat(500));
        assert!(evaluate(&unary).unwrap_err().contains("nested deeper"));

        let ternary = format!("{}1", "1 ? 1 : ".repeat(200));
        assert!(evaluate(&ternary).unwrap_err().contains("nested deeper"));
    }

    #[test]
    fn test_long_chain_is_an_error() {
        let chain = vec!["1"; 2000].join(" + ");
        assert!(evaluate(&chain).unwrap_err().contains("longer than"));

        let chain = vec!["1"; 500].join(" + ");
        assert_eq!(eval(&chain), "500");
    }

    #[test]
    fn test_resolve_value_error_names_token() {
        match resolve_value("TIMEOUT", "<?= 1 / 0 ?>") {
            Err(CoreError::Expression { token, message }) => {
                assert_eq!(token, "TIMEOUT");
                assert!(message.contains("division by zero"));
            }
            other => panic!("expected expression error, got {:?}", other),
        }
    }
}
