//! Literal values and expressions.
//!
//! Expressions are never evaluated beyond literal extraction. They are kept
//! as trees so that backends receive the declared shape verbatim.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A literal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
    String(String),
}

impl Value {
    /// Numeric view of the value. Strings are parsed leniently.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            Value::String(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::String(s) => write!(f, "{s}"),
        }
    }
}

/// An expression as written in source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Expr {
    Literal(Value),
    Identifier(String),
    /// Parenthesized, comma-separated. A 1-tuple stays a tuple.
    Tuple(Vec<Expr>),
    /// Call in expression position. `name` keeps its `$` when a process is called.
    Call { name: String, args: Args },
    /// Anything the parser could not classify.
    Unknown,
}

impl Expr {
    pub fn int(n: i64) -> Self {
        Expr::Literal(Value::Int(n))
    }

    pub fn float(x: f64) -> Self {
        Expr::Literal(Value::Float(x))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Expr::Literal(Value::String(s.into()))
    }

    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Identifier(name.into())
    }

    /// The identifier name, if this is a bare identifier.
    pub fn as_identifier(&self) -> Option<&str> {
        match self {
            Expr::Identifier(name) => Some(name),
            _ => None,
        }
    }

    /// Two integers from a `(w, h)` tuple or a two-argument call like `layer(w, h)`.
    pub fn as_int_pair(&self) -> Option<(i64, i64)> {
        let items = match self {
            Expr::Tuple(items) => items.as_slice(),
            Expr::Call { args, .. } if args.named.is_empty() => args.positional.as_slice(),
            _ => return None,
        };
        match items {
            [Expr::Literal(Value::Int(a)), Expr::Literal(Value::Int(b))] => Some((*a, *b)),
            _ => None,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(Value::String(s)) => write!(f, "{s:?}"),
            Expr::Literal(v) => write!(f, "{v}"),
            Expr::Identifier(name) => write!(f, "{name}"),
            Expr::Tuple(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                if items.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Expr::Call { name, args } => write!(f, "{name}({args})"),
            Expr::Unknown => write!(f, "?"),
        }
    }
}

/// A named argument: `name = value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedArg {
    pub name: String,
    pub value: Expr,
}

/// Call arguments. Named arguments keep source order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Args {
    pub positional: Vec<Expr>,
    pub named: Vec<NamedArg>,
}

impl Args {
    pub fn positional(items: Vec<Expr>) -> Self {
        Self {
            positional: items,
            named: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }

    /// Look up a named argument.
    pub fn named(&self, name: &str) -> Option<&Expr> {
        self.named.iter().find(|a| a.name == name).map(|a| &a.value)
    }

    /// Named argument if present, otherwise the positional at `index`.
    pub fn get(&self, name: &str, index: usize) -> Option<&Expr> {
        self.named(name).or_else(|| self.positional.get(index))
    }
}

impl fmt::Display for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for expr in &self.positional {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{expr}")?;
            first = false;
        }
        for arg in &self.named {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", arg.name, arg.value)?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expr_display_reads_like_source() {
        let expr = Expr::Call {
            name: "capture".into(),
            args: Args {
                positional: vec![Expr::int(0)],
                named: vec![NamedArg {
                    name: "fps".into(),
                    value: Expr::float(29.97),
                }],
            },
        };
        assert_eq!(expr.to_string(), "capture(0, fps=29.97)");
        assert_eq!(Expr::Tuple(vec![Expr::int(1)]).to_string(), "(1,)");
        assert_eq!(Expr::string("hi").to_string(), "\"hi\"");
    }

    #[test]
    fn int_pair_from_tuple_or_call() {
        let tuple = Expr::Tuple(vec![Expr::int(1920), Expr::int(1080)]);
        assert_eq!(tuple.as_int_pair(), Some((1920, 1080)));

        let call = Expr::Call {
            name: "layer".into(),
            args: Args::positional(vec![Expr::int(640), Expr::int(480)]),
        };
        assert_eq!(call.as_int_pair(), Some((640, 480)));

        assert_eq!(Expr::Tuple(vec![Expr::int(1)]).as_int_pair(), None);
    }

    #[test]
    fn expr_serializes_with_type_tag() {
        let json = serde_json::to_value(Expr::ident("webcam")).unwrap();
        assert_eq!(json, serde_json::json!({"type": "identifier", "value": "webcam"}));

        let json = serde_json::to_value(Expr::int(3)).unwrap();
        assert_eq!(json, serde_json::json!({"type": "literal", "value": 3}));
    }

    #[test]
    fn numeric_strings_coerce() {
        assert_eq!(Value::String(" 2.5 ".into()).as_f64(), Some(2.5));
        assert_eq!(Value::String("abc".into()).as_f64(), None);
        assert_eq!(Value::Int(4).as_f64(), Some(4.0));
    }
}
