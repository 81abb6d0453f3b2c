//! Boolean filter conditions used by `where(...)` and `@if(...)`.
//!
//! The language is deliberately small: literals, `{field}` access, string
//! literals with placeholder interpolation, comparisons, `in` / `not in`
//! against list literals, and `and` / `or` / `not`.

use crate::{
    format::{self, parse_field_name, FormatError},
    model::{Value, Values},
};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{char, digit1, multispace0, satisfy},
    combinator::{all_consuming, map, map_res, not, opt, recognize, value},
    multi::{fold_many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated},
    IResult,
};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExprError {
    #[error("invalid condition {text:?}: {reason}")]
    Syntax { text: String, reason: String },
    #[error("unbound placeholder {{{0}}}")]
    Unbound(String),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("cannot apply `{op}` to {lhs} and {rhs}")]
    Type {
        op: &'static str,
        lhs: &'static str,
        rhs: &'static str,
    },
    #[error("condition produced {0}, expected a boolean")]
    NotBoolean(String),
}

impl ExprError {
    /// Name of the missing placeholder when this is a binding failure.
    pub fn unbound_name(&self) -> Option<&str> {
        match self {
            Self::Unbound(name) | Self::Format(FormatError::Unbound(name)) => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
}

impl CompareOp {
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::In => "in",
            Self::NotIn => "not in",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Literal(Value),
    /// A quoted string, interpolated before use.
    Text(String),
    Field(String),
    List(Vec<Expr>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Compare(CompareOp, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Operand {
    Scalar(Value),
    List(Vec<Value>),
}

impl Operand {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Scalar(v) => v.type_name(),
            Self::List(..) => "list",
        }
    }
}

#[inline(always)]
fn is_ident_char(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn keyword<'a>(kw: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    ws(terminated(tag(kw), not(satisfy(is_ident_char))))
}

fn parse_string_literal(i: &str) -> IResult<&str, Expr> {
    map(
        alt((
            delimited(char('\''), take_while(|c| c != '\''), char('\'')),
            delimited(char('"'), take_while(|c| c != '"'), char('"')),
        )),
        |s: &str| Expr::Text(s.to_owned()),
    )(i)
}

fn parse_int_literal(i: &str) -> IResult<&str, Expr> {
    map(
        map_res(recognize(pair(opt(char('-')), digit1)), str::parse::<i64>),
        |n| Expr::Literal(Value::Int(n)),
    )(i)
}

fn parse_bool_literal(i: &str) -> IResult<&str, Expr> {
    alt((
        value(Expr::Literal(Value::Bool(true)), alt((keyword("True"), keyword("true")))),
        value(Expr::Literal(Value::Bool(false)), alt((keyword("False"), keyword("false")))),
    ))(i)
}

fn parse_field(i: &str) -> IResult<&str, Expr> {
    map(
        delimited(char('{'), parse_field_name, char('}')),
        |name: &str| Expr::Field(name.to_owned()),
    )(i)
}

fn parse_list(i: &str) -> IResult<&str, Expr> {
    map(
        delimited(
            ws(char('[')),
            terminated(separated_list0(ws(char(',')), parse_or), opt(ws(char(',')))),
            ws(char(']')),
        ),
        Expr::List,
    )(i)
}

fn parse_atom(i: &str) -> IResult<&str, Expr> {
    ws(alt((
        delimited(char('('), parse_or, char(')')),
        parse_list,
        parse_string_literal,
        parse_int_literal,
        parse_bool_literal,
        parse_field,
    )))(i)
}

fn parse_compare_op(i: &str) -> IResult<&str, CompareOp> {
    alt((
        value(CompareOp::Eq, ws(tag("=="))),
        value(CompareOp::Ne, ws(tag("!="))),
        value(CompareOp::Le, ws(tag("<="))),
        value(CompareOp::Ge, ws(tag(">="))),
        value(CompareOp::Lt, ws(tag("<"))),
        value(CompareOp::Gt, ws(tag(">"))),
        value(CompareOp::NotIn, pair(keyword("not"), keyword("in"))),
        value(CompareOp::In, keyword("in")),
    ))(i)
}

fn parse_compare(i: &str) -> IResult<&str, Expr> {
    map(
        pair(parse_atom, opt(pair(parse_compare_op, parse_atom))),
        |(lhs, rhs)| match rhs {
            Some((op, rhs)) => Expr::Compare(op, Box::new(lhs), Box::new(rhs)),
            None => lhs,
        },
    )(i)
}

fn parse_not(i: &str) -> IResult<&str, Expr> {
    alt((
        map(preceded(keyword("not"), parse_not), |e| Expr::Not(Box::new(e))),
        parse_compare,
    ))(i)
}

fn parse_and(i: &str) -> IResult<&str, Expr> {
    let (i, first) = parse_not(i)?;
    fold_many0(
        preceded(keyword("and"), parse_not),
        move || first.clone(),
        |lhs, rhs| Expr::And(Box::new(lhs), Box::new(rhs)),
    )(i)
}

fn parse_or(i: &str) -> IResult<&str, Expr> {
    let (i, first) = parse_and(i)?;
    fold_many0(
        preceded(keyword("or"), parse_and),
        move || first.clone(),
        |lhs, rhs| Expr::Or(Box::new(lhs), Box::new(rhs)),
    )(i)
}

pub fn parse_expr(text: &str) -> Result<Expr, ExprError> {
    all_consuming(ws(parse_or))(text)
        .map(|(_, expr)| expr)
        .map_err(|e| ExprError::Syntax {
            text: text.to_owned(),
            reason: e.to_string(),
        })
}

fn loose_eq(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (&Value::Bool(b), &Value::Int(n)) | (&Value::Int(n), &Value::Bool(b)) => i64::from(b) == n,
        (a, b) => a.to_string() == b.to_string(),
    }
}

fn ordering(op: CompareOp, lhs: &Value, rhs: &Value) -> Result<Ordering, ExprError> {
    let as_int = |v: &Value| match *v {
        Value::Int(n) => Some(n),
        Value::Bool(b) => Some(i64::from(b)),
        Value::Str(..) => None,
    };
    match (lhs, rhs) {
        (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
        _ => match (as_int(lhs), as_int(rhs)) {
            (Some(a), Some(b)) => Ok(a.cmp(&b)),
            _ => Err(ExprError::Type {
                op: op.symbol(),
                lhs: lhs.type_name(),
                rhs: rhs.type_name(),
            }),
        },
    }
}

fn truthy(op: &'static str, operand: Operand) -> Result<bool, ExprError> {
    match operand {
        Operand::Scalar(v) => v.as_condition().ok_or(ExprError::Type {
            op,
            lhs: v.type_name(),
            rhs: "bool",
        }),
        Operand::List(..) => Err(ExprError::Type {
            op,
            lhs: "list",
            rhs: "bool",
        }),
    }
}

impl Expr {
    fn eval(&self, values: &Values) -> Result<Operand, ExprError> {
        use Operand::Scalar;
        let v = match self {
            Self::Literal(v) => Scalar(v.clone()),
            Self::Text(raw) => Scalar(Value::Str(format::substitute(raw, values)?)),
            Self::Field(name) => values.get(name.as_str())
                .cloned()
                .map(Scalar)
                .ok_or_else(|| ExprError::Unbound(name.clone()))?,
            Self::List(items) => {
                let items = items.iter()
                    .map(|e| match e.eval(values)? {
                        Scalar(v) => Ok(v),
                        Operand::List(..) => Err(ExprError::Type {
                            op: "[]",
                            lhs: "list",
                            rhs: "list",
                        }),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Operand::List(items)
            },
            Self::Not(e) => Scalar(Value::Bool(!truthy("not", e.eval(values)?)?)),
            Self::And(lhs, rhs) => {
                let v = truthy("and", lhs.eval(values)?)? && truthy("and", rhs.eval(values)?)?;
                Scalar(Value::Bool(v))
            },
            Self::Or(lhs, rhs) => {
                let v = truthy("or", lhs.eval(values)?)? || truthy("or", rhs.eval(values)?)?;
                Scalar(Value::Bool(v))
            },
            Self::Compare(op, lhs, rhs) => {
                Scalar(Value::Bool(compare(*op, lhs.eval(values)?, rhs.eval(values)?)?))
            },
        };
        Ok(v)
    }
}

fn compare(op: CompareOp, lhs: Operand, rhs: Operand) -> Result<bool, ExprError> {
    let type_error = |lhs: &Operand, rhs: &Operand| ExprError::Type {
        op: op.symbol(),
        lhs: lhs.type_name(),
        rhs: rhs.type_name(),
    };
    match (op, &lhs, &rhs) {
        (CompareOp::In | CompareOp::NotIn, Operand::Scalar(needle), Operand::List(haystack)) => {
            let found = haystack.iter().any(|v| loose_eq(needle, v));
            Ok(found == (op == CompareOp::In))
        },
        (CompareOp::In | CompareOp::NotIn, Operand::Scalar(Value::Str(needle)), Operand::Scalar(Value::Str(haystack))) => {
            Ok(haystack.contains(needle.as_str()) == (op == CompareOp::In))
        },
        (CompareOp::In | CompareOp::NotIn, ..) => Err(type_error(&lhs, &rhs)),
        (CompareOp::Eq, Operand::Scalar(a), Operand::Scalar(b)) => Ok(loose_eq(a, b)),
        (CompareOp::Ne, Operand::Scalar(a), Operand::Scalar(b)) => Ok(!loose_eq(a, b)),
        (CompareOp::Eq, Operand::List(a), Operand::List(b)) => {
            Ok(a.len() == b.len() && a.iter().zip(b).all(|(a, b)| loose_eq(a, b)))
        },
        (_, Operand::Scalar(a), Operand::Scalar(b)) => {
            let ord = ordering(op, a, b)?;
            Ok(match op {
                CompareOp::Lt => ord == Ordering::Less,
                CompareOp::Le => ord != Ordering::Greater,
                CompareOp::Gt => ord == Ordering::Greater,
                CompareOp::Ge => ord != Ordering::Less,
                _ => unreachable!("equality handled above"),
            })
        },
        _ => Err(type_error(&lhs, &rhs)),
    }
}

/// A parsed `where(...)` / `@if(...)` condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    text: String,
    expr: Expr,
}

impl Condition {
    pub fn parse(text: &str) -> Result<Self, ExprError> {
        let expr = parse_expr(text)?;
        Ok(Self {
            text: text.to_owned(),
            expr,
        })
    }

    #[inline(always)]
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn evaluate(&self, values: &Values) -> Result<bool, ExprError> {
        match self.expr.eval(values)? {
            Operand::Scalar(v) => v.as_condition()
                .ok_or_else(|| ExprError::NotBoolean(format!("{} {:?}", v.type_name(), v.to_string()))),
            Operand::List(items) => Err(ExprError::NotBoolean(format!("a list of {} items", items.len()))),
        }
    }
}
