use std::str::FromStr;

use thiserror::Error;
use winnow::ascii::{digit1, multispace0};
use winnow::combinator::{alt, cut_err, delimited, opt, preceded, repeat, separated};
use winnow::error::{ContextError, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::{any, none_of, one_of, take_while};
use winnow::ModalResult;

use crate::case::{self, StringCase};

/// Maps an old base name to a new one
pub trait NameTransform {
    fn transform(&self, name: &str) -> String;
}

impl<F> NameTransform for F
where
    F: Fn(&str) -> String,
{
    fn transform(&self, name: &str) -> String {
        self(name)
    }
}

/// A parse or type error in a transform expression
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at column {column}")]
pub struct ExprError {
    pub column: usize,
    pub message: String,
}

impl ExprError {
    fn new(column: usize, message: impl Into<String>) -> Self {
        Self {
            column,
            message: message.into(),
        }
    }
}

/// Widest `zfill` accepted, the usual file name length limit
const MAX_ZFILL_WIDTH: i64 = 255;

/// A transform expression over the name `x`, e.g.
/// `'img_' + x.removeprefix('IMG').zfill(8)` or `x[:-4].snake() + x[-4:]`
///
/// Expressions are checked when parsed, so evaluating one never fails.
/// Indexing past the end of a name gives an empty string.
#[derive(Debug, Clone)]
pub struct Expression {
    source: String,
    root: Expr,
}

impl Expression {
    /// Parse and check an expression
    ///
    /// # Arguments
    /// * `source` - Expression text
    ///
    /// # Returns
    /// * `Result<Expression, ExprError>` - The expression, or the first error with its column
    pub fn parse(source: &str) -> Result<Self, ExprError> {
        let node = delimited(multispace0, parse_expr, multispace0)
            .parse(source)
            .map_err(|e| {
                let offset = e.offset();
                ExprError::new(column_at(source, offset), describe(source, offset, e.inner()))
            })?;
        let root = check(node, source)?;
        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl FromStr for Expression {
    type Err = ExprError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl NameTransform for Expression {
    fn transform(&self, name: &str) -> String {
        self.root.eval(name)
    }
}

#[derive(Debug, Clone)]
enum Expr {
    Name,
    Literal(String),
    Concat(Box<Expr>, Box<Expr>),
    Method(Box<Expr>, Op),
    Slice(Box<Expr>, Option<i64>, Option<i64>),
    Index(Box<Expr>, i64),
}

#[derive(Debug, Clone)]
enum Op {
    Upper,
    Lower,
    Title,
    Capitalize,
    SwapCase,
    Strip(Side, Option<Box<Expr>>),
    Replace(Box<Expr>, Box<Expr>),
    RemovePrefix(Box<Expr>),
    RemoveSuffix(Box<Expr>),
    ZFill(usize),
    Case(StringCase),
}

#[derive(Debug, Clone, Copy)]
enum Side {
    Both,
    Left,
    Right,
}

impl Expr {
    fn eval(&self, x: &str) -> String {
        match self {
            Expr::Name => x.to_string(),
            Expr::Literal(s) => s.clone(),
            Expr::Concat(lhs, rhs) => lhs.eval(x) + &rhs.eval(x),
            Expr::Method(target, op) => op.apply(&target.eval(x), x),
            Expr::Slice(target, start, end) => {
                let chars: Vec<char> = target.eval(x).chars().collect();
                let len = chars.len() as i64;
                let start = clamp_index(start.unwrap_or(0), len);
                let end = clamp_index(end.unwrap_or(len), len);
                if start >= end {
                    String::new()
                } else {
                    chars[start..end].iter().collect()
                }
            }
            Expr::Index(target, index) => {
                let chars: Vec<char> = target.eval(x).chars().collect();
                let len = chars.len() as i64;
                let index = if *index < 0 { index + len } else { *index };
                if (0..len).contains(&index) {
                    chars[index as usize].to_string()
                } else {
                    String::new()
                }
            }
        }
    }
}

fn clamp_index(index: i64, len: i64) -> usize {
    let index = if index < 0 { index + len } else { index };
    index.clamp(0, len) as usize
}

impl Op {
    fn apply(&self, s: &str, x: &str) -> String {
        match self {
            Op::Upper => s.to_uppercase(),
            Op::Lower => s.to_lowercase(),
            Op::Title => case::title(s),
            Op::Capitalize => case::capitalize(s),
            Op::SwapCase => case::swapcase(s),
            Op::Strip(side, chars) => {
                let chars: Option<Vec<char>> = chars.as_ref().map(|c| c.eval(x).chars().collect());
                let pred = |c: char| match &chars {
                    Some(set) => set.contains(&c),
                    None => c.is_whitespace(),
                };
                match side {
                    Side::Both => s.trim_matches(pred).to_string(),
                    Side::Left => s.trim_start_matches(pred).to_string(),
                    Side::Right => s.trim_end_matches(pred).to_string(),
                }
            }
            Op::Replace(from, to) => {
                let from = from.eval(x);
                let to = to.eval(x);
                if from.is_empty() {
                    // Insert between every character, like Python
                    let mut result = to.clone();
                    for c in s.chars() {
                        result.push(c);
                        result.push_str(&to);
                    }
                    result
                } else {
                    s.replace(&from, &to)
                }
            }
            Op::RemovePrefix(prefix) => {
                let prefix = prefix.eval(x);
                s.strip_prefix(prefix.as_str()).unwrap_or(s).to_string()
            }
            Op::RemoveSuffix(suffix) => {
                let suffix = suffix.eval(x);
                s.strip_suffix(suffix.as_str()).unwrap_or(s).to_string()
            }
            Op::ZFill(width) => zfill(s, *width),
            Op::Case(case_type) => case::convert_case(s, *case_type),
        }
    }
}

fn zfill(s: &str, width: usize) -> String {
    let len = s.chars().count();
    if len >= width {
        return s.to_string();
    }
    let zeros = "0".repeat(width - len);
    match s.chars().next() {
        Some(sign @ ('+' | '-')) => format!("{}{}{}", sign, zeros, &s[1..]),
        _ => zeros + s,
    }
}

/// Syntax tree before checking; `at` is the input length left where a node starts
#[derive(Debug)]
enum Node {
    Name { name: String, at: usize },
    Str(String),
    Int { value: i64, at: usize },
    Concat(Box<Node>, Box<Node>),
    Call {
        target: Box<Node>,
        method: String,
        args: Vec<Node>,
        at: usize,
    },
    Subscript {
        target: Box<Node>,
        start: Option<i64>,
        end: Option<Option<i64>>,
        at: usize,
    },
}

enum Arg {
    Str(Expr),
    Int(i64),
}

/// 1-based character column of a byte offset
fn column_at(source: &str, offset: usize) -> usize {
    source[..offset.min(source.len())].chars().count() + 1
}

/// Column of a node given the input length left where it starts
fn column_of(source: &str, at: usize) -> usize {
    column_at(source, source.len().saturating_sub(at))
}

fn describe(source: &str, offset: usize, error: &ContextError) -> String {
    let context = error.to_string();
    if !context.is_empty() {
        return context.replace('\n', ", ");
    }
    match source.get(offset..).and_then(|rest| rest.chars().next()) {
        Some(c) => format!("unexpected `{}`", c),
        None => "unexpected end of expression".to_string(),
    }
}

/// expr := term ('+' term)*
fn parse_expr(input: &mut &str) -> ModalResult<Node> {
    let first = parse_term(input)?;

    let rest: Vec<Node> = repeat(0.., preceded((multispace0, '+'), cut_err(parse_term))).parse_next(input)?;

    Ok(rest.into_iter().fold(first, |lhs, rhs| {
        Node::Concat(Box::new(lhs), Box::new(rhs))
    }))
}

/// term := primary ('.' method args | '[' subscript ']')*
fn parse_term(input: &mut &str) -> ModalResult<Node> {
    let mut node = parse_primary(input)?;

    loop {
        let checkpoint = *input;
        let _ = multispace0.parse_next(input)?;

        if opt('.').parse_next(input)?.is_some() {
            let _ = multispace0.parse_next(input)?;
            let at = input.len();
            let method = cut_err(parse_ident)
                .context(StrContext::Expected(StrContextValue::Description("method name")))
                .parse_next(input)?;
            let args = cut_err(parse_args).parse_next(input)?;
            node = Node::Call {
                target: Box::new(node),
                method: method.to_string(),
                args,
                at,
            };
        } else if opt('[').parse_next(input)?.is_some() {
            let at = input.len();
            let (start, end) = cut_err(parse_subscript).parse_next(input)?;
            node = Node::Subscript {
                target: Box::new(node),
                start,
                end,
                at,
            };
        } else {
            *input = checkpoint;
            return Ok(node);
        }
    }
}

/// primary := '(' expr ')' | string | integer | name
fn parse_primary(input: &mut &str) -> ModalResult<Node> {
    let _ = multispace0.parse_next(input)?;
    let at = input.len();

    alt((
        delimited(
            ('(', multispace0),
            cut_err(parse_expr),
            cut_err((multispace0, ')'))
                .context(StrContext::Expected(StrContextValue::CharLiteral(')'))),
        ),
        parse_string.map(Node::Str),
        parse_int.map(move |value| Node::Int { value, at }),
        parse_ident.map(move |name: &str| Node::Name {
            name: name.to_string(),
            at,
        }),
    ))
    .parse_next(input)
}

fn parse_args(input: &mut &str) -> ModalResult<Vec<Node>> {
    delimited(
        (multispace0, '('),
        separated(0.., parse_expr, (multispace0, ',')),
        (multispace0, ')'),
    )
    .context(StrContext::Expected(StrContextValue::Description("argument list")))
    .parse_next(input)
}

/// subscript := int? (':' int?)?, the opening '[' already consumed
fn parse_subscript(input: &mut &str) -> ModalResult<(Option<i64>, Option<Option<i64>>)> {
    let start = opt(preceded(multispace0, parse_int)).parse_next(input)?;
    let end = opt(preceded((multispace0, ':'), opt(preceded(multispace0, parse_int)))).parse_next(input)?;
    let _ = (multispace0, ']')
        .context(StrContext::Expected(StrContextValue::CharLiteral(']')))
        .parse_next(input)?;
    Ok((start, end))
}

fn parse_ident<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (
        one_of(|c: char| c.is_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_alphanumeric() || c == '_'),
    )
        .take()
        .parse_next(input)
}

fn parse_int(input: &mut &str) -> ModalResult<i64> {
    (opt('-'), digit1)
        .take()
        .try_map(|digits: &str| digits.parse::<i64>())
        .parse_next(input)
}

/// Quoted with ' or ", escapes `\n \t \\ \' \"`; any other escape is kept as written
fn parse_string(input: &mut &str) -> ModalResult<String> {
    let quote = one_of(['\'', '"']).parse_next(input)?;

    let value = repeat(
        0..,
        alt((
            preceded('\\', any).map(|c: char| match c {
                'n' => ('\n', None),
                't' => ('\t', None),
                '\\' | '\'' | '"' => (c, None),
                other => ('\\', Some(other)),
            }),
            none_of(['\\', quote]).map(|c: char| (c, None)),
        )),
    )
    .fold(String::new, |mut value, (c, extra): (char, Option<char>)| {
        value.push(c);
        value.extend(extra);
        value
    })
    .parse_next(input)?;

    cut_err(quote)
        .context(StrContext::Label("string"))
        .context(StrContext::Expected(StrContextValue::Description("closing quote")))
        .parse_next(input)?;
    Ok(value)
}

/// Resolve names and method calls, rejecting misplaced integers
fn check(node: Node, source: &str) -> Result<Expr, ExprError> {
    match node {
        Node::Name { name, at } => {
            if name == "x" {
                Ok(Expr::Name)
            } else {
                Err(ExprError::new(
                    column_of(source, at),
                    format!("unknown name `{}`, the name being renamed is `x`", name),
                ))
            }
        }
        Node::Str(value) => Ok(Expr::Literal(value)),
        Node::Int { at, .. } => Err(ExprError::new(
            column_of(source, at),
            "integers are only allowed as indices and method arguments",
        )),
        Node::Concat(lhs, rhs) => Ok(Expr::Concat(
            Box::new(check(*lhs, source)?),
            Box::new(check(*rhs, source)?),
        )),
        Node::Call {
            target,
            method: name,
            args,
            at,
        } => {
            let target = check(*target, source)?;
            let args = args
                .into_iter()
                .map(|arg| match arg {
                    Node::Int { value, .. } => Ok(Arg::Int(value)),
                    other => check(other, source).map(Arg::Str),
                })
                .collect::<Result<Vec<_>, _>>()?;
            let op = method(&name, args, column_of(source, at))?;
            Ok(Expr::Method(Box::new(target), op))
        }
        Node::Subscript {
            target,
            start,
            end,
            at,
        } => {
            let target = Box::new(check(*target, source)?);
            match (start, end) {
                (start, Some(end)) => Ok(Expr::Slice(target, start, end)),
                (Some(index), None) => Ok(Expr::Index(target, index)),
                (None, None) => Err(ExprError::new(
                    column_of(source, at),
                    "expected an index or a slice",
                )),
            }
        }
    }
}

/// Resolve a method call and check its arguments
fn method(name: &str, args: Vec<Arg>, column: usize) -> Result<Op, ExprError> {
    let wrong_args = |expected: &str| {
        ExprError::new(
            column,
            format!("`{}` takes {}", name, expected),
        )
    };

    let mut args = args.into_iter();
    let first = args.next();
    let second = args.next();
    if args.next().is_some() {
        return Err(wrong_args("at most two arguments"));
    }

    let side = match name {
        "strip" => Some(Side::Both),
        "lstrip" => Some(Side::Left),
        "rstrip" => Some(Side::Right),
        _ => None,
    };
    if let Some(side) = side {
        return match (first, second) {
            (None, None) => Ok(Op::Strip(side, None)),
            (Some(Arg::Str(chars)), None) => Ok(Op::Strip(side, Some(Box::new(chars)))),
            _ => Err(wrong_args("an optional string of characters")),
        };
    }

    if let Some(case_type) = StringCase::from_method(name) {
        return match (first, second) {
            (None, None) => Ok(Op::Case(case_type)),
            _ => Err(wrong_args("no arguments")),
        };
    }

    match name {
        "upper" | "lower" | "title" | "capitalize" | "swapcase" => match (first, second) {
            (None, None) => Ok(match name {
                "upper" => Op::Upper,
                "lower" => Op::Lower,
                "title" => Op::Title,
                "capitalize" => Op::Capitalize,
                _ => Op::SwapCase,
            }),
            _ => Err(wrong_args("no arguments")),
        },
        "replace" => match (first, second) {
            (Some(Arg::Str(from)), Some(Arg::Str(to))) => {
                Ok(Op::Replace(Box::new(from), Box::new(to)))
            }
            _ => Err(wrong_args("two strings")),
        },
        "removeprefix" | "removesuffix" => match (first, second) {
            (Some(Arg::Str(affix)), None) if name == "removeprefix" => {
                Ok(Op::RemovePrefix(Box::new(affix)))
            }
            (Some(Arg::Str(affix)), None) => Ok(Op::RemoveSuffix(Box::new(affix))),
            _ => Err(wrong_args("one string")),
        },
        "zfill" => match (first, second) {
            (Some(Arg::Int(width)), None) if width <= MAX_ZFILL_WIDTH => {
                Ok(Op::ZFill(width.max(0) as usize))
            }
            (Some(Arg::Int(_)), None) => Err(wrong_args(&format!(
                "a width of at most {}",
                MAX_ZFILL_WIDTH
            ))),
            _ => Err(wrong_args("one integer")),
        },
        _ => Err(ExprError::new(column, format!("unknown method `{}`", name))),
    }
}
