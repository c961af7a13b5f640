//! Parser for the textual query language.
//!
//! The language is a small infix expression syntax with comparison chains,
//! boolean keywords and list literals:
//!
//! ```text
//! a == 1 and b in any(['x', 'y'])
//! 0 < price <= 100 or 'red' in colors
//! (title == 'foo') | (title == 'bar') - (state == 'draft')
//! ```
//!
//! Parsing runs in two steps. The grammar below builds a generic [`Expr`]
//! tree; lowering then checks that tree against what the catalog can
//! execute and produces a [`Query`].

use nom::branch::alt;
use nom::bytes::complete::{tag, take_while, take_while1};
use nom::character::complete::{char, digit0, digit1, multispace0, one_of, satisfy};
use nom::combinator::{map, not, opt, recognize, value};
use nom::error::{Error as NomError, ErrorKind as NomErrorKind};
use nom::multi::{many0, separated_list0};
use nom::sequence::{delimited, pair, preceded, terminated};
use nom::{IResult, Parser};
use tracing::debug;

use crate::core::error::{Error, Result};
use crate::core::types::Value;
use crate::query::ast::{Query, Term};
use crate::query::optimizer::QueryOptimizer;

const KEYWORDS: [&str; 8] = ["and", "or", "not", "in", "is", "if", "else", "lambda"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinOp {
    BitOr,
    BitXor,
    BitAnd,
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOp {
    fn symbol(self) -> &'static str {
        match self {
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::BitAnd => "&",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(Value),
    Name(String),
    List(Vec<Expr>),
    Tuple(Vec<Expr>),
    Call(Box<Expr>, Vec<Expr>),
    Compare(Box<Expr>, Vec<(CmpOp, Expr)>),
    BinOp(BinOp, Box<Expr>, Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    Neg(Box<Expr>),
    Attribute,
}

type PResult<'a, T> = IResult<&'a str, T>;

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn symbol<'a>(text: &'static str) -> impl Parser<&'a str, Output = &'a str, Error = NomError<&'a str>> {
    preceded(multispace0, tag(text))
}

fn keyword<'a>(word: &'static str) -> impl Parser<&'a str, Output = &'a str, Error = NomError<&'a str>> {
    preceded(multispace0, terminated(tag(word), not(satisfy(is_ident_char))))
}

fn identifier(input: &str) -> PResult<&str> {
    let (rest, ident) = preceded(
        multispace0,
        recognize(pair(
            take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
            take_while(is_ident_char),
        )),
    )
    .parse(input)?;
    if KEYWORDS.contains(&ident) {
        return Err(nom::Err::Error(NomError::new(input, NomErrorKind::Tag)));
    }
    Ok((rest, ident))
}

fn number(input: &str) -> PResult<Expr> {
    let (rest, text) = preceded(
        multispace0,
        recognize((
            digit1,
            opt((char('.'), digit0)),
            opt((one_of("eE"), opt(one_of("+-")), digit1)),
        )),
    )
    .parse(input)?;
    let parsed = if text.contains(['.', 'e', 'E']) {
        text.parse::<f64>().ok().map(Value::Float)
    } else {
        text.parse::<i64>().ok().map(Value::Int)
    };
    match parsed {
        Some(value) => Ok((rest, Expr::Literal(value))),
        None => Err(nom::Err::Failure(NomError::new(input, NomErrorKind::Digit))),
    }
}

fn string_literal(input: &str) -> PResult<String> {
    let (input, _) = multispace0(input)?;
    let (input, _) = opt(one_of("uU")).parse(input)?;
    let (body, quote) = one_of("'\"").parse(input)?;

    let mut out = String::new();
    let mut chars = body.char_indices();
    while let Some((i, c)) = chars.next() {
        if c == quote {
            return Ok((&body[i + c.len_utf8()..], out));
        }
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some((_, 'n')) => out.push('\n'),
            Some((_, 't')) => out.push('\t'),
            Some((_, 'r')) => out.push('\r'),
            Some((_, escaped)) => out.push(escaped),
            None => break,
        }
    }
    Err(nom::Err::Failure(NomError::new(input, NomErrorKind::Char)))
}

fn sequence_items(input: &str) -> PResult<(Vec<Expr>, bool)> {
    let (input, items) = separated_list0(symbol(","), expression).parse(input)?;
    let (input, trailing) = opt(symbol(",")).parse(input)?;
    Ok((input, (items, trailing.is_some())))
}

fn parenthesized(input: &str) -> PResult<Expr> {
    let (input, (mut items, trailing)) = delimited(symbol("("), sequence_items, symbol(")")).parse(input)?;
    if items.len() == 1 && !trailing {
        if let Some(inner) = items.pop() {
            return Ok((input, inner));
        }
    }
    Ok((input, Expr::Tuple(items)))
}

fn list_display(input: &str) -> PResult<Expr> {
    map(delimited(symbol("["), sequence_items, symbol("]")), |(items, _)| Expr::List(items)).parse(input)
}

fn atom(input: &str) -> PResult<Expr> {
    alt((
        map(string_literal, |s| Expr::Literal(Value::Text(s))),
        number,
        map(identifier, |name| Expr::Name(name.to_string())),
        parenthesized,
        list_display,
    ))
    .parse(input)
}

fn atom_expr(input: &str) -> PResult<Expr> {
    let (input, base) = atom(input)?;
    let (input, attributes) = many0(preceded(symbol("."), identifier)).parse(input)?;
    let base = match base {
        base if attributes.is_empty() => base,
        Expr::Name(mut name) => {
            for attribute in attributes {
                name.push('.');
                name.push_str(attribute);
            }
            Expr::Name(name)
        }
        _ => Expr::Attribute,
    };
    let (input, args) = opt(delimited(symbol("("), sequence_items, symbol(")"))).parse(input)?;
    match args {
        Some((args, _)) => Ok((input, Expr::Call(Box::new(base), args))),
        None => Ok((input, base)),
    }
}

fn factor(input: &str) -> PResult<Expr> {
    alt((
        map(preceded(symbol("-"), factor), |e| Expr::Neg(Box::new(e))),
        atom_expr,
    ))
    .parse(input)
}

fn fold_binary(first: Expr, rest: Vec<(BinOp, Expr)>) -> Expr {
    rest.into_iter()
        .fold(first, |left, (op, right)| Expr::BinOp(op, Box::new(left), Box::new(right)))
}

fn term(input: &str) -> PResult<Expr> {
    let op = alt((value(BinOp::Mul, symbol("*")), value(BinOp::Div, symbol("/"))));
    let (input, (first, rest)) = pair(factor, many0(pair(op, factor))).parse(input)?;
    Ok((input, fold_binary(first, rest)))
}

fn arith(input: &str) -> PResult<Expr> {
    let op = alt((value(BinOp::Add, symbol("+")), value(BinOp::Sub, symbol("-"))));
    let (input, (first, rest)) = pair(term, many0(pair(op, term))).parse(input)?;
    Ok((input, fold_binary(first, rest)))
}

fn bit_and(input: &str) -> PResult<Expr> {
    let (input, (first, rest)) = pair(arith, many0(pair(value(BinOp::BitAnd, symbol("&")), arith))).parse(input)?;
    Ok((input, fold_binary(first, rest)))
}

fn bit_xor(input: &str) -> PResult<Expr> {
    let (input, (first, rest)) =
        pair(bit_and, many0(pair(value(BinOp::BitXor, symbol("^")), bit_and))).parse(input)?;
    Ok((input, fold_binary(first, rest)))
}

fn bit_or(input: &str) -> PResult<Expr> {
    let (input, (first, rest)) = pair(bit_xor, many0(pair(value(BinOp::BitOr, symbol("|")), bit_xor))).parse(input)?;
    Ok((input, fold_binary(first, rest)))
}

fn comp_op(input: &str) -> PResult<CmpOp> {
    alt((
        value(CmpOp::Eq, symbol("==")),
        value(CmpOp::NotEq, symbol("!=")),
        value(CmpOp::Le, symbol("<=")),
        value(CmpOp::Ge, symbol(">=")),
        value(CmpOp::Lt, symbol("<")),
        value(CmpOp::Gt, symbol(">")),
        value(CmpOp::NotIn, pair(keyword("not"), keyword("in"))),
        value(CmpOp::In, keyword("in")),
    ))
    .parse(input)
}

fn comparison(input: &str) -> PResult<Expr> {
    let (input, (first, rest)) = pair(bit_or, many0(pair(comp_op, bit_or))).parse(input)?;
    if rest.is_empty() {
        return Ok((input, first));
    }
    Ok((input, Expr::Compare(Box::new(first), rest)))
}

fn not_test(input: &str) -> PResult<Expr> {
    alt((
        map(preceded(keyword("not"), not_test), |e| Expr::Not(Box::new(e))),
        comparison,
    ))
    .parse(input)
}

fn and_test(input: &str) -> PResult<Expr> {
    let (input, (first, rest)) = pair(not_test, many0(preceded(keyword("and"), not_test))).parse(input)?;
    if rest.is_empty() {
        return Ok((input, first));
    }
    let mut operands = vec![first];
    operands.extend(rest);
    Ok((input, Expr::And(operands)))
}

fn expression(input: &str) -> PResult<Expr> {
    let (input, (first, rest)) = pair(and_test, many0(preceded(keyword("or"), and_test))).parse(input)?;
    if rest.is_empty() {
        return Ok((input, first));
    }
    let mut operands = vec![first];
    operands.extend(rest);
    Ok((input, Expr::Or(operands)))
}

fn parse_expression(source: &str) -> Result<Expr> {
    if source.trim().is_empty() {
        return Err(Error::parse("Not an expression."));
    }
    let (rest, expr) = match expression(source) {
        Ok(parsed) => parsed,
        Err(err) => {
            debug!(source, error = ?err, "query expression did not parse");
            return Err(Error::parse(format!("invalid syntax: {}", source.trim())));
        }
    };

    let tail = rest.trim_start_matches([' ', '\t']);
    if tail.trim().is_empty() {
        return Ok(expr);
    }
    if tail.starts_with(['\n', '\r', ';']) {
        return Err(Error::parse("Can only process single expression."));
    }
    if tail.starts_with('=') {
        return Err(Error::parse("Not an expression."));
    }
    Err(Error::parse(format!("invalid syntax near {:?}", tail.trim())))
}

enum Node {
    Query(Query),
    Term(Term),
}

fn unhandled() -> Error {
    Error::parse("Unhandled expression element")
}

fn lower(expr: Expr) -> Result<Node> {
    match expr {
        Expr::Literal(value) => Ok(Node::Term(Term::Literal(value))),
        Expr::Name(name) => Ok(Node::Term(match name.as_str() {
            "True" => Term::Literal(Value::Bool(true)),
            "False" => Term::Literal(Value::Bool(false)),
            _ => Term::Name(name),
        })),
        Expr::List(items) | Expr::Tuple(items) => {
            let items = items.into_iter().map(lower_term).collect::<Result<Vec<_>>>()?;
            Ok(Node::Term(Term::List(items)))
        }
        Expr::Neg(operand) => match lower_term(*operand)? {
            Term::Literal(Value::Int(i)) => Ok(Node::Term(Term::Literal(Value::Int(-i)))),
            Term::Literal(Value::Float(f)) => Ok(Node::Term(Term::Literal(Value::Float(-f)))),
            _ => Err(unhandled()),
        },
        Expr::Call(..) => Err(Error::parse("Illegal function call")),
        Expr::Compare(left, ops) => lower_compare(*left, ops).map(Node::Query),
        Expr::BinOp(op, left, right) => {
            let combine: fn(Query, Query) -> Query = match op {
                BinOp::BitOr => |l, r| l | r,
                BinOp::BitAnd => |l, r| l & r,
                BinOp::Sub => |l, r| l - r,
                _ => return Err(unhandled()),
            };
            let Node::Query(left) = lower(*left)? else {
                return Err(Error::parse(format!(
                    "Bad expression: left operand for {} must be a result set.",
                    op.symbol()
                )));
            };
            let Node::Query(right) = lower(*right)? else {
                return Err(Error::parse(format!(
                    "Bad expression: right operand for {} must be a result set.",
                    op.symbol()
                )));
            };
            Ok(Node::Query(combine(left, right)))
        }
        Expr::And(operands) => lower_bool_operands(operands, "And").map(|qs| Node::Query(Query::and(qs))),
        Expr::Or(operands) => lower_bool_operands(operands, "Or").map(|qs| Node::Query(Query::or(qs))),
        Expr::Not(operand) => match lower(*operand)? {
            Node::Query(query) => Ok(Node::Query(!query)),
            Node::Term(_) => Err(Error::parse("Bad expression: operand for not must be a result set.")),
        },
        Expr::Attribute => Err(unhandled()),
    }
}

fn lower_term(expr: Expr) -> Result<Term> {
    match lower(expr)? {
        Node::Term(term) => Ok(term),
        Node::Query(_) => Err(unhandled()),
    }
}

fn lower_bool_operands(operands: Vec<Expr>, op: &str) -> Result<Vec<Query>> {
    operands
        .into_iter()
        .map(|operand| match lower(operand)? {
            Node::Query(query) => Ok(query),
            Node::Term(_) => Err(Error::parse(format!(
                "Bad expression: All operands for {} must be result sets.",
                op
            ))),
        })
        .collect()
}

fn index_name(expr: Expr) -> Result<String> {
    match expr {
        Expr::Name(name) => Ok(name),
        _ => Err(Error::parse("Index name must be a name.")),
    }
}

fn lower_compare(left: Expr, ops: Vec<(CmpOp, Expr)>) -> Result<Query> {
    let mut ops = ops.into_iter();
    match (ops.next(), ops.next(), ops.next()) {
        (Some((op, right)), None, None) => lower_single(left, op, right),
        // start < index <= end
        (Some((first, middle)), Some((second, right)), None)
            if matches!(first, CmpOp::Lt | CmpOp::Le) && matches!(second, CmpOp::Lt | CmpOp::Le) =>
        {
            let index = index_name(middle)?;
            Ok(Query::in_range(
                &index,
                lower_term(left)?,
                lower_term(right)?,
                first == CmpOp::Lt,
                second == CmpOp::Lt,
            ))
        }
        _ => Err(Error::parse("Bad expression: unsupported chaining of comparators.")),
    }
}

fn lower_set_comparison(left: Expr, negated: bool, function: Expr, mut args: Vec<Expr>) -> Result<Query> {
    let function = match function {
        Expr::Name(name) if name == "any" || name == "all" => name,
        _ => return Err(Error::parse("Illegal function call")),
    };
    if args.len() != 1 {
        return Err(Error::parse("Wrong number of arguments to any/all"));
    }
    let values = match args.pop() {
        Some(arg) => lower_term(arg)?,
        None => return Err(Error::parse("Wrong number of arguments to any/all")),
    };
    let index = index_name(left)?;
    Ok(match (function.as_str(), negated) {
        ("any", false) => Query::any(&index, values),
        ("any", true) => Query::not_any(&index, values),
        (_, false) => Query::all(&index, values),
        (_, true) => Query::not_all(&index, values),
    })
}

fn lower_single(left: Expr, op: CmpOp, right: Expr) -> Result<Query> {
    let right = match (op, right) {
        (CmpOp::In | CmpOp::NotIn, Expr::Call(function, args)) => {
            return lower_set_comparison(left, op == CmpOp::NotIn, *function, args);
        }
        (_, right) => right,
    };

    match op {
        CmpOp::In => Ok(Query::contains(&index_name(right)?, lower_term(left)?)),
        CmpOp::NotIn => Ok(Query::not_contains(&index_name(right)?, lower_term(left)?)),
        _ => {
            let index = index_name(left)?;
            let value = lower_term(right)?;
            Ok(match op {
                CmpOp::Eq => Query::eq(&index, value),
                CmpOp::NotEq => Query::not_eq(&index, value),
                CmpOp::Lt => Query::lt(&index, value),
                CmpOp::Le => Query::le(&index, value),
                CmpOp::Gt => Query::gt(&index, value),
                CmpOp::Ge => Query::ge(&index, value),
                CmpOp::In | CmpOp::NotIn => return Err(unhandled()),
            })
        }
    }
}

/// Turns query-language text into a [`Query`], optionally running the
/// optimizer over the result.
pub struct ExpressionParser {
    pub optimize: bool,
    optimizer: QueryOptimizer,
}

impl Default for ExpressionParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpressionParser {
    pub fn new() -> Self {
        ExpressionParser {
            optimize: true,
            optimizer: QueryOptimizer::new(),
        }
    }

    pub fn without_optimizer() -> Self {
        ExpressionParser {
            optimize: false,
            optimizer: QueryOptimizer::new(),
        }
    }

    pub fn parse(&self, source: &str) -> Result<Query> {
        let expr = parse_expression(source)?;
        let query = match lower(expr)? {
            Node::Query(query) => query,
            Node::Term(_) => return Err(Error::parse("Expression does not produce a result set.")),
        };
        if self.optimize {
            Ok(self.optimizer.optimize(query))
        } else {
            Ok(query)
        }
    }
}

/// Parse and optimize a query expression.
pub fn parse_query(source: &str) -> Result<Query> {
    ExpressionParser::new().parse(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;

    fn parse(source: &str) -> Query {
        parse_query(source).unwrap()
    }

    fn raw(source: &str) -> Query {
        ExpressionParser::without_optimizer().parse(source).unwrap()
    }

    fn expr(source: &str) -> Expr {
        parse_expression(source).unwrap()
    }

    fn error(source: &str) -> String {
        let err = parse_query(source).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Parse, "{}", source);
        err.context
    }

    #[test]
    fn test_literals() {
        assert_eq!(expr("1"), Expr::Literal(Value::Int(1)));
        assert_eq!(expr("1.1"), Expr::Literal(Value::Float(1.1)));
        assert_eq!(expr("\"foo\""), Expr::Literal(Value::from("foo")));
        assert_eq!(expr("u'foo'"), Expr::Literal(Value::from("foo")));
        assert_eq!(expr("'it\\'s'"), Expr::Literal(Value::from("it's")));
        assert_eq!(expr("a.foo.bar"), Expr::Name("a.foo.bar".to_string()));
        let list = Expr::List(vec![
            Expr::Literal(Value::Int(1)),
            Expr::Literal(Value::Int(2)),
            Expr::Literal(Value::Int(3)),
        ]);
        assert_eq!(expr("[1, 2, 3,]"), list);
        let tuple = Expr::Tuple(vec![
            Expr::Name("a".to_string()),
            Expr::Name("b".to_string()),
            Expr::Name("c".to_string()),
        ]);
        assert_eq!(expr("(a, b, c)"), tuple);
    }

    #[test]
    fn test_bare_values_are_not_queries() {
        assert!(parse_query("1").is_err());
        assert!(parse_query("[1, 2]").is_err());
    }

    #[test]
    fn test_statement_errors() {
        assert_eq!(error("a = 1"), "Not an expression.");
        assert_eq!(error("a == 1\nb == 2\n"), "Can only process single expression.");
        assert_eq!(error("   "), "Not an expression.");
        assert!(error("a == 1 )").starts_with("invalid syntax"));
    }

    #[test]
    fn test_expression_errors() {
        assert_eq!(error("a ^ b"), "Unhandled expression element");
        assert_eq!(error("1 == a"), "Index name must be a name.");
        assert_eq!(error("(a == 1) | 2"), "Bad expression: right operand for | must be a result set.");
        assert_eq!(error("1 | (b == 2)"), "Bad expression: left operand for | must be a result set.");
        assert_eq!(error("1 or 2"), "Bad expression: All operands for Or must be result sets.");
        assert_eq!(error("1 < 2 > 3"), "Bad expression: unsupported chaining of comparators.");
        assert_eq!(error("x == y == z"), "Bad expression: unsupported chaining of comparators.");
        assert_eq!(error("a in foo(bar)"), "Illegal function call");
        assert_eq!(error("a == any(1)"), "Illegal function call");
        assert_eq!(error("a in any(1, 2)"), "Wrong number of arguments to any/all");
    }

    #[test]
    fn test_comparators() {
        assert_eq!(parse("a == 1"), Query::eq("a", 1));
        assert_eq!(parse("a != 'x'"), Query::not_eq("a", "x"));
        assert_eq!(parse("a >= -2"), Query::ge("a", -2));
        assert_eq!(parse("a < 1.5"), Query::lt("a", 1.5));
        assert_eq!(parse("a == foo"), Query::eq("a", Term::name("foo")));
        assert_eq!(parse("flag == True"), Query::eq("flag", true));
        assert_eq!(parse("6 in a"), Query::contains("a", 6));
        assert_eq!(parse("6 not in a"), Query::not_contains("a", 6));
    }

    #[test]
    fn test_ranges() {
        assert_eq!(parse("0 < a <= 5"), Query::in_range("a", 0, 5, true, false));
        assert_eq!(parse("0 <= a < 5"), Query::in_range("a", 0, 5, false, true));
        assert_eq!(parse("not(0 < a < 5)"), Query::not_in_range("a", 0, 5, true, true));
        assert_eq!(parse("a < 1 and a > 0"), Query::in_range("a", 0, 1, true, true));
        assert_eq!(parse("a < 0 or a > 1"), Query::not_in_range("a", 0, 1, false, false));
        assert_eq!(parse("a > 1 or a < 0"), Query::not_in_range("a", 0, 1, false, false));
    }

    #[test]
    fn test_range_merging_across_nesting() {
        let in_range = Query::in_range("a", 0, 5, true, true);
        let expected = Query::and(vec![in_range.clone(), Query::eq("b", 7)]);
        assert_eq!(parse("a > 0 and (a < 5 and b == 7)"), expected);
        assert_eq!(parse("a > 0 and (b == 7 and a < 5)"), expected);

        let expected = Query::and(vec![
            Query::in_range("a", -1, 1, false, false),
            Query::eq("b", 2),
            Query::gt("c", 3),
        ]);
        assert_eq!(parse("a >= -1 and b == 2 and c > 3 and a <= 1"), expected);

        let expected = Query::and(vec![
            Query::eq("b", 2),
            Query::in_range("a", -1, 1, true, false),
            Query::gt("c", 3),
        ]);
        assert_eq!(parse("b == 2 and a > -1 and (a <= 1 and c > 3)"), expected);

        let expected = Query::and(vec![
            Query::in_range("a", 0, 5, true, true),
            Query::in_range("b", 0, 5, true, true),
            Query::in_range("c", 0, 5, true, true),
        ]);
        assert_eq!(parse("(a > 0 and b > 0 and c > 0) and (a < 5 and b < 5 and c < 5)"), expected);

        let unchanged = "a > 0 and b > 0 or a < 5 and b < 5";
        assert_eq!(parse(unchanged), raw(unchanged));
    }

    #[test]
    fn test_boolean_operators() {
        let expected = Query::or(vec![Query::eq("a", 1), Query::eq("b", 2)]);
        assert_eq!(parse("(a == 1) | (b == 2)"), expected);
        assert_eq!(parse("a == 1 or b == 2"), expected);
        let expected = Query::or(vec![Query::not_eq("a", 1), Query::not_eq("b", 2)]);
        assert_eq!(parse("a != 1 or b != 2"), expected);
        let expected = Query::and(vec![Query::eq("a", 1), Query::eq("b", 2)]);
        assert_eq!(parse("(a == 1) & (b == 2)"), expected);
        let expected = Query::difference(Query::eq("a", 1), Query::eq("b", 2));
        assert_eq!(parse("(a == 1) - (b == 2)"), expected);
        assert_eq!(raw("not a == 1"), !Query::eq("a", 1));
        assert_eq!(parse("not a == 1"), Query::not_eq("a", 1));
    }

    #[test]
    fn test_any_and_all() {
        let values = Term::list([1, 2, 3]);
        assert_eq!(parse("a == 1 or a == 2 or a == 3"), Query::any("a", values.clone()));
        assert_eq!(parse("a in any([1, 2, 3])"), Query::any("a", values.clone()));
        assert_eq!(parse("a in any(foo)"), Query::any("a", Term::name("foo")));
        let names = Term::List(vec![Term::name("foo"), Term::name("bar")]);
        assert_eq!(parse("a in any([foo, bar])"), Query::any("a", names));
        assert_eq!(parse("not(a == 1 or a == 2 or a == 3)"), Query::not_any("a", values.clone()));
        assert_eq!(parse("a not in any([1, 2, 3])"), Query::not_any("a", values.clone()));
        assert_eq!(parse("a == 1 and a == 2 and a == 3"), Query::all("a", values.clone()));
        assert_eq!(parse("a in all([1, 2, 3])"), Query::all("a", values.clone()));
        assert_eq!(parse("a not in all([1, 2, 3])"), Query::not_all("a", values));

        let expected = Query::or(vec![Query::eq("a", 1), Query::all("a", Term::list([2, 3]))]);
        assert_eq!(parse("a == 1 or a == 2 and a == 3"), expected);
    }

    #[test]
    fn test_display_round_trips() {
        for source in [
            "a == 1 or (b == 'x' and c > 2)",
            "0 < a <= 5",
            "not(0 <= a <= 5)",
            "'red' not in colors",
            "a in any([1, 2])",
            "(a == 1) - (b == foo)",
        ] {
            let query = raw(source);
            assert_eq!(raw(&query.to_string()), query, "{}", source);
        }
    }
}
