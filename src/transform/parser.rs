//! Expression parser
//!
//! Recursive-descent grammar over the arithmetic subset, with the usual
//! precedence: `^` (right-associative) binds tighter than unary minus,
//! then `* / %`, then `+ -`.
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := unary (('*' | '/' | '%') unary)*
//! unary  := '-' unary | power
//! power  := atom ('^' unary)?
//! atom   := number | name '(' expr (',' expr)* ')' | 'x' | '(' expr ')'
//! ```
//!
//! Anything outside this grammar is rejected; unknown identifiers are a
//! parse error, not a lookup into any environment.

use nom::{
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, digit1, multispace0},
    combinator::{map, map_res, opt, recognize},
    multi::{fold_many0, separated_list1},
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

use crate::transform::ast::{BinOp, Expr, Func};

/// Parse a complete expression string
pub fn parse(input: &str) -> Result<Expr, String> {
    match expr(input) {
        Ok((rest, ast)) => {
            if rest.trim().is_empty() {
                Ok(ast)
            } else {
                Err(format!(
                    "unexpected input after expression: '{}'",
                    rest.trim()
                ))
            }
        }
        Err(e) => Err(format!("parse error: {e}")),
    }
}

fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn expr(input: &str) -> IResult<&str, Expr> {
    let (input, init) = term(input)?;
    fold_many0(
        pair(ws(alt((char('+'), char('-')))), term),
        move || init.clone(),
        |lhs, (op, rhs)| {
            let op = if op == '+' { BinOp::Add } else { BinOp::Sub };
            Expr::binary(op, lhs, rhs)
        },
    )(input)
}

fn term(input: &str) -> IResult<&str, Expr> {
    let (input, init) = unary(input)?;
    fold_many0(
        pair(ws(alt((char('*'), char('/'), char('%')))), unary),
        move || init.clone(),
        |lhs, (op, rhs)| {
            let op = match op {
                '*' => BinOp::Mul,
                '/' => BinOp::Div,
                _ => BinOp::Rem,
            };
            Expr::binary(op, lhs, rhs)
        },
    )(input)
}

fn unary(input: &str) -> IResult<&str, Expr> {
    alt((map(preceded(ws(char('-')), unary), Expr::neg), power))(input)
}

fn power(input: &str) -> IResult<&str, Expr> {
    let (input, base) = atom(input)?;
    let (input, exponent) = opt(preceded(ws(char('^')), unary))(input)?;
    Ok((
        input,
        match exponent {
            Some(e) => Expr::binary(BinOp::Pow, base, e),
            None => base,
        },
    ))
}

fn atom(input: &str) -> IResult<&str, Expr> {
    ws(alt((
        number,
        name,
        delimited(char('('), expr, char(')')),
    )))(input)
}

/// Unsigned numeric literal; signs are handled by the unary rule
fn number(input: &str) -> IResult<&str, Expr> {
    map_res(
        recognize(tuple((
            digit1,
            opt(pair(char('.'), digit1)),
            opt(tuple((
                alt((char('e'), char('E'))),
                opt(alt((char('+'), char('-')))),
                digit1,
            ))),
        ))),
        |s: &str| s.parse::<f64>().map(Expr::Number),
    )(input)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))(input)
}

/// The free variable `x` or an allowlisted function call
fn name(input: &str) -> IResult<&str, Expr> {
    let (rest, ident) = identifier(input)?;
    if ident == "x" {
        return Ok((rest, Expr::Var));
    }
    let Some(func) = Func::from_name(ident) else {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Verify,
        )));
    };
    let (rest, args) = delimited(
        ws(char('(')),
        separated_list1(ws(char(',')), expr),
        char(')'),
    )(rest)?;
    if args.len() != func.arity() {
        return Err(nom::Err::Failure(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Verify,
        )));
    }
    Ok((rest, Expr::Call(func, args)))
}
