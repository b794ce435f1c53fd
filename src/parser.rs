//! S-expression parsing from source text.
//!
//! Produces the nested-list [`Value`] AST the evaluator consumes: numbers,
//! symbols, double-quoted text atoms (read as plain symbols, since the value
//! model has no distinct string type), `'expr` quote shorthand, and
//! parenthesized lists. `;` comments run to end of line. Parse errors carry
//! the 1-based row/column where they occurred, and unbalanced input is
//! classified as [`ParseErrorKind::Incomplete`] so a line-oriented driver can
//! keep buffering.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, multispace1},
    combinator::{cut, opt, recognize},
    error::ErrorKind,
    multi::{many0, separated_list0},
    sequence::pair,
};

use crate::MAX_PARSE_DEPTH;
use crate::ast::{NumberType, SYMBOL_SPECIAL_CHARS, Value, is_valid_symbol};
use crate::{ParseError, ParseErrorKind};

/// Compute the 1-based (line, column) of a byte offset in the input.
fn line_col(input: &str, offset: usize) -> (usize, usize) {
    let prefix = &input[..offset.min(input.len())];
    let line = prefix.chars().filter(|&c| c == '\n').count() + 1;
    let column = match prefix.rfind('\n') {
        Some(pos) => prefix[pos + 1..].chars().count() + 1,
        None => prefix.chars().count() + 1,
    };
    (line, column)
}

/// Convert a nom failure into a structured ParseError with location.
///
/// `input` is the full source the reported line/column are relative to; the
/// failure's own remaining-input slice locates the offset within it.
fn classify_error(input: &str, error: nom::Err<nom::error::Error<&str>>) -> ParseError {
    match error {
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            let offset = input.len().saturating_sub(e.input.len());
            let (line, column) = line_col(input, offset);

            if e.code == ErrorKind::TooLarge {
                return ParseError::new(
                    ParseErrorKind::TooDeeplyNested,
                    format!("expression too deeply nested (max depth: {MAX_PARSE_DEPTH})"),
                    line,
                    column,
                );
            }

            if e.input.trim_start().is_empty() {
                // Failed at end of input: the expression was cut short and
                // more input could complete it
                ParseError::new(
                    ParseErrorKind::Incomplete,
                    "unexpected end of input",
                    line,
                    column,
                )
            } else {
                let found: String = e.input.chars().take(10).collect();
                ParseError::new(
                    ParseErrorKind::InvalidSyntax,
                    format!("invalid syntax near '{found}'"),
                    line,
                    column,
                )
            }
        }
        nom::Err::Incomplete(_) => {
            let (line, column) = line_col(input, input.len());
            ParseError::new(ParseErrorKind::Incomplete, "incomplete input", line, column)
        }
    }
}

/// Whitespace and `;` line comments, zero or more
fn ws0(input: &str) -> IResult<&str, ()> {
    let (input, _) = many0(alt((multispace1, comment))).parse(input)?;
    Ok((input, ()))
}

/// A `;` comment running to end of line (exclusive of the newline)
fn comment(input: &str) -> IResult<&str, &str> {
    let (input, _) = char(';').parse(input)?;
    take_while(|c| c != '\n').parse(input)
}

/// Parse a number: optional sign, digits, optional fraction and exponent
fn parse_number(input: &str) -> IResult<&str, Value> {
    let (rest, number_str) = recognize(pair(
        opt(char('-')),
        pair(
            take_while1(|c: char| c.is_ascii_digit()),
            pair(
                opt(pair(char('.'), take_while1(|c: char| c.is_ascii_digit()))),
                opt(pair(
                    alt((char('e'), char('E'))),
                    pair(opt(alt((char('-'), char('+')))), take_while1(|c: char| c.is_ascii_digit())),
                )),
            ),
        ),
    ))
    .parse(input)?;

    // Reject forms like `123abc`: a number token must end at a delimiter
    if rest
        .chars()
        .next()
        .is_some_and(|c| c.is_alphanumeric() || SYMBOL_SPECIAL_CHARS.contains(c))
    {
        return Err(nom::Err::Error(nom::error::Error::new(
            rest,
            nom::error::ErrorKind::Digit,
        )));
    }

    match number_str.parse::<NumberType>() {
        Ok(n) => Ok((rest, Value::Number(n))),
        Err(_) => Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Digit,
        ))),
    }
}

/// Parse a symbol (identifier)
fn parse_symbol(input: &str) -> IResult<&str, Value> {
    let (remaining, candidate) =
        take_while1(|c: char| c.is_alphanumeric() || SYMBOL_SPECIAL_CHARS.contains(c))
            .parse(input)?;

    if is_valid_symbol(candidate) {
        Ok((remaining, Value::Symbol(candidate.into())))
    } else {
        Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Alpha,
        )))
    }
}

/// Parse a double-quoted text atom. The value model has no string type, so
/// the content is read as a symbol; this lets sources write tags containing
/// whitespace or arbitrary characters.
fn parse_quoted_text(input: &str) -> IResult<&str, Value> {
    let (remaining, _) = char('"').parse(input)?;
    match remaining.find('"') {
        Some(end) => Ok((
            &remaining[end + 1..],
            Value::Symbol(remaining[..end].to_owned()),
        )),
        // Unterminated: hard failure at end of input so drivers see Incomplete
        None => Err(nom::Err::Failure(nom::error::Error::new(
            &remaining[remaining.len()..],
            nom::error::ErrorKind::Char,
        ))),
    }
}

/// Parse a parenthesized list. The opening paren commits: a missing closing
/// paren is a hard failure (`cut`), not a fallthrough to other alternatives,
/// so the error `alt` reports points at the real problem.
fn parse_list(input: &str, depth: usize) -> IResult<&str, Value> {
    let (input, _) = char('(').parse(input)?;
    let (input, _) = ws0.parse(input)?;

    let (input, elements) =
        separated_list0(ws0, |input| parse_sexpr(input, depth + 1)).parse(input)?;

    let (input, _) = ws0.parse(input)?;
    let (input, _) = cut(char(')')).parse(input)?;

    Ok((input, Value::List(elements)))
}

/// Parse quote shorthand: 'expr reads as (quote expr). The quote character
/// commits; a missing quoted expression is a hard failure.
fn parse_quote(input: &str, depth: usize) -> IResult<&str, Value> {
    let (input, _) = char('\'').parse(input)?;
    let (input, expr) = cut(|input| parse_sexpr(input, depth + 1)).parse(input)?;
    Ok((
        input,
        Value::List(vec![Value::Symbol("quote".into()), expr]),
    ))
}

/// Parse a single S-expression with a depth ceiling
fn parse_sexpr(input: &str, depth: usize) -> IResult<&str, Value> {
    if depth >= MAX_PARSE_DEPTH {
        // Hard failure: must not be masked by sibling alternatives in `alt`
        return Err(nom::Err::Failure(nom::error::Error::new(
            input,
            nom::error::ErrorKind::TooLarge,
        )));
    }
    let (input, _) = ws0.parse(input)?;
    alt((
        |input| parse_quote(input, depth),
        |input| parse_list(input, depth),
        parse_number,
        parse_quoted_text,
        parse_symbol,
    ))
    .parse(input)
}

/// Parse exactly one top-level form from the input.
///
/// Trailing non-whitespace input is an error ([`ParseErrorKind::TrailingContent`]);
/// use [`parse_forms`] for multi-form sources.
pub fn parse_form(input: &str) -> Result<Value, ParseError> {
    match parse_sexpr(input, 0) {
        Ok((rest, value)) => {
            let (rest, ()) = ws0.parse(rest).unwrap_or((rest, ()));
            if rest.is_empty() {
                Ok(value)
            } else {
                let offset = input.len() - rest.len();
                let (line, column) = line_col(input, offset);
                Err(ParseError::new(
                    ParseErrorKind::TrailingContent,
                    format!("unexpected content after expression: '{}'", truncate(rest)),
                    line,
                    column,
                ))
            }
        }
        Err(e) => Err(classify_error(input, e)),
    }
}

/// Parse every top-level form in the input, in order.
///
/// An empty (or comment-only) source yields an empty Vec.
pub fn parse_forms(input: &str) -> Result<Vec<Value>, ParseError> {
    let mut forms = Vec::new();
    let mut rest = input;

    loop {
        let (after_ws, ()) = ws0.parse(rest).unwrap_or((rest, ()));
        if after_ws.is_empty() {
            return Ok(forms);
        }
        match parse_sexpr(after_ws, 0) {
            Ok((remaining, value)) => {
                forms.push(value);
                rest = remaining;
            }
            // The failure's remaining input is a suffix of the full source,
            // so locations come out relative to the full source directly
            Err(e) => return Err(classify_error(input, e)),
        }
    }
}

fn truncate(s: &str) -> String {
    s.chars().take(20).collect()
}
