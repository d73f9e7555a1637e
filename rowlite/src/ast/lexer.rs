// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Lexer for the SQL dialect
//!
//! Keywords are not tokens of their own: every bare word becomes an
//! [`Token::Identifier`] and the parser matches keywords case-insensitively.
//! Delimited identifiers (`"name"` or `[name]`) are never keywords.
//!
//! Every parser function either consumes input or returns an error, and the
//! main loop refuses to continue if a token did not advance the input.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_until, take_while, take_while1},
    character::complete::{alpha1, alphanumeric1, char, digit1},
    combinator::{map, map_res, recognize},
    multi::many0,
    sequence::{pair, tuple},
    IResult,
};

/// Token types for SQL
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Identifier(String),
    QuotedIdentifier(String),
    String(String),
    Integer(i64),
    Float(f64),
    /// `?` positional parameter
    Parameter,
    Comma,
    Dot,
    Semicolon,
    LeftParen,
    RightParen,
    Star,
    Plus,
    Minus,
    Slash,
    Concat,
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    Whitespace,
    Comment,
}

impl Token {
    /// Case-insensitive keyword check; delimited identifiers never match
    pub fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Token::Identifier(word) if word.eq_ignore_ascii_case(keyword))
    }
}

fn token(input: &str) -> IResult<&str, Token> {
    alt((
        whitespace,
        map(comment, |_| Token::Comment),
        // Floats before integers so "1.5" is not split at the dot
        map(float_literal, Token::Float),
        map(integer_literal, Token::Integer),
        map(string_literal, Token::String),
        map(quoted_identifier, Token::QuotedIdentifier),
        map(bracket_identifier, |s| Token::QuotedIdentifier(s.to_string())),
        symbol,
        map(identifier, |s| Token::Identifier(s.to_string())),
    ))(input)
}

fn whitespace(input: &str) -> IResult<&str, Token> {
    map(take_while1(|c: char| c.is_whitespace()), |_| Token::Whitespace)(input)
}

/// `-- line` and `/* block */` comments
fn comment(input: &str) -> IResult<&str, &str> {
    alt((
        recognize(pair(tag("--"), take_while(|c| c != '\n'))),
        recognize(tuple((tag("/*"), take_until("*/"), tag("*/")))),
    ))(input)
}

/// Operators and punctuation, longest match first
fn symbol(input: &str) -> IResult<&str, Token> {
    alt((
        map(tag("||"), |_| Token::Concat),
        map(tag("<>"), |_| Token::NotEqual),
        map(tag("!="), |_| Token::NotEqual),
        map(tag("<="), |_| Token::LessEqual),
        map(tag(">="), |_| Token::GreaterEqual),
        map(char('<'), |_| Token::LessThan),
        map(char('>'), |_| Token::GreaterThan),
        map(char('='), |_| Token::Equal),
        map(char('?'), |_| Token::Parameter),
        map(char(','), |_| Token::Comma),
        map(char('.'), |_| Token::Dot),
        map(char(';'), |_| Token::Semicolon),
        map(char('('), |_| Token::LeftParen),
        map(char(')'), |_| Token::RightParen),
        map(char('*'), |_| Token::Star),
        map(char('+'), |_| Token::Plus),
        map(char('-'), |_| Token::Minus),
        map(char('/'), |_| Token::Slash),
    ))(input)
}

/// Content between `quote` characters where a doubled quote is an escape
fn quoted(quote: char) -> impl Fn(&str) -> IResult<&str, String> {
    move |input: &str| {
        let (rest, _) = char::<&str, nom::error::Error<&str>>(quote)(input)?;
        let mut value = String::new();
        let mut chars = rest.char_indices().peekable();
        while let Some((index, c)) = chars.next() {
            if c != quote {
                value.push(c);
                continue;
            }
            if let Some((_, next)) = chars.peek() {
                if *next == quote {
                    value.push(quote);
                    chars.next();
                    continue;
                }
            }
            return Ok((&rest[index + c.len_utf8()..], value));
        }
        Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Char,
        )))
    }
}

/// `'text'` with `''` as escaped quote
fn string_literal(input: &str) -> IResult<&str, String> {
    quoted('\'')(input)
}

/// `"Column Name"` with `""` as escaped quote
fn quoted_identifier(input: &str) -> IResult<&str, String> {
    quoted('"')(input)
}

/// `[Column Name]`
fn bracket_identifier(input: &str) -> IResult<&str, &str> {
    map(
        recognize(tuple((char('['), take_while(|c| c != ']'), char(']')))),
        |s: &str| &s[1..s.len() - 1],
    )(input)
}

fn integer_literal(input: &str) -> IResult<&str, i64> {
    map_res(digit1, |s: &str| s.parse::<i64>())(input)
}

fn float_literal(input: &str) -> IResult<&str, f64> {
    map_res(recognize(tuple((digit1, char('.'), digit1))), |s: &str| {
        s.parse::<f64>()
    })(input)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))(input)
}

/// Tokenize a SQL string, dropping whitespace and comments
pub fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut remaining = input;
    let mut tokens = Vec::new();

    while !remaining.is_empty() {
        match token(remaining) {
            Ok((next_remaining, token)) => {
                if next_remaining.len() == remaining.len() {
                    return Err(format!(
                        "Lexer did not advance at '{}'",
                        preview(remaining)
                    ));
                }
                if !matches!(token, Token::Whitespace | Token::Comment) {
                    tokens.push(token);
                }
                remaining = next_remaining;
            }
            Err(_) => {
                return Err(format!(
                    "Unexpected input at position {}: '{}'",
                    input.len() - remaining.len(),
                    preview(remaining)
                ));
            }
        }
    }

    Ok(tokens)
}

fn preview(input: &str) -> String {
    input.chars().take(20).collect()
}
