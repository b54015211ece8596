use std::fmt;

use crate::{expr::ExprError, utils::operator::CompOperator};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Ident(String),
    Number(f64),
    Str(String),
    True,
    False,
    And,
    Or,
    Not,
    In,
    LParen,
    RParen,
    Comma,
    Plus,
    Minus,
    Star,
    Slash,
    Cmp(CompOperator),
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Ident(name) => f.write_str(name),
            TokenKind::Number(n) => write!(f, "{n}"),
            TokenKind::Str(s) => write!(f, "'{s}'"),
            TokenKind::True => f.write_str("true"),
            TokenKind::False => f.write_str("false"),
            TokenKind::And => f.write_str("and"),
            TokenKind::Or => f.write_str("or"),
            TokenKind::Not => f.write_str("not"),
            TokenKind::In => f.write_str("in"),
            TokenKind::LParen => f.write_str("("),
            TokenKind::RParen => f.write_str(")"),
            TokenKind::Comma => f.write_str(","),
            TokenKind::Plus => f.write_str("+"),
            TokenKind::Minus => f.write_str("-"),
            TokenKind::Star => f.write_str("*"),
            TokenKind::Slash => f.write_str("/"),
            TokenKind::Cmp(op) => write!(f, "{op}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub pos: usize,
}

pub(crate) fn tokenize(input: &str) -> Result<Vec<Token>, ExprError> {
    let chars: Vec<(usize, char)> = input.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (pos, ch) = chars[i];
        let next = chars.get(i + 1).map(|&(_, c)| c);
        let mut push = |kind: TokenKind, width: usize| {
            tokens.push(Token { kind, pos });
            width
        };

        i += match ch {
            c if c.is_whitespace() => 1,
            '(' => push(TokenKind::LParen, 1),
            ')' => push(TokenKind::RParen, 1),
            ',' => push(TokenKind::Comma, 1),
            '+' => push(TokenKind::Plus, 1),
            '-' => push(TokenKind::Minus, 1),
            '*' => push(TokenKind::Star, 1),
            '/' => push(TokenKind::Slash, 1),
            '&' if next == Some('&') => push(TokenKind::And, 2),
            '&' => push(TokenKind::And, 1),
            '|' if next == Some('|') => push(TokenKind::Or, 2),
            '|' => push(TokenKind::Or, 1),
            '!' if next == Some('=') => push(TokenKind::Cmp(CompOperator::Ne), 2),
            '!' => push(TokenKind::Not, 1),
            '=' if next == Some('=') => push(TokenKind::Cmp(CompOperator::Eq), 2),
            '=' => push(TokenKind::Cmp(CompOperator::Eq), 1),
            '<' if next == Some('=') => push(TokenKind::Cmp(CompOperator::Lte), 2),
            '<' if next == Some('>') => push(TokenKind::Cmp(CompOperator::Ne), 2),
            '<' => push(TokenKind::Cmp(CompOperator::Lt), 1),
            '>' if next == Some('=') => push(TokenKind::Cmp(CompOperator::Gte), 2),
            '>' => push(TokenKind::Cmp(CompOperator::Gt), 1),
            '\'' | '"' => {
                let (literal, width) = read_string(&chars[i..], ch, pos)?;
                push(TokenKind::Str(literal), width)
            }
            '`' => {
                let (name, width) = read_string(&chars[i..], '`', pos)?;
                push(TokenKind::Ident(name), width)
            }
            c if c.is_ascii_digit() || (c == '.' && next.is_some_and(|n| n.is_ascii_digit())) => {
                let width = scan(&chars[i..], |c| c.is_ascii_digit() || c == '.');
                let literal: String = chars[i..i + width].iter().map(|&(_, c)| c).collect();
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| ExprError::InvalidNumber {
                        literal: literal.clone(),
                        pos,
                    })?;
                push(TokenKind::Number(value), width)
            }
            c if c.is_alphabetic() || c == '_' => {
                let width = scan(&chars[i..], |c| c.is_alphanumeric() || c == '_' || c == '.');
                let word: String = chars[i..i + width].iter().map(|&(_, c)| c).collect();
                push(keyword(word), width)
            }
            c => return Err(ExprError::UnexpectedChar { ch: c, pos }),
        };
    }
    Ok(tokens)
}

fn keyword(word: String) -> TokenKind {
    match word.to_ascii_lowercase().as_str() {
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "not" => TokenKind::Not,
        "in" => TokenKind::In,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        _ => TokenKind::Ident(word),
    }
}

fn scan(chars: &[(usize, char)], accept: impl Fn(char) -> bool) -> usize {
    chars.iter().take_while(|&&(_, c)| accept(c)).count()
}

/// Reads a quoted run starting at `chars[0]`. A backslash escapes the next
/// character. Returns the content and the consumed width.
fn read_string(
    chars: &[(usize, char)],
    quote: char,
    pos: usize,
) -> Result<(String, usize), ExprError> {
    let mut out = String::new();
    let mut i = 1;
    while i < chars.len() {
        match chars[i].1 {
            '\\' if i + 1 < chars.len() => {
                out.push(chars[i + 1].1);
                i += 2;
            }
            c if c == quote => return Ok((out, i + 1)),
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    Err(ExprError::UnterminatedString { pos })
}
