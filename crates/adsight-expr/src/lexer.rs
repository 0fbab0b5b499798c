//! Tokenizer for metric expressions.

use std::fmt;

use crate::error::{ExprError, Result};

/// A lexical token.
#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    /// Numeric literal, e.g. `100`, `0.5` or `1e3`.
    Number(f64),
    /// Field or function name.
    Ident(String),
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `,`
    Comma,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "number {n}"),
            Token::Ident(name) => write!(f, "identifier '{name}'"),
            Token::Plus => write!(f, "'+'"),
            Token::Minus => write!(f, "'-'"),
            Token::Star => write!(f, "'*'"),
            Token::Slash => write!(f, "'/'"),
            Token::LParen => write!(f, "'('"),
            Token::RParen => write!(f, "')'"),
            Token::Comma => write!(f, "','"),
        }
    }
}

/// A token and the byte offset where it starts.
#[derive(Clone, Debug, PartialEq)]
pub struct Spanned {
    /// The token
    pub token: Token,
    /// Byte offset in the source
    pub offset: usize,
}

/// Split `input` into tokens, skipping whitespace.
pub fn tokenize(input: &str) -> Result<Vec<Spanned>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(offset, ch)) = chars.peek() {
        let token = match ch {
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            c if c.is_ascii_digit() || c == '.' => {
                let mut end = scan_while(&mut chars, |c| c.is_ascii_digit() || c == '.');
                if let Some(exp_end) = exponent_end(input, end) {
                    while chars.next_if(|&(i, _)| i < exp_end).is_some() {}
                    end = exp_end;
                }
                let text = &input[offset..end];
                let value = text.parse::<f64>().map_err(|_| ExprError::InvalidNumber {
                    text: text.to_string(),
                    offset,
                })?;
                tokens.push(Spanned {
                    token: Token::Number(value),
                    offset,
                });
                continue;
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let end = scan_while(&mut chars, |c| c.is_ascii_alphanumeric() || c == '_');
                tokens.push(Spanned {
                    token: Token::Ident(input[offset..end].to_string()),
                    offset,
                });
                continue;
            }
            other => return Err(ExprError::UnexpectedChar { ch: other, offset }),
        };
        chars.next();
        tokens.push(Spanned { token, offset });
    }

    Ok(tokens)
}

/// Consume characters while `accept` holds; returns the end byte offset.
fn scan_while<I>(chars: &mut std::iter::Peekable<I>, accept: impl Fn(char) -> bool) -> usize
where
    I: Iterator<Item = (usize, char)>,
{
    let mut end = 0;
    while let Some(&(offset, c)) = chars.peek() {
        if !accept(c) {
            return offset;
        }
        end = offset + c.len_utf8();
        chars.next();
    }
    end
}

/// End offset of an `e`/`E` exponent beginning at `start`, if one is there.
///
/// The marker needs at least one digit after the optional sign, so `2e` and
/// `2*e` keep `e` as an identifier.
fn exponent_end(input: &str, start: usize) -> Option<usize> {
    let bytes = input.as_bytes();
    if !matches!(bytes.get(start), Some(b'e' | b'E')) {
        return None;
    }
    let mut end = start + 1;
    if matches!(bytes.get(end), Some(b'+' | b'-')) {
        end += 1;
    }
    let digits = bytes[end..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    (digits > 0).then_some(end + digits)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn test_tokenize_arithmetic() {
        assert_eq!(
            kinds("a + 2.5*(b-c)/d"),
            vec![
                Token::Ident("a".into()),
                Token::Plus,
                Token::Number(2.5),
                Token::Star,
                Token::LParen,
                Token::Ident("b".into()),
                Token::Minus,
                Token::Ident("c".into()),
                Token::RParen,
                Token::Slash,
                Token::Ident("d".into()),
            ]
        );
    }

    #[test]
    fn test_tokenize_function_call() {
        assert_eq!(
            kinds("SAFE_DIVIDE( revenue ,spend )"),
            vec![
                Token::Ident("SAFE_DIVIDE".into()),
                Token::LParen,
                Token::Ident("revenue".into()),
                Token::Comma,
                Token::Ident("spend".into()),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn test_tokenize_offsets() {
        let tokens = tokenize("  ab +  7").unwrap();
        let offsets: Vec<usize> = tokens.iter().map(|t| t.offset).collect();
        assert_eq!(offsets, vec![2, 5, 8]);
    }

    #[test]
    fn test_tokenize_leading_dot_number() {
        assert_eq!(kinds(".5"), vec![Token::Number(0.5)]);
    }

    #[test]
    fn test_tokenize_exponent_numbers() {
        assert_eq!(kinds("1e3"), vec![Token::Number(1000.0)]);
        assert_eq!(kinds("2.5E-2"), vec![Token::Number(0.025)]);
        assert_eq!(
            kinds("4e+1*x"),
            vec![
                Token::Number(40.0),
                Token::Star,
                Token::Ident("x".into()),
            ]
        );
    }

    #[test]
    fn test_tokenize_bare_e_stays_identifier() {
        assert_eq!(
            kinds("2e"),
            vec![Token::Number(2.0), Token::Ident("e".into())]
        );
        assert_eq!(
            kinds("3e-x"),
            vec![
                Token::Number(3.0),
                Token::Ident("e".into()),
                Token::Minus,
                Token::Ident("x".into()),
            ]
        );
    }

    #[test]
    fn test_tokenize_invalid_number() {
        let err = tokenize("1.2.3").unwrap_err();
        assert!(matches!(err, ExprError::InvalidNumber { ref text, offset: 0 } if text == "1.2.3"));
        let err = tokenize("1e5.2.3").unwrap_err();
        assert!(matches!(err, ExprError::InvalidNumber { offset: 3, .. }));
    }

    #[test]
    fn test_tokenize_rejects_foreign_characters() {
        let cases = [
            ("a # b", '#'),
            ("x = 1", '='),
            ("'str'", '\''),
            ("a > b", '>'),
        ];
        for (input, ch) in cases {
            let err = tokenize(input).unwrap_err();
            assert!(
                matches!(err, ExprError::UnexpectedChar { ch: c, .. } if c == ch),
                "{input}"
            );
        }
    }

    #[test]
    fn test_tokenize_empty() {
        assert!(tokenize("   ").unwrap().is_empty());
    }
}
