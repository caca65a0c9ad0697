use std::fmt::Display;

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("input expression is empty")]
    #[diagnostic(
        code(algebra_eval::lex::empty_input),
        help("type an expression such as `2 * (x + 1)`")
    )]
    EmptyInput,

    #[error("failed to tokenize `{input}`")]
    #[diagnostic(
        code(algebra_eval::lex::tokenization),
        help("expressions are built from numbers, names, `+ - * / // % ^ !` and parentheses")
    )]
    Tokenization { input: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte range in the normalized input (see [`normalize`]).
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    LeftParen,
    RightParen,
    Plus,
    Minus,
    Star,
    Slash,
    SlashSlash,
    Percent,
    Caret,
    Bang,
    Number { literal: String, fractional: bool },
    Ident(String),
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::LeftParen => write!(f, "("),
            TokenKind::RightParen => write!(f, ")"),
            TokenKind::Plus => write!(f, "+"),
            TokenKind::Minus => write!(f, "-"),
            TokenKind::Star => write!(f, "*"),
            TokenKind::Slash => write!(f, "/"),
            TokenKind::SlashSlash => write!(f, "//"),
            TokenKind::Percent => write!(f, "%"),
            TokenKind::Caret => write!(f, "^"),
            TokenKind::Bang => write!(f, "!"),
            TokenKind::Number { literal, .. } => write!(f, "{literal}"),
            TokenKind::Ident(name) => write!(f, "{name}"),
        }
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lit = &self.kind;
        match &self.kind {
            TokenKind::LeftParen => write!(f, "LEFT_PAREN {lit} null"),
            TokenKind::RightParen => write!(f, "RIGHT_PAREN {lit} null"),
            TokenKind::Plus => write!(f, "PLUS {lit} null"),
            TokenKind::Minus => write!(f, "MINUS {lit} null"),
            TokenKind::Star => write!(f, "STAR {lit} null"),
            TokenKind::Slash => write!(f, "SLASH {lit} null"),
            TokenKind::SlashSlash => write!(f, "SLASH_SLASH {lit} null"),
            TokenKind::Percent => write!(f, "PERCENT {lit} null"),
            TokenKind::Caret => write!(f, "CARET {lit} null"),
            TokenKind::Bang => write!(f, "BANG {lit} null"),
            TokenKind::Number { fractional: true, .. } => write!(f, "NUMBER {lit} float"),
            TokenKind::Number { fractional: false, .. } => write!(f, "NUMBER {lit} int"),
            TokenKind::Ident(_) => write!(f, "IDENTIFIER {lit} null"),
        }
    }
}

/// Applies NFKC composition, turns non-breaking spaces into plain spaces,
/// drops zero-width spaces and trims the result.
///
/// Token spans are byte offsets into this string, so callers that want to
/// render diagnostics should attach it as the source code.
pub fn normalize(expression: &str) -> String {
    let composed: String = expression.nfkc().collect();
    composed
        .replace('\u{00A0}', " ")
        .replace('\u{200B}', "")
        .trim()
        .to_string()
}

/// Splits an expression into tokens.
///
/// Characters that start no token are skipped here; malformed input is
/// rejected by the parser instead. Numbers are ASCII digits after NFKC, so
/// digits from other scripts (`२`) are skipped too.
#[tracing::instrument(level = "debug", skip_all, fields(input_len = expression.len()))]
pub fn tokenize(expression: &str) -> Result<Vec<Token>, LexError> {
    let normalized = normalize(expression);
    if normalized.is_empty() {
        return Err(LexError::EmptyInput);
    }

    let tokens: Vec<Token> = Lexer::new(&normalized).collect();
    if tokens.is_empty() {
        return Err(LexError::Tokenization { input: normalized });
    }

    tracing::debug!(count = tokens.len(), "tokenized expression");
    Ok(tokens)
}

pub struct Lexer<'de> {
    rest: &'de str,
    byte: usize,
}

impl<'de> Lexer<'de> {
    pub fn new(input: &'de str) -> Self {
        Lexer {
            rest: input,
            byte: 0,
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let mut chars = self.rest.chars();
            let c = chars.next()?;
            let cur = self.rest;
            let start = self.byte;
            self.rest = chars.as_str();
            self.byte += c.len_utf8();

            enum Start {
                Slash,
                Ident,
                Number,
            }

            let process = |kind: TokenKind| {
                Some(Token {
                    kind,
                    span: SourceSpan::from(start..start + c.len_utf8()),
                })
            };

            let started = match c {
                '(' => return process(TokenKind::LeftParen),
                ')' => return process(TokenKind::RightParen),
                '+' => return process(TokenKind::Plus),
                '-' => return process(TokenKind::Minus),
                '*' => return process(TokenKind::Star),
                '%' => return process(TokenKind::Percent),
                '^' => return process(TokenKind::Caret),
                '!' => return process(TokenKind::Bang),
                '/' => Start::Slash,
                'a'..='z' | 'A'..='Z' => Start::Ident,
                '0'..='9' => Start::Number,
                c if c.is_whitespace() => continue,
                c => {
                    tracing::trace!(character = %c, offset = start, "skipping unrecognized character");
                    continue;
                }
            };

            match started {
                Start::Slash => {
                    if self.rest.starts_with('/') {
                        self.rest = &self.rest[1..];
                        self.byte += 1;
                        return Some(Token {
                            kind: TokenKind::SlashSlash,
                            span: SourceSpan::from(start..start + 2),
                        });
                    }
                    return process(TokenKind::Slash);
                }
                Start::Ident => {
                    let end = cur
                        .find(|c| !matches!(c, 'a'..='z' | 'A'..='Z' | '0'..='9' | '_'))
                        .unwrap_or(cur.len());

                    let extra_bytes = end - c.len_utf8();
                    self.byte += extra_bytes;
                    self.rest = &self.rest[extra_bytes..];

                    return Some(Token {
                        kind: TokenKind::Ident(cur[..end].to_ascii_lowercase()),
                        span: SourceSpan::from(start..start + end),
                    });
                }
                Start::Number => {
                    let digits = |s: &str| s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());

                    let mut end = digits(cur);
                    // "1." and "1.2.3" keep the dot out unless a digit follows it
                    let fractional = match cur[end..].strip_prefix('.') {
                        Some(fraction) if fraction.starts_with(|c: char| c.is_ascii_digit()) => {
                            end += 1 + digits(fraction);
                            true
                        }
                        _ => false,
                    };

                    let extra_bytes = end - c.len_utf8();
                    self.byte += extra_bytes;
                    self.rest = &self.rest[extra_bytes..];

                    return Some(Token {
                        kind: TokenKind::Number {
                            literal: cur[..end].to_string(),
                            fractional,
                        },
                        span: SourceSpan::from(start..start + end),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn texts(input: &str) -> Vec<String> {
        tokenize(input)
            .unwrap()
            .iter()
            .map(|token| token.kind.to_string())
            .collect()
    }

    #[test]
    fn splits_numbers_names_and_symbols() {
        assert_eq!(
            texts("3 + 4.5*x_1 // (2 % y)^2!"),
            vec![
                "3", "+", "4.5", "*", "x_1", "//", "(", "2", "%", "y", ")", "^", "2", "!"
            ]
        );
    }

    #[test]
    fn floor_division_beats_two_slashes() {
        let tokens = tokenize("7//2/3").unwrap();
        let kinds: Vec<_> = tokens.iter().map(|token| token.kind.clone()).collect();
        assert_eq!(kinds[1], TokenKind::SlashSlash);
        assert_eq!(kinds[3], TokenKind::Slash);
        assert_eq!(tokens[1].span, SourceSpan::from(1..3));
    }

    #[test]
    fn identifiers_are_lowercased() {
        assert_eq!(texts("SIN(X) + Pi + E"), vec!["sin", "(", "x", ")", "+", "pi", "+", "e"]);
    }

    #[test]
    fn number_literals_record_fractional_flag() {
        let tokens = tokenize("12 0.25").unwrap();
        assert_eq!(
            tokens[0].kind,
            TokenKind::Number {
                literal: "12".into(),
                fractional: false
            }
        );
        assert_eq!(
            tokens[1].kind,
            TokenKind::Number {
                literal: "0.25".into(),
                fractional: true
            }
        );
    }

    #[test]
    fn dots_without_digits_are_skipped() {
        assert_eq!(texts("1."), vec!["1"]);
        assert_eq!(texts("1.2.3"), vec!["1.2", "3"]);
    }

    #[test]
    fn unrecognized_characters_are_skipped() {
        assert_eq!(texts("2 $ 3 & _"), vec!["2", "3"]);
    }

    #[test]
    fn empty_and_blank_input_is_rejected() {
        assert_eq!(tokenize(""), Err(LexError::EmptyInput));
        assert_eq!(tokenize("   "), Err(LexError::EmptyInput));
        assert_eq!(tokenize("\u{00A0}\u{200B}\t"), Err(LexError::EmptyInput));
    }

    #[test]
    fn only_ascii_digits_start_numbers() {
        assert_eq!(texts("\u{0968} + 1"), vec!["+", "1"]);
        assert_eq!(
            tokenize("\u{0968}"),
            Err(LexError::Tokenization {
                input: "\u{0968}".into()
            })
        );
    }

    #[test]
    fn input_without_tokens_is_rejected() {
        assert_eq!(
            tokenize("@#$"),
            Err(LexError::Tokenization {
                input: "@#$".into()
            })
        );
    }

    #[test]
    fn normalization_handles_special_spaces() {
        assert_eq!(normalize("\u{200B} 1\u{00A0}+\u{200B}2 "), "1 +2");
        // fullwidth digits compose to ASCII under NFKC
        assert_eq!(texts("\u{FF13}+1"), vec!["3", "+", "1"]);
    }

    #[test]
    fn spans_point_into_normalized_input() {
        let tokens = tokenize("  sin(10)").unwrap();
        assert_eq!(tokens[0].span, SourceSpan::from(0..3));
        assert_eq!(tokens[2].span, SourceSpan::from(4..6));
    }

    #[test]
    fn display_lists_token_kinds() {
        let lines: Vec<String> = tokenize("x + 1.5")
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            lines,
            vec!["IDENTIFIER x null", "PLUS + null", "NUMBER 1.5 float"]
        );
    }
}
