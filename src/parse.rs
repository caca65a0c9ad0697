use std::fmt::Display;

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

use crate::{
    lex::{Token, TokenKind},
    number::Number,
};

#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unmatched parenthesis: {detail}")]
    #[diagnostic(
        code(algebra_eval::parse::unmatched_parenthesis),
        help("every `(` needs a matching `)`")
    )]
    UnmatchedParenthesis {
        detail: String,
        #[label("this parenthesis")]
        span: SourceSpan,
    },

    #[error("unexpected token '{token}' while parsing a term")]
    #[diagnostic(
        code(algebra_eval::parse::unexpected_token),
        help("a term is a number, a name, a function call, a parenthesized expression or a signed term")
    )]
    UnexpectedToken {
        token: String,
        #[label("cannot start a term")]
        span: SourceSpan,
    },

    #[error("unexpected end of input while parsing a term")]
    #[diagnostic(
        code(algebra_eval::parse::unexpected_end_of_input),
        help("the expression ends after an operator or an opening parenthesis")
    )]
    UnexpectedEndOfInput {
        #[label("expected a term after this")]
        span: SourceSpan,
    },

    #[error("extra tokens remaining after parse: {leftover:?}")]
    #[diagnostic(
        code(algebra_eval::parse::trailing_tokens),
        help("join the terms with an operator, e.g. `2 * 3`")
    )]
    TrailingTokens {
        leftover: Vec<String>,
        #[label("not part of the expression")]
        span: SourceSpan,
    },
}

/// Expression tree.
///
/// Binary operators carry `[lhs, rhs]`; prefix `+`/`-` and postfix `!` carry
/// exactly `[operand]`.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Atom(Atom),
    Cons(Op, Vec<Expr>),
    Call {
        function: String,
        argument: Box<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Atom {
    Number(Number),
    Ident(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Plus,
    Minus,
    Star,
    Slash,
    SlashSlash,
    Percent,
    Caret,
    Bang,
}

impl Op {
    pub fn symbol(self) -> &'static str {
        match self {
            Op::Plus => "+",
            Op::Minus => "-",
            Op::Star => "*",
            Op::Slash => "/",
            Op::SlashSlash => "//",
            Op::Percent => "%",
            Op::Caret => "^",
            Op::Bang => "!",
        }
    }

    fn from_token(kind: &TokenKind) -> Option<Op> {
        Some(match kind {
            TokenKind::Plus => Op::Plus,
            TokenKind::Minus => Op::Minus,
            TokenKind::Star => Op::Star,
            TokenKind::Slash => Op::Slash,
            TokenKind::SlashSlash => Op::SlashSlash,
            TokenKind::Percent => Op::Percent,
            TokenKind::Caret => Op::Caret,
            TokenKind::Bang => Op::Bang,
            _ => return None,
        })
    }
}

impl Expr {
    pub fn number(value: impl Into<Number>) -> Self {
        Expr::Atom(Atom::Number(value.into()))
    }

    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Atom(Atom::Ident(name.into()))
    }

    pub fn binary(op: Op, lhs: Expr, rhs: Expr) -> Self {
        Expr::Cons(op, vec![lhs, rhs])
    }

    pub fn unary(op: Op, operand: Expr) -> Self {
        Expr::Cons(op, vec![operand])
    }

    pub fn call(function: impl Into<String>, argument: Expr) -> Self {
        Expr::Call {
            function: function.into(),
            argument: Box::new(argument),
        }
    }
}

impl Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl Display for Atom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Atom::Number(n) => write!(f, "{n}"),
            Atom::Ident(name) => write!(f, "{name}"),
        }
    }
}

/// Fully parenthesized infix form, e.g. `((3 + 5) * 2)` or `(-x)`.
impl Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Atom(atom) => write!(f, "{atom}"),
            Expr::Cons(op, operands) => match (op, operands.as_slice()) {
                (Op::Bang, [operand]) => write!(f, "({operand}!)"),
                (op, [operand]) => write!(f, "({op}{operand})"),
                (op, [lhs, rhs]) => write!(f, "({lhs} {op} {rhs})"),
                (op, operands) => {
                    write!(f, "({op}")?;
                    for operand in operands {
                        write!(f, " {operand}")?;
                    }
                    write!(f, ")")
                }
            },
            Expr::Call { function, argument } => write!(f, "{function}({argument})"),
        }
    }
}

/// Recursive-descent parser over a token slice.
///
/// Each parser owns its cursor, so several parsers can read the same tokens
/// at once.
pub struct Parser<'t> {
    tokens: &'t [Token],
    cursor: usize,
    depth: usize,
}

impl<'t> Parser<'t> {
    pub fn new(tokens: &'t [Token]) -> Self {
        Parser {
            tokens,
            cursor: 0,
            depth: 0,
        }
    }

    pub fn parse(mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_additive()?;

        let leftover = &self.tokens[self.cursor..];
        if let (Some(first), Some(last)) = (leftover.first(), leftover.last()) {
            if first.kind == TokenKind::RightParen {
                return Err(ParseError::UnmatchedParenthesis {
                    detail: "`)` has no matching `(`".into(),
                    span: first.span,
                });
            }
            return Err(ParseError::TrailingTokens {
                leftover: leftover.iter().map(|token| token.kind.to_string()).collect(),
                span: SourceSpan::from(first.span.offset()..last.span.offset() + last.span.len()),
            });
        }

        Ok(expr)
    }

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.cursor)
    }

    fn advance(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.cursor)?;
        self.cursor += 1;
        Some(token)
    }

    /// Consumes the next token if it is one of `allowed`.
    fn eat_op(&mut self, allowed: &[Op]) -> Option<Op> {
        let op = Op::from_token(&self.peek()?.kind).filter(|op| allowed.contains(op))?;
        self.cursor += 1;
        Some(op)
    }

    fn end_of_input(&self) -> ParseError {
        let end = self
            .tokens
            .last()
            .map_or(0, |token| token.span.offset() + token.span.len());
        ParseError::UnexpectedEndOfInput {
            span: SourceSpan::from((end, 0)),
        }
    }

    fn expect_close(&mut self, open: &Token, detail: impl FnOnce() -> String) -> Result<(), ParseError> {
        match self.peek() {
            Some(Token {
                kind: TokenKind::RightParen,
                ..
            }) => {
                self.cursor += 1;
                self.depth -= 1;
                Ok(())
            }
            _ => Err(ParseError::UnmatchedParenthesis {
                detail: detail(),
                span: open.span,
            }),
        }
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_multiplicative()?;
        while let Some(op) = self.eat_op(&[Op::Plus, Op::Minus]) {
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_power_or_factorial()?;
        while let Some(op) = self.eat_op(&[Op::Star, Op::Slash, Op::Percent, Op::SlashSlash]) {
            let rhs = self.parse_power_or_factorial()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_power_or_factorial(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_atom()?;
        while let Some(op) = self.eat_op(&[Op::Caret, Op::Bang]) {
            expr = match op {
                Op::Bang => Expr::unary(op, expr),
                _ => {
                    let exponent = self.parse_atom()?;
                    Expr::binary(op, expr, exponent)
                }
            };
        }
        Ok(expr)
    }

    fn parse_atom(&mut self) -> Result<Expr, ParseError> {
        let Some(token) = self.advance() else {
            return Err(self.end_of_input());
        };

        match &token.kind {
            TokenKind::Number {
                literal,
                fractional,
            } => Number::from_literal(literal, *fractional)
                .map(Expr::number)
                .ok_or_else(|| ParseError::UnexpectedToken {
                    token: literal.clone(),
                    span: token.span,
                }),

            TokenKind::Ident(name) => match self.peek() {
                Some(open) if open.kind == TokenKind::LeftParen => {
                    self.cursor += 1;
                    self.depth += 1;
                    let argument = self.parse_additive()?;
                    self.expect_close(open, || {
                        format!("function `{name}` is missing its closing `)`")
                    })?;
                    Ok(Expr::call(name.clone(), argument))
                }
                _ => Ok(Expr::ident(name.clone())),
            },

            TokenKind::LeftParen => {
                self.depth += 1;
                let inner = self.parse_additive()?;
                self.expect_close(token, || "`(` is never closed".into())?;
                Ok(inner)
            }

            TokenKind::Plus | TokenKind::Minus => {
                let op = if token.kind == TokenKind::Plus {
                    Op::Plus
                } else {
                    Op::Minus
                };
                let operand = self.parse_atom()?;
                Ok(Expr::unary(op, operand))
            }

            TokenKind::RightParen if self.depth == 0 => Err(ParseError::UnmatchedParenthesis {
                detail: "`)` has no matching `(`".into(),
                span: token.span,
            }),

            kind => Err(ParseError::UnexpectedToken {
                token: kind.to_string(),
                span: token.span,
            }),
        }
    }
}

/// Builds an expression tree from tokens.
#[tracing::instrument(level = "debug", skip_all, fields(tokens = tokens.len()))]
pub fn parse(tokens: &[Token]) -> Result<Expr, ParseError> {
    let expr = Parser::new(tokens).parse()?;
    tracing::debug!(%expr, "parsed expression");
    Ok(expr)
}
