//! Tokenize, parse, simplify and evaluate algebraic expressions.
//!
//! ```
//! use algebra_eval::{AngleMode, Bindings, Number, evaluate, parse, simplify, tokenize};
//!
//! let tokens = tokenize("x * (3 + 5)")?;
//! let tree = simplify(&parse(&tokens)?)?;
//! assert_eq!(tree.to_string(), "(x * 8)");
//!
//! let bindings: Bindings = [("x", 2)].into_iter().collect();
//! assert_eq!(evaluate(&tree, &bindings, AngleMode::Degrees)?, Number::from(16));
//! # Ok::<(), algebra_eval::Error>(())
//! ```
//!
//! Every stage recurses over the tree, so nesting depth is bounded by the
//! thread's stack (a few thousand levels on a default main thread). [`walk`]
//! is iterative.

use std::collections::BTreeSet;

use miette::Diagnostic;
use thiserror::Error;

pub mod eval;
pub mod history;
pub mod lex;
pub mod number;
pub mod parse;
pub mod simplify;
pub mod walk;

pub use eval::{AngleMode, Bindings, EvalError, evaluate};
pub use history::History;
pub use lex::{LexError, Lexer, Token, TokenKind, tokenize};
pub use number::Number;
pub use parse::{Atom, Expr, Op, ParseError, Parser, parse};
pub use simplify::simplify;
pub use walk::{NodeValue, Visit, Walk, free_variables, intermediate_representation};

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Eval(#[from] EvalError),
}

/// The output of every stage up to simplification, kept for display.
#[derive(Debug, Clone)]
pub struct Pipeline {
    /// Normalized input; token spans index into it.
    pub source: String,
    pub tokens: Vec<Token>,
    pub tree: Expr,
    pub simplified: Expr,
}

impl Pipeline {
    pub fn new(expression: &str) -> Result<Self, Error> {
        let source = lex::normalize(expression);
        let tokens = tokenize(&source)?;
        let tree = parse(&tokens)?;
        let simplified = simplify(&tree)?;
        Ok(Pipeline {
            source,
            tokens,
            tree,
            simplified,
        })
    }

    /// Variables the simplified tree still needs.
    pub fn free_variables(&self) -> BTreeSet<String> {
        free_variables(&self.simplified)
    }

    pub fn evaluate(&self, bindings: &Bindings, angle_mode: AngleMode) -> Result<Number, EvalError> {
        evaluate(&self.simplified, bindings, angle_mode)
    }
}
