//! Read-only traversal of expression trees.
//!
//! [`Walk`] yields every node in pre-order together with its parent and
//! depth. Rendering code (the intermediate representation below, the REPL's
//! variable prompts) is built on top of it instead of recursing over
//! [`Expr`] directly.

use std::{collections::BTreeSet, fmt::Display};

use crate::{
    eval,
    number::Number,
    parse::{Atom, Expr, Op},
};

/// What a node holds, independent of how the tree stores it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeValue<'a> {
    Number(&'a Number),
    Variable(&'a str),
    Operator(Op),
    Function(&'a str),
}

impl Display for NodeValue<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeValue::Number(n) => write!(f, "{n}"),
            NodeValue::Variable(name) | NodeValue::Function(name) => write!(f, "{name}"),
            NodeValue::Operator(op) => write!(f, "{op}"),
        }
    }
}

impl Expr {
    pub fn value(&self) -> NodeValue<'_> {
        match self {
            Expr::Atom(Atom::Number(n)) => NodeValue::Number(n),
            Expr::Atom(Atom::Ident(name)) => NodeValue::Variable(name),
            Expr::Cons(op, _) => NodeValue::Operator(*op),
            Expr::Call { function, .. } => NodeValue::Function(function),
        }
    }

    pub fn children(&self) -> &[Expr] {
        match self {
            Expr::Atom(_) => &[],
            Expr::Cons(_, operands) => operands.as_slice(),
            Expr::Call { argument, .. } => std::slice::from_ref(argument.as_ref()),
        }
    }

    pub fn walk(&self) -> Walk<'_> {
        Walk {
            stack: vec![Visit {
                node: self,
                parent: None,
                depth: 0,
            }],
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Visit<'a> {
    pub node: &'a Expr,
    pub parent: Option<&'a Expr>,
    pub depth: usize,
}

/// Pre-order iterator over a tree. Uses an explicit stack, so deep trees
/// do not recurse.
#[derive(Debug, Clone)]
pub struct Walk<'a> {
    stack: Vec<Visit<'a>>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = Visit<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let visit = self.stack.pop()?;
        self.stack
            .extend(visit.node.children().iter().rev().map(|child| Visit {
                node: child,
                parent: Some(visit.node),
                depth: visit.depth + 1,
            }));
        Some(visit)
    }
}

/// One line per node in pre-order, indented two spaces per level:
///
/// ```text
/// *
///   2
///   x
/// ```
pub fn intermediate_representation(expr: &Expr) -> String {
    expr.walk()
        .map(|visit| format!("{:indent$}{}\n", "", visit.node.value(), indent = visit.depth * 2))
        .collect()
}

/// Variables a caller has to bind before evaluating `expr`, sorted.
/// Constants and function names are never reported.
pub fn free_variables(expr: &Expr) -> BTreeSet<String> {
    expr.walk()
        .filter_map(|visit| match visit.node.value() {
            NodeValue::Variable(name)
                if !eval::is_function(name) && !eval::CONSTANTS.contains(&name) =>
            {
                Some(name.to_string())
            }
            _ => None,
        })
        .collect()
}
