use crate::{
    eval::EvalError,
    number::{self, Number},
    parse::{Atom, Expr, Op},
};

/// Folds constant subtrees and rewrites `a + a` to `2 * a` and `a - a` to `0`.
///
/// Returns a new tree; the input is left untouched. Folding uses the
/// evaluator's operator semantics, so a literal zero divisor fails here too.
/// Function calls are never folded.
#[tracing::instrument(level = "debug", skip_all)]
pub fn simplify(expr: &Expr) -> Result<Expr, EvalError> {
    let simplified = merge_expr(expr)?;
    tracing::debug!(%simplified, "simplified expression");
    Ok(simplified)
}

fn merge_expr(input: &Expr) -> Result<Expr, EvalError> {
    Ok(match input {
        Expr::Atom(atom) => Expr::Atom(atom.clone()),
        Expr::Cons(op, operands) => {
            let operands = operands
                .iter()
                .map(merge_expr)
                .collect::<Result<Vec<_>, _>>()?;
            match (op, operands.as_slice()) {
                (
                    op,
                    [
                        Expr::Atom(Atom::Number(lhs)),
                        Expr::Atom(Atom::Number(rhs)),
                    ],
                ) => {
                    let folded = number::apply_binary(*op, lhs, rhs)?;
                    tracing::trace!(%lhs, %op, %rhs, %folded, "folded constant");
                    Expr::number(folded)
                }
                (Op::Plus, [lhs, rhs]) if lhs == rhs => Expr::binary(Op::Star, Expr::number(2), rhs.clone()),
                (Op::Minus, [lhs, rhs]) if lhs == rhs => Expr::number(0),

                (Op::Bang, [Expr::Atom(Atom::Number(value @ Number::Int(_)))]) => {
                    Expr::number(number::factorial(value)?)
                }
                (Op::Plus, [Expr::Atom(Atom::Number(value))]) => Expr::number(value.clone()),
                (Op::Minus, [Expr::Atom(Atom::Number(value))]) => Expr::number(-value.clone()),

                _ => Expr::Cons(*op, operands),
            }
        }
        Expr::Call { function, argument } => Expr::Call {
            function: function.clone(),
            argument: Box::new(merge_expr(argument)?),
        },
    })
}
