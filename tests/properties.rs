//! Property-based tests for simplification and tree rendering.
//!
//! Generated trees check that:
//! 1. Folding a literal pair gives the same result as evaluating it.
//! 2. Simplification is idempotent.
//! 3. The intermediate representation depends only on the tree.

use algebra_eval::{
    AngleMode, Bindings, Expr, Number, Op, evaluate, free_variables, intermediate_representation,
    simplify,
};
use proptest::prelude::*;

const BINARY: [Op; 7] = [
    Op::Plus,
    Op::Minus,
    Op::Star,
    Op::Slash,
    Op::SlashSlash,
    Op::Percent,
    Op::Caret,
];

fn number_strategy() -> impl Strategy<Value = Number> {
    prop_oneof![
        (-100i64..100).prop_map(Number::from),
        (-100.0f64..100.0).prop_map(Number::Float),
        Just(Number::from(0)),
        Just(Number::Float(0.0)),
    ]
}

fn leaf_strategy() -> impl Strategy<Value = Expr> {
    prop_oneof![
        (0i64..10).prop_map(Expr::number),
        (0.0f64..10.0).prop_map(Expr::number),
        prop::sample::select(vec!["x", "y", "pi"]).prop_map(Expr::ident),
    ]
}

/// Generate a tree (recursive with depth limit).
fn expr_strategy(depth: u32) -> BoxedStrategy<Expr> {
    if depth == 0 {
        return leaf_strategy().boxed();
    }
    prop_oneof![
        leaf_strategy(),
        (
            prop::sample::select(BINARY.to_vec()),
            expr_strategy(depth - 1),
            expr_strategy(depth - 1)
        )
            .prop_map(|(op, lhs, rhs)| Expr::binary(op, lhs, rhs)),
        // identical operands exercise doubling and cancellation
        (prop::sample::select(vec![Op::Plus, Op::Minus]), expr_strategy(depth - 1))
            .prop_map(|(op, operand)| Expr::binary(op, operand.clone(), operand)),
        (
            prop::sample::select(vec![Op::Plus, Op::Minus, Op::Bang]),
            expr_strategy(depth - 1)
        )
            .prop_map(|(op, operand)| Expr::unary(op, operand)),
        (
            prop::sample::select(vec!["sin", "sqrt", "abs"]),
            expr_strategy(depth - 1)
        )
            .prop_map(|(function, argument)| Expr::call(function, argument)),
    ]
    .boxed()
}

fn count_nodes(expr: &Expr) -> usize {
    1 + expr.children().iter().map(count_nodes).sum::<usize>()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        ..ProptestConfig::default()
    })]

    #[test]
    fn folding_a_literal_pair_matches_evaluation(
        op in prop::sample::select(BINARY.to_vec()),
        lhs in number_strategy(),
        rhs in number_strategy(),
    ) {
        let tree = Expr::binary(op, Expr::number(lhs), Expr::number(rhs));
        let bindings = Bindings::new();
        let raw = evaluate(&tree, &bindings, AngleMode::Degrees);
        let folded = simplify(&tree).and_then(|t| evaluate(&t, &bindings, AngleMode::Degrees));
        prop_assert_eq!(raw, folded);
    }

    #[test]
    fn folding_a_signed_literal_matches_evaluation(
        op in prop::sample::select(vec![Op::Plus, Op::Minus, Op::Bang]),
        value in number_strategy(),
    ) {
        let tree = Expr::unary(op, Expr::number(value));
        let bindings = Bindings::new();
        let raw = evaluate(&tree, &bindings, AngleMode::Degrees);
        let folded = simplify(&tree).and_then(|t| evaluate(&t, &bindings, AngleMode::Degrees));
        prop_assert_eq!(raw, folded);
    }

    #[test]
    fn simplify_is_idempotent(tree in expr_strategy(4)) {
        // literal zero divisors and oversized results are rejected while folding
        if let Ok(once) = simplify(&tree) {
            let twice = simplify(&once);
            prop_assert_eq!(twice, Ok(once));
        }
    }

    #[test]
    fn simplify_never_modifies_its_input(tree in expr_strategy(3)) {
        let before = tree.clone();
        let _ = simplify(&tree);
        prop_assert_eq!(tree, before);
    }

    #[test]
    fn representation_is_deterministic(tree in expr_strategy(4)) {
        let first = intermediate_representation(&tree);
        let second = intermediate_representation(&tree.clone());
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.lines().count(), count_nodes(&tree));
    }

    #[test]
    fn free_variables_are_the_bound_names(tree in expr_strategy(4)) {
        let names = free_variables(&tree);
        prop_assert!(names.iter().all(|name| name == "x" || name == "y"));
    }
}
