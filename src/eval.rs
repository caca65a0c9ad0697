use std::collections::HashMap;

use miette::Diagnostic;
use num_bigint::Sign;
use thiserror::Error;

use crate::{
    number::{self, Number},
    parse::{Atom, Expr, Op},
};

/// Names accepted as call targets.
pub const FUNCTIONS: [&str; 9] = [
    "sin", "cos", "tan", "log", "sqrt", "abs", "exp", "floor", "ceil",
];

/// Named constants; a binding with the same name takes precedence.
pub const CONSTANTS: [&str; 2] = ["pi", "e"];

pub fn is_function(name: &str) -> bool {
    FUNCTIONS.contains(&name)
}

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum EvalError {
    #[error("variable '{name}' is not defined")]
    #[diagnostic(
        code(algebra_eval::eval::undefined_variable),
        help("bind a value for `{name}`, e.g. `--var {name}=1`")
    )]
    UndefinedVariable { name: String },

    #[error("division by zero in `{dividend} {operator} 0`")]
    #[diagnostic(code(algebra_eval::eval::division_by_zero))]
    DivisionByZero { dividend: Number, operator: Op },

    #[error("modulo by zero in `{dividend} % 0`")]
    #[diagnostic(code(algebra_eval::eval::modulo_by_zero))]
    ModuloByZero { dividend: Number },

    #[error("factorial is only defined for non-negative integers, got {value}")]
    #[diagnostic(code(algebra_eval::eval::factorial_domain))]
    FactorialDomain { value: Number },

    #[error("logarithm is only defined for positive numbers, got {argument}")]
    #[diagnostic(code(algebra_eval::eval::logarithm_domain))]
    LogarithmDomain { argument: Number },

    #[error("square root is not defined for negative numbers, got {argument}")]
    #[diagnostic(code(algebra_eval::eval::square_root_domain))]
    SquareRootDomain { argument: Number },

    #[error("unknown function '{name}'")]
    #[diagnostic(
        code(algebra_eval::eval::unknown_function),
        help("available functions: sin, cos, tan, log, sqrt, abs, exp, floor, ceil")
    )]
    UnknownFunction { name: String },

    #[error("unsupported operation: {operation}")]
    #[diagnostic(code(algebra_eval::eval::unsupported_operation))]
    UnsupportedOperation { operation: String },

    #[error("numeric overflow in {operation}")]
    #[diagnostic(code(algebra_eval::eval::overflow))]
    Overflow { operation: String },
}

/// How `sin`, `cos` and `tan` read their argument.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AngleMode {
    #[default]
    Degrees,
    Radians,
}

/// Variable values supplied by the caller. Names are stored lowercased to
/// match the lexer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    values: HashMap<String, Number>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: impl Into<Number>) -> Option<Number> {
        self.values.insert(name.to_lowercase(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&Number> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<S: AsRef<str>, N: Into<Number>> FromIterator<(S, N)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (S, N)>>(iter: I) -> Self {
        let mut bindings = Bindings::new();
        bindings.extend(iter);
        bindings
    }
}

impl<S: AsRef<str>, N: Into<Number>> Extend<(S, N)> for Bindings {
    fn extend<I: IntoIterator<Item = (S, N)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.insert(name.as_ref(), value);
        }
    }
}

pub struct Evaluator<'b> {
    bindings: &'b Bindings,
    angle_mode: AngleMode,
}

impl<'b> Evaluator<'b> {
    pub fn new(bindings: &'b Bindings, angle_mode: AngleMode) -> Self {
        Self {
            bindings,
            angle_mode,
        }
    }

    pub fn eval(&self, expr: &Expr) -> Result<Number, EvalError> {
        match expr {
            Expr::Atom(Atom::Number(value)) => Ok(value.clone()),
            Expr::Atom(Atom::Ident(name)) => self.lookup(name),
            Expr::Cons(op, operands) => {
                let values = operands
                    .iter()
                    .map(|operand| self.eval(operand))
                    .collect::<Result<Vec<_>, _>>()?;
                match (op, values.as_slice()) {
                    (Op::Bang, [value]) => number::factorial(value),
                    (Op::Plus, [value]) => Ok(value.clone()),
                    (Op::Minus, [value]) => Ok(-value.clone()),
                    (op, [lhs, rhs]) => number::apply_binary(*op, lhs, rhs),
                    (op, values) => Err(EvalError::UnsupportedOperation {
                        operation: format!("`{op}` applied to {} operand(s)", values.len()),
                    }),
                }
            }
            Expr::Call { function, argument } => {
                let argument = self.eval(argument)?;
                self.call(function, argument)
            }
        }
    }

    fn lookup(&self, name: &str) -> Result<Number, EvalError> {
        if let Some(value) = self.bindings.get(name) {
            return Ok(value.clone());
        }
        match name {
            "pi" => Ok(Number::Float(std::f64::consts::PI)),
            "e" => Ok(Number::Float(std::f64::consts::E)),
            _ => Err(EvalError::UndefinedVariable {
                name: name.to_string(),
            }),
        }
    }

    fn angle(&self, x: f64) -> f64 {
        match self.angle_mode {
            AngleMode::Degrees => x.to_radians(),
            AngleMode::Radians => x,
        }
    }

    fn call(&self, function: &str, argument: Number) -> Result<Number, EvalError> {
        if !is_function(function) {
            return Err(EvalError::UnknownFunction {
                name: function.to_string(),
            });
        }

        // integers past the f64 range only reach functions that need no float
        let sign = match &argument {
            Number::Int(n) => Some(n.sign()),
            Number::Float(_) => None,
        };
        match (function, sign) {
            ("log", Some(Sign::Plus)) => return Ok(Number::Float(argument.ln())),
            ("log", Some(_)) => return Err(EvalError::LogarithmDomain { argument }),
            ("sqrt", Some(Sign::Minus)) => return Err(EvalError::SquareRootDomain { argument }),
            ("abs", Some(_)) => return Ok(argument.abs()),
            ("floor" | "ceil", Some(_)) => return Ok(argument),
            _ => {}
        }

        let x = argument
            .to_finite_f64()
            .ok_or_else(|| EvalError::Overflow {
                operation: format!("{function}({argument})"),
            })?;
        Ok(match function {
            "sin" => Number::Float(self.angle(x).sin()),
            "cos" => Number::Float(self.angle(x).cos()),
            "tan" => Number::Float(self.angle(x).tan()),
            "log" => {
                if x <= 0.0 {
                    return Err(EvalError::LogarithmDomain { argument });
                }
                Number::Float(x.ln())
            }
            "sqrt" => {
                if x < 0.0 {
                    return Err(EvalError::SquareRootDomain { argument });
                }
                Number::Float(x.sqrt())
            }
            "abs" => argument.abs(),
            "exp" => Number::Float(x.exp()),
            "floor" => Number::integral(x.floor(), function)?,
            "ceil" => Number::integral(x.ceil(), function)?,
            _ => {
                return Err(EvalError::UnknownFunction {
                    name: function.to_string(),
                });
            }
        })
    }
}

/// Evaluates a tree against caller-supplied bindings.
#[tracing::instrument(level = "debug", skip_all, fields(bindings = bindings.len(), angle_mode = ?angle_mode))]
pub fn evaluate(
    expr: &Expr,
    bindings: &Bindings,
    angle_mode: AngleMode,
) -> Result<Number, EvalError> {
    let value = Evaluator::new(bindings, angle_mode).eval(expr)?;
    tracing::debug!(%value, "evaluated expression");
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lex::tokenize, parse::parse};
    use pretty_assertions::assert_eq;

    fn eval_with(input: &str, bindings: &Bindings, angle_mode: AngleMode) -> Result<Number, EvalError> {
        evaluate(&parse(&tokenize(input).unwrap()).unwrap(), bindings, angle_mode)
    }

    fn eval_str(input: &str) -> Result<Number, EvalError> {
        eval_with(input, &Bindings::new(), AngleMode::Degrees)
    }

    fn approx(value: Number, expected: f64) {
        let actual = value.to_f64();
        assert!((actual - expected).abs() < 1e-9, "{actual} != {expected}");
    }

    #[test]
    fn arithmetic_and_precedence() {
        assert_eq!(eval_str("2 + 3 * 4"), Ok(Number::from(14)));
        assert_eq!(eval_str("(2 + 3) * 4 - 6"), Ok(Number::from(14)));
        assert_eq!(eval_str("7 // 2 + 7 % 2"), Ok(Number::from(4)));
        assert_eq!(eval_str("-2 ^ 2"), Ok(Number::from(4)));
        assert_eq!(eval_str("2 ^ 3 ^ 2"), Ok(Number::from(64)));
        assert_eq!(eval_str("1 / 4"), Ok(Number::Float(0.25)));
    }

    #[test]
    fn variables_come_from_bindings() {
        let bindings: Bindings = [("x", 3), ("Y", 4)].into_iter().collect();
        assert_eq!(
            eval_with("x * y", &bindings, AngleMode::Degrees),
            Ok(Number::from(12))
        );
        assert_eq!(
            eval_str("x + 1"),
            Err(EvalError::UndefinedVariable { name: "x".into() })
        );
    }

    #[test]
    fn constants_can_be_overridden() {
        approx(eval_str("pi").unwrap(), std::f64::consts::PI);
        approx(eval_str("E").unwrap(), std::f64::consts::E);

        let mut bindings = Bindings::new();
        bindings.insert("pi", 3);
        assert_eq!(
            eval_with("pi", &bindings, AngleMode::Degrees),
            Ok(Number::from(3))
        );
    }

    #[test]
    fn trigonometry_respects_angle_mode() {
        approx(eval_str("sin(90)").unwrap(), 1.0);
        approx(eval_str("cos(180)").unwrap(), -1.0);
        let radians = eval_with("sin(90)", &Bindings::new(), AngleMode::Radians).unwrap();
        approx(radians, 90f64.sin());
        approx(
            eval_with("cos(pi)", &Bindings::new(), AngleMode::Radians).unwrap(),
            -1.0,
        );
    }

    #[test]
    fn function_table() {
        approx(eval_str("log(e)").unwrap(), 1.0);
        assert_eq!(eval_str("sqrt(16)"), Ok(Number::Float(4.0)));
        assert_eq!(eval_str("abs(-3)"), Ok(Number::from(3)));
        approx(eval_str("exp(0)").unwrap(), 1.0);
        assert_eq!(eval_str("floor(2.7)"), Ok(Number::from(2)));
        assert_eq!(eval_str("ceil(2.1)"), Ok(Number::from(3)));
        assert_eq!(eval_str("floor(-2.5)"), Ok(Number::from(-3)));
    }

    #[test]
    fn function_domains() {
        assert!(matches!(eval_str("log(0)"), Err(EvalError::LogarithmDomain { .. })));
        assert!(matches!(eval_str("log(-1)"), Err(EvalError::LogarithmDomain { .. })));
        assert!(matches!(eval_str("sqrt(-4)"), Err(EvalError::SquareRootDomain { .. })));
        assert_eq!(
            eval_str("foo(1)"),
            Err(EvalError::UnknownFunction { name: "foo".into() })
        );
    }

    #[test]
    fn integers_beyond_float_range() {
        assert_eq!(eval_str("10 ^ 400 / 10 ^ 399"), Ok(Number::Float(10.0)));
        approx(eval_str("log(10 ^ 400)").unwrap(), 400.0 * std::f64::consts::LN_10);
        assert!(matches!(eval_str("log(-(10 ^ 400))"), Err(EvalError::LogarithmDomain { .. })));
        assert!(matches!(eval_str("sqrt(-(10 ^ 400))"), Err(EvalError::SquareRootDomain { .. })));
        assert!(matches!(eval_str("sqrt(10 ^ 400)"), Err(EvalError::Overflow { .. })));
        assert!(matches!(eval_str("10 ^ 400 * 1.5"), Err(EvalError::Overflow { .. })));
        assert_eq!(eval_str("floor(10 ^ 30)"), eval_str("10 ^ 30"));
        assert_eq!(eval_str("abs(-(10 ^ 400))"), eval_str("10 ^ 400"));
        assert_eq!(
            eval_str("foo(10 ^ 400)"),
            Err(EvalError::UnknownFunction { name: "foo".into() })
        );
    }

    #[test]
    fn floor_division_of_floats() {
        assert_eq!(eval_str("1 // 0.1"), Ok(Number::Float(9.0)));
        assert_eq!(eval_str("7.5 // 0.1"), Ok(Number::Float(74.0)));
    }

    #[test]
    fn factorials() {
        assert_eq!(eval_str("5!"), Ok(Number::from(120)));
        assert_eq!(eval_str("0!"), Ok(Number::from(1)));
        assert_eq!(eval_str("3!!"), Ok(Number::from(720)));
        assert!(matches!(eval_str("(-1)!"), Err(EvalError::FactorialDomain { .. })));
        assert!(matches!(eval_str("2.5!"), Err(EvalError::FactorialDomain { .. })));
    }

    #[test]
    fn zero_divisors() {
        assert!(matches!(eval_str("1 / 0"), Err(EvalError::DivisionByZero { .. })));
        assert!(matches!(eval_str("1 // 0"), Err(EvalError::DivisionByZero { .. })));
        assert!(matches!(eval_str("1 % 0"), Err(EvalError::ModuloByZero { .. })));
        let bindings: Bindings = [("x", 0)].into_iter().collect();
        assert!(matches!(
            eval_with("1 / x", &bindings, AngleMode::Degrees),
            Err(EvalError::DivisionByZero { .. })
        ));
    }

    #[test]
    fn malformed_trees_are_rejected() {
        let expr = Expr::Cons(Op::Star, vec![Expr::number(1)]);
        assert!(matches!(
            evaluate(&expr, &Bindings::new(), AngleMode::Degrees),
            Err(EvalError::UnsupportedOperation { .. })
        ));
        let expr = Expr::binary(Op::Bang, Expr::number(1), Expr::number(2));
        assert!(matches!(
            evaluate(&expr, &Bindings::new(), AngleMode::Degrees),
            Err(EvalError::UnsupportedOperation { .. })
        ));
    }
}
