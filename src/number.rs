//! Numeric values and the operator semantics shared by the simplifier and
//! the evaluator.
//!
//! Integer literals stay exact ([`BigInt`]) through `+`, `-`, `*`, `%`, `//`,
//! non-negative integer powers and factorials. Anything involving a
//! fractional value, and real division, falls back to `f64`.

use std::{fmt::Display, ops::Neg, str::FromStr};

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{FromPrimitive, One, Signed, ToPrimitive, Zero};
use thiserror::Error;

use crate::{eval::EvalError, parse::Op};

/// Exact integer powers whose result would need more bits than this fail
/// with [`EvalError::Overflow`].
pub const MAX_EXACT_BITS: u64 = 1_000_000;

/// Largest operand accepted by `!`.
pub const MAX_FACTORIAL: u32 = 10_000;

#[derive(Debug, Clone)]
pub enum Number {
    Int(BigInt),
    Float(f64),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("`{0}` is not a number")]
pub struct ParseNumberError(String);

impl Number {
    /// Reads a lexed number literal; integer literals become exact.
    pub fn from_literal(literal: &str, fractional: bool) -> Option<Number> {
        if fractional {
            literal.parse().ok().map(Number::Float)
        } else {
            literal.parse().ok().map(Number::Int)
        }
    }

    pub fn to_f64(&self) -> f64 {
        match self {
            Number::Int(i) => i.to_f64().unwrap_or(if i.is_negative() {
                f64::NEG_INFINITY
            } else {
                f64::INFINITY
            }),
            Number::Float(x) => *x,
        }
    }

    /// Like [`Number::to_f64`], but `None` for integers beyond the `f64`
    /// range instead of an infinity.
    pub fn to_finite_f64(&self) -> Option<f64> {
        match self {
            Number::Int(i) => i.to_f64().filter(|x| x.is_finite()),
            Number::Float(x) => Some(*x),
        }
    }

    /// Natural logarithm of a positive value. Integers too large for `f64`
    /// are scaled down by a power of two first.
    pub(crate) fn ln(&self) -> f64 {
        match self {
            Number::Int(i) if self.to_finite_f64().is_none() && i.is_positive() => {
                let shift = i.bits().saturating_sub(64);
                let top = (i >> shift as usize).to_f64().unwrap_or(f64::INFINITY);
                top.ln() + shift as f64 * std::f64::consts::LN_2
            }
            _ => self.to_f64().ln(),
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Number::Int(i) => i.is_zero(),
            Number::Float(x) => *x == 0.0,
        }
    }

    pub fn abs(&self) -> Number {
        match self {
            Number::Int(i) => Number::Int(i.abs()),
            Number::Float(x) => Number::Float(x.abs()),
        }
    }

    /// Converts an already rounded float into an exact integer.
    pub(crate) fn integral(x: f64, operation: &str) -> Result<Number, EvalError> {
        BigInt::from_f64(x)
            .map(Number::Int)
            .ok_or_else(|| EvalError::Overflow {
                operation: format!("{operation}({x})"),
            })
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a == b,
            (Number::Float(a), Number::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            _ => false,
        }
    }
}

impl Neg for Number {
    type Output = Number;

    fn neg(self) -> Number {
        match self {
            Number::Int(i) => Number::Int(-i),
            Number::Float(x) => Number::Float(-x),
        }
    }
}

impl From<i32> for Number {
    fn from(value: i32) -> Self {
        Number::Int(BigInt::from(value))
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number::Int(BigInt::from(value))
    }
}

impl From<BigInt> for Number {
    fn from(value: BigInt) -> Self {
        Number::Int(value)
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Number::Float(value)
    }
}

impl FromStr for Number {
    type Err = ParseNumberError;

    /// Digits (with an optional sign) parse as an exact integer, anything
    /// else `f64` accepts parses as a float.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(i) = s.parse::<BigInt>() {
            return Ok(Number::Int(i));
        }
        s.parse::<f64>()
            .map(Number::Float)
            .map_err(|_| ParseNumberError(s.to_string()))
    }
}

impl Display for Number {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{i}"),
            Number::Float(x) if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e16 => {
                write!(f, "{x:.1}")
            }
            Number::Float(x) => write!(f, "{x}"),
        }
    }
}

/// Applies a binary operator to two values.
///
/// Both constant folding and evaluation go through here, so a zero divisor
/// fails the same way in either stage.
///
/// A float result never comes from an integer that `f64` cannot hold: such
/// operands fail with [`EvalError::Overflow`], except in `Int / Int`, which
/// rounds the exact quotient.
pub fn apply_binary(op: Op, lhs: &Number, rhs: &Number) -> Result<Number, EvalError> {
    use Number::{Float, Int};

    let overflow = || EvalError::Overflow {
        operation: format!("{lhs} {op} {rhs}"),
    };
    let floats = || match (lhs.to_finite_f64(), rhs.to_finite_f64()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(overflow()),
    };

    Ok(match (op, lhs, rhs) {
        (Op::Plus, Int(a), Int(b)) => Int(a + b),
        (Op::Plus, _, _) => floats().map(|(a, b)| Float(a + b))?,
        (Op::Minus, Int(a), Int(b)) => Int(a - b),
        (Op::Minus, _, _) => floats().map(|(a, b)| Float(a - b))?,
        (Op::Star, Int(a), Int(b)) => Int(a * b),
        (Op::Star, _, _) => floats().map(|(a, b)| Float(a * b))?,

        (Op::Slash | Op::SlashSlash, _, b) if b.is_zero() => {
            return Err(EvalError::DivisionByZero {
                dividend: lhs.clone(),
                operator: op,
            });
        }
        (Op::Percent, _, b) if b.is_zero() => {
            return Err(EvalError::ModuloByZero {
                dividend: lhs.clone(),
            });
        }

        (Op::Slash, Int(a), Int(b)) => BigRational::new(a.clone(), b.clone())
            .to_f64()
            .filter(|x| x.is_finite())
            .map(Float)
            .ok_or_else(overflow)?,
        (Op::Slash, _, _) => floats().map(|(a, b)| Float(a / b))?,
        (Op::SlashSlash, Int(a), Int(b)) => Int(floor_div(a, b)),
        (Op::SlashSlash, _, _) => floats().map(|(a, b)| Float(floor_div_f64(a, b)))?,
        (Op::Percent, Int(a), Int(b)) => Int(floor_rem(a, b)),
        (Op::Percent, _, _) => floats().map(|(a, b)| Float(floor_rem_f64(a, b)))?,

        (Op::Caret, Int(a), Int(b)) if !b.is_negative() => Int(int_pow(a, b)?),
        (Op::Caret, _, _) => floats().map(|(a, b)| Float(a.powf(b)))?,

        (Op::Bang, _, _) => {
            return Err(EvalError::UnsupportedOperation {
                operation: format!("`{op}` applied to two operands"),
            });
        }
    })
}

/// Exact `n!` for non-negative integers.
pub fn factorial(value: &Number) -> Result<Number, EvalError> {
    let Number::Int(n) = value else {
        return Err(EvalError::FactorialDomain {
            value: value.clone(),
        });
    };
    if n.is_negative() {
        return Err(EvalError::FactorialDomain {
            value: value.clone(),
        });
    }

    let n = n
        .to_u32()
        .filter(|n| *n <= MAX_FACTORIAL)
        .ok_or_else(|| EvalError::Overflow {
            operation: format!("{n}!"),
        })?;

    Ok(Number::Int(
        (2..=n).fold(BigInt::one(), |acc, k| acc * BigInt::from(k)),
    ))
}

// Remainder and quotient round toward negative infinity, so the remainder
// takes the divisor's sign.
fn floor_rem(a: &BigInt, b: &BigInt) -> BigInt {
    let r = a % b;
    if !r.is_zero() && r.is_negative() != b.is_negative() {
        r + b
    } else {
        r
    }
}

fn floor_div(a: &BigInt, b: &BigInt) -> BigInt {
    let q = a / b;
    let r = a % b;
    if !r.is_zero() && r.is_negative() != b.is_negative() {
        q - BigInt::one()
    } else {
        q
    }
}

// The quotient comes from the truncated remainder rather than from `a / b`,
// which can round up across an integer (`1 // 0.1` is 9, not 10).
fn floor_div_f64(a: f64, b: f64) -> f64 {
    let rem = a % b;
    let mut div = (a - rem) / b;
    if rem != 0.0 && (rem < 0.0) != (b < 0.0) {
        div -= 1.0;
    }
    if div == 0.0 {
        return 0.0f64.copysign(a / b);
    }
    let floored = div.floor();
    if div - floored > 0.5 {
        floored + 1.0
    } else {
        floored
    }
}

fn floor_rem_f64(a: f64, b: f64) -> f64 {
    let r = a % b;
    if r != 0.0 && (r < 0.0) != (b < 0.0) {
        r + b
    } else {
        r
    }
}

fn int_pow(base: &BigInt, exponent: &BigInt) -> Result<BigInt, EvalError> {
    if exponent.is_zero() {
        return Ok(BigInt::one());
    }
    if base.is_zero() || base.is_one() {
        return Ok(base.clone());
    }
    if (-base).is_one() {
        let even = (exponent % BigInt::from(2)).is_zero();
        return Ok(if even { BigInt::one() } else { base.clone() });
    }

    let exp = exponent
        .to_u32()
        .filter(|exp| base.bits().saturating_mul(u64::from(*exp)) <= MAX_EXACT_BITS)
        .ok_or_else(|| EvalError::Overflow {
            operation: format!("{base} ^ {exponent}"),
        })?;
    Ok(base.pow(exp))
}
