// SPDX: CC0-1.0

use crate::Number;
use core::{f64::consts, fmt}; // assumes Number = f64

pub const X: &str = "x";
pub const Y: &str = "y";

/// Binding strength of a function applied to a parenthesized argument list.
/// Higher than any operator, so it always leaves the operator stack first.
pub const CALL_BINDING: i8 = i8::MAX;

/// `neg` sits between `* /` and `^`, so `-3^2` is `-(3^2)` and `-2*3` is
/// `(-2)*3`.
pub const NEG_BINDING: i8 = 4;

pub const PHI: Number = 1.618_033_988_749_895;

#[derive(Clone, Copy)]
pub struct Fun {
    pub name: &'static str,
    pub arity: usize,
    pub binding: i8,
    pub fun: fn(&[Number]) -> Number,
}

impl Fun {
    pub const fn new(name: &'static str, arity: usize, fun: fn(&[Number]) -> Number) -> Self {
        Self {
            name,
            arity,
            binding: CALL_BINDING,
            fun,
        }
    }

    const fn prefix(name: &'static str, binding: i8, fun: fn(&[Number]) -> Number) -> Self {
        Self {
            name,
            arity: 1,
            binding,
            fun,
        }
    }

    /// Caller guarantees `args.len() == self.arity`.
    pub fn call(&self, args: &[Number]) -> Number {
        (self.fun)(args)
    }
}

impl PartialEq for Fun {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.arity == other.arity
    }
}

impl fmt::Debug for Fun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fun")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("binding", &self.binding)
            .finish()
    }
}

pub const NEG: Fun = Fun::prefix("neg", NEG_BINDING, neg);

pub const FUNCTIONS: &[Fun] = &[
    NEG,
    Fun::new("abs", 1, abs),
    Fun::new("sqrt", 1, sqrt),
    Fun::new("exp", 1, exp),
    Fun::new("ln", 1, ln),
    Fun::new("log", 1, ln),
    Fun::new("pow", 2, pow),
    // trig
    Fun::new("sin", 1, sin),
    Fun::new("cos", 1, cos),
    Fun::new("tan", 1, tan),
    Fun::new("asin", 1, arcsin),
    Fun::new("acos", 1, arccos),
    Fun::new("atan", 1, arctan),
    Fun::new("arcsin", 1, arcsin),
    Fun::new("arccos", 1, arccos),
    Fun::new("arctan", 1, arctan),
];

pub const CONSTANTS: &[(&str, Number)] = &[
    ("pi", consts::PI),
    ("tau", consts::TAU),
    ("e", consts::E),
    ("phi", PHI),
];

pub fn function(name: &str) -> Option<Fun> {
    FUNCTIONS.iter().find(|f| f.name == name).copied()
}

pub fn constant(name: &str) -> Option<Number> {
    CONSTANTS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, val)| *val)
}

#[track_caller]
fn expect_n<const N: usize>(args: &[Number]) -> [Number; N] {
    assert_eq!(args.len(), N);
    let mut out = [0.0; N];
    out.copy_from_slice(args);
    out
}

pub fn neg(args: &[Number]) -> Number {
    let [x] = expect_n::<1>(args);
    -x
}

pub fn abs(args: &[Number]) -> Number {
    let [x] = expect_n::<1>(args);
    x.abs()
}

pub fn sqrt(args: &[Number]) -> Number {
    let [x] = expect_n::<1>(args);
    x.sqrt()
}

pub fn exp(args: &[Number]) -> Number {
    let [x] = expect_n::<1>(args);
    x.exp()
}

pub fn ln(args: &[Number]) -> Number {
    let [x] = expect_n::<1>(args);
    x.ln()
}

pub fn pow(args: &[Number]) -> Number {
    let [x, exp] = expect_n::<2>(args);
    x.powf(exp)
}

pub fn sin(args: &[Number]) -> Number {
    let [x] = expect_n::<1>(args);
    x.sin()
}

pub fn cos(args: &[Number]) -> Number {
    let [x] = expect_n::<1>(args);
    x.cos()
}

pub fn tan(args: &[Number]) -> Number {
    let [x] = expect_n::<1>(args);
    x.tan()
}

pub fn arcsin(args: &[Number]) -> Number {
    let [x] = expect_n::<1>(args);
    x.asin()
}

pub fn arccos(args: &[Number]) -> Number {
    let [x] = expect_n::<1>(args);
    x.acos()
}

pub fn arctan(args: &[Number]) -> Number {
    let [x] = expect_n::<1>(args);
    x.atan()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_tables() {
        assert_eq!(function("arcsin").map(|f| f.arity), Some(1));
        assert_eq!(function("pow").map(|f| f.arity), Some(2));
        assert!(function("q").is_none());
        assert_eq!(constant("pi"), Some(consts::PI));
        assert!((constant("phi").unwrap() - (1.0 + 5f64.sqrt()) / 2.0).abs() < 1e-15);
        assert!(constant("x").is_none());
    }

    #[test]
    fn domain_errors_are_not_finite() {
        assert!(sqrt(&[-1.0]).is_nan());
        assert_eq!(ln(&[0.0]), Number::NEG_INFINITY);
        assert_eq!(pow(&[2.0, 10.0]), 1024.0);
        assert_eq!(NEG.call(&[2.5]), -2.5);
    }
}
