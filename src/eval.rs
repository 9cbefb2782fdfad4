// SPDX: CC0-1.0

use crate::{
    lex::{Tok, TokTyp},
    stdlib::{X, Y},
    Number,
};
use core::fmt;
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperatorTyp {
    Add,
    Sub,
    Mul,
    Div,
    Exp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Associativity {
    Left,
    Right,
}

impl OperatorTyp {
    pub const fn precedence(&self) -> i8 {
        match self {
            Self::Add => 2,
            Self::Sub => 2,
            Self::Mul => 3,
            Self::Div => 3,
            Self::Exp => 5,
        }
    }

    pub const fn associativity(&self) -> Associativity {
        use Associativity::{Left, Right};
        match self {
            Self::Add => Left,
            Self::Sub => Left,
            Self::Mul => Left,
            Self::Div => Left,
            Self::Exp => Right,
        }
    }

    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Exp => "^",
        }
    }

    /// IEEE semantics throughout: division by zero and domain errors give
    /// infinities or NaN, never an error.
    pub fn apply(&self, a: Number, b: Number) -> Number {
        match self {
            Self::Add => a + b,
            Self::Sub => a - b,
            Self::Mul => a * b,
            Self::Div => a / b,
            Self::Exp => a.powf(b),
        }
    }
}

impl fmt::Display for OperatorTyp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Read-only variable lookup used during evaluation.
pub trait Vars {
    fn get(&self, name: &str) -> Option<Number>;
}

/// User parameters, keyed by name.
pub type Env = HashMap<String, Number>;

impl Vars for Env {
    fn get(&self, name: &str) -> Option<Number> {
        HashMap::get(self, name).copied()
    }
}

/// Binds the sampling variables over a shared environment without copying it.
#[derive(Clone, Copy, Debug)]
pub struct Bind<'a, V: ?Sized> {
    pub vars: &'a V,
    pub x: Number,
    pub y: Option<Number>,
}

impl<V: Vars + ?Sized> Vars for Bind<'_, V> {
    fn get(&self, name: &str) -> Option<Number> {
        match name {
            X => Some(self.x),
            Y if self.y.is_some() => self.y,
            _ => self.vars.get(name),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EvalErrTyp {
    #[error("cannot evaluate empty program")]
    Empty,

    #[error("'{name}' requires {arity} operand(s), but found {found}")]
    MissingArgs {
        name: &'static str,
        arity: usize,
        found: usize,
    },

    #[error("expected 1 value on the stack but found {found}")]
    StackMismatch { found: usize },
}

#[derive(Debug, thiserror::Error)]
#[error("{typ}")]
pub struct EvalErr {
    pub typ: EvalErrTyp,
    pub tok: Option<Tok>, // if none, associated with end-of-program checking
}

/// Expression in postfix order, as produced by [`crate::parse::parse`].
///
/// Only numbers, variables, operators and functions appear here.
#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    pub(crate) toks: Vec<Tok>,
}

impl Program {
    #[inline]
    pub(crate) const fn new(toks: Vec<Tok>) -> Self {
        Self { toks }
    }

    #[inline]
    pub fn toks(&self) -> core::slice::Iter<'_, Tok> {
        self.toks.iter()
    }

    pub fn len(&self) -> usize {
        self.toks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toks.is_empty()
    }

    /// Whether the program reads the variable `name`.
    pub fn uses(&self, name: &str) -> bool {
        self.toks()
            .any(|tok| tok.typ == TokTyp::Variable && tok.text() == name)
    }

    /// Names of all variables read by the program, in first-use order.
    pub fn variables(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for tok in self.toks().filter(|tok| tok.typ == TokTyp::Variable) {
            if !out.contains(&tok.text()) {
                out.push(tok.text());
            }
        }
        out
    }

    /// Evaluate with a fresh stack.
    pub fn eval<V: Vars + ?Sized>(&self, vars: &V) -> Result<Number, EvalErr> {
        eval(self, vars, &mut Vec::new())
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, tok) in self.toks().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            match tok.typ {
                TokTyp::Number(val) => write!(f, "{val}")?,
                _ => write!(f, "{tok}")?,
            }
        }
        Ok(())
    }
}

/// Run `prog` against `vars`, reusing `stack` between calls.
///
/// Unknown variables read as `0.0`.
pub fn eval<V: Vars + ?Sized>(
    prog: &Program,
    vars: &V,
    stack: &mut Vec<Number>,
) -> Result<Number, EvalErr> {
    fn expect_args(
        stack: &[Number],
        tok: &Tok,
        name: &'static str,
        arity: usize,
    ) -> Result<usize, EvalErr> {
        let len = stack.len();
        if len < arity {
            Err(EvalErr {
                typ: EvalErrTyp::MissingArgs {
                    name,
                    arity,
                    found: len,
                },
                tok: Some(tok.clone()),
            })
        } else {
            Ok(len - arity)
        }
    }

    if prog.is_empty() {
        return Err(EvalErr {
            typ: EvalErrTyp::Empty,
            tok: None,
        });
    }

    stack.clear();

    for tok in prog.toks() {
        match tok.typ {
            TokTyp::Number(val) => stack.push(val),

            TokTyp::Variable => stack.push(vars.get(tok.text()).unwrap_or(0.0)),

            TokTyp::Op(op) => {
                let at = expect_args(stack, tok, op.symbol(), 2)?;
                // stack: ...a, b
                let val = op.apply(stack[at], stack[at + 1]);
                stack.truncate(at);
                stack.push(val);
            }

            TokTyp::Function(fun) => {
                let at = expect_args(stack, tok, fun.name, fun.arity)?;
                // stack: ...a, b, c, d
                //                 ^^^^ args if arity is 2
                let val = fun.call(&stack[at..]);
                stack.truncate(at);
                stack.push(val);
            }

            TokTyp::End => {}

            TokTyp::OpenParen | TokTyp::CloseParen | TokTyp::Comma | TokTyp::Invalid => {
                unreachable!("grouping or invalid token survived parsing")
            }
        }
    }

    match stack.pop() {
        Some(val) if stack.is_empty() => Ok(val),
        popped => Err(EvalErr {
            typ: EvalErrTyp::StackMismatch {
                found: stack.len() + usize::from(popped.is_some()),
            },
            tok: None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lex::tokenize, parse::parse};

    fn prog(src: &str) -> Program {
        parse(&tokenize(src)).unwrap()
    }

    fn calc(src: &str) -> Number {
        prog(src).eval(&Env::new()).unwrap()
    }

    #[test]
    fn arithmetic() {
        assert_eq!(calc("2+3*4"), 14.0);
        assert_eq!(calc("(2+3)*4"), 20.0);
        assert_eq!(calc("2^3^2"), 512.0);
        assert_eq!(calc("10-4-3"), 3.0);
        assert_eq!(calc("8/4/2"), 1.0);
        assert_eq!(calc("pow(2, 0.5)^2").round(), 2.0);
    }

    #[test]
    fn unary_minus() {
        assert_eq!(calc("-3^2"), -9.0);
        assert_eq!(calc("(-3)^2"), 9.0);
        assert_eq!(calc("2^-1"), 0.5);
        assert_eq!(calc("-2*3"), -6.0);
        assert_eq!(calc("--2"), 2.0);
        assert_eq!(calc("1--1"), 2.0);
        assert_eq!(calc("pow(-2, 3)"), -8.0);
        // a parenthesized base does not change how tightly `neg` binds
        assert_eq!(calc("-(3)^2"), -9.0);
        assert_eq!(calc("-(1+2)^2"), -9.0);
        assert_eq!(calc("-(3)*2"), -6.0);
    }

    #[test]
    fn negated_parenthesized_square_opens_downward() {
        let p = prog("-(x+1)^2");
        let env = Env::new();
        for x in [-3.0, -1.0, 0.0, 2.5] {
            let bound = Bind {
                vars: &env,
                x,
                y: None,
            };
            assert_eq!(p.eval(&bound).unwrap(), -((x + 1.0) * (x + 1.0)), "x = {x}");
        }
    }

    #[test]
    fn unknown_variables_read_zero() {
        assert_eq!(calc("q+1"), 1.0);
    }

    #[test]
    fn environment_and_binding() {
        let mut env = Env::new();
        env.insert("a".into(), 3.0);
        env.insert("x".into(), 100.0);
        let p = prog("a x + y");
        let bound = Bind {
            vars: &env,
            x: 2.0,
            y: None,
        };
        // env's own `y` is absent, `x` is shadowed by the binding
        assert_eq!(p.eval(&bound).unwrap(), 6.0);
        let bound = Bind { y: Some(1.5), ..bound };
        assert_eq!(p.eval(&bound).unwrap(), 7.5);
    }

    #[test]
    fn ieee_results_are_values() {
        assert_eq!(calc("1/0"), Number::INFINITY);
        assert!(calc("sqrt(-1)").is_nan());
        assert_eq!(calc("ln(0)"), Number::NEG_INFINITY);
    }

    #[test]
    fn malformed_programs() {
        let err = prog("1+").eval(&Env::new()).unwrap_err();
        assert!(matches!(
            err.typ,
            EvalErrTyp::MissingArgs {
                name: "+",
                arity: 2,
                found: 1
            }
        ));

        let err = prog("pow(1)").eval(&Env::new()).unwrap_err();
        assert!(matches!(err.typ, EvalErrTyp::MissingArgs { name: "pow", .. }));

        let err = prog("1,2").eval(&Env::new()).unwrap_err();
        assert!(matches!(err.typ, EvalErrTyp::StackMismatch { found: 2 }));
        assert!(err.tok.is_none());

        let err = prog("").eval(&Env::new()).unwrap_err();
        assert!(matches!(err.typ, EvalErrTyp::Empty));
    }

    #[test]
    fn reports_variables() {
        let p = prog("a x^2 + b x + a");
        assert_eq!(p.variables(), ["a", "x", "b"]);
        assert!(p.uses("b"));
        assert!(!p.uses("y"));
    }

    #[test]
    fn display_is_postfix() {
        assert_eq!(prog("-2x + sin(y)").to_string(), "2 neg x * y sin +");
    }
}
