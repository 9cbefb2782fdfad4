// SPDX: CC0-1.0

//! Property-based tests for the tokenize, parse and evaluate pipeline.

use implicit_plot::{
    eval::Env,
    lex::{tokenize, TokTyp},
    parse::parse,
    Number,
};
use proptest::prelude::*;

/// Arithmetic expression tree with a directly computed value.
#[derive(Clone, Debug)]
enum Expr {
    Num(u8),
    Neg(Box<Expr>),
    /// `-(e)^n`, where `neg` applies after the power.
    NegPow(Box<Expr>, u8),
    Bin(Box<Expr>, char, Box<Expr>),
}

impl Expr {
    fn value(&self) -> Number {
        match self {
            Self::Num(n) => Number::from(*n),
            Self::Neg(e) => -e.value(),
            Self::NegPow(e, n) => -e.value().powf(Number::from(*n)),
            Self::Bin(a, op, b) => {
                let (a, b) = (a.value(), b.value());
                match op {
                    '+' => a + b,
                    '-' => a - b,
                    '*' => a * b,
                    '/' => a / b,
                    '^' => a.powf(b),
                    _ => unreachable!(),
                }
            }
        }
    }

    /// Fully parenthesized infix text.
    fn text(&self) -> String {
        match self {
            Self::Num(n) => n.to_string(),
            Self::Neg(e) => format!("-({})", e.text()),
            Self::NegPow(e, n) => format!("-({})^{n}", e.text()),
            Self::Bin(a, op, b) => format!("({}){op}({})", a.text(), b.text()),
        }
    }
}

fn expr_strategy() -> impl Strategy<Value = Expr> {
    let leaf = (1u8..10).prop_map(Expr::Num);
    leaf.prop_recursive(4, 32, 2, |inner| {
        prop_oneof![
            inner.clone().prop_map(|e| Expr::Neg(Box::new(e))),
            (inner.clone(), 1u8..4).prop_map(|(e, n)| Expr::NegPow(Box::new(e), n)),
            (
                inner.clone(),
                prop::sample::select(vec!['+', '-', '*', '/', '^']),
                inner
            )
                .prop_map(|(a, op, b)| Expr::Bin(Box::new(a), op, Box::new(b))),
        ]
    })
}

fn same(got: Number, want: Number) -> bool {
    got == want || (got.is_nan() && want.is_nan())
}

proptest! {
    #[test]
    fn evaluation_matches_direct_computation(expr in expr_strategy()) {
        let src = expr.text();
        let got = parse(&tokenize(&src)).unwrap().eval(&Env::new()).unwrap();
        let want = expr.value();
        prop_assert!(same(got, want), "{src}: got {got}, want {want}");
    }

    #[test]
    fn leading_factor_multiplies_implicitly(n in 1u8..10, expr in expr_strategy()) {
        let implicit = format!("{n}({})", expr.text());
        let got = parse(&tokenize(&implicit)).unwrap().eval(&Env::new()).unwrap();
        let want = Number::from(n) * expr.value();
        prop_assert!(same(got, want), "{implicit}: got {got}, want {want}");
    }

    #[test]
    fn tokenizing_ends_with_one_end_token(src in "\\PC{0,40}") {
        let toks = tokenize(&src);
        prop_assert_eq!(toks.last().map(|tok| tok.typ), Some(TokTyp::End));
        prop_assert_eq!(toks.iter().filter(|tok| tok.typ == TokTyp::End).count(), 1);
    }

    #[test]
    fn parsing_is_pure_and_evaluation_never_panics(src in "[0-9a-z+*/^(),. -]{0,30}") {
        let toks = tokenize(&src);
        let first = parse(&toks);
        let second = parse(&toks);
        match (first, second) {
            (Ok(a), Ok(b)) => {
                prop_assert_eq!(&a, &b);
                // may fail on a malformed program, but only with an error
                let _ = a.eval(&Env::new());
            }
            (Err(a), Err(b)) => {
                prop_assert_eq!(a.typ, b.typ);
                prop_assert_eq!(a.loc.start(), b.loc.start());
            }
            _ => prop_assert!(false, "parse of {src:?} is not deterministic"),
        }
    }
}
