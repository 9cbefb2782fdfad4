// SPDX: CC0-1.0

// implementation of shunting yard algorithm by dijkstra (see https://en.wikipedia.org/wiki/Shunting_yard_algorithm)

use crate::{
    eval::{Associativity, OperatorTyp, Program},
    lex::{SubStr, Tok, TokTyp},
    stdlib::CALL_BINDING,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrTyp {
    #[error("mismatched parentheses")]
    ParenMismatch,
    #[error("invalid character")]
    InvalidToken,
}

#[derive(Clone, Debug, thiserror::Error)]
#[error("{typ}")]
pub struct ParseErr {
    pub typ: ParseErrTyp,
    pub loc: SubStr,
}

impl ParseErr {
    fn new(typ: ParseErrTyp, tok: &Tok) -> Self {
        Self {
            typ,
            loc: tok.loc.clone(),
        }
    }
}

/// Whether `top` must leave the operator stack before `op` is pushed.
fn yields_to(op: OperatorTyp, top: &TokTyp) -> bool {
    let top_prec = match top {
        TokTyp::Op(top) => top.precedence(),
        TokTyp::Function(fun) => fun.binding,
        _ => return false,
    };
    match op.associativity() {
        Associativity::Left => op.precedence() <= top_prec,
        Associativity::Right => op.precedence() < top_prec,
    }
}

/// Move operators from the stack to the output while `predicate` holds for
/// the top of the stack.
fn pop_while<P>(ops: &mut Vec<&Tok>, out: &mut Vec<Tok>, predicate: P)
where
    P: Fn(&TokTyp) -> bool,
{
    while let Some(&top) = ops.last() {
        if !predicate(&top.typ) {
            break;
        }
        ops.pop();
        out.push(top.clone());
    }
}

/// Convert infix tokens into a postfix [`Program`].
///
/// Runs as a loop over two growable stacks, so nesting depth only costs heap.
/// Pure: the same tokens always give the same program.
pub fn parse(toks: &[Tok]) -> Result<Program, ParseErr> {
    let mut out: Vec<Tok> = Vec::new(); // output
    let mut ops: Vec<&Tok> = Vec::new(); // operator stack

    for tok in toks {
        match tok.typ {
            TokTyp::Number(_) | TokTyp::Variable => out.push(tok.clone()),

            TokTyp::Function(_) => ops.push(tok),

            TokTyp::Op(o1) => {
                pop_while(&mut ops, &mut out, |top| yields_to(o1, top));
                ops.push(tok);
            }

            TokTyp::Comma => {
                pop_while(&mut ops, &mut out, |top| *top != TokTyp::OpenParen);
            }

            TokTyp::OpenParen => ops.push(tok),

            TokTyp::CloseParen => {
                pop_while(&mut ops, &mut out, |top| *top != TokTyp::OpenParen);

                if ops.pop().is_none() {
                    return Err(ParseErr::new(ParseErrTyp::ParenMismatch, tok));
                }

                // attach a call to its argument list; prefix `neg` stays and
                // is ordered against the next operator by its binding
                if let Some(&top) = ops.last() {
                    if let TokTyp::Function(fun) = top.typ {
                        if fun.binding == CALL_BINDING {
                            ops.pop();
                            out.push(top.clone());
                        }
                    }
                }
            }

            TokTyp::End => {}

            TokTyp::Invalid => return Err(ParseErr::new(ParseErrTyp::InvalidToken, tok)),
        }
    }

    while let Some(top) = ops.pop() {
        if let TokTyp::OpenParen | TokTyp::CloseParen = top.typ {
            return Err(ParseErr::new(ParseErrTyp::ParenMismatch, top));
        }
        out.push(top.clone());
    }

    Ok(Program::new(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lex::tokenize;

    fn rpn(src: &str) -> String {
        parse(&tokenize(src)).unwrap().to_string()
    }

    fn err(src: &str) -> ParseErr {
        parse(&tokenize(src)).unwrap_err()
    }

    #[test]
    fn precedence_and_associativity() {
        assert_eq!(rpn("1+2*3"), "1 2 3 * +");
        assert_eq!(rpn("1-2-3"), "1 2 - 3 -");
        assert_eq!(rpn("2^3^2"), "2 3 2 ^ ^");
        assert_eq!(rpn("(1+2)*3"), "1 2 + 3 *");
    }

    #[test]
    fn functions_attach_to_argument_lists() {
        assert_eq!(rpn("sin(x)^2"), "x sin 2 ^");
        assert_eq!(rpn("pow(x+1, 2)"), "x 1 + 2 pow");
        assert_eq!(rpn("sin(cos(x))"), "x cos sin");
        assert_eq!(rpn("-sin(x)"), "x sin neg");
        assert_eq!(rpn("-(x+1)^2"), "x 1 + 2 ^ neg");
        assert_eq!(rpn("sin(-(x))"), "x neg sin");
        assert_eq!(rpn("pow(-(x), 2)"), "x neg 2 pow");
    }

    #[test]
    fn implicit_multiplication_parses_like_explicit() {
        assert_eq!(rpn("2x"), rpn("2*x"));
        assert_eq!(rpn("sin(x)cos(x)"), rpn("sin(x)*cos(x)"));
        assert_eq!(rpn("3(x+1)"), rpn("3*(x+1)"));
    }

    #[test]
    fn mismatched_parentheses() {
        let e = err("(1+2");
        assert_eq!(e.typ, ParseErrTyp::ParenMismatch);
        assert_eq!(e.loc.start(), 0);

        let e = err("1+2)");
        assert_eq!(e.typ, ParseErrTyp::ParenMismatch);
        assert_eq!(e.loc.start(), 3);

        assert_eq!(err("sin(x").typ, ParseErrTyp::ParenMismatch);
    }

    #[test]
    fn invalid_tokens_fail_fast() {
        let e = err("x $ 2");
        assert_eq!(e.typ, ParseErrTyp::InvalidToken);
        assert_eq!(e.loc.get(), "$");
    }

    #[test]
    fn parsing_is_idempotent() {
        let toks = tokenize("a sin(x)^-2 + pow(x, y) / (1 - x)");
        assert_eq!(parse(&toks).unwrap(), parse(&toks).unwrap());
    }
}
