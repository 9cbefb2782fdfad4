// SPDX: CC0-1.0

use crate::{
    eval::OperatorTyp,
    stdlib::{self, Fun},
    Number,
};
use core::{fmt, iter::Peekable, str::CharIndices};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubStr {
    // yes, silly, but atomic operations are cheap for this use case
    src: Arc<String>,
    start: usize,
    len: usize,
}

impl SubStr {
    #[inline]
    pub const fn new(src: Arc<String>, start: usize, len: usize) -> Self {
        Self { src, start, len }
    }

    #[inline]
    pub fn all(src: Arc<String>) -> Self {
        let len = src.len();
        Self::new(src, 0, len)
    }

    pub fn src(&self) -> Arc<String> {
        Arc::clone(&self.src)
    }

    pub const fn start(&self) -> usize {
        self.start
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self) -> &str {
        &self.src[self.start..self.start + self.len]
    }
}

impl fmt::Display for SubStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.get())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TokTyp {
    /// Literal or folded constant.
    Number(Number),
    Variable,
    Op(OperatorTyp),
    Function(Fun),
    OpenParen,
    CloseParen,
    Comma,
    End,
    Invalid,
}

impl TokTyp {
    /// Token after which an operand has been completed.
    pub const fn ends_value(&self) -> bool {
        matches!(self, Self::Number(_) | Self::Variable | Self::CloseParen)
    }

    /// Token that begins a new operand.
    pub const fn starts_value(&self) -> bool {
        matches!(
            self,
            Self::Number(_) | Self::Variable | Self::Function(_) | Self::OpenParen
        )
    }

    /// Position where a `-` must be negation rather than subtraction.
    const fn expects_operand(prev: Option<&Self>) -> bool {
        matches!(
            prev,
            None | Some(Self::Op(_) | Self::Function(_) | Self::OpenParen | Self::Comma)
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Tok {
    pub typ: TokTyp,
    pub loc: SubStr,
}

impl Tok {
    pub fn text(&self) -> &str {
        self.loc.get()
    }
}

impl fmt::Display for Tok {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.typ {
            TokTyp::Function(fun) => f.write_str(fun.name),
            TokTyp::Op(op) => write!(f, "{op}"),
            TokTyp::End => f.write_str("<end>"),
            _ => f.write_str(self.text()),
        }
    }
}

/// Infix lexer. Never fails: unknown characters come out as
/// [`TokTyp::Invalid`] and the stream always ends with one [`TokTyp::End`].
///
/// Implicit multiplication is inserted as tokens are yielded, so `2x(x+1)`
/// lexes exactly like `2*x*(x+1)`.
#[derive(Debug)]
pub struct Lexer<'src> {
    src: &'src Arc<String>,
    cur: Peekable<CharIndices<'src>>,
    prev: Option<TokTyp>,  // last yielded token
    pending: Option<Tok>,  // held back while a synthetic `*` is yielded
    ended: bool,
}

impl<'src> Lexer<'src> {
    pub fn new(src: &'src Arc<String>) -> Self {
        Self {
            src,
            cur: src.char_indices().peekable(),
            prev: None,
            pending: None,
            ended: false,
        }
    }

    fn tok(&self, typ: TokTyp, start: usize, len: usize) -> Tok {
        Tok {
            typ,
            loc: SubStr::new(Arc::clone(self.src), start, len),
        }
    }

    fn trim_whitespace(&mut self) {
        while self
            .cur
            .next_if(|(_, chr)| chr.is_whitespace())
            .is_some()
        {}
    }

    /// Consume characters while `predicate` holds and return the end index.
    fn consume_while<P>(&mut self, start: usize, mut predicate: P) -> usize
    where
        P: FnMut(char) -> bool,
    {
        let mut end = start;
        while let Some((idx, chr)) = self.cur.next_if(|&(_, chr)| predicate(chr)) {
            end = idx + chr.len_utf8();
        }
        end
    }

    fn number(&mut self, start: usize) -> Tok {
        let mut dot_seen = false;
        let end = self.consume_while(start, |chr| {
            if chr == '.' {
                if dot_seen {
                    return false;
                }
                dot_seen = true;
                true
            } else {
                chr.is_ascii_digit()
            }
        });
        let typ = match self.src[start..end].parse::<Number>() {
            Ok(val) => TokTyp::Number(val),
            // a lone '.'
            Err(_) => TokTyp::Invalid,
        };
        self.tok(typ, start, end - start)
    }

    fn ident(&mut self, start: usize) -> Tok {
        let end = self.consume_while(start, |chr| chr.is_ascii_alphabetic());
        let name = &self.src[start..end];
        let typ = if let Some(fun) = stdlib::function(name) {
            TokTyp::Function(fun)
        } else if let Some(val) = stdlib::constant(name) {
            TokTyp::Number(val)
        } else {
            TokTyp::Variable
        };
        self.tok(typ, start, end - start)
    }

    /// Next token without implicit multiplication.
    fn scan(&mut self) -> Option<Tok> {
        self.trim_whitespace();

        let Some((idx, chr)) = self.cur.peek().copied() else {
            if self.ended {
                return None;
            }
            self.ended = true;
            return Some(self.tok(TokTyp::End, self.src.len(), 0));
        };

        if chr.is_ascii_digit() || chr == '.' {
            return Some(self.number(idx));
        }
        if chr.is_ascii_alphabetic() {
            return Some(self.ident(idx));
        }

        self.cur.next();
        let typ = match chr {
            '-' if TokTyp::expects_operand(self.prev.as_ref()) => TokTyp::Function(stdlib::NEG),
            '+' => TokTyp::Op(OperatorTyp::Add),
            '-' => TokTyp::Op(OperatorTyp::Sub),
            '*' => TokTyp::Op(OperatorTyp::Mul),
            '/' => TokTyp::Op(OperatorTyp::Div),
            '^' => TokTyp::Op(OperatorTyp::Exp),
            '(' => TokTyp::OpenParen,
            ')' => TokTyp::CloseParen,
            ',' => TokTyp::Comma,
            _ => TokTyp::Invalid,
        };
        // @unicode
        Some(self.tok(typ, idx, chr.len_utf8()))
    }
}

impl Iterator for Lexer<'_> {
    type Item = Tok;

    fn next(&mut self) -> Option<Self::Item> {
        let tok = match self.pending.take() {
            Some(tok) => tok,
            None => {
                let tok = self.scan()?;
                if self.prev.is_some_and(|prev| prev.ends_value()) && tok.typ.starts_value() {
                    let mul = self.tok(TokTyp::Op(OperatorTyp::Mul), tok.loc.start(), 0);
                    self.pending = Some(tok);
                    mul
                } else {
                    tok
                }
            }
        };
        self.prev = Some(tok.typ);
        Some(tok)
    }
}

pub fn tokenize(src: &str) -> Vec<Tok> {
    let src = Arc::new(src.to_owned());
    Lexer::new(&src).collect()
}
