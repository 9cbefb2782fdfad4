// SPDX: CC0-1.0

use crate::{
    eval::{Env, Program},
    graph::Polyline,
    lex::{SubStr, TokTyp},
    stdlib::{self, X, Y},
    Number, Point, Viewport,
};
use anyhow::Context;
use core::fmt;
use std::{
    io::{self, stdin, BufRead, Write},
    sync::Arc,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Help,
    Quit,
    SetExpr,
    Select,
    Add,
    List,
    Param,
    Params,
    SetWin,
    Pan,
    Zoom,
    Refresh,
    PrintProg,
    Plot,
}

impl Command {
    pub const fn exhaustive() -> &'static [Command] {
        &[
            Self::Help,
            Self::Quit,
            Self::SetExpr,
            Self::Select,
            Self::Add,
            Self::List,
            Self::Param,
            Self::Params,
            Self::SetWin,
            Self::Pan,
            Self::Zoom,
            Self::Refresh,
            Self::PrintProg,
            Self::Plot,
        ]
    }

    pub const fn help(&self) -> &'static str {
        match self {
            Self::Help => "display help for each command",
            Self::Quit => "quit the shell",
            Self::SetExpr => "set expression of the active slot (use 'lhs = rhs' for implicit curves)",
            Self::Select => "choose the active slot",
            Self::Add => "add a new slot and make it active",
            Self::List => "list slots and their graphs",
            Self::Param => "assign a parameter as 'name=value'",
            Self::Params => "list parameters",
            Self::SetWin => "set viewport parameters",
            Self::Pan => "move the viewport by a number of pixels and resample every slot",
            Self::Zoom => "zoom in (positive) or out (negative) by a number of steps",
            Self::Refresh => "resample every slot for the current viewport",
            Self::PrintProg => "print program compiled from the active expression (for debugging)",
            Self::Plot => "write every slot's graph to an svg file",
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::Quit => "quit",
            Self::SetExpr => "set",
            Self::Select => "slot",
            Self::Add => "add",
            Self::List => "list",
            Self::Param => "param",
            Self::Params => "params",
            Self::SetWin => "window",
            Self::Pan => "pan",
            Self::Zoom => "zoom",
            Self::Refresh => "refresh",
            Self::PrintProg => "prog",
            Self::Plot => "plot",
        }
    }
}

impl core::str::FromStr for Command {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::exhaustive()
            .iter()
            .find(|c| c.name() == s)
            .copied()
            .ok_or(())
    }
}

pub fn input<W: Write>(out: W, prompt: impl fmt::Display) -> anyhow::Result<String> {
    fn inner<W: Write>(mut out: W, prompt: impl fmt::Display) -> io::Result<String> {
        write!(out, "{prompt}")?;
        out.flush()?;
        let mut stdin = stdin().lock();
        let mut s = String::new();
        stdin.read_line(&mut s)?;
        Ok(s.trim().to_string())
    }

    let s = inner(out, prompt).context("read from standard input failed")?;
    Ok(s)
}

pub fn read_fromstr<W: Write, T: core::str::FromStr>(
    mut out: W,
    prompt: impl fmt::Display,
    ignore_empty: bool,
) -> anyhow::Result<Result<Option<T>, <T as core::str::FromStr>::Err>>
where
    <T as core::str::FromStr>::Err: fmt::Display,
{
    let input = Arc::new(input(&mut out, prompt)?);
    if ignore_empty && input.is_empty() {
        return Ok(Ok(None));
    }
    match input.parse::<T>() {
        Ok(new) => Ok(Ok(Some(new))),
        Err(err) => {
            writeln!(out)?;
            underline(&mut out, &SubStr::all(input))?;
            writeln!(out, "parse error: {err}")?;
            Ok(Err(err))
        }
    }
}

pub fn underline<W: Write>(mut out: W, span: &SubStr) -> io::Result<()> {
    writeln!(out, "{}", span.src())?;
    writeln!(
        out,
        "{}{}",
        " ".repeat(span.start()),
        "^".repeat(span.len().max(1))
    )?;
    Ok(())
}

pub fn dump_program<W: Write>(
    mut out: W,
    prog: &Program,
    title: core::fmt::Arguments,
) -> io::Result<()> {
    writeln!(out, "{title}: ")?;
    if prog.is_empty() {
        writeln!(out, "  (empty)")?;
    }
    for tok in prog.toks() {
        match tok.typ {
            TokTyp::Number(val) => writeln!(out, "  push {val}")?,
            TokTyp::Variable => writeln!(out, "  load '{}'", tok.text())?,
            TokTyp::Op(op) => writeln!(out, "  call '{op}'")?,
            TokTyp::Function(fun) => writeln!(out, "  call '{}'", fun.name)?,
            _ => writeln!(out, "  ({tok})")?,
        }
    }
    Ok(())
}

pub fn expr_undefined<W: Write>(mut out: W) -> io::Result<()> {
    writeln!(out, "error: no expression is defined")
}

/// Map common math symbols to ASCII and rewrite `lhs = rhs` as
/// `(lhs)-(rhs)`, so an equation is plotted as the zero set of the difference.
pub fn normalize(src: &str) -> String {
    let s = src
        .replace('π', "pi")
        .replace(&['φ', 'Φ'][..], "phi")
        .replace(&['·', '×'][..], "*")
        .replace('−', "-");
    match s.split_once('=') {
        Some((lhs, rhs)) => format!("({})-({})", lhs.trim(), rhs.trim()),
        None => s,
    }
}

/// Apply a `name=value` line to `env`. Malformed lines change nothing.
pub fn assign_param(line: &str, env: &mut Env) -> bool {
    let Some((name, val)) = line.split_once('=') else {
        return false;
    };
    let (name, val) = (name.trim(), val.trim());
    if name.is_empty() || val.is_empty() {
        return false;
    }
    match val.parse::<Number>() {
        Ok(val) if val.is_finite() => {
            env.insert(name.to_owned(), val);
            true
        }
        _ => false,
    }
}

/// Known identifier closest to `name`, as `(kind, identifier)`.
pub fn most_similar<'a>(name: &str, env: &'a Env) -> Option<(&'static str, &'a str)> {
    let name = name.to_ascii_lowercase();
    stdlib::FUNCTIONS
        .iter()
        .map(|fun| ("function", fun.name))
        .chain(stdlib::CONSTANTS.iter().map(|(c, _)| ("constant", *c)))
        .chain(env.keys().map(|k| ("parameter", k.as_str())))
        .map(|(kind, ident)| {
            let sim = strsim::normalized_damerau_levenshtein(&name, &ident.to_ascii_lowercase());
            (sim, kind, ident)
        })
        .filter(|(sim, ..)| *sim > 0.3)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, kind, ident)| (kind, ident))
}

/// Warn about variables that silently read as zero.
pub fn undefined_notes<W: Write>(mut out: W, prog: &Program, env: &Env) -> io::Result<()> {
    for name in prog.variables() {
        if name == X || name == Y || env.contains_key(name) {
            continue;
        }
        writeln!(out, "note: '{name}' is not defined and evaluates to 0")?;
        if let Some((kind, ident)) = most_similar(name, env) {
            writeln!(out, "note: {kind} '{ident}' has a similar name")?;
        }
    }
    Ok(())
}

pub fn write_svg<W: Write>(mut out: W, viewport: &Viewport, lines: &[Polyline]) -> io::Result<()> {
    let (w, h) = (viewport.width.get(), viewport.height.get());
    let Point { x: cx, y: cy } = viewport.center;
    writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#
    )?;
    writeln!(out, r#"  <rect width="100%" height="100%" fill="black"/>"#)?;
    // axes
    writeln!(out, r#"  <line x1="0" y1="{cy}" x2="{w}" y2="{cy}" stroke="white"/>"#)?;
    writeln!(out, r#"  <line x1="{cx}" y1="0" x2="{cx}" y2="{h}" stroke="white"/>"#)?;
    for line in lines {
        write!(
            out,
            r#"  <polyline fill="none" stroke="{}" points=""#,
            line.color
        )?;
        for (i, p) in line.points.iter().enumerate() {
            if i > 0 {
                write!(out, " ")?;
            }
            write!(out, "{:.2},{:.2}", p.x, p.y)?;
        }
        writeln!(out, r#""/>"#)?;
    }
    writeln!(out, "</svg>")
}
