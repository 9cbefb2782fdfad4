// SPDX: CC0-1.0

use anyhow::Context;
use chrono::{DateTime, Local};
use core::num::NonZeroU32;
use implicit_plot::{
    eval::{Env, EvalErrTyp},
    graph::{CommitErr, Outcome, Polyline, Slot},
    lex::SubStr,
    parse::ParseErrTyp,
    shell::{self, Command},
    Color, Number, Viewport, Window,
};
use std::{
    fs::OpenOptions,
    io::{stdout, BufWriter, Write},
    process::ExitCode,
    sync::Arc,
};

const WINDOW_RES: [u32; 2] = [1000, 800];
const SIDEBAR_WIDTH: u32 = 400;
const INITIAL_SCALE: Number = 50.0;
const INITIAL_SLOTS: usize = 3;
const MAX_SLOTS: usize = 15;

const PALETTE: [Color; MAX_SLOTS] = [
    Color::rgb(0, 255, 255),
    Color::rgb(255, 0, 255),
    Color::rgb(255, 255, 0),
    Color::rgb(255, 0, 0),
    Color::rgb(0, 255, 0),
    Color::rgb(0, 0, 255),
    Color::rgb(255, 128, 0),
    Color::rgb(128, 0, 255),
    Color::rgb(0, 200, 200),
    Color::rgb(200, 0, 200),
    Color::rgb(200, 200, 0),
    Color::rgb(0, 150, 0),
    Color::rgb(0, 0, 150),
    Color::rgb(150, 0, 0),
    Color::rgb(100, 100, 100),
];

fn output_svg_filename(now: DateTime<Local>) -> String {
    format!(
        "{}_output-{}.{}",
        env!("CARGO_PKG_NAME"),
        now.format("%Y-%m-%d_%H-%M-%S"),
        "svg"
    )
}

fn main() -> ExitCode {
    match try_main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("unexpected error: {err}");
            let chain = err.chain();
            if chain.len() > 1 {
                eprintln!();
                eprintln!("context:");
                for it in chain.skip(1) {
                    eprintln!("  {it}");
                }
            }
            ExitCode::FAILURE
        }
    }
}

#[derive(Debug)]
struct State {
    slots: Vec<Slot>,
    active: usize,
    env: Env,
    win: Window,
}

impl State {
    fn new(viewport: Viewport) -> Self {
        let mut state = Self {
            slots: Vec::new(),
            active: 0,
            env: Env::new(),
            win: Window::new(viewport),
        };
        for _ in 0..INITIAL_SLOTS {
            state.add_slot();
        }
        state
    }

    fn add_slot(&mut self) -> bool {
        if self.slots.len() >= MAX_SLOTS {
            return false;
        }
        let color = PALETTE[self.slots.len() % PALETTE.len()];
        self.slots.push(Slot::new(color));
        true
    }
}

fn try_main() -> anyhow::Result<()> {
    let [width, height] = WINDOW_RES;
    let viewport = Viewport::centered(
        INITIAL_SCALE,
        NonZeroU32::new(width - SIDEBAR_WIDTH).context("graph area has no width")?,
        NonZeroU32::new(height).context("graph area has no height")?,
    );
    let mut state = State::new(viewport);

    let mut stdout = BufWriter::new(stdout());
    loop {
        let active = state.active;
        match state.slots[active].expr() {
            Some(expr) => writeln!(stdout, "[{}] f = {expr}", active + 1)?,
            None => writeln!(stdout, "[{}] f is not set", active + 1)?,
        }

        let mut try_cmd = shell::input(&mut stdout, "> ")?;
        try_cmd.make_ascii_lowercase();
        writeln!(stdout)?;

        if let Ok(cmd) = try_cmd.parse::<Command>() {
            match cmd {
                Command::Help => {
                    for c in Command::exhaustive() {
                        writeln!(stdout, "{name}: {help}", name = c.name(), help = c.help())?;
                    }
                }

                Command::Quit => break,

                Command::SetExpr => set_expr(&mut stdout, &mut state)?,

                Command::Select => select_slot(&mut stdout, &mut state)?,

                Command::Add => {
                    if state.add_slot() {
                        state.active = state.slots.len() - 1;
                        writeln!(stdout, "added slot {}", state.active + 1)?;
                    } else {
                        writeln!(stdout, "error: at most {MAX_SLOTS} slots are available")?;
                    }
                }

                Command::List => list_slots(&mut stdout, &state)?,

                Command::Param => {
                    let line = shell::input(&mut stdout, "name=value: ")?;
                    if shell::assign_param(&line, &mut state.env) {
                        refresh_all(&mut stdout, &mut state)?;
                    }
                }

                Command::Params => {
                    let mut params: Vec<_> = state.env.iter().collect();
                    params.sort_by(|a, b| a.0.cmp(b.0));
                    if params.is_empty() {
                        writeln!(stdout, "no parameters are defined")?;
                    }
                    for (name, val) in params {
                        writeln!(stdout, "{name} = {val}")?;
                    }
                }

                Command::SetWin => {
                    if set_win(&mut stdout, &mut state)? {
                        refresh_all(&mut stdout, &mut state)?;
                    }
                }

                Command::Pan => pan(&mut stdout, &mut state)?,

                Command::Zoom => {
                    if zoom(&mut stdout, &mut state)? {
                        refresh_all(&mut stdout, &mut state)?;
                    }
                }

                Command::Refresh => refresh_all(&mut stdout, &mut state)?,

                Command::PrintProg => {
                    if let Some(prog) = state.slots[state.active].prog() {
                        shell::dump_program(&mut stdout, prog, format_args!("program"))?;
                    } else {
                        shell::expr_undefined(&mut stdout)?;
                    }
                }

                Command::Plot => plot(&mut stdout, &state)?,
            }
        } else {
            writeln!(stdout, r#"Unknown command, try "help" for help"#)?;
        }

        writeln!(stdout)?;
    }
    stdout.flush()?;
    Ok(())
}

fn select_slot<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    let count = state.slots.len();
    if let Ok(Some(idx)) =
        shell::read_fromstr::<_, usize>(&mut out, format_args!("slot (1-{count}) = "), true)?
    {
        if (1..=count).contains(&idx) {
            state.active = idx - 1;
        } else {
            writeln!(out, "error: there is no slot {idx}")?;
        }
    }
    Ok(())
}

fn list_slots<W: Write>(mut out: W, state: &State) -> anyhow::Result<()> {
    for (i, slot) in state.slots.iter().enumerate() {
        let marker = if i == state.active { '*' } else { ' ' };
        write!(out, "{marker}{}: {} ", i + 1, slot.color())?;
        match slot.expr() {
            Some(expr) => writeln!(
                out,
                "f = {expr} ({} polylines)",
                slot.graph().len()
            )?,
            None => writeln!(out, "(empty)")?,
        }
    }
    Ok(())
}

fn set_expr<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    // read input expression
    let input = shell::input(&mut out, "f = ")?;
    if input.is_empty() {
        return Ok(());
    }
    let expr = Arc::new(shell::normalize(&input));

    let State {
        slots,
        active,
        env,
        win,
    } = state;
    let slot = &mut slots[*active];

    match slot.commit(Arc::clone(&expr), &*env, &*win, None) {
        Ok(Outcome::Plotted) => {
            writeln!(out, "plotted {} polylines", slot.graph().len())?;
            if let Some(prog) = slot.prog() {
                shell::undefined_notes(&mut out, prog, env)?;
            }
        }

        Ok(Outcome::Empty) => {
            writeln!(out, "nothing to plot in this window; keeping the previous graph")?;
        }

        Ok(Outcome::Cancelled) => writeln!(out, "cancelled")?,

        Err(CommitErr::Parse(err)) => {
            writeln!(out)?;
            shell::underline(&mut out, &err.loc)?;
            writeln!(out, "parse error: {}", err.typ)?;
            match err.typ {
                ParseErrTyp::InvalidToken => writeln!(
                    out,
                    "note: available tokens are numbers, alphabetic identifiers, and symbols +-*/^,()"
                )?,
                ParseErrTyp::ParenMismatch => {}
            }
        }

        Err(CommitErr::Eval(err)) => {
            writeln!(out)?;
            match err.tok {
                Some(ref tok) => shell::underline(&mut out, &tok.loc)?,
                None => shell::underline(&mut out, &SubStr::all(expr))?,
            }
            writeln!(out, "evaluation error: {}", err.typ)?;
            match err.typ {
                EvalErrTyp::MissingArgs { .. } => {}
                EvalErrTyp::StackMismatch { .. } => writeln!(
                    out,
                    "note: the expression must reduce to exactly one value"
                )?,
                EvalErrTyp::Empty => writeln!(out, "note: the expression is empty")?,
            }
        }
    }

    Ok(())
}

/// Resample every slot that has a program. Failures keep the old graphs.
fn refresh_all<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    for (i, slot) in state.slots.iter_mut().enumerate() {
        if slot.prog().is_none() {
            continue;
        }
        match slot.refresh(&state.env, &state.win, None) {
            Ok(Outcome::Plotted) => {}
            Ok(Outcome::Empty) => writeln!(
                out,
                "note: slot {} has nothing to plot in this window; keeping the previous graph",
                i + 1
            )?,
            Ok(Outcome::Cancelled) => writeln!(out, "note: slot {} was cancelled", i + 1)?,
            Err(err) => writeln!(out, "error: slot {}: evaluation error: {err}", i + 1)?,
        }
    }
    Ok(())
}

fn set_win<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<bool> {
    let mut viewport = state.win.viewport.clone();
    writeln!(out, "win = {:#}", state.win)?;
    writeln!(out)?;
    writeln!(out, "note: leave blank to skip")?;

    let mut center = viewport.center;
    for (name, dst) in [("center x", &mut center.x), ("center y", &mut center.y)] {
        match shell::read_fromstr::<_, Number>(
            &mut out,
            format_args!("?{name} (is {cur}) = ", cur = *dst),
            true,
        )? {
            Ok(Some(new)) => *dst = new,
            Ok(None) => {}
            Err(_) => return Ok(false),
        }
    }
    if !viewport.set_center(center) {
        writeln!(out, "error: center must be finite")?;
        return Ok(false);
    }

    match shell::read_fromstr::<_, Number>(
        &mut out,
        format_args!("?scale (is {cur}) = ", cur = viewport.scale()),
        true,
    )? {
        Ok(Some(new)) => viewport.set_scale(new),
        Ok(None) => {}
        Err(_) => return Ok(false),
    }

    writeln!(out, "note: width and height must be nonzero integers")?;
    for (name, dst) in [
        ("width", &mut viewport.width),
        ("height", &mut viewport.height),
    ] {
        match shell::read_fromstr::<_, NonZeroU32>(
            &mut out,
            format_args!("?{name} (is {cur}) = ", cur = *dst),
            true,
        )? {
            Ok(Some(new)) => *dst = new,
            Ok(None) => {}
            Err(_) => return Ok(false),
        }
    }

    state.win = Window::new(viewport);
    Ok(true)
}

fn pan<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    let (mut dx, mut dy): (Number, Number) = (0.0, 0.0);
    for (name, dst) in [("dx", &mut dx), ("dy", &mut dy)] {
        match shell::read_fromstr::<_, Number>(&mut out, format_args!("?{name} (pixels) = "), true)? {
            Ok(Some(new)) => *dst = new,
            Ok(None) => {}
            Err(_) => return Ok(()),
        }
    }

    pan_by(&mut out, state, dx, dy)
}

/// Finish a pan: move the viewport, then resample every slot so curves reach
/// the new edges.
fn pan_by<W: Write>(mut out: W, state: &mut State, dx: Number, dy: Number) -> anyhow::Result<()> {
    let mut viewport = state.win.viewport.clone();
    if !viewport.pan(dx, dy) {
        writeln!(out, "error: pan offsets must be finite")?;
        return Ok(());
    }
    state.win = Window::new(viewport);
    refresh_all(&mut out, state)
}

fn zoom<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<bool> {
    let steps = match shell::read_fromstr::<_, i32>(&mut out, "steps = ", true)? {
        Ok(Some(steps)) => steps,
        Ok(None) | Err(_) => return Ok(false),
    };

    let mut viewport = state.win.viewport.clone();
    for _ in 0..steps.unsigned_abs() {
        if steps > 0 {
            viewport.zoom_in();
        } else {
            viewport.zoom_out();
        }
    }
    writeln!(out, "scale = {}", viewport.scale())?;
    state.win = Window::new(viewport);
    Ok(true)
}

fn plot<W: Write>(mut out: W, state: &State) -> anyhow::Result<()> {
    let center = state.win.viewport.center;
    let lines: Vec<Polyline> = state
        .slots
        .iter()
        .flat_map(|slot| slot.view(center))
        .collect();
    if lines.is_empty() {
        shell::expr_undefined(&mut out)?;
        return Ok(());
    }

    let svg_path = output_svg_filename(Local::now());
    let mut svg = BufWriter::new(
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&svg_path)
            .context("failed to open output svg file")?,
    );
    shell::write_svg(&mut svg, &state.win.viewport, &lines)
        .context("failed to write to output svg file")?;

    // done with the file
    svg.flush()?;
    svg.get_mut().sync_data()?;
    drop(svg);

    writeln!(out, "wrote {} polylines to '{svg_path}'", lines.len())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> State {
        State::new(Viewport::centered(
            INITIAL_SCALE,
            NonZeroU32::new(600).unwrap(),
            NonZeroU32::new(400).unwrap(),
        ))
    }

    #[test]
    fn starts_with_palette_slots() {
        let mut state = state();
        assert_eq!(state.slots.len(), INITIAL_SLOTS);
        assert_eq!(state.slots[1].color(), PALETTE[1]);
        while state.add_slot() {}
        assert_eq!(state.slots.len(), MAX_SLOTS);
    }

    #[test]
    fn pan_resamples_to_the_new_edges() {
        let mut state = state();
        let env = Env::new();
        state.slots[0]
            .commit(Arc::new("x".into()), &env, &state.win, None)
            .unwrap();

        let mut out = Vec::new();
        pan_by(&mut out, &mut state, 100.0, 0.0).unwrap();

        // a shifted cache would start 100 px right of the edge
        let line = &state.slots[0].view(state.win.viewport.center)[0];
        assert!(line.points[0].x.abs() < 1e-9, "{:?}", line.points[0]);
        assert_eq!(state.win.x, -8.0..4.0);
    }

    #[test]
    fn pan_rejects_non_finite_offsets() {
        let mut state = state();
        let before = state.win.viewport.clone();
        let mut out = Vec::new();
        pan_by(&mut out, &mut state, Number::NAN, 0.0).unwrap();
        pan_by(&mut out, &mut state, 0.0, Number::INFINITY).unwrap();
        assert_eq!(state.win.viewport, before);
        assert!(String::from_utf8(out).unwrap().contains("must be finite"));
    }
}
