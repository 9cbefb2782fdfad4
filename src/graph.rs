// SPDX: CC0-1.0

//! Turns a compiled expression into screen-space polylines.
//!
//! Expressions that read `y` are implicit relations `F(x, y) = 0` and are
//! contoured over a grid covering the viewport. Everything else is an explicit
//! `y = f(x)` and is sampled along x, split wherever the curve jumps or leaves
//! the reals.

use crate::{
    contour::{self, Grid},
    eval::{self, Bind, EvalErr, Program, Vars},
    lex::Lexer,
    parse::{self, ParseErr},
    stdlib::Y,
    Color, Number, Point, Viewport, Window,
};
use core::{
    mem,
    ops::Range,
    sync::atomic::{AtomicBool, Ordering},
};
use std::sync::Arc;

/// Upper bound on contour grid nodes along either axis.
pub const MAX_GRID: usize = 300;

/// How many x samples run between two looks at the cancellation flag.
const CANCEL_STRIDE: usize = 256;

/// Upper bound on x samples in one explicit pass. Ranges that would need more
/// are sampled from their start only.
pub const MAX_SAMPLES: usize = 1 << 20;

/// Ordered screen-space points drawn as one connected line.
#[derive(Clone, Debug, PartialEq)]
pub struct Polyline {
    pub points: Vec<Point<Number>>,
    pub color: Color,
}

impl Polyline {
    pub fn translated(&self, dx: Number, dy: Number) -> Self {
        Self {
            points: self
                .points
                .iter()
                .map(|p| Point::new(p.x + dx, p.y + dy))
                .collect(),
            color: self.color,
        }
    }
}

/// A finite world point, or `None` where evaluation gave a non-finite value.
pub type Sample = Option<Point<Number>>;

/// Largest jump in y (world units) still drawn as connected:
/// `max(10, 10 / (scale / 5))`.
pub fn jump_threshold(scale: Number) -> Number {
    Number::max(10.0, 50.0 / scale)
}

pub fn is_implicit(prog: &Program) -> bool {
    prog.uses(Y)
}

fn cancelled(cancel: Option<&AtomicBool>) -> bool {
    cancel.is_some_and(|flag| flag.load(Ordering::Relaxed))
}

/// x values from `x.start` up to and including `x.end`, at most
/// [`MAX_SAMPLES`] of them.
fn x_steps(x: &Range<Number>, step: Number) -> impl Iterator<Item = Number> {
    let count = if step > 0.0 && step.is_finite() && x.start.is_finite() && x.end >= x.start {
        // computing by index keeps rounding from accumulating; the float to
        // int cast saturates, so an infinite quotient lands on the cap
        let last = ((x.end - x.start) / step).floor() as usize;
        last.min(MAX_SAMPLES - 1) + 1
    } else {
        0
    };
    let start = x.start;
    (0..count).map(move |i| start + i as Number * step)
}

/// Evaluate an explicit curve at each x step, in world coordinates.
pub fn sample_world<V: Vars + ?Sized>(
    prog: &Program,
    x: Range<Number>,
    step: Number,
    vars: &V,
) -> Result<Vec<Sample>, EvalErr> {
    let mut stack = Vec::new();
    x_steps(&x, step)
        .map(|x| {
            let y = eval::eval(prog, &Bind { vars, x, y: None }, &mut stack)?;
            Ok(y.is_finite().then(|| Point::new(x, y)))
        })
        .collect()
}

/// Accumulates screen points and cuts them into polylines.
struct Segmenter<'a> {
    viewport: &'a Viewport,
    color: Color,
    cur: Vec<Point<Number>>,
    out: Vec<Polyline>,
}

impl<'a> Segmenter<'a> {
    fn new(viewport: &'a Viewport, color: Color) -> Self {
        Self {
            viewport,
            color,
            cur: Vec::new(),
            out: Vec::new(),
        }
    }

    fn push(&mut self, world: Point<Number>) {
        self.cur.push(self.viewport.to_screen(world));
    }

    /// End the current polyline, dropping it if it is a lone point.
    fn cut(&mut self) {
        let points = mem::take(&mut self.cur);
        if points.len() >= 2 {
            self.out.push(Polyline {
                points,
                color: self.color,
            });
        }
    }

    fn finish(mut self) -> Vec<Polyline> {
        self.cut();
        self.out
    }
}

fn explicit<V: Vars + ?Sized>(
    prog: &Program,
    vars: &V,
    win: &Window,
    color: Color,
    cancel: Option<&AtomicBool>,
) -> Result<Vec<Polyline>, EvalErr> {
    let threshold = jump_threshold(win.viewport.scale());
    let mut seg = Segmenter::new(&win.viewport, color);
    let mut stack = Vec::new();
    let mut prev_y: Option<Number> = None;

    for (i, x) in x_steps(&win.x, win.step).enumerate() {
        if i % CANCEL_STRIDE == 0 && cancelled(cancel) {
            break;
        }

        let y = eval::eval(prog, &Bind { vars, x, y: None }, &mut stack)?;
        if !y.is_finite() {
            seg.cut();
            prev_y = None;
            continue;
        }
        if prev_y.is_some_and(|prev| (y - prev).abs() > threshold) {
            seg.cut();
        }
        seg.push(Point::new(x, y));
        prev_y = Some(y);
    }

    Ok(seg.finish())
}

/// Grid nodes along one axis for a pixel extent.
fn grid_len(pixels: u32) -> usize {
    MAX_GRID.min(pixels as usize / 2)
}

fn implicit<V: Vars + ?Sized>(
    prog: &Program,
    vars: &V,
    viewport: &Viewport,
    color: Color,
    cancel: Option<&AtomicBool>,
) -> Result<Vec<Polyline>, EvalErr> {
    let cols = grid_len(viewport.width.get());
    let rows = grid_len(viewport.height.get());
    if cols < 2 || rows < 2 {
        return Ok(Vec::new());
    }

    let bounds = viewport.world_bounds();
    let origin = Point::new(bounds.x.start, bounds.y.start);
    let cell = Point::new(
        (bounds.x.end - bounds.x.start) / (cols - 1) as Number,
        (bounds.y.end - bounds.y.start) / (rows - 1) as Number,
    );

    let mut grid = Grid::new(cols);
    let mut stack = Vec::new();
    let mut values = Vec::with_capacity(cols);
    for row in 0..rows {
        if cancelled(cancel) {
            break;
        }
        let y = origin.y + row as Number * cell.y;
        values.clear();
        for col in 0..cols {
            let x = origin.x + col as Number * cell.x;
            let bind = Bind {
                vars,
                x,
                y: Some(y),
            };
            values.push(eval::eval(prog, &bind, &mut stack)?);
        }
        grid.push_row(values.iter().copied());
    }

    Ok(contour::extract(&grid, origin, cell, 0.0)
        .into_iter()
        .map(|[a, b]| Polyline {
            points: vec![viewport.to_screen(a), viewport.to_screen(b)],
            color,
        })
        .collect())
}

/// Sample `prog` for display in `win`.
///
/// Returns no polylines when nothing is plottable. A set `cancel` flag stops
/// the pass early; whatever was finished is still returned and valid.
/// Evaluation errors depend only on the shape of the program, so the first
/// one aborts the whole pass.
pub fn compute_graph<V: Vars + ?Sized>(
    prog: &Program,
    vars: &V,
    win: &Window,
    color: Color,
    cancel: Option<&AtomicBool>,
) -> Result<Vec<Polyline>, EvalErr> {
    if prog.is_empty() {
        Ok(Vec::new())
    } else if is_implicit(prog) {
        implicit(prog, vars, &win.viewport, color, cancel)
    } else {
        explicit(prog, vars, win, color, cancel)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CommitErr {
    #[error("parse error: {0}")]
    Parse(#[from] ParseErr),
    #[error("evaluation error: {0}")]
    Eval(#[from] EvalErr),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The slot now shows the new result.
    Plotted,
    /// Nothing plottable; the previous graph was kept.
    Empty,
    /// The pass was abandoned; the previous graph was kept.
    Cancelled,
}

/// One graphed expression with its cached program and last good result.
#[derive(Clone, Debug)]
pub struct Slot {
    color: Color,
    expr: Option<Arc<String>>,
    prog: Option<Program>,
    graph: Vec<Polyline>,
    origin: Point<Number>, // viewport center the graph was computed at
}

impl Slot {
    pub const fn new(color: Color) -> Self {
        Self {
            color,
            expr: None,
            prog: None,
            graph: Vec::new(),
            origin: Point { x: 0.0, y: 0.0 },
        }
    }

    pub const fn color(&self) -> Color {
        self.color
    }

    pub fn expr(&self) -> Option<&Arc<String>> {
        self.expr.as_ref()
    }

    pub fn prog(&self) -> Option<&Program> {
        self.prog.as_ref()
    }

    pub fn graph(&self) -> &[Polyline] {
        &self.graph
    }

    pub fn clear(&mut self) {
        *self = Self::new(self.color);
    }

    fn store(&mut self, graph: Vec<Polyline>, win: &Window, cancel: Option<&AtomicBool>) -> Outcome {
        if cancelled(cancel) {
            Outcome::Cancelled
        } else if graph.is_empty() {
            Outcome::Empty
        } else {
            self.graph = graph;
            self.origin = win.viewport.center;
            Outcome::Plotted
        }
    }

    /// Compile and plot new expression text.
    ///
    /// On any failure, or when nothing is plottable, the slot keeps its
    /// previous text, program and graph.
    pub fn commit<V: Vars + ?Sized>(
        &mut self,
        expr: Arc<String>,
        vars: &V,
        win: &Window,
        cancel: Option<&AtomicBool>,
    ) -> Result<Outcome, CommitErr> {
        let toks: Vec<_> = Lexer::new(&expr).collect();
        let prog = parse::parse(&toks)?;
        let graph = compute_graph(&prog, vars, win, self.color, cancel)?;
        let outcome = self.store(graph, win, cancel);
        if outcome == Outcome::Plotted {
            self.expr = Some(expr);
            self.prog = Some(prog);
        }
        Ok(outcome)
    }

    /// Re-sample the cached program, e.g. after zooming or changing a
    /// parameter.
    pub fn refresh<V: Vars + ?Sized>(
        &mut self,
        vars: &V,
        win: &Window,
        cancel: Option<&AtomicBool>,
    ) -> Result<Outcome, EvalErr> {
        let Some(prog) = &self.prog else {
            return Ok(Outcome::Empty);
        };
        let graph = compute_graph(prog, vars, win, self.color, cancel)?;
        Ok(self.store(graph, win, cancel))
    }

    /// The cached graph shifted to a new viewport center, without resampling.
    pub fn view(&self, center: Point<Number>) -> Vec<Polyline> {
        let (dx, dy) = (center.x - self.origin.x, center.y - self.origin.y);
        self.graph.iter().map(|line| line.translated(dx, dy)).collect()
    }
}
