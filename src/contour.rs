// SPDX: CC0-1.0

//! Zero-isoline extraction with marching squares.

use crate::{Number, Point};

/// Scalar field sampled on a regular lattice, stored row by row.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Grid {
    cols: usize,
    data: Vec<Number>,
}

impl Grid {
    pub fn new(cols: usize) -> Self {
        Self {
            cols,
            data: Vec::new(),
        }
    }

    pub fn from_fn<F>(rows: usize, cols: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> Number,
    {
        let mut grid = Self::new(cols);
        for row in 0..rows {
            grid.push_row((0..cols).map(|col| f(row, col)));
        }
        grid
    }

    /// Append one row. Missing trailing values are filled with NaN and extra
    /// values are dropped so the grid stays rectangular.
    pub fn push_row<I>(&mut self, row: I)
    where
        I: IntoIterator<Item = Number>,
    {
        let start = self.data.len();
        self.data.extend(row.into_iter().take(self.cols));
        self.data.resize(start + self.cols, Number::NAN);
    }

    pub const fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        if self.cols == 0 {
            0
        } else {
            self.data.len() / self.cols
        }
    }

    pub fn get(&self, row: usize, col: usize) -> Number {
        self.data[row * self.cols + col]
    }
}

/// One cell's piece of the contour, in the grid's coordinate space.
pub type Segment = [Point<Number>; 2];

/// Cell edges in grid-row space: `Top` runs along row `r`, `Bottom` along row
/// `r + 1`. With a positive `cell.y` row `r` is the lower one in world space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Edge {
    Top,
    Right,
    Bottom,
    Left,
}

impl Edge {
    /// Corner indices the edge runs between: 0 is `(r, c)`, 1 is `(r, c + 1)`,
    /// 2 is `(r + 1, c + 1)` and 3 is `(r + 1, c)`.
    const fn corners(&self) -> (usize, usize) {
        match self {
            Self::Top => (0, 1),
            Self::Right => (1, 2),
            Self::Bottom => (2, 3),
            Self::Left => (0, 3),
        }
    }
}

/// Crossed edges for a corner mask, or `None` when the cell has no crossing.
///
/// Saddles (5 and 10) always connect the two row edges.
const fn crossing(mask: u8) -> Option<(Edge, Edge)> {
    use Edge::{Bottom, Left, Right, Top};
    match mask {
        1 | 14 => Some((Top, Left)),
        2 | 13 => Some((Top, Right)),
        3 | 12 => Some((Right, Left)),
        4 | 11 => Some((Bottom, Right)),
        5 | 10 => Some((Top, Bottom)),
        6 | 9 => Some((Top, Bottom)),
        7 | 8 => Some((Left, Bottom)),
        _ => None,
    }
}

/// Interpolation parameter of `iso` between `va` and `vb`, 0 on a flat or
/// non-finite edge.
pub fn edge_t(va: Number, vb: Number, iso: Number) -> Number {
    if va == vb || !va.is_finite() || !vb.is_finite() {
        0.0
    } else {
        (iso - va) / (vb - va)
    }
}

fn lerp(a: Point<Number>, b: Point<Number>, t: Number) -> Point<Number> {
    Point {
        x: a.x + (b.x - a.x) * t,
        y: a.y + (b.y - a.y) * t,
    }
}

/// Extract the `iso` isoline of `grid`, one independent 2-point segment per
/// crossed cell.
///
/// Grid node `(row, col)` sits at `origin + (col * cell.x, row * cell.y)`.
/// Segments are not chained into longer polylines.
pub fn extract(grid: &Grid, origin: Point<Number>, cell: Point<Number>, iso: Number) -> Vec<Segment> {
    let mut segments = Vec::new();
    if grid.rows() < 2 || grid.cols() < 2 {
        return segments;
    }

    for row in 0..grid.rows() - 1 {
        for col in 0..grid.cols() - 1 {
            let v = [
                grid.get(row, col),
                grid.get(row, col + 1),
                grid.get(row + 1, col + 1),
                grid.get(row + 1, col),
            ];
            let mask = v
                .iter()
                .enumerate()
                .filter(|(_, val)| **val >= iso)
                .fold(0u8, |mask, (i, _)| mask | (1 << i));

            let Some((ea, eb)) = crossing(mask) else {
                continue;
            };

            let x0 = origin.x + col as Number * cell.x;
            let x1 = origin.x + (col + 1) as Number * cell.x;
            let y0 = origin.y + row as Number * cell.y;
            let y1 = origin.y + (row + 1) as Number * cell.y;
            let corner = [
                Point::new(x0, y0),
                Point::new(x1, y0),
                Point::new(x1, y1),
                Point::new(x0, y1),
            ];

            let interp = |edge: Edge| {
                let (a, b) = edge.corners();
                lerp(corner[a], corner[b], edge_t(v[a], v[b], iso))
            };
            segments.push([interp(ea), interp(eb)]);
        }
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_cell(v: [Number; 4]) -> Vec<Segment> {
        // v follows corner order: (0, 0), (0, 1), (1, 1), (1, 0)
        let grid = Grid::from_fn(2, 2, |row, col| match (row, col) {
            (0, 0) => v[0],
            (0, 1) => v[1],
            (1, 1) => v[2],
            _ => v[3],
        });
        extract(&grid, Point::new(0.0, 0.0), Point::new(1.0, 1.0), 0.0)
    }

    #[test]
    fn trivial_cells_emit_nothing() {
        assert!(unit_cell([-1.0; 4]).is_empty());
        assert!(unit_cell([1.0; 4]).is_empty());
        assert!(unit_cell([0.0; 4]).is_empty());
    }

    #[test]
    fn single_corner() {
        let segs = unit_cell([1.0, -1.0, -1.0, -3.0]);
        assert_eq!(
            segs,
            [[Point::new(0.5, 0.0), Point::new(0.0, 0.25)]]
        );
    }

    #[test]
    fn every_mixed_mask_crosses_the_right_edges() {
        for mask in 1u8..15 {
            let v: [Number; 4] =
                core::array::from_fn(|i| if mask & (1 << i) != 0 { 1.0 } else { -1.0 });
            let segs = unit_cell(v);
            assert_eq!(segs.len(), 1, "mask {mask}");
            for p in segs[0] {
                // every point is the midpoint of a cell edge whose corners differ
                let on_vertical = p.x == 0.0 || p.x == 1.0;
                let (a, b) = if on_vertical {
                    let c = if p.x == 0.0 { (0, 3) } else { (1, 2) };
                    assert_eq!(p.y, 0.5, "mask {mask}");
                    c
                } else {
                    let c = if p.y == 0.0 { (0, 1) } else { (3, 2) };
                    assert_eq!(p.x, 0.5, "mask {mask}");
                    c
                };
                assert_ne!(v[a] >= 0.0, v[b] >= 0.0, "mask {mask} edge {a}-{b}");
            }
        }
    }

    #[test]
    fn saddle_connects_top_and_bottom() {
        let segs = unit_cell([1.0, -1.0, 1.0, -1.0]);
        assert_eq!(
            segs,
            [[Point::new(0.5, 0.0), Point::new(0.5, 1.0)]]
        );
    }

    #[test]
    fn row_zero_sits_at_the_origin() {
        // field crosses zero halfway between the columns
        let grid = Grid::from_fn(2, 2, |_, col| if col == 0 { 1.0 } else { -1.0 });
        let segs = extract(&grid, Point::new(10.0, 20.0), Point::new(2.0, 3.0), 0.0);
        assert_eq!(segs, [[Point::new(11.0, 20.0), Point::new(11.0, 23.0)]]);

        // a negative row step walks downward from the origin
        let segs = extract(&grid, Point::new(10.0, 20.0), Point::new(2.0, -3.0), 0.0);
        assert_eq!(segs, [[Point::new(11.0, 20.0), Point::new(11.0, 17.0)]]);
    }

    #[test]
    fn degenerate_edges_use_zero() {
        assert_eq!(edge_t(2.0, 2.0, 0.0), 0.0);
        assert_eq!(edge_t(Number::NAN, 2.0, 0.0), 0.0);
        assert_eq!(edge_t(-1.0, Number::INFINITY, 0.0), 0.0);
        assert_eq!(edge_t(-1.0, 3.0, 0.0), 0.25);
    }

    #[test]
    fn unit_circle() {
        let n = 81;
        let h = 4.0 / (n - 1) as Number;
        let f = |x: Number, y: Number| x * x + y * y - 1.0;
        let grid = Grid::from_fn(n, n, |row, col| {
            f(-2.0 + col as Number * h, -2.0 + row as Number * h)
        });
        let segs = extract(&grid, Point::new(-2.0, -2.0), Point::new(h, h), 0.0);

        let mut crossing_cells = 0;
        for row in 0..n - 1 {
            for col in 0..n - 1 {
                let v = [
                    grid.get(row, col),
                    grid.get(row, col + 1),
                    grid.get(row + 1, col + 1),
                    grid.get(row + 1, col),
                ];
                let inside = v.iter().filter(|val| **val >= 0.0).count();
                if inside != 0 && inside != 4 {
                    crossing_cells += 1;
                }
            }
        }
        assert_eq!(segs.len(), crossing_cells);
        assert!(!segs.is_empty());

        for p in segs.iter().flatten() {
            let r = (p.x * p.x + p.y * p.y).sqrt();
            assert!((r - 1.0).abs() < 2e-3, "{p:?} is {r} from the origin");
        }
    }

    #[test]
    fn ragged_rows_are_padded() {
        let mut grid = Grid::new(3);
        grid.push_row([1.0, 2.0]);
        grid.push_row([1.0, 2.0, 3.0, 4.0]);
        assert_eq!(grid.rows(), 2);
        assert!(grid.get(0, 2).is_nan());
        assert_eq!(grid.get(1, 2), 3.0);
    }
}
