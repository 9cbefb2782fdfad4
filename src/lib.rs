// SPDX: CC0-1.0

pub mod contour;
pub mod eval;
pub mod graph;
pub mod lex;
pub mod parse;
pub mod shell;
pub mod stdlib;

use core::{fmt, num::NonZeroU32, ops::Range};

pub type Number = f64;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point<T> {
    pub x: T,
    pub y: T,
}

impl Point<Number> {
    pub const fn new(x: Number, y: Number) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

pub const MIN_SCALE: Number = 1.0;
pub const MAX_SCALE: Number = 4000.0;
pub const ZOOM_FACTOR: Number = 1.12;

/// Affine mapping between world coordinates and screen pixels.
///
/// `screen = (cx + wx * scale, cy - wy * scale)`, so the y axis points up in
/// world space and down on screen.
#[derive(Clone, Debug, PartialEq)]
pub struct Viewport {
    pub center: Point<Number>,
    scale: Number, // pixels per world unit, always within [MIN_SCALE, MAX_SCALE]
    pub width: NonZeroU32,
    pub height: NonZeroU32,
}

impl Viewport {
    pub fn new(center: Point<Number>, scale: Number, width: NonZeroU32, height: NonZeroU32) -> Self {
        let mut vp = Self {
            center,
            scale: MIN_SCALE,
            width,
            height,
        };
        vp.set_scale(scale);
        vp
    }

    /// Viewport of the given size whose center pixel is the middle of the area.
    pub fn centered(scale: Number, width: NonZeroU32, height: NonZeroU32) -> Self {
        let center = Point::new(
            Number::from(width.get()) / 2.0,
            Number::from(height.get()) / 2.0,
        );
        Self::new(center, scale, width, height)
    }

    pub const fn scale(&self) -> Number {
        self.scale
    }

    pub fn set_scale(&mut self, scale: Number) {
        if scale.is_nan() {
            return;
        }
        self.scale = scale.clamp(MIN_SCALE, MAX_SCALE);
    }

    pub fn zoom_in(&mut self) {
        self.set_scale(self.scale * ZOOM_FACTOR);
    }

    pub fn zoom_out(&mut self) {
        self.set_scale(self.scale / ZOOM_FACTOR);
    }

    /// Place the world origin at a pixel position. Non-finite positions are
    /// ignored and reported as `false`.
    pub fn set_center(&mut self, center: Point<Number>) -> bool {
        if !center.is_finite() {
            return false;
        }
        self.center = center;
        true
    }

    /// Move the world origin by a number of pixels.
    pub fn pan(&mut self, dx: Number, dy: Number) -> bool {
        self.set_center(Point::new(self.center.x + dx, self.center.y + dy))
    }

    pub fn width_px(&self) -> Number {
        Number::from(self.width.get())
    }

    pub fn height_px(&self) -> Number {
        Number::from(self.height.get())
    }

    pub fn to_screen(&self, world: Point<Number>) -> Point<Number> {
        Point {
            x: self.center.x + world.x * self.scale,
            y: self.center.y - world.y * self.scale,
        }
    }

    pub fn to_world(&self, screen: Point<Number>) -> Point<Number> {
        Point {
            x: (screen.x - self.center.x) / self.scale,
            y: (self.center.y - screen.y) / self.scale,
        }
    }

    /// World-space x and y ranges covered by the whole pixel area.
    pub fn world_bounds(&self) -> Point<Range<Number>> {
        let top_left = self.to_world(Point::new(0.0, 0.0));
        let bottom_right = self.to_world(Point::new(self.width_px(), self.height_px()));
        Point {
            x: top_left.x..bottom_right.x,
            y: bottom_right.y..top_left.y,
        }
    }

    /// Sampling step for explicit curves: finer when zoomed in.
    pub fn adaptive_step(&self) -> Number {
        (0.5 / self.scale).max(0.001)
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Viewport")
            .field("center", &(self.center.x, self.center.y))
            .field("scale", &self.scale)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// A viewport together with the x interval and step used for explicit curves.
#[derive(Clone, Debug)]
pub struct Window {
    pub viewport: Viewport,
    pub x: Range<Number>,
    pub step: Number,
}

impl Window {
    pub fn new(viewport: Viewport) -> Self {
        let x = viewport.world_bounds().x;
        let step = viewport.adaptive_step();
        Self { viewport, x, step }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Window")
            .field("viewport", &format_args!("{}", self.viewport))
            .field("x range", &self.x)
            .field("step", &self.step)
            .finish()
    }
}
