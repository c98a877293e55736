//! Profile chart: maps (seconds, Celsius) into a character canvas.
//!
//! Layout from top to bottom: the chart area down to `zero_y`, a divider of
//! `divider` rows, and a status area `text_height` rows tall.
//!
//! `Chart` is an `embedded-graphics` draw target whose "colour" is the
//! character stored in a cell, so the curve, divider and status text are drawn
//! with the same primitives a TFT panel would use.

use core::convert::Infallible;

use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Line, Polyline, PrimitiveStyle, Rectangle};
use embedded_graphics::text::renderer::{TextMetrics, TextRenderer};
use embedded_graphics::text::{Baseline, Text};
use reflow_core::{Bounds, CurveEvaluator, Profile};

const CURVE: char = '.';
const CHECKPOINT: char = 'o';
const DIVIDER: char = '=';
const BLANK: char = ' ';

/// Screen geometry plus the data ranges it displays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub text_height: u32,
    pub divider: u32,
    pub bounds: Bounds,
}

impl Viewport {
    pub fn new(width: u32, height: u32, text_height: u32, divider: u32, bounds: Bounds) -> Self {
        Self {
            width,
            height,
            text_height,
            divider,
            bounds,
        }
    }

    /// Viewport scaled to a profile's own time and temperature range.
    pub fn for_profile(profile: &Profile, width: u32, height: u32, text_height: u32, divider: u32) -> Self {
        Self::new(width, height, text_height, divider, profile.bounds())
    }

    /// Row of the bottom of the temperature axis.
    pub fn zero_y(&self) -> i32 {
        self.height as i32 - self.text_height as i32 - 2 - self.divider as i32
    }

    /// Columns per second; the profile end lands on the last column.
    pub fn px_per_s(&self) -> f32 {
        let span = self.bounds.time_span();
        if span > 0.0 {
            self.width.saturating_sub(1) as f32 / span
        } else {
            0.0
        }
    }

    pub fn px_per_c(&self) -> f32 {
        let span = self.bounds.temp_span();
        if span > 0.0 { self.zero_y() as f32 / span } else { 0.0 }
    }

    /// Canvas position of a data point. May fall outside the canvas.
    pub fn map(&self, t_s: f32, temp_c: f32) -> Point {
        let columns = self.width.saturating_sub(1) as f32;
        let x = scale(t_s - self.bounds.time.0, columns, self.bounds.time_span());
        let zero_y = self.zero_y() as f32;
        let y = zero_y - scale(temp_c - self.bounds.temp.0, zero_y, self.bounds.temp_span());
        Point::new(x as i32, y as i32)
    }

    /// Rows occupied by the divider, top to bottom.
    pub fn divider_rows(&self) -> impl Iterator<Item = i32> + '_ {
        (0..self.divider as i32)
            .rev()
            .map(|i| self.height as i32 - self.text_height as i32 - i - 2)
    }

    /// First row of the status area.
    pub fn text_row(&self) -> i32 {
        self.height as i32 - self.text_height as i32
    }
}

/// `offset * extent / span`, multiplied first so span endpoints map exactly.
fn scale(offset: f32, extent: f32, span: f32) -> f32 {
    if span > 0.0 { offset * extent / span } else { 0.0 }
}

/// The character held by one cell, used as the pixel colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyph(pub char);

impl PixelColor for Glyph {
    type Raw = ();
}

/// One character per cell, one row per line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellFont;

impl CellFont {
    fn advance(position: Point, cells: u32) -> Point {
        position + Point::new(cells as i32, 0)
    }
}

impl TextRenderer for CellFont {
    type Color = Glyph;

    fn draw_string<D>(
        &self,
        text: &str,
        position: Point,
        _baseline: Baseline,
        target: &mut D,
    ) -> Result<Point, D::Error>
    where
        D: DrawTarget<Color = Self::Color>,
    {
        let row = position.y;
        target.draw_iter(
            text.chars()
                .zip(position.x..)
                .map(|(ch, x)| Pixel(Point::new(x, row), Glyph(ch))),
        )?;
        Ok(Self::advance(position, text.chars().count() as u32))
    }

    fn draw_whitespace<D>(
        &self,
        width: u32,
        position: Point,
        _baseline: Baseline,
        target: &mut D,
    ) -> Result<Point, D::Error>
    where
        D: DrawTarget<Color = Self::Color>,
    {
        target.fill_solid(&Rectangle::new(position, Size::new(width, 1)), Glyph(BLANK))?;
        Ok(Self::advance(position, width))
    }

    fn measure_string(&self, text: &str, position: Point, _baseline: Baseline) -> TextMetrics {
        let cells = text.chars().count() as u32;
        TextMetrics {
            bounding_box: Rectangle::new(position, Size::new(cells, 1)),
            next_position: Self::advance(position, cells),
        }
    }

    fn line_height(&self) -> u32 {
        1
    }
}

/// A fixed-size grid of characters. Writes outside the grid are dropped.
#[derive(Debug, Clone)]
pub struct Chart {
    viewport: Viewport,
    cells: Vec<char>,
}

impl Chart {
    pub fn new(viewport: Viewport) -> Self {
        let cells = vec![BLANK; viewport.width as usize * viewport.height as usize];
        Self { viewport, cells }
    }

    /// Chart with the profile's interpolated curve, checkpoints and divider.
    pub fn for_profile(profile: &Profile, viewport: Viewport) -> Self {
        let mut chart = Self::new(viewport);
        chart.draw_curve(&CurveEvaluator::new(profile));
        for cp in profile.checkpoints() {
            chart.mark(cp.time_s, cp.temp_c, CHECKPOINT);
        }
        chart.draw_divider();
        chart
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn get(&self, x: i32, y: i32) -> Option<char> {
        self.index(x, y).map(|i| self.cells[i])
    }

    pub fn plot(&mut self, x: i32, y: i32, ch: char) {
        if let Some(i) = self.index(x, y) {
            self.cells[i] = ch;
        }
    }

    /// Plot one data point.
    pub fn mark(&mut self, t_s: f32, temp_c: f32, ch: char) {
        let Ok(()) = Pixel(self.viewport.map(t_s, temp_c), Glyph(ch)).draw(self);
    }

    /// One-cell-wide line between two canvas points, inclusive.
    pub fn line(&mut self, from: Point, to: Point, ch: char) {
        let Ok(()) = Line::new(from, to)
            .into_styled(PrimitiveStyle::with_stroke(Glyph(ch), 1))
            .draw(self);
    }

    /// Connect one curve sample per column.
    pub fn draw_curve(&mut self, curve: &CurveEvaluator) {
        let points: Vec<Point> = curve
            .sample(self.viewport.width as usize)
            .into_iter()
            .map(|(t, c)| self.viewport.map(t, c))
            .collect();
        let Ok(()) = Polyline::new(&points)
            .into_styled(PrimitiveStyle::with_stroke(Glyph(CURVE), 1))
            .draw(self);
    }

    pub fn draw_divider(&mut self) {
        let right = self.viewport.width as i32 - 1;
        let rows: Vec<i32> = self.viewport.divider_rows().collect();
        for y in rows {
            self.line(Point::new(0, y), Point::new(right, y), DIVIDER);
        }
    }

    /// Write `text` at the start of the status area, clearing the rest of the row.
    pub fn set_status(&mut self, text: &str) {
        let origin = Point::new(0, self.viewport.text_row());
        let row = Rectangle::new(origin, Size::new(self.viewport.width, 1));
        let Ok(()) = self.fill_solid(&row, Glyph(BLANK));
        let Ok(_) = Text::with_baseline(text, origin, CellFont, Baseline::Top).draw(self);
    }

    /// Grid rows with trailing blanks trimmed.
    pub fn lines(&self) -> Vec<String> {
        let w = self.viewport.width as usize;
        if w == 0 {
            return Vec::new();
        }
        self.cells
            .chunks(w)
            .map(|row| row.iter().collect::<String>().trim_end().to_string())
            .collect()
    }

    pub fn render(&self) -> String {
        let mut out = self.lines().join("\n");
        out.push('\n');
        out
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        let (w, h) = (self.viewport.width as i32, self.viewport.height as i32);
        if x < 0 || y < 0 || x >= w || y >= h {
            return None;
        }
        Some(y as usize * w as usize + x as usize)
    }
}

impl OriginDimensions for Chart {
    fn size(&self) -> Size {
        Size::new(self.viewport.width, self.viewport.height)
    }
}

impl DrawTarget for Chart {
    type Color = Glyph;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(p, Glyph(ch)) in pixels {
            self.plot(p.x, p.y, ch);
        }
        Ok(())
    }
}
