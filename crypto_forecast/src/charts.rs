//! Chart descriptions and PNG rendering
//!
//! A [`Chart`] is plain data: stacked panels, each holding date-indexed
//! series and shaded bands. Rendering draws the title, frames, a light grid
//! with value and date ticks, a legend and the data onto an RGB canvas.
//! Labels use a built-in 5x7 bitmap font and are drawn in uppercase.

mod font;

use crate::error::Result;
use chrono::NaiveDate;
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use std::io::Cursor;

/// Chart colors
pub mod colors {
    use image::Rgb;

    pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
    pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
    pub const GRID: Rgb<u8> = Rgb([225, 225, 225]);
    pub const BLUE: Rgb<u8> = Rgb([31, 119, 180]);
    pub const ORANGE: Rgb<u8> = Rgb([255, 127, 14]);
    pub const GREEN: Rgb<u8> = Rgb([44, 160, 44]);
    pub const RED: Rgb<u8> = Rgb([214, 39, 40]);
    pub const PURPLE: Rgb<u8> = Rgb([148, 103, 189]);
    pub const GRAY: Rgb<u8> = Rgb([127, 127, 127]);
}

pub const DEFAULT_WIDTH: u32 = 1200;
pub const DEFAULT_HEIGHT: u32 = 600;

const MARGIN_LEFT: i64 = 76;
const MARGIN_RIGHT: i64 = 20;
const MARGIN_TOP: i64 = 44;
const MARGIN_BOTTOM: i64 = 30;
const PANEL_GAP: i64 = 34;
const TITLE_SCALE: i64 = 2;
const SWATCH_WIDTH: i64 = 24;
const GRID_LINES: i64 = 5;
const DASH_ON: u32 = 8;
const DASH_OFF: u32 = 6;

/// How a series is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesStyle {
    Line,
    Dashed,
    Points,
}

/// One date-indexed series; NaN values leave gaps
#[derive(Debug, Clone)]
pub struct Series {
    pub label: String,
    pub dates: Vec<NaiveDate>,
    pub values: Vec<f64>,
    pub color: Rgb<u8>,
    pub style: SeriesStyle,
}

impl Series {
    pub fn line<S: Into<String>>(
        label: S,
        dates: &[NaiveDate],
        values: &[f64],
        color: Rgb<u8>,
    ) -> Self {
        Self {
            label: label.into(),
            dates: dates.to_vec(),
            values: values.to_vec(),
            color,
            style: SeriesStyle::Line,
        }
    }

    pub fn with_style(mut self, style: SeriesStyle) -> Self {
        self.style = style;
        self
    }

    fn points(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.dates.iter().copied().zip(self.values.iter().copied())
    }
}

/// Shaded area between a lower and an upper bound
#[derive(Debug, Clone)]
pub struct Band {
    pub label: String,
    pub dates: Vec<NaiveDate>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
    pub color: Rgb<u8>,
}

impl Band {
    /// Build a band from (lower, upper) pairs
    pub fn from_intervals<S: Into<String>>(
        label: S,
        dates: &[NaiveDate],
        intervals: &[(f64, f64)],
        color: Rgb<u8>,
    ) -> Self {
        Self {
            label: label.into(),
            dates: dates.to_vec(),
            lower: intervals.iter().map(|(lo, _)| *lo).collect(),
            upper: intervals.iter().map(|(_, hi)| *hi).collect(),
            color,
        }
    }
}

/// One plotting area with shared axes
#[derive(Debug, Clone, Default)]
pub struct Panel {
    pub title: String,
    pub series: Vec<Series>,
    pub bands: Vec<Band>,
}

impl Panel {
    pub fn new<S: Into<String>>(title: S) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_series(mut self, series: Series) -> Self {
        self.series.push(series);
        self
    }

    pub fn with_band(mut self, band: Band) -> Self {
        self.bands.push(band);
        self
    }

    fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let dates = self
            .series
            .iter()
            .flat_map(|s| s.dates.iter())
            .chain(self.bands.iter().flat_map(|b| b.dates.iter()));
        dates.fold(None, |range, &d| match range {
            None => Some((d, d)),
            Some((lo, hi)) => Some((lo.min(d), hi.max(d))),
        })
    }

    fn value_range(&self) -> Option<(f64, f64)> {
        let values = self
            .series
            .iter()
            .flat_map(|s| s.values.iter())
            .chain(self.bands.iter().flat_map(|b| b.lower.iter().chain(b.upper.iter())))
            .copied()
            .filter(|v| v.is_finite());
        values.fold(None, |range, v| match range {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }
}

/// A titled figure made of vertically stacked panels
#[derive(Debug, Clone)]
pub struct Chart {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub panels: Vec<Panel>,
}

impl Chart {
    pub fn new<S: Into<String>>(title: S) -> Self {
        Self {
            title: title.into(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            panels: Vec::new(),
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_panel(mut self, panel: Panel) -> Self {
        self.panels.push(panel);
        self
    }

    /// Draw the chart onto a new canvas
    pub fn render(&self) -> RgbImage {
        let mut img = RgbImage::from_pixel(self.width, self.height, colors::WHITE);
        let title_x = (self.width as i64 - font::text_width(&self.title, TITLE_SCALE)) / 2;
        draw_text(&mut img, title_x.max(0), 10, &self.title, TITLE_SCALE, colors::BLACK);

        let count = self.panels.len().max(1) as i64;

        let inner_height =
            self.height as i64 - MARGIN_TOP - MARGIN_BOTTOM - PANEL_GAP * (count - 1);
        let panel_height = (inner_height / count).max(1);

        for (i, panel) in self.panels.iter().enumerate() {
            let area = PlotArea {
                left: MARGIN_LEFT,
                top: MARGIN_TOP + i as i64 * (panel_height + PANEL_GAP),
                width: (self.width as i64 - MARGIN_LEFT - MARGIN_RIGHT).max(1),
                height: panel_height,
            };
            draw_panel(&mut img, panel, &area);
        }

        img
    }

    /// Render the chart and encode it as PNG
    pub fn render_png(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(self.render())
            .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)?;
        Ok(bytes)
    }
}

/// Pixel rectangle of one panel
struct PlotArea {
    left: i64,
    top: i64,
    width: i64,
    height: i64,
}

/// Maps dates and values into a plot area
struct Scale {
    first: NaiveDate,
    span_days: f64,
    lo: f64,
    hi: f64,
}

impl Scale {
    fn new((first, last): (NaiveDate, NaiveDate), (lo, hi): (f64, f64)) -> Self {
        let pad = if hi > lo { (hi - lo) * 0.05 } else { lo.abs().max(1.0) * 0.05 };
        Self {
            first,
            span_days: (last - first).num_days() as f64,
            lo: lo - pad,
            hi: hi + pad,
        }
    }

    fn x(&self, area: &PlotArea, date: NaiveDate) -> i64 {
        let fraction = if self.span_days > 0.0 {
            (date - self.first).num_days() as f64 / self.span_days
        } else {
            0.5
        };
        area.left + (fraction * (area.width - 1) as f64).round() as i64
    }

    fn y(&self, area: &PlotArea, value: f64) -> i64 {
        let fraction = (value - self.lo) / (self.hi - self.lo);
        area.top + area.height - 1 - (fraction * (area.height - 1) as f64).round() as i64
    }
}

fn draw_panel(img: &mut RgbImage, panel: &Panel, area: &PlotArea) {
    let right = area.left + area.width - 1;
    let bottom = area.top + area.height - 1;

    for i in 1..GRID_LINES {
        let y = area.top + i * area.height / GRID_LINES;
        draw_horizontal_line(img, y, area.left, right, colors::GRID);
    }

    draw_text(img, area.left, area.top - 11, &panel.title, 1, colors::BLACK);

    if let (Some(dates), Some(values)) = (panel.date_range(), panel.value_range()) {
        let scale = Scale::new(dates, values);
        draw_ticks(img, &scale, dates, area);
        for band in &panel.bands {
            draw_band(img, band, &scale, area);
        }
        for series in &panel.series {
            draw_series(img, series, &scale, area);
        }
    }

    draw_horizontal_line(img, area.top, area.left, right, colors::BLACK);
    draw_horizontal_line(img, bottom, area.left, right, colors::BLACK);
    draw_vertical_line(img, area.left, area.top, bottom, colors::BLACK);
    draw_vertical_line(img, right, area.top, bottom, colors::BLACK);

    // Legend along the top edge, one swatch and label per series
    let mut x = area.left + 10;
    for series in &panel.series {
        draw_filled_rect(img, x, area.top + 8, SWATCH_WIDTH, 4, series.color);
        x += SWATCH_WIDTH + 4;
        draw_text(img, x, area.top + 7, &series.label, 1, colors::BLACK);
        x += font::text_width(&series.label, 1) + 12;
    }
}

/// Value labels at the grid lines and date labels under both ends
fn draw_ticks(
    img: &mut RgbImage,
    scale: &Scale,
    (first, last): (NaiveDate, NaiveDate),
    area: &PlotArea,
) {
    for i in 0..=GRID_LINES {
        let y = area.top + i * area.height / GRID_LINES;
        let value = scale.hi - (scale.hi - scale.lo) * i as f64 / GRID_LINES as f64;
        let label = format_tick(value);
        let x = area.left - 4 - font::text_width(&label, 1);
        draw_text(img, x, y - font::GLYPH_HEIGHT / 2, &label, 1, colors::BLACK);
    }

    let bottom = area.top + area.height + 4;
    let first_label = first.format("%Y-%m-%d").to_string();
    draw_text(img, area.left, bottom, &first_label, 1, colors::BLACK);
    if last > first {
        let last_label = last.format("%Y-%m-%d").to_string();
        let x = area.left + area.width - font::text_width(&last_label, 1);
        draw_text(img, x, bottom, &last_label, 1, colors::BLACK);
    }
}

fn format_tick(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude >= 1000.0 {
        format!("{:.0}", value)
    } else if magnitude >= 10.0 {
        format!("{:.1}", value)
    } else {
        format!("{:.3}", value)
    }
}

fn draw_text(img: &mut RgbImage, x: i64, y: i64, text: &str, scale: i64, color: Rgb<u8>) {
    for (dx, dy) in font::lit_cells(text, scale) {
        draw_filled_rect(img, x + dx, y + dy, scale, scale, color);
    }
}

fn draw_series(img: &mut RgbImage, series: &Series, scale: &Scale, area: &PlotArea) {
    let mut previous: Option<(i64, i64)> = None;
    let mut dash_phase = 0u32;

    for (date, value) in series.points() {
        if !value.is_finite() {
            previous = None;
            continue;
        }
        let point = (scale.x(area, date), scale.y(area, value));

        match series.style {
            SeriesStyle::Points => {
                draw_filled_rect(img, point.0 - 2, point.1 - 2, 5, 5, series.color)
            }
            SeriesStyle::Line | SeriesStyle::Dashed => {
                if let Some(from) = previous {
                    let dashed = series.style == SeriesStyle::Dashed;
                    draw_segment(img, from, point, series.color, dashed, &mut dash_phase);
                }
            }
        }
        previous = Some(point);
    }
}

fn draw_band(img: &mut RgbImage, band: &Band, scale: &Scale, area: &PlotArea) {
    let fill = interpolate_color(band.color, colors::WHITE, 0.7);
    let columns: Vec<(i64, i64, i64)> = band
        .dates
        .iter()
        .zip(band.lower.iter().zip(&band.upper))
        .filter(|(_, (lo, hi))| lo.is_finite() && hi.is_finite())
        .map(|(date, (lo, hi))| (scale.x(area, *date), scale.y(area, *lo), scale.y(area, *hi)))
        .collect();

    for pair in columns.windows(2) {
        let (x0, lo0, hi0) = pair[0];
        let (x1, lo1, hi1) = pair[1];
        let steps = (x1 - x0).max(1);
        for dx in 0..=steps {
            let t = dx as f64 / steps as f64;
            let lo = lo0 as f64 + (lo1 - lo0) as f64 * t;
            let hi = hi0 as f64 + (hi1 - hi0) as f64 * t;
            draw_vertical_line(img, x0 + dx, hi.round() as i64, lo.round() as i64, fill);
        }
    }
    if let [(x, lo, hi)] = columns.as_slice() {
        draw_vertical_line(img, *x, *hi, *lo, fill);
    }
}

/// Bresenham line, two pixels thick; dashed lines skip every other run
fn draw_segment(
    img: &mut RgbImage,
    (x0, y0): (i64, i64),
    (x1, y1): (i64, i64),
    color: Rgb<u8>,
    dashed: bool,
    dash_phase: &mut u32,
) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let (mut x, mut y) = (x0, y0);

    loop {
        if !dashed || *dash_phase % (DASH_ON + DASH_OFF) < DASH_ON {
            put_pixel(img, x, y, color);
            put_pixel(img, x, y + 1, color);
        }
        *dash_phase = dash_phase.wrapping_add(1);

        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

fn put_pixel(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && x < img.width() as i64 && y < img.height() as i64 {
        img.put_pixel(x as u32, y as u32, color);
    }
}

fn draw_filled_rect(img: &mut RgbImage, x: i64, y: i64, width: i64, height: i64, color: Rgb<u8>) {
    for py in y..y + height {
        for px in x..x + width {
            put_pixel(img, px, py, color);
        }
    }
}

fn draw_vertical_line(img: &mut RgbImage, x: i64, y1: i64, y2: i64, color: Rgb<u8>) {
    let (start, end) = if y1 < y2 { (y1, y2) } else { (y2, y1) };
    for y in start..=end {
        put_pixel(img, x, y, color);
    }
}

fn draw_horizontal_line(img: &mut RgbImage, y: i64, x1: i64, x2: i64, color: Rgb<u8>) {
    let (start, end) = if x1 < x2 { (x1, x2) } else { (x2, x1) };
    for x in start..=end {
        put_pixel(img, x, y, color);
    }
}

/// Interpolate between two colors
fn interpolate_color(c1: Rgb<u8>, c2: Rgb<u8>, t: f64) -> Rgb<u8> {
    let t = t.clamp(0.0, 1.0);
    let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
    Rgb([mix(c1[0], c2[0]), mix(c1[1], c2[1]), mix(c1[2], c2[2])])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dates(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..n).map(|i| start + chrono::Duration::days(i as i64)).collect()
    }

    #[test]
    fn test_render_draws_series_color() {
        let d = dates(10);
        let values: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let chart = Chart::new("test")
            .with_size(200, 100)
            .with_panel(Panel::new("p").with_series(Series::line("s", &d, &values, colors::RED)));

        let img = chart.render();
        assert_eq!(img.dimensions(), (200, 100));
        assert!(img.pixels().any(|p| *p == colors::RED));
    }

    #[test]
    fn test_all_nan_series_renders_frame_only() {
        let d = dates(5);
        let series = Series::line("s", &d, &[f64::NAN; 5], colors::BLUE);
        let chart = Chart::new("empty")
            .with_size(120, 80)
            .with_panel(Panel::new("p").with_series(series));

        let img = chart.render();
        // Only the legend swatch carries the series color
        let blue = img.pixels().filter(|p| **p == colors::BLUE).count();
        assert_eq!(blue, 24 * 4);
    }

    #[test]
    fn test_title_and_labels_are_drawn() {
        let d = dates(10);
        let values: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        let unlabelled = Series::line("", &d, &values, colors::RED);
        let untitled = Chart::new("")
            .with_size(400, 200)
            .with_panel(Panel::new("").with_series(unlabelled));
        let labelled = Series::line("Price", &d, &values, colors::RED);
        let titled = Chart::new("Daily prices")
            .with_size(400, 200)
            .with_panel(Panel::new("Price").with_series(labelled));

        let black = |img: &RgbImage, rows: std::ops::Range<u32>| {
            img.enumerate_pixels()
                .filter(|(_, y, p)| rows.contains(y) && **p == colors::BLACK)
                .count()
        };
        // Title band above the first panel
        let plain = untitled.render();
        let annotated = titled.render();
        assert_eq!(black(&plain, 0..30), 0);
        assert!(black(&annotated, 0..30) > 0);
        // Date ticks under the panel in both
        assert!(black(&plain, 174..181) > 0);
    }

    #[test]
    fn test_tick_format_follows_magnitude() {
        assert_eq!(format_tick(65432.1), "65432");
        assert_eq!(format_tick(-12.34), "-12.3");
        assert_eq!(format_tick(1.0), "1.000");
    }

    #[test]
    fn test_png_signature() {
        let d = dates(3);
        let series = Series::line("s", &d, &[1.0, 2.0, 1.5], colors::GREEN);
        let bytes = Chart::new("png")
            .with_size(64, 64)
            .with_panel(Panel::new("p").with_series(series))
            .render_png()
            .unwrap();
        assert_eq!(&bytes[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }
}
