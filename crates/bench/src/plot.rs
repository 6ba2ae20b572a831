//! Mean-and-range learning curves rendered straight to PNG.
//!
//! Each series aggregates several trial CSVs row by row: the line is the
//! mean across trials, the shaded band spans min to max. Every figure
//! carries a title, both axis labels and a legend keyed by series label.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use image::{Rgb, RgbImage};
use ml::logger::read_csv_columns;

const WIDTH: u32 = 800;
const HEIGHT: u32 = 500;
const MARGIN_LEFT: i64 = 90;
const MARGIN_RIGHT: i64 = 20;
const MARGIN_TOP: i64 = 40;
const MARGIN_BOTTOM: i64 = 60;
const TICKS: usize = 5;

const TITLE_Y: i64 = 14;
const X_LABEL_Y: i64 = HEIGHT as i64 - 24;
const Y_LABEL_X: i64 = 12;
const LEGEND_PAD: i64 = 6;
const LEGEND_ROW: i64 = 16;
const LEGEND_SWATCH: i64 = 20;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const AXIS: Rgb<u8> = Rgb([0, 0, 0]);
const GRID: Rgb<u8> = Rgb([230, 230, 230]);
const RUN_LINE: Rgb<u8> = Rgb([31, 119, 180]);
const RUN_BAND: Rgb<u8> = Rgb([198, 219, 239]);
const REF_LINE: Rgb<u8> = Rgb([255, 127, 14]);
const REF_BAND: Rgb<u8> = Rgb([253, 208, 162]);

/// Trial CSVs plotted as one curve.
#[derive(Clone, Debug)]
pub struct Series {
    pub label: String,
    pub csvs: Vec<PathBuf>,
    pub x: String,
    pub y: String,
}

impl Series {
    pub fn new(label: impl Into<String>, csvs: Vec<PathBuf>, x: impl Into<String>, y: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            csvs,
            x: x.into(),
            y: y.into(),
        }
    }
}

/// Per-row statistics across trials, truncated to the shortest trial.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Aggregate {
    pub x: Vec<f64>,
    pub mean: Vec<f64>,
    pub min: Vec<f64>,
    pub max: Vec<f64>,
}

impl Aggregate {
    fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let finite = |v: &&f64| v.is_finite();
        let x_min = self.x.iter().filter(finite).copied().reduce(f64::min)?;
        let x_max = self.x.iter().filter(finite).copied().reduce(f64::max)?;
        let y_min = self.min.iter().filter(finite).copied().reduce(f64::min)?;
        let y_max = self.max.iter().filter(finite).copied().reduce(f64::max)?;
        Some((x_min, x_max, y_min, y_max))
    }
}

/// Reads every CSV of `series` and reduces them row by row. Blank cells are
/// skipped when computing the statistics of their row.
///
/// # Errors
///
/// Fails when a file or one of the two columns is missing.
pub fn aggregate(series: &Series) -> Result<Aggregate> {
    if series.csvs.is_empty() {
        bail!("series {:?} has no csv files", series.label);
    }
    let mut xs: Vec<Vec<f64>> = Vec::with_capacity(series.csvs.len());
    let mut ys: Vec<Vec<f64>> = Vec::with_capacity(series.csvs.len());
    for csv in &series.csvs {
        let mut columns = read_csv_columns(csv, &[series.x.as_str(), series.y.as_str()])
            .with_context(|| format!("loading {} for {:?}", csv.display(), series.label))?;
        xs.push(columns.remove(&series.x).unwrap_or_default());
        ys.push(columns.remove(&series.y).unwrap_or_default());
    }
    let rows = ys.iter().map(Vec::len).min().unwrap_or(0);

    let mut out = Aggregate::default();
    for row in 0..rows {
        let values: Vec<f64> = ys.iter().map(|y| y[row]).filter(|v| v.is_finite()).collect();
        let (mean, min, max) = if values.is_empty() {
            (f64::NAN, f64::NAN, f64::NAN)
        } else {
            (
                values.iter().sum::<f64>() / values.len() as f64,
                values.iter().copied().fold(f64::INFINITY, f64::min),
                values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            )
        };
        out.x.push(xs[0][row]);
        out.mean.push(mean);
        out.min.push(min);
        out.max.push(max);
    }
    Ok(out)
}

/// Renders `run`, and `reference` when given, onto a shared pair of axes
/// under `title` and writes the PNG to `path`. The axes are labelled with
/// the run's column names.
///
/// # Errors
///
/// Fails when the input CSVs cannot be aggregated or the image cannot be
/// saved.
pub fn relplot(title: &str, run: &Series, reference: Option<&Series>, path: &Path) -> Result<()> {
    let img = render(title, run, reference)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    img.save(path).with_context(|| format!("saving {}", path.display()))?;
    tracing::debug!(path = %path.display(), y = %run.y, "plot written");
    Ok(())
}

fn render(title: &str, run: &Series, reference: Option<&Series>) -> Result<RgbImage> {
    let mut curves = vec![(aggregate(run)?, RUN_LINE, RUN_BAND)];
    if let Some(reference) = reference {
        curves.push((aggregate(reference)?, REF_LINE, REF_BAND));
    }

    let (mut x_min, mut x_max, mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY);
    for (agg, _, _) in &curves {
        if let Some((a, b, c, d)) = agg.bounds() {
            x_min = x_min.min(a);
            x_max = x_max.max(b);
            y_min = y_min.min(c);
            y_max = y_max.max(d);
        }
    }
    if !x_min.is_finite() {
        // nothing to draw; keep an empty frame
        (x_min, x_max, y_min, y_max) = (0.0, 1.0, 0.0, 1.0);
    }
    if x_max - x_min < f64::EPSILON {
        x_max = x_min + 1.0;
    }
    if y_max - y_min < f64::EPSILON {
        y_min -= 0.5;
        y_max += 0.5;
    }

    let frame = Frame {
        x_min,
        x_max,
        y_min,
        y_max,
    };
    let mut img = RgbImage::from_pixel(WIDTH, HEIGHT, BACKGROUND);
    frame.draw_axes(&mut img);
    for (agg, line, band) in &curves {
        frame.draw_band(&mut img, agg, *band);
        frame.draw_line(&mut img, agg, *line);
    }

    draw_text(&mut img, (i64::from(WIDTH) - text_width(title)) / 2, TITLE_Y, title, AXIS);
    let plot_mid_x = (Frame::left() + Frame::right()) / 2;
    draw_text(&mut img, plot_mid_x - text_width(&run.x) / 2, X_LABEL_Y, &run.x, AXIS);
    let plot_mid_y = (Frame::top() + Frame::bottom()) / 2;
    draw_text_up(&mut img, Y_LABEL_X, plot_mid_y + text_width(&run.y) / 2, &run.y, AXIS);

    let mut entries = vec![(run.label.as_str(), RUN_LINE)];
    if let Some(reference) = reference {
        entries.push((reference.label.as_str(), REF_LINE));
    }
    draw_legend(&mut img, &entries);
    Ok(img)
}

/// Legend rectangle `(x0, y0, x1, y1)` in the top-left corner of the plot
/// area, sized for `labels`.
fn legend_box(labels: &[&str]) -> (i64, i64, i64, i64) {
    let widest = labels.iter().map(|l| text_width(l)).max().unwrap_or(0);
    let n = i64::try_from(labels.len()).unwrap_or(0);
    let x0 = Frame::left() + 10;
    let y0 = Frame::top() + 8;
    (
        x0,
        y0,
        x0 + 2 * LEGEND_PAD + LEGEND_SWATCH + 8 + widest,
        y0 + 2 * LEGEND_PAD + n * LEGEND_ROW - (LEGEND_ROW - GLYPH_H * SCALE),
    )
}

fn draw_legend(img: &mut RgbImage, entries: &[(&str, Rgb<u8>)]) {
    let labels: Vec<&str> = entries.iter().map(|(label, _)| *label).collect();
    let (x0, y0, x1, y1) = legend_box(&labels);
    for x in x0..=x1 {
        fill_column(img, x, y0, y1, BACKGROUND);
    }
    segment(img, (x0, y0), (x1, y0), AXIS);
    segment(img, (x1, y0), (x1, y1), AXIS);
    segment(img, (x1, y1), (x0, y1), AXIS);
    segment(img, (x0, y1), (x0, y0), AXIS);

    let mut row = y0 + LEGEND_PAD;
    for (label, color) in entries {
        let mid = row + GLYPH_H * SCALE / 2;
        let sx = x0 + LEGEND_PAD;
        for dy in -1..=1 {
            segment(img, (sx, mid + dy), (sx + LEGEND_SWATCH, mid + dy), *color);
        }
        draw_text(img, sx + LEGEND_SWATCH + 8, row, label, AXIS);
        row += LEGEND_ROW;
    }
}

struct Frame {
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
}

impl Frame {
    fn left() -> i64 {
        MARGIN_LEFT
    }

    fn right() -> i64 {
        i64::from(WIDTH) - MARGIN_RIGHT
    }

    fn top() -> i64 {
        MARGIN_TOP
    }

    fn bottom() -> i64 {
        i64::from(HEIGHT) - MARGIN_BOTTOM
    }

    #[allow(clippy::cast_possible_truncation)]
    fn px(&self, x: f64) -> i64 {
        let t = (x - self.x_min) / (self.x_max - self.x_min);
        Self::left() + (t * (Self::right() - Self::left()) as f64).round() as i64
    }

    #[allow(clippy::cast_possible_truncation)]
    fn py(&self, y: f64) -> i64 {
        let t = (y - self.y_min) / (self.y_max - self.y_min);
        Self::bottom() - (t * (Self::bottom() - Self::top()) as f64).round() as i64
    }

    fn draw_axes(&self, img: &mut RgbImage) {
        for i in 0..=TICKS {
            let t = i as f64 / TICKS as f64;
            let y_val = self.y_min + t * (self.y_max - self.y_min);
            let py = self.py(y_val);
            segment(img, (Self::left(), py), (Self::right(), py), GRID);
            segment(img, (Self::left() - 4, py), (Self::left(), py), AXIS);
            let label = tick_label(y_val);
            draw_text(img, Self::left() - 8 - text_width(&label), py - 2, &label, AXIS);

            let x_val = self.x_min + t * (self.x_max - self.x_min);
            let px = self.px(x_val);
            segment(img, (px, Self::bottom()), (px, Self::bottom() + 4), AXIS);
            let label = tick_label(x_val);
            draw_text(img, px - text_width(&label) / 2, Self::bottom() + 10, &label, AXIS);
        }
        segment(img, (Self::left(), Self::top()), (Self::left(), Self::bottom()), AXIS);
        segment(img, (Self::left(), Self::bottom()), (Self::right(), Self::bottom()), AXIS);
    }

    fn draw_band(&self, img: &mut RgbImage, agg: &Aggregate, color: Rgb<u8>) {
        let points: Vec<(i64, i64, i64)> = (0..agg.x.len())
            .filter(|&i| agg.x[i].is_finite() && agg.min[i].is_finite() && agg.max[i].is_finite())
            .map(|i| (self.px(agg.x[i]), self.py(agg.min[i]), self.py(agg.max[i])))
            .collect();
        for pair in points.windows(2) {
            let (x0, lo0, hi0) = pair[0];
            let (x1, lo1, hi1) = pair[1];
            if x1 == x0 {
                fill_column(img, x0, hi0.min(hi1), lo0.max(lo1), color);
                continue;
            }
            for x in x0.min(x1)..=x0.max(x1) {
                let t = (x - x0) as f64 / (x1 - x0) as f64;
                let lerp = |a: i64, b: i64| a as f64 + t * (b - a) as f64;
                fill_column(img, x, lerp(hi0, hi1).round() as i64, lerp(lo0, lo1).round() as i64, color);
            }
        }
        if let [(x, lo, hi)] = points.as_slice() {
            fill_column(img, *x, *hi, *lo, color);
        }
    }

    fn draw_line(&self, img: &mut RgbImage, agg: &Aggregate, color: Rgb<u8>) {
        let points: Vec<(i64, i64)> = (0..agg.x.len())
            .filter(|&i| agg.x[i].is_finite() && agg.mean[i].is_finite())
            .map(|i| (self.px(agg.x[i]), self.py(agg.mean[i])))
            .collect();
        for pair in points.windows(2) {
            segment(img, pair[0], pair[1], color);
            segment(img, (pair[0].0, pair[0].1 + 1), (pair[1].0, pair[1].1 + 1), color);
        }
        if let [p] = points.as_slice() {
            for dx in -2..=2 {
                for dy in -2..=2 {
                    put(img, p.0 + dx, p.1 + dy, color);
                }
            }
        }
    }
}

fn put(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) {
        if x < img.width() && y < img.height() {
            img.put_pixel(x, y, color);
        }
    }
}

fn fill_column(img: &mut RgbImage, x: i64, y_top: i64, y_bottom: i64, color: Rgb<u8>) {
    for y in y_top.min(y_bottom)..=y_top.max(y_bottom) {
        put(img, x, y, color);
    }
}

/// Bresenham.
fn segment(img: &mut RgbImage, from: (i64, i64), to: (i64, i64), color: Rgb<u8>) {
    let (mut x, mut y) = from;
    let dx = (to.0 - x).abs();
    let dy = -(to.1 - y).abs();
    let sx = if x < to.0 { 1 } else { -1 };
    let sy = if y < to.1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        put(img, x, y, color);
        if x == to.0 && y == to.1 {
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

/// Tick text: large magnitudes get `k`/`M` suffixes.
pub fn tick_label(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1e6 {
        format!("{:.1}M", value / 1e6)
    } else if abs >= 1e3 {
        format!("{:.1}k", value / 1e3)
    } else if abs >= 10.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}

const GLYPH_W: i64 = 3;
const GLYPH_H: i64 = 5;
const SCALE: i64 = 2;

/// 3x5 bitmaps, one row per byte, high bit on the left. Lowercase letters
/// other than the `k` tick suffix are drawn as capitals.
fn glyph(c: char) -> Option<[u8; 5]> {
    Some(match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b010, 0b010, 0b010],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '_' => [0b000, 0b000, 0b000, 0b000, 0b111],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        ' ' => [0b000; 5],
        'k' => [0b100, 0b101, 0b110, 0b101, 0b101],
        'A' => [0b010, 0b101, 0b111, 0b101, 0b101],
        'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'C' => [0b011, 0b100, 0b100, 0b100, 0b011],
        'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'E' => [0b111, 0b100, 0b110, 0b100, 0b111],
        'F' => [0b111, 0b100, 0b110, 0b100, 0b100],
        'G' => [0b011, 0b100, 0b101, 0b101, 0b011],
        'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'J' => [0b001, 0b001, 0b001, 0b101, 0b010],
        'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'M' => [0b101, 0b111, 0b111, 0b101, 0b101],
        'N' => [0b110, 0b101, 0b101, 0b101, 0b101],
        'O' => [0b010, 0b101, 0b101, 0b101, 0b010],
        'P' => [0b110, 0b101, 0b110, 0b100, 0b100],
        'Q' => [0b010, 0b101, 0b101, 0b110, 0b011],
        'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        'S' => [0b011, 0b100, 0b010, 0b001, 0b110],
        'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'V' => [0b101, 0b101, 0b101, 0b101, 0b010],
        'W' => [0b101, 0b101, 0b111, 0b111, 0b101],
        'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'Y' => [0b101, 0b101, 0b010, 0b010, 0b010],
        'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        c if c.is_ascii_lowercase() => return glyph(c.to_ascii_uppercase()),
        _ => return None,
    })
}

fn text_width(text: &str) -> i64 {
    let n = i64::try_from(text.chars().count()).unwrap_or(0);
    n * (GLYPH_W + 1) * SCALE
}

/// Lit pixel offsets of `text` laid out left to right from the origin.
fn text_pixels(text: &str) -> Vec<(i64, i64)> {
    let mut out = Vec::new();
    let mut cursor = 0;
    for c in text.chars() {
        if let Some(rows) = glyph(c) {
            for (row, bits) in (0..GLYPH_H).zip(rows) {
                for col in 0..GLYPH_W {
                    if bits & (1 << (GLYPH_W - 1 - col)) != 0 {
                        for sy in 0..SCALE {
                            for sx in 0..SCALE {
                                out.push((cursor + col * SCALE + sx, row * SCALE + sy));
                            }
                        }
                    }
                }
            }
        }
        cursor += (GLYPH_W + 1) * SCALE;
    }
    out
}

fn draw_text(img: &mut RgbImage, x: i64, y: i64, text: &str, color: Rgb<u8>) {
    for (dx, dy) in text_pixels(text) {
        put(img, x + dx, y + dy, color);
    }
}

/// Text rotated a quarter turn counter-clockwise, reading upwards from
/// `(x, y)`.
fn draw_text_up(img: &mut RgbImage, x: i64, y: i64, text: &str, color: Rgb<u8>) {
    for (dx, dy) in text_pixels(text) {
        put(img, x + dy, y - dx, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_labels_use_suffixes() {
        assert_eq!(tick_label(2_500_000.0), "2.5M");
        assert_eq!(tick_label(1500.0), "1.5k");
        assert_eq!(tick_label(-42.0), "-42");
        assert_eq!(tick_label(0.3), "0.3");
    }

    #[test]
    fn every_label_character_has_a_glyph() {
        for label in [
            "-1.5M",
            "12.0k",
            "0.3",
            "987654",
            "HalfCheetahVelEnv",
            "MetaTest/AverageReturn",
            "TotalEnvSteps",
            "strider",
            "reference",
        ] {
            assert!(label.chars().all(|c| glyph(c).is_some()), "{label}");
        }
    }

    fn inked(img: &RgbImage, xs: std::ops::Range<i64>, ys: std::ops::Range<i64>, color: Rgb<u8>) -> usize {
        let mut n = 0;
        for x in xs {
            for y in ys.clone() {
                if let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) {
                    if *img.get_pixel(x, y) == color {
                        n += 1;
                    }
                }
            }
        }
        n
    }

    #[test]
    fn title_axis_labels_and_legend_are_drawn() {
        let dir = tempfile::tempdir().unwrap();
        let run_csv = dir.path().join("run.csv");
        let ref_csv = dir.path().join("ref.csv");
        std::fs::write(&run_csv, "TotalEnvSteps,MetaTest/AverageReturn\n0,-40\n1000,-10\n").unwrap();
        std::fs::write(&ref_csv, "TotalEnvSteps,MetaTest/AverageReturn\n0,-30\n1000,5\n").unwrap();
        let run = Series::new("strider", vec![run_csv], "TotalEnvSteps", "MetaTest/AverageReturn");
        let reference = Series::new("reference", vec![ref_csv], "TotalEnvSteps", "MetaTest/AverageReturn");

        let img = render("HalfCheetahVelEnv", &run, Some(&reference)).unwrap();
        let w = i64::from(WIDTH);
        let h = i64::from(HEIGHT);

        // title band above the plot area
        assert!(inked(&img, 0..w, 0..MARGIN_TOP - 10, AXIS) > 0);
        // x label below the tick labels
        assert!(inked(&img, Frame::left()..Frame::right(), X_LABEL_Y..h, AXIS) > 0);
        // y label left of the tick labels
        assert!(inked(&img, 0..Y_LABEL_X + GLYPH_H * SCALE + 1, Frame::top()..Frame::bottom(), AXIS) > 0);

        let (x0, y0, x1, y1) = legend_box(&["strider", "reference"]);
        let swatches = x0..x0 + LEGEND_PAD + LEGEND_SWATCH + 1;
        assert!(inked(&img, swatches.clone(), y0..y0 + LEGEND_ROW, RUN_LINE) > 0);
        assert!(inked(&img, swatches, y0 + LEGEND_ROW..y1, REF_LINE) > 0);
        assert!(inked(&img, x0 + LEGEND_PAD + LEGEND_SWATCH..x1, y0 + 1..y1, AXIS) > 0);
    }

    #[test]
    fn legend_lists_only_the_run_without_reference() {
        let dir = tempfile::tempdir().unwrap();
        let run_csv = dir.path().join("run.csv");
        std::fs::write(&run_csv, "TotalEnvSteps,MetaTest/AverageReturn\n0,1\n10,2\n").unwrap();
        let run = Series::new("strider", vec![run_csv], "TotalEnvSteps", "MetaTest/AverageReturn");
        let img = render("HalfCheetahDirEnv", &run, None).unwrap();

        let (x0, y0, x1, y1) = legend_box(&["strider"]);
        assert!(inked(&img, x0..x1, y0..y1, RUN_LINE) > 0);
        assert_eq!(inked(&img, x0..x1, y0..y1, REF_LINE), 0);
    }

    #[test]
    fn segment_reaches_both_endpoints() {
        let mut img = RgbImage::from_pixel(10, 10, BACKGROUND);
        segment(&mut img, (1, 8), (7, 2), AXIS);
        assert_eq!(*img.get_pixel(1, 8), AXIS);
        assert_eq!(*img.get_pixel(7, 2), AXIS);
    }
}
