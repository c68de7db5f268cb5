// src/render/mod.rs

//! Bar-chart rendering. Two drawing backends share one output path: figures
//! are RGB rasters that can be shown in the terminal or exported as PNG.

mod labels;
pub mod plotters_backend;
pub mod raster;

use image::{ColorType, ImageFormat};
use std::{
    fmt::Write as _,
    fs,
    io::Write as _,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::info;

use crate::error::{Error, Result};
use crate::naming::NameGenerator;

pub use plotters_backend::PlottersRenderer;
pub use raster::RasterRenderer;

pub const DEFAULT_SIZE: (u32, u32) = (1024, 640);

/// A drawn chart: an RGB pixel buffer plus the series it was drawn from.
#[derive(Debug, Clone)]
pub struct Figure {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    labels: Vec<String>,
    counts: Vec<u64>,
}

impl Figure {
    pub(crate) fn new(
        (width, height): (u32, u32),
        pixels: Vec<u8>,
        labels: &[String],
        counts: &[u64],
    ) -> Self {
        Self {
            width,
            height,
            pixels,
            labels: labels.to_vec(),
            counts: counts.to_vec(),
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn bars(&self) -> usize {
        self.labels.len()
    }

    /// RGB at `(x, y)`, or `None` outside the figure.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 3;
        self.pixels.get(i..i + 3).map(|p| [p[0], p[1], p[2]])
    }

    /// Encode as PNG. The file is complete when this returns.
    pub fn save_png(&self, path: &Path) -> Result<()> {
        image::save_buffer_with_format(
            path,
            &self.pixels,
            self.width,
            self.height,
            ColorType::Rgb8,
            ImageFormat::Png,
        )
        .map_err(|e| Error::Render(format!("writing {}: {e}", path.display())))
    }

    /// One line per bar, `#` scaled so the tallest bar spans `TEXT_WIDTH`.
    pub fn to_text(&self) -> String {
        const TEXT_WIDTH: u64 = 40;
        let label_width = self.labels.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        let max = self.counts.iter().copied().max().unwrap_or(0).max(1);

        let mut out = String::new();
        for (label, &count) in self.labels.iter().zip(&self.counts) {
            let bar = "#".repeat((count * TEXT_WIDTH / max) as usize);
            let _ = writeln!(
                out,
                "{label:<label_width$} {bar:<width$} {count}",
                width = TEXT_WIDTH as usize
            );
        }
        out
    }
}

/// Labels and counts must be parallel.
pub fn validate_series(labels: &[String], counts: &[u64]) -> Result<()> {
    if labels.len() != counts.len() {
        return Err(Error::InvalidSeries {
            labels: labels.len(),
            counts: counts.len(),
        });
    }
    Ok(())
}

/// How `display` presents a figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    /// Print a text rendition of the chart to stdout.
    Terminal,
    /// No display available; drawing still happens, presenting is skipped.
    Headless,
}

/// Where figures go once drawn: the screen, or a uniquely named PNG.
#[derive(Clone)]
pub struct ChartOutput {
    names: Arc<dyn NameGenerator>,
    output_dir: PathBuf,
    mode: DisplayMode,
}

impl ChartOutput {
    pub fn new(names: Arc<dyn NameGenerator>, output_dir: impl Into<PathBuf>, mode: DisplayMode) -> Self {
        Self {
            names,
            output_dir: output_dir.into(),
            mode,
        }
    }

    pub fn show(&self, figure: &Figure) -> Result<()> {
        match self.mode {
            DisplayMode::Terminal => {
                let mut stdout = std::io::stdout().lock();
                stdout
                    .write_all(figure.to_text().as_bytes())
                    .and_then(|_| stdout.flush())
                    .map_err(|e| Error::io("<stdout>", e))
            }
            DisplayMode::Headless => {
                info!(bars = figure.bars(), "headless run, chart not displayed");
                Ok(())
            }
        }
    }

    pub fn export(&self, figure: &Figure) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir).map_err(|e| Error::io(&self.output_dir, e))?;
        let path = self
            .output_dir
            .join(format!("{}.png", self.names.next_name()));
        figure.save_png(&path)?;
        info!(path = %path.display(), bars = figure.bars(), "exported chart");
        Ok(path)
    }
}

pub trait RenderStrategy {
    fn name(&self) -> &'static str;

    fn output(&self) -> &ChartOutput;

    /// One bar per label, height = count. Fails on mismatched series.
    fn create_figure(&self, labels: &[String], counts: &[u64]) -> Result<Figure>;

    fn display(&self, labels: &[String], counts: &[u64]) -> Result<()> {
        let figure = self.create_figure(labels, counts)?;
        self.output().show(&figure)
    }

    /// Draw and write `<output_dir>/<unique name>.png`; the caller owns the file.
    fn export_to_file(&self, labels: &[String], counts: &[u64]) -> Result<PathBuf> {
        let figure = self.create_figure(labels, counts)?;
        self.output().export(&figure)
    }
}

/// Integer tick values from 0 up to the first step at or above `max`; the
/// last tick is the top of the value axis.
pub(crate) fn axis_ticks(max: u64) -> Vec<u64> {
    const STEPS: u64 = 4;
    let step = max.div_ceil(STEPS).max(1);
    let n = max.div_ceil(step).max(1);
    (0..=n).map(|i| i * step).collect()
}

/// Pixel geometry shared by both backends: caption band on top, tick labels
/// on the left, bar labels below the baseline, one slot per bar.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BarLayout {
    pub left: u32,
    pub right: u32,
    pub top: u32,
    pub baseline: u32,
    /// Caption glyph scale.
    pub scale: u32,
}

impl BarLayout {
    pub const MARGIN: u32 = 16;

    pub fn new((width, height): (u32, u32)) -> Self {
        let scale = (height / 320).max(1);
        Self {
            left: Self::MARGIN + 6 * labels::GLYPH,
            right: width.saturating_sub(Self::MARGIN),
            top: Self::MARGIN / 2 + labels::GLYPH * scale + Self::MARGIN,
            baseline: height.saturating_sub((height / 4).max(Self::MARGIN)),
            scale,
        }
    }

    /// Width of one bar slot.
    pub fn slot(&self, bars: usize) -> f64 {
        self.right.saturating_sub(self.left) as f64 / bars.max(1) as f64
    }

    /// Row of `value` on an axis running from 0 at the baseline to
    /// `axis_max` at the top.
    pub fn y(&self, value: u64, axis_max: u64) -> u32 {
        let usable = self.baseline.saturating_sub(self.top) as f64;
        let h = if axis_max == 0 {
            0.0
        } else {
            usable * value as f64 / axis_max as f64
        };
        (self.baseline as f64 - h).round() as u32
    }

    /// `(x0, x1, y_top)` of bar `index` out of `bars`.
    pub fn bar(&self, index: usize, bars: usize, count: u64, axis_max: u64) -> (u32, u32, u32) {
        let slot = self.slot(bars);
        let x0 = self.left as f64 + slot * (index as f64 + 0.1);
        let x1 = self.left as f64 + slot * (index as f64 + 0.9);
        (
            x0.round() as u32,
            x1.round() as u32,
            self.y(count, axis_max),
        )
    }
}
