// src/render/raster.rs

use image::{Rgb, RgbImage};

use super::labels::{annotate, fill_rect};
use super::{axis_ticks, validate_series, BarLayout, ChartOutput, Figure, RenderStrategy, DEFAULT_SIZE};
use crate::error::Result;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const BAR: Rgb<u8> = Rgb([31, 119, 180]);
const AXIS: Rgb<u8> = Rgb([0, 0, 0]);

/// Plain single-colour bars drawn pixel by pixel, with a baseline, a ticked
/// left axis and black labels.
pub struct RasterRenderer {
    output: ChartOutput,
    size: (u32, u32),
}

impl RasterRenderer {
    pub fn new(output: ChartOutput) -> Self {
        Self {
            output,
            size: DEFAULT_SIZE,
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = (width, height);
        self
    }
}

impl RenderStrategy for RasterRenderer {
    fn name(&self) -> &'static str {
        "raster"
    }

    fn output(&self) -> &ChartOutput {
        &self.output
    }

    fn create_figure(&self, labels: &[String], counts: &[u64]) -> Result<Figure> {
        validate_series(labels, counts)?;
        let (width, height) = self.size;
        let layout = BarLayout::new(self.size);
        let ticks = axis_ticks(counts.iter().copied().max().unwrap_or(0));
        let axis_max = ticks.last().copied().unwrap_or(1);

        let mut img = RgbImage::from_pixel(width, height, BACKGROUND);
        for (i, &count) in counts.iter().enumerate() {
            let (x0, x1, y_top) = layout.bar(i, counts.len(), count, axis_max);
            fill_rect(&mut img, (x0, y_top), (x1, layout.baseline), BAR);
        }

        // axes drawn last so bars never cover them
        fill_rect(
            &mut img,
            (layout.left, layout.baseline),
            (layout.right, layout.baseline + 1),
            AXIS,
        );
        fill_rect(
            &mut img,
            (layout.left, layout.top),
            (layout.left + 1, layout.baseline + 1),
            AXIS,
        );
        for &tick in &ticks {
            let y = layout.y(tick, axis_max);
            fill_rect(&mut img, (layout.left.saturating_sub(3), y), (layout.left, y + 1), AXIS);
        }
        annotate(&mut img, &layout, labels, &ticks, AXIS);

        Ok(Figure::new(self.size, img.into_raw(), labels, counts))
    }
}
