// src/render/plotters_backend.rs

use image::{Rgb, RgbImage};
use plotters::prelude::*;

use super::labels::annotate;
use super::{axis_ticks, validate_series, BarLayout, ChartOutput, Figure, RenderStrategy, DEFAULT_SIZE};
use crate::error::{Error, Result};

/// Shaded plot area behind the bars.
const PANEL: RGBColor = RGBColor(234, 234, 242);

const TEXT: Rgb<u8> = Rgb([38, 38, 38]);

/// Cycled per bar.
const PALETTE: [RGBColor; 6] = [
    RGBColor(76, 114, 176),
    RGBColor(221, 132, 82),
    RGBColor(85, 168, 104),
    RGBColor(196, 78, 82),
    RGBColor(129, 114, 179),
    RGBColor(147, 120, 96),
];

fn render_err(e: impl std::fmt::Display) -> Error {
    Error::Render(e.to_string())
}

/// Styled bars drawn with plotters: shaded panel, white grid at each tick,
/// one palette colour per bar, dark grey labels.
pub struct PlottersRenderer {
    output: ChartOutput,
    size: (u32, u32),
}

impl PlottersRenderer {
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

    pub(crate) fn bar_color(index: usize) -> RGBColor {
        PALETTE[index % PALETTE.len()]
    }
}

impl RenderStrategy for PlottersRenderer {
    fn name(&self) -> &'static str {
        "plotters"
    }

    fn output(&self) -> &ChartOutput {
        &self.output
    }

    fn create_figure(&self, labels: &[String], counts: &[u64]) -> Result<Figure> {
        validate_series(labels, counts)?;
        let (width, height) = self.size;
        let layout = BarLayout::new(self.size);
        let ticks = axis_ticks(counts.iter().copied().max().unwrap_or(0));
        let axis_max = ticks.last().copied().unwrap_or(1) as f64;
        let mut pixels = vec![0u8; (width * height * 3) as usize];

        {
            let root = BitMapBackend::with_buffer(&mut pixels, self.size).into_drawing_area();
            root.fill(&WHITE).map_err(render_err)?;
            let plot = root.margin(
                layout.top,
                height.saturating_sub(layout.baseline),
                layout.left,
                width.saturating_sub(layout.right),
            );

            let slots = labels.len().max(1) as f64;
            let mut chart = ChartBuilder::on(&plot)
                .build_cartesian_2d(0f64..slots, 0f64..axis_max)
                .map_err(render_err)?;
            chart.plotting_area().fill(&PANEL).map_err(render_err)?;

            chart
                .draw_series(ticks.iter().skip(1).map(|&tick| {
                    let y = tick as f64;
                    PathElement::new(vec![(0.0, y), (slots, y)], WHITE.stroke_width(2))
                }))
                .map_err(render_err)?;

            chart
                .draw_series(counts.iter().enumerate().map(|(i, &count)| {
                    let x = i as f64;
                    Rectangle::new(
                        [(x + 0.1, 0.0), (x + 0.9, count as f64)],
                        Self::bar_color(i).filled(),
                    )
                }))
                .map_err(render_err)?;

            root.present().map_err(render_err)?;
        }

        let mut img = RgbImage::from_raw(width, height, pixels)
            .ok_or_else(|| Error::Render("pixel buffer does not match figure size".into()))?;
        annotate(&mut img, &layout, labels, &ticks, TEXT);

        Ok(Figure::new(self.size, img.into_raw(), labels, counts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::SequentialNames;
    use crate::render::tests::ink_below_plot;
    use crate::render::DisplayMode;
    use std::sync::Arc;

    fn renderer() -> PlottersRenderer {
        let out = ChartOutput::new(
            Arc::new(SequentialNames::new("fig")),
            std::env::temp_dir(),
            DisplayMode::Headless,
        );
        PlottersRenderer::new(out).with_size(400, 300)
    }

    #[test]
    fn bars_use_palette_colours() {
        let labels = vec!["usa".to_string(), "uk".to_string()];
        let figure = renderer().create_figure(&labels, &[2, 1]).unwrap();
        assert_eq!(figure.size(), (400, 300));
        assert_eq!(figure.bars(), 2);

        // A point low in the first half sits inside the first bar.
        let RGBColor(r, g, b) = PlottersRenderer::bar_color(0);
        assert_eq!(figure.pixel(110, 200), Some([r, g, b]));
        // The corner is outside the chart margin.
        assert_eq!(figure.pixel(1, 1), Some([255, 255, 255]));
    }

    #[test]
    fn empty_series_draws_an_empty_panel() {
        let figure = renderer().create_figure(&[], &[]).unwrap();
        assert_eq!(figure.bars(), 0);
        assert_eq!(figure.pixel(200, 150), Some([PANEL.0, PANEL.1, PANEL.2]));
    }

    #[test]
    fn countries_are_labelled_below_the_panel() {
        let counts = [2, 1];
        let named = renderer()
            .create_figure(&["usa".to_string(), "uk".to_string()], &counts)
            .unwrap();
        let blank = renderer()
            .create_figure(&[String::new(), String::new()], &counts)
            .unwrap();

        assert!(ink_below_plot(&named, TEXT.0) > 0);
        assert_eq!(ink_below_plot(&blank, TEXT.0), 0);
        assert_eq!(named.pixel(110, 200), blank.pixel(110, 200));
    }
}
