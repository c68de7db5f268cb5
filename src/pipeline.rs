// src/pipeline.rs

use std::{path::PathBuf, sync::Arc, time::Instant};
use tracing::info;

use crate::data::Dataset;
use crate::error::Result;
use crate::naming::NameGenerator;
use crate::render::RenderStrategy;
use crate::shape::ShapeHandler;
use crate::source::RecordSource;
use crate::storage::{StorageStrategy, UploadReport};

/// Drives fetch → normalize → group → chart → upload, with the data shape,
/// renderers and storage chosen by the caller.
pub struct Universities {
    source: Box<dyn RecordSource>,
    handler: Box<dyn ShapeHandler>,
    names: Arc<dyn NameGenerator>,
}

impl Universities {
    pub fn new(
        source: Box<dyn RecordSource>,
        handler: Box<dyn ShapeHandler>,
        names: Arc<dyn NameGenerator>,
    ) -> Self {
        Self {
            source,
            handler,
            names,
        }
    }

    /// Fetch everything, keep the first `sample` records if given, and parse
    /// into the handler's representation. A sample of 0 keeps everything.
    pub fn fetch(&self, sample: Option<usize>) -> Result<Dataset> {
        let start = Instant::now();
        let mut raw = self.source.fetch_all()?;
        let total = raw.len();
        if let Some(n) = sample.filter(|&n| n > 0) {
            raw.truncate(n);
        }
        let data = self.handler.parse(raw)?;
        info!(
            fetched = total,
            kept = data.len(),
            shape = %self.handler.shape(),
            elapsed = ?start.elapsed(),
            "loaded universities"
        );
        Ok(data)
    }

    pub fn render_data(&self, data: &Dataset, renderer: &dyn RenderStrategy) -> Result<()> {
        self.handler.render(data, renderer)
    }

    /// Write the chart locally; the caller owns the returned file.
    pub fn export_figure(&self, data: &Dataset, renderer: &dyn RenderStrategy) -> Result<PathBuf> {
        self.handler.export(data, renderer)
    }

    /// Export the chart and upload it with the grouped counts into a fresh
    /// remote folder.
    pub fn export_and_ingest(
        &self,
        data: &Dataset,
        storage: &dyn StorageStrategy,
        renderer: &dyn RenderStrategy,
    ) -> Result<UploadReport> {
        let folder = self.names.next_name();
        // group before exporting so a bad dataset never leaves a figure behind
        let grouped = self.handler.group(data)?;
        let figure = self.handler.export(data, renderer)?;
        let ext = grouped.extension();

        info!(
            folder = %folder,
            figure = %figure.display(),
            ext = %ext,
            storage = storage.name(),
            "ingesting"
        );
        let report = storage.upload(&grouped, ext, &folder, &figure)?;
        info!(folder = %report.folder, objects = report.objects.len(), "ingest complete");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Shape;
    use crate::error::Error;
    use crate::naming::SequentialNames;
    use crate::render::{ChartOutput, DisplayMode, PlottersRenderer, RasterRenderer};
    use crate::shape::handler_for;
    use crate::source::StaticSource;
    use crate::storage::{BlobClient, DirectPathStore};
    use std::{cell::RefCell, path::Path, rc::Rc};
    use tempfile::tempdir;
    use tracing_subscriber::{fmt, EnvFilter};

    fn init_logging() {
        let _ = fmt()
            .with_env_filter(EnvFilter::new("debug"))
            .with_test_writer()
            .try_init();
    }

    const SCENARIO: &str = r#"[
        {"Country": "USA", "Domains": ["a.edu"], "Name": "A"},
        {"Country": "usa", "Domains": ["b.edu"], "Name": "B"},
        {"Country": "UK", "Domains": ["c.ac.uk"], "Name": "C"}
    ]"#;

    /// Uploaded objects, shared with the test after the store is borrowed.
    #[derive(Clone, Default)]
    struct SharedBlobs(Rc<RefCell<Vec<(String, Vec<u8>)>>>);

    impl BlobClient for SharedBlobs {
        fn upload_data(&self, path: &str, data: Vec<u8>, _overwrite: bool) -> Result<()> {
            self.0.borrow_mut().push((path.to_string(), data));
            Ok(())
        }
    }

    fn universities(json: &str, shape: Shape) -> Universities {
        Universities::new(
            Box::new(StaticSource::from_json(json).unwrap()),
            handler_for(shape),
            Arc::new(SequentialNames::new("folder")),
        )
    }

    fn output(dir: &Path) -> ChartOutput {
        ChartOutput::new(
            Arc::new(SequentialNames::new("figure")),
            dir,
            DisplayMode::Headless,
        )
    }

    #[test]
    fn fetch_truncates_to_sample() {
        let app = universities(SCENARIO, Shape::Records);
        assert_eq!(app.fetch(Some(2)).unwrap().len(), 2);
        assert_eq!(app.fetch(None).unwrap().len(), 3);
        assert_eq!(app.fetch(Some(50)).unwrap().len(), 3);
    }

    #[test]
    fn zero_sample_keeps_every_record() {
        for shape in [Shape::Records, Shape::Table] {
            let app = universities(SCENARIO, shape);
            assert_eq!(app.fetch(Some(0)).unwrap().len(), 3);
        }
    }

    #[test]
    fn ingest_uploads_and_cleans_up_for_both_shapes() {
        init_logging();
        for (shape, ext, payload) in [
            (Shape::Records, "json", r#"{"usa":2,"uk":1}"#),
            (Shape::Table, "csv", "country,count\nusa,2\nuk,1\n"),
        ] {
            let dir = tempdir().unwrap();
            let app = universities(SCENARIO, shape);
            let data = app.fetch(None).unwrap();

            let blobs = SharedBlobs::default();
            let store = DirectPathStore::new(blobs.clone(), Arc::new(SequentialNames::new("data")));
            let renderer = RasterRenderer::new(output(dir.path()));

            let report = app.export_and_ingest(&data, &store, &renderer).unwrap();
            assert_eq!(report.folder, "folder_0000");
            assert_eq!(
                report.objects,
                vec![
                    "folder_0000/figure_0000.png".to_string(),
                    format!("folder_0000/data_0000.{ext}"),
                ]
            );

            let uploaded = blobs.0.borrow();
            assert!(uploaded[0].1.starts_with(b"\x89PNG"));
            assert_eq!(uploaded[1].1, payload.as_bytes());

            let leftovers: Vec<_> = glob::glob(&format!("{}/*", dir.path().display()))
                .unwrap()
                .filter_map(std::result::Result::ok)
                .collect();
            assert!(leftovers.is_empty(), "left behind: {leftovers:?}");
        }
    }

    #[test]
    fn missing_country_stops_before_render_or_upload() {
        let dir = tempdir().unwrap();
        let app = universities(
            r#"[{"Country": "USA", "Domains": ["a.edu"]}, {"Domains": ["b.edu"]}]"#,
            Shape::Records,
        );
        let data = app.fetch(None).unwrap();

        let blobs = SharedBlobs::default();
        let store = DirectPathStore::new(blobs.clone(), Arc::new(SequentialNames::new("data")));
        let renderer = PlottersRenderer::new(output(dir.path()));

        assert!(matches!(
            app.render_data(&data, &renderer),
            Err(Error::MissingField { field: "country", row: 1 })
        ));
        assert!(matches!(
            app.export_and_ingest(&data, &store, &renderer),
            Err(Error::MissingField { .. })
        ));
        assert!(blobs.0.borrow().is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn export_figure_leaves_file_for_caller() {
        let dir = tempdir().unwrap();
        let app = universities(SCENARIO, Shape::Table);
        let data = app.fetch(None).unwrap();
        let renderer = PlottersRenderer::new(output(dir.path()));

        let path = app.export_figure(&data, &renderer).unwrap();
        assert!(path.to_string_lossy().ends_with(".png"));
        assert!(image::open(&path).is_ok());
    }

    #[test]
    fn wrong_shape_dataset_is_rejected() {
        let records = universities(SCENARIO, Shape::Records);
        let table = universities(SCENARIO, Shape::Table);
        let data = table.fetch(None).unwrap();
        let dir = tempdir().unwrap();
        let renderer = RasterRenderer::new(output(dir.path()));
        assert!(matches!(
            records.render_data(&data, &renderer),
            Err(Error::UnsupportedShape { .. })
        ));
    }
}
