pub mod config;
pub mod data;
pub mod error;
pub mod naming;
pub mod pipeline;
pub mod render;
pub mod shape;
pub mod source;
pub mod storage;

pub use config::Config;
pub use data::{CountryCounts, DataExtension, Dataset, GroupedResult, RawRecord, Shape};
pub use error::{Error, Result};
pub use naming::{NameGenerator, SequentialNames, TimestampNames};
pub use pipeline::Universities;
pub use render::{ChartOutput, DisplayMode, Figure, PlottersRenderer, RasterRenderer, RenderStrategy};
pub use shape::{handler_for, RecordHandler, ShapeHandler, TableHandler};
pub use source::{HttpSource, RecordSource, StaticSource};
pub use storage::{DirectPathStore, StagedFolderStore, StorageStrategy, UploadReport};
