use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::{fs, path::PathBuf, sync::Arc};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use uniscraper::{
    config::Config,
    handler_for,
    naming::{NameGenerator, TimestampNames},
    render::{ChartOutput, DisplayMode, PlottersRenderer, RasterRenderer, RenderStrategy},
    source::{HttpSource, RecordSource, StaticSource},
    storage::{DirectPathStore, DriveFolderClient, GcsBlobClient, StagedFolderStore, StorageStrategy},
    Shape, Universities,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ShapeArg {
    Records,
    Table,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RendererArg {
    Plotters,
    Raster,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StorageArg {
    Direct,
    Staged,
}

/// Chart universities per country and upload the chart plus counts.
#[derive(Parser, Debug)]
#[command(name = "uniscraper", version, long_about = None)]
struct Args {
    /// Data representation used for cleaning and grouping
    #[arg(long, value_enum, default_value = "records")]
    shape: ShapeArg,

    /// Keep only the first N records (0 keeps all of them)
    #[arg(long, default_value_t = 50, conflicts_with = "all")]
    sample: usize,

    /// Use every fetched record
    #[arg(long)]
    all: bool,

    /// Backend for the on-screen chart
    #[arg(long, value_enum, default_value = "plotters")]
    display_renderer: RendererArg,

    /// Backend for the uploaded chart
    #[arg(long, value_enum, default_value = "raster")]
    export_renderer: RendererArg,

    /// Destination for the chart and counts
    #[arg(long, value_enum, default_value = "direct")]
    storage: StorageArg,

    /// Skip the on-screen chart
    #[arg(long)]
    headless: bool,

    /// Read records from a local JSON file instead of the network
    #[arg(long)]
    input: Option<PathBuf>,

    /// YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Debug-level logging unless RUST_LOG is set
    #[arg(short, long)]
    verbose: bool,
}

fn renderer(kind: RendererArg, output: ChartOutput) -> Box<dyn RenderStrategy> {
    match kind {
        RendererArg::Plotters => Box::new(PlottersRenderer::new(output)),
        RendererArg::Raster => Box::new(RasterRenderer::new(output)),
    }
}

fn storage(
    kind: StorageArg,
    cfg: &Config,
    names: Arc<dyn NameGenerator>,
) -> Result<Box<dyn StorageStrategy>> {
    Ok(match kind {
        StorageArg::Direct => {
            let client = GcsBlobClient::connect(&cfg.direct).context("connecting to object store")?;
            Box::new(DirectPathStore::new(client, names).with_prefix(cfg.direct.prefix.clone()))
        }
        StorageArg::Staged => {
            let client = DriveFolderClient::new(&cfg.staged).context("configuring drive client")?;
            Box::new(StagedFolderStore::new(
                client,
                names,
                cfg.staged.parent_folder_id.clone(),
                cfg.output_dir.clone(),
            ))
        }
    })
}

fn main() -> Result<()> {
    let args = Args::parse();

    let fallback = if args.verbose { "debug" } else { "info" };
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    fmt().with_env_filter(env).with_target(false).init();
    info!("startup");

    let cfg = Config::load(args.config.as_deref()).context("loading config")?;
    let names: Arc<dyn NameGenerator> = Arc::new(TimestampNames::new());

    let source: Box<dyn RecordSource> = match &args.input {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading input {}", path.display()))?;
            Box::new(StaticSource::from_json(&text).context("parsing input records")?)
        }
        None => Box::new(HttpSource::new(&cfg.source_url)?),
    };
    let shape = match args.shape {
        ShapeArg::Records => Shape::Records,
        ShapeArg::Table => Shape::Table,
    };
    let app = Universities::new(source, handler_for(shape), names.clone());

    let sample = (!args.all).then_some(args.sample);
    let data = app.fetch(sample).context("fetch")?;

    let mode = if args.headless {
        DisplayMode::Headless
    } else {
        DisplayMode::Terminal
    };
    let output = ChartOutput::new(names.clone(), cfg.output_dir.clone(), mode);

    let display = renderer(args.display_renderer, output.clone());
    app.render_data(&data, display.as_ref())
        .context("display chart")?;

    let export = renderer(args.export_renderer, output);
    let store = storage(args.storage, &cfg, names)?;
    let report = app
        .export_and_ingest(&data, store.as_ref(), export.as_ref())
        .context("export and ingest")?;

    info!(folder = %report.folder, objects = ?report.objects, "all done");
    Ok(())
}
