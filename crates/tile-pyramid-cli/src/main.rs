use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use globset::{Glob, GlobSet, GlobSetBuilder};
use image::ImageReader;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use tile_pyramid_core::prelude::*;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "tile-pyramid",
    about = "Merge quad-tree tile sets into a single downsampled map pyramid",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Show progress bars (disable with --progress false or --quiet)
    #[arg(long, default_value_t = true, action=ArgAction::Set, global=true, help_heading = "Logging/UX")]
    progress: bool,
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action=ArgAction::Count, global=true, help_heading = "Logging/UX")]
    verbose: u8,
    /// Quiet mode (overrides verbose)
    #[arg(
        short,
        long,
        default_value_t = false,
        global = true,
        help_heading = "Logging/UX"
    )]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Locate complete tiles in every source and build the pyramid
    Build(BuildArgs),
    /// Locate complete tiles and print the resulting tree (writes nothing)
    Inspect(BuildArgs),
    /// Cut one large square image into a tile tree, optionally reduced to a pyramid
    Slice(SliceArgs),
}

#[derive(Parser, Debug, Clone)]
struct BuildArgs {
    // Input/Output
    /// Directory whose subdirectories are source tile trees
    #[arg(help_heading = "Input/Output")]
    input: PathBuf,
    /// Output directory (one subdirectory per layer)
    #[arg(short, long, default_value = "out", help_heading = "Input/Output")]
    out_dir: PathBuf,
    /// Treat INPUT itself as the only source tree
    #[arg(long, default_value_t = false, help_heading = "Input/Output")]
    single: bool,
    /// Only accept source directories containing a file with this name (e.g. "done")
    #[arg(long, help_heading = "Input/Output")]
    marker: Option<String>,
    /// Fixed subdirectory inside every source directory (e.g. "mapcrafter")
    #[arg(long, help_heading = "Input/Output")]
    subdir: Option<PathBuf>,
    /// Layer path inside each source (repeatable, e.g. "topdown/tl"); default: the source itself
    #[arg(long, help_heading = "Input/Output")]
    layer: Vec<PathBuf>,
    /// Exclude patterns (glob) matched against source directory names
    #[arg(long, help_heading = "Input/Output")]
    exclude: Vec<String>,
    /// YAML config file path (overrides the options below)
    #[arg(long, help_heading = "Input/Output")]
    config: Option<PathBuf>,

    // Tiles
    /// Side length of every square tile
    #[arg(long, default_value_t = 256, help_heading = "Tiles")]
    tile_size: u32,
    /// Tile image extension (also selects the encoder)
    #[arg(long, default_value = "png", help_heading = "Tiles")]
    ext: String,
    /// File stem of the final root image
    #[arg(long, default_value = "base", help_heading = "Tiles")]
    base_name: String,

    // Behaviour
    /// Symlink located source tiles into the output tree
    #[arg(long, default_value_t = true, action=ArgAction::Set, help_heading = "Behaviour")]
    link_sources: bool,
    /// Remove each layer's output directory before building it
    #[arg(long, default_value_t = true, action=ArgAction::Set, help_heading = "Behaviour")]
    clean_output: bool,
    /// Locate and composite on all cores (requires feature `parallel`)
    #[arg(long, default_value_t = true, action=ArgAction::Set, help_heading = "Behaviour")]
    parallel: bool,

    // Export
    /// Export run statistics (JSON) to this file
    #[arg(long, help_heading = "Export")]
    export_stats: Option<PathBuf>,
    /// Print the merged configuration (after CLI/YAML) and exit
    #[arg(long, default_value_t = false, help_heading = "Export")]
    print_config: bool,
    /// Output format for --print-config: json|yaml
    #[arg(long, default_value = "json", value_parser = ["json", "yaml"], help_heading = "Export")]
    print_config_format: String,
}

#[derive(Parser, Debug, Clone)]
struct SliceArgs {
    /// Square source image whose side is tile_size * 2^k
    image: PathBuf,
    /// Output directory for the tile tree
    #[arg(short, long, default_value = "out")]
    out_dir: PathBuf,
    /// Side length of every square tile
    #[arg(long, default_value_t = 256)]
    tile_size: u32,
    /// Tile image extension
    #[arg(long, default_value = "png")]
    ext: String,
    /// Also reduce the sliced tiles to coarser levels and a base image
    #[arg(long, default_value_t = false)]
    pyramid: bool,
    /// File stem of the final root image (with --pyramid)
    #[arg(long, default_value = "base")]
    base_name: String,
    /// Slice on all cores (requires feature `parallel`)
    #[arg(long, default_value_t = true, action=ArgAction::Set)]
    parallel: bool,
}

/// Merged run settings: the core configuration plus source selection.
#[derive(Debug, Clone, serde::Serialize)]
struct RunSettings {
    pyramid: PyramidConfig,
    filter: SourceFilter,
    layers: Vec<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing_with_level(cli.quiet, cli.verbose);
    match &cli.command {
        Commands::Build(args) => run_build(args, cli.progress && !cli.quiet),
        Commands::Inspect(args) => run_inspect(args, cli.verbose > 0),
        Commands::Slice(args) => run_slice(args, cli.progress && !cli.quiet),
    }
}

fn run_build(args: &BuildArgs, show_progress: bool) -> anyhow::Result<()> {
    let settings = merged_settings(args)?;
    if args.print_config {
        match args.print_config_format.as_str() {
            "yaml" => println!("{}", serde_yaml::to_string(&settings)?),
            _ => println!("{}", serde_json::to_string_pretty(&settings)?),
        }
        return Ok(());
    }

    let pyramid = Pyramid::new(settings.pyramid.clone())?;
    let sources = gather_sources(args, &settings.filter)?;
    info!(count = sources.len(), ?sources, "found inputs");
    if sources.is_empty() {
        anyhow::bail!("no source trees found under {}", args.input.display());
    }

    let start = Instant::now();
    let mut stats = serde_json::Map::new();
    for layer in &settings.layers {
        let name = layer_name(layer);
        info!(layer = %name, "running for layer");
        let layer_sources = if layer.as_os_str().is_empty() {
            sources.clone()
        } else {
            tile_pyramid_core::layer_sources(&sources, layer)
        };
        if layer_sources.is_empty() {
            warn!(layer = %name, "no source provides this layer, skipping");
            continue;
        }
        let out = args.out_dir.join(layer);
        let report = build_layer(&pyramid, &layer_sources, &out, show_progress)
            .with_context(|| format!("layer {name}"))?;
        info!(
            layer = %name,
            leaves = report.leaves,
            levels = report.levels.len(),
            tiles = report.tiles_written(),
            base = ?report.base,
            "layer done"
        );
        stats.insert(name, report.to_json());
    }
    info!(elapsed = fmt_dur(start.elapsed()), "done");

    if let Some(stats_path) = &args.export_stats {
        let value = serde_json::json!({ "layers": stats });
        fs::write(stats_path, serde_json::to_string_pretty(&value)?)
            .with_context(|| format!("write {}", stats_path.display()))?;
        info!(?stats_path, "stats exported");
    }
    Ok(())
}

/// Same phases as `Pyramid::build`, with a progress bar per phase.
fn build_layer(
    pyramid: &Pyramid,
    sources: &[PathBuf],
    out: &Path,
    show_progress: bool,
) -> anyhow::Result<PyramidReport> {
    pyramid
        .prepare_output(out)
        .with_context(|| format!("prepare {}", out.display()))?;

    let tree = QuadTree::new();
    let spinner = spinner(show_progress, "locating complete tiles")?;
    let locate = pyramid.collect(&tree, sources)?;
    finish(spinner);
    let leaves = tree.len();
    let initial_depth = tree.depth();

    if pyramid.config().link_sources {
        let links = pyramid.mirror_sources(&tree, out)?;
        info!(links, "source tiles linked");
    }

    let bar = levels_bar(show_progress, initial_depth.saturating_sub(1) as u64)?;
    let mut levels = Vec::new();
    while let Some(level) = pyramid.reduce_level(&tree, out)? {
        if let Some(b) = &bar {
            b.set_message(format!("depth {} -> {}", level.depth, level.depth - 1));
            b.inc(1);
        }
        levels.push(level);
    }
    finish(bar);
    let base = pyramid.write_base(&tree, out)?;

    Ok(PyramidReport {
        sources: sources.len(),
        locate,
        leaves,
        initial_depth,
        levels,
        base,
    })
}

fn run_inspect(args: &BuildArgs, dump_tree: bool) -> anyhow::Result<()> {
    let settings = merged_settings(args)?;
    let sources = gather_sources(args, &settings.filter)?;
    for layer in &settings.layers {
        let layer_sources = if layer.as_os_str().is_empty() {
            sources.clone()
        } else {
            tile_pyramid_core::layer_sources(&sources, layer)
        };
        let tree = QuadTree::new();
        let stats = TileLocator::new(&tree, &settings.pyramid).locate_all(&layer_sources)?;
        println!("# layer {}", layer_name(layer));
        println!(
            "scanned={} incomplete={} inserted={} skipped={} depth={}",
            stats.images_scanned,
            stats.incomplete,
            stats.inserted,
            stats.skipped,
            tree.depth()
        );
        tree.for_each_value(|path, file| println!("  {path} -> {}", file.display()));
        if dump_tree {
            println!("{}", tree.debug_string());
        }
    }
    Ok(())
}

fn run_slice(args: &SliceArgs, show_progress: bool) -> anyhow::Result<()> {
    let cfg = PyramidConfig::builder()
        .tile_size(args.tile_size)
        .image_extension(args.ext.clone())
        .base_name(args.base_name.clone())
        .parallel(args.parallel)
        .link_sources(false)
        .build();
    let pyramid = Pyramid::new(cfg)?;
    let img = ImageReader::open(&args.image)
        .with_context(|| format!("open {}", args.image.display()))?
        .with_guessed_format()?
        .decode()
        .with_context(|| format!("decode {}", args.image.display()))?
        .to_rgba8();
    pyramid
        .prepare_output(&args.out_dir)
        .with_context(|| format!("prepare {}", args.out_dir.display()))?;

    let spinner = spinner(show_progress, "slicing")?;
    let (report, tiles) = slice_image(&img, pyramid.config(), &args.out_dir)?;
    finish(spinner);
    info!(
        side = report.source_side,
        depth = report.depth,
        tiles = report.tiles,
        "image sliced"
    );

    if args.pyramid {
        let tree = QuadTree::new();
        for (path, file) in tiles {
            tree.insert(&path, file)?;
        }
        let (levels, base) = pyramid.finish(&tree, &args.out_dir)?;
        info!(levels = levels.len(), ?base, "pyramid written");
    }
    Ok(())
}

fn merged_settings(args: &BuildArgs) -> anyhow::Result<RunSettings> {
    let mut settings = RunSettings {
        pyramid: PyramidConfig {
            tile_size: args.tile_size,
            image_extension: args.ext.clone(),
            base_name: args.base_name.clone(),
            parallel: args.parallel,
            link_sources: args.link_sources,
            clean_output: args.clean_output,
        },
        filter: SourceFilter {
            marker: args.marker.clone(),
            subdir: args.subdir.clone(),
        },
        layers: args.layer.clone(),
    };
    if let Some(path) = &args.config {
        let file =
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let y: YamlConfig = serde_yaml::from_str(&file)?;
        settings = y.into_settings(settings);
    }
    if settings.layers.is_empty() {
        settings.layers.push(PathBuf::new());
    }
    Ok(settings)
}

fn gather_sources(args: &BuildArgs, filter: &SourceFilter) -> anyhow::Result<Vec<PathBuf>> {
    if args.single {
        return Ok(vec![args.input.clone()]);
    }
    let exclude = build_globset(&args.exclude)?;
    let all = discover_sources(&args.input, filter)
        .with_context(|| format!("scan {}", args.input.display()))?;
    Ok(all
        .into_iter()
        .filter(|p| !should_skip(p, &args.input, exclude.as_ref()))
        .collect())
}

fn build_globset(patterns: &[String]) -> anyhow::Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut b = GlobSetBuilder::new();
    for pat in patterns {
        b.add(Glob::new(pat)?);
    }
    Ok(Some(b.build()?))
}

fn should_skip(p: &Path, root: &Path, exclude: Option<&GlobSet>) -> bool {
    let Some(ex) = exclude else {
        return false;
    };
    let rel = p.strip_prefix(root).unwrap_or(p);
    // match on the source directory name, i.e. the first component below the root
    let name = rel
        .components()
        .next()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .unwrap_or_default();
    ex.is_match(&name)
}

fn layer_name(layer: &Path) -> String {
    if layer.as_os_str().is_empty() {
        ".".into()
    } else {
        layer.to_string_lossy().replace('\\', "/")
    }
}

fn spinner(show: bool, msg: &'static str) -> anyhow::Result<Option<ProgressBar>> {
    if !show {
        return Ok(None);
    }
    let b = ProgressBar::new_spinner();
    b.set_style(ProgressStyle::with_template(
        "{spinner:.green} {msg} [{elapsed_precise}]",
    )?);
    b.set_message(msg);
    b.enable_steady_tick(Duration::from_millis(100));
    Ok(Some(b))
}

fn levels_bar(show: bool, len: u64) -> anyhow::Result<Option<ProgressBar>> {
    if !show {
        return Ok(None);
    }
    let b = ProgressBar::new(len);
    b.set_style(ProgressStyle::with_template(
        "{spinner:.green} reducing {pos}/{len} [{elapsed_precise}] {wide_msg}",
    )?);
    Ok(Some(b))
}

fn finish(bar: Option<ProgressBar>) {
    if let Some(b) = bar {
        b.finish_and_clear();
    }
}

fn fmt_dur(d: Duration) -> String {
    let ms = d.as_secs_f64() * 1000.0;
    if ms >= 1000.0 {
        format!("{:.2}s", ms / 1000.0)
    } else if ms >= 1.0 {
        format!("{:.1}ms", ms)
    } else {
        format!("{}us", d.as_micros())
    }
}

fn init_tracing_with_level(quiet: bool, verbose: u8) {
    let level = if quiet {
        "error".to_string()
    } else {
        match verbose {
            0 => "info".into(),
            1 => "debug".into(),
            _ => "trace".into(),
        }
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_target(false)
        .try_init();
}

#[derive(Debug, Deserialize, Default)]
struct YamlConfig {
    tile_size: Option<u32>,
    image_extension: Option<String>,
    base_name: Option<String>,
    parallel: Option<bool>,
    link_sources: Option<bool>,
    clean_output: Option<bool>,
    marker: Option<String>,
    subdir: Option<PathBuf>,
    layers: Option<Vec<PathBuf>>,
}

impl YamlConfig {
    fn into_settings(self, mut s: RunSettings) -> RunSettings {
        if let Some(v) = self.tile_size {
            s.pyramid.tile_size = v;
        }
        if let Some(v) = self.image_extension {
            s.pyramid.image_extension = v;
        }
        if let Some(v) = self.base_name {
            s.pyramid.base_name = v;
        }
        if let Some(v) = self.parallel {
            s.pyramid.parallel = v;
        }
        if let Some(v) = self.link_sources {
            s.pyramid.link_sources = v;
        }
        if let Some(v) = self.clean_output {
            s.pyramid.clean_output = v;
        }
        if let Some(v) = self.marker {
            s.filter.marker = Some(v);
        }
        if let Some(v) = self.subdir {
            s.filter.subdir = Some(v);
        }
        if let Some(v) = self.layers {
            s.layers = v;
        }
        s
    }
}
