use clap::{ArgAction, Parser, Subcommand};
use resampler::derivative::DerivativeCache;
use resampler::registry::{TransformArg, TransformArgs};
use resampler::source::{SourceImage, discover_sources};
use resampler::{config, output};
use std::path::{Component, Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "resampler")]
#[command(about = "On-demand image derivatives with a deterministic file cache")]
#[command(long_about = "\
On-demand image derivatives with a deterministic file cache

Derivatives are generated the first time they are requested and stored next
to their source, then served from disk until the source is invalidated:

  assets/
  ├── photo.jpg                              # Source (no parent folder)
  ├── _resampled/
  │   ├── .derivatives.json                  # Ledger of generated paths
  │   └── SetWidth100-photo.jpg              # photo.jpg formatted SetWidth(100)
  └── Uploads/
      ├── banner.png                         # Source in folder Uploads/
      └── _resampled/
          └── CMSThumbnail-banner.png

Cache paths follow {folder}/_resampled/{format}{arg1}{arg2}-{name}.

Run 'resampler formats' to list available formats and 'resampler gen-config'
to generate a documented resampler.toml.")]
#[command(version)]
struct Cli {
    /// Storage root that image paths are relative to
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Config file (defaults to <root>/resampler.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Get (or generate) a derivative and print its cache path
    Format {
        /// Source image, relative to the root
        image: String,
        /// Format name, e.g. SetWidth
        format: String,
        arg1: Option<TransformArg>,
        arg2: Option<TransformArg>,
        /// Regenerate even if a cached file exists
        #[arg(long)]
        flush: bool,
    },
    /// Delete every derivative of the given images
    Invalidate {
        #[arg(required = true)]
        images: Vec<String>,
    },
    /// Bulk invalidation
    Flush {
        /// Flush every image under the assets directory
        #[arg(long, conflicts_with = "images")]
        all: bool,
        images: Vec<String>,
    },
    /// Show dimensions and orientation of an image
    Info { image: String },
    /// List registered formats
    Formats,
    /// Print a stock resampler.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("resampler=warn"),
        1 => EnvFilter::new("resampler=info"),
        _ => EnvFilter::new("resampler=debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| cli.root.join("resampler.toml"));
    let site_config = config::load_config(&config_path)?;
    tracing::debug!(config = %config_path.display(), "loaded config");
    let cache = DerivativeCache::from_config(&cli.root, &site_config);
    let assets_dir = site_config.assets_root();

    match cli.command {
        Command::Format {
            image,
            format,
            arg1,
            arg2,
            flush,
        } => {
            let source = source_for(&image, assets_dir);
            let args = TransformArgs { arg1, arg2 };
            let result = cache.get_formatted(&source, &format, &args, flush);
            output::print_derivative(&image, &format, &args, result.as_ref());
            if let Some(line) = output::format_stats(cache.stats()) {
                println!("{}", line);
            }
        }
        Command::Invalidate { images } => {
            for image in images {
                let removed = cache.invalidate(&source_for(&image, assets_dir));
                println!("{}", output::format_invalidated(&image, removed));
            }
        }
        Command::Flush { all, images } => {
            init_thread_pool(&site_config.processing);
            let sources: Vec<SourceImage> = if all {
                discover_sources(&cli.root, assets_dir)
            } else {
                images.iter().map(|i| source_for(i, assets_dir)).collect()
            };
            let report = cache.flush_all(&sources);
            println!("{}", output::format_flush(&report));
        }
        Command::Info { image } => {
            let source = source_for(&image, assets_dir);
            output::print_info(&image, cache.dimensions(&source));
        }
        Command::Formats => {
            output::print_formats(cache.registry());
        }
        Command::GenConfig => unreachable!("handled before loading config"),
    }

    Ok(())
}

/// Record for an image named on the command line.
fn source_for(image: &str, assets_dir: &str) -> SourceImage {
    let path = Path::new(image)
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/");
    SourceImage::from_asset_path(1, &path, assets_dir)
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
