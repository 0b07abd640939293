use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use futures_concurrency::future::Join;
use pg_thumbnailer::{ArtifactRequest, SourceKind, Thumbnailer, ThumbnailerConfig};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Kind {
	Photo,
	Video,
}

impl From<Kind> for SourceKind {
	fn from(kind: Kind) -> Self {
		match kind {
			Kind::Photo => Self::Photo,
			Kind::Video => Self::Video,
		}
	}
}

#[derive(Parser, Debug)]
#[command(name = "thumbgen", about = "Generate cached thumbnails and icons for media files")]
struct Cli {
	/// JSON thumbnailer config, defaults are used when omitted
	#[arg(long)]
	config: Option<PathBuf>,

	/// Overrides the cache directory from the config
	#[arg(long, env = "THUMBNAIL_CACHE_DIR")]
	cache_dir: Option<PathBuf>,

	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
	/// Render (or look up) artifacts and print their paths
	Render {
		/// Requested thumbnail size, unsupported sizes use the smallest configured one
		#[arg(long, default_value_t = 240)]
		size: u32,
		/// Render square icons instead of thumbnails
		#[arg(long, default_value_t = false)]
		icon: bool,
		/// Crop thumbnails to a square
		#[arg(long, default_value_t = false)]
		square: bool,
		#[arg(long, value_enum, default_value = "photo")]
		kind: Kind,
		#[arg(required = true)]
		media: Vec<PathBuf>,
	},
	/// Delete every cached artifact of the given media files
	Invalidate {
		#[arg(required = true)]
		media: Vec<PathBuf>,
	},
	/// Print the effective config as JSON
	Config,
}

async fn load_config(cli: &Cli) -> Result<ThumbnailerConfig> {
	let mut config = match &cli.config {
		Some(path) => ThumbnailerConfig::load(path).await?,
		None => ThumbnailerConfig::default(),
	};

	if let Some(cache_dir) = &cli.cache_dir {
		config.cache_directory.clone_from(cache_dir);
	}

	Ok(config.validate()?)
}

#[tokio::main]
async fn main() -> Result<()> {
	tracing_subscriber::registry()
		.with(fmt::layer().with_writer(std::io::stderr))
		.with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.init();

	let cli = Cli::parse();
	let config = load_config(&cli).await?;

	if matches!(cli.command, Commands::Config) {
		println!(
			"{}",
			serde_json::to_string_pretty(&config).context("failed to serialize config")?
		);
		return Ok(());
	}

	let thumbnailer = Thumbnailer::new();
	let generator = thumbnailer
		.init(config)
		.await
		.context("failed to initialize thumbnailer")?;

	let mut failed = 0;

	match cli.command {
		Commands::Render {
			size,
			icon,
			square,
			kind,
			media,
		} => {
			let results = media
				.into_iter()
				.map(|path| {
					let request = if icon {
						ArtifactRequest::icon(path, kind.into())
					} else {
						ArtifactRequest::thumbnail(path, size, kind.into()).with_square_crop(square)
					};
					thumbnailer.request_artifact(request)
				})
				.collect::<Vec<_>>()
				.join()
				.await;

			for res in results {
				match res {
					Ok(path) => println!("{}", path.display()),
					Err(e) => {
						error!(kind = ?e.kind(), media_path = ?e.subject(), detail = %e.detail(), "{e}");
						failed += 1;
					}
				}
			}
		}
		Commands::Invalidate { media } => {
			for path in media {
				match generator.invalidate(&path).await {
					Ok(removed) => info!(media_path = %path.display(), removed, "Invalidated"),
					Err(e) => {
						error!(?e, media_path = %path.display(), "Failed to invalidate;");
						failed += 1;
					}
				}
			}
		}
		Commands::Config => {}
	}

	thumbnailer.shutdown().await;

	if failed > 0 {
		anyhow::bail!("{failed} media file(s) failed");
	}

	Ok(())
}
