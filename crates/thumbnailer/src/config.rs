use crate::error::FileIOError;

use std::{
	num::NonZeroUsize,
	path::{Path, PathBuf},
	thread::available_parallelism,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tracing::{error, instrument};

pub const THUMBNAIL_CACHE_DIR_NAME: &str = "thumbnails";

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error(transparent)]
	FileIO(#[from] FileIOError),
	#[error("failed to parse thumbnailer config at '{}': {source}", .path.display())]
	Parse {
		path: Box<Path>,
		#[source]
		source: serde_json::Error,
	},
	#[error("at least one thumbnail size must be configured")]
	NoThumbnailSizes,
	#[error("thumbnail sizes must be greater than zero")]
	ZeroThumbnailSize,
	#[error("icon size must be greater than zero")]
	ZeroIconSize,
	#[error("maximum source size must be greater than zero")]
	ZeroMaximumSourceSize,
	#[error("a thumbnail cache directory must be configured")]
	MissingCacheDirectory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadingConfig {
	/// When disabled every render runs one at a time
	pub enabled: bool,
	/// Number of concurrent renders, `0` picks one less than the available cores
	pub thumbnail_threads: usize,
}

impl Default for ThreadingConfig {
	fn default() -> Self {
		Self {
			enabled: true,
			thumbnail_threads: 0,
		}
	}
}

/// Thumbnailer settings, stored as JSON on disk.
///
/// Every field has a default, so partial files are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThumbnailerConfig {
	/// Root directory every artifact is written under
	pub cache_directory: PathBuf,
	/// Supported thumbnail sizes, requests for anything else get the smallest one
	pub thumbnail_sizes: Vec<u32>,
	/// Icons are always rendered at this size, square cropped
	pub icon_size: u32,
	/// Prefer output quality over rendering speed
	pub quality_priority: bool,
	pub threading: ThreadingConfig,
	/// Run renders on dedicated worker threads that only receive serialized jobs.
	/// Only takes effect when threading is enabled.
	pub isolated_workers: bool,
	/// Concurrent misses for the same artifact share a single render
	pub coalesce_in_flight: bool,
	/// Photos larger than this many bytes are refused instead of decoded, no limit when unset
	pub maximum_source_size: Option<u64>,
}

impl Default for ThumbnailerConfig {
	fn default() -> Self {
		Self {
			cache_directory: PathBuf::from(THUMBNAIL_CACHE_DIR_NAME),
			thumbnail_sizes: vec![240, 480],
			icon_size: 45,
			quality_priority: true,
			threading: ThreadingConfig::default(),
			isolated_workers: true,
			coalesce_in_flight: false,
			maximum_source_size: None,
		}
	}
}

impl ThumbnailerConfig {
	#[instrument(fields(path = %path.as_ref().display()))]
	pub async fn load(path: impl AsRef<Path> + Send) -> Result<Self, ConfigError> {
		let path = path.as_ref();

		let bytes = fs::read(path)
			.await
			.map_err(|e| FileIOError::from((path, e, "failed to read thumbnailer config")))?;

		serde_json::from_slice(&bytes).map_err(|source| ConfigError::Parse {
			path: path.into(),
			source,
		})
	}

	/// Checks the settings and normalizes the size set to ascending order without duplicates.
	pub fn validate(mut self) -> Result<Self, ConfigError> {
		if self.cache_directory.as_os_str().is_empty() {
			return Err(ConfigError::MissingCacheDirectory);
		}

		if self.thumbnail_sizes.is_empty() {
			return Err(ConfigError::NoThumbnailSizes);
		}

		if self.thumbnail_sizes.contains(&0) {
			return Err(ConfigError::ZeroThumbnailSize);
		}

		if self.icon_size == 0 {
			return Err(ConfigError::ZeroIconSize);
		}

		if self.maximum_source_size == Some(0) {
			return Err(ConfigError::ZeroMaximumSourceSize);
		}

		self.thumbnail_sizes.sort_unstable();
		self.thumbnail_sizes.dedup();

		Ok(self)
	}

	/// How many renders may run at once.
	#[must_use]
	pub fn concurrency(&self) -> NonZeroUsize {
		if !self.threading.enabled {
			return NonZeroUsize::MIN;
		}

		NonZeroUsize::new(self.threading.thumbnail_threads).unwrap_or_else(|| {
			let cores = available_parallelism().map_or_else(
				|e| {
					error!(?e, "Failed to get available parallelism for thumbnailer;");
					1
				},
				NonZeroUsize::get,
			);

			NonZeroUsize::new(cores - 1).unwrap_or(NonZeroUsize::MIN)
		})
	}

	#[must_use]
	pub const fn uses_isolated_workers(&self) -> bool {
		self.threading.enabled && self.isolated_workers
	}
}
