use crate::{
	config::ThumbnailerConfig,
	error::ThumbnailerError,
	generator::ThumbnailGenerator,
	renderer::Renderer,
	request::ArtifactRequest,
};

use std::{path::PathBuf, sync::Arc};

use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Process wide handle on the thumbnail pipeline.
///
/// Starts uninitialized; the first [`Thumbnailer::init`] builds the generator and later calls return
/// that same instance, whatever config they carry.
#[derive(Default)]
pub struct Thumbnailer {
	generator: OnceCell<ThumbnailGenerator>,
}

impl Thumbnailer {
	#[must_use]
	pub fn new() -> Self {
		Self {
			generator: OnceCell::new(),
		}
	}

	#[must_use]
	pub fn is_ready(&self) -> bool {
		self.generator.initialized()
	}

	pub async fn init(
		&self,
		config: ThumbnailerConfig,
	) -> Result<&ThumbnailGenerator, ThumbnailerError> {
		self.init_with(|| async move { ThumbnailGenerator::from_config(config) })
			.await
	}

	pub async fn init_with_renderer(
		&self,
		config: ThumbnailerConfig,
		renderer: Arc<dyn Renderer>,
	) -> Result<&ThumbnailGenerator, ThumbnailerError> {
		self.init_with(|| async move {
			ThumbnailGenerator::new(config, renderer).map_err(Into::into)
		})
		.await
	}

	async fn init_with<F, Fut>(&self, build: F) -> Result<&ThumbnailGenerator, ThumbnailerError>
	where
		F: FnOnce() -> Fut,
		Fut: std::future::Future<Output = Result<ThumbnailGenerator, ThumbnailerError>>,
	{
		if let Some(generator) = self.generator.get() {
			debug!("Thumbnailer already initialized");
			return Ok(generator);
		}

		self.generator
			.get_or_try_init(|| async move {
				let generator = build().await?;

				match generator.store().remove_stale_temporaries().await {
					Ok(0) => {}
					Ok(removed) => info!(removed, "Cleaned up interrupted thumbnail writes"),
					Err(e) => warn!(?e, "Failed to clean up interrupted thumbnail writes;"),
				}

				Ok(generator)
			})
			.await
	}

	pub fn generator(&self) -> Result<&ThumbnailGenerator, ThumbnailerError> {
		self.generator
			.get()
			.ok_or(ThumbnailerError::NotInitialized)
	}

	pub async fn request_artifact(
		&self,
		request: ArtifactRequest,
	) -> Result<PathBuf, ThumbnailerError> {
		self.generator()?.request_artifact(request).await
	}

	/// Shuts the generator down if it was ever initialized
	pub async fn shutdown(&self) {
		if let Some(generator) = self.generator.get() {
			generator.shutdown().await;
		}
	}
}
