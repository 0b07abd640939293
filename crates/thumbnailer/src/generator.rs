use crate::{
	coalesce::Coalescer,
	config::{ConfigError, ThumbnailerConfig},
	error::{FileIOError, RenderError, ThumbnailerError},
	renderer::{InProcessRenderer, IsolatedRenderer, RenderExecutor, Renderer},
	request::{ArtifactRequest, MediaReference, RenderRequest, Variant},
	store::ArtifactStore,
};

use std::{
	fmt,
	path::{Path, PathBuf},
	sync::Arc,
};

use pg_task_queue::BoundedTaskQueue;
use tracing::{debug, info, instrument, trace};

/// Entry point for artifact requests: answers from the cache when it can and renders through the
/// bounded queue when it can't.
pub struct ThumbnailGenerator {
	store: ArtifactStore,
	queue: BoundedTaskQueue<RenderExecutor>,
	renderer: Arc<dyn Renderer>,
	thumbnail_sizes: Vec<u32>,
	icon_size: u32,
	quality_priority: bool,
	maximum_source_size: Option<u64>,
	coalescer: Option<Coalescer>,
}

impl fmt::Debug for ThumbnailGenerator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ThumbnailGenerator")
			.field("store", &self.store)
			.field("thumbnail_sizes", &self.thumbnail_sizes)
			.field("icon_size", &self.icon_size)
			.field("quality_priority", &self.quality_priority)
			.field("max_concurrency", &self.queue.max_concurrency())
			.field("coalesce_in_flight", &self.coalescer.is_some())
			.finish_non_exhaustive()
	}
}

impl ThumbnailGenerator {
	/// Builds a generator around a given renderer, mostly useful to plug a custom one.
	pub fn new(config: ThumbnailerConfig, renderer: Arc<dyn Renderer>) -> Result<Self, ConfigError> {
		config.validate().map(|config| Self::build(config, renderer))
	}

	/// Builds a generator with the renderer the configuration asks for.
	pub fn from_config(config: ThumbnailerConfig) -> Result<Self, ThumbnailerError> {
		let config = config.validate()?;

		let renderer: Arc<dyn Renderer> = if config.uses_isolated_workers() {
			Arc::new(
				IsolatedRenderer::spawn(config.concurrency())
					.map_err(ThumbnailerError::WorkerSpawn)?,
			)
		} else {
			Arc::new(InProcessRenderer)
		};

		Ok(Self::build(config, renderer))
	}

	fn build(config: ThumbnailerConfig, renderer: Arc<dyn Renderer>) -> Self {
		let max_concurrency = config.concurrency();

		let ThumbnailerConfig {
			cache_directory,
			thumbnail_sizes,
			icon_size,
			quality_priority,
			coalesce_in_flight,
			maximum_source_size,
			..
		} = config;

		info!(
			cache_directory = %cache_directory.display(),
			?thumbnail_sizes,
			icon_size,
			max_concurrency = max_concurrency.get(),
			"Thumbnail generator ready"
		);

		Self {
			store: ArtifactStore::new(cache_directory),
			queue: BoundedTaskQueue::new(
				max_concurrency,
				RenderExecutor::new(Arc::clone(&renderer)),
			),
			renderer,
			thumbnail_sizes,
			icon_size,
			quality_priority,
			maximum_source_size,
			coalescer: coalesce_in_flight.then(Coalescer::default),
		}
	}

	#[must_use]
	pub const fn store(&self) -> &ArtifactStore {
		&self.store
	}

	/// Configured sizes, ascending
	#[must_use]
	pub fn thumbnail_sizes(&self) -> &[u32] {
		&self.thumbnail_sizes
	}

	#[must_use]
	pub const fn icon_size(&self) -> u32 {
		self.icon_size
	}

	/// Unsupported sizes fall back to the smallest configured one.
	#[must_use]
	pub fn resolve_size(&self, size: u32) -> u32 {
		if self.thumbnail_sizes.contains(&size) {
			size
		} else {
			// Validation guarantees at least one size
			self.thumbnail_sizes.first().copied().unwrap_or(self.icon_size)
		}
	}

	/// Where the artifact for this request lives, after size resolution. It may not exist yet.
	#[must_use]
	pub fn artifact_path(&self, request: &ArtifactRequest) -> PathBuf {
		self.store
			.artifact_path(&request.media_path, self.effective_size(request).0)
	}

	fn effective_size(&self, request: &ArtifactRequest) -> (u32, bool) {
		match request.variant {
			Variant::Icon => (self.icon_size, true),
			Variant::Thumbnail => (self.resolve_size(request.size), request.square_crop),
		}
	}

	/// Returns the path of the requested artifact, rendering it first on a cache miss.
	///
	/// A hit never touches the queue. A failure is reported to this caller only and leaves no file
	/// behind, so a later request for the same artifact retries the render.
	#[instrument(
		skip_all,
		fields(
			media_path = %request.media_path.display(),
			size = request.size,
			variant = ?request.variant,
		),
		err
	)]
	pub async fn request_artifact(
		&self,
		request: ArtifactRequest,
	) -> Result<PathBuf, ThumbnailerError> {
		let (size, square_crop) = self.effective_size(&request);
		let ArtifactRequest {
			media_path,
			source_kind,
			..
		} = request;

		let destination = self.store.artifact_path(&media_path, size);

		if self.store.exists(&destination) {
			trace!("Cache hit");
			return Ok(destination);
		}

		debug!(size, "Cache miss, rendering");

		if let Err(e) = self.store.ensure_container_ready().await {
			return Err(generation_error(&media_path, Arc::new(e.into())));
		}

		let job = RenderRequest::new(
			MediaReference::new(media_path.clone(), source_kind),
			size,
			square_crop,
			self.quality_priority,
			destination.clone(),
		)
		.with_maximum_source_size(self.maximum_source_size);

		let res = if let Some(coalescer) = &self.coalescer {
			let queue = self.queue.clone();
			coalescer
				.run(destination.clone(), move || async move {
					queue.submit(job).await.map_err(RenderError::from)
				})
				.await
		} else {
			self.queue
				.submit(job)
				.await
				.map_err(|e| Arc::new(RenderError::from(e)))
		};

		res.map(|()| {
			trace!("Rendered");
			destination
		})
		.map_err(|source| generation_error(&media_path, source))
	}

	/// Deletes every artifact derived from `media_path`, all thumbnail sizes and the icon.
	///
	/// Returns how many files were removed, artifacts that were never rendered are skipped.
	#[instrument(skip_all, fields(media_path = %media_path.as_ref().display()))]
	pub async fn invalidate(
		&self,
		media_path: impl AsRef<Path> + Send,
	) -> Result<usize, FileIOError> {
		let media_path = media_path.as_ref();

		let mut sizes = self.thumbnail_sizes.clone();
		if !sizes.contains(&self.icon_size) {
			sizes.push(self.icon_size);
		}

		let mut removed = 0;
		for size in sizes {
			if self
				.store
				.remove(self.store.artifact_path(media_path, size))
				.await?
			{
				removed += 1;
			}
		}

		debug!(removed, "Invalidated artifacts");

		Ok(removed)
	}

	/// Rejects every job still waiting for a slot, waits for running renders and stops the
	/// renderer's workers.
	pub async fn shutdown(&self) {
		self.queue.shutdown().await;
		self.renderer.shutdown().await;
		info!("Thumbnail generator shut down");
	}
}

fn generation_error(media_path: &Path, source: Arc<RenderError>) -> ThumbnailerError {
	ThumbnailerError::Generation {
		media_path: media_path.into(),
		source,
	}
}
