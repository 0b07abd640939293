use crate::{error::RenderError, request::RenderRequest};

use async_trait::async_trait;
use tokio::task::spawn_blocking;
use tracing::{error, instrument};

use super::{render_catching_panics, Renderer};

/// Renders on Tokio's blocking pool, for decoders that are safe to call concurrently.
#[derive(Debug, Default, Clone, Copy)]
pub struct InProcessRenderer;

#[async_trait]
impl Renderer for InProcessRenderer {
	#[instrument(
		skip_all,
		fields(media_path = %job.media().path.display(), size = job.size())
	)]
	async fn render(&self, job: RenderRequest) -> Result<(), RenderError> {
		spawn_blocking(move || render_catching_panics(&job))
			.await
			.unwrap_or_else(|e| {
				error!(?e, "Blocking render task failed;");
				Err(RenderError::Panicked(e.to_string()))
			})
	}
}
