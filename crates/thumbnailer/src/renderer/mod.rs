use crate::{
	error::RenderError,
	request::{RenderRequest, SourceKind},
	store::write_atomic,
};

use std::{
	any::Any,
	panic::{self, AssertUnwindSafe},
	path::Path,
	sync::Arc,
};

use async_trait::async_trait;
use pg_images::{encode_jpeg, extract_video_frame, format_image, thumbnail_image, Fit};
use pg_task_queue::Executor;
use tracing::trace;

mod in_process;
mod isolated;

pub use in_process::InProcessRenderer;
pub use isolated::IsolatedRenderer;

/// Produces the artifact described by a [`RenderRequest`] at its destination path.
///
/// Implementations must report failures instead of panicking at the caller, and must never leave a
/// partially written file at the destination.
#[async_trait]
pub trait Renderer: Send + Sync + 'static {
	async fn render(&self, job: RenderRequest) -> Result<(), RenderError>;

	/// Releases any worker resources, called once on thumbnailer shutdown
	async fn shutdown(&self) {}
}

/// Decodes, resizes, encodes and atomically writes one artifact.
///
/// Every [`Renderer`] we ship funnels into this function, so their outputs are byte for byte equal.
pub fn render_artifact(job: &RenderRequest) -> Result<(), RenderError> {
	let path = job.media().path.as_path();

	let source = match job.media().kind {
		SourceKind::Photo => format_image(path, job.maximum_source_size()),
		SourceKind::Video => extract_video_frame(path),
	}
	.map_err(|e| decode_error(path, e))?;

	trace!("Decoded source media");

	let fit = if job.square_crop() {
		Fit::Square
	} else {
		Fit::ShorterSide
	};

	let thumbnail = thumbnail_image(&source, job.size(), fit, job.quality_priority())
		.map_err(|e| RenderError::Resize(e.to_string()))?;

	let bytes = encode_jpeg(&thumbnail, job.quality_priority())
		.map_err(|e| RenderError::Encode(e.to_string()))?;

	trace!(bytes = bytes.len(), "Encoded thumbnail, writing it to disk");

	write_atomic(job.destination(), &bytes)?;

	Ok(())
}

fn decode_error(path: &Path, e: pg_images::Error) -> RenderError {
	match e {
		pg_images::Error::Unsupported | pg_images::Error::NoExtension => {
			RenderError::Unsupported(path.into())
		}
		e => RenderError::Decode(e.to_string()),
	}
}

/// Third party decoders do panic on some broken files, we turn that into a regular failure
pub(crate) fn render_catching_panics(job: &RenderRequest) -> Result<(), RenderError> {
	panic::catch_unwind(AssertUnwindSafe(|| render_artifact(job)))
		.unwrap_or_else(|panic| Err(RenderError::Panicked(panic_message(&*panic))))
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
	panic
		.downcast_ref::<&str>()
		.map(|msg| (*msg).to_string())
		.or_else(|| panic.downcast_ref::<String>().cloned())
		.unwrap_or_else(|| "internal panic on third party crate".to_string())
}

/// Plugs a [`Renderer`] into the bounded task queue.
pub(crate) struct RenderExecutor {
	renderer: Arc<dyn Renderer>,
}

impl RenderExecutor {
	pub(crate) fn new(renderer: Arc<dyn Renderer>) -> Self {
		Self { renderer }
	}
}

#[async_trait]
impl Executor for RenderExecutor {
	type Job = RenderRequest;
	type Output = ();
	type Error = RenderError;

	async fn execute(&self, job: RenderRequest) -> Result<(), RenderError> {
		self.renderer.render(job).await
	}
}
