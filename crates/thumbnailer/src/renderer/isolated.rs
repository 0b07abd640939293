use crate::{
	error::{FileIOError, RenderError},
	request::RenderRequest,
};

use std::{
	borrow::Cow,
	io,
	num::NonZeroUsize,
	path::PathBuf,
	sync::{Mutex, PoisonError},
	thread::{self, JoinHandle},
};

use async_channel as chan;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::{sync::oneshot, task::spawn_blocking};
use tracing::{debug, error, info, instrument, trace};

use super::{render_catching_panics, Renderer};

/// Job and reply only cross the worker boundary as MessagePack bytes, so the worker shares no
/// memory with the caller beyond the channel itself.
struct WorkerMessage {
	payload: Vec<u8>,
	reply_tx: oneshot::Sender<Vec<u8>>,
}

#[derive(Debug, Serialize, Deserialize)]
enum WorkerReply {
	Rendered,
	Failed(WorkerFailure),
}

/// A [`RenderError`] on its way back from a worker, rebuilt into the same variant on arrival.
#[derive(Debug, Serialize, Deserialize)]
enum WorkerFailure {
	Unsupported(PathBuf),
	Decode(String),
	Resize(String),
	Encode(String),
	FileIO {
		path: PathBuf,
		raw_os_error: Option<i32>,
		message: String,
		context: Option<String>,
	},
	Panicked(String),
	Other(String),
}

impl From<RenderError> for WorkerFailure {
	fn from(e: RenderError) -> Self {
		match e {
			RenderError::Unsupported(path) => Self::Unsupported(path.into()),
			RenderError::Decode(msg) => Self::Decode(msg),
			RenderError::Resize(msg) => Self::Resize(msg),
			RenderError::Encode(msg) => Self::Encode(msg),
			RenderError::FileIO(FileIOError {
				path,
				source,
				maybe_context,
			}) => Self::FileIO {
				path: path.into(),
				raw_os_error: source.raw_os_error(),
				message: source.to_string(),
				context: maybe_context.map(Cow::into_owned),
			},
			RenderError::Panicked(msg) => Self::Panicked(msg),
			e => Self::Other(e.to_string()),
		}
	}
}

impl From<WorkerFailure> for RenderError {
	fn from(failure: WorkerFailure) -> Self {
		match failure {
			WorkerFailure::Unsupported(path) => Self::Unsupported(path.into_boxed_path()),
			WorkerFailure::Decode(msg) => Self::Decode(msg),
			WorkerFailure::Resize(msg) => Self::Resize(msg),
			WorkerFailure::Encode(msg) => Self::Encode(msg),
			WorkerFailure::FileIO {
				path,
				raw_os_error,
				message,
				context,
			} => Self::FileIO(FileIOError {
				path: path.into_boxed_path(),
				// OS errors come back whole, anything else keeps only its message
				source: raw_os_error
					.map_or_else(|| io::Error::other(message), io::Error::from_raw_os_error),
				maybe_context: context.map(Cow::Owned),
			}),
			WorkerFailure::Panicked(msg) => Self::Panicked(msg),
			WorkerFailure::Other(msg) => Self::Isolated(msg),
		}
	}
}

/// Renders on dedicated OS threads, for decoders that must not run concurrently with the caller.
pub struct IsolatedRenderer {
	jobs_tx: chan::Sender<WorkerMessage>,
	workers: Mutex<Vec<JoinHandle<()>>>,
}

impl IsolatedRenderer {
	pub fn spawn(workers_count: NonZeroUsize) -> io::Result<Self> {
		let (jobs_tx, jobs_rx) = chan::bounded(workers_count.get());

		let workers = (0..workers_count.get())
			.map(|worker_id| {
				let jobs_rx = jobs_rx.clone();
				thread::Builder::new()
					.name(format!("thumbnail-worker-{worker_id}"))
					.spawn(move || run_worker(worker_id, &jobs_rx))
			})
			.collect::<io::Result<Vec<_>>>()?;

		info!(
			workers_count = workers.len(),
			"Spawned isolated thumbnail workers"
		);

		Ok(Self {
			jobs_tx,
			workers: Mutex::new(workers),
		})
	}
}

#[async_trait]
impl Renderer for IsolatedRenderer {
	#[instrument(
		skip_all,
		fields(media_path = %job.media().path.display(), size = job.size())
	)]
	async fn render(&self, job: RenderRequest) -> Result<(), RenderError> {
		let payload = rmp_serde::to_vec_named(&job)?;
		let (reply_tx, reply_rx) = oneshot::channel();

		self.jobs_tx
			.send(WorkerMessage { payload, reply_tx })
			.await
			.map_err(|_| RenderError::WorkersUnavailable)?;

		let reply = reply_rx.await.map_err(|_| RenderError::WorkersUnavailable)?;

		match rmp_serde::from_slice(&reply)? {
			WorkerReply::Rendered => Ok(()),
			WorkerReply::Failed(failure) => Err(failure.into()),
		}
	}

	async fn shutdown(&self) {
		self.jobs_tx.close();

		let workers = std::mem::take(
			&mut *self
				.workers
				.lock()
				.unwrap_or_else(PoisonError::into_inner),
		);

		if workers.is_empty() {
			return;
		}

		let joined = spawn_blocking(move || {
			for worker in workers {
				if worker.join().is_err() {
					error!("Isolated thumbnail worker panicked");
				}
			}
		})
		.await;

		if let Err(e) = joined {
			error!(?e, "Failed to join isolated thumbnail workers;");
		}

		debug!("Isolated thumbnail workers stopped");
	}
}

impl Drop for IsolatedRenderer {
	fn drop(&mut self) {
		// Workers exit on their own once the channel is closed
		self.jobs_tx.close();
	}
}

fn run_worker(worker_id: usize, jobs_rx: &chan::Receiver<WorkerMessage>) {
	debug!(worker_id, "Isolated thumbnail worker started");

	while let Ok(WorkerMessage { payload, reply_tx }) = jobs_rx.recv_blocking() {
		let reply = match rmp_serde::from_slice::<RenderRequest>(&payload) {
			Ok(job) => {
				trace!(worker_id, media_path = %job.media().path.display(), "Rendering");
				match render_catching_panics(&job) {
					Ok(()) => WorkerReply::Rendered,
					Err(e) => WorkerReply::Failed(e.into()),
				}
			}
			Err(e) => WorkerReply::Failed(WorkerFailure::Other(format!(
				"failed to decode render job: {e}"
			))),
		};

		match rmp_serde::to_vec_named(&reply) {
			Ok(bytes) => {
				// Handling error on receiver side
				let _ = reply_tx.send(bytes);
			}
			Err(e) => error!(worker_id, ?e, "Failed to encode worker reply;"),
		}
	}

	debug!(worker_id, "Isolated thumbnail worker exiting");
}
