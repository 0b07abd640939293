use thiserror::Error;

use super::queue::JobId;

#[derive(Debug, Error)]
pub enum QueueError<E: std::error::Error + 'static> {
	#[error("job <id='{id}'> failed: {source}")]
	Execution {
		id: JobId,
		#[source]
		source: E,
	},
	#[error("job <id='{0}'> panicked: {1}")]
	Panicked(JobId, String),
	#[error("task queue is shut down, job <id='{0}'> was not executed")]
	Shutdown(JobId),
	#[error("job <id='{0}'> was dropped before reporting a result")]
	Lost(JobId),
}

impl<E: std::error::Error + 'static> QueueError<E> {
	#[must_use]
	pub const fn job_id(&self) -> JobId {
		match self {
			Self::Execution { id, .. } | Self::Panicked(id, _) | Self::Shutdown(id) | Self::Lost(id) => {
				*id
			}
		}
	}
}
