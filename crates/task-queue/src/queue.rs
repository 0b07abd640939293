use std::{
	any::Any,
	collections::VecDeque,
	future::Future,
	num::NonZeroUsize,
	panic::AssertUnwindSafe,
	pin::Pin,
	sync::{Arc, Mutex, MutexGuard, PoisonError},
	task::{Context, Poll},
};

use futures::FutureExt;
use tokio::{
	spawn,
	sync::{oneshot, watch},
};
use tracing::{info, instrument, trace, warn};

use super::{error::QueueError, executor::Executor};

pub type JobId = u64;

type JobResult<E> = Result<<E as Executor>::Output, QueueError<<E as Executor>::Error>>;

/// Runs jobs through an [`Executor`] with at most `max_concurrency` of them executing at once.
///
/// Cloning is cheap and every clone feeds the same backlog and slots.
pub struct BoundedTaskQueue<E: Executor> {
	inner: Arc<Inner<E>>,
}

impl<E: Executor> Clone for BoundedTaskQueue<E> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

struct Inner<E: Executor> {
	executor: E,
	max_concurrency: NonZeroUsize,
	state: Mutex<State<E>>,
	// Mirrors `State::active`, only used to wait for in-flight jobs on shutdown
	active_tx: watch::Sender<usize>,
}

struct State<E: Executor> {
	backlog: VecDeque<PendingJob<E>>,
	active: usize,
	accepting: bool,
	next_job_id: JobId,
}

struct PendingJob<E: Executor> {
	id: JobId,
	job: E::Job,
	done_tx: oneshot::Sender<JobResult<E>>,
}

impl<E: Executor> BoundedTaskQueue<E> {
	/// Creates the queue, jobs are spawned on the Tokio runtime current at [`Self::submit`] time.
	pub fn new(max_concurrency: NonZeroUsize, executor: E) -> Self {
		let (active_tx, _active_rx) = watch::channel(0);

		Self {
			inner: Arc::new(Inner {
				executor,
				max_concurrency,
				state: Mutex::new(State {
					backlog: VecDeque::with_capacity(max_concurrency.get() * 4),
					active: 0,
					accepting: true,
					next_job_id: 0,
				}),
				active_tx,
			}),
		}
	}

	#[must_use]
	pub fn max_concurrency(&self) -> usize {
		self.inner.max_concurrency.get()
	}

	/// Number of jobs executing right now
	#[must_use]
	pub fn active_count(&self) -> usize {
		self.inner.lock_state().active
	}

	/// Number of jobs waiting for a free slot
	#[must_use]
	pub fn backlog_len(&self) -> usize {
		self.inner.lock_state().backlog.len()
	}

	#[must_use]
	pub fn is_accepting(&self) -> bool {
		self.inner.lock_state().accepting
	}

	/// Enqueues `job` without waiting for it, the returned handle resolves with its outcome.
	///
	/// Jobs submitted after [`Self::shutdown`] resolve to [`QueueError::Shutdown`].
	#[instrument(skip_all, fields(job_id))]
	pub fn submit(&self, job: E::Job) -> JobHandle<E::Output, E::Error> {
		let (done_tx, done_rx) = oneshot::channel();

		let mut state = self.inner.lock_state();

		let id = state.next_job_id;
		state.next_job_id += 1;
		tracing::Span::current().record("job_id", id);

		let pending = PendingJob { id, job, done_tx };

		if !state.accepting {
			drop(state);
			warn!("Rejecting job submitted after shutdown");
			// We still hold the receiver, so this can't fail
			let _ = pending.done_tx.send(Err(QueueError::Shutdown(id)));
		} else if state.active < self.inner.max_concurrency.get() {
			state.active += 1;
			self.inner.active_tx.send_replace(state.active);
			drop(state);

			trace!("Free slot available, dispatching job");
			spawn(Arc::clone(&self.inner).drive(pending));
		} else {
			state.backlog.push_back(pending);
			trace!(
				backlog_len = state.backlog.len(),
				"All slots busy, job waiting on backlog"
			);
		}

		JobHandle { id, done_rx }
	}

	/// Stops accepting jobs, rejects everything still on the backlog and waits for in-flight jobs.
	#[instrument(skip(self))]
	pub async fn shutdown(&self) {
		let rejected = {
			let mut state = self.inner.lock_state();
			state.accepting = false;
			state.backlog.drain(..).collect::<Vec<_>>()
		};

		if !rejected.is_empty() {
			warn!(
				rejected_count = rejected.len(),
				"Rejecting backlog jobs due to shutdown"
			);
		}

		for PendingJob { id, done_tx, .. } in rejected {
			// Handling error on receiver side
			let _ = done_tx.send(Err(QueueError::Shutdown(id)));
		}

		let mut active_rx = self.inner.active_tx.subscribe();
		// The sender lives as long as `self.inner`, so this never errors
		let _ = active_rx.wait_for(|active| *active == 0).await;

		info!("Task queue shut down");
	}
}

impl<E: Executor> Inner<E> {
	fn lock_state(&self) -> MutexGuard<'_, State<E>> {
		self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// Owns one execution slot, running jobs back to back until the backlog is empty.
	async fn drive(self: Arc<Self>, mut pending: PendingJob<E>) {
		loop {
			let PendingJob { id, job, done_tx } = pending;

			trace!(job_id = id, "Executing job");

			let res = AssertUnwindSafe(self.executor.execute(job))
				.catch_unwind()
				.await
				.map_err(|panic| QueueError::Panicked(id, panic_message(&*panic)))
				.and_then(|res| res.map_err(|source| QueueError::Execution { id, source }));

			if let Err(QueueError::Panicked(_, msg)) = &res {
				warn!(job_id = id, %msg, "Job panicked");
			}

			if done_tx.send(res).is_err() {
				trace!(job_id = id, "Job submitter is gone, dropping its result");
			}

			let next = {
				let mut state = self.lock_state();
				let next = state.backlog.pop_front();
				if next.is_none() {
					state.active -= 1;
					self.active_tx.send_replace(state.active);
				}
				next
			};

			match next {
				Some(next) => {
					trace!(job_id = next.id, "Dispatching job from backlog");
					pending = next;
				}
				None => break,
			}
		}
	}
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
	panic
		.downcast_ref::<&str>()
		.map(|msg| (*msg).to_string())
		.or_else(|| panic.downcast_ref::<String>().cloned())
		.unwrap_or_else(|| "unknown panic payload".to_string())
}

/// Resolves with the outcome of a submitted job.
///
/// Dropping it doesn't cancel the job, only its outcome is discarded.
#[must_use = "the job runs anyway, but its outcome is lost"]
pub struct JobHandle<O, E: std::error::Error + 'static> {
	id: JobId,
	done_rx: oneshot::Receiver<Result<O, QueueError<E>>>,
}

impl<O, E: std::error::Error + 'static> JobHandle<O, E> {
	#[must_use]
	pub const fn id(&self) -> JobId {
		self.id
	}
}

impl<O, E: std::error::Error + 'static> Future for JobHandle<O, E> {
	type Output = Result<O, QueueError<E>>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		let id = self.id;
		Pin::new(&mut self.done_rx)
			.poll(cx)
			.map(|res| res.unwrap_or_else(|_| Err(QueueError::Lost(id))))
	}
}
