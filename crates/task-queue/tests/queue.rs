use pg_task_queue::{from_fn, BoundedTaskQueue, Executor, QueueError};

use std::{
	num::NonZeroUsize,
	sync::{
		atomic::{AtomicUsize, Ordering},
		Arc, Mutex,
	},
	time::Duration,
};

use async_trait::async_trait;
use futures_concurrency::future::Join;
use thiserror::Error;
use tokio::{
	sync::oneshot,
	time::{sleep, timeout, Instant},
};
use tracing_test::traced_test;

#[derive(Debug, Error)]
pub enum SampleError {
	#[error("sample failure")]
	Failed,
}

#[derive(Default)]
struct Counters {
	running: AtomicUsize,
	peak: AtomicUsize,
	started: Mutex<Vec<usize>>,
}

/// Blocks every job until the test fires its gate.
struct GatedExecutor {
	counters: Arc<Counters>,
}

#[async_trait]
impl Executor for GatedExecutor {
	type Job = (usize, oneshot::Receiver<()>);
	type Output = usize;
	type Error = SampleError;

	async fn execute(&self, (index, gate): Self::Job) -> Result<usize, SampleError> {
		let running = self.counters.running.fetch_add(1, Ordering::SeqCst) + 1;
		self.counters.peak.fetch_max(running, Ordering::SeqCst);
		self.counters.started.lock().unwrap().push(index);

		let _ = gate.await;

		self.counters.running.fetch_sub(1, Ordering::SeqCst);
		Ok(index)
	}
}

fn gated_queue(max_concurrency: usize) -> (BoundedTaskQueue<GatedExecutor>, Arc<Counters>) {
	let counters = Arc::new(Counters::default());
	let queue = BoundedTaskQueue::new(
		NonZeroUsize::new(max_concurrency).unwrap(),
		GatedExecutor {
			counters: Arc::clone(&counters),
		},
	);
	(queue, counters)
}

async fn wait_until(cond: impl Fn() -> bool) {
	timeout(Duration::from_secs(5), async {
		while !cond() {
			sleep(Duration::from_millis(1)).await;
		}
	})
	.await
	.expect("condition never became true");
}

#[tokio::test]
#[traced_test]
async fn never_exceeds_max_concurrency_and_keeps_fifo_order() {
	let (queue, counters) = gated_queue(2);

	let (gates, handles) = (0..6)
		.map(|index| {
			let (tx, rx) = oneshot::channel();
			(tx, queue.submit((index, rx)))
		})
		.unzip::<_, _, Vec<_>, Vec<_>>();

	wait_until(|| counters.started.lock().unwrap().len() == 2).await;
	assert_eq!(queue.active_count(), 2);
	assert_eq!(queue.backlog_len(), 4);

	for (index, (gate, handle)) in gates.into_iter().zip(handles).enumerate() {
		gate.send(()).unwrap();
		assert_eq!(handle.await.unwrap(), index);

		let expected_started = usize::min(index + 3, 6);
		wait_until(|| counters.started.lock().unwrap().len() == expected_started).await;
		assert!(counters.running.load(Ordering::SeqCst) <= 2);
	}

	assert_eq!(counters.peak.load(Ordering::SeqCst), 2);

	let started = counters.started.lock().unwrap().clone();
	let mut first_two = started[..2].to_vec();
	first_two.sort_unstable();
	assert_eq!(first_two, vec![0, 1]);
	assert_eq!(started[2..], [2, 3, 4, 5]);

	assert_eq!(queue.active_count(), 0);
	queue.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn wall_time_follows_the_concurrency_width() {
	let queue = BoundedTaskQueue::new(
		NonZeroUsize::new(2).unwrap(),
		from_fn(|()| async {
			sleep(Duration::from_millis(50)).await;
			Ok::<_, SampleError>(())
		}),
	);

	let start = Instant::now();

	let results = (0..5)
		.map(|_| queue.submit(()))
		.collect::<Vec<_>>()
		.join()
		.await;

	let elapsed = start.elapsed();

	assert!(results.iter().all(Result::is_ok));
	assert!(elapsed >= Duration::from_millis(150), "took {elapsed:?}");
	assert!(elapsed < Duration::from_millis(200), "took {elapsed:?}");
}

#[tokio::test]
#[traced_test]
async fn failure_only_rejects_its_own_job() {
	let queue = BoundedTaskQueue::new(
		NonZeroUsize::new(2).unwrap(),
		from_fn(|fail: bool| async move {
			sleep(Duration::from_millis(10)).await;
			if fail {
				Err(SampleError::Failed)
			} else {
				Ok(())
			}
		}),
	);

	let failing = queue.submit(true);
	let sibling = queue.submit(false);
	let failing_id = failing.id();

	let (failing, sibling) = (failing, sibling).join().await;

	let failure = failing.unwrap_err();
	assert_eq!(failure.job_id(), failing_id);
	assert!(matches!(
		failure,
		QueueError::Execution {
			source: SampleError::Failed,
			..
		}
	));
	assert!(sibling.is_ok());

	// The failed job gave its slot back
	assert!(queue.submit(false).await.is_ok());
}

#[tokio::test]
#[traced_test]
async fn panicking_job_frees_its_slot() {
	let queue = BoundedTaskQueue::new(
		NonZeroUsize::MIN,
		from_fn(|explode: bool| async move {
			assert!(!explode, "renderer exploded");
			Ok::<_, SampleError>(())
		}),
	);

	let exploding = queue.submit(true);
	let next = queue.submit(false);

	match exploding.await {
		Err(QueueError::Panicked(_, msg)) => assert!(msg.contains("renderer exploded")),
		other => panic!("expected a panic report, got {other:?}"),
	}
	assert!(next.await.is_ok());
	assert_eq!(queue.active_count(), 0);
}

#[tokio::test]
#[traced_test]
async fn identical_jobs_are_not_merged() {
	let calls = Arc::new(AtomicUsize::new(0));

	let queue = BoundedTaskQueue::new(
		NonZeroUsize::new(4).unwrap(),
		from_fn({
			let calls = Arc::clone(&calls);
			move |_key: &'static str| {
				let calls = Arc::clone(&calls);
				async move {
					calls.fetch_add(1, Ordering::SeqCst);
					Ok::<_, SampleError>(())
				}
			}
		}),
	);

	let (first, second) = (queue.submit("same-key"), queue.submit("same-key"))
		.join()
		.await;

	assert!(first.is_ok() && second.is_ok());
	assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
#[traced_test]
async fn shutdown_rejects_backlog_and_waits_for_in_flight() {
	let (queue, counters) = gated_queue(1);

	let (gate0, rx0) = oneshot::channel();
	let (_gate1, rx1) = oneshot::channel();

	let in_flight = queue.submit((0, rx0));
	let queued = queue.submit((1, rx1));
	assert_eq!(queue.max_concurrency(), 1);
	assert!(queued.id() > in_flight.id());
	let queued_id = queued.id();

	wait_until(|| counters.started.lock().unwrap().len() == 1).await;

	let shutdown = tokio::spawn({
		let queue = queue.clone();
		async move { queue.shutdown().await }
	});

	let rejected = queued.await.unwrap_err();
	assert!(matches!(rejected, QueueError::Shutdown(_)));
	assert_eq!(rejected.job_id(), queued_id);
	assert!(!queue.is_accepting());
	assert!(!shutdown.is_finished());

	let (_late_gate, late_rx) = oneshot::channel();
	assert!(matches!(
		queue.submit((2, late_rx)).await,
		Err(QueueError::Shutdown(_))
	));

	gate0.send(()).unwrap();
	assert_eq!(in_flight.await.unwrap(), 0);

	shutdown.await.unwrap();
	assert_eq!(queue.active_count(), 0);
	assert_eq!(*counters.started.lock().unwrap(), vec![0]);
}
