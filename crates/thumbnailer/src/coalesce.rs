use crate::error::RenderError;

use std::{
	collections::HashMap,
	future::Future,
	path::PathBuf,
	sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use futures::{
	future::{BoxFuture, Shared},
	FutureExt,
};
use tracing::{debug, error};

type SharedRender = Shared<BoxFuture<'static, Result<(), Arc<RenderError>>>>;

/// Lets concurrent misses for the same artifact share a single render.
///
/// The entry for a destination lives exactly as long as its render, the first caller starts it and
/// later ones only await its outcome.
#[derive(Clone, Default)]
pub(crate) struct Coalescer {
	in_flight: Arc<Mutex<HashMap<PathBuf, SharedRender>>>,
}

impl Coalescer {
	pub(crate) async fn run<F, Fut>(
		&self,
		destination: PathBuf,
		start: F,
	) -> Result<(), Arc<RenderError>>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<(), RenderError>> + Send + 'static,
	{
		let shared = {
			let mut in_flight = lock(&self.in_flight);

			if let Some(existing) = in_flight.get(&destination) {
				debug!(destination = %destination.display(), "Joining in flight render");
				existing.clone()
			} else {
				let render = start();
				let entries = Arc::clone(&self.in_flight);
				let key = destination.clone();

				// Spawned so the entry is removed even if every waiter goes away
				let task = tokio::spawn(async move {
					let res = render.await.map_err(Arc::new);
					lock(&entries).remove(&key);
					res
				});

				let shared = task
					.map(|joined| {
						joined.unwrap_or_else(|e| {
							error!(?e, "Coalesced render task failed;");
							Err(Arc::new(RenderError::Panicked(e.to_string())))
						})
					})
					.boxed()
					.shared();

				in_flight.insert(destination, shared.clone());
				shared
			}
		};

		shared.await
	}

	#[cfg(test)]
	pub(crate) fn in_flight_count(&self) -> usize {
		lock(&self.in_flight).len()
	}
}

fn lock(
	in_flight: &Mutex<HashMap<PathBuf, SharedRender>>,
) -> MutexGuard<'_, HashMap<PathBuf, SharedRender>> {
	in_flight.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
	use super::*;

	use std::{
		sync::atomic::{AtomicUsize, Ordering},
		time::Duration,
	};

	use futures_concurrency::future::Join;
	use tokio::time::sleep;

	#[tokio::test(start_paused = true)]
	async fn concurrent_callers_share_one_render() {
		let coalescer = Coalescer::default();
		let started = Arc::new(AtomicUsize::new(0));

		let call = || {
			let started = Arc::clone(&started);
			coalescer.run(PathBuf::from("/cache/a_240.jpg"), move || {
				started.fetch_add(1, Ordering::SeqCst);
				async {
					sleep(Duration::from_millis(50)).await;
					Ok(())
				}
			})
		};

		let (first, second, third) = (call(), call(), call()).join().await;

		assert!(first.is_ok() && second.is_ok() && third.is_ok());
		assert_eq!(started.load(Ordering::SeqCst), 1);
		assert_eq!(coalescer.in_flight_count(), 0);
	}

	#[tokio::test(start_paused = true)]
	async fn failures_reach_every_waiter_and_clear_the_entry() {
		let coalescer = Coalescer::default();

		let call = || {
			coalescer.run(PathBuf::from("/cache/a_240.jpg"), || async {
				sleep(Duration::from_millis(10)).await;
				Err(RenderError::Isolated("broken file".to_string()))
			})
		};

		let (first, second) = (call(), call()).join().await;

		assert!(Arc::ptr_eq(&first.unwrap_err(), &second.unwrap_err()));
		assert_eq!(coalescer.in_flight_count(), 0);

		// A later miss starts a fresh render
		coalescer
			.run(PathBuf::from("/cache/a_240.jpg"), || async { Ok(()) })
			.await
			.unwrap();
	}

	#[tokio::test]
	async fn different_destinations_are_independent() {
		let coalescer = Coalescer::default();
		let started = Arc::new(AtomicUsize::new(0));

		let call = |name: &str| {
			let started = Arc::clone(&started);
			coalescer.run(PathBuf::from(name), move || {
				started.fetch_add(1, Ordering::SeqCst);
				async { Ok(()) }
			})
		};

		let (first, second) = (call("/cache/a_240.jpg"), call("/cache/a_480.jpg"))
			.join()
			.await;

		assert!(first.is_ok() && second.is_ok());
		assert_eq!(started.load(Ordering::SeqCst), 2);
	}
}
