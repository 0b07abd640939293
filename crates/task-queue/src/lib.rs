//!
//! # Bounded Task Queue
//!
//! A dispatcher that runs jobs through a single [`Executor`] while never having more than a fixed
//! number of them executing at once.
//!
//! - Jobs over the limit wait in a FIFO backlog and are dispatched in submission order as soon as a
//!   slot frees up, without any polling delay;
//! - Every submission gets its own [`JobHandle`], so a failing or panicking job only affects its
//!   own submitter;
//! - Identical jobs are never merged, each submission runs;
//! - [`BoundedTaskQueue::shutdown`] rejects the backlog with [`QueueError::Shutdown`] and waits for
//!   in-flight jobs to finish.
//!
//! ## Basic example
//!
//! ```
//! use std::{convert::Infallible, num::NonZeroUsize};
//!
//! use pg_task_queue::{from_fn, BoundedTaskQueue};
//!
//! #[tokio::main]
//! async fn main() {
//!     let queue = BoundedTaskQueue::new(
//!         NonZeroUsize::MIN,
//!         from_fn(|n: u32| async move { Ok::<_, Infallible>(n * 2) }),
//!     );
//!
//!     assert_eq!(queue.submit(21).await.unwrap(), 42);
//!
//!     queue.shutdown().await;
//! }
//! ```

#![warn(
	clippy::all,
	clippy::pedantic,
	clippy::correctness,
	clippy::perf,
	clippy::style,
	clippy::suspicious,
	clippy::complexity,
	clippy::nursery,
	clippy::unwrap_used,
	unused_qualifications,
	rust_2018_idioms,
	trivial_casts,
	trivial_numeric_casts,
	unused_allocation,
	clippy::unnecessary_cast,
	clippy::cast_lossless,
	clippy::cast_possible_truncation,
	clippy::cast_possible_wrap,
	clippy::cast_precision_loss,
	clippy::cast_sign_loss,
	clippy::dbg_macro,
	deprecated
)]
#![forbid(deprecated_in_future)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

mod error;
mod executor;
mod queue;

pub use error::QueueError;
pub use executor::{from_fn, Executor, FnExecutor};
pub use queue::{BoundedTaskQueue, JobHandle, JobId};
