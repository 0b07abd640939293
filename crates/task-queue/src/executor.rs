use std::{future::Future, marker::PhantomData};

use async_trait::async_trait;

/// The unit of work a [`BoundedTaskQueue`](crate::BoundedTaskQueue) runs for every job.
#[async_trait]
pub trait Executor: Send + Sync + 'static {
	type Job: Send + 'static;
	type Output: Send + 'static;
	type Error: std::error::Error + Send + 'static;

	async fn execute(&self, job: Self::Job) -> Result<Self::Output, Self::Error>;
}

/// Adapter returned by [`from_fn`].
pub struct FnExecutor<F, J> {
	f: F,
	_job: PhantomData<fn(J)>,
}

/// Builds an [`Executor`] out of an async closure.
pub fn from_fn<F, Fut, J, O, E>(f: F) -> FnExecutor<F, J>
where
	F: Fn(J) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = Result<O, E>> + Send + 'static,
	J: Send + 'static,
	O: Send + 'static,
	E: std::error::Error + Send + 'static,
{
	FnExecutor {
		f,
		_job: PhantomData,
	}
}

#[async_trait]
impl<F, Fut, J, O, E> Executor for FnExecutor<F, J>
where
	F: Fn(J) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = Result<O, E>> + Send + 'static,
	J: Send + 'static,
	O: Send + 'static,
	E: std::error::Error + Send + 'static,
{
	type Job = J;
	type Output = O;
	type Error = E;

	async fn execute(&self, job: J) -> Result<O, E> {
		(self.f)(job).await
	}
}
