use crate::config::ConfigError;

use std::{
	borrow::Cow,
	fmt::{self, Display},
	io,
	path::Path,
	sync::Arc,
};

use pg_task_queue::QueueError;
use thiserror::Error;

/// File I/O error that includes the path that caused the error
#[derive(Error, Debug)]
pub struct FileIOError {
	pub path: Box<Path>,
	#[source]
	pub source: io::Error,
	pub maybe_context: Option<Cow<'static, str>>,
}

impl Display for FileIOError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "file I/O error")?;
		if let Some(context) = &self.maybe_context {
			write!(f, " ({context})")?;
		}
		write!(f, ": {}; path: '{}'", self.source, self.path.display())
	}
}

impl<P: AsRef<Path>> From<(P, io::Error)> for FileIOError {
	fn from((path, source): (P, io::Error)) -> Self {
		Self {
			path: path.as_ref().into(),
			source,
			maybe_context: None,
		}
	}
}

impl<P: AsRef<Path>> From<(P, io::Error, &'static str)> for FileIOError {
	fn from((path, source, context): (P, io::Error, &'static str)) -> Self {
		Self {
			path: path.as_ref().into(),
			source,
			maybe_context: Some(Cow::Borrowed(context)),
		}
	}
}

/// Why a single render job failed.
#[derive(Error, Debug)]
pub enum RenderError {
	#[error("unsupported source media: '{}'", .0.display())]
	Unsupported(Box<Path>),
	#[error("failed to decode source media: {0}")]
	Decode(String),
	#[error("failed to resize source media: {0}")]
	Resize(String),
	#[error("failed to encode thumbnail: {0}")]
	Encode(String),
	#[error(transparent)]
	FileIO(#[from] FileIOError),
	#[error("renderer panicked: {0}")]
	Panicked(String),

	// Isolated workers
	#[error("failed to serialize render job: {0}")]
	Serialize(#[from] rmp_serde::encode::Error),
	#[error("failed to deserialize render message: {0}")]
	Deserialize(#[from] rmp_serde::decode::Error),
	#[error("isolated worker failed to render: {0}")]
	Isolated(String),
	#[error("isolated thumbnail workers are not running")]
	WorkersUnavailable,

	#[error("thumbnail queue is shut down")]
	Shutdown,
}

impl From<QueueError<Self>> for RenderError {
	fn from(e: QueueError<Self>) -> Self {
		match e {
			QueueError::Execution { source, .. } => source,
			QueueError::Panicked(_, msg) => Self::Panicked(msg),
			QueueError::Shutdown(_) | QueueError::Lost(_) => Self::Shutdown,
		}
	}
}

/// Broad category of a [`ThumbnailerError`], for callers mapping it to an external response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
	ThumbnailGeneration,
	NotInitialized,
	Initialization,
}

#[derive(Error, Debug)]
pub enum ThumbnailerError {
	#[error("error during generating thumbnail: '{}'", .media_path.display())]
	Generation {
		media_path: Box<Path>,
		#[source]
		source: Arc<RenderError>,
	},
	#[error("thumbnailer was used before being initialized")]
	NotInitialized,
	#[error(transparent)]
	Config(#[from] ConfigError),
	#[error("failed to spawn isolated thumbnail workers: {0}")]
	WorkerSpawn(#[source] io::Error),
}

impl ThumbnailerError {
	#[must_use]
	pub const fn kind(&self) -> ErrorKind {
		match self {
			Self::Generation { .. } => ErrorKind::ThumbnailGeneration,
			Self::NotInitialized => ErrorKind::NotInitialized,
			Self::Config(_) | Self::WorkerSpawn(_) => ErrorKind::Initialization,
		}
	}

	/// The media path a generation failure is about
	#[must_use]
	pub fn subject(&self) -> Option<&Path> {
		match self {
			Self::Generation { media_path, .. } => Some(&**media_path),
			_ => None,
		}
	}

	/// The underlying cause, as shown to the caller layer
	#[must_use]
	pub fn detail(&self) -> String {
		match self {
			Self::Generation { source, .. } => source.to_string(),
			Self::NotInitialized => self.to_string(),
			Self::Config(e) => e.to_string(),
			Self::WorkerSpawn(e) => e.to_string(),
		}
	}
}
