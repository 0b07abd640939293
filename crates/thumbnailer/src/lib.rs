//!
//! # Thumbnailer
//!
//! Produces resized JPEG thumbnails and square icons for media files, on demand.
//!
//! Artifacts are content addressed by media path and size (see [`derive_name`]) and live in a flat
//! cache directory. A request for an existing artifact is answered straight from the filesystem,
//! a miss is rendered through a [`pg_task_queue::BoundedTaskQueue`] so no more than the configured
//! number of renders run at once. Artifacts are written atomically, readers never observe a
//! partial file.
//!
//! Rendering happens either on Tokio's blocking pool ([`InProcessRenderer`]) or on dedicated worker
//! threads that only receive serialized jobs ([`IsolatedRenderer`]); both produce the same bytes.

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
	clippy::expect_used,
	trivial_casts,
	trivial_numeric_casts,
	unused_allocation,
	clippy::as_conversions,
	clippy::dbg_macro
)]
#![forbid(unsafe_code)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

mod coalesce;
mod config;
mod error;
mod generator;
mod key;
mod lifecycle;
mod readiness;
mod renderer;
mod request;
mod store;

pub use config::{ConfigError, ThreadingConfig, ThumbnailerConfig, THUMBNAIL_CACHE_DIR_NAME};
pub use error::{ErrorKind, FileIOError, RenderError, ThumbnailerError};
pub use generator::ThumbnailGenerator;
pub use key::derive_name;
pub use lifecycle::Thumbnailer;
pub use readiness::{DirectoryListing, MediaEntry};
pub use renderer::{render_artifact, InProcessRenderer, IsolatedRenderer, Renderer};
pub use request::{ArtifactRequest, MediaReference, RenderRequest, SourceKind, Variant};
pub use store::{write_atomic, ArtifactStore};
