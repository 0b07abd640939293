use crate::{error::FileIOError, key::derive_name};

use std::{
	fs as std_fs,
	io::{self, Write},
	path::{Path, PathBuf},
};

use tokio::fs;
use tracing::{error, instrument, trace, warn};
use uuid::Uuid;

const TEMPORARY_EXTENSION: &str = "tmp";

/// The on-disk artifact cache.
///
/// A flat directory of `<digest>_<size>.jpg` files. File presence is the only state, there is no
/// index and nothing is ever evicted by the store itself.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
	root: PathBuf,
}

impl ArtifactStore {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	#[must_use]
	pub fn root(&self) -> &Path {
		&self.root
	}

	/// This does not check if the artifact exists, it just returns the path that it would exist at
	#[must_use]
	pub fn artifact_path(&self, media_path: impl AsRef<Path>, size: u32) -> PathBuf {
		self.root.join(derive_name(media_path, size))
	}

	/// Synchronous existence probe, only fully written artifacts are ever visible here.
	#[must_use]
	pub fn exists(&self, path: impl AsRef<Path>) -> bool {
		match std_fs::metadata(path.as_ref()) {
			Ok(metadata) => metadata.is_file(),
			Err(e) => {
				if e.kind() != io::ErrorKind::NotFound {
					error!(
						?e,
						path = %path.as_ref().display(),
						"Failed to check if artifact exists, treating it as missing;"
					);
				}
				false
			}
		}
	}

	/// Creates the cache directory, calling it again or concurrently is fine.
	pub async fn ensure_container_ready(&self) -> Result<(), FileIOError> {
		fs::create_dir_all(&self.root)
			.await
			.map_err(|e| FileIOError::from((&self.root, e, "failed to create thumbnail directory")))
	}

	/// Removes an artifact, returning whether there was one to remove.
	pub async fn remove(&self, path: impl AsRef<Path> + Send) -> Result<bool, FileIOError> {
		let path = path.as_ref();
		match fs::remove_file(path).await {
			Ok(()) => Ok(true),
			Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
			Err(e) => Err(FileIOError::from((path, e))),
		}
	}

	/// Deletes temporary files left behind by renders that were interrupted mid write.
	#[instrument(skip(self), fields(root = %self.root.display()))]
	pub async fn remove_stale_temporaries(&self) -> Result<usize, FileIOError> {
		let mut read_dir = match fs::read_dir(&self.root).await {
			Ok(read_dir) => read_dir,
			Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
			Err(e) => return Err(FileIOError::from((&self.root, e))),
		};

		let mut removed = 0;

		while let Some(entry) = read_dir
			.next_entry()
			.await
			.map_err(|e| FileIOError::from((&self.root, e)))?
		{
			let path = entry.path();
			if !is_temporary(&path) {
				continue;
			}

			match fs::remove_file(&path).await {
				Ok(()) => removed += 1,
				Err(e) => warn!(
					?e,
					path = %path.display(),
					"Failed to remove stale temporary thumbnail;"
				),
			}
		}

		if removed > 0 {
			trace!(removed, "Removed stale temporary thumbnails");
		}

		Ok(removed)
	}
}

fn temporary_path_for(destination: &Path) -> PathBuf {
	let file_name = destination
		.file_name()
		.map(|name| name.to_string_lossy())
		.unwrap_or_default();

	destination.with_file_name(format!(
		".{file_name}.{}.{TEMPORARY_EXTENSION}",
		Uuid::new_v4().simple()
	))
}

fn is_temporary(path: &Path) -> bool {
	path.file_name()
		.and_then(|name| name.to_str())
		.is_some_and(|name| {
			name.starts_with('.') && name.ends_with(&format!(".{TEMPORARY_EXTENSION}"))
		})
}

/// Writes `bytes` next to `destination`, flushes them to disk and renames the file into place.
///
/// The destination either doesn't exist or holds the complete content, never a partial write.
/// Failures are reported against `destination`, the temporary name is an implementation detail.
pub fn write_atomic(destination: impl AsRef<Path>, bytes: &[u8]) -> Result<(), FileIOError> {
	let destination = destination.as_ref();
	let temporary = temporary_path_for(destination);

	if let Err(e) = write_synced(&temporary, bytes) {
		// Handling the partial file, if any
		let _ = std_fs::remove_file(&temporary);
		return Err(FileIOError::from((
			destination,
			e,
			"failed to write temporary thumbnail",
		)));
	}

	std_fs::rename(&temporary, destination).map_err(|e| {
		let _ = std_fs::remove_file(&temporary);
		FileIOError::from((destination, e, "failed to move thumbnail into place"))
	})
}

/// Synced before the rename, a crash never publishes an empty file under the final name
fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
	let mut file = std_fs::File::create(path)?;
	file.write_all(bytes)?;
	file.sync_all()
}

#[cfg(test)]
mod tests {
	use super::*;

	use futures_concurrency::future::Join;

	#[test]
	fn artifacts_live_directly_under_the_root() {
		let store = ArtifactStore::new("/var/cache/thumbnails");

		let path = store.artifact_path("/lib/a.jpg", 240);

		assert_eq!(path.parent(), Some(Path::new("/var/cache/thumbnails")));
		assert_eq!(
			path.file_name().unwrap().to_str().unwrap(),
			derive_name("/lib/a.jpg", 240)
		);
	}

	#[tokio::test]
	async fn ensure_container_ready_is_idempotent_under_races() {
		let dir = tempfile::tempdir().unwrap();
		let store = ArtifactStore::new(dir.path().join("nested").join("thumbnails"));

		let results = (
			store.ensure_container_ready(),
			store.ensure_container_ready(),
			store.ensure_container_ready(),
		)
			.join()
			.await;

		assert!(results.0.is_ok() && results.1.is_ok() && results.2.is_ok());
		assert!(store.root().is_dir());
		store.ensure_container_ready().await.unwrap();
	}

	#[test]
	fn write_atomic_leaves_only_the_destination() {
		let dir = tempfile::tempdir().unwrap();
		let store = ArtifactStore::new(dir.path());
		let destination = store.artifact_path("/lib/a.jpg", 240);

		assert!(!store.exists(&destination));
		write_atomic(&destination, b"jpeg bytes").unwrap();
		assert!(store.exists(&destination));

		let entries = std_fs::read_dir(dir.path()).unwrap().count();
		assert_eq!(entries, 1);
		assert_eq!(std_fs::read(&destination).unwrap(), b"jpeg bytes");
	}

	#[test]
	fn write_atomic_into_missing_directory_fails_cleanly() {
		let dir = tempfile::tempdir().unwrap();
		let destination = dir.path().join("missing").join("a_240.jpg");

		assert!(write_atomic(&destination, b"jpeg bytes").is_err());
		assert!(!destination.exists());
	}

	#[test]
	fn write_failures_name_the_destination() {
		let dir = tempfile::tempdir().unwrap();
		let destination = dir.path().join("missing").join("a_240.jpg");

		let e = write_atomic(&destination, b"jpeg bytes").unwrap_err();

		assert_eq!(&*e.path, destination.as_path());
		assert_eq!(e.source.kind(), io::ErrorKind::NotFound);
		assert_eq!(
			e.maybe_context.as_deref(),
			Some("failed to write temporary thumbnail")
		);
	}

	#[test]
	fn temporaries_are_siblings_under_another_name() {
		let destination = Path::new("/var/cache/thumbnails/abc_240.jpg");

		let first = temporary_path_for(destination);
		let second = temporary_path_for(destination);

		assert_eq!(first.parent(), destination.parent());
		assert_ne!(first.file_name(), destination.file_name());
		assert_ne!(first, second);
		assert!(is_temporary(&first));
		assert!(!is_temporary(destination));
	}

	#[test]
	fn readers_never_observe_a_partial_artifact() {
		const LEN: usize = 16 * 1024 * 1024;
		const ROUNDS: usize = 4;

		let dir = tempfile::tempdir().unwrap();
		let store = ArtifactStore::new(dir.path());
		let destinations = (0..ROUNDS)
			.map(|round| store.artifact_path(format!("/lib/{round}.jpg"), 240))
			.collect::<Vec<_>>();

		let writer = {
			let destinations = destinations.clone();
			std::thread::spawn(move || {
				let bytes = vec![0xAB; LEN];
				for destination in &destinations {
					write_atomic(destination, &bytes).unwrap();
				}
			})
		};

		let mut observed_complete = 0;
		while observed_complete < ROUNDS {
			observed_complete = 0;
			for destination in &destinations {
				match std_fs::metadata(destination) {
					Ok(metadata) => {
						assert_eq!(metadata.len(), LEN as u64, "saw a partial artifact");
						observed_complete += 1;
					}
					Err(e) => assert_eq!(e.kind(), io::ErrorKind::NotFound),
				}
			}
			if writer.is_finished() && observed_complete < ROUNDS {
				break;
			}
		}

		writer.join().unwrap();
		for destination in &destinations {
			assert_eq!(std_fs::metadata(destination).unwrap().len(), LEN as u64);
		}
		assert_eq!(std_fs::read_dir(dir.path()).unwrap().count(), ROUNDS);
	}

	#[test]
	fn directories_are_not_artifacts() {
		let dir = tempfile::tempdir().unwrap();
		let store = ArtifactStore::new(dir.path());

		assert!(!store.exists(dir.path()));
	}

	#[tokio::test]
	async fn stale_temporaries_are_removed() {
		let dir = tempfile::tempdir().unwrap();
		let store = ArtifactStore::new(dir.path());
		let destination = store.artifact_path("/lib/a.jpg", 240);

		std_fs::write(temporary_path_for(&destination), b"half").unwrap();
		write_atomic(&destination, b"whole").unwrap();

		assert_eq!(store.remove_stale_temporaries().await.unwrap(), 1);
		assert!(store.exists(&destination));
		assert_eq!(std_fs::read_dir(dir.path()).unwrap().count(), 1);
	}

	#[tokio::test]
	async fn remove_reports_whether_anything_was_deleted() {
		let dir = tempfile::tempdir().unwrap();
		let store = ArtifactStore::new(dir.path());
		let destination = store.artifact_path("/lib/a.jpg", 240);
		write_atomic(&destination, b"whole").unwrap();

		assert!(store.remove(&destination).await.unwrap());
		assert!(!store.remove(&destination).await.unwrap());
	}
}
