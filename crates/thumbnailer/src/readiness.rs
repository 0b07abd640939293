use crate::generator::ThumbnailGenerator;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A media file as listed to clients, relative to the images root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaEntry {
	/// Directory holding the file, relative to the images root
	pub directory: PathBuf,
	pub name: String,
	/// Sizes whose thumbnail is already rendered
	#[serde(default)]
	pub ready_thumbnails: Vec<u32>,
	#[serde(default)]
	pub ready_icon: bool,
}

impl MediaEntry {
	pub fn new(directory: impl Into<PathBuf>, name: impl Into<String>) -> Self {
		Self {
			directory: directory.into(),
			name: name.into(),
			..Default::default()
		}
	}

	#[must_use]
	pub fn full_path(&self, images_root: impl AsRef<Path>) -> PathBuf {
		images_root.as_ref().join(&self.directory).join(&self.name)
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryListing {
	#[serde(default)]
	pub media: Vec<MediaEntry>,
	#[serde(default)]
	pub directories: Vec<DirectoryListing>,
}

impl ThumbnailGenerator {
	/// Marks which artifacts of every listed media file are already rendered, sub-directories
	/// included. Only probes the cache, nothing gets rendered.
	pub fn annotate_readiness(&self, images_root: impl AsRef<Path>, listing: &mut DirectoryListing) {
		let images_root = images_root.as_ref();

		for entry in &mut listing.media {
			let media_path = entry.full_path(images_root);
			let store = self.store();

			entry.ready_thumbnails = self
				.thumbnail_sizes()
				.iter()
				.copied()
				.filter(|&size| store.exists(store.artifact_path(&media_path, size)))
				.collect();

			entry.ready_icon = store.exists(store.artifact_path(&media_path, self.icon_size()));
		}

		for directory in &mut listing.directories {
			self.annotate_readiness(images_root, directory);
		}
	}
}
