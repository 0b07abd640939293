use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
	Photo,
	Video,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
	Thumbnail,
	/// Always rendered at the configured icon size and square cropped
	Icon,
}

/// A source file in the media library, identified by its absolute path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaReference {
	pub path: PathBuf,
	pub kind: SourceKind,
}

impl MediaReference {
	pub fn new(path: impl Into<PathBuf>, kind: SourceKind) -> Self {
		Self {
			path: path.into(),
			kind,
		}
	}
}

/// What the request handling layer asks the thumbnailer for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRequest {
	pub media_path: PathBuf,
	/// Ignored for icons, coerced to the smallest supported size when unsupported
	pub size: u32,
	pub source_kind: SourceKind,
	pub variant: Variant,
	/// Ignored for icons, which are always square
	pub square_crop: bool,
}

impl ArtifactRequest {
	pub fn thumbnail(media_path: impl Into<PathBuf>, size: u32, source_kind: SourceKind) -> Self {
		Self {
			media_path: media_path.into(),
			size,
			source_kind,
			variant: Variant::Thumbnail,
			square_crop: false,
		}
	}

	pub fn icon(media_path: impl Into<PathBuf>, source_kind: SourceKind) -> Self {
		Self {
			media_path: media_path.into(),
			size: 0,
			source_kind,
			variant: Variant::Icon,
			square_crop: true,
		}
	}

	#[must_use]
	pub const fn with_square_crop(mut self, square_crop: bool) -> Self {
		self.square_crop = square_crop;
		self
	}
}

/// Everything a renderer needs to produce one artifact.
///
/// Self contained and serializable, it may be handed to an isolated worker as bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderRequest {
	media: MediaReference,
	size: u32,
	square_crop: bool,
	quality_priority: bool,
	destination: PathBuf,
	#[serde(default)]
	maximum_source_size: Option<u64>,
}

impl RenderRequest {
	#[must_use]
	pub const fn new(
		media: MediaReference,
		size: u32,
		square_crop: bool,
		quality_priority: bool,
		destination: PathBuf,
	) -> Self {
		Self {
			media,
			size,
			square_crop,
			quality_priority,
			destination,
			maximum_source_size: None,
		}
	}

	/// Photos larger than this many bytes fail to render instead of being decoded
	#[must_use]
	pub const fn with_maximum_source_size(mut self, maximum_source_size: Option<u64>) -> Self {
		self.maximum_source_size = maximum_source_size;
		self
	}

	#[must_use]
	pub const fn media(&self) -> &MediaReference {
		&self.media
	}

	#[must_use]
	pub const fn size(&self) -> u32 {
		self.size
	}

	#[must_use]
	pub const fn square_crop(&self) -> bool {
		self.square_crop
	}

	#[must_use]
	pub const fn quality_priority(&self) -> bool {
		self.quality_priority
	}

	#[must_use]
	pub fn destination(&self) -> &Path {
		&self.destination
	}

	#[must_use]
	pub const fn maximum_source_size(&self) -> Option<u64> {
		self.maximum_source_size
	}
}
