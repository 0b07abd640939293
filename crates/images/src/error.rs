use std::{io, num::TryFromIntError};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
	#[error("unsupported media format")]
	Unsupported,
	#[error("media path has no file extension")]
	NoExtension,
	#[error("source file is larger than {0} bytes")]
	TooLarge(u64),
	#[error("source has zero width or height")]
	EmptyImage,
	#[error("image codec error: {0}")]
	Image(#[from] image::ImageError),
	#[error("failed to read source: {0}")]
	Io(#[from] io::Error),
	#[error("failed to run ffmpeg: {0}")]
	FfmpegSpawn(#[source] io::Error),
	#[error("ffmpeg failed to extract a frame: {0}")]
	Ffmpeg(String),
	#[error("dimension out of range: {0}")]
	TryFromInt(#[from] TryFromIntError),
}
