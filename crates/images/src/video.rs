use crate::{
	consts::{FFMPEG_BINARY, VIDEO_FRAME_OFFSET},
	error::{Error, Result},
};

use std::{
	path::Path,
	process::{Command, Stdio},
};

use image::DynamicImage;
use tracing::{instrument, trace};

/// Grabs a single frame from a video through the `ffmpeg` command line tool.
///
/// The frame one second in is preferred, videos shorter than that fall back to their first frame.
#[instrument(skip_all, fields(video_path = %path.as_ref().display()))]
pub fn extract_video_frame(path: impl AsRef<Path>) -> Result<DynamicImage> {
	let path = path.as_ref();

	// ffmpeg reports a missing input with a generic failure, so check it ourselves first
	std::fs::metadata(path)?;

	let mut frame = run_ffmpeg(path, Some(VIDEO_FRAME_OFFSET))?;
	if frame.is_empty() {
		trace!("Video is shorter than the frame offset, using its first frame");
		frame = run_ffmpeg(path, None)?;
	}

	if frame.is_empty() {
		return Err(Error::Ffmpeg("no frame could be decoded".to_string()));
	}

	Ok(image::load_from_memory(&frame)?)
}

fn run_ffmpeg(path: &Path, seek: Option<&str>) -> Result<Vec<u8>> {
	let mut command = Command::new(FFMPEG_BINARY);
	command.args(["-hide_banner", "-loglevel", "error"]);
	if let Some(offset) = seek {
		command.args(["-ss", offset]);
	}
	command
		.arg("-i")
		.arg(path)
		.args(["-frames:v", "1", "-f", "image2pipe", "-vcodec", "png", "-"])
		.stdin(Stdio::null());

	let output = command.output().map_err(Error::FfmpegSpawn)?;

	if !output.status.success() {
		return Err(Error::Ffmpeg(
			String::from_utf8_lossy(&output.stderr).trim().to_string(),
		));
	}

	Ok(output.stdout)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn missing_video_is_an_io_error() {
		let dir = tempfile::tempdir().unwrap();

		assert!(matches!(
			extract_video_frame(dir.path().join("missing.mp4")),
			Err(Error::Io(_))
		));
	}
}
