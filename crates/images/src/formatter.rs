use crate::{
	consts::GENERIC_EXTENSIONS,
	error::{Error, Result},
};

use std::{fs::File, io::Read, path::Path};

use image::{DynamicImage, ImageFormat};
use tracing::trace;

/// Decodes the photo at `path`, picking the decoder from its file extension.
///
/// With a `maximum_size`, larger files are refused with [`Error::TooLarge`] before being read.
pub fn format_image(path: impl AsRef<Path>, maximum_size: Option<u64>) -> Result<DynamicImage> {
	let path = path.as_ref();
	let format = format_for(path)?;

	let data = read_capped(path, maximum_size)?;
	trace!(?format, bytes = data.len(), "Read source image");

	Ok(image::load_from_memory_with_format(&data, format)?)
}

fn format_for(path: &Path) -> Result<ImageFormat> {
	let ext = path
		.extension()
		.ok_or(Error::NoExtension)?
		.to_string_lossy()
		.to_ascii_lowercase();

	if !GENERIC_EXTENSIONS.contains(&ext.as_str()) {
		return Err(Error::Unsupported);
	}

	ImageFormat::from_extension(&ext).ok_or(Error::Unsupported)
}

fn read_capped(path: &Path, maximum_size: Option<u64>) -> Result<Vec<u8>> {
	let mut file = File::open(path)?;

	let len = file.metadata()?.len();
	if let Some(maximum_size) = maximum_size.filter(|&maximum_size| len > maximum_size) {
		return Err(Error::TooLarge(maximum_size));
	}

	let mut data = Vec::with_capacity(usize::try_from(len)?);
	file.read_to_end(&mut data)?;

	Ok(data)
}
