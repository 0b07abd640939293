use crate::{
	consts::{FAST_JPEG_QUALITY, HIGH_JPEG_QUALITY},
	error::Result,
};

use std::io::Cursor;

use image::{codecs::jpeg::JpegEncoder, DynamicImage};

/// File extension of every encoded thumbnail.
pub const THUMBNAIL_EXTENSION: &str = "jpg";

/// Encodes `img` as a baseline JPEG.
///
/// JPEG has no alpha channel, so the image is flattened to RGB first.
pub fn encode_jpeg(img: &DynamicImage, quality_priority: bool) -> Result<Vec<u8>> {
	let quality = if quality_priority {
		HIGH_JPEG_QUALITY
	} else {
		FAST_JPEG_QUALITY
	};

	let rgb = img.to_rgb8();
	let mut buffer = Cursor::new(Vec::with_capacity(rgb.as_raw().len() / 8));
	JpegEncoder::new_with_quality(&mut buffer, quality).encode_image(&rgb)?;

	Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
	use super::*;

	use image::{Rgba, RgbaImage};

	#[test]
	fn encodes_images_with_alpha() {
		let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([200, 10, 10, 128])));

		let bytes = encode_jpeg(&img, false).unwrap();

		assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
		let decoded = image::load_from_memory(&bytes).unwrap();
		assert_eq!((decoded.width(), decoded.height()), (8, 8));
	}

	#[test]
	fn encoding_is_deterministic() {
		let img = DynamicImage::ImageRgba8(RgbaImage::from_fn(16, 16, |x, y| {
			Rgba([
				u8::try_from(x * 16).unwrap(),
				u8::try_from(y * 16).unwrap(),
				0,
				255,
			])
		}));

		assert_eq!(
			encode_jpeg(&img, true).unwrap(),
			encode_jpeg(&img, true).unwrap()
		);
	}
}
