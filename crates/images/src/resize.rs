use crate::error::{Error, Result};

use image::{imageops::FilterType, DynamicImage, GenericImageView};

/// How a source image is fitted into a thumbnail of a given size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fit {
	/// The shorter side becomes `size` (never upscaled), aspect ratio is kept.
	ShorterSide,
	/// The image is scaled to cover a `size`x`size` square and center cropped.
	Square,
}

/// Computes the output dimensions of a [`Fit::ShorterSide`] resize.
///
/// Sources smaller than `size` keep their original dimensions.
pub fn fit_dimensions(width: u32, height: u32, size: u32) -> Result<(u32, u32)> {
	if width == 0 || height == 0 {
		return Err(Error::EmptyImage);
	}

	let (short, long) = if width <= height {
		(width, height)
	} else {
		(height, width)
	};

	let target_short = short.min(size);
	let target_long = u32::try_from(
		(u64::from(long) * u64::from(target_short) + u64::from(short) / 2) / u64::from(short),
	)?
	.max(1);

	Ok(if width <= height {
		(target_short, target_long)
	} else {
		(target_long, target_short)
	})
}

/// Resizes `img` into a thumbnail of `size`.
///
/// `quality_priority` picks a slower but sharper resampling filter.
pub fn thumbnail_image(
	img: &DynamicImage,
	size: u32,
	fit: Fit,
	quality_priority: bool,
) -> Result<DynamicImage> {
	let filter = if quality_priority {
		FilterType::Lanczos3
	} else {
		FilterType::Triangle
	};

	let (w, h) = img.dimensions();

	match fit {
		Fit::Square => {
			if w == 0 || h == 0 || size == 0 {
				return Err(Error::EmptyImage);
			}
			Ok(img.resize_to_fill(size, size, filter))
		}
		Fit::ShorterSide => {
			let (w_scaled, h_scaled) = fit_dimensions(w, h, size)?;
			if (w_scaled, h_scaled) == (w, h) {
				Ok(img.clone())
			} else {
				Ok(img.resize_exact(w_scaled, h_scaled, filter))
			}
		}
	}
}
