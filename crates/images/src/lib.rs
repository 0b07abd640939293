//! Decoding, resizing and JPEG encoding of thumbnail sources.

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

mod consts;
mod encode;
mod error;
mod formatter;
mod resize;
mod video;

pub use consts::{FAST_JPEG_QUALITY, GENERIC_EXTENSIONS, HIGH_JPEG_QUALITY};
pub use encode::{encode_jpeg, THUMBNAIL_EXTENSION};
pub use error::{Error, Result};
pub use formatter::format_image;
pub use image::DynamicImage;
pub use resize::{fit_dimensions, thumbnail_image, Fit};
pub use video::extract_video_frame;
