/// Extensions decoded through the `image` crate directly.
pub const GENERIC_EXTENSIONS: [&str; 14] = [
	"bmp", "gif", "ico", "jpeg", "jpg", "pam", "pbm", "pgm", "png", "ppm", "tga", "tif", "tiff",
	"webp",
];

/// JPEG quality used when the caller prefers output quality over speed.
pub const HIGH_JPEG_QUALITY: u8 = 90;

/// JPEG quality used when the caller prefers speed.
pub const FAST_JPEG_QUALITY: u8 = 75;

/// Where in a video we grab the frame used for its thumbnail.
pub(crate) const VIDEO_FRAME_OFFSET: &str = "00:00:01";

pub(crate) const FFMPEG_BINARY: &str = "ffmpeg";
