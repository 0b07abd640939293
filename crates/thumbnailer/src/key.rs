use std::path::Path;

use pg_images::THUMBNAIL_EXTENSION;

/// Derives the artifact file name for a media path and a size.
///
/// The name is `<blake3 hex digest>_<size>.jpg`, where the digest covers the path bytes and the
/// size. It is stable across restarts and never depends on the media content, so a modified source
/// keeps mapping to the same artifact until that artifact is invalidated.
#[must_use]
pub fn derive_name(media_path: impl AsRef<Path>, size: u32) -> String {
	let mut hasher = blake3::Hasher::new();
	hasher.update(media_path.as_ref().as_os_str().as_encoded_bytes());
	// NUL can't show up in a path, so it cleanly separates the path from the size
	hasher.update(&[0]);
	hasher.update(size.to_string().as_bytes());

	format!("{}_{size}.{THUMBNAIL_EXTENSION}", hasher.finalize().to_hex())
}

#[cfg(test)]
mod tests {
	use super::*;

	use std::collections::HashSet;

	#[test]
	fn same_input_same_name() {
		let first = derive_name("/lib/a.jpg", 240);

		for _ in 0..10 {
			assert_eq!(derive_name("/lib/a.jpg", 240), first);
		}
		assert_eq!(derive_name(Path::new("/lib/a.jpg"), 240), first);
	}

	#[test]
	fn name_layout() {
		let name = derive_name("/lib/a.jpg", 100);

		let (digest, suffix) = name.split_once('_').unwrap();
		assert_eq!(digest.len(), 64);
		assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
		assert_eq!(suffix, "100.jpg");
	}

	#[test]
	fn size_changes_the_digest() {
		let small = derive_name("/lib/a.jpg", 100);
		let large = derive_name("/lib/a.jpg", 200);

		assert_ne!(&small[..64], &large[..64]);
	}

	#[test]
	fn no_collisions_across_many_paths() {
		let names = (0..10_000)
			.map(|i| derive_name(format!("/library/{}/IMG_{i:05}.jpg", i % 97), 240))
			.collect::<HashSet<_>>();

		assert_eq!(names.len(), 10_000);
	}
}
