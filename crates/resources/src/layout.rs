//! On-disk layout of the resources tree.

use std::path::Path;

use tracing::{debug, info};

use crate::error::{ResourceError, Result};

pub const MODELS_DIR: &str = "models";
pub const VIDEOS_DIR: &str = "videos";
pub const SO_DIR: &str = "so";

/// Creates `models/`, `videos/` and `so/` under `root`.
pub fn prepare_resource_dirs(root: &Path) -> Result<()> {
	for dir in [MODELS_DIR, VIDEOS_DIR, SO_DIR] {
		let path = root.join(dir);
		std::fs::create_dir_all(&path).map_err(ResourceError::io(&path))?;
	}
	debug!(root = %root.display(), "resource directories ready");
	Ok(())
}

/// Outcome of [`link_resources`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
	/// The link already pointed at the target.
	Unchanged,
	Created,
	/// A link to somewhere else was replaced.
	Replaced,
}

/// Points the symlink `link` at `target`.
///
/// An existing path that is not a symlink is never replaced.
pub fn link_resources(link: &Path, target: &Path) -> Result<LinkStatus> {
	let status = match std::fs::symlink_metadata(link) {
		Ok(metadata) if metadata.file_type().is_symlink() => {
			let current = std::fs::read_link(link).map_err(ResourceError::io(link))?;
			if current == target {
				return Ok(LinkStatus::Unchanged);
			}
			std::fs::remove_file(link).map_err(ResourceError::io(link))?;
			LinkStatus::Replaced
		}
		Ok(_) => return Err(ResourceError::LinkConflict(link.to_path_buf())),
		Err(error) if error.kind() == std::io::ErrorKind::NotFound => LinkStatus::Created,
		Err(error) => return Err(ResourceError::io(link)(error)),
	};

	if let Some(parent) = link.parent().filter(|p| !p.as_os_str().is_empty()) {
		std::fs::create_dir_all(parent).map_err(ResourceError::io(parent))?;
	}
	symlink_dir(target, link).map_err(ResourceError::io(link))?;
	info!(link = %link.display(), target = %target.display(), ?status, "resources linked");
	Ok(status)
}

#[cfg(unix)]
fn symlink_dir(target: &Path, link: &Path) -> std::io::Result<()> {
	std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink_dir(target: &Path, link: &Path) -> std::io::Result<()> {
	std::os::windows::fs::symlink_dir(target, link)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn prepare_creates_subdirectories() {
		let dir = tempfile::tempdir().unwrap();
		let root = dir.path().join("resources");
		prepare_resource_dirs(&root).unwrap();
		for sub in [MODELS_DIR, VIDEOS_DIR, SO_DIR] {
			assert!(root.join(sub).is_dir(), "{sub} missing");
		}
		// Second call is harmless.
		prepare_resource_dirs(&root).unwrap();
	}

	#[cfg(unix)]
	#[test]
	fn link_lifecycle() {
		let dir = tempfile::tempdir().unwrap();
		let first = dir.path().join("first");
		let second = dir.path().join("second");
		std::fs::create_dir_all(&first).unwrap();
		std::fs::create_dir_all(&second).unwrap();
		let link = dir.path().join("app").join("resources");

		assert_eq!(link_resources(&link, &first).unwrap(), LinkStatus::Created);
		assert_eq!(link_resources(&link, &first).unwrap(), LinkStatus::Unchanged);
		assert_eq!(link_resources(&link, &second).unwrap(), LinkStatus::Replaced);
		assert_eq!(std::fs::read_link(&link).unwrap(), second);
	}

	#[test]
	fn real_directory_is_not_replaced() {
		let dir = tempfile::tempdir().unwrap();
		let link = dir.path().join("resources");
		std::fs::create_dir_all(&link).unwrap();

		let err = link_resources(&link, dir.path()).unwrap_err();
		assert!(matches!(err, ResourceError::LinkConflict(_)));
		assert!(link.is_dir());
	}
}
