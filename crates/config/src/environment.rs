//! Environment snapshot: the resolved record published as `KEY=VALUE` pairs.
//!
//! The snapshot is an explicit value. Building, writing and reading it never
//! touches the process environment; [`EnvironmentSnapshot::apply_to_process`]
//! is the only function that does.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use hailo_probe::SystemProbe;
use tracing::{debug, info, warn};

use crate::error::{ConfigError, Result};
use crate::record::ConfigRecord;

/// Derived key: `<resources_path>/models`.
pub const MODEL_DIR: &str = "MODEL_DIR";
/// Derived key: the compute library's post-process library directory.
pub const TAPPAS_POST_PROC_DIR: &str = "TAPPAS_POST_PROC_DIR";
/// pkg-config variable holding the post-process library directory.
pub const POSTPROC_VARIABLE: &str = "tappas_postproc_lib_dir";

/// Ordered `KEY=VALUE` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentSnapshot {
	entries: Vec<(String, String)>,
}

impl EnvironmentSnapshot {
	/// Every record key upper-cased, followed by the derived paths.
	pub fn from_record(record: &ConfigRecord, postproc_dir: &str) -> Self {
		let mut entries: Vec<_> = record.entries().map(|(key, value)| (key.env_name(), value)).collect();
		entries.push((MODEL_DIR.to_string(), record.model_dir().display().to_string()));
		entries.push((TAPPAS_POST_PROC_DIR.to_string(), postproc_dir.to_string()));
		Self { entries }
	}

	pub fn get(&self, key: &str) -> Option<&str> {
		self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
	}

	pub fn entries(&self) -> &[(String, String)] {
		&self.entries
	}

	pub fn render(&self) -> String {
		self.entries.iter().map(|(k, v)| format!("{k}={v}\n")).collect()
	}

	/// Parses `KEY=VALUE` lines. Blank lines and `#` comments are skipped;
	/// values are taken verbatim up to the end of the line.
	pub fn parse(input: &str) -> Self {
		let entries = input
			.lines()
			.filter(|line| !line.trim().is_empty() && !line.trim_start().starts_with('#'))
			.filter_map(|line| match line.split_once('=') {
				Some((key, value)) => Some((key.trim().to_string(), value.to_string())),
				None => {
					warn!(line, "ignoring malformed environment line");
					None
				}
			})
			.collect();
		Self { entries }
	}

	pub fn read(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let content = std::fs::read_to_string(path).map_err(|error| {
			if error.kind() == std::io::ErrorKind::NotFound {
				ConfigError::MissingFile(path.to_path_buf())
			} else {
				ConfigError::Io {
					path: path.to_path_buf(),
					error,
				}
			}
		})?;
		Ok(Self::parse(&content))
	}

	/// Replaces `path` with this snapshot.
	///
	/// The content is staged in a temporary file next to `path` and renamed over
	/// it, so a reader sees either the old or the new snapshot in full.
	pub fn write_atomic(&self, path: impl AsRef<Path>) -> Result<()> {
		let rendered = self.render();
		self.write_atomic_with(path, |file| file.write_all(rendered.as_bytes()))
	}

	/// [`write_atomic`](Self::write_atomic) with the content produced by
	/// `write`. If `write` fails the staged file is removed and `path` is left
	/// untouched.
	pub fn write_atomic_with(&self, path: impl AsRef<Path>, write: impl FnOnce(&mut File) -> std::io::Result<()>) -> Result<()> {
		let path = path.as_ref();
		let write_err = |error: std::io::Error| ConfigError::SnapshotWrite {
			path: path.to_path_buf(),
			error,
		};

		let dir = match path.parent() {
			Some(dir) if !dir.as_os_str().is_empty() => dir,
			_ => Path::new("."),
		};
		std::fs::create_dir_all(dir).map_err(write_err)?;
		relax_if_read_only(path)?;

		let mut staged = tempfile::Builder::new()
			.prefix(".env.")
			.suffix(".tmp")
			.tempfile_in(dir)
			.map_err(write_err)?;
		write(staged.as_file_mut()).map_err(write_err)?;
		staged.as_file().sync_all().map_err(write_err)?;
		#[cfg(unix)]
		{
			use std::os::unix::fs::PermissionsExt;
			staged
				.as_file()
				.set_permissions(std::fs::Permissions::from_mode(0o644))
				.map_err(write_err)?;
		}
		staged.persist(path).map_err(|e| write_err(e.error))?;

		debug!(path = %path.display(), entries = self.entries.len(), "environment snapshot written");
		Ok(())
	}

	/// Exports every entry into the current process environment.
	pub fn apply_to_process(&self) {
		for (key, value) in &self.entries {
			// SAFETY: called from the single-threaded CLI entry point before any
			// worker threads are spawned.
			unsafe { std::env::set_var(key, value) };
		}
	}
}

/// Result of [`materialize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Materialized {
	/// `refresh` was off and a snapshot already existed; nothing was computed.
	Reused(PathBuf),
	/// A new snapshot was computed and written.
	Written(EnvironmentSnapshot),
}

/// Publishes `record` as the environment snapshot at `path`.
///
/// Without `refresh`, an existing snapshot is left alone. Otherwise the file is
/// rewritten in full; it is never patched.
pub fn materialize(record: &ConfigRecord, refresh: bool, path: &Path, probe: &dyn SystemProbe) -> Result<Materialized> {
	if !refresh && path.exists() {
		info!(path = %path.display(), "environment snapshot exists, skipping");
		return Ok(Materialized::Reused(path.to_path_buf()));
	}

	let package = record.tappas_variant.package_name();
	let postproc_dir = probe.pkg_config_variable(package, POSTPROC_VARIABLE).unwrap_or_else(|| {
		warn!(package, "post-process library directory unavailable, {TAPPAS_POST_PROC_DIR} will be empty");
		String::new()
	});

	let snapshot = EnvironmentSnapshot::from_record(record, &postproc_dir);
	snapshot.write_atomic(path)?;
	info!(path = %path.display(), "environment snapshot written");
	Ok(Materialized::Written(snapshot))
}

/// Makes an existing read-only file writable. One attempt; failure is fatal.
fn relax_if_read_only(path: &Path) -> Result<()> {
	let Ok(metadata) = std::fs::metadata(path) else {
		return Ok(());
	};
	let mut permissions = metadata.permissions();
	if !permissions.readonly() {
		return Ok(());
	}

	warn!(path = %path.display(), "environment file is read-only, relaxing permissions");
	#[cfg(unix)]
	{
		use std::os::unix::fs::PermissionsExt;
		permissions.set_mode(permissions.mode() | 0o200);
	}
	#[cfg(not(unix))]
	permissions.set_readonly(false);

	std::fs::set_permissions(path, permissions).map_err(|error| ConfigError::SnapshotPermission {
		path: path.to_path_buf(),
		error,
	})
}
