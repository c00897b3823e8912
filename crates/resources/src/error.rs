//! Error types for catalog loading, planning and fetching.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Why a single download failed.
#[derive(Debug, Error)]
pub enum DownloadError {
	/// The server answered with a non-success status.
	#[error("HTTP {0}")]
	Status(u16),
	/// Connection, DNS or TLS failure.
	#[error("transport error: {0}")]
	Transport(String),
	/// Writing the staged file or moving it into place failed.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
}

impl From<ureq::Error> for DownloadError {
	fn from(error: ureq::Error) -> Self {
		match error {
			ureq::Error::Status(code, _) => Self::Status(code),
			ureq::Error::Transport(transport) => Self::Transport(transport.to_string()),
		}
	}
}

/// One plan entry that could not be fetched.
#[derive(Debug)]
pub struct FetchFailure {
	pub name: String,
	pub url: String,
	pub destination: PathBuf,
	pub error: DownloadError,
}

impl fmt::Display for FetchFailure {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} ({}): {}", self.name, self.url, self.error)
	}
}

/// Errors from the resource pipeline.
#[derive(Debug, Error)]
pub enum ResourceError {
	/// An explicitly requested catalog does not exist.
	#[error("resource catalog not found at {}", .0.display())]
	MissingCatalog(PathBuf),

	/// Error reading a file.
	#[error("I/O error on {}: {error}", .path.display())]
	Io {
		path: PathBuf,
		#[source]
		error: std::io::Error,
	},

	/// The catalog is not valid YAML or does not match the catalog schema.
	#[error("failed to parse {source_name}: {error}")]
	Yaml {
		source_name: String,
		#[source]
		error: serde_yaml::Error,
	},

	/// A requested group is neither a keyword nor a catalog group.
	#[error("unknown resource group '{group}'. Available groups: {}", .available.join(", "))]
	UnknownGroup { group: String, available: Vec<String> },

	/// A catalog entry carries a URL that does not parse.
	#[error("invalid URL for resource '{name}': {url} ({error})")]
	InvalidUrl {
		name: String,
		url: String,
		#[source]
		error: url::ParseError,
	},

	/// A path exists where a symlink should be created, and it is not a symlink.
	#[error("refusing to replace {} with a symlink: path exists and is not a link", .0.display())]
	LinkConflict(PathBuf),

	/// Every entry was attempted; these failed.
	#[error("{} download(s) failed:\n{}", .0.len(), format_failures(.0))]
	FetchFailed(Vec<FetchFailure>),
}

fn format_failures(failures: &[FetchFailure]) -> String {
	failures.iter().map(|f| format!("  - {f}")).collect::<Vec<_>>().join("\n")
}

impl ResourceError {
	pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
		let path = path.into();
		move |error| Self::Io { path, error }
	}
}

/// Result type for resource operations.
pub type Result<T> = std::result::Result<T, ResourceError>;
