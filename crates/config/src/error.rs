//! Error types for configuration resolution.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::key::ConfigKey;

/// Where a configuration value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Origin {
	/// Built-in default.
	Default,
	/// YAML configuration file.
	File,
	/// Command-line flag.
	Cli,
	/// Process environment hint (`HAILO_ARCH`, `HOST_ARCH`, `RESOURCES_PATH`).
	Environment,
	/// Probed from the local system.
	Detected,
}

impl Origin {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Default => "default",
			Self::File => "config file",
			Self::Cli => "command line",
			Self::Environment => "environment",
			Self::Detected => "detected",
		}
	}
}

impl fmt::Display for Origin {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A single problem found while validating or resolving configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
	/// Value outside the key's allow-list.
	NotAllowed {
		key: ConfigKey,
		value: String,
		origin: Origin,
		allowed: Vec<&'static str>,
	},
	/// Free-form value that must not be empty.
	Empty { key: ConfigKey, origin: Origin },
	/// Key left at `auto` with no way to derive a concrete value.
	Unresolved { key: ConfigKey, reason: String },
}

impl Violation {
	pub fn key(&self) -> ConfigKey {
		match self {
			Self::NotAllowed { key, .. } | Self::Empty { key, .. } | Self::Unresolved { key, .. } => *key,
		}
	}
}

impl fmt::Display for Violation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::NotAllowed {
				key,
				value,
				origin,
				allowed,
			} => write!(
				f,
				"invalid value '{value}' for {key} (from {origin}). Valid options: {}",
				allowed.join(", ")
			),
			Self::Empty { key, origin } => write!(f, "{key} must not be empty (from {origin})"),
			Self::Unresolved { key, reason } => write!(
				f,
				"{key} is 'auto' but could not be resolved: {reason}. Set --{} or {key} explicitly",
				key.flag()
			),
		}
	}
}

/// Errors that can occur when loading, resolving or persisting configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// An explicitly requested file does not exist.
	#[error("config file not found at {}", .0.display())]
	MissingFile(PathBuf),

	/// Error reading a file.
	#[error("I/O error reading {}: {error}", .path.display())]
	Io {
		path: PathBuf,
		#[source]
		error: std::io::Error,
	},

	/// YAML syntax error.
	#[error("failed to parse {source_name}: {error}")]
	Yaml {
		source_name: String,
		#[source]
		error: serde_yaml::Error,
	},

	/// Top level of the document is not a mapping.
	#[error("{source_name} must contain a flat key/value mapping")]
	NotAMapping { source_name: String },

	/// A key maps to a list or nested mapping.
	#[error("{source_name}: value for '{key}' must be a scalar")]
	NotScalar { source_name: String, key: String },

	/// Every validation and resolution problem, reported together.
	#[error("invalid configuration:\n{}", format_violations(.0))]
	Invalid(Vec<Violation>),

	/// The environment snapshot exists, is read-only, and could not be made writable.
	#[error("environment file {} is not writable and permissions could not be relaxed: {error}", .path.display())]
	SnapshotPermission {
		path: PathBuf,
		#[source]
		error: std::io::Error,
	},

	/// Writing the environment snapshot failed.
	#[error("failed to write environment file {}: {error}", .path.display())]
	SnapshotWrite {
		path: PathBuf,
		#[source]
		error: std::io::Error,
	},
}

fn format_violations(violations: &[Violation]) -> String {
	violations.iter().map(|v| format!("  - {v}")).collect::<Vec<_>>().join("\n")
}

impl ConfigError {
	/// Violations carried by [`ConfigError::Invalid`].
	pub fn violations(&self) -> &[Violation] {
		match self {
			Self::Invalid(violations) => violations,
			_ => &[],
		}
	}
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Non-fatal warning during configuration parsing.
///
/// These warnings are collected during parsing and reported to the user,
/// but do not prevent the configuration from being loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
	/// A key that is not part of the configuration schema.
	UnknownKey {
		key: String,
		/// A suggested alternative, if one is close enough.
		suggestion: Option<&'static str>,
	},
	/// A key spelt the way an earlier release wrote it.
	LegacyKey { key: String, canonical: ConfigKey },
}

impl fmt::Display for ConfigWarning {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ConfigWarning::UnknownKey { key, suggestion } => {
				write!(f, "unknown config key '{key}' will be ignored")?;
				if let Some(suggestion) = suggestion {
					write!(f, " (did you mean '{suggestion}'?)")?;
				}
				Ok(())
			}
			ConfigWarning::LegacyKey { key, canonical } => {
				write!(f, "config key '{key}' is deprecated, use '{canonical}'")
			}
		}
	}
}
