//! The resource catalog: named groups of models plus sample videos.
//!
//! ```yaml
//! defaults:
//!   model_zoo_url: http://dev-public.hailo.ai/2025_01
//! groups:
//!   hailo8:
//!     - yolov8m
//!     - my_model: https://example.com/my_model.hef
//! videos:
//!   example:
//!     url: https://example.com/video/example.mp4
//! ```
//!
//! A plain group entry names a model-zoo model whose URL is built from the
//! resolved configuration. A single-key mapping supplies the URL directly.
//! Group and video order is declaration order.

use std::path::{Path, PathBuf};

use hailo_config::config_home;
use indexmap::IndexMap;
use serde::Deserialize;
use tracing::debug;

use crate::error::{ResourceError, Result};

/// Overrides the catalog path.
pub const CATALOG_ENV: &str = "HAILO_APPS_CATALOG";

/// Embedded `resources_config.yaml` shipped with the runtime data.
pub const EMBEDDED_CATALOG: &str = include_str!("../../../runtime/resources_config.yaml");

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Catalog {
	#[serde(default)]
	pub defaults: CatalogDefaults,
	#[serde(default)]
	pub groups: IndexMap<String, Vec<GroupEntry>>,
	#[serde(default)]
	pub videos: IndexMap<String, VideoEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CatalogDefaults {
	/// Base URL the catalog was written against.
	pub model_zoo_url: Option<String>,
}

/// One member of a group.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawEntry")]
pub enum GroupEntry {
	/// Model-zoo model, URL templated from the configuration.
	Named(String),
	/// Custom artifact at an explicit URL.
	Override { name: String, url: String },
}

impl GroupEntry {
	pub fn name(&self) -> &str {
		match self {
			Self::Named(name) | Self::Override { name, .. } => name,
		}
	}
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntry {
	Name(String),
	Mapping(IndexMap<String, String>),
}

impl TryFrom<RawEntry> for GroupEntry {
	type Error = String;

	fn try_from(raw: RawEntry) -> std::result::Result<Self, Self::Error> {
		match raw {
			RawEntry::Name(name) => Ok(Self::Named(name)),
			RawEntry::Mapping(mapping) => {
				let mut entries = mapping.into_iter();
				match (entries.next(), entries.next()) {
					(Some((name, url)), None) => Ok(Self::Override { name, url }),
					_ => Err("group entry mapping must have exactly one `name: url` pair".to_string()),
				}
			}
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VideoEntry {
	pub url: String,
	/// File name under `videos/`; defaults to `<name><extension>`.
	#[serde(default)]
	pub filename: Option<String>,
	/// Used when the URL carries no extension.
	#[serde(default)]
	pub extension: Option<String>,
}

impl Catalog {
	/// Parses a catalog document.
	pub fn parse(input: &str, source_name: &str) -> Result<Self> {
		serde_yaml::from_str(input).map_err(|error| ResourceError::Yaml {
			source_name: source_name.to_string(),
			error,
		})
	}

	/// Group names in declaration order.
	pub fn group_names(&self) -> impl Iterator<Item = &str> {
		self.groups.keys().map(String::as_str)
	}

	/// First entry named `name` across all groups, in declaration order.
	pub fn find_entry(&self, name: &str) -> Option<&GroupEntry> {
		self.groups.values().flatten().find(|entry| entry.name() == name)
	}
}

/// Loads a catalog file. A missing or malformed file is an error.
pub fn load_catalog(path: impl AsRef<Path>) -> Result<Catalog> {
	let path = path.as_ref();
	let content = std::fs::read_to_string(path).map_err(|error| {
		if error.kind() == std::io::ErrorKind::NotFound {
			ResourceError::MissingCatalog(path.to_path_buf())
		} else {
			ResourceError::Io {
				path: path.to_path_buf(),
				error,
			}
		}
	})?;
	Catalog::parse(&content, &path.display().to_string())
}

/// The catalog shipped with the runtime data.
pub fn embedded_catalog() -> Result<Catalog> {
	Catalog::parse(EMBEDDED_CATALOG, "embedded resources_config.yaml")
}

/// `$HAILO_APPS_CATALOG` or `<config_home>/resources_config.yaml`.
pub fn default_catalog_path() -> PathBuf {
	if let Ok(p) = std::env::var(CATALOG_ENV) {
		return PathBuf::from(p);
	}
	config_home().join("resources_config.yaml")
}

/// Loads the explicit catalog, else the default path if present, else the
/// embedded catalog.
pub fn load_catalog_from(explicit: Option<&Path>) -> Result<Catalog> {
	if let Some(path) = explicit {
		return load_catalog(path);
	}

	let path = default_catalog_path();
	if path.is_file() {
		debug!(path = %path.display(), "loading resource catalog");
		load_catalog(&path)
	} else {
		debug!(path = %path.display(), "no catalog at default path, using embedded catalog");
		embedded_catalog()
	}
}
