//! Raw configuration layers and their merge.
//!
//! A layer is a partial mapping from [`ConfigKey`] to the string a user wrote
//! (including the literal `auto`). Layers are merged in precedence order
//! before any value is interpreted, so validation sees exactly what the user
//! asked for and where it came from.

use std::collections::BTreeMap;
use std::path::Path;

use serde_yaml::Value;
use tracing::warn;

use crate::domain::default_value;
use crate::error::{ConfigError, ConfigWarning, Origin, Result};
use crate::key::{ConfigKey, legacy_key, suggest_key};

/// Embedded `config.yaml` shipped with the runtime data.
pub const EMBEDDED_CONFIG: &str = include_str!("../../../runtime/config.yaml");

/// A partial set of raw configuration values from one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLayer {
	origin: Origin,
	values: BTreeMap<ConfigKey, String>,
	/// Non-fatal warnings encountered during parsing.
	pub warnings: Vec<ConfigWarning>,
}

impl ConfigLayer {
	/// An empty layer attributed to `origin`.
	pub fn empty(origin: Origin) -> Self {
		Self {
			origin,
			values: BTreeMap::new(),
			warnings: Vec::new(),
		}
	}

	/// The built-in defaults: every key present.
	pub fn defaults() -> Self {
		Self::from_pairs(Origin::Default, ConfigKey::ALL.map(|key| (key, Some(default_value(key)))))
	}

	/// Builds a layer from optional values; `None` entries are left unset.
	pub fn from_pairs<I, S>(origin: Origin, pairs: I) -> Self
	where
		I: IntoIterator<Item = (ConfigKey, Option<S>)>,
		S: Into<String>,
	{
		let mut layer = Self::empty(origin);
		for (key, value) in pairs {
			if let Some(value) = value {
				layer.values.insert(key, value.into());
			}
		}
		layer
	}

	/// Parses a YAML document into a layer.
	///
	/// Unknown keys produce [`ConfigWarning`]s, never errors. `null` values are
	/// treated as absent.
	pub fn parse(input: &str, source_name: &str) -> Result<Self> {
		let doc: Value = serde_yaml::from_str(input).map_err(|error| ConfigError::Yaml {
			source_name: source_name.to_string(),
			error,
		})?;

		let mapping = match doc {
			Value::Null => return Ok(Self::empty(Origin::File)),
			Value::Mapping(mapping) => mapping,
			_ => {
				return Err(ConfigError::NotAMapping {
					source_name: source_name.to_string(),
				});
			}
		};

		let mut layer = Self::empty(Origin::File);
		for (raw_key, raw_value) in mapping {
			let Some(name) = scalar_to_string(&raw_key) else {
				return Err(ConfigError::NotAMapping {
					source_name: source_name.to_string(),
				});
			};

			let key = match ConfigKey::from_name(&name) {
				Some(key) => key,
				None => match legacy_key(&name) {
					Some(canonical) => {
						layer.warnings.push(ConfigWarning::LegacyKey {
							key: name.clone(),
							canonical,
						});
						// A canonical spelling in the same file wins over a legacy one.
						if layer.values.contains_key(&canonical) {
							continue;
						}
						canonical
					}
					None => {
						let suggestion = suggest_key(&name);
						layer.warnings.push(ConfigWarning::UnknownKey { key: name, suggestion });
						continue;
					}
				},
			};

			if matches!(raw_value, Value::Null) {
				continue;
			}
			let Some(value) = scalar_to_string(&raw_value) else {
				return Err(ConfigError::NotScalar {
					source_name: source_name.to_string(),
					key: name,
				});
			};
			layer.values.insert(key, value);
		}

		Ok(layer)
	}

	/// Loads a YAML configuration file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self> {
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
		Self::parse(&content, &path.display().to_string())
	}

	/// The file layer shipped with the runtime data.
	pub fn embedded() -> Result<Self> {
		Self::parse(EMBEDDED_CONFIG, "embedded config.yaml")
	}

	pub fn origin(&self) -> Origin {
		self.origin
	}

	pub fn get(&self, key: ConfigKey) -> Option<&str> {
		self.values.get(&key).map(String::as_str)
	}

	pub fn set(&mut self, key: ConfigKey, value: impl Into<String>) {
		self.values.insert(key, value.into());
	}

	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}

	/// Logs every collected warning.
	pub fn log_warnings(&self) {
		for warning in &self.warnings {
			warn!(origin = %self.origin, "{warning}");
		}
	}
}

fn scalar_to_string(value: &Value) -> Option<String> {
	match value {
		Value::String(s) => Some(s.clone()),
		Value::Number(n) => Some(n.to_string()),
		Value::Bool(b) => Some(b.to_string()),
		Value::Tagged(tagged) => scalar_to_string(&tagged.value),
		Value::Null | Value::Sequence(_) | Value::Mapping(_) => None,
	}
}

/// Raw values after merging layers, each remembering which layer supplied it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedConfig {
	values: BTreeMap<ConfigKey, (String, Origin)>,
}

impl MergedConfig {
	/// Merges `layers` in order: later layers override earlier ones.
	pub fn merge<'a>(layers: impl IntoIterator<Item = &'a ConfigLayer>) -> Self {
		let mut merged = Self::default();
		for layer in layers {
			merged.overlay(layer);
		}
		merged
	}

	/// Overlays one layer. Keys absent from `layer` keep their current value.
	pub fn overlay(&mut self, layer: &ConfigLayer) {
		for (key, value) in &layer.values {
			self.values.insert(*key, (value.clone(), layer.origin));
		}
	}

	pub fn get(&self, key: ConfigKey) -> Option<(&str, Origin)> {
		self.values.get(&key).map(|(value, origin)| (value.as_str(), *origin))
	}
}
