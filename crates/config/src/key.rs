//! Configuration keys and the `auto` sentinel.

use std::fmt;

use serde::Serialize;
use strum::{EnumIter, IntoStaticStr, VariantNames};

/// Literal used in files and on the command line to request detection.
pub const AUTO: &str = "auto";

/// One of the fixed set of configuration keys.
///
/// Declaration order is the canonical order used for printing and for the
/// persisted environment snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[derive(EnumIter, IntoStaticStr, VariantNames)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConfigKey {
	HostArch,
	HailoArch,
	HailortVersion,
	TappasVersion,
	TappasVariant,
	ModelZooVersion,
	ServerUrl,
	ResourcesPath,
	VirtualEnvName,
	DebWhlDir,
}

impl ConfigKey {
	pub const ALL: [ConfigKey; 10] = [
		ConfigKey::HostArch,
		ConfigKey::HailoArch,
		ConfigKey::HailortVersion,
		ConfigKey::TappasVersion,
		ConfigKey::TappasVariant,
		ConfigKey::ModelZooVersion,
		ConfigKey::ServerUrl,
		ConfigKey::ResourcesPath,
		ConfigKey::VirtualEnvName,
		ConfigKey::DebWhlDir,
	];

	/// Key as written in the YAML file (`host_arch`).
	pub fn name(self) -> &'static str {
		self.into()
	}

	/// Upper-cased key used in the environment snapshot (`HOST_ARCH`).
	pub fn env_name(self) -> String {
		self.name().to_ascii_uppercase()
	}

	/// Long CLI flag without dashes (`host-arch`).
	pub fn flag(self) -> String {
		self.name().replace('_', "-")
	}

	/// Looks up a canonical key by its file name.
	pub fn from_name(name: &str) -> Option<ConfigKey> {
		Self::ALL.into_iter().find(|key| key.name() == name)
	}

	/// Whether `auto` is meaningful for this key.
	pub fn accepts_auto(self) -> bool {
		!matches!(self, Self::ServerUrl | Self::VirtualEnvName | Self::DebWhlDir)
	}
}

impl fmt::Display for ConfigKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// Keys written by earlier releases, mapped to their canonical replacement.
const LEGACY_KEYS: &[(&str, ConfigKey)] = &[
	("device_arch", ConfigKey::HostArch),
	("resource_path", ConfigKey::ResourcesPath),
	("storage_dir", ConfigKey::DebWhlDir),
];

/// Maps a legacy key spelling to its canonical key.
pub fn legacy_key(name: &str) -> Option<ConfigKey> {
	LEGACY_KEYS.iter().find(|(legacy, _)| *legacy == name).map(|(_, key)| *key)
}

/// Suggests the closest canonical key for a misspelt one.
pub fn suggest_key(name: &str) -> Option<&'static str> {
	ConfigKey::VARIANTS
		.iter()
		.copied()
		.min_by_key(|k| strsim::levenshtein(name, k))
		.filter(|k| strsim::levenshtein(name, k) <= 3)
}

/// A value that is either concrete or left for resolution to detect.
///
/// `auto` only exists at the parse boundary. Resolution turns every
/// [`Setting::Auto`] into a concrete value or reports it as unresolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Setting<T> {
	Auto,
	Value(T),
}

impl<T> Setting<T> {
	/// Parses a raw string, mapping the literal `auto` to [`Setting::Auto`].
	pub fn parse<E>(raw: &str, parse: impl FnOnce(&str) -> Result<T, E>) -> Result<Self, E> {
		if raw == AUTO {
			Ok(Self::Auto)
		} else {
			parse(raw).map(Self::Value)
		}
	}

	pub fn value(self) -> Option<T> {
		match self {
			Self::Auto => None,
			Self::Value(value) => Some(value),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn key_spellings() {
		assert_eq!(ConfigKey::HailortVersion.name(), "hailort_version");
		assert_eq!(ConfigKey::HailortVersion.env_name(), "HAILORT_VERSION");
		assert_eq!(ConfigKey::DebWhlDir.flag(), "deb-whl-dir");
		assert_eq!(ConfigKey::from_name("model_zoo_version"), Some(ConfigKey::ModelZooVersion));
		assert_eq!(ConfigKey::from_name("MODEL_ZOO_VERSION"), None);
	}

	#[test]
	fn all_matches_declaration_order() {
		use strum::IntoEnumIterator;
		assert_eq!(ConfigKey::iter().collect::<Vec<_>>(), ConfigKey::ALL.to_vec());
	}

	#[test]
	fn legacy_and_suggestions() {
		assert_eq!(legacy_key("resource_path"), Some(ConfigKey::ResourcesPath));
		assert_eq!(legacy_key("resources_path"), None);
		assert_eq!(suggest_key("hailo_ach"), Some("hailo_arch"));
		assert_eq!(suggest_key("completely_unrelated_key"), None);
	}

	#[test]
	fn setting_parse() {
		let auto: Setting<u8> = Setting::parse("auto", |s| s.parse::<u8>()).unwrap();
		assert_eq!(auto, Setting::Auto);
		let value: Setting<u8> = Setting::parse("7", |s| s.parse::<u8>()).unwrap();
		assert_eq!(value.value(), Some(7));
		assert!(Setting::<u8>::parse("x", |s| s.parse::<u8>()).is_err());
	}
}
