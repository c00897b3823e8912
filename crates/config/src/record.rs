//! The resolved configuration record.

use std::path::PathBuf;

use hailo_probe::{HailoArch, HostArch};
use serde::Serialize;

use crate::domain::TappasVariant;
use crate::key::ConfigKey;

/// A fully resolved configuration: no `auto`, every value inside its domain.
///
/// Only [`crate::Resolver`] constructs records from user input; tests and
/// callers with pre-validated values may build one directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigRecord {
	pub host_arch: HostArch,
	pub hailo_arch: HailoArch,
	pub hailort_version: String,
	pub tappas_version: String,
	pub tappas_variant: TappasVariant,
	pub model_zoo_version: String,
	pub server_url: String,
	pub resources_path: PathBuf,
	pub virtual_env_name: String,
	pub deb_whl_dir: PathBuf,
}

impl ConfigRecord {
	/// The value of `key` as it would be written in a file.
	pub fn get(&self, key: ConfigKey) -> String {
		match key {
			ConfigKey::HostArch => self.host_arch.to_string(),
			ConfigKey::HailoArch => self.hailo_arch.to_string(),
			ConfigKey::HailortVersion => self.hailort_version.clone(),
			ConfigKey::TappasVersion => self.tappas_version.clone(),
			ConfigKey::TappasVariant => self.tappas_variant.to_string(),
			ConfigKey::ModelZooVersion => self.model_zoo_version.clone(),
			ConfigKey::ServerUrl => self.server_url.clone(),
			ConfigKey::ResourcesPath => self.resources_path.display().to_string(),
			ConfigKey::VirtualEnvName => self.virtual_env_name.clone(),
			ConfigKey::DebWhlDir => self.deb_whl_dir.display().to_string(),
		}
	}

	/// All `(key, value)` pairs in canonical key order.
	pub fn entries(&self) -> impl Iterator<Item = (ConfigKey, String)> + '_ {
		ConfigKey::ALL.into_iter().map(|key| (key, self.get(key)))
	}

	/// `<resources_path>/models`
	pub fn model_dir(&self) -> PathBuf {
		self.resources_path.join("models")
	}

	/// `key=value` lines in canonical order.
	pub fn render(&self) -> String {
		self.entries().map(|(key, value)| format!("{key}={value}\n")).collect()
	}
}


#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn render_uses_canonical_order() {
		let rendered = fixtures::record().render();
		let keys: Vec<_> = rendered.lines().map(|l| l.split_once('=').unwrap().0).collect();
		assert_eq!(
			keys,
			vec![
				"host_arch",
				"hailo_arch",
				"hailort_version",
				"tappas_version",
				"tappas_variant",
				"model_zoo_version",
				"server_url",
				"resources_path",
				"virtual_env_name",
				"deb_whl_dir",
			]
		);
		assert!(rendered.contains("tappas_variant=hailo-tappas-core\n"));
	}

	#[test]
	fn model_dir_is_under_resources() {
		assert_eq!(fixtures::record().model_dir(), PathBuf::from("/usr/local/hailo/resources/models"));
	}
}
