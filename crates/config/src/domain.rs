//! Allowed values and built-in defaults for every configuration key.

use hailo_probe::{HailoArch, HostArch};
use serde::Serialize;
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};

use crate::key::{AUTO, ConfigKey};

pub const VALID_HAILORT_VERSIONS: &[&str] = &["4.20.0", "4.21.0", "4.22.0"];
pub const VALID_TAPPAS_VERSIONS: &[&str] = &["3.30.0", "3.31.0", "3.32.0"];
pub const VALID_MODEL_ZOO_VERSIONS: &[&str] = &["v2.13.0", "v2.14.0", "v2.15.0"];
pub const VALID_SERVER_URLS: &[&str] = &["http://dev-public.hailo.ai/2025_01"];

pub const DEFAULT_MODEL_ZOO_VERSION: &str = "v2.14.0";
pub const DEFAULT_SERVER_URL: &str = "http://dev-public.hailo.ai/2025_01";
pub const DEFAULT_RESOURCES_PATH: &str = "/usr/local/hailo/resources";
pub const DEFAULT_VIRTUAL_ENV_NAME: &str = "hailo_infra_venv";
pub const DEFAULT_DEB_WHL_DIR: &str = "deb_whl_dir";

/// Package providing the accelerator runtime.
pub const HAILORT_PACKAGE: &str = "hailort";

/// Which compute-library package provides the post-process stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[derive(Display, EnumString, EnumIter, IntoStaticStr, VariantNames)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum TappasVariant {
	HailoTappas,
	HailoTappasCore,
}

impl TappasVariant {
	/// Detection priority when the variant is `auto`.
	pub const PRIORITY: [TappasVariant; 2] = [TappasVariant::HailoTappas, TappasVariant::HailoTappasCore];

	/// Installed package name, identical to the configuration spelling.
	pub fn package_name(self) -> &'static str {
		self.into()
	}
}

/// Built-in default for `key`, as it would be written in a file.
pub fn default_value(key: ConfigKey) -> &'static str {
	match key {
		ConfigKey::ModelZooVersion => DEFAULT_MODEL_ZOO_VERSION,
		ConfigKey::ServerUrl => DEFAULT_SERVER_URL,
		ConfigKey::ResourcesPath => DEFAULT_RESOURCES_PATH,
		ConfigKey::VirtualEnvName => DEFAULT_VIRTUAL_ENV_NAME,
		ConfigKey::DebWhlDir => DEFAULT_DEB_WHL_DIR,
		ConfigKey::HostArch
		| ConfigKey::HailoArch
		| ConfigKey::HailortVersion
		| ConfigKey::TappasVersion
		| ConfigKey::TappasVariant => AUTO,
	}
}

/// Concrete values allowed for an enumerated key, excluding `auto`.
///
/// Returns `None` for free-form keys (paths and names).
pub fn allowed_values(key: ConfigKey) -> Option<&'static [&'static str]> {
	match key {
		ConfigKey::HostArch => Some(HostArch::VARIANTS),
		ConfigKey::HailoArch => Some(HailoArch::VARIANTS),
		ConfigKey::HailortVersion => Some(VALID_HAILORT_VERSIONS),
		ConfigKey::TappasVersion => Some(VALID_TAPPAS_VERSIONS),
		ConfigKey::TappasVariant => Some(TappasVariant::VARIANTS),
		ConfigKey::ModelZooVersion => Some(VALID_MODEL_ZOO_VERSIONS),
		ConfigKey::ServerUrl => Some(VALID_SERVER_URLS),
		ConfigKey::ResourcesPath | ConfigKey::VirtualEnvName | ConfigKey::DebWhlDir => None,
	}
}

/// Values a user may write for `key`: `auto` (where meaningful) followed by
/// the concrete allow-list.
pub fn choices(key: ConfigKey) -> Option<Vec<&'static str>> {
	allowed_values(key).map(|values| {
		let auto = key.accepts_auto().then_some(AUTO);
		auto.into_iter().chain(values.iter().copied()).collect()
	})
}
