//! Configuration resolution.
//!
//! Resolution runs in two passes over the merged layers:
//!
//! 1. **Validate.** Every value is checked against its key's domain. All
//!    violations are collected; if there are any, resolution stops before a
//!    single probe runs.
//! 2. **Settle.** Every key still at `auto` is derived, in order: an
//!    environment hint if one was captured, otherwise a system probe. Derived
//!    values are checked against the same domains. Every key that cannot be
//!    settled is reported, again all at once.
//!
//! The resolver holds no global state: the probe and the environment hints are
//! handed in, so the same inputs always produce the same record.

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use hailo_probe::{HailoArch, HostArch, SystemProbe};
use tracing::{debug, info, warn};

use crate::domain::{
	DEFAULT_MODEL_ZOO_VERSION, DEFAULT_RESOURCES_PATH, HAILORT_PACKAGE, TappasVariant, allowed_values, choices,
};
use crate::error::{ConfigError, ConfigWarning, Origin, Result, Violation};
use crate::key::{AUTO, ConfigKey, Setting};
use crate::layer::{ConfigLayer, MergedConfig};
use crate::paths::default_config_path;
use crate::record::ConfigRecord;

#[cfg(test)]
mod tests;

/// Values captured from the process environment that may stand in for
/// detection.
///
/// Hints only apply to keys left at `auto`; an explicit value in any layer
/// always wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvHints {
	/// `HOST_ARCH`, falling back to the older `DEVICE_ARCH`.
	pub host_arch: Option<String>,
	/// `HAILO_ARCH`.
	pub hailo_arch: Option<String>,
	/// `RESOURCES_PATH`.
	pub resources_path: Option<String>,
}

impl EnvHints {
	/// Captures hints from the current process environment.
	pub fn from_process() -> Self {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Captures hints through an arbitrary variable lookup.
	///
	/// Empty values and the literal `auto` are ignored.
	pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
		let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty() && value != AUTO);
		Self {
			host_arch: get("HOST_ARCH").or_else(|| get("DEVICE_ARCH")),
			hailo_arch: get("HAILO_ARCH"),
			resources_path: get("RESOURCES_PATH"),
		}
	}
}

/// Output of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
	pub record: ConfigRecord,
	/// Where each final value came from.
	pub origins: BTreeMap<ConfigKey, Origin>,
	/// Non-fatal warnings from every parsed layer.
	pub warnings: Vec<ConfigWarning>,
}

impl Resolution {
	pub fn origin(&self, key: ConfigKey) -> Origin {
		self.origins.get(&key).copied().unwrap_or(Origin::Default)
	}
}

/// Loads the file layer.
///
/// An explicit path must exist. Without one, the well-known path is used if it
/// exists, otherwise the embedded default file.
pub fn load_file_layer(explicit: Option<&Path>) -> Result<ConfigLayer> {
	if let Some(path) = explicit {
		return ConfigLayer::load(path);
	}

	let path = default_config_path();
	if path.is_file() {
		debug!(path = %path.display(), "loading default config file");
		ConfigLayer::load(&path)
	} else {
		debug!(path = %path.display(), "no config file at default path, using embedded defaults");
		ConfigLayer::embedded()
	}
}

/// Merges configuration layers and resolves every `auto` value.
pub struct Resolver<'a> {
	probe: &'a dyn SystemProbe,
	hints: EnvHints,
}

impl<'a> Resolver<'a> {
	pub fn new(probe: &'a dyn SystemProbe) -> Self {
		Self {
			probe,
			hints: EnvHints::default(),
		}
	}

	pub fn with_hints(mut self, hints: EnvHints) -> Self {
		self.hints = hints;
		self
	}

	/// Resolves `defaults`, then the config file, then `cli`.
	///
	/// `config_path` names an explicit file; see [`load_file_layer`] for the
	/// fallback when it is `None`.
	pub fn resolve(&self, defaults: &ConfigLayer, config_path: Option<&Path>, cli: &ConfigLayer) -> Result<Resolution> {
		let file = load_file_layer(config_path)?;
		self.resolve_layers(&[defaults, &file, cli])
	}

	/// Resolves already-loaded layers, later layers taking precedence.
	pub fn resolve_layers(&self, layers: &[&ConfigLayer]) -> Result<Resolution> {
		for layer in layers {
			layer.log_warnings();
		}
		let warnings = layers.iter().flat_map(|layer| layer.warnings.iter().cloned()).collect();

		let merged = MergedConfig::merge(layers.iter().copied());
		let (record, origins) = self.resolve_merged(&merged)?;

		info!(hailo_arch = %record.hailo_arch, host_arch = %record.host_arch, "configuration resolved");
		Ok(Resolution {
			record,
			origins,
			warnings,
		})
	}

	fn resolve_merged(&self, merged: &MergedConfig) -> Result<(ConfigRecord, BTreeMap<ConfigKey, Origin>)> {
		let mut violations = Vec::new();

		let host_arch = parse_field(merged, ConfigKey::HostArch, &mut violations, parse_enum::<HostArch>);
		let hailo_arch = parse_field(merged, ConfigKey::HailoArch, &mut violations, parse_enum::<HailoArch>);
		let hailort_version = parse_field(merged, ConfigKey::HailortVersion, &mut violations, listed(ConfigKey::HailortVersion));
		let tappas_version = parse_field(merged, ConfigKey::TappasVersion, &mut violations, listed(ConfigKey::TappasVersion));
		let tappas_variant = parse_field(merged, ConfigKey::TappasVariant, &mut violations, parse_enum::<TappasVariant>);
		let model_zoo_version = parse_field(merged, ConfigKey::ModelZooVersion, &mut violations, listed(ConfigKey::ModelZooVersion));
		let server_url = parse_field(merged, ConfigKey::ServerUrl, &mut violations, listed(ConfigKey::ServerUrl));
		let resources_path = parse_field(merged, ConfigKey::ResourcesPath, &mut violations, free_form);
		let virtual_env_name = parse_field(merged, ConfigKey::VirtualEnvName, &mut violations, free_form);
		let deb_whl_dir = parse_field(merged, ConfigKey::DebWhlDir, &mut violations, free_form);

		if !violations.is_empty() {
			return Err(ConfigError::Invalid(violations));
		}

		let mut settle = Settle::default();

		let host_arch = settle.field(ConfigKey::HostArch, host_arch, || self.detect_host_arch());
		let hailo_arch = settle.field(ConfigKey::HailoArch, hailo_arch, || self.detect_hailo_arch());
		let tappas_variant = settle.field(ConfigKey::TappasVariant, tappas_variant, || self.detect_tappas_variant());
		let tappas_version = settle.field(ConfigKey::TappasVersion, tappas_version, || match tappas_variant {
			Some(variant) => self.detect_version(ConfigKey::TappasVersion, variant.package_name()),
			None => Err(unresolved(ConfigKey::TappasVersion, "tappas_variant could not be resolved")),
		});
		let hailort_version = settle.field(ConfigKey::HailortVersion, hailort_version, || {
			self.detect_version(ConfigKey::HailortVersion, HAILORT_PACKAGE)
		});
		let model_zoo_version = settle.field(ConfigKey::ModelZooVersion, model_zoo_version, || {
			info!(version = DEFAULT_MODEL_ZOO_VERSION, "model_zoo_version is auto, using built-in default");
			Ok((DEFAULT_MODEL_ZOO_VERSION.to_string(), Origin::Default))
		});
		let server_url = settle.field(ConfigKey::ServerUrl, server_url, || Err(no_automatic_value(ConfigKey::ServerUrl)));
		let resources_path = settle.field(ConfigKey::ResourcesPath, resources_path, || Ok(self.default_resources_path()));
		let virtual_env_name = settle.field(ConfigKey::VirtualEnvName, virtual_env_name, || {
			Err(no_automatic_value(ConfigKey::VirtualEnvName))
		});
		let deb_whl_dir = settle.field(ConfigKey::DebWhlDir, deb_whl_dir, || Err(no_automatic_value(ConfigKey::DebWhlDir)));

		let Settle { origins, violations } = settle;
		let (
			Some(host_arch),
			Some(hailo_arch),
			Some(hailort_version),
			Some(tappas_version),
			Some(tappas_variant),
			Some(model_zoo_version),
			Some(server_url),
			Some(resources_path),
			Some(virtual_env_name),
			Some(deb_whl_dir),
		) = (
			host_arch,
			hailo_arch,
			hailort_version,
			tappas_version,
			tappas_variant,
			model_zoo_version,
			server_url,
			resources_path,
			virtual_env_name,
			deb_whl_dir,
		)
		else {
			return Err(ConfigError::Invalid(violations));
		};

		let record = ConfigRecord {
			host_arch,
			hailo_arch,
			hailort_version,
			tappas_version,
			tappas_variant,
			model_zoo_version,
			server_url,
			resources_path: resources_path.into(),
			virtual_env_name,
			deb_whl_dir: deb_whl_dir.into(),
		};
		Ok((record, origins))
	}

	fn detect_host_arch(&self) -> Detected<HostArch> {
		if let Some(hint) = &self.hints.host_arch {
			return from_hint(ConfigKey::HostArch, hint, parse_enum::<HostArch>);
		}
		let arch = self.probe.host_arch();
		if arch == HostArch::Unknown {
			warn!("host architecture could not be classified");
		}
		Ok((arch, Origin::Detected))
	}

	fn detect_hailo_arch(&self) -> Detected<HailoArch> {
		if let Some(hint) = &self.hints.hailo_arch {
			return from_hint(ConfigKey::HailoArch, hint, parse_enum::<HailoArch>);
		}
		self.probe.hailo_arch().map(|arch| (arch, Origin::Detected)).ok_or_else(|| {
			unresolved(
				ConfigKey::HailoArch,
				"accelerator identification failed (is hailortcli installed and a device attached?)",
			)
		})
	}

	fn detect_tappas_variant(&self) -> Detected<TappasVariant> {
		TappasVariant::PRIORITY
			.into_iter()
			.find(|variant| self.probe.is_package_installed(variant.package_name()))
			.map(|variant| (variant, Origin::Detected))
			.ok_or_else(|| {
				let names: Vec<_> = TappasVariant::PRIORITY.iter().map(|v| v.package_name()).collect();
				unresolved(ConfigKey::TappasVariant, &format!("none of {} is installed", names.join(", ")))
			})
	}

	fn detect_version(&self, key: ConfigKey, package: &str) -> Detected<String> {
		let Some(version) = self.probe.package_version(package) else {
			return Err(unresolved(key, &format!("package {package} is not installed")));
		};
		match listed(key)(&version) {
			Some(version) => Ok((version, Origin::Detected)),
			None => Err(not_allowed(key, &version, Origin::Detected)),
		}
	}

	fn default_resources_path(&self) -> (String, Origin) {
		match &self.hints.resources_path {
			Some(path) => (path.clone(), Origin::Environment),
			None => (DEFAULT_RESOURCES_PATH.to_string(), Origin::Default),
		}
	}
}

type Detected<T> = std::result::Result<(T, Origin), Violation>;

/// A parsed but not yet settled value.
struct Field<T> {
	setting: Setting<T>,
	origin: Origin,
}

/// Accumulates settled values' origins and the violations of those that failed.
#[derive(Default)]
struct Settle {
	origins: BTreeMap<ConfigKey, Origin>,
	violations: Vec<Violation>,
}

impl Settle {
	fn field<T>(&mut self, key: ConfigKey, field: Field<T>, detect: impl FnOnce() -> Detected<T>) -> Option<T> {
		let (value, origin) = match field.setting {
			Setting::Value(value) => (value, field.origin),
			Setting::Auto => match detect() {
				Ok(detected) => detected,
				Err(violation) => {
					warn!(%key, "{violation}");
					self.violations.push(violation);
					return None;
				}
			},
		};
		self.origins.insert(key, origin);
		Some(value)
	}
}

/// Parses the merged raw value of `key`.
///
/// On a violation the returned field is a placeholder; resolution aborts after
/// the validation pass so it is never settled.
fn parse_field<T>(
	merged: &MergedConfig,
	key: ConfigKey,
	violations: &mut Vec<Violation>,
	parse: impl Fn(&str) -> Option<T>,
) -> Field<T> {
	let Some((raw, origin)) = merged.get(key) else {
		if !key.accepts_auto() {
			violations.push(no_automatic_value(key));
		}
		return Field {
			setting: Setting::Auto,
			origin: Origin::Default,
		};
	};

	// `auto` is an ordinary value for keys that cannot be detected.
	let parsed = if key.accepts_auto() {
		Setting::parse(raw, |raw| parse(raw).ok_or(()))
	} else {
		parse(raw).map(Setting::Value).ok_or(())
	};
	match parsed {
		Ok(setting) => Field { setting, origin },
		Err(()) => {
			violations.push(not_allowed(key, raw, origin));
			Field {
				setting: Setting::Auto,
				origin,
			}
		}
	}
}

fn parse_enum<T: FromStr>(raw: &str) -> Option<T> {
	T::from_str(raw).ok()
}

fn listed(key: ConfigKey) -> impl Fn(&str) -> Option<String> {
	move |raw| {
		allowed_values(key)
			.is_some_and(|allowed| allowed.iter().any(|value| *value == raw))
			.then(|| raw.to_string())
	}
}

fn free_form(raw: &str) -> Option<String> {
	(!raw.trim().is_empty()).then(|| raw.to_string())
}

fn from_hint<T>(key: ConfigKey, hint: &str, parse: impl Fn(&str) -> Option<T>) -> Detected<T> {
	debug!(%key, hint, "using environment hint");
	parse(hint)
		.map(|value| (value, Origin::Environment))
		.ok_or_else(|| not_allowed(key, hint, Origin::Environment))
}

fn not_allowed(key: ConfigKey, value: &str, origin: Origin) -> Violation {
	match choices(key) {
		Some(allowed) => Violation::NotAllowed {
			key,
			value: value.to_string(),
			origin,
			allowed,
		},
		None => Violation::Empty { key, origin },
	}
}

fn unresolved(key: ConfigKey, reason: &str) -> Violation {
	Violation::Unresolved {
		key,
		reason: reason.to_string(),
	}
}

fn no_automatic_value(key: ConfigKey) -> Violation {
	unresolved(key, "no value configured and no automatic value exists")
}
