use std::cell::Cell;
use std::collections::HashMap;

use pretty_assertions::assert_eq;

use super::*;
use crate::error::Violation;

#[derive(Default)]
struct FakeProbe {
	host: Option<HostArch>,
	hailo: Option<HailoArch>,
	packages: HashMap<&'static str, &'static str>,
	identify_calls: Cell<usize>,
}

impl FakeProbe {
	fn installed(mut self, package: &'static str, version: &'static str) -> Self {
		self.packages.insert(package, version);
		self
	}

	fn hailo(mut self, arch: HailoArch) -> Self {
		self.hailo = Some(arch);
		self
	}
}

impl SystemProbe for FakeProbe {
	fn host_arch(&self) -> HostArch {
		self.host.unwrap_or(HostArch::X86)
	}

	fn hailo_arch(&self) -> Option<HailoArch> {
		self.identify_calls.set(self.identify_calls.get() + 1);
		self.hailo
	}

	fn package_version(&self, package: &str) -> Option<String> {
		self.packages.get(package).map(|v| v.to_string())
	}

	fn pkg_config_variable(&self, _package: &str, _variable: &str) -> Option<String> {
		None
	}
}

fn installed_system() -> FakeProbe {
	FakeProbe::default()
		.hailo(HailoArch::Hailo8)
		.installed("hailort", "4.20.0")
		.installed("hailo-tappas-core", "3.31.0")
}

fn file(yaml: &str) -> ConfigLayer {
	ConfigLayer::parse(yaml, "test").unwrap()
}

fn cli(pairs: &[(ConfigKey, &str)]) -> ConfigLayer {
	ConfigLayer::from_pairs(Origin::Cli, pairs.iter().map(|(k, v)| (*k, Some(*v))))
}

fn resolve(probe: &FakeProbe, layers: &[&ConfigLayer]) -> Result<Resolution> {
	Resolver::new(probe).resolve_layers(layers)
}

#[test]
fn defaults_resolve_on_installed_system() {
	let probe = installed_system();
	let resolution = resolve(&probe, &[&ConfigLayer::defaults()]).unwrap();
	let record = resolution.record;

	assert_eq!(record.host_arch, HostArch::X86);
	assert_eq!(record.hailo_arch, HailoArch::Hailo8);
	assert_eq!(record.hailort_version, "4.20.0");
	assert_eq!(record.tappas_variant, TappasVariant::HailoTappasCore);
	assert_eq!(record.tappas_version, "3.31.0");
	assert_eq!(record.model_zoo_version, "v2.14.0");
	assert_eq!(record.resources_path, std::path::PathBuf::from(DEFAULT_RESOURCES_PATH));
	assert_eq!(resolution.origins[&ConfigKey::HailoArch], Origin::Detected);
	assert_eq!(resolution.origins[&ConfigKey::ServerUrl], Origin::Default);
}

#[test]
fn explicit_values_override_detection() {
	let probe = installed_system();
	let resolution = resolve(
		&probe,
		&[
			&ConfigLayer::defaults(),
			&file("hailo_arch: hailo8l\n"),
			&cli(&[(ConfigKey::HostArch, "rpi")]),
		],
	)
	.unwrap();

	assert_eq!(resolution.record.hailo_arch, HailoArch::Hailo8l);
	assert_eq!(resolution.record.host_arch, HostArch::Rpi);
	assert_eq!(resolution.origin(ConfigKey::HailoArch), Origin::File);
	assert_eq!(resolution.origin(ConfigKey::HostArch), Origin::Cli);
	assert_eq!(probe.identify_calls.get(), 0);
}

#[test]
fn cli_overrides_file() {
	let probe = installed_system();
	let resolution = resolve(
		&probe,
		&[
			&ConfigLayer::defaults(),
			&file("hailo_arch: hailo8l\n"),
			&cli(&[(ConfigKey::HailoArch, "hailo8")]),
		],
	)
	.unwrap();
	assert_eq!(resolution.record.hailo_arch, HailoArch::Hailo8);
}

#[test]
fn every_invalid_value_is_reported_before_probing() {
	let probe = installed_system();
	let err = resolve(
		&probe,
		&[
			&ConfigLayer::defaults(),
			&file("hailort_version: 9.9.9\ntappas_variant: tappas\n"),
		],
	)
	.unwrap_err();

	let violations = err.violations();
	assert_eq!(violations.len(), 2);
	assert_eq!(violations[0].key(), ConfigKey::HailortVersion);
	assert_eq!(violations[1].key(), ConfigKey::TappasVariant);
	assert!(matches!(
		&violations[0],
		Violation::NotAllowed { value, origin: Origin::File, allowed, .. }
			if value == "9.9.9" && allowed.contains(&"4.20.0")
	));
	assert_eq!(probe.identify_calls.get(), 0);
}

#[test]
fn server_url_rejects_auto_and_unknown_urls() {
	let probe = installed_system();
	let err = resolve(
		&probe,
		&[&ConfigLayer::defaults(), &cli(&[(ConfigKey::ServerUrl, "auto")])],
	)
	.unwrap_err();
	assert!(matches!(err.violations(), [Violation::NotAllowed { key: ConfigKey::ServerUrl, .. }]));

	let err = resolve(
		&probe,
		&[&ConfigLayer::defaults(), &cli(&[(ConfigKey::ServerUrl, "http://example.com")])],
	)
	.unwrap_err();
	assert_eq!(err.violations().len(), 1);
}

#[test]
fn empty_free_form_values_are_rejected() {
	let probe = installed_system();
	let err = resolve(&probe, &[&ConfigLayer::defaults(), &file("virtual_env_name: ''\n")]).unwrap_err();
	assert!(matches!(
		err.violations(),
		[Violation::Empty { key: ConfigKey::VirtualEnvName, origin: Origin::File }]
	));
}

#[test]
fn auto_is_a_plain_name_where_nothing_is_detected() {
	let probe = installed_system();
	let resolution = resolve(&probe, &[&ConfigLayer::defaults(), &file("virtual_env_name: auto\n")]).unwrap();
	assert_eq!(resolution.record.virtual_env_name, "auto");
}

#[test]
fn undetectable_accelerator_fails_closed() {
	let probe = FakeProbe::default()
		.installed("hailort", "4.20.0")
		.installed("hailo-tappas-core", "3.31.0");
	let err = resolve(&probe, &[&ConfigLayer::defaults()]).unwrap_err();
	assert!(matches!(err.violations(), [Violation::Unresolved { key: ConfigKey::HailoArch, .. }]));
	assert!(err.to_string().contains("--hailo-arch"));
}

#[test]
fn unresolved_keys_are_reported_together() {
	let probe = FakeProbe::default();
	let err = resolve(&probe, &[&ConfigLayer::defaults()]).unwrap_err();
	let keys: Vec<_> = err.violations().iter().map(Violation::key).collect();
	assert_eq!(
		keys,
		vec![
			ConfigKey::HailoArch,
			ConfigKey::TappasVariant,
			ConfigKey::TappasVersion,
			ConfigKey::HailortVersion,
		]
	);
}

#[test]
fn full_tappas_wins_over_core() {
	let probe = installed_system().installed("hailo-tappas", "3.30.0");
	let record = resolve(&probe, &[&ConfigLayer::defaults()]).unwrap().record;
	assert_eq!(record.tappas_variant, TappasVariant::HailoTappas);
	assert_eq!(record.tappas_version, "3.30.0");
}

#[test]
fn tappas_version_follows_explicit_variant() {
	let probe = installed_system().installed("hailo-tappas", "3.30.0");
	let record = resolve(
		&probe,
		&[&ConfigLayer::defaults(), &cli(&[(ConfigKey::TappasVariant, "hailo-tappas-core")])],
	)
	.unwrap()
	.record;
	assert_eq!(record.tappas_version, "3.31.0");
}

#[test]
fn detected_version_outside_allow_list_is_rejected() {
	let probe = FakeProbe::default()
		.hailo(HailoArch::Hailo8)
		.installed("hailort", "4.17.1")
		.installed("hailo-tappas-core", "3.31.0");
	let err = resolve(&probe, &[&ConfigLayer::defaults()]).unwrap_err();
	assert!(matches!(
		err.violations(),
		[Violation::NotAllowed { key: ConfigKey::HailortVersion, origin: Origin::Detected, .. }]
	));
}

#[test]
fn environment_hints_replace_detection() {
	let probe = installed_system();
	let hints = EnvHints {
		hailo_arch: Some("hailo8l".into()),
		host_arch: Some("arm".into()),
		resources_path: Some("/srv/hailo".into()),
	};
	let resolution = Resolver::new(&probe)
		.with_hints(hints)
		.resolve_layers(&[&ConfigLayer::defaults(), &file("resources_path: auto\n")])
		.unwrap();

	assert_eq!(resolution.record.hailo_arch, HailoArch::Hailo8l);
	assert_eq!(resolution.record.host_arch, HostArch::Arm);
	assert_eq!(resolution.record.resources_path, std::path::PathBuf::from("/srv/hailo"));
	assert_eq!(resolution.origin(ConfigKey::HailoArch), Origin::Environment);
	assert_eq!(probe.identify_calls.get(), 0);
}

#[test]
fn bad_hint_is_a_violation() {
	let probe = installed_system();
	let hints = EnvHints {
		hailo_arch: Some("hailo10h".into()),
		..EnvHints::default()
	};
	let err = Resolver::new(&probe)
		.with_hints(hints)
		.resolve_layers(&[&ConfigLayer::defaults()])
		.unwrap_err();
	assert!(matches!(
		err.violations(),
		[Violation::NotAllowed { key: ConfigKey::HailoArch, origin: Origin::Environment, .. }]
	));
}

#[test]
fn hints_ignore_empty_and_auto() {
	let env: HashMap<&str, &str> = [("HAILO_ARCH", "auto"), ("DEVICE_ARCH", "rpi"), ("RESOURCES_PATH", " ")].into();
	let hints = EnvHints::from_lookup(|name| env.get(name).map(|v| v.to_string()));
	assert_eq!(
		hints,
		EnvHints {
			host_arch: Some("rpi".into()),
			hailo_arch: None,
			resources_path: None,
		}
	);
}

#[test]
fn resolution_is_deterministic() {
	let probe = installed_system();
	let layers = [&ConfigLayer::defaults(), &file("tappas_variant: auto\n")];
	let first = resolve(&probe, &layers).unwrap();
	let second = resolve(&probe, &layers).unwrap();
	assert_eq!(first, second);
}

#[test]
fn layer_warnings_are_carried_through() {
	let probe = installed_system();
	let resolution = resolve(&probe, &[&ConfigLayer::defaults(), &file("resource_path: /data\n")]).unwrap();
	assert_eq!(resolution.warnings.len(), 1);
	assert_eq!(resolution.record.resources_path, std::path::PathBuf::from("/data"));
}

#[test]
fn explicit_missing_config_file_is_an_error() {
	let dir = tempfile::tempdir().unwrap();
	let probe = installed_system();
	let err = Resolver::new(&probe)
		.resolve(&ConfigLayer::defaults(), Some(&dir.path().join("missing.yaml")), &ConfigLayer::empty(Origin::Cli))
		.unwrap_err();
	assert!(matches!(err, ConfigError::MissingFile(_)));
}
