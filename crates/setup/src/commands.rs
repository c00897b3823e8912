//! Subcommand implementations.

use std::path::{Path, PathBuf};

use hailo_config::{
	ConfigKey, ConfigLayer, ConfigRecord, EnvHints, EnvironmentSnapshot, Materialized, Origin, Resolution, Resolver, default_env_file, materialize,
};
use hailo_probe::{LocalSystem, SystemProbe};
use hailo_resources::{
	FetchReport, HttpDownloader, ResourceRequest, default_jobs, fetch_parallel, link_resources, load_catalog_from,
	plan_resources, prepare_resource_dirs,
};
use tracing::info;

use crate::cli::{Cli, Command, DownloadArgs, PostInstallArgs, SetEnvArgs};

pub fn run(cli: Cli) -> anyhow::Result<()> {
	let probe = LocalSystem::default();
	let resolution = Resolver::new(&probe)
		.with_hints(EnvHints::from_process())
		.resolve(&ConfigLayer::defaults(), cli.config.as_deref(), &cli.overrides.layer())?;

	match cli.command {
		Command::Resolve { json } => print_resolution(&resolution, json),
		Command::Get { key } => {
			println!("{}", resolution.record.get(key));
			Ok(())
		}
		Command::Validate => {
			print_summary(&resolution);
			Ok(())
		}
		Command::SetEnv(args) => set_env(&resolution, &args, &probe),
		Command::Download(args) => download(&resolution, &args),
		Command::PostInstall(args) => post_install(&resolution, &args, &probe),
	}
}

fn print_resolution(resolution: &Resolution, json: bool) -> anyhow::Result<()> {
	if json {
		println!("{}", serde_json::to_string_pretty(&resolution.record)?);
	} else {
		print!("{}", resolution.record.render());
	}
	Ok(())
}

/// How many final values were set by the user, derived, or left at defaults.
#[derive(Debug, Default, PartialEq, Eq)]
struct Tally {
	explicit: usize,
	derived: usize,
	defaults: usize,
}

impl Tally {
	fn of(resolution: &Resolution) -> Self {
		let mut tally = Self::default();
		for key in ConfigKey::ALL {
			match resolution.origin(key) {
				Origin::File | Origin::Cli => tally.explicit += 1,
				Origin::Detected | Origin::Environment => tally.derived += 1,
				Origin::Default => tally.defaults += 1,
			}
		}
		tally
	}
}

fn print_summary(resolution: &Resolution) {
	let width = ConfigKey::ALL.iter().map(|key| key.name().len()).max().unwrap_or(0);
	for (key, value) in resolution.record.entries() {
		println!("{:<width$}  {value}  ({})", key.name(), resolution.origin(key));
	}
	let Tally {
		explicit,
		derived,
		defaults,
	} = Tally::of(resolution);
	println!("configuration is valid: {explicit} explicit, {derived} derived, {defaults} default");
}

fn env_file(explicit: Option<&PathBuf>) -> PathBuf {
	explicit.cloned().unwrap_or_else(default_env_file)
}

fn set_env(resolution: &Resolution, args: &SetEnvArgs, probe: &LocalSystem) -> anyhow::Result<()> {
	let path = env_file(args.env_file.as_ref());
	match materialize(&resolution.record, args.refresh, &path, probe)? {
		Materialized::Reused(path) => println!("{} already exists (use --refresh to rewrite)", path.display()),
		Materialized::Written(_) => println!("wrote {}", path.display()),
	}
	Ok(())
}

fn download(resolution: &Resolution, args: &DownloadArgs) -> anyhow::Result<()> {
	let catalog = load_catalog_from(args.catalog.as_deref())?;
	let request = ResourceRequest {
		group: args.group.as_deref(),
		names: &args.names,
		videos: !args.no_videos,
	};
	let plan = plan_resources(&catalog, &resolution.record, request)?;
	let jobs = args.jobs.map_or_else(default_jobs, usize::from);

	info!(entries = plan.len(), jobs, "fetching resources");
	let report = fetch_parallel(&plan, &HttpDownloader::default(), jobs).into_result()?;
	print_report(&report);
	Ok(())
}

fn post_install(resolution: &Resolution, args: &PostInstallArgs, probe: &LocalSystem) -> anyhow::Result<()> {
	let record = &resolution.record;

	let path = env_file(args.env_file.as_ref());
	publish_environment(record, args.refresh, &path, probe)?.apply_to_process();

	prepare_resource_dirs(&record.resources_path)?;
	if let Some(link) = &args.link {
		link_resources(link, &record.resources_path)?;
	}

	let catalog = load_catalog_from(args.catalog.as_deref())?;
	let plan = plan_resources(&catalog, record, ResourceRequest::group(args.group.as_deref()))?;
	let report = fetch_parallel(&plan, &HttpDownloader::default(), default_jobs()).into_result()?;
	print_report(&report);
	Ok(())
}

/// Materializes the snapshot and returns whatever is now on disk. An existing
/// snapshot is kept unless `refresh` is set.
fn publish_environment(record: &ConfigRecord, refresh: bool, path: &Path, probe: &dyn SystemProbe) -> anyhow::Result<EnvironmentSnapshot> {
	match materialize(record, refresh, path, probe)? {
		Materialized::Written(snapshot) => {
			println!("wrote {}", path.display());
			Ok(snapshot)
		}
		Materialized::Reused(path) => {
			println!("kept {} (use --refresh to rewrite)", path.display());
			Ok(EnvironmentSnapshot::read(path)?)
		}
	}
}

fn print_report(report: &FetchReport) {
	println!("{} downloaded, {} already present", report.downloaded(), report.present());
}

#[cfg(test)]
mod tests {
	use std::collections::BTreeMap;

	use hailo_probe::{HailoArch, HostArch};
	use pretty_assertions::assert_eq;

	use super::*;

	struct Installed;

	impl SystemProbe for Installed {
		fn host_arch(&self) -> HostArch {
			HostArch::X86
		}

		fn hailo_arch(&self) -> Option<HailoArch> {
			Some(HailoArch::Hailo8)
		}

		fn package_version(&self, package: &str) -> Option<String> {
			match package {
				"hailort" => Some("4.20.0".to_string()),
				"hailo-tappas-core" => Some("3.31.0".to_string()),
				_ => None,
			}
		}

		fn pkg_config_variable(&self, _package: &str, _variable: &str) -> Option<String> {
			Some("/usr/lib/postproc".to_string())
		}
	}

	fn resolved() -> Resolution {
		Resolver::new(&Installed).resolve_layers(&[&ConfigLayer::defaults()]).unwrap()
	}

	#[test]
	fn repeated_install_keeps_existing_snapshot() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join(".env");
		std::fs::write(&path, "HAILO_ARCH=hailo8l\n").unwrap();

		let record = resolved().record;
		let kept = publish_environment(&record, false, &path, &Installed).unwrap();
		assert_eq!(kept.get("HAILO_ARCH"), Some("hailo8l"));
		assert_eq!(std::fs::read_to_string(&path).unwrap(), "HAILO_ARCH=hailo8l\n");

		let written = publish_environment(&record, true, &path, &Installed).unwrap();
		assert_eq!(written.get("HAILO_ARCH"), Some("hailo8"));
		assert_eq!(EnvironmentSnapshot::read(&path).unwrap(), written);
	}

	#[test]
	fn first_install_writes_snapshot_without_refresh() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join(".env");

		let snapshot = publish_environment(&resolved().record, false, &path, &Installed).unwrap();
		assert_eq!(snapshot.get("TAPPAS_POST_PROC_DIR"), Some("/usr/lib/postproc"));
		assert!(path.exists());
	}

	#[test]
	fn tally_separates_defaults_from_explicit_values() {
		let tally = Tally::of(&resolved());
		// Five keys default to auto and are detected; the other five keep defaults.
		assert_eq!(
			tally,
			Tally {
				explicit: 0,
				derived: 5,
				defaults: 5,
			}
		);

		let mut resolution = resolved();
		resolution.origins = BTreeMap::from([
			(ConfigKey::HailoArch, Origin::Cli),
			(ConfigKey::ServerUrl, Origin::File),
			(ConfigKey::ResourcesPath, Origin::Environment),
		]);
		let tally = Tally::of(&resolution);
		assert_eq!(tally.explicit, 2);
		assert_eq!(tally.derived, 1);
		assert_eq!(tally.defaults, 7);
	}
}
