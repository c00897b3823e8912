use clap::Parser;
use pretty_assertions::assert_eq;

use hailo_config::{Resolver, Violation};
use hailo_probe::LocalSystem;

use super::*;

fn parse(args: &[&str]) -> Cli {
	Cli::try_parse_from(std::iter::once("hailo-setup").chain(args.iter().copied())).unwrap()
}

#[test]
fn overrides_become_cli_layer() {
	let cli = parse(&["--hailo-arch", "hailo8l", "resolve", "--resources-path", "/data"]);
	let layer = cli.overrides.layer();
	assert_eq!(layer.origin(), Origin::Cli);
	assert_eq!(layer.get(ConfigKey::HailoArch), Some("hailo8l"));
	assert_eq!(layer.get(ConfigKey::ResourcesPath), Some("/data"));
	assert_eq!(layer.get(ConfigKey::HostArch), None);
}

#[test]
fn bad_override_values_reach_the_resolver_with_file_problems() {
	let cli = parse(&["--hailo-arch", "hailo15", "--host-arch", "sparc", "--virtual-env-name", "", "resolve"]);
	let file = ConfigLayer::parse("tappas_version: \"9.9.9\"\n", "config.yaml").unwrap();
	let probe = LocalSystem::default();

	let err = Resolver::new(&probe)
		.resolve_layers(&[&ConfigLayer::defaults(), &file, &cli.overrides.layer()])
		.unwrap_err();
	let reported: Vec<_> = err.violations().iter().map(|v| (v.key(), origin_of(v))).collect();
	assert_eq!(
		reported,
		vec![
			(ConfigKey::HostArch, Some(Origin::Cli)),
			(ConfigKey::HailoArch, Some(Origin::Cli)),
			(ConfigKey::TappasVersion, Some(Origin::File)),
			(ConfigKey::VirtualEnvName, Some(Origin::Cli)),
		]
	);
}

fn origin_of(violation: &Violation) -> Option<Origin> {
	match violation {
		Violation::NotAllowed { origin, .. } | Violation::Empty { origin, .. } => Some(*origin),
		Violation::Unresolved { .. } => None,
	}
}

#[test]
fn override_help_lists_accepted_values() {
	let help = described("Model zoo server", ConfigKey::ServerUrl);
	assert!(help.starts_with("Model zoo server [values: "));
	assert!(!help.contains("auto"));
	assert!(described("Compute library package", ConfigKey::TappasVariant).contains("auto, "));
	assert_eq!(described("Python virtual environment name", ConfigKey::VirtualEnvName), "Python virtual environment name");
}

#[test]
fn get_parses_key_names() {
	let cli = parse(&["get", "model_zoo_version"]);
	assert!(matches!(cli.command, Command::Get { key: ConfigKey::ModelZooVersion }));

	let err = Cli::try_parse_from(["hailo-setup", "get", "hailo_ach"]).unwrap_err();
	assert!(err.to_string().contains("did you mean 'hailo_arch'"));
}

#[test]
fn download_accepts_repeated_names() {
	let cli = parse(&["download", "--group", "retrain", "--name", "barcode", "--name", "yolov6n", "-j", "2", "--no-videos"]);
	let Command::Download(args) = cli.command else {
		panic!("expected download");
	};
	assert_eq!(args.group.as_deref(), Some("retrain"));
	assert_eq!(args.names, vec!["barcode", "yolov6n"]);
	assert_eq!(args.jobs, Some(2));
	assert!(args.no_videos);
	assert!(Cli::try_parse_from(["hailo-setup", "download", "--jobs", "0"]).is_err());
}

#[test]
fn post_install_and_set_env_flags() {
	let cli = parse(&["-c", "/etc/hailo.yaml", "post-install", "--env-file", "/tmp/.env", "--link", "/opt/app/resources"]);
	assert_eq!(cli.config, Some(PathBuf::from("/etc/hailo.yaml")));
	let Command::PostInstall(args) = cli.command else {
		panic!("expected post-install");
	};
	assert_eq!(args.env_file, Some(PathBuf::from("/tmp/.env")));
	assert_eq!(args.link, Some(PathBuf::from("/opt/app/resources")));
	assert_eq!(args.group, None);

	let cli = parse(&["set-env", "--refresh"]);
	assert!(matches!(cli.command, Command::SetEnv(SetEnvArgs { refresh: true, env_file: None })));

	let cli = parse(&["post-install"]);
	assert!(matches!(cli.command, Command::PostInstall(PostInstallArgs { refresh: false, .. })));
	let cli = parse(&["post-install", "--refresh"]);
	assert!(matches!(cli.command, Command::PostInstall(PostInstallArgs { refresh: true, .. })));
}
