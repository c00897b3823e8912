use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use hailo_config::key::suggest_key;
use hailo_config::{ConfigKey, ConfigLayer, Origin, choices};

#[cfg(test)]
mod tests;

#[derive(Parser, Debug)]
#[command(name = "hailo-setup")]
#[command(about = "Resolve configuration and fetch resources for Hailo applications")]
#[command(version)]
/// Command-line arguments.
pub struct Cli {
	/// Configuration file (defaults to $HAILO_APPS_CONFIG or ~/.config/hailo-apps/config.yaml)
	#[arg(short, long, global = true, value_name = "PATH")]
	pub config: Option<PathBuf>,

	#[command(flatten)]
	pub overrides: Overrides,

	/// Verbose logging
	#[arg(short, long, global = true)]
	pub verbose: bool,

	/// Subcommand to execute.
	#[command(subcommand)]
	pub command: Command,
}

/// Help text naming the accepted values. Values are checked by the resolver,
/// not by clap, so every bad flag is reported together with file problems.
fn described(summary: &str, key: ConfigKey) -> String {
	match choices(key) {
		Some(values) => format!("{summary} [values: {}]", values.join(", ")),
		None => summary.to_string(),
	}
}

/// One flag per configuration key, highest precedence.
#[derive(Args, Debug, Default, Clone)]
#[command(next_help_heading = "Configuration overrides")]
pub struct Overrides {
	#[arg(long, global = true, value_name = "ARCH", help = described("Host architecture", ConfigKey::HostArch))]
	pub host_arch: Option<String>,

	#[arg(long, global = true, value_name = "ARCH", help = described("Accelerator architecture", ConfigKey::HailoArch))]
	pub hailo_arch: Option<String>,

	#[arg(long, global = true, value_name = "VERSION", help = described("Accelerator runtime version", ConfigKey::HailortVersion))]
	pub hailort_version: Option<String>,

	#[arg(long, global = true, value_name = "VERSION", help = described("Compute library version", ConfigKey::TappasVersion))]
	pub tappas_version: Option<String>,

	#[arg(long, global = true, value_name = "PACKAGE", help = described("Compute library package", ConfigKey::TappasVariant))]
	pub tappas_variant: Option<String>,

	#[arg(long, global = true, value_name = "VERSION", help = described("Model zoo release", ConfigKey::ModelZooVersion))]
	pub model_zoo_version: Option<String>,

	#[arg(long, global = true, value_name = "URL", help = described("Model zoo server", ConfigKey::ServerUrl))]
	pub server_url: Option<String>,

	/// Root directory for models and videos (or auto)
	#[arg(long, global = true, value_name = "PATH")]
	pub resources_path: Option<String>,

	/// Python virtual environment name
	#[arg(long, global = true, value_name = "NAME")]
	pub virtual_env_name: Option<String>,

	/// Directory holding downloaded packages
	#[arg(long, global = true, value_name = "PATH")]
	pub deb_whl_dir: Option<String>,
}

impl Overrides {
	/// The command-line configuration layer. Absent flags override nothing.
	pub fn layer(&self) -> ConfigLayer {
		ConfigLayer::from_pairs(
			Origin::Cli,
			[
				(ConfigKey::HostArch, &self.host_arch),
				(ConfigKey::HailoArch, &self.hailo_arch),
				(ConfigKey::HailortVersion, &self.hailort_version),
				(ConfigKey::TappasVersion, &self.tappas_version),
				(ConfigKey::TappasVariant, &self.tappas_variant),
				(ConfigKey::ModelZooVersion, &self.model_zoo_version),
				(ConfigKey::ServerUrl, &self.server_url),
				(ConfigKey::ResourcesPath, &self.resources_path),
				(ConfigKey::VirtualEnvName, &self.virtual_env_name),
				(ConfigKey::DebWhlDir, &self.deb_whl_dir),
			]
			.map(|(key, value)| (key, value.clone())),
		)
	}
}

fn parse_key(name: &str) -> Result<ConfigKey, String> {
	ConfigKey::from_name(name).ok_or_else(|| match suggest_key(name) {
		Some(suggestion) => format!("unknown key '{name}' (did you mean '{suggestion}'?)"),
		None => format!("unknown key '{name}'"),
	})
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
	/// Print the resolved configuration
	Resolve {
		/// Print as JSON instead of key=value lines
		#[arg(long)]
		json: bool,
	},
	/// Print one resolved value
	Get {
		/// Configuration key, e.g. hailo_arch
		#[arg(value_parser = parse_key)]
		key: ConfigKey,
	},
	/// Validate the configuration and show where each value came from
	Validate,
	/// Write the environment snapshot
	SetEnv(SetEnvArgs),
	/// Download models and videos
	Download(DownloadArgs),
	/// Resolve, write the environment, prepare directories and download resources
	PostInstall(PostInstallArgs),
}

#[derive(Args, Debug, Default)]
pub struct SetEnvArgs {
	/// Recompute and rewrite an existing snapshot
	#[arg(long)]
	pub refresh: bool,

	/// Snapshot path (defaults to $HAILO_APPS_ENV_FILE or ~/.config/hailo-apps/.env)
	#[arg(long, value_name = "PATH")]
	pub env_file: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub struct DownloadArgs {
	/// Resource group: default, all, or a catalog group name
	#[arg(long)]
	pub group: Option<String>,

	/// Extra resource by name (repeatable)
	#[arg(long = "name", value_name = "NAME")]
	pub names: Vec<String>,

	/// Resource catalog (defaults to $HAILO_APPS_CATALOG or the built-in catalog)
	#[arg(long, value_name = "PATH")]
	pub catalog: Option<PathBuf>,

	/// Parallel downloads
	#[arg(long, short = 'j', value_parser = clap::value_parser!(u16).range(1..))]
	pub jobs: Option<u16>,

	/// Skip sample videos
	#[arg(long)]
	pub no_videos: bool,
}

#[derive(Args, Debug, Default)]
pub struct PostInstallArgs {
	/// Recompute and rewrite an existing environment snapshot
	#[arg(long)]
	pub refresh: bool,

	/// Resource group: default, all, or a catalog group name
	#[arg(long)]
	pub group: Option<String>,

	/// Resource catalog (defaults to $HAILO_APPS_CATALOG or the built-in catalog)
	#[arg(long, value_name = "PATH")]
	pub catalog: Option<PathBuf>,

	/// Snapshot path (defaults to $HAILO_APPS_ENV_FILE or ~/.config/hailo-apps/.env)
	#[arg(long, value_name = "PATH")]
	pub env_file: Option<PathBuf>,

	/// Symlink to create pointing at the resources directory
	#[arg(long, value_name = "PATH")]
	pub link: Option<PathBuf>,
}
