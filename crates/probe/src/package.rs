//! Installed package lookup.
//!
//! Two independent sources are consulted, in order: the Python package
//! manager (`pip show`) and the Debian package database (`dpkg-query -s`).
//! Both print RFC 822 style `Field: value` records, so one parser serves both.

use std::time::Duration;

use tracing::debug;

use crate::command::{find_tool, run_bounded, run_path_bounded};

/// A package manager that can be queried for installed packages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
	Pip,
	Dpkg,
}

impl PackageManager {
	/// Query order used by [`get_package_version`].
	pub const ORDER: [PackageManager; 2] = [PackageManager::Pip, PackageManager::Dpkg];

	fn tools(self) -> &'static [&'static str] {
		match self {
			Self::Pip => &["pip", "pip3"],
			Self::Dpkg => &["dpkg-query"],
		}
	}

	fn query_args(self, package: &str) -> Vec<&str> {
		match self {
			Self::Pip => vec!["show", package],
			Self::Dpkg => vec!["-s", package],
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Pip => "pip",
			Self::Dpkg => "dpkg",
		}
	}

	/// Queries this manager for `package`, returning its upstream version.
	///
	/// Any failure (tool missing, non-zero exit, timeout, no version field)
	/// reads as "not installed".
	pub fn query(self, package: &str, timeout: Duration) -> Option<String> {
		let tool = find_tool(self.tools())?;
		let output = match run_path_bounded(&tool, &self.query_args(package), timeout) {
			Ok(output) if output.success() => output,
			Ok(_) => return None,
			Err(error) => {
				debug!(manager = self.as_str(), package, %error, "package query failed");
				return None;
			}
		};
		parse_query_output(self, &output.stdout)
	}
}

/// Parses a `pip show` or `dpkg-query -s` record into a normalized version.
pub fn parse_query_output(manager: PackageManager, output: &str) -> Option<String> {
	if manager == PackageManager::Dpkg {
		// dpkg keeps records for removed packages whose config files remain.
		let installed = field(output, "Status").is_some_and(|status| status.ends_with(" installed"));
		if !installed {
			return None;
		}
	}
	field(output, "Version").map(normalize_version).filter(|v| !v.is_empty())
}

fn field<'a>(output: &'a str, name: &str) -> Option<&'a str> {
	output.lines().find_map(|line| {
		let (key, value) = line.split_once(':')?;
		(key.trim() == name).then_some(value.trim())
	})
}

/// Reduces a packaged version to its upstream `X.Y.Z` part.
///
/// Strips a Debian epoch (`1:`), revision (`-1`) and build metadata (`+b2`).
pub fn normalize_version(raw: &str) -> String {
	let raw = raw.trim();
	let raw = raw.split_once(':').map_or(raw, |(_, rest)| rest);
	let end = raw.find(['-', '+', '~']).unwrap_or(raw.len());
	raw[..end].to_string()
}

/// Returns the upstream version of `package` from the first manager that knows it.
pub fn get_package_version(package: &str, timeout: Duration) -> Option<String> {
	let found = PackageManager::ORDER
		.iter()
		.find_map(|manager| manager.query(package, timeout).map(|version| (*manager, version)));

	match found {
		Some((manager, version)) => {
			debug!(package, manager = manager.as_str(), version = %version, "package found");
			Some(version)
		}
		None => {
			debug!(package, "package not installed");
			None
		}
	}
}

/// Returns whether any known package manager reports `package` as installed.
pub fn is_package_installed(package: &str, timeout: Duration) -> bool {
	get_package_version(package, timeout).is_some()
}

/// Reads `variable` from `package`'s pkg-config metadata.
pub fn pkg_config_variable(package: &str, variable: &str, timeout: Duration) -> Option<String> {
	let flag = format!("--variable={variable}");
	let output = run_bounded("pkg-config", &[&flag, package], timeout).ok()?;
	if !output.success() {
		return None;
	}
	let value = output.stdout.trim();
	(!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	const PIP_SHOW: &str = "\
Name: hailort
Version: 4.20.0
Summary: HailoRT
Location: /usr/lib/python3/dist-packages
Requires: numpy
";

	const DPKG_INSTALLED: &str = "\
Package: hailo-tappas-core
Status: install ok installed
Priority: optional
Architecture: arm64
Version: 3.31.0+1-1
";

	const DPKG_REMOVED: &str = "\
Package: hailo-tappas
Status: deinstall ok config-files
Version: 3.30.0-1
";

	#[test]
	fn pip_record() {
		assert_eq!(parse_query_output(PackageManager::Pip, PIP_SHOW), Some("4.20.0".to_string()));
	}

	#[test]
	fn dpkg_record_is_normalized() {
		assert_eq!(parse_query_output(PackageManager::Dpkg, DPKG_INSTALLED), Some("3.31.0".to_string()));
	}

	#[test]
	fn dpkg_leftover_config_is_not_installed() {
		assert_eq!(parse_query_output(PackageManager::Dpkg, DPKG_REMOVED), None);
	}

	#[test]
	fn record_without_version() {
		assert_eq!(parse_query_output(PackageManager::Pip, "Name: thing\n"), None);
	}

	#[test]
	fn version_normalization() {
		assert_eq!(normalize_version("4.21.0"), "4.21.0");
		assert_eq!(normalize_version("1:4.21.0-2"), "4.21.0");
		assert_eq!(normalize_version(" 3.32.0~rc1 "), "3.32.0");
	}

	#[test]
	fn missing_package_is_not_installed() {
		assert!(!is_package_installed("definitely-not-a-real-package-3f9a", Duration::from_secs(5)));
	}
}
