// Probes report through tracing; stderr belongs to the CLI.
#![deny(clippy::print_stderr)]

//! Local system probes.
//!
//! Everything configuration resolution needs to learn from the machine it runs
//! on goes through this crate:
//!
//! * [`arch`]: host CPU/OS classification and accelerator chip identification
//! * [`package`]: installed package lookup through `pip` and `dpkg`
//! * [`command`]: bounded external command execution
//!
//! Probes never fail past their own boundary. A missing tool, a non-zero exit
//! or a timeout degrades to [`HostArch::Unknown`], `None` or "not installed",
//! and it is up to the caller to decide whether that is fatal.
//!
//! [`SystemProbe`] is the seam the resolver talks to. [`LocalSystem`] is the
//! real implementation; tests substitute their own.

pub mod arch;
pub mod command;
pub mod package;

use std::time::Duration;

pub use arch::{HailoArch, HostArch, classify_host, detect_hailo_arch, detect_host_arch, parse_identify_output};
pub use command::{CommandOutput, ProbeError, run_bounded};
pub use package::{PackageManager, get_package_version, is_package_installed, normalize_version, pkg_config_variable};

/// Answers the questions configuration resolution asks about the local system.
pub trait SystemProbe {
	/// Classifies the host CPU/OS.
	fn host_arch(&self) -> HostArch;

	/// Identifies the attached accelerator, if any.
	fn hailo_arch(&self) -> Option<HailoArch>;

	/// Returns the upstream version of an installed package.
	fn package_version(&self, package: &str) -> Option<String>;

	/// Returns whether a package is installed through any known package manager.
	fn is_package_installed(&self, package: &str) -> bool {
		self.package_version(package).is_some()
	}

	/// Reads a `pkg-config` variable from a package's `.pc` file.
	fn pkg_config_variable(&self, package: &str, variable: &str) -> Option<String>;
}

/// Probes the machine this process runs on.
#[derive(Debug, Clone, Copy)]
pub struct LocalSystem {
	/// Upper bound for the accelerator identify call.
	pub identify_timeout: Duration,
	/// Upper bound for each package manager query.
	pub query_timeout: Duration,
}

impl LocalSystem {
	pub const DEFAULT_IDENTIFY_TIMEOUT: Duration = Duration::from_secs(10);
	pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);
}

impl Default for LocalSystem {
	fn default() -> Self {
		Self {
			identify_timeout: Self::DEFAULT_IDENTIFY_TIMEOUT,
			query_timeout: Self::DEFAULT_QUERY_TIMEOUT,
		}
	}
}

impl SystemProbe for LocalSystem {
	fn host_arch(&self) -> HostArch {
		detect_host_arch()
	}

	fn hailo_arch(&self) -> Option<HailoArch> {
		detect_hailo_arch(self.identify_timeout)
	}

	fn package_version(&self, package: &str) -> Option<String> {
		get_package_version(package, self.query_timeout)
	}

	fn is_package_installed(&self, package: &str) -> bool {
		is_package_installed(package, self.query_timeout)
	}

	fn pkg_config_variable(&self, package: &str, variable: &str) -> Option<String> {
		pkg_config_variable(package, variable, self.query_timeout)
	}
}
