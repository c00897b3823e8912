//! Host and accelerator architecture detection.

use std::time::Duration;

use serde::Serialize;
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr, VariantNames};
use tracing::{debug, warn};

use crate::command::run_bounded;

/// Tool used to identify the attached accelerator.
pub const IDENTIFY_TOOL: &str = "hailortcli";
const IDENTIFY_ARGS: &[&str] = &["fw-control", "identify"];

/// Device tree node carrying the board model string on single-board computers.
const BOARD_MODEL_PATH: &str = "/proc/device-tree/model";

/// Host CPU/OS classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[derive(Display, EnumString, EnumIter, IntoStaticStr, AsRefStr, VariantNames)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum HostArch {
	X86,
	/// Raspberry Pi class single-board computer.
	Rpi,
	/// Any other ARM/AArch64 host.
	Arm,
	Unknown,
}

/// Accelerator chip family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[derive(Display, EnumString, EnumIter, IntoStaticStr, AsRefStr, VariantNames)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum HailoArch {
	Hailo8,
	Hailo8l,
}

/// Classifies a host from its machine, OS and node identifiers.
///
/// `board_model` is the device tree model string when one exists.
pub fn classify_host(machine: &str, os: &str, node: &str, board_model: Option<&str>) -> HostArch {
	let machine = machine.to_ascii_lowercase();

	if machine.contains("arm") || machine.contains("aarch64") {
		if os.eq_ignore_ascii_case("linux") && is_raspberry_pi(node, board_model) {
			return HostArch::Rpi;
		}
		return HostArch::Arm;
	}

	if machine.contains("x86") || machine.contains("amd64") {
		return HostArch::X86;
	}

	HostArch::Unknown
}

fn is_raspberry_pi(node: &str, board_model: Option<&str>) -> bool {
	node.to_ascii_lowercase().contains("raspberrypi")
		|| board_model.is_some_and(|model| model.to_ascii_lowercase().contains("raspberry pi"))
}

/// Classifies the machine this process runs on. Never fails.
pub fn detect_host_arch() -> HostArch {
	let node = sysinfo::System::host_name().unwrap_or_default();
	let board_model = std::fs::read_to_string(BOARD_MODEL_PATH).ok();
	// Device tree strings are NUL terminated.
	let board_model = board_model.as_deref().map(|m| m.trim_end_matches('\0'));

	// Runtime machine string, not the compile target: emulated binaries differ.
	let machine = sysinfo::System::cpu_arch();

	let arch = classify_host(&machine, std::env::consts::OS, &node, board_model);
	debug!(%arch, machine = %machine, node = %node, "host arch detected");
	arch
}

/// Extracts the chip family from `hailortcli fw-control identify` output.
///
/// `HAILO8L` is checked before `HAILO8` on every line since the latter is a
/// prefix of the former.
pub fn parse_identify_output(output: &str) -> Option<HailoArch> {
	output.lines().find_map(|line| {
		if line.contains("HAILO8L") {
			Some(HailoArch::Hailo8l)
		} else if line.contains("HAILO8") {
			Some(HailoArch::Hailo8)
		} else {
			None
		}
	})
}

/// Identifies the attached accelerator.
///
/// Returns `None` when the identify tool is missing, exits non-zero, exceeds
/// `timeout`, or reports no known chip family.
pub fn detect_hailo_arch(timeout: Duration) -> Option<HailoArch> {
	let output = match run_bounded(IDENTIFY_TOOL, IDENTIFY_ARGS, timeout) {
		Ok(output) => output,
		Err(error) => {
			warn!(%error, "accelerator identification unavailable");
			return None;
		}
	};

	if !output.success() {
		warn!(status = %output.status, "accelerator identification failed");
		return None;
	}

	let arch = parse_identify_output(&output.stdout);
	match arch {
		Some(arch) => debug!(%arch, "accelerator detected"),
		None => warn!("accelerator identification reported no known chip family"),
	}
	arch
}
