//! Bounded execution of external tools.
//!
//! Every probe shells out to something (`hailortcli`, `pip`, `dpkg-query`,
//! `pkg-config`). None of them may hang resolution, so each call carries a
//! deadline and the child is killed when it passes.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Errors raised while running an external tool.
///
/// These stay inside this crate's probes; public probe functions turn them into
/// degraded results.
#[derive(Debug, Error)]
pub enum ProbeError {
	#[error("`{0}` was not found on PATH")]
	ToolMissing(String),

	#[error("failed to spawn `{program}`: {error}")]
	Spawn {
		program: String,
		#[source]
		error: std::io::Error,
	},

	#[error("failed waiting for `{program}`: {error}")]
	Wait {
		program: String,
		#[source]
		error: std::io::Error,
	},

	#[error("`{program}` did not finish within {timeout:?}")]
	TimedOut { program: String, timeout: Duration },
}

/// Result type for probe command execution.
pub type Result<T> = std::result::Result<T, ProbeError>;

/// Captured result of a finished command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
	pub status: ExitStatus,
	pub stdout: String,
}

impl CommandOutput {
	pub fn success(&self) -> bool {
		self.status.success()
	}
}

/// Locates the first of `candidates` present on PATH.
pub fn find_tool(candidates: &[&str]) -> Option<PathBuf> {
	candidates.iter().find_map(|name| which::which(name).ok())
}

/// Runs `program` with `args`, waiting at most `timeout`.
///
/// Stdout is captured, stderr is discarded and stdin is closed. On timeout the
/// child is killed and reaped before returning.
pub fn run_bounded(program: &str, args: &[&str], timeout: Duration) -> Result<CommandOutput> {
	let path = which::which(program).map_err(|_| ProbeError::ToolMissing(program.to_string()))?;
	run_path_bounded(&path, args, timeout)
}

pub(crate) fn run_path_bounded(path: &Path, args: &[&str], timeout: Duration) -> Result<CommandOutput> {
	let program = path.display().to_string();
	debug!(program = %program, ?args, "probe.run");

	let mut child = Command::new(path)
		.args(args)
		.stdin(Stdio::null())
		.stdout(Stdio::piped())
		.stderr(Stdio::null())
		.spawn()
		.map_err(|error| ProbeError::Spawn {
			program: program.clone(),
			error,
		})?;

	// Drain stdout on a side thread so a chatty child cannot block on a full pipe.
	let reader = child.stdout.take().map(|mut stdout| {
		thread::spawn(move || {
			let mut buf = String::new();
			let _ = stdout.read_to_string(&mut buf);
			buf
		})
	});

	let deadline = Instant::now() + timeout;
	let status = loop {
		match child.try_wait() {
			Ok(Some(status)) => break status,
			Ok(None) if Instant::now() >= deadline => {
				let _ = child.kill();
				let _ = child.wait();
				return Err(ProbeError::TimedOut { program, timeout });
			}
			Ok(None) => thread::sleep(POLL_INTERVAL),
			Err(error) => return Err(ProbeError::Wait { program, error }),
		}
	};

	let stdout = reader.map(|handle| handle.join().unwrap_or_default()).unwrap_or_default();
	Ok(CommandOutput { status, stdout })
}
