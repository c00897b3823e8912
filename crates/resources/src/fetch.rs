//! Download-if-absent for a [`DownloadPlan`].

use std::io::Write;
use std::path::Path;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::error::{DownloadError, FetchFailure, ResourceError, Result};
use crate::plan::{DownloadItem, DownloadPlan};

/// Streams a URL into a writer.
pub trait Downloader: Sync {
	/// Returns the number of bytes written.
	fn download(&self, url: &str, sink: &mut dyn Write) -> std::result::Result<u64, DownloadError>;
}

/// Blocking HTTP downloader.
pub struct HttpDownloader {
	agent: ureq::Agent,
}

impl HttpDownloader {
	pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
	pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(300);

	pub fn new(connect_timeout: Duration, read_timeout: Duration) -> Self {
		let agent = ureq::AgentBuilder::new()
			.timeout_connect(connect_timeout)
			.timeout_read(read_timeout)
			.user_agent(concat!("hailo-setup/", env!("CARGO_PKG_VERSION")))
			.build();
		Self { agent }
	}
}

impl Default for HttpDownloader {
	fn default() -> Self {
		Self::new(Self::DEFAULT_CONNECT_TIMEOUT, Self::DEFAULT_READ_TIMEOUT)
	}
}

impl Downloader for HttpDownloader {
	fn download(&self, url: &str, sink: &mut dyn Write) -> std::result::Result<u64, DownloadError> {
		let response = self.agent.get(url).call()?;
		let mut reader = response.into_reader();
		Ok(std::io::copy(&mut reader, sink)?)
	}
}

/// Status of one fetched entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
	/// The destination already existed; nothing was downloaded.
	Present,
	Downloaded { bytes: u64 },
}

/// Per-entry outcome, in plan order.
#[derive(Debug, Default)]
pub struct FetchReport {
	pub entries: Vec<(DownloadItem, std::result::Result<FetchStatus, DownloadError>)>,
}

impl FetchReport {
	pub fn downloaded(&self) -> usize {
		self.count(|status| matches!(status, FetchStatus::Downloaded { .. }))
	}

	pub fn present(&self) -> usize {
		self.count(|status| *status == FetchStatus::Present)
	}

	pub fn failed(&self) -> usize {
		self.entries.iter().filter(|(_, result)| result.is_err()).count()
	}

	pub fn is_success(&self) -> bool {
		self.failed() == 0
	}

	fn count(&self, pred: impl Fn(&FetchStatus) -> bool) -> usize {
		self.entries.iter().filter(|(_, result)| result.as_ref().is_ok_and(&pred)).count()
	}

	/// Fails with every failed entry if any entry failed.
	pub fn into_result(self) -> Result<Self> {
		if self.is_success() {
			return Ok(self);
		}
		let failures = self
			.entries
			.into_iter()
			.filter_map(|(item, result)| {
				result.err().map(|error| FetchFailure {
					name: item.name,
					url: item.url,
					destination: item.destination,
					error,
				})
			})
			.collect();
		Err(ResourceError::FetchFailed(failures))
	}
}

/// Fetches every entry in order. A failed entry never stops the rest.
pub fn fetch(plan: &DownloadPlan, downloader: &dyn Downloader) -> FetchReport {
	let entries = plan
		.iter()
		.map(|item| (item.clone(), fetch_item(item, downloader)))
		.collect();
	let report = FetchReport { entries };
	log_summary(&report);
	report
}

/// Default worker count: available parallelism, capped at 8.
pub fn default_jobs() -> usize {
	thread::available_parallelism().map(|n| n.get()).unwrap_or(4).min(8)
}

/// Fetches entries on up to `jobs` worker threads.
///
/// Entries sharing a destination are handled by the same worker, one after the
/// other. The report is in plan order.
pub fn fetch_parallel(plan: &DownloadPlan, downloader: &dyn Downloader, jobs: usize) -> FetchReport {
	let jobs = jobs.max(1);
	if jobs == 1 || plan.len() <= 1 {
		return fetch(plan, downloader);
	}

	let mut by_destination: IndexMap<&Path, Vec<usize>> = IndexMap::new();
	for (index, item) in plan.iter().enumerate() {
		by_destination.entry(item.destination.as_path()).or_default().push(index);
	}

	let mut buckets: Vec<Vec<usize>> = vec![Vec::new(); jobs];
	for (slot, indices) in by_destination.into_values().enumerate() {
		buckets[slot % jobs].extend(indices);
	}

	let (tx, rx) = mpsc::channel();
	thread::scope(|scope| {
		for bucket in buckets.into_iter().filter(|b| !b.is_empty()) {
			let tx = tx.clone();
			scope.spawn(move || {
				for index in bucket {
					let result = fetch_item(&plan.items[index], downloader);
					let _ = tx.send((index, result));
				}
			});
		}
	});
	drop(tx);

	let mut results: Vec<_> = rx.into_iter().collect();
	results.sort_by_key(|(index, _)| *index);
	let entries = results
		.into_iter()
		.map(|(index, result)| (plan.items[index].clone(), result))
		.collect();

	let report = FetchReport { entries };
	log_summary(&report);
	report
}

/// Downloads one entry unless its destination exists.
///
/// The body is staged in a temporary file in the destination directory and
/// renamed into place, so the destination never holds a partial download.
fn fetch_item(item: &DownloadItem, downloader: &dyn Downloader) -> std::result::Result<FetchStatus, DownloadError> {
	if item.destination.exists() {
		debug!(name = %item.name, path = %item.destination.display(), "already present, skipping");
		return Ok(FetchStatus::Present);
	}

	let dir = match item.destination.parent() {
		Some(dir) if !dir.as_os_str().is_empty() => dir,
		_ => Path::new("."),
	};
	std::fs::create_dir_all(dir)?;

	info!(name = %item.name, url = %item.url, "downloading");
	let mut staged = tempfile::Builder::new().prefix(".download.").tempfile_in(dir)?;
	let result = downloader.download(&item.url, &mut staged).and_then(|bytes| {
		staged.as_file().sync_all()?;
		Ok(bytes)
	});

	match result {
		Ok(bytes) => {
			staged.persist(&item.destination).map_err(|e| DownloadError::Io(e.error))?;
			debug!(name = %item.name, bytes, "downloaded");
			Ok(FetchStatus::Downloaded { bytes })
		}
		Err(error) => {
			warn!(name = %item.name, url = %item.url, %error, "download failed");
			Err(error)
		}
	}
}

fn log_summary(report: &FetchReport) {
	info!(
		downloaded = report.downloaded(),
		present = report.present(),
		failed = report.failed(),
		"fetch finished"
	);
}
