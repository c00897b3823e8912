//! Download planning: catalog plus resolved configuration in, ordered
//! `(name, url, destination)` triples out.

use std::path::{Path, PathBuf};

use hailo_config::ConfigRecord;
use indexmap::IndexMap;
use tracing::{debug, warn};
use url::Url;

use crate::catalog::{Catalog, GroupEntry, VideoEntry};
use crate::error::{ResourceError, Result};
use crate::layout::{MODELS_DIR, VIDEOS_DIR};

/// Expands to the shared group plus the group named after the accelerator.
pub const DEFAULT_GROUP: &str = "default";
/// Expands to the catalog's `all` group if it declares one, else every group.
pub const ALL_GROUP: &str = "all";
/// Models shared by every accelerator.
pub const COMBINED_GROUP: &str = "combined";

const MODEL_EXTENSION: &str = "hef";
const DEFAULT_VIDEO_EXTENSION: &str = ".mp4";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
	Model,
	Video,
}

/// One resource to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadItem {
	pub name: String,
	pub url: String,
	pub destination: PathBuf,
	pub kind: ResourceKind,
}

/// Deduplicated, ordered download list. Models come first, then videos.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadPlan {
	pub items: Vec<DownloadItem>,
}

impl DownloadPlan {
	pub fn len(&self) -> usize {
		self.items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = &DownloadItem> {
		self.items.iter()
	}
}

/// What to download.
#[derive(Debug, Clone, Copy)]
pub struct ResourceRequest<'a> {
	/// Group name or keyword; `None` means [`DEFAULT_GROUP`].
	pub group: Option<&'a str>,
	/// Extra resources by name. Video names select that video; anything else
	/// is a model.
	pub names: &'a [String],
	/// Include every catalog video.
	pub videos: bool,
}

impl<'a> ResourceRequest<'a> {
	pub fn group(group: Option<&'a str>) -> Self {
		Self {
			group,
			names: &[],
			videos: true,
		}
	}
}

/// Plans `group` plus every catalog video.
pub fn plan_download(catalog: &Catalog, record: &ConfigRecord, group: Option<&str>) -> Result<DownloadPlan> {
	plan_resources(catalog, record, ResourceRequest::group(group))
}

/// Plans an arbitrary request.
///
/// Groups are flattened in expansion order and deduplicated by name; the first
/// occurrence of a name wins.
pub fn plan_resources(catalog: &Catalog, record: &ConfigRecord, request: ResourceRequest<'_>) -> Result<DownloadPlan> {
	check_base_url(catalog, record);
	let planner = Planner { record };

	let mut models: IndexMap<&str, DownloadItem> = IndexMap::new();
	for group in expand_group(catalog, record, request.group)? {
		for entry in &catalog.groups[group] {
			if models.contains_key(entry.name()) {
				debug!(name = entry.name(), group, "duplicate resource, keeping first occurrence");
				continue;
			}
			models.insert(entry.name(), planner.model(entry)?);
		}
	}

	let mut videos: IndexMap<&str, DownloadItem> = IndexMap::new();
	for name in request.names {
		if let Some(video) = catalog.videos.get(name) {
			videos.entry(name).or_insert_with(|| planner.video(name, video));
			continue;
		}
		if models.contains_key(name.as_str()) {
			continue;
		}
		let item = match catalog.find_entry(name) {
			Some(entry) => planner.model(entry)?,
			None => planner.model(&GroupEntry::Named(name.clone()))?,
		};
		models.insert(name, item);
	}

	if request.videos {
		for (name, video) in &catalog.videos {
			videos.entry(name).or_insert_with(|| planner.video(name, video));
		}
	}

	let items = models.into_values().chain(videos.into_values()).collect();
	Ok(DownloadPlan { items })
}

/// Resolves a requested group to the catalog groups it stands for.
fn expand_group<'c>(catalog: &'c Catalog, record: &ConfigRecord, group: Option<&str>) -> Result<Vec<&'c str>> {
	match group.unwrap_or(DEFAULT_GROUP) {
		DEFAULT_GROUP => {
			let arch = record.hailo_arch.to_string();
			Ok([COMBINED_GROUP, arch.as_str()]
				.into_iter()
				.filter_map(|name| {
					let found = lookup_group(catalog, name);
					if found.is_none() {
						warn!(group = name, "catalog has no such group, skipping");
					}
					found
				})
				.collect())
		}
		ALL_GROUP => Ok(match lookup_group(catalog, ALL_GROUP) {
			Some(all) => vec![all],
			None => catalog.group_names().collect(),
		}),
		name => lookup_group(catalog, name).map(|found| vec![found]).ok_or_else(|| ResourceError::UnknownGroup {
			group: name.to_string(),
			available: [DEFAULT_GROUP, ALL_GROUP]
				.into_iter()
				.chain(catalog.group_names().filter(|g| *g != ALL_GROUP))
				.map(str::to_string)
				.collect(),
		}),
	}
}

fn lookup_group<'c>(catalog: &'c Catalog, name: &str) -> Option<&'c str> {
	catalog.groups.get_key_value(name).map(|(key, _)| key.as_str())
}

fn check_base_url(catalog: &Catalog, record: &ConfigRecord) {
	let Some(url) = &catalog.defaults.model_zoo_url else {
		return;
	};
	if url.trim_end_matches('/') != record.server_url.trim_end_matches('/') {
		warn!(
			catalog = %url,
			server_url = %record.server_url,
			"catalog model_zoo_url differs from configured server_url, using server_url"
		);
	}
}

struct Planner<'a> {
	record: &'a ConfigRecord,
}

impl Planner<'_> {
	fn model(&self, entry: &GroupEntry) -> Result<DownloadItem> {
		let record = self.record;
		let url = match entry {
			GroupEntry::Named(name) => format!(
				"{}/{}/{}/{name}.{MODEL_EXTENSION}",
				record.server_url.trim_end_matches('/'),
				record.model_zoo_version,
				record.hailo_arch,
			),
			GroupEntry::Override { name, url } => {
				Url::parse(url).map_err(|error| ResourceError::InvalidUrl {
					name: name.clone(),
					url: url.clone(),
					error,
				})?;
				url.clone()
			}
		};

		let destination = record
			.resources_path
			.join(MODELS_DIR)
			.join(record.hailo_arch.to_string())
			.join(format!("{}.{MODEL_EXTENSION}", entry.name()));

		Ok(DownloadItem {
			name: entry.name().to_string(),
			url,
			destination,
			kind: ResourceKind::Model,
		})
	}

	fn video(&self, name: &str, video: &VideoEntry) -> DownloadItem {
		let filename = video
			.filename
			.clone()
			.unwrap_or_else(|| format!("{name}{}", video_extension(video)));

		DownloadItem {
			name: name.to_string(),
			url: video.url.clone(),
			destination: self.record.resources_path.join(VIDEOS_DIR).join(filename),
			kind: ResourceKind::Video,
		}
	}
}

/// URL suffix if it has one, else catalog metadata, else `.mp4`.
fn video_extension(video: &VideoEntry) -> String {
	let from_url = Url::parse(&video.url).ok().and_then(|url| {
		let path = url.path().to_string();
		Path::new(&path).extension().map(|ext| format!(".{}", ext.to_string_lossy()))
	});

	from_url
		.or_else(|| video.extension.clone())
		.unwrap_or_else(|| DEFAULT_VIDEO_EXTENSION.to_string())
}
