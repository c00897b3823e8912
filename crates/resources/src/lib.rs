// Libraries report through tracing; stderr belongs to the CLI.
#![deny(clippy::print_stderr)]

//! Resource acquisition for Hailo applications.
//!
//! A [`Catalog`] declares named groups of models and a set of sample videos.
//! Given a resolved [`ConfigRecord`](hailo_config::ConfigRecord), planning
//! turns a requested group into a deduplicated list of
//! `(name, url, destination)` triples; fetching downloads each triple whose
//! destination does not exist yet.
//!
//! ```text
//! <resources_path>/
//!   models/<hailo_arch>/<name>.hef
//!   videos/<filename>
//!   so/
//! ```
//!
//! Network access goes through the [`Downloader`] trait so plans can be
//! fetched against a fake in tests.

pub mod catalog;
pub mod error;
pub mod fetch;
pub mod layout;
pub mod plan;

pub use catalog::{Catalog, GroupEntry, VideoEntry, embedded_catalog, load_catalog, load_catalog_from};
pub use error::{DownloadError, FetchFailure, ResourceError, Result};
pub use fetch::{Downloader, FetchReport, FetchStatus, HttpDownloader, default_jobs, fetch, fetch_parallel};
pub use layout::{LinkStatus, link_resources, prepare_resource_dirs};
pub use plan::{DownloadItem, DownloadPlan, ResourceKind, ResourceRequest, plan_download, plan_resources};
