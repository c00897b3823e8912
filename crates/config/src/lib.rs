// Libraries report through tracing; stderr belongs to the CLI.
#![deny(clippy::print_stderr)]

//! Configuration system for Hailo applications.
//!
//! This crate turns layered, partially-`auto` user input into one concrete,
//! validated [`ConfigRecord`], and publishes that record as an environment
//! snapshot for the processes that run pipelines later.
//!
//! # Layers
//!
//! Three layers are merged, later ones winning:
//!
//! 1. Built-in defaults ([`ConfigLayer::defaults`])
//! 2. The YAML configuration file: an explicit `--config` path, else
//!    `$HAILO_APPS_CONFIG`, else `$XDG_CONFIG_HOME/hailo-apps/config.yaml`,
//!    else the copy embedded from `runtime/config.yaml`
//! 3. Command-line overrides
//!
//! The file is a flat mapping:
//!
//! ```yaml
//! hailort_version: auto
//! tappas_version: auto
//! model_zoo_version: v2.14.0
//! host_arch: auto
//! hailo_arch: hailo8
//! server_url: http://dev-public.hailo.ai/2025_01
//! tappas_variant: auto
//! resources_path: /usr/local/hailo/resources
//! virtual_env_name: hailo_infra_venv
//! deb_whl_dir: deb_whl_dir
//! ```
//!
//! Unknown keys are ignored with a [`ConfigWarning`] (with a suggestion when a
//! canonical key is close). Keys written by earlier releases (`resource_path`,
//! `device_arch`, `storage_dir`) are accepted and mapped to their canonical key.
//!
//! # Resolution
//!
//! [`Resolver`] validates every merged value against its allowed domain, then
//! derives each remaining `auto` from [`EnvHints`] or a
//! [`SystemProbe`](hailo_probe::SystemProbe). Problems are never reported one at
//! a time: [`ConfigError::Invalid`] carries every [`Violation`] found.
//!
//! # Environment snapshot
//!
//! [`materialize`] writes the record as `KEY=VALUE` lines, plus the derived
//! `MODEL_DIR` and `TAPPAS_POST_PROC_DIR`, replacing the previous file
//! atomically.

pub mod domain;
pub mod environment;
pub mod error;
pub mod key;
pub mod layer;
pub mod paths;
pub mod record;
pub mod resolve;

pub use domain::{TappasVariant, allowed_values, choices, default_value};
pub use environment::{EnvironmentSnapshot, Materialized, materialize};
pub use error::{ConfigError, ConfigWarning, Origin, Result, Violation};
pub use key::{AUTO, ConfigKey, Setting};
pub use layer::{ConfigLayer, MergedConfig};
pub use paths::{config_home, default_config_path, default_env_file};
pub use record::ConfigRecord;
pub use resolve::{EnvHints, Resolution, Resolver, load_file_layer};
