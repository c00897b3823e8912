//! Plan from the shipped catalog and fetch into a temporary resources tree.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};

use hailo_config::{ConfigRecord, TappasVariant};
use hailo_probe::{HailoArch, HostArch};
use hailo_resources::{
	DownloadError, Downloader, ResourceRequest, embedded_catalog, fetch, fetch_parallel, plan_resources,
	prepare_resource_dirs,
};

struct Echo {
	calls: AtomicUsize,
}

impl Downloader for Echo {
	fn download(&self, url: &str, sink: &mut dyn Write) -> Result<u64, DownloadError> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		sink.write_all(url.as_bytes())?;
		Ok(url.len() as u64)
	}
}

fn record(root: &std::path::Path) -> ConfigRecord {
	ConfigRecord {
		host_arch: HostArch::Rpi,
		hailo_arch: HailoArch::Hailo8l,
		hailort_version: "4.20.0".into(),
		tappas_version: "3.31.0".into(),
		tappas_variant: TappasVariant::HailoTappasCore,
		model_zoo_version: "v2.14.0".into(),
		server_url: "http://dev-public.hailo.ai/2025_01".into(),
		resources_path: root.to_path_buf(),
		virtual_env_name: "hailo_infra_venv".into(),
		deb_whl_dir: "deb_whl_dir".into(),
	}
}

#[test]
fn default_install_is_idempotent() {
	let dir = tempfile::tempdir().unwrap();
	let record = record(dir.path());
	prepare_resource_dirs(&record.resources_path).unwrap();

	let catalog = embedded_catalog().unwrap();
	let plan = plan_resources(&catalog, &record, ResourceRequest::group(None)).unwrap();
	assert_eq!(plan.len(), 8 + 3);

	let echo = Echo {
		calls: AtomicUsize::new(0),
	};
	let report = fetch_parallel(&plan, &echo, 4).into_result().unwrap();
	assert_eq!(report.downloaded(), plan.len());

	let model = dir.path().join("models/hailo8l/yolov6n.hef");
	assert_eq!(
		std::fs::read_to_string(model).unwrap(),
		"http://dev-public.hailo.ai/2025_01/v2.14.0/hailo8l/yolov6n.hef"
	);
	assert!(dir.path().join("videos/face_recognition.mp4").is_file());

	let again = fetch(&plan, &echo).into_result().unwrap();
	assert_eq!(again.present(), plan.len());
	assert_eq!(echo.calls.load(Ordering::SeqCst), plan.len());
}
