//! ABOUTME: Directory-based worker discovery: `<workers_dir>/<id>/config.yaml` enumeration
//! ABOUTME: Parse errors and missing config files are skipped rather than aborting the scan

use std::path::Path;

use teamforge_core::model::Worker;
use tracing::warn;

/// A worker discovered on disk, ready to be registered with a typed client.
#[derive(Debug, Clone)]
pub struct DiscoveredWorker {
    pub id: String,
    pub name: String,
    pub url: String,
    pub api_key: String,
}

/// Enumerate `workers_dir`'s immediate subdirectories, parsing each
/// `config.yaml` found. A missing `workers_dir` yields an empty list, not an
/// error; directories without a `config.yaml` are skipped silently; a
/// directory whose `config.yaml` fails to parse is logged and skipped.
pub fn discover_workers(workers_dir: &Path) -> Vec<DiscoveredWorker> {
    let entries = match std::fs::read_dir(workers_dir) {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };

    let mut discovered = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let config_path = path.join("config.yaml");
        if !config_path.is_file() {
            continue;
        }

        let id = match path.file_name().map(|n| n.to_string_lossy().to_string()) {
            Some(id) => id,
            None => continue,
        };

        let raw = match std::fs::read_to_string(&config_path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(worker = %id, error = %e, "failed to read worker config; skipping");
                continue;
            }
        };

        let worker: Worker = match serde_yaml::from_str(&raw) {
            Ok(worker) => worker,
            Err(e) => {
                warn!(worker = %id, error = %e, "failed to parse worker config; skipping");
                continue;
            }
        };

        let port = worker.effective_settings().http_port;
        let port = if port == 0 { 8080 } else { port };

        discovered.push(DiscoveredWorker {
            id,
            name: worker.name,
            url: format!("http://localhost:{port}"),
            api_key: String::new(),
        });
    }

    discovered
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn absent_directory_yields_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        assert!(discover_workers(&missing).is_empty());
    }

    #[test]
    fn discovers_workers_with_config_and_skips_the_rest() {
        let dir = tempfile::tempdir().unwrap();

        let good = dir.path().join("alpha");
        fs::create_dir(&good).unwrap();
        fs::write(
            good.join("config.yaml"),
            "name: alpha\nsettings:\n  http_port: 9001\n",
        )
        .unwrap();

        let no_config = dir.path().join("beta");
        fs::create_dir(&no_config).unwrap();

        let bad_yaml = dir.path().join("gamma");
        fs::create_dir(&bad_yaml).unwrap();
        fs::write(bad_yaml.join("config.yaml"), "not: [valid").unwrap();

        let unnamed = dir.path().join("delta");
        fs::create_dir(&unnamed).unwrap();
        fs::write(unnamed.join("config.yaml"), "prompt: oops\n").unwrap();

        let workers = discover_workers(dir.path());
        assert_eq!(workers.len(), 1);
        let alpha = workers.iter().find(|w| w.id == "alpha").unwrap();
        assert_eq!(alpha.name, "alpha");
        assert_eq!(alpha.url, "http://localhost:9001");
        assert_eq!(alpha.api_key, "");
    }

    #[test]
    fn default_port_is_8080_when_unset() {
        let dir = tempfile::tempdir().unwrap();
        let worker_dir = dir.path().join("w1");
        fs::create_dir(&worker_dir).unwrap();
        fs::write(worker_dir.join("config.yaml"), "name: w1\n").unwrap();

        let workers = discover_workers(dir.path());
        assert_eq!(workers[0].url, "http://localhost:8080");
    }
}
