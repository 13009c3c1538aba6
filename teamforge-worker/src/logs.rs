//! ABOUTME: Log file enumeration and bounded reads under `<working_dir>/logs`

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub path: String,
    pub role: String,
    pub modified: Option<DateTime<Utc>>,
    pub size_bytes: u64,
}

fn derive_role(path: &Path) -> String {
    let path_str = path.to_string_lossy();
    if path_str.contains("/collector/") {
        return "collector".to_string();
    }
    if path_str.contains("/executor/") {
        return "executor".to_string();
    }
    let filename = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
    if filename.contains("collector") {
        "collector".to_string()
    } else if filename.contains("executor") {
        "executor".to_string()
    } else {
        "other".to_string()
    }
}

fn walk_log_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            walk_log_files(&path, out);
        } else if path.extension().is_some_and(|ext| ext == "log") {
            out.push(path);
        }
    }
}

/// Enumerate `<working_dir>/logs/**/*.log`, optionally filtered by `role`,
/// sorted newest-modified first, bounded to `limit` entries (clamped 1..=100).
pub fn list_logs(working_dir: &Path, role: Option<&str>, limit: Option<u32>) -> Vec<LogEntry> {
    let logs_dir = working_dir.join("logs");
    let mut files = Vec::new();
    walk_log_files(&logs_dir, &mut files);

    let mut entries: Vec<LogEntry> = files
        .into_iter()
        .filter_map(|path| {
            let metadata = std::fs::metadata(&path).ok()?;
            let modified = metadata.modified().ok().map(DateTime::<Utc>::from);
            Some(LogEntry {
                path: path.to_string_lossy().to_string(),
                role: derive_role(&path),
                modified,
                size_bytes: metadata.len(),
            })
        })
        .filter(|entry| role.is_none_or(|r| entry.role == r))
        .collect();

    entries.sort_by(|a, b| b.modified.cmp(&a.modified));

    let limit = limit.unwrap_or(50).clamp(1, 100) as usize;
    entries.truncate(limit);
    entries
}

#[derive(Debug, thiserror::Error)]
pub enum LogFileError {
    #[error("invalid log filename")]
    InvalidName,
    #[error("log file not found")]
    NotFound,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read a single log file under `<working_dir>/logs`. Rejects any filename
/// containing `..` or `/` so callers cannot escape the logs directory. When
/// `tail` is `Some(n)` with `n` in `1..=10000`, only the last `n` lines are
/// returned; otherwise the full content is returned.
pub fn read_log_file(working_dir: &Path, filename: &str, tail: Option<u32>) -> Result<String, LogFileError> {
    if filename.contains("..") || filename.contains('/') {
        return Err(LogFileError::InvalidName);
    }

    let logs_dir = working_dir.join("logs");
    let path = logs_dir.join(filename);
    if !path.is_file() {
        return Err(LogFileError::NotFound);
    }

    let content = std::fs::read_to_string(&path)?;

    match tail {
        Some(n) if (1..=10000).contains(&n) => {
            let lines: Vec<&str> = content.lines().collect();
            let start = lines.len().saturating_sub(n as usize);
            Ok(lines[start..].join("\n"))
        }
        _ => Ok(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn rejects_traversal_filenames() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_log_file(dir.path(), "../escape.log", None),
            Err(LogFileError::InvalidName)
        ));
        assert!(matches!(
            read_log_file(dir.path(), "sub/dir.log", None),
            Err(LogFileError::InvalidName)
        ));
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_log_file(dir.path(), "missing.log", None),
            Err(LogFileError::NotFound)
        ));
    }

    #[test]
    fn tail_returns_last_n_lines() {
        let dir = tempfile::tempdir().unwrap();
        let logs_dir = dir.path().join("logs");
        fs::create_dir(&logs_dir).unwrap();
        fs::write(logs_dir.join("a.log"), "1\n2\n3\n4\n5\n").unwrap();

        let tailed = read_log_file(dir.path(), "a.log", Some(2)).unwrap();
        assert_eq!(tailed, "4\n5");

        let full = read_log_file(dir.path(), "a.log", None).unwrap();
        assert_eq!(full, "1\n2\n3\n4\n5");
    }

    #[test]
    fn list_logs_filters_by_role_and_sorts_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let collector_dir = dir.path().join("logs").join("collector");
        let executor_dir = dir.path().join("logs").join("executor");
        fs::create_dir_all(&collector_dir).unwrap();
        fs::create_dir_all(&executor_dir).unwrap();
        fs::write(collector_dir.join("c1.log"), "x").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(10));
        fs::write(executor_dir.join("e1.log"), "y").unwrap();

        let all = list_logs(dir.path(), None, None);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].role, "executor");

        let only_collector = list_logs(dir.path(), Some("collector"), None);
        assert_eq!(only_collector.len(), 1);
        assert_eq!(only_collector[0].role, "collector");
    }

    #[test]
    fn list_logs_clamps_limit() {
        let dir = tempfile::tempdir().unwrap();
        let logs_dir = dir.path().join("logs");
        fs::create_dir(&logs_dir).unwrap();
        for i in 0..5 {
            fs::write(logs_dir.join(format!("{i}.log")), "x").unwrap();
        }
        let limited = list_logs(dir.path(), None, Some(2));
        assert_eq!(limited.len(), 2);
    }
}
