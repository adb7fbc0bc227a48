use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::{DirEntry, WalkDir};

const IGNORED_DIRS: &[&str] = &["node_modules", "venv", "__pycache__", ".git", "build", "dist"];
const IGNORED_SUFFIXES: &[&str] = &[".min.js", ".pyc", ".exe", ".dll", ".so", ".bin"];

#[derive(Debug, Default)]
pub struct LineReport {
    pub files: Vec<(PathBuf, usize)>,
    pub total: usize,
}

fn is_ignored_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry.file_name().to_str().is_some_and(|n| IGNORED_DIRS.contains(&n))
}

pub fn is_ignored_file(name: &str) -> bool {
    IGNORED_SUFFIXES.iter().any(|s| name.ends_with(s))
}

/// Line count of a file read as lossy UTF-8. A final line without a newline still counts.
pub fn count_lines(bytes: &[u8]) -> usize {
    String::from_utf8_lossy(bytes).lines().count()
}

pub fn scan(dir: &Path) -> LineReport {
    let mut report = LineReport::default();
    let walker = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_ignored_dir(e));
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::error!(error = %e, "walk failed");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.file_name().to_str().is_some_and(is_ignored_file) {
            continue;
        }
        let n = match fs::read(entry.path()) {
            Ok(bytes) => count_lines(&bytes),
            Err(e) => {
                tracing::error!(path = %entry.path().display(), error = %e, "read failed");
                0
            }
        };
        if n > 0 {
            report.total += n;
            report.files.push((entry.into_path(), n));
        }
    }
    report
}

pub fn run(dir: &Path) -> anyhow::Result<()> {
    if !dir.is_dir() {
        tracing::error!("the provided path {:?} is not a valid directory", dir);
        return Ok(());
    }
    let started = Instant::now();
    let report = scan(dir);
    for (path, n) in &report.files {
        println!("{}: {} lines", path.display(), n);
    }
    println!("Total lines of code: {}", report.total);
    println!("Time taken: {:.2} seconds", started.elapsed().as_secs_f64());
    Ok(())
}
