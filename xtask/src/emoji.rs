use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

const CODE_EXTENSIONS: &[&str] = &[
    "py", "js", "ts", "jsx", "tsx", "c", "cpp", "h", "hpp", "java", "cs", "rb", "go", "php", "swift", "kt",
    "scala", "rs", "m", "mm", "sh", "pl", "lua", "dart", "html", "css", "json", "xml", "yml", "yaml", "sql",
    "r", "vb", "fs", "erl", "ex", "exs", "groovy", "ps1", "bat", "cmd", "asm", "s", "v", "sv", "vhd", "vhdl",
    "ini", "cfg", "conf", "toml", "md", "txt",
];

const IGNORED_DIRS: &[&str] = &["node_modules", ".git", "__pycache__"];

static EMOJI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        "[",
        r"\x{1F600}-\x{1F64F}", // emoticons
        r"\x{1F300}-\x{1F5FF}", // symbols & pictographs
        r"\x{1F680}-\x{1F6FF}", // transport & map
        r"\x{1F700}-\x{1F77F}",
        r"\x{1F780}-\x{1F7FF}",
        r"\x{1F800}-\x{1F8FF}",
        r"\x{1F900}-\x{1F9FF}",
        r"\x{1FA00}-\x{1FA6F}",
        r"\x{1FA70}-\x{1FAFF}",
        r"\x{2700}-\x{27BF}", // dingbats
        r"\x{24C2}",
        r"\x{1F170}-\x{1F251}", // enclosed alphanumerics and ideographs
        r"\x{1F1E6}-\x{1F1FF}", // flags
        r"\x{200D}",            // zero width joiner
        r"\x{2300}-\x{23FF}",
        r"\x{25A0}-\x{25FF}",
        r"\x{2100}-\x{21FF}",
        r"\x{1F004}\x{1F0CF}",
        r"\x{1F201}-\x{1F2FF}",
        "]"
    ))
    .expect("emoji pattern is valid")
});

fn has_code_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| CODE_EXTENSIONS.contains(&e))
}

/// Returns the content with emoji removed and the removed characters, in order.
pub fn strip(content: &str) -> (String, Vec<String>) {
    let found = EMOJI.find_iter(content).map(|m| m.as_str().to_string()).collect();
    (EMOJI.replace_all(content, "").into_owned(), found)
}

/// Strips one file in place. Returns how many characters were removed.
pub fn strip_file(path: &Path, dry_run: bool) -> anyhow::Result<usize> {
    let bytes = fs::read(path)?;
    let content = String::from_utf8_lossy(&bytes);
    let (cleaned, found) = strip(&content);
    if found.is_empty() {
        return Ok(0);
    }
    println!("Removing from {}:", path.display());
    for e in &found {
        println!("  {:?}", e);
    }
    if !dry_run {
        fs::write(path, cleaned)?;
    }
    Ok(found.len())
}

pub fn run(dir: &Path, dry_run: bool) -> anyhow::Result<()> {
    let walker = WalkDir::new(dir).sort_by_file_name().into_iter().filter_entry(|e| {
        !(e.depth() > 0
            && e.file_type().is_dir()
            && e.file_name().to_str().is_some_and(|n| IGNORED_DIRS.contains(&n)))
    });
    let mut removed = 0;
    for entry in walker.filter_map(Result::ok) {
        if !entry.file_type().is_file() || !has_code_extension(entry.path()) {
            continue;
        }
        match strip_file(entry.path(), dry_run) {
            Ok(n) => removed += n,
            Err(e) => tracing::error!(path = %entry.path().display(), error = %e, "strip failed"),
        }
    }
    tracing::info!(removed, dry_run, "done");
    println!("Emojis removed from all code files in {} and its subdirectories.", dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_pictographs_keeps_text() {
        let (out, found) = strip("ok 😀 done 🚀\n// 中文 ✔");
        assert_eq!(out, "ok  done \n// 中文 ");
        assert_eq!(found, vec!["😀", "🚀", "✔"]);
    }

    #[test]
    fn untouched_files_are_not_rewritten() {
        let tmp = tempfile::tempdir().unwrap();
        let plain = tmp.path().join("plain.rs");
        fs::write(&plain, "fn main() {}\n").unwrap();
        assert_eq!(strip_file(&plain, false).unwrap(), 0);
    }

    #[test]
    fn walks_code_files_only() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join("a.ts"), "const x = '🎉';\n").unwrap();
        fs::write(root.join("b.png"), "🎉").unwrap();
        fs::write(root.join(".git/c.md"), "🎉").unwrap();

        run(root, false).unwrap();
        assert_eq!(fs::read_to_string(root.join("a.ts")).unwrap(), "const x = '';\n");
        assert_eq!(fs::read_to_string(root.join("b.png")).unwrap(), "🎉");
        assert_eq!(fs::read_to_string(root.join(".git/c.md")).unwrap(), "🎉");
    }

    #[test]
    fn dry_run_leaves_file() {
        let tmp = tempfile::tempdir().unwrap();
        let f = tmp.path().join("x.md");
        fs::write(&f, "hi 👋").unwrap();
        assert_eq!(strip_file(&f, true).unwrap(), 1);
        assert_eq!(fs::read_to_string(&f).unwrap(), "hi 👋");
    }
}
