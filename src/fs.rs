use crate::exceptions::AidantError;
use std::fs;
use std::io::{Read, Write};
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;
use tempfile::NamedTempFile;

/// Extensions that are never treated as editable text.
pub const BINARY_EXTENSIONS: &[&str] = &[
    "exe", "bin", "dll", "so", "dylib", "o", "a", "class", "jar", "pyc", "jpg", "jpeg", "png",
    "gif", "bmp", "ico", "webp", "pdf", "zip", "tar", "gz", "bz2", "xz", "7z", "woff", "woff2",
    "ttf", "mp3", "mp4", "wav", "sqlite",
];

const SNIFF_LEN: usize = 1024;

/// Atomically write text to a file using a temporary file + rename strategy.
pub fn atomic_write_text<P: AsRef<Path>>(path: P, text: &str) -> Result<(), std::io::Error> {
    let path = path.as_ref();
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    // Same directory as the target so the rename never crosses filesystems
    let mut temp_file = NamedTempFile::new_in(dir)?;
    temp_file.write_all(text.as_bytes())?;
    temp_file.persist(path).map_err(|e| e.error)?;

    Ok(())
}

pub fn atomic_write_json<T: serde::Serialize>(path: &Path, data: &T) -> Result<(), AidantError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let mut temp_file = NamedTempFile::new_in(dir)?;
    {
        let mut writer = std::io::BufWriter::new(&mut temp_file);
        serde_json::to_writer_pretty(&mut writer, data)?;
        writer.flush()?;
    }

    temp_file.persist(path).map_err(|e| AidantError::Io(e.error))?;
    Ok(())
}

pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, AidantError> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Lexically resolves `.` and `..` without touching the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    path.components()
        .fold(PathBuf::new(), |mut acc, component| {
            match component {
                Component::ParentDir => {
                    acc.pop();
                }
                Component::CurDir => {}
                c => acc.push(c.as_os_str()),
            };
            acc
        })
}

/// Resolves a workspace-relative path, refusing anything that lands outside `root`.
///
/// Symlinked parents are followed when they exist so a link cannot be used to
/// escape the workspace.
pub fn resolve_in_workspace(root: &Path, rel: &str) -> Option<PathBuf> {
    let rel_path = Path::new(rel);
    if rel.trim().is_empty() || rel_path.is_absolute() || rel_path.has_root() {
        return None;
    }

    // Reject traversal before normalization can hide it
    let mut depth: isize = 0;
    for component in rel_path.components() {
        match component {
            Component::ParentDir => depth -= 1,
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::RootDir | Component::Prefix(_) => return None,
        }
        if depth < 0 {
            return None;
        }
    }

    let joined = normalize_path(&root.join(rel_path));

    if let Ok(root_canon) = fs::canonicalize(root) {
        let mut ancestor = joined.as_path();
        // Canonicalize the deepest existing ancestor
        loop {
            if ancestor.exists() {
                if let Ok(canon) = fs::canonicalize(ancestor)
                    && !canon.starts_with(&root_canon)
                {
                    return None;
                }
                break;
            }
            match ancestor.parent() {
                Some(parent) => ancestor = parent,
                None => break,
            }
        }
    }

    Some(joined)
}

pub fn has_binary_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let lower = e.to_ascii_lowercase();
            BINARY_EXTENSIONS.contains(&lower.as_str())
        })
        .unwrap_or(false)
}

/// True when the first kilobyte of the file contains a NUL byte.
pub fn sniff_binary(path: &Path) -> std::io::Result<bool> {
    let mut file = fs::File::open(path)?;
    let mut buf = [0u8; SNIFF_LEN];
    let mut filled = 0;
    while filled < SNIFF_LEN {
        let n = file.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(buf[..filled].contains(&0))
}

/// A path is editable unless its extension is denylisted or its content sniffs as binary.
/// Paths that do not exist yet are judged by extension alone.
pub fn is_editable_text(path: &Path) -> bool {
    if has_binary_extension(path) {
        return false;
    }
    if path.is_file() {
        return !sniff_binary(path).unwrap_or(true);
    }
    !path.is_dir()
}

pub fn detect_language(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let lang = match ext.as_str() {
        "py" => "python",
        "js" | "jsx" | "mjs" | "cjs" => "javascript",
        "ts" | "tsx" => "typescript",
        "java" => "java",
        "cpp" | "cc" | "cxx" | "hpp" => "cpp",
        "c" | "h" => "c",
        "go" => "go",
        "rs" => "rust",
        "php" => "php",
        "rb" => "ruby",
        "swift" => "swift",
        "kt" => "kotlin",
        "scala" => "scala",
        "html" | "htm" => "html",
        "css" => "css",
        "scss" => "scss",
        "sass" => "sass",
        "less" => "less",
        "sql" => "sql",
        "sh" | "bash" => "bash",
        "zsh" => "zsh",
        "fish" => "fish",
        "yml" | "yaml" => "yaml",
        "json" => "json",
        "xml" => "xml",
        "md" | "markdown" => "markdown",
        "txt" => "text",
        "toml" => "toml",
        "ini" | "cfg" | "conf" => "ini",
        _ => return None,
    };
    Some(lang)
}
