use crate::exceptions::AidantError;
use crate::fs::{atomic_write_text, detect_language, resolve_in_workspace};
use crate::models::{ChangeType, CodeChange, RepoContext};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// File operations the edit engine needs, addressed by workspace-relative path.
pub trait FileStore {
    fn root(&self) -> &Path;

    /// Whether `rel` stays inside the workspace once resolved.
    fn contains(&self, rel: &str) -> bool;

    fn read(&self, rel: &str) -> io::Result<String>;

    /// Writes the full text, creating parent directories as needed.
    fn write(&self, rel: &str, text: &str) -> io::Result<()>;

    fn delete(&self, rel: &str) -> io::Result<()>;

    fn exists(&self, rel: &str) -> bool;

    fn is_dir(&self, rel: &str) -> bool;

    fn mkdirs(&self, rel: &str) -> io::Result<()>;

    fn rename(&self, from: &str, to: &str) -> io::Result<()>;
}

/// The real working tree.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, rel: &str) -> io::Result<PathBuf> {
        resolve_in_workspace(&self.root, rel).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("'{}' is outside the workspace", rel),
            )
        })
    }
}

impl FileStore for LocalFileStore {
    fn root(&self) -> &Path {
        &self.root
    }

    fn contains(&self, rel: &str) -> bool {
        resolve_in_workspace(&self.root, rel).is_some()
    }

    fn read(&self, rel: &str) -> io::Result<String> {
        fs::read_to_string(self.resolve(rel)?)
    }

    fn write(&self, rel: &str, text: &str) -> io::Result<()> {
        atomic_write_text(self.resolve(rel)?, text)
    }

    fn delete(&self, rel: &str) -> io::Result<()> {
        fs::remove_file(self.resolve(rel)?)
    }

    fn exists(&self, rel: &str) -> bool {
        self.resolve(rel).map(|p| p.exists()).unwrap_or(false)
    }

    fn is_dir(&self, rel: &str) -> bool {
        if rel.is_empty() {
            return self.root.is_dir();
        }
        self.resolve(rel).map(|p| p.is_dir()).unwrap_or(false)
    }

    fn mkdirs(&self, rel: &str) -> io::Result<()> {
        if rel.is_empty() {
            return fs::create_dir_all(&self.root);
        }
        fs::create_dir_all(self.resolve(rel)?)
    }

    fn rename(&self, from: &str, to: &str) -> io::Result<()> {
        let src = self.resolve(from)?;
        let dst = self.resolve(to)?;
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(src, dst)
    }
}

/// Version control and repository-level context.
pub trait Repository {
    fn root_path(&self) -> &Path;

    fn is_vcs_repo(&self) -> bool;

    fn get_context(&self, paths: &[String]) -> RepoContext;

    /// Records the files touched by `changes` and returns the new revision id.
    fn commit_changes(&self, changes: &[CodeChange], message: &str) -> Result<String, AidantError>;

    fn is_clean(&self) -> Result<bool, AidantError>;
}

#[derive(Debug, Clone)]
pub struct GitRepository {
    root: PathBuf,
    is_git: bool,
}

impl GitRepository {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let is_git = Command::new("git")
            .args(["rev-parse", "--is-inside-work-tree"])
            .current_dir(&root)
            .output()
            .map(|out| out.status.success())
            .unwrap_or(false);
        Self { root, is_git }
    }

    fn run(&self, args: &[&str]) -> Result<String, AidantError> {
        debug!(?args, "git");
        let out = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .output()
            .map_err(|e| AidantError::Repository(format!("failed to run git: {}", e)))?;
        if !out.status.success() {
            return Err(AidantError::Repository(format!(
                "git {} failed: {}",
                args.first().copied().unwrap_or(""),
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&out.stdout).trim().to_string())
    }

    fn is_tracked(&self, rel: &str) -> bool {
        self.run(&["ls-files", "--error-unmatch", "--", rel]).is_ok()
    }

    pub fn current_branch(&self) -> Option<String> {
        if !self.is_git {
            return None;
        }
        self.run(&["rev-parse", "--abbrev-ref", "HEAD"]).ok()
    }
}

/// Every workspace path a batch touches, in first-seen order.
pub fn touched_paths(changes: &[CodeChange]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut paths = Vec::new();
    for change in changes {
        let mut push = |p: &str| {
            if seen.insert(p.to_string()) {
                paths.push(p.to_string());
            }
        };
        push(&change.file_path);
        if change.change_type == ChangeType::Rename
            && let Some(to) = change.rename_target()
        {
            push(to);
        }
    }
    paths
}

impl Repository for GitRepository {
    fn root_path(&self) -> &Path {
        &self.root
    }

    fn is_vcs_repo(&self) -> bool {
        self.is_git
    }

    fn get_context(&self, paths: &[String]) -> RepoContext {
        let mut ctx = RepoContext {
            root_path: self.root.to_string_lossy().to_string(),
            is_vcs_repo: self.is_git,
            current_branch: self.current_branch(),
            ..Default::default()
        };

        let mut languages = BTreeSet::new();
        for rel in paths {
            let content = resolve_in_workspace(&self.root, rel)
                .ok_or_else(|| "outside the workspace".to_string())
                .and_then(|p| fs::read_to_string(p).map_err(|e| e.to_string()));

            match content {
                Ok(text) => {
                    ctx.total_lines += text.lines().count();
                    if let Some(lang) = detect_language(Path::new(rel)) {
                        languages.insert(lang.to_string());
                    }
                    ctx.file_contents.insert(rel.clone(), text);
                }
                Err(e) => {
                    ctx.file_contents
                        .insert(rel.clone(), format!("Error reading file: {}", e));
                }
            }
        }
        ctx.detected_languages = languages.into_iter().collect();
        ctx
    }

    fn commit_changes(&self, changes: &[CodeChange], message: &str) -> Result<String, AidantError> {
        if !self.is_git {
            return Err(AidantError::Repository(
                "workspace is not a git repository".into(),
            ));
        }
        // A path that is neither on disk nor in the index (a delete of a file
        // that never existed) is not a valid pathspec for git.
        let paths: Vec<String> = touched_paths(changes)
            .into_iter()
            .filter(|p| self.root.join(p).exists() || self.is_tracked(p))
            .collect();
        if paths.is_empty() {
            return Err(AidantError::Repository("nothing to commit".into()));
        }

        let mut add_args = vec!["add", "-A", "--"];
        add_args.extend(paths.iter().map(String::as_str));
        self.run(&add_args)?;

        let mut commit_args = vec!["commit", "-m", message, "--"];
        commit_args.extend(paths.iter().map(String::as_str));
        self.run(&commit_args)?;

        self.run(&["rev-parse", "--short", "HEAD"])
    }

    fn is_clean(&self) -> Result<bool, AidantError> {
        if !self.is_git {
            return Ok(true);
        }
        Ok(self.run(&["status", "--porcelain"])?.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_store_refuses_paths_outside_root() {
        let temp = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(temp.path());

        assert!(!store.contains("../escape.txt"));
        let err = store.write("../escape.txt", "x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        assert!(!temp.path().parent().unwrap().join("escape.txt").exists());
    }

    #[test]
    fn test_local_store_write_creates_parents() {
        let temp = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(temp.path());

        store.write("a/b/c.txt", "hi").unwrap();
        assert_eq!(store.read("a/b/c.txt").unwrap(), "hi");
        assert!(store.is_dir("a/b"));
        assert!(store.is_dir(""));
    }

    #[test]
    fn test_touched_paths_includes_rename_targets_once() {
        let changes = vec![
            CodeChange::modify("a.py", "x", "y"),
            CodeChange::rename("a.py", "b.py"),
            CodeChange::create("b.py", ""),
        ];
        assert_eq!(touched_paths(&changes), vec!["a.py", "b.py"]);
    }

    #[test]
    fn test_get_context_outside_git_reports_contents_and_languages() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("main.py"), "a\nb\n").unwrap();
        fs::write(temp.path().join("lib.rs"), "fn x() {}\n").unwrap();
        let repo = GitRepository {
            root: temp.path().to_path_buf(),
            is_git: false,
        };

        let ctx = repo.get_context(&[
            "main.py".to_string(),
            "lib.rs".to_string(),
            "missing.txt".to_string(),
        ]);

        assert!(!ctx.is_vcs_repo);
        assert_eq!(ctx.total_lines, 3);
        assert_eq!(ctx.detected_languages, vec!["python", "rust"]);
        assert!(ctx.file_contents["missing.txt"].starts_with("Error reading file:"));
    }
}
