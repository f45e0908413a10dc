//! Mutates the working tree for a batch that has passed validation.
//!
//! Changes are applied strictly in batch order, each against the content
//! left by the ones before it. Without `rollback_on_failure` a failure
//! leaves earlier changes in place.

use crate::editblock::matching::splice;
use crate::exceptions::{ApplyError, ApplyErrorKind};
use crate::models::{ApplyReport, ChangeType, CodeChange};
use crate::repository::{FileStore, touched_paths};
use std::collections::BTreeSet;
use std::io;
use std::path::Path;
use time::OffsetDateTime;
use time::macros::format_description;
use tracing::{info, warn};

pub const BACKUP_ROOT: &str = ".aidant/backups";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOptions {
    pub whitespace_flexible: bool,
    pub rollback_on_failure: bool,
    pub backup_files: bool,
}

#[derive(Debug)]
enum Snapshot {
    Absent,
    Text(String),
}

/// Pre-batch state of every path, recorded just before its first mutation.
struct Journal {
    seen: BTreeSet<String>,
    snapshots: Vec<(String, Snapshot)>,
    keep_snapshots: bool,
    backup_dir: Option<String>,
    backups_written: bool,
}

impl Journal {
    fn new(options: &ApplyOptions) -> Self {
        Self {
            seen: BTreeSet::new(),
            snapshots: Vec::new(),
            keep_snapshots: options.rollback_on_failure,
            backup_dir: options.backup_files.then(backup_dir_name),
            backups_written: false,
        }
    }

    fn record(&mut self, store: &dyn FileStore, path: &str) -> io::Result<()> {
        if !self.seen.insert(path.to_string()) {
            return Ok(());
        }
        if !self.keep_snapshots && self.backup_dir.is_none() {
            return Ok(());
        }

        let snapshot = if store.exists(path) && !store.is_dir(path) {
            Snapshot::Text(store.read(path)?)
        } else {
            Snapshot::Absent
        };

        if let (Some(dir), Snapshot::Text(text)) = (&self.backup_dir, &snapshot) {
            store.write(&format!("{}/{}", dir, path), text)?;
            self.backups_written = true;
        }
        if self.keep_snapshots {
            self.snapshots.push((path.to_string(), snapshot));
        }
        Ok(())
    }

    /// Restores recorded paths in reverse order. True when every path was restored.
    fn restore(&self, store: &dyn FileStore) -> bool {
        let mut ok = true;
        for (path, snapshot) in self.snapshots.iter().rev() {
            let result = match snapshot {
                Snapshot::Text(text) => store.write(path, text),
                Snapshot::Absent if store.exists(path) && !store.is_dir(path) => {
                    store.delete(path)
                }
                Snapshot::Absent => Ok(()),
            };
            if let Err(e) = result {
                warn!(path = %path, error = %e, "rollback could not restore file");
                ok = false;
            }
        }
        ok
    }
}

fn backup_dir_name() -> String {
    let now = OffsetDateTime::now_utc();
    let stamp = now
        .format(format_description!(
            "[year][month][day]T[hour][minute][second][subsecond digits:3]Z"
        ))
        .unwrap_or_else(|_| now.unix_timestamp().to_string());
    format!("{}/{}", BACKUP_ROOT, stamp)
}

pub fn apply_changes(
    store: &dyn FileStore,
    changes: &[CodeChange],
    options: &ApplyOptions,
) -> Result<ApplyReport, ApplyError> {
    let mut journal = Journal::new(options);

    for (index, change) in changes.iter().enumerate() {
        let result = touched_paths(std::slice::from_ref(change))
            .iter()
            .try_for_each(|p| journal.record(store, p))
            .map_err(ApplyErrorKind::from)
            .and_then(|()| apply_one(store, change, options.whitespace_flexible));

        if let Err(kind) = result {
            let rolled_back = options.rollback_on_failure && journal.restore(store);
            if rolled_back {
                info!(index, "batch rolled back");
            }
            return Err(ApplyError {
                index,
                file_path: change.file_path.clone(),
                kind,
                rolled_back,
            });
        }
        info!(path = %change.file_path, change_type = %change.change_type, "applied change");
    }

    Ok(ApplyReport {
        applied: changes.len(),
        touched_files: touched_paths(changes),
        backup_dir: journal
            .backups_written
            .then_some(journal.backup_dir)
            .flatten(),
    })
}

fn apply_one(
    store: &dyn FileStore,
    change: &CodeChange,
    allow_flexible: bool,
) -> Result<(), ApplyErrorKind> {
    let path = change.file_path.as_str();
    if !store.contains(path) {
        return Err(outside_workspace(path).into());
    }
    let content = change.content.as_deref().unwrap_or("");

    match change.change_type {
        ChangeType::Modify => {
            let current = store.read(path)?;
            let updated = match change.search_text() {
                Some(search) => {
                    splice(&current, search, content, allow_flexible)
                        .ok_or(ApplyErrorKind::StaleSearchText)?
                        .0
                }
                None => format!("{}\n{}", current, content),
            };
            store.write(path, &updated)?;
        }
        ChangeType::Create => {
            if let Some(parent) = Path::new(path).parent().and_then(|p| p.to_str())
                && !parent.is_empty()
            {
                store.mkdirs(parent)?;
            }
            store.write(path, content)?;
        }
        ChangeType::Delete => {
            if store.exists(path) {
                store.delete(path)?;
            }
        }
        ChangeType::Rename => {
            let to = change.rename_target().filter(|t| !t.is_empty()).ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("rename of '{}' has no destination", path),
                )
            })?;
            if !store.contains(to) {
                return Err(outside_workspace(to).into());
            }
            store.rename(path, to)?;
        }
    }
    Ok(())
}

fn outside_workspace(path: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::PermissionDenied,
        format!("'{}' is outside the workspace", path),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::LocalFileStore;
    use std::fs;

    fn workspace() -> (tempfile::TempDir, LocalFileStore) {
        let temp = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(temp.path());
        (temp, store)
    }

    #[test]
    fn test_append_mode_when_search_is_blank() {
        let (temp, store) = workspace();
        fs::write(temp.path().join("log.txt"), "first").unwrap();
        let mut change = CodeChange::modify("log.txt", "", "second");
        change.old_content = None;

        apply_changes(&store, &[change], &ApplyOptions::default()).unwrap();
        assert_eq!(
            fs::read_to_string(temp.path().join("log.txt")).unwrap(),
            "first\nsecond"
        );
    }

    #[test]
    fn test_stale_search_text_is_attributed() {
        let (temp, store) = workspace();
        fs::write(temp.path().join("a.py"), "x = 1\n").unwrap();
        let changes = vec![
            CodeChange::create("new.py", "print(1)\n"),
            CodeChange::modify("a.py", "y = 1", "y = 2"),
        ];

        let err = apply_changes(&store, &changes, &ApplyOptions::default()).unwrap_err();
        assert_eq!(err.index, 1);
        assert_eq!(err.file_path, "a.py");
        assert_eq!(err.kind_name(), "stale-search-text");
        assert!(!err.rolled_back);
        // No rollback by default: the earlier create stays
        assert!(temp.path().join("new.py").exists());
    }

    #[test]
    fn test_rollback_restores_every_touched_path() {
        let (temp, store) = workspace();
        fs::write(temp.path().join("a.py"), "x = 1\n").unwrap();
        fs::write(temp.path().join("old.txt"), "keep me").unwrap();
        let changes = vec![
            CodeChange::modify("a.py", "x = 1", "x = 2"),
            CodeChange::create("pkg/new.py", "print(1)\n"),
            CodeChange::delete("old.txt"),
            CodeChange::modify("a.py", "missing", "nope"),
        ];
        let options = ApplyOptions {
            rollback_on_failure: true,
            ..Default::default()
        };

        let err = apply_changes(&store, &changes, &options).unwrap_err();
        assert_eq!(err.index, 3);
        assert!(err.rolled_back);
        assert_eq!(fs::read_to_string(temp.path().join("a.py")).unwrap(), "x = 1\n");
        assert_eq!(fs::read_to_string(temp.path().join("old.txt")).unwrap(), "keep me");
        assert!(!temp.path().join("pkg/new.py").exists());
    }

    #[test]
    fn test_backups_copy_preexisting_files_only() {
        let (temp, store) = workspace();
        fs::write(temp.path().join("a.py"), "x = 1\n").unwrap();
        let changes = vec![
            CodeChange::modify("a.py", "x = 1", "x = 2"),
            CodeChange::create("b.py", "y\n"),
        ];
        let options = ApplyOptions {
            backup_files: true,
            ..Default::default()
        };

        let report = apply_changes(&store, &changes, &options).unwrap();
        let backup_dir = report.backup_dir.expect("backup dir");
        assert!(backup_dir.starts_with(BACKUP_ROOT));
        let backup_root = temp.path().join(&backup_dir);
        assert_eq!(fs::read_to_string(backup_root.join("a.py")).unwrap(), "x = 1\n");
        assert!(!backup_root.join("b.py").exists());
        assert_eq!(report.touched_files, vec!["a.py", "b.py"]);
    }

    #[test]
    fn test_rename_moves_file() {
        let (temp, store) = workspace();
        fs::write(temp.path().join("a.txt"), "data").unwrap();
        apply_changes(
            &store,
            &[CodeChange::rename("a.txt", "sub/b.txt")],
            &ApplyOptions::default(),
        )
        .unwrap();
        assert!(!temp.path().join("a.txt").exists());
        assert_eq!(fs::read_to_string(temp.path().join("sub/b.txt")).unwrap(), "data");
    }

    #[test]
    fn test_delete_missing_is_noop() {
        let (_temp, store) = workspace();
        let report =
            apply_changes(&store, &[CodeChange::delete("nope.txt")], &ApplyOptions::default())
                .unwrap();
        assert_eq!(report.applied, 1);
    }
}
