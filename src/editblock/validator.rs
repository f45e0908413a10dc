//! Read-only checks of a batch against the current working tree.
//!
//! Every change is judged against the tree as it is now, never against the
//! effect of earlier changes in the same batch. Running the validator twice
//! with nothing in between gives the same answer.

use crate::editblock::matching::{MatchStrategy, locate};
use crate::models::{ChangeType, CodeChange, ValidationResult};
use crate::repository::FileStore;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Default)]
struct Findings {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl Findings {
    fn error(&mut self, msg: String) {
        self.errors.push(msg);
    }

    fn warn(&mut self, msg: String) {
        self.warnings.push(msg);
    }
}

pub fn validate_changes(
    store: &dyn FileStore,
    changes: &[CodeChange],
    allow_flexible: bool,
) -> ValidationResult {
    let mut findings = Findings::default();

    for change in changes {
        let before = (findings.errors.len(), findings.warnings.len());
        check_change(store, change, allow_flexible, &mut findings);
        debug!(
            path = %change.file_path,
            change_type = %change.change_type,
            errors = findings.errors.len() - before.0,
            warnings = findings.warnings.len() - before.1,
            "validated change"
        );
    }

    ValidationResult::from_parts(findings.errors, findings.warnings)
}

fn check_change(
    store: &dyn FileStore,
    change: &CodeChange,
    allow_flexible: bool,
    findings: &mut Findings,
) {
    let path = change.file_path.as_str();
    if path.trim().is_empty() {
        findings.error("Change has an empty file path".to_string());
        return;
    }
    if !store.contains(path) {
        findings.error(format!("Path {} is outside the workspace", path));
        return;
    }

    match change.change_type {
        ChangeType::Modify => check_modify(store, change, allow_flexible, findings),
        ChangeType::Create => check_create(store, path, findings),
        ChangeType::Delete => {
            if !store.exists(path) {
                findings.warn(format!("File {} does not exist, nothing to delete", path));
            }
        }
        ChangeType::Rename => check_rename(store, change, findings),
    }
}

fn check_modify(
    store: &dyn FileStore,
    change: &CodeChange,
    allow_flexible: bool,
    findings: &mut Findings,
) {
    let path = change.file_path.as_str();
    if !store.exists(path) {
        findings.error(format!("File {} does not exist", path));
        return;
    }
    if store.is_dir(path) {
        findings.error(format!("{} is a directory", path));
        return;
    }

    let current = match store.read(path) {
        Ok(text) => text,
        Err(e) => {
            findings.error(format!("Could not read {}: {}", path, e));
            return;
        }
    };

    // Blank search text means append; nothing to locate
    let Some(search) = change.search_text() else {
        return;
    };

    match locate(&current, search, allow_flexible) {
        None => findings.error(format!("Search content not found in {}", path)),
        Some(mut found) => {
            // A verbatim hit can hide further trimmed occurrences
            found.occurrences = found
                .occurrences
                .max(current.matches(search.trim()).count());
            if found.is_ambiguous() {
                findings.warn(format!(
                    "Multiple matches found for search content in {} ({} occurrences, the first will be replaced)",
                    path, found.occurrences
                ));
            }
            if found.strategy == MatchStrategy::WhitespaceFlexible {
                findings.warn(format!(
                    "Search content in {} only matched after ignoring whitespace",
                    path
                ));
            }
        }
    }
}

fn check_create(store: &dyn FileStore, path: &str, findings: &mut Findings) {
    if let Some(parent) = parent_of(path)
        && !store.is_dir(&parent)
    {
        findings.warn(format!(
            "Parent directory {} does not exist, will be created",
            parent
        ));
    }
    if store.exists(path) {
        findings.warn(format!("File {} already exists, will be overwritten", path));
    }
}

fn check_rename(store: &dyn FileStore, change: &CodeChange, findings: &mut Findings) {
    let path = change.file_path.as_str();
    if !store.exists(path) {
        findings.error(format!("File {} does not exist", path));
    }

    match change.rename_target().filter(|t| !t.is_empty()) {
        None => findings.error(format!("Rename of {} has no destination", path)),
        Some(to) if !store.contains(to) => {
            findings.error(format!("Path {} is outside the workspace", to));
        }
        Some(to) => {
            if store.exists(to) {
                findings.warn(format!("File {} already exists, will be overwritten", to));
            }
        }
    }
}

fn parent_of(path: &str) -> Option<String> {
    Path::new(path)
        .parent()
        .map(|p| p.to_string_lossy().to_string())
        .filter(|p| !p.is_empty())
}
