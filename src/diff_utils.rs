use crate::editblock::matching::splice;
use crate::models::{ChangeType, CodeChange};
use crate::repository::{FileStore, touched_paths};
use similar::TextDiff;
use std::borrow::Cow;
use std::collections::BTreeMap;

pub fn generate_diff(
    filename: &str,
    old_content: Option<&str>,
    new_content: Option<&str>,
) -> String {
    let from_header = match old_content {
        None => "/dev/null".to_string(),
        Some(_) => format!("a/{}", filename),
    };
    let to_header = match new_content {
        None => "/dev/null".to_string(),
        Some(_) => format!("b/{}", filename),
    };

    let diff = TextDiff::from_lines(old_content.unwrap_or(""), new_content.unwrap_or(""))
        .unified_diff()
        .header(&quote_filename(&from_header), &quote_filename(&to_header))
        .missing_newline_hint(true)
        .to_string();

    // similar emits nothing without hunks; keep headers for empty creates/deletes
    if diff.is_empty() && old_content.is_none() != new_content.is_none() {
        return format!(
            "--- {}\n+++ {}\n",
            quote_filename(&from_header),
            quote_filename(&to_header)
        );
    }

    diff
}

fn quote_filename(filename: &str) -> Cow<'_, str> {
    if filename.contains(' ') {
        format!("\"{}\"", filename).into()
    } else {
        filename.into()
    }
}

/// What one touched path looks like before and after the whole batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePreview {
    pub path: String,
    pub diff: String,
    /// Set when a Modify in the batch could not be located during simulation.
    pub unmatched: bool,
}

/// Simulates the batch over an in-memory copy of the touched files and
/// renders one diff per path, in first-touched order. Nothing is written.
pub fn preview_changes(
    store: &dyn FileStore,
    changes: &[CodeChange],
    allow_flexible: bool,
) -> Vec<FilePreview> {
    let paths = touched_paths(changes);
    let original: BTreeMap<&str, Option<String>> = paths
        .iter()
        .map(|p| (p.as_str(), store.read(p).ok()))
        .collect();
    let mut overlay = original.clone();
    let mut unmatched: BTreeMap<&str, bool> = BTreeMap::new();

    for change in changes {
        let path = change.file_path.as_str();
        let content = change.content.as_deref().unwrap_or("");
        match change.change_type {
            ChangeType::Modify => {
                let current = overlay.get(path).cloned().flatten().unwrap_or_default();
                let next = match change.search_text() {
                    Some(search) => match splice(&current, search, content, allow_flexible) {
                        Some((patched, _)) => patched,
                        None => {
                            unmatched.insert(path, true);
                            current
                        }
                    },
                    None => format!("{}\n{}", current, content),
                };
                overlay.insert(path, Some(next));
            }
            ChangeType::Create => {
                overlay.insert(path, Some(content.to_string()));
            }
            ChangeType::Delete => {
                overlay.insert(path, None);
            }
            ChangeType::Rename => {
                if let Some(to) = change.rename_target().filter(|t| !t.is_empty()) {
                    let moved = overlay.insert(path, None).flatten();
                    if let Some(slot) = overlay.get_mut(to) {
                        *slot = moved;
                    }
                }
            }
        }
    }

    paths
        .iter()
        .map(|p| {
            let before = original.get(p.as_str()).cloned().flatten();
            let after = overlay.get(p.as_str()).cloned().flatten();
            FilePreview {
                path: p.clone(),
                diff: generate_diff(p, before.as_deref(), after.as_deref()),
                unmatched: unmatched.get(p.as_str()).copied().unwrap_or(false),
            }
        })
        .collect()
}
