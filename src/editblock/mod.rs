//! The SEARCH/REPLACE edit engine.
//!
//! A model response goes through [`extractor`] and [`builder`] to become a
//! batch of [`CodeChange`]s, which [`validator`] checks read-only and
//! [`applier`] writes in order. [`EditBlockCoder`] wires these together
//! over a [`FileStore`].

pub mod applier;
pub mod builder;
pub mod extractor;
pub mod matching;
pub mod prompt;
pub mod validator;

use crate::exceptions::{ApplyError, ParseError};
use crate::fs::is_editable_text;
use crate::models::{ApplyReport, CodeChange, RepoContext, ValidationResult};
use crate::repository::{FileStore, LocalFileStore};
use applier::ApplyOptions;
use std::path::{Path, PathBuf};

pub use extractor::looks_like_edit;

/// An edit format the assistant can speak.
pub trait Coder {
    fn name(&self) -> &str;

    fn supported_languages(&self) -> &[&'static str];

    /// Fails with [`ParseError::NoMatch`] when the text holds no edit block.
    fn parse_response(&self, text: &str) -> Result<Vec<CodeChange>, ParseError>;

    fn validate_changes(&self, changes: &[CodeChange]) -> ValidationResult;

    fn apply_changes(&self, changes: &[CodeChange]) -> Result<ApplyReport, ApplyError>;

    fn generate_prompt(&self, context: &RepoContext) -> String;

    fn can_handle_file(&self, path: &str) -> bool;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoderOptions {
    pub whitespace_flexible: bool,
    pub rollback_on_failure: bool,
    pub backup_files: bool,
}

impl From<CoderOptions> for ApplyOptions {
    fn from(o: CoderOptions) -> Self {
        ApplyOptions {
            whitespace_flexible: o.whitespace_flexible,
            rollback_on_failure: o.rollback_on_failure,
            backup_files: o.backup_files,
        }
    }
}

const SUPPORTED_LANGUAGES: &[&str] = &[
    "python",
    "javascript",
    "typescript",
    "java",
    "cpp",
    "c",
    "go",
    "rust",
    "php",
    "ruby",
    "swift",
    "kotlin",
    "scala",
    "html",
    "css",
    "sql",
    "bash",
    "yaml",
    "json",
    "xml",
    "markdown",
    "toml",
    "text",
];

pub struct EditBlockCoder<S: FileStore = LocalFileStore> {
    store: S,
    options: CoderOptions,
}

impl EditBlockCoder<LocalFileStore> {
    pub fn new(workspace: impl Into<PathBuf>, options: CoderOptions) -> Self {
        Self::with_store(LocalFileStore::new(workspace), options)
    }
}

impl<S: FileStore> EditBlockCoder<S> {
    pub fn with_store(store: S, options: CoderOptions) -> Self {
        Self { store, options }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn options(&self) -> CoderOptions {
        self.options
    }
}

impl<S: FileStore> Coder for EditBlockCoder<S> {
    fn name(&self) -> &str {
        "editblock"
    }

    fn supported_languages(&self) -> &[&'static str] {
        SUPPORTED_LANGUAGES
    }

    fn parse_response(&self, text: &str) -> Result<Vec<CodeChange>, ParseError> {
        builder::build_changes(extractor::extract_blocks(text)?)
    }

    fn validate_changes(&self, changes: &[CodeChange]) -> ValidationResult {
        validator::validate_changes(&self.store, changes, self.options.whitespace_flexible)
    }

    fn apply_changes(&self, changes: &[CodeChange]) -> Result<ApplyReport, ApplyError> {
        applier::apply_changes(&self.store, changes, &self.options.into())
    }

    fn generate_prompt(&self, _context: &RepoContext) -> String {
        prompt::generate_prompt()
    }

    fn can_handle_file(&self, path: &str) -> bool {
        let p = Path::new(path);
        if p.is_absolute() {
            is_editable_text(p)
        } else {
            is_editable_text(&self.store.root().join(p))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChangeType;
    use std::fs;

    #[test]
    fn test_parse_validate_apply_round() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("app.py"), "x = 1\n").unwrap();
        let coder = EditBlockCoder::new(temp.path(), CoderOptions::default());

        let response = "```python\napp.py\n<<<<<<< SEARCH\nx = 1\n=======\nx = 2\n>>>>>>> REPLACE\n```\n";
        let changes = coder.parse_response(response).unwrap();
        assert_eq!(changes[0].change_type, ChangeType::Modify);
        assert!(coder.validate_changes(&changes).is_valid);
        coder.apply_changes(&changes).unwrap();

        assert_eq!(fs::read_to_string(temp.path().join("app.py")).unwrap(), "x = 2\n");
    }

    #[test]
    fn test_can_handle_file() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("data.bin.txt"), b"ab\0cd").unwrap();
        let coder = EditBlockCoder::new(temp.path(), CoderOptions::default());

        assert!(coder.can_handle_file("src/new_module.py"));
        assert!(!coder.can_handle_file("logo.PNG"));
        assert!(!coder.can_handle_file("data.bin.txt"));
        assert_eq!(coder.name(), "editblock");
        assert!(coder.supported_languages().contains(&"rust"));
    }
}
