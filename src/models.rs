use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Create,
    Modify,
    Delete,
    Rename,
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeType::Create => write!(f, "create"),
            ChangeType::Modify => write!(f, "modify"),
            ChangeType::Delete => write!(f, "delete"),
            ChangeType::Rename => write!(f, "rename"),
        }
    }
}

/// The textual grammar a block was recovered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Dialect {
    FencedSearchReplace,
    UnfencedSearchReplace,
    FencedWholeFile,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::FencedSearchReplace => "fenced-search-replace",
            Dialect::UnfencedSearchReplace => "unfenced-search-replace",
            Dialect::FencedWholeFile => "fenced-whole-file",
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Extraction ---

/// One edit block as found in the response, before it is typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawBlock {
    SearchReplace {
        dialect: Dialect,
        filename: String,
        search: String,
        replace: String,
    },
    WholeFile {
        filename: String,
        body: String,
    },
}

impl RawBlock {
    pub fn filename(&self) -> &str {
        match self {
            RawBlock::SearchReplace { filename, .. } | RawBlock::WholeFile { filename, .. } => {
                filename
            }
        }
    }

    pub fn dialect(&self) -> Dialect {
        match self {
            RawBlock::SearchReplace { dialect, .. } => *dialect,
            RawBlock::WholeFile { .. } => Dialect::FencedWholeFile,
        }
    }
}

// --- Changes ---

/// Provenance carried alongside a change for diagnostics and display.
pub type ChangeMetadata = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeChange {
    pub file_path: String,
    pub change_type: ChangeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_start: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_end: Option<usize>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: ChangeMetadata,
}

impl CodeChange {
    pub fn modify(
        file_path: impl Into<String>,
        old_content: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            change_type: ChangeType::Modify,
            content: Some(content.into()),
            old_content: Some(old_content.into()),
            line_start: None,
            line_end: None,
            metadata: ChangeMetadata::new(),
        }
    }

    pub fn create(file_path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            change_type: ChangeType::Create,
            content: Some(content.into()),
            old_content: None,
            line_start: None,
            line_end: None,
            metadata: ChangeMetadata::new(),
        }
    }

    pub fn delete(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            change_type: ChangeType::Delete,
            content: None,
            old_content: None,
            line_start: None,
            line_end: None,
            metadata: ChangeMetadata::new(),
        }
    }

    /// A rename keeps its destination path in `content`.
    pub fn rename(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            file_path: from.into(),
            change_type: ChangeType::Rename,
            content: Some(to.into()),
            old_content: None,
            line_start: None,
            line_end: None,
            metadata: ChangeMetadata::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// The search text to locate, or `None` when it is blank and the change
    /// appends instead. Matching decides itself whether to trim it.
    pub fn search_text(&self) -> Option<&str> {
        self.old_content
            .as_deref()
            .filter(|s| !s.trim().is_empty())
    }

    pub fn rename_target(&self) -> Option<&str> {
        match self.change_type {
            ChangeType::Rename => self.content.as_deref().map(str::trim),
            _ => None,
        }
    }
}

// --- Validation ---

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn from_parts(errors: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
            warnings,
        }
    }
}

// --- Application ---

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub applied: usize,
    pub touched_files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_dir: Option<String>,
}

// --- Repository ---

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoContext {
    pub root_path: String,
    pub is_vcs_repo: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_branch: Option<String>,
    pub file_contents: BTreeMap<String, String>,
    pub detected_languages: Vec<String>,
    pub total_lines: usize,
}

// --- LLM ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InteractionResult {
    pub content: String,
    pub token_usage: Option<TokenUsage>,
    pub duration_ms: u64,
}
