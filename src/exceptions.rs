use thiserror::Error;

/// Failure to recover any edit from a model response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("No recognized edit pattern found in response")]
    NoMatch,

    #[error("Could not extract a valid filename from: {raw:?}")]
    BadFilename { raw: String },
}

impl ParseError {
    pub fn kind(&self) -> &'static str {
        match self {
            ParseError::NoMatch => "no-match",
            ParseError::BadFilename { .. } => "bad-filename",
        }
    }
}

#[derive(Error, Debug)]
pub enum ApplyErrorKind {
    #[error("write failed: {0}")]
    WriteFailure(#[from] std::io::Error),

    #[error("search text is no longer present")]
    StaleSearchText,
}

/// Terminal outcome of a batch that could not be applied in full.
///
/// `index` is the zero-based position of the failing change in the batch.
/// Changes before it were applied unless `rolled_back` is set.
#[derive(Debug)]
pub struct ApplyError {
    pub index: usize,
    pub file_path: String,
    pub kind: ApplyErrorKind,
    pub rolled_back: bool,
}

impl std::fmt::Display for ApplyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "change #{} ({}) failed: {}",
            self.index + 1,
            self.file_path,
            self.kind
        )?;
        if self.rolled_back {
            write!(f, " (batch rolled back)")?;
        }
        Ok(())
    }
}

impl std::error::Error for ApplyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl ApplyError {
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            ApplyErrorKind::WriteFailure(_) => "write-failure",
            ApplyErrorKind::StaleSearchText => "stale-search-text",
        }
    }
}

#[derive(Error, Debug)]
pub enum AidantError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("LLM Provider error: {0}")]
    Provider(String),

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Apply error: {0}")]
    Apply(#[from] ApplyError),
}
