pub mod apply;
pub mod can_handle;
pub mod check;
pub mod generate;
pub mod parse;
pub mod prompt;
pub mod review;

use crate::editblock::{CoderOptions, EditBlockCoder};
use crate::exceptions::AidantError;
use crate::repository::GitRepository;
use crate::settings::Settings;
use crate::utils::init_logging;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// The directory edits are resolved against, plus its settings.
pub struct Workspace {
    pub root: PathBuf,
    pub settings: Settings,
}

impl Workspace {
    pub fn open(root: Option<PathBuf>, verbose: bool) -> Result<Self, AidantError> {
        let root = match root {
            Some(r) => r,
            None => std::env::current_dir()?,
        };
        if !root.is_dir() {
            return Err(AidantError::InvalidInput(format!(
                "Workspace '{}' is not a directory",
                root.display()
            )));
        }
        let root = std::fs::canonicalize(&root)?;
        let settings = Settings::load(&root)?;
        init_logging(verbose || settings.ui.verbose);

        Ok(Self { root, settings })
    }

    pub fn coder_options(&self) -> CoderOptions {
        CoderOptions {
            whitespace_flexible: self.settings.coder.whitespace_flexible,
            rollback_on_failure: self.settings.coder.rollback_on_failure,
            backup_files: self.settings.coder.backup_files,
        }
    }

    pub fn coder(&self) -> EditBlockCoder {
        EditBlockCoder::new(self.root.clone(), self.coder_options())
    }

    pub fn repository(&self) -> GitRepository {
        GitRepository::open(self.root.clone())
    }

    /// Workspace-relative form of a user-supplied path.
    pub fn relative(&self, path: &Path) -> String {
        let rel = if path.is_absolute() {
            path.strip_prefix(&self.root).unwrap_or(path)
        } else {
            path
        };
        rel.to_string_lossy().replace('\\', "/")
    }
}

/// Reads a model response from `input`, or from stdin when it is absent or `-`.
pub fn read_response(input: Option<PathBuf>) -> Result<String, AidantError> {
    let text = match input {
        Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(&path).map_err(|e| {
            AidantError::InvalidInput(format!("Cannot read '{}': {}", path.display(), e))
        })?,
        _ => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };
    if text.trim().is_empty() {
        return Err(AidantError::InvalidInput("Response text is empty.".into()));
    }
    Ok(text)
}

pub fn write_json<T: serde::Serialize>(value: &T) -> Result<(), AidantError> {
    let mut stdout = io::stdout();
    let res = if crate::console::is_stdout_terminal() {
        serde_json::to_writer_pretty(&mut stdout, value)
    } else {
        serde_json::to_writer(&mut stdout, value)
    };

    if let Err(e) = res
        && !e.is_io()
    {
        return Err(AidantError::Serialization(e));
    }
    let _ = writeln!(stdout);
    Ok(())
}
