use crate::commands::Workspace;
use crate::editblock::prompt::build_system_prompt;
use crate::exceptions::AidantError;
use crate::repository::Repository;
use std::path::PathBuf;

/// Prints the system prompt that `gen` would send for these files.
pub fn run(ws: &Workspace, files: Vec<PathBuf>) -> Result<(), AidantError> {
    let rel: Vec<String> = files.iter().map(|f| ws.relative(f)).collect();
    let context = ws.repository().get_context(&rel);
    print!("{}", build_system_prompt(&context, &ws.coder()));
    Ok(())
}
