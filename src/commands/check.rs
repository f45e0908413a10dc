use crate::commands::{Workspace, read_response, write_json};
use crate::console::{change_table, get_terminal_width, print_validation};
use crate::editblock::Coder;
use crate::exceptions::AidantError;
use crate::models::{CodeChange, ValidationResult};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct CheckOutput<'a> {
    changes: &'a [CodeChange],
    validation: &'a ValidationResult,
}

/// Parses and validates without touching the workspace. Fails when the batch is rejected.
pub fn run(ws: &Workspace, input: Option<PathBuf>, json: bool) -> Result<(), AidantError> {
    let response = read_response(input)?;
    let coder = ws.coder();
    let changes = coder.parse_response(&response)?;
    let validation = coder.validate_changes(&changes);

    if json {
        write_json(&CheckOutput {
            changes: &changes,
            validation: &validation,
        })?;
    } else {
        println!("{}", change_table(&changes, get_terminal_width()));
        print_validation(&validation);
        if validation.is_valid {
            println!("{} change(s) can be applied.", changes.len());
        }
    }

    if !validation.is_valid {
        return Err(AidantError::Validation(format!(
            "{} error(s)",
            validation.errors.len()
        )));
    }
    Ok(())
}
