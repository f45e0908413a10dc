use crate::commands::review::{ReviewOptions, review_and_apply};
use crate::commands::{Workspace, read_response};
use crate::exceptions::AidantError;
use std::path::PathBuf;

pub fn run(ws: &Workspace, input: Option<PathBuf>, opts: ReviewOptions) -> Result<(), AidantError> {
    let response = read_response(input)?;
    review_and_apply(ws, &response, &opts)?;
    Ok(())
}
