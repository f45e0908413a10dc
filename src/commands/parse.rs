use crate::commands::{Workspace, read_response, write_json};
use crate::console::{change_table, get_terminal_width};
use crate::editblock::Coder;
use crate::exceptions::AidantError;
use std::path::PathBuf;

pub fn run(ws: &Workspace, input: Option<PathBuf>, json: bool) -> Result<(), AidantError> {
    let response = read_response(input)?;
    let changes = ws.coder().parse_response(&response)?;

    if json {
        return write_json(&changes);
    }
    println!("{}", change_table(&changes, get_terminal_width()));
    Ok(())
}
