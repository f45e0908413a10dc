use crate::commands::{Workspace, write_json};
use crate::editblock::Coder;
use crate::exceptions::AidantError;
use std::collections::BTreeMap;
use std::path::PathBuf;

pub fn run(ws: &Workspace, paths: Vec<PathBuf>, json: bool) -> Result<(), AidantError> {
    let coder = ws.coder();
    let verdicts: BTreeMap<String, bool> = paths
        .iter()
        .map(|p| {
            let rel = ws.relative(p);
            let ok = coder.can_handle_file(&rel);
            (rel, ok)
        })
        .collect();

    if json {
        return write_json(&verdicts);
    }
    for (path, ok) in &verdicts {
        println!("{}\t{}", path, if *ok { "yes" } else { "no" });
    }
    Ok(())
}
