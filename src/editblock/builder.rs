use crate::exceptions::ParseError;
use crate::models::{CodeChange, RawBlock};

/// Whole-file blocks whose filename mentions one of these are assumed to be
/// illustrations of the edit format, not real targets. A heuristic only: a
/// genuine `search_utils.py` is dropped too.
pub const FALSE_POSITIVE_TOKENS: [&str; 3] = ["search", "replace", "diff"];

pub fn is_false_positive_filename(filename: &str) -> bool {
    let lower = filename.to_lowercase();
    FALSE_POSITIVE_TOKENS.iter().any(|t| lower.contains(t))
}

/// `./src\lib.rs` -> `src/lib.rs`
pub fn normalize_filename(filename: &str) -> String {
    let mut name = filename.trim().replace('\\', "/");
    while let Some(rest) = name.strip_prefix("./") {
        name = rest.to_string();
    }
    name
}

/// Turns extracted blocks into typed changes, preserving source order.
pub fn build_changes(blocks: Vec<RawBlock>) -> Result<Vec<CodeChange>, ParseError> {
    let mut changes = Vec::with_capacity(blocks.len());

    for block in blocks {
        let filename = normalize_filename(block.filename());
        if filename.is_empty() {
            return Err(ParseError::BadFilename {
                raw: block.filename().to_string(),
            });
        }
        let dialect = block.dialect();

        let change = match block {
            RawBlock::SearchReplace {
                search, replace, ..
            } => {
                let mut change = CodeChange::modify(filename, search.clone(), replace.clone());
                if search.trim().is_empty() {
                    change.old_content = None;
                }
                change
                    .with_metadata("search_content", search)
                    .with_metadata("replace_content", replace)
            }
            RawBlock::WholeFile { body, .. } => {
                if is_false_positive_filename(&filename) {
                    continue;
                }
                CodeChange::create(filename, body)
            }
        };

        changes.push(
            change
                .with_metadata("format", "editblock")
                .with_metadata("dialect", dialect.as_str()),
        );
    }

    if changes.is_empty() {
        return Err(ParseError::NoMatch);
    }
    Ok(changes)
}
