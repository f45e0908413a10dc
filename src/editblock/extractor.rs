//! Recovers edit blocks from free-form model output.
//!
//! Three dialects are tried in a fixed order and the first one that yields
//! anything wins the whole response. Each matcher is a pure function so it can
//! be exercised on its own.

use crate::editblock::builder::is_false_positive_filename;
use crate::exceptions::ParseError;
use crate::models::{Dialect, RawBlock};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

pub const SEARCH_MARKER: &str = "<<<<<<< SEARCH";
pub const DIVIDER_MARKER: &str = "=======";
pub const REPLACE_MARKER: &str = ">>>>>>> REPLACE";

pub type MatchFn = fn(&str) -> Result<Vec<RawBlock>, ParseError>;

/// Dialects in priority order.
pub const STRATEGIES: [(Dialect, MatchFn); 3] = [
    (Dialect::FencedSearchReplace, match_fenced_search_replace),
    (Dialect::UnfencedSearchReplace, match_unfenced_search_replace),
    (Dialect::FencedWholeFile, match_fenced_whole_file),
];

// SEARCH and REPLACE bodies are lazily optional so that an empty section does
// not swallow the next block's divider.
static FENCED_SEARCH_REPLACE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?s)```(?:[\w+.-]*[ \t]*\r?\n)?(?P<filename>.*?)\r?\n",
        r"<<<<<<< SEARCH[ \t]*\r?\n(?:(?P<search>.*?)\r?\n)??",
        r"=======[ \t]*\r?\n(?:(?P<replace>.*?)\r?\n)??",
        r">>>>>>> REPLACE[ \t]*\r?\n[ \t]*```",
    ))
    .unwrap()
});

static UNFENCED_SEARCH_REPLACE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?s)(?P<filename>.*?)\r?\n",
        r"<<<<<<< SEARCH[ \t]*\r?\n(?:(?P<search>.*?)\r?\n)??",
        r"=======[ \t]*\r?\n(?:(?P<replace>.*?)\r?\n)??",
        r">>>>>>> REPLACE",
    ))
    .unwrap()
});

static FENCED_WHOLE_FILE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?m)^```(?P<info>[^\r\n`]*)\r?\n",
        r"(?P<first>[^\r\n]*)\r?\n",
        r"(?P<body>(?s:.*?))",
        r"^```[ \t]*\r?$",
    ))
    .unwrap()
});

static PATH_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\S+\.\w+").unwrap());

static PATH_SHAPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w\-./\\@+~]*\w[\w\-./\\@+~]*$").unwrap());

/// Runs the dialects in order and returns the blocks of the first one that matched.
pub fn extract_blocks(text: &str) -> Result<Vec<RawBlock>, ParseError> {
    for (dialect, matcher) in STRATEGIES {
        let blocks = matcher(text)?;
        if !blocks.is_empty() {
            debug!(%dialect, count = blocks.len(), "edit blocks extracted");
            return Ok(blocks);
        }
    }
    Err(ParseError::NoMatch)
}

pub fn match_fenced_search_replace(text: &str) -> Result<Vec<RawBlock>, ParseError> {
    match_search_replace(&FENCED_SEARCH_REPLACE_RE, Dialect::FencedSearchReplace, text)
}

pub fn match_unfenced_search_replace(text: &str) -> Result<Vec<RawBlock>, ParseError> {
    match_search_replace(
        &UNFENCED_SEARCH_REPLACE_RE,
        Dialect::UnfencedSearchReplace,
        text,
    )
}

fn match_search_replace(
    re: &Regex,
    dialect: Dialect,
    text: &str,
) -> Result<Vec<RawBlock>, ParseError> {
    let mut blocks = Vec::new();
    for caps in re.captures_iter(text) {
        let search = caps.name("search").map_or("", |m| m.as_str());
        let replace = caps.name("replace").map_or("", |m| m.as_str());

        // A section holding a marker line means the match ran across a block
        // boundary (usually an unclosed fence); the dialect does not apply.
        if has_marker_line(search) || has_marker_line(replace) {
            debug!(%dialect, "block spans a marker line, dialect rejected");
            return Ok(Vec::new());
        }

        let raw_filename = caps.name("filename").map_or("", |m| m.as_str());
        blocks.push(RawBlock::SearchReplace {
            dialect,
            filename: clean_filename(raw_filename)?,
            search: search.to_string(),
            replace: replace.to_string(),
        });
    }
    Ok(blocks)
}

fn has_marker_line(section: &str) -> bool {
    section.lines().any(|line| {
        matches!(
            line.trim_end(),
            SEARCH_MARKER | DIVIDER_MARKER | REPLACE_MARKER
        )
    })
}

/// Fenced blocks whose first line (or info string) names a file.
///
/// Blocks with no plausible filename are illustrative code and are skipped
/// rather than reported.
pub fn match_fenced_whole_file(text: &str) -> Result<Vec<RawBlock>, ParseError> {
    let mut blocks = Vec::new();
    for caps in FENCED_WHOLE_FILE_RE.captures_iter(text) {
        let info = caps.name("info").map_or("", |m| m.as_str()).trim();
        let first = caps.name("first").map_or("", |m| m.as_str());
        let body = caps.name("body").map_or("", |m| m.as_str());

        if has_marker_line(first) || has_marker_line(body) {
            continue;
        }

        let first_clean = strip_decorations(first);
        if looks_like_file_name(first_clean) {
            blocks.push(RawBlock::WholeFile {
                filename: first_clean.to_string(),
                body: body.to_string(),
            });
        } else if looks_like_file_name(info) {
            // ```path/to/file.py style: the first line already belongs to the body
            let mut full = String::with_capacity(first.len() + 1 + body.len());
            full.push_str(first);
            full.push('\n');
            full.push_str(body);
            blocks.push(RawBlock::WholeFile {
                filename: info.to_string(),
                body: full,
            });
        }
    }
    Ok(blocks)
}

/// Reduces the text preceding a SEARCH marker to a single filename.
///
/// Only the last non-empty line counts; fence lines are skipped. If the
/// result still contains whitespace a single `name.ext` token is recovered.
pub fn clean_filename(raw: &str) -> Result<String, ParseError> {
    let last_line = raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with("```"))
        .next_back()
        .unwrap_or("");

    let cleaned = strip_decorations(last_line);
    if cleaned.is_empty() {
        return Err(ParseError::BadFilename {
            raw: raw.to_string(),
        });
    }

    if !cleaned.contains(char::is_whitespace) {
        return Ok(cleaned.to_string());
    }

    PATH_TOKEN_RE
        .find(cleaned)
        .map(|m| strip_decorations(m.as_str()).to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ParseError::BadFilename {
            raw: cleaned.to_string(),
        })
}

fn strip_decorations(s: &str) -> &str {
    s.trim_matches(|c: char| c.is_whitespace() || matches!(c, '\'' | '"' | '`' | '*'))
}

/// A single token made of path characters, with at least one word character.
pub fn looks_like_path(s: &str) -> bool {
    !s.is_empty() && PATH_SHAPE_RE.is_match(s)
}

/// A path with an extension or a directory part. Bare words such as `make`
/// are commands more often than files.
fn looks_like_file_name(s: &str) -> bool {
    looks_like_path(s) && (s.contains('.') || s.contains('/'))
}

/// Cheap check for whether a response is trying to edit files at all.
///
/// Conversational answers are expected to fail this, so the caller can skip
/// parsing instead of reporting a parse error.
pub fn looks_like_edit(text: &str) -> bool {
    if text.contains(SEARCH_MARKER) || text.contains(REPLACE_MARKER) {
        return true;
    }
    match_fenced_whole_file(text)
        .map(|blocks| {
            blocks
                .iter()
                .any(|b| !is_false_positive_filename(b.filename()))
        })
        .unwrap_or(false)
}
