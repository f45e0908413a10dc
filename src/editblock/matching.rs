//! Locating a SEARCH section inside a file and splicing in its replacement.
//!
//! The validator and the applier both go through [`locate`] / [`splice`], so
//! whatever the validator accepted is exactly what the applier will touch.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    /// The search text as written, byte for byte.
    Verbatim,
    /// The search text with surrounding whitespace removed.
    Trimmed,
    /// Line by line, ignoring indentation and trailing whitespace.
    WhitespaceFlexible,
}

impl std::fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchStrategy::Verbatim => write!(f, "verbatim"),
            MatchStrategy::Trimmed => write!(f, "trimmed"),
            MatchStrategy::WhitespaceFlexible => write!(f, "whitespace-flexible"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchMatch {
    pub strategy: MatchStrategy,
    /// Non-overlapping occurrences for the winning strategy. Always >= 1.
    pub occurrences: usize,
}

impl SearchMatch {
    pub fn is_ambiguous(&self) -> bool {
        self.occurrences > 1
    }
}

/// Finds where `search` lives in `content`. Blank search text never matches.
pub fn locate(content: &str, search: &str, allow_flexible: bool) -> Option<SearchMatch> {
    let trimmed = search.trim();
    if trimmed.is_empty() {
        return None;
    }

    for (strategy, needle) in [
        (MatchStrategy::Verbatim, search),
        (MatchStrategy::Trimmed, trimmed),
    ] {
        let occurrences = content.matches(needle).count();
        if occurrences > 0 {
            return Some(SearchMatch {
                strategy,
                occurrences,
            });
        }
    }

    if allow_flexible {
        let original_lines: Vec<&str> = content.split_inclusive('\n').collect();
        let starts = flexible_match_starts(&original_lines, &search_lines(search));
        if !starts.is_empty() {
            return Some(SearchMatch {
                strategy: MatchStrategy::WhitespaceFlexible,
                occurrences: starts.len(),
            });
        }
    }

    None
}

/// Replaces the first occurrence of `search` in `content` with `replace`.
pub fn splice(
    content: &str,
    search: &str,
    replace: &str,
    allow_flexible: bool,
) -> Option<(String, MatchStrategy)> {
    let found = locate(content, search, allow_flexible)?;
    let patched = match found.strategy {
        MatchStrategy::Verbatim => replace_first(content, search, replace)?,
        MatchStrategy::Trimmed => replace_first(content, search.trim(), replace)?,
        MatchStrategy::WhitespaceFlexible => splice_flexible(content, search, replace)?,
    };
    Some((patched, found.strategy))
}

fn replace_first(original: &str, needle: &str, replace: &str) -> Option<String> {
    let idx = original.find(needle)?;
    let mut res = String::with_capacity(original.len() - needle.len() + replace.len());
    res.push_str(&original[..idx]);
    res.push_str(replace);
    res.push_str(&original[idx + needle.len()..]);
    Some(res)
}

fn search_lines(search: &str) -> Vec<&str> {
    search
        .trim_matches(|c| c == '\n' || c == '\r')
        .split('\n')
        .map(|l| l.trim())
        .collect()
}

fn flexible_match_starts(original_lines: &[&str], stripped_search: &[&str]) -> Vec<usize> {
    if stripped_search.is_empty()
        || stripped_search.iter().all(|s| s.is_empty())
        || stripped_search.len() > original_lines.len()
    {
        return Vec::new();
    }

    let mut starts = Vec::new();
    let mut i = 0;
    while i + stripped_search.len() <= original_lines.len() {
        let window = &original_lines[i..i + stripped_search.len()];
        let hit = window
            .iter()
            .zip(stripped_search)
            .all(|(orig, wanted)| orig.trim() == *wanted);
        if hit {
            starts.push(i);
            i += stripped_search.len();
        } else {
            i += 1;
        }
    }
    starts
}

fn splice_flexible(original: &str, search: &str, replace: &str) -> Option<String> {
    let original_lines: Vec<&str> = original.split_inclusive('\n').collect();
    let stripped_search = search_lines(search);
    let start_idx = *flexible_match_starts(&original_lines, &stripped_search).first()?;
    let end_idx = start_idx + stripped_search.len();

    let matched_chunk = &original_lines[start_idx..end_idx];
    let replace_lines: Vec<&str> = replace.split_inclusive('\n').collect();
    let original_indent = get_consistent_indentation(matched_chunk);
    let replace_indent = get_consistent_indentation(&replace_lines);

    let mut out = String::with_capacity(original.len() + replace.len());
    for line in &original_lines[..start_idx] {
        out.push_str(line);
    }

    for line in &replace_lines {
        if line.trim().is_empty() {
            out.push_str(line);
            continue;
        }
        let relative = line.strip_prefix(replace_indent.as_str()).unwrap_or(line);
        out.push_str(&original_indent);
        out.push_str(relative);
    }

    // Keep the line break that terminated the matched region
    let chunk_had_newline = matched_chunk.last().is_some_and(|l| l.ends_with('\n'));
    if chunk_had_newline && !replace.is_empty() && !replace.ends_with('\n') {
        out.push('\n');
    }

    for line in &original_lines[end_idx..] {
        out.push_str(line);
    }

    Some(out)
}

fn get_consistent_indentation(lines: &[&str]) -> String {
    let meaningful: Vec<&str> = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .copied()
        .collect();

    let Some(first) = meaningful.first() else {
        return String::new();
    };

    let indent_len = first.len() - first.trim_start().len();
    let mut common_indent = &first[..indent_len];

    for line in &meaningful[1..] {
        let mut common_len = 0;
        for ((i, c1), c2) in common_indent.char_indices().zip(line.chars()) {
            if c1 == c2 {
                common_len = i + c1.len_utf8();
            } else {
                break;
            }
        }
        common_indent = &common_indent[..common_len];
        if common_indent.is_empty() {
            break;
        }
    }

    common_indent.to_string()
}
