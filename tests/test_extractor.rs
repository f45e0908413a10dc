mod common;

use aidant::editblock::{Coder, CoderOptions, EditBlockCoder, looks_like_edit};
use aidant::exceptions::ParseError;
use aidant::models::ChangeType;
use common::DEMO_RESPONSE;
use tempfile::tempdir;

fn coder() -> (tempfile::TempDir, EditBlockCoder) {
    let temp = tempdir().unwrap();
    let coder = EditBlockCoder::new(temp.path(), CoderOptions::default());
    (temp, coder)
}

#[test]
fn test_single_block_yields_single_modify() {
    let (_temp, coder) = coder();

    // GIVEN a response with one block surrounded by prose
    let response = "Sure, here you go:\n\n```rust\nsrc/lib.rs\n<<<<<<< SEARCH\nfn a() {}\n=======\nfn a() -> u8 { 1 }\n>>>>>>> REPLACE\n```\n\nLet me know!";

    // WHEN parsing
    let changes = coder.parse_response(response).unwrap();

    // THEN exactly one Modify with the sections verbatim
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].change_type, ChangeType::Modify);
    assert_eq!(changes[0].file_path, "src/lib.rs");
    assert_eq!(changes[0].old_content.as_deref(), Some("fn a() {}"));
    assert_eq!(changes[0].content.as_deref(), Some("fn a() -> u8 { 1 }"));
}

#[test]
fn test_demo_scenario_parses_to_one_modify() {
    let (_temp, coder) = coder();
    let changes = coder.parse_response(DEMO_RESPONSE).unwrap();

    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].file_path, "demo_file.py");
    assert_eq!(changes[0].metadata["dialect"], "unfenced-search-replace");
    assert!(changes[0]
        .content
        .as_deref()
        .unwrap()
        .contains("def new_function():"));
}

#[test]
fn test_no_blocks_is_a_parse_error() {
    let (_temp, coder) = coder();

    let err = coder
        .parse_response("The bug is on line 3; the loop never terminates.")
        .unwrap_err();

    assert_eq!(err, ParseError::NoMatch);
    assert_eq!(err.kind(), "no-match");
    assert!(!looks_like_edit("The bug is on line 3; the loop never terminates."));
}

#[test]
fn test_multiple_blocks_keep_source_order() {
    let (_temp, coder) = coder();
    let response = "\
b.py
<<<<<<< SEARCH
1
=======
2
>>>>>>> REPLACE

a.py
<<<<<<< SEARCH
3
=======
4
>>>>>>> REPLACE
";
    let changes = coder.parse_response(response).unwrap();
    let paths: Vec<&str> = changes.iter().map(|c| c.file_path.as_str()).collect();
    assert_eq!(paths, vec!["b.py", "a.py"]);
}

#[test]
fn test_file_prefixed_path_line_is_recovered() {
    let (_temp, coder) = coder();
    let response = "File: pkg/mod.py\n<<<<<<< SEARCH\nold\n=======\nnew\n>>>>>>> REPLACE";

    let changes = coder.parse_response(response).unwrap();

    assert_eq!(changes[0].file_path, "pkg/mod.py");
}

#[test]
fn test_unrecoverable_filename_is_reported() {
    let (_temp, coder) = coder();
    let response = "please update this\n<<<<<<< SEARCH\nold\n=======\nnew\n>>>>>>> REPLACE";

    let err = coder.parse_response(response).unwrap_err();

    assert_eq!(err.kind(), "bad-filename");
    assert!(err.to_string().contains("please update this"));
}

#[test]
fn test_whole_file_fallback_creates_files() {
    let (_temp, coder) = coder();
    let response = "Create this:\n\n```python\nutils/helpers.py\ndef helper():\n    return 42\n```\n\nAnd an illustration:\n\n```python\nprint('not a file')\n```\n";

    let changes = coder.parse_response(response).unwrap();

    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].change_type, ChangeType::Create);
    assert_eq!(changes[0].file_path, "utils/helpers.py");
    assert_eq!(
        changes[0].content.as_deref(),
        Some("def helper():\n    return 42\n")
    );
    assert_eq!(changes[0].old_content, None);
}

#[test]
fn test_search_replace_suppresses_whole_file_fallback() {
    let (_temp, coder) = coder();
    let response = "```python\nexample.py\nprint(1)\n```\n\n```\nreal.py\n<<<<<<< SEARCH\na\n=======\nb\n>>>>>>> REPLACE\n```\n";

    let changes = coder.parse_response(response).unwrap();

    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].file_path, "real.py");
    assert_eq!(changes[0].change_type, ChangeType::Modify);
}

#[test]
fn test_generated_prompt_describes_the_parsed_format() {
    let (_temp, coder) = coder();
    let prompt = coder.generate_prompt(&Default::default());

    assert!(prompt.contains("<<<<<<< SEARCH"));
    assert!(prompt.contains(">>>>>>> REPLACE"));
    assert!(coder.parse_response(&prompt).is_ok());
}

#[test]
fn test_unclosed_fence_does_not_leak_markers_into_files() {
    let temp = tempdir().unwrap();
    std::fs::write(temp.path().join("a.py"), "x = 1\n").unwrap();
    std::fs::write(temp.path().join("b.py"), "p = 1\n").unwrap();
    let coder = EditBlockCoder::new(temp.path(), CoderOptions::default());

    // GIVEN a first block whose closing fence is missing
    let response = "```python\na.py\n<<<<<<< SEARCH\nx = 1\n=======\nx = 2\n>>>>>>> REPLACE\n\nAnd then:\n\n```python\nb.py\n<<<<<<< SEARCH\np = 1\n=======\np = 2\n>>>>>>> REPLACE\n```";

    // WHEN parsing and applying
    let changes = coder.parse_response(response).unwrap();
    let paths: Vec<&str> = changes.iter().map(|c| c.file_path.as_str()).collect();
    assert_eq!(paths, vec!["a.py", "b.py"]);
    for change in &changes {
        let content = change.content.as_deref().unwrap();
        assert!(!content.contains(">>>>>>> REPLACE"), "{:?}", content);
    }
    assert!(coder.validate_changes(&changes).is_valid);
    coder.apply_changes(&changes).unwrap();

    // THEN each file gets only its own edit
    assert_eq!(std::fs::read_to_string(temp.path().join("a.py")).unwrap(), "x = 2\n");
    assert_eq!(std::fs::read_to_string(temp.path().join("b.py")).unwrap(), "p = 2\n");
}

#[test]
fn test_shell_snippet_is_not_an_edit() {
    let (_temp, coder) = coder();
    let response = "Run the build first:\n\n```bash\nmake\n```\n";

    assert!(!looks_like_edit(response));
    assert_eq!(coder.parse_response(response).unwrap_err(), ParseError::NoMatch);
}
