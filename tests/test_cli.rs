mod common;

use aidant::models::CodeChange;
use aidant::repository::{GitRepository, Repository};
use common::{DEMO_RESPONSE, HELLO_SEARCH, aidant, read, write_files};
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_parse_json_lists_changes() {
    let temp = tempdir().unwrap();

    let output = aidant(temp.path())
        .args(["parse", "--json"])
        .write_stdin(DEMO_RESPONSE)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let changes: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(changes.as_array().unwrap().len(), 1);
    assert_eq!(changes[0]["file_path"], "demo_file.py");
    assert_eq!(changes[0]["change_type"], "modify");
    assert_eq!(changes[0]["metadata"]["dialect"], "unfenced-search-replace");
}

#[test]
fn test_parse_without_edits_fails() {
    let temp = tempdir().unwrap();

    aidant(temp.path())
        .arg("parse")
        .write_stdin("Just an explanation, no edits.")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains(
            "Error: Parse error: No recognized edit pattern found in response",
        ));
}

#[test]
fn test_check_reports_missing_target() {
    let temp = tempdir().unwrap();
    let response_file = temp.path().join("response.md");
    fs::write(&response_file, DEMO_RESPONSE).unwrap();

    aidant(temp.path())
        .args(["check", "response.md"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("File demo_file.py does not exist"))
        .stderr(predicate::str::contains("Validation failed"));
}

#[test]
fn test_check_json_on_valid_batch() {
    let temp = tempdir().unwrap();
    write_files(temp.path(), &[("demo_file.py", HELLO_SEARCH)]);

    let output = aidant(temp.path())
        .args(["check", "--json", "-"])
        .write_stdin(DEMO_RESPONSE)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(value["validation"]["is_valid"], true);
    assert_eq!(value["changes"][0]["file_path"], "demo_file.py");
    // Checking never writes
    assert_eq!(read(temp.path(), "demo_file.py"), HELLO_SEARCH);
}

#[test]
fn test_apply_with_yes_writes_changes() {
    let temp = tempdir().unwrap();
    write_files(temp.path(), &[("demo_file.py", HELLO_SEARCH)]);

    aidant(temp.path())
        .args(["apply", "--yes"])
        .write_stdin(DEMO_RESPONSE)
        .assert()
        .success()
        .stdout(predicate::str::contains("+def new_function():"))
        .stdout(predicate::str::contains("1 change(s) to 1 file(s)"));

    assert!(read(temp.path(), "demo_file.py").contains("def new_function():"));
}

#[test]
fn test_apply_without_confirmation_on_pipe_declines() {
    let temp = tempdir().unwrap();
    write_files(temp.path(), &[("demo_file.py", HELLO_SEARCH)]);

    aidant(temp.path())
        .arg("apply")
        .write_stdin(DEMO_RESPONSE)
        .assert()
        .success()
        .stdout(predicate::str::contains("Changes discarded."))
        .stderr(predicate::str::contains("pass --yes"));

    assert_eq!(read(temp.path(), "demo_file.py"), HELLO_SEARCH);
}

#[test]
fn test_apply_auto_apply_env_skips_confirmation() {
    let temp = tempdir().unwrap();
    write_files(temp.path(), &[("demo_file.py", HELLO_SEARCH)]);

    aidant(temp.path())
        .env("AIDANT_AUTO_APPLY", "true")
        .arg("apply")
        .write_stdin(DEMO_RESPONSE)
        .assert()
        .success();

    assert!(read(temp.path(), "demo_file.py").contains("def new_function():"));
}

#[test]
fn test_apply_dry_run_leaves_files_alone() {
    let temp = tempdir().unwrap();
    write_files(temp.path(), &[("demo_file.py", HELLO_SEARCH)]);

    aidant(temp.path())
        .args(["apply", "--yes", "--dry-run"])
        .write_stdin(DEMO_RESPONSE)
        .assert()
        .success()
        .stdout(predicate::str::contains("Dry run"));

    assert_eq!(read(temp.path(), "demo_file.py"), HELLO_SEARCH);
}

#[test]
fn test_apply_rejects_invalid_batch_wholesale() {
    let temp = tempdir().unwrap();
    write_files(temp.path(), &[("a.py", "a = 1\n")]);
    let response = "\
a.py
<<<<<<< SEARCH
a = 1
=======
a = 2
>>>>>>> REPLACE

b.py
<<<<<<< SEARCH
b = 1
=======
b = 2
>>>>>>> REPLACE
";

    aidant(temp.path())
        .args(["apply", "--yes"])
        .write_stdin(response)
        .assert()
        .failure()
        .stderr(predicate::str::contains("File b.py does not exist"));

    assert_eq!(read(temp.path(), "a.py"), "a = 1\n");
}

#[test]
fn test_apply_with_backups_from_workspace_config() {
    let temp = tempdir().unwrap();
    write_files(
        temp.path(),
        &[
            ("demo_file.py", HELLO_SEARCH),
            (".aidant.json", r#"{"coder": {"backup_files": true}}"#),
        ],
    );

    aidant(temp.path())
        .args(["apply", "--yes"])
        .write_stdin(DEMO_RESPONSE)
        .assert()
        .success()
        .stdout(predicate::str::contains("Backups saved in .aidant/backups/"));

    let backups = temp.path().join(".aidant/backups");
    let stamp_dir = fs::read_dir(&backups).unwrap().next().unwrap().unwrap().path();
    assert_eq!(
        fs::read_to_string(stamp_dir.join("demo_file.py")).unwrap(),
        HELLO_SEARCH
    );
}

#[test]
fn test_malformed_config_is_an_error() {
    let temp = tempdir().unwrap();
    write_files(temp.path(), &[(".aidant.json", "{ nope")]);

    aidant(temp.path())
        .args(["can-handle", "a.py"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_can_handle_reports_each_path() {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("blob.dat"), b"\x00\x01\x02").unwrap();

    aidant(temp.path())
        .args(["can-handle", "main.rs", "logo.png", "blob.dat"])
        .assert()
        .success()
        .stdout(predicate::str::contains("main.rs\tyes"))
        .stdout(predicate::str::contains("logo.png\tno"))
        .stdout(predicate::str::contains("blob.dat\tno"));
}

#[test]
fn test_prompt_includes_format_and_file_contents() {
    let temp = tempdir().unwrap();
    write_files(temp.path(), &[("app.py", "print('app')\n")]);

    aidant(temp.path())
        .args(["prompt", "app.py"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<<<<<<< SEARCH"))
        .stdout(predicate::str::contains("--- app.py ---\nprint('app')"))
        .stdout(predicate::str::contains("Languages: python"));
}

#[test]
fn test_workspace_flag_targets_other_directory() {
    let temp = tempdir().unwrap();
    let project = temp.path().join("project");
    write_files(&project, &[("demo_file.py", HELLO_SEARCH)]);

    aidant(temp.path())
        .args(["-C", "project", "apply", "--yes"])
        .write_stdin(DEMO_RESPONSE)
        .assert()
        .success();

    assert!(read(&project, "demo_file.py").contains("def new_function():"));
}

fn git(root: &std::path::Path, args: &[&str]) -> Option<String> {
    let out = std::process::Command::new("git")
        .args(args)
        .current_dir(root)
        .output()
        .ok()?;
    out.status
        .success()
        .then(|| String::from_utf8_lossy(&out.stdout).trim().to_string())
}

#[test]
fn test_apply_commits_in_git_repository() {
    let temp = tempdir().unwrap();
    let root = temp.path();
    // Skip silently where git is unavailable
    if git(root, &["init", "-q"]).is_none() {
        return;
    }
    git(root, &["config", "user.email", "dev@example.com"]);
    git(root, &["config", "user.name", "Dev"]);
    git(root, &["config", "commit.gpgsign", "false"]);
    write_files(root, &[("demo_file.py", HELLO_SEARCH)]);
    git(root, &["add", "demo_file.py"]);
    git(root, &["commit", "-q", "-m", "initial"]);

    aidant(root)
        .args(["apply", "--yes"])
        .write_stdin(DEMO_RESPONSE)
        .assert()
        .success()
        .stdout(predicate::str::contains("Committed"));

    let subject = git(root, &["log", "-1", "--format=%s"]).unwrap();
    assert!(subject.contains("Update demo_file.py"), "{}", subject);
    let repo = GitRepository::open(root);
    assert!(repo.is_vcs_repo());
    assert!(repo.is_clean().unwrap());
}

#[test]
fn test_no_commit_flag_leaves_changes_uncommitted() {
    let temp = tempdir().unwrap();
    let root = temp.path();
    if git(root, &["init", "-q"]).is_none() {
        return;
    }
    git(root, &["config", "user.email", "dev@example.com"]);
    git(root, &["config", "user.name", "Dev"]);
    git(root, &["config", "commit.gpgsign", "false"]);
    write_files(root, &[("demo_file.py", HELLO_SEARCH)]);
    git(root, &["add", "demo_file.py"]);
    git(root, &["commit", "-q", "-m", "initial"]);

    aidant(root)
        .args(["apply", "--yes", "--no-commit"])
        .write_stdin(DEMO_RESPONSE)
        .assert()
        .success()
        .stdout(predicate::str::contains("Committed").not());

    assert_eq!(git(root, &["log", "-1", "--format=%s"]).unwrap(), "initial");
    assert!(!GitRepository::open(root).is_clean().unwrap());
}

#[test]
fn test_commit_skips_paths_git_does_not_know() {
    let temp = tempdir().unwrap();
    let root = temp.path();
    if git(root, &["init", "-q"]).is_none() {
        return;
    }
    git(root, &["config", "user.email", "dev@example.com"]);
    git(root, &["config", "user.name", "Dev"]);
    git(root, &["config", "commit.gpgsign", "false"]);
    write_files(root, &[("a.py", "x = 1\n"), ("gone.py", "old\n")]);
    git(root, &["add", "a.py", "gone.py"]);
    git(root, &["commit", "-q", "-m", "initial"]);
    let repo = GitRepository::open(root);

    // GIVEN an applied batch that also deletes a file that never existed
    write_files(root, &[("a.py", "x = 2\n")]);
    fs::remove_file(root.join("gone.py")).unwrap();
    let changes = vec![
        CodeChange::modify("a.py", "x = 1", "x = 2"),
        CodeChange::delete("gone.py"),
        CodeChange::delete("never-existed.txt"),
    ];

    // WHEN committing
    repo.commit_changes(&changes, "Update 3 files").unwrap();

    // THEN the real changes are committed, including the tracked delete
    assert_eq!(git(root, &["log", "-1", "--format=%s"]).unwrap(), "Update 3 files");
    assert!(repo.is_clean().unwrap());

    // AND a batch with nothing git can stage is reported, not attempted
    let err = repo
        .commit_changes(&[CodeChange::delete("never-existed.txt")], "noop")
        .unwrap_err();
    assert!(err.to_string().contains("nothing to commit"));
}
