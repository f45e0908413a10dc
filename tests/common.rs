use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use std::fs;
use std::path::Path;

/// The binary, run inside `root` with no ambient configuration leaking in.
#[allow(dead_code)]
pub fn aidant(root: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("aidant");
    cmd.current_dir(root)
        .env("AIDANT_CONFIG_DIR", root.join(".no-global-config"))
        .env_remove("AIDANT_MODEL")
        .env_remove("AIDANT_AUTO_APPLY")
        .env_remove("AIDANT_AUTO_COMMIT")
        .env_remove("AIDANT_BACKUP_FILES")
        .env_remove("AIDANT_VERBOSE")
        .env_remove("AIDANT_LOG");
    cmd
}

#[allow(dead_code)]
pub fn write_files(root: &Path, files: &[(&str, &str)]) {
    for (rel, content) in files {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }
}

#[allow(dead_code)]
pub fn read(root: &Path, rel: &str) -> String {
    fs::read_to_string(root.join(rel)).unwrap()
}

#[allow(dead_code)]
pub const HELLO_SEARCH: &str = "def hello():\n    print(\"Hello, World!\")";

#[allow(dead_code)]
pub const DEMO_RESPONSE: &str = r#"demo_file.py
<<<<<<< SEARCH
def hello():
    print("Hello, World!")
=======
def hello():
    print("Hello, World!")

def new_function():
    print("This is a new function!")
>>>>>>> REPLACE
"#;
