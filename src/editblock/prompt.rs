use crate::editblock::Coder;
use crate::models::{ChangeType, CodeChange, RepoContext};
use std::collections::BTreeSet;

/// Per-file cap on context embedded in the system prompt, in characters.
pub const MAX_CONTEXT_CHARS: usize = 2000;

// Must parse with the fenced search/replace matcher; see the tests below.
pub const EDIT_FORMAT_INSTRUCTIONS: &str = r#"When editing files, use this format:

```
filename.py
<<<<<<< SEARCH
exact code to find and replace
=======
new code to replace it with
>>>>>>> REPLACE
```

Rules:
1. The SEARCH block must contain the exact code that exists in the file, whitespace included
2. The REPLACE block contains the new code to substitute
3. Include enough context in SEARCH to uniquely identify the location
4. Only show the parts that need to change, not the entire file
5. Multiple SEARCH/REPLACE blocks can be used for the same file; they are applied in order
6. Put the file path alone on the line directly above <<<<<<< SEARCH

For new files, use:
```
filename.py
new file content here
```

Example:
```
main.py
<<<<<<< SEARCH
def hello():
    print("Hello")
=======
def hello(name="World"):
    print(f"Hello, {name}!")
>>>>>>> REPLACE
```
"#;

const GUIDELINES: &str = "Guidelines:
1. Understand the user's request before making changes
2. Explain your reasoning briefly
3. Make minimal, focused changes
4. Follow the project's existing code style";

pub fn generate_prompt() -> String {
    EDIT_FORMAT_INSTRUCTIONS.to_string()
}

/// Full system prompt: repository summary, the coder's edit format, and the
/// current content of every file in `context`.
pub fn build_system_prompt(context: &RepoContext, coder: &dyn Coder) -> String {
    let mut prompt = String::from(
        "You are an AI pair programming assistant. You help users edit code in their repository.\n\n",
    );

    prompt.push_str("Repository Information:\n");
    prompt.push_str(&format!("- Root: {}\n", context.root_path));
    if let Some(branch) = &context.current_branch {
        prompt.push_str(&format!("- Branch: {}\n", branch));
    }
    prompt.push_str(&format!("- Files: {}\n", context.file_contents.len()));
    if !context.detected_languages.is_empty() {
        prompt.push_str(&format!(
            "- Languages: {}\n",
            context.detected_languages.join(", ")
        ));
    }

    prompt.push('\n');
    prompt.push_str(&coder.generate_prompt(context));
    prompt.push('\n');
    prompt.push_str(GUIDELINES);
    prompt.push('\n');

    if !context.file_contents.is_empty() {
        prompt.push_str("\nCurrent file contents:\n");
        for (path, content) in &context.file_contents {
            prompt.push_str(&format!("\n--- {} ---\n", path));
            match content.char_indices().nth(MAX_CONTEXT_CHARS) {
                Some((cut, _)) => {
                    prompt.push_str(&content[..cut]);
                    prompt.push_str("\n... (truncated)");
                }
                None => prompt.push_str(content),
            }
            prompt.push('\n');
        }
    }

    prompt
}

/// One-line summary of a batch, e.g. `Update src/a.py` or `Update 3 files`.
pub fn describe_changes(changes: &[CodeChange]) -> String {
    if let [change] = changes {
        let path = &change.file_path;
        return match change.change_type {
            ChangeType::Create => format!("Add {}", path),
            ChangeType::Modify => format!("Update {}", path),
            ChangeType::Delete => format!("Remove {}", path),
            ChangeType::Rename => format!(
                "Rename {} to {}",
                path,
                change.rename_target().unwrap_or("?")
            ),
        };
    }

    let files: BTreeSet<&str> = changes.iter().map(|c| c.file_path.as_str()).collect();
    let count = files.len();
    format!("Update {} file{}", count, if count == 1 { "" } else { "s" })
}

pub fn commit_message(template: &str, changes: &[CodeChange]) -> String {
    let description = describe_changes(changes);
    if template.contains("{description}") {
        template.replace("{description}", &description)
    } else if template.trim().is_empty() {
        description
    } else {
        format!("{} {}", template.trim_end(), description)
    }
}
