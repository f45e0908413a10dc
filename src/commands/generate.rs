use crate::commands::Workspace;
use crate::commands::review::{ReviewOptions, review_and_apply};
use crate::console::{display_usage_summary, is_stdin_terminal};
use crate::editblock::looks_like_edit;
use crate::editblock::prompt::build_system_prompt;
use crate::exceptions::AidantError;
use crate::llm::client::LlmClient;
use crate::llm::executor::execute_interaction;
use crate::repository::Repository;
use std::io::{self, Read, Write};
use std::path::PathBuf;

pub struct GenArgs {
    pub request: Option<String>,
    pub files: Vec<PathBuf>,
    pub model: Option<String>,
    pub review: ReviewOptions,
}

fn resolve_request(cli_request: Option<String>) -> Result<String, AidantError> {
    let mut piped = None;
    if !is_stdin_terminal() {
        let mut buffer = String::new();
        if io::stdin().read_to_string(&mut buffer).is_ok() && !buffer.trim().is_empty() {
            piped = Some(buffer);
        }
    }

    match (cli_request, piped) {
        (Some(r), Some(p)) => Ok(format!(
            "<stdin_content>\n{}\n</stdin_content>\n<prompt>\n{}\n</prompt>",
            p.trim(),
            r.trim()
        )),
        (Some(r), None) => Ok(r),
        (None, Some(p)) => Ok(p),
        (None, None) => {
            if !is_stdin_terminal() {
                return Err(AidantError::InvalidInput("Request is required.".into()));
            }
            print!("Request: ");
            io::stdout().flush()?;
            let mut buffer = String::new();
            io::stdin().read_line(&mut buffer)?;
            let input = buffer.trim().to_string();
            if input.is_empty() {
                return Err(AidantError::InvalidInput("Request cannot be empty.".into()));
            }
            Ok(input)
        }
    }
}

pub async fn run(ws: &Workspace, args: GenArgs) -> Result<(), AidantError> {
    let request = resolve_request(args.request)?;
    let model = args
        .model
        .unwrap_or_else(|| ws.settings.model.clone());
    let client = LlmClient::new(&model)?;

    let rel: Vec<String> = args.files.iter().map(|f| ws.relative(f)).collect();
    let context = ws.repository().get_context(&rel);
    let system_prompt = build_system_prompt(&context, &ws.coder());

    let mut stdout = io::stdout();
    let interaction = execute_interaction(&client, &system_prompt, &request, |delta| {
        let _ = stdout.write_all(delta.as_bytes());
        let _ = stdout.flush();
    })
    .await?;
    println!();
    display_usage_summary(interaction.token_usage.as_ref(), interaction.duration_ms);

    if !looks_like_edit(&interaction.content) {
        return Ok(());
    }
    review_and_apply(ws, &interaction.content, &args.review)?;
    Ok(())
}
