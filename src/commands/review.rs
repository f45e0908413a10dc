//! parse -> validate -> preview -> confirm -> apply -> commit, shared by `apply` and `gen`.

use crate::commands::Workspace;
use crate::console::{
    change_table, colored_diff_lines, confirm, draw_panel, get_terminal_width,
    is_stdin_terminal, is_stdout_terminal, print_colored_diff, print_validation,
};
use crate::diff_utils::preview_changes;
use crate::editblock::Coder;
use crate::editblock::prompt::commit_message;
use crate::exceptions::AidantError;
use crate::models::{ApplyReport, CodeChange};
use crate::repository::Repository;
use crossterm::style::Stylize;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default)]
pub struct ReviewOptions {
    pub assume_yes: bool,
    pub no_commit: bool,
    pub dry_run: bool,
}

#[derive(Debug)]
pub enum ReviewOutcome {
    DryRun,
    Declined,
    Applied {
        report: ApplyReport,
        commit: Option<String>,
    },
}

pub fn review_and_apply(
    ws: &Workspace,
    response: &str,
    opts: &ReviewOptions,
) -> Result<ReviewOutcome, AidantError> {
    let coder = ws.coder();
    let changes = coder.parse_response(response)?;
    debug!(coder = coder.name(), count = changes.len(), "parsed response");
    let width = get_terminal_width();

    println!("{}", change_table(&changes, width));

    let validation = coder.validate_changes(&changes);
    print_validation(&validation);
    if !validation.is_valid {
        return Err(AidantError::Validation(format!(
            "{} error(s), no changes were applied",
            validation.errors.len()
        )));
    }

    if ws.settings.coder.show_diffs {
        for preview in preview_changes(coder.store(), &changes, coder.options().whitespace_flexible)
        {
            if is_stdout_terminal() {
                draw_panel(&preview.path, &colored_diff_lines(&preview.diff), width);
            } else {
                print_colored_diff(&preview.diff);
            }
            if preview.unmatched {
                eprintln!(
                    "{} preview of {} skipped an edit that depends on an earlier one",
                    "warning:".yellow().bold(),
                    preview.path
                );
            }
        }
    }

    if opts.dry_run {
        println!("Dry run: {} change(s) not applied.", changes.len());
        return Ok(ReviewOutcome::DryRun);
    }

    if !approved(ws, opts, changes.len())? {
        println!("Changes discarded.");
        return Ok(ReviewOutcome::Declined);
    }

    let report = coder.apply_changes(&changes)?;
    println!(
        "{} {} change(s) to {} file(s).",
        "Applied".green(),
        report.applied,
        report.touched_files.len()
    );
    if let Some(dir) = &report.backup_dir {
        println!("Backups saved in {}", dir);
    }

    let commit = if opts.no_commit || !ws.settings.repository.auto_commit {
        None
    } else {
        commit_applied(ws, &changes)
    };

    Ok(ReviewOutcome::Applied { report, commit })
}

fn approved(ws: &Workspace, opts: &ReviewOptions, count: usize) -> Result<bool, AidantError> {
    if opts.assume_yes || ws.settings.coder.auto_apply || !ws.settings.ui.confirm_changes {
        return Ok(true);
    }
    if !is_stdin_terminal() {
        eprintln!("stdin is not interactive; pass --yes to apply.");
        return Ok(false);
    }
    Ok(confirm(&format!("Apply {} change(s)?", count))?)
}

/// Commit failures are reported but do not undo the applied edits.
fn commit_applied(ws: &Workspace, changes: &[CodeChange]) -> Option<String> {
    let repo = ws.repository();
    if !repo.is_vcs_repo() {
        return None;
    }
    if matches!(repo.is_clean(), Ok(true)) {
        debug!("working tree unchanged, nothing to commit");
        return None;
    }
    let message = commit_message(&ws.settings.repository.commit_message_template, changes);
    match repo.commit_changes(changes, &message) {
        Ok(hash) => {
            info!(%hash, "committed changes");
            println!("Committed {}: {}", hash, message);
            Some(hash)
        }
        Err(e) => {
            eprintln!("{} {}", "warning:".yellow().bold(), e);
            None
        }
    }
}
