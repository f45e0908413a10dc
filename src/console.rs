use crate::models::{ChangeType, CodeChange, TokenUsage, ValidationResult};
use comfy_table::{Attribute, Cell, Color, ColumnConstraint, Table, Width};
use crossterm::style::Stylize;
use std::io::{BufRead, IsTerminal, Write};
use unicode_width::UnicodeWidthStr;

pub const ANSI_REGEX_PATTERN: &str = r"\x1b\[[0-9;?]*[a-zA-Z]|\x1b].*?(\x1b\\|[\x07])";

pub fn strip_ansi_codes(s: &str) -> String {
    static RE: std::sync::LazyLock<regex::Regex> =
        std::sync::LazyLock::new(|| regex::Regex::new(ANSI_REGEX_PATTERN).unwrap());
    RE.replace_all(s, "").to_string()
}

pub fn get_terminal_width() -> usize {
    static TERMINAL_WIDTH: std::sync::LazyLock<usize> = std::sync::LazyLock::new(|| {
        for var in ["AIDANT_COLUMNS", "COLUMNS"] {
            if let Ok(w) = std::env::var(var).map(|s| s.parse().unwrap_or(0))
                && w > 0
            {
                return w;
            }
        }

        if is_stdout_terminal()
            && let Ok((w, _)) = crossterm::terminal::size()
        {
            return w as usize;
        }

        80
    });

    *TERMINAL_WIDTH
}

pub fn is_stdout_terminal() -> bool {
    if std::env::var("AIDANT_FORCE_TTY").is_ok() {
        return true;
    }
    std::io::stdout().is_terminal()
}

pub fn is_stdin_terminal() -> bool {
    std::io::stdin().is_terminal()
}

pub fn draw_panel(title: &str, lines: &[String], width: usize) {
    let inner_width = width.saturating_sub(2);
    let title_fmt = if title.is_empty() {
        String::new()
    } else {
        format!(" {} ", title)
    };

    let title_width = UnicodeWidthStr::width(title_fmt.as_str());
    let total_dashes = inner_width.saturating_sub(title_width);
    let left_dashes = total_dashes / 2;

    println!(
        "╭{}{}{}╮",
        "─".repeat(left_dashes),
        title_fmt,
        "─".repeat(total_dashes - left_dashes)
    );

    for line in lines {
        let visible_len = UnicodeWidthStr::width(strip_ansi_codes(line).as_str());
        let padding = inner_width.saturating_sub(visible_len + 1);
        println!("│ {}{}│", line, " ".repeat(padding));
    }

    println!("╰{}╯", "─".repeat(inner_width));
}

/// One row per change: position, kind, path and a short detail.
pub fn change_table(changes: &[CodeChange], width: usize) -> Table {
    let mut table = Table::new();
    table
        .load_preset(comfy_table::presets::NOTHING)
        .set_content_arrangement(comfy_table::ContentArrangement::DynamicFullWidth)
        .set_style(comfy_table::TableComponent::HeaderLines, '─')
        .set_style(comfy_table::TableComponent::MiddleHeaderIntersections, ' ')
        .set_width(width as u16)
        .set_truncation_indicator("…");

    table.set_header(vec![
        Cell::new("#").add_attribute(Attribute::Bold),
        Cell::new("Change").add_attribute(Attribute::Bold),
        Cell::new("File").add_attribute(Attribute::Bold),
        Cell::new("Detail").add_attribute(Attribute::Bold),
    ]);
    if let Some(col) = table.column_mut(0) {
        col.set_constraint(ColumnConstraint::UpperBoundary(Width::Fixed(4)));
    }

    for (i, change) in changes.iter().enumerate() {
        let color = match change.change_type {
            ChangeType::Create => Color::Green,
            ChangeType::Modify => Color::Yellow,
            ChangeType::Delete => Color::Red,
            ChangeType::Rename => Color::Cyan,
        };
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(change.change_type).fg(color),
            Cell::new(&change.file_path),
            Cell::new(change_detail(change)),
        ]);
    }
    table
}

fn change_detail(change: &CodeChange) -> String {
    let lines = |s: Option<&str>| s.map_or(0, |s| s.lines().count());
    match change.change_type {
        ChangeType::Modify if change.old_content.is_none() => {
            format!("append {} lines", lines(change.content.as_deref()))
        }
        ChangeType::Modify => format!(
            "{} -> {} lines",
            lines(change.old_content.as_deref()),
            lines(change.content.as_deref())
        ),
        ChangeType::Create => format!("{} lines", lines(change.content.as_deref())),
        ChangeType::Delete => String::new(),
        ChangeType::Rename => format!("-> {}", change.rename_target().unwrap_or("?")),
    }
}

/// Diff lines coloured by kind when stdout is a terminal, unchanged otherwise.
pub fn colored_diff_lines(diff: &str) -> Vec<String> {
    let color = is_stdout_terminal();
    diff.lines()
        .map(|line| {
            if !color {
                line.to_string()
            } else if line.starts_with("+++") || line.starts_with("---") {
                line.bold().to_string()
            } else if line.starts_with('+') {
                line.green().to_string()
            } else if line.starts_with('-') {
                line.red().to_string()
            } else if line.starts_with("@@") {
                line.cyan().to_string()
            } else {
                line.to_string()
            }
        })
        .collect()
}

pub fn print_colored_diff(diff: &str) {
    for line in colored_diff_lines(diff) {
        println!("{}", line);
    }
}

pub fn print_validation(result: &ValidationResult) {
    for error in &result.errors {
        eprintln!("{} {}", "error:".red().bold(), error);
    }
    for warning in &result.warnings {
        eprintln!("{} {}", "warning:".yellow().bold(), warning);
    }
}

/// Asks a yes/no question on stderr. Anything but `y`/`yes` declines, as does EOF.
pub fn confirm(question: &str) -> std::io::Result<bool> {
    eprint!("{} [y/N] ", question);
    std::io::stderr().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

pub fn format_tokens(n: u32) -> String {
    if n >= 1000 {
        format!("{:.1}k", n as f64 / 1000.0)
    } else {
        n.to_string()
    }
}

pub fn display_usage_summary(usage: Option<&TokenUsage>, duration_ms: u64) {
    let mut info = match usage {
        Some(usage) => {
            let mut prompt_info = format_tokens(usage.prompt_tokens);
            if let Some(cached) = usage.cached_tokens
                && cached > 0
            {
                prompt_info.push_str(&format!(" ({} cached)", format_tokens(cached)));
            }
            format!(
                "Tokens: {} sent, {} received.",
                prompt_info,
                format_tokens(usage.completion_tokens)
            )
        }
        None => "Tokens: n/a.".to_string(),
    };
    if let Some(cost) = usage.and_then(|u| u.cost) {
        info.push_str(&format!(" Cost: ${:.4}.", cost));
    }
    info.push_str(&format!(" Time: {:.1}s", duration_ms as f64 / 1000.0));

    if is_stdout_terminal() {
        eprintln!("{}", "---".dim());
        eprintln!("{}", info.dim());
    } else {
        eprintln!("{}", info);
    }
}
