// Output formatting utilities

use crate::models::{AggregateRow, EntryStatus, Tag};
use chrono::{DateTime, Local, Utc};
use std::io::IsTerminal;
use std::time::Duration;

// ANSI escape codes for terminal formatting
const ANSI_BOLD: &str = "\x1b[1m";
const ANSI_RESET: &str = "\x1b[0m";
const ANSI_FG_RED: &str = "\x1b[31m";
const ANSI_FG_GREEN: &str = "\x1b[32m";

const COLUMN_GAP: &str = "  ";

/// Check if stdout is a terminal (TTY)
pub fn is_tty() -> bool {
    std::io::stdout().is_terminal()
}

/// Get terminal width dynamically
///
/// Uses the `terminal_size` crate for reliable detection, with fallback to
/// COLUMNS environment variable and a sensible default.
pub fn get_terminal_width() -> usize {
    if let Some((terminal_size::Width(w), _)) = terminal_size::terminal_size() {
        if w > 0 {
            return w as usize;
        }
    }

    if let Ok(cols) = std::env::var("COLUMNS") {
        if let Ok(width) = cols.parse::<usize>() {
            if width > 0 && width < 10000 {
                return width;
            }
        }
    }

    120
}

/// Format timestamp for display in local time
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Format duration for display (e.g., "1h2m3s", "4m0s", "9s")
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    if hours > 0 {
        format!("{}h{}m{}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Status label, coloured on a terminal
pub fn format_status(status: EntryStatus, color: bool) -> String {
    if !color {
        return status.as_str().to_string();
    }
    let fg = match status {
        EntryStatus::Active => ANSI_FG_GREEN,
        EntryStatus::Stopped => ANSI_FG_RED,
    };
    format!("{}{}{}", fg, status.as_str(), ANSI_RESET)
}

fn bold_if(text: &str, enabled: bool) -> String {
    if enabled {
        format!("{}{}{}", ANSI_BOLD, text, ANSI_RESET)
    } else {
        text.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Title,
    Created,
    Started,
    Stopped,
    Total,
    Session,
    Status,
}

const COLUMNS: [Column; 7] = [
    Column::Title,
    Column::Created,
    Column::Started,
    Column::Stopped,
    Column::Total,
    Column::Session,
    Column::Status,
];

/// Columns dropped, in order, when the table is wider than the terminal
const HIDE_ORDER: [Column; 3] = [Column::Created, Column::Stopped, Column::Started];

fn column_label(column: Column) -> &'static str {
    match column {
        Column::Title => "Title",
        Column::Created => "Created",
        Column::Started => "Started",
        Column::Stopped => "Stopped",
        Column::Total => "Total Duration",
        Column::Session => "Session Duration",
        Column::Status => "Status",
    }
}

fn cell(row: &AggregateRow, column: Column) -> String {
    match column {
        Column::Title => row.title.clone(),
        Column::Created => format_timestamp(row.created),
        Column::Started => row.started.map(format_timestamp).unwrap_or_default(),
        Column::Stopped => row.stopped.map(format_timestamp).unwrap_or_default(),
        Column::Total => format_duration(row.total),
        Column::Session => row.session.map(format_duration).unwrap_or_default(),
        Column::Status => row.status.as_str().to_string(),
    }
}

fn cell_width(text: &str) -> usize {
    text.lines().map(|l| l.chars().count()).max().unwrap_or(0)
}

#[derive(Debug, Clone, Copy)]
pub struct TableOptions {
    /// Colour status labels and bold the header
    pub color: bool,
    /// Hide low-priority columns to fit this width
    pub max_width: Option<usize>,
}

impl TableOptions {
    /// Options for the current stdout
    pub fn detect() -> Self {
        let tty = is_tty();
        Self {
            color: tty,
            max_width: tty.then(get_terminal_width),
        }
    }
}

/// Render task rows as a table.
///
/// Titles may span several lines; the other cells sit on the first line.
pub fn format_task_table(rows: &[AggregateRow], options: TableOptions) -> String {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| COLUMNS.iter().map(|c| cell(row, *c)).collect())
        .collect();

    let mut widths: Vec<usize> = COLUMNS.iter().map(|c| column_label(*c).len()).collect();
    for row in &cells {
        for (i, text) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell_width(text));
        }
    }

    let mut visible: Vec<bool> = vec![true; COLUMNS.len()];
    if let Some(max_width) = options.max_width {
        let table_width = |visible: &[bool]| -> usize {
            let shown: Vec<usize> = widths.iter().zip(visible).filter(|(_, v)| **v).map(|(w, _)| *w).collect();
            shown.iter().sum::<usize>() + COLUMN_GAP.len() * shown.len().saturating_sub(1)
        };
        for column in HIDE_ORDER {
            if table_width(&visible) <= max_width {
                break;
            }
            if let Some(i) = COLUMNS.iter().position(|c| *c == column) {
                visible[i] = false;
            }
        }
    }

    let mut out = String::new();
    let header: Vec<String> = COLUMNS
        .iter()
        .enumerate()
        .filter(|(i, _)| visible[*i])
        .map(|(i, c)| format!("{:<width$}", column_label(*c), width = widths[i]))
        .collect();
    out.push_str(&bold_if(header.join(COLUMN_GAP).trim_end(), options.color));
    out.push('\n');

    let separator: Vec<String> = widths
        .iter()
        .enumerate()
        .filter(|(i, _)| visible[*i])
        .map(|(_, w)| "-".repeat(*w))
        .collect();
    out.push_str(&separator.join(COLUMN_GAP));
    out.push('\n');

    for (row, row_cells) in rows.iter().zip(&cells) {
        let height = row_cells.iter().map(|c| c.lines().count().max(1)).max().unwrap_or(1);
        for line_no in 0..height {
            let mut parts: Vec<String> = Vec::new();
            for (i, column) in COLUMNS.iter().enumerate() {
                if !visible[i] {
                    continue;
                }
                let text = row_cells[i].lines().nth(line_no).unwrap_or("");
                let padded = format!("{:<width$}", text, width = widths[i]);
                if *column == Column::Status && !text.is_empty() && options.color {
                    let pad = padded.len() - text.len();
                    parts.push(format!("{}{}", format_status(row.status, true), " ".repeat(pad)));
                } else {
                    parts.push(padded);
                }
            }
            out.push_str(parts.join(COLUMN_GAP).trim_end());
            out.push('\n');
        }
    }

    out
}

/// Render tag usage, one tag per line
pub fn format_tag_counts(counts: &[(&Tag, usize)]) -> String {
    let width = counts.iter().map(|(t, _)| t.as_str().chars().count()).max().unwrap_or(0);
    let mut out = String::new();
    for (tag, count) in counts {
        let noun = if *count == 1 { "task" } else { "tasks" };
        out.push_str(&format!("{:<width$}  {} {}\n", tag.as_str(), count, noun, width = width));
    }
    out
}
