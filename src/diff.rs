//! Non-mutating preview of a patch plan
//!
//! `render` is a plain projection of the plan, one line per candidate field,
//! including fields that are already correct. `format_report` turns those
//! lines into the text shown before asking for confirmation.

use serde::Serialize;
use std::fmt::Write as _;
use std::path::PathBuf;

use crate::planner::PatchPlan;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffLine {
    pub file_path: PathBuf,
    pub key: String,
    pub from: Option<String>,
    pub to: String,
    pub changed: bool,
}

pub fn render(plan: &PatchPlan) -> Vec<DiffLine> {
    plan.fields
        .iter()
        .map(|field| DiffLine {
            file_path: field.file.clone(),
            key: field.key.clone(),
            from: field
                .stale_value()
                .or(field.current_value.as_deref())
                .map(str::to_string),
            to: field.desired_value.clone(),
            changed: field.is_change(),
        })
        .collect()
}

/// Human-readable report grouped by file
///
/// `~` marks a value that will change, `+` a key that will be added and `=`
/// a key that already holds the desired value.
pub fn format_report(lines: &[DiffLine]) -> String {
    let mut out = String::new();
    let mut current: Option<&PathBuf> = None;

    for line in lines {
        if current != Some(&line.file_path) {
            if current.is_some() {
                out.push('\n');
            }
            let _ = writeln!(out, ">>> {}", line.file_path.display());
            current = Some(&line.file_path);
        }

        let _ = match (&line.from, line.changed) {
            (Some(from), true) => writeln!(out, "  ~ {}: {} -> {}", line.key, from, line.to),
            (None, _) => writeln!(out, "  + {}: (missing) -> {}", line.key, line.to),
            (Some(_), false) => writeln!(out, "  = {}: {} (no change)", line.key, line.to),
        };
    }

    let changed = lines.iter().filter(|l| l.changed).count();
    if lines.is_empty() {
        out.push_str("No recognized settings to change.\n");
    } else if changed == 0 {
        out.push_str("\nAll settings already applied; nothing to write.\n");
    } else {
        let _ = writeln!(out, "\n{changed} of {} setting(s) will be modified.", lines.len());
    }
    out
}
