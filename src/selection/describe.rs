//! Compact table descriptions for prompts.

use crate::model::Dimension;

/// Render `entries` one per line, eliding the middle beyond `cap` entries.
///
/// Head and tail are both kept so the latest periods of a time axis stay visible.
pub fn list_entries(entries: &[String], cap: usize) -> String {
    let cap = cap.max(2);
    if entries.len() <= cap {
        return entries.join("\n");
    }
    let head = cap / 2;
    let tail = cap - head;
    let hidden = entries.len() - cap;
    let marker = format!("... {} more ...", hidden);
    let mut lines: Vec<&str> = entries[..head].iter().map(String::as_str).collect();
    lines.push(&marker);
    lines.extend(entries[entries.len() - tail..].iter().map(String::as_str));
    lines.join("\n")
}

/// Cut `text` to at most `max_chars` characters, marking the cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut)
}

fn indent(text: &str) -> String {
    text.lines().map(|l| format!("    {}", l)).collect::<Vec<_>>().join("\n")
}

/// `key: label` lines for a dimension's current categories, with units.
pub fn category_listing(dim: &Dimension, cap: usize) -> String {
    let entries: Vec<String> = dim
        .categories()
        .iter()
        .map(|c| match dim.units.get(&c.key) {
            Some(unit) if !unit.base.is_empty() => format!("{}: {} [unit: {}]", c.key, c.label, unit.base),
            _ => format!("{}: {}", c.key, c.label),
        })
        .collect();
    list_entries(&entries, cap)
}

pub fn describe_dimension(dim: &Dimension, cap: usize) -> String {
    let mut flags = Vec::new();
    flags.push(if dim.eliminable { "optional" } else { "required" });
    if dim.is_time() {
        flags.push("time");
    }
    let mut out = format!(
        "Dimension {} \"{}\" ({}, {} values)",
        dim.key,
        dim.label,
        flags.join(", "),
        dim.categories().len()
    );
    if dim.is_time() {
        if let Some(latest) = dim.last_category() {
            out.push_str(&format!("\n    latest period: {}", latest.key));
        }
    }
    out.push('\n');
    out.push_str(&indent(&category_listing(dim, cap)));
    out
}
