//! Output formatting for CLI commands.
//!
//! Every command builds a serializable output struct and hands it to
//! [`output`], which prints either the human rendering or pretty JSON.

use comfy_table::{presets, Cell, CellAlignment, ContentArrangement, Table};
use console::{style, StyledObject};
use serde::Serialize;

/// Types that can be rendered as human-readable text or JSON.
pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Print a command result in the requested mode.
pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!(
            "{}",
            serde_json::to_string_pretty(&result.to_json()).unwrap_or_default()
        );
    } else {
        println!("{}", result.to_human());
    }
}

/// Truncate a string to `max_len` characters, appending "..." if truncated.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Borderless list table with upper-cased headers.
pub fn list_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h.to_uppercase()).set_alignment(CellAlignment::Left)),
        );
    table
}

/// Render a table under a count line, or a "none found" line when empty.
pub fn render_list(singular: &str, plural: &str, table: &Table, total: usize) -> String {
    if total == 0 {
        return format!("No {plural} found.");
    }
    let noun = if total == 1 { singular } else { plural };
    format!("{} {noun}:\n{table}", style(total).bold())
}

/// Color a status or tier word.
pub fn colorize(value: &str) -> StyledObject<&str> {
    match value {
        "validated" | "completed" | "healthy" | "ok" => style(value).green().bold(),
        "testing" | "in_progress" | "high" => style(value).yellow(),
        "proposed" | "pending" | "medium" => style(value).blue(),
        "blocked" | "saturated" => style(value).cyan(),
        "invalidated" | "failed" | "critical" | "starved" => style(value).red().bold(),
        "low" => style(value).dim(),
        _ => style(value),
    }
}

/// Green check line.
pub fn action_success(message: &str) -> String {
    format!("{} {message}", style("\u{2713}").green().bold())
}

/// Red cross line.
pub fn action_failure(message: &str) -> String {
    format!("{} {message}", style("\u{2717}").red().bold())
}

/// Key-value detail view with optional sections.
pub struct DetailView {
    title: String,
    sections: Vec<DetailSection>,
}

struct DetailSection {
    header: Option<String>,
    fields: Vec<(String, String)>,
    items: Vec<String>,
}

impl DetailView {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            sections: vec![DetailSection {
                header: None,
                fields: vec![],
                items: vec![],
            }],
        }
    }

    pub fn field(mut self, key: &str, value: impl ToString) -> Self {
        if let Some(section) = self.sections.last_mut() {
            section.fields.push((key.to_string(), value.to_string()));
        }
        self
    }

    pub fn field_opt(self, key: &str, value: Option<&str>) -> Self {
        match value {
            Some(v) => self.field(key, v),
            None => self,
        }
    }

    pub fn section(mut self, header: &str) -> Self {
        self.sections.push(DetailSection {
            header: Some(header.to_string()),
            fields: vec![],
            items: vec![],
        });
        self
    }

    pub fn item(mut self, text: impl Into<String>) -> Self {
        if let Some(section) = self.sections.last_mut() {
            section.items.push(text.into());
        }
        self
    }

    pub fn render(&self) -> String {
        let mut lines = vec![style(&self.title).bold().to_string()];
        let key_width = self
            .sections
            .iter()
            .flat_map(|s| s.fields.iter())
            .map(|(k, _)| k.len())
            .max()
            .unwrap_or(12);

        for section in &self.sections {
            if let Some(header) = &section.header {
                lines.push(String::new());
                lines.push(style(header).bold().underlined().to_string());
            }
            for (key, value) in &section.fields {
                lines.push(format!(
                    "  {:<width$}  {value}",
                    format!("{key}:"),
                    width = key_width + 1
                ));
            }
            for item in &section.items {
                lines.push(format!("  {} {item}", style("\u{2022}").dim()));
            }
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a long statement", 10), "a long ...");
        assert_eq!(truncate("ééééééé", 5), "éé...");
    }

    #[test]
    fn test_render_list_empty() {
        let table = list_table(&["id"]);
        assert_eq!(
            render_list("hypothesis", "hypotheses", &table, 0),
            "No hypotheses found."
        );
    }

    #[test]
    fn test_detail_view_contains_fields() {
        console::set_colors_enabled(false);
        let rendered = DetailView::new("Hypothesis hyp_1")
            .field("Status", "testing")
            .field_opt("Blocked", None)
            .section("Evidence")
            .item("first")
            .render();
        assert!(rendered.contains("Status:"));
        assert!(rendered.contains("testing"));
        assert!(!rendered.contains("Blocked"));
        assert!(rendered.contains("first"));
    }
}
