/*!
format.rs

Human-output helpers for the `ansible-kernel` CLI.

  - StyleOptions::detect() -> StyleOptions  (NO_COLOR / NO_EMOJI / COLUMNS)
  - color(role, text, &StyleOptions) -> String
  - emoji(tag, &StyleOptions) -> &'static str
  - box_header(title, subtitle_opt, &StyleOptions) -> String
  - columns(items, &StyleOptions) -> String

JSON output paths never use these helpers.
*/

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

static ANSI_CSI: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x1b\[[0-9;]*[A-Za-z]").expect("valid ANSI pattern"));

#[derive(Debug, Clone)]
pub struct StyleOptions {
    pub use_color: bool,
    pub use_emoji: bool,
    pub term_width: usize,
}

impl StyleOptions {
    pub fn detect() -> Self {
        let width = std::env::var("COLUMNS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .map(|w| w.clamp(40, 220))
            .unwrap_or(100);

        StyleOptions {
            use_color: std::env::var_os("NO_COLOR").is_none(),
            use_emoji: std::env::var_os("NO_EMOJI").is_none(),
            term_width: width,
        }
    }

    #[cfg(test)]
    pub fn plain(term_width: usize) -> Self {
        StyleOptions {
            use_color: false,
            use_emoji: false,
            term_width,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Role {
    Primary,
    Secondary,
    Accent,
    Error,
    Dim,
}

pub fn color(role: Role, text: impl AsRef<str>, style: &StyleOptions) -> String {
    if !style.use_color {
        return text.as_ref().to_string();
    }
    let code = match role {
        Role::Primary => "38;5;45",
        Role::Secondary => "38;5;250",
        Role::Accent => "38;5;213",
        Role::Error => "38;5;196",
        Role::Dim => "2",
    };
    format!("\x1b[{code}m{}\x1b[0m", text.as_ref())
}

pub fn emoji(tag: &str, style: &StyleOptions) -> &'static str {
    if !style.use_emoji {
        return "";
    }
    match tag {
        "success" => "✔",
        "error" => "✖",
        "warn" => "⚠",
        "info" => "ℹ",
        "doc" => "📖",
        "list" => "📜",
        _ => "",
    }
}

/// Single-line boxed title with an optional dimmed subtitle.
pub fn box_header(
    title: impl AsRef<str>,
    subtitle: Option<impl AsRef<str>>,
    style: &StyleOptions,
) -> String {
    let mut inner = color(Role::Primary, title.as_ref().trim(), style);
    if let Some(sub) = subtitle {
        inner.push_str("  ");
        inner.push_str(&color(Role::Secondary, sub.as_ref(), style));
    }
    let inner = truncate_visible(&inner, style.term_width.saturating_sub(4));
    let width = display_width(&inner) + 2;
    format!(
        "┌{h}┐\n│ {inner} │\n└{h}┘",
        h = "─".repeat(width)
    )
}

/// Lay names out in as many left-aligned columns as the width allows.
pub fn columns(items: &[String], style: &StyleOptions) -> String {
    if items.is_empty() {
        return String::new();
    }
    let cell = items.iter().map(|s| s.chars().count()).max().unwrap_or(0) + 2;
    let per_row = (style.term_width / cell).max(1);
    items
        .chunks(per_row)
        .map(|row| {
            row.iter()
                .map(|s| format!("{s:<cell$}"))
                .collect::<String>()
                .trim_end()
                .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn strip_ansi(s: &str) -> Cow<'_, str> {
    ANSI_CSI.replace_all(s, "")
}

fn display_width(s: &str) -> usize {
    strip_ansi(s).chars().count()
}

fn truncate_visible(s: &str, max: usize) -> String {
    if display_width(s) <= max {
        return s.to_string();
    }
    let plain: String = strip_ansi(s).chars().take(max.saturating_sub(1)).collect();
    format!("{plain}…")
}
