//! Pure text-editing helpers for the Markdown source view.
//!
//! Positions and selections are character offsets. Out-of-range offsets are
//! clamped to the text length and a reversed selection is normalized.

use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::markdown::sanitize_language;
use crate::sanitize::Sanitizer;

lazy_static! {
    static ref HEADING_PREFIX: Regex =
        Regex::new(r"^#+[ \t]*").expect("Invalid HEADING_PREFIX regex pattern");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Bold,
    Italic,
    #[serde(alias = "strike")]
    Strikethrough,
    Code,
}

impl Format {
    pub fn marker(self) -> &'static str {
        match self {
            Format::Bold => "**",
            Format::Italic => "*",
            Format::Strikethrough => "~~",
            Format::Code => "`",
        }
    }
}

impl FromStr for Format {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bold" => Ok(Format::Bold),
            "italic" => Ok(Format::Italic),
            "strikethrough" | "strike" => Ok(Format::Strikethrough),
            "code" => Ok(Format::Code),
            other => Err(anyhow::anyhow!("unknown format: {}", other)),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Format::Bold => "bold",
            Format::Italic => "italic",
            Format::Strikethrough => "strikethrough",
            Format::Code => "code",
        };
        f.write_str(name)
    }
}

/// Text plus the selection to restore after a formatting toggle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedText {
    pub text: String,
    pub selection_start: usize,
    pub selection_end: usize,
}

/// Text plus the cursor position after an insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insertion {
    pub text: String,
    pub position: usize,
}

fn byte_offset(text: &str, char_index: usize) -> usize {
    text.char_indices()
        .nth(char_index)
        .map_or(text.len(), |(offset, _)| offset)
}

fn clamp(text: &str, position: usize) -> usize {
    position.min(text.chars().count())
}

fn splice(text: &str, position: usize, snippet: &str) -> Insertion {
    let position = clamp(text, position);
    let offset = byte_offset(text, position);
    Insertion {
        text: format!("{}{}{}", &text[..offset], snippet, &text[offset..]),
        position: position + snippet.chars().count(),
    }
}

/// Toggles `format` around the selection.
///
/// A selection that already includes the markers is unwrapped, then a
/// selection sitting between markers is unwrapped, otherwise the selection
/// is wrapped.
pub fn apply_format(
    text: &str,
    selection_start: usize,
    selection_end: usize,
    format: Format,
) -> FormattedText {
    let marker = format.marker();
    let width = marker.len();

    let (start, end) = {
        let a = clamp(text, selection_start);
        let b = clamp(text, selection_end);
        (a.min(b), a.max(b))
    };
    let s = byte_offset(text, start);
    let e = byte_offset(text, end);
    let (before, selected, after) = (&text[..s], &text[s..e], &text[e..]);

    if end - start > 2 * width && selected.starts_with(marker) && selected.ends_with(marker) {
        let inner = &selected[width..selected.len() - width];
        return FormattedText {
            text: format!("{}{}{}", before, inner, after),
            selection_start: start,
            selection_end: end - 2 * width,
        };
    }

    if before.ends_with(marker) && after.starts_with(marker) {
        return FormattedText {
            text: format!(
                "{}{}{}",
                &before[..before.len() - width],
                selected,
                &after[width..]
            ),
            selection_start: start - width,
            selection_end: end - width,
        };
    }

    FormattedText {
        text: format!("{}{}{}{}{}", before, marker, selected, marker, after),
        selection_start: start + width,
        selection_end: end + width,
    }
}

/// Inserts `[link_text](url)` at `position`. An unsafe URL leaves the text
/// untouched.
pub fn insert_link(
    sanitizer: &Sanitizer,
    text: &str,
    position: usize,
    link_text: &str,
    url: &str,
) -> Insertion {
    let Some(url) = sanitizer.sanitize_url(url) else {
        log::debug!("Refused to insert link with unsafe URL");
        return Insertion {
            text: text.to_string(),
            position,
        };
    };
    let url = url.trim();
    let label = if link_text.is_empty() { url } else { link_text };
    splice(text, position, &format!("[{}]({})", label, url))
}

/// Inserts `![alt](src)` at `position`. A rejected source leaves the text
/// untouched.
pub fn insert_image(
    sanitizer: &Sanitizer,
    text: &str,
    position: usize,
    alt: &str,
    src: &str,
) -> Insertion {
    let Some(src) = sanitizer.sanitize_image_src(src) else {
        log::debug!("Refused to insert image with rejected source");
        return Insertion {
            text: text.to_string(),
            position,
        };
    };
    splice(text, position, &format!("![{}]({})", alt, src.trim()))
}

/// Replaces the heading prefix of the line containing `line_start` with
/// `level` hashes.
pub fn insert_heading(text: &str, line_start: usize, level: u8) -> String {
    let level = usize::from(level.clamp(1, 6));
    let offset = byte_offset(text, clamp(text, line_start));
    let start = text[..offset].rfind('\n').map_or(0, |i| i + 1);
    let line = &text[start..];
    let rest = HEADING_PREFIX
        .find(line)
        .map_or(line, |prefix| &line[prefix.end()..]);
    format!("{}{} {}", &text[..start], "#".repeat(level), rest)
}

/// Inserts an empty fenced block and places the cursor on its empty line.
pub fn insert_code_block(text: &str, position: usize, language: Option<&str>) -> Insertion {
    let language = sanitize_language(language.unwrap_or(""));
    let opening = format!("\n```{}\n", language);
    let inserted = splice(text, position, &format!("{}\n```\n", opening));
    Insertion {
        position: clamp(text, position) + opening.chars().count(),
        text: inserted.text,
    }
}
