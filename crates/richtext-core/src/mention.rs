use serde::{Deserialize, Serialize};

use crate::dom::{escape_attr, escape_text};

/// A person (`@value`) or topic (`#value`) the editor can reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MentionItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub value: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl MentionItem {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: None,
            value: value.into(),
            label: label.into(),
            avatar: None,
            color: None,
            description: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MentionKind {
    Mention,
    Tag,
}

impl MentionKind {
    pub fn trigger(self) -> char {
        match self {
            MentionKind::Mention => '@',
            MentionKind::Tag => '#',
        }
    }

    fn class(self) -> &'static str {
        match self {
            MentionKind::Mention => "mention",
            MentionKind::Tag => "tag",
        }
    }

    fn data_attr(self) -> &'static str {
        match self {
            MentionKind::Mention => "data-mention",
            MentionKind::Tag => "data-tag",
        }
    }
}

/// Items known to the converter when turning `@value`/`#value` into spans.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MentionContext {
    pub mentions: Vec<MentionItem>,
    pub tags: Vec<MentionItem>,
}

impl MentionContext {
    pub fn is_empty(&self) -> bool {
        self.mentions.is_empty() && self.tags.is_empty()
    }

    pub fn find(&self, kind: MentionKind, value: &str) -> Option<&MentionItem> {
        let items = match kind {
            MentionKind::Mention => &self.mentions,
            MentionKind::Tag => &self.tags,
        };
        items.iter().find(|item| item.value == value)
    }

    /// Renders the span the editor uses for a resolved mention or tag.
    pub fn render(&self, kind: MentionKind, value: &str) -> Option<String> {
        let item = self.find(kind, value)?;
        let id = item
            .id
            .as_deref()
            .map(|id| format!(r#" data-id="{}""#, escape_attr(id)))
            .unwrap_or_default();
        Some(format!(
            r#"<span class="{}" {}="{}"{}>{}{}</span>"#,
            kind.class(),
            kind.data_attr(),
            escape_attr(&item.value),
            id,
            kind.trigger(),
            escape_text(&item.label),
        ))
    }
}
