use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Attribute-table key for attributes permitted on every allowed tag.
pub const WILDCARD: &str = "*";

const TAGS: &[&str] = &[
    "p", "br", "hr", "h1", "h2", "h3", "h4", "h5", "h6", "strong", "b", "em", "i", "u", "s",
    "del", "strike", "code", "pre", "blockquote", "ul", "ol", "li", "a", "img", "span", "div",
    "table", "thead", "tbody", "tfoot", "tr", "th", "td", "sub", "sup", "mark",
];

const ATTRIBUTES: &[(&str, &[&str])] = &[
    ("a", &["href", "target", "title"]),
    ("img", &["src", "alt", "title", "width", "height"]),
    ("pre", &["data-language"]),
    ("code", &["data-language"]),
    ("ol", &["start"]),
    ("th", &["colspan", "rowspan"]),
    ("td", &["colspan", "rowspan"]),
    (
        WILDCARD,
        &[
            "class",
            "style",
            "data-mention",
            "data-tag",
            "data-id",
            "data-value",
            "data-label",
        ],
    ),
];

const STYLE_PROPERTIES: &[&str] = &[
    "color",
    "background-color",
    "font-weight",
    "font-style",
    "text-decoration",
    "text-align",
    "font-size",
    "font-family",
    "width",
    "height",
    "max-width",
    "margin-left",
    "padding-left",
    "vertical-align",
];

const CLASS_PATTERNS: &[&str] = &[
    r"language-[\w+#.-]+",
    r"hljs(?:-[\w-]+)?",
    r"mention",
    r"tag",
    r"text-(?:left|center|right|justify)",
];

const DANGEROUS_SCHEMES: &[&str] = &["javascript:", "vbscript:", "data:"];

const IMAGE_DATA_PREFIXES: &[&str] = &[
    "data:image/png",
    "data:image/jpeg",
    "data:image/jpg",
    "data:image/gif",
    "data:image/webp",
    "data:image/svg+xml",
];

const DROPPED_TAGS: &[&str] = &[
    "script", "style", "iframe", "object", "embed", "noscript", "template",
];

lazy_static! {
    static ref EVENT_HANDLER: Regex =
        Regex::new(r"(?i)^on\w+").expect("Invalid EVENT_HANDLER regex pattern");
}

/// Returns true for `on*` event-handler attribute names.
pub fn is_event_handler(name: &str) -> bool {
    EVENT_HANDLER.is_match(name)
}

/// Extra entries merged into the standard tables, usually from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AllowlistExtension {
    pub tags: Vec<String>,
    pub attributes: HashMap<String, Vec<String>>,
    pub style_properties: Vec<String>,
    pub class_patterns: Vec<String>,
}

impl AllowlistExtension {
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
            && self.attributes.is_empty()
            && self.style_properties.is_empty()
            && self.class_patterns.is_empty()
    }
}

/// The tables that decide what survives sanitization.
#[derive(Debug, Clone)]
pub struct Allowlist {
    tags: HashSet<String>,
    attributes: HashMap<String, HashSet<String>>,
    style_properties: HashSet<String>,
    class_patterns: Vec<Regex>,
    dangerous_schemes: Vec<String>,
    image_data_prefixes: Vec<String>,
    dropped_tags: HashSet<String>,
}

impl Default for Allowlist {
    fn default() -> Self {
        Self::standard()
    }
}

impl Allowlist {
    pub fn standard() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        let attributes = ATTRIBUTES
            .iter()
            .map(|(tag, attrs)| (tag.to_string(), owned(attrs).into_iter().collect()))
            .collect();

        let class_patterns = CLASS_PATTERNS
            .iter()
            .map(|pattern| anchored(pattern).expect("Invalid built-in class pattern"))
            .collect();

        Self {
            tags: owned(TAGS).into_iter().collect(),
            attributes,
            style_properties: owned(STYLE_PROPERTIES).into_iter().collect(),
            class_patterns,
            dangerous_schemes: owned(DANGEROUS_SCHEMES),
            image_data_prefixes: owned(IMAGE_DATA_PREFIXES),
            dropped_tags: owned(DROPPED_TAGS).into_iter().collect(),
        }
    }

    /// Merges `extension` into the tables.
    ///
    /// Drop-listed tags and event-handler attributes are refused with a
    /// warning; an invalid class pattern is an error and leaves `self`
    /// untouched.
    pub fn extend(&mut self, extension: &AllowlistExtension) -> Result<()> {
        let mut patterns = Vec::with_capacity(extension.class_patterns.len());
        for pattern in &extension.class_patterns {
            let regex = anchored(pattern)
                .with_context(|| format!("invalid class pattern: {}", pattern))?;
            patterns.push(regex);
        }
        self.class_patterns.extend(patterns);

        for tag in &extension.tags {
            let tag = tag.trim().to_ascii_lowercase();
            if tag.is_empty() {
                continue;
            }
            if self.dropped_tags.contains(&tag) {
                log::warn!("Refusing to allow drop-listed tag <{}>", tag);
                continue;
            }
            self.tags.insert(tag);
        }

        for (tag, attrs) in &extension.attributes {
            let tag = tag.trim().to_ascii_lowercase();
            let entry = self.attributes.entry(tag.clone()).or_default();
            for attr in attrs {
                let attr = attr.trim().to_ascii_lowercase();
                if attr.is_empty() {
                    continue;
                }
                if is_event_handler(&attr) {
                    log::warn!("Refusing to allow event handler attribute {} on {}", attr, tag);
                    continue;
                }
                entry.insert(attr);
            }
        }

        self.style_properties.extend(
            extension
                .style_properties
                .iter()
                .map(|p| p.trim().to_ascii_lowercase())
                .filter(|p| !p.is_empty()),
        );

        Ok(())
    }

    pub fn is_tag_allowed(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn is_dropped(&self, tag: &str) -> bool {
        self.dropped_tags.contains(tag)
    }

    pub fn is_attribute_allowed(&self, tag: &str, attr: &str) -> bool {
        [tag, WILDCARD].iter().any(|key| {
            self.attributes
                .get(*key)
                .is_some_and(|allowed| allowed.contains(attr))
        })
    }

    pub fn is_style_property_allowed(&self, property: &str) -> bool {
        self.style_properties.contains(property)
    }

    pub fn is_class_allowed(&self, class: &str) -> bool {
        self.class_patterns.iter().any(|re| re.is_match(class))
    }

    pub fn dangerous_schemes(&self) -> &[String] {
        &self.dangerous_schemes
    }

    pub fn image_data_prefixes(&self) -> &[String] {
        &self.image_data_prefixes
    }
}

// Class patterns always match a whole token.
fn anchored(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{})$", pattern))
}
