pub mod allowlist;
pub mod dom;
pub mod editing;
pub mod history;
mod html_to_markdown;
pub mod markdown;
pub mod mention;
pub mod sanitize;
pub mod urls;

use lazy_static::lazy_static;

pub use allowlist::{Allowlist, AllowlistExtension};
pub use dom::{Element, Fragment, Node};
pub use editing::{Format, FormattedText, Insertion};
pub use history::{History, HistoryEntry};
pub use markdown::{has_markdown_syntax, MarkdownConverter};
pub use mention::{MentionContext, MentionItem, MentionKind};
pub use sanitize::Sanitizer;

lazy_static! {
    static ref DEFAULT_CONVERTER: MarkdownConverter = MarkdownConverter::default();
}

fn default_sanitizer() -> &'static Sanitizer {
    DEFAULT_CONVERTER.sanitizer()
}

/// Sanitizes `html` with the standard allowlist.
pub fn sanitize_html(html: &str) -> String {
    default_sanitizer().sanitize(html)
}

pub fn sanitize_to_fragment(html: &str) -> Fragment {
    default_sanitizer().sanitize_to_fragment(html)
}

pub fn strip_tags(html: &str) -> String {
    default_sanitizer().strip_tags(html)
}

pub fn is_url_safe(url: &str) -> bool {
    default_sanitizer().is_url_safe(url)
}

pub fn sanitize_url(url: &str) -> Option<String> {
    default_sanitizer().sanitize_url(url)
}

pub fn sanitize_image_src(src: &str) -> Option<String> {
    default_sanitizer().sanitize_image_src(src)
}

/// Converts Markdown to sanitized HTML without mention resolution.
pub fn to_html(markdown: &str) -> String {
    DEFAULT_CONVERTER.to_html(markdown)
}

pub fn to_markdown(html: &str) -> String {
    DEFAULT_CONVERTER.to_markdown(html)
}
