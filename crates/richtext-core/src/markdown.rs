use lazy_static::lazy_static;
use regex::{Captures, Regex, RegexSet};

use crate::dom::{escape_attr, escape_text};
use crate::editing::{self, Format, FormattedText, Insertion};
use crate::html_to_markdown;
use crate::mention::{MentionContext, MentionKind};
use crate::sanitize::Sanitizer;

// Private-use delimiters around stashed inline HTML.
const STASH_OPEN: char = '\u{E000}';
const STASH_CLOSE: char = '\u{E001}';

lazy_static! {
    static ref HEADING: Regex =
        Regex::new(r"^(#{1,6})[ \t]+(.+?)[ \t]*$").expect("Invalid HEADING regex pattern");
    static ref THEMATIC_BREAK: Regex = Regex::new(r"^[ \t]{0,3}(?:-{3,}|\*{3,}|_{3,})[ \t]*$")
        .expect("Invalid THEMATIC_BREAK regex pattern");
    static ref UNORDERED_ITEM: Regex =
        Regex::new(r"^[ \t]*[-*+][ \t]+(.*)$").expect("Invalid UNORDERED_ITEM regex pattern");
    static ref ORDERED_ITEM: Regex =
        Regex::new(r"^[ \t]*(\d{1,9})\.[ \t]+(.*)$").expect("Invalid ORDERED_ITEM regex pattern");
    static ref QUOTE_LINE: Regex =
        Regex::new(r"^[ \t]{0,3}> ?(.*)$").expect("Invalid QUOTE_LINE regex pattern");
    static ref TABLE_SEPARATOR: Regex = Regex::new(
        r"^[ \t]*\|?[ \t]*:?-{3,}:?[ \t]*(?:\|[ \t]*:?-{3,}:?[ \t]*)*\|?[ \t]*$"
    )
    .expect("Invalid TABLE_SEPARATOR regex pattern");
    static ref CODE_SPAN: Regex = Regex::new(r"`([^`\n]+)`").expect("Invalid CODE_SPAN regex pattern");
    // Destinations may hold one level of balanced parentheses.
    static ref IMAGE: Regex = Regex::new(
        r#"!\[([^\]\n]*)\]\(((?:[^()\s]|\([^()\s]*\))+)(?:[ \t]+"([^"\n]*)")?\)"#
    )
    .expect("Invalid IMAGE regex pattern");
    static ref LINK: Regex = Regex::new(
        r#"\[([^\]\n]+)\]\(((?:[^()\s]|\([^()\s]*\))+)(?:[ \t]+"([^"\n]*)")?\)"#
    )
    .expect("Invalid LINK regex pattern");
    static ref PASSTHROUGH_TAG: Regex = Regex::new(r"(?i)</?(?:u|sub|sup|mark)>|<br[ \t]*/?>")
        .expect("Invalid PASSTHROUGH_TAG regex pattern");
    static ref BOLD_ITALIC_STAR: Regex = Regex::new(r"\*\*\*(\S(?:[^\n]*?\S)??)\*\*\*")
        .expect("Invalid BOLD_ITALIC_STAR regex pattern");
    static ref BOLD_ITALIC_UNDERSCORE: Regex =
        Regex::new(r"(^|[^\w])___(\S(?:[^\n]*?\S)??)___($|[^\w])")
            .expect("Invalid BOLD_ITALIC_UNDERSCORE regex pattern");
    static ref BOLD_STAR: Regex =
        Regex::new(r"\*\*(\S(?:[^\n]*?\S)??)\*\*").expect("Invalid BOLD_STAR regex pattern");
    static ref BOLD_UNDERSCORE: Regex = Regex::new(r"(^|[^\w])__(\S(?:[^\n]*?\S)??)__($|[^\w])")
        .expect("Invalid BOLD_UNDERSCORE regex pattern");
    static ref ITALIC_STAR: Regex =
        Regex::new(r"\*([^*\s](?:[^*\n]*?[^*\s])?)\*").expect("Invalid ITALIC_STAR regex pattern");
    static ref ITALIC_UNDERSCORE: Regex =
        Regex::new(r"(^|[^\w])_([^_\s](?:[^_\n]*?[^_\s])?)_($|[^\w])")
            .expect("Invalid ITALIC_UNDERSCORE regex pattern");
    static ref STRIKETHROUGH: Regex =
        Regex::new(r"~~(\S(?:[^\n]*?\S)??)~~").expect("Invalid STRIKETHROUGH regex pattern");
    static ref MENTION: Regex =
        Regex::new(r"(^|[^\w@])@(\w(?:[\w.-]*\w)?)").expect("Invalid MENTION regex pattern");
    static ref TAG: Regex =
        Regex::new(r"(^|[^\w&#])#(\w(?:[\w-]*\w)?)").expect("Invalid TAG regex pattern");
    static ref HARD_BREAK: Regex =
        Regex::new(r"[ \t]{2,}\n").expect("Invalid HARD_BREAK regex pattern");
    static ref STASHED: Regex = Regex::new(&format!(r"{}(\d+){}", STASH_OPEN, STASH_CLOSE))
        .expect("Invalid STASHED regex pattern");
    static ref MARKDOWN_SYNTAX: RegexSet = RegexSet::new([
        r"(?m)^#{1,6}[ \t]+\S",
        r"\*\*[^*\n]+\*\*|__[^_\n]+__",
        r"\*[^*\s][^*\n]*\*|\b_[^_\n]+_\b",
        r"~~[^~\n]+~~",
        r"!\[[^\]\n]*\]\([^)\s]+\)",
        r"\[[^\]\n]+\]\([^)\s]+\)",
        r"(?m)^[ \t]*(?:[-*+]|\d+\.)[ \t]+\S",
        r"(?m)^[ \t]*>",
        r"(?m)^[ \t]*(?:```|~~~)",
        r"`[^`\n]+`",
    ])
    .expect("Invalid MARKDOWN_SYNTAX regex set");
}

/// True when `text` contains any structural Markdown construct.
pub fn has_markdown_syntax(text: &str) -> bool {
    MARKDOWN_SYNTAX.is_match(text)
}

/// Keeps only the characters a fence language tag may contain.
pub(crate) fn sanitize_language(language: &str) -> String {
    language
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '#' | '.' | '-'))
        .collect()
}

/// Bidirectional Markdown/HTML converter. Every HTML result goes through
/// the [`Sanitizer`] it owns.
#[derive(Debug, Clone, Default)]
pub struct MarkdownConverter {
    sanitizer: Sanitizer,
    mentions: MentionContext,
}

impl MarkdownConverter {
    pub fn new(sanitizer: Sanitizer) -> Self {
        Self {
            sanitizer,
            mentions: MentionContext::default(),
        }
    }

    pub fn with_mentions(mut self, mentions: MentionContext) -> Self {
        self.mentions = mentions;
        self
    }

    pub fn sanitizer(&self) -> &Sanitizer {
        &self.sanitizer
    }

    pub fn mentions(&self) -> &MentionContext {
        &self.mentions
    }

    /// Converts Markdown to sanitized HTML.
    pub fn to_html(&self, markdown: &str) -> String {
        if markdown.is_empty() {
            return String::new();
        }
        let normalized = normalize(markdown);
        let lines: Vec<&str> = normalized.split('\n').collect();
        let blocks = BlockParser::new(self).run(&lines);
        self.sanitizer.sanitize(&blocks.join("\n"))
    }

    /// Converts HTML to Markdown. The input is sanitized first.
    pub fn to_markdown(&self, html: &str) -> String {
        html_to_markdown::convert(&self.sanitizer, html)
    }

    pub fn has_markdown_syntax(&self, text: &str) -> bool {
        has_markdown_syntax(text)
    }

    pub fn apply_format(
        &self,
        text: &str,
        selection_start: usize,
        selection_end: usize,
        format: Format,
    ) -> FormattedText {
        editing::apply_format(text, selection_start, selection_end, format)
    }

    pub fn insert_link(&self, text: &str, position: usize, link_text: &str, url: &str) -> Insertion {
        editing::insert_link(&self.sanitizer, text, position, link_text, url)
    }

    pub fn insert_image(&self, text: &str, position: usize, alt: &str, src: &str) -> Insertion {
        editing::insert_image(&self.sanitizer, text, position, alt, src)
    }

    pub fn insert_heading(&self, text: &str, line_start: usize, level: u8) -> String {
        editing::insert_heading(text, line_start, level)
    }

    pub fn insert_code_block(&self, text: &str, position: usize, language: Option<&str>) -> Insertion {
        editing::insert_code_block(text, position, language)
    }

    fn render_inline(&self, text: &str) -> String {
        let mut stash = Stash::default();

        // Code spans go first so no other rule touches their content.
        let text = CODE_SPAN.replace_all(text, |caps: &Captures| {
            stash.put(format!("<code>{}</code>", escape_text(&caps[1])))
        });

        let text = IMAGE.replace_all(&text, |caps: &Captures| {
            match self.sanitizer.sanitize_image_src(&caps[2]) {
                Some(src) => stash.put(image_tag(&src, &caps[1], caps.get(3).map(|m| m.as_str()))),
                None => String::new(),
            }
        });

        let text = LINK.replace_all(&text, |caps: &Captures| {
            match self.sanitizer.sanitize_url(&caps[2]) {
                Some(url) => {
                    let open = stash.put(link_open_tag(&url, caps.get(3).map(|m| m.as_str())));
                    let close = stash.put("</a>".to_string());
                    format!("{}{}{}", open, &caps[1], close)
                }
                None => caps[1].to_string(),
            }
        });

        let text = escape_angle_brackets(&text);

        let text = BOLD_ITALIC_STAR.replace_all(&text, "<strong><em>$1</em></strong>");
        let text = replace_bounded(
            &BOLD_ITALIC_UNDERSCORE,
            &text,
            "${1}<strong><em>${2}</em></strong>${3}",
        );
        let text = BOLD_STAR.replace_all(&text, "<strong>$1</strong>");
        let text = replace_bounded(&BOLD_UNDERSCORE, &text, "${1}<strong>${2}</strong>${3}");
        let text = ITALIC_STAR.replace_all(&text, "<em>$1</em>");
        let text = replace_bounded(&ITALIC_UNDERSCORE, &text, "${1}<em>${2}</em>${3}");
        let text = STRIKETHROUGH.replace_all(&text, "<del>$1</del>");

        let text = MENTION.replace_all(&text, |caps: &Captures| {
            match self.mentions.render(MentionKind::Mention, &caps[2]) {
                Some(span) => format!("{}{}", &caps[1], stash.put(span)),
                None => caps[0].to_string(),
            }
        });
        let text = TAG.replace_all(&text, |caps: &Captures| {
            match self.mentions.render(MentionKind::Tag, &caps[2]) {
                Some(span) => format!("{}{}", &caps[1], stash.put(span)),
                None => caps[0].to_string(),
            }
        });

        let text = HARD_BREAK.replace_all(&text, "<br>\n");

        stash.restore(&text)
    }
}

/// Underscore rules consume the boundary character on each side, so a span
/// directly after another one only matches on a later pass.
fn replace_bounded(pattern: &Regex, text: &str, replacement: &str) -> String {
    let mut text = text.to_string();
    while pattern.is_match(&text) {
        text = pattern.replace_all(&text, replacement).into_owned();
    }
    text
}

fn normalize(markdown: &str) -> String {
    markdown
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .chars()
        .filter(|c| *c != STASH_OPEN && *c != STASH_CLOSE)
        .collect()
}

fn image_tag(src: &str, alt: &str, title: Option<&str>) -> String {
    match title {
        Some(title) => format!(
            r#"<img src="{}" alt="{}" title="{}">"#,
            escape_attr(src),
            escape_attr(alt),
            escape_attr(title)
        ),
        None => format!(r#"<img src="{}" alt="{}">"#, escape_attr(src), escape_attr(alt)),
    }
}

fn link_open_tag(url: &str, title: Option<&str>) -> String {
    match title {
        Some(title) => format!(r#"<a href="{}" title="{}">"#, escape_attr(url), escape_attr(title)),
        None => format!(r#"<a href="{}">"#, escape_attr(url)),
    }
}

/// Escapes `<` and `>` outside the few inline tags Markdown cannot express.
fn escape_angle_brackets(text: &str) -> String {
    fn push_escaped(out: &mut String, text: &str) {
        for ch in text.chars() {
            match ch {
                '<' => out.push_str("&lt;"),
                '>' => out.push_str("&gt;"),
                _ => out.push(ch),
            }
        }
    }

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for tag in PASSTHROUGH_TAG.find_iter(text) {
        push_escaped(&mut out, &text[last..tag.start()]);
        out.push_str(tag.as_str());
        last = tag.end();
    }
    push_escaped(&mut out, &text[last..]);
    out
}

/// Generated HTML parked behind placeholder tokens while inline rules run.
#[derive(Default)]
struct Stash {
    items: Vec<String>,
}

impl Stash {
    fn put(&mut self, html: String) -> String {
        let token = format!("{}{}{}", STASH_OPEN, self.items.len(), STASH_CLOSE);
        self.items.push(html);
        token
    }

    fn restore(&self, text: &str) -> String {
        STASHED
            .replace_all(text, |caps: &Captures| {
                caps[1]
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| self.items.get(index))
                    .cloned()
                    .unwrap_or_default()
            })
            .into_owned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Unordered,
    Ordered,
}

struct PendingList<'a> {
    kind: ListKind,
    start: u64,
    items: Vec<&'a str>,
}

fn list_item(line: &str) -> Option<(ListKind, u64, &str)> {
    if let Some(caps) = UNORDERED_ITEM.captures(line) {
        return Some((ListKind::Unordered, 1, caps.get(1).map_or("", |m| m.as_str())));
    }
    let caps = ORDERED_ITEM.captures(line)?;
    let start = caps[1].parse().unwrap_or(1);
    Some((ListKind::Ordered, start, caps.get(2).map_or("", |m| m.as_str())))
}

struct Fence {
    marker: char,
    len: usize,
    language: String,
}

impl Fence {
    fn open(line: &str) -> Option<Self> {
        let trimmed = line.trim_start();
        if line.len() - trimmed.len() > 3 {
            return None;
        }
        let marker = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
        let len = trimmed.chars().take_while(|c| *c == marker).count();
        if len < 3 {
            return None;
        }
        let info = trimmed[len..].trim();
        if marker == '`' && info.contains('`') {
            return None;
        }
        let language = sanitize_language(info.split_whitespace().next().unwrap_or(""));
        Some(Self {
            marker,
            len,
            language,
        })
    }

    fn closes(&self, line: &str) -> bool {
        let trimmed = line.trim();
        trimmed.len() >= self.len && trimmed.chars().all(|c| c == self.marker)
    }

    /// Returns the rendered block and how many lines it used, closing
    /// fence included. An unterminated fence runs to the end of input.
    fn consume(&self, lines: &[&str]) -> (String, usize) {
        let mut body = Vec::new();
        for (index, line) in lines.iter().enumerate() {
            if self.closes(line) {
                return (self.render(&body), index + 1);
            }
            body.push(*line);
        }
        (self.render(&body), lines.len())
    }

    fn render(&self, body: &[&str]) -> String {
        let code = escape_text(&body.join("\n"));
        if self.language.is_empty() {
            format!("<pre><code>{}</code></pre>", code)
        } else {
            format!(
                r#"<pre><code data-language="{lang}" class="language-{lang}">{code}</code></pre>"#,
                lang = self.language,
                code = code
            )
        }
    }
}

fn split_table_row(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    let inner = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let inner = match inner.strip_suffix('|') {
        Some(rest) if !rest.ends_with('\\') => rest,
        _ => inner,
    };

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = inner.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' if chars.peek() == Some(&'|') => {
                current.push('|');
                chars.next();
            }
            '|' => {
                cells.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    cells.push(current.trim().to_string());
    cells
}

/// Line scanner for the block-level constructs. Pending paragraph, quote
/// and list lines are flushed whenever a different construct starts.
struct BlockParser<'c, 'a> {
    converter: &'c MarkdownConverter,
    blocks: Vec<String>,
    paragraph: Vec<&'a str>,
    quote: Vec<&'a str>,
    list: Option<PendingList<'a>>,
}

impl<'c, 'a> BlockParser<'c, 'a> {
    fn new(converter: &'c MarkdownConverter) -> Self {
        Self {
            converter,
            blocks: Vec::new(),
            paragraph: Vec::new(),
            quote: Vec::new(),
            list: None,
        }
    }

    fn run(mut self, lines: &[&'a str]) -> Vec<String> {
        let mut i = 0;
        while i < lines.len() {
            let line = lines[i];

            if let Some(fence) = Fence::open(line) {
                self.flush();
                let (html, consumed) = fence.consume(&lines[i + 1..]);
                self.blocks.push(html);
                i += 1 + consumed;
                continue;
            }

            if line.trim().is_empty() {
                self.flush();
                i += 1;
                continue;
            }

            if let Some(caps) = QUOTE_LINE.captures(line) {
                self.flush_paragraph();
                self.flush_list();
                self.quote.push(caps.get(1).map_or("", |m| m.as_str()));
                i += 1;
                continue;
            }
            self.flush_quote();

            if let Some(caps) = HEADING.captures(line) {
                self.flush();
                let level = caps[1].len();
                let text = self.converter.render_inline(&caps[2]);
                self.blocks.push(format!("<h{level}>{text}</h{level}>"));
                i += 1;
                continue;
            }

            if THEMATIC_BREAK.is_match(line) {
                self.flush();
                self.blocks.push("<hr>".to_string());
                i += 1;
                continue;
            }

            if let Some((kind, start, item)) = list_item(line) {
                self.flush_paragraph();
                if self.list.as_ref().is_some_and(|list| list.kind != kind) {
                    self.flush_list();
                }
                self.list
                    .get_or_insert_with(|| PendingList {
                        kind,
                        start,
                        items: Vec::new(),
                    })
                    .items
                    .push(item);
                i += 1;
                continue;
            }

            if let Some(consumed) = self.table(&lines[i..]) {
                i += consumed;
                continue;
            }

            self.flush_list();
            self.paragraph.push(line);
            i += 1;
        }

        self.flush();
        self.blocks
    }

    fn flush(&mut self) {
        self.flush_paragraph();
        self.flush_quote();
        self.flush_list();
    }

    fn flush_paragraph(&mut self) {
        if self.paragraph.is_empty() {
            return;
        }
        let text = self.paragraph.join("\n");
        self.paragraph.clear();
        let html = self.converter.render_inline(text.trim());
        self.blocks.push(format!("<p>{}</p>", html));
    }

    fn flush_quote(&mut self) {
        if self.quote.is_empty() {
            return;
        }
        let converter = self.converter;
        let lines: Vec<String> = self
            .quote
            .drain(..)
            .map(|line| converter.render_inline(line.trim_end()))
            .collect();
        self.blocks
            .push(format!("<blockquote>{}</blockquote>", lines.join("<br>")));
    }

    fn flush_list(&mut self) {
        let Some(list) = self.list.take() else {
            return;
        };
        let items: String = list
            .items
            .iter()
            .map(|item| format!("<li>{}</li>", self.converter.render_inline(item.trim())))
            .collect();
        let html = match list.kind {
            ListKind::Unordered => format!("<ul>{}</ul>", items),
            ListKind::Ordered if list.start != 1 => {
                format!(r#"<ol start="{}">{}</ol>"#, list.start, items)
            }
            ListKind::Ordered => format!("<ol>{}</ol>", items),
        };
        self.blocks.push(html);
    }

    /// GFM pipe table: a `|` header row followed by a `---` separator row.
    fn table(&mut self, lines: &[&'a str]) -> Option<usize> {
        let header = lines.first()?;
        if !header.trim_start().starts_with('|') {
            return None;
        }
        if !TABLE_SEPARATOR.is_match(lines.get(1)?) {
            return None;
        }

        self.flush();
        let head = self.table_row(header, "th");
        let mut body = String::new();
        let mut consumed = 2;
        for row in &lines[2..] {
            if !row.trim_start().starts_with('|') {
                break;
            }
            body.push_str(&self.table_row(row, "td"));
            consumed += 1;
        }

        let html = if body.is_empty() {
            format!("<table><thead>{}</thead></table>", head)
        } else {
            format!(
                "<table><thead>{}</thead><tbody>{}</tbody></table>",
                head, body
            )
        };
        self.blocks.push(html);
        Some(consumed)
    }

    fn table_row(&self, line: &str, cell: &str) -> String {
        let cells: String = split_table_row(line)
            .iter()
            .map(|text| format!("<{cell}>{}</{cell}>", self.converter.render_inline(text)))
            .collect();
        format!("<tr>{}</tr>", cells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mention::MentionItem;

    fn to_html(markdown: &str) -> String {
        MarkdownConverter::default().to_html(markdown)
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(to_html(""), "");
    }

    #[test]
    fn test_basic_markdown() {
        assert_eq!(
            to_html("# Hello\n\nThis is **bold** and *italic*."),
            "<h1>Hello</h1>\n<p>This is <strong>bold</strong> and <em>italic</em>.</p>"
        );
    }

    #[test]
    fn test_heading_levels() {
        assert_eq!(to_html("###### six"), "<h6>six</h6>");
        assert_eq!(to_html("####### seven"), "<p>####### seven</p>");
        assert_eq!(to_html("#nospace"), "<p>#nospace</p>");
    }

    #[test]
    fn test_line_endings_are_normalized() {
        assert_eq!(to_html("a\r\nb\r\n\r\nc"), "<p>a\nb</p>\n<p>c</p>");
    }

    #[test]
    fn test_fenced_code_block() {
        let html = to_html("```rust\nfn main() {\n    println!(\"<hi>\");\n}\n```");
        assert_eq!(
            html,
            "<pre><code data-language=\"rust\" class=\"language-rust\">fn main() {\n    println!(\"&lt;hi&gt;\");\n}</code></pre>"
        );
    }

    #[test]
    fn test_tilde_fence_without_language() {
        assert_eq!(
            to_html("~~~\n**not bold**\n~~~"),
            "<pre><code>**not bold**</code></pre>"
        );
    }

    #[test]
    fn test_unterminated_fence_runs_to_end() {
        assert_eq!(to_html("```\na\nb"), "<pre><code>a\nb</code></pre>");
    }

    #[test]
    fn test_blockquote_joins_lines() {
        assert_eq!(
            to_html("> first\n> **second**\n>\n> third"),
            "<blockquote>first<br><strong>second</strong><br><br>third</blockquote>"
        );
    }

    #[test]
    fn test_lists_group_and_flush_on_type_change() {
        assert_eq!(
            to_html("- a\n* b\n1. x\n2. y"),
            "<ul><li>a</li><li>b</li></ul>\n<ol><li>x</li><li>y</li></ol>"
        );
        assert_eq!(
            to_html("3. c\n4. d"),
            "<ol start=\"3\"><li>c</li><li>d</li></ol>"
        );
    }

    #[test]
    fn test_thematic_break() {
        assert_eq!(to_html("a\n\n---\n\nb"), "<p>a</p>\n<hr>\n<p>b</p>");
        assert_eq!(to_html("***"), "<hr>");
        assert_eq!(to_html("___"), "<hr>");
    }

    #[test]
    fn test_links() {
        assert_eq!(
            to_html("[x](https://a.com)"),
            "<p><a href=\"https://a.com\" rel=\"noopener noreferrer\">x</a></p>"
        );
        assert_eq!(
            to_html("[x](https://a.com \"Title\")"),
            "<p><a href=\"https://a.com\" rel=\"noopener noreferrer\" title=\"Title\">x</a></p>"
        );
    }

    #[test]
    fn test_rejected_link_becomes_text() {
        assert_eq!(to_html("[click](javascript:void)"), "<p>click</p>");
    }

    #[test]
    fn test_images() {
        assert_eq!(
            to_html("![logo](https://a.com/l.png)"),
            "<p><img src=\"https://a.com/l.png\" alt=\"logo\"></p>"
        );
        let html = to_html("![x](http://evil.com/x.png) after");
        assert!(!html.contains("<img"));
        assert!(html.contains("after"));
    }

    #[test]
    fn test_emphasis_variants() {
        assert_eq!(
            to_html("***both*** __b__ _i_ ~~s~~"),
            "<p><strong><em>both</em></strong> <strong>b</strong> <em>i</em> <del>s</del></p>"
        );
        assert_eq!(to_html("snake_case_name"), "<p>snake_case_name</p>");
        assert_eq!(to_html("5 * 3 * 2"), "<p>5 * 3 * 2</p>");
    }

    #[test]
    fn test_single_character_spans_close_at_their_own_marker() {
        assert_eq!(
            to_html("**a** and **b**"),
            "<p><strong>a</strong> and <strong>b</strong></p>"
        );
        assert_eq!(to_html("~~x~~ then ~~y~~"), "<p><del>x</del> then <del>y</del></p>");
        assert_eq!(
            to_html("***a*** and ***b***"),
            "<p><strong><em>a</em></strong> and <strong><em>b</em></strong></p>"
        );
    }

    #[test]
    fn test_adjacent_underscore_spans() {
        assert_eq!(to_html("_a_ _b_"), "<p><em>a</em> <em>b</em></p>");
        assert_eq!(
            to_html("__a__ __b__ _c_"),
            "<p><strong>a</strong> <strong>b</strong> <em>c</em></p>"
        );
    }

    #[test]
    fn test_link_destination_with_parentheses() {
        assert_eq!(
            to_html("[w](https://en.wikipedia.org/wiki/Rust_(language))"),
            "<p><a href=\"https://en.wikipedia.org/wiki/Rust_(language)\" rel=\"noopener noreferrer\">w</a></p>"
        );
        assert_eq!(
            to_html("![r](https://a.com/r_(1).png) (note)"),
            "<p><img src=\"https://a.com/r_(1).png\" alt=\"r\"> (note)</p>"
        );
    }

    #[test]
    fn test_control_character_before_link_scheme() {
        assert_eq!(to_html("[x](\u{1}javascript:alert(1))"), "<p>x</p>");
    }

    #[test]
    fn test_inline_code_is_protected() {
        assert_eq!(
            to_html("Use `a*b*c <x>` here"),
            "<p>Use <code>a*b*c &lt;x&gt;</code> here</p>"
        );
    }

    #[test]
    fn test_bare_angle_brackets_are_escaped() {
        let html = to_html("<script>alert(1)</script>");
        assert_eq!(html, "<p>&lt;script&gt;alert(1)&lt;/script&gt;</p>");
        assert_eq!(to_html("a < b > c"), "<p>a &lt; b &gt; c</p>");
    }

    #[test]
    fn test_underline_passthrough() {
        assert_eq!(to_html("<u>under</u>"), "<p><u>under</u></p>");
    }

    #[test]
    fn test_hard_line_break() {
        assert_eq!(to_html("a  \nb"), "<p>a<br>\nb</p>");
    }

    #[test]
    fn test_table() {
        assert_eq!(
            to_html("| H1 | H2 |\n| --- | --- |\n| a \\| b | **c** |"),
            "<table><thead><tr><th>H1</th><th>H2</th></tr></thead><tbody><tr><td>a | b</td><td><strong>c</strong></td></tr></tbody></table>"
        );
    }

    #[test]
    fn test_mentions_and_tags() {
        let converter = MarkdownConverter::default().with_mentions(MentionContext {
            mentions: vec![MentionItem::new("alice", "Alice").with_id("u1")],
            tags: vec![MentionItem::new("rust", "Rust")],
        });
        assert_eq!(
            converter.to_html("hi @alice and @bob #rust"),
            "<p>hi <span class=\"mention\" data-mention=\"alice\" data-id=\"u1\">@Alice</span> and @bob <span class=\"tag\" data-tag=\"rust\">#Rust</span></p>"
        );
    }

    #[test]
    fn test_placeholder_characters_in_input_are_ignored() {
        let html = to_html("a\u{E000}0\u{E001}b");
        assert_eq!(html, "<p>a0b</p>");
    }

    #[test]
    fn test_has_markdown_syntax() {
        for text in [
            "# Heading",
            "some **bold**",
            "an *italic* word",
            "~~gone~~",
            "[a](https://b.c)",
            "![a](/b.png)",
            "- item",
            "1. item",
            "> quote",
            "```",
            "`code`",
        ] {
            assert!(has_markdown_syntax(text), "{}", text);
        }
        assert!(!has_markdown_syntax("plain text, nothing else."));
        assert!(!has_markdown_syntax("5 * 3"));
    }

    #[test]
    fn test_sanitize_language() {
        assert_eq!(sanitize_language("c++"), "c++");
        assert_eq!(sanitize_language("js\" onclick=\"x"), "jsonclickx");
    }
}
