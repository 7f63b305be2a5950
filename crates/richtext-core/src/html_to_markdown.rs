//! HTML to Markdown conversion over the sanitized [`Fragment`] tree.
//!
//! Block constructs are emitted surrounded by blank lines and [`tidy`]
//! collapses the surplus at the end, so each renderer only has to care
//! about its own element.
//!
//! [`Fragment`]: crate::dom::Fragment

use crate::dom::{Element, Node};
use crate::markdown::sanitize_language;
use crate::sanitize::Sanitizer;

pub(crate) fn convert(sanitizer: &Sanitizer, html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }
    let fragment = sanitizer.sanitize_to_fragment(html);
    tidy(&render_nodes(&fragment.nodes))
}

fn render_nodes(nodes: &[Node]) -> String {
    let mut out = String::new();
    let mut after_break = false;
    for node in nodes {
        match node {
            Node::Text(text) => {
                // `<br>` already ended the line.
                let text = if after_break {
                    text.strip_prefix('\n').unwrap_or(text)
                } else {
                    text.as_str()
                };
                out.push_str(text);
                after_break = false;
            }
            Node::Element(element) => {
                out.push_str(&render_element(element));
                after_break = element.tag == "br";
            }
        }
    }
    out
}

fn render_element(element: &Element) -> String {
    let tag = element.tag.as_str();
    match tag {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let text = single_line(&render_nodes(&element.children));
            if text.is_empty() {
                return String::new();
            }
            let level = usize::from(tag.as_bytes()[1] - b'0');
            block(&format!("{} {}", "#".repeat(level), text))
        }
        "strong" | "b" => wrap_inline("**", &render_nodes(&element.children)),
        "em" | "i" => wrap_inline("*", &render_nodes(&element.children)),
        "del" | "s" | "strike" => wrap_inline("~~", &render_nodes(&element.children)),
        "u" | "sub" | "sup" | "mark" => {
            format!("<{tag}>{}</{tag}>", render_nodes(&element.children))
        }
        "code" => code_span(&element.text_content()),
        "pre" => fenced_code(element),
        "a" => link(element),
        "img" => image(element),
        "ul" => list(element, false),
        "ol" => list(element, true),
        "blockquote" => blockquote(element),
        "p" | "div" => block(&render_nodes(&element.children)),
        "br" => "  \n".to_string(),
        "hr" => block("---"),
        "span" => span(element),
        "table" => table(element),
        _ => render_nodes(&element.children),
    }
}

fn block(content: &str) -> String {
    format!("\n\n{}\n\n", content)
}

/// Collapses all whitespace, newlines included, into single spaces.
fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// Markers hug the text; surrounding whitespace stays outside them.
fn wrap_inline(marker: &str, content: &str) -> String {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return content.to_string();
    }
    let lead = &content[..content.len() - content.trim_start().len()];
    let trail = &content[content.trim_end().len()..];
    format!("{}{}{}{}{}", lead, marker, trimmed, marker, trail)
}

fn code_span(text: &str) -> String {
    if text.is_empty() {
        String::new()
    } else if text.contains('`') {
        format!("`` {} ``", text)
    } else {
        format!("`{}`", text)
    }
}

fn code_language(pre: &Element, code: Option<&Element>) -> String {
    let from_class = |element: &Element| {
        element.attr("class").and_then(|classes| {
            classes
                .split_ascii_whitespace()
                .find_map(|class| class.strip_prefix("language-"))
                .map(str::to_string)
        })
    };

    let language = code
        .and_then(|code| code.attr("data-language").map(str::to_string))
        .or_else(|| pre.attr("data-language").map(str::to_string))
        .or_else(|| code.and_then(from_class))
        .or_else(|| from_class(pre))
        .unwrap_or_default();
    sanitize_language(&language)
}

fn fenced_code(pre: &Element) -> String {
    let code = pre.elements().find(|child| child.tag == "code");
    let language = code_language(pre, code);
    let content = pre.text_content();
    let content = content.strip_suffix('\n').unwrap_or(&content);
    let fence = if content.contains("```") { "~~~" } else { "```" };
    block(&format!("{fence}{}\n{}\n{fence}", language, content))
}

fn link(element: &Element) -> String {
    let text = render_nodes(&element.children);
    let Some(href) = element.attr("href") else {
        return text;
    };
    let text = if text.trim().is_empty() {
        href.to_string()
    } else {
        text
    };
    match element.attr("title") {
        Some(title) => format!("[{}]({} \"{}\")", text, href, title.replace('"', "")),
        None => format!("[{}]({})", text, href),
    }
}

fn image(element: &Element) -> String {
    let Some(src) = element.attr("src") else {
        return String::new();
    };
    let alt = element.attr("alt").unwrap_or("");
    match element.attr("title") {
        Some(title) => format!("![{}]({} \"{}\")", alt, src, title.replace('"', "")),
        None => format!("![{}]({})", alt, src),
    }
}

fn list(element: &Element, ordered: bool) -> String {
    let mut number = if ordered {
        element
            .attr("start")
            .and_then(|start| start.trim().parse::<u64>().ok())
            .unwrap_or(1)
    } else {
        1
    };

    let mut entries = Vec::new();
    for item in element.elements().filter(|child| child.tag == "li") {
        let marker = if ordered {
            format!("{}. ", number)
        } else {
            "- ".to_string()
        };
        number += 1;

        let body = tidy(&render_nodes(&item.children));
        let indent = " ".repeat(marker.len());
        let mut lines = body.split('\n');
        let mut entry = format!("{}{}", marker, lines.next().unwrap_or(""));
        for line in lines {
            entry.push('\n');
            if !line.is_empty() {
                entry.push_str(&indent);
                entry.push_str(line);
            }
        }
        entries.push(entry);
    }

    if entries.is_empty() {
        return String::new();
    }
    block(&entries.join("\n"))
}

fn blockquote(element: &Element) -> String {
    let body = tidy(&render_nodes(&element.children));
    let lines: Vec<String> = body
        .split('\n')
        .filter(|line| !line.trim().is_empty())
        .map(|line| format!("> {}", line.trim_end()))
        .collect();
    if lines.is_empty() {
        return String::new();
    }
    block(&lines.join("\n"))
}

fn span(element: &Element) -> String {
    if let Some(value) = element.attr("data-mention") {
        return format!("@{}", value);
    }
    if let Some(value) = element.attr("data-tag") {
        return format!("#{}", value);
    }
    render_nodes(&element.children)
}

fn table(element: &Element) -> String {
    let mut rows: Vec<&Element> = Vec::new();
    for child in element.elements() {
        match child.tag.as_str() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => {
                rows.extend(child.elements().filter(|row| row.tag == "tr"))
            }
            _ => {}
        }
    }

    let mut lines = Vec::new();
    let mut separated = false;
    for row in rows {
        let cells: Vec<&Element> = row
            .elements()
            .filter(|cell| cell.tag == "th" || cell.tag == "td")
            .collect();
        if cells.is_empty() {
            continue;
        }
        let texts: Vec<String> = cells
            .iter()
            .map(|cell| single_line(&render_nodes(&cell.children)).replace('|', "\\|"))
            .collect();
        lines.push(format!("| {} |", texts.join(" | ")));

        if !separated && cells.iter().any(|cell| cell.tag == "th") {
            lines.push(format!("| {} |", vec!["---"; cells.len()].join(" | ")));
            separated = true;
        }
    }

    if lines.is_empty() {
        return String::new();
    }
    block(&lines.join("\n"))
}

/// Collapses runs of blank lines outside fenced code and trims the result.
fn tidy(markdown: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut fence: Option<&str> = None;

    for line in markdown.split('\n') {
        if let Some(marker) = fence {
            if line.trim() == marker {
                fence = None;
            }
            out.push(line);
            continue;
        }

        let trimmed = line.trim_start();
        if trimmed.starts_with("```") {
            fence = Some("```");
        } else if trimmed.starts_with("~~~") {
            fence = Some("~~~");
        }

        if line.trim().is_empty() {
            if out.last().map_or(true, |last| last.is_empty()) {
                continue;
            }
            out.push("");
        } else {
            out.push(line);
        }
    }

    out.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_markdown(html: &str) -> String {
        convert(&Sanitizer::default(), html)
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(to_markdown(""), "");
    }

    #[test]
    fn test_headings_and_inline_formatting() {
        assert_eq!(
            to_markdown(
                "<h2>Title</h2><p>Some <b>bold</b>, <i>it</i>, <del>gone</del> and <u>under</u>.</p>"
            ),
            "## Title\n\nSome **bold**, *it*, ~~gone~~ and <u>under</u>."
        );
    }

    #[test]
    fn test_markers_keep_whitespace_outside() {
        assert_eq!(to_markdown("<p>a<strong> b </strong>c</p>"), "a **b** c");
    }

    #[test]
    fn test_inline_and_fenced_code() {
        assert_eq!(
            to_markdown("<p>Use <code>x</code></p><pre><code class=\"language-js\">let a;\n</code></pre>"),
            "Use `x`\n\n```js\nlet a;\n```"
        );
        assert_eq!(to_markdown("<code>a`b</code>"), "`` a`b ``");
    }

    #[test]
    fn test_fence_switches_to_tildes() {
        assert_eq!(
            to_markdown("<pre><code>a ``` b</code></pre>"),
            "~~~\na ``` b\n~~~"
        );
    }

    #[test]
    fn test_blank_lines_inside_fences_survive() {
        assert_eq!(
            to_markdown("<pre><code data-language=\"py\">a\n\n\nb</code></pre>"),
            "```py\na\n\n\nb\n```"
        );
    }

    #[test]
    fn test_links_and_images() {
        assert_eq!(
            to_markdown(r#"<a href="https://x.com" title="T">x</a>"#),
            r#"[x](https://x.com "T")"#
        );
        assert_eq!(to_markdown(r#"<a href="javascript:alert(1)">x</a>"#), "x");
        assert_eq!(to_markdown(r#"<img src="/a.png" alt="A">"#), "![A](/a.png)");
        assert_eq!(to_markdown(r#"<img src="http://evil.com/a.png" alt="A">"#), "");
    }

    #[test]
    fn test_lists() {
        assert_eq!(
            to_markdown("<ul><li>one</li><li>two</li></ul>"),
            "- one\n- two"
        );
        assert_eq!(
            to_markdown(r#"<ol start="3"><li>c</li><li>d</li></ol>"#),
            "3. c\n4. d"
        );
        assert_eq!(
            to_markdown("<ul><li>a<ul><li>b</li></ul></li></ul>"),
            "- a\n\n  - b"
        );
    }

    #[test]
    fn test_blockquote_skips_empty_lines() {
        assert_eq!(
            to_markdown("<blockquote><p>one</p><p>two</p></blockquote>"),
            "> one\n> two"
        );
    }

    #[test]
    fn test_breaks_and_rules() {
        assert_eq!(
            to_markdown("<p>a<br>b</p><hr><p>c</p>"),
            "a  \nb\n\n---\n\nc"
        );
    }

    #[test]
    fn test_mention_and_tag_spans() {
        assert_eq!(
            to_markdown(
                r#"<p>hi <span class="mention" data-mention="alice" data-id="u1">@Alice</span> and <span class="tag" data-tag="rust">#Rust</span></p>"#
            ),
            "hi @alice and #rust"
        );
        assert_eq!(to_markdown("<span>plain</span>"), "plain");
    }

    #[test]
    fn test_table_separator_follows_header_row() {
        assert_eq!(
            to_markdown("<table><tr><th>H</th></tr><tr><td>D</td></tr></table>"),
            "| H |\n| --- |\n| D |"
        );
    }

    #[test]
    fn test_table_cells_escape_pipes() {
        assert_eq!(
            to_markdown("<table><tr><td>a|b</td><td>c</td></tr></table>"),
            "| a\\|b | c |"
        );
    }

    #[test]
    fn test_unknown_and_dangerous_tags() {
        assert_eq!(
            to_markdown("<section><foo>kept</foo><script>x()</script></section>"),
            "kept"
        );
    }

    #[test]
    fn test_tidy_collapses_blank_runs() {
        assert_eq!(tidy("\n\na\n\n\n\nb\n\n"), "a\n\nb");
    }
}
