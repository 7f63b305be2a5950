use html5ever::Attribute;
use markup5ever_rcdom::{Handle, NodeData};

use crate::allowlist::{is_event_handler, Allowlist};
use crate::dom::{self, Element, Fragment, Node};
use crate::urls;

const LINK_REL: &str = "noopener noreferrer";

// Upper bound on clean-and-reparse passes.
const MAX_PASSES: usize = 8;

const FORBIDDEN_STYLE_VALUES: &[&str] = &["url(", "expression(", "javascript:", "\\"];

/// Allowlist-based HTML sanitizer.
///
/// Every call parses its own tree and shares nothing but the read-only
/// [`Allowlist`], so one instance can serve any number of threads.
#[derive(Debug, Clone, Default)]
pub struct Sanitizer {
    allowlist: Allowlist,
}

impl Sanitizer {
    pub fn new(allowlist: Allowlist) -> Self {
        Self { allowlist }
    }

    pub fn allowlist(&self) -> &Allowlist {
        &self.allowlist
    }

    pub fn sanitize(&self, html: &str) -> String {
        if html.is_empty() {
            return String::new();
        }
        self.sanitize_to_fragment(html).to_html()
    }

    /// Cleans `html` until reparsing the result changes nothing.
    ///
    /// Unwrapping an element that bounds a parser scope (`<button>`,
    /// `<caption>`) can leave nesting such as `<p><p>` that the parser
    /// rebuilds differently on the next read.
    pub fn sanitize_to_fragment(&self, html: &str) -> Fragment {
        if html.is_empty() {
            return Fragment::default();
        }

        let mut fragment = self.clean(html);
        let mut serialized = fragment.to_html();
        for pass in 1..MAX_PASSES {
            let next = self.clean(&serialized);
            let next_serialized = next.to_html();
            if next_serialized == serialized {
                return fragment;
            }
            log::debug!("Sanitizer pass {} changed the output, repeating", pass + 1);
            fragment = next;
            serialized = next_serialized;
        }
        fragment
    }

    fn clean(&self, html: &str) -> Fragment {
        let dom = dom::parse(html);
        let mut nodes = Vec::new();
        self.clean_children(&dom.document, &mut nodes);
        Fragment::new(nodes)
    }

    /// Plain text of `html`, without markup and without the content of
    /// drop-listed elements such as `<script>`.
    pub fn strip_tags(&self, html: &str) -> String {
        self.sanitize_to_fragment(html).text_content()
    }

    pub fn is_url_safe(&self, url: &str) -> bool {
        urls::is_url_safe(url, &self.allowlist)
    }

    pub fn sanitize_url(&self, url: &str) -> Option<String> {
        urls::sanitize_url(url, &self.allowlist)
    }

    pub fn sanitize_image_src(&self, src: &str) -> Option<String> {
        urls::sanitize_image_src(src, &self.allowlist)
    }

    fn clean_children(&self, handle: &Handle, out: &mut Vec<Node>) {
        for child in handle.children.borrow().iter() {
            self.clean_node(child, out);
        }
    }

    fn clean_node(&self, handle: &Handle, out: &mut Vec<Node>) {
        match &handle.data {
            NodeData::Text { contents } => push_text(out, &contents.borrow()),
            NodeData::Document => self.clean_children(handle, out),
            NodeData::Element { name, attrs, .. } => {
                let tag = name.local.as_ref().to_ascii_lowercase();

                if self.allowlist.is_dropped(&tag) {
                    log::debug!("Dropped <{}> subtree", tag);
                    return;
                }

                if !self.allowlist.is_tag_allowed(&tag) {
                    // Unknown wrapper: keep what is inside it.
                    self.clean_children(handle, out);
                    return;
                }

                let mut element = Element::new(tag);
                element.attrs = self.clean_attributes(&element.tag, &attrs.borrow());
                self.clean_children(handle, &mut element.children);
                out.push(Node::Element(element));
            }
            NodeData::Doctype { .. }
            | NodeData::Comment { .. }
            | NodeData::ProcessingInstruction { .. } => {}
        }
    }

    fn clean_attributes(&self, tag: &str, attrs: &[Attribute]) -> Vec<(String, String)> {
        let mut out = Vec::with_capacity(attrs.len());

        for attr in attrs {
            let name = attr.name.local.as_ref().to_ascii_lowercase();
            let value: &str = &attr.value;

            if is_event_handler(&name) {
                log::debug!("Dropped event handler attribute {} on <{}>", name, tag);
                continue;
            }
            if !self.allowlist.is_attribute_allowed(tag, &name) {
                continue;
            }

            match name.as_str() {
                "href" => {
                    if let Some(url) = self.sanitize_url(value) {
                        out.push((name, url));
                        out.push(("rel".to_string(), LINK_REL.to_string()));
                    }
                }
                "src" => {
                    if let Some(src) = self.sanitize_image_src(value) {
                        out.push((name, src));
                    }
                }
                "class" => {
                    if let Some(classes) = self.clean_class(value) {
                        out.push((name, classes));
                    }
                }
                "style" => {
                    if let Some(style) = self.clean_style(value) {
                        out.push((name, style));
                    }
                }
                "target" => {
                    if value == "_blank" {
                        out.push((name, value.to_string()));
                    }
                }
                _ => out.push((name, value.to_string())),
            }
        }

        out
    }

    fn clean_class(&self, value: &str) -> Option<String> {
        let kept: Vec<&str> = value
            .split_ascii_whitespace()
            .filter(|class| self.allowlist.is_class_allowed(class))
            .collect();
        (!kept.is_empty()).then(|| kept.join(" "))
    }

    fn clean_style(&self, value: &str) -> Option<String> {
        let kept: Vec<String> = value
            .split(';')
            .filter_map(|declaration| {
                let (property, value) = declaration.split_once(':')?;
                let property = property.trim().to_ascii_lowercase();
                let value = value.trim();
                if value.is_empty() || !self.allowlist.is_style_property_allowed(&property) {
                    return None;
                }
                let lowered = value.to_ascii_lowercase();
                if FORBIDDEN_STYLE_VALUES.iter().any(|bad| lowered.contains(bad)) {
                    return None;
                }
                Some(format!("{}: {}", property, value))
            })
            .collect();
        (!kept.is_empty()).then(|| kept.join("; "))
    }
}

// Unwrapping can leave two text nodes side by side; merge them so the tree
// matches what a re-parse of the output would produce.
fn push_text(out: &mut Vec<Node>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Node::Text(last)) = out.last_mut() {
        last.push_str(text);
    } else {
        out.push(Node::Text(text.to_string()));
    }
}
