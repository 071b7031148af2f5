//! Small helpers for reading with roxmltree and editing the source text by byte range.
//!
//! roxmltree trees are read-only, so every mutation is expressed as a splice of the original
//! text: the range of an element is replaced as a whole, or new content is inserted right
//! before a closing tag.

use roxmltree::Node;
use std::ops::Range;

pub fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Finds the first element child with the given namespace and local name.
pub fn child<'a, 'input>(node: &Node<'a, 'input>, ns: &str, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| {
        n.is_element() && n.tag_name().name() == name && n.tag_name().namespace() == Some(ns)
    })
}

/// Replaces `range` of `xml` with `replacement`.
pub fn splice(xml: &str, range: Range<usize>, replacement: &str) -> String {
    let mut out = String::with_capacity(xml.len() - range.len() + replacement.len());
    out.push_str(&xml[..range.start]);
    out.push_str(replacement);
    out.push_str(&xml[range.end..]);
    out
}

/// Qualified tag name (`p:sldIdLst`) of the element starting at `range.start`.
pub fn qualified_name(xml: &str, range: &Range<usize>) -> String {
    xml[range.start + 1..range.end]
        .chars()
        .take_while(|c| !c.is_whitespace() && *c != '/' && *c != '>')
        .collect()
}

/// Appends `content` as the last child of the element spanning `range`.
///
/// Self-closing elements are expanded into an open/close pair.
pub fn append_child(xml: &str, range: Range<usize>, content: &str) -> String {
    let element = &xml[range.clone()];
    if element.ends_with("/>") {
        let name = qualified_name(xml, &range);
        let open = element[..element.len() - 2].trim_end();
        let replacement = format!("{}>{}</{}>", open, content, name);
        return splice(xml, range, &replacement);
    }

    let close = xml[..range.end].rfind("</").unwrap_or(range.end);
    splice(xml, close..close, content)
}

/// Returns the prefix bound to `ns` at `node`, or `fallback` when it is the default namespace or unbound.
pub fn prefix_for<'input>(node: &Node<'_, 'input>, ns: &str, fallback: &'input str) -> &'input str {
    match node.lookup_prefix(ns) {
        Some(prefix) if !prefix.is_empty() => prefix,
        _ => fallback,
    }
}

/// Parses an OOXML boolean attribute (`1`, `true`, `on`).
pub fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("on")
}
