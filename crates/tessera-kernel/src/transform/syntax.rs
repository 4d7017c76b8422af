//! Tree-sitter plumbing for JS/TS sources with JSX.

use tree_sitter::{Language, Node, Parser, Tree};

use super::error::TransformError;
use crate::path;

/// Grammar for a source path, chosen by extension.
pub fn language_for(file_path: &str) -> Option<Language> {
    match path::extension(file_path).as_deref() {
        Some("tsx") => Some(tree_sitter_typescript::LANGUAGE_TSX.into()),
        Some("ts") => Some(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
        Some("js") | Some("jsx") => Some(tree_sitter_javascript::LANGUAGE.into()),
        _ => None,
    }
}

/// Parse `source`, rejecting trees that contain error or missing nodes.
pub fn parse(file_path: &str, source: &str) -> Result<Tree, TransformError> {
    let language =
        language_for(file_path).ok_or_else(|| TransformError::Unsupported(file_path.to_string()))?;

    let mut parser = Parser::new();
    parser
        .set_language(&language)
        .map_err(|e| TransformError::Language(e.to_string()))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| TransformError::parse(file_path, "parser produced no tree"))?;

    if tree.root_node().has_error() {
        return Err(TransformError::parse(file_path, "source contains syntax errors"));
    }
    Ok(tree)
}

/// Pre-order walk over every node under `root`.
pub fn for_each_node<'t>(root: Node<'t>, mut visit: impl FnMut(Node<'t>)) {
    let mut cursor = root.walk();
    loop {
        visit(cursor.node());
        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return;
            }
        }
    }
}

/// Source text spanned by `node`.
pub fn text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    &source[node.byte_range()]
}

/// Opening and self-closing JSX tags. Fragments have no name and are skipped.
pub fn is_named_tag(node: Node<'_>) -> bool {
    matches!(
        node.kind(),
        "jsx_opening_element" | "jsx_self_closing_element"
    ) && node.child_by_field_name("name").is_some()
}

/// Name of an opening or self-closing tag, e.g. `div` or `motion.div`.
pub fn tag_name<'s>(tag: Node<'_>, source: &'s str) -> Option<&'s str> {
    tag.child_by_field_name("name").map(|n| text(n, source))
}

/// Byte offset right after the tag name (and any type arguments).
pub fn attribute_insert_point(tag: Node<'_>) -> Option<usize> {
    let name = tag.child_by_field_name("name")?;
    let end = tag
        .child_by_field_name("type_arguments")
        .map(|t| t.end_byte())
        .unwrap_or(0);
    Some(name.end_byte().max(end))
}

/// `jsx_attribute` children of a tag.
pub fn attributes<'t>(tag: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = tag.walk();
    tag.named_children(&mut cursor)
        .filter(|c| c.kind() == "jsx_attribute")
        .collect()
}

/// Name of a `jsx_attribute`, e.g. `className`.
pub fn attribute_name<'s>(attr: Node<'_>, source: &'s str) -> Option<&'s str> {
    attr.named_child(0).map(|n| text(n, source))
}

/// Literal value of `name="value"`; `None` for expressions and bare flags.
pub fn attribute_string_value<'s>(attr: Node<'_>, source: &'s str) -> Option<&'s str> {
    let value = attr.named_child(1)?;
    if value.kind() != "string" {
        return None;
    }
    let raw = text(value, source);
    if raw.len() >= 2 {
        Some(&raw[1..raw.len() - 1])
    } else {
        None
    }
}

/// Find an attribute by name on a tag.
pub fn find_attribute<'t>(tag: Node<'t>, name: &str, source: &str) -> Option<Node<'t>> {
    attributes(tag)
        .into_iter()
        .find(|attr| attribute_name(*attr, source) == Some(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_selection() {
        assert!(language_for("app/page.tsx").is_some());
        assert!(language_for("lib/a.ts").is_some());
        assert!(language_for("a.jsx").is_some());
        assert!(language_for("a.css").is_none());
    }

    #[test]
    fn test_parse_rejects_broken_source() {
        assert!(parse("a.tsx", "export default function A() { return <div>; }").is_err());
        assert!(parse("a.tsx", "export const A = () => <div className=\"x\" />;").is_ok());
        assert!(matches!(
            parse("a.md", "# hi"),
            Err(TransformError::Unsupported(_))
        ));
    }

    #[test]
    fn test_tags_and_attributes() {
        let src = r#"const a = <><motion.div id="x" hidden data-k={1}><span /></motion.div></>;"#;
        let tree = parse("a.jsx", src).unwrap();

        let mut names = Vec::new();
        for_each_node(tree.root_node(), |node| {
            if is_named_tag(node) {
                names.push(tag_name(node, src).unwrap().to_string());
            }
        });
        assert_eq!(names, vec!["motion.div", "span"]);

        let mut id_value = None;
        for_each_node(tree.root_node(), |node| {
            if is_named_tag(node) {
                if let Some(attr) = find_attribute(node, "id", src) {
                    id_value = attribute_string_value(attr, src).map(str::to_string);
                }
            }
        });
        assert_eq!(id_value.as_deref(), Some("x"));

        let mut attr_names = Vec::new();
        for_each_node(tree.root_node(), |node| {
            if is_named_tag(node) {
                for attr in attributes(node) {
                    attr_names.extend(attribute_name(attr, src).map(str::to_string));
                }
            }
        });
        assert_eq!(attr_names, vec!["id", "hidden", "data-k"]);
    }
}
