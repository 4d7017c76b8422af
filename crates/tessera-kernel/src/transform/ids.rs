//! Stable per-element identifiers.
//!
//! Every named JSX tag gets an `id_attribute="…"` unless it already carries
//! one. Existing values are never rewritten, and fresh values are checked
//! against everything already in the file.

use std::collections::HashSet;

use tree_sitter::Tree;

use super::Insertion;
use super::syntax;

const ID_LEN: usize = 7;

/// Hands out identifiers that do not collide with a known set.
#[derive(Debug, Default)]
pub struct IdAllocator {
    used: HashSet<String>,
}

impl IdAllocator {
    pub fn new(used: HashSet<String>) -> Self {
        Self { used }
    }

    /// Short random id, unique among ids seen so far.
    pub fn allocate(&mut self) -> String {
        loop {
            let candidate: String = uuid::Uuid::new_v4()
                .simple()
                .to_string()
                .chars()
                .take(ID_LEN)
                .collect();
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

/// Literal id values already present on tags in the file.
pub fn existing_ids(tree: &Tree, source: &str, id_attribute: &str) -> HashSet<String> {
    let mut ids = HashSet::new();
    syntax::for_each_node(tree.root_node(), |node| {
        if !syntax::is_named_tag(node) {
            return;
        }
        if let Some(value) = syntax::find_attribute(node, id_attribute, source)
            .and_then(|attr| syntax::attribute_string_value(attr, source))
        {
            ids.insert(value.to_string());
        }
    });
    ids
}

/// Plan an id insertion for every named tag lacking the attribute.
pub fn plan(tree: &Tree, source: &str, id_attribute: &str) -> Vec<Insertion> {
    let mut allocator = IdAllocator::new(existing_ids(tree, source, id_attribute));
    let mut insertions = Vec::new();

    syntax::for_each_node(tree.root_node(), |node| {
        if !syntax::is_named_tag(node) {
            return;
        }
        if syntax::find_attribute(node, id_attribute, source).is_some() {
            return;
        }
        if let Some(at) = syntax::attribute_insert_point(node) {
            let id = allocator.allocate();
            insertions.push(Insertion::new(at, format!(" {}=\"{}\"", id_attribute, id)));
        }
    });

    insertions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{apply_insertions, syntax::parse};

    #[test]
    fn test_allocator_avoids_used() {
        let mut used = HashSet::new();
        used.insert("abc1234".to_string());
        let mut allocator = IdAllocator::new(used);
        let mut seen = HashSet::new();
        for _ in 0..200 {
            let id = allocator.allocate();
            assert_eq!(id.len(), ID_LEN);
            assert_ne!(id, "abc1234");
            assert!(seen.insert(id));
        }
    }

    #[test]
    fn test_plan_skips_tagged_and_fragments() {
        let src = r#"const A = () => <><div data-oid="keep"><span /></div></>;"#;
        let tree = parse("a.jsx", src).unwrap();
        let insertions = plan(&tree, src, "data-oid");
        assert_eq!(insertions.len(), 1);

        let out = apply_insertions(src, insertions);
        assert!(out.contains(r#"<div data-oid="keep">"#));
        assert!(out.contains("<span data-oid=\""));
        assert!(out.starts_with("const A = () => <><div"));
    }

    #[test]
    fn test_existing_ids_collected() {
        let src = r#"const A = <div data-oid="a1"><p data-oid="b2" /><i data-oid={x} /></div>;"#;
        let tree = parse("a.jsx", src).unwrap();
        let ids = existing_ids(&tree, src, "data-oid");
        assert_eq!(ids.len(), 2);
        assert!(ids.contains("a1") && ids.contains("b2"));
    }
}
