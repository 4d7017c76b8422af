//! Preload script injection for the project's root layout.
//!
//! Adds `<Script … id={PRELOAD_SCRIPT_ID} />` as the last child of `<body>`
//! and the matching `next/script` import. Both steps detect prior injection,
//! so running the pass again changes nothing.

use tree_sitter::{Node, Tree};

use super::Insertion;
use super::syntax;

/// Id attribute marking the injected script element.
pub const PRELOAD_SCRIPT_ID: &str = "tessera-preload-script";

const SCRIPT_MODULE: &str = "next/script";
const DEFAULT_SCRIPT_NAME: &str = "Script";

/// Whether a tag with `id="tessera-preload-script"` exists anywhere.
pub fn has_preload_script(tree: &Tree, source: &str) -> bool {
    let mut found = false;
    syntax::for_each_node(tree.root_node(), |node| {
        if found || !syntax::is_named_tag(node) {
            return;
        }
        found = syntax::find_attribute(node, "id", source)
            .and_then(|attr| syntax::attribute_string_value(attr, source))
            == Some(PRELOAD_SCRIPT_ID);
    });
    found
}

/// The `<body>` element, if the file renders one.
fn find_body<'t>(tree: &'t Tree, source: &str) -> Option<Node<'t>> {
    let mut body = None;
    syntax::for_each_node(tree.root_node(), |node| {
        if body.is_some() || node.kind() != "jsx_element" {
            return;
        }
        let is_body = node
            .child_by_field_name("open_tag")
            .and_then(|open| syntax::tag_name(open, source))
            == Some("body");
        if is_body {
            body = Some(node);
        }
    });
    body
}

/// Local binding of the default import from `next/script`, if any.
fn script_import_binding(tree: &Tree, source: &str) -> Option<Option<String>> {
    let root = tree.root_node();
    let mut cursor = root.walk();
    for stmt in root.named_children(&mut cursor) {
        if stmt.kind() != "import_statement" {
            continue;
        }
        let from = stmt
            .child_by_field_name("source")
            .map(|s| syntax::text(s, source).trim_matches(|c| c == '"' || c == '\''));
        if from != Some(SCRIPT_MODULE) {
            continue;
        }
        let mut stmt_cursor = stmt.walk();
        let default = stmt
            .named_children(&mut stmt_cursor)
            .find(|c| c.kind() == "import_clause")
            .and_then(|clause| clause.named_child(0))
            .filter(|n| n.kind() == "identifier")
            .map(|n| syntax::text(n, source).to_string());
        return Some(default);
    }
    None
}

/// Byte offset where a new top-level import belongs, and whether it needs a
/// leading newline (true) or a trailing one (false).
fn import_insert_point(tree: &Tree) -> (usize, bool) {
    let root = tree.root_node();
    let mut cursor = root.walk();

    let mut last_import = None;
    let mut last_directive = None;
    let mut hash_bang = None;
    let mut in_prologue = true;

    for stmt in root.named_children(&mut cursor) {
        match stmt.kind() {
            "import_statement" => {
                last_import = Some(stmt.end_byte());
                in_prologue = false;
            }
            "hash_bang_line" => hash_bang = Some(stmt.end_byte()),
            "comment" => {}
            "expression_statement" if in_prologue => {
                let is_directive = stmt
                    .named_child(0)
                    .is_some_and(|expr| expr.kind() == "string");
                if is_directive {
                    last_directive = Some(stmt.end_byte());
                } else {
                    in_prologue = false;
                }
            }
            _ => in_prologue = false,
        }
    }

    // A `#!` line must stay first.
    match last_import.or(last_directive).or(hash_bang) {
        Some(end) => (end, true),
        None => (0, false),
    }
}

/// Plan the preload injection. Empty when already present or when the file
/// has no `<body>`.
pub fn plan(tree: &Tree, source: &str, script_src: &str) -> Vec<Insertion> {
    if has_preload_script(tree, source) {
        return Vec::new();
    }
    let Some(body) = find_body(tree, source) else {
        tracing::debug!("no <body> element; preload script not injected");
        return Vec::new();
    };
    let Some(close) = body.child_by_field_name("close_tag") else {
        return Vec::new();
    };

    let mut insertions = Vec::new();

    let element_name = match script_import_binding(tree, source) {
        Some(Some(name)) => name,
        Some(None) | None => {
            let (at, leading_newline) = import_insert_point(tree);
            let import = format!(
                "import {} from \"{}\";",
                DEFAULT_SCRIPT_NAME, SCRIPT_MODULE
            );
            let text = if leading_newline {
                format!("\n{}", import)
            } else {
                format!("{}\n", import)
            };
            insertions.push(Insertion::new(at, text));
            DEFAULT_SCRIPT_NAME.to_string()
        }
    };

    insertions.push(Insertion::new(
        close.start_byte(),
        format!(
            "<{} src=\"{}\" strategy=\"afterInteractive\" type=\"module\" id=\"{}\" />",
            element_name, script_src, PRELOAD_SCRIPT_ID
        ),
    ));

    insertions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{apply_insertions, syntax::parse};

    const SRC: &str = "https://cdn.example.com/preload.js";

    fn inject(source: &str) -> String {
        let tree = parse("app/layout.tsx", source).unwrap();
        apply_insertions(source, plan(&tree, source, SRC))
    }

    #[test]
    fn test_injects_script_and_import() {
        let layout = r#"import "./globals.css";

export default function RootLayout({ children }: { children: React.ReactNode }) {
  return (
    <html lang="en">
      <body>{children}</body>
    </html>
  );
}
"#;
        let out = inject(layout);
        assert!(out.starts_with("import \"./globals.css\";\nimport Script from \"next/script\";\n"));
        assert!(out.contains(&format!(
            "{{children}}<Script src=\"{}\" strategy=\"afterInteractive\" type=\"module\" id=\"{}\" /></body>",
            SRC, PRELOAD_SCRIPT_ID
        )));
        assert!(parse("app/layout.tsx", &out).is_ok());
    }

    #[test]
    fn test_second_pass_is_noop() {
        let layout = "export default function L({ children }) { return <html><body>{children}</body></html>; }\n";
        let once = inject(layout);
        let twice = inject(&once);
        assert_eq!(once, twice);
        assert_eq!(twice.matches(PRELOAD_SCRIPT_ID).count(), 1);
        assert_eq!(twice.matches("from \"next/script\"").count(), 1);
    }

    #[test]
    fn test_import_after_directive() {
        let layout = "\"use client\";\nexport default function L() { return <body></body>; }\n";
        let out = inject(layout);
        assert!(out.starts_with("\"use client\";\nimport Script from \"next/script\";\n"));
    }

    #[test]
    fn test_import_after_hash_bang() {
        let layout = "#!/usr/bin/env node\nexport default function L() { return <body><main /></body>; }\n";
        let out = inject(layout);
        assert!(out.starts_with("#!/usr/bin/env node\nimport Script from \"next/script\";\n"));
        assert!(parse("app/layout.tsx", &out).is_ok());
    }

    #[test]
    fn test_reuses_existing_import_binding() {
        let layout = "import NextScript from 'next/script';\nexport default () => <body><main /></body>;\n";
        let out = inject(layout);
        assert_eq!(out.matches("next/script").count(), 1);
        assert!(out.contains("<main /><NextScript src="));
    }

    #[test]
    fn test_no_body_no_injection() {
        let page = "export default function Page() { return <div />; }\n";
        assert_eq!(inject(page), page);
    }
}
