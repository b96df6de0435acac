// src/less/printer.rs

use super::css::{CssNode, Entry, Wrapper};

/// Render evaluated entries as expanded CSS.
///
/// `@charset` and CSS `@import` statements are hoisted to the top; runs of
/// entries sharing the same wrappers are printed inside one group rule.
pub fn print(entries: &[Entry]) -> String {
    let mut out = String::new();

    if let Some(charset) = entries.iter().find_map(|e| match &e.node {
        CssNode::AtRule {
            name,
            prelude,
            has_body: false,
            ..
        } if name == "charset" => Some(prelude),
        _ => None,
    }) {
        out.push_str(&format!("@charset {charset};\n"));
    }

    for entry in entries {
        if let CssNode::Import(text) = &entry.node {
            out.push_str(text);
            out.push('\n');
        }
    }

    let body: Vec<&Entry> = entries
        .iter()
        .filter(|e| !is_hoisted(&e.node))
        .collect();
    print_entries(&body, 0, &mut out);
    out
}

fn is_hoisted(node: &CssNode) -> bool {
    match node {
        CssNode::Import(_) => true,
        CssNode::AtRule { name, has_body, .. } => name == "charset" && !has_body,
        _ => false,
    }
}

fn print_entries(entries: &[&Entry], indent: usize, out: &mut String) {
    let mut i = 0;
    while i < entries.len() {
        let wrappers = &entries[i].wrappers;
        let mut j = i + 1;
        while j < entries.len() && entries[j].wrappers == *wrappers {
            j += 1;
        }
        print_group(wrappers, &entries[i..j], indent, out);
        i = j;
    }
}

fn print_group(wrappers: &[Wrapper], entries: &[&Entry], indent: usize, out: &mut String) {
    let mut inner = String::new();
    let depth = merged(wrappers).len();
    for entry in entries {
        print_node(&entry.node, indent + depth * 2, &mut inner);
    }
    if inner.is_empty() {
        return;
    }

    let groups = merged(wrappers);
    for (level, (name, prelude)) in groups.iter().enumerate() {
        let pad = " ".repeat(indent + level * 2);
        if prelude.is_empty() {
            out.push_str(&format!("{pad}@{name} {{\n"));
        } else {
            out.push_str(&format!("{pad}@{name} {prelude} {{\n"));
        }
    }
    out.push_str(&inner);
    for level in (0..groups.len()).rev() {
        out.push_str(&" ".repeat(indent + level * 2));
        out.push_str("}\n");
    }
}

/// Nested `@media` wrappers combine into one query joined by `and`.
fn merged(wrappers: &[Wrapper]) -> Vec<(String, String)> {
    let mut groups: Vec<(String, String)> = Vec::new();
    for w in wrappers {
        if let Some((name, prelude)) = groups.last_mut() {
            if name == "media" && w.name == "media" {
                *prelude = format!("{prelude} and {}", w.prelude);
                continue;
            }
        }
        groups.push((w.name.clone(), w.prelude.clone()));
    }
    groups
}

fn print_node(node: &CssNode, indent: usize, out: &mut String) {
    let pad = " ".repeat(indent);
    match node {
        CssNode::Rule {
            selectors,
            declarations,
        } => {
            if declarations.is_empty() || selectors.is_empty() {
                return;
            }
            out.push_str(&pad);
            out.push_str(&selectors.join(&format!(",\n{pad}")));
            out.push_str(" {\n");
            for decl in declarations {
                out.push_str(&format!("{pad}  {}: {};\n", decl.name, decl.value));
            }
            out.push_str(&pad);
            out.push_str("}\n");
        }
        CssNode::AtRule {
            name,
            prelude,
            declarations,
            children,
            has_body,
        } => {
            let head = if prelude.is_empty() {
                format!("{pad}@{name}")
            } else {
                format!("{pad}@{name} {prelude}")
            };
            if !has_body {
                out.push_str(&format!("{head};\n"));
                return;
            }
            out.push_str(&format!("{head} {{\n"));
            for decl in declarations {
                out.push_str(&format!("{pad}  {}: {};\n", decl.name, decl.value));
            }
            let children: Vec<&Entry> = children.iter().collect();
            print_entries(&children, indent + 2, out);
            out.push_str(&pad);
            out.push_str("}\n");
        }
        CssNode::Comment(text) => {
            out.push_str(&pad);
            out.push_str(text);
            out.push('\n');
        }
        CssNode::Raw(text) => {
            out.push_str(text.trim_end());
            out.push('\n');
        }
        CssNode::Import(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::less::css::Declaration;

    fn rule(selector: &str, wrappers: Vec<Wrapper>) -> Entry {
        Entry::new(
            wrappers,
            CssNode::Rule {
                selectors: vec![selector.to_string()],
                declarations: vec![Declaration {
                    name: "color".to_string(),
                    value: "red".to_string(),
                }],
            },
        )
    }

    fn media(prelude: &str) -> Wrapper {
        Wrapper {
            name: "media".to_string(),
            prelude: prelude.to_string(),
        }
    }

    #[test]
    fn nested_media_queries_are_joined() {
        let css = print(&[rule(".a", vec![media("screen"), media("(min-width: 768px)")])]);
        assert_eq!(
            css,
            "@media screen and (min-width: 768px) {\n  .a {\n    color: red;\n  }\n}\n"
        );
    }

    #[test]
    fn imports_are_hoisted_and_empty_rules_skipped() {
        let entries = vec![
            Entry::new(
                vec![],
                CssNode::Rule {
                    selectors: vec![".empty".to_string()],
                    declarations: vec![],
                },
            ),
            rule(".a", vec![]),
            Entry::new(vec![], CssNode::Import("@import url(\"x.css\");".to_string())),
        ];
        assert_eq!(print(&entries), "@import url(\"x.css\");\n.a {\n  color: red;\n}\n");
    }

    #[test]
    fn consecutive_entries_share_one_wrapper() {
        let css = print(&[rule(".a", vec![media("print")]), rule(".b", vec![media("print")])]);
        assert_eq!(css.matches("@media print").count(), 1);
    }
}
