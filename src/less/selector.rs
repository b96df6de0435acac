// src/less/selector.rs

/// Collapse whitespace and put single spaces around the `>`, `+` and `~`
/// combinators. Brackets, parentheses and strings are left alone.
pub fn normalize(selector: &str) -> String {
    let mut out = String::with_capacity(selector.len());
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut pending_space = false;

    for c in selector.trim().chars() {
        if let Some(q) = quote {
            out.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => {
                flush_space(&mut out, &mut pending_space);
                quote = Some(c);
                out.push(c);
            }
            '(' | '[' => {
                flush_space(&mut out, &mut pending_space);
                depth += 1;
                out.push(c);
            }
            ')' | ']' => {
                depth = depth.saturating_sub(1);
                out.push(c);
            }
            '>' | '+' | '~' if depth == 0 => {
                let trimmed = out.trim_end().len();
                out.truncate(trimmed);
                if !out.is_empty() {
                    out.push(' ');
                }
                out.push(c);
                out.push(' ');
                pending_space = false;
            }
            c if c.is_whitespace() => {
                if depth > 0 {
                    if !out.ends_with(' ') {
                        out.push(' ');
                    }
                } else if !out.is_empty() && !out.ends_with(' ') {
                    pending_space = true;
                }
            }
            _ => {
                flush_space(&mut out, &mut pending_space);
                out.push(c);
            }
        }
    }
    out.trim_end().to_string()
}

fn flush_space(out: &mut String, pending: &mut bool) {
    if *pending {
        out.push(' ');
        *pending = false;
    }
}

/// Join nested selectors onto their parents: `&` is replaced by each
/// parent, otherwise the child becomes a descendant.
pub fn join(parents: &[String], children: &[String]) -> Vec<String> {
    if parents.is_empty() {
        return children
            .iter()
            .map(|child| normalize(&child.replace('&', "")))
            .filter(|s| !s.is_empty())
            .collect();
    }

    let mut out = Vec::with_capacity(parents.len() * children.len());
    for parent in parents {
        for child in children {
            let joined = if child.contains('&') {
                child.replace('&', parent)
            } else {
                format!("{parent} {child}")
            };
            let joined = normalize(&joined);
            if !out.contains(&joined) {
                out.push(joined);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn normalizes_combinators() {
        assert_eq!(normalize(".a>.b"), ".a > .b");
        assert_eq!(normalize(".a   .b\n+ .c"), ".a .b + .c");
        assert_eq!(normalize("li:nth-child(2n+1)"), "li:nth-child(2n+1)");
        assert_eq!(normalize("a[title~=\"x y\"]"), "a[title~=\"x y\"]");
    }

    #[test]
    fn joins_descendants_and_parent_references() {
        let parents = strings(&[".a", ".b"]);
        assert_eq!(join(&parents, &strings(&[".c"])), strings(&[".a .c", ".b .c"]));
        assert_eq!(
            join(&strings(&[".btn"]), &strings(&["&:hover", "&-primary"])),
            strings(&[".btn:hover", ".btn-primary"])
        );
        assert_eq!(join(&strings(&[".a"]), &strings(&["> .b"])), strings(&[".a > .b"]));
    }

    #[test]
    fn root_level_ampersand_is_dropped() {
        assert_eq!(join(&[], &strings(&["&.x"])), strings(&[".x"]));
    }
}
