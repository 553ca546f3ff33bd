//! Selector Algebra
//!
//! Merges two selectors whose key compounds target the same element into
//! selectors that match only elements satisfying both. Inputs are never
//! mutated; every result is a fresh value.

use blocks_syntax::{Combinator, CompoundSelector, ParsedSelector};

use crate::error::{CssBlocksError, Result};

/// `(context, combinator, key)`; context is `None` for a single compound
pub fn split_selector(selector: &ParsedSelector) -> (Option<ParsedSelector>, Option<Combinator>, CompoundSelector) {
    selector.split()
}

/// `a` followed by the nodes of `b` it does not already contain. A
/// pseudo-element stays last.
pub fn merge_nodes(a: &CompoundSelector, b: &CompoundSelector) -> CompoundSelector {
    let mut merged = a.clone();
    for node in &b.nodes {
        if !merged.nodes.contains(node) {
            merged.nodes.push(node.clone());
        }
    }
    let (pseudo_elements, mut nodes): (Vec<_>, Vec<_>) = merged
        .nodes
        .into_iter()
        .partition(|node| node.is_pseudo_element());
    nodes.extend(pseudo_elements);
    CompoundSelector::new(nodes)
}

/// Merge two contexts that sit at the same position relative to the key.
/// At most one of them may have its own context.
fn merge_contexts(a: &ParsedSelector, b: &ParsedSelector) -> ParsedSelector {
    let context = if a.context.is_empty() { b.context.clone() } else { a.context.clone() };
    ParsedSelector { context, key: merge_nodes(&a.key, &b.key) }
}

/// Selectors matching elements that match both `s1` and `s2`.
///
/// Two non-contiguous combinators produce three alternatives, which may
/// over-approximate the exact intersection.
pub fn merge_key_selectors(s1: &ParsedSelector, s2: &ParsedSelector) -> Result<Vec<ParsedSelector>> {
    if s1.combinator_count() > 1 && s2.combinator_count() > 1 {
        return Err(CssBlocksError::syntax(format!(
            "Cannot merge selectors with more than one combinator: `{}` and `{}`",
            s1, s2
        )));
    }

    let (context1, combinator1, key1) = s1.split();
    let (context2, combinator2, key2) = s2.split();
    if let (Some(p1), Some(p2)) = (key1.pseudo_element(), key2.pseudo_element()) {
        if p1 != p2 {
            return Ok(Vec::new());
        }
    }
    let key = merge_nodes(&key1, &key2);

    let (c1, comb1, c2, comb2) = match (context1, combinator1, context2, combinator2) {
        (Some(c1), Some(comb1), Some(c2), Some(comb2)) => (c1, comb1, c2, comb2),
        (Some(c1), Some(comb1), _, _) => return Ok(vec![c1.appended(comb1, key)]),
        (_, _, Some(c2), Some(comb2)) => return Ok(vec![c2.appended(comb2, key)]),
        _ => return Ok(vec![ParsedSelector::new(key)]),
    };

    let merged = if comb1 == comb2 {
        let flat = merge_contexts(&c1, &c2).appended(comb1, key.clone());
        if comb1.is_contiguous() {
            vec![flat]
        } else {
            vec![
                flat,
                c1.concat(comb1, &c2).appended(comb2, key.clone()),
                c2.concat(comb2, &c1).appended(comb1, key),
            ]
        }
    } else if comb1.is_sibling() && comb2.is_hierarchical() {
        vec![c2.concat(comb2, &c1).appended(comb1, key)]
    } else if comb1.is_hierarchical() && comb2.is_sibling() {
        vec![c1.concat(comb1, &c2).appended(comb2, key)]
    } else {
        // Same axis, one contiguous and one not
        let (contiguous, combinator, loose, loose_combinator) = if comb1.is_contiguous() {
            (c1, comb1, c2, comb2)
        } else {
            (c2, comb2, c1, comb1)
        };
        vec![
            merge_contexts(&contiguous, &loose).appended(combinator, key.clone()),
            loose.concat(loose_combinator, &contiguous).appended(combinator, key),
        ]
    };
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocks_syntax::parse_selector;

    fn merge(a: &str, b: &str) -> Vec<String> {
        merge_key_selectors(&parse_selector(a).unwrap(), &parse_selector(b).unwrap())
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn test_merge_nodes() {
        let a = parse_selector(".a::before").unwrap();
        let b = parse_selector(".b:hover::before").unwrap();
        let merged = merge_nodes(a.key(), b.key());
        assert_eq!(merged.to_string(), ".a.b:hover::before");
        assert_eq!(a.key().to_string(), ".a::before");
    }

    #[test]
    fn test_no_context() {
        assert_eq!(merge(".a", ".b"), vec![".a.b"]);
    }

    #[test]
    fn test_one_context() {
        assert_eq!(merge(".x > .a", ".b"), vec![".x > .a.b"]);
        assert_eq!(merge(".a", ".x ~ .b"), vec![".x ~ .a.b"]);
    }

    #[test]
    fn test_same_contiguous() {
        assert_eq!(merge(".a > .b", ".c > .b"), vec![".a.c > .b"]);
        assert_eq!(merge(".a + .b", ".c + .d"), vec![".a.c + .b.d"]);
    }

    #[test]
    fn test_same_non_contiguous() {
        assert_eq!(merge(".a .b", ".c .b"), vec![".a.c .b", ".a .c .b", ".c .a .b"]);
    }

    #[test]
    fn test_sibling_then_hierarchical() {
        assert_eq!(merge(".a + .b", ".c > .b"), vec![".c > .a + .b"]);
        assert_eq!(merge(".a > .b", ".c ~ .b"), vec![".a > .c ~ .b"]);
    }

    #[test]
    fn test_mixed_same_axis() {
        assert_eq!(merge(".a .b", ".c > .b"), vec![".c.a > .b", ".a .c > .b"]);
    }

    #[test]
    fn test_long_context_on_one_side() {
        assert_eq!(merge(".x .a > .b", ".c > .b"), vec![".x .a.c > .b"]);
    }

    #[test]
    fn test_rejects_two_long_selectors() {
        let a = parse_selector(".x .a > .b").unwrap();
        let b = parse_selector(".y .c > .b").unwrap();
        assert!(merge_key_selectors(&a, &b).is_err());
    }

    #[test]
    fn test_different_pseudo_elements_do_not_merge() {
        assert!(merge(".a::before", ".b::after").is_empty());
    }
}
