//! Comprehensive tests for blocks-syntax
//!
//! Tests parsing edge cases, printing and selector handling.

use blocks_syntax::{
    Combinator, CssError, CssParser, Node, SelectorNode, parse_selector, parse_selector_list,
    parse_stylesheet,
};

#[test]
fn test_parse_empty() {
    let root = parse_stylesheet("").unwrap();
    assert!(root.is_empty());
}

#[test]
fn test_parse_comments_are_kept() {
    let root = parse_stylesheet("/* header */ .a { /* inner */ color: red; }").unwrap();
    assert_eq!(root.len(), 2);
    assert!(matches!(&root.nodes[0], Node::Comment(c) if c.text == " header "));
    let rule = root.nodes[1].as_rule().unwrap();
    assert!(matches!(&rule.nodes[0], Node::Comment(c) if c.text == " inner "));
}

#[test]
fn test_parse_block_syntax() {
    let css = r#"
        @block-reference (foo, bar as baz) from "./other.css";
        :scope { block-name: my-block; extends: base; }
        .foo[state|size=large] { color: resolve("other.foo"); color: red; }
    "#;
    let root = parse_stylesheet(css).unwrap();
    assert_eq!(root.len(), 3);
    let at_rule = root.nodes[0].as_at_rule().unwrap();
    assert_eq!(at_rule.params, "(foo, bar as baz) from \"./other.css\"");
    let scope = root.nodes[1].as_rule().unwrap();
    assert_eq!(scope.decls().count(), 2);
    let rule = root.nodes[2].as_rule().unwrap();
    assert_eq!(rule.selector, ".foo[state|size=large]");
}

#[test]
fn test_parse_keyframes() {
    let css = "@keyframes spin { from { opacity: 0; } 50% { opacity: 1; } }";
    let root = parse_stylesheet(css).unwrap();
    let keyframes = root.nodes[0].as_at_rule().unwrap();
    assert_eq!(keyframes.nodes.as_ref().unwrap().len(), 2);
    assert!(root.rules().is_empty());
}

#[test]
fn test_parse_error_location() {
    let err = CssParser::with_filename("broken.css").parse(".a {\n  : red;\n}").unwrap_err();
    match err {
        CssError::ParseError { line, .. } => assert_eq!(line, 2),
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_round_trip_is_stable() {
    let css = ".a > .b {\n    color: red;\n}\n\n@media print {\n    .c {\n        display: none;\n    }\n}\n";
    let root = parse_stylesheet(css).unwrap();
    assert_eq!(root.to_css(), css);
    let again = parse_stylesheet(&root.to_css()).unwrap();
    assert_eq!(again.to_css(), css);
}

#[test]
fn test_rule_ids_unique_across_nesting() {
    let root = parse_stylesheet("@media print { .a {} .b {} } .c {}").unwrap();
    let mut ids: Vec<_> = root.rules().iter().map(|rule| rule.id).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 3);
}

#[test]
fn test_selector_with_tag_reference() {
    let selector = parse_selector("other[state|theme=dark] .foo").unwrap();
    let (context, combinator, key) = selector.split();
    let context = context.unwrap();
    assert_eq!(combinator, Some(Combinator::Descendant));
    assert_eq!(context.key().nodes[0], SelectorNode::Tag("other".into()));
    assert_eq!(key.classes().collect::<Vec<_>>(), vec!["foo"]);
}

#[test]
fn test_selector_pseudo_class_arguments() {
    let selector = parse_selector(".a:not(.b):nth-child(2n + 1)").unwrap();
    assert_eq!(selector.to_string(), ".a:not(.b):nth-child(2n + 1)");
}

#[test]
fn test_selector_list_preserves_order() {
    let selectors = parse_selector_list(".b, .a,\n.c").unwrap();
    let printed: Vec<_> = selectors.iter().map(ToString::to_string).collect();
    assert_eq!(printed, vec![".b", ".a", ".c"]);
}

#[test]
fn test_concat_and_appended() {
    let a = parse_selector(".a").unwrap();
    let b = parse_selector(".b > .c").unwrap();
    assert_eq!(a.concat(Combinator::GeneralSibling, &b).to_string(), ".a ~ .b > .c");
    let appended = a.appended(Combinator::Child, b.key().clone());
    assert_eq!(appended.to_string(), ".a > .c");
    assert_eq!(appended.length(), 2);
}

#[test]
fn test_pseudo_element_must_be_last() {
    assert!(parse_selector(".a::before.b").is_err());
}
