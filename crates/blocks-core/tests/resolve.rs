//! Conflict resolution tests
//!
//! Compiles small block graphs held in memory and checks the rules the
//! resolver emits.

use blocks_core::{BlockFactory, CssBlocksError, MemoryImporter, Options, to_css};

fn factory(files: &[(&str, &str)]) -> BlockFactory {
    let mut importer = MemoryImporter::new();
    for (path, contents) in files {
        importer.add(path, *contents);
    }
    BlockFactory::with_importer(Options::default(), importer)
}

fn compile(files: &[(&str, &str)], entry: &str) -> Result<String, CssBlocksError> {
    let mut factory = factory(files);
    let block = factory.get_block(entry)?;
    let root = factory.compile(block)?;
    to_css(&root, factory.options())
}

const OTHER: &str = ".foo { color: blue; }\n.bar::before { content: \"x\"; }";

#[test]
fn test_inherited_conflict_emits_merged_rule() {
    let css = compile(
        &[
            ("base.css", ":scope { color: blue; }"),
            (
                "child.css",
                "@block-reference base from \"base.css\";\n:scope { extends: base; color: red; }",
            ),
        ],
        "child.css",
    )
    .unwrap();
    assert_eq!(css, ".child {\n    color: red;\n}\n\n.child.base {\n    color: red;\n}\n");
}

#[test]
fn test_inherited_resolution_injected_once() {
    let mut factory = factory(&[
        ("base.css", ".foo { color: blue; }"),
        (
            "child.css",
            "@block-reference base from \"base.css\";\n\
             :scope { extends: base; }\n\
             .foo { color: red; color: green; }",
        ),
    ]);
    let id = factory.get_block("child.css").unwrap();
    let css = to_css(&factory.compile(id).unwrap(), factory.options()).unwrap();
    assert_eq!(css.matches(".child__foo.base__foo {").count(), 1);
    assert!(css.contains(".child__foo.base__foo {\n    color: red;\n    color: green;\n}"));
    assert!(!css.contains("resolve"));
}

#[test]
fn test_no_rule_without_inherited_conflict() {
    let css = compile(
        &[
            ("base.css", ".foo { color: blue; }"),
            (
                "child.css",
                "@block-reference base from \"base.css\";\n\
                 :scope { extends: base; }\n\
                 .foo { width: 10px; }",
            ),
        ],
        "child.css",
    )
    .unwrap();
    assert!(!css.contains(".base__foo"));
}

#[test]
fn test_override_takes_other_values() {
    let css = compile(
        &[
            ("other.css", OTHER),
            (
                "main.css",
                "@block-reference other from \"other.css\";\n\
                 .bar { color: red; color: resolve(\"other.foo\"); }",
            ),
        ],
        "main.css",
    )
    .unwrap();
    assert!(css.contains(".main__bar {\n    color: red;\n}"), "{css}");
    assert!(css.contains(".main__bar.other__foo {\n    color: blue;\n}"), "{css}");
}

#[test]
fn test_underride_keeps_local_values() {
    let css = compile(
        &[
            ("other.css", OTHER),
            (
                "main.css",
                "@block-reference other from \"other.css\";\n\
                 .bar { color: resolve(\"other.foo\"); color: red; }",
            ),
        ],
        "main.css",
    )
    .unwrap();
    assert!(css.contains(".main__bar.other__foo {\n    color: red;\n}"), "{css}");
}

#[test]
fn test_resolution_with_same_values_emits_nothing() {
    let css = compile(
        &[
            ("other.css", OTHER),
            (
                "main.css",
                "@block-reference other from \"other.css\";\n\
                 .bar { color: blue; color: resolve(\"other.foo\"); }",
            ),
        ],
        "main.css",
    )
    .unwrap();
    assert!(!css.contains("other__foo"));
}

#[test]
fn test_resolution_follows_context() {
    let css = compile(
        &[
            ("other.css", ".foo { color: blue; }"),
            (
                "main.css",
                "@block-reference other from \"other.css\";\n\
                 .list > .item { color: red; color: resolve(\"other.foo\"); }",
            ),
        ],
        "main.css",
    )
    .unwrap();
    assert!(css.contains(".main__list > .main__item.other__foo {\n    color: blue;\n}"), "{css}");
}

#[test]
fn test_resolution_requires_concrete_value() {
    let err = compile(
        &[
            ("other.css", OTHER),
            ("main.css", "@block-reference other from \"other.css\";\n.bar { color: resolve(\"other.foo\"); }"),
        ],
        "main.css",
    )
    .unwrap_err();
    assert!(err.message().contains("Cannot resolve color without a concrete value."), "{err}");
    assert_eq!(err.location().unwrap().filename.as_deref(), Some("main.css"));
    assert_eq!(err.location().unwrap().line, 2);
}

#[test]
fn test_resolution_must_not_be_surrounded() {
    let err = compile(
        &[
            ("other.css", OTHER),
            (
                "main.css",
                "@block-reference other from \"other.css\";\n\
                 .bar { color: red; color: resolve(\"other.foo\"); color: green; }",
            ),
        ],
        "main.css",
    )
    .unwrap_err();
    assert!(err.message().contains("resolution must happen either before or after"), "{err}");
}

#[test]
fn test_cannot_resolve_own_block() {
    let err = compile(&[("main.css", ".foo { color: red; }\n.bar { color: blue; color: resolve(\".foo\"); }")], "main.css")
        .unwrap_err();
    assert!(err.message().contains("Cannot resolve conflicts with your own block."), "{err}");
}

#[test]
fn test_cannot_resolve_explicit_ancestor() {
    let err = compile(
        &[
            ("base.css", ".foo { color: blue; }"),
            (
                "child.css",
                "@block-reference base from \"base.css\";\n\
                 :scope { extends: base; }\n\
                 .bar { color: red; color: resolve(\"base.foo\"); }",
            ),
        ],
        "child.css",
    )
    .unwrap_err();
    assert!(err.message().contains("Cannot resolve conflicts with ancestors of your own block."), "{err}");
}

#[test]
fn test_inherited_resolution_against_ancestor_is_allowed() {
    let css = compile(
        &[
            ("base.css", ".foo { color: blue; }"),
            (
                "child.css",
                "@block-reference base from \"base.css\";\n\
                 :scope { extends: base; }\n\
                 .bar { color: red; color: resolve-inherited(\"base.foo\"); }",
            ),
        ],
        "child.css",
    )
    .unwrap();
    assert!(css.contains(".child__bar.base__foo {\n    color: blue;\n}"), "{css}");
}

#[test]
fn test_no_conflicting_values_is_an_error() {
    let err = compile(
        &[
            ("other.css", OTHER),
            (
                "main.css",
                "@block-reference other from \"other.css\";\n\
                 .bar { width: 1px; width: resolve(\"other.foo\"); }",
            ),
        ],
        "main.css",
    )
    .unwrap_err();
    assert!(
        err.message()
            .contains("There are no conflicting values for width found in any selectors targeting other.foo."),
        "{err}"
    );
}

#[test]
fn test_shorthand_conflicts_with_longhand() {
    let css = compile(
        &[
            ("other.css", ".foo { margin-top: 4px; }"),
            (
                "main.css",
                "@block-reference other from \"other.css\";\n\
                 .bar { margin: 0; margin: resolve(\"other.foo\"); }",
            ),
        ],
        "main.css",
    )
    .unwrap();
    assert!(css.contains(".main__bar.other__foo {\n    margin-top: 4px;\n}"), "{css}");
}

#[test]
fn test_pseudo_elements_only_merge_with_same_pseudo() {
    let css = compile(
        &[
            ("other.css", OTHER),
            (
                "main.css",
                "@block-reference other from \"other.css\";\n\
                 .item::before { content: \"y\"; content: resolve(\"other.bar\"); }",
            ),
        ],
        "main.css",
    )
    .unwrap();
    assert!(css.contains(".main__item.other__bar::before {\n    content: \"x\";\n}"), "{css}");
}

#[test]
fn test_resolution_walks_to_ancestor_values() {
    let css = compile(
        &[
            ("base.css", ".foo { color: blue; }"),
            ("other.css", "@block-reference base from \"base.css\";\n:scope { extends: base; }\n.foo { width: 1px; }"),
            (
                "main.css",
                "@block-reference other from \"other.css\";\n\
                 .bar { color: red; color: resolve(\"other.foo\"); }",
            ),
        ],
        "main.css",
    )
    .unwrap();
    assert!(css.contains(".main__bar.base__foo {\n    color: blue;\n}"), "{css}");
}

#[test]
fn test_unknown_reference_is_an_error() {
    let err = compile(&[("main.css", ".bar { color: red; color: resolve(\"nope.foo\"); }")], "main.css")
        .unwrap_err();
    assert!(err.message().contains("Cannot find `nope.foo`"), "{err}");
}

#[test]
fn test_resolution_finds_targets_inside_media() {
    let css = compile(
        &[
            ("other.css", "@media (min-width: 10px) { .foo { color: blue; } }"),
            (
                "main.css",
                "@block-reference other from \"other.css\";\n\
                 .bar { color: red; color: resolve(\"other.foo\"); }",
            ),
        ],
        "main.css",
    )
    .unwrap();
    assert!(
        css.contains("@media (min-width: 10px) {\n    .main__bar.other__foo {\n        color: blue;\n    }\n}"),
        "{css}"
    );
}

#[test]
fn test_inherited_conflict_inside_media() {
    let css = compile(
        &[
            ("base.css", "@media (min-width: 10px) { .foo { color: blue; } }"),
            (
                "child.css",
                "@block-reference base from \"base.css\";\n\
                 :scope { extends: base; }\n\
                 .foo { color: red; }",
            ),
        ],
        "child.css",
    )
    .unwrap();
    assert!(
        css.contains("@media (min-width: 10px) {\n    .child__foo.base__foo {\n        color: red;\n    }\n}"),
        "{css}"
    );
}

#[test]
fn test_explicit_inherited_resolution_is_not_duplicated() {
    let css = compile(
        &[
            ("base.css", ".foo { color: blue; }"),
            (
                "child.css",
                "@block-reference base from \"base.css\";\n\
                 :scope { extends: base; }\n\
                 .foo { color: red; color: resolve-inherited(\"base.foo\"); }",
            ),
        ],
        "child.css",
    )
    .unwrap();
    assert_eq!(css.matches(".child__foo.base__foo {").count(), 1, "{css}");
    assert!(css.contains(".child__foo.base__foo {\n    color: blue;\n}"), "{css}");
}

#[test]
fn test_state_selectors_and_function_values_survive_parsing() {
    let css = compile(
        &[(
            "main.css",
            ".foo { color: rgb(1, 2, 3); }\n.foo[state|active] { color: rgb(4, 5, 6); }",
        )],
        "main.css",
    )
    .unwrap();
    assert!(css.contains(".main__foo {\n    color: rgb(1, 2, 3);\n}"), "{css}");
    assert!(css.contains(".main__foo--active {\n    color: rgb(4, 5, 6);\n}"), "{css}");
}
