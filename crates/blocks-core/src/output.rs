//! Serialization of compiled blocks

use blocks_syntax::{Node, Root};
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};

use crate::error::{CssBlocksError, Result};
use crate::options::Options;

/// True when the tree carries an interoperable `:export` rule
pub fn has_exports(root: &Root) -> bool {
    root.nodes
        .iter()
        .filter_map(Node::as_rule)
        .any(|rule| rule.selector == ":export")
}

/// Print a compiled tree, minified through lightningcss when requested
pub fn to_css(root: &Root, options: &Options) -> Result<String> {
    let css = root.to_css();
    if !options.minify {
        return Ok(css);
    }
    if has_exports(root) {
        tracing::warn!("Skipping minification: `:export` rules are not standard CSS");
        return Ok(css);
    }
    minify(&css)
}

pub fn minify(css: &str) -> Result<String> {
    let mut stylesheet = StyleSheet::parse(css, ParserOptions::default())
        .map_err(|e| CssBlocksError::syntax(format!("Cannot minify output: {}", e)))?;
    stylesheet
        .minify(MinifyOptions::default())
        .map_err(|e| CssBlocksError::syntax(format!("Cannot minify output: {}", e)))?;
    let printed = stylesheet
        .to_css(PrinterOptions { minify: true, ..PrinterOptions::default() })
        .map_err(|e| CssBlocksError::syntax(format!("Cannot minify output: {}", e)))?;
    Ok(printed.code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocks_syntax::parse_stylesheet;

    #[test]
    fn test_plain_output() {
        let root = parse_stylesheet(".a { color: red; }").unwrap();
        assert_eq!(to_css(&root, &Options::default()).unwrap(), ".a {\n    color: red;\n}\n");
    }

    #[test]
    fn test_minified_output() {
        let root = parse_stylesheet(".a { color: red; }\n.b { margin: 0px; }").unwrap();
        let options = Options { minify: true, ..Options::default() };
        let css = to_css(&root, &options).unwrap();
        assert!(!css.contains('\n'));
        assert!(css.contains(".a{color:red}"));
    }

    #[test]
    fn test_exports_skip_minification() {
        let root = parse_stylesheet(".a { color: red; }\n:export { a: a; }").unwrap();
        let options = Options { minify: true, ..Options::default() };
        assert!(has_exports(&root));
        assert!(to_css(&root, &options).unwrap().contains(":export {"));
    }
}
