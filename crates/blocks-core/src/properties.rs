//! Shorthand property expansion
//!
//! Conflicts are computed on longhands so that `margin` and `margin-top`
//! are seen as touching the same value.

const BOX_SIDES: [&str; 4] = ["top", "right", "bottom", "left"];

/// Longhands set by a shorthand, or `None` for a longhand property
fn longhands(property: &str) -> Option<Vec<String>> {
    let sides = |prefix: &str, suffix: &str| -> Vec<String> {
        BOX_SIDES
            .iter()
            .map(|side| format!("{}-{}{}", prefix, side, suffix))
            .collect()
    };

    let expanded = match property {
        "margin" => sides("margin", ""),
        "padding" => sides("padding", ""),
        "inset" => BOX_SIDES.iter().map(|side| side.to_string()).collect(),
        "border-width" => sides("border", "-width"),
        "border-style" => sides("border", "-style"),
        "border-color" => sides("border", "-color"),
        "border" => {
            let mut all = sides("border", "-width");
            all.extend(sides("border", "-style"));
            all.extend(sides("border", "-color"));
            all
        }
        "border-top" | "border-right" | "border-bottom" | "border-left" => {
            ["width", "style", "color"]
                .iter()
                .map(|part| format!("{}-{}", property, part))
                .collect()
        }
        "border-radius" => ["top-left", "top-right", "bottom-right", "bottom-left"]
            .iter()
            .map(|corner| format!("border-{}-radius", corner))
            .collect(),
        "outline" => vec!["outline-color".into(), "outline-style".into(), "outline-width".into()],
        "background" => [
            "background-color",
            "background-image",
            "background-repeat",
            "background-attachment",
            "background-position",
            "background-size",
            "background-origin",
            "background-clip",
        ]
        .iter()
        .map(|p| p.to_string())
        .collect(),
        "font" => [
            "font-style",
            "font-variant",
            "font-weight",
            "font-stretch",
            "font-size",
            "line-height",
            "font-family",
        ]
        .iter()
        .map(|p| p.to_string())
        .collect(),
        "flex" => vec!["flex-grow".into(), "flex-shrink".into(), "flex-basis".into()],
        "flex-flow" => vec!["flex-direction".into(), "flex-wrap".into()],
        "overflow" => vec!["overflow-x".into(), "overflow-y".into()],
        "gap" => vec!["row-gap".into(), "column-gap".into()],
        "list-style" => vec![
            "list-style-type".into(),
            "list-style-position".into(),
            "list-style-image".into(),
        ],
        "text-decoration" => vec![
            "text-decoration-line".into(),
            "text-decoration-style".into(),
            "text-decoration-color".into(),
        ],
        "transition" => vec![
            "transition-property".into(),
            "transition-duration".into(),
            "transition-timing-function".into(),
            "transition-delay".into(),
        ],
        "animation" => [
            "animation-name",
            "animation-duration",
            "animation-timing-function",
            "animation-delay",
            "animation-iteration-count",
            "animation-direction",
            "animation-fill-mode",
            "animation-play-state",
        ]
        .iter()
        .map(|p| p.to_string())
        .collect(),
        _ => return None,
    };
    Some(expanded)
}

/// The property itself plus every longhand it sets, recursively
pub fn expand(property: &str) -> Vec<String> {
    let property = property.to_ascii_lowercase();
    let mut out = vec![property.clone()];
    if let Some(children) = longhands(&property) {
        for child in children {
            for longhand in expand(&child) {
                if !out.contains(&longhand) {
                    out.push(longhand);
                }
            }
        }
    }
    out
}

/// True when two properties set at least one common longhand
pub fn overlap(a: &str, b: &str) -> bool {
    let a = expand(a);
    expand(b).iter().any(|property| a.contains(property))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_longhand() {
        assert_eq!(expand("color"), vec!["color".to_string()]);
    }

    #[test]
    fn test_expand_margin() {
        let expanded = expand("margin");
        assert_eq!(expanded.len(), 5);
        assert!(expanded.contains(&"margin-left".to_string()));
    }

    #[test]
    fn test_expand_border_is_recursive() {
        let expanded = expand("border");
        assert!(expanded.contains(&"border-top-color".to_string()));
        assert!(!expanded.contains(&"border-width".to_string()));
    }

    #[test]
    fn test_overlap() {
        assert!(overlap("margin", "margin-top"));
        assert!(overlap("margin-top", "margin"));
        assert!(!overlap("margin-top", "margin-left"));
        assert!(overlap("border-color", "border-top"));
    }
}
