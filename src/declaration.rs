use crate::error::InksetError;

/// One `property: value` pair. The stored value keeps any literal
/// `!important` suffix so the attribute round-trips byte-for-byte; the
/// `important` flag is derived from the raw text and re-derivable from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub value: String,
    pub important: bool,
}

impl Declaration {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let important = is_important(&value);
        Self { value, important }
    }
}

/// Tests whether a declaration value ends with the `!important` marker,
/// ignoring ASCII case and trailing/interior whitespace around the bang.
pub fn is_important(value: &str) -> bool {
    let lower = value.trim_end().to_ascii_lowercase();
    let Some(head) = lower.strip_suffix("important") else {
        return false;
    };
    head.trim_end().ends_with('!')
}

/// An ordered property-to-declaration mapping. Property identity is
/// ASCII-case-insensitive and keys are unique; iteration follows insertion
/// order. Blocks are small, so lookups stay linear.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclarationBlock {
    entries: Vec<(String, Declaration)>,
}

impl DeclarationBlock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a `;`-separated declaration string (rule body or inline
    /// `style` attribute). The first `:` in each segment separates property
    /// from value, so colons inside values (`url(http://…)`) survive. Empty
    /// segments are skipped; a non-empty segment without a `:` is a
    /// `MalformedDeclaration` error.
    pub fn parse(raw: &str) -> Result<Self, InksetError> {
        let mut block = Self::new();
        for segment in raw.split(';') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let Some((property, value)) = segment.split_once(':') else {
                return Err(InksetError::MalformedDeclaration(segment.to_string()));
            };
            block.set(property.trim(), Declaration::new(value.trim()));
        }
        Ok(block)
    }

    pub fn get(&self, property: &str) -> Option<&Declaration> {
        self.entries
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(property))
            .map(|(_, declaration)| declaration)
    }

    /// Inserts or overwrites unconditionally. An existing entry keeps its
    /// position and spelling; only the declaration changes.
    pub fn set(&mut self, property: &str, declaration: Declaration) {
        for (name, existing) in &mut self.entries {
            if name.eq_ignore_ascii_case(property) {
                *existing = declaration;
                return;
            }
        }
        self.entries.push((property.to_string(), declaration));
    }

    /// Merges `incoming` on top of this block. New properties are added;
    /// existing non-important properties are overwritten by the incoming
    /// declaration regardless of its own importance; existing important
    /// properties keep their value even against an incoming `!important`
    /// (first important wins). Nothing is ever removed.
    pub fn merge_from(&mut self, incoming: &DeclarationBlock) {
        for (property, declaration) in &incoming.entries {
            let locked = self
                .get(property)
                .is_some_and(|existing| is_important(&existing.value));
            if locked {
                continue;
            }
            self.set(property, declaration.clone());
        }
    }

    /// Serializes back to a `style`-attribute string: `prop:value` pairs
    /// joined by `;`, in iteration order.
    pub fn to_style_string(&self) -> String {
        let mut out = String::new();
        for (property, declaration) in &self.entries {
            if !out.is_empty() {
                out.push(';');
            }
            out.push_str(property);
            out.push(':');
            out.push_str(&declaration.value);
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Declaration)> {
        self.entries
            .iter()
            .map(|(name, declaration)| (name.as_str(), declaration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(raw: &str) -> DeclarationBlock {
        DeclarationBlock::parse(raw).expect("declaration block")
    }

    #[test]
    fn important_marker_detection_ignores_case_and_whitespace() {
        assert!(is_important("red!important"));
        assert!(is_important("red !important"));
        assert!(is_important("red !IMPORTANT  "));
        assert!(is_important("red ! important"));
        assert!(!is_important("red"));
        assert!(!is_important("important"));
        assert!(!is_important("red important"));
    }

    #[test]
    fn parse_splits_on_first_colon_only() {
        let parsed = block("background:url(http://example.com/a.png);color:red");
        assert_eq!(
            parsed.get("background").map(|d| d.value.as_str()),
            Some("url(http://example.com/a.png)"),
            "colons inside values must stay part of the value"
        );
        assert_eq!(parsed.get("color").map(|d| d.value.as_str()), Some("red"));
    }

    #[test]
    fn parse_skips_empty_segments() {
        let parsed = block(";color: red;;font-size: 12px;");
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn parse_rejects_segment_without_colon() {
        let err = DeclarationBlock::parse("color red").unwrap_err();
        assert!(
            matches!(err, InksetError::MalformedDeclaration(ref s) if s == "color red"),
            "expected MalformedDeclaration, got {err:?}"
        );
    }

    #[test]
    fn property_identity_is_case_insensitive() {
        let mut base = block("Color: red");
        base.merge_from(&block("COLOR: blue"));
        assert_eq!(base.len(), 1, "case variants must collapse to one key");
        assert_eq!(base.get("color").map(|d| d.value.as_str()), Some("blue"));
        assert_eq!(base.to_style_string(), "Color:blue", "original spelling kept");
    }

    #[test]
    fn merge_is_additive_for_disjoint_properties() {
        let mut base = block("margin: 0");
        base.merge_from(&block("padding: 1px"));
        assert_eq!(base.to_style_string(), "margin:0;padding:1px");
    }

    #[test]
    fn merge_keeps_existing_important_value() {
        let mut base = block("color: red !important");
        base.merge_from(&block("color: blue"));
        assert_eq!(
            base.get("color").map(|d| d.value.as_str()),
            Some("red !important")
        );
    }

    #[test]
    fn merge_lets_incoming_important_replace_plain_value() {
        let mut base = block("color: red");
        base.merge_from(&block("color: blue !important"));
        assert_eq!(
            base.get("color").map(|d| d.value.as_str()),
            Some("blue !important")
        );
    }

    #[test]
    fn first_important_wins_over_later_important() {
        let mut base = block("color: red !important");
        base.merge_from(&block("color: blue !important"));
        assert_eq!(
            base.get("color").map(|d| d.value.as_str()),
            Some("red !important"),
            "an established important value must not be displaced"
        );
    }

    #[test]
    fn merge_never_removes_properties() {
        let mut base = block("color: red; margin: 0");
        base.merge_from(&block("color: blue"));
        assert_eq!(base.len(), 2);
        assert_eq!(base.get("margin").map(|d| d.value.as_str()), Some("0"));
    }

    #[test]
    fn style_string_round_trips_important_suffix() {
        let parsed = block("color: blue !important");
        assert_eq!(parsed.to_style_string(), "color:blue !important");
        let reparsed = block(&parsed.to_style_string());
        assert!(reparsed.get("color").map(|d| d.important).unwrap_or(false));
    }
}
