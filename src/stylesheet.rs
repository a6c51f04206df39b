use crate::declaration::DeclarationBlock;
use crate::error::InksetError;

/// One selector paired with its declaration block. A comma-separated
/// selector group in source expands into one `Rule` per selector, all
/// sharing the same literal block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub selector: String,
    pub declarations: DeclarationBlock,
}

/// Selector precedence weight: `(id, class, type)` counts compared
/// lexicographically, id most significant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Specificity(pub u16, pub u16, pub u16);

impl Specificity {
    /// Scores a selector with the same token heuristic the rest of the
    /// pipeline was tuned against, not the CSS specificity algorithm:
    /// `#` and `.` followed by a word character count as id and class; a
    /// word character at the start, or after whitespace, `(`, or a `:`
    /// whose tail does not begin with `not`, counts as a type. Pseudo
    /// classes other than `:not…` therefore score as types.
    pub fn of(selector: &str) -> Specificity {
        let chars: Vec<char> = selector.chars().collect();
        let mut ids = 0u16;
        let mut classes = 0u16;
        let mut types = 0u16;
        for (idx, &ch) in chars.iter().enumerate() {
            if !is_word_char(ch) {
                continue;
            }
            match idx.checked_sub(1).map(|prev| chars[prev]) {
                Some('#') => ids = ids.saturating_add(1),
                Some('.') => classes = classes.saturating_add(1),
                None => types = types.saturating_add(1),
                Some('(') => types = types.saturating_add(1),
                Some(prev) if prev.is_whitespace() => types = types.saturating_add(1),
                Some(':') if !tail_is_not(&chars, idx) => types = types.saturating_add(1),
                _ => {}
            }
        }
        Specificity(ids, classes, types)
    }
}

fn is_word_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

fn tail_is_not(chars: &[char], idx: usize) -> bool {
    chars[idx..].starts_with(&['n', 'o', 't'])
}

/// Parses raw stylesheet text into rules, in source order. Comments are
/// stripped first; the remainder is trimmed, relieved of one trailing `}`,
/// and split on `}` into rule blocks. Each block splits on its first `{`
/// into a selector group and a body; a block without `{` is a
/// `MalformedStylesheet` error. Selectors that trim to the empty string are
/// kept (the applicator skips them).
pub fn parse_stylesheet(text: &str) -> Result<Vec<Rule>, InksetError> {
    let stripped = strip_comments(text);
    let trimmed = stripped.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    let trimmed = trimmed.strip_suffix('}').unwrap_or(trimmed);

    let mut blocks: Vec<&str> = trimmed.split('}').collect();
    while blocks.last().is_some_and(|block| block.is_empty()) {
        blocks.pop();
    }

    let mut rules = Vec::new();
    for block in blocks {
        let Some((group, body)) = block.split_once('{') else {
            return Err(InksetError::MalformedStylesheet(block.trim().to_string()));
        };
        let body = body.trim();
        let body = body.strip_suffix(';').unwrap_or(body);
        let declarations = DeclarationBlock::parse(body)?;
        for selector in group.split(',') {
            rules.push(Rule {
                selector: selector.trim().to_string(),
                declarations: declarations.clone(),
            });
        }
    }
    Ok(rules)
}

/// Orders rules ascending by specificity so higher-specificity rules apply
/// last and win. The sort is stable: equal scores keep source order, which
/// makes source order the tie-break winner.
pub fn sequence_rules(mut rules: Vec<Rule>) -> Vec<Rule> {
    rules.sort_by_cached_key(|rule| Specificity::of(&rule.selector));
    rules
}

/// Removes `/* … */` comments, shortest match, non-nesting. An unterminated
/// comment is left in place, as a non-greedy matcher would leave it.
fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("/*") {
        let Some(end) = rest[start + 2..].find("*/") else {
            break;
        };
        out.push_str(&rest[..start]);
        rest = &rest[start + 2 + end + 2..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selectors(rules: &[Rule]) -> Vec<&str> {
        rules.iter().map(|rule| rule.selector.as_str()).collect()
    }

    #[test]
    fn parses_rules_in_source_order() {
        let rules = parse_stylesheet("p { color: red; } div { margin: 0 }").expect("rules");
        assert_eq!(selectors(&rules), ["p", "div"]);
        assert_eq!(
            rules[0].declarations.get("color").map(|d| d.value.as_str()),
            Some("red")
        );
    }

    #[test]
    fn expands_selector_groups_sharing_one_block() {
        let rules = parse_stylesheet("h1, h2 ,h3 { font-weight: bold }").expect("rules");
        assert_eq!(selectors(&rules), ["h1", "h2", "h3"]);
        assert_eq!(
            rules[0].declarations, rules[2].declarations,
            "grouped selectors must share the same declaration block"
        );
    }

    #[test]
    fn strips_comments_before_tokenizing() {
        let rules =
            parse_stylesheet("/* lead */ p { /* mid */ color: red } /* tail */").expect("rules");
        assert_eq!(selectors(&rules), ["p"]);
        assert_eq!(
            rules[0].declarations.get("color").map(|d| d.value.as_str()),
            Some("red")
        );
    }

    #[test]
    fn comment_stripping_is_shortest_match() {
        let out = strip_comments("a /* one */ b /* two */ c");
        assert_eq!(out, "a  b  c");
    }

    #[test]
    fn empty_stylesheet_yields_no_rules() {
        assert!(parse_stylesheet("").expect("rules").is_empty());
        assert!(parse_stylesheet("   \n\t ").expect("rules").is_empty());
        assert!(parse_stylesheet("/* only a comment */").expect("rules").is_empty());
    }

    #[test]
    fn block_without_brace_is_malformed() {
        let err = parse_stylesheet("p color: red }").unwrap_err();
        assert!(
            matches!(err, InksetError::MalformedStylesheet(_)),
            "expected MalformedStylesheet, got {err:?}"
        );
    }

    #[test]
    fn declaration_without_colon_is_malformed() {
        let err = parse_stylesheet("p { color red }").unwrap_err();
        assert!(matches!(err, InksetError::MalformedDeclaration(_)));
    }

    #[test]
    fn empty_selector_is_preserved_in_rule_list() {
        let rules = parse_stylesheet("{ color: red }").expect("rules");
        assert_eq!(selectors(&rules), [""], "empty selector stays in the list");
        let rules = parse_stylesheet("p, { color: red }").expect("rules");
        assert_eq!(selectors(&rules), ["p", ""]);
    }

    #[test]
    fn trailing_semicolon_is_trimmed_from_body() {
        let rules = parse_stylesheet("p { color: red; }").expect("rules");
        assert_eq!(rules[0].declarations.len(), 1);
    }

    #[test]
    fn score_counts_ids_classes_and_types() {
        assert_eq!(Specificity::of("#a.b c"), Specificity(1, 1, 1));
        assert_eq!(Specificity::of("p"), Specificity(0, 0, 1));
        assert_eq!(Specificity::of("p.x"), Specificity(0, 1, 1));
        assert_eq!(Specificity::of("#nav #item"), Specificity(2, 0, 0));
        assert_eq!(Specificity::of("*"), Specificity(0, 0, 0));
        assert_eq!(Specificity::of(""), Specificity(0, 0, 0));
    }

    #[test]
    fn score_counts_pseudo_classes_as_types_except_not() {
        assert_eq!(Specificity::of("a:hover"), Specificity(0, 0, 2));
        assert_eq!(
            Specificity::of("p:not(.x)"),
            Specificity(0, 1, 1),
            ":not itself must not add a type count"
        );
        assert_eq!(Specificity::of(":nth-child(2)"), Specificity(0, 0, 2));
    }

    #[test]
    fn scores_order_lexicographically_id_first() {
        assert!(Specificity(1, 0, 0) > Specificity(0, 9, 9));
        assert!(Specificity(0, 1, 0) > Specificity(0, 0, 9));
    }

    #[test]
    fn sequencing_is_stable_on_equal_scores() {
        let rules = parse_stylesheet("#one { a: 1 } #two { a: 2 } .three { a: 3 }")
            .expect("rules");
        let ordered = sequence_rules(rules);
        assert_eq!(
            selectors(&ordered),
            [".three", "#one", "#two"],
            "equal-specificity rules must keep their parse order"
        );
    }

    #[test]
    fn sequencing_sorts_ascending_by_specificity() {
        let rules =
            parse_stylesheet("#id { a: 1 } .cls { a: 2 } p { a: 3 }").expect("rules");
        let ordered = sequence_rules(rules);
        assert_eq!(selectors(&ordered), ["p", ".cls", "#id"]);
    }
}
