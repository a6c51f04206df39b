use crate::debug::TraceLogger;
use crate::declaration::DeclarationBlock;
use crate::error::InksetError;
use crate::stylesheet::Rule;
use kuchiki::NodeRef;

/// Applies sequenced rules to the document tree in place. Each rule
/// resolves its matching elements through the selector engine and merges
/// its declarations onto each element's inline style, rewriting the
/// `style` attribute once per matching rule so later rules observe the
/// cumulative result.
///
/// Unparseable selectors are treated as matching nothing; only malformed
/// inline declarations abort the pass.
pub(crate) fn apply_rules(
    document: &NodeRef,
    rules: &[Rule],
    trace: Option<&TraceLogger>,
) -> Result<(), InksetError> {
    for rule in rules {
        if rule.selector.is_empty() {
            continue;
        }
        let Ok(matches) = document.select(&rule.selector) else {
            if let Some(logger) = trace {
                logger.log_skipped_selector(&rule.selector);
                logger.increment("selectors.skipped", 1);
            }
            continue;
        };
        let mut styled = 0u64;
        for element in matches {
            let mut attributes = element.attributes.borrow_mut();
            let mut style = match attributes.get("style") {
                Some(existing) => DeclarationBlock::parse(existing)?,
                None => DeclarationBlock::new(),
            };
            style.merge_from(&rule.declarations);
            let _ = attributes.insert("style", style.to_style_string());
            styled += 1;
        }
        if let Some(logger) = trace {
            logger.log_rule(&rule.selector, styled);
            logger.increment("elements.styled", styled);
        }
    }
    Ok(())
}
