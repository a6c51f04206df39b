use crate::debug::TraceLogger;
use crate::fetch::ResourceFetcher;
use kuchiki::NodeRef;
use rayon::prelude::*;

enum PendingSheet {
    Inline { node: NodeRef, text: String },
    Linked { node: NodeRef, slot: usize },
}

/// Pulls embedded and linked stylesheets out of the tree, returning their
/// text in document order and detaching the consumed nodes. A `<style>`
/// element yields its text content. A `<link>` with an `href` is resolved
/// against `base_uri` and fetched; only a successful non-empty fetch yields
/// a stylesheet and removes the node. Failures keep the node and are
/// silently skipped.
pub fn extract_stylesheets(
    root: &NodeRef,
    base_uri: &str,
    fetcher: &dyn ResourceFetcher,
) -> Vec<String> {
    extract_with_options(root, base_uri, fetcher, false, None)
}

/// Traversal collects a worklist first and detaches after the walk, so the
/// tree is never mutated while it is being iterated. Linked fetches fan out
/// across a thread pool; slots keep the yielded order at document order.
pub(crate) fn extract_with_options(
    root: &NodeRef,
    base_uri: &str,
    fetcher: &dyn ResourceFetcher,
    keep_nodes: bool,
    trace: Option<&TraceLogger>,
) -> Vec<String> {
    enum Found {
        Style,
        Link(String),
    }

    let mut pending = Vec::new();
    let mut link_uris = Vec::new();
    for node in root.inclusive_descendants() {
        let found = match node.as_element() {
            Some(element) => match element.name.local.as_ref() {
                "style" => Some(Found::Style),
                "link" => element
                    .attributes
                    .borrow()
                    .get("href")
                    .map(|href| Found::Link(href.to_string())),
                _ => None,
            },
            None => None,
        };
        match found {
            Some(Found::Style) => {
                let text = node.text_contents();
                pending.push(PendingSheet::Inline { node, text });
            }
            Some(Found::Link(href)) => {
                let slot = link_uris.len();
                link_uris.push(resolve_href(base_uri, &href));
                pending.push(PendingSheet::Linked { node, slot });
            }
            None => {}
        }
    }

    let mut fetched: Vec<Option<String>> = link_uris
        .par_iter()
        .map(|uri| match fetcher.fetch(uri) {
            Ok(bytes) if !bytes.is_empty() => {
                Some(String::from_utf8_lossy(&bytes).into_owned())
            }
            Ok(_) => None,
            Err(failure) => {
                if let Some(logger) = trace {
                    logger.log_fetch_failure(&failure.uri, &failure.reason);
                    logger.increment("fetch.failed", 1);
                }
                None
            }
        })
        .collect();

    let mut sheets = Vec::new();
    for entry in pending {
        match entry {
            PendingSheet::Inline { node, text } => {
                sheets.push(text);
                if !keep_nodes {
                    node.detach();
                }
            }
            PendingSheet::Linked { node, slot } => {
                if let Some(text) = fetched.get_mut(slot).and_then(Option::take) {
                    sheets.push(text);
                    if !keep_nodes {
                        node.detach();
                    }
                }
            }
        }
    }
    if let Some(logger) = trace {
        logger.increment("stylesheets.extracted", sheets.len() as u64);
    }
    sheets
}

fn resolve_href(base_uri: &str, href: &str) -> String {
    if base_uri.is_empty() || href.contains("://") {
        href.to_string()
    } else {
        format!("{base_uri}{href}")
    }
}
