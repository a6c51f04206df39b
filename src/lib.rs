mod apply;
mod debug;
mod declaration;
mod error;
mod extract;
mod fetch;
mod stylesheet;

pub use declaration::{Declaration, DeclarationBlock, is_important};
pub use error::InksetError;
pub use extract::extract_stylesheets;
pub use fetch::{DefaultFetcher, FetchFailure, ResourceFetcher};
pub use stylesheet::{Rule, Specificity, parse_stylesheet, sequence_rules};

use debug::TraceLogger;
use kuchiki::NodeRef;
use kuchiki::traits::TendrilSink;
use std::path::Path;
use std::sync::Arc;

/// Configured inlining engine. One `inline` call exclusively owns its
/// document tree for the whole run.
pub struct Inkset {
    base_uri: String,
    fetcher: Arc<dyn ResourceFetcher>,
    keep_style_nodes: bool,
    extra_stylesheets: Vec<String>,
    trace: Option<Arc<TraceLogger>>,
}

#[derive(Clone)]
pub struct InksetBuilder {
    base_uri: String,
    fetcher: Option<Arc<dyn ResourceFetcher>>,
    keep_style_nodes: bool,
    extra_stylesheets: Vec<String>,
    debug_path: Option<std::path::PathBuf>,
}

impl Inkset {
    pub fn builder() -> InksetBuilder {
        InksetBuilder::new()
    }

    /// Runs the full pipeline on raw markup: load, extract embedded and
    /// linked stylesheets, apply each in document order, then any
    /// stylesheets registered on the builder, and serialize the mutated
    /// tree back to markup.
    pub fn inline(&self, html: &str) -> Result<String, InksetError> {
        let document = kuchiki::parse_html().one(html);
        self.inline_document(&document)?;
        Ok(document.to_string())
    }

    /// Like `inline`, reading the markup from a file. An unreadable path is
    /// fatal and returns no partial output.
    pub fn inline_file(&self, path: impl AsRef<Path>) -> Result<String, InksetError> {
        let path = path.as_ref();
        let html = std::fs::read_to_string(path).map_err(|err| {
            InksetError::ResourceNotFound(format!("{}: {}", path.display(), err))
        })?;
        self.inline(&html)
    }

    /// Runs extraction and application against an already-loaded tree.
    pub fn inline_document(&self, document: &NodeRef) -> Result<(), InksetError> {
        let sheets = extract::extract_with_options(
            document,
            &self.base_uri,
            self.fetcher.as_ref(),
            self.keep_style_nodes,
            self.trace.as_deref(),
        );
        for sheet in &sheets {
            self.apply_stylesheet(document, sheet)?;
        }
        for sheet in &self.extra_stylesheets {
            self.apply_stylesheet(document, sheet)?;
        }
        if let Some(logger) = &self.trace {
            logger.emit_summary("inline");
            logger.flush();
        }
        Ok(())
    }

    /// One full parse, sequence, and apply pass for a single stylesheet.
    /// Stylesheets in a batch never share a rule list; each pass completes
    /// before the next starts, and a parse error aborts the remainder of
    /// the batch.
    pub fn apply_stylesheet(&self, document: &NodeRef, css: &str) -> Result<(), InksetError> {
        let rules = parse_stylesheet(css)?;
        if let Some(logger) = &self.trace {
            logger.increment("rules.parsed", rules.len() as u64);
        }
        let rules = sequence_rules(rules);
        apply::apply_rules(document, &rules, self.trace.as_deref())
    }

    /// Applies an ordered collection of stylesheets, each as its own pass.
    pub fn apply_stylesheets<S: AsRef<str>>(
        &self,
        document: &NodeRef,
        sheets: &[S],
    ) -> Result<(), InksetError> {
        for sheet in sheets {
            self.apply_stylesheet(document, sheet.as_ref())?;
        }
        Ok(())
    }
}

impl InksetBuilder {
    pub fn new() -> Self {
        Self {
            base_uri: String::new(),
            fetcher: None,
            keep_style_nodes: false,
            extra_stylesheets: Vec::new(),
            debug_path: None,
        }
    }

    /// Prefix for relative `<link href>` targets during extraction.
    pub fn base_uri(mut self, uri: impl Into<String>) -> Self {
        self.base_uri = uri.into();
        self
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn ResourceFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    // Leave <style> and fetched <link> nodes in the tree while still
    // inlining their rules. Off by default: consumed nodes are removed.
    pub fn keep_style_nodes(mut self, enabled: bool) -> Self {
        self.keep_style_nodes = enabled;
        self
    }

    /// Registers an extra stylesheet applied after the document's own
    /// sheets, in registration order.
    pub fn register_stylesheet(mut self, css: impl Into<String>) -> Self {
        self.extra_stylesheets.push(css.into());
        self
    }

    // JSON-lines pipeline trace written to this path. Off by default.
    pub fn debug_path(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.debug_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<Inkset, InksetError> {
        let trace = match self.debug_path {
            Some(path) => Some(Arc::new(TraceLogger::new(path)?)),
            None => None,
        };
        Ok(Inkset {
            base_uri: self.base_uri,
            fetcher: self.fetcher.unwrap_or_else(|| Arc::new(DefaultFetcher)),
            keep_style_nodes: self.keep_style_nodes,
            extra_stylesheets: self.extra_stylesheets,
            trace,
        })
    }
}

impl Default for InksetBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot helper: applies a single stylesheet to raw markup and returns
/// the serialized result. No extraction is performed.
pub fn inline(html: &str, css: &str) -> Result<String, InksetError> {
    let engine = Inkset::builder().build()?;
    let document = kuchiki::parse_html().one(html);
    engine.apply_stylesheet(&document, css)?;
    Ok(document.to_string())
}
