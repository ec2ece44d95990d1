//! Auto-conversion of plain `<img>` elements into controllers.
//!
//! The scanner converts every eligible image exactly once over the life
//! of a document:
//!
//! 1. `scan_existing` walks the images already present (deferred while
//!    the document is still parsing)
//! 2. `observe_mutations` subscribes to child-list changes on the whole
//!    document; each delivered batch is searched for new images
//!
//! An image is eligible while it has no `fix-broken-img` ancestor. The
//! check runs at conversion time against the live tree, so nodes moved or
//! reinserted by other code are never wrapped twice.

use crate::config::WidgetConfig;
use crate::debug;
use crate::dom::{self, Document, MutationRecord, NodeId, ObserveOptions, ObserverId};
use crate::element::FixBrokenImg;
use serde::Serialize;

const IMG: &str = "img";

/// Result of a single conversion attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    /// The image was replaced by the returned controller element.
    Converted(NodeId),
    /// Already inside a controller.
    AlreadyWrapped,
    /// Not an `<img>` element.
    NotAnImage,
    /// The image has no parent to be replaced in.
    Orphaned,
}

/// Counters for log output and reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub converted: usize,
    pub skipped: usize,
    pub batches: usize,
}

impl ScanStats {
    fn track(&mut self, conversion: Conversion) {
        match conversion {
            Conversion::Converted(_) => self.converted += 1,
            _ => self.skipped += 1,
        }
    }
}

#[derive(Debug)]
pub struct Scanner {
    config: WidgetConfig,
    observer: Option<ObserverId>,
    /// The initial scan is waiting for parsing to finish.
    deferred: bool,
    stats: ScanStats,
}

impl Scanner {
    pub fn new(config: WidgetConfig) -> Self {
        Self {
            config,
            observer: None,
            deferred: false,
            stats: ScanStats::default(),
        }
    }

    /// Create a scanner and start it: observe, then scan what is there.
    ///
    /// Returns `None` when auto conversion is disabled; nothing is scanned
    /// or observed in that case.
    pub fn initialize(doc: &mut Document, config: WidgetConfig) -> Option<Self> {
        if !config.auto_convert {
            debug!("scan"; "auto conversion disabled");
            return None;
        }

        let mut scanner = Self::new(config);
        scanner.observe_mutations(doc);
        scanner.scan_existing(doc);
        Some(scanner)
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    pub fn observer(&self) -> Option<ObserverId> {
        self.observer
    }

    pub fn is_deferred(&self) -> bool {
        self.deferred
    }

    /// Convert every eligible image in the document.
    ///
    /// While the document is still parsing this only marks the scan as
    /// pending; the host runs it through [`Scanner::parsing_finished`].
    pub fn scan_existing(&mut self, doc: &mut Document) -> usize {
        if doc.is_parsing() {
            self.deferred = true;
            return 0;
        }
        self.deferred = false;

        let images = doc.elements_by_tag(doc.root(), IMG);
        let converted = self.convert_all(doc, &images);
        debug!("scan"; "initial scan converted {}/{} images", converted, images.len());
        converted
    }

    /// Run the initial scan if it was deferred.
    pub fn parsing_finished(&mut self, doc: &mut Document) -> usize {
        if !self.deferred {
            return 0;
        }
        self.scan_existing(doc)
    }

    /// Subscribe to child-list changes across the whole document.
    pub fn observe_mutations(&mut self, doc: &mut Document) {
        if self.observer.is_some() {
            return;
        }
        self.observer = Some(doc.observe(doc.root(), ObserveOptions::subtree()));
    }

    /// Unsubscribe; pending batches are dropped.
    pub fn disconnect(&mut self, doc: &mut Document) {
        if let Some(observer) = self.observer.take() {
            doc.disconnect(observer);
        }
    }

    /// Drain and process the pending batch, if any.
    ///
    /// Returns the number of conversions.
    pub fn deliver(&mut self, doc: &mut Document) -> usize {
        let Some(observer) = self.observer else {
            return 0;
        };
        let records = doc.take_records(observer);
        if records.is_empty() {
            return 0;
        }
        self.handle_batch(doc, &records)
    }

    /// Convert images inside the nodes added by one batch.
    ///
    /// Non-element nodes (text, comments) are skipped. An added `<img>` is
    /// itself a candidate, as are all `<img>` descendants of added nodes.
    pub fn handle_batch(&mut self, doc: &mut Document, records: &[MutationRecord]) -> usize {
        self.stats.batches += 1;

        let mut candidates = Vec::new();
        for &node in records.iter().flat_map(|r| &r.added_nodes) {
            let Some(elem) = doc.element(node) else {
                continue;
            };
            if elem.is(IMG) {
                candidates.push(node);
            }
            candidates.extend(doc.elements_by_tag(node, IMG));
        }

        let converted = self.convert_all(doc, &candidates);
        if converted > 0 {
            debug!("scan"; "batch of {} record(s): converted {}", records.len(), converted);
        }
        converted
    }

    fn convert_all(&mut self, doc: &mut Document, images: &[NodeId]) -> usize {
        let mut converted = 0;
        for &img in images {
            let conversion = convert(doc, img, &self.config);
            self.stats.track(conversion);
            if matches!(conversion, Conversion::Converted(_)) {
                converted += 1;
            }
        }
        converted
    }
}

/// Replace one `<img>` with a `fix-broken-img` element.
///
/// Eligibility is checked here, every time: a node that already sits
/// inside a controller, is not an image, or has no parent is left alone.
/// All attributes are copied; fallback colors are added only when they
/// differ from the built-in defaults; inline style text is carried over.
pub fn convert(doc: &mut Document, img: NodeId, config: &WidgetConfig) -> Conversion {
    let Some(elem) = doc.element(img) else {
        return Conversion::NotAnImage;
    };
    if !elem.is(IMG) {
        return Conversion::NotAnImage;
    }
    if doc.closest(img, FixBrokenImg::TAG).is_some() {
        return Conversion::AlreadyWrapped;
    }
    let Some(parent) = doc.parent(img) else {
        return Conversion::Orphaned;
    };

    let attrs: Vec<(String, String)> = elem
        .attrs()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let style = elem.get_attr("style").map(str::to_string);

    let wrapper = doc.create_element(FixBrokenImg::TAG);
    match fill_and_swap(doc, parent, img, wrapper, &attrs, style.as_deref(), config) {
        Ok(()) => Conversion::Converted(wrapper),
        Err(e) => {
            debug!("scan"; "skipped image {:?}: {}", img, e);
            Conversion::Orphaned
        }
    }
}

fn fill_and_swap(
    doc: &mut Document,
    parent: NodeId,
    img: NodeId,
    wrapper: NodeId,
    attrs: &[(String, String)],
    style: Option<&str>,
    config: &WidgetConfig,
) -> dom::Result<()> {
    for (name, value) in attrs {
        doc.set_attr(wrapper, name, value)?;
    }
    if let Some(background) = config.custom_background() {
        doc.set_attr(wrapper, "background-color", background)?;
    }
    if let Some(color) = config.custom_text_color() {
        doc.set_attr(wrapper, "text-color", color)?;
    }
    if let Some(style) = style {
        doc.set_attr(wrapper, "style", style)?;
    }
    doc.replace_child(parent, wrapper, img)
}
