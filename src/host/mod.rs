//! The host page: a document plus the event loop that drives the widget.
//!
//! The host plays the browser's part. It owns the [`Document`], upgrades
//! `fix-broken-img` elements into [`FixBrokenImg`] controllers, dispatches
//! their lifecycle hooks, delivers mutation batches to the [`Scanner`] and
//! routes image outcomes back to the controller that asked for them.
//!
//! # Ordering
//!
//! - custom element reactions are dispatched synchronously after each
//!   mutation made through the page
//! - mutation batches are only delivered by [`Page::flush`] (the microtask
//!   checkpoint), so several mutations land in one batch
//! - image outcomes arrive whenever the caller resolves a [`PendingLoad`]
//!
//! Mutations made directly on [`Page::document_mut`] queue reactions too;
//! they are dispatched by the next `flush`.

use crate::config::{ConfigHandle, WidgetConfig};
use crate::debug;
use crate::dom::html::{parse_document, parse_fragment, to_html_with};
use crate::dom::{self, Document, NodeId, Reaction, ReadyState};
use crate::element::{FixBrokenImg, LoadOutcome, LoadRequest, LoadState};
use crate::scanner::{ScanStats, Scanner};
use rustc_hash::FxHashMap;
use serde::Serialize;

/// A load issued by a controller and not yet resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLoad {
    pub node: NodeId,
    pub request: LoadRequest,
}

#[derive(Debug)]
pub struct Page {
    doc: Document,
    config: ConfigHandle,
    controllers: FxHashMap<NodeId, FixBrokenImg>,
    scanner: Option<Scanner>,
    pending_loads: Vec<PendingLoad>,
    /// `boot` ran while parsing; `auto_init` waits for `finish_parsing`.
    auto_init_pending: bool,
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

impl Page {
    /// An empty, fully parsed page with `<html><head><body>`.
    pub fn new() -> Self {
        Self::with_document(Document::skeleton())
    }

    /// Parse markup into a page that is still loading.
    ///
    /// Hand-authored `fix-broken-img` elements are upgraded right away;
    /// deferred work waits for [`Page::finish_parsing`].
    pub fn parse(html: &str) -> dom::Result<Self> {
        let mut doc = parse_document(html)?;
        doc.set_ready_state(ReadyState::Loading);
        Ok(Self::with_document(doc))
    }

    /// Parse markup and finish parsing in one step.
    pub fn load(html: &str) -> dom::Result<Self> {
        let mut page = Self::parse(html)?;
        page.finish_parsing();
        Ok(page)
    }

    fn with_document(mut doc: Document) -> Self {
        doc.define(FixBrokenImg::TAG);
        let mut page = Self {
            doc,
            config: ConfigHandle::default(),
            controllers: FxHashMap::default(),
            scanner: None,
            pending_loads: Vec::new(),
            auto_init_pending: false,
        };
        page.dispatch_reactions();
        page
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Raw document access. Queued work is handled by the next [`Page::flush`].
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub fn config(&self) -> &ConfigHandle {
        &self.config
    }

    pub fn scanner(&self) -> Option<&Scanner> {
        self.scanner.as_ref()
    }

    pub fn body(&self) -> NodeId {
        self.doc.body()
    }

    /// The controller upgraded from `node`, if any.
    pub fn controller(&self, node: NodeId) -> Option<&FixBrokenImg> {
        self.controllers.get(&node)
    }

    /// Live controllers in document order.
    pub fn controllers(&self) -> Vec<&FixBrokenImg> {
        self.doc
            .elements_by_tag(self.doc.root(), FixBrokenImg::TAG)
            .into_iter()
            .filter_map(|node| self.controllers.get(&node))
            .collect()
    }

    pub fn pending_loads(&self) -> &[PendingLoad] {
        &self.pending_loads
    }

    // -------------------------------------------------------------------------
    // Startup
    // -------------------------------------------------------------------------

    /// Initialize the widget.
    ///
    /// Publishes `config` to every controller, replaces any previous
    /// scanner, then starts a new one unless auto conversion is disabled.
    pub fn init(&mut self, config: WidgetConfig) {
        debug!("init"; "auto_convert={} default_text={:?}", config.auto_convert, config.default_text);
        self.config.store(config.clone());
        for (node, controller) in &mut self.controllers {
            if let Some(elem) = self.doc.element(*node) {
                controller.refresh_fallback_text(elem);
            }
        }

        if let Some(mut previous) = self.scanner.take() {
            previous.disconnect(&mut self.doc);
        }
        self.scanner = Scanner::initialize(&mut self.doc, config);
        self.flush();
    }

    /// Initialize from the page's carrier element.
    pub fn auto_init(&mut self) {
        let config = WidgetConfig::from_carrier(&self.doc);
        self.init(config);
    }

    /// Run `auto_init` now, or once parsing has finished.
    pub fn boot(&mut self) {
        if self.doc.is_parsing() {
            self.auto_init_pending = true;
        } else {
            self.auto_init();
        }
    }

    /// Mark parsing as done and run the work that was waiting for it.
    pub fn finish_parsing(&mut self) {
        if !self.doc.is_parsing() {
            return;
        }
        self.doc.set_ready_state(ReadyState::Interactive);

        if std::mem::take(&mut self.auto_init_pending) {
            self.auto_init();
        } else if let Some(scanner) = self.scanner.as_mut() {
            scanner.parsing_finished(&mut self.doc);
        }
        self.flush();
    }

    // -------------------------------------------------------------------------
    // Event loop
    // -------------------------------------------------------------------------

    /// Run reactions and mutation batches until nothing is queued.
    ///
    /// Conversions made while handling a batch produce records of their
    /// own; those are delivered (and found to contain nothing to convert)
    /// before this returns.
    pub fn flush(&mut self) {
        loop {
            let mut progressed = false;

            if self.doc.has_reactions() {
                self.dispatch_reactions();
                progressed = true;
            }

            if let Some(scanner) = self.scanner.as_mut()
                && let Some(observer) = scanner.observer()
                && self.doc.has_pending_records(observer)
            {
                scanner.deliver(&mut self.doc);
                progressed = true;
            }

            if !progressed {
                break;
            }
        }
    }

    fn dispatch_reactions(&mut self) {
        for reaction in self.doc.take_reactions() {
            match reaction {
                Reaction::Connected(node) => self.connected(node),
                Reaction::Disconnected(node) => self.disconnected(node),
                Reaction::AttributeChanged {
                    node,
                    name,
                    old,
                    new,
                } => self.attribute_changed(node, &name, old.as_deref(), new.as_deref()),
            }
        }
    }

    fn connected(&mut self, node: NodeId) {
        if !self.doc.is_connected(node) {
            return;
        }
        let Some(elem) = self.doc.element(node) else {
            return;
        };

        let controller = self
            .controllers
            .entry(node)
            .or_insert_with(|| FixBrokenImg::new(node, self.config.clone(), elem));
        if controller.is_mounted() {
            return;
        }
        if let Some(request) = controller.on_mount(elem) {
            self.pending_loads.push(PendingLoad { node, request });
        }
    }

    fn disconnected(&mut self, node: NodeId) {
        if let Some(controller) = self.controllers.get_mut(&node) {
            controller.on_unmount();
        }
        // Reconnected before dispatch: a Connected reaction follows
        if !self.doc.is_connected(node) {
            self.controllers.remove(&node);
        }
    }

    fn attribute_changed(&mut self, node: NodeId, name: &str, old: Option<&str>, new: Option<&str>) {
        if !FixBrokenImg::is_observed(name) {
            return;
        }
        let (Some(controller), Some(elem)) = (self.controllers.get_mut(&node), self.doc.element(node))
        else {
            return;
        };
        if let Some(request) = controller.on_attribute_changed(name, old, new, elem) {
            self.pending_loads.push(PendingLoad { node, request });
        }
    }

    // -------------------------------------------------------------------------
    // Image network boundary
    // -------------------------------------------------------------------------

    /// Deliver the outcome of one request.
    ///
    /// Returns false when the controller is gone or the request is stale.
    pub fn complete_load(&mut self, node: NodeId, request: &LoadRequest, outcome: LoadOutcome) -> bool {
        self.pending_loads
            .retain(|p| !(p.node == node && p.request == *request));
        self.controllers
            .get_mut(&node)
            .is_some_and(|c| c.on_image_event(request.generation, outcome))
    }

    /// Resolve every pending load with `fetch(src)`, oldest first.
    ///
    /// Returns the number of outcomes that were applied.
    pub fn resolve_loads(&mut self, mut fetch: impl FnMut(&str) -> LoadOutcome) -> usize {
        let loads = std::mem::take(&mut self.pending_loads);
        loads
            .into_iter()
            .filter(|load| {
                let outcome = fetch(&load.request.src);
                self.complete_load(load.node, &load.request, outcome)
            })
            .count()
    }

    // -------------------------------------------------------------------------
    // Page scripts
    // -------------------------------------------------------------------------

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.doc.create_element(tag)
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> dom::Result<()> {
        self.doc.append_child(parent, child)?;
        self.dispatch_reactions();
        Ok(())
    }

    /// Parse `html` and append the result to `parent` as one batch.
    pub fn insert_html(&mut self, parent: NodeId, html: &str) -> dom::Result<Vec<NodeId>> {
        let nodes = parse_fragment(&mut self.doc, html)?;
        self.doc.append_children(parent, &nodes)?;
        self.dispatch_reactions();
        Ok(nodes)
    }

    pub fn remove(&mut self, node: NodeId) -> dom::Result<()> {
        self.doc.remove(node)?;
        self.dispatch_reactions();
        Ok(())
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> dom::Result<()> {
        self.doc.set_attr(node, name, value)?;
        self.dispatch_reactions();
        Ok(())
    }

    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> dom::Result<()> {
        self.doc.remove_attr(node, name)?;
        self.dispatch_reactions();
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Instance methods
    // -------------------------------------------------------------------------

    /// `element.setSource(url)`
    pub fn set_source(&mut self, node: NodeId, url: &str) -> dom::Result<()> {
        self.set_attribute(node, "src", url)
    }

    /// `element.setAlt(text)`
    pub fn set_alt(&mut self, node: NodeId, text: &str) -> dom::Result<()> {
        self.set_attribute(node, "alt", text)
    }

    /// `element.reload()`. Returns false when `node` has no controller.
    pub fn reload(&mut self, node: NodeId) -> bool {
        let (Some(controller), Some(elem)) = (self.controllers.get_mut(&node), self.doc.element(node))
        else {
            return false;
        };
        if let Some(request) = controller.reload(elem) {
            self.pending_loads.push(PendingLoad { node, request });
        }
        true
    }

    // -------------------------------------------------------------------------
    // Output
    // -------------------------------------------------------------------------

    /// Serialize the page.
    ///
    /// With `shadow`, every controller's rendered view is embedded as a
    /// declarative shadow root.
    pub fn to_html(&self, shadow: bool) -> String {
        to_html_with(&self.doc, self.doc.root(), |node| {
            if !shadow {
                return None;
            }
            self.controllers.get(&node).map(|c| c.view().to_template())
        })
    }

    pub fn summary(&self) -> PageSummary {
        let mut summary = PageSummary {
            scan: self.scanner.as_ref().map(Scanner::stats).unwrap_or_default(),
            auto_convert: self.scanner.is_some(),
            ..PageSummary::default()
        };
        for controller in self.controllers.values() {
            summary.controllers += 1;
            match controller.state() {
                LoadState::Idle => {}
                LoadState::Loading => summary.loading += 1,
                LoadState::Loaded => summary.loaded += 1,
                LoadState::Failed(_) => summary.failed += 1,
            }
        }
        summary
    }
}

/// Counts reported by the CLI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PageSummary {
    pub auto_convert: bool,
    pub scan: ScanStats,
    pub controllers: usize,
    pub loading: usize,
    pub loaded: usize,
    pub failed: usize,
}

/// Initialize the widget on `page` (`FixBrokenImg.init`).
pub fn init(page: &mut Page, config: WidgetConfig) {
    page.init(config);
}

/// Initialize from the page's carrier element (`FixBrokenImg.autoInit`).
pub fn auto_init(page: &mut Page) {
    page.auto_init();
}
