//! Arena document model.
//!
//! A small stand-in for the browser DOM that the widget runs against:
//!
//! - `Document` owns every node in a flat arena addressed by `NodeId`
//! - child-list mutations are recorded for registered observers (see [`mutation`])
//! - elements whose tag is *defined* queue custom element reactions
//!   (connected / disconnected / attribute changed) for the host to dispatch
//!
//! Nodes are never freed. A removed node stays addressable and can be
//! re-inserted, which is what lets conversion guards be checked against
//! the live tree at any time.

pub mod html;
pub mod mutation;

use rustc_hash::FxHashSet;
use thiserror::Error;

pub use mutation::{MutationRecord, ObserveOptions, ObserverId, Reaction};

use mutation::Observers;

// =============================================================================
// Errors
// =============================================================================

/// Errors raised by tree operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    #[error("node {0:?} does not exist")]
    InvalidNode(NodeId),

    #[error("node {0:?} cannot have children")]
    NotAContainer(NodeId),

    #[error("node {child:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeId, child: NodeId },

    #[error("inserting {0:?} would create a cycle")]
    Cycle(NodeId),

    #[error("the document root cannot be moved or removed")]
    RootImmutable,

    #[error("html parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, DomError>;

// =============================================================================
// Nodes
// =============================================================================

/// Handle to a node in a [`Document`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Parsing progress of a document, mirroring `document.readyState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadyState {
    Loading,
    Interactive,
    #[default]
    Complete,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Document,
    Doctype(String),
    Element(Element),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
pub struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

impl Node {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn as_element(&self) -> Option<&Element> {
        match &self.kind {
            NodeKind::Element(elem) => Some(elem),
            _ => None,
        }
    }

    fn is_container(&self) -> bool {
        matches!(self.kind, NodeKind::Document | NodeKind::Element(_))
    }
}

/// An element with its ordered attribute list.
///
/// Tag and attribute names are stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    tag: String,
    attrs: Vec<(String, String)>,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn is(&self, tag: &str) -> bool {
        self.tag.eq_ignore_ascii_case(tag)
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.get_attr(name).is_some()
    }

    /// Iterate attributes in insertion order.
    pub fn attrs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Set an attribute, returning the previous value.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) -> Option<String> {
        let value = value.into();
        match self
            .attrs
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
        {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.attrs.push((name.to_ascii_lowercase(), value));
                None
            }
        }
    }

    /// Remove an attribute, returning the previous value.
    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let pos = self
            .attrs
            .iter()
            .position(|(key, _)| key.eq_ignore_ascii_case(name))?;
        Some(self.attrs.remove(pos).1)
    }
}

// =============================================================================
// Document
// =============================================================================

/// A document tree plus its mutation and reaction bookkeeping.
#[derive(Debug)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    ready_state: ReadyState,
    observers: Observers,
    reactions: Vec<Reaction>,
    /// Tags registered as custom elements.
    defined: FxHashSet<String>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty, fully parsed document.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Document,
            }],
            root: NodeId(0),
            ready_state: ReadyState::Complete,
            observers: Observers::default(),
            reactions: Vec::new(),
            defined: FxHashSet::default(),
        }
    }

    /// An empty `<html><head></head><body></body></html>` document.
    pub fn skeleton() -> Self {
        let mut doc = Self::new();
        let html = doc.create_element("html");
        let head = doc.create_element("head");
        let body = doc.create_element("body");
        doc.link(doc.root, html);
        doc.link(html, head);
        doc.link(html, body);
        doc
    }

    /// Attach a fresh node without records or reactions.
    fn link(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    pub fn set_ready_state(&mut self, state: ReadyState) {
        self.ready_state = state;
    }

    pub fn is_parsing(&self) -> bool {
        self.ready_state == ReadyState::Loading
    }

    /// First `<body>` element, or the root when the document has none.
    pub fn body(&self) -> NodeId {
        self.descendants(self.root)
            .find(|&id| self.element(id).is_some_and(|e| e.is("body")))
            .unwrap_or(self.root)
    }

    // -------------------------------------------------------------------------
    // Node creation
    // -------------------------------------------------------------------------

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            kind,
        });
        id
    }

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeKind::Element(Element::new(tag)))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Text(text.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Comment(text.into()))
    }

    pub fn create_doctype(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Doctype(text.into()))
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    fn check(&self, id: NodeId) -> Result<()> {
        if id.0 < self.nodes.len() {
            Ok(())
        } else {
            Err(DomError::InvalidNode(id))
        }
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.node(id).and_then(Node::as_element)
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match self.nodes.get_mut(id.0).map(|n| &mut n.kind) {
            Some(NodeKind::Element(elem)) => Some(elem),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(Node::parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(Node::children).unwrap_or_default()
    }

    /// Whether the node is attached (transitively) to the document root.
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.is_inclusive_ancestor(self.root, id)
    }

    /// Whether `ancestor` is `node` or one of its ancestors.
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    /// Nearest inclusive ancestor element with the given tag (`Element.closest`).
    pub fn closest(&self, id: NodeId, tag: &str) -> Option<NodeId> {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if self.element(current).is_some_and(|e| e.is(tag)) {
                return Some(current);
            }
            cursor = self.parent(current);
        }
        None
    }

    /// Pre-order descendants of `id`, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let mut stack: Vec<NodeId> = self.children(id).to_vec();
        stack.reverse();
        Descendants { doc: self, stack }
    }

    /// Descendant elements with the given tag, in document order
    /// (`querySelectorAll(tag)`; the node itself is not included).
    pub fn elements_by_tag(&self, id: NodeId, tag: &str) -> Vec<NodeId> {
        self.descendants(id)
            .filter(|&n| self.element(n).is_some_and(|e| e.is(tag)))
            .collect()
    }

    /// First connected element whose `id` attribute matches.
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .find(|&n| self.attr(n, "id") == Some(id))
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.get_attr(name))
    }

    /// Read a `data-*` attribute by its camelCase dataset key.
    ///
    /// `dataset(node, "textColor")` reads `data-text-color`.
    pub fn dataset(&self, id: NodeId, key: &str) -> Option<&str> {
        self.attr(id, &dataset_attr_name(key))
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(NodeKind::Text(text)) = self.node(id).map(Node::kind) {
            return text.clone();
        }
        self.descendants(id)
            .filter_map(|n| match self.node(n).map(Node::kind) {
                Some(NodeKind::Text(text)) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    // -------------------------------------------------------------------------
    // Attribute mutation
    // -------------------------------------------------------------------------

    /// Set an attribute on an element. Non-elements are ignored.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) -> Result<()> {
        self.check(id)?;
        let Some(elem) = self.element_mut(id) else {
            return Ok(());
        };
        let old = elem.set_attr(name, value);
        self.queue_attribute_reaction(id, name, old, Some(value.to_string()));
        Ok(())
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Result<()> {
        self.check(id)?;
        let Some(old) = self.element_mut(id).and_then(|e| e.remove_attr(name)) else {
            return Ok(());
        };
        self.queue_attribute_reaction(id, name, Some(old), None);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Tree mutation
    // -------------------------------------------------------------------------

    fn validate_insert(&self, parent: NodeId, child: NodeId) -> Result<()> {
        self.check(parent)?;
        self.check(child)?;
        if child == self.root {
            return Err(DomError::RootImmutable);
        }
        if !self.nodes[parent.0].is_container() {
            return Err(DomError::NotAContainer(parent));
        }
        if self.is_inclusive_ancestor(child, parent) {
            return Err(DomError::Cycle(child));
        }
        Ok(())
    }

    /// Unlink `child` from its current parent, recording the removal.
    fn detach(&mut self, child: NodeId) {
        let Some(old_parent) = self.nodes[child.0].parent else {
            return;
        };
        let was_connected = self.is_connected(child);
        self.nodes[old_parent.0].children.retain(|&id| id != child);
        self.nodes[child.0].parent = None;
        self.record(MutationRecord::removed(old_parent, vec![child]));
        if was_connected {
            self.queue_tree_reactions(child, false);
        }
    }

    /// Append a single child (`appendChild`).
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.append_children(parent, &[child])
    }

    /// Append several children as one batch, producing a single mutation
    /// record (the shape of inserting a document fragment).
    pub fn append_children(&mut self, parent: NodeId, children: &[NodeId]) -> Result<()> {
        for &child in children {
            self.validate_insert(parent, child)?;
        }
        for &child in children {
            self.detach(child);
            self.nodes[child.0].parent = Some(parent);
            self.nodes[parent.0].children.push(child);
        }
        if children.is_empty() {
            return Ok(());
        }
        self.record(MutationRecord::added(parent, children.to_vec()));
        if self.is_connected(parent) {
            for &child in children {
                self.queue_tree_reactions(child, true);
            }
        }
        Ok(())
    }

    /// Insert `child` before `reference` (`insertBefore`).
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId) -> Result<()> {
        self.validate_insert(parent, child)?;
        if self.parent(reference) != Some(parent) {
            return Err(DomError::NotAChild {
                parent,
                child: reference,
            });
        }
        if child == reference {
            return Ok(());
        }
        self.detach(child);
        let index = self.index_of(parent, reference)?;
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.insert(index, child);
        self.record(MutationRecord::added(parent, vec![child]));
        if self.is_connected(parent) {
            self.queue_tree_reactions(child, true);
        }
        Ok(())
    }

    /// Replace `old` with `new` in `parent` (`replaceChild`).
    ///
    /// Observers see one record carrying both the addition and the removal,
    /// so there is no observable state where both nodes are in the tree.
    pub fn replace_child(&mut self, parent: NodeId, new: NodeId, old: NodeId) -> Result<()> {
        self.validate_insert(parent, new)?;
        if self.parent(old) != Some(parent) {
            return Err(DomError::NotAChild { parent, child: old });
        }
        if new == old {
            return Ok(());
        }
        self.detach(new);
        let index = self.index_of(parent, old)?;
        let connected = self.is_connected(parent);

        self.nodes[parent.0].children[index] = new;
        self.nodes[old.0].parent = None;
        self.nodes[new.0].parent = Some(parent);

        self.record(MutationRecord {
            target: parent,
            added_nodes: vec![new],
            removed_nodes: vec![old],
        });
        if connected {
            self.queue_tree_reactions(old, false);
            self.queue_tree_reactions(new, true);
        }
        Ok(())
    }

    /// Remove `child` from `parent` (`removeChild`).
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.check(child)?;
        if self.parent(child) != Some(parent) {
            return Err(DomError::NotAChild { parent, child });
        }
        self.detach(child);
        Ok(())
    }

    /// Detach a node from wherever it is. Orphans are left untouched.
    pub fn remove(&mut self, id: NodeId) -> Result<()> {
        self.check(id)?;
        if id == self.root {
            return Err(DomError::RootImmutable);
        }
        self.detach(id);
        Ok(())
    }

    fn index_of(&self, parent: NodeId, child: NodeId) -> Result<usize> {
        self.nodes[parent.0]
            .children
            .iter()
            .position(|&id| id == child)
            .ok_or(DomError::NotAChild { parent, child })
    }

    // -------------------------------------------------------------------------
    // Custom element registry
    // -------------------------------------------------------------------------

    /// Register a custom element tag (`customElements.define`).
    ///
    /// Already connected elements with that tag are queued for upgrade.
    pub fn define(&mut self, tag: &str) {
        let tag = tag.to_ascii_lowercase();
        if !self.defined.insert(tag.clone()) {
            return;
        }
        let existing: Vec<NodeId> = self.elements_by_tag(self.root, &tag);
        self.reactions
            .extend(existing.into_iter().map(Reaction::Connected));
    }

    pub fn is_defined(&self, tag: &str) -> bool {
        self.defined.contains(&tag.to_ascii_lowercase())
    }

    fn is_defined_element(&self, id: NodeId) -> bool {
        self.element(id).is_some_and(|e| self.defined.contains(e.tag()))
    }

    /// Drain queued custom element reactions.
    pub fn take_reactions(&mut self) -> Vec<Reaction> {
        std::mem::take(&mut self.reactions)
    }

    pub fn has_reactions(&self) -> bool {
        !self.reactions.is_empty()
    }

    fn queue_tree_reactions(&mut self, subtree: NodeId, connected: bool) {
        let mut targets = Vec::new();
        if self.is_defined_element(subtree) {
            targets.push(subtree);
        }
        targets.extend(
            self.descendants(subtree)
                .filter(|&n| self.is_defined_element(n)),
        );
        let make = if connected {
            Reaction::Connected
        } else {
            Reaction::Disconnected
        };
        self.reactions.extend(targets.into_iter().map(make));
    }

    fn queue_attribute_reaction(
        &mut self,
        id: NodeId,
        name: &str,
        old: Option<String>,
        new: Option<String>,
    ) {
        if !self.is_defined_element(id) || !self.is_connected(id) {
            return;
        }
        self.reactions.push(Reaction::AttributeChanged {
            node: id,
            name: name.to_ascii_lowercase(),
            old,
            new,
        });
    }

    // -------------------------------------------------------------------------
    // Mutation observers
    // -------------------------------------------------------------------------

    /// Subscribe to child-list changes under `target`.
    pub fn observe(&mut self, target: NodeId, options: ObserveOptions) -> ObserverId {
        self.observers.register(target, options)
    }

    /// Stop delivering records to `observer` and drop its queue.
    pub fn disconnect(&mut self, observer: ObserverId) {
        self.observers.unregister(observer);
    }

    /// Drain the pending batch for `observer`.
    pub fn take_records(&mut self, observer: ObserverId) -> Vec<MutationRecord> {
        self.observers.take(observer)
    }

    pub fn has_pending_records(&self, observer: ObserverId) -> bool {
        self.observers.has_pending(observer)
    }

    fn record(&mut self, record: MutationRecord) {
        if self.observers.is_empty() {
            return;
        }
        let target = record.target;
        let nodes = &self.nodes;
        let is_ancestor = |ancestor: NodeId| {
            let mut cursor = Some(target);
            while let Some(current) = cursor {
                if current == ancestor {
                    return true;
                }
                cursor = nodes[current.0].parent;
            }
            false
        };
        self.observers.enqueue(record, is_ancestor);
    }
}

/// Pre-order iterator over a subtree.
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let next = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(next).iter().rev().copied());
        Some(next)
    }
}

/// Convert a dataset key (`textColor`) to its attribute name (`data-text-color`).
pub fn dataset_attr_name(key: &str) -> String {
    let mut name = String::with_capacity(key.len() + 8);
    name.push_str("data-");
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            name.push('-');
            name.push(c.to_ascii_lowercase());
        } else {
            name.push(c);
        }
    }
    name
}
