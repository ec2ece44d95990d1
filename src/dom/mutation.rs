//! Structural change feed and custom element reactions.
//!
//! Observers subscribe to a target node and receive batches of
//! [`MutationRecord`]s, one per child-list operation. Records are queued
//! at mutation time and drained by whoever drives the event loop, which
//! keeps delivery batched the way a browser delivers them.

use super::NodeId;

/// One child-list change on `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: NodeId,
    pub added_nodes: Vec<NodeId>,
    pub removed_nodes: Vec<NodeId>,
}

impl MutationRecord {
    pub(super) fn added(target: NodeId, nodes: Vec<NodeId>) -> Self {
        Self {
            target,
            added_nodes: nodes,
            removed_nodes: Vec::new(),
        }
    }

    pub(super) fn removed(target: NodeId, nodes: Vec<NodeId>) -> Self {
        Self {
            target,
            added_nodes: Vec::new(),
            removed_nodes: nodes,
        }
    }
}

/// What an observer wants to hear about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserveOptions {
    /// Also report changes anywhere below the target, not just its own children.
    pub subtree: bool,
}

impl ObserveOptions {
    pub const fn subtree() -> Self {
        Self { subtree: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(usize);

/// A custom element lifecycle callback waiting to be dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reaction {
    Connected(NodeId),
    Disconnected(NodeId),
    AttributeChanged {
        node: NodeId,
        name: String,
        old: Option<String>,
        new: Option<String>,
    },
}

#[derive(Debug)]
struct Registration {
    id: ObserverId,
    target: NodeId,
    options: ObserveOptions,
    queue: Vec<MutationRecord>,
}

#[derive(Debug, Default)]
pub(super) struct Observers {
    next_id: usize,
    registrations: Vec<Registration>,
}

impl Observers {
    pub(super) fn register(&mut self, target: NodeId, options: ObserveOptions) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.registrations.push(Registration {
            id,
            target,
            options,
            queue: Vec::new(),
        });
        id
    }

    pub(super) fn unregister(&mut self, id: ObserverId) {
        self.registrations.retain(|r| r.id != id);
    }

    pub(super) fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Queue `record` for every observer interested in its target.
    ///
    /// `is_ancestor(node)` answers whether `node` is an inclusive ancestor
    /// of the record target at the time of the mutation.
    pub(super) fn enqueue(&mut self, record: MutationRecord, is_ancestor: impl Fn(NodeId) -> bool) {
        for reg in &mut self.registrations {
            let interested = reg.target == record.target
                || (reg.options.subtree && is_ancestor(reg.target));
            if interested {
                reg.queue.push(record.clone());
            }
        }
    }

    pub(super) fn take(&mut self, id: ObserverId) -> Vec<MutationRecord> {
        self.registrations
            .iter_mut()
            .find(|r| r.id == id)
            .map(|r| std::mem::take(&mut r.queue))
            .unwrap_or_default()
    }

    pub(super) fn has_pending(&self, id: ObserverId) -> bool {
        self.registrations
            .iter()
            .any(|r| r.id == id && !r.queue.is_empty())
    }
}
