//! Position-indexed patch records.
//!
//! A `PatchSet` maps pre-order positions in the current tree to the ordered
//! records to apply there. Position 0 is the root; a child's position is its
//! parent's position plus one plus the descendant counts of the siblings
//! before it.
//!
//! Invariants:
//! - Records at one position are applied in order.
//! - `Insert` and `Reorder` records sit at the parent's position; `Reorder` is
//!   always the last record there.
//! - `Props` and `Destroy` records never change structure.
//! - A patch set is only valid against the current tree it was diffed from.

use crate::host::HostTree;
use crate::node::{VNode, WidgetNode};
use crate::props::PropPatch;
use crate::reorder::Moves;
use std::collections::BTreeMap;
use std::fmt;

pub enum Patch<H: HostTree> {
    /// Detach the node from its live parent; destroys it when it is a widget.
    Remove { node: VNode<H> },
    /// Replace the node with a freshly materialized element or text node.
    /// Text replacing a live text node is written in place.
    Replace { from: VNode<H>, to: VNode<H> },
    /// Update the widget in place when identity matches, replace otherwise.
    Widget { from: VNode<H>, to: WidgetNode<H> },
    Props { node: VNode<H>, patch: PropPatch<H> },
    /// Move children of this node; applied after every per-child record.
    Reorder { moves: Moves },
    /// Materialize and append a new child of this node.
    Insert { node: VNode<H> },
    /// Run a destroyable widget's teardown; its ancestor is being removed.
    Destroy { widget: WidgetNode<H> },
    /// Patches for a thunk's rendered subtree, rooted at this position.
    Thunk { patch: PatchSet<H> },
}

impl<H: HostTree> Patch<H> {
    pub fn is_teardown(&self) -> bool {
        matches!(self, Patch::Props { .. } | Patch::Destroy { .. })
    }

    pub fn kind(&self) -> PatchKind {
        match self {
            Patch::Remove { .. } => PatchKind::Remove,
            Patch::Replace { .. } => PatchKind::Replace,
            Patch::Widget { .. } => PatchKind::Widget,
            Patch::Props { .. } => PatchKind::Props,
            Patch::Reorder { .. } => PatchKind::Reorder,
            Patch::Insert { .. } => PatchKind::Insert,
            Patch::Destroy { .. } => PatchKind::Destroy,
            Patch::Thunk { .. } => PatchKind::Thunk,
        }
    }
}

impl<H: HostTree> Clone for Patch<H> {
    fn clone(&self) -> Self {
        match self {
            Patch::Remove { node } => Patch::Remove { node: node.clone() },
            Patch::Replace { from, to } => Patch::Replace {
                from: from.clone(),
                to: to.clone(),
            },
            Patch::Widget { from, to } => Patch::Widget {
                from: from.clone(),
                to: to.clone(),
            },
            Patch::Props { node, patch } => Patch::Props {
                node: node.clone(),
                patch: patch.clone(),
            },
            Patch::Reorder { moves } => Patch::Reorder {
                moves: moves.clone(),
            },
            Patch::Insert { node } => Patch::Insert { node: node.clone() },
            Patch::Destroy { widget } => Patch::Destroy {
                widget: widget.clone(),
            },
            Patch::Thunk { patch } => Patch::Thunk {
                patch: patch.clone(),
            },
        }
    }
}

impl<H: HostTree> fmt::Debug for Patch<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Patch::Remove { node } => f.debug_struct("Remove").field("node", node).finish(),
            Patch::Replace { from, to } => f
                .debug_struct("Replace")
                .field("from", from)
                .field("to", to)
                .finish(),
            Patch::Widget { from, to } => f
                .debug_struct("Widget")
                .field("from", from)
                .field("to", to)
                .finish(),
            Patch::Props { patch, .. } => f.debug_struct("Props").field("patch", patch).finish(),
            Patch::Reorder { moves } => f.debug_struct("Reorder").field("moves", moves).finish(),
            Patch::Insert { node } => f.debug_struct("Insert").field("node", node).finish(),
            Patch::Destroy { widget } => {
                f.debug_struct("Destroy").field("widget", widget).finish()
            }
            Patch::Thunk { patch } => f.debug_struct("Thunk").field("patch", patch).finish(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PatchKind {
    Remove,
    Replace,
    Widget,
    Props,
    Reorder,
    Insert,
    Destroy,
    Thunk,
}

pub struct PatchSet<H: HostTree> {
    current: VNode<H>,
    records: BTreeMap<usize, Vec<Patch<H>>>,
}

impl<H: HostTree> PatchSet<H> {
    pub(crate) fn new(current: VNode<H>) -> Self {
        Self {
            current,
            records: BTreeMap::new(),
        }
    }

    pub(crate) fn push(&mut self, position: usize, patch: Patch<H>) {
        #[cfg(any(test, feature = "debug-stats"))]
        log::trace!(target: "vdom.diff", "record at {position}: {:?}", patch.kind());
        self.records.entry(position).or_default().push(patch);
    }

    /// The current tree this set was diffed from; positions refer to it.
    pub fn current(&self) -> &VNode<H> {
        &self.current
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, position: usize) -> &[Patch<H>] {
        self.records
            .get(&position)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Positions with at least one record, ascending.
    pub fn positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.records.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &[Patch<H>])> {
        self.records.iter().map(|(pos, list)| (*pos, list.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    #[cfg(any(test, feature = "debug-stats"))]
    pub fn stats(&self) -> PatchStats {
        let mut stats = PatchStats::default();
        for records in self.records.values() {
            for record in records {
                *stats.by_kind.entry(record.kind()).or_default() += 1;
                if let Patch::Thunk { patch } = record {
                    stats.nested += patch.len();
                }
            }
        }
        stats.positions = self.records.len();
        stats
    }
}

impl<H: HostTree> Clone for PatchSet<H> {
    fn clone(&self) -> Self {
        Self {
            current: self.current.clone(),
            records: self.records.clone(),
        }
    }
}

impl<H: HostTree> fmt::Debug for PatchSet<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.records.iter()).finish()
    }
}

#[cfg(any(test, feature = "debug-stats"))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PatchStats {
    pub positions: usize,
    pub by_kind: BTreeMap<PatchKind, usize>,
    pub nested: usize,
}

#[cfg(any(test, feature = "debug-stats"))]
impl PatchStats {
    pub fn count(&self, kind: PatchKind) -> usize {
        self.by_kind.get(&kind).copied().unwrap_or(0)
    }
}
