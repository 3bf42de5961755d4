//! Structural diff of two virtual trees into a position-indexed patch set.
//!
//! Contract:
//! - Identical node references produce nothing, so callers can reuse
//!   unchanged subtrees to skip them entirely.
//! - Thunks on either side are forced, and their subtree is diffed into a
//!   nested patch set attached as a single `Patch::Thunk` record.
//! - Elements with the same tag, namespace and key are patched in place
//!   (properties, then children); anything else is replaced.
//! - A node that is removed or replaced wholesale has its subtree walked once
//!   for teardown: hook properties are cleared so their unhook fires, and
//!   destroyable widgets get a `Patch::Destroy`. Widgets replaced by widgets
//!   are left to the applier, which decides update against replace.
//! - Children are aligned with `reorder` first; a `Patch::Reorder` is pushed
//!   last at the parent's position when live moves are needed.
//!
//! Complexity: O(n + m) over the visited nodes, excluding forced thunks.

use crate::host::HostTree;
use crate::node::{VElement, VNode};
use crate::patch::{Patch, PatchSet};
use crate::props::{PropPatch, diff_props};
use crate::reorder::reorder;

pub fn diff<H: HostTree>(current: &VNode<H>, next: &VNode<H>) -> PatchSet<H> {
    let mut set = PatchSet::new(current.clone());
    walk(current, Some(next), &mut set, 0);
    set
}

/// Patch set removing `current` entirely, including its teardown.
pub fn diff_to_empty<H: HostTree>(current: &VNode<H>) -> PatchSet<H> {
    let mut set = PatchSet::new(current.clone());
    walk(current, None, &mut set, 0);
    set
}

fn walk<H: HostTree>(a: &VNode<H>, b: Option<&VNode<H>>, set: &mut PatchSet<H>, index: usize) {
    if b.is_some_and(|b| a.ptr_eq(b)) {
        return;
    }
    if a.is_thunk() || b.is_some_and(VNode::is_thunk) {
        thunks(a, b, set, index);
        return;
    }
    let Some(b) = b else {
        if !a.is_widget() {
            clear_state(a, set, index);
        }
        set.push(index, Patch::Remove { node: a.clone() });
        return;
    };

    match b {
        VNode::Element(next) => match a {
            VNode::Element(prev) if prev.matches(next) => {
                if let Some(patch) = diff_props(&prev.properties, &next.properties) {
                    set.push(
                        index,
                        Patch::Props {
                            node: a.clone(),
                            patch,
                        },
                    );
                }
                diff_children(prev, next, set, index);
            }
            _ => replace(a, b, set, index),
        },
        VNode::Text(next) => match a {
            VNode::Text(prev) => {
                if prev != next {
                    set.push(
                        index,
                        Patch::Replace {
                            from: a.clone(),
                            to: b.clone(),
                        },
                    );
                }
            }
            _ => replace(a, b, set, index),
        },
        VNode::Widget(next) => {
            set.push(
                index,
                Patch::Widget {
                    from: a.clone(),
                    to: next.clone(),
                },
            );
            if !a.is_widget() {
                clear_state(a, set, index);
            }
        }
        VNode::Thunk(_) => thunks(a, Some(b), set, index),
    }
}

fn replace<H: HostTree>(a: &VNode<H>, b: &VNode<H>, set: &mut PatchSet<H>, index: usize) {
    set.push(
        index,
        Patch::Replace {
            from: a.clone(),
            to: b.clone(),
        },
    );
    clear_state(a, set, index);
}

fn diff_children<H: HostTree>(
    prev: &VElement<H>,
    next: &VElement<H>,
    set: &mut PatchSet<H>,
    parent: usize,
) {
    let ordered = reorder(&prev.children, &next.children);
    let len = prev.children.len().max(ordered.children.len());
    let mut index = parent;
    for i in 0..len {
        let left = prev.children.get(i);
        let right = ordered
            .children
            .get(i)
            .copied()
            .flatten()
            .map(|j| &next.children[j]);
        index += 1;
        match left {
            Some(left) => {
                walk(left, right, set, index);
                index += left.count();
            }
            None => {
                if let Some(right) = right {
                    set.push(
                        parent,
                        Patch::Insert {
                            node: right.clone(),
                        },
                    );
                }
            }
        }
    }
    if let Some(moves) = ordered.moves {
        set.push(parent, Patch::Reorder { moves });
    }
}

/// Force both sides and diff the rendered pair into a nested patch set.
fn thunks<H: HostTree>(a: &VNode<H>, b: Option<&VNode<H>>, set: &mut PatchSet<H>, index: usize) {
    let prev = match a {
        VNode::Thunk(thunk) => thunk.force(None).clone(),
        _ => a.clone(),
    };
    let hint = a.is_thunk().then_some(&prev);
    let next = b.map(|b| match b {
        VNode::Thunk(thunk) => thunk.force(hint).clone(),
        _ => b.clone(),
    });
    let nested = match &next {
        Some(next) => diff(&prev, next),
        None => diff_to_empty(&prev),
    };
    if !nested.is_empty() {
        set.push(index, Patch::Thunk { patch: nested });
    }
}

/// Emit teardown for a node leaving the tree: unhook its hook properties and
/// destroy its destroyable widgets, descending only where flags say there is
/// something to find.
fn clear_state<H: HostTree>(node: &VNode<H>, set: &mut PatchSet<H>, index: usize) {
    match node {
        VNode::Element(el) => {
            if el.has_hooks() {
                set.push(
                    index,
                    Patch::Props {
                        node: node.clone(),
                        patch: PropPatch::unhook(el.hooks()),
                    },
                );
            }
            if el.has_descendant_hooks() || el.has_widgets() || el.has_thunks() {
                let mut child_index = index;
                for child in &el.children {
                    child_index += 1;
                    clear_state(child, set, child_index);
                    child_index += child.count();
                }
            }
        }
        VNode::Widget(widget) => {
            if widget.widget().is_destroyable() {
                set.push(
                    index,
                    Patch::Destroy {
                        widget: widget.clone(),
                    },
                );
            }
        }
        VNode::Thunk(_) => thunks(node, None, set, index),
        VNode::Text(_) => {}
    }
}
