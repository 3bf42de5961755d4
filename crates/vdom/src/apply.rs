//! Apply a patch set to the live tree.
//!
//! Order of operations:
//! 1. Every patched position is located once, before any mutation.
//! 2. Teardown runs first, in position order: `Props` and `Destroy` records,
//!    plus the destroy half of removing a widget. Thunk subpatches contribute
//!    their own teardown here, located inside the thunk's live node. None of
//!    it changes structure, so hooks and widgets see their live node still
//!    attached.
//! 3. Structural records run in position order; records at one position run
//!    in sequence, each against the node the previous one left there. Thunk
//!    subpatches run only their structural records at this stage.
//!
//! A position whose live node cannot be located is skipped. Host errors are
//! returned as is; the live tree is then partially patched.

use crate::host::HostTree;
use crate::index::locate;
use crate::materialize::materialize;
use crate::node::{VNode, WidgetNode, WidgetUpdate};
use crate::patch::{Patch, PatchSet};
use crate::props::apply_props;
use crate::reorder::Moves;
use std::collections::HashMap;

/// Apply `patches` to `root`, returning the root afterwards: a different node
/// if the root was replaced, `None` if it was removed.
pub fn apply_patch<H: HostTree>(
    host: &mut H,
    root: &H::Node,
    patches: &PatchSet<H>,
) -> Result<Option<H::Node>, H::Error> {
    if patches.is_empty() {
        return Ok(Some(root.clone()));
    }
    let located = locate_all(host, root, patches);
    teardown(host, &located, patches)?;
    apply_structure(host, root, &located, patches)
}

fn locate_all<H: HostTree>(
    host: &H,
    root: &H::Node,
    patches: &PatchSet<H>,
) -> HashMap<usize, H::Node> {
    let positions: Vec<usize> = patches.positions().collect();
    locate(host, root, patches.current(), &positions)
}

fn teardown<H: HostTree>(
    host: &mut H,
    located: &HashMap<usize, H::Node>,
    patches: &PatchSet<H>,
) -> Result<(), H::Error> {
    for (position, records) in patches.iter() {
        let Some(node) = located.get(&position) else {
            continue;
        };
        for record in records {
            apply_teardown(host, node, record)?;
        }
    }
    Ok(())
}

fn apply_structure<H: HostTree>(
    host: &mut H,
    root: &H::Node,
    located: &HashMap<usize, H::Node>,
    patches: &PatchSet<H>,
) -> Result<Option<H::Node>, H::Error> {
    let mut root = Some(root.clone());
    for (position, records) in patches.iter() {
        let Some(mut node) = located.get(&position).cloned() else {
            log::debug!(
                target: "vdom.apply",
                "no live node at position {position}; skipping {} record(s)",
                records.len()
            );
            continue;
        };
        for record in records.iter().filter(|r| !r.is_teardown()) {
            #[cfg(any(test, feature = "debug-stats"))]
            log::trace!(target: "vdom.apply", "apply {:?} at {position}", record.kind());
            let next = apply_record(host, &node, record)?;
            if root.as_ref() == Some(&node) {
                root = next.clone();
            }
            match next {
                Some(next) => node = next,
                None => break,
            }
        }
    }
    Ok(root)
}

fn apply_teardown<H: HostTree>(
    host: &mut H,
    node: &H::Node,
    record: &Patch<H>,
) -> Result<(), H::Error> {
    match record {
        Patch::Props { node: vnode, patch } => {
            let previous = vnode.as_element().map(|el| &el.properties);
            apply_props(host, node, patch, previous)
        }
        Patch::Destroy { widget } => widget.widget().destroy(host, node),
        Patch::Remove {
            node: VNode::Widget(widget),
        } => destroy_widget(host, node, widget),
        Patch::Thunk { patch } => {
            let located = locate_all(host, node, patch);
            teardown(host, &located, patch)
        }
        _ => Ok(()),
    }
}

fn apply_record<H: HostTree>(
    host: &mut H,
    node: &H::Node,
    record: &Patch<H>,
) -> Result<Option<H::Node>, H::Error> {
    match record {
        Patch::Remove { .. } => {
            if let Some(parent) = host.parent(node) {
                host.remove_child(&parent, node)?;
            }
            Ok(None)
        }
        Patch::Insert { node: vnode } => {
            let child = materialize(host, vnode)?;
            host.append_child(node, &child)?;
            Ok(Some(node.clone()))
        }
        Patch::Replace { to, .. } => {
            if let VNode::Text(text) = to {
                if host.is_text(node) {
                    host.set_text(node, text)?;
                    return Ok(Some(node.clone()));
                }
            }
            let replacement = materialize(host, to)?;
            swap(host, node, &replacement)?;
            Ok(Some(replacement))
        }
        Patch::Widget { from, to } => widget_patch(host, node, from, to).map(Some),
        Patch::Reorder { moves } => {
            reorder_children(host, node, moves)?;
            Ok(Some(node.clone()))
        }
        Patch::Thunk { patch } => {
            let located = locate_all(host, node, patch);
            let new_root = apply_structure(host, node, &located, patch)?;
            if let Some(new_root) = &new_root {
                if new_root != node {
                    swap(host, node, new_root)?;
                }
            }
            Ok(new_root)
        }
        Patch::Props { .. } | Patch::Destroy { .. } => Ok(Some(node.clone())),
    }
}

fn widget_patch<H: HostTree>(
    host: &mut H,
    node: &H::Node,
    from: &VNode<H>,
    to: &WidgetNode<H>,
) -> Result<H::Node, H::Error> {
    let previous = match from {
        VNode::Widget(previous) if previous.same_identity(to) => Some(previous),
        _ => None,
    };
    let Some(previous) = previous else {
        let replacement = to.widget().init(host)?;
        if let VNode::Widget(old) = from {
            destroy_widget(host, node, old)?;
        }
        swap(host, node, &replacement)?;
        return Ok(replacement);
    };
    let replacement = match to.widget().update(host, previous, node)? {
        WidgetUpdate::Reused => return Ok(node.clone()),
        WidgetUpdate::Replaced(replacement) => replacement,
        WidgetUpdate::Declined => to.widget().init(host)?,
    };
    if &replacement != node {
        swap(host, node, &replacement)?;
    }
    Ok(replacement)
}

fn destroy_widget<H: HostTree>(
    host: &mut H,
    node: &H::Node,
    widget: &WidgetNode<H>,
) -> Result<(), H::Error> {
    if widget.widget().is_destroyable() {
        widget.widget().destroy(host, node)?;
    }
    Ok(())
}

fn swap<H: HostTree>(host: &mut H, old: &H::Node, new: &H::Node) -> Result<(), H::Error> {
    match host.parent(old) {
        Some(parent) => host.replace_child(&parent, old, new),
        None => Ok(()),
    }
}

fn reorder_children<H: HostTree>(
    host: &mut H,
    parent: &H::Node,
    moves: &Moves,
) -> Result<(), H::Error> {
    let mut children = host.child_nodes(parent);
    let mut removed: HashMap<&str, H::Node> = HashMap::new();
    for remove in &moves.removes {
        if remove.from >= children.len() {
            log::debug!(target: "vdom.apply", "reorder remove {} out of range", remove.from);
            continue;
        }
        let child = children.remove(remove.from);
        host.remove_child(parent, &child)?;
        if let Some(key) = remove.key.as_deref() {
            removed.insert(key, child);
        }
    }
    for insert in &moves.inserts {
        let Some(child) = removed.remove(insert.key.as_str()) else {
            log::debug!(target: "vdom.apply", "reorder insert of unknown key `{}`", insert.key);
            continue;
        };
        let to = insert.to.min(children.len());
        host.insert_before(parent, &child, children.get(to))?;
        children.insert(to, child);
    }
    Ok(())
}
