//! Locate live nodes for patch positions without walking the whole tree.
//!
//! The current virtual tree and the live tree share pre-order numbering, so
//! each virtual child knows the range `[here, here + count]` it covers. The
//! walk only descends into children whose range contains a wanted position.

use crate::host::HostTree;
use crate::node::VNode;
use std::collections::HashMap;

pub fn locate<H: HostTree>(
    host: &H,
    live_root: &H::Node,
    current: &VNode<H>,
    positions: &[usize],
) -> HashMap<usize, H::Node> {
    let mut out = HashMap::new();
    if positions.is_empty() {
        return out;
    }
    let mut sorted = positions.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    recurse(host, live_root, current, &sorted, 0, &mut out);
    out
}

fn recurse<H: HostTree>(
    host: &H,
    live: &H::Node,
    vnode: &VNode<H>,
    positions: &[usize],
    here: usize,
    out: &mut HashMap<usize, H::Node>,
) {
    if in_range(positions, here, here) {
        out.insert(here, live.clone());
    }
    let VNode::Element(el) = vnode else {
        return;
    };
    if !in_range(positions, here + 1, here + vnode.count()) {
        return;
    }
    let live_children = host.child_nodes(live);
    let mut index = here;
    for (i, child) in el.children.iter().enumerate() {
        index += 1;
        let end = index + child.count();
        if in_range(positions, index, end) {
            match live_children.get(i) {
                Some(live_child) => recurse(host, live_child, child, positions, index, out),
                None => {
                    log::debug!(
                        target: "vdom.index",
                        "live tree has no child {i} under position {here}; skipping {index}..={end}"
                    );
                }
            }
        }
        index = end;
    }
}

/// Whether any sorted position lies in `[left, right]`.
fn in_range(positions: &[usize], left: usize, right: usize) -> bool {
    let first = positions.partition_point(|&p| p < left);
    positions.get(first).is_some_and(|&p| p <= right)
}
