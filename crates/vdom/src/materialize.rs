//! Build a brand-new live subtree from a virtual node.

use crate::host::HostTree;
use crate::node::VNode;
use crate::props::apply_fresh;

pub fn materialize<H: HostTree>(host: &mut H, node: &VNode<H>) -> Result<H::Node, H::Error> {
    match node {
        VNode::Text(text) => host.create_text(text),
        VNode::Widget(widget) => widget.widget().init(host),
        VNode::Thunk(thunk) => materialize(host, thunk.force(None)),
        VNode::Element(el) => {
            let live = host.create_element(&el.tag, el.namespace.as_deref())?;
            apply_fresh(host, &live, &el.properties)?;
            for child in &el.children {
                let live_child = materialize(host, child)?;
                host.append_child(&live, &live_child)?;
            }
            Ok(live)
        }
    }
}
