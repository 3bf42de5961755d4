//! Virtual tree model.
//!
//! Virtual nodes are immutable once built. Elements memoize their descendant
//! count and whether any widget, thunk or hook lives below them; the differ
//! and the position indexer rely on those flags instead of walking subtrees.
//! The only interior mutation is a thunk caching its rendered node.
//!
//! Clones are cheap (`Rc`), and `VNode::ptr_eq` is the identity check used to
//! skip unchanged subtrees.

use crate::host::HostTree;
use crate::props::{Hook, Prop, PropMap};
use crate::reorder::Keyed;
use std::any::TypeId;
use std::cell::OnceCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("duplicate sibling key `{key}` under <{tag}>")]
    DuplicateKey { tag: String, key: String },
}

pub enum VNode<H: HostTree> {
    Element(Rc<VElement<H>>),
    Text(Rc<str>),
    Widget(WidgetNode<H>),
    Thunk(Rc<Thunk<H>>),
}

impl<H: HostTree> VNode<H> {
    pub fn text(text: impl Into<Rc<str>>) -> Self {
        VNode::Text(text.into())
    }

    pub fn widget<W: Widget<H> + 'static>(widget: W) -> Self {
        VNode::Widget(WidgetNode::new(widget))
    }

    pub fn thunk(render: impl Fn(Option<&VNode<H>>) -> VNode<H> + 'static) -> Self {
        VNode::Thunk(Rc::new(Thunk::new(render)))
    }

    /// Pre-order positions occupied below this node. Only elements have any;
    /// thunks and widgets occupy their own position and nothing else.
    pub fn count(&self) -> usize {
        match self {
            VNode::Element(el) => el.count,
            VNode::Text(_) | VNode::Widget(_) | VNode::Thunk(_) => 0,
        }
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            VNode::Element(el) => el.key.as_deref(),
            VNode::Text(_) | VNode::Widget(_) | VNode::Thunk(_) => None,
        }
    }

    pub fn as_element(&self) -> Option<&VElement<H>> {
        match self {
            VNode::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn is_widget(&self) -> bool {
        matches!(self, VNode::Widget(_))
    }

    pub fn is_thunk(&self) -> bool {
        matches!(self, VNode::Thunk(_))
    }

    pub fn ptr_eq(&self, other: &VNode<H>) -> bool {
        match (self, other) {
            (VNode::Element(a), VNode::Element(b)) => Rc::ptr_eq(a, b),
            (VNode::Text(a), VNode::Text(b)) => Rc::ptr_eq(a, b),
            (VNode::Widget(a), VNode::Widget(b)) => Rc::ptr_eq(&a.widget, &b.widget),
            (VNode::Thunk(a), VNode::Thunk(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl<H: HostTree> Clone for VNode<H> {
    fn clone(&self) -> Self {
        match self {
            VNode::Element(el) => VNode::Element(Rc::clone(el)),
            VNode::Text(text) => VNode::Text(Rc::clone(text)),
            VNode::Widget(w) => VNode::Widget(w.clone()),
            VNode::Thunk(t) => VNode::Thunk(Rc::clone(t)),
        }
    }
}

impl<H: HostTree> fmt::Debug for VNode<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VNode::Element(el) => fmt::Debug::fmt(&**el, f),
            VNode::Text(text) => f.debug_tuple("Text").field(text).finish(),
            VNode::Widget(w) => fmt::Debug::fmt(w, f),
            VNode::Thunk(t) => fmt::Debug::fmt(&**t, f),
        }
    }
}

impl<H: HostTree> Keyed for VNode<H> {
    fn key(&self) -> Option<&str> {
        VNode::key(self)
    }
}

pub struct VElement<H: HostTree> {
    pub tag: String,
    pub namespace: Option<String>,
    pub key: Option<String>,
    pub properties: PropMap<H>,
    pub children: Vec<VNode<H>>,
    count: usize,
    has_widgets: bool,
    has_thunks: bool,
    has_descendant_hooks: bool,
    hooks: Vec<String>,
}

impl<H: HostTree> VElement<H> {
    pub fn builder(tag: impl Into<String>) -> ElementBuilder<H> {
        ElementBuilder::new(tag)
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn has_widgets(&self) -> bool {
        self.has_widgets
    }

    pub fn has_thunks(&self) -> bool {
        self.has_thunks
    }

    pub fn has_descendant_hooks(&self) -> bool {
        self.has_descendant_hooks
    }

    /// Names of this element's own hook-valued properties.
    pub fn hooks(&self) -> impl Iterator<Item = &str> {
        self.hooks.iter().map(String::as_str)
    }

    pub fn has_hooks(&self) -> bool {
        !self.hooks.is_empty()
    }

    /// Same tag, namespace and key: the element can be patched in place.
    pub fn matches(&self, other: &VElement<H>) -> bool {
        self.tag == other.tag && self.namespace == other.namespace && self.key == other.key
    }
}

impl<H: HostTree> fmt::Debug for VElement<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("tag", &self.tag)
            .field("namespace", &self.namespace)
            .field("key", &self.key)
            .field("properties", &self.properties)
            .field("children", &self.children)
            .finish()
    }
}

pub struct ElementBuilder<H: HostTree> {
    tag: String,
    namespace: Option<String>,
    key: Option<String>,
    properties: PropMap<H>,
    children: Vec<VNode<H>>,
}

impl<H: HostTree> ElementBuilder<H> {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            namespace: None,
            key: None,
            properties: PropMap::new(),
            children: Vec::new(),
        }
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn prop(mut self, name: impl Into<String>, value: impl Into<Prop<H>>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn hook(self, name: impl Into<String>, hook: impl Hook<H> + 'static) -> Self {
        self.prop(name, Prop::hook(hook))
    }

    pub fn properties(mut self, properties: PropMap<H>) -> Self {
        self.properties.extend(properties);
        self
    }

    pub fn child(mut self, child: VNode<H>) -> Self {
        self.children.push(child);
        self
    }

    pub fn text(self, text: impl Into<Rc<str>>) -> Self {
        self.child(VNode::text(text))
    }

    pub fn children(mut self, children: impl IntoIterator<Item = VNode<H>>) -> Self {
        self.children.extend(children);
        self
    }

    /// Freeze the element, computing its memoized flags.
    ///
    /// Fails when two children share a key.
    pub fn build(self) -> Result<VNode<H>, TreeError> {
        let mut keys = HashSet::new();
        let mut count = self.children.len();
        let mut has_widgets = false;
        let mut has_thunks = false;
        let mut has_descendant_hooks = false;
        for child in &self.children {
            if let Some(key) = child.key() {
                if !keys.insert(key) {
                    return Err(TreeError::DuplicateKey {
                        tag: self.tag.clone(),
                        key: key.to_string(),
                    });
                }
            }
            match child {
                VNode::Element(el) => {
                    count += el.count;
                    has_widgets |= el.has_widgets;
                    has_thunks |= el.has_thunks;
                    has_descendant_hooks |= el.has_descendant_hooks || el.has_hooks();
                }
                VNode::Widget(_) => has_widgets = true,
                VNode::Thunk(_) => has_thunks = true,
                VNode::Text(_) => {}
            }
        }
        let hooks = self
            .properties
            .iter()
            .filter(|(_, prop)| prop.is_hook())
            .map(|(name, _)| name.clone())
            .collect();
        Ok(VNode::Element(Rc::new(VElement {
            tag: self.tag,
            namespace: self.namespace,
            key: self.key,
            properties: self.properties,
            children: self.children,
            count,
            has_widgets,
            has_thunks,
            has_descendant_hooks,
            hooks,
        })))
    }
}

/// Outcome of asking a widget to reuse the previous live node.
#[derive(Clone, Debug, PartialEq)]
pub enum WidgetUpdate<N> {
    /// Keep the previous live node as is.
    Reused,
    /// Swap the previous live node for this one.
    Replaced(N),
    /// Not reusable; materialize a fresh node instead.
    Declined,
}

/// Custom-behavior node, opaque to structural diffing.
///
/// Identity is the external `id` when both sides have one, otherwise the
/// concrete widget type.
pub trait Widget<H: HostTree> {
    fn id(&self) -> Option<&str> {
        None
    }

    fn init(&self, host: &mut H) -> Result<H::Node, H::Error>;

    fn update(
        &self,
        _host: &mut H,
        _previous: &WidgetNode<H>,
        _node: &H::Node,
    ) -> Result<WidgetUpdate<H::Node>, H::Error> {
        Ok(WidgetUpdate::Declined)
    }

    /// Whether `destroy` must run when the widget leaves the tree.
    fn is_destroyable(&self) -> bool {
        false
    }

    fn destroy(&self, _host: &mut H, _node: &H::Node) -> Result<(), H::Error> {
        Ok(())
    }
}

pub struct WidgetNode<H: HostTree> {
    widget: Rc<dyn Widget<H>>,
    kind: TypeId,
}

impl<H: HostTree> WidgetNode<H> {
    pub fn new<W: Widget<H> + 'static>(widget: W) -> Self {
        Self {
            widget: Rc::new(widget),
            kind: TypeId::of::<W>(),
        }
    }

    pub fn widget(&self) -> &dyn Widget<H> {
        &*self.widget
    }

    pub fn same_identity(&self, other: &WidgetNode<H>) -> bool {
        match (self.widget.id(), other.widget.id()) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self.kind == other.kind,
            _ => false,
        }
    }
}

impl<H: HostTree> Clone for WidgetNode<H> {
    fn clone(&self) -> Self {
        Self {
            widget: Rc::clone(&self.widget),
            kind: self.kind,
        }
    }
}

impl<H: HostTree> fmt::Debug for WidgetNode<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Widget")
            .field("id", &self.widget.id())
            .field("kind", &self.kind)
            .finish()
    }
}

type RenderFn<H> = dyn Fn(Option<&VNode<H>>) -> VNode<H>;

/// Lazily produced node. Forced at most once; the result is cached.
pub struct Thunk<H: HostTree> {
    render: Box<RenderFn<H>>,
    rendered: OnceCell<VNode<H>>,
}

impl<H: HostTree> Thunk<H> {
    pub fn new(render: impl Fn(Option<&VNode<H>>) -> VNode<H> + 'static) -> Self {
        Self {
            render: Box::new(render),
            rendered: OnceCell::new(),
        }
    }

    /// Render (once) into a concrete element, text or widget node.
    ///
    /// `previous` is the node the previous pass rendered, if any. A render
    /// that yields another thunk is forced through to its concrete node.
    pub fn force(&self, previous: Option<&VNode<H>>) -> &VNode<H> {
        self.rendered.get_or_init(|| {
            let mut node = (self.render)(previous);
            while let VNode::Thunk(inner) = &node {
                let forced = inner.force(None).clone();
                node = forced;
            }
            node
        })
    }
}

impl<H: HostTree> fmt::Debug for Thunk<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thunk")
            .field("rendered", &self.rendered.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::ArenaHost;
    use std::cell::Cell;

    type Node = VNode<ArenaHost>;

    fn el(tag: &str) -> ElementBuilder<ArenaHost> {
        ElementBuilder::new(tag)
    }

    #[test]
    fn count_is_sum_of_children_and_their_counts() {
        let tree = el("ul")
            .child(el("li").text("a").build().expect("build failed"))
            .child(el("li").text("b").text("c").build().expect("build failed"))
            .text("tail")
            .build()
            .expect("build failed");
        // 3 direct children, 1 + 2 grandchildren.
        assert_eq!(tree.count(), 6);
    }

    #[test]
    fn flags_propagate_from_descendants() {
        struct Plain;
        impl Widget<ArenaHost> for Plain {
            fn init(&self, host: &mut ArenaHost) -> Result<crate::arena::NodeKey, crate::arena::ArenaError> {
                host.create_text("w")
            }
        }
        let inner = el("p")
            .child(Node::widget(Plain))
            .child(Node::thunk(|_| Node::text("lazy")))
            .build()
            .expect("build failed");
        let tree = el("div").child(inner).build().expect("build failed");
        let root = tree.as_element().expect("element");
        assert!(root.has_widgets());
        assert!(root.has_thunks());
        assert!(!root.has_descendant_hooks());
    }

    #[test]
    fn duplicate_sibling_keys_fail_fast() {
        let err = el("ul")
            .child(el("li").key("a").build().expect("build failed"))
            .child(el("li").key("a").build().expect("build failed"))
            .build()
            .expect_err("expected duplicate key error");
        assert_eq!(
            err,
            TreeError::DuplicateKey {
                tag: "ul".into(),
                key: "a".into()
            }
        );
    }

    #[test]
    fn thunk_renders_once() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let thunk = Thunk::<ArenaHost>::new(move |_| {
            counter.set(counter.get() + 1);
            Node::text("x")
        });
        let first = thunk.force(None).clone();
        let second = thunk.force(None);
        assert!(first.ptr_eq(second));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn thunk_returning_thunk_forces_through() {
        let thunk = Thunk::<ArenaHost>::new(|_| Node::thunk(|_| Node::text("deep")));
        assert!(matches!(thunk.force(None), VNode::Text(t) if &**t == "deep"));
    }

    #[test]
    fn widget_identity_uses_id_then_type() {
        use crate::arena::{ArenaError, NodeKey};

        struct Named(&'static str);
        impl Widget<ArenaHost> for Named {
            fn id(&self) -> Option<&str> {
                Some(self.0)
            }
            fn init(&self, host: &mut ArenaHost) -> Result<NodeKey, ArenaError> {
                host.create_text(self.0)
            }
        }
        struct Plain;
        impl Widget<ArenaHost> for Plain {
            fn init(&self, host: &mut ArenaHost) -> Result<NodeKey, ArenaError> {
                host.create_text("plain")
            }
        }
        struct Other;
        impl Widget<ArenaHost> for Other {
            fn init(&self, host: &mut ArenaHost) -> Result<NodeKey, ArenaError> {
                host.create_text("other")
            }
        }

        let a = WidgetNode::new(Named("a"));
        assert!(a.same_identity(&WidgetNode::new(Named("a"))));
        assert!(!a.same_identity(&WidgetNode::new(Named("b"))));
        assert!(!a.same_identity(&WidgetNode::new(Plain)));
        assert!(WidgetNode::new(Plain).same_identity(&WidgetNode::new(Plain).clone()));
        assert!(!WidgetNode::new(Plain).same_identity(&WidgetNode::new(Other)));
    }
}
