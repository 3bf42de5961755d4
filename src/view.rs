//! Views: a virtual tree paired with the live root it was materialized into.
//!
//! `mount` materializes a tree and appends it to a parent. `update` diffs the
//! held tree against the next one and applies the patches in place, tracking
//! a replaced root. `unmount` applies a diff against nothing so hooks and
//! widgets are torn down before the root is detached.

use crate::events::{EVENT_HOOK, EventDelegate, EventSource, Host};
use markup::{BuildError, TreeBuilder, TreeBuilderConfig};
use std::rc::Rc;
use vdom::{ArenaError, HostTree, NodeKey, VNode, apply_patch, diff, diff_to_empty, materialize};

pub type Tree = VNode<Host>;

#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error("view is already mounted")]
    AlreadyMounted,
    #[error("view is not mounted")]
    NotMounted,
    #[error("markup produced no element")]
    Empty,
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Host(#[from] ArenaError),
}

/// Build a tree from markup. When `source` handles any events, the root
/// element carries an `EventDelegate` for it.
pub fn domify(
    input: &str,
    config: &TreeBuilderConfig,
    source: Option<Rc<dyn EventSource>>,
) -> Result<Tree, ViewError> {
    let mut builder = TreeBuilder::new(config.clone());
    if let Some(source) = source.filter(|source| !source.events().is_empty()) {
        builder = builder.with_root_hook(EVENT_HOOK, EventDelegate::new(source).into_prop());
    }
    markup::build_with(builder, input)?.ok_or(ViewError::Empty)
}

/// A virtual tree paired with the live node it was materialized into.
#[derive(Default)]
pub struct View {
    mounted: Option<(Tree, NodeKey)>,
    version: u64,
}

impl View {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.is_some()
    }

    pub fn root(&self) -> Option<NodeKey> {
        self.mounted.as_ref().map(|(_, root)| *root)
    }

    pub fn tree(&self) -> Option<&Tree> {
        self.mounted.as_ref().map(|(tree, _)| tree)
    }

    /// Number of updates applied since the view was created.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Materialize `tree` and append it to `parent`.
    pub fn mount(&mut self, host: &mut Host, parent: &NodeKey, tree: Tree) -> Result<NodeKey, ViewError> {
        if self.mounted.is_some() {
            return Err(ViewError::AlreadyMounted);
        }
        let root = materialize(host, &tree)?;
        host.append_child(parent, &root)?;
        log::debug!(target: "magic.view", "mounted {} nodes under {parent:?}", tree.count() + 1);
        self.mounted = Some((tree, root));
        Ok(root)
    }

    /// Reconcile the live tree with `next`. Returns the live root, which
    /// differs from the previous one when the root was replaced.
    pub fn update(&mut self, host: &mut Host, next: Tree) -> Result<NodeKey, ViewError> {
        let Some((current, root)) = self.mounted.take() else {
            return Err(ViewError::NotMounted);
        };
        let patches = diff(&current, &next);
        log::debug!(
            target: "magic.view",
            "update {}: {} patched positions",
            self.version + 1,
            patches.len()
        );
        let live = match apply_patch(host, &root, &patches) {
            Ok(live) => live,
            Err(err) => {
                self.mounted = Some((current, root));
                return Err(err.into());
            }
        };
        self.version += 1;
        let Some(live) = live else {
            return Err(ViewError::NotMounted);
        };
        self.mounted = Some((next, live));
        Ok(live)
    }

    /// Tear the tree down and detach it from its parent.
    pub fn unmount(&mut self, host: &mut Host) -> Result<(), ViewError> {
        let Some((current, root)) = self.mounted.take() else {
            return Err(ViewError::NotMounted);
        };
        if let Err(err) = apply_patch(host, &root, &diff_to_empty(&current)) {
            self.mounted = Some((current, root));
            return Err(err.into());
        }
        log::debug!(target: "magic.view", "unmounted {root:?}");
        Ok(())
    }

    /// Live descendants of the root matching `selector`.
    pub fn find(&self, host: &Host, selector: &str) -> Vec<NodeKey> {
        self.root()
            .map(|root| host.query_descendants(&root, selector))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{HandlerSpec, dispatch};
    use std::cell::RefCell;

    fn parse(input: &str) -> Tree {
        domify(input, &TreeBuilderConfig::default(), None).expect("domify failed")
    }

    fn page(host: &mut Host) -> NodeKey {
        host.create_element("body", None).expect("create failed")
    }

    #[test]
    fn mount_appends_to_parent() {
        let mut host = Host::default();
        let body = page(&mut host);
        let mut view = View::new();
        let root = view
            .mount(&mut host, &body, parse("<ul><li>a</li><li>b</li></ul>"))
            .expect("mount failed");
        assert_eq!(host.child_nodes(&body), vec![root]);
        assert_eq!(view.find(&host, "li").len(), 2);
        assert!(matches!(
            view.mount(&mut host, &body, parse("<p></p>")),
            Err(ViewError::AlreadyMounted)
        ));
    }

    #[test]
    fn update_patches_in_place() {
        let mut host = Host::default();
        let body = page(&mut host);
        let mut view = View::new();
        let root = view
            .mount(&mut host, &body, parse("<ul><li key=a>A</li><li key=b>B</li></ul>"))
            .expect("mount failed");
        let items = host.child_nodes(&root);

        let live = view
            .update(&mut host, parse("<ul><li key=b>B</li><li key=a>A!</li></ul>"))
            .expect("update failed");
        assert_eq!(live, root);
        assert_eq!(host.child_nodes(&root), vec![items[1], items[0]]);
        let first = host.child_nodes(&items[0]);
        assert_eq!(host.text(&first[0]), Some("A!"));
        assert_eq!(view.version(), 1);
    }

    #[test]
    fn root_replacement_keeps_parent() {
        let mut host = Host::default();
        let body = page(&mut host);
        let mut view = View::new();
        let old = view
            .mount(&mut host, &body, parse("<p>x</p>"))
            .expect("mount failed");
        let new = view
            .update(&mut host, parse("<section>y</section>"))
            .expect("update failed");
        assert_ne!(old, new);
        assert_eq!(host.child_nodes(&body), vec![new]);
        assert_eq!(view.root(), Some(new));
    }

    #[test]
    fn unmount_detaches_and_unhooks() {
        struct Clicks(Rc<RefCell<usize>>);

        impl EventSource for Clicks {
            fn events(&self) -> Vec<(String, HandlerSpec)> {
                let count = Rc::clone(&self.0);
                vec![(
                    "click".to_string(),
                    HandlerSpec::callback(move |_| *count.borrow_mut() += 1),
                )]
            }
        }

        let mut host = Host::default();
        let body = page(&mut host);
        let clicks = Rc::new(RefCell::new(0));
        let tree = domify(
            "<div><button>go</button></div>",
            &TreeBuilderConfig::default(),
            Some(Rc::new(Clicks(Rc::clone(&clicks)))),
        )
        .expect("domify failed");
        let mut view = View::new();
        let root = view.mount(&mut host, &body, tree).expect("mount failed");
        let button = view.find(&host, "button")[0];

        assert_eq!(dispatch(&host, "click", &button), 1);
        view.unmount(&mut host).expect("unmount failed");
        assert!(host.child_nodes(&body).is_empty());
        assert_eq!(dispatch(&host, "click", &button), 0);
        assert_eq!(*clicks.borrow(), 1);
        assert_eq!(host.listeners(&root, "click").count(), 0);
        assert!(!view.is_mounted());
        assert!(view.find(&host, "button").is_empty());
        assert!(matches!(view.unmount(&mut host), Err(ViewError::NotMounted)));
    }

    #[test]
    fn domify_without_handlers_adds_no_hook() {
        struct Silent;

        impl EventSource for Silent {
            fn events(&self) -> Vec<(String, HandlerSpec)> {
                Vec::new()
            }
        }

        let tree = domify("<div></div>", &TreeBuilderConfig::default(), Some(Rc::new(Silent)))
            .expect("domify failed");
        assert!(!tree.as_element().expect("element").has_hooks());
        assert!(matches!(
            domify("<!-- -->", &TreeBuilderConfig::default(), None),
            Err(ViewError::Empty)
        ));
    }
}
