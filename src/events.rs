//! Event delegation for views.
//!
//! An `EventSource` describes which events a view handles. The
//! `EventDelegate` hook registers one listener per event name on the live
//! root it is attached to and removes them again on unhook. `dispatch` walks
//! from the event target up to the detached root, resolving each listener's
//! handler spec on the way.

use std::fmt;
use std::rc::Rc;
use vdom::{ArenaError, ArenaHost, Hook, HostTree, NodeKey, Prop};

/// Name under which the delegate is attached to a view's root element.
pub const EVENT_HOOK: &str = "event-mappable";

pub type Host = ArenaHost<Listener>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    pub kind: String,
    pub target: NodeKey,
    /// Node whose listener is running.
    pub current_target: NodeKey,
}

#[derive(Clone)]
pub enum HandlerSpec {
    Callback(Rc<dyn Fn(&Event)>),
    /// A method resolved through `EventSource::call`.
    Method(String),
    List(Vec<HandlerSpec>),
    /// Each handler runs only when the event target is one of the descendants
    /// of the listening node matched by its selector.
    Selectors(Vec<(String, HandlerSpec)>),
}

impl HandlerSpec {
    pub fn callback(f: impl Fn(&Event) + 'static) -> Self {
        HandlerSpec::Callback(Rc::new(f))
    }

    pub fn method(name: impl Into<String>) -> Self {
        HandlerSpec::Method(name.into())
    }
}

impl fmt::Debug for HandlerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerSpec::Callback(_) => f.write_str("Callback(..)"),
            HandlerSpec::Method(name) => f.debug_tuple("Method").field(name).finish(),
            HandlerSpec::List(specs) => f.debug_tuple("List").field(specs).finish(),
            HandlerSpec::Selectors(entries) => f.debug_tuple("Selectors").field(entries).finish(),
        }
    }
}

pub trait EventSource {
    /// Event names paired with their handlers.
    fn events(&self) -> Vec<(String, HandlerSpec)>;

    /// Invoke a named method. Returns false when the source has no such
    /// method.
    fn call(&self, _method: &str, _event: &Event) -> bool {
        false
    }
}

/// Listener record stored on live nodes.
#[derive(Clone)]
pub struct Listener {
    owner: String,
    source: Rc<dyn EventSource>,
    spec: HandlerSpec,
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("owner", &self.owner)
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}

pub struct EventDelegate {
    source: Rc<dyn EventSource>,
}

impl EventDelegate {
    pub fn new(source: Rc<dyn EventSource>) -> Self {
        Self { source }
    }

    pub fn into_prop(self) -> Prop<Host> {
        Prop::hook(self)
    }
}

impl Hook<Host> for EventDelegate {
    fn hook(
        &self,
        host: &mut Host,
        node: &NodeKey,
        name: &str,
        _previous: Option<&Prop<Host>>,
    ) -> Result<(), ArenaError> {
        for (event, spec) in self.source.events() {
            host.add_listener(
                node,
                &event,
                Listener {
                    owner: name.to_string(),
                    source: Rc::clone(&self.source),
                    spec,
                },
            )?;
        }
        Ok(())
    }

    fn unhook(
        &self,
        host: &mut Host,
        node: &NodeKey,
        name: &str,
        _next: Option<&Prop<Host>>,
    ) -> Result<(), ArenaError> {
        for (event, _) in self.source.events() {
            for listener in host.remove_listeners(node, &event)? {
                if listener.owner != name {
                    host.add_listener(node, &event, listener)?;
                }
            }
        }
        Ok(())
    }
}

/// Deliver an event of `kind` at `target`, bubbling to the detached root.
/// Returns the number of handlers invoked.
pub fn dispatch(host: &Host, kind: &str, target: &NodeKey) -> usize {
    let mut invoked = 0;
    for node in host.path(target) {
        let event = Event {
            kind: kind.to_string(),
            target: *target,
            current_target: node,
        };
        for listener in host.listeners(&node, kind) {
            invoked += resolve(host, listener.source.as_ref(), &listener.spec, &event);
        }
    }
    invoked
}

fn resolve(host: &Host, source: &dyn EventSource, spec: &HandlerSpec, event: &Event) -> usize {
    match spec {
        HandlerSpec::Callback(f) => {
            f(event);
            1
        }
        HandlerSpec::Method(name) => {
            if source.call(name, event) {
                1
            } else {
                log::debug!(target: "magic.view", "no method {name:?} for {:?}", event.kind);
                0
            }
        }
        HandlerSpec::List(specs) => specs
            .iter()
            .map(|spec| resolve(host, source, spec, event))
            .sum(),
        HandlerSpec::Selectors(entries) => entries
            .iter()
            .filter(|(selector, _)| {
                host.query_descendants(&event.current_target, selector)
                    .contains(&event.target)
            })
            .map(|(_, spec)| resolve(host, source, spec, event))
            .sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct Recorder {
        calls: RefCell<Vec<String>>,
        handlers: Vec<(String, HandlerSpec)>,
    }

    impl Recorder {
        fn with(handlers: Vec<(&str, HandlerSpec)>) -> Rc<Self> {
            Rc::new(Self {
                calls: RefCell::default(),
                handlers: handlers
                    .into_iter()
                    .map(|(name, spec)| (name.to_string(), spec))
                    .collect(),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }
    }

    impl EventSource for Recorder {
        fn events(&self) -> Vec<(String, HandlerSpec)> {
            self.handlers.clone()
        }

        fn call(&self, method: &str, event: &Event) -> bool {
            if method == "missing" {
                return false;
            }
            self.calls.borrow_mut().push(format!("{method}:{}", event.kind));
            true
        }
    }

    fn tree(host: &mut Host) -> (NodeKey, NodeKey, NodeKey) {
        let root = host.create_element("div", None).expect("create failed");
        let button = host.create_element("button", None).expect("create failed");
        host.set_property(&button, "className", &"save".into())
            .expect("set failed");
        let label = host.create_text("Save").expect("create failed");
        host.append_child(&root, &button).expect("append failed");
        host.append_child(&button, &label).expect("append failed");
        (root, button, label)
    }

    #[test]
    fn hook_registers_and_unhook_removes_listeners() {
        let mut host = Host::default();
        let (root, _, _) = tree(&mut host);
        let source = Recorder::with(vec![
            ("click", HandlerSpec::method("clicked")),
            ("keydown", HandlerSpec::method("typed")),
        ]);
        let delegate = EventDelegate::new(source);
        delegate
            .hook(&mut host, &root, EVENT_HOOK, None)
            .expect("hook failed");
        assert_eq!(host.listeners(&root, "click").count(), 1);
        assert_eq!(host.listeners(&root, "keydown").count(), 1);
        delegate
            .unhook(&mut host, &root, EVENT_HOOK, None)
            .expect("unhook failed");
        assert_eq!(host.listeners(&root, "click").count(), 0);
        assert_eq!(host.listeners(&root, "keydown").count(), 0);
    }

    #[test]
    fn unhook_keeps_listeners_of_other_owners() {
        let mut host = Host::default();
        let (root, _, _) = tree(&mut host);
        let first = EventDelegate::new(Recorder::with(vec![("click", HandlerSpec::method("a"))]));
        let second = EventDelegate::new(Recorder::with(vec![("click", HandlerSpec::method("b"))]));
        first.hook(&mut host, &root, "first", None).expect("hook failed");
        second.hook(&mut host, &root, "second", None).expect("hook failed");
        first.unhook(&mut host, &root, "first", None).expect("unhook failed");
        assert_eq!(host.listeners(&root, "click").count(), 1);
    }

    #[test]
    fn dispatch_bubbles_to_root_listener() {
        let mut host = Host::default();
        let (root, _, label) = tree(&mut host);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let source = Recorder::with(vec![
            (
                "click",
                HandlerSpec::List(vec![
                    HandlerSpec::method("clicked"),
                    HandlerSpec::callback(move |event| sink.borrow_mut().push(event.clone())),
                    HandlerSpec::method("missing"),
                ]),
            ),
        ]);
        EventDelegate::new(source.clone())
            .hook(&mut host, &root, EVENT_HOOK, None)
            .expect("hook failed");

        assert_eq!(dispatch(&host, "click", &label), 2);
        assert_eq!(source.calls(), vec!["clicked:click".to_string()]);
        assert_eq!(
            seen.borrow().as_slice(),
            &[Event {
                kind: "click".into(),
                target: label,
                current_target: root,
            }]
        );
        assert_eq!(dispatch(&host, "keydown", &label), 0);
    }

    #[test]
    fn selector_handlers_fire_for_matching_targets_only() {
        let mut host = Host::default();
        let (root, button, label) = tree(&mut host);
        let source = Recorder::with(vec![(
            "click",
            HandlerSpec::Selectors(vec![
                (".save".to_string(), HandlerSpec::method("save")),
                ("span".to_string(), HandlerSpec::method("span")),
            ]),
        )]);
        EventDelegate::new(source.clone())
            .hook(&mut host, &root, EVENT_HOOK, None)
            .expect("hook failed");

        assert_eq!(dispatch(&host, "click", &button), 1);
        assert_eq!(dispatch(&host, "click", &label), 0);
        assert_eq!(dispatch(&host, "click", &root), 0);
        assert_eq!(source.calls(), vec!["save:click".to_string()]);
    }
}
