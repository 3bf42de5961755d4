//! Element properties, property diffs, and their application to live nodes.
//!
//! A property is a scalar, a nested map of scalars (inline styles, the
//! `attributes` group), or a hook. Hooks are compared by identity only.
//!
//! Diff rules:
//! - A key present only in the current map becomes `PropChange::Remove`.
//! - Scalars that differ, values that switch shape, and distinct hook
//!   instances become `PropChange::Set` with the next value.
//! - Two nested maps produce `PropChange::Nested` holding only the entries that
//!   changed; `None` marks an entry to remove.
//! - Equal values produce nothing, and an empty diff is reported as `None`.

use crate::host::HostTree;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Name of the nested group written through the host's attribute primitives.
pub const ATTRIBUTES: &str = "attributes";

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Str(String),
    Number(f64),
    Bool(bool),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.write_str(s),
            Value::Number(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(f64::from(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

/// Lifecycle callbacks invoked against the live node instead of a plain
/// property assignment.
pub trait Hook<H: HostTree> {
    fn hook(
        &self,
        host: &mut H,
        node: &H::Node,
        name: &str,
        previous: Option<&Prop<H>>,
    ) -> Result<(), H::Error>;

    fn unhook(
        &self,
        _host: &mut H,
        _node: &H::Node,
        _name: &str,
        _next: Option<&Prop<H>>,
    ) -> Result<(), H::Error> {
        Ok(())
    }
}

pub enum Prop<H: HostTree> {
    Value(Value),
    Map(BTreeMap<String, Value>),
    Hook(Rc<dyn Hook<H>>),
}

impl<H: HostTree> Prop<H> {
    pub fn hook(hook: impl Hook<H> + 'static) -> Self {
        Prop::Hook(Rc::new(hook))
    }

    pub fn map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Prop::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn is_hook(&self) -> bool {
        matches!(self, Prop::Hook(_))
    }

    fn same(&self, other: &Prop<H>) -> bool {
        match (self, other) {
            (Prop::Value(a), Prop::Value(b)) => a == b,
            (Prop::Map(a), Prop::Map(b)) => a == b,
            (Prop::Hook(a), Prop::Hook(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl<H: HostTree> Clone for Prop<H> {
    fn clone(&self) -> Self {
        match self {
            Prop::Value(v) => Prop::Value(v.clone()),
            Prop::Map(m) => Prop::Map(m.clone()),
            Prop::Hook(h) => Prop::Hook(Rc::clone(h)),
        }
    }
}

impl<H: HostTree> fmt::Debug for Prop<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prop::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Prop::Map(m) => f.debug_tuple("Map").field(m).finish(),
            Prop::Hook(h) => write!(f, "Hook({:p})", Rc::as_ptr(h)),
        }
    }
}

macro_rules! prop_from_scalar {
    ($($ty:ty),*) => {
        $(
            impl<H: HostTree> From<$ty> for Prop<H> {
                fn from(value: $ty) -> Self {
                    Prop::Value(Value::from(value))
                }
            }
        )*
    };
}

prop_from_scalar!(&str, String, f64, i32, bool);

impl<H: HostTree> From<Value> for Prop<H> {
    fn from(value: Value) -> Self {
        Prop::Value(value)
    }
}

pub type PropMap<H> = BTreeMap<String, Prop<H>>;

pub enum PropChange<H: HostTree> {
    Remove,
    Set(Prop<H>),
    Nested(BTreeMap<String, Option<Value>>),
}

impl<H: HostTree> Clone for PropChange<H> {
    fn clone(&self) -> Self {
        match self {
            PropChange::Remove => PropChange::Remove,
            PropChange::Set(p) => PropChange::Set(p.clone()),
            PropChange::Nested(m) => PropChange::Nested(m.clone()),
        }
    }
}

impl<H: HostTree> fmt::Debug for PropChange<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropChange::Remove => f.write_str("Remove"),
            PropChange::Set(p) => f.debug_tuple("Set").field(p).finish(),
            PropChange::Nested(m) => f.debug_tuple("Nested").field(m).finish(),
        }
    }
}

/// Minimal per-property difference between two property maps.
pub struct PropPatch<H: HostTree> {
    changes: BTreeMap<String, PropChange<H>>,
}

impl<H: HostTree> PropPatch<H> {
    /// Patch that clears the named hook properties so their unhook fires.
    pub fn unhook<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            changes: names
                .into_iter()
                .map(|name| (name.to_string(), PropChange::Remove))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&PropChange<H>> {
        self.changes.get(name)
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropChange<H>)> {
        self.changes.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<H: HostTree> Clone for PropPatch<H> {
    fn clone(&self) -> Self {
        Self {
            changes: self.changes.clone(),
        }
    }
}

impl<H: HostTree> fmt::Debug for PropPatch<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.changes.iter()).finish()
    }
}

pub fn diff_props<H: HostTree>(current: &PropMap<H>, next: &PropMap<H>) -> Option<PropPatch<H>> {
    let mut changes = BTreeMap::new();
    for (name, prev) in current {
        let Some(value) = next.get(name) else {
            changes.insert(name.clone(), PropChange::Remove);
            continue;
        };
        if prev.same(value) {
            continue;
        }
        match (prev, value) {
            (Prop::Map(a), Prop::Map(b)) => {
                let nested = diff_nested(a, b);
                if !nested.is_empty() {
                    changes.insert(name.clone(), PropChange::Nested(nested));
                }
            }
            _ => {
                changes.insert(name.clone(), PropChange::Set(value.clone()));
            }
        }
    }
    for (name, value) in next {
        if !current.contains_key(name) {
            changes.insert(name.clone(), PropChange::Set(value.clone()));
        }
    }
    if changes.is_empty() {
        None
    } else {
        Some(PropPatch { changes })
    }
}

fn diff_nested(
    current: &BTreeMap<String, Value>,
    next: &BTreeMap<String, Value>,
) -> BTreeMap<String, Option<Value>> {
    let mut out = BTreeMap::new();
    for key in current.keys() {
        if !next.contains_key(key) {
            out.insert(key.clone(), None);
        }
    }
    for (key, value) in next {
        if current.get(key) != Some(value) {
            out.insert(key.clone(), Some(value.clone()));
        }
    }
    out
}

/// Apply a property patch to a live node. `previous` is the property map the
/// live node was built from.
pub fn apply_props<H: HostTree>(
    host: &mut H,
    node: &H::Node,
    patch: &PropPatch<H>,
    previous: Option<&PropMap<H>>,
) -> Result<(), H::Error> {
    for (name, change) in patch.iter() {
        let prev = previous.and_then(|map| map.get(name));
        apply_change(host, node, name, change, prev)?;
    }
    Ok(())
}

/// Write a full property map onto a freshly created node.
pub fn apply_fresh<H: HostTree>(
    host: &mut H,
    node: &H::Node,
    props: &PropMap<H>,
) -> Result<(), H::Error> {
    for (name, prop) in props {
        set_prop(host, node, name, prop, None)?;
    }
    Ok(())
}

fn apply_change<H: HostTree>(
    host: &mut H,
    node: &H::Node,
    name: &str,
    change: &PropChange<H>,
    previous: Option<&Prop<H>>,
) -> Result<(), H::Error> {
    match change {
        PropChange::Remove => remove_prop(host, node, name, previous, None),
        PropChange::Set(prop) => set_prop(host, node, name, prop, previous),
        PropChange::Nested(entries) => {
            for (key, value) in entries {
                match (name == ATTRIBUTES, value) {
                    (true, Some(value)) => host.set_attribute(node, key, value)?,
                    (true, None) => host.remove_attribute(node, key)?,
                    (false, Some(value)) => host.set_nested_property(node, name, key, value)?,
                    (false, None) => host.remove_nested_property(node, name, key)?,
                }
            }
            Ok(())
        }
    }
}

fn set_prop<H: HostTree>(
    host: &mut H,
    node: &H::Node,
    name: &str,
    prop: &Prop<H>,
    previous: Option<&Prop<H>>,
) -> Result<(), H::Error> {
    match prop {
        Prop::Hook(hook) => {
            remove_prop(host, node, name, previous, Some(prop))?;
            hook.hook(host, node, name, previous)
        }
        Prop::Value(value) => {
            match previous {
                Some(Prop::Hook(_) | Prop::Map(_)) => {
                    remove_prop(host, node, name, previous, Some(prop))?
                }
                Some(Prop::Value(_)) | None => {}
            }
            host.set_property(node, name, value)
        }
        Prop::Map(entries) => {
            match previous {
                Some(Prop::Hook(old)) => old.unhook(host, node, name, Some(prop))?,
                Some(Prop::Value(_)) => host.remove_property(node, name)?,
                Some(Prop::Map(_)) | None => {}
            }
            for (key, value) in entries {
                if name == ATTRIBUTES {
                    host.set_attribute(node, key, value)?;
                } else {
                    host.set_nested_property(node, name, key, value)?;
                }
            }
            Ok(())
        }
    }
}

fn remove_prop<H: HostTree>(
    host: &mut H,
    node: &H::Node,
    name: &str,
    previous: Option<&Prop<H>>,
    next: Option<&Prop<H>>,
) -> Result<(), H::Error> {
    match previous {
        None => Ok(()),
        Some(Prop::Hook(old)) => old.unhook(host, node, name, next),
        Some(Prop::Map(entries)) => {
            for key in entries.keys() {
                if name == ATTRIBUTES {
                    host.remove_attribute(node, key)?;
                } else {
                    host.remove_nested_property(node, name, key)?;
                }
            }
            Ok(())
        }
        Some(Prop::Value(_)) => host.remove_property(node, name),
    }
}
