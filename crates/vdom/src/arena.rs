//! In-memory host tree.
//!
//! Nodes live in a flat arena addressed by `NodeKey`. Records are never freed,
//! so handles to a detached subtree stay valid.
//!
//! Each node also carries listener slots of type `L`, used by event
//! delegation; plain diff/patch work uses the default `L = ()`.

use crate::host::HostTree;
use crate::props::Value;
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(pub u32);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ArenaError {
    #[error("unknown node {0:?}")]
    MissingNode(NodeKey),
    #[error("{child:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeKey, child: NodeKey },
    #[error("{0:?} cannot have children")]
    CannotHaveChildren(NodeKey),
    #[error("inserting {child:?} under {parent:?} would create a cycle")]
    Cycle { parent: NodeKey, child: NodeKey },
    #[error("{0:?} is not a text node")]
    NotText(NodeKey),
    #[error("{0:?} is not an element")]
    NotElement(NodeKey),
}

enum NodeKind {
    Element {
        tag: String,
        namespace: Option<String>,
        properties: BTreeMap<String, Value>,
        attributes: BTreeMap<String, Value>,
        nested: BTreeMap<String, BTreeMap<String, Value>>,
    },
    Text {
        text: String,
    },
}

struct NodeRecord<L> {
    kind: NodeKind,
    parent: Option<NodeKey>,
    children: Vec<NodeKey>,
    listeners: Vec<(String, L)>,
}

pub struct ArenaHost<L = ()> {
    nodes: Vec<NodeRecord<L>>,
}

impl ArenaHost {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<L> Default for ArenaHost<L> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

impl<L> ArenaHost<L> {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn record(&self, key: &NodeKey) -> Result<&NodeRecord<L>, ArenaError> {
        self.nodes
            .get(key.0 as usize)
            .ok_or(ArenaError::MissingNode(*key))
    }

    fn record_mut(&mut self, key: &NodeKey) -> Result<&mut NodeRecord<L>, ArenaError> {
        self.nodes
            .get_mut(key.0 as usize)
            .ok_or(ArenaError::MissingNode(*key))
    }

    fn insert(&mut self, kind: NodeKind) -> NodeKey {
        let key = NodeKey(self.nodes.len() as u32);
        self.nodes.push(NodeRecord {
            kind,
            parent: None,
            children: Vec::new(),
            listeners: Vec::new(),
        });
        key
    }

    pub fn tag(&self, node: &NodeKey) -> Option<&str> {
        match &self.record(node).ok()?.kind {
            NodeKind::Element { tag, .. } => Some(tag),
            NodeKind::Text { .. } => None,
        }
    }

    pub fn namespace(&self, node: &NodeKey) -> Option<&str> {
        match &self.record(node).ok()?.kind {
            NodeKind::Element { namespace, .. } => namespace.as_deref(),
            NodeKind::Text { .. } => None,
        }
    }

    pub fn text(&self, node: &NodeKey) -> Option<&str> {
        match &self.record(node).ok()?.kind {
            NodeKind::Text { text } => Some(text),
            NodeKind::Element { .. } => None,
        }
    }

    pub fn property(&self, node: &NodeKey, name: &str) -> Option<&Value> {
        self.properties(node)?.get(name)
    }

    pub fn attribute(&self, node: &NodeKey, name: &str) -> Option<&Value> {
        self.attributes(node)?.get(name)
    }

    pub fn nested(&self, node: &NodeKey, group: &str, name: &str) -> Option<&Value> {
        self.nested_groups(node)?.get(group)?.get(name)
    }

    pub fn properties(&self, node: &NodeKey) -> Option<&BTreeMap<String, Value>> {
        match &self.record(node).ok()?.kind {
            NodeKind::Element { properties, .. } => Some(properties),
            NodeKind::Text { .. } => None,
        }
    }

    pub fn attributes(&self, node: &NodeKey) -> Option<&BTreeMap<String, Value>> {
        match &self.record(node).ok()?.kind {
            NodeKind::Element { attributes, .. } => Some(attributes),
            NodeKind::Text { .. } => None,
        }
    }

    pub fn nested_groups(
        &self,
        node: &NodeKey,
    ) -> Option<&BTreeMap<String, BTreeMap<String, Value>>> {
        match &self.record(node).ok()?.kind {
            NodeKind::Element { nested, .. } => Some(nested),
            NodeKind::Text { .. } => None,
        }
    }

    /// `node` followed by its ancestors up to the detached root.
    pub fn path(&self, node: &NodeKey) -> Vec<NodeKey> {
        let mut path = Vec::new();
        let mut current = Some(*node);
        while let Some(key) = current {
            let Ok(record) = self.record(&key) else {
                break;
            };
            path.push(key);
            current = record.parent;
        }
        path
    }

    pub fn add_listener(
        &mut self,
        node: &NodeKey,
        event: &str,
        listener: L,
    ) -> Result<(), ArenaError> {
        self.record_mut(node)?
            .listeners
            .push((event.to_string(), listener));
        Ok(())
    }

    /// Detach every listener registered on `node` for `event`.
    pub fn remove_listeners(&mut self, node: &NodeKey, event: &str) -> Result<Vec<L>, ArenaError> {
        let record = self.record_mut(node)?;
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut record.listeners)
            .into_iter()
            .partition(|(name, _)| name == event);
        record.listeners = kept;
        Ok(removed.into_iter().map(|(_, listener)| listener).collect())
    }

    pub fn listeners<'a>(&'a self, node: &NodeKey, event: &'a str) -> impl Iterator<Item = &'a L> {
        self.record(node)
            .ok()
            .into_iter()
            .flat_map(|record| record.listeners.iter())
            .filter(move |(name, _)| name == event)
            .map(|(_, listener)| listener)
    }

    fn allows_children(&self, node: &NodeKey) -> Result<(), ArenaError> {
        match self.record(node)?.kind {
            NodeKind::Element { .. } => Ok(()),
            NodeKind::Text { .. } => Err(ArenaError::CannotHaveChildren(*node)),
        }
    }

    fn is_ancestor_or_self(&self, ancestor: &NodeKey, node: &NodeKey) -> bool {
        self.path(node).contains(ancestor)
    }

    fn check_insert(&self, parent: &NodeKey, child: &NodeKey) -> Result<(), ArenaError> {
        self.allows_children(parent)?;
        self.record(child)?;
        if self.is_ancestor_or_self(child, parent) {
            return Err(ArenaError::Cycle {
                parent: *parent,
                child: *child,
            });
        }
        Ok(())
    }

    /// Unlink `child` from its current parent, if any.
    fn detach(&mut self, child: &NodeKey) -> Result<(), ArenaError> {
        let Some(parent) = self.record_mut(child)?.parent.take() else {
            return Ok(());
        };
        self.record_mut(&parent)?.children.retain(|k| k != child);
        Ok(())
    }

    fn element_mut(
        &mut self,
        node: &NodeKey,
    ) -> Result<
        (
            &mut BTreeMap<String, Value>,
            &mut BTreeMap<String, Value>,
            &mut BTreeMap<String, BTreeMap<String, Value>>,
        ),
        ArenaError,
    > {
        match &mut self.record_mut(node)?.kind {
            NodeKind::Element {
                properties,
                attributes,
                nested,
                ..
            } => Ok((properties, attributes, nested)),
            NodeKind::Text { .. } => Err(ArenaError::NotElement(*node)),
        }
    }

    fn matches(&self, node: &NodeKey, selector: &str) -> bool {
        let Ok(record) = self.record(node) else {
            return false;
        };
        let NodeKind::Element {
            tag,
            properties,
            attributes,
            ..
        } = &record.kind
        else {
            return false;
        };
        let lookup = |prop: &str, attr: &str| {
            properties
                .get(prop)
                .or_else(|| attributes.get(attr))
                .map(Value::to_string)
        };
        if let Some(id) = selector.strip_prefix('#') {
            lookup("id", "id").is_some_and(|v| v == id)
        } else if let Some(class) = selector.strip_prefix('.') {
            lookup("className", "class")
                .is_some_and(|v| v.split_whitespace().any(|c| c == class))
        } else {
            tag.eq_ignore_ascii_case(selector)
        }
    }
}

impl<L> HostTree for ArenaHost<L> {
    type Node = NodeKey;
    type Error = ArenaError;

    fn create_element(&mut self, tag: &str, namespace: Option<&str>) -> Result<NodeKey, ArenaError> {
        Ok(self.insert(NodeKind::Element {
            tag: tag.to_string(),
            namespace: namespace.map(str::to_string),
            properties: BTreeMap::new(),
            attributes: BTreeMap::new(),
            nested: BTreeMap::new(),
        }))
    }

    fn create_text(&mut self, text: &str) -> Result<NodeKey, ArenaError> {
        Ok(self.insert(NodeKind::Text {
            text: text.to_string(),
        }))
    }

    fn is_text(&self, node: &NodeKey) -> bool {
        matches!(
            self.record(node).map(|r| &r.kind),
            Ok(NodeKind::Text { .. })
        )
    }

    fn set_text(&mut self, node: &NodeKey, text: &str) -> Result<(), ArenaError> {
        match &mut self.record_mut(node)?.kind {
            NodeKind::Text { text: existing } => {
                existing.clear();
                existing.push_str(text);
                Ok(())
            }
            NodeKind::Element { .. } => Err(ArenaError::NotText(*node)),
        }
    }

    fn set_property(&mut self, node: &NodeKey, name: &str, value: &Value) -> Result<(), ArenaError> {
        let (properties, _, _) = self.element_mut(node)?;
        properties.insert(name.to_string(), value.clone());
        Ok(())
    }

    fn remove_property(&mut self, node: &NodeKey, name: &str) -> Result<(), ArenaError> {
        let (properties, _, _) = self.element_mut(node)?;
        properties.remove(name);
        Ok(())
    }

    fn set_attribute(&mut self, node: &NodeKey, name: &str, value: &Value) -> Result<(), ArenaError> {
        let (_, attributes, _) = self.element_mut(node)?;
        attributes.insert(name.to_string(), value.clone());
        Ok(())
    }

    fn remove_attribute(&mut self, node: &NodeKey, name: &str) -> Result<(), ArenaError> {
        let (_, attributes, _) = self.element_mut(node)?;
        attributes.remove(name);
        Ok(())
    }

    fn set_nested_property(
        &mut self,
        node: &NodeKey,
        group: &str,
        name: &str,
        value: &Value,
    ) -> Result<(), ArenaError> {
        let (_, _, nested) = self.element_mut(node)?;
        nested
            .entry(group.to_string())
            .or_default()
            .insert(name.to_string(), value.clone());
        Ok(())
    }

    fn remove_nested_property(
        &mut self,
        node: &NodeKey,
        group: &str,
        name: &str,
    ) -> Result<(), ArenaError> {
        let (_, _, nested) = self.element_mut(node)?;
        if let Some(entries) = nested.get_mut(group) {
            entries.remove(name);
            if entries.is_empty() {
                nested.remove(group);
            }
        }
        Ok(())
    }

    fn parent(&self, node: &NodeKey) -> Option<NodeKey> {
        self.record(node).ok()?.parent
    }

    fn child_nodes(&self, node: &NodeKey) -> Vec<NodeKey> {
        self.record(node)
            .map(|record| record.children.clone())
            .unwrap_or_default()
    }

    fn append_child(&mut self, parent: &NodeKey, child: &NodeKey) -> Result<(), ArenaError> {
        self.insert_before(parent, child, None)
    }

    fn insert_before(
        &mut self,
        parent: &NodeKey,
        child: &NodeKey,
        reference: Option<&NodeKey>,
    ) -> Result<(), ArenaError> {
        self.check_insert(parent, child)?;
        if let Some(reference) = reference {
            if self.record(reference)?.parent != Some(*parent) || reference == child {
                return Err(ArenaError::NotAChild {
                    parent: *parent,
                    child: *reference,
                });
            }
        }
        self.detach(child)?;
        let siblings = &mut self.record_mut(parent)?.children;
        let at = reference
            .and_then(|r| siblings.iter().position(|k| k == r))
            .unwrap_or(siblings.len());
        siblings.insert(at, *child);
        self.record_mut(child)?.parent = Some(*parent);
        Ok(())
    }

    fn replace_child(
        &mut self,
        parent: &NodeKey,
        old: &NodeKey,
        new: &NodeKey,
    ) -> Result<(), ArenaError> {
        if old == new {
            return Ok(());
        }
        if self.record(old)?.parent != Some(*parent) {
            return Err(ArenaError::NotAChild {
                parent: *parent,
                child: *old,
            });
        }
        self.insert_before(parent, new, Some(old))?;
        self.detach(old)
    }

    fn remove_child(&mut self, parent: &NodeKey, child: &NodeKey) -> Result<(), ArenaError> {
        if self.record(child)?.parent != Some(*parent) {
            return Err(ArenaError::NotAChild {
                parent: *parent,
                child: *child,
            });
        }
        self.detach(child)
    }

    fn query_descendants(&self, node: &NodeKey, selector: &str) -> Vec<NodeKey> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeKey> = self.child_nodes(node).into_iter().rev().collect();
        while let Some(current) = stack.pop() {
            if self.matches(&current, selector) {
                out.push(current);
            }
            stack.extend(self.child_nodes(&current).into_iter().rev());
        }
        out
    }
}
