//! Host-tree primitive interface.
//!
//! The engine never owns live nodes. It creates, mutates and moves them only
//! through these primitives, which the caller's environment implements.
//!
//! Contract:
//! - `Node` is a cheap handle; clones refer to the same live node and compare
//!   equal.
//! - `child_nodes` returns children in document order and must reflect every
//!   mutation made through this trait.
//! - `parent` returns `None` for detached nodes and for the root.
//! - Primitive failures are returned as `Self::Error` and propagated to the
//!   caller unchanged.

use crate::props::Value;
use std::fmt;

pub trait HostTree {
    type Node: Clone + PartialEq + fmt::Debug;
    type Error: std::error::Error + 'static;

    fn create_element(
        &mut self,
        tag: &str,
        namespace: Option<&str>,
    ) -> Result<Self::Node, Self::Error>;

    fn create_text(&mut self, text: &str) -> Result<Self::Node, Self::Error>;

    fn is_text(&self, node: &Self::Node) -> bool;

    /// Replace the payload of a live text node.
    fn set_text(&mut self, node: &Self::Node, text: &str) -> Result<(), Self::Error>;

    fn set_property(
        &mut self,
        node: &Self::Node,
        name: &str,
        value: &Value,
    ) -> Result<(), Self::Error>;

    fn remove_property(&mut self, node: &Self::Node, name: &str) -> Result<(), Self::Error>;

    fn set_attribute(
        &mut self,
        node: &Self::Node,
        name: &str,
        value: &Value,
    ) -> Result<(), Self::Error>;

    fn remove_attribute(&mut self, node: &Self::Node, name: &str) -> Result<(), Self::Error>;

    /// Write one entry of a nested property object (for example `style.color`).
    fn set_nested_property(
        &mut self,
        node: &Self::Node,
        group: &str,
        name: &str,
        value: &Value,
    ) -> Result<(), Self::Error>;

    fn remove_nested_property(
        &mut self,
        node: &Self::Node,
        group: &str,
        name: &str,
    ) -> Result<(), Self::Error>;

    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

    fn child_nodes(&self, node: &Self::Node) -> Vec<Self::Node>;

    fn append_child(&mut self, parent: &Self::Node, child: &Self::Node)
    -> Result<(), Self::Error>;

    /// Insert `child` before `reference`, or append when `reference` is `None`.
    fn insert_before(
        &mut self,
        parent: &Self::Node,
        child: &Self::Node,
        reference: Option<&Self::Node>,
    ) -> Result<(), Self::Error>;

    fn replace_child(
        &mut self,
        parent: &Self::Node,
        old: &Self::Node,
        new: &Self::Node,
    ) -> Result<(), Self::Error>;

    fn remove_child(&mut self, parent: &Self::Node, child: &Self::Node)
    -> Result<(), Self::Error>;

    /// Live descendants of `node` matching a selector-like key.
    ///
    /// Only the event-delegation collaborator uses this; diff and patch never do.
    fn query_descendants(&self, node: &Self::Node, selector: &str) -> Vec<Self::Node>;
}
