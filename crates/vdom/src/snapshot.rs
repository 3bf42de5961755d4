use crate::arena::{ArenaHost, NodeKey};
use crate::host::HostTree;
use crate::props::Value;
use std::collections::BTreeMap;
use std::fmt::{self, Write};

/// Deterministic serialization and equality of a live arena subtree, for
/// tests that compare a patched tree with a freshly materialized one.
/// Not a stable format.
///
/// Equivalence rules:
/// - Node kinds, tags and namespaces must match.
/// - Properties, attributes and nested groups compare as sorted maps.
/// - Text must match exactly.
/// - Node handles are ignored.
#[derive(Clone, Debug, PartialEq)]
pub enum LiveNode {
    Element {
        tag: String,
        namespace: Option<String>,
        properties: BTreeMap<String, Value>,
        attributes: BTreeMap<String, Value>,
        nested: BTreeMap<String, BTreeMap<String, Value>>,
        children: Vec<LiveNode>,
    },
    Text(String),
}

impl LiveNode {
    pub fn capture<L>(host: &ArenaHost<L>, root: &NodeKey) -> Self {
        if let Some(text) = host.text(root) {
            return LiveNode::Text(text.to_string());
        }
        LiveNode::Element {
            tag: host.tag(root).unwrap_or_default().to_string(),
            namespace: host.namespace(root).map(str::to_string),
            properties: host.properties(root).cloned().unwrap_or_default(),
            attributes: host.attributes(root).cloned().unwrap_or_default(),
            nested: host.nested_groups(root).cloned().unwrap_or_default(),
            children: host
                .child_nodes(root)
                .iter()
                .map(|child| LiveNode::capture(host, child))
                .collect(),
        }
    }

    pub fn render(&self) -> String {
        let mut lines = Vec::new();
        walk_snapshot(self, 0, &mut lines);
        lines.join("\n")
    }
}

impl fmt::Display for LiveNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[derive(Debug)]
pub struct LiveMismatch {
    path: String,
    detail: String,
    expected: String,
    actual: String,
}

impl fmt::Display for LiveMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "live tree mismatch at {}: {}", self.path, self.detail)?;
        writeln!(f, "expected subtree:\n{}", self.expected)?;
        writeln!(f, "actual subtree:\n{}", self.actual)?;
        Ok(())
    }
}

impl std::error::Error for LiveMismatch {}

pub fn assert_live_eq(expected: &LiveNode, actual: &LiveNode) {
    if let Err(mismatch) = compare_live(expected, actual) {
        panic!("{mismatch}");
    }
}

pub fn compare_live(expected: &LiveNode, actual: &LiveNode) -> Result<(), Box<LiveMismatch>> {
    let mut path = vec![node_label(expected)];
    compare_nodes(expected, actual, &mut path)
}

fn compare_nodes(
    expected: &LiveNode,
    actual: &LiveNode,
    path: &mut Vec<String>,
) -> Result<(), Box<LiveMismatch>> {
    match (expected, actual) {
        (
            LiveNode::Element {
                tag: expected_tag,
                namespace: expected_ns,
                properties: expected_props,
                attributes: expected_attrs,
                nested: expected_nested,
                children: expected_children,
            },
            LiveNode::Element {
                tag: actual_tag,
                namespace: actual_ns,
                properties: actual_props,
                attributes: actual_attrs,
                nested: actual_nested,
                children: actual_children,
            },
        ) => {
            if expected_tag != actual_tag {
                return Err(mismatch(path, "tag", expected, actual));
            }
            if expected_ns != actual_ns {
                return Err(mismatch(path, "namespace", expected, actual));
            }
            if expected_props != actual_props {
                return Err(mismatch(path, "properties", expected, actual));
            }
            if expected_attrs != actual_attrs {
                return Err(mismatch(path, "attributes", expected, actual));
            }
            if expected_nested != actual_nested {
                return Err(mismatch(path, "nested properties", expected, actual));
            }
            if expected_children.len() != actual_children.len() {
                let detail = format!(
                    "child count (expected {}, actual {})",
                    expected_children.len(),
                    actual_children.len()
                );
                return Err(mismatch(path, &detail, expected, actual));
            }
            for (idx, (exp, act)) in expected_children.iter().zip(actual_children).enumerate() {
                path.push(format!("{}[{}]", node_label(exp), idx));
                let result = compare_nodes(exp, act, path);
                path.pop();
                result?;
            }
            Ok(())
        }
        (LiveNode::Text(expected_text), LiveNode::Text(actual_text)) => {
            if expected_text != actual_text {
                return Err(mismatch(path, "text", expected, actual));
            }
            Ok(())
        }
        _ => Err(mismatch(path, "node kind", expected, actual)),
    }
}

fn mismatch(path: &[String], detail: &str, expected: &LiveNode, actual: &LiveNode) -> Box<LiveMismatch> {
    Box::new(LiveMismatch {
        path: format!("/{}", path.join("/")),
        detail: detail.to_string(),
        expected: expected.render(),
        actual: actual.render(),
    })
}

fn node_label(node: &LiveNode) -> String {
    match node {
        LiveNode::Element {
            tag,
            properties,
            attributes,
            ..
        } => {
            let mut label = tag.clone();
            let id = properties.get("id").or_else(|| attributes.get("id"));
            if let Some(id) = id {
                label.push('#');
                write_escaped(&mut label, &id.to_string());
            }
            label
        }
        LiveNode::Text(_) => "#text".to_string(),
    }
}

fn walk_snapshot(node: &LiveNode, depth: usize, out: &mut Vec<String>) {
    const INDENT_STEP: usize = 2;
    let mut line = " ".repeat(depth * INDENT_STEP);
    match node {
        LiveNode::Element {
            tag,
            namespace,
            properties,
            attributes,
            nested,
            children,
        } => {
            line.push('<');
            line.push_str(tag);
            if let Some(ns) = namespace {
                line.push_str(" xmlns=\"");
                write_escaped(&mut line, ns);
                line.push('"');
            }
            for (name, value) in properties {
                write_entry(&mut line, ".", name, value);
            }
            for (name, value) in attributes {
                write_entry(&mut line, "", name, value);
            }
            for (group, entries) in nested {
                for (name, value) in entries {
                    write_entry(&mut line, &format!("{group}."), name, value);
                }
            }
            line.push('>');
            out.push(line);
            for child in children {
                walk_snapshot(child, depth + 1, out);
            }
        }
        LiveNode::Text(text) => {
            line.push('"');
            write_escaped(&mut line, text);
            line.push('"');
            out.push(line);
        }
    }
}

fn write_entry(out: &mut String, prefix: &str, name: &str, value: &Value) {
    out.push(' ');
    out.push_str(prefix);
    out.push_str(name);
    out.push_str("=\"");
    write_escaped(out, &value.to_string());
    out.push('"');
}

fn write_escaped(out: &mut String, value: &str) {
    for ch in value.chars() {
        match ch {
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            _ if ch.is_ascii() => out.push(ch),
            _ => {
                let _ = write!(out, "\\u{{{:X}}}", ch as u32);
            }
        }
    }
}
