//! Stack-based virtual tree construction from open-tag, text and close-tag
//! events.
//!
//! All build state lives on the `TreeBuilder` value; nothing is shared between
//! builds. Close tags implicitly close any elements still open above their
//! match. Elements left open at `finish` are closed in order.
//!
//! Malformed structure is tolerated: text outside any element and close tags
//! with no open match are dropped, and when the input holds several top-level
//! elements the last one completed becomes the root.

use crate::attributes::translate;
use crate::tokenizer::Token;
use vdom::{ElementBuilder, HostTree, Prop, TreeError, VNode};

pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

/// Attribute taken as the element's reconciliation key instead of being
/// written to the host.
pub const KEY_ATTRIBUTE: &str = "key";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeBuilderConfig {
    /// Drop text that is whitespace only.
    pub skip_whitespace_text: bool,
    /// Trim surrounding whitespace from text.
    pub trim_text: bool,
    /// Lowercase tag and attribute names.
    pub lowercase_tags: bool,
    /// Namespace for `svg` and everything inside it.
    pub svg_namespace: String,
}

impl Default for TreeBuilderConfig {
    fn default() -> Self {
        Self {
            skip_whitespace_text: true,
            trim_text: true,
            lowercase_tags: true,
            svg_namespace: SVG_NAMESPACE.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BuildError {
    #[error(transparent)]
    Tree(#[from] TreeError),
}

struct OpenElement<H: HostTree> {
    tag: String,
    svg: bool,
    element: ElementBuilder<H>,
}

pub struct TreeBuilder<H: HostTree> {
    config: TreeBuilderConfig,
    root_hook: Option<(String, Prop<H>)>,
    open: Vec<OpenElement<H>>,
    root: Option<VNode<H>>,
}

impl<H: HostTree> TreeBuilder<H> {
    pub fn new(config: TreeBuilderConfig) -> Self {
        Self {
            config,
            root_hook: None,
            open: Vec::new(),
            root: None,
        }
    }

    /// Attach `prop` under `name` to the root element of the built tree.
    pub fn with_root_hook(mut self, name: impl Into<String>, prop: Prop<H>) -> Self {
        self.root_hook = Some((name.into(), prop));
        self
    }

    pub fn config(&self) -> &TreeBuilderConfig {
        &self.config
    }

    fn in_svg(&self) -> bool {
        self.open.last().is_some_and(|el| el.svg)
    }

    fn normalise(&self, name: &str) -> String {
        if self.config.lowercase_tags {
            name.to_ascii_lowercase()
        } else {
            name.to_string()
        }
    }

    pub fn open_tag(
        &mut self,
        name: &str,
        attributes: impl IntoIterator<Item = (String, Option<String>)>,
    ) -> Result<(), BuildError> {
        let tag = self.normalise(name);
        let svg = self.in_svg() || tag.eq_ignore_ascii_case("svg");

        let mut key = None;
        let attributes = attributes
            .into_iter()
            .map(|(name, value)| (self.normalise(&name), value))
            .filter_map(|(name, value)| {
                if name == KEY_ATTRIBUTE {
                    key = value;
                    return None;
                }
                Some((name, value))
            })
            .collect::<Vec<_>>();

        let mut element = ElementBuilder::new(tag.clone()).properties(translate(attributes, svg));
        if svg {
            element = element.namespace(self.config.svg_namespace.clone());
        }
        if let Some(key) = key {
            element = element.key(key);
        }
        if self.open.is_empty() {
            if let Some((name, prop)) = &self.root_hook {
                element = element.prop(name.clone(), prop.clone());
            }
        }
        self.open.push(OpenElement { tag, svg, element });
        Ok(())
    }

    pub fn text(&mut self, text: &str) -> Result<(), BuildError> {
        if self.config.skip_whitespace_text && text.trim().is_empty() {
            return Ok(());
        }
        let text = if self.config.trim_text {
            text.trim()
        } else {
            text
        };
        let Some(parent) = self.open.pop() else {
            log::debug!(target: "markup.builder", "dropping text outside any element: {text:?}");
            return Ok(());
        };
        self.open.push(OpenElement {
            element: parent.element.text(text),
            ..parent
        });
        Ok(())
    }

    pub fn close_tag(&mut self, name: &str) -> Result<(), BuildError> {
        let Some(depth) = self
            .open
            .iter()
            .rposition(|el| el.tag.eq_ignore_ascii_case(name))
        else {
            log::debug!(
                target: "markup.builder",
                "ignoring </{name}> with no open match (innermost open: {:?})",
                self.open.last().map(|el| el.tag.as_str())
            );
            return Ok(());
        };
        while self.open.len() > depth {
            self.close_innermost()?;
        }
        Ok(())
    }

    fn close_innermost(&mut self) -> Result<(), BuildError> {
        let Some(closed) = self.open.pop() else {
            return Ok(());
        };
        let node = closed.element.build()?;
        match self.open.pop() {
            Some(parent) => self.open.push(OpenElement {
                element: parent.element.child(node),
                ..parent
            }),
            None => {
                if let Some(previous) = self.root.replace(node) {
                    log::debug!(
                        target: "markup.builder",
                        "top-level element replaces earlier root {:?}",
                        previous.as_element().map(|el| el.tag.as_str())
                    );
                }
            }
        }
        Ok(())
    }

    pub fn feed(&mut self, token: Token) -> Result<(), BuildError> {
        match token {
            Token::StartTag {
                name,
                attributes,
                self_closing,
            } => {
                self.open_tag(&name, attributes)?;
                if self_closing {
                    self.close_innermost()?;
                }
                Ok(())
            }
            Token::EndTag(name) => self.close_tag(&name),
            Token::Text(text) => self.text(&text),
            Token::Comment(_) => Ok(()),
        }
    }

    /// Close anything still open and return the root, if one was built.
    pub fn finish(mut self) -> Result<Option<VNode<H>>, BuildError> {
        if !self.open.is_empty() {
            log::debug!(
                target: "markup.builder",
                "closing {} element(s) left open at end of input",
                self.open.len()
            );
        }
        while !self.open.is_empty() {
            self.close_innermost()?;
        }
        Ok(self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;
    use vdom::{ATTRIBUTES, ArenaError, ArenaHost, Hook, NodeKey, Value};

    type Node = VNode<ArenaHost>;

    fn build(input: &str) -> Result<Option<Node>, BuildError> {
        build_with(input, TreeBuilderConfig::default())
    }

    fn build_with(input: &str, config: TreeBuilderConfig) -> Result<Option<Node>, BuildError> {
        let mut builder = TreeBuilder::new(config);
        for token in tokenize(input) {
            builder.feed(token)?;
        }
        builder.finish()
    }

    fn root(input: &str) -> Node {
        build(input)
            .expect("build failed")
            .expect("expected a root element")
    }

    struct Noop;

    impl Hook<ArenaHost> for Noop {
        fn hook(
            &self,
            _host: &mut ArenaHost,
            _node: &NodeKey,
            _name: &str,
            _previous: Option<&Prop<ArenaHost>>,
        ) -> Result<(), ArenaError> {
            Ok(())
        }
    }

    #[test]
    fn builds_nested_elements_with_trimmed_text() {
        let tree = root("<div>\n  <p> hello </p>\n  <p>world</p>\n</div>");
        let div = tree.as_element().expect("element");
        assert_eq!(div.tag, "div");
        assert_eq!(div.children.len(), 2);
        let first = div.children[0].as_element().expect("element");
        assert!(matches!(&first.children[0], VNode::Text(t) if &**t == "hello"));
        assert_eq!(tree.count(), 4);
    }

    #[test]
    fn text_handling_follows_config() {
        let config = TreeBuilderConfig {
            skip_whitespace_text: false,
            trim_text: false,
            ..TreeBuilderConfig::default()
        };
        let tree = build_with("<p> a <b>b</b> </p>", config)
            .expect("build failed")
            .expect("expected a root element");
        let p = tree.as_element().expect("element");
        assert_eq!(p.children.len(), 3);
        assert!(matches!(&p.children[0], VNode::Text(t) if &**t == " a "));
    }

    #[test]
    fn tags_and_attributes_are_lowercased() {
        let tree = root("<DIV CLASS=x Data-Role=y></DIV>");
        let div = tree.as_element().expect("element");
        assert_eq!(div.tag, "div");
        assert!(matches!(
            div.properties.get("className"),
            Some(Prop::Value(v)) if *v == Value::from("x")
        ));
        let Some(Prop::Map(group)) = div.properties.get(ATTRIBUTES) else {
            panic!("expected attribute group");
        };
        assert!(group.contains_key("data-role"));
    }

    #[test]
    fn key_attribute_becomes_element_key() {
        let tree = root("<ul><li key=a>A</li><li key=b>B</li></ul>");
        let ul = tree.as_element().expect("element");
        assert_eq!(ul.children[0].key(), Some("a"));
        assert_eq!(ul.children[1].key(), Some("b"));
        let li = ul.children[0].as_element().expect("element");
        assert!(li.properties.get(ATTRIBUTES).is_none());
    }

    #[test]
    fn duplicate_keys_fail_the_build() {
        let err = build("<ul><li key=a></li><li key=a></li></ul>").expect_err("expected error");
        assert!(matches!(err, BuildError::Tree(TreeError::DuplicateKey { .. })));
    }

    #[test]
    fn svg_subtree_gets_namespace_and_attributes() {
        let tree = root("<div><svg class=icon><circle r=4 /></svg><span class=x></span></div>");
        let div = tree.as_element().expect("element");
        assert_eq!(div.namespace, None);
        let svg = div.children[0].as_element().expect("element");
        assert_eq!(svg.namespace.as_deref(), Some(SVG_NAMESPACE));
        assert!(svg.properties.get("className").is_none());
        let circle = svg.children[0].as_element().expect("element");
        assert_eq!(circle.namespace.as_deref(), Some(SVG_NAMESPACE));
        let span = div.children[1].as_element().expect("element");
        assert_eq!(span.namespace, None);
        assert!(span.properties.get("className").is_some());
    }

    #[test]
    fn root_hook_is_attached_to_root_only() {
        let mut builder = TreeBuilder::<ArenaHost>::new(TreeBuilderConfig::default())
            .with_root_hook("event-mappable", Prop::hook(Noop));
        for token in tokenize("<main><button>go</button></main>") {
            builder.feed(token).expect("feed failed");
        }
        let tree = builder
            .finish()
            .expect("build failed")
            .expect("expected a root element");
        let main = tree.as_element().expect("element");
        assert!(main.has_hooks());
        let button = main.children[0].as_element().expect("element");
        assert!(!button.has_hooks());
    }

    #[test]
    fn close_tag_closes_intervening_elements() {
        let tree = root("<div><p><b>x</div>");
        let div = tree.as_element().expect("element");
        let p = div.children[0].as_element().expect("element");
        assert_eq!(p.children.len(), 1);
    }

    #[test]
    fn unclosed_elements_are_closed_at_finish() {
        let tree = root("<div><p>x");
        assert_eq!(tree.count(), 2);
    }

    #[test]
    fn stray_close_tags_are_ignored() {
        let tree = root("<div>a</span>b</div>");
        let div = tree.as_element().expect("element");
        assert_eq!(div.children.len(), 2);
        assert!(matches!(&div.children[1], VNode::Text(t) if &**t == "b"));
        assert!(build("</p>").expect("build failed").is_none());
    }

    #[test]
    fn text_outside_elements_is_dropped() {
        assert!(build("hello").expect("build failed").is_none());
        let tree = root("lead <div>a</div>\n trailing text");
        assert_eq!(tree.count(), 1);
        assert!(build("  <!-- nothing -->  ").expect("build failed").is_none());
    }

    #[test]
    fn last_top_level_element_becomes_root() {
        let tree = root("<p>x</p><section>y</section>");
        let section = tree.as_element().expect("element");
        assert_eq!(section.tag, "section");
        assert!(matches!(&section.children[0], VNode::Text(t) if &**t == "y"));
    }

    #[test]
    fn root_hook_follows_each_top_level_element() {
        let mut builder = TreeBuilder::<ArenaHost>::new(TreeBuilderConfig::default())
            .with_root_hook("event-mappable", Prop::hook(Noop));
        for token in tokenize("<p>x</p><p>y</p>") {
            builder.feed(token).expect("feed failed");
        }
        let tree = builder
            .finish()
            .expect("build failed")
            .expect("expected a root element");
        assert!(tree.as_element().expect("element").has_hooks());
    }
}
