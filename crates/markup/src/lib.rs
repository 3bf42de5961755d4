//! Markup to virtual tree conversion.
//!
//! `domify` tokenizes a markup string and feeds the tokens through a
//! `TreeBuilder`. Known attributes map onto host properties, everything else
//! goes to the `attributes` group, and `svg` subtrees get the SVG namespace.

mod attributes;
mod builder;
mod entities;
mod tokenizer;

pub use attributes::{property_name, translate};
pub use builder::{BuildError, KEY_ATTRIBUTE, SVG_NAMESPACE, TreeBuilder, TreeBuilderConfig};
pub use tokenizer::{Token, is_void_element, tokenize};

use vdom::{HostTree, VNode};

/// Build the virtual tree for `input`. Returns `None` when the input holds
/// no element.
pub fn domify<H: HostTree>(
    input: &str,
    config: &TreeBuilderConfig,
) -> Result<Option<VNode<H>>, BuildError> {
    build_with(TreeBuilder::new(config.clone()), input)
}

/// Feed `input` through an already configured builder.
pub fn build_with<H: HostTree>(
    mut builder: TreeBuilder<H>,
    input: &str,
) -> Result<Option<VNode<H>>, BuildError> {
    let tokens = tokenize(input);
    #[cfg(any(test, feature = "debug-stats"))]
    log::trace!(target: "markup.builder", "{} tokens", tokens.len());
    for token in tokens {
        builder.feed(token)?;
    }
    builder.finish()
}
