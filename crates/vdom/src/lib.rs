//! Virtual tree reconciliation.
//!
//! Build immutable virtual trees, `diff` two of them into a position-indexed
//! `PatchSet`, and `apply_patch` that set to a live tree through the
//! `HostTree` primitives. `materialize` builds a live subtree from scratch.

pub mod apply;
pub mod arena;
pub mod diff;
pub mod host;
pub mod index;
pub mod materialize;
pub mod node;
pub mod patch;
pub mod props;
pub mod reorder;
#[cfg(any(test, feature = "dom-snapshot"))]
pub mod snapshot;

pub use apply::apply_patch;
pub use arena::{ArenaError, ArenaHost, NodeKey};
pub use diff::{diff, diff_to_empty};
pub use host::HostTree;
pub use index::locate;
pub use materialize::materialize;
pub use node::{ElementBuilder, Thunk, TreeError, VElement, VNode, Widget, WidgetNode, WidgetUpdate};
pub use patch::{Patch, PatchKind, PatchSet};
pub use props::{ATTRIBUTES, Hook, Prop, PropChange, PropMap, PropPatch, Value};
pub use reorder::{Keyed, MoveInsert, MoveRemove, Moves, Reordered, reorder};
