//! Views over the virtual tree engine.
//!
//! A `View` mounts a tree built from markup into a live parent and reconciles
//! it on each update. Event handling is delegated from the view's root
//! element through the `event-mappable` hook.

pub mod events;
pub mod view;

pub use events::{EVENT_HOOK, Event, EventDelegate, EventSource, HandlerSpec, Host, Listener, dispatch};
pub use markup::TreeBuilderConfig;
pub use view::{Tree, View, ViewError, domify};
