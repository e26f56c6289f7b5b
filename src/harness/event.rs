//! Lifecycle events emitted by harness nodes.

use std::cell::RefCell;
use std::rc::Rc;

use nestrun_core::Outcome;

use super::Harness;

/// Something observable happened on a node.
///
/// Listeners receive the emitting node alongside the event.
#[derive(Debug, Clone)]
pub enum Event {
    /// The node was granted control by its parent; its body runs right after this.
    Ready,
    /// An outcome was recorded directly on the node (merges from children are reported as `ChildEnd`).
    Outcome(Outcome),
    /// A child finished and its results were merged into this node.
    ChildEnd(Harness),
    /// The node bailed out.
    Bailout(String),
    /// The node completed. Never emitted after a bailout.
    End,
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Ready => "ready",
            Event::Outcome(_) => "outcome",
            Event::ChildEnd(_) => "child_end",
            Event::Bailout(_) => "bailout",
            Event::End => "end",
        }
    }
}

pub(crate) type Listener = Rc<RefCell<dyn FnMut(&Harness, &Event)>>;
