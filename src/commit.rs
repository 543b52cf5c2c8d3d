//! `CommitData` (§3, §4.9): the only value that crosses from the main
//! thread to the compositor thread. Immutable and move-only by
//! convention — nothing here is ever mutated once a `Tab` hands it off.

use crate::dom::NodeWeak;
use crate::paint::display_item::DisplayItem;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScrollBehavior {
    Smooth,
    Auto,
}

/// One `(node, transform, save_layer)` composited effect update, applied
/// by the compositor without a re-raster (§4.7).
#[derive(Clone, Debug)]
pub struct CompositedUpdate {
    pub node: NodeWeak,
    pub transform: DisplayItem,
    pub save_layer: DisplayItem,
}

#[derive(Clone, Debug)]
pub struct CommitData {
    pub url: String,
    pub scroll: Option<f32>,
    pub document_height: f32,
    pub display_list: Option<Vec<DisplayItem>>,
    pub composited_updates: Vec<CompositedUpdate>,
    pub scroll_behavior: ScrollBehavior,
}

// SAFETY: a `CommitData` crosses from a tab's worker thread to the
// compositor thread exactly once per commit, through `CommitMailbox`'s
// mutex. That mutex's happens-before edge is what makes handing off the
// `Rc`-based `NodeWeak` fields here (via `DisplayItem`/`CompositedUpdate`)
// sound despite their non-atomic refcounts: the sending thread never
// touches this value again after `commit()`, and the receiving thread
// only ever observes it after acquiring the same lock.
unsafe impl Send for CommitData {}

/// A single-slot handoff between one `Tab` and the `Browser`, used
/// instead of repeated lock acquisitions on the whole browser object
/// (design notes, "shared mutable state across threads"). A commit
/// overwrites whatever the browser hasn't yet consumed.
#[derive(Default)]
pub struct CommitMailbox {
    slot: std::sync::Mutex<Option<CommitData>>,
}

impl CommitMailbox {
    pub fn commit(&self, data: CommitData) {
        *self.slot.lock().unwrap() = Some(data);
    }

    pub fn take(&self) -> Option<CommitData> {
        self.slot.lock().unwrap().take()
    }
}
