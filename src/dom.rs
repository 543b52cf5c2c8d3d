//! DOM node representation (§3).
//!
//! Children are owned exclusively by their parent; the parent back-edge is
//! a non-owning [`Weak`] reference, matching the "trees own downward, all
//! backward edges are weak" guidance. A node additionally caches the
//! composited `Transform`/`SaveLayer` display items produced for it the
//! last time it painted with `needs_compositing() == true`, used to apply
//! composited_updates without a full repaint.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::paint::display_item::DisplayItem;

pub type StyleMap = HashMap<String, String>;

#[derive(Debug)]
pub struct Node {
    pub tag: String,
    pub attributes: HashMap<String, String>,
    pub children: RefCell<Vec<NodeRef>>,
    pub parent: RefCell<Weak<Node>>,
    pub computed_style: RefCell<StyleMap>,
    pub is_text: bool,
    pub text: RefCell<String>,
    /// An `<input>`'s current contents, separate from its `value`
    /// attribute so that focusing and typing don't need a mutable
    /// attribute map (§4.11: focusing an input clears it).
    pub value: RefCell<String>,
    /// Cached composited effect items, populated by `paint_visual_effects`
    /// whenever either needs compositing; read back by the compositor's
    /// incremental-update path (§4.7).
    pub transform: RefCell<Option<DisplayItem>>,
    pub save_layer: RefCell<Option<DisplayItem>>,
}

/// A strong, ref-counted handle to a DOM node. Equality and hashing are by
/// pointer identity, which is what selector matching and the JS host's
/// handle table need.
#[derive(Debug, Clone)]
pub struct NodeRef(pub Rc<Node>);

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for NodeRef {}

impl std::hash::Hash for NodeRef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (Rc::as_ptr(&self.0) as usize).hash(state);
    }
}

/// A non-owning handle to a node, used anywhere a back-edge would
/// otherwise create a reference cycle (display items reference the node
/// that produced them; the node caches display items back).
#[derive(Debug, Clone)]
pub struct NodeWeak(pub Weak<Node>);

impl NodeWeak {
    pub fn upgrade(&self) -> Option<NodeRef> {
        self.0.upgrade().map(NodeRef)
    }
}

impl PartialEq for NodeWeak {
    fn eq(&self, other: &Self) -> bool {
        self.0.ptr_eq(&other.0)
    }
}

impl NodeRef {
    pub fn new_element(tag: &str, attributes: HashMap<String, String>) -> Self {
        let value = attributes.get("value").cloned().unwrap_or_default();
        NodeRef(Rc::new(Node {
            tag: tag.to_owned(),
            attributes,
            children: RefCell::new(Vec::new()),
            parent: RefCell::new(Weak::new()),
            computed_style: RefCell::new(HashMap::new()),
            is_text: false,
            text: RefCell::new(String::new()),
            value: RefCell::new(value),
            transform: RefCell::new(None),
            save_layer: RefCell::new(None),
        }))
    }

    pub fn new_text(text: &str) -> Self {
        NodeRef(Rc::new(Node {
            tag: "#text".to_owned(),
            attributes: HashMap::new(),
            children: RefCell::new(Vec::new()),
            parent: RefCell::new(Weak::new()),
            computed_style: RefCell::new(HashMap::new()),
            is_text: true,
            text: RefCell::new(text.to_owned()),
            value: RefCell::new(String::new()),
            transform: RefCell::new(None),
            save_layer: RefCell::new(None),
        }))
    }

    pub fn append_child(&self, child: NodeRef) {
        *child.0.parent.borrow_mut() = Rc::downgrade(&self.0);
        self.0.children.borrow_mut().push(child);
    }

    pub fn parent(&self) -> Option<NodeRef> {
        self.0.parent.borrow().upgrade().map(NodeRef)
    }

    pub fn children(&self) -> Vec<NodeRef> {
        self.0.children.borrow().clone()
    }

    pub fn downgrade(&self) -> NodeWeak {
        NodeWeak(Rc::downgrade(&self.0))
    }

    /// Stable identity for this node's lifetime, used as the node half of
    /// the animation map's `(node, property)` key (§3).
    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    pub fn style(&self, name: &str) -> Option<String> {
        self.0.computed_style.borrow().get(name).cloned()
    }

    pub fn style_or(&self, name: &str, default: &str) -> String {
        self.style(name).unwrap_or_else(|| default.to_owned())
    }

    /// Depth-first pre-order walk of `self` and its descendants, as used
    /// throughout style and layout (the original's `tree_to_list`).
    pub fn tree_to_list(&self) -> Vec<NodeRef> {
        let mut out = vec![self.clone()];
        for child in self.children() {
            out.extend(child.tree_to_list());
        }
        out
    }
}
