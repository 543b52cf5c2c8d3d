//! Paint-chunk flattening (§4.6): a depth-first walk of the display list
//! that pairs every leaf item with the ordered list of effect items
//! enclosing it.

use super::display_item::DisplayItem;
use crate::layout::rect::Rect;

#[derive(Clone, Debug)]
pub struct PaintChunk {
    pub leaf: DisplayItem,
    /// Outermost to innermost.
    pub ancestor_effects: Vec<DisplayItem>,
}

impl PaintChunk {
    /// Highest index in `ancestor_effects` whose item needs compositing,
    /// or `-1` if none do (§4.7).
    pub fn composited_ancestor_index(&self, use_compositing: bool) -> i32 {
        self.ancestor_effects
            .iter()
            .enumerate()
            .rev()
            .find(|(_, item)| item.needs_compositing(use_compositing))
            .map(|(i, _)| i as i32)
            .unwrap_or(-1)
    }

    /// The leaf's composited bounds, mapped outer→inner through every
    /// `Transform` ancestor.
    pub fn absolute_bounds(&self, use_compositing: bool) -> Rect {
        let mut rect = self.leaf.composited_bounds(use_compositing);
        for effect in &self.ancestor_effects {
            rect = effect.map(rect);
        }
        rect
    }
}

fn flatten_into(item: &DisplayItem, ancestor_effects: &mut Vec<DisplayItem>, out: &mut Vec<PaintChunk>) {
    match item.cmds() {
        Some(children) => {
            ancestor_effects.push(item.clone());
            for child in children {
                flatten_into(child, ancestor_effects, out);
            }
            ancestor_effects.pop();
        }
        None => out.push(PaintChunk {
            leaf: item.clone(),
            ancestor_effects: ancestor_effects.clone(),
        }),
    }
}

pub fn flatten(items: &[DisplayItem]) -> Vec<PaintChunk> {
    let mut ancestor_effects = Vec::new();
    let mut out = Vec::new();
    for item in items {
        flatten_into(item, &mut ancestor_effects, &mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Color;
    use crate::paint::display_item::{ClipRRect, DrawRect, SaveLayer, Transform};

    fn leaf(x: f32) -> DisplayItem {
        DisplayItem::DrawRect(DrawRect {
            rect: Rect::from_ltrb(x, 0.0, x + 1.0, 1.0),
            color: Color::BLACK,
        })
    }

    #[test]
    fn flatten_preserves_document_order() {
        let tree = vec![leaf(0.0), leaf(1.0), leaf(2.0)];
        let chunks = flatten(&tree);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1].leaf.bounds().left, 1.0);
    }

    #[test]
    fn nested_effects_become_ancestor_effects() {
        let clip = DisplayItem::ClipRRect(ClipRRect {
            rect: Rect::from_ltrb(0.0, 0.0, 10.0, 10.0),
            radius: 0.0,
            cmds: vec![leaf(0.0)],
            noop: false,
        });
        let save_layer = DisplayItem::SaveLayer(SaveLayer {
            paint: Default::default(),
            node: None,
            cmds: vec![clip],
            noop: false,
        });
        let transform = DisplayItem::Transform(Transform {
            dx: 5.0,
            dy: 5.0,
            rect: Rect::from_ltrb(0.0, 0.0, 10.0, 10.0),
            node: None,
            cmds: vec![save_layer],
            noop: false,
        });
        let chunks = flatten(&[transform]);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].ancestor_effects.len(), 2);
        assert_eq!(chunks[0].composited_ancestor_index(true), 0);
        let bounds = chunks[0].absolute_bounds(true);
        assert_eq!(bounds.left, 5.0);
    }
}
