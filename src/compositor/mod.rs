//! Composited layers and the raster/draw split (§4.7).

use crate::canvas::{Canvas, Surface};
use crate::dom::NodeWeak;
use crate::layout::rect::Rect;
use crate::paint::chunk::PaintChunk;
use crate::paint::display_item::DisplayItem;

/// Tracks which stages of `composite_raster_and_draw` still need to run
/// (design notes, §4.7's state machine). Setting a coarser flag implies
/// every finer one.
#[derive(Clone, Copy, Debug, Default)]
pub struct CompositorFlags {
    pub needs_composite: bool,
    pub needs_raster: bool,
    pub needs_draw: bool,
}

impl CompositorFlags {
    pub fn set_needs_composite(&mut self) {
        self.needs_composite = true;
        self.needs_raster = true;
        self.needs_draw = true;
    }

    pub fn set_needs_raster(&mut self) {
        self.needs_raster = true;
        self.needs_draw = true;
    }

    pub fn set_needs_draw(&mut self) {
        self.needs_draw = true;
    }

    pub fn clear(&mut self) {
        *self = CompositorFlags::default();
    }
}

pub struct CompositedLayer {
    pub chunks: Vec<PaintChunk>,
    pub composited_ancestor_index: i32,
    pub absolute_bounds: Rect,
    pub surface: Option<Box<dyn Surface>>,
}

impl CompositedLayer {
    fn empty() -> Self {
        CompositedLayer {
            chunks: Vec::new(),
            composited_ancestor_index: -1,
            absolute_bounds: Rect::empty(),
            surface: None,
        }
    }

    /// `composited_ancestor_index` equality is necessary but not
    /// sufficient: two same-depth siblings each wrapped in their own
    /// composited `Transform` land at the same numeric index, but are not
    /// the same composited ancestor. Tie-break on the owning node of the
    /// item actually found at that index.
    fn can_merge(&self, chunk: &PaintChunk, use_compositing: bool) -> bool {
        if self.chunks.is_empty() {
            return true;
        }
        let their_index = chunk.composited_ancestor_index(use_compositing);
        if self.composited_ancestor_index != their_index {
            return false;
        }
        if their_index < 0 {
            return true;
        }
        let mine = self.chunks[0].ancestor_effects[self.composited_ancestor_index as usize].node();
        let theirs = chunk.ancestor_effects[their_index as usize].node();
        mine == theirs
    }

    fn add_chunk(&mut self, chunk: PaintChunk, use_compositing: bool) {
        if self.chunks.is_empty() {
            self.composited_ancestor_index = chunk.composited_ancestor_index(use_compositing);
        }
        self.absolute_bounds.join(chunk.absolute_bounds(use_compositing));
        self.chunks.push(chunk);
        self.surface = None;
    }

    /// The composited effect items enclosing this layer's chunks, used by
    /// the incremental-update path to locate replay targets.
    pub fn composited_items(&self, use_compositing: bool) -> Vec<&DisplayItem> {
        self.chunks
            .iter()
            .flat_map(|c| c.ancestor_effects.iter())
            .filter(|item| item.needs_compositing(use_compositing))
            .collect()
    }

    /// Rasters every chunk into a fresh offscreen surface sized to the
    /// layer's bounds, replaying only the ancestor effects that are *not*
    /// composited (§4.7's raster rule).
    pub fn raster(&mut self, use_compositing: bool, make_surface: &dyn Fn(u32, u32) -> Box<dyn Surface>) {
        let bounds = self.absolute_bounds.round_out();
        let mut surface = make_surface(bounds.width().max(1.0) as u32, bounds.height().max(1.0) as u32);
        {
            let canvas = surface.get_canvas();
            canvas.translate(-bounds.left, -bounds.top);
            for chunk in &self.chunks {
                let cai = chunk.composited_ancestor_index(use_compositing);
                let start = (cai + 1) as usize;
                replay(&chunk.ancestor_effects[start..], &chunk.leaf, canvas);
            }
            canvas.translate(bounds.left, bounds.top);
        }
        self.surface = Some(surface);
    }

    /// Draws this layer onto `canvas`, replaying the composited ancestor
    /// effects (index `0..=composited_ancestor_index`) around blitting the
    /// raster surface (§4.7's draw rule).
    pub fn draw(&mut self, canvas: &mut dyn Canvas, draw_offset: (f32, f32), use_compositing: bool) {
        let bounds = self.absolute_bounds.round_out();
        let composited_effects: Vec<DisplayItem> = self
            .chunks
            .first()
            .map(|c| {
                let end = (self.composited_ancestor_index + 1).max(0) as usize;
                c.ancestor_effects[..end].to_vec()
            })
            .unwrap_or_default();
        let _ = use_compositing;
        draw_with_effects(&composited_effects, canvas, &mut |canvas| {
            if let Some(surface) = &mut self.surface {
                surface.draw(canvas, bounds.left + draw_offset.0, bounds.top + draw_offset.1);
            }
        });
    }
}

fn replay(effects: &[DisplayItem], leaf: &DisplayItem, canvas: &mut dyn Canvas) {
    match effects.split_first() {
        Some((outer, rest)) => wrap_one(outer, canvas, &mut |canvas| replay(rest, leaf, canvas)),
        None => leaf.execute(canvas),
    }
}

fn draw_with_effects(effects: &[DisplayItem], canvas: &mut dyn Canvas, inner: &mut dyn FnMut(&mut dyn Canvas)) {
    match effects.split_first() {
        Some((outer, rest)) => wrap_one(outer, canvas, &mut |canvas| draw_with_effects(rest, canvas, inner)),
        None => inner(canvas),
    }
}

fn wrap_one(effect: &DisplayItem, canvas: &mut dyn Canvas, inner: &mut dyn FnMut(&mut dyn Canvas)) {
    use crate::paint::display_item::DisplayItem::*;
    match effect {
        ClipRRect(c) if !c.noop => {
            canvas.save();
            canvas.clip_rrect(c.rect, c.radius);
            inner(canvas);
            canvas.restore();
        }
        SaveLayer(s) if !s.noop => {
            canvas.save_layer(s.paint);
            inner(canvas);
            canvas.restore();
        }
        Transform(t) if !t.noop => {
            canvas.save();
            canvas.translate(t.dx, t.dy);
            inner(canvas);
            canvas.restore();
        }
        _ => inner(canvas),
    }
}

/// Layer assignment on a full composite (§4.7). Scans newest-to-oldest
/// and stops at the first layer that either merges or whose bounds
/// overlap the chunk, so an older, node-identity-matching layer is never
/// reached past an intervening layer it would visually collide with
/// (`examples/original_source/src/lab13.py:1736-1751`); this is what
/// keeps overlapping content in document paint order (§8's "Overlap
/// respects paint order").
pub fn assign_layers(chunks: Vec<PaintChunk>, use_compositing: bool) -> Vec<CompositedLayer> {
    let mut layers: Vec<CompositedLayer> = Vec::new();
    for chunk in chunks {
        let chunk_bounds = chunk.absolute_bounds(use_compositing);
        let mut merge_index = None;
        for (i, layer) in layers.iter().enumerate().rev() {
            if layer.can_merge(&chunk, use_compositing) {
                merge_index = Some(i);
                break;
            }
            if layer.absolute_bounds.intersects(&chunk_bounds) {
                break;
            }
        }
        match merge_index {
            Some(i) => layers[i].add_chunk(chunk, use_compositing),
            None => {
                let mut layer = CompositedLayer::empty();
                layer.add_chunk(chunk, use_compositing);
                layers.push(layer);
            }
        }
    }
    layers
}

/// Applies one `(node, transform, save_layer)` composited update across
/// every layer's matching ancestor effect items, in place, with no
/// re-raster (§4.7's incremental-update rule).
pub fn apply_composited_update(
    layers: &mut [CompositedLayer],
    node: &NodeWeak,
    transform_item: Option<&DisplayItem>,
    save_layer_item: Option<&DisplayItem>,
) {
    for layer in layers.iter_mut() {
        for chunk in layer.chunks.iter_mut() {
            for effect in chunk.ancestor_effects.iter_mut() {
                match effect {
                    DisplayItem::Transform(t) if t.node.as_ref() == Some(node) => {
                        if let Some(DisplayItem::Transform(new_t)) = transform_item {
                            t.dx = new_t.dx;
                            t.dy = new_t.dy;
                            t.noop = new_t.noop;
                        }
                    }
                    DisplayItem::SaveLayer(s) if s.node.as_ref() == Some(node) => {
                        if let Some(DisplayItem::SaveLayer(new_s)) = save_layer_item {
                            s.paint = new_s.paint;
                            s.noop = new_s.noop;
                        }
                    }
                    _ => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Color;
    use crate::dom::NodeRef;
    use crate::paint::display_item::{DrawRect, Transform};
    use std::collections::HashMap;

    fn leaf_chunk(x: f32, node: Option<&NodeRef>) -> PaintChunk {
        let transform = DisplayItem::Transform(Transform {
            dx: x,
            dy: 0.0,
            rect: Rect::from_ltrb(x, 0.0, x + 10.0, 10.0),
            node: node.map(|n| n.downgrade()),
            cmds: vec![],
            noop: node.is_none(),
        });
        PaintChunk {
            leaf: DisplayItem::DrawRect(DrawRect {
                rect: Rect::from_ltrb(x, 0.0, x + 10.0, 10.0),
                color: Color::BLACK,
            }),
            ancestor_effects: vec![transform],
        }
    }

    #[test]
    fn equal_ancestor_index_chunks_merge_into_one_layer() {
        let chunks = vec![leaf_chunk(0.0, None), leaf_chunk(0.0, None)];
        let layers = assign_layers(chunks, true);
        assert_eq!(layers.len(), 1);
        assert_eq!(layers[0].chunks.len(), 2);
    }

    #[test]
    fn same_composited_node_merges_even_when_bounds_overlap() {
        let node = NodeRef::new_element("div", HashMap::new());
        let a = leaf_chunk(0.0, Some(&node));
        let b = leaf_chunk(5.0, Some(&node));
        let layers = assign_layers(vec![a, b], true);
        assert_eq!(layers.len(), 1);
    }

    /// An uncomposited chunk whose bounds are exactly `rect`, independent
    /// of any transform (the transform is a noop and `map` is then the
    /// identity), for tests that need overlap without a composited node.
    fn uncomposited_chunk_at(rect: Rect) -> PaintChunk {
        PaintChunk {
            leaf: DisplayItem::DrawRect(DrawRect { rect, color: Color::BLACK }),
            ancestor_effects: vec![DisplayItem::Transform(Transform {
                dx: 0.0,
                dy: 0.0,
                rect,
                node: None,
                cmds: vec![],
                noop: true,
            })],
        }
    }

    #[test]
    fn composited_node_revisited_after_an_intervening_overlapping_layer_gets_its_own_new_layer() {
        // C1 (node A) -> L1. C2 (uncomposited, disjoint from L1) -> L2.
        // C3 (node A again, but overlapping L2): the scan must stop at L2
        // (intersects, no merge) rather than reaching past it to merge
        // into L1, so C3 lands in a brand-new L3 drawn after L2.
        let node_a = NodeRef::new_element("div", HashMap::new());
        let c1 = leaf_chunk(0.0, Some(&node_a));
        let c2 = uncomposited_chunk_at(Rect::from_ltrb(20.0, 20.0, 30.0, 30.0));
        let c3 = {
            let mut c = leaf_chunk(0.0, Some(&node_a));
            c.leaf = DisplayItem::DrawRect(DrawRect {
                rect: Rect::from_ltrb(20.0, 20.0, 30.0, 30.0),
                color: Color::BLACK,
            });
            if let DisplayItem::Transform(t) = &mut c.ancestor_effects[0] {
                t.dx = 0.0;
                t.dy = 0.0;
            }
            c
        };
        let layers = assign_layers(vec![c1, c2, c3], true);
        assert_eq!(layers.len(), 3);
        assert_eq!(layers[2].absolute_bounds, Rect::from_ltrb(20.0, 20.0, 30.0, 30.0));
    }

    #[test]
    fn overlapping_chunks_from_distinct_composited_nodes_split_into_separate_layers() {
        let node_a = NodeRef::new_element("div", HashMap::new());
        let node_b = NodeRef::new_element("div", HashMap::new());
        let a = leaf_chunk(0.0, Some(&node_a));
        let b = leaf_chunk(5.0, Some(&node_b));
        let layers = assign_layers(vec![a, b], true);
        assert_eq!(layers.len(), 2);
    }
}
