//! Layout tree → display list (§4.4, §4.5).

pub mod chunk;
pub mod display_item;

use std::rc::Rc;

use crate::canvas::{BlendMode, Color, Paint};
use crate::dom::NodeRef;
use crate::layout::rect::Rect;
use crate::layout::{DocumentBox, LayoutBox};
use crate::style::values::{parse_color, parse_translate};

use display_item::{ClipRRect, DisplayItem, DrawRect, DrawText, SaveLayer, Transform};

/// Paints the whole document: a white background rect, then the single
/// root block, depth-first (§4.4).
pub fn paint_document(doc: &DocumentBox, use_compositing: bool) -> Vec<DisplayItem> {
    let mut items = vec![DisplayItem::DrawRect(DrawRect {
        rect: doc.geometry.rect(),
        color: Color::WHITE,
    })];
    items.extend(paint_box(&doc.child, use_compositing));
    items
}

fn paint_box(layout_box: &LayoutBox, use_compositing: bool) -> Vec<DisplayItem> {
    match layout_box {
        LayoutBox::Document(doc) => paint_document(doc, use_compositing),
        LayoutBox::Block(block) => {
            let mut items = paint_background(&block.node, block.geometry.rect());
            for child in &block.children {
                items.extend(paint_box(child, use_compositing));
            }
            vec![wrap_visual_effects(&block.node, items, block.geometry.rect(), use_compositing)]
        }
        LayoutBox::Inline(inline) => {
            let mut items = Vec::new();
            for child in &inline.children {
                items.extend(paint_box(child, use_compositing));
            }
            vec![wrap_visual_effects(&inline.node, items, inline.geometry.rect(), use_compositing)]
        }
        LayoutBox::Line(line) => {
            let mut items = Vec::new();
            for child in &line.children {
                items.extend(paint_box(child, use_compositing));
            }
            items
        }
        LayoutBox::Text(text) => {
            let (ascent, descent) = text.font.metrics();
            let color = text.node.style("color").map(|v| parse_color(&v)).unwrap_or(Color::BLACK);
            vec![DisplayItem::DrawText(DrawText::new(
                text.geometry.x,
                text.geometry.y,
                text.word.clone(),
                text.geometry.width,
                ascent,
                descent,
                color,
            ))]
        }
        LayoutBox::Input(input) => {
            let color = input
                .node
                .style("background-color")
                .map(|v| parse_color(&v))
                .unwrap_or(Color { r: 221, g: 221, b: 221, a: 255 });
            let mut items = vec![DisplayItem::DrawRect(DrawRect {
                rect: input.geometry.rect(),
                color,
            })];
            let value = input.node.0.value.borrow().clone();
            if !value.is_empty() {
                let (ascent, descent) = input.font.metrics();
                let text_color = input.node.style("color").map(|v| parse_color(&v)).unwrap_or(Color::BLACK);
                items.push(DisplayItem::DrawText(DrawText::new(
                    input.geometry.x,
                    input.geometry.y - ascent,
                    value,
                    input.geometry.width,
                    ascent,
                    descent,
                    text_color,
                )));
            }
            items
        }
    }
}

fn paint_background(node: &NodeRef, rect: Rect) -> Vec<DisplayItem> {
    match node.style("background-color") {
        Some(value) if value != "transparent" => vec![DisplayItem::DrawRect(DrawRect {
            rect,
            color: parse_color(&value),
        })],
        _ => Vec::new(),
    }
}

fn blend_mode_of(node: &NodeRef) -> BlendMode {
    match node.style_or("mix-blend-mode", "normal").as_str() {
        "multiply" => BlendMode::Multiply,
        "difference" => BlendMode::Difference,
        _ => BlendMode::SourceOver,
    }
}

/// §4.5: wraps `children` innermost-out in ClipRRect, SaveLayer, then
/// Transform, caching whichever of the latter two need compositing back
/// onto `node` for the compositor's incremental-update path (§4.7).
fn wrap_visual_effects(node: &NodeRef, children: Vec<DisplayItem>, rect: Rect, use_compositing: bool) -> DisplayItem {
    let overflow = node.style_or("overflow", "visible");
    let opacity: f32 = node.style("opacity").and_then(|v| v.parse().ok()).unwrap_or(1.0);
    let blend_mode = blend_mode_of(node);
    let radius: f32 = node
        .style("border-radius")
        .and_then(|v| v.strip_suffix("px").and_then(|s| s.parse().ok()))
        .unwrap_or(0.0);
    let translation = node.style("transform").and_then(|v| parse_translate(&v));

    let needs_clip = overflow == "clip";
    let needs_blend_isolation = blend_mode != BlendMode::SourceOver || needs_clip || (opacity - 1.0).abs() > f32::EPSILON;

    let clip_rrect = DisplayItem::ClipRRect(ClipRRect {
        rect,
        radius: if needs_clip { radius } else { 0.0 },
        cmds: children,
        noop: !needs_clip,
    });

    let save_layer = DisplayItem::SaveLayer(SaveLayer {
        paint: Paint {
            color: Color::TRANSPARENT,
            blend_mode,
            alpha: opacity,
            ..Default::default()
        },
        node: Some(node.downgrade()),
        cmds: vec![clip_rrect],
        noop: !needs_blend_isolation,
    });
    if save_layer.needs_compositing(use_compositing) {
        *node.0.save_layer.borrow_mut() = Some(save_layer.clone());
    }

    let (dx, dy) = translation.unwrap_or((0.0, 0.0));
    let transform = DisplayItem::Transform(Transform {
        dx,
        dy,
        rect,
        node: Some(node.downgrade()),
        cmds: vec![save_layer],
        noop: translation.is_none(),
    });
    if transform.needs_compositing(use_compositing) {
        *node.0.transform.borrow_mut() = Some(transform.clone());
    }

    transform
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn noop_visual_effects_when_node_has_no_effect_styles() {
        let node = NodeRef::new_element("div", HashMap::new());
        let rect = Rect::from_ltrb(0.0, 0.0, 10.0, 10.0);
        let item = wrap_visual_effects(&node, vec![], rect, true);
        assert!(!item.needs_compositing(true));
        assert!(node.0.transform.borrow().is_none());
    }

    #[test]
    fn transform_style_caches_composited_transform_on_node() {
        let mut attrs = HashMap::new();
        attrs.insert("style".to_owned(), "transform:translate(5px, 5px)".to_owned());
        let node = NodeRef::new_element("div", attrs);
        *node.0.computed_style.borrow_mut() = [("transform".to_owned(), "translate(5px, 5px)".to_owned())]
            .into_iter()
            .collect();
        let rect = Rect::from_ltrb(0.0, 0.0, 10.0, 10.0);
        let item = wrap_visual_effects(&node, vec![], rect, true);
        assert!(item.needs_compositing(true));
        assert!(node.0.transform.borrow().is_some());
    }

    #[test]
    fn document_paint_starts_with_white_background() {
        let root = NodeRef::new_element("body", HashMap::new());
        let fonts = crate::font::test_support::FakeFontProvider::default();
        let doc = crate::layout::build_document_layout(root, 800.0, &fonts);
        let items = paint_document(&doc, true);
        match &items[0] {
            DisplayItem::DrawRect(r) => assert_eq!(r.color.r, 255),
            other => panic!("expected DrawRect, got {:?}", other),
        }
    }
}
