//! The display-item tree (§3, §4.4, §4.5).
//!
//! Mirrors the teacher's `InlineLevelContent`/`InlineLevelBox` split: a
//! tagged enum dispatches to per-variant structs via `enum_dispatch`
//! rather than a class hierarchy with virtual `draw`. Only `ClipRRect`,
//! `SaveLayer`, and `Transform` override `draw`; every other variant is a
//! leaf that just executes its own paint call.

use enum_dispatch::enum_dispatch;

use crate::canvas::{Canvas, Color, Paint};
use crate::dom::NodeWeak;
use crate::layout::rect::Rect;

#[enum_dispatch]
pub trait DisplayItemBehavior {
    /// The item's own bounding rect, ignoring children.
    fn bounds(&self) -> Rect;
    fn cmds(&self) -> Option<&[DisplayItem]>;
    fn is_noop(&self) -> bool;
    fn node(&self) -> Option<NodeWeak>;
    /// Execute this item's own drawing commands, assuming `canvas` is
    /// already positioned correctly (no recursion into `cmds`).
    fn paint_self(&self, canvas: &mut dyn Canvas);
}

impl DisplayItem {
    /// §4.6's definition of `needs_compositing`: gated on the global
    /// flag, never true for a no-op, and only ever true for the two
    /// effect kinds that the compositor knows how to replay at draw time.
    pub fn needs_compositing(&self, use_compositing: bool) -> bool {
        if !use_compositing || self.is_noop() {
            return false;
        }
        matches!(self, DisplayItem::Transform(_) | DisplayItem::SaveLayer(_))
    }

    /// Bounds of `self`, expanded to cover every descendant that is *not*
    /// itself composited (a composited descendant's bounds are accounted
    /// for separately, at draw time, once its own transform is known).
    pub fn composited_bounds(&self, use_compositing: bool) -> Rect {
        let mut rect = self.bounds();
        if let Some(cmds) = self.cmds() {
            for cmd in cmds {
                if !cmd.needs_compositing(use_compositing) {
                    rect.join(cmd.composited_bounds(use_compositing));
                }
            }
        }
        rect
    }

    /// Recursively execute this item and its children, dispatching
    /// through `draw` so effect items can wrap the recursive call with
    /// save/restore, clip, or translate.
    pub fn execute(&self, canvas: &mut dyn Canvas) {
        match self {
            DisplayItem::ClipRRect(it) => it.draw(canvas),
            DisplayItem::SaveLayer(it) => it.draw(canvas),
            DisplayItem::Transform(it) => it.draw(canvas),
            leaf => leaf.paint_self(canvas),
        }
    }

    /// Maps `rect` through this item if it is a `Transform`; every other
    /// variant is the identity. Used by the compositor's
    /// `absolute_bounds` to project a chunk's local bounds through its
    /// ancestor transforms.
    pub fn map(&self, rect: Rect) -> Rect {
        match self {
            DisplayItem::Transform(t) if !t.is_noop() => rect.translate(t.dx, t.dy),
            _ => rect,
        }
    }
}

#[enum_dispatch(DisplayItemBehavior)]
#[derive(Clone, Debug)]
pub enum DisplayItem {
    DrawRect(DrawRect),
    DrawRRect(DrawRRect),
    DrawText(DrawText),
    DrawLine(DrawLine),
    ClipRRect(ClipRRect),
    SaveLayer(SaveLayer),
    Transform(Transform),
}

#[derive(Clone, Debug)]
pub struct DrawRect {
    pub rect: Rect,
    pub color: Color,
}

impl DisplayItemBehavior for DrawRect {
    fn bounds(&self) -> Rect {
        self.rect
    }
    fn cmds(&self) -> Option<&[DisplayItem]> {
        None
    }
    fn is_noop(&self) -> bool {
        false
    }
    fn node(&self) -> Option<NodeWeak> {
        None
    }
    fn paint_self(&self, canvas: &mut dyn Canvas) {
        canvas.draw_rect(
            self.rect,
            Paint {
                color: self.color,
                ..Default::default()
            },
        );
    }
}

#[derive(Clone, Debug)]
pub struct DrawRRect {
    pub rect: Rect,
    pub radius: f32,
    pub color: Color,
}

impl DisplayItemBehavior for DrawRRect {
    fn bounds(&self) -> Rect {
        self.rect
    }
    fn cmds(&self) -> Option<&[DisplayItem]> {
        None
    }
    fn is_noop(&self) -> bool {
        false
    }
    fn node(&self) -> Option<NodeWeak> {
        None
    }
    fn paint_self(&self, canvas: &mut dyn Canvas) {
        canvas.draw_rrect(
            self.rect,
            self.radius,
            Paint {
                color: self.color,
                ..Default::default()
            },
        );
    }
}

#[derive(Clone, Debug)]
pub struct DrawText {
    pub x: f32,
    pub y: f32,
    pub text: String,
    pub color: Color,
    pub rect: Rect,
}

impl DrawText {
    /// `ascent <= 0`, `descent >= 0`, matching the font-metrics
    /// convention in §6.
    pub fn new(x: f32, y: f32, text: String, measured_width: f32, ascent: f32, descent: f32, color: Color) -> Self {
        DrawText {
            rect: Rect::from_ltrb(x, y + ascent, x + measured_width, y + descent),
            x,
            y,
            text,
            color,
        }
    }
}

impl DisplayItemBehavior for DrawText {
    fn bounds(&self) -> Rect {
        self.rect
    }
    fn cmds(&self) -> Option<&[DisplayItem]> {
        None
    }
    fn is_noop(&self) -> bool {
        false
    }
    fn node(&self) -> Option<NodeWeak> {
        None
    }
    fn paint_self(&self, canvas: &mut dyn Canvas) {
        canvas.draw_text(self.x, self.y, &self.text, self.color);
    }
}

#[derive(Clone, Debug)]
pub struct DrawLine {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl DisplayItemBehavior for DrawLine {
    fn bounds(&self) -> Rect {
        Rect::from_ltrb(
            self.x1.min(self.x2),
            self.y1.min(self.y2),
            self.x1.max(self.x2),
            self.y1.max(self.y2),
        )
    }
    fn cmds(&self) -> Option<&[DisplayItem]> {
        None
    }
    fn is_noop(&self) -> bool {
        false
    }
    fn node(&self) -> Option<NodeWeak> {
        None
    }
    fn paint_self(&self, canvas: &mut dyn Canvas) {
        canvas.draw_line(self.x1, self.y1, self.x2, self.y2);
    }
}

/// §4.5: clips its children to a rounded rect, the innermost of the three
/// visual-effect wrappers. `is_noop` iff `should_clip` was false when the
/// item was produced (the clip radius is then irrelevant).
#[derive(Clone, Debug)]
pub struct ClipRRect {
    pub rect: Rect,
    pub radius: f32,
    pub cmds: Vec<DisplayItem>,
    pub noop: bool,
}

impl ClipRRect {
    fn draw(&self, canvas: &mut dyn Canvas) {
        if !self.noop {
            canvas.save();
            canvas.clip_rrect(self.rect, self.radius);
        }
        for cmd in &self.cmds {
            cmd.execute(canvas);
        }
        if !self.noop {
            canvas.restore();
        }
    }
}

impl DisplayItemBehavior for ClipRRect {
    fn bounds(&self) -> Rect {
        self.rect
    }
    fn cmds(&self) -> Option<&[DisplayItem]> {
        Some(&self.cmds)
    }
    fn is_noop(&self) -> bool {
        self.noop
    }
    fn node(&self) -> Option<NodeWeak> {
        None
    }
    fn paint_self(&self, canvas: &mut dyn Canvas) {
        self.draw(canvas);
    }
}

/// §4.5: isolates blend mode and opacity into an offscreen layer.
#[derive(Clone, Debug)]
pub struct SaveLayer {
    pub paint: Paint,
    pub node: Option<NodeWeak>,
    pub cmds: Vec<DisplayItem>,
    pub noop: bool,
}

impl SaveLayer {
    fn draw(&self, canvas: &mut dyn Canvas) {
        if !self.noop {
            canvas.save_layer(self.paint);
        }
        for cmd in &self.cmds {
            cmd.execute(canvas);
        }
        if !self.noop {
            canvas.restore();
        }
    }
}

impl DisplayItemBehavior for SaveLayer {
    fn bounds(&self) -> Rect {
        Rect::empty()
    }
    fn cmds(&self) -> Option<&[DisplayItem]> {
        Some(&self.cmds)
    }
    fn is_noop(&self) -> bool {
        self.noop
    }
    fn node(&self) -> Option<NodeWeak> {
        self.node.clone()
    }
    fn paint_self(&self, canvas: &mut dyn Canvas) {
        self.draw(canvas);
    }
}

/// §4.5: the outermost visual-effect wrapper, applying
/// `translate(Xpx, Ypx)`. `is_noop` iff no `transform` style was present.
#[derive(Clone, Debug)]
pub struct Transform {
    pub dx: f32,
    pub dy: f32,
    pub rect: Rect,
    pub node: Option<NodeWeak>,
    pub cmds: Vec<DisplayItem>,
    pub noop: bool,
}

impl Transform {
    fn draw(&self, canvas: &mut dyn Canvas) {
        if !self.noop {
            canvas.save();
            canvas.translate(self.dx, self.dy);
        }
        for cmd in &self.cmds {
            cmd.execute(canvas);
        }
        if !self.noop {
            canvas.restore();
        }
    }
}

impl DisplayItemBehavior for Transform {
    fn bounds(&self) -> Rect {
        self.rect
    }
    fn cmds(&self) -> Option<&[DisplayItem]> {
        Some(&self.cmds)
    }
    fn is_noop(&self) -> bool {
        self.noop
    }
    fn node(&self) -> Option<NodeWeak> {
        self.node.clone()
    }
    fn paint_self(&self, canvas: &mut dyn Canvas) {
        self.draw(canvas);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_items_have_no_children() {
        let leaf = DisplayItem::DrawRect(DrawRect {
            rect: Rect::from_ltrb(0.0, 0.0, 10.0, 10.0),
            color: Color::BLACK,
        });
        assert!(leaf.cmds().is_none());
    }

    #[test]
    fn noop_transform_is_identity_map() {
        let t = DisplayItem::Transform(Transform {
            dx: 0.0,
            dy: 0.0,
            rect: Rect::from_ltrb(0.0, 0.0, 10.0, 10.0),
            node: None,
            cmds: vec![],
            noop: true,
        });
        let rect = Rect::from_ltrb(1.0, 2.0, 3.0, 4.0);
        assert_eq!(t.map(rect), rect);
        assert!(!t.needs_compositing(true));
    }

    #[test]
    fn non_noop_transform_needs_compositing_when_enabled() {
        let t = DisplayItem::Transform(Transform {
            dx: 10.0,
            dy: 10.0,
            rect: Rect::from_ltrb(0.0, 0.0, 10.0, 10.0),
            node: None,
            cmds: vec![],
            noop: false,
        });
        assert!(t.needs_compositing(true));
        assert!(!t.needs_compositing(false));
    }
}
