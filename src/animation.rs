//! Per-property frame-stepped animations (§4.3, §3, design notes
//! "Animation polymorphism"): a tagged variant rather than a class
//! hierarchy, each ticked once per animation frame via [`animate`].

use crate::config::REFRESH_RATE_SEC;
use crate::dom::NodeWeak;
use crate::style::transition::TransitionStart;
use crate::style::values;

/// Number of frames a smooth scroll runs for; the source hardcodes this
/// rather than deriving it from a CSS duration.
pub const SCROLL_ANIMATION_FRAMES: u32 = 30;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Tick {
    Continue,
    Completed,
}

#[derive(Debug)]
pub enum Animation {
    Numeric(NumericAnimation),
    Translate(TranslateAnimation),
    Scroll(ScrollAnimation),
}

#[derive(Debug)]
pub struct NumericAnimation {
    pub node: NodeWeak,
    pub property: String,
    pub is_px: bool,
    pub old: f32,
    pub per_frame: f32,
    pub frames: u32,
    pub frame_count: u32,
}

#[derive(Debug)]
pub struct TranslateAnimation {
    pub node: NodeWeak,
    pub old_xy: (f32, f32),
    pub per_frame_xy: (f32, f32),
    pub frames: u32,
    pub frame_count: u32,
}

#[derive(Debug)]
pub struct ScrollAnimation {
    pub old: f32,
    pub per_frame: f32,
    pub frames: u32,
    pub frame_count: u32,
    pub current: f32,
}

fn frames_for(duration_secs: f32) -> u32 {
    (duration_secs / REFRESH_RATE_SEC).round() as u32
}

impl Animation {
    /// Builds the right variant for a detected transition, or `None` if
    /// the property isn't one this engine animates directly (§3 only
    /// lists `opacity`/`width` as Numeric and `transform` as Translate).
    pub fn from_transition(node: NodeWeak, start: &TransitionStart) -> Option<Animation> {
        let frames = frames_for(start.duration_secs);
        if frames == 0 {
            return None;
        }
        match start.property.as_str() {
            "transform" => {
                let old_xy = values::parse_translate(&start.old_value)?;
                let new_xy = values::parse_translate(&start.new_value)?;
                Some(Animation::Translate(TranslateAnimation {
                    node,
                    old_xy,
                    per_frame_xy: (
                        (new_xy.0 - old_xy.0) / frames as f32,
                        (new_xy.1 - old_xy.1) / frames as f32,
                    ),
                    frames,
                    frame_count: 0,
                }))
            }
            property => {
                let is_px = start.old_value.trim_end().ends_with("px");
                let old = values::parse_px(&start.old_value)?;
                let new = values::parse_px(&start.new_value)?;
                Some(Animation::Numeric(NumericAnimation {
                    node,
                    property: property.to_owned(),
                    is_px,
                    old,
                    per_frame: (new - old) / frames as f32,
                    frames,
                    frame_count: 0,
                }))
            }
        }
    }

    pub fn start_scroll(old: f32, delta: f32) -> Animation {
        Animation::Scroll(ScrollAnimation {
            old,
            per_frame: delta / SCROLL_ANIMATION_FRAMES as f32,
            frames: SCROLL_ANIMATION_FRAMES,
            frame_count: 0,
            current: old,
        })
    }

    pub fn node(&self) -> Option<NodeWeak> {
        match self {
            Animation::Numeric(a) => Some(a.node.clone()),
            Animation::Translate(a) => Some(a.node.clone()),
            Animation::Scroll(_) => None,
        }
    }

    /// `property` naming this animation's slot in the tab's
    /// `(node, property) -> Animation` map; scroll has no owning node, so
    /// it's keyed separately by the tab.
    pub fn property(&self) -> &str {
        match self {
            Animation::Numeric(a) => &a.property,
            Animation::Translate(_) => "transform",
            Animation::Scroll(_) => "scroll",
        }
    }

    /// Whether this property change, if it were to repaint instead of
    /// animate, would require layout (vs. only paint). Used by the tab to
    /// decide which invalidation flags a tick sets (§4.8).
    pub fn is_layout_invalidating(&self) -> bool {
        matches!(self, Animation::Numeric(a) if a.property != "opacity")
    }

    /// Advances one frame, writing the interpolated value back into the
    /// owning node's computed style (Numeric/Translate) so paint picks it
    /// up unchanged, or into `current` (Scroll). Returns whether more
    /// frames remain.
    pub fn animate(&mut self) -> Tick {
        match self {
            Animation::Numeric(a) => {
                a.frame_count += 1;
                let value = a.old + a.per_frame * a.frame_count as f32;
                if let Some(node) = a.node.upgrade() {
                    let formatted = if a.is_px { format!("{}px", value) } else { value.to_string() };
                    node.0.computed_style.borrow_mut().insert(a.property.clone(), formatted);
                }
                if a.frame_count >= a.frames {
                    Tick::Completed
                } else {
                    Tick::Continue
                }
            }
            Animation::Translate(a) => {
                a.frame_count += 1;
                let x = a.old_xy.0 + a.per_frame_xy.0 * a.frame_count as f32;
                let y = a.old_xy.1 + a.per_frame_xy.1 * a.frame_count as f32;
                if let Some(node) = a.node.upgrade() {
                    node.0
                        .computed_style
                        .borrow_mut()
                        .insert("transform".to_owned(), format!("translate({}px, {}px)", x, y));
                }
                if a.frame_count >= a.frames {
                    Tick::Completed
                } else {
                    Tick::Continue
                }
            }
            Animation::Scroll(a) => {
                a.frame_count += 1;
                a.current = a.old + a.per_frame * a.frame_count as f32;
                if a.frame_count >= a.frames {
                    Tick::Completed
                } else {
                    Tick::Continue
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn numeric_animation_terminates_on_frame_n() {
        let node = crate::dom::NodeRef::new_element("div", HashMap::new());
        let mut anim = Animation::Numeric(NumericAnimation {
            node: node.downgrade(),
            property: "opacity".to_owned(),
            is_px: false,
            old: 0.0,
            per_frame: 1.0 / 5.0,
            frames: 5,
            frame_count: 0,
        });
        for _ in 0..4 {
            assert_eq!(anim.animate(), Tick::Continue);
        }
        assert_eq!(anim.animate(), Tick::Completed);
    }

    #[test]
    fn scroll_animation_matches_smooth_scroll_scenario() {
        let mut anim = Animation::start_scroll(0.0, 100.0);
        for _ in 0..29 {
            assert_eq!(anim.animate(), Tick::Continue);
        }
        assert_eq!(anim.animate(), Tick::Completed);
        if let Animation::Scroll(s) = &anim {
            assert_eq!(s.current, 100.0);
            assert_eq!(s.per_frame, 100.0 / 30.0);
        } else {
            panic!("expected Scroll variant");
        }
    }

    #[test]
    fn translate_animation_interpolates_xy() {
        let node = crate::dom::NodeRef::new_element("div", HashMap::new());
        let mut anim = Animation::Translate(TranslateAnimation {
            node: node.downgrade(),
            old_xy: (0.0, 0.0),
            per_frame_xy: (5.0, 0.0),
            frames: 2,
            frame_count: 0,
        });
        anim.animate();
        assert_eq!(node.style("transform").as_deref(), Some("translate(5px, 0px)"));
    }
}
