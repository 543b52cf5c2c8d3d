//! Transition detection (§4.3): compares a node's previous and new
//! computed style and decides which property changes should animate
//! rather than apply immediately.

use std::collections::HashMap;

use crate::dom::StyleMap;

use super::values;

const OBSERVABLE_PROPERTIES: &[&str] = &["opacity", "width", "transform"];

#[derive(Clone, Debug, PartialEq)]
pub struct TransitionStart {
    pub property: String,
    pub old_value: String,
    pub new_value: String,
    pub duration_secs: f32,
}

/// Parses a `transition` declaration value, e.g. `"opacity 1s, width
/// 0.5s"`, into a property → duration-in-seconds map.
fn parse_transition_list(value: &str) -> HashMap<String, f32> {
    value
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.split_whitespace();
            let property = parts.next()?.to_owned();
            let duration = parts.next()?.strip_suffix('s')?.parse::<f32>().ok()?;
            Some((property, duration))
        })
        .collect()
}

fn is_well_formed(property: &str, value: &str) -> bool {
    if property == "transform" {
        values::parse_translate(value).is_some()
    } else {
        values::parse_px(value).is_some()
    }
}

/// Returns one [`TransitionStart`] per property that satisfies all of
/// §4.3's conditions.
pub fn detect_transitions(old: &StyleMap, new: &StyleMap) -> Vec<TransitionStart> {
    let old_transitions = old.get("transition").map(|v| parse_transition_list(v)).unwrap_or_default();
    let new_transitions = new.get("transition").map(|v| parse_transition_list(v)).unwrap_or_default();

    let mut starts = Vec::new();
    for property in OBSERVABLE_PROPERTIES {
        let (Some(&old_duration), Some(&new_duration)) =
            (old_transitions.get(*property), new_transitions.get(*property))
        else {
            continue;
        };
        if (old_duration - new_duration).abs() > f32::EPSILON {
            continue;
        }
        let (Some(old_value), Some(new_value)) = (old.get(*property), new.get(*property)) else {
            continue;
        };
        if old_value == new_value {
            continue;
        }
        if !is_well_formed(property, old_value) || !is_well_formed(property, new_value) {
            continue;
        }
        starts.push(TransitionStart {
            property: (*property).to_owned(),
            old_value: old_value.clone(),
            new_value: new_value.clone(),
            duration_secs: new_duration,
        });
    }
    starts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style(pairs: &[(&str, &str)]) -> StyleMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn detects_opacity_transition_with_matching_duration() {
        let old = style(&[("transition", "opacity 1s"), ("opacity", "0")]);
        let new = style(&[("transition", "opacity 1s"), ("opacity", "1")]);
        let starts = detect_transitions(&old, &new);
        assert_eq!(starts.len(), 1);
        assert_eq!(starts[0].property, "opacity");
        assert_eq!(starts[0].duration_secs, 1.0);
    }

    #[test]
    fn no_animation_when_durations_differ() {
        let old = style(&[("transition", "opacity 1s"), ("opacity", "0")]);
        let new = style(&[("transition", "opacity 2s"), ("opacity", "1")]);
        assert!(detect_transitions(&old, &new).is_empty());
    }

    #[test]
    fn no_animation_when_transition_absent_from_new() {
        let old = style(&[("transition", "opacity 1s"), ("opacity", "0")]);
        let new = style(&[("opacity", "1")]);
        assert!(detect_transitions(&old, &new).is_empty());
    }

    #[test]
    fn no_animation_when_value_unchanged() {
        let old = style(&[("transition", "opacity 1s"), ("opacity", "1")]);
        let new = style(&[("transition", "opacity 1s"), ("opacity", "1")]);
        assert!(detect_transitions(&old, &new).is_empty());
    }
}
