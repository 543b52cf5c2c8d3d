//! The cascade (§4.1): walks the DOM in document order, resolving each
//! node's computed style from inherited defaults, matching rules, and
//! its inline `style` attribute, then hands the (previous, new) pair to
//! the transition detector.

pub mod transition;
pub mod values;

use std::collections::HashMap;

use crate::dom::{NodeRef, StyleMap};
use transition::TransitionStart;

/// Properties that inherit from a node's parent when no rule sets them,
/// with the values used at the document root.
const INHERITED_DEFAULTS: &[(&str, &str)] = &[
    ("font-size", "16px"),
    ("font-weight", "normal"),
    ("font-style", "normal"),
    ("color", "black"),
];

#[derive(Clone, Debug)]
pub enum Selector {
    Tag(String),
    /// Matches a node if `inner` matches the node and some ancestor
    /// matches `outer`.
    Descendant { outer: Box<Selector>, inner: Box<Selector> },
}

impl Selector {
    pub fn specificity(&self) -> u32 {
        match self {
            Selector::Tag(_) => 1,
            Selector::Descendant { outer, inner } => outer.specificity() + inner.specificity(),
        }
    }

    pub fn matches(&self, node: &NodeRef) -> bool {
        match self {
            Selector::Tag(tag) => !node.0.is_text && node.0.tag == *tag,
            Selector::Descendant { outer, inner } => {
                if !inner.matches(node) {
                    return false;
                }
                let mut ancestor = node.parent();
                while let Some(a) = ancestor {
                    if outer.matches(&a) {
                        return true;
                    }
                    ancestor = a.parent();
                }
                false
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct Rule {
    pub selector: Selector,
    pub declarations: HashMap<String, String>,
}

impl Rule {
    pub fn specificity(&self) -> u32 {
        self.selector.specificity()
    }
}

fn parse_inline_style(attr: &str) -> HashMap<String, String> {
    attr.split(';')
        .filter_map(|decl| {
            let mut parts = decl.splitn(2, ':');
            let prop = parts.next()?.trim();
            let value = parts.next()?.trim();
            if prop.is_empty() {
                None
            } else {
                Some((prop.to_owned(), value.to_owned()))
            }
        })
        .collect()
}

/// Resolves relative values against the already-merged style, e.g. a
/// percentage `font-size` against the parent's resolved font-size.
fn resolve_relative(style: &mut StyleMap, parent_font_size_px: f32) {
    if let Some(value) = style.get("font-size").cloned() {
        if let Some(pct) = value.strip_suffix('%').and_then(|v| v.parse::<f32>().ok()) {
            style.insert("font-size".to_owned(), format!("{}px", parent_font_size_px * pct / 100.0));
        }
    }
}

fn parent_font_size_px(parent_style: Option<&StyleMap>) -> f32 {
    parent_style
        .and_then(|s| s.get("font-size"))
        .and_then(|v| values::parse_px(v))
        .unwrap_or(16.0)
}

/// Computes `node`'s style in place and recurses into its children,
/// collecting every transition this node's style change kicked off.
/// `rules` is assumed already available in parse order; cascade order is
/// established here by sorting on specificity before applying.
pub fn style_tree(node: &NodeRef, rules: &[Rule], parent_style: Option<&StyleMap>, out_transitions: &mut Vec<(NodeRef, TransitionStart)>) {
    if node.0.is_text {
        if let Some(parent) = parent_style {
            *node.0.computed_style.borrow_mut() = parent.clone();
        }
        return;
    }

    let previous = node.0.computed_style.borrow().clone();

    let mut new_style = StyleMap::new();
    match parent_style {
        Some(parent) => {
            for (prop, _) in INHERITED_DEFAULTS {
                if let Some(v) = parent.get(*prop) {
                    new_style.insert((*prop).to_owned(), v.clone());
                }
            }
        }
        None => {
            for (prop, default) in INHERITED_DEFAULTS {
                new_style.insert((*prop).to_owned(), (*default).to_owned());
            }
        }
    }

    let mut matching: Vec<&Rule> = rules.iter().filter(|r| r.selector.matches(node)).collect();
    matching.sort_by_key(|r| r.specificity());
    for rule in matching {
        for (prop, value) in &rule.declarations {
            new_style.insert(prop.clone(), value.clone());
        }
    }

    if let Some(inline) = node.0.attributes.get("style") {
        for (prop, value) in parse_inline_style(inline) {
            new_style.insert(prop, value);
        }
    }

    resolve_relative(&mut new_style, parent_font_size_px(parent_style));

    for start in transition::detect_transitions(&previous, &new_style) {
        out_transitions.push((node.clone(), start));
    }

    *node.0.computed_style.borrow_mut() = new_style.clone();

    for child in node.children() {
        style_tree(&child, rules, Some(&new_style), out_transitions);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;

    fn element(tag: &str) -> NodeRef {
        NodeRef::new_element(tag, Map::new())
    }

    #[test]
    fn tag_selector_matches_own_tag_only() {
        let sel = Selector::Tag("p".to_owned());
        assert!(sel.matches(&element("p")));
        assert!(!sel.matches(&element("div")));
    }

    #[test]
    fn descendant_selector_requires_matching_ancestor() {
        let sel = Selector::Descendant {
            outer: Box::new(Selector::Tag("div".to_owned())),
            inner: Box::new(Selector::Tag("p".to_owned())),
        };
        let div = element("div");
        let p = element("p");
        div.append_child(p.clone());
        assert!(sel.matches(&p));

        let lonely_p = element("p");
        assert!(!sel.matches(&lonely_p));
    }

    #[test]
    fn inline_style_wins_over_rules() {
        let mut attrs = Map::new();
        attrs.insert("style".to_owned(), "color:red".to_owned());
        let node = NodeRef::new_element("p", attrs);
        let rule = Rule {
            selector: Selector::Tag("p".to_owned()),
            declarations: [("color".to_owned(), "blue".to_owned())].into_iter().collect(),
        };
        let mut transitions = Vec::new();
        style_tree(&node, &[rule], None, &mut transitions);
        assert_eq!(node.style("color").as_deref(), Some("red"));
    }

    #[test]
    fn font_size_inherits_from_parent_when_unset() {
        let parent = element("div");
        let mut attrs = Map::new();
        attrs.insert("style".to_owned(), "font-size:20px".to_owned());
        let styled_parent = NodeRef::new_element("div", attrs);
        let child = element("span");
        styled_parent.append_child(child.clone());
        let mut transitions = Vec::new();
        style_tree(&styled_parent, &[], None, &mut transitions);
        assert_eq!(child.style("font-size").as_deref(), Some("20px"));
        let _ = parent;
    }
}
