// Useful links:
//  * https://browser.engineering/layout.html
//  * https://browser.engineering/text.html
pub mod rect;

use std::rc::Rc;

use crate::config::{HSTEP, INPUT_WIDTH_PX, VSTEP};
use crate::dom::NodeRef;
use crate::font::{Font, FontProvider};

/// Geometry for a single box: top-left corner plus size. Unlike the
/// teacher's `Dimensions` (which separately tracks margin/border/padding
/// boxes), this crate's box model has no box-model edges of its own —
/// §4.2 only positions content boxes — so one rect per box suffices.
#[derive(Clone, Copy, Debug, Default)]
pub struct Geometry {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Geometry {
    pub fn rect(&self) -> rect::Rect {
        rect::Rect::from_ltrb(self.x, self.y, self.x + self.width, self.y + self.height)
    }
}

/// Decides whether `node`'s children should be laid out as a block
/// (stacked vertically) or inline (flowed as text), per §4.2: "a Block is
/// chosen when any child has a block-level tag; otherwise Inline."
const BLOCK_LEVEL_TAGS: &[&str] = &[
    "html", "body", "article", "section", "nav", "aside", "h1", "h2", "h3", "h4", "h5", "h6",
    "hgroup", "header", "footer", "address", "p", "hr", "pre", "blockquote", "ol", "ul", "menu",
    "li", "dl", "dt", "dd", "figure", "figcaption", "main", "div", "table", "form", "fieldset",
    "legend", "details", "summary",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutMode {
    Block,
    Inline,
}

pub fn layout_mode(node: &NodeRef) -> LayoutMode {
    let children = node.children();
    if children
        .iter()
        .any(|child| !child.0.is_text && BLOCK_LEVEL_TAGS.contains(&child.0.tag.as_str()))
    {
        LayoutMode::Block
    } else if !children.is_empty() {
        LayoutMode::Inline
    } else {
        LayoutMode::Block
    }
}

/// §3's layout-box variants. Rebuilt from scratch on every layout pass,
/// so ownership is straightforward: each box owns its children outright,
/// and a "previous sibling" is simply the prior element of the parent's
/// `children` vector rather than a stored back-reference.
#[derive(Debug)]
pub enum LayoutBox {
    Document(DocumentBox),
    Block(BlockBox),
    Inline(InlineBox),
    Line(LineBox),
    Text(TextBox),
    Input(InputBox),
}

#[derive(Debug)]
pub struct DocumentBox {
    pub node: NodeRef,
    pub geometry: Geometry,
    pub child: Box<LayoutBox>,
}

#[derive(Debug)]
pub struct BlockBox {
    pub node: NodeRef,
    pub geometry: Geometry,
    pub children: Vec<LayoutBox>,
}

#[derive(Debug)]
pub struct InlineBox {
    pub node: NodeRef,
    pub geometry: Geometry,
    pub children: Vec<LayoutBox>,
}

#[derive(Debug)]
pub struct LineBox {
    pub node: NodeRef,
    pub geometry: Geometry,
    pub children: Vec<LayoutBox>,
}

#[derive(Debug)]
pub struct TextBox {
    pub node: NodeRef,
    pub geometry: Geometry,
    pub word: String,
    /// Intrinsic advance metrics for this run, from the external font
    /// interface (§6).
    pub font: Rc<dyn Font>,
}

#[derive(Debug)]
pub struct InputBox {
    pub node: NodeRef,
    pub geometry: Geometry,
    pub font: Rc<dyn Font>,
}

impl LayoutBox {
    pub fn node(&self) -> &NodeRef {
        match self {
            LayoutBox::Document(b) => &b.node,
            LayoutBox::Block(b) => &b.node,
            LayoutBox::Inline(b) => &b.node,
            LayoutBox::Line(b) => &b.node,
            LayoutBox::Text(b) => &b.node,
            LayoutBox::Input(b) => &b.node,
        }
    }

    pub fn geometry(&self) -> Geometry {
        match self {
            LayoutBox::Document(b) => b.geometry,
            LayoutBox::Block(b) => b.geometry,
            LayoutBox::Inline(b) => b.geometry,
            LayoutBox::Line(b) => b.geometry,
            LayoutBox::Text(b) => b.geometry,
            LayoutBox::Input(b) => b.geometry,
        }
    }

    pub fn children(&self) -> &[LayoutBox] {
        match self {
            LayoutBox::Document(b) => std::slice::from_ref(&b.child),
            LayoutBox::Block(b) => &b.children,
            LayoutBox::Inline(b) => &b.children,
            LayoutBox::Line(b) => &b.children,
            LayoutBox::Text(_) | LayoutBox::Input(_) => &[],
        }
    }

    /// Pre-order walk of `self` and its descendants, used by the focus
    /// cursor and by hit-testing (§4.11).
    pub fn tree_to_list(&self) -> Vec<&LayoutBox> {
        let mut out = vec![self];
        for child in self.children() {
            out.extend(child.tree_to_list());
        }
        out
    }
}

/// Reads a pixel-length style property, floor-rounding per §4.2; falls
/// back to `default_value` when the property is absent or malformed.
pub fn style_length(node: &NodeRef, style_name: &str, default_value: f32) -> f32 {
    match node.style(style_name) {
        Some(value) => match value.strip_suffix("px").and_then(|v| v.parse::<f32>().ok()) {
            Some(px) => px.floor(),
            None => default_value,
        },
        None => default_value,
    }
}

fn font_for(node: &NodeRef, fonts: &dyn FontProvider) -> Rc<dyn Font> {
    let weight = node.style_or("font-weight", "normal");
    let style = node.style_or("font-style", "normal");
    let size: f32 = node
        .style("font-size")
        .and_then(|v| v.strip_suffix("px").and_then(|v| v.parse().ok()))
        .unwrap_or(16.0);
    fonts.get_font(size, &weight, &style)
}

/// Builds and lays out the document box in one pass, per §4.2: "Document
/// layout sets width = WIDTH − 2·HSTEP and positions the single Block
/// child at (HSTEP, VSTEP)."
pub fn build_document_layout(root: NodeRef, window_width: f32, fonts: &dyn FontProvider) -> DocumentBox {
    let content_width = window_width - 2.0 * HSTEP as f32;
    let child = layout_block(root.clone(), HSTEP as f32, VSTEP as f32, content_width, fonts);
    let height = child.geometry().height + 2.0 * VSTEP as f32;
    DocumentBox {
        node: root,
        geometry: Geometry {
            x: 0.0,
            y: 0.0,
            width: window_width,
            height,
        },
        child: Box::new(child),
    }
}

/// §4.2 block layout: "sequentially positions children; height defaults
/// to the sum of child heights but may be overridden by a `height`
/// style."
fn layout_block(node: NodeRef, x: f32, y: f32, containing_width: f32, fonts: &dyn FontProvider) -> LayoutBox {
    let width = style_length(&node, "width", containing_width);
    let mut children = Vec::new();
    let mut cursor_y = y;

    for child_node in node.children() {
        if child_node.0.is_text {
            continue;
        }
        let child_box = match layout_mode(&child_node) {
            LayoutMode::Inline => layout_inline(child_node, x, cursor_y, width, fonts),
            LayoutMode::Block => layout_block(child_node, x, cursor_y, width, fonts),
        };
        cursor_y += child_box.geometry().height;
        children.push(child_box);
    }

    let default_height: f32 = children.iter().map(|c| c.geometry().height).sum();
    let height = style_length(&node, "height", default_height);

    LayoutBox::Block(BlockBox {
        node,
        geometry: Geometry { x, y, width, height },
        children,
    })
}

/// Implements §4.2's inline layout: walks the DOM subtree emitting words
/// into the current line box, opening a new one whenever the next word
/// would overflow the box's right edge.
fn layout_inline(node: NodeRef, x: f32, y: f32, containing_width: f32, fonts: &dyn FontProvider) -> LayoutBox {
    let width = style_length(&node, "width", containing_width);

    let mut lines: Vec<Vec<LayoutBox>> = vec![Vec::new()];
    let mut cursor_x = x;
    recurse_inline_content(&node, &mut lines, &mut cursor_x, x, width, fonts);

    let mut cursor_y = y;
    let mut line_boxes = Vec::new();
    for words in lines {
        let mut line = LayoutBox::Line(LineBox {
            node: node.clone(),
            geometry: Geometry { x, y: cursor_y, width, height: 0.0 },
            children: words,
        });
        layout_line(&mut line);
        cursor_y += line.geometry().height;
        line_boxes.push(line);
    }

    let default_height: f32 = line_boxes.iter().map(|l| l.geometry().height).sum();
    let height = style_length(&node, "height", default_height);

    LayoutBox::Inline(InlineBox {
        node,
        geometry: Geometry { x, y, width, height },
        children: line_boxes,
    })
}

fn recurse_inline_content(
    node: &NodeRef,
    lines: &mut Vec<Vec<LayoutBox>>,
    cursor_x: &mut f32,
    line_x: f32,
    width: f32,
    fonts: &dyn FontProvider,
) {
    for child in node.children() {
        if child.0.is_text {
            emit_text(&child, lines, cursor_x, line_x, width, fonts);
        } else if child.0.tag == "br" {
            lines.push(Vec::new());
            *cursor_x = line_x;
        } else if child.0.tag == "input" || child.0.tag == "button" {
            emit_input(&child, lines, cursor_x, line_x, width, fonts);
        } else {
            recurse_inline_content(&child, lines, cursor_x, line_x, width, fonts);
        }
    }
}

fn emit_text(
    text_node: &NodeRef,
    lines: &mut Vec<Vec<LayoutBox>>,
    cursor_x: &mut f32,
    line_x: f32,
    width: f32,
    fonts: &dyn FontProvider,
) {
    let parent = text_node.parent().unwrap_or_else(|| text_node.clone());
    let font = font_for(&parent, fonts);
    let space_width = font.measure_text(" ");
    let contents = text_node.0.text.borrow().clone();
    for word in contents.split_whitespace() {
        let w = font.measure_text(word);
        if *cursor_x + w > line_x + width {
            lines.push(Vec::new());
            *cursor_x = line_x;
        }
        lines.last_mut().unwrap().push(LayoutBox::Text(TextBox {
            node: text_node.clone(),
            geometry: Geometry { x: *cursor_x, y: 0.0, width: w, height: font.linespace() },
            word: word.to_owned(),
            font: font.clone(),
        }));
        *cursor_x += w + space_width;
    }
}

fn emit_input(
    node: &NodeRef,
    lines: &mut Vec<Vec<LayoutBox>>,
    cursor_x: &mut f32,
    line_x: f32,
    width: f32,
    fonts: &dyn FontProvider,
) {
    let w = style_length(node, "width", INPUT_WIDTH_PX);
    if *cursor_x + w > line_x + width {
        lines.push(Vec::new());
        *cursor_x = line_x;
    }
    let font = font_for(node, fonts);
    let h = style_length(node, "height", font.linespace());
    lines.last_mut().unwrap().push(LayoutBox::Input(InputBox {
        node: node.clone(),
        geometry: Geometry { x: *cursor_x, y: 0.0, width: w, height: h },
        font: font.clone(),
    }));
    let space_width = font.measure_text(" ");
    *cursor_x += w + space_width;
}

/// §4.2: "Line layout vertical-aligns words to a baseline: `baseline = y
/// + 1.25·max_ascent`; line height = `1.25·(max_ascent + max_descent)`."
fn layout_line(line: &mut LayoutBox) {
    let y = line.geometry().y;
    let LayoutBox::Line(l) = line else {
        unreachable!("layout_line called on non-line box")
    };

    let mut max_ascent = 0.0f32;
    let mut max_descent = 0.0f32;
    for child in &l.children {
        let (ascent, descent) = match child {
            LayoutBox::Text(t) => t.font.metrics(),
            LayoutBox::Input(i) => i.font.metrics(),
            _ => continue,
        };
        max_ascent = max_ascent.max(-ascent);
        max_descent = max_descent.max(descent);
    }
    let baseline = y + 1.25 * max_ascent;

    for child in &mut l.children {
        match child {
            LayoutBox::Text(t) => {
                let (ascent, _) = t.font.metrics();
                t.geometry.y = baseline + ascent;
            }
            LayoutBox::Input(i) => {
                let (ascent, _) = i.font.metrics();
                i.geometry.y = baseline + ascent;
            }
            _ => {}
        }
    }
    l.geometry.height = if l.children.is_empty() {
        0.0
    } else {
        1.25 * (max_ascent + max_descent)
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::test_support::FakeFontProvider;
    use std::collections::HashMap;

    fn element(tag: &str) -> NodeRef {
        NodeRef::new_element(tag, HashMap::new())
    }

    #[test]
    fn layout_mode_chooses_block_when_any_child_is_block_level() {
        let root = element("div");
        root.append_child(element("p"));
        assert_eq!(layout_mode(&root), LayoutMode::Block);
    }

    #[test]
    fn layout_mode_chooses_inline_for_text_only_children() {
        let root = element("p");
        root.append_child(NodeRef::new_text("hello world"));
        assert_eq!(layout_mode(&root), LayoutMode::Inline);
    }

    #[test]
    fn document_layout_positions_root_block_at_hstep_vstep() {
        let root = element("body");
        let fonts = FakeFontProvider::default();
        let doc = build_document_layout(root, 800.0, &fonts);
        assert_eq!(doc.child.geometry().x, HSTEP as f32);
        assert_eq!(doc.child.geometry().y, VSTEP as f32);
        assert_eq!(doc.child.geometry().width, 800.0 - 2.0 * HSTEP as f32);
    }

    #[test]
    fn block_height_defaults_to_sum_of_children() {
        let root = element("div");
        let a = element("p");
        a.0.computed_style.borrow_mut().insert("height".into(), "20px".into());
        let b = element("p");
        b.0.computed_style.borrow_mut().insert("height".into(), "30px".into());
        root.append_child(a);
        root.append_child(b);
        let fonts = FakeFontProvider::default();
        let block = layout_block(root, 0.0, 0.0, 800.0, &fonts);
        assert_eq!(block.geometry().height, 50.0);
    }

    #[test]
    fn explicit_height_style_overrides_sum_of_children() {
        let root = element("div");
        root.0.computed_style.borrow_mut().insert("height".into(), "999px".into());
        let fonts = FakeFontProvider::default();
        let block = layout_block(root, 0.0, 0.0, 800.0, &fonts);
        assert_eq!(block.geometry().height, 999.0);
    }
}
