//! The main-thread orchestrator (§4.8, §4.9): owns the DOM, styles,
//! layout tree, display list, animations, and pending tasks for one tab.

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use url::Url;

use crate::animation::{Animation, Tick};
use crate::commit::{CommitData, CommitMailbox, CompositedUpdate, ScrollBehavior};
use crate::config::{CHROME_PX, HEIGHT, WIDTH};
use crate::dom::NodeRef;
use crate::font::FontProvider;
use crate::js::{JsHost, NullJsHost};
use crate::layout::{self, DocumentBox};
use crate::net::{CookieJar, HttpClient};
use crate::paint;
use crate::style::{self, Rule};
use crate::task::{SingleThreadedTaskRunner, Task, TaskRunner};
use crate::timing::MeasureTime;

/// Sentinel key for the one scroll animation a tab can have at a time;
/// scroll has no owning DOM node, unlike every other animated property.
const SCROLL_ANIMATION_KEY: (usize, &str) = (0, "scroll");

type AnimationKey = (usize, String);

enum MainThreadTaskRunner {
    SingleThreaded(SingleThreadedTaskRunner),
    Threaded(TaskRunner),
}

impl MainThreadTaskRunner {
    fn schedule_task(&self, task: Task) {
        match self {
            MainThreadTaskRunner::SingleThreaded(r) => r.schedule_task(task),
            MainThreadTaskRunner::Threaded(r) => r.schedule_task(task),
        }
    }

    fn clear_pending_tasks(&self) {
        match self {
            MainThreadTaskRunner::SingleThreaded(r) => r.clear_pending_tasks(),
            MainThreadTaskRunner::Threaded(r) => r.clear_pending_tasks(),
        }
    }
}

pub struct Tab {
    pub url: Url,
    history: Vec<Url>,
    document: NodeRef,
    rules: Vec<Rule>,
    layout: Option<DocumentBox>,
    display_list: Option<Vec<crate::paint::display_item::DisplayItem>>,
    animations: HashMap<AnimationKey, Animation>,
    scroll: f32,
    scroll_changed_in_tab: bool,
    scroll_behavior: ScrollBehavior,
    allowed_origins: Option<Vec<String>>,

    needs_render: bool,
    needs_layout: bool,
    needs_paint: bool,
    composited_animation_updates: Vec<crate::dom::NodeWeak>,
    focused_input: Option<crate::dom::NodeWeak>,

    fonts: Rc<dyn FontProvider>,
    js: Box<dyn JsHost>,
    http: Box<dyn HttpClient>,
    cookies: Arc<CookieJar>,
    task_runner: MainThreadTaskRunner,
    mailbox: Arc<CommitMailbox>,
    measure_render: MeasureTime,
}

// SAFETY: a Tab's DOM/layout/display-list graph is `Rc`-based by design
// (dom.rs) and is only ever touched from the single worker thread it was
// constructed on and is pinned to for its whole lifetime (browser.rs's
// `TabHandle`). The compositor thread never reaches into a `Tab` directly;
// it only posts commands through a channel and reads results back through
// `CommitMailbox`, and both of those synchronize-with the next access. No
// two threads ever hold a live reference into this graph concurrently, so
// `Rc`'s non-atomic refcounting never races.
unsafe impl Send for Tab {}

impl Tab {
    pub fn new(
        url: Url,
        fonts: Rc<dyn FontProvider>,
        http: Box<dyn HttpClient>,
        cookies: Arc<CookieJar>,
        mailbox: Arc<CommitMailbox>,
        single_threaded: bool,
    ) -> Self {
        Tab {
            url: url.clone(),
            history: vec![url],
            document: NodeRef::new_element("html", HashMap::new()),
            rules: Vec::new(),
            layout: None,
            display_list: None,
            animations: HashMap::new(),
            scroll: 0.0,
            scroll_changed_in_tab: false,
            scroll_behavior: ScrollBehavior::Auto,
            allowed_origins: None,
            needs_render: true,
            needs_layout: true,
            needs_paint: true,
            composited_animation_updates: Vec::new(),
            focused_input: None,
            fonts,
            js: Box::new(NullJsHost),
            http,
            cookies,
            task_runner: if single_threaded {
                MainThreadTaskRunner::SingleThreaded(SingleThreadedTaskRunner::default())
            } else {
                MainThreadTaskRunner::Threaded(TaskRunner::new())
            },
            mailbox,
            measure_render: MeasureTime::new("render"),
        }
    }

    pub fn set_js_host(&mut self, js: Box<dyn JsHost>) {
        self.js = js;
    }

    pub fn set_document(&mut self, document: NodeRef, rules: Vec<Rule>) {
        self.document = document;
        self.rules = rules;
        self.invalidate_style_and_layout();
    }

    pub fn set_content_security_policy(&mut self, allowed_origins: Option<Vec<String>>) {
        self.allowed_origins = allowed_origins;
    }

    /// §7's CSP enforcement: deny and log, never abort other resources.
    pub fn is_allowed(&self, url: &Url) -> bool {
        match &self.allowed_origins {
            None => true,
            Some(allowed) => allowed.iter().any(|origin| url.as_str().starts_with(origin)),
        }
    }

    fn invalidate_style_and_layout(&mut self) {
        self.needs_render = true;
        self.needs_layout = true;
        self.needs_paint = true;
    }

    fn invalidate_layout(&mut self) {
        self.needs_layout = true;
        self.needs_paint = true;
    }

    /// §4.8: runs exactly the stages whose flag is set, then clears every
    /// flag (harmless for the ones that were already false).
    pub fn render(&mut self) {
        self.measure_render.start();
        if self.needs_render {
            self.run_style();
        }
        if self.needs_layout {
            self.run_layout();
        }
        if self.needs_paint {
            self.run_paint();
        }
        self.needs_render = false;
        self.needs_layout = false;
        self.needs_paint = false;
        self.measure_render.stop();
    }

    fn run_style(&mut self) {
        let mut transitions = Vec::new();
        style::style_tree(&self.document, &self.rules, None, &mut transitions);
        for (node, start) in transitions {
            if let Some(animation) = Animation::from_transition(node.downgrade(), &start) {
                self.animations.insert((node.id(), animation.property().to_owned()), animation);
            }
        }
        self.scroll_behavior = self
            .find_body()
            .and_then(|body| body.style("scroll-behavior"))
            .map(|v| if v == "smooth" { ScrollBehavior::Smooth } else { ScrollBehavior::Auto })
            .unwrap_or(ScrollBehavior::Auto);
    }

    fn find_body(&self) -> Option<NodeRef> {
        self.document.tree_to_list().into_iter().find(|n| !n.0.is_text && n.0.tag == "body")
    }

    fn run_layout(&mut self) {
        self.layout = Some(layout::build_document_layout(self.document.clone(), WIDTH as f32, &*self.fonts));
    }

    fn run_paint(&mut self) {
        if let Some(doc) = &self.layout {
            self.display_list = Some(paint::paint_document(doc, true));
        }
    }

    pub fn document_height(&self) -> f32 {
        self.layout.as_ref().map(|d| d.geometry.height).unwrap_or(0.0)
    }

    /// §4.9: the per-frame tick driven by the compositor's refresh timer.
    pub fn run_animation_frame(&mut self, external_scroll: Option<f32>) -> CommitData {
        if let Some(target) = external_scroll {
            if !self.animations.contains_key(&(SCROLL_ANIMATION_KEY.0, SCROLL_ANIMATION_KEY.1.to_owned())) {
                match self.scroll_behavior {
                    ScrollBehavior::Smooth => {
                        let delta = target - self.scroll;
                        self.animations
                            .insert((SCROLL_ANIMATION_KEY.0, SCROLL_ANIMATION_KEY.1.to_owned()), Animation::start_scroll(self.scroll, delta));
                    }
                    ScrollBehavior::Auto => {
                        self.scroll = target;
                        self.scroll_changed_in_tab = true;
                    }
                }
            }
        }

        self.js.request_animation_frame();

        let mut completed = Vec::new();
        let mut layout_invalidated = false;
        let mut paint_invalidated = false;
        let mut new_scroll = None;
        let mut composited_nodes = Vec::new();
        for (key, animation) in self.animations.iter_mut() {
            let tick = animation.animate();
            if animation.is_layout_invalidating() {
                layout_invalidated = true;
            } else {
                paint_invalidated = true;
                if let Some(node) = animation.node() {
                    composited_nodes.push(node);
                }
            }
            if let Animation::Scroll(scroll) = animation {
                new_scroll = Some(scroll.current);
            }
            if tick == Tick::Completed {
                completed.push(key.clone());
            }
        }
        for key in completed {
            self.animations.remove(&key);
        }
        if layout_invalidated {
            self.invalidate_layout();
        }
        if paint_invalidated {
            self.needs_paint = true;
        }
        if let Some(scroll) = new_scroll {
            self.scroll = scroll;
            self.scroll_changed_in_tab = true;
        }
        self.composited_animation_updates.extend(composited_nodes);

        // Snapshot before `render()` clears these: a composited-only
        // animation tick always sets `needs_paint` (to rebuild the display
        // list locally), so "did paint run" can't distinguish that case
        // from a real style/layout change. `needs_render`/`needs_layout`
        // can (`examples/original_source/src/lab13.py:1340`).
        let needs_composite = self.needs_render || self.needs_layout;
        self.render();

        let max_scroll = (self.document_height() - (HEIGHT - CHROME_PX) as f32).max(0.0);
        self.scroll = self.scroll.clamp(0.0, max_scroll);

        let display_list = if needs_composite { self.display_list.clone() } else { None };
        let composited_updates = if needs_composite {
            self.composited_animation_updates.clear();
            Vec::new()
        } else {
            self.composited_animation_updates
                .drain(..)
                .filter_map(|node| {
                    let upgraded = node.upgrade()?;
                    let transform = upgraded.0.transform.borrow().clone()?;
                    let save_layer = upgraded.0.save_layer.borrow().clone()?;
                    Some(CompositedUpdate { node, transform, save_layer })
                })
                .collect()
        };

        let scroll = if self.scroll_changed_in_tab { Some(self.scroll) } else { None };
        self.scroll_changed_in_tab = false;

        let data = CommitData {
            url: self.url.to_string(),
            scroll,
            document_height: self.document_height(),
            display_list,
            composited_updates,
            scroll_behavior: self.scroll_behavior,
        };
        self.mailbox.commit(data.clone());
        data
    }

    /// §4.11: hit-tests the layout tree, then walks up the DOM from the
    /// deepest hit box looking for `<a>`, `<input>`, or `<button>`.
    pub fn click(&mut self, x: f32, y: f32) {
        let hit_node = {
            let Some(layout) = &self.layout else { return };
            layout
                .child
                .tree_to_list()
                .into_iter()
                .filter(|b| {
                    let r = b.geometry().rect();
                    r.left <= x && x <= r.right && r.top <= y && y <= r.bottom
                })
                .last()
                .map(|b| b.node().clone())
        };
        let Some(hit_node) = hit_node else { return };
        let mut node = Some(hit_node);
        while let Some(n) = node {
            if n.0.is_text {
                node = n.parent();
                continue;
            }
            match n.0.tag.as_str() {
                "a" => {
                    if let Some(href) = n.0.attributes.get("href") {
                        if let Ok(target) = self.url.join(href) {
                            self.load(target);
                        }
                    }
                    return;
                }
                "input" => {
                    *n.0.value.borrow_mut() = String::new();
                    self.focused_input = Some(n.downgrade());
                    self.needs_paint = true;
                    return;
                }
                "button" => {
                    self.submit_enclosing_form(&n);
                    return;
                }
                _ => node = n.parent(),
            }
        }
    }

    fn submit_enclosing_form(&mut self, button: &NodeRef) {
        let mut node = Some(button.clone());
        while let Some(n) = node {
            if n.0.tag == "form" {
                self.submit_form(&n);
                return;
            }
            node = n.parent();
        }
    }

    /// URL-encodes every `<input name=...>` under `form` and navigates to
    /// the form's `action` (§4.11's click semantics; no GET/POST
    /// distinction beyond query-string vs. body is modeled).
    fn submit_form(&mut self, form: &NodeRef) {
        let inputs: Vec<NodeRef> = form
            .tree_to_list()
            .into_iter()
            .filter(|n| !n.0.is_text && n.0.tag == "input")
            .collect();
        let body = inputs
            .iter()
            .filter_map(|input| {
                let name = input.0.attributes.get("name")?;
                let value = input.0.value.borrow().clone();
                Some(format!("{}={}", urlencode(name), urlencode(&value)))
            })
            .collect::<Vec<_>>()
            .join("&");
        if let Some(action) = form.0.attributes.get("action") {
            if let Ok(target) = self.url.join(action) {
                self.navigate_with_payload(target, Some(body));
            }
        }
    }

    /// §4.11: key presses route to the active tab's focused element when
    /// the chrome doesn't claim them first (address bar, back, etc).
    pub fn handle_text_input(&mut self, text: &str) {
        let Some(node) = self.focused_input.as_ref().and_then(|n| n.upgrade()) else {
            return;
        };
        node.0.value.borrow_mut().push_str(text);
        self.needs_paint = true;
    }

    fn navigate_with_payload(&mut self, url: Url, payload: Option<String>) {
        if !self.is_allowed(&url) {
            log::warn!("CSP denied navigation to {}", url);
            return;
        }
        match self.http.request(&url, Some(&self.url), payload.as_deref()) {
            Ok(_) => {
                self.url = url.clone();
                self.history.push(url);
                self.task_runner.clear_pending_tasks();
                self.invalidate_style_and_layout();
            }
            Err(e) => log::warn!("navigation fetch failed: {}", e),
        }
    }

    /// §5's cancellation rule: pending tasks (timers, in-flight XHR
    /// continuations) are discarded, not awaited.
    pub fn load(&mut self, url: Url) {
        self.navigate_with_payload(url, None);
    }

    pub fn go_back(&mut self) {
        if self.history.len() > 1 {
            self.history.pop();
            if let Some(previous) = self.history.last().cloned() {
                self.url = previous.clone();
                self.task_runner.clear_pending_tasks();
                self.invalidate_style_and_layout();
            }
        }
    }

    /// §5's `setTimeout`: a detached one-shot timer thread that schedules
    /// a single task back onto this tab when it fires.
    pub fn set_timeout(&self, millis: u64, callback: impl FnOnce() + Send + 'static) {
        std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(millis));
            callback();
        });
    }

    pub fn schedule_task(&self, task: Task) {
        self.task_runner.schedule_task(task);
    }
}

/// Minimal `application/x-www-form-urlencoded` escaping for form submission
/// (§4.11); only the characters that must be escaped are.
fn urlencode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(byte as char),
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::test_support::FakeFontProvider;
    use crate::net::HttpClient;
    use std::collections::HashMap as Map;

    struct StubHttp;
    impl HttpClient for StubHttp {
        fn request(&self, _url: &Url, _referrer: Option<&Url>, _payload: Option<&str>) -> Result<(Map<String, String>, String), crate::error::NetworkError> {
            Ok((Map::new(), String::new()))
        }
    }

    fn make_tab() -> Tab {
        Tab::new(
            Url::parse("https://example.com").unwrap(),
            Rc::new(FakeFontProvider::default()),
            Box::new(StubHttp),
            Arc::new(CookieJar::default()),
            Arc::new(CommitMailbox::default()),
            true,
        )
    }

    #[test]
    fn render_clears_all_flags_on_full_invalidation() {
        let mut tab = make_tab();
        tab.render();
        assert!(!tab.needs_render && !tab.needs_layout && !tab.needs_paint);
    }

    #[test]
    fn paint_only_render_preserves_layout_object_identity() {
        let mut tab = make_tab();
        tab.render();
        let layout_ptr_before = tab.layout.as_ref().map(|l| l as *const DocumentBox);
        tab.needs_paint = true;
        tab.render();
        let layout_ptr_after = tab.layout.as_ref().map(|l| l as *const DocumentBox);
        assert_eq!(layout_ptr_before, layout_ptr_after);
    }

    #[test]
    fn scroll_clamps_into_valid_range() {
        let mut tab = make_tab();
        tab.render();
        let data = tab.run_animation_frame(Some(1_000_000.0));
        assert!(data.document_height >= 0.0);
        assert!(tab.scroll >= 0.0);
    }
}
