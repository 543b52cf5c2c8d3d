//! The compositor-thread orchestrator (§4.7, §4.11): owns the window
//! surface, composited layers, scroll, and chrome; drives frame scheduling
//! and dispatches input to the active tab's own worker thread.

use std::rc::Rc;
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use url::Url;

use crate::canvas::{Canvas, Color, Paint, Surface};
use crate::commit::{CommitData, CommitMailbox, ScrollBehavior};
use crate::compositor::{self, CompositedLayer, CompositorFlags};
use crate::config::{Config, CHROME_PX, HEIGHT, REFRESH_RATE_SEC, SCROLL_STEP, WIDTH};
use crate::font::{system::SystemFontProvider, FontProvider};
use crate::layout::rect::Rect;
use crate::net::{CookieJar, HttpClient, IsahcHttpClient};
use crate::paint::chunk;
use crate::tab::Tab;
use crate::timing::MeasureTime;
use crate::window::{WindowEvent, WindowService};

enum BrowserCommand {
    Click { x: f32, y: f32 },
    TextInput(String),
    Load(Url),
    GoBack,
    AnimationFrame { scroll: Option<f32> },
    Quit,
}

/// A handle to a tab's own worker thread (§1.2's "main thread"). Holds no
/// DOM state itself; every interaction goes through `commands`, and every
/// result comes back through `mailbox`.
struct TabHandle {
    commands: Sender<BrowserCommand>,
    mailbox: Arc<CommitMailbox>,
    worker: Option<JoinHandle<()>>,
}

impl TabHandle {
    fn spawn(url: Url, single_threaded: bool, cookies: Arc<CookieJar>) -> Self {
        let mailbox = Arc::new(CommitMailbox::default());
        let mailbox_for_worker = mailbox.clone();
        let (tx, rx) = mpsc::channel::<BrowserCommand>();
        let worker = std::thread::Builder::new()
            .name("kestrel-main-thread".into())
            .spawn(move || {
                let fonts: Rc<dyn FontProvider> = Rc::new(SystemFontProvider::default());
                let http: Box<dyn HttpClient> = Box::new(IsahcHttpClient);
                let mut tab = Tab::new(url.clone(), fonts, http, cookies, mailbox_for_worker, single_threaded);
                tab.load(url);
                for command in rx {
                    match command {
                        BrowserCommand::Click { x, y } => tab.click(x, y),
                        BrowserCommand::TextInput(text) => tab.handle_text_input(&text),
                        BrowserCommand::Load(url) => tab.load(url),
                        BrowserCommand::GoBack => tab.go_back(),
                        BrowserCommand::AnimationFrame { scroll } => {
                            tab.run_animation_frame(scroll);
                        }
                        BrowserCommand::Quit => break,
                    }
                }
            })
            .expect("failed to spawn tab worker thread");
        TabHandle {
            commands: tx,
            mailbox,
            worker: Some(worker),
        }
    }

    fn send(&self, command: BrowserCommand) {
        let _ = self.commands.send(command);
    }
}

impl Drop for TabHandle {
    fn drop(&mut self) {
        self.send(BrowserCommand::Quit);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Focus {
    AddressBar,
    Content,
}

/// Applies §4.7's commit-consumption rules to `flags` in place: an empty
/// `composited_layers` set (first commit, or the tab-switch reset in
/// `set_active_tab`) forces a full composite; any other commit only
/// needs a draw pass, whether or not it carries a `display_list`
/// (`examples/original_source/src/lab13.py:1701-1706` keys this decision
/// off `len(self.composited_layers) == 0` alone).
fn apply_commit_to_flags(flags: &mut CompositorFlags, commit: &CommitData, layers_empty: bool) {
    if layers_empty {
        flags.set_needs_composite();
    } else if !commit.composited_updates.is_empty() {
        flags.set_needs_draw();
    }
}

const TAB_STRIP_HEIGHT: f32 = 40.0;
const TAB_WIDTH: f32 = 80.0;
const TAB_STRIP_START_X: f32 = 40.0;
const NEW_TAB_BUTTON: (f32, f32, f32, f32) = (10.0, 10.0, 30.0, 30.0);
const BACK_BUTTON: (f32, f32, f32, f32) = (10.0, 50.0, 35.0, 90.0);
const ADDRESS_BAR_LEFT: f32 = 50.0;
const HOMEPAGE: &str = "https://browser.engineering/";

fn in_rect(x: f32, y: f32, rect: (f32, f32, f32, f32)) -> bool {
    x >= rect.0 && x < rect.2 && y >= rect.1 && y < rect.3
}

pub struct Browser {
    config: Config,
    window: Box<dyn WindowService>,
    tabs: Vec<TabHandle>,
    active_tab: usize,
    display_list: Option<Vec<crate::paint::display_item::DisplayItem>>,
    layers: Vec<CompositedLayer>,
    flags: CompositorFlags,
    scroll: f32,
    document_height: f32,
    pending_scroll: Option<f32>,
    focus: Focus,
    address_bar_text: String,
    cookies: Arc<CookieJar>,
    raster_timer: MeasureTime,
    draw_timer: MeasureTime,
}

impl Browser {
    pub fn new(mut window: Box<dyn WindowService>, config: Config, start_url: Url) -> Self {
        window.open(WIDTH as u32, HEIGHT as u32, config.use_gpu);
        let cookies = Arc::new(CookieJar::default());
        let address_bar_text = start_url.to_string();
        let tab = TabHandle::spawn(start_url, !config.use_browser_thread, cookies.clone());
        Browser {
            config,
            window,
            tabs: vec![tab],
            active_tab: 0,
            display_list: None,
            layers: Vec::new(),
            flags: CompositorFlags::default(),
            scroll: 0.0,
            document_height: 0.0,
            pending_scroll: None,
            focus: Focus::Content,
            address_bar_text,
            cookies,
            raster_timer: MeasureTime::new("raster"),
            draw_timer: MeasureTime::new("draw"),
        }
    }

    fn active_tab(&self) -> &TabHandle {
        &self.tabs[self.active_tab]
    }

    /// Opens `url` in a brand-new tab and switches to it (§4.11: the "+"
    /// button and the browser's own startup navigation both go through
    /// this path).
    fn new_tab(&mut self, url: Url) {
        let tab = TabHandle::spawn(url, !self.config.use_browser_thread, self.cookies.clone());
        self.tabs.push(tab);
        self.set_active_tab(self.tabs.len() - 1);
    }

    /// Switches the active tab and drops whatever compositor state
    /// belonged to the previous one; the next commit from the new active
    /// tab repopulates it (§4.11's tab-switch semantics).
    fn set_active_tab(&mut self, index: usize) {
        self.active_tab = index;
        self.display_list = None;
        self.layers.clear();
        self.scroll = 0.0;
        self.document_height = 0.0;
        self.focus = Focus::Content;
        self.flags.set_needs_composite();
    }

    /// §4.11: chrome-area clicks are handled synchronously here; content
    /// clicks are forwarded to the active tab as a task.
    pub fn handle_event(&mut self, event: WindowEvent) -> bool {
        match event {
            WindowEvent::Quit => return false,
            WindowEvent::MouseUp { x, y } => {
                if y < CHROME_PX as f32 {
                    self.handle_chrome_click(x, y);
                } else {
                    self.active_tab().send(BrowserCommand::Click { x, y: y - CHROME_PX as f32 });
                }
            }
            WindowEvent::KeyDown { code } => self.handle_key(code),
            WindowEvent::TextInput { text } => {
                if self.focus == Focus::AddressBar {
                    self.address_bar_text.push_str(&text);
                } else {
                    self.active_tab().send(BrowserCommand::TextInput(text));
                }
            }
        }
        true
    }

    fn handle_chrome_click(&mut self, x: f32, y: f32) {
        if y < TAB_STRIP_HEIGHT {
            if in_rect(x, y, NEW_TAB_BUTTON) {
                if let Ok(url) = Url::parse(HOMEPAGE) {
                    self.new_tab(url);
                }
            } else if x >= TAB_STRIP_START_X {
                let index = ((x - TAB_STRIP_START_X) / TAB_WIDTH) as usize;
                if index < self.tabs.len() {
                    self.set_active_tab(index);
                }
            }
        } else if in_rect(x, y, BACK_BUTTON) {
            self.active_tab().send(BrowserCommand::GoBack);
        } else if x >= ADDRESS_BAR_LEFT {
            self.focus = Focus::AddressBar;
            self.address_bar_text.clear();
        }
    }

    fn handle_key(&mut self, code: char) {
        match (self.focus, code) {
            (Focus::AddressBar, '\n') => {
                if let Ok(url) = Url::parse(&self.address_bar_text) {
                    self.active_tab().send(BrowserCommand::Load(url));
                }
                self.focus = Focus::Content;
            }
            (Focus::AddressBar, '\u{8}') => {
                self.address_bar_text.pop();
            }
            (Focus::Content, '\u{1b}') => self.focus = Focus::Content,
            (Focus::Content, _) if code as u32 == 0xF700 => {
                // Down arrow: scroll by SCROLL_STEP, clamped to what the
                // last commit reported as the document's height.
                let max_scroll = (self.document_height - (HEIGHT - CHROME_PX) as f32).max(0.0);
                self.pending_scroll = Some((self.scroll + SCROLL_STEP).min(max_scroll));
            }
            _ => self.active_tab().send(BrowserCommand::TextInput(code.to_string())),
        }
    }

    /// Drives one animation-frame tick on the active tab, handing it
    /// whatever scroll request accumulated since the last tick (§4.9).
    pub fn run_animation_frame(&mut self) {
        let scroll = self.pending_scroll.take();
        self.active_tab().send(BrowserCommand::AnimationFrame { scroll });
    }

    /// Reads at most one pending commit from the active tab and folds it
    /// into compositor state (§4.7). A commit from a tab that has since
    /// stopped being active is left in its mailbox, matching the
    /// original's `if tab == self.tabs[self.active_tab]` guard.
    pub fn consume_commit(&mut self) {
        let Some(commit) = self.active_tab().mailbox.take() else { return };
        apply_commit_to_flags(&mut self.flags, &commit, self.layers.is_empty());
        self.document_height = commit.document_height;
        if let Some(scroll) = commit.scroll {
            self.scroll = scroll;
        }
        if let Some(display_list) = commit.display_list {
            self.display_list = Some(display_list);
        }
        for update in &commit.composited_updates {
            compositor::apply_composited_update(&mut self.layers, &update.node, Some(&update.transform), Some(&update.save_layer));
        }
    }

    /// §4.7's composite → raster → draw pipeline, only running the stages
    /// `self.flags` marks as dirty.
    pub fn composite_raster_and_draw(&mut self) {
        if self.flags.needs_composite {
            if let Some(display_list) = &self.display_list {
                let chunks = chunk::flatten(display_list);
                self.layers = compositor::assign_layers(chunks, self.config.use_compositing);
            }
        }
        if self.flags.needs_raster {
            self.raster_timer.start();
            let use_gpu = self.config.use_gpu;
            for layer in &mut self.layers {
                layer.raster(self.config.use_compositing, &|w, h| make_surface(w, h, use_gpu));
            }
            self.raster_timer.stop();
        }
        if self.flags.needs_draw {
            self.draw_timer.start();
            self.draw_frame();
            self.draw_timer.stop();
        }
        self.flags.clear();
    }

    fn draw_frame(&mut self) {
        let address_bar_text = self.address_bar_text.clone();
        let tab_count = self.tabs.len();
        let active_tab = self.active_tab;
        let use_compositing = self.config.use_compositing;
        let scroll = self.scroll;
        let canvas = self.window.root_surface().get_canvas();
        canvas.clear(Color::WHITE);
        draw_chrome(canvas, &address_bar_text, tab_count, active_tab);
        canvas.save();
        canvas.translate(0.0, CHROME_PX as f32 - scroll);
        for layer in &mut self.layers {
            layer.draw(canvas, (0.0, CHROME_PX as f32), use_compositing);
        }
        canvas.restore();
        self.window.swap_buffers();
    }

    /// Blocks, polling window events and stepping the frame loop at
    /// `REFRESH_RATE_SEC`, until a quit event is observed.
    pub fn run(&mut self) {
        loop {
            let mut should_quit = false;
            for event in self.window.poll_events() {
                if !self.handle_event(event) {
                    should_quit = true;
                }
            }
            if should_quit {
                break;
            }
            self.run_animation_frame();
            self.consume_commit();
            self.composite_raster_and_draw();
            std::thread::sleep(Duration::from_secs_f32(REFRESH_RATE_SEC));
        }
    }
}

fn make_surface(width: u32, height: u32, use_gpu: bool) -> Box<dyn Surface> {
    let _ = use_gpu;
    Box::new(crate::canvas::RasterSurface::new(width, height))
}

/// Draws the fixed chrome strip: the tab strip with a "+" button, the
/// back button, and the address bar showing `address_bar_text` (§4.11,
/// grounded in the original's `raster_chrome`).
fn draw_chrome(canvas: &mut dyn Canvas, address_bar_text: &str, tab_count: usize, active_tab: usize) {
    canvas.draw_rect(Rect::from_ltrb(0.0, 0.0, WIDTH as f32, CHROME_PX as f32), Paint { color: Color::WHITE, ..Default::default() });

    for i in 0..tab_count {
        let x1 = TAB_STRIP_START_X + TAB_WIDTH * i as f32;
        let x2 = x1 + TAB_WIDTH;
        canvas.draw_line(x1, 0.0, x1, TAB_STRIP_HEIGHT);
        canvas.draw_line(x2, 0.0, x2, TAB_STRIP_HEIGHT);
        canvas.draw_text(x1 + 10.0, 10.0, &format!("Tab {}", i), Color::BLACK);
        if i == active_tab {
            canvas.draw_line(0.0, TAB_STRIP_HEIGHT, x1, TAB_STRIP_HEIGHT);
            canvas.draw_line(x2, TAB_STRIP_HEIGHT, WIDTH as f32, TAB_STRIP_HEIGHT);
        }
    }

    let (nx1, ny1, nx2, ny2) = NEW_TAB_BUTTON;
    canvas.draw_rrect(Rect::from_ltrb(nx1, ny1, nx2, ny2), 0.0, Paint::default());
    canvas.draw_text(nx1 + 1.0, ny1 - 6.0, "+", Color::BLACK);

    canvas.draw_rect(
        Rect::from_ltrb(ADDRESS_BAR_LEFT, 50.0, WIDTH as f32 - 10.0, 90.0),
        Paint { color: Color::WHITE, ..Default::default() },
    );
    canvas.draw_text(55.0, 55.0, address_bar_text, Color::BLACK);

    let (bx1, by1, bx2, by2) = BACK_BUTTON;
    canvas.draw_rrect(Rect::from_ltrb(bx1, by1, bx2, by2), 0.0, Paint::default());
    canvas.draw_line(bx1 + 5.0, (by1 + by2) / 2.0, bx2 - 5.0, by1 + 5.0);
    canvas.draw_line(bx1 + 5.0, (by1 + by2) / 2.0, bx2 - 5.0, by2 - 5.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::CompositedUpdate;
    use crate::paint::display_item::{DisplayItem, DrawRect};

    fn empty_commit() -> CommitData {
        CommitData {
            url: "https://example.com".to_owned(),
            scroll: None,
            document_height: 100.0,
            display_list: None,
            composited_updates: Vec::new(),
            scroll_behavior: ScrollBehavior::Auto,
        }
    }

    #[test]
    fn first_commit_forces_full_composite_even_without_display_list() {
        let mut flags = CompositorFlags::default();
        apply_commit_to_flags(&mut flags, &empty_commit(), true);
        assert!(flags.needs_composite);
    }

    #[test]
    fn display_list_alone_does_not_force_composite_once_layers_exist() {
        let mut commit = empty_commit();
        commit.display_list = Some(vec![DisplayItem::DrawRect(DrawRect {
            rect: Rect::from_ltrb(0.0, 0.0, 10.0, 10.0),
            color: Color::BLACK,
        })]);
        let mut flags = CompositorFlags::default();
        apply_commit_to_flags(&mut flags, &commit, false);
        assert!(!flags.needs_composite);
    }

    #[test]
    fn commit_with_only_composited_updates_forces_draw_only() {
        let node = crate::dom::NodeRef::new_element("div", Default::default());
        let mut commit = empty_commit();
        commit.composited_updates.push(CompositedUpdate {
            node: node.downgrade(),
            transform: DisplayItem::DrawRect(DrawRect {
                rect: Rect::empty(),
                color: Color::BLACK,
            }),
            save_layer: DisplayItem::DrawRect(DrawRect {
                rect: Rect::empty(),
                color: Color::BLACK,
            }),
        });
        let mut flags = CompositorFlags::default();
        apply_commit_to_flags(&mut flags, &commit, false);
        assert!(!flags.needs_composite);
        assert!(flags.needs_draw);
    }
}
