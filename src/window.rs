//! The OS windowing/GPU-surface interface (§6). `glutin` backs the one
//! production implementation, matching the teacher's dependency; the
//! core only depends on this trait so it can run headless in tests.

use crate::canvas::Surface;

#[derive(Clone, Debug, PartialEq)]
pub enum WindowEvent {
    Quit,
    MouseUp { x: f32, y: f32 },
    KeyDown { code: char },
    TextInput { text: String },
}

pub trait WindowService {
    fn open(&mut self, width: u32, height: u32, use_gpu: bool);
    /// Drains and returns every event observed since the last call;
    /// non-blocking.
    fn poll_events(&mut self) -> Vec<WindowEvent>;
    fn root_surface(&mut self) -> &mut dyn Surface;
    fn swap_buffers(&mut self);
}

/// The `glutin`-backed implementation used by the windowed binary. Since
/// the OS windowing/GPU surface provider is an external collaborator
/// (§1), this only needs to translate glutin's event loop into
/// [`WindowEvent`]s and hand back a raster surface to paint into; a real
/// GPU-backed [`Surface`] is left to the embedder.
pub mod glutin_window {
    use super::*;
    use crate::canvas::RasterSurface;
    use glutin::event::{ElementState, Event, KeyboardInput, MouseButton, VirtualKeyCode, WindowEvent as GlutinEvent};
    use glutin::event_loop::EventLoop;
    use glutin::platform::run_return::EventLoopExtRunReturn;
    use glutin::window::WindowBuilder;
    use glutin::{ContextBuilder, ContextWrapper, PossiblyCurrent};

    pub struct GlutinWindowService {
        event_loop: EventLoop<()>,
        context: Option<ContextWrapper<PossiblyCurrent, glutin::window::Window>>,
        surface: RasterSurface,
        last_cursor_pos: (f32, f32),
    }

    impl Default for GlutinWindowService {
        fn default() -> Self {
            GlutinWindowService {
                event_loop: EventLoop::new(),
                context: None,
                surface: RasterSurface::new(1, 1),
                last_cursor_pos: (0.0, 0.0),
            }
        }
    }

    impl WindowService for GlutinWindowService {
        fn open(&mut self, width: u32, height: u32, use_gpu: bool) {
            let window_builder = WindowBuilder::new()
                .with_title("kestrel")
                .with_inner_size(glutin::dpi::LogicalSize::new(width, height));
            let windowed_context = ContextBuilder::new()
                .with_vsync(true)
                .build_windowed(window_builder, &self.event_loop)
                .expect("failed to create a glutin window");
            let windowed_context = unsafe {
                windowed_context
                    .make_current()
                    .expect("failed to make glutin context current")
            };
            gl::load_with(|symbol| windowed_context.get_proc_address(symbol) as *const _);
            let _ = use_gpu;
            self.context = Some(windowed_context);
            self.surface = RasterSurface::new(width, height);
        }

        fn poll_events(&mut self) -> Vec<WindowEvent> {
            let mut events = Vec::new();
            let last_cursor_pos = &mut self.last_cursor_pos;
            self.event_loop.run_return(|event, _, control_flow| {
                *control_flow = glutin::event_loop::ControlFlow::Exit;
                if let Event::WindowEvent { event, .. } = event {
                    match event {
                        GlutinEvent::CloseRequested => events.push(WindowEvent::Quit),
                        GlutinEvent::CursorMoved { position, .. } => {
                            *last_cursor_pos = (position.x as f32, position.y as f32);
                        }
                        GlutinEvent::MouseInput {
                            state: ElementState::Released,
                            button: MouseButton::Left,
                            ..
                        } => events.push(WindowEvent::MouseUp {
                            x: last_cursor_pos.0,
                            y: last_cursor_pos.1,
                        }),
                        GlutinEvent::ReceivedCharacter(c) => events.push(WindowEvent::TextInput { text: c.to_string() }),
                        GlutinEvent::KeyboardInput {
                            input: KeyboardInput {
                                state: ElementState::Pressed,
                                virtual_keycode: Some(key),
                                ..
                            },
                            ..
                        } => {
                            if let Some(code) = keycode_to_char(key) {
                                events.push(WindowEvent::KeyDown { code });
                            }
                        }
                        _ => {}
                    }
                }
            });
            events
        }

        fn root_surface(&mut self) -> &mut dyn Surface {
            &mut self.surface
        }

        fn swap_buffers(&mut self) {
            if let Some(context) = &self.context {
                unsafe {
                    gl::Clear(gl::COLOR_BUFFER_BIT);
                }
                let _ = context.swap_buffers();
            }
        }
    }

    fn keycode_to_char(key: VirtualKeyCode) -> Option<char> {
        match key {
            VirtualKeyCode::Return => Some('\n'),
            VirtualKeyCode::Back => Some('\u{8}'),
            VirtualKeyCode::Escape => Some('\u{1b}'),
            VirtualKeyCode::Down => Some('\u{F700}'),
            _ => None,
        }
    }
}
