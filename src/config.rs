//! Global configuration threaded through [`crate::browser::Browser`] and
//! [`crate::tab::Tab`], replacing the free-floating module-level flags
//! (`USE_COMPOSITING`, `USE_GPU`, `USE_BROWSER_THREAD`,
//! `SHOW_COMPOSITED_LAYER_BORDERS`) that the original implementation used.

pub const WIDTH: i32 = 800;
pub const HEIGHT: i32 = 600;
pub const HSTEP: i32 = 13;
pub const VSTEP: i32 = 18;
pub const CHROME_PX: i32 = 100;
pub const SCROLL_STEP: f32 = 100.0;
pub const INPUT_WIDTH_PX: f32 = 200.0;
pub const REFRESH_RATE_SEC: f32 = 0.016;

#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Run the main thread synchronously on the compositor thread instead
    /// of spawning a dedicated worker (`--single_threaded`).
    pub use_browser_thread: bool,
    /// Group paint chunks into composited layers at all
    /// (`--disable_compositing` clears this).
    pub use_compositing: bool,
    /// Use a GPU-backed surface for raster (`--disable_gpu` clears this,
    /// and implies `use_compositing = false`).
    pub use_gpu: bool,
    /// Draw a one-pixel red border around each composited layer's raster
    /// surface (`--show_composited_layer_borders`).
    pub show_composited_layer_borders: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            use_browser_thread: true,
            use_compositing: true,
            use_gpu: true,
            show_composited_layer_borders: false,
        }
    }
}

impl Config {
    pub fn from_cli(args: &crate::cli::RenderArgs) -> Self {
        let use_gpu = !args.disable_gpu;
        Config {
            use_browser_thread: !args.single_threaded,
            use_compositing: !args.disable_compositing && use_gpu,
            use_gpu,
            show_composited_layer_borders: args.show_composited_layer_borders,
        }
    }
}
