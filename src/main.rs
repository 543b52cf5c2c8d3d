use kestrel::browser::Browser;
use kestrel::cli::{setup_and_get_cli_args, RenderArgs};
use kestrel::config::Config;
use kestrel::window::glutin_window::GlutinWindowService;

fn main() {
    env_logger::init();

    let matches = setup_and_get_cli_args();
    let args = RenderArgs::from_matches(&matches);
    let config = Config::from_cli(&args);

    let url = url::Url::parse(&args.url).unwrap_or_else(|e| {
        eprintln!("invalid URL '{}': {}", args.url, e);
        std::process::exit(1);
    });

    let window = Box::new(GlutinWindowService::default());
    let mut browser = Browser::new(window, config, url);
    browser.run();
}
