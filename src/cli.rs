//! Command-line entry point (§6's "CLI"). Generalizes the teacher's
//! `App`/`SubCommand` pattern down to the single render command this
//! crate supports: there is no `dump-layout` or `similarity` mode here,
//! just a URL and the four flags that feed [`crate::config::Config`].

use clap::{App, Arg, ArgMatches};

const URL_ARG_NAME: &str = "URL";

pub fn setup_and_get_cli_args<'a>() -> ArgMatches<'a> {
    App::new("kestrel")
        .version("0.1")
        .about("A toy two-threaded web browser engine")
        .arg(
            Arg::with_name(URL_ARG_NAME)
                .help("The URL to load on startup.")
                .index(1)
                .required(true),
        )
        .arg(
            Arg::with_name("single_threaded")
                .long("single_threaded")
                .help("Run the main thread synchronously on the compositor thread."),
        )
        .arg(
            Arg::with_name("disable_compositing")
                .long("disable_compositing")
                .help("Group no paint chunks into composited layers; every frame is a full raster."),
        )
        .arg(
            Arg::with_name("disable_gpu")
                .long("disable_gpu")
                .help("Use the software raster surface instead of a GPU-backed one."),
        )
        .arg(
            Arg::with_name("show_composited_layer_borders")
                .long("show_composited_layer_borders")
                .help("Draw a one-pixel border around each composited layer's raster surface."),
        )
        .get_matches()
}

#[derive(Clone, Debug)]
pub struct RenderArgs {
    pub url: String,
    pub single_threaded: bool,
    pub disable_compositing: bool,
    pub disable_gpu: bool,
    pub show_composited_layer_borders: bool,
}

impl RenderArgs {
    pub fn from_matches(matches: &ArgMatches) -> Self {
        RenderArgs {
            url: matches
                .value_of(URL_ARG_NAME)
                .expect("URL is a required positional arg")
                .to_owned(),
            single_threaded: matches.is_present("single_threaded"),
            disable_compositing: matches.is_present("disable_compositing"),
            disable_gpu: matches.is_present("disable_gpu"),
            show_composited_layer_borders: matches.is_present("show_composited_layer_borders"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_default_to_false() {
        let app = App::new("kestrel")
            .arg(Arg::with_name(URL_ARG_NAME).index(1).required(true))
            .arg(Arg::with_name("single_threaded").long("single_threaded"))
            .arg(Arg::with_name("disable_compositing").long("disable_compositing"))
            .arg(Arg::with_name("disable_gpu").long("disable_gpu"))
            .arg(Arg::with_name("show_composited_layer_borders").long("show_composited_layer_borders"));
        let matches = app.get_matches_from(vec!["kestrel", "https://example.com"]);
        let args = RenderArgs::from_matches(&matches);
        assert_eq!(args.url, "https://example.com");
        assert!(!args.single_threaded);
        assert!(!args.disable_compositing);
    }
}
