//! Error types for the boundaries described in the design's error-handling
//! section: CSS parsing, network fetches, CSP enforcement, and the JS host.
//!
//! Internal invariant violations are not represented here — per design,
//! those are fatal and are raised with `assert!`/`unreachable!` rather than
//! propagated as `Result`s.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("unexpected end of input while parsing {0}")]
    UnexpectedEof(&'static str),
    #[error("expected literal '{expected}' at byte {pos}")]
    ExpectedLiteral { expected: char, pos: usize },
}

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: isahc::Error,
    },
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

#[derive(Error, Debug)]
#[error("content security policy denied load of {url} (allowed origins: {allowed:?})")]
pub struct CspViolation {
    pub url: String,
    pub allowed: Vec<String>,
}

#[derive(Error, Debug)]
#[error("script {script} crashed: {message}")]
pub struct JsRuntimeError {
    pub script: String,
    pub message: String,
}
