#![forbid(unsafe_code)]

//! `mmdc` converts Mermaid diagram definitions into SVG, PNG or PDF by driving a headless
//! Chromium that runs the Mermaid JS bundle.
//!
//! One conversion is a strictly linear sequence:
//! - [`options::resolve`]: validate the command-line options (no browser involved)
//! - [`browser`]: launch one browser, open one page on the local bootstrap document
//! - [`inject`]: write the definition into the page and let Mermaid render it
//! - [`capture`]: extract SVG markup, a PNG clip of the diagram, or a PDF
//! - [`sink`]: write the result to a file or stdout, then close the browser

pub mod bootstrap;
pub mod browser;
pub mod capture;
pub mod error;
pub mod inject;
pub mod launch;
pub mod options;
pub mod pipeline;
pub mod sink;

pub use browser::{ChromeLauncher, Launcher, PageSession};
pub use capture::Artifact;
pub use error::{Error, Result, Stage};
pub use launch::LaunchOptions;
pub use options::{
    Background, ConversionRequest, InputSource, OutputFormat, OutputTarget, RawOptions, Theme,
    resolve,
};
pub use pipeline::{convert, run};
