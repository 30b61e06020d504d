//! The local HTML shell the browser navigates to before any diagram is injected.
//!
//! The shell holds an empty `#container` element, the Mermaid bundle and the Font Awesome
//! stylesheet (Mermaid flowcharts use `fa:` icons). Both assets come from local files when the
//! caller points at them, otherwise from a pinned CDN build.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use url::Url;

pub const MERMAID_VERSION: &str = "11.12.2";
pub const ICON_FONT_CDN_URL: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.7.2/css/all.min.css";

/// jsDelivr build of the pinned Mermaid release.
pub fn mermaid_cdn_url() -> String {
    format!("https://cdn.jsdelivr.net/npm/mermaid@{MERMAID_VERSION}/dist/mermaid.min.js")
}

/// Id of the element the diagram definition is written into.
pub const CONTAINER_ID: &str = "container";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetSources {
    pub mermaid_js: Option<PathBuf>,
    pub icon_font_css: Option<PathBuf>,
}

impl AssetSources {
    pub fn mermaid_src(&self) -> Result<String> {
        asset_href(self.mermaid_js.as_deref(), &mermaid_cdn_url())
    }

    pub fn icon_font_href(&self) -> Result<String> {
        asset_href(self.icon_font_css.as_deref(), ICON_FONT_CDN_URL)
    }
}

/// A bootstrap document written to a private temp directory.
///
/// The directory is removed when this value is dropped, so it must outlive the page that loads it.
#[derive(Debug)]
pub struct BootstrapPage {
    _dir: tempfile::TempDir,
    url: Url,
}

impl BootstrapPage {
    pub fn create(assets: &AssetSources) -> Result<Self> {
        let html = bootstrap_html(&assets.mermaid_src()?, &assets.icon_font_href()?);
        let dir = tempfile::Builder::new()
            .prefix("mmdc-")
            .tempdir()
            .map_err(Error::Bootstrap)?;
        let path = dir.path().join("index.html");
        std::fs::write(&path, html).map_err(Error::Bootstrap)?;
        let url = file_url(&path)?;
        Ok(Self { _dir: dir, url })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }
}

pub fn bootstrap_html(mermaid_src: &str, icon_font_href: &str) -> String {
    format!(
        r#"<!doctype html>
<html>
  <head>
    <meta charset="utf-8">
    <link rel="stylesheet" href="{icon_font}">
  </head>
  <body>
    <div id="{container}"></div>
    <script src="{mermaid}"></script>
  </body>
</html>
"#,
        icon_font = escape_attr(icon_font_href),
        container = CONTAINER_ID,
        mermaid = escape_attr(mermaid_src),
    )
}

fn asset_href(local: Option<&Path>, cdn: &str) -> Result<String> {
    match local {
        Some(path) => {
            let path = std::fs::canonicalize(path).map_err(Error::Bootstrap)?;
            Ok(file_url(&path)?.to_string())
        }
        None => Ok(cdn.to_string()),
    }
}

fn file_url(path: &Path) -> Result<Url> {
    Url::from_file_path(path).map_err(|()| {
        Error::Bootstrap(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("not an absolute path: {}", path.display()),
        ))
    })
}

fn escape_attr(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}
