//! Command-line option resolution.
//!
//! [`resolve`] turns the loosely-typed [`RawOptions`] collected by the CLI into an immutable
//! [`ConversionRequest`]. Everything that can be checked without a browser is checked here: file
//! existence, extensions, output directory, JSON validity of the config files. A request that
//! resolves is ready to be handed to the pipeline.

use crate::bootstrap::AssetSources;
use crate::error::{Error, Result};
use crate::launch::LaunchOptions;
use serde_json::Value;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_WIDTH: u32 = 800;
pub const DEFAULT_HEIGHT: u32 = 600;
pub const DEFAULT_BACKGROUND: &str = "white";

/// Path value that stands for stdin (as input) or stdout (as output).
pub const STDIO_MARKER: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Default,
    Forest,
    Dark,
    Neutral,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Default => "default",
            Theme::Forest => "forest",
            Theme::Dark => "dark",
            Theme::Neutral => "neutral",
        }
    }
}

impl FromStr for Theme {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(Self::Default),
            "forest" => Ok(Self::Forest),
            "dark" => Ok(Self::Dark),
            "neutral" => Ok(Self::Neutral),
            _ => Err(Error::UnknownTheme(s.to_string())),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Svg,
    Png,
    Pdf,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Svg => "svg",
            OutputFormat::Png => "png",
            OutputFormat::Pdf => "pdf",
        }
    }

    /// Infers the format from a path's extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()?.to_str()?.parse().ok()
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "svg" => Ok(Self::Svg),
            "png" => Ok(Self::Png),
            "pdf" => Ok(Self::Pdf),
            _ => Err(Error::UnknownFormat(s.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Page background. `transparent` is special-cased: raster captures omit the background and PDF
/// captures skip background painting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Background {
    Color(String),
    Transparent,
}

impl Background {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim).filter(|s| !s.is_empty()) {
            None => Self::default(),
            Some(s) if s.eq_ignore_ascii_case("transparent") => Self::Transparent,
            Some(s) => Self::Color(s.to_string()),
        }
    }

    pub fn is_transparent(&self) -> bool {
        matches!(self, Background::Transparent)
    }

    /// The CSS value painted onto the page body.
    pub fn css_value(&self) -> &str {
        match self {
            Background::Color(color) => color,
            Background::Transparent => "transparent",
        }
    }
}

impl Default for Background {
    fn default() -> Self {
        Self::Color(DEFAULT_BACKGROUND.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    File(PathBuf),
    Stdin,
}

impl InputSource {
    pub fn describe(&self) -> String {
        match self {
            InputSource::File(path) => path.display().to_string(),
            InputSource::Stdin => "stdin".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    File(PathBuf),
    Stdout,
}

impl OutputTarget {
    pub fn describe(&self) -> String {
        match self {
            OutputTarget::File(path) => path.display().to_string(),
            OutputTarget::Stdout => "stdout".to_string(),
        }
    }
}

/// Options as collected from the command line, before any validation.
#[derive(Debug, Clone)]
pub struct RawOptions {
    pub theme: Theme,
    pub width: u32,
    pub height: u32,
    pub scale: f64,
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub format: Option<OutputFormat>,
    pub background_color: Option<String>,
    pub config_file: Option<PathBuf>,
    pub css_file: Option<PathBuf>,
    pub custom_theme: Option<PathBuf>,
    pub puppeteer_config_file: Option<PathBuf>,
    pub mermaid_js: Option<PathBuf>,
    pub icon_font_css: Option<PathBuf>,
}

impl Default for RawOptions {
    fn default() -> Self {
        Self {
            theme: Theme::Default,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            scale: 1.0,
            input: None,
            output: None,
            format: None,
            background_color: None,
            config_file: None,
            css_file: None,
            custom_theme: None,
            puppeteer_config_file: None,
            mermaid_js: None,
            icon_font_css: None,
        }
    }
}

/// A fully validated conversion. Built once per invocation and never mutated.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub input: InputSource,
    pub output: OutputTarget,
    pub format: OutputFormat,
    pub theme: Theme,
    pub width: u32,
    pub height: u32,
    pub scale: f64,
    pub background: Background,
    pub mermaid_config: Option<Value>,
    pub css: Option<String>,
    pub custom_theme_css: Option<String>,
    pub launch: LaunchOptions,
    pub assets: AssetSources,
}

pub fn resolve(raw: RawOptions) -> Result<ConversionRequest> {
    let input = resolve_input(raw.input.as_deref())?;

    let to_stdout = raw.output.as_deref().is_some_and(is_stdio_marker);
    let named_output = raw.output.as_deref().filter(|p| !is_stdio_marker(p));
    let format = resolve_format(raw.format, named_output)?;
    let output = if to_stdout {
        OutputTarget::Stdout
    } else {
        let path = named_output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_output_path(&input, format));
        ensure_output_dir(&path)?;
        OutputTarget::File(path)
    };

    let mermaid_config = raw
        .config_file
        .as_deref()
        .map(|path| read_json_object("Configuration", path))
        .transpose()?;
    let css = raw
        .css_file
        .as_deref()
        .map(|path| read_css("CSS", path))
        .transpose()?;
    let custom_theme_css = raw
        .custom_theme
        .as_deref()
        .map(|path| read_css("Custom theme", path))
        .transpose()?;
    let launch = match raw.puppeteer_config_file.as_deref() {
        Some(path) => {
            let value = read_json_object("Puppeteer config", path)?;
            LaunchOptions::from_user_config(&value).map_err(|source| {
                Error::InvalidConfigJson {
                    kind: "Puppeteer config",
                    path: path.to_path_buf(),
                    source,
                }
            })?
        }
        None => LaunchOptions::default(),
    };

    let assets = AssetSources {
        mermaid_js: raw
            .mermaid_js
            .map(|path| ensure_asset("Mermaid script", path))
            .transpose()?,
        icon_font_css: raw
            .icon_font_css
            .map(|path| ensure_asset("Icon font stylesheet", path))
            .transpose()?,
    };

    if raw.width == 0 {
        return Err(Error::InvalidDimension {
            what: "width",
            value: raw.width.to_string(),
        });
    }
    if raw.height == 0 {
        return Err(Error::InvalidDimension {
            what: "height",
            value: raw.height.to_string(),
        });
    }
    if !(raw.scale.is_finite() && raw.scale > 0.0) {
        return Err(Error::InvalidDimension {
            what: "scale",
            value: raw.scale.to_string(),
        });
    }

    Ok(ConversionRequest {
        input,
        output,
        format,
        theme: raw.theme,
        width: raw.width,
        height: raw.height,
        scale: raw.scale,
        background: Background::parse(raw.background_color.as_deref()),
        mermaid_config,
        css,
        custom_theme_css,
        launch,
        assets,
    })
}

/// Resolves the output format: a named output file decides by its extension, an explicit
/// `--format` must agree with it; without an output file the explicit format (or SVG) wins.
pub fn resolve_format(explicit: Option<OutputFormat>, output: Option<&Path>) -> Result<OutputFormat> {
    let Some(path) = output else {
        return Ok(explicit.unwrap_or_default());
    };
    let inferred = OutputFormat::from_path(path).ok_or_else(|| Error::InvalidOutputExtension {
        path: path.to_path_buf(),
    })?;
    match explicit {
        Some(format) if format != inferred => Err(Error::FormatMismatch {
            format,
            path: path.to_path_buf(),
        }),
        _ => Ok(inferred),
    }
}

/// `<input>.<format>` for file input (the input extension is kept), `out.<format>` for stdin.
pub fn default_output_path(input: &InputSource, format: OutputFormat) -> PathBuf {
    match input {
        InputSource::File(path) => {
            let mut name = OsString::from(path.as_os_str());
            name.push(".");
            name.push(format.extension());
            PathBuf::from(name)
        }
        InputSource::Stdin => PathBuf::from(format!("out.{}", format.extension())),
    }
}

fn is_stdio_marker(path: &Path) -> bool {
    path.as_os_str() == STDIO_MARKER
}

fn resolve_input(input: Option<&Path>) -> Result<InputSource> {
    match input {
        None => Ok(InputSource::Stdin),
        Some(path) if is_stdio_marker(path) => Ok(InputSource::Stdin),
        Some(path) if !path.exists() => Err(Error::InputNotFound {
            path: path.to_path_buf(),
        }),
        Some(path) => Ok(InputSource::File(path.to_path_buf())),
    }
}

fn ensure_output_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() && !dir.is_dir() => {
            Err(Error::OutputDirectoryMissing {
                dir: dir.to_path_buf(),
            })
        }
        _ => Ok(()),
    }
}

fn has_extension(path: &Path, expected: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(expected))
}

fn ensure_config_file(kind: &'static str, path: &Path, expected: &'static str) -> Result<()> {
    if !path.exists() {
        return Err(Error::ConfigFileNotFound {
            kind,
            path: path.to_path_buf(),
        });
    }
    if !has_extension(path, expected.trim_start_matches('.')) {
        return Err(Error::InvalidConfigExtension {
            kind,
            path: path.to_path_buf(),
            expected,
        });
    }
    Ok(())
}

fn read_config_text(kind: &'static str, path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
        kind,
        path: path.to_path_buf(),
        source,
    })
}

fn read_css(kind: &'static str, path: &Path) -> Result<String> {
    ensure_config_file(kind, path, ".css")?;
    read_config_text(kind, path)
}

fn read_json_object(kind: &'static str, path: &Path) -> Result<Value> {
    ensure_config_file(kind, path, ".json")?;
    let text = read_config_text(kind, path)?;
    let invalid = |source| Error::InvalidConfigJson {
        kind,
        path: path.to_path_buf(),
        source,
    };
    let value: Value = serde_json::from_str(&text).map_err(invalid)?;
    if !value.is_object() {
        return Err(invalid(<serde_json::Error as serde::de::Error>::custom(
            "expected a JSON object at the top level",
        )));
    }
    Ok(value)
}

fn ensure_asset(kind: &'static str, path: PathBuf) -> Result<PathBuf> {
    if path.is_file() {
        Ok(path)
    } else {
        Err(Error::AssetNotFound { kind, path })
    }
}
