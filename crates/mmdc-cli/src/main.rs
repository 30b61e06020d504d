//! `mmdc`: render a Mermaid definition to SVG, PNG or PDF through a headless Chromium.

use clap::Parser;
use mmdc::{ChromeLauncher, OutputFormat, RawOptions, Theme};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "mmdc")]
#[command(about = "Converts Mermaid diagram definitions to SVG, PNG or PDF")]
#[command(version)]
struct Cli {
    /// Theme of the chart: default, forest, dark or neutral
    #[arg(short, long, default_value = "default", value_parser = parse_theme)]
    theme: Theme,

    /// Width of the page
    #[arg(short, long, default_value_t = mmdc::options::DEFAULT_WIDTH, value_parser = clap::value_parser!(u32).range(1..))]
    width: u32,

    /// Height of the page
    #[arg(short = 'H', long, default_value_t = mmdc::options::DEFAULT_HEIGHT, value_parser = clap::value_parser!(u32).range(1..))]
    height: u32,

    /// Input mermaid file. Reads from stdin when omitted or "-"
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output file. Defaults to the input file name plus the format extension; "-" writes to stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format: svg, png or pdf. Must match the output file extension when both are given
    #[arg(short, long, value_parser = parse_format)]
    format: Option<OutputFormat>,

    /// Background color for png/pdf/svg, e.g. transparent, red, '#F0F0F0'
    #[arg(short, long = "backgroundColor", value_name = "COLOR")]
    background_color: Option<String>,

    /// JSON configuration file for mermaid
    #[arg(short, long = "configFile", value_name = "FILE")]
    config_file: Option<PathBuf>,

    /// CSS file attached to the page before rendering
    #[arg(short = 'C', long = "cssFile", value_name = "FILE")]
    css_file: Option<PathBuf>,

    /// CSS file that replaces the style block of the rendered SVG
    #[arg(short = 'T', long = "customTheme", value_name = "FILE")]
    custom_theme: Option<PathBuf>,

    /// JSON configuration file for the browser launch (puppeteer style)
    #[arg(short, long = "puppeteerConfigFile", value_name = "FILE")]
    puppeteer_config_file: Option<PathBuf>,

    /// Device scale factor of the page
    #[arg(short, long, default_value_t = 1.0)]
    scale: f64,

    /// Local Mermaid bundle to load instead of the CDN build
    #[arg(long = "mermaidJs", env = "MMDC_MERMAID_JS", value_name = "FILE")]
    mermaid_js: Option<PathBuf>,

    /// Local Font Awesome stylesheet to load instead of the CDN build
    #[arg(long = "iconFontCss", env = "MMDC_ICON_FONT_CSS", value_name = "FILE")]
    icon_font_css: Option<PathBuf>,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Log every conversion stage
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_raw(self) -> RawOptions {
        RawOptions {
            theme: self.theme,
            width: self.width,
            height: self.height,
            scale: self.scale,
            input: self.input,
            output: self.output,
            format: self.format,
            background_color: self.background_color,
            config_file: self.config_file,
            css_file: self.css_file,
            custom_theme: self.custom_theme,
            puppeteer_config_file: self.puppeteer_config_file,
            mermaid_js: self.mermaid_js,
            icon_font_css: self.icon_font_css,
        }
    }
}

fn parse_theme(s: &str) -> Result<Theme, String> {
    s.parse().map_err(|err: mmdc::Error| err.to_string())
}

fn parse_format(s: &str) -> Result<OutputFormat, String> {
    s.parse().map_err(|err: mmdc::Error| err.to_string())
}

fn init_logging(quiet: bool, verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose {
            "debug"
        } else if quiet {
            "error"
        } else {
            "warn"
        };
        EnvFilter::new(format!("{level},chromiumoxide=error"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };
    init_logging(cli.quiet, cli.verbose);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("failed to start the async runtime: {err}");
            return ExitCode::from(1);
        }
    };

    match runtime.block_on(mmdc::run(&ChromeLauncher, cli.into_raw())) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!(stage = ?err.stage(), "conversion failed");
            eprintln!("{err}");
            ExitCode::from(u8::try_from(err.exit_code()).unwrap_or(1))
        }
    }
}
