//! Browser session management.
//!
//! [`Launcher`] and [`PageSession`] are the seam between the conversion pipeline and the browser
//! automation library: a session owns exactly one browser process and one page, and every call
//! into the page goes through [`PageSession::evaluate`], which ships a function source plus
//! JSON-serialized arguments into the page and brings the JSON result back out.
//!
//! [`ChromeLauncher`] is the production implementation on top of `chromiumoxide`.

use crate::error::{Error, Result};
use crate::launch::LaunchOptions;
use crate::options::ConversionRequest;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, PrintToPdfParams, Viewport,
};
use chromiumoxide::cdp::js_protocol::runtime::{EvaluateParams, EventConsoleApiCalled};
use chromiumoxide::error::CdpError;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use std::future::Future;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

/// Chromium flags every launch gets, ahead of the user's own `args`.
const DEFAULT_ARGS: &[&str] = &["--allow-file-access-from-files"];

pub type SessionResult<T> = std::result::Result<T, SessionError>;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Cdp(#[from] CdpError),
    #[error("invalid browser configuration: {0}")]
    Config(String),
    #[error("{0}")]
    Script(String),
    #[error("unexpected value returned by the page: {0}")]
    Decode(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A pixel rectangle in CSS coordinates, as returned by `getBoundingClientRect()`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Clip {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

pub trait Launcher {
    type Session: PageSession;

    fn launch(&self, options: &LaunchOptions)
    -> impl Future<Output = SessionResult<Self::Session>>;
}

/// One page in one browser process.
pub trait PageSession {
    fn set_viewport(
        &self,
        width: u32,
        height: u32,
        scale: f64,
    ) -> impl Future<Output = SessionResult<()>>;

    fn goto(&self, url: &str) -> impl Future<Output = SessionResult<()>>;

    /// Calls `function` (a JS function expression) inside the page with `args` and returns its
    /// result. Promises are awaited.
    fn evaluate(
        &self,
        function: &str,
        args: &[Value],
    ) -> impl Future<Output = SessionResult<Value>>;

    /// PNG screenshot of `clip`. With `omit_background` the page background is left transparent.
    fn screenshot(
        &self,
        clip: Clip,
        omit_background: bool,
    ) -> impl Future<Output = SessionResult<Vec<u8>>>;

    fn pdf(&self, print_background: bool) -> impl Future<Output = SessionResult<Vec<u8>>>;

    fn close(&mut self) -> impl Future<Output = SessionResult<()>>;
}

/// Builds the `(function)(arg, ...)` expression evaluated by [`PageSession::evaluate`].
pub fn call_expression(function: &str, args: &[Value]) -> String {
    let args = args
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!("({function})({args})")
}

pub(crate) const PAINT_BACKGROUND: &str = "(color) => { document.body.style.background = color; }";

/// Prepares the session's page: viewport, bootstrap document, body background.
pub async fn open_page<S: PageSession>(
    session: &S,
    request: &ConversionRequest,
    bootstrap_url: &str,
) -> Result<()> {
    session
        .set_viewport(request.width, request.height, request.scale)
        .await
        .map_err(Error::BrowserLaunch)?;
    debug!(url = bootstrap_url, "navigating to bootstrap page");
    session
        .goto(bootstrap_url)
        .await
        .map_err(Error::BrowserLaunch)?;
    session
        .evaluate(
            PAINT_BACKGROUND,
            &[Value::String(request.background.css_value().to_string())],
        )
        .await
        .map_err(Error::BrowserLaunch)?;
    Ok(())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChromeLauncher;

impl Launcher for ChromeLauncher {
    type Session = ChromeSession;

    async fn launch(&self, options: &LaunchOptions) -> SessionResult<ChromeSession> {
        let config = browser_config(options)?;
        let (mut browser, mut handler) = Browser::launch(config).await?;
        info!("browser launched");

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    trace!(%err, "browser handler event error");
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(err) => {
                if let Err(close_err) = shutdown(&mut browser).await {
                    debug!(%close_err, "browser teardown after failed page open");
                }
                handler.abort();
                return Err(err.into());
            }
        };
        let console = forward_console(&page).await;

        Ok(ChromeSession {
            browser,
            page,
            handler,
            console,
        })
    }
}

fn browser_config(options: &LaunchOptions) -> SessionResult<BrowserConfig> {
    let mut builder = BrowserConfig::builder()
        .launch_timeout(options.timeout())
        .request_timeout(options.timeout())
        .args(DEFAULT_ARGS.iter().copied())
        .args(options.args.iter().map(String::as_str));
    if !options.headless {
        builder = builder.with_head();
    }
    if options.no_sandbox {
        builder = builder.no_sandbox();
    }
    if let Some(exe) = &options.executable_path {
        builder = builder.chrome_executable(exe);
    }
    if let Some(dir) = &options.user_data_dir {
        builder = builder.user_data_dir(dir);
    }
    builder.build().map_err(SessionError::Config)
}

/// Mirrors the page's `console.*` calls into the log at `debug` level.
async fn forward_console(page: &Page) -> Option<JoinHandle<()>> {
    let mut events = match page.event_listener::<EventConsoleApiCalled>().await {
        Ok(events) => events,
        Err(err) => {
            debug!(%err, "page console is not forwarded");
            return None;
        }
    };
    Some(tokio::spawn(async move {
        while let Some(event) = events.next().await {
            let text = event
                .args
                .iter()
                .map(|arg| match (&arg.value, &arg.description) {
                    (Some(Value::String(s)), _) => s.clone(),
                    (Some(value), _) => value.to_string(),
                    (None, Some(description)) => description.clone(),
                    (None, None) => String::new(),
                })
                .collect::<Vec<_>>()
                .join(" ");
            debug!(kind = ?event.r#type, "page log: {text}");
        }
    }))
}

pub struct ChromeSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    console: Option<JoinHandle<()>>,
}

impl PageSession for ChromeSession {
    async fn set_viewport(&self, width: u32, height: u32, scale: f64) -> SessionResult<()> {
        let metrics =
            SetDeviceMetricsOverrideParams::new(i64::from(width), i64::from(height), scale, false);
        self.page.execute(metrics).await?;
        Ok(())
    }

    async fn goto(&self, url: &str) -> SessionResult<()> {
        self.page.goto(url).await?;
        Ok(())
    }

    async fn evaluate(&self, function: &str, args: &[Value]) -> SessionResult<Value> {
        let params = EvaluateParams::builder()
            .expression(call_expression(function, args))
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(SessionError::Config)?;
        let result = self.page.evaluate_expression(params).await?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn screenshot(&self, clip: Clip, omit_background: bool) -> SessionResult<Vec<u8>> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .clip(Viewport {
                x: clip.x,
                y: clip.y,
                width: clip.width,
                height: clip.height,
                scale: 1.0,
            })
            .omit_background(omit_background)
            .capture_beyond_viewport(true)
            .build();
        Ok(self.page.screenshot(params).await?)
    }

    async fn pdf(&self, print_background: bool) -> SessionResult<Vec<u8>> {
        let params = PrintToPdfParams {
            print_background: Some(print_background),
            ..Default::default()
        };
        Ok(self.page.pdf(params).await?)
    }

    async fn close(&mut self) -> SessionResult<()> {
        if let Some(console) = self.console.take() {
            console.abort();
        }
        let result = shutdown(&mut self.browser).await;
        self.handler.abort();
        result?;
        info!("browser closed");
        Ok(())
    }
}

/// The process-level controls teardown needs from a launched browser.
pub(crate) trait BrowserProcess {
    /// Asks the browser to exit over CDP.
    fn request_close(&mut self) -> impl Future<Output = SessionResult<()>>;

    /// Kills the child process. `None` when this handle does not own one.
    fn kill(&mut self) -> impl Future<Output = Option<std::io::Result<()>>>;

    /// Waits for the child process to exit.
    fn reap(&mut self) -> impl Future<Output = std::io::Result<()>>;
}

impl BrowserProcess for Browser {
    async fn request_close(&mut self) -> SessionResult<()> {
        Browser::close(self).await?;
        Ok(())
    }

    async fn kill(&mut self) -> Option<std::io::Result<()>> {
        Browser::kill(self).await
    }

    async fn reap(&mut self) -> std::io::Result<()> {
        Browser::wait(self).await.map(|_| ())
    }
}

/// Closes the browser and waits for its process to exit.
///
/// A browser that did not take the CDP close request is still running, so it is killed before
/// waiting; otherwise the wait would never return. The close error is still reported.
pub(crate) async fn shutdown<P: BrowserProcess>(process: &mut P) -> SessionResult<()> {
    let closed = process.request_close().await;
    if let Err(err) = &closed {
        debug!(%err, "close request failed, killing the browser");
        if let Some(Err(kill_err)) = process.kill().await {
            debug!(%kill_err, "failed to kill the browser");
        }
    }
    process.reap().await?;
    closed
}
