use crate::bootstrap::BootstrapPage;
use crate::browser::{Launcher, PageSession, open_page};
use crate::capture::capture;
use crate::error::{Error, Result};
use crate::inject::inject;
use crate::options::{ConversionRequest, InputSource, RawOptions, resolve};
use crate::sink::write_artifact;
use std::io::Read;
use tracing::{debug, info, warn};

/// Resolves `raw` and runs the conversion. Validation errors return before anything is launched.
pub async fn run<L: Launcher>(launcher: &L, raw: RawOptions) -> Result<()> {
    let request = resolve(raw)?;
    convert(launcher, &request).await
}

/// Runs one conversion with one browser session.
///
/// The session is closed on every path once it exists. A close failure is only logged; it never
/// replaces the conversion's own result.
pub async fn convert<L: Launcher>(launcher: &L, request: &ConversionRequest) -> Result<()> {
    let definition = read_definition(&request.input)?;
    let bootstrap = BootstrapPage::create(&request.assets)?;

    info!(
        input = %request.input.describe(),
        output = %request.output.describe(),
        format = %request.format,
        "converting"
    );
    let mut session = launcher
        .launch(&request.launch)
        .await
        .map_err(Error::BrowserLaunch)?;

    let outcome = render_and_save(&session, request, &definition, &bootstrap).await;

    if let Err(err) = session.close().await {
        warn!(%err, "failed to close the browser");
    }
    outcome
}

async fn render_and_save<S: PageSession>(
    session: &S,
    request: &ConversionRequest,
    definition: &str,
    bootstrap: &BootstrapPage,
) -> Result<()> {
    open_page(session, request, bootstrap.url()).await?;
    inject(session, definition, request).await?;
    let artifact = capture(session, request).await?;
    write_artifact(&artifact, &request.output)?;
    debug!(output = %request.output.describe(), "output written");
    Ok(())
}

fn read_definition(input: &InputSource) -> Result<String> {
    let read = match input {
        InputSource::File(path) => std::fs::read_to_string(path),
        InputSource::Stdin => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).map(|_| buf)
        }
    };
    read.map_err(|source| Error::InputRead {
        from: input.describe(),
        source,
    })
}
