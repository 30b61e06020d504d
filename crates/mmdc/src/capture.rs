use crate::bootstrap::CONTAINER_ID;
use crate::browser::{Clip, PageSession, SessionError, SessionResult};
use crate::error::{Error, Result};
use crate::options::{ConversionRequest, OutputFormat};
use serde_json::Value;
use tracing::debug;

pub(crate) const READ_MARKUP: &str = "(id) => document.getElementById(id).innerHTML";

pub(crate) const READ_SVG_BOUNDS: &str = r#"(id) => {
  const container = document.getElementById(id);
  const svg = container && container.querySelector('svg');
  if (!svg) throw new Error(`no rendered <svg> in #${id}`);
  const rect = svg.getBoundingClientRect();
  return { x: rect.left, y: rect.top, width: rect.width, height: rect.height };
}"#;

/// The captured output, consumed once by the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    Text(String),
    Bytes(Vec<u8>),
}

impl Artifact {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Artifact::Text(text) => text.as_bytes(),
            Artifact::Bytes(bytes) => bytes,
        }
    }
}

/// Captures the rendered diagram in the request's format. Not retried on failure.
pub async fn capture<S: PageSession>(session: &S, request: &ConversionRequest) -> Result<Artifact> {
    let format = request.format;
    let transparent = request.background.is_transparent();
    let captured = match format {
        OutputFormat::Svg => capture_markup(session).await,
        OutputFormat::Png => capture_png(session, request, transparent).await,
        OutputFormat::Pdf => session.pdf(!transparent).await.map(Artifact::Bytes),
    };
    let artifact = captured.map_err(|source| Error::Capture { format, source })?;
    debug!(%format, bytes = artifact.as_bytes().len(), "output captured");
    Ok(artifact)
}

fn container_arg() -> [Value; 1] {
    [Value::String(CONTAINER_ID.to_string())]
}

async fn capture_markup<S: PageSession>(session: &S) -> SessionResult<Artifact> {
    match session.evaluate(READ_MARKUP, &container_arg()).await? {
        Value::String(markup) => Ok(Artifact::Text(markup)),
        other => Err(SessionError::Script(format!(
            "expected the container markup as a string, got {other}"
        ))),
    }
}

/// Screenshots the SVG bounding box. A diagram reaching past the viewport first grows the
/// viewport to cover it, so the clip never includes unpainted area.
async fn capture_png<S: PageSession>(
    session: &S,
    request: &ConversionRequest,
    omit_background: bool,
) -> SessionResult<Artifact> {
    let bounds = session.evaluate(READ_SVG_BOUNDS, &container_arg()).await?;
    let clip: Clip = serde_json::from_value(bounds)?;
    if let Some((width, height)) = grown_viewport(&clip, request.width, request.height) {
        debug!(width, height, "growing viewport to fit the diagram");
        session.set_viewport(width, height, request.scale).await?;
    }
    debug!(?clip, omit_background, "capturing svg bounding box");
    session
        .screenshot(clip, omit_background)
        .await
        .map(Artifact::Bytes)
}

/// The viewport needed to contain `clip`, or `None` when the current one already does.
pub(crate) fn grown_viewport(clip: &Clip, width: u32, height: u32) -> Option<(u32, u32)> {
    let right = (clip.x + clip.width).ceil();
    let bottom = (clip.y + clip.height).ceil();
    if right <= f64::from(width) && bottom <= f64::from(height) {
        return None;
    }
    Some((width.max(right as u32), height.max(bottom as u32)))
}
