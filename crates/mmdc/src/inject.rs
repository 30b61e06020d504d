use crate::bootstrap::CONTAINER_ID;
use crate::browser::PageSession;
use crate::error::{Error, Result};
use crate::options::ConversionRequest;
use serde_json::Value;
use tracing::debug;

/// Renders the definition inside the page.
///
/// Arguments: `(containerId, definition, theme, config, css, customTheme)`. The definition is
/// written as text (not parsed as HTML). A user config wins over the theme flag. Custom CSS is
/// attached to `<head>` before the render call so Mermaid's style queries see it; the custom
/// theme replaces the rendered `<style>` block afterwards. Rendering is scoped to the container.
pub(crate) const RENDER_DIAGRAM: &str = r#"async (containerId, definition, theme, config, css, customTheme) => {
  const mermaid = globalThis.mermaid;
  if (!mermaid) throw new Error('global mermaid instance not found (is the Mermaid script reachable?)');
  const container = document.getElementById(containerId);
  if (!container) throw new Error(`bootstrap page has no #${containerId} element`);
  container.textContent = definition;

  mermaid.initialize(Object.assign({ startOnLoad: false, theme }, config || {}));

  if (css) {
    const style = document.createElement('style');
    style.appendChild(document.createTextNode(css));
    document.head.appendChild(style);
  }

  if (document.fonts && document.fonts.ready) {
    await document.fonts.ready;
  }
  await mermaid.run({ nodes: [container], suppressErrors: false });

  const svg = container.querySelector('svg');
  if (!svg) throw new Error('Mermaid did not produce an <svg> element');
  if (customTheme) {
    const style = svg.querySelector('style');
    if (style) style.textContent = customTheme;
  }
  return svg.id || null;
}"#;

pub async fn inject<S: PageSession>(
    session: &S,
    definition: &str,
    request: &ConversionRequest,
) -> Result<()> {
    let args = [
        Value::String(CONTAINER_ID.to_string()),
        Value::String(definition.to_string()),
        Value::String(request.theme.as_str().to_string()),
        request.mermaid_config.clone().unwrap_or(Value::Null),
        optional_text(request.css.as_deref()),
        optional_text(request.custom_theme_css.as_deref()),
    ];
    let svg_id = session
        .evaluate(RENDER_DIAGRAM, &args)
        .await
        .map_err(Error::Render)?;
    debug!(svg_id = %svg_id, theme = %request.theme, "diagram rendered");
    Ok(())
}

fn optional_text(text: Option<&str>) -> Value {
    text.map_or(Value::Null, |s| Value::String(s.to_string()))
}
