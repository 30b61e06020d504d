use crate::capture::Artifact;
use crate::error::{Error, Result};
use crate::options::OutputTarget;
use std::io::Write;
use std::path::Path;

/// Writes the artifact to its destination. Stdout is flushed but never closed.
pub fn write_artifact(artifact: &Artifact, target: &OutputTarget) -> Result<()> {
    let written = match target {
        OutputTarget::File(path) => write_file(path, artifact.as_bytes()),
        OutputTarget::Stdout => write_to(std::io::stdout().lock(), artifact.as_bytes()),
    };
    written.map_err(|source| Error::Save {
        to: target.describe(),
        source,
    })
}

fn write_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

pub(crate) fn write_to(mut out: impl Write, bytes: &[u8]) -> std::io::Result<()> {
    out.write_all(bytes)?;
    out.flush()
}
