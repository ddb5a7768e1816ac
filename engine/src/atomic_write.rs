use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use tempfile::NamedTempFile;

/// Serialize `value` as JSON and atomically replace `path` with it.
///
/// The temp file lives in the target's parent directory so `persist` is a
/// same-filesystem rename: readers observe either the old partition or the
/// new one, never a torn write.
pub fn write_atomic_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let Some(parent) = path.parent() else {
        anyhow::bail!("invalid path for atomic write: {}", path.display());
    };
    std::fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;

    let mut tmp = NamedTempFile::new_in(parent).context("create temp file")?;
    use std::io::Write as _;
    serde_json::to_writer(&mut tmp, value).context("serialize partition")?;
    tmp.write_all(b"\n").context("write temp newline")?;
    tmp.flush().context("flush temp file")?;

    tmp.persist(path).map_err(|err| {
        anyhow::Error::new(err.error).context(format!("persist file to {}", path.display()))
    })?;

    Ok(())
}
