//! Replaying recorded redraw batches.

use std::path::Path;

use anyhow::{Context, Result, bail};
use serde_json::Value;

use nvgrid_render::PresentationBackend;

use crate::host::WindowHost;
use crate::renderer::GridRenderer;

/// What a replay did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub batches: usize,
    pub events: usize,
    pub presents: u64,
    pub recoveries: u64,
    pub violations: u64,
}

/// Read a JSON array of redraw batches from `path`.
pub fn load_batches(path: &Path) -> Result<Vec<Value>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value: Value = serde_json::from_str(&text)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    match value {
        Value::Array(batches) => Ok(batches),
        _ => bail!("{} must hold an array of redraw batches", path.display()),
    }
}

/// Feed every batch through `renderer` in order.
pub fn replay<B, H>(renderer: &mut GridRenderer<B, H>, batches: &[Value]) -> Result<ReplayStats>
where
    B: PresentationBackend,
    H: WindowHost,
{
    let mut stats = ReplayStats::default();
    for (index, batch) in batches.iter().enumerate() {
        stats.events += renderer
            .handle_batch(batch)
            .with_context(|| format!("redraw batch {index} failed"))?;
        stats.batches += 1;
    }
    stats.presents = renderer.frames().present_count();
    stats.recoveries = renderer.frames().recovery_count();
    stats.violations = renderer.violation_count();
    log::info!(
        "replayed {} batches ({} events, {} presents)",
        stats.batches,
        stats.events,
        stats.presents
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn batches_must_be_an_array() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"redraw": []}}"#).unwrap();
        let err = load_batches(file.path()).unwrap_err();
        assert!(err.to_string().contains("array of redraw batches"));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[[["flush"]], []]"#).unwrap();
        assert_eq!(load_batches(file.path()).unwrap().len(), 2);
    }
}
