use crate::config::SourceFilter;
use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Lists the source trees under `root`: its immediate subdirectories, sorted by
/// name, kept only if they carry `filter.marker` and mapped into
/// `filter.subdir` when set.
pub fn discover_sources(root: &Path, filter: &SourceFilter) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let dir = entry.into_path();
        if let Some(marker) = &filter.marker {
            if !dir.join(marker).exists() {
                debug!(dir = %dir.display(), marker = %marker, "no marker, ignoring");
                continue;
            }
        }
        let source = match &filter.subdir {
            Some(sub) => dir.join(sub),
            None => dir,
        };
        out.push(source);
    }
    Ok(out)
}

/// Resolves `layer` inside every source, dropping sources that lack it.
pub fn layer_sources(sources: &[PathBuf], layer: &Path) -> Vec<PathBuf> {
    sources
        .iter()
        .map(|s| s.join(layer))
        .filter(|p| {
            let ok = p.is_dir();
            if !ok {
                warn!(dir = %p.display(), "layer missing in source, skipping");
            }
            ok
        })
        .collect()
}
