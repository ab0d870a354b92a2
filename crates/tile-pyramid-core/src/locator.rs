use crate::compositing::{check_tile_size, first_transparent};
use crate::config::{PyramidConfig, quadrant_digit};
use crate::error::{PyramidError, Result};
use crate::model::LocateStats;
use crate::parallel::try_map;
use crate::path::QuadPath;
use crate::quadtree::QuadTree;
use crate::sector::Sector;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, trace};
use walkdir::WalkDir;

/// Finds the shallowest complete tiles of a source tree and records them in a
/// shared [`QuadTree`].
///
/// A source tree holds, at every level, images named `1.png`..`4.png` and
/// directories named `1`..`4`. An image with any fully transparent pixel is
/// incomplete; its directory must exist and is searched one level deeper.
/// A complete image becomes a leaf, which also hides every finer tile below
/// it, whichever source those come from.
#[derive(Debug, Clone, Copy)]
pub struct TileLocator<'a> {
    tree: &'a QuadTree<PathBuf>,
    config: &'a PyramidConfig,
}

struct Candidates {
    images: Vec<(Sector, PathBuf)>,
    dirs: BTreeMap<Sector, PathBuf>,
}

impl<'a> TileLocator<'a> {
    pub fn new(tree: &'a QuadTree<PathBuf>, config: &'a PyramidConfig) -> Self {
        Self { tree, config }
    }

    /// Searches one source tree rooted at `source`.
    #[instrument(skip_all, fields(source = %source.display()))]
    pub fn locate(&self, source: &Path) -> Result<LocateStats> {
        let mut stats = LocateStats::default();
        self.search(source, &QuadPath::root(), &mut stats)?;
        info!(
            scanned = stats.images_scanned,
            inserted = stats.inserted,
            skipped = stats.skipped,
            "finished searching"
        );
        Ok(stats)
    }

    /// Searches every source, one worker per source when parallelism is
    /// enabled. Workers only share the tree.
    pub fn locate_all(&self, sources: &[PathBuf]) -> Result<LocateStats> {
        let per_source = try_map(sources, self.config.parallel, |s| self.locate(s))?;
        let mut total = LocateStats::default();
        for s in &per_source {
            total.merge(s);
        }
        Ok(total)
    }

    fn search(&self, dir: &Path, path: &QuadPath, stats: &mut LocateStats) -> Result<()> {
        let Candidates { images, dirs } = self.list_candidates(dir)?;

        let mut pending = Vec::new();
        for (sector, file) in images {
            let tile_path = path.child(sector);
            debug!(file = %file.display(), "trying");
            stats.images_scanned += 1;
            let img = image::open(&file)
                .map_err(|e| PyramidError::from(e).at_tile(&file))?
                .to_rgba8();
            if let Some((x, y)) = first_transparent(&img) {
                debug!(x, y, file = %file.display(), "found a transparent pixel");
                stats.incomplete += 1;
                pending.push((sector, tile_path));
                continue;
            }
            check_tile_size(&img, self.config.tile_size).map_err(|e| e.at_tile(&file))?;
            trace!(file = %file.display(), "found complete image");
            if self.tree.insert(&tile_path, file.clone())? {
                stats.inserted += 1;
            } else {
                debug!(file = %file.display(), path = %tile_path, "path already covered, skipping");
                stats.skipped += 1;
            }
        }

        for (sector, tile_path) in pending {
            let Some(child_dir) = dirs.get(&sector) else {
                return Err(PyramidError::MissingChildDirectory {
                    path: tile_path.to_string(),
                    dir: dir.join(sector.index().to_string()),
                });
            };
            self.search(child_dir, &tile_path, stats)?;
        }
        Ok(())
    }

    fn list_candidates(&self, dir: &Path) -> Result<Candidates> {
        let mut images = Vec::new();
        let mut dirs = BTreeMap::new();
        let walker = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name();
        for entry in walker {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            let file_type = entry.file_type();
            if file_type.is_file() {
                if let Some(sector) = self.config.tile_index(name).and_then(Sector::from_index) {
                    images.push((sector, entry.into_path()));
                }
            } else if file_type.is_dir() {
                if let Some(sector) = quadrant_digit(name).and_then(Sector::from_index) {
                    dirs.insert(sector, entry.into_path());
                }
            }
        }
        Ok(Candidates { images, dirs })
    }
}
