use crate::compositing::{blank_tile, downsample_into};
use crate::config::PyramidConfig;
use crate::error::{PyramidError, Result};
use crate::locator::TileLocator;
use crate::model::{LevelReport, LocateStats, PyramidReport};
use crate::parallel::try_map;
use crate::path::QuadPath;
use crate::quadtree::QuadTree;
use crate::sector::Sector;
use image::RgbaImage;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, trace};

/// Builds a tile pyramid into an output directory.
///
/// A run goes through four phases, each available on its own:
/// 1. [`Pyramid::collect`] fills a tree with the shallowest complete source tiles
/// 2. [`Pyramid::mirror_sources`] exposes those tiles in the output tree
/// 3. [`Pyramid::reduce_level`], repeated until the tree is one level deep,
///    merges every group of siblings at the deepest level into their parent
/// 4. [`Pyramid::write_base`] merges the remaining level-1 tiles into the base image
///
/// Tiles are written to `<out>/<path>.<ext>`, the base to `<out>/<base>.<ext>`.
/// The first error aborts the run; files already written are not a resumable
/// state.
#[derive(Debug, Clone)]
pub struct Pyramid {
    config: PyramidConfig,
}

impl Pyramid {
    pub fn new(config: PyramidConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PyramidConfig {
        &self.config
    }

    /// Runs every phase over `sources` and returns a summary.
    #[instrument(skip_all, fields(out = %out_dir.display()))]
    pub fn build(&self, sources: &[PathBuf], out_dir: &Path) -> Result<PyramidReport> {
        self.prepare_output(out_dir)?;

        let tree = QuadTree::new();
        let locate = self.collect(&tree, sources)?;
        let leaves = tree.len();
        let initial_depth = tree.depth();
        if self.config.link_sources {
            self.mirror_sources(&tree, out_dir)?;
        }
        let (levels, base) = self.finish(&tree, out_dir)?;

        info!(tiles = levels.iter().map(|l| l.groups).sum::<usize>() + 1, "done");
        Ok(PyramidReport {
            sources: sources.len(),
            locate,
            leaves,
            initial_depth,
            levels,
            base,
        })
    }

    /// Reduces an already populated tree down to the base image.
    pub fn finish(
        &self,
        tree: &QuadTree<PathBuf>,
        out_dir: &Path,
    ) -> Result<(Vec<LevelReport>, PathBuf)> {
        let mut levels = Vec::new();
        while let Some(level) = self.reduce_level(tree, out_dir)? {
            levels.push(level);
        }
        let base = self.write_base(tree, out_dir)?;
        Ok((levels, base))
    }

    /// Empties (when `clean_output` is set) and creates `out_dir`.
    pub fn prepare_output(&self, out_dir: &Path) -> Result<()> {
        if self.config.clean_output && fs::symlink_metadata(out_dir).is_ok() {
            info!(dir = %out_dir.display(), "removing old output");
            fs::remove_dir_all(out_dir)?;
        }
        fs::create_dir_all(out_dir)?;
        Ok(())
    }

    /// Locates the shallowest complete tiles of every source into `tree`.
    #[instrument(skip_all, fields(sources = sources.len()))]
    pub fn collect(&self, tree: &QuadTree<PathBuf>, sources: &[PathBuf]) -> Result<LocateStats> {
        info!("locating highest complete images");
        let stats = TileLocator::new(tree, &self.config).locate_all(sources)?;
        info!(leaves = tree.len(), depth = tree.depth(), "image hierarchy tree built");
        trace!("{}", tree.debug_string());
        tree.for_each_value(|path, file| debug!(%path, file = %file.display(), "leaf"));
        Ok(stats)
    }

    /// Links every leaf of `tree` into `out_dir`: `<path>.<ext>` points at the
    /// source image and `<path>` at the source directory next to it, if any.
    pub fn mirror_sources(&self, tree: &QuadTree<PathBuf>, out_dir: &Path) -> Result<usize> {
        info!("building symlinks");
        let mut links = 0;
        for (path, file) in tree.values() {
            let dst = self.tile_file(out_dir, &path);
            if let Some(parent) = dst.parent() {
                fs::create_dir_all(parent)?;
            }
            let src = std::path::absolute(&file)?;
            replace_link(&src, &dst)?;
            debug!(src = %src.display(), dst = %dst.display(), "linked tile");
            links += 1;

            let src_dir = src.with_extension("");
            if src_dir.is_dir() {
                let dst_dir = out_dir.join(path.to_relative_path(None));
                replace_link(&src_dir, &dst_dir)?;
                debug!(src = %src_dir.display(), dst = %dst_dir.display(), "linked directory");
                links += 1;
            }
        }
        Ok(links)
    }

    /// Merges every sibling group at the tree's deepest level into its parent
    /// tile and puts the parent in the tree in place of the group.
    ///
    /// Returns `None` once the tree is at most one level deep.
    #[instrument(skip_all)]
    pub fn reduce_level(
        &self,
        tree: &QuadTree<PathBuf>,
        out_dir: &Path,
    ) -> Result<Option<LevelReport>> {
        let depth = tree.depth();
        if depth <= 1 {
            return Ok(None);
        }
        info!(depth, "generating scaled-down images");

        let mut groups: BTreeMap<QuadPath, Vec<(Sector, PathBuf)>> = BTreeMap::new();
        for (path, file) in tree.values_at_depth(depth) {
            if let (Some(parent), Some(sector)) = (path.parent(), path.last()) {
                groups.entry(parent).or_default().push((sector, file));
            }
        }
        let groups: Vec<(QuadPath, Vec<(Sector, PathBuf)>)> = groups.into_iter().collect();
        let tiles_read = groups.iter().map(|(_, c)| c.len()).sum();

        try_map(&groups, self.config.parallel, |(parent, children)| {
            let img = self.composite_files(children)?;
            let dst = self.tile_file(out_dir, parent);
            write_tile(&img, &dst)?;
            if !tree.insert(parent, dst.clone())? {
                return Err(PyramidError::TreeConflict {
                    path: parent.to_string(),
                    reason: "a leaf already covers the parent of a sibling group".into(),
                });
            }
            debug!(path = %parent, file = %dst.display(), "wrote scaled-down image");
            Ok(())
        })?;

        Ok(Some(LevelReport {
            depth,
            groups: groups.len(),
            tiles_read,
        }))
    }

    /// Merges the level-1 tiles into `<out>/<base_name>.<ext>`.
    ///
    /// The tree must already be reduced to depth 1.
    pub fn write_base(&self, tree: &QuadTree<PathBuf>, out_dir: &Path) -> Result<PathBuf> {
        match tree.depth() {
            0 => return Err(PyramidError::NothingToMerge),
            1 => {}
            depth => {
                return Err(PyramidError::TreeConflict {
                    path: QuadPath::root().to_string(),
                    reason: format!("tree is still {depth} levels deep"),
                });
            }
        }
        info!("generating base image");
        let children: Vec<(Sector, PathBuf)> = tree
            .values_at_depth(1)
            .into_iter()
            .filter_map(|(path, file)| Some((path.last()?, file)))
            .collect();
        let img = self.composite_files(&children)?;
        let dst = out_dir.join(format!(
            "{}.{}",
            self.config.base_name, self.config.image_extension
        ));
        write_tile(&img, &dst)?;
        Ok(dst)
    }

    /// Output file for the tile at `path`.
    pub fn tile_file(&self, out_dir: &Path, path: &QuadPath) -> PathBuf {
        out_dir.join(path.to_relative_path(Some(&self.config.image_extension)))
    }

    fn composite_files(&self, children: &[(Sector, PathBuf)]) -> Result<RgbaImage> {
        let tile_size = self.config.tile_size;
        let mut dst = blank_tile(tile_size);
        for (sector, file) in children {
            let src = image::open(file)
                .map_err(|e| PyramidError::from(e).at_tile(file))?
                .to_rgba8();
            downsample_into(&src, &mut dst, *sector, tile_size).map_err(|e| e.at_tile(file))?;
        }
        Ok(dst)
    }
}

/// Saves `img` to `dst`, creating parent directories. A symlink left at `dst`
/// is removed first so the write never lands in a source tree.
pub(crate) fn write_tile(img: &RgbaImage, dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    if fs::symlink_metadata(dst).is_ok_and(|m| m.file_type().is_symlink()) {
        fs::remove_file(dst)?;
    }
    img.save(dst)
        .map_err(|e| PyramidError::from(e).at_tile(dst))
}

fn replace_link(src: &Path, dst: &Path) -> io::Result<()> {
    if let Ok(meta) = fs::symlink_metadata(dst) {
        if meta.is_dir() {
            fs::remove_dir_all(dst)?;
        } else {
            fs::remove_file(dst)?;
        }
    }
    link(src, dst)
}

#[cfg(unix)]
fn link(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

#[cfg(not(unix))]
fn link(src: &Path, dst: &Path) -> io::Result<()> {
    // no portable symlinks: copy tiles, leave directories out
    if src.is_dir() {
        return Ok(());
    }
    fs::copy(src, dst).map(|_| ())
}
