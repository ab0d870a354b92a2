use crate::config::PyramidConfig;
use crate::error::{PyramidError, Result};
use crate::model::{Rect, SliceReport};
use crate::parallel::try_map;
use crate::path::{QuadPath, all_possible_paths};
use crate::pyramid::write_tile;
use image::RgbaImage;
use image::imageops::crop_imm;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Number of levels needed to cut a square image of side `side` into tiles of
/// `tile_size`: `side` must be `tile_size * 2^k` with `k >= 1`.
pub fn slice_depth(side: u32, tile_size: u32) -> Result<usize> {
    let invalid = || PyramidError::InvalidDimensions { side, tile_size };
    if tile_size == 0 || side % tile_size != 0 {
        return Err(invalid());
    }
    let ratio = side / tile_size;
    if ratio < 2 || !ratio.is_power_of_two() {
        return Err(invalid());
    }
    Ok(ratio.trailing_zeros() as usize)
}

/// Cuts `img` into a regular grid of tiles written as a source tree under
/// `out_dir` (`<out>/<path>.<ext>` for every path of the grid depth).
///
/// Returns the written tiles in path order, ready to be inserted into a tree.
#[instrument(skip_all, fields(out = %out_dir.display()))]
pub fn slice_image(
    img: &RgbaImage,
    config: &PyramidConfig,
    out_dir: &Path,
) -> Result<(SliceReport, Vec<(QuadPath, PathBuf)>)> {
    config.validate()?;
    let (width, height) = img.dimensions();
    if width != height {
        return Err(PyramidError::NotSquare { width, height });
    }
    let depth = slice_depth(width, config.tile_size)?;
    info!(side = width, depth, "slicing source image");

    let bounds = Rect::new(0, 0, width, height);
    let paths = all_possible_paths(depth);
    let tiles = try_map(&paths, config.parallel, |path| {
        let region = path.region(width);
        debug_assert!(bounds.contains(&region), "region {region:?} outside image");
        let tile = crop_imm(img, region.x, region.y, region.w, region.h).to_image();
        let dst = out_dir.join(path.to_relative_path(Some(&config.image_extension)));
        write_tile(&tile, &dst)?;
        Ok((path.clone(), dst))
    })?;

    let report = SliceReport {
        source_side: width,
        depth,
        tiles: tiles.len(),
    };
    Ok((report, tiles))
}
