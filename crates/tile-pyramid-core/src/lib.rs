//! Core library for merging quad-tree tile sets into a single map pyramid.
//!
//! - Tree: `QuadTree` is a sparse, lock-guarded quad-tree whose leaves never have descendants
//! - Paths: `QuadPath` and `Sector` map quadrant indices (1..=4) to file paths and pixel offsets
//! - Locating: `TileLocator` finds the shallowest complete tiles of each source tree
//! - Compositing: `downsample_into` halves a tile with an exact 2x2 box filter
//! - Driver: `Pyramid` reduces the tree level by level down to one base image
//!
//! Quick example:
//! ```ignore
//! use std::path::{Path, PathBuf};
//! use tile_pyramid_core::{Pyramid, PyramidConfig};
//! # fn main() -> anyhow::Result<()> {
//! let cfg = PyramidConfig::builder().tile_size(256).build();
//! let sources = vec![PathBuf::from("worlds/a/topdown"), PathBuf::from("worlds/b/topdown")];
//! let report = Pyramid::new(cfg)?.build(&sources, Path::new("out"))?;
//! println!("levels: {}", report.levels.len());
//! # Ok(()) }
//! ```

pub mod compositing;
pub mod config;
pub mod error;
pub mod locator;
pub mod model;
mod parallel;
pub mod path;
pub mod pyramid;
pub mod quadtree;
pub mod sector;
pub mod slice;
pub mod sources;

pub use compositing::*;
pub use config::*;
pub use error::*;
pub use locator::*;
pub use model::*;
pub use path::*;
pub use pyramid::*;
pub use quadtree::*;
pub use sector::*;
pub use slice::*;
pub use sources::*;

/// Convenience prelude for common types and functions.
/// Importing `tile_pyramid_core::prelude::*` brings the primary APIs into scope.
pub mod prelude {
    pub use crate::config::{PyramidConfig, PyramidConfigBuilder, SourceFilter};
    pub use crate::model::{LevelReport, LocateStats, PyramidReport, Rect, SliceReport};
    pub use crate::{
        Pyramid, PyramidError, QuadPath, QuadTree, Sector, TileLocator, all_possible_paths,
        discover_sources, downsample_into, layer_sources, slice_image,
    };
}
