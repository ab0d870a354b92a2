use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PyramidError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Quad-tree paths must contain at least one quadrant index")]
    EmptyPath,
    #[error("Invalid quad-tree path: {0}")]
    InvalidPath(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Not a {expected}x{expected} tile! ({width}x{height})")]
    TileSize {
        expected: u32,
        width: u32,
        height: u32,
    },
    #[error("Image is not square ({width}x{height})")]
    NotSquare { width: u32, height: u32 },
    #[error("Image side {side} is not tile size {tile_size} times a power of two")]
    InvalidDimensions { side: u32, tile_size: u32 },
    #[error("Alpha values overlap in the 2x2 block at ({x},{y})")]
    MixedAlpha { x: u32, y: u32 },
    #[error("Unable to find child directory {dir} for incomplete tile at path {path}")]
    MissingChildDirectory { path: String, dir: PathBuf },
    #[error("Tree rejected tile at path {path}: {reason}")]
    TreeConflict { path: String, reason: String },
    #[error("No complete tiles were found, nothing to merge")]
    NothingToMerge,
    #[error("{}: {source}", path.display())]
    Tile {
        path: PathBuf,
        #[source]
        source: Box<PyramidError>,
    },
}

impl PyramidError {
    /// Attach the tile file that triggered this error.
    pub fn at_tile(self, path: impl Into<PathBuf>) -> Self {
        match self {
            // innermost file wins
            e @ PyramidError::Tile { .. } => e,
            other => PyramidError::Tile {
                path: path.into(),
                source: Box::new(other),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, PyramidError>;
