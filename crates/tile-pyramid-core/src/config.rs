use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Pyramid build configuration.
/// Key notes:
///   - `tile_size` is the side of every source and output tile; it must be a power of two
///   - `parallel` only has an effect when the crate feature `parallel` is on
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PyramidConfig {
    /// Side length in pixels of every (square) tile.
    #[serde(default = "default_tile_size")]
    pub tile_size: u32,
    /// Extension of source and output tiles; also selects the encoder.
    #[serde(default = "default_image_extension")]
    pub image_extension: String,
    /// File stem of the single root image written at the end of a run.
    #[serde(default = "default_base_name")]
    pub base_name: String,
    /// Locate sources and composite groups on the rayon pool.
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    /// Mirror located source tiles into the output tree as symlinks.
    #[serde(default = "default_link_sources")]
    pub link_sources: bool,
    /// Remove the output directory before a run.
    #[serde(default = "default_clean_output")]
    pub clean_output: bool,
}

impl Default for PyramidConfig {
    fn default() -> Self {
        Self {
            tile_size: default_tile_size(),
            image_extension: default_image_extension(),
            base_name: default_base_name(),
            parallel: default_parallel(),
            link_sources: default_link_sources(),
            clean_output: default_clean_output(),
        }
    }
}

impl PyramidConfig {
    /// Validates the configuration parameters.
    ///
    /// Returns an error if:
    /// - `tile_size` is not a power of two of at least 2; quadrants of sparse
    ///   groups must stay aligned to 2x2 blocks at every level
    /// - the extension or base name is empty or contains a path separator
    /// - the base name would collide with a quadrant tile name (`1`..`4`)
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::PyramidError;

        if self.tile_size < 2 || !self.tile_size.is_power_of_two() {
            return Err(PyramidError::InvalidConfig(format!(
                "tile_size must be a power of two of at least 2, got {}",
                self.tile_size
            )));
        }
        if self.image_extension.is_empty()
            || self.image_extension.contains(['/', '\\', '.'])
        {
            return Err(PyramidError::InvalidConfig(format!(
                "image_extension {:?} is not a bare extension",
                self.image_extension
            )));
        }
        if self.base_name.is_empty() || self.base_name.contains(['/', '\\']) {
            return Err(PyramidError::InvalidConfig(format!(
                "base_name {:?} is not a plain file stem",
                self.base_name
            )));
        }
        if matches!(self.base_name.as_str(), "1" | "2" | "3" | "4") {
            return Err(PyramidError::InvalidConfig(format!(
                "base_name {:?} collides with a quadrant tile",
                self.base_name
            )));
        }
        Ok(())
    }

    /// Quadrant index of a tile file named `<digit>.<image_extension>`; the
    /// extension compares case-insensitively.
    pub fn tile_index(&self, name: &str) -> Option<u8> {
        let (stem, ext) = name.split_once('.')?;
        if !ext.eq_ignore_ascii_case(&self.image_extension) {
            return None;
        }
        quadrant_digit(stem)
    }
}

/// Quadrant index for a directory or file stem named `1`..`4`.
pub fn quadrant_digit(name: &str) -> Option<u8> {
    match name {
        "1" => Some(1),
        "2" => Some(2),
        "3" => Some(3),
        "4" => Some(4),
        _ => None,
    }
}

fn default_tile_size() -> u32 {
    256
}
fn default_image_extension() -> String {
    "png".into()
}
fn default_base_name() -> String {
    "base".into()
}
fn default_parallel() -> bool {
    true
}
fn default_link_sources() -> bool {
    true
}
fn default_clean_output() -> bool {
    true
}

/// Builder for `PyramidConfig` for ergonomic construction.
#[derive(Debug, Default, Clone)]
pub struct PyramidConfigBuilder {
    cfg: PyramidConfig,
}

impl PyramidConfigBuilder {
    pub fn new() -> Self {
        Self {
            cfg: PyramidConfig::default(),
        }
    }
    pub fn tile_size(mut self, v: u32) -> Self {
        self.cfg.tile_size = v;
        self
    }
    pub fn image_extension(mut self, v: impl Into<String>) -> Self {
        self.cfg.image_extension = v.into();
        self
    }
    pub fn base_name(mut self, v: impl Into<String>) -> Self {
        self.cfg.base_name = v.into();
        self
    }
    pub fn parallel(mut self, v: bool) -> Self {
        self.cfg.parallel = v;
        self
    }
    pub fn link_sources(mut self, v: bool) -> Self {
        self.cfg.link_sources = v;
        self
    }
    pub fn clean_output(mut self, v: bool) -> Self {
        self.cfg.clean_output = v;
        self
    }
    pub fn build(self) -> PyramidConfig {
        self.cfg
    }
}

impl PyramidConfig {
    /// Create a fluent builder for `PyramidConfig`.
    pub fn builder() -> PyramidConfigBuilder {
        PyramidConfigBuilder::new()
    }
}

/// Which children of an input root count as source trees.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceFilter {
    /// Only accept directories containing a file with this name (e.g. `done`).
    #[serde(default)]
    pub marker: Option<String>,
    /// Descend into this fixed subdirectory of each accepted directory.
    #[serde(default)]
    pub subdir: Option<PathBuf>,
}
