use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Axis-aligned rectangle (pixels). `x,y` is top-left; `w,h` are sizes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
    /// Inclusive right edge coordinate (`x + w - 1`).
    pub fn right(&self) -> u32 {
        self.x + self.w.saturating_sub(1)
    }
    /// Inclusive bottom edge coordinate (`y + h - 1`).
    pub fn bottom(&self) -> u32 {
        self.y + self.h.saturating_sub(1)
    }
    /// Returns true if `r` is fully inside `self` (inclusive edges).
    pub fn contains(&self, r: &Rect) -> bool {
        r.x >= self.x && r.y >= self.y && r.right() <= self.right() && r.bottom() <= self.bottom()
    }
}

/// Counters gathered while locating complete tiles in one or more sources.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocateStats {
    /// Candidate images decoded and scanned.
    pub images_scanned: usize,
    /// Images with at least one transparent pixel (search continued below).
    pub incomplete: usize,
    /// Complete images inserted into the tree.
    pub inserted: usize,
    /// Complete images rejected because an ancestor already holds a tile,
    /// or the slot is already taken.
    pub skipped: usize,
}

impl LocateStats {
    pub fn merge(&mut self, other: &LocateStats) {
        self.images_scanned += other.images_scanned;
        self.incomplete += other.incomplete;
        self.inserted += other.inserted;
        self.skipped += other.skipped;
    }
}

/// One reduce pass: all groups at `depth` composited into `depth - 1`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LevelReport {
    /// Depth of the children that were merged.
    pub depth: usize,
    /// Number of parent tiles written.
    pub groups: usize,
    /// Number of child tiles read.
    pub tiles_read: usize,
}

/// Summary of a full pyramid run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PyramidReport {
    pub sources: usize,
    pub locate: LocateStats,
    /// Leaves in the tree after the collect phase.
    pub leaves: usize,
    /// Tree depth after the collect phase.
    pub initial_depth: usize,
    pub levels: Vec<LevelReport>,
    /// Path of the final base image.
    pub base: PathBuf,
}

impl PyramidReport {
    /// Total number of composited tiles written, the base image included.
    pub fn tiles_written(&self) -> usize {
        self.levels.iter().map(|l| l.groups).sum::<usize>() + 1
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "sources": self.sources,
            "images_scanned": self.locate.images_scanned,
            "incomplete": self.locate.incomplete,
            "inserted": self.locate.inserted,
            "skipped": self.locate.skipped,
            "leaves": self.leaves,
            "initial_depth": self.initial_depth,
            "levels": self.levels,
            "tiles_written": self.tiles_written(),
            "base": self.base.to_string_lossy().replace('\\', "/"),
        })
    }
}

/// Summary of slicing one large image into a source tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SliceReport {
    pub source_side: u32,
    pub depth: usize,
    pub tiles: usize,
}
