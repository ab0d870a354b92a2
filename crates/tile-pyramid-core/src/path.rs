use crate::error::{PyramidError, Result};
use crate::model::Rect;
use crate::sector::Sector;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Position of a node in the quad-tree: the sectors walked from the root.
///
/// Paths are values. Extending one with [`QuadPath::child`] returns a new path
/// and leaves the original untouched, so a recursive walk can hand each branch
/// its own copy without any shared stack.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QuadPath {
    sectors: Vec<Sector>,
}

impl QuadPath {
    /// The empty path (the root node).
    pub fn root() -> Self {
        Self::default()
    }

    pub fn new(sectors: Vec<Sector>) -> Self {
        Self { sectors }
    }

    /// Builds a path from one-based quadrant indices.
    pub fn from_indices(indices: &[u8]) -> Result<Self> {
        let mut sectors = Vec::with_capacity(indices.len());
        for &i in indices {
            let sector = Sector::from_index(i).ok_or_else(|| {
                PyramidError::InvalidPath(format!("quadrant index {i} is not in 1..=4"))
            })?;
            sectors.push(sector);
        }
        Ok(Self { sectors })
    }

    pub fn sectors(&self) -> &[Sector] {
        &self.sectors
    }

    pub fn indices(&self) -> Vec<u8> {
        self.sectors.iter().map(|s| s.index()).collect()
    }

    /// Depth of the node this path addresses.
    pub fn len(&self) -> usize {
        self.sectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sectors.is_empty()
    }

    /// Sector of the addressed node within its parent; `None` for the root.
    pub fn last(&self) -> Option<Sector> {
        self.sectors.last().copied()
    }

    /// New path one level deeper.
    pub fn child(&self, sector: Sector) -> Self {
        let mut sectors = Vec::with_capacity(self.sectors.len() + 1);
        sectors.extend_from_slice(&self.sectors);
        sectors.push(sector);
        Self { sectors }
    }

    /// Path of the parent node; `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        let (_, head) = self.sectors.split_last()?;
        Some(Self {
            sectors: head.to_vec(),
        })
    }

    /// Joins the quadrant indices with `/` between `prefix` and `suffix`,
    /// e.g. `"1/4/2.png"` for suffix `".png"`.
    pub fn to_directory_path(&self, prefix: &str, suffix: &str) -> String {
        let mut s = String::with_capacity(prefix.len() + self.sectors.len() * 2 + suffix.len());
        s.push_str(prefix);
        for (i, sector) in self.sectors.iter().enumerate() {
            if i > 0 {
                s.push('/');
            }
            s.push(char::from(b'0' + sector.index()));
        }
        s.push_str(suffix);
        s
    }

    /// Relative filesystem path for this node. With an extension the last
    /// component names the tile image (`1/4/2.png`), without one it names the
    /// directory holding the node's children (`1/4/2`).
    pub fn to_relative_path(&self, extension: Option<&str>) -> PathBuf {
        let mut out = PathBuf::new();
        let Some((last, head)) = self.sectors.split_last() else {
            return out;
        };
        for sector in head {
            out.push(sector.index().to_string());
        }
        match extension {
            Some(ext) => out.push(format!("{}.{}", last.index(), ext)),
            None => out.push(last.index().to_string()),
        }
        out
    }

    /// Square pixel region this node covers inside a square image of side
    /// `image_side`, located by summing sector deltas from the image center.
    pub fn region(&self, image_side: u32) -> Rect {
        let side = i64::from(image_side);
        let mut cx = side / 2;
        let mut cy = side / 2;
        for (level, sector) in self.sectors.iter().enumerate() {
            let step = side >> (level + 2);
            let (dx, dy) = sector.delta();
            cx += step * i64::from(dx);
            cy += step * i64::from(dy);
        }
        let w = image_side >> self.sectors.len();
        let half = i64::from(w / 2);
        Rect::new((cx - half) as u32, (cy - half) as u32, w, w)
    }
}

impl fmt::Display for QuadPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sectors.is_empty() {
            f.write_str("<root>")
        } else {
            f.write_str(&self.to_directory_path("", ""))
        }
    }
}

impl FromStr for QuadPath {
    type Err = PyramidError;

    /// Parses `"1/4/2"`; surrounding slashes are ignored and `""` is the root.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim_matches('/');
        if trimmed.is_empty() {
            return Ok(Self::root());
        }
        let mut indices = Vec::new();
        for part in trimmed.split('/') {
            let i: u8 = part
                .parse()
                .map_err(|_| PyramidError::InvalidPath(format!("{s:?}: bad segment {part:?}")))?;
            indices.push(i);
        }
        Self::from_indices(&indices)
    }
}

/// Every path of exactly `depth` sectors (`4^depth` of them), distinct and in
/// lexicographic order.
pub fn all_possible_paths(depth: usize) -> Vec<QuadPath> {
    let mut paths = vec![QuadPath::root()];
    for _ in 0..depth {
        paths = paths
            .iter()
            .flat_map(|p| Sector::ALL.iter().map(move |&s| p.child(s)))
            .collect();
    }
    paths
}
