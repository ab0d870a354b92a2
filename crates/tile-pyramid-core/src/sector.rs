use serde::{Deserialize, Serialize};
use std::fmt;

/// Geometric quadrant of a tile, in bijection with the one-based quadrant
/// index used for file and directory names.
///
/// Declaration order is index order, so the derived `Ord` sorts sectors the
/// same way traversals visit them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sector {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Sector {
    /// All sectors in quadrant index order (1, 2, 3, 4).
    pub const ALL: [Sector; 4] = [
        Sector::TopLeft,
        Sector::TopRight,
        Sector::BottomLeft,
        Sector::BottomRight,
    ];

    /// Sector for a one-based quadrant index; `None` outside `1..=4`.
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            1..=4 => Some(Self::ALL[usize::from(index - 1)]),
            _ => None,
        }
    }

    /// One-based quadrant index (1..=4).
    pub fn index(self) -> u8 {
        self.slot() as u8 + 1
    }

    /// Zero-based child slot inside an internal node.
    pub(crate) fn slot(self) -> usize {
        match self {
            Sector::TopLeft => 0,
            Sector::TopRight => 1,
            Sector::BottomLeft => 2,
            Sector::BottomRight => 3,
        }
    }

    /// Signed unit offsets `(dx, dy)` of this sector's center relative to the
    /// parent's center, with y growing downwards.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Sector::TopLeft => (-1, -1),
            Sector::TopRight => (1, -1),
            Sector::BottomLeft => (-1, 1),
            Sector::BottomRight => (1, 1),
        }
    }

    /// Pixel offset of this sector's quadrant inside a parent whose half side is
    /// `half`: a negative delta maps to 0, a positive one to `half`.
    pub fn pixel_offset(self, half: u32) -> (u32, u32) {
        let (dx, dy) = self.delta();
        let ox = if dx > 0 { half } else { 0 };
        let oy = if dy > 0 { half } else { 0 };
        (ox, oy)
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}
