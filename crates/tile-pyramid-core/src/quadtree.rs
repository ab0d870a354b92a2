//! Concurrent sparse quad-tree keyed by [`QuadPath`].
//!
//! Every node is one of three kinds: an empty slot, an internal node with four
//! child slots, or a leaf holding a value. A leaf never has descendants, and
//! the tree refuses to place a value anywhere below an existing leaf: once a
//! coarser tile covers a region, finer tiles for that region are redundant.
//!
//! A single reader/writer lock guards the whole tree. Traversals share the
//! read side; [`QuadTree::insert`] takes the write side.

use crate::error::{PyramidError, Result};
use crate::path::QuadPath;
use crate::sector::Sector;
use parking_lot::RwLock;
use std::fmt::{self, Write as _};

#[derive(Debug)]
enum Node<V> {
    Empty,
    Internal(Box<[Node<V>; 4]>),
    Leaf(V),
}

impl<V> Node<V> {
    fn internal() -> Self {
        Node::Internal(Box::new(std::array::from_fn(|_| Node::Empty)))
    }
}

#[derive(Debug)]
pub struct QuadTree<V> {
    root: RwLock<Node<V>>,
}

impl<V> Default for QuadTree<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> QuadTree<V> {
    pub fn new() -> Self {
        Self {
            root: RwLock::new(Node::internal()),
        }
    }

    /// Stores `value` at `path`.
    ///
    /// Returns `Ok(false)` without touching the tree when a leaf already sits
    /// at `path` or at any of its ancestors. An internal subtree at `path` is
    /// replaced wholesale by the new leaf. Missing intermediate nodes are
    /// created on the way down.
    ///
    /// An empty path is rejected with [`PyramidError::EmptyPath`].
    pub fn insert(&self, path: &QuadPath, value: V) -> Result<bool> {
        if path.is_empty() {
            return Err(PyramidError::EmptyPath);
        }
        let mut root = self.root.write();
        Ok(insert_at(&mut root, path.sectors(), value))
    }

    /// Maximum depth of any leaf; 0 for a tree without leaves.
    pub fn depth(&self) -> usize {
        let root = self.root.read();
        depth_of(&root, 0).unwrap_or(0)
    }

    /// Number of leaves.
    pub fn len(&self) -> usize {
        let root = self.root.read();
        count_leaves(&root)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Visits every leaf depth-first, children in quadrant index order.
    ///
    /// The read lock is held for the whole walk; `visitor` must not call
    /// [`QuadTree::insert`] on the same tree.
    pub fn for_each_value<F>(&self, mut visitor: F)
    where
        F: FnMut(&QuadPath, &V),
    {
        let root = self.root.read();
        walk(&root, &QuadPath::root(), None, &mut visitor);
    }

    /// Like [`QuadTree::for_each_value`], restricted to leaves at exactly
    /// `depth`. Subtrees below `depth` are not entered.
    pub fn for_each_value_at_depth<F>(&self, depth: usize, mut visitor: F)
    where
        F: FnMut(&QuadPath, &V),
    {
        let root = self.root.read();
        walk(&root, &QuadPath::root(), Some(depth), &mut visitor);
    }

    /// Snapshot of all `(path, value)` pairs in traversal order.
    pub fn values(&self) -> Vec<(QuadPath, V)>
    where
        V: Clone,
    {
        let mut out = Vec::new();
        self.for_each_value(|p, v| out.push((p.clone(), v.clone())));
        out
    }

    /// Snapshot of the leaves at exactly `depth`, in traversal order.
    pub fn values_at_depth(&self, depth: usize) -> Vec<(QuadPath, V)>
    where
        V: Clone,
    {
        let mut out = Vec::new();
        self.for_each_value_at_depth(depth, |p, v| out.push((p.clone(), v.clone())));
        out
    }

    /// Multi-line dump of the tree structure.
    pub fn debug_string(&self) -> String
    where
        V: fmt::Debug,
    {
        let root = self.root.read();
        let mut s = String::new();
        render(&mut s, &root, 0);
        s
    }
}

fn insert_at<V>(node: &mut Node<V>, sectors: &[Sector], value: V) -> bool {
    let Some((sector, rest)) = sectors.split_first() else {
        return match node {
            Node::Leaf(_) => false,
            _ => {
                *node = Node::Leaf(value);
                true
            }
        };
    };
    if let Node::Empty = node {
        *node = Node::internal();
    }
    match node {
        Node::Internal(children) => insert_at(&mut children[sector.slot()], rest, value),
        // a leaf above the target already covers this region
        _ => false,
    }
}

fn depth_of<V>(node: &Node<V>, depth: usize) -> Option<usize> {
    match node {
        Node::Empty => None,
        Node::Leaf(_) => Some(depth),
        Node::Internal(children) => children
            .iter()
            .filter_map(|c| depth_of(c, depth + 1))
            .max(),
    }
}

fn count_leaves<V>(node: &Node<V>) -> usize {
    match node {
        Node::Empty => 0,
        Node::Leaf(_) => 1,
        Node::Internal(children) => children.iter().map(count_leaves).sum(),
    }
}

fn walk<V, F>(node: &Node<V>, path: &QuadPath, target: Option<usize>, visitor: &mut F)
where
    F: FnMut(&QuadPath, &V),
{
    match node {
        Node::Empty => {}
        Node::Leaf(v) => {
            if target.is_none_or(|t| t == path.len()) {
                visitor(path, v);
            }
        }
        Node::Internal(children) => {
            if target.is_some_and(|t| path.len() >= t) {
                return;
            }
            for sector in Sector::ALL {
                walk(&children[sector.slot()], &path.child(sector), target, visitor);
            }
        }
    }
}

fn render<V: fmt::Debug>(s: &mut String, node: &Node<V>, depth: usize) {
    match node {
        Node::Empty => s.push_str("empty"),
        Node::Leaf(v) => {
            let _ = write!(s, "value[{v:?}]");
        }
        Node::Internal(children) => {
            s.push_str("node[");
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    s.push(',');
                }
                newline(s, depth + 1);
                render(s, child, depth + 1);
            }
            newline(s, depth);
            s.push(']');
        }
    }
}

fn newline(s: &mut String, indent: usize) {
    s.push('\n');
    s.extend(std::iter::repeat_n(' ', indent));
}
