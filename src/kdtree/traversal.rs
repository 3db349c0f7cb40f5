//! Utilities to traverse the KDTree structure.

use std::ops::Range;

use crate::bounds::Aabb;
use crate::kdtree::index::Node;
use crate::kdtree::KDTree;
use crate::r#type::{IndexableNum, KDPoint};

/// How an internal node divides its children.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Split<N: IndexableNum> {
    /// The dimension the children are split over
    pub dimension: usize,
    /// The upper bound of the first child on `dimension`
    pub gap_min: N,
    /// The lower bound of the second child on `dimension`
    pub gap_max: N,
}

/// A node in the KDTree.
#[derive(Debug)]
pub struct TreeNode<'a, P: KDPoint> {
    /// The tree that this node is a reference onto
    tree: &'a KDTree<P>,

    /// Position in the tree's node array
    index: usize,
}

impl<P: KDPoint> Clone for TreeNode<'_, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P: KDPoint> Copy for TreeNode<'_, P> {}

impl<'a, P: KDPoint> TreeNode<'a, P> {
    #[inline]
    fn node(&self) -> Node<P::Num> {
        self.tree.nodes[self.index]
    }

    /// Returns `true` if this is a leaf node without children.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self.node(), Node::Leaf { .. })
    }

    /// Returns `true` if this is an intermediate node with children.
    #[inline]
    pub fn is_parent(&self) -> bool {
        !self.is_leaf()
    }

    /// The two children of an intermediate node, or `None` for a leaf.
    pub fn children(&self) -> Option<(TreeNode<'a, P>, TreeNode<'a, P>)> {
        match self.node() {
            Node::Internal { child1, child2, .. } => Some((
                TreeNode {
                    tree: self.tree,
                    index: child1,
                },
                TreeNode {
                    tree: self.tree,
                    index: child2,
                },
            )),
            _ => None,
        }
    }

    /// The split of an intermediate node, or `None` for a leaf.
    pub fn split(&self) -> Option<Split<P::Num>> {
        match self.node() {
            Node::Internal {
                dimension,
                gap_min,
                gap_max,
                ..
            } => Some(Split {
                dimension,
                gap_min,
                gap_max,
            }),
            _ => None,
        }
    }

    /// The contiguous range of reordered slots covered by this subtree.
    pub fn range(&self) -> Range<usize> {
        let mut first = self.index;
        let start = loop {
            match self.tree.nodes[first] {
                Node::Leaf { start, .. } => break start,
                Node::Internal { child1, .. } => first = child1,
                Node::Uninitialized => unreachable!("uninitialized node {first} in a built tree"),
            }
        };

        let mut last = self.index;
        let end = loop {
            match self.tree.nodes[last] {
                Node::Leaf { end, .. } => break end,
                Node::Internal { child2, .. } => last = child2,
                Node::Uninitialized => unreachable!("uninitialized node {last} in a built tree"),
            }
        };

        start..end
    }

    /// The points held by this subtree.
    pub fn points(&self) -> &'a [P] {
        &self.tree.points[self.range()]
    }

    /// The insertion indices of the points held by this subtree.
    pub fn indices(&self) -> &'a [u32] {
        &self.tree.indices[self.range()]
    }

    /// The exact bounding box of the points held by this subtree.
    pub fn bounds(&self) -> Aabb<P::Num> {
        // Every subtree holds at least one point
        Aabb::from_points(self.points()).unwrap_or_else(|| unreachable!("empty subtree"))
    }
}

impl<P: KDPoint> KDTree<P> {
    /// Access the root node of the KDTree for manual traversal, or `None` if the tree is empty.
    pub fn root(&self) -> Option<TreeNode<'_, P>> {
        if self.nodes.is_empty() {
            None
        } else {
            Some(TreeNode {
                tree: self,
                index: 0,
            })
        }
    }
}
