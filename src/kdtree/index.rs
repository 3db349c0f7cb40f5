use crate::bounds::Aabb;
use crate::error::Result;
use crate::kdtree::builder::DEFAULT_KDTREE_LEAF_SIZE;
use crate::kdtree::KDTreeBuilder;
use crate::r#type::{IndexableNum, KDPoint};

/// A single node of the tree.
///
/// Nodes live in one flat array and refer to their children by position in that array. The root
/// is always at position 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Node<N: IndexableNum> {
    /// A half-open range `[start, end)` into the reordered points and indices.
    Leaf { start: usize, end: usize },

    /// Two children split on `dimension`. `gap_min` is the upper bound of `child1` on that
    /// dimension and `gap_max` the lower bound of `child2`. Both are the exact extents of the
    /// children's points, not the cut value the split was made at.
    Internal {
        child1: usize,
        child2: usize,
        dimension: usize,
        gap_min: N,
        gap_max: N,
    },

    /// Placeholder for a node whose children are still being built.
    Uninitialized,
}

/// Common metadata to describe a tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KDTreeMetadata<N: IndexableNum> {
    pub(crate) num_items: u32,
    pub(crate) num_nodes: usize,
    pub(crate) max_leaf_size: usize,
    pub(crate) epsilon: N,
}

impl<N: IndexableNum> KDTreeMetadata<N> {
    /// The number of points in the tree.
    pub fn num_items(&self) -> u32 {
        self.num_items
    }

    /// The number of nodes, leaves and internal nodes together.
    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// The maximum number of points held by one leaf.
    pub fn max_leaf_size(&self) -> usize {
        self.max_leaf_size
    }

    /// The tolerance used for split-dimension selection. Searches do not use it.
    pub fn epsilon(&self) -> N {
        self.epsilon
    }
}

/// An immutable, bulk-loaded K-D Tree.
///
/// Usually this will be created via [`KDTreeBuilder`] or [`KDTree::try_new`]. All queries are
/// provided by the [`KDTreeIndex`][crate::kdtree::KDTreeIndex] trait.
///
/// ```
/// use static_kdtree::kdtree::{KDTree, KDTreeIndex};
///
/// let points = vec![[0.0f64, 0.0], [1.0, 0.0], [0.0, 1.0], [5.0, 5.0]];
/// let tree = KDTree::try_with_leaf_size(points, 1).unwrap();
///
/// let nearest = tree.nearest(&[0.0, 0.0], 2);
/// assert_eq!(nearest.indices(), &[0, 1]);
/// assert_eq!(nearest.distances_squared(), &[0.0, 1.0]);
///
/// // Points exactly on the radius are excluded.
/// let found: Vec<u32> = tree.within(&[0.0, 0.0], 1.0).into_iter().map(|(i, _)| i).collect();
/// assert_eq!(found, vec![0]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct KDTree<P: KDPoint> {
    pub(crate) nodes: Vec<Node<P::Num>>,
    pub(crate) points: Vec<P>,
    pub(crate) indices: Vec<u32>,
    pub(crate) bounds: Option<Aabb<P::Num>>,
    pub(crate) metadata: KDTreeMetadata<P::Num>,
}

impl<P: KDPoint> KDTree<P> {
    /// Build a tree over `points` with the given leaf size and split tolerance.
    ///
    /// The position of each point in `points` is the index reported by queries.
    pub fn try_new(points: Vec<P>, max_leaf_size: usize, epsilon: P::Num) -> Result<Self> {
        KDTreeBuilder::from_points(points, max_leaf_size)
            .with_epsilon(epsilon)
            .finish()
    }

    /// Build a tree over `points` with the given leaf size and the default tolerance.
    pub fn try_with_leaf_size(points: Vec<P>, max_leaf_size: usize) -> Result<Self> {
        Self::try_new(points, max_leaf_size, P::Num::DEFAULT_EPSILON)
    }

    /// Build a tree over `points` with the default leaf size and tolerance.
    pub fn try_from_points(points: Vec<P>) -> Result<Self> {
        Self::try_with_leaf_size(points, DEFAULT_KDTREE_LEAF_SIZE)
    }

    /// The bounding box of every point in the tree, or `None` if the tree is empty.
    pub fn bounds(&self) -> Option<&Aabb<P::Num>> {
        self.bounds.as_ref()
    }

    /// The number of leaf nodes.
    pub fn num_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node, Node::Leaf { .. }))
            .count()
    }

    /// The number of nodes on the longest path from the root to a leaf, or 0 for an empty tree.
    pub fn depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }

        let mut max_depth = 0;
        let mut stack = vec![(0usize, 1usize)];
        while let Some((index, depth)) = stack.pop() {
            match self.nodes[index] {
                Node::Leaf { .. } => max_depth = max_depth.max(depth),
                Node::Internal { child1, child2, .. } => {
                    stack.push((child1, depth + 1));
                    stack.push((child2, depth + 1));
                }
                Node::Uninitialized => unreachable!("uninitialized node {index} in a built tree"),
            }
        }
        max_depth
    }

    /// Whether this tree holds no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Consume the tree, returning the reordered points and their original indices.
    pub fn into_inner(self) -> (Vec<P>, Vec<u32>) {
        (self.points, self.indices)
    }
}
