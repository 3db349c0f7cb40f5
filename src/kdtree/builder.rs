use num_traits::{Float, One, Zero};

use crate::bounds::Aabb;
use crate::error::{KDTreeError, Result};
use crate::kdtree::index::{KDTreeMetadata, Node};
use crate::kdtree::KDTree;
use crate::r#type::{IndexableNum, KDPoint};

/// The default leaf size used by [`KDTreeBuilder::new`]
pub const DEFAULT_KDTREE_LEAF_SIZE: usize = 10;

/// A builder to create a [`KDTree`].
///
/// ```
/// use static_kdtree::kdtree::{KDTreeBuilder, KDTreeIndex};
///
/// let mut builder = KDTreeBuilder::<[f64; 3]>::new_with_leaf_size(3, 2);
/// builder.add([0., 0., 0.]);
/// builder.add([1., 1., 1.]);
/// builder.add([2., 2., 2.]);
/// let tree = builder.finish().unwrap();
///
/// let nearest = tree.nearest(&[1.9, 1.9, 1.9], 1);
/// assert_eq!(nearest.indices(), &[2]);
/// ```
#[derive(Debug, Clone)]
pub struct KDTreeBuilder<P: KDPoint> {
    points: Vec<P>,
    num_items: usize,
    max_leaf_size: usize,
    epsilon: P::Num,
}

impl<P: KDPoint> KDTreeBuilder<P> {
    /// Create a new builder with the provided number of items and the default leaf size.
    pub fn new(num_items: usize) -> Self {
        Self::new_with_leaf_size(num_items, DEFAULT_KDTREE_LEAF_SIZE)
    }

    /// Create a new builder with the provided number of items and leaf size.
    pub fn new_with_leaf_size(num_items: usize, max_leaf_size: usize) -> Self {
        Self {
            points: Vec::with_capacity(num_items),
            num_items,
            max_leaf_size,
            epsilon: P::Num::DEFAULT_EPSILON,
        }
    }

    /// Create a builder that already holds every point of `points`.
    pub fn from_points(points: Vec<P>, max_leaf_size: usize) -> Self {
        Self {
            num_items: points.len(),
            points,
            max_leaf_size,
            epsilon: P::Num::DEFAULT_EPSILON,
        }
    }

    /// Set the tolerance used to decide which dimensions count as "widest" when splitting. It has
    /// no effect on searches, which are exact unless given an error factor.
    pub fn with_epsilon(mut self, epsilon: P::Num) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Add a point to the index.
    ///
    /// This returns the insertion index, which queries report to reference your original
    /// collection.
    pub fn add(&mut self, point: P) -> u32 {
        let index = self.points.len();
        self.points.push(point);
        // Indices past u32::MAX are rejected in `finish`
        index as u32
    }

    /// Add every point from an iterator, in order.
    pub fn add_all(&mut self, points: impl IntoIterator<Item = P>) {
        self.points.extend(points);
    }

    /// Consume this builder, partitioning the points and generating a KDTree ready for queries.
    pub fn finish(self) -> Result<KDTree<P>> {
        let Self {
            mut points,
            num_items,
            max_leaf_size,
            epsilon,
        } = self;

        if max_leaf_size < 1 {
            return Err(KDTreeError::InvalidLeafSize(max_leaf_size));
        }
        if epsilon.is_nan() || epsilon < P::Num::zero() {
            return Err(KDTreeError::InvalidEpsilon);
        }
        if P::DIMENSIONS == 0 {
            return Err(KDTreeError::ZeroDimensions);
        }
        if points.len() != num_items {
            return Err(KDTreeError::ItemCountMismatch {
                expected: num_items,
                actual: points.len(),
            });
        }
        if points.len() > u32::MAX as usize {
            return Err(KDTreeError::TooManyItems(points.len()));
        }
        check_finite(&points)?;

        let mut indices: Vec<u32> = (0..points.len() as u32).collect();
        let bounds = Aabb::from_points(&points);

        let nodes = match &bounds {
            Some(bounds) => {
                let mut loader = BulkLoader {
                    points: &mut points,
                    indices: &mut indices,
                    nodes: Vec::with_capacity(2 * num_items / max_leaf_size + 1),
                    max_leaf_size,
                    epsilon,
                };
                let mut root_bounds = bounds.clone();
                loader.divide_tree(0, num_items, &mut root_bounds);
                loader.nodes
            }
            None => vec![],
        };

        assert!(
            !nodes.iter().any(|node| matches!(node, Node::Uninitialized)),
            "kd-tree construction left a node uninitialized"
        );

        log::debug!(
            "built kd-tree with {} items, {} nodes, max leaf size {}",
            num_items,
            nodes.len(),
            max_leaf_size
        );

        Ok(KDTree {
            metadata: KDTreeMetadata {
                num_items: num_items as u32,
                num_nodes: nodes.len(),
                max_leaf_size,
                epsilon,
            },
            nodes,
            points,
            indices,
            bounds,
        })
    }
}

fn check_finite<P: KDPoint>(points: &[P]) -> Result<()> {
    for (index, point) in points.iter().enumerate() {
        for axis in 0..P::DIMENSIONS {
            if !point.component(axis).is_finite() {
                return Err(KDTreeError::NonFiniteCoordinate { index, axis });
            }
        }
    }
    Ok(())
}

/// Recursive sliding-midpoint partitioning over co-indexed point and index slices.
struct BulkLoader<'a, P: KDPoint> {
    points: &'a mut [P],
    indices: &'a mut [u32],
    nodes: Vec<Node<P::Num>>,
    max_leaf_size: usize,
    epsilon: P::Num,
}

impl<P: KDPoint> BulkLoader<'_, P> {
    /// Build the subtree over `[left, right)` and return its position in the node array.
    ///
    /// On entry `bounds` is the (possibly clamped) box of the range; on return it is the exact
    /// box of the points in the range.
    fn divide_tree(&mut self, left: usize, right: usize, bounds: &mut Aabb<P::Num>) -> usize {
        let index = self.nodes.len();

        if right - left <= self.max_leaf_size {
            self.nodes.push(Node::Leaf {
                start: left,
                end: right,
            });

            *bounds = Aabb::from_point(&self.points[left]);
            for point in &self.points[left + 1..right] {
                bounds.extend(point);
            }
            return index;
        }

        let (idx, dimension, cut_value) = self.middle_split(left, right - left, bounds);
        log::trace!(
            "split [{left}, {right}) on dimension {dimension} at {cut_value:?}, left size {idx}"
        );

        // Reserve our slot so children are numbered after us
        self.nodes.push(Node::Uninitialized);

        let mut left_bounds = bounds.clone();
        left_bounds.set_max(dimension, cut_value);
        let child1 = self.divide_tree(left, left + idx, &mut left_bounds);

        let mut right_bounds = bounds.clone();
        right_bounds.set_min(dimension, cut_value);
        let child2 = self.divide_tree(left + idx, right, &mut right_bounds);

        self.nodes[index] = Node::Internal {
            child1,
            child2,
            dimension,
            gap_min: left_bounds.max(dimension),
            gap_max: right_bounds.min(dimension),
        };

        *bounds = left_bounds;
        bounds.union(&right_bounds);

        index
    }

    /// Choose the split dimension, cut value, and the number of points going to the first child.
    fn middle_split(
        &mut self,
        ind: usize,
        count: usize,
        bounds: &Aabb<P::Num>,
    ) -> (usize, usize, P::Num) {
        let threshold = (P::Num::one() - self.epsilon) * bounds.max_span();

        // Among the dimensions where the box is (nearly) widest, take the one with the largest
        // spread of actual values.
        let mut cut_feature = 0;
        let mut cut_range = None;
        let mut max_spread = -P::Num::one();
        for i in 0..P::DIMENSIONS {
            if bounds.span(i) >= threshold {
                let (min_elem, max_elem) = self.compute_min_max(ind, count, i);
                let spread = max_elem - min_elem;
                if spread > max_spread {
                    cut_feature = i;
                    cut_range = Some((min_elem, max_elem));
                    max_spread = spread;
                }
            }
        }
        let (min_elem, max_elem) =
            cut_range.unwrap_or_else(|| self.compute_min_max(ind, count, cut_feature));

        // Split in the middle of the box, but never outside the data
        let two = P::Num::one() + P::Num::one();
        let split_value = (bounds.min(cut_feature) + bounds.max(cut_feature)) / two;
        let cut_value = split_value.max(min_elem).min(max_elem);

        let (lim1, lim2) = self.plane_split(ind, count, cut_feature, cut_value);

        // If many points share the cut value, fall back to the middle to keep the tree balanced
        let half = count / 2;
        let index = if lim1 > half {
            lim1
        } else if lim2 < half {
            lim2
        } else {
            half
        };

        (index, cut_feature, cut_value)
    }

    /// Reorder `[ind, ind + count)` in two passes so that values `< cut_value` come first, then
    /// values `== cut_value`, then values `> cut_value`. Returns the two boundaries.
    fn plane_split(
        &mut self,
        ind: usize,
        count: usize,
        cut_feature: usize,
        cut_value: P::Num,
    ) -> (usize, usize) {
        let lim1 = self.partition(ind, 0, count, cut_feature, |v| v < cut_value);
        let lim2 = self.partition(ind, lim1, count, cut_feature, |v| v <= cut_value);
        (lim1, lim2)
    }

    /// Hoare-style partition of `[ind + lo, ind + hi)`: elements satisfying `goes_left` are moved
    /// to the front. Returns the offset (relative to `ind`) of the first remaining element.
    fn partition(
        &mut self,
        ind: usize,
        mut lo: usize,
        mut hi: usize,
        cut_feature: usize,
        goes_left: impl Fn(P::Num) -> bool,
    ) -> usize {
        loop {
            while lo < hi && goes_left(self.value(ind + lo, cut_feature)) {
                lo += 1;
            }
            while lo < hi && !goes_left(self.value(ind + hi - 1, cut_feature)) {
                hi -= 1;
            }
            if lo >= hi {
                return lo;
            }

            self.swap_item(ind + lo, ind + hi - 1);
            lo += 1;
            hi -= 1;
        }
    }

    fn compute_min_max(&self, ind: usize, count: usize, element: usize) -> (P::Num, P::Num) {
        let first = self.value(ind, element);
        self.points[ind + 1..ind + count]
            .iter()
            .fold((first, first), |(min_elem, max_elem), point| {
                let value = point.component(element);
                (min_elem.min(value), max_elem.max(value))
            })
    }

    #[inline]
    fn value(&self, i: usize, axis: usize) -> P::Num {
        self.points[i].component(axis)
    }

    #[inline]
    fn swap_item(&mut self, i: usize, j: usize) {
        self.points.swap(i, j);
        self.indices.swap(i, j);
    }
}
