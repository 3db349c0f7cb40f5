use std::ops::ControlFlow;

use num_traits::{Float, One};

use crate::kdtree::search::SearchVisitor;
use crate::r#type::KDPoint;

/// A reusable buffer of the `k` nearest neighbors of a query.
///
/// Results are sorted by ascending squared distance. Reusing one `KNearest` across many queries
/// via [`KDTreeIndex::nearest_into`][crate::kdtree::KDTreeIndex::nearest_into] avoids an
/// allocation per query. A `KNearest` holds mutable scratch state, so each concurrent caller
/// needs its own.
///
/// Among candidates at equal distance, the one reached first by the traversal is kept: a new
/// candidate is placed after every existing entry that is not farther, and a candidate exactly
/// at the current worst distance of a full buffer is not accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct KNearest<P: KDPoint> {
    k: usize,
    error_factor: P::Num,
    count: usize,
    indices: Vec<u32>,
    points: Vec<P>,
    distances_squared: Vec<P::Num>,
}

impl<P: KDPoint> KNearest<P> {
    /// Create an empty accumulator for exact `k`-nearest-neighbor queries.
    pub fn new(k: usize) -> Self {
        Self::with_error_factor(k, P::Num::one())
    }

    /// Create an empty accumulator for approximate queries.
    ///
    /// A subtree is skipped when its lower-bound distance times `error_factor` exceeds the
    /// current k-th distance, so factors above 1 trade accuracy for speed.
    ///
    /// Nothing is allocated until the first search, and then only as many slots as the searched
    /// tree has points.
    ///
    /// # Panics
    ///
    /// Panics if `error_factor` is NaN.
    pub fn with_error_factor(k: usize, error_factor: P::Num) -> Self {
        assert!(!error_factor.is_nan(), "error factor must not be NaN");
        Self {
            k,
            error_factor,
            count: 0,
            indices: vec![],
            points: vec![],
            distances_squared: vec![],
        }
    }

    /// The maximum number of neighbors this accumulator holds.
    pub fn k(&self) -> usize {
        self.k
    }

    /// The error factor used when searching.
    pub fn error_factor(&self) -> P::Num {
        self.error_factor
    }

    /// Original insertion indices of the neighbors, nearest first.
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// The neighbor points, nearest first.
    pub fn points(&self) -> &[P] {
        &self.points
    }

    /// Squared distances of the neighbors, ascending.
    pub fn distances_squared(&self) -> &[P::Num] {
        &self.distances_squared
    }

    /// The number of neighbors found.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Whether no neighbors were found.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Iterate over `(index, point, distance_squared)`, nearest first.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &P, P::Num)> + '_ {
        self.indices
            .iter()
            .zip(&self.points)
            .zip(&self.distances_squared)
            .map(|((index, point), dist)| (*index, point, *dist))
    }

    /// Clear any previous results, keeping the allocated capacity.
    pub fn reset(&mut self) {
        self.count = 0;
        self.indices.clear();
        self.points.clear();
        self.distances_squared.clear();
    }

    /// Reset and fill the buffers with one unconstrained slot per neighbor that a tree of
    /// `num_items` points can return.
    ///
    /// The returned visitor is the only way to feed candidates into the buffers.
    pub(crate) fn prepare(&mut self, num_items: usize) -> KNearestVisitor<'_, P> {
        self.reset();
        let capacity = self.k.min(num_items);
        self.distances_squared.resize(capacity, P::Num::infinity());
        self.indices.resize(capacity, 0);
        KNearestVisitor { result: self }
    }

    /// Drop unused slots and map tree slots back to insertion indices and points.
    pub(crate) fn finish(&mut self, tree_points: &[P], tree_indices: &[u32]) {
        self.distances_squared.truncate(self.count);
        self.indices.truncate(self.count);

        for index in self.indices.iter_mut() {
            let slot = *index as usize;
            self.points.push(tree_points[slot].clone());
            *index = tree_indices[slot];
        }
    }
}

/// Sorted insertion into a [`KNearest`] whose slots were set up by [`KNearest::prepare`].
pub(crate) struct KNearestVisitor<'a, P: KDPoint> {
    result: &'a mut KNearest<P>,
}

impl<P: KDPoint> KNearestVisitor<'_, P> {
    /// The number of neighbors the prepared buffer can hold.
    pub(crate) fn capacity(&self) -> usize {
        self.result.distances_squared.len()
    }
}

impl<P: KDPoint> SearchVisitor<P::Num> for KNearestVisitor<'_, P> {
    #[inline]
    fn worst_distance(&self) -> P::Num {
        self.result
            .distances_squared
            .last()
            .copied()
            .unwrap_or_else(P::Num::neg_infinity)
    }

    fn visit(&mut self, slot: usize, distance_squared: P::Num) -> ControlFlow<()> {
        let capacity = self.capacity();
        let result = &mut *self.result;

        // Slide everything farther than the candidate one slot towards the end. The last slot
        // falls off when the buffer is full.
        let mut i = result.count;
        while i > 0 && result.distances_squared[i - 1] > distance_squared {
            if i < capacity {
                result.distances_squared[i] = result.distances_squared[i - 1];
                result.indices[i] = result.indices[i - 1];
            }
            i -= 1;
        }

        if i < capacity {
            result.distances_squared[i] = distance_squared;
            // Slots fit in u32 because the tree holds at most u32::MAX points
            result.indices[i] = slot as u32;
        }

        if result.count < capacity {
            result.count += 1;
        }

        ControlFlow::Continue(())
    }
}

#[cfg(test)]
mod test {
    use std::ops::ControlFlow;

    use super::{KNearest, KNearestVisitor};
    use crate::kdtree::search::SearchVisitor;

    fn offer(visitor: &mut KNearestVisitor<'_, [f64; 1]>, slot: usize, dist: f64) {
        if dist < visitor.worst_distance() {
            assert_eq!(visitor.visit(slot, dist), ControlFlow::Continue(()));
        }
    }

    #[test]
    fn keeps_sorted_and_bounded() {
        let mut knn = KNearest::<[f64; 1]>::new(3);
        let mut visitor = knn.prepare(6);
        assert_eq!(visitor.worst_distance(), f64::INFINITY);

        for (slot, dist) in [(0, 5.0), (1, 1.0), (2, 3.0), (3, 4.0), (4, 0.5), (5, 9.0)] {
            offer(&mut visitor, slot, dist);
        }
        assert_eq!(visitor.worst_distance(), 3.0);

        let points: Vec<[f64; 1]> = (0..6).map(|i| [i as f64]).collect();
        let indices: Vec<u32> = vec![10, 11, 12, 13, 14, 15];
        knn.finish(&points, &indices);

        assert_eq!(knn.distances_squared(), &[0.5, 1.0, 3.0]);
        assert_eq!(knn.indices(), &[14, 11, 12]);
        assert_eq!(knn.points(), &[[4.0], [1.0], [2.0]]);
    }

    #[test]
    fn equal_distances_keep_arrival_order() {
        let mut knn = KNearest::<[f64; 1]>::new(3);
        let mut visitor = knn.prepare(4);
        offer(&mut visitor, 0, 2.0);
        offer(&mut visitor, 1, 1.0);
        offer(&mut visitor, 2, 2.0);
        // Full buffer: an equal distance to the worst is not accepted
        offer(&mut visitor, 3, 2.0);

        let points: Vec<[f64; 1]> = (0..4).map(|i| [i as f64]).collect();
        knn.finish(&points, &[0, 1, 2, 3]);
        assert_eq!(knn.indices(), &[1, 0, 2]);
    }

    #[test]
    fn trims_when_fewer_candidates_than_k() {
        let mut knn = KNearest::<[f64; 1]>::new(5);
        let mut visitor = knn.prepare(5);
        offer(&mut visitor, 1, 4.0);
        offer(&mut visitor, 0, 1.0);
        knn.finish(&[[0.0], [1.0]], &[7, 8]);

        assert_eq!(knn.len(), 2);
        assert_eq!(knn.indices(), &[7, 8]);
        let collected: Vec<_> = knn.iter().collect();
        assert_eq!(collected, vec![(7, &[0.0], 1.0), (8, &[1.0], 4.0)]);
    }

    #[test]
    fn slots_are_capped_by_tree_size() {
        let mut knn = KNearest::<[f64; 1]>::new(usize::MAX);
        assert_eq!(knn.distances_squared.capacity(), 0);

        let mut visitor = knn.prepare(2);
        assert_eq!(visitor.capacity(), 2);
        offer(&mut visitor, 0, 3.0);
        offer(&mut visitor, 1, 1.0);
        assert_eq!(visitor.worst_distance(), 3.0);

        knn.finish(&[[0.0], [1.0]], &[4, 5]);
        assert_eq!(knn.indices(), &[5, 4]);
    }

    #[test]
    fn reset_keeps_capacity() {
        let mut knn = KNearest::<[f64; 1]>::new(4);
        let mut visitor = knn.prepare(10);
        offer(&mut visitor, 0, 1.0);
        knn.finish(&[[0.0]], &[0]);
        assert!(!knn.is_empty());

        knn.reset();
        assert!(knn.is_empty());
        assert!(knn.distances_squared.capacity() >= 4);
    }

    #[test]
    fn zero_capacity_accepts_nothing() {
        let mut knn = KNearest::<[f64; 1]>::new(0);
        let visitor = knn.prepare(10);
        assert_eq!(visitor.worst_distance(), f64::NEG_INFINITY);

        let mut knn = KNearest::<[f64; 1]>::new(3);
        let visitor = knn.prepare(0);
        assert_eq!(visitor.worst_distance(), f64::NEG_INFINITY);
    }

    #[test]
    #[should_panic(expected = "error factor must not be NaN")]
    fn nan_error_factor_is_rejected() {
        KNearest::<[f64; 1]>::with_error_factor(3, f64::NAN);
    }
}
