use std::ops::ControlFlow;

use geo_traits::CoordTrait;
use num_traits::{Float, One};

use crate::kdtree::index::KDTreeMetadata;
use crate::kdtree::knn::KNearest;
use crate::kdtree::search::{NearestOneVisitor, RadiusVisitor, SearchVisitor};
use crate::kdtree::KDTree;
use crate::r#type::{Coord, IndexableNum, KDPoint};

/// A trait for searching and accessing data out of a KDTree.
pub trait KDTreeIndex<P: KDPoint>: Sized {
    /// The points of this tree, reordered so that every leaf covers a contiguous range.
    fn points(&self) -> &[P];

    /// The original insertion index of each entry in [`points`][Self::points].
    fn indices(&self) -> &[u32];

    /// Access the metadata describing this KDTree
    fn metadata(&self) -> &KDTreeMetadata<P::Num>;

    /// The number of items in this KDTree
    fn num_items(&self) -> u32 {
        self.metadata().num_items()
    }

    /// The maximum leaf size of this KDTree
    fn max_leaf_size(&self) -> usize {
        self.metadata().max_leaf_size()
    }

    /// Run a branch-and-bound search with an explicit error factor.
    ///
    /// Points strictly closer than `visitor.worst_distance()` are passed to the visitor, which
    /// may tighten its worst distance as it goes. A subtree is skipped when its lower-bound
    /// squared distance times `error_factor` exceeds the worst distance: factors up to 1 are
    /// exact, larger factors give approximate results faster.
    ///
    /// Returns [`ControlFlow::Break`] if the visitor stopped the search.
    fn search_with_error<V: SearchVisitor<P::Num>>(
        &self,
        query: &P,
        error_factor: P::Num,
        visitor: &mut V,
    ) -> ControlFlow<()>;

    /// Run an exact branch-and-bound search. See [`search_with_error`][Self::search_with_error].
    fn search<V: SearchVisitor<P::Num>>(&self, query: &P, visitor: &mut V) -> ControlFlow<()> {
        self.search_with_error(query, P::Num::one(), visitor)
    }

    /// Search the index for items strictly within a given radius.
    ///
    /// - query: the query point
    /// - radius: radius
    ///
    /// Returns the insertion index and point of each found item, in traversal order. Points at
    /// exactly `radius` are not included.
    fn within(&self, query: &P, radius: P::Num) -> Vec<(u32, &P)> {
        let points = self.points();
        let indices = self.indices();
        let mut result = vec![];
        let _ = self.search(
            query,
            &mut RadiusVisitor {
                radius_squared: radius * radius,
                callback: |slot: usize, _dist: P::Num| {
                    result.push((indices[slot], &points[slot]));
                    ControlFlow::Continue(())
                },
            },
        );
        result
    }

    /// Search the index for items strictly within a given radius, passing each one to
    /// `callback` instead of collecting them.
    ///
    /// Return [`ControlFlow::Break`] from the callback to end the search early; this method then
    /// returns `Break` as well.
    fn within_with<F>(&self, query: &P, radius: P::Num, mut callback: F) -> ControlFlow<()>
    where
        F: FnMut(u32, &P) -> ControlFlow<()>,
    {
        let points = self.points();
        let indices = self.indices();
        self.search(
            query,
            &mut RadiusVisitor {
                radius_squared: radius * radius,
                callback: |slot: usize, _dist: P::Num| callback(indices[slot], &points[slot]),
            },
        )
    }

    /// Count the items strictly within a given radius.
    fn within_count(&self, query: &P, radius: P::Num) -> usize {
        let mut count = 0;
        let _ = self.within_with(query, radius, |_, _| {
            count += 1;
            ControlFlow::Continue(())
        });
        count
    }

    /// Find the `k` nearest items, sorted by ascending distance.
    ///
    /// Fewer than `k` items are returned only if the tree holds fewer than `k` points.
    fn nearest(&self, query: &P, k: usize) -> KNearest<P> {
        let mut result = KNearest::new(k);
        self.nearest_into(query, &mut result);
        result
    }

    /// Find the nearest items into a reusable accumulator, which is reset first. The number of
    /// neighbors and the error factor come from `result`.
    fn nearest_into(&self, query: &P, result: &mut KNearest<P>) {
        let error_factor = result.error_factor();
        let mut visitor = result.prepare(self.points().len());
        if visitor.capacity() > 0 {
            let _ = self.search_with_error(query, error_factor, &mut visitor);
        }
        result.finish(self.points(), self.indices());
    }

    /// Find the single nearest item, returning its insertion index, point, and squared distance.
    fn nearest_one(&self, query: &P) -> Option<(u32, &P, P::Num)> {
        let mut visitor = NearestOneVisitor {
            best: None,
            worst: P::Num::infinity(),
        };
        let _ = self.search(query, &mut visitor);
        visitor
            .best
            .map(|(slot, dist)| (self.indices()[slot], &self.points()[slot], dist))
    }
}

impl<P: KDPoint> KDTreeIndex<P> for KDTree<P> {
    fn points(&self) -> &[P] {
        &self.points
    }

    fn indices(&self) -> &[u32] {
        &self.indices
    }

    fn metadata(&self) -> &KDTreeMetadata<P::Num> {
        &self.metadata
    }

    fn search_with_error<V: SearchVisitor<P::Num>>(
        &self,
        query: &P,
        error_factor: P::Num,
        visitor: &mut V,
    ) -> ControlFlow<()> {
        self.search_tree(query, error_factor, visitor)
    }
}

impl<N: IndexableNum> KDTree<Coord<N>> {
    /// Search the index for items strictly within a given radius of any geo coordinate.
    pub fn within_coord(&self, coord: &impl CoordTrait<T = N>, radius: N) -> Vec<u32> {
        self.within(&Coord::from_coord(coord), radius)
            .into_iter()
            .map(|(index, _)| index)
            .collect()
    }

    /// Find the `k` nearest items to any geo coordinate.
    pub fn nearest_coord(&self, coord: &impl CoordTrait<T = N>, k: usize) -> KNearest<Coord<N>> {
        self.nearest(&Coord::from_coord(coord), k)
    }
}
