//! Depth-first branch-and-bound search shared by every query.

use std::ops::ControlFlow;

use num_traits::Zero;

use crate::bounds::DimVec;
use crate::kdtree::index::Node;
use crate::kdtree::KDTree;
use crate::r#type::KDPoint;

/// Receives candidates from [`KDTreeIndex::search`][crate::kdtree::KDTreeIndex::search].
///
/// The search only reports points strictly closer than [`worst_distance`][Self::worst_distance],
/// which is re-read before every comparison so it may shrink as candidates are accepted.
pub trait SearchVisitor<N> {
    /// The squared distance a candidate must beat to be reported.
    fn worst_distance(&self) -> N;

    /// Called for each point closer than the current worst distance.
    ///
    /// `slot` is a position in [`KDTreeIndex::points`][crate::kdtree::KDTreeIndex::points] and
    /// [`KDTreeIndex::indices`][crate::kdtree::KDTreeIndex::indices]. Return
    /// [`ControlFlow::Break`] to stop the whole search.
    fn visit(&mut self, slot: usize, distance_squared: N) -> ControlFlow<()>;
}

/// A visitor with a fixed squared radius that forwards strictly closer points to a closure.
pub(crate) struct RadiusVisitor<N, F> {
    pub(crate) radius_squared: N,
    pub(crate) callback: F,
}

impl<N, F> SearchVisitor<N> for RadiusVisitor<N, F>
where
    N: PartialOrd + Copy,
    F: FnMut(usize, N) -> ControlFlow<()>,
{
    #[inline]
    fn worst_distance(&self) -> N {
        self.radius_squared
    }

    #[inline]
    fn visit(&mut self, slot: usize, distance_squared: N) -> ControlFlow<()> {
        // Points exactly on the radius are excluded
        if distance_squared < self.radius_squared {
            (self.callback)(slot, distance_squared)
        } else {
            ControlFlow::Continue(())
        }
    }
}

/// Tracks the single closest candidate.
pub(crate) struct NearestOneVisitor<N> {
    pub(crate) best: Option<(usize, N)>,
    pub(crate) worst: N,
}

impl<N: PartialOrd + Copy> SearchVisitor<N> for NearestOneVisitor<N> {
    #[inline]
    fn worst_distance(&self) -> N {
        self.worst
    }

    #[inline]
    fn visit(&mut self, slot: usize, distance_squared: N) -> ControlFlow<()> {
        self.best = Some((slot, distance_squared));
        self.worst = distance_squared;
        ControlFlow::Continue(())
    }
}

/// State for one traversal. The distance vector is shared across sibling recursions and every
/// mutation is undone before the mutating call returns.
struct Search<'a, P: KDPoint, V> {
    nodes: &'a [Node<P::Num>],
    points: &'a [P],
    query: &'a P,
    error_factor: P::Num,
    distance_vector: DimVec<P::Num>,
    visitor: &'a mut V,
}

impl<P: KDPoint, V: SearchVisitor<P::Num>> Search<'_, P, V> {
    fn search_level(&mut self, node_index: usize, min_distance_squared: P::Num) -> ControlFlow<()> {
        match self.nodes[node_index] {
            Node::Leaf { start, end } => {
                for slot in start..end {
                    let dist = self.query.distance_squared(&self.points[slot]);
                    if dist < self.visitor.worst_distance() {
                        self.visitor.visit(slot, dist)?;
                    }
                }
                ControlFlow::Continue(())
            }
            Node::Internal {
                child1,
                child2,
                dimension,
                gap_min,
                gap_max,
            } => {
                // Which branch to take first?
                let val = self.query.component(dimension);
                let diff1 = val - gap_min;
                let diff2 = val - gap_max;
                let (best_child, other_child, cut_dist) = if diff1 + diff2 < P::Num::zero() {
                    (child1, child2, diff2 * diff2)
                } else {
                    (child2, child1, diff1 * diff1)
                };

                self.search_level(best_child, min_distance_squared)?;

                // Replace this dimension's contribution with the distance to the far side
                let previous = self.distance_vector[dimension];
                let far_distance_squared = min_distance_squared + cut_dist - previous;
                if far_distance_squared * self.error_factor <= self.visitor.worst_distance() {
                    self.distance_vector[dimension] = cut_dist;
                    let flow = self.search_level(other_child, far_distance_squared);
                    self.distance_vector[dimension] = previous;
                    flow?;
                }
                ControlFlow::Continue(())
            }
            Node::Uninitialized => {
                unreachable!("uninitialized node {node_index} reached during search")
            }
        }
    }
}

impl<P: KDPoint> KDTree<P> {
    /// Run one branch-and-bound traversal from the root.
    ///
    /// Subtrees whose lower-bound distance times `error_factor` exceeds the visitor's worst
    /// distance are skipped. A factor of at most 1 gives exact results.
    pub(crate) fn search_tree<V: SearchVisitor<P::Num>>(
        &self,
        query: &P,
        error_factor: P::Num,
        visitor: &mut V,
    ) -> ControlFlow<()> {
        let Some(bounds) = &self.bounds else {
            return ControlFlow::Continue(());
        };

        let (min_distance_squared, distance_vector) = bounds.distance_vector(query);
        let mut search = Search {
            nodes: &self.nodes,
            points: &self.points,
            query,
            error_factor,
            distance_vector,
            visitor,
        };
        search.search_level(0, min_distance_squared)
    }
}

#[cfg(test)]
mod test {
    use std::ops::ControlFlow;

    use super::SearchVisitor;
    use crate::kdtree::{KDTree, KDTreeIndex};

    /// Collects every visited slot, without ever shrinking the bound.
    struct Collect {
        slots: Vec<usize>,
        stop_after: usize,
    }

    impl SearchVisitor<f64> for Collect {
        fn worst_distance(&self) -> f64 {
            f64::INFINITY
        }

        fn visit(&mut self, slot: usize, _distance_squared: f64) -> ControlFlow<()> {
            self.slots.push(slot);
            if self.slots.len() == self.stop_after {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        }
    }

    fn grid() -> KDTree<[f64; 2]> {
        let points = (0..100)
            .map(|i| [(i % 10) as f64, (i / 10) as f64])
            .collect();
        KDTree::try_with_leaf_size(points, 4).unwrap()
    }

    #[test]
    fn unbounded_search_visits_every_point_once() {
        let tree = grid();
        let mut visitor = Collect {
            slots: vec![],
            stop_after: usize::MAX,
        };
        let flow = tree.search(&[3.3, 7.1], &mut visitor);
        assert_eq!(flow, ControlFlow::Continue(()));

        visitor.slots.sort();
        assert_eq!(visitor.slots, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn break_stops_the_whole_traversal() {
        let tree = grid();
        for stop_after in [1, 3, 5, 17] {
            let mut visitor = Collect {
                slots: vec![],
                stop_after,
            };
            let flow = tree.search(&[5.0, 5.0], &mut visitor);
            assert_eq!(flow, ControlFlow::Break(()));
            assert_eq!(visitor.slots.len(), stop_after);
        }
    }

    #[test]
    fn first_visited_leaf_contains_nearest_region() {
        let tree = grid();
        let mut visitor = Collect {
            slots: vec![],
            stop_after: 1,
        };
        let _ = tree.search(&[0.0, 0.0], &mut visitor);
        let first = tree.points()[visitor.slots[0]];
        assert!(first[0] <= 2.0 && first[1] <= 2.0, "got {first:?}");
    }

    #[test]
    fn empty_tree_never_visits() {
        let tree = KDTree::<[f64; 2]>::try_with_leaf_size(vec![], 4).unwrap();
        let mut visitor = Collect {
            slots: vec![],
            stop_after: 1,
        };
        assert_eq!(
            tree.search(&[0.0, 0.0], &mut visitor),
            ControlFlow::Continue(())
        );
        assert!(visitor.slots.is_empty());
    }
}
