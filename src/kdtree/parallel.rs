//! Batch queries spread over the rayon thread pool.
//!
//! The tree is immutable, so any number of queries can run against it at once. Each worker owns
//! its own [`KNearest`] scratch buffer.

use rayon::prelude::*;

use crate::kdtree::{KDTree, KDTreeIndex, KNearest};
use crate::r#type::KDPoint;

impl<P> KDTree<P>
where
    P: KDPoint + Send + Sync,
{
    /// Find the `k` nearest items for every query, in parallel.
    pub fn par_nearest(&self, queries: &[P], k: usize) -> Vec<KNearest<P>> {
        queries.par_iter().map(|query| self.nearest(query, k)).collect()
    }

    /// Find the insertion indices of the `k` nearest items for every query, in parallel,
    /// reusing one accumulator per worker.
    pub fn par_nearest_indices(&self, queries: &[P], k: usize) -> Vec<Vec<u32>> {
        queries
            .par_iter()
            .map_init(
                || KNearest::new(k),
                |scratch, query| {
                    self.nearest_into(query, scratch);
                    scratch.indices().to_vec()
                },
            )
            .collect()
    }

    /// Find the insertion indices of the items strictly within `radius` of every query, in
    /// parallel.
    pub fn par_within(&self, queries: &[P], radius: P::Num) -> Vec<Vec<u32>> {
        queries
            .par_iter()
            .map(|query| {
                self.within(query, radius)
                    .into_iter()
                    .map(|(index, _)| index)
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use crate::kdtree::{KDTree, KDTreeIndex};
    use crate::test::random_points;

    #[test]
    fn parallel_matches_sequential() {
        let points = random_points::<3>(500, 7);
        let queries = random_points::<3>(64, 8);
        let tree = KDTree::try_with_leaf_size(points, 8).unwrap();

        let parallel = tree.par_nearest(&queries, 5);
        let reused = tree.par_nearest_indices(&queries, 5);
        let within = tree.par_within(&queries, 0.2);
        for (i, query) in queries.iter().enumerate() {
            let sequential = tree.nearest(query, 5);
            assert_eq!(parallel[i], sequential);
            assert_eq!(reused[i], sequential.indices());

            let expected: Vec<u32> = tree.within(query, 0.2).into_iter().map(|(i, _)| i).collect();
            assert_eq!(within[i], expected);
        }
    }
}
