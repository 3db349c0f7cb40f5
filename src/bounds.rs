//! Axis-aligned bounding boxes over the component space of a [`KDPoint`].

use num_traits::{Float, Zero};
use tinyvec::TinyVec;

use crate::r#type::{IndexableNum, KDPoint};

/// Per-dimension scalar storage. Up to four dimensions live inline without a heap allocation.
pub(crate) type DimVec<N> = TinyVec<[N; 4]>;

/// An axis-aligned bounding box: a `[min, max]` envelope on every dimension.
///
/// Once at least one point has been incorporated, `min(axis) <= max(axis)` on every axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Aabb<N: IndexableNum> {
    min: DimVec<N>,
    max: DimVec<N>,
}

impl<N: IndexableNum> Aabb<N> {
    /// A degenerate box containing only `point`.
    pub fn from_point<P: KDPoint<Num = N>>(point: &P) -> Self {
        let min: DimVec<N> = (0..P::DIMENSIONS).map(|i| point.component(i)).collect();
        Self {
            max: min.clone(),
            min,
        }
    }

    /// The smallest box containing every point of a non-empty slice.
    ///
    /// Returns `None` when `points` is empty.
    pub fn from_points<P: KDPoint<Num = N>>(points: &[P]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut bounds = Self::from_point(first);
        for point in rest {
            bounds.extend(point);
        }
        Some(bounds)
    }

    /// Grow this box to include `point`.
    #[inline]
    pub fn extend<P: KDPoint<Num = N>>(&mut self, point: &P) {
        for i in 0..self.dimensions() {
            let value = point.component(i);
            if value < self.min[i] {
                self.min[i] = value;
            }
            if value > self.max[i] {
                self.max[i] = value;
            }
        }
    }

    /// Grow this box to include all of `other`.
    pub fn union(&mut self, other: &Self) {
        for i in 0..self.dimensions() {
            if other.min[i] < self.min[i] {
                self.min[i] = other.min[i];
            }
            if other.max[i] > self.max[i] {
                self.max[i] = other.max[i];
            }
        }
    }

    /// The number of dimensions of this box.
    #[inline]
    pub fn dimensions(&self) -> usize {
        self.min.len()
    }

    /// The lower bound on `axis`.
    #[inline]
    pub fn min(&self, axis: usize) -> N {
        self.min[axis]
    }

    /// The upper bound on `axis`.
    #[inline]
    pub fn max(&self, axis: usize) -> N {
        self.max[axis]
    }

    #[inline]
    pub(crate) fn set_min(&mut self, axis: usize, value: N) {
        self.min[axis] = value;
    }

    #[inline]
    pub(crate) fn set_max(&mut self, axis: usize, value: N) {
        self.max[axis] = value;
    }

    /// `max(axis) - min(axis)`
    #[inline]
    pub fn span(&self, axis: usize) -> N {
        self.max[axis] - self.min[axis]
    }

    /// The largest span over all dimensions.
    pub fn max_span(&self) -> N {
        (1..self.dimensions()).fold(self.span(0), |acc, i| acc.max(self.span(i)))
    }

    /// Whether `point` lies inside this box (boundaries included).
    pub fn contains<P: KDPoint<Num = N>>(&self, point: &P) -> bool {
        (0..self.dimensions()).all(|i| {
            let value = point.component(i);
            value >= self.min[i] && value <= self.max[i]
        })
    }

    /// The squared distance from `point` to the nearest face of this box, together with the
    /// per-dimension contributions that make up that sum.
    ///
    /// Dimensions on which the point lies within `[min, max]` contribute zero.
    pub(crate) fn distance_vector<P: KDPoint<Num = N>>(&self, point: &P) -> (N, DimVec<N>) {
        let mut total = N::zero();
        let mut vector: DimVec<N> = (0..self.dimensions()).map(|_| N::zero()).collect();
        for (i, slot) in vector.iter_mut().enumerate() {
            let value = point.component(i);
            let d = if value < self.min[i] {
                self.min[i] - value
            } else if value > self.max[i] {
                value - self.max[i]
            } else {
                continue;
            };
            *slot = d * d;
            total = total + *slot;
        }
        (total, vector)
    }

    /// The squared distance from `point` to the nearest point of this box.
    pub fn min_distance_squared<P: KDPoint<Num = N>>(&self, point: &P) -> N {
        self.distance_vector(point).0
    }
}

#[cfg(test)]
mod test {
    use super::Aabb;

    #[test]
    fn extends_to_cover_points() {
        let bounds = Aabb::from_points(&[[1.0f64, 5.0], [-2.0, 3.0], [4.0, 4.0]]).unwrap();
        assert_eq!(bounds.min(0), -2.0);
        assert_eq!(bounds.max(0), 4.0);
        assert_eq!(bounds.min(1), 3.0);
        assert_eq!(bounds.max(1), 5.0);
        assert_eq!(bounds.max_span(), 6.0);
        assert!(bounds.contains(&[0.0, 4.5]));
        assert!(!bounds.contains(&[0.0, 5.5]));
    }

    #[test]
    fn empty_slice_has_no_bounds() {
        let points: Vec<[f32; 3]> = vec![];
        assert!(Aabb::from_points(&points).is_none());
    }

    #[test]
    fn single_point_has_zero_span() {
        let bounds = Aabb::from_point(&[3.0f32, 3.0, 3.0]);
        assert_eq!(bounds.max_span(), 0.0);
        assert_eq!(bounds.dimensions(), 3);
    }

    #[test]
    fn union_covers_both() {
        let mut a = Aabb::from_point(&[0.0f64, 0.0]);
        let b = Aabb::from_points(&[[2.0f64, -1.0], [3.0, 1.0]]).unwrap();
        a.union(&b);
        assert_eq!((a.min(0), a.max(0)), (0.0, 3.0));
        assert_eq!((a.min(1), a.max(1)), (-1.0, 1.0));
    }

    #[test]
    fn distance_vector_counts_outside_axes_only() {
        let bounds = Aabb::from_points(&[[0.0f64, 0.0, 0.0], [1.0, 1.0, 1.0]]).unwrap();
        let (total, vector) = bounds.distance_vector(&[3.0, 0.5, -1.0]);
        assert_eq!(vector.as_slice(), &[4.0, 0.0, 1.0]);
        assert_eq!(total, 5.0);
        assert_eq!(bounds.min_distance_squared(&[0.5, 0.5, 0.5]), 0.0);
    }
}
