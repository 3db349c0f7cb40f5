use std::fmt::Debug;

use geo_traits::CoordTrait;
use num_traits::{Float, NumCast, Zero};

/// A trait for the scalar types that can be used for indexed coordinates.
///
/// This trait is sealed and cannot be implemented for external types. The tree relies on IEEE
/// semantics (infinity as the initial worst distance, halving for midpoints), so only `f32` and
/// `f64` are supported.
pub trait IndexableNum:
    private::Sealed + Float + NumCast + Debug + Default + Send + Sync + 'static
{
    /// The default tolerance used when choosing a split dimension.
    const DEFAULT_EPSILON: Self;
}

impl IndexableNum for f32 {
    const DEFAULT_EPSILON: Self = 1e-5;
}

impl IndexableNum for f64 {
    const DEFAULT_EPSILON: Self = 1e-5;
}

/// A point with a fixed number of dimensions that can be stored in a
/// [`KDTree`][crate::kdtree::KDTree].
///
/// Implementations must behave as immutable values: `component` must return the same value for
/// the lifetime of the point.
///
/// ```
/// use static_kdtree::KDPoint;
///
/// let a = [0.0f64, 0.0, 0.0];
/// let b = [1.0f64, 2.0, 2.0];
/// assert_eq!(<[f64; 3] as KDPoint>::DIMENSIONS, 3);
/// assert_eq!(a.distance_squared(&b), 9.0);
/// ```
pub trait KDPoint: Clone {
    /// The scalar type of each component.
    type Num: IndexableNum;

    /// The number of dimensions of this point type.
    const DIMENSIONS: usize;

    /// The value of this point on the given axis.
    ///
    /// `axis` is always in `0..Self::DIMENSIONS`.
    fn component(&self, axis: usize) -> Self::Num;

    /// The squared Euclidean distance between this point and `other`.
    #[inline]
    fn distance_squared(&self, other: &Self) -> Self::Num {
        let mut sum = Self::Num::zero();
        for axis in 0..Self::DIMENSIONS {
            let d = self.component(axis) - other.component(axis);
            sum = sum + d * d;
        }
        sum
    }
}

impl<N: IndexableNum, const D: usize> KDPoint for [N; D] {
    type Num = N;
    const DIMENSIONS: usize = D;

    #[inline]
    fn component(&self, axis: usize) -> N {
        self[axis]
    }
}

impl<N: IndexableNum> KDPoint for (N, N) {
    type Num = N;
    const DIMENSIONS: usize = 2;

    #[inline]
    fn component(&self, axis: usize) -> N {
        match axis {
            0 => self.0,
            1 => self.1,
            _ => panic!("Invalid axis {axis} for a 2D point"),
        }
    }
}

/// A single 2D coordinate.
///
/// This bridges the tree to the geo ecosystem: anything implementing [`CoordTrait`] can be
/// converted with [`Coord::from_coord`], and `Coord` itself implements [`CoordTrait`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Coord<N: IndexableNum> {
    /// The x value
    pub x: N,
    /// The y value
    pub y: N,
}

impl<N: IndexableNum> Coord<N> {
    /// Create a new coordinate.
    pub fn new(x: N, y: N) -> Self {
        Self { x, y }
    }

    /// Copy the x and y values out of any coordinate implementing [`CoordTrait`].
    pub fn from_coord(coord: &impl CoordTrait<T = N>) -> Self {
        Self {
            x: coord.x(),
            y: coord.y(),
        }
    }
}

impl<N: IndexableNum> CoordTrait for Coord<N> {
    type T = N;

    fn dim(&self) -> geo_traits::Dimensions {
        geo_traits::Dimensions::Xy
    }

    fn x(&self) -> Self::T {
        self.x
    }

    fn y(&self) -> Self::T {
        self.y
    }

    fn nth_or_panic(&self, n: usize) -> Self::T {
        match n {
            0 => self.x,
            1 => self.y,
            _ => panic!("Invalid index of coord"),
        }
    }
}

impl<N: IndexableNum> KDPoint for Coord<N> {
    type Num = N;
    const DIMENSIONS: usize = 2;

    #[inline]
    fn component(&self, axis: usize) -> N {
        self.nth_or_panic(axis)
    }

    #[inline]
    fn distance_squared(&self, other: &Self) -> N {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

// https://rust-lang.github.io/api-guidelines/future-proofing.html#sealed-traits-protect-against-downstream-implementations-c-sealed
mod private {
    pub trait Sealed {}

    impl Sealed for f32 {}
    impl Sealed for f64 {}
}
