use thiserror::Error;

/// Enum with all errors in this crate.
///
/// These are all precondition failures detected when a tree is constructed. Queries against a
/// built tree never fail.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KDTreeError {
    #[error("Leaf size must be at least 1, got {0}.")]
    InvalidLeafSize(usize),

    #[error("Epsilon must be a non-negative number.")]
    InvalidEpsilon,

    #[error("Point type must have at least one dimension.")]
    ZeroDimensions,

    #[error("Cannot index {0} items; the maximum is u32::MAX.")]
    TooManyItems(usize),

    #[error("Added {actual} items when expected {expected}.")]
    ItemCountMismatch { expected: usize, actual: usize },

    #[error("Item {index} has a non-finite value on axis {axis}.")]
    NonFiniteCoordinate { index: usize, axis: usize },
}

pub type Result<T> = std::result::Result<T, KDTreeError>;
