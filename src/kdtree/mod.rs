//! An implementation of an immutable, bulk-loaded K-D Tree.
//!
//! The tree is built once with a sliding-midpoint split rule and answers radius and k-nearest
//! neighbor queries through one shared branch-and-bound search.

#![warn(missing_docs)]

mod builder;
mod index;
mod knn;
#[cfg(feature = "rayon")]
mod parallel;
mod search;
mod r#trait;
mod traversal;

pub use builder::{KDTreeBuilder, DEFAULT_KDTREE_LEAF_SIZE};
pub use index::{KDTree, KDTreeMetadata};
pub use knn::KNearest;
pub use r#trait::KDTreeIndex;
pub use search::SearchVisitor;
pub use traversal::{Split, TreeNode};
