#![doc = include_str!("../README.md")]

pub mod bounds;
mod error;
pub mod kdtree;
mod r#type;

pub use error::{KDTreeError, Result};
pub use r#type::{Coord, IndexableNum, KDPoint};

#[cfg(test)]
pub(crate) mod test;
