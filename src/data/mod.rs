//! Data module: connectivity storage
#![warn(missing_docs)]

pub mod nested;

pub use nested::{NestedSlice, NestedVector};
