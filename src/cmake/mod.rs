//! Generated CMake script composition.
//!
//! - `script`: the sectioned buffer every rule appends to
//! - `quote`: quoting of literals and paths embedded in CMake code

pub mod quote;
pub mod script;

pub use quote::{quote_path, quote_string};
pub use script::{CMakeBuilder, Section};
