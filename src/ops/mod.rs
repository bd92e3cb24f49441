//! High-level operations.

pub mod translate;

pub use translate::{translate, Declarations, TranslateOptions, TranslateOutcome};
