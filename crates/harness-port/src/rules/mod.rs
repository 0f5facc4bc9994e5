//! Ordered text rewrite rules: literal, pattern-capture, and anchored insertion.

pub mod apply;
pub mod default;
pub mod load;
pub mod types;

pub use apply::*;
pub use default::*;
pub use load::*;
pub use types::*;
