//! Document domain types: source documents, metadata, artifacts, naming.

pub mod naming;
pub mod types;

pub use naming::*;
pub use types::*;
