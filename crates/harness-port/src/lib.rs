//! Convert Claude Code command and agent documents into Gemini CLI artifacts.
//!
//! The core path is [`parser`] → [`rules`] → [`writer`], driven one document
//! at a time by [`pipeline`]. [`sync`] and [`context`] are the collaborators
//! that fetch the source repository and build the aggregated persona file.

pub mod config;
pub mod context;
pub mod error;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod rules;
pub mod sync;
pub mod writer;

pub use error::{PortError, Result};
pub use pipeline::{BatchReport, Settings, run};
