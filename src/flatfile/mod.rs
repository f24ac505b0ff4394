//! Flat-file collaborators: CSV record source and CSV report sink

pub mod sink;
pub mod source;

pub use sink::*;
pub use source::*;
