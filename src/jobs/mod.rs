//! Job tracking, scheduling and the per-job reconciliation pipeline

pub mod job;
pub mod pipeline;
pub mod queue;
pub mod service;

pub use job::*;
pub use pipeline::*;
pub use queue::*;
pub use service::*;
