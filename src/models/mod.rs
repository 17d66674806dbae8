// Core data models for timetrack
// These structs represent the domain entities

pub mod entry;
pub mod task;
pub mod registry;

pub use entry::*;
pub use task::*;
pub use registry::*;
