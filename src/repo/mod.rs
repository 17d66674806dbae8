pub mod kv;
pub mod registry;

pub use kv::*;
pub use registry::*;
