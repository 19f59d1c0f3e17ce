//! Crate includes reusable utils for the processes that drive the bridge, such as initializing the
//! tracing framework.

pub mod logging;

// Re-export tracing crate for convenience.
pub use tracing;
